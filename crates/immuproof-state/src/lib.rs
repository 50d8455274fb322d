//! # immuproof state
//!
//! Holders for the trusted checkpoint of each database.
//!
//! ## Overview
//!
//! A verification session never writes its trusted state directly. It hands
//! every candidate state to a [`StateHolder`] together with the state it was
//! verified from. The holder adopts the candidate only if that state is still
//! the one held and the candidate is strictly newer. The check and the write
//! happen under one lock, so concurrent sessions racing to advance the same
//! database can never move it backwards or onto a history that was only
//! proven against an older checkpoint.
//!
//! ## Key Types
//!
//! - [`StateHolder`] - The trait for checkpoint storage
//! - [`MemoryStateHolder`] - In-memory holder keyed by database name
//! - [`SetResult`] - Whether a candidate state was adopted
//!
//! Persisting states across processes is left to other implementations of
//! [`StateHolder`].

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, StateError};
pub use memory::MemoryStateHolder;
pub use traits::{SetResult, StateHolder};

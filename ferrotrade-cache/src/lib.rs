//! The Cache Layer: a Redis-backed key-value store with per-namespace TTLs plus
//! the list/sorted-set/set primitives the Job System (C7) builds its queue on.

pub mod client;
pub mod error;
pub mod namespace;

pub use client::Cache;
pub use error::CacheError;
pub use namespace::Namespace;

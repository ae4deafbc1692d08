//! Record store adapters.
//!
//! The profile of record lives in a hosted REST record store; the HTTP
//! adapter below implements the [`crate::ports::RecordStore`] port
//! against it. On wasm targets the host supplies its own fetch-backed
//! implementation of the port instead.

#[cfg(not(target_arch = "wasm32"))]
mod http;

#[cfg(not(target_arch = "wasm32"))]
pub use http::{HttpRecordStore, StoreConfig};

//! Versioned cache storage for raw HTTP responses.
//!
//! Each cache generation is named by a version string. The worker only ever
//! reads and writes the generation matching its own version; the rest are
//! stale and get deleted when a new worker activates.
//!
//! Entries are keyed by request identity (method + URL, see [`hash`]) and
//! hold status, headers and body bytes.

pub mod entries;
pub mod hash;
pub mod storage;

pub use entries::CacheHandle;
pub use hash::compute_request_key;
pub use storage::CacheStorage;

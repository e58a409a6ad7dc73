//! Response store inspection tools.

pub mod get;
pub mod purge;

pub use get::{StoreGetParams, get_impl};
pub use purge::{StorePurgeParams, purge_impl};

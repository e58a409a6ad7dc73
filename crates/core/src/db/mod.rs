//! SQLite database shared by the response store and the cache storage.
//!
//! Both live in one file, in separate tables, and are accessed through
//! tokio-rusqlite so every statement runs on a background thread.

pub mod connection;
pub mod migrations;

pub use connection::Db;

//! Core types and shared functionality for the Movie Master offline layer.
//!
//! This crate provides:
//! - The persistent response store for movie API payloads
//! - Versioned cache storage for raw HTTP responses
//! - Request/response values and the unified error type
//! - Layered configuration

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod store;

pub use cache::{CacheHandle, CacheStorage};
pub use config::{AppConfig, ConfigError};
pub use db::Db;
pub use error::Error;
pub use http::{Request, RequestMode, Response};
pub use store::{ResponseStore, StoredRecord};

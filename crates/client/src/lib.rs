//! Client side of the Movie Master offline layer.
//!
//! This crate provides the network boundary and the request interceptor:
//! strategy selection, the caching strategies, and the worker lifecycle.

pub mod fetch;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod worker;

pub use fetch::{FetchClient, FetchConfig, Fetcher};
pub use worker::{
    Registration, RegistrationStatus, ServiceWorker, Strategies, Strategy, WorkerConfig, WorkerContext, WorkerState,
    select,
};

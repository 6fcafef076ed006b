//! Client side of swcache.
//!
//! This crate provides the request/response model, the network fetch
//! pipeline, request classification, serving strategies, and the
//! generation and lifecycle management wrapped by [`ServiceWorker`].

pub mod background;
pub mod classify;
pub mod fetch;
pub mod generations;
pub mod lifecycle;
pub mod request;
pub mod response;
pub mod strategy;
pub mod worker;

#[cfg(test)]
mod testing;

pub use reqwest::{Method, StatusCode, header};

pub use background::BackgroundTasks;
pub use classify::{Classification, Classifier, Route};
pub use fetch::{FetchClient, FetchConfig, Network};
pub use generations::{FailedResource, GenerationManager, InstallReport, OfflineSource};
pub use lifecycle::{ActivationReport, Clients, Lifecycle, LifecyclePhase};
pub use request::{Request, RequestMode};
pub use response::{Response, ResponseKind, ResponseSource};
pub use strategy::{Strategy, StrategyExecutor};
pub use worker::ServiceWorker;

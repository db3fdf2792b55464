//! Synchronous base for REST API resources.
//!
//! # Overview
//! An `Endpoint` mirrors one remote record: it holds the record's attributes,
//! issues find/save requests against `{api_host}/api/v1`, retries transient
//! transport failures, and classifies responses into typed errors. Concrete
//! resources describe themselves with a `ResourceConfig` and implement
//! `Resource` to get `new`/`find`/`save` for free.
//!
//! # Design
//! - Requests and responses are plain data (`HttpRequest`/`HttpResponse`);
//!   the network sits behind the `Transport` trait, with `UreqTransport` as
//!   the blocking default built lazily per endpoint.
//! - Every response body must be an envelope carrying
//!   `meta.status == "success"`; anything else is an error.
//! - Retries are bounded (3 attempts by default) and only cover connection
//!   and timeout failures. Each failed attempt logs a `tracing` warning.
//! - Configuration is explicit per endpoint, with a process-wide default
//!   loaded from the environment.

pub mod attributes;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod resource;
pub mod retry;
pub mod transport;

pub use attributes::{AttributeBag, Meta, ResourceId};
pub use config::{default_configuration, set_default_configuration, Configuration};
pub use endpoint::Endpoint;
pub use error::{EndpointError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use resource::{Resource, ResourceConfig, DEFAULT_PAGE_LIMIT};
pub use retry::RetryPolicy;
pub use transport::UreqTransport;

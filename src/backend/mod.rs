//! Outbound access to the backend REST API (logging, alerting, metrics).

pub mod gateway;
pub mod result;

pub use gateway::{BackendGateway, BackendRequest, RequestContext};
pub use result::{ToolCallResult, STATUS_INTERNAL_ERROR, STATUS_TIMEOUT};

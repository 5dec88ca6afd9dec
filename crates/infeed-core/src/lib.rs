//! Infeed Core: data model, error model and request context
//!
//! Shared by the field projection, decision and service crates.

pub mod context;
pub mod data_model;
pub mod error;

pub use context::RequestContext;
pub use data_model::{
    is_present, Article, ExpiryDateSource, Handling, InputHandlingKind, InputRequest,
    InputResponse, Pack, PackSnapshot, RequestKind,
};
pub use error::{InfeedError, Result};

/// Engine version reported by the service
pub const INFEED_VERSION: &str = "1.0.0";

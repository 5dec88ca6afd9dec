//! Infeed Decision: the pack input decision cycle
//!
//! ```text
//! InputRequest ─► InputDispatcher ─► DecisionPipeline ─► InputResponse
//!                      │                 │    │                │
//!                      ▼                 ▼    ▼                ▼
//!                 DecisionLog     ArticleResolver  DecoderChain  CompletionSink::finish
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use infeed_core::{InputHandlingKind, InputRequest, Pack};
//! use infeed_decision::{
//!     ArticleCatalog, DecisionPipeline, InputDispatcher, InputProfile, LoggingSink,
//! };
//! use infeed_fields::PolicyStore;
//!
//! let pipeline = DecisionPipeline::new(InputProfile::permissive(), Arc::new(ArticleCatalog::new()));
//! let dispatcher = InputDispatcher::new(pipeline, Arc::new(LoggingSink));
//!
//! let request = InputRequest::new("1001").with_pack(Pack::new("ABC123"));
//! let response = dispatcher.dispatch(request, &PolicyStore::new()).unwrap();
//!
//! assert_eq!(response.packs[0].handling.kind, InputHandlingKind::Allowed);
//! assert_eq!(response.packs[0].batch_number.as_deref(), Some("BATCH-ABC123"));
//! ```

pub mod audit;
pub mod config;
pub mod decoder;
pub mod dispatch;
pub mod pipeline;
pub mod resolver;
pub mod rule;

pub use audit::{fingerprint, DecisionLog, DecisionRecord, DecisionStats, PackDecision};
pub use config::{InputProfile, MaxSubItemQuantity};
pub use decoder::{
    pzn_from_item_code, CodeDecoder, DecodeResult, DecoderChain, Gs1Decoder, IfaDecoder,
    RawDecoder,
};
pub use dispatch::{CompletionSink, InputDispatcher, LoggingSink};
pub use pipeline::{assign_article, Assignment, DecisionPipeline, PipelineOutcome};
pub use resolver::{ArticleCatalog, ArticleResolver, InputArticle, ResolveOptions};
pub use rule::{PackCheck, RequestGate, UNKNOWN_ARTICLE_MESSAGE};

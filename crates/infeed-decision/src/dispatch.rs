//! Input Dispatcher
//!
//! Entry point for inbound pack input requests: logs receipt, runs the
//! pipeline, records the decision and signals completion to the transport.

use std::sync::{Arc, Mutex, MutexGuard};

use infeed_core::{InputRequest, InputResponse, RequestContext, Result};
use infeed_fields::PolicyStore;

use crate::audit::{DecisionLog, DecisionRecord, DecisionStats};
use crate::pipeline::DecisionPipeline;

/// The transport's "finish" contract
pub trait CompletionSink: Send + Sync {
    /// Called once per completed request with the emitted response
    fn finish(&self, response: &InputResponse);
}

/// Sink that only logs completions
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

impl CompletionSink for LoggingSink {
    fn finish(&self, response: &InputResponse) {
        tracing::info!(request_id = %response.id, packs = response.packs.len(), "input request finished");
    }
}

pub struct InputDispatcher {
    pipeline: DecisionPipeline,
    sink: Arc<dyn CompletionSink>,
    log: Mutex<DecisionLog>,
}

impl InputDispatcher {
    pub fn new(pipeline: DecisionPipeline, sink: Arc<dyn CompletionSink>) -> Self {
        Self {
            pipeline,
            sink,
            log: Mutex::new(DecisionLog::new()),
        }
    }

    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log = Mutex::new(DecisionLog::with_capacity(capacity));
        self
    }

    pub fn pipeline(&self) -> &DecisionPipeline {
        &self.pipeline
    }

    /// Run one request through the decision cycle.
    ///
    /// `finish` is signalled exactly once when the cycle completes and not
    /// at all when it aborts with an error.
    pub fn dispatch(&self, request: InputRequest, policies: &PolicyStore) -> Result<InputResponse> {
        let ctx = RequestContext::new(&request);
        self.dispatch_with_context(&ctx, request, policies)
    }

    pub fn dispatch_with_context(
        &self,
        ctx: &RequestContext,
        mut request: InputRequest,
        policies: &PolicyStore,
    ) -> Result<InputResponse> {
        match request.delivery_number.as_deref().filter(|n| !n.is_empty()) {
            Some(number) => {
                tracing::info!(request_id = %ctx.request_id, "received input request for delivery '{}'", number)
            }
            None => tracing::info!(request_id = %ctx.request_id, "received input request for stock return"),
        }

        let received = request.clone();
        let outcome = match self.pipeline.run_with_context(ctx, &mut request, policies) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(request_id = %ctx.request_id, error = %err, "input decision aborted");
                return Err(err);
            }
        };

        self.lock_log().record(DecisionRecord::new(
            ctx,
            &received,
            &outcome.response,
            outcome.gate,
        ));
        self.sink.finish(&outcome.response);
        Ok(outcome.response)
    }

    /// Most recent decisions, newest first
    pub fn recent_decisions(&self, limit: usize) -> Vec<DecisionRecord> {
        self.lock_log().recent(limit)
    }

    pub fn stats(&self) -> DecisionStats {
        self.lock_log().stats()
    }

    fn lock_log(&self) -> MutexGuard<'_, DecisionLog> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

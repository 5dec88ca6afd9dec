//! Decision log
//!
//! Keeps a bounded trail of completed input decisions for the operator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use infeed_core::{InputHandlingKind, InputRequest, InputResponse, RequestContext, RequestKind};

use crate::rule::RequestGate;

/// Default number of records kept
pub const DEFAULT_CAPACITY: usize = 1000;

/// Verdict emitted for one pack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackDecision {
    pub scan_code: String,
    pub kind: InputHandlingKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One completed request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub trace_id: String,
    pub request_id: String,
    pub kind: RequestKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_number: Option<String>,
    /// Gate that decided every pack, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate: Option<RequestGate>,
    pub packs: Vec<PackDecision>,
    /// `blake3:` hash of the request as received
    pub request_hash: String,
    /// `blake3:` hash of the emitted response
    pub response_hash: String,
}

impl DecisionRecord {
    pub fn new(
        ctx: &RequestContext,
        received: &InputRequest,
        response: &InputResponse,
        gate: Option<RequestGate>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            trace_id: ctx.trace_id.clone(),
            request_id: ctx.request_id.clone(),
            kind: ctx.kind,
            delivery_number: ctx.delivery_number.clone(),
            gate,
            packs: response
                .packs
                .iter()
                .map(|pack| PackDecision {
                    scan_code: pack.scan_code.clone(),
                    kind: pack.handling.kind,
                    message: pack.handling.message.clone(),
                })
                .collect(),
            request_hash: fingerprint(received),
            response_hash: fingerprint(response),
        }
    }

    pub fn allowed(&self) -> usize {
        self.packs.iter().filter(|p| p.kind.is_allowed()).count()
    }

    pub fn rejected(&self) -> usize {
        self.packs.iter().filter(|p| p.kind.is_rejected()).count()
    }
}

/// `blake3:<hex>` over the JSON form of a value
pub fn fingerprint<T: Serialize>(value: &T) -> String {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    format!("blake3:{}", blake3::hash(&bytes).to_hex())
}

/// Bounded in-memory record collector
#[derive(Debug)]
pub struct DecisionLog {
    records: Vec<DecisionRecord>,
    capacity: usize,
}

impl DecisionLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::new(),
            capacity,
        }
    }

    pub fn record(&mut self, record: DecisionRecord) {
        self.records.push(record);

        if self.records.len() > self.capacity {
            let drain_count = self.records.len() - self.capacity;
            self.records.drain(0..drain_count);
        }
    }

    pub fn records(&self) -> &[DecisionRecord] {
        &self.records
    }

    /// Most recent records, newest first
    pub fn recent(&self, limit: usize) -> Vec<DecisionRecord> {
        self.records.iter().rev().take(limit).cloned().collect()
    }

    pub fn for_request(&self, request_id: &str) -> Vec<&DecisionRecord> {
        self.records
            .iter()
            .filter(|r| r.request_id == request_id)
            .collect()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Export to JSON Lines
    pub fn to_jsonl(&self) -> String {
        self.records
            .iter()
            .filter_map(|r| serde_json::to_string(r).ok())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn stats(&self) -> DecisionStats {
        let requests = self.records.len();
        let short_circuited = self.records.iter().filter(|r| r.gate.is_some()).count();
        let packs_allowed: usize = self.records.iter().map(DecisionRecord::allowed).sum();
        let packs_rejected: usize = self.records.iter().map(DecisionRecord::rejected).sum();
        let decided = packs_allowed + packs_rejected;

        DecisionStats {
            requests,
            short_circuited,
            packs_allowed,
            packs_rejected,
            rejection_rate: if decided > 0 {
                packs_rejected as f64 / decided as f64
            } else {
                0.0
            },
        }
    }
}

impl Default for DecisionLog {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionStats {
    pub requests: usize,
    pub short_circuited: usize,
    pub packs_allowed: usize,
    pub packs_rejected: usize,
    pub rejection_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use infeed_core::Pack;

    fn record(kinds: &[InputHandlingKind], gate: Option<RequestGate>) -> DecisionRecord {
        let mut request = InputRequest::new("7");
        for (i, kind) in kinds.iter().enumerate() {
            let mut pack = Pack::new(format!("P{}", i));
            pack.set_handling(*kind, None);
            request.packs.push(pack);
        }
        let ctx = RequestContext::new(&request);
        let response = InputResponse::from_request(&request);
        DecisionRecord::new(&ctx, &request, &response, gate)
    }

    #[test]
    fn test_record_fields() {
        let entry = record(&[InputHandlingKind::Allowed, InputHandlingKind::RejectedNoBatchNumber], None);
        assert_eq!(entry.request_id, "7");
        assert_eq!(entry.kind, RequestKind::StockReturn);
        assert_eq!(entry.packs.len(), 2);
        assert!(entry.request_hash.starts_with("blake3:"));
        assert_ne!(entry.request_hash, entry.response_hash);
    }

    #[test]
    fn test_stats() {
        let mut log = DecisionLog::new();
        log.record(record(&[InputHandlingKind::Allowed, InputHandlingKind::AllowedForFridge], None));
        log.record(record(
            &[InputHandlingKind::Rejected, InputHandlingKind::Rejected],
            Some(RequestGate::UnknownArticle),
        ));

        let stats = log.stats();
        assert_eq!(stats.requests, 2);
        assert_eq!(stats.short_circuited, 1);
        assert_eq!(stats.packs_allowed, 2);
        assert_eq!(stats.packs_rejected, 2);
        assert!((stats.rejection_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_capacity_trims_oldest() {
        let mut log = DecisionLog::with_capacity(3);
        for _ in 0..5 {
            log.record(record(&[InputHandlingKind::Allowed], None));
        }
        assert_eq!(log.records().len(), 3);
        assert_eq!(log.recent(2).len(), 2);
        assert_eq!(log.to_jsonl().lines().count(), 3);
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let request = InputRequest::new("1").with_pack(Pack::new("A"));
        assert_eq!(fingerprint(&request), fingerprint(&request.clone()));
        assert_ne!(fingerprint(&request), fingerprint(&InputRequest::new("2")));
    }
}

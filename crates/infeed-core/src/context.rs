//! Request Context: per-request state shared by the pipeline stages
use chrono::{DateTime, NaiveDate, Utc};

use crate::data_model::{InputRequest, RequestKind};

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub trace_id: String,
    pub request_id: String,
    pub kind: RequestKind,
    pub delivery_number: Option<String>,
    pub received_at: DateTime<Utc>,
    /// Reference date for defaulted expiry dates
    pub today: NaiveDate,
}

impl RequestContext {
    pub fn new(request: &InputRequest) -> Self {
        let received_at = Utc::now();
        Self {
            trace_id: uuid::Uuid::new_v4().to_string(),
            request_id: request.id.clone(),
            kind: request.kind(),
            delivery_number: request.delivery_number.clone(),
            received_at,
            today: received_at.date_naive(),
        }
    }

    /// Pin the reference date, mainly for deterministic tests
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn is_delivery(&self) -> bool {
        self.kind == RequestKind::Delivery
    }

    pub fn is_stock_return(&self) -> bool {
        self.kind == RequestKind::StockReturn
    }
}

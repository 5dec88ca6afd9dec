//! Data Model: InputRequest, Pack, Article, Handling, InputResponse
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stock return or delivery, decided by the presence of a delivery number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    StockReturn,
    Delivery,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RequestKind::StockReturn => write!(f, "stock_return"),
            RequestKind::Delivery => write!(f, "delivery"),
        }
    }
}

/// Pack input request as delivered by the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRequest {
    /// Message id assigned by the storage system
    pub id: String,
    /// Subscriber id of the sender
    #[serde(default)]
    pub source: i32,
    /// Subscriber id of the receiver
    #[serde(default)]
    pub destination: i32,
    /// Present for deliveries tied to a purchase order
    #[serde(default)]
    pub delivery_number: Option<String>,
    #[serde(default)]
    pub picking_indicator: bool,
    #[serde(default)]
    pub packs: Vec<Pack>,
}

impl InputRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: 0,
            destination: 0,
            delivery_number: None,
            picking_indicator: false,
            packs: Vec::new(),
        }
    }

    pub fn with_delivery(mut self, delivery_number: impl Into<String>) -> Self {
        self.delivery_number = Some(delivery_number.into());
        self
    }

    pub fn with_picking_indicator(mut self, picking_indicator: bool) -> Self {
        self.picking_indicator = picking_indicator;
        self
    }

    pub fn with_route(mut self, source: i32, destination: i32) -> Self {
        self.source = source;
        self.destination = destination;
        self
    }

    pub fn with_pack(mut self, pack: Pack) -> Self {
        self.packs.push(pack);
        self
    }

    /// An empty delivery number counts as a stock return
    pub fn kind(&self) -> RequestKind {
        match self.delivery_number.as_deref() {
            Some(number) if !number.is_empty() => RequestKind::Delivery,
            _ => RequestKind::StockReturn,
        }
    }

    pub fn is_delivery(&self) -> bool {
        self.kind() == RequestKind::Delivery
    }
}

/// Source of a pack's expiry date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExpiryDateSource {
    #[default]
    None,
    Individual,
    Article,
}

impl ExpiryDateSource {
    /// Variants in declaration order
    pub const VARIANTS: &'static [&'static str] = &["None", "Individual", "Article"];

    pub fn ordinal(self) -> usize {
        match self {
            ExpiryDateSource::None => 0,
            ExpiryDateSource::Individual => 1,
            ExpiryDateSource::Article => 2,
        }
    }

    pub fn from_ordinal(ordinal: usize) -> Option<Self> {
        match ordinal {
            0 => Some(ExpiryDateSource::None),
            1 => Some(ExpiryDateSource::Individual),
            2 => Some(ExpiryDateSource::Article),
            _ => None,
        }
    }
}

/// A single physical unit of stock being input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pack {
    /// Transport-assigned pack id
    #[serde(default)]
    pub id: u64,
    pub scan_code: String,
    #[serde(default)]
    pub batch_number: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiry_date_source: ExpiryDateSource,
    #[serde(default)]
    pub sub_item_quantity: u32,
    #[serde(default)]
    pub stock_location_id: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub article: Article,
    #[serde(default)]
    pub handling: Handling,
}

impl Pack {
    pub fn new(scan_code: impl Into<String>) -> Self {
        Self {
            id: 0,
            scan_code: scan_code.into(),
            batch_number: None,
            external_id: None,
            expiry_date: None,
            expiry_date_source: ExpiryDateSource::None,
            sub_item_quantity: 0,
            stock_location_id: None,
            serial_number: None,
            article: Article::default(),
            handling: Handling::default(),
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    pub fn with_batch(mut self, batch_number: impl Into<String>) -> Self {
        self.batch_number = Some(batch_number.into());
        self
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn with_expiry(mut self, expiry_date: NaiveDate) -> Self {
        self.expiry_date = Some(expiry_date);
        self
    }

    pub fn with_expiry_source(mut self, source: ExpiryDateSource) -> Self {
        self.expiry_date_source = source;
        self
    }

    pub fn with_sub_items(mut self, quantity: u32) -> Self {
        self.sub_item_quantity = quantity;
        self
    }

    pub fn with_location(mut self, stock_location_id: impl Into<String>) -> Self {
        self.stock_location_id = Some(stock_location_id.into());
        self
    }

    pub fn with_serial(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    pub fn has_batch_number(&self) -> bool {
        is_present(&self.batch_number)
    }

    pub fn has_external_id(&self) -> bool {
        is_present(&self.external_id)
    }

    pub fn has_stock_location(&self) -> bool {
        is_present(&self.stock_location_id)
    }

    pub fn has_serial_number(&self) -> bool {
        is_present(&self.serial_number)
    }

    /// Assign the verdict
    pub fn set_handling(&mut self, kind: InputHandlingKind, message: Option<String>) {
        self.handling = Handling { kind, message };
    }

    /// Immutable copy taken before the pipeline touches the pack
    pub fn snapshot(&self) -> PackSnapshot {
        PackSnapshot(self.clone())
    }
}

/// Missing and empty text are both absent
pub fn is_present(value: &Option<String>) -> bool {
    value.as_deref().map_or(false, |v| !v.is_empty())
}

/// Article information attached to a pack
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dosage_form: Option<String>,
    #[serde(default)]
    pub packaging_unit: Option<String>,
    #[serde(default)]
    pub max_sub_item_quantity: u32,
    #[serde(default)]
    pub requires_fridge: bool,
    #[serde(default)]
    pub virtual_article_id: Option<String>,
    #[serde(default)]
    pub virtual_article_name: Option<String>,
}

/// Verdict assigned to a pack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InputHandlingKind {
    /// Not yet decided; never emitted in a response
    #[default]
    Undecided,
    Allowed,
    AllowedForFridge,
    Rejected,
    RejectedNoPickingIndicator,
    RejectedNoExpiryDate,
    RejectedNoBatchNumber,
    RejectedNoStockLocation,
    RejectedNoSerialNumber,
}

impl InputHandlingKind {
    /// Operator-visible domain, in ordinal order
    pub const VARIANTS: &'static [&'static str] = &[
        "Allowed",
        "AllowedForFridge",
        "Rejected",
        "RejectedNoPickingIndicator",
        "RejectedNoExpiryDate",
        "RejectedNoBatchNumber",
        "RejectedNoStockLocation",
        "RejectedNoSerialNumber",
    ];

    const DOMAIN: [InputHandlingKind; 8] = [
        InputHandlingKind::Allowed,
        InputHandlingKind::AllowedForFridge,
        InputHandlingKind::Rejected,
        InputHandlingKind::RejectedNoPickingIndicator,
        InputHandlingKind::RejectedNoExpiryDate,
        InputHandlingKind::RejectedNoBatchNumber,
        InputHandlingKind::RejectedNoStockLocation,
        InputHandlingKind::RejectedNoSerialNumber,
    ];

    /// Position within `VARIANTS`; `Undecided` maps to the first entry
    pub fn ordinal(self) -> usize {
        Self::DOMAIN.iter().position(|k| *k == self).unwrap_or(0)
    }

    pub fn from_ordinal(ordinal: usize) -> Option<Self> {
        Self::DOMAIN.get(ordinal).copied()
    }

    pub fn is_allowed(self) -> bool {
        matches!(self, InputHandlingKind::Allowed | InputHandlingKind::AllowedForFridge)
    }

    pub fn is_rejected(self) -> bool {
        !self.is_allowed() && self != InputHandlingKind::Undecided
    }
}

impl fmt::Display for InputHandlingKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InputHandlingKind::Undecided => write!(f, "Undecided"),
            other => write!(f, "{}", Self::VARIANTS[other.ordinal()]),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handling {
    #[serde(rename = "input")]
    pub kind: InputHandlingKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Handling {
    pub fn new(kind: InputHandlingKind) -> Self {
        Self { kind, message: None }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_decided(&self) -> bool {
        self.kind != InputHandlingKind::Undecided
    }
}

/// Pre-mutation copy of a pack; read-only source for mirrored fields
#[derive(Debug, Clone, PartialEq)]
pub struct PackSnapshot(Pack);

impl PackSnapshot {
    pub fn pack(&self) -> &Pack {
        &self.0
    }

    pub fn article(&self) -> &Article {
        &self.0.article
    }

    pub fn handling(&self) -> &Handling {
        &self.0.handling
    }
}

/// Request-level response message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputResponse {
    pub id: String,
    pub source: i32,
    pub destination: i32,
    #[serde(default)]
    pub delivery_number: Option<String>,
    #[serde(default)]
    pub picking_indicator: bool,
    /// Response-only flag, defaults to whether a delivery number is present
    #[serde(default)]
    pub is_new_delivery: bool,
    #[serde(default)]
    pub packs: Vec<Pack>,
}

impl InputResponse {
    /// Build the response from a processed request; source and destination swap
    pub fn from_request(request: &InputRequest) -> Self {
        Self {
            id: request.id.clone(),
            source: request.destination,
            destination: request.source,
            delivery_number: request.delivery_number.clone(),
            picking_indicator: request.picking_indicator,
            is_new_delivery: request.is_delivery(),
            packs: request.packs.clone(),
        }
    }

    pub fn pack_kinds(&self) -> Vec<InputHandlingKind> {
        self.packs.iter().map(|p| p.handling.kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_kind() {
        assert_eq!(InputRequest::new("1").kind(), RequestKind::StockReturn);
        assert_eq!(InputRequest::new("1").with_delivery("").kind(), RequestKind::StockReturn);
        assert_eq!(InputRequest::new("1").with_delivery("D-7").kind(), RequestKind::Delivery);
    }

    #[test]
    fn test_blank_text_is_absent() {
        let pack = Pack::new("X").with_location("").with_serial("S1");
        assert!(!pack.has_stock_location());
        assert!(pack.has_serial_number());
        assert!(!pack.has_batch_number());
    }

    #[test]
    fn test_handling_ordinals() {
        for (i, name) in InputHandlingKind::VARIANTS.iter().enumerate() {
            let kind = InputHandlingKind::from_ordinal(i).unwrap();
            assert_eq!(kind.ordinal(), i);
            assert_eq!(kind.to_string(), *name);
        }
        assert!(InputHandlingKind::from_ordinal(8).is_none());
        assert!(InputHandlingKind::AllowedForFridge.is_allowed());
        assert!(InputHandlingKind::RejectedNoSerialNumber.is_rejected());
        assert!(!InputHandlingKind::Undecided.is_rejected());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut pack = Pack::new("ABC").with_batch("B1");
        let snapshot = pack.snapshot();
        pack.batch_number = Some("B2".to_string());
        pack.set_handling(InputHandlingKind::Allowed, None);

        assert_eq!(snapshot.pack().batch_number.as_deref(), Some("B1"));
        assert!(!snapshot.handling().is_decided());
    }

    #[test]
    fn test_response_from_request() {
        let request = InputRequest::new("42")
            .with_route(100, 999)
            .with_delivery("D-1")
            .with_pack(Pack::new("A"));
        let response = InputResponse::from_request(&request);

        assert_eq!(response.source, 999);
        assert_eq!(response.destination, 100);
        assert!(response.is_new_delivery);
        assert_eq!(response.packs.len(), 1);
    }

    #[test]
    fn test_handling_serialization() {
        let handling = Handling::new(InputHandlingKind::Rejected).with_message("Unknown article.");
        let json = serde_json::to_string(&handling).unwrap();
        assert!(json.contains("\"input\":\"Rejected\""));

        let parsed: Handling = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, handling);
    }
}

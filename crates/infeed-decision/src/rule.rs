//! Decision rules
//!
//! Request-wide gates that short-circuit a whole request, and the per-pack
//! checks that run afterwards in a fixed order.

use serde::{Deserialize, Serialize};
use std::fmt;

use infeed_core::{InputHandlingKind, InputRequest, Pack};

use crate::config::InputProfile;

/// Message sent with packs rejected by the known-article gate
pub const UNKNOWN_ARTICLE_MESSAGE: &str = "Unknown article.";

/// A rule that decides every pack of a request at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestGate {
    /// Stock input of this kind is switched off
    StockInputDisabled,
    MissingPickingIndicator,
    /// At least one pack has no known article
    UnknownArticle,
}

impl RequestGate {
    /// Verdict given to every pack when the gate closes
    pub fn verdict(self) -> InputHandlingKind {
        match self {
            RequestGate::StockInputDisabled | RequestGate::UnknownArticle => {
                InputHandlingKind::Rejected
            }
            RequestGate::MissingPickingIndicator => InputHandlingKind::RejectedNoPickingIndicator,
        }
    }

    pub fn message(self) -> Option<&'static str> {
        match self {
            RequestGate::UnknownArticle => Some(UNKNOWN_ARTICLE_MESSAGE),
            _ => None,
        }
    }

    /// Gates that only look at the request and the profile
    pub fn static_gate(profile: &InputProfile, request: &InputRequest) -> Option<RequestGate> {
        if !profile.allow_stock_return_input
            || (request.is_delivery() && !profile.allow_stock_delivery_input)
        {
            return Some(RequestGate::StockInputDisabled);
        }
        if profile.enforce_picking_indicator && !request.picking_indicator {
            return Some(RequestGate::MissingPickingIndicator);
        }
        None
    }
}

impl fmt::Display for RequestGate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RequestGate::StockInputDisabled => write!(f, "stock input disabled"),
            RequestGate::MissingPickingIndicator => write!(f, "missing picking indicator"),
            RequestGate::UnknownArticle => write!(f, "unknown article"),
        }
    }
}

/// An enforced pack field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackCheck {
    ExpiryDate,
    BatchNumber,
    StockLocation,
    SerialNumber,
}

impl PackCheck {
    /// Evaluation order; the first failing check decides the pack
    pub const ORDER: [PackCheck; 4] = [
        PackCheck::ExpiryDate,
        PackCheck::BatchNumber,
        PackCheck::StockLocation,
        PackCheck::SerialNumber,
    ];

    pub fn is_enforced(self, profile: &InputProfile) -> bool {
        match self {
            PackCheck::ExpiryDate => profile.enforce_expiry_date,
            PackCheck::BatchNumber => profile.enforce_batch_number,
            PackCheck::StockLocation => profile.enforce_stock_location,
            PackCheck::SerialNumber => profile.enforce_serial_number,
        }
    }

    pub fn is_missing(self, pack: &Pack) -> bool {
        match self {
            PackCheck::ExpiryDate => pack.expiry_date.is_none(),
            PackCheck::BatchNumber => !pack.has_batch_number(),
            PackCheck::StockLocation => !pack.has_stock_location(),
            PackCheck::SerialNumber => !pack.has_serial_number(),
        }
    }

    pub fn verdict(self) -> InputHandlingKind {
        match self {
            PackCheck::ExpiryDate => InputHandlingKind::RejectedNoExpiryDate,
            PackCheck::BatchNumber => InputHandlingKind::RejectedNoBatchNumber,
            PackCheck::StockLocation => InputHandlingKind::RejectedNoStockLocation,
            PackCheck::SerialNumber => InputHandlingKind::RejectedNoSerialNumber,
        }
    }

    /// First enforced check the pack fails, in [`PackCheck::ORDER`]
    pub fn first_failure(profile: &InputProfile, pack: &Pack) -> Option<PackCheck> {
        Self::ORDER
            .into_iter()
            .find(|check| check.is_enforced(profile) && check.is_missing(pack))
    }
}

impl fmt::Display for PackCheck {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PackCheck::ExpiryDate => write!(f, "missing expiry date"),
            PackCheck::BatchNumber => write!(f, "missing batch number"),
            PackCheck::StockLocation => write!(f, "missing stock location"),
            PackCheck::SerialNumber => write!(f, "missing serial number"),
        }
    }
}

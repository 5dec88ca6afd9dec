//! Unified Error Model
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InfeedError {
    /// Policy addressed a field the catalog never discovered
    #[error("FIELD/UNKNOWN: '{field}' is not an operator-selectable field of {type_name}")]
    UnknownField { type_name: String, field: String },

    #[error("FIELD/UNKNOWN_TYPE: {0} has no field catalog")]
    UnknownType(String),

    #[error("FIELD/MANDATORY: {type_name}.{field} is always transmitted and cannot be excluded")]
    MandatoryField { type_name: String, field: String },

    /// Override value does not fit the field's value kind
    #[error("FIELD/CONVERT: cannot assign '{raw}' to {type_name}.{field}: {reason}")]
    FieldValueConversion {
        type_name: String,
        field: String,
        raw: String,
        reason: String,
    },

    #[error("ARTICLE/{0}")]
    ArticleAssignment(String),

    #[error("DECODE/{0}")]
    Decode(String),

    #[error("CONFIG/{0}")]
    Config(String),
}

impl InfeedError {
    pub fn unknown_field(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        InfeedError::UnknownField {
            type_name: type_name.into(),
            field: field.into(),
        }
    }

    pub fn conversion(
        type_name: impl Into<String>,
        field: impl Into<String>,
        raw: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        InfeedError::FieldValueConversion {
            type_name: type_name.into(),
            field: field.into(),
            raw: raw.into(),
            reason: reason.into(),
        }
    }

    /// Short category tag, e.g. `FIELD` or `ARTICLE`
    pub fn category(&self) -> &'static str {
        match self {
            InfeedError::UnknownField { .. }
            | InfeedError::UnknownType(_)
            | InfeedError::MandatoryField { .. }
            | InfeedError::FieldValueConversion { .. } => "FIELD",
            InfeedError::ArticleAssignment(_) => "ARTICLE",
            InfeedError::Decode(_) => "DECODE",
            InfeedError::Config(_) => "CONFIG",
        }
    }
}

pub type Result<T> = std::result::Result<T, InfeedError>;

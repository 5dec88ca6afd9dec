//! Code Decoder Chain
//!
//! Extracts pack data from 2D scan codes. Decoders are tried in a fixed
//! order; the first one that yields an item code wins. A decoder that does
//! not recognize the format returns an empty result, one that recognizes it
//! but finds it malformed returns [`InfeedError::Decode`].
//!
//! Shipped decoders:
//! - [`Gs1Decoder`]: application identifiers, bracketed or GS-separated
//! - [`IfaDecoder`]: IFA/PPN data identifiers in `[)>RS06` messages
//! - [`RawDecoder`]: fallback, never yields an item code

use chrono::{Months, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;

use infeed_core::{InfeedError, Result};

const GS: char = '\u{1d}';
const RS: char = '\u{1e}';

lazy_static! {
    /// `(AI)value` pairs of the human readable GS1 form
    static ref GS1_BRACKETED: Regex = Regex::new(r"^(?:\(\d{2,4}\)[^()]*)+$").unwrap();
    static ref GS1_ELEMENT: Regex = Regex::new(r"\((\d{2,4})\)([^()]*)").unwrap();

    /// Raw GS1 element string, optionally behind a symbology id or FNC1
    static ref GS1_RAW: Regex = Regex::new(r"^(?:\]d2|\x1d)?01\d{14}").unwrap();

    /// ISO/IEC 15434 envelope, format 06
    static ref IFA_HEADER: Regex = Regex::new(r"^\[\)>\x1e06\x1d").unwrap();

    static ref DIGITS: Regex = Regex::new(r"^\d+$").unwrap();
}

/// Pack data found in a scan code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeResult {
    pub item_code: Option<String>,
    pub batch_number: Option<String>,
    pub external_id: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub sub_item_quantity: u32,
    pub serial_number: Option<String>,
}

impl DecodeResult {
    pub fn has_item_code(&self) -> bool {
        self.item_code.as_deref().map_or(false, |code| !code.is_empty())
    }
}

/// One scan code format
pub trait CodeDecoder: Send + Sync {
    fn name(&self) -> &'static str;

    fn decode(&self, scan_code: &str) -> Result<DecodeResult>;
}

/// GS1 application identifiers
#[derive(Debug, Clone, Copy, Default)]
pub struct Gs1Decoder;

impl Gs1Decoder {
    fn decode_bracketed(scan_code: &str) -> Result<DecodeResult> {
        let mut result = DecodeResult::default();
        for element in GS1_ELEMENT.captures_iter(scan_code) {
            let ai = element.get(1).map_or("", |m| m.as_str());
            let value = element.get(2).map_or("", |m| m.as_str());
            if Gs1Field::from_ai(ai).is_some() {
                assign_gs1(&mut result, ai, value)?;
            }
        }
        Ok(result)
    }

    fn decode_raw(scan_code: &str) -> Result<DecodeResult> {
        let mut rest = scan_code
            .strip_prefix("]d2")
            .unwrap_or(scan_code)
            .trim_start_matches(GS);
        let mut result = DecodeResult::default();

        while !rest.is_empty() {
            let (ai, field) = Gs1Field::split_ai(rest)?;
            rest = &rest[ai.len()..];

            let value = match field.fixed_length() {
                Some(length) => {
                    let value = rest.get(..length).ok_or_else(|| {
                        InfeedError::Decode(format!("GS1 AI {} is truncated", ai))
                    })?;
                    rest = &rest[length..];
                    value
                }
                None => {
                    let end = rest.find(GS).unwrap_or(rest.len());
                    let value = &rest[..end];
                    rest = &rest[end..];
                    value
                }
            };
            if value.chars().count() > field.max_length() {
                return Err(InfeedError::Decode(format!(
                    "GS1 AI {} exceeds {} characters, missing group separator",
                    ai,
                    field.max_length()
                )));
            }
            assign_gs1(&mut result, ai, value)?;
            rest = rest.trim_start_matches(GS);
        }
        Ok(result)
    }
}

impl CodeDecoder for Gs1Decoder {
    fn name(&self) -> &'static str {
        "gs1"
    }

    fn decode(&self, scan_code: &str) -> Result<DecodeResult> {
        if GS1_BRACKETED.is_match(scan_code) {
            Self::decode_bracketed(scan_code)
        } else if GS1_RAW.is_match(scan_code) {
            Self::decode_raw(scan_code)
        } else {
            Ok(DecodeResult::default())
        }
    }
}

/// The application identifiers the simulator reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gs1Field {
    Gtin,
    Expiry,
    Batch,
    Serial,
    Quantity,
    ExternalId,
}

impl Gs1Field {
    fn from_ai(ai: &str) -> Option<Self> {
        match ai {
            "01" => Some(Gs1Field::Gtin),
            "17" => Some(Gs1Field::Expiry),
            "10" => Some(Gs1Field::Batch),
            "21" => Some(Gs1Field::Serial),
            "30" => Some(Gs1Field::Quantity),
            "240" => Some(Gs1Field::ExternalId),
            _ => None,
        }
    }

    /// Leading AI of a raw element string
    fn split_ai(rest: &str) -> Result<(&str, Gs1Field)> {
        for length in [2, 3] {
            if let Some(ai) = rest.get(..length) {
                if let Some(field) = Self::from_ai(ai) {
                    return Ok((ai, field));
                }
            }
        }
        let shown: String = rest.chars().take(4).collect();
        Err(InfeedError::Decode(format!(
            "unsupported GS1 application identifier at '{}'",
            shown
        )))
    }

    fn fixed_length(self) -> Option<usize> {
        match self {
            Gs1Field::Gtin => Some(14),
            Gs1Field::Expiry => Some(6),
            _ => None,
        }
    }

    fn max_length(self) -> usize {
        match self {
            Gs1Field::Gtin => 14,
            Gs1Field::Expiry => 6,
            Gs1Field::Batch | Gs1Field::Serial => 20,
            Gs1Field::Quantity => 8,
            Gs1Field::ExternalId => 30,
        }
    }
}

fn assign_gs1(result: &mut DecodeResult, ai: &str, value: &str) -> Result<()> {
    match Gs1Field::from_ai(ai) {
        Some(Gs1Field::Gtin) => {
            if value.len() != 14 || !DIGITS.is_match(value) {
                return Err(InfeedError::Decode(format!(
                    "GS1 GTIN '{}' must have 14 digits",
                    value
                )));
            }
            result.item_code = Some(value.to_string());
        }
        Some(Gs1Field::Expiry) => result.expiry_date = Some(parse_yymmdd(value)?),
        Some(Gs1Field::Batch) => result.batch_number = Some(value.to_string()),
        Some(Gs1Field::Serial) => result.serial_number = Some(value.to_string()),
        Some(Gs1Field::Quantity) => {
            result.sub_item_quantity = value.parse().map_err(|_| {
                InfeedError::Decode(format!("GS1 quantity '{}' is not a number", value))
            })?;
        }
        Some(Gs1Field::ExternalId) => result.external_id = Some(value.to_string()),
        None => {}
    }
    Ok(())
}

/// IFA/PPN data identifiers
#[derive(Debug, Clone, Copy, Default)]
pub struct IfaDecoder;

impl CodeDecoder for IfaDecoder {
    fn name(&self) -> &'static str {
        "ifa"
    }

    fn decode(&self, scan_code: &str) -> Result<DecodeResult> {
        let Some(header) = IFA_HEADER.find(scan_code) else {
            return Ok(DecodeResult::default());
        };
        let body = &scan_code[header.end()..];
        let end = body
            .find(RS)
            .ok_or_else(|| InfeedError::Decode("unterminated IFA message".to_string()))?;

        let mut result = DecodeResult::default();
        for field in body[..end].split(GS) {
            if let Some(ppn) = field.strip_prefix("9N") {
                result.item_code = Some(ppn.to_string());
            } else if let Some(batch) = field.strip_prefix("1T") {
                result.batch_number = Some(batch.to_string());
            } else if let Some(expiry) = field.strip_prefix('D') {
                result.expiry_date = Some(parse_yymmdd(expiry)?);
            } else if let Some(serial) = field.strip_prefix('S') {
                result.serial_number = Some(serial.to_string());
            }
        }
        Ok(result)
    }
}

/// Fallback slot; accepts anything and extracts nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDecoder;

impl CodeDecoder for RawDecoder {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn decode(&self, _scan_code: &str) -> Result<DecodeResult> {
        Ok(DecodeResult::default())
    }
}

/// Ordered decoders; the first with an item code wins
pub struct DecoderChain {
    decoders: Vec<Box<dyn CodeDecoder>>,
}

impl DecoderChain {
    pub fn new() -> Self {
        Self {
            decoders: Vec::new(),
        }
    }

    /// GS1, then IFA, then raw
    pub fn standard() -> Self {
        Self::new()
            .with_decoder(Gs1Decoder)
            .with_decoder(IfaDecoder)
            .with_decoder(RawDecoder)
    }

    pub fn with_decoder(mut self, decoder: impl CodeDecoder + 'static) -> Self {
        self.decoders.push(Box::new(decoder));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.decoders.iter().map(|d| d.name()).collect()
    }

    /// Run the chain. Decoder errors are logged and the next decoder is tried.
    pub fn decode(&self, scan_code: &str) -> Option<DecodeResult> {
        for decoder in &self.decoders {
            match decoder.decode(scan_code) {
                Ok(result) if result.has_item_code() => {
                    tracing::debug!(decoder = decoder.name(), scan_code, "scan code decoded");
                    return Some(result);
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(decoder = decoder.name(), scan_code, error = %err, "decoder failed");
                }
            }
        }
        None
    }
}

impl Default for DecoderChain {
    fn default() -> Self {
        Self::standard()
    }
}

/// German PZN carried by an item code, if any.
///
/// NTIN: 14 digits, prefix `04150`, PZN at positions 5..13.
/// PPN: 12 characters, prefix `11`, PZN at positions 2..10.
pub fn pzn_from_item_code(code: &str) -> Option<&str> {
    if code.len() == 14 && code.starts_with("04150") && DIGITS.is_match(code) {
        return code.get(5..13);
    }
    if code.len() == 12 && code.starts_with("11") {
        return code.get(2..10).filter(|pzn| DIGITS.is_match(pzn));
    }
    None
}

/// `YYMMDD`; day `00` stands for the last day of the month
fn parse_yymmdd(raw: &str) -> Result<NaiveDate> {
    let invalid = || InfeedError::Decode(format!("invalid expiry date '{}'", raw));
    if raw.len() != 6 || !DIGITS.is_match(raw) {
        return Err(invalid());
    }
    let year: i32 = raw[0..2].parse().map_err(|_| invalid())?;
    let month: u32 = raw[2..4].parse().map_err(|_| invalid())?;
    let day: u32 = raw[4..6].parse().map_err(|_| invalid())?;

    if day == 0 {
        NaiveDate::from_ymd_opt(2000 + year, month, 1)
            .and_then(|first| first.checked_add_months(Months::new(1)))
            .and_then(|next| next.pred_opt())
            .ok_or_else(invalid)
    } else {
        NaiveDate::from_ymd_opt(2000 + year, month, day).ok_or_else(invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_gs1_bracketed() {
        let result = Gs1Decoder
            .decode("(01)04150123456782(17)270331(10)LOT42(21)SN-1(30)20")
            .unwrap();
        assert_eq!(result.item_code.as_deref(), Some("04150123456782"));
        assert_eq!(result.expiry_date, Some(date(2027, 3, 31)));
        assert_eq!(result.batch_number.as_deref(), Some("LOT42"));
        assert_eq!(result.serial_number.as_deref(), Some("SN-1"));
        assert_eq!(result.sub_item_quantity, 20);
    }

    #[test]
    fn test_gs1_raw_with_separators() {
        let code = "]d2010415012345678217270200\u{1d}10B-7\u{1d}240EXT99\u{1d}21XYZ";
        let result = Gs1Decoder.decode(code).unwrap();
        assert_eq!(result.item_code.as_deref(), Some("04150123456782"));
        assert_eq!(result.expiry_date, Some(date(2027, 2, 28)));
        assert_eq!(result.batch_number.as_deref(), Some("B-7"));
        assert_eq!(result.external_id.as_deref(), Some("EXT99"));
        assert_eq!(result.serial_number.as_deref(), Some("XYZ"));
    }

    #[test]
    fn test_gs1_errors() {
        assert!(Gs1Decoder.decode("(01)04150123456782(17)271340").is_err());
        assert!(Gs1Decoder.decode("(01)123").is_err());
        assert!(Gs1Decoder.decode("01041501234567829912").is_err());
        assert_eq!(Gs1Decoder.decode("ABC123").unwrap(), DecodeResult::default());
    }

    #[test]
    fn test_ifa_message() {
        let code = "[)>\u{1e}06\u{1d}9N111234567842\u{1d}1TCH-1\u{1d}D280615\u{1d}SSER9\u{1e}\u{04}";
        let result = IfaDecoder.decode(code).unwrap();
        assert_eq!(result.item_code.as_deref(), Some("111234567842"));
        assert_eq!(result.batch_number.as_deref(), Some("CH-1"));
        assert_eq!(result.expiry_date, Some(date(2028, 6, 15)));
        assert_eq!(result.serial_number.as_deref(), Some("SER9"));
    }

    #[test]
    fn test_ifa_unterminated() {
        let err = IfaDecoder
            .decode("[)>\u{1e}06\u{1d}9N111234567842\u{1d}1TCH-1")
            .unwrap_err();
        assert_eq!(err.category(), "DECODE");
    }

    #[test]
    fn test_chain_falls_through_errors() {
        let chain = DecoderChain::standard();
        assert_eq!(chain.names(), vec!["gs1", "ifa", "raw"]);
        assert!(chain.decode("(01)04150123456782(17)991399").is_none());
        assert!(chain.decode("plain-code").is_none());
        assert!(chain.decode("(01)04150123456782").is_some());
    }

    #[test]
    fn test_pzn_extraction() {
        assert_eq!(pzn_from_item_code("04150123456782"), Some("12345678"));
        assert_eq!(pzn_from_item_code("111234567842"), Some("12345678"));
        assert_eq!(pzn_from_item_code("04006381333931"), None);
        assert_eq!(pzn_from_item_code("ABC"), None);
    }

    #[test]
    fn test_day_zero_is_month_end() {
        assert_eq!(parse_yymmdd("241200").unwrap(), date(2024, 12, 31));
        assert_eq!(parse_yymmdd("240200").unwrap(), date(2024, 2, 29));
        assert!(parse_yymmdd("24120").is_err());
    }
}

//! Input Profiles
//!
//! The set of operator switches the decision pipeline reads. Profiles come
//! from presets, builder calls, or YAML.

use rand::Rng;
use serde::{Deserialize, Serialize};

use infeed_core::{InfeedError, Result};

use crate::resolver::ResolveOptions;

/// Upper bound (exclusive) of randomly chosen max sub-item quantities
const RANDOM_MAX_SUB_ITEMS: u32 = 999;

/// How the max sub-item quantity of resolved articles is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxSubItemQuantity {
    Specific(u32),
    /// A fresh value in `1..999` per resolved article
    Random,
}

impl MaxSubItemQuantity {
    pub fn pick(&self) -> u32 {
        match self {
            MaxSubItemQuantity::Specific(quantity) => *quantity,
            MaxSubItemQuantity::Random => rand::thread_rng().gen_range(1..RANDOM_MAX_SUB_ITEMS),
        }
    }
}

impl Default for MaxSubItemQuantity {
    fn default() -> Self {
        MaxSubItemQuantity::Specific(0)
    }
}

/// Switches consumed by the decision pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputProfile {
    /// Profile name (e.g., "permissive", "strict")
    pub name: String,

    // === Request gates ===

    /// When off, every pack of every request is rejected
    pub allow_stock_return_input: bool,

    /// When off, every pack of a delivery is rejected
    pub allow_stock_delivery_input: bool,

    pub enforce_picking_indicator: bool,

    /// A single unknown article rejects the whole request
    pub only_known_articles: bool,

    // === Per-pack checks ===

    pub enforce_expiry_date: bool,
    pub enforce_batch_number: bool,
    pub enforce_stock_location: bool,
    pub enforce_serial_number: bool,

    // === Pack and article data ===

    /// Run the code decoder chain on scan codes
    pub parse_datamatrix_codes: bool,

    /// Every accepted pack goes to the fridge
    pub fridge_only: bool,

    /// Months added to today for packs without an expiry date
    pub default_expiry_month_offset: u32,

    pub overwrite_stock_location: Option<String>,

    /// When off, articles are sent with a max sub-item quantity of 0
    pub set_max_sub_item_quantity: bool,

    pub max_sub_item_quantity: MaxSubItemQuantity,

    pub set_virtual_article: bool,

    pub overwrite_article_name: Option<String>,
}

impl InputProfile {
    /// Accept everything, enforce nothing
    pub fn permissive() -> Self {
        Self {
            name: "permissive".to_string(),
            allow_stock_return_input: true,
            allow_stock_delivery_input: true,
            enforce_picking_indicator: false,
            only_known_articles: false,
            enforce_expiry_date: false,
            enforce_batch_number: false,
            enforce_stock_location: false,
            enforce_serial_number: false,
            parse_datamatrix_codes: true,
            fridge_only: false,
            default_expiry_month_offset: 12,
            overwrite_stock_location: None,
            set_max_sub_item_quantity: false,
            max_sub_item_quantity: MaxSubItemQuantity::default(),
            set_virtual_article: false,
            overwrite_article_name: None,
        }
    }

    /// Every gate and every per-pack check switched on
    pub fn strict() -> Self {
        Self {
            name: "strict".to_string(),
            enforce_picking_indicator: true,
            only_known_articles: true,
            enforce_expiry_date: true,
            enforce_batch_number: true,
            enforce_stock_location: true,
            enforce_serial_number: true,
            ..Self::permissive()
        }
    }

    /// Stock input switched off entirely
    pub fn closed() -> Self {
        Self {
            name: "closed".to_string(),
            allow_stock_return_input: false,
            allow_stock_delivery_input: false,
            ..Self::permissive()
        }
    }

    /// Get profile by mode name
    pub fn for_mode(mode: &str) -> Self {
        match mode {
            "strict" => Self::strict(),
            "closed" => Self::closed(),
            _ => Self::permissive(),
        }
    }

    /// Load profile from YAML; missing keys take permissive values
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| InfeedError::Config(e.to_string()))
    }

    pub fn with_stock_return_input(mut self, allowed: bool) -> Self {
        self.allow_stock_return_input = allowed;
        self
    }

    pub fn with_stock_delivery_input(mut self, allowed: bool) -> Self {
        self.allow_stock_delivery_input = allowed;
        self
    }

    pub fn with_picking_indicator_enforced(mut self, enforced: bool) -> Self {
        self.enforce_picking_indicator = enforced;
        self
    }

    pub fn with_only_known_articles(mut self, only_known: bool) -> Self {
        self.only_known_articles = only_known;
        self
    }

    pub fn with_expiry_date_enforced(mut self, enforced: bool) -> Self {
        self.enforce_expiry_date = enforced;
        self
    }

    pub fn with_batch_number_enforced(mut self, enforced: bool) -> Self {
        self.enforce_batch_number = enforced;
        self
    }

    pub fn with_stock_location_enforced(mut self, enforced: bool) -> Self {
        self.enforce_stock_location = enforced;
        self
    }

    pub fn with_serial_number_enforced(mut self, enforced: bool) -> Self {
        self.enforce_serial_number = enforced;
        self
    }

    pub fn with_code_decoding(mut self, enabled: bool) -> Self {
        self.parse_datamatrix_codes = enabled;
        self
    }

    pub fn with_fridge_only(mut self, fridge_only: bool) -> Self {
        self.fridge_only = fridge_only;
        self
    }

    pub fn with_expiry_month_offset(mut self, months: u32) -> Self {
        self.default_expiry_month_offset = months;
        self
    }

    pub fn with_stock_location_overwrite(mut self, location: impl Into<String>) -> Self {
        self.overwrite_stock_location = Some(location.into());
        self
    }

    /// Send max sub-item quantities, chosen as given
    pub fn with_max_sub_item_quantity(mut self, quantity: MaxSubItemQuantity) -> Self {
        self.set_max_sub_item_quantity = true;
        self.max_sub_item_quantity = quantity;
        self
    }

    pub fn with_virtual_article(mut self, enabled: bool) -> Self {
        self.set_virtual_article = enabled;
        self
    }

    pub fn with_article_name_overwrite(mut self, name: impl Into<String>) -> Self {
        self.overwrite_article_name = Some(name.into());
        self
    }

    /// Whether any per-pack check is switched on
    pub fn enforces_pack_fields(&self) -> bool {
        self.enforce_expiry_date
            || self.enforce_batch_number
            || self.enforce_stock_location
            || self.enforce_serial_number
    }

    /// Fresh resolver options; random quantities are drawn per call
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            max_sub_item_quantity: self.max_sub_item_quantity.pick(),
            article_name: self.overwrite_article_name.clone(),
        }
    }
}

impl Default for InputProfile {
    fn default() -> Self {
        Self::permissive()
    }
}

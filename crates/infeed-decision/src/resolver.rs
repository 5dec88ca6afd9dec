//! Article Resolver
//!
//! Maps scan codes to article records. `resolve` never fails: unknown scan
//! codes get a synthesized default article.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Operator overrides applied to every resolved article
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    pub max_sub_item_quantity: u32,
    pub article_name: Option<String>,
}

/// Master data of one article as known to the simulator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputArticle {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub dosage_form: String,
    #[serde(default)]
    pub packaging_unit: String,
    #[serde(default)]
    pub max_sub_item_quantity: u32,
    #[serde(default)]
    pub requires_fridge: bool,
}

impl InputArticle {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            dosage_form: String::new(),
            packaging_unit: String::new(),
            max_sub_item_quantity: 0,
            requires_fridge: false,
        }
    }

    /// Stand-in for a scan code with no master data
    pub fn synthesized(scan_code: &str) -> Self {
        Self {
            id: scan_code.to_string(),
            name: format!("Article {}", scan_code),
            dosage_form: "Tablet".to_string(),
            packaging_unit: "Box".to_string(),
            max_sub_item_quantity: 0,
            requires_fridge: false,
        }
    }

    pub fn with_dosage_form(mut self, dosage_form: impl Into<String>) -> Self {
        self.dosage_form = dosage_form.into();
        self
    }

    pub fn with_packaging_unit(mut self, packaging_unit: impl Into<String>) -> Self {
        self.packaging_unit = packaging_unit.into();
        self
    }

    pub fn with_fridge(mut self, requires_fridge: bool) -> Self {
        self.requires_fridge = requires_fridge;
        self
    }

    fn with_options(mut self, options: &ResolveOptions) -> Self {
        self.max_sub_item_quantity = options.max_sub_item_quantity;
        if let Some(name) = &options.article_name {
            self.name = name.clone();
        }
        self
    }
}

/// Scan code lookup consumed by the pipeline
pub trait ArticleResolver: Send + Sync {
    /// Known article for a scan code, with options applied
    fn lookup(&self, scan_code: &str, options: &ResolveOptions) -> Option<InputArticle>;

    /// Like [`ArticleResolver::lookup`], falling back to a synthesized article
    fn resolve(&self, scan_code: &str, options: &ResolveOptions) -> InputArticle {
        self.lookup(scan_code, options).unwrap_or_else(|| {
            tracing::debug!(scan_code, "no master data, synthesizing article");
            InputArticle::synthesized(scan_code).with_options(options)
        })
    }
}

/// In-memory article master data keyed by scan code
#[derive(Debug, Clone, Default)]
pub struct ArticleCatalog {
    articles: HashMap<String, InputArticle>,
}

impl ArticleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_article(mut self, scan_code: impl Into<String>, article: InputArticle) -> Self {
        self.insert(scan_code, article);
        self
    }

    pub fn insert(&mut self, scan_code: impl Into<String>, article: InputArticle) {
        self.articles.insert(scan_code.into(), article);
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

impl FromIterator<(String, InputArticle)> for ArticleCatalog {
    fn from_iter<I: IntoIterator<Item = (String, InputArticle)>>(iter: I) -> Self {
        Self {
            articles: iter.into_iter().collect(),
        }
    }
}

impl ArticleResolver for ArticleCatalog {
    fn lookup(&self, scan_code: &str, options: &ResolveOptions) -> Option<InputArticle> {
        self.articles
            .get(scan_code)
            .cloned()
            .map(|article| article.with_options(options))
    }
}

//! Field Policy Store
//!
//! Holds the operator's chosen handling for each response field, keyed by
//! `(type name, field name)`. A type only takes part in projection once it
//! has been selected; selecting seeds every catalogued field with
//! [`PolicyMode::UseDefault`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use infeed_core::{InfeedError, Result};

use crate::catalog::{FieldCatalog, Projectable};

/// How one field of a response object is produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value")]
pub enum PolicyMode {
    /// Keep whatever the pipeline computed
    UseDefault,
    /// Copy the value from the pre-pipeline snapshot
    MirrorInput,
    /// Parse and assign an operator-supplied raw value
    Custom(String),
}

impl PolicyMode {
    pub fn custom(raw: impl Into<String>) -> Self {
        PolicyMode::Custom(raw.into())
    }
}

impl Default for PolicyMode {
    fn default() -> Self {
        PolicyMode::UseDefault
    }
}

/// A field name paired with its mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPolicy {
    pub field: String,
    pub mode: PolicyMode,
}

/// Policies of one type; a field without an entry is deselected
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicySet {
    modes: BTreeMap<String, PolicyMode>,
}

impl PolicySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every catalogued field of `T` at `UseDefault`
    pub fn defaults_for<T: Projectable>() -> Self {
        Self::seeded(T::catalog().iter().map(|d| d.name))
    }

    fn seeded<'a>(names: impl Iterator<Item = &'a str>) -> Self {
        Self {
            modes: names
                .map(|name| (name.to_string(), PolicyMode::UseDefault))
                .collect(),
        }
    }

    pub fn with(mut self, field: impl Into<String>, mode: PolicyMode) -> Self {
        self.insert(field, mode);
        self
    }

    /// Drop a field, leaving it deselected
    pub fn without(mut self, field: &str) -> Self {
        self.remove(field);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, mode: PolicyMode) {
        self.modes.insert(field.into(), mode);
    }

    pub fn remove(&mut self, field: &str) -> Option<PolicyMode> {
        self.modes.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&PolicyMode> {
        self.modes.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.modes.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    /// Policies in field-name order
    pub fn policies(&self) -> Vec<FieldPolicy> {
        self.modes
            .iter()
            .map(|(field, mode)| FieldPolicy {
                field: field.clone(),
                mode: mode.clone(),
            })
            .collect()
    }
}

/// Registry of policy sets for every selected type
#[derive(Debug, Clone, Default)]
pub struct PolicyStore {
    sets: HashMap<&'static str, PolicySet>,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable projection for a type, seeding `UseDefault` for every field.
    /// Selecting an already selected type keeps its policies.
    pub fn select(&mut self, type_name: &str) -> Result<()> {
        let (key, catalog) = Self::resolve_type(type_name)?;
        self.sets
            .entry(key)
            .or_insert_with(|| PolicySet::seeded(catalog.iter().map(|d| d.name)));
        tracing::debug!(type_name = key, "response type selected for projection");
        Ok(())
    }

    /// Disable projection for a type; returns whether it was selected
    pub fn deselect(&mut self, type_name: &str) -> bool {
        let removed = self.sets.remove(type_name).is_some();
        if removed {
            tracing::debug!(type_name, "response type deselected");
        }
        removed
    }

    pub fn is_selected(&self, type_name: &str) -> bool {
        self.sets.contains_key(type_name)
    }

    /// Register a mode for one field. Selects the type when needed.
    pub fn set_policy(&mut self, type_name: &str, field: &str, mode: PolicyMode) -> Result<()> {
        let descriptor = FieldCatalog::lookup(type_name, field)?;
        self.select(type_name)?;
        if let Some(set) = self.sets.get_mut(type_name) {
            tracing::debug!(type_name, field, mode = ?mode, "field policy set");
            set.insert(descriptor.name, mode);
        }
        Ok(())
    }

    /// Deselect one field so that it is sent as its zero value
    pub fn exclude(&mut self, type_name: &str, field: &str) -> Result<()> {
        let descriptor = FieldCatalog::lookup(type_name, field)?;
        if descriptor.is_mandatory {
            return Err(InfeedError::MandatoryField {
                type_name: type_name.to_string(),
                field: field.to_string(),
            });
        }
        if let Some(set) = self.sets.get_mut(type_name) {
            set.remove(field);
        }
        Ok(())
    }

    /// Current policies of a type, `None` while it is not selected
    pub fn policies(&self, type_name: &str) -> Option<&PolicySet> {
        self.sets.get(type_name)
    }

    pub fn policies_for<T: Projectable>(&self) -> Option<&PolicySet> {
        self.policies(T::TYPE_NAME)
    }

    /// Names of the selected types, sorted
    pub fn selected_types(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.sets.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Load a whole configuration of policies, validating every field name
    pub fn from_config(config: &BTreeMap<String, BTreeMap<String, PolicyMode>>) -> Result<Self> {
        let mut store = Self::new();
        for (type_name, fields) in config {
            store.select(type_name)?;
            for (field, mode) in fields {
                store.set_policy(type_name, field, mode.clone())?;
            }
        }
        Ok(store)
    }

    fn resolve_type(
        type_name: &str,
    ) -> Result<(&'static str, &'static [crate::catalog::FieldDescriptor])> {
        let key = FieldCatalog::type_names()
            .iter()
            .copied()
            .find(|name| *name == type_name)
            .ok_or_else(|| InfeedError::UnknownType(type_name.to_string()))?;
        let catalog = FieldCatalog::describe(key)
            .ok_or_else(|| InfeedError::UnknownType(type_name.to_string()))?;
        Ok((key, catalog))
    }
}

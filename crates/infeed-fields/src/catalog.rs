//! Field catalog
//!
//! Each projectable type carries a static schema table: one [`FieldSpec`] per
//! field with its value kind, mandatory flag and plain function pointers to
//! read and write the field. The catalog is the sorted, operator-selectable
//! subset of that table, computed once per type.

use serde::Serialize;

use infeed_core::{InfeedError, Result};

use crate::value::{FieldValue, ValueKind};

pub type Getter<T> = fn(&T) -> FieldValue;
pub type Setter<T> = fn(&mut T, FieldValue) -> std::result::Result<(), String>;

/// One row of a type's schema table
pub struct FieldSpec<T: 'static> {
    pub name: &'static str,
    pub kind: ValueKind,
    /// Always transmitted; inclusion cannot be disabled
    pub mandatory: bool,
    /// Offered to the operator for overriding
    pub selectable: bool,
    pub get: Getter<T>,
    pub set: Setter<T>,
}

/// Public description of an overridable field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub value_kind: ValueKind,
    pub is_mandatory: bool,
}

/// A type whose fields can be projected by name
pub trait Projectable: Sized + 'static {
    const TYPE_NAME: &'static str;

    /// Full schema table, including fields that are not selectable
    fn schema() -> &'static [FieldSpec<Self>];

    /// Cached result of [`discover`] over [`Projectable::schema`]
    fn catalog() -> &'static [FieldDescriptor];

    /// Look up a schema row by name, selectable or not
    fn spec(name: &str) -> Option<&'static FieldSpec<Self>> {
        Self::schema().iter().find(|spec| spec.name == name)
    }
}

/// Selectable fields of a schema, ordered by name
pub fn discover<T>(schema: &[FieldSpec<T>]) -> Vec<FieldDescriptor> {
    let mut descriptors: Vec<FieldDescriptor> = schema
        .iter()
        .filter(|spec| spec.selectable)
        .map(|spec| FieldDescriptor {
            name: spec.name,
            value_kind: spec.kind,
            is_mandatory: spec.mandatory,
        })
        .collect();
    descriptors.sort_by(|a, b| a.name.cmp(b.name));
    descriptors
}

/// Entry point for catalog lookups, typed or by type name
pub struct FieldCatalog;

impl FieldCatalog {
    pub fn discover<T: Projectable>() -> &'static [FieldDescriptor] {
        T::catalog()
    }

    /// Catalog of a type given by name, as used by the service surface
    pub fn describe(type_name: &str) -> Option<&'static [FieldDescriptor]> {
        crate::schemas::catalog_by_name(type_name)
    }

    /// Names of all types that carry a catalog
    pub fn type_names() -> &'static [&'static str] {
        crate::schemas::TYPE_NAMES
    }

    /// Resolve one descriptor, failing with `UnknownField`/`UnknownType`
    pub fn lookup(type_name: &str, field: &str) -> Result<&'static FieldDescriptor> {
        let catalog = Self::describe(type_name)
            .ok_or_else(|| InfeedError::UnknownType(type_name.to_string()))?;
        catalog
            .iter()
            .find(|descriptor| descriptor.name == field)
            .ok_or_else(|| InfeedError::unknown_field(type_name, field))
    }
}

//! Infeed Fields: response field catalog, policies and projection
//!
//! ```text
//! schema table ──► FieldCatalog ──► PolicyStore ──► project(target, snapshot)
//!                   (selectable,      (type, field)     UseDefault / MirrorInput
//!                    sorted)           → PolicyMode      / Custom(raw)
//! ```
//!
//! # Example
//!
//! ```
//! use infeed_core::Pack;
//! use infeed_fields::{project, PolicyMode, PolicyStore};
//!
//! let mut store = PolicyStore::new();
//! store.set_policy("Pack", "batch_number", PolicyMode::custom("LOT-7")).unwrap();
//!
//! let mut pack = Pack::new("ABC123");
//! let snapshot = pack.snapshot();
//! project(&mut pack, snapshot.pack(), store.policies("Pack").unwrap()).unwrap();
//! assert_eq!(pack.batch_number.as_deref(), Some("LOT-7"));
//! ```

pub mod catalog;
pub mod policy;
pub mod projector;
pub mod schemas;
pub mod value;

pub use catalog::{discover, FieldCatalog, FieldDescriptor, FieldSpec, Projectable};
pub use policy::{FieldPolicy, PolicyMode, PolicySet, PolicyStore};
pub use projector::{project, project_if_selected};
pub use schemas::TYPE_NAMES;
pub use value::{FieldValue, ValueKind};

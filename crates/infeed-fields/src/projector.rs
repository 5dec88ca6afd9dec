//! Field Projector
//!
//! Applies a [`PolicySet`] to one response object. Side effects stay on the
//! target; the source is only read for mirrored fields.

use infeed_core::{InfeedError, Result};

use crate::catalog::Projectable;
use crate::policy::{PolicyMode, PolicySet};
use crate::value::FieldValue;

/// Project `policies` onto `target`, mirroring from `source`.
///
/// Catalogued fields without a policy are reset to their zero value unless
/// they are mandatory. A custom value that does not parse aborts the whole
/// call with [`InfeedError::FieldValueConversion`]; fields handled before the
/// failing one keep their new values.
pub fn project<T, S>(target: &mut T, source: &S, policies: &PolicySet) -> Result<()>
where
    T: Projectable,
    S: Projectable,
{
    for descriptor in T::catalog() {
        let Some(spec) = T::spec(descriptor.name) else {
            continue;
        };

        match policies.get(spec.name) {
            None if spec.mandatory => {}
            None => {
                let zero = FieldValue::zero(&spec.kind);
                let shown = zero.to_string();
                (spec.set)(target, zero)
                    .map_err(|reason| conversion::<T>(spec.name, &shown, reason))?;
            }
            Some(PolicyMode::UseDefault) => {}
            Some(PolicyMode::MirrorInput) => {
                let Some(mirror) = S::spec(spec.name) else {
                    tracing::trace!(
                        field = spec.name,
                        source = S::TYPE_NAME,
                        "mirror skipped, field missing on source"
                    );
                    continue;
                };
                let value = (mirror.get)(source);
                let shown = value.to_string();
                (spec.set)(target, value)
                    .map_err(|reason| conversion::<T>(spec.name, &shown, reason))?;
            }
            Some(PolicyMode::Custom(raw)) => {
                let value = FieldValue::parse(&spec.kind, raw)
                    .map_err(|reason| conversion::<T>(spec.name, raw, reason))?;
                (spec.set)(target, value)
                    .map_err(|reason| conversion::<T>(spec.name, raw, reason))?;
            }
        }
    }
    Ok(())
}

/// Project a type only when the operator selected it
pub fn project_if_selected<T, S>(
    target: &mut T,
    source: &S,
    policies: Option<&PolicySet>,
) -> Result<bool>
where
    T: Projectable,
    S: Projectable,
{
    match policies {
        Some(set) => project(target, source, set).map(|_| true),
        None => Ok(false),
    }
}

fn conversion<T: Projectable>(field: &str, raw: &str, reason: String) -> InfeedError {
    InfeedError::conversion(T::TYPE_NAME, field, raw, reason)
}

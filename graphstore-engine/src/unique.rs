//! Unique-field enforcement.
//!
//! Works in two phases against the primary store's unique index. The check
//! phase looks at every changing value before anything is reserved. The
//! commit phase then reserves new values and releases superseded ones.
//! Reservation is a conditional insert, so when two writers both pass the
//! check only one of them gets the reservation; the loser gives back what it
//! had already reserved and fails.

use crate::{EngineError, EngineResult};
use graphstore_model::{GraphObject, ObjectConfig};
use graphstore_storage::PrimaryStore;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Which mutation is being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueMode {
    Create,
    Update,
    Delete,
}

/// A unique field whose stored value changes.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Change<'a> {
    field: &'a str,
    old: Option<String>,
    new: Option<String>,
}

#[derive(Clone)]
pub struct UniqueConstraints {
    primary: Arc<dyn PrimaryStore>,
}

/// The index key of a value: strings as-is, anything else as JSON text.
pub(crate) fn index_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn changes<'a>(
    config: &'a ObjectConfig,
    previous: Option<&GraphObject>,
    current: &GraphObject,
    mode: UniqueMode,
) -> Vec<Change<'a>> {
    let old_of = |field: &str| previous.and_then(|p| p.value_of(field)).map(index_value);
    config
        .unique_fields()
        .into_iter()
        .filter_map(|field| {
            let (old, new) = match mode {
                UniqueMode::Create => (None, Some(index_value(current.value_of(field)?))),
                UniqueMode::Update => {
                    if !current.contains(field) {
                        return None;
                    }
                    let new = current.value_of(field).map(index_value);
                    let old = old_of(field);
                    if new.is_some() && new == old {
                        return None;
                    }
                    (old, new)
                }
                UniqueMode::Delete => (Some(old_of(field)?), None),
            };
            if old.is_none() && new.is_none() {
                return None;
            }
            Some(Change { field, old, new })
        })
        .collect()
}

impl UniqueConstraints {
    pub fn new(primary: Arc<dyn PrimaryStore>) -> Self {
        Self { primary }
    }

    /// Checks and then reserves/releases the unique values touched by a
    /// mutation of `config.object_type`.
    ///
    /// For updates, `current` is the update payload: only fields present in
    /// it are considered, and an explicit `null` releases the old value.
    pub async fn validate_and_reserve(
        &self,
        config: &ObjectConfig,
        previous: Option<&GraphObject>,
        current: &GraphObject,
        mode: UniqueMode,
    ) -> EngineResult<()> {
        let object_type = config.object_type.as_str();
        let changes = changes(config, previous, current, mode);
        if changes.is_empty() {
            return Ok(());
        }

        for change in &changes {
            if let Some(new) = &change.new {
                if !self.primary.check_unique(object_type, change.field, new).await? {
                    debug!(object_type, field = change.field, "unique value taken");
                    return Err(EngineError::ValidationErrorUniqueField {
                        field_name: change.field.to_string(),
                    });
                }
            }
        }

        let mut reserved: Vec<(&str, &str)> = Vec::new();
        for change in &changes {
            let Some(new) = &change.new else { continue };
            let outcome = self.primary.add_unique(object_type, change.field, new).await;
            match outcome {
                Ok(true) => reserved.push((change.field, new)),
                Ok(false) => {
                    debug!(object_type, field = change.field, "lost unique reservation race");
                    self.roll_back(object_type, &reserved).await;
                    return Err(EngineError::ValidationErrorUniqueField {
                        field_name: change.field.to_string(),
                    });
                }
                Err(e) => {
                    self.roll_back(object_type, &reserved).await;
                    return Err(e.into());
                }
            }
        }

        for change in &changes {
            if let Some(old) = &change.old {
                self.primary.remove_unique(object_type, change.field, old).await?;
            }
        }
        debug!(object_type, fields = changes.len(), ?mode, "unique values reconciled");
        Ok(())
    }

    async fn roll_back(&self, object_type: &str, reserved: &[(&str, &str)]) {
        for (field, value) in reserved {
            if let Err(e) = self.primary.remove_unique(object_type, field, value).await {
                warn!(object_type, field, error = %e, "failed to roll back unique reservation");
            }
        }
    }
}

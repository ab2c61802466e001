//! Seams to the store the import writes into.
//!
//! The importer never talks to a database itself. It hands creation requests
//! to a [`PersistenceSink`], lets a [`TemplateHook`] adjust them first, and
//! delegates posting and journal setup to the remaining collaborators.

use anyhow::Result;
use fecledger_core::{EntityId, EntityKind, JournalRef, JournalType, Move};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One record to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    /// Field values.
    pub values: Map<String, Value>,
}

impl CreateRequest {
    /// Wrap field values.
    pub const fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// A string field, empty when missing or not a string.
    pub fn str_field(&self, field: &str) -> &str {
        self.values
            .get(field)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

/// Creates records in the store.
pub trait PersistenceSink {
    /// Create every request of one kind.
    ///
    /// Must return one id per request, in request order.
    fn create(&mut self, kind: EntityKind, requests: &[CreateRequest]) -> Result<Vec<EntityId>>;
}

/// Adjusts generated values before they are persisted.
pub trait TemplateHook {
    /// Override or add fields of one record.
    fn apply(&self, kind: EntityKind, values: &mut Map<String, Value>) -> Result<()>;
}

/// A move that has been created in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedMove {
    /// Id assigned by the store.
    pub id: EntityId,
    /// The move as generated.
    pub record: Move,
}

/// Posts persisted moves and reconciles their matched lines.
pub trait PostingCollaborator {
    /// Finalize the moves.
    fn post(&mut self, moves: &[PersistedMove]) -> Result<()>;

    /// Reconcile lines sharing a matching tag.
    fn reconcile(&mut self, moves: &[PersistedMove]) -> Result<()>;
}

/// Applies inferred journal types.
pub trait JournalMutator {
    /// Change the type of a journal.
    fn set_type(&mut self, journal: &JournalRef, journal_type: JournalType) -> Result<()>;

    /// Run the one-time setup of a journal that just got a new type, such as
    /// wiring the liquidity accounts of a bank journal.
    fn setup(&mut self, journal: &JournalRef, journal_type: JournalType) -> Result<()>;
}

/// Template hook that leaves values untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTemplate;

impl TemplateHook for NoTemplate {
    fn apply(&self, _kind: EntityKind, _values: &mut Map<String, Value>) -> Result<()> {
        Ok(())
    }
}

/// Template hook that sets fixed field values per entity kind.
///
/// ```
/// use fecledger_importer::{FieldTemplates, TemplateHook};
/// use fecledger_core::EntityKind;
/// use serde_json::{json, Map};
///
/// let templates = FieldTemplates::new().with_field(EntityKind::Partner, "lang", json!("fr_FR"));
/// let mut values = Map::new();
/// templates.apply(EntityKind::Partner, &mut values).unwrap();
/// assert_eq!(values["lang"], "fr_FR");
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldTemplates {
    fields: HashMap<EntityKind, Map<String, Value>>,
}

impl FieldTemplates {
    /// Create an empty template set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `field` to `value` on every record of `kind`.
    #[must_use]
    pub fn with_field(mut self, kind: EntityKind, field: impl Into<String>, value: Value) -> Self {
        self.fields
            .entry(kind)
            .or_default()
            .insert(field.into(), value);
        self
    }
}

impl TemplateHook for FieldTemplates {
    fn apply(&self, kind: EntityKind, values: &mut Map<String, Value>) -> Result<()> {
        if let Some(fields) = self.fields.get(&kind) {
            for (field, value) in fields {
                values.insert(field.clone(), value.clone());
            }
        }
        Ok(())
    }
}

//! Registry for record generators.

use crate::aggregate::aggregate_moves;
use crate::error::ImportError;
use crate::partner::{PartnerGenerator, PartnerPayload};
use crate::ImportContext;
use fecledger_core::{EntityKind, Move, Row};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// A record produced by a generator, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedRecord {
    /// A new partner.
    Partner(PartnerPayload),
    /// A balanced journal entry.
    Move(Move),
}

impl GeneratedRecord {
    /// Entity kind of the record.
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Partner(_) => EntityKind::Partner,
            Self::Move(_) => EntityKind::Move,
        }
    }

    /// Field values handed to the persistence sink.
    pub fn to_values(&self) -> serde_json::Result<Map<String, Value>> {
        let value = match self {
            Self::Partner(partner) => serde_json::to_value(partner)?,
            Self::Move(mv) => serde_json::to_value(mv)?,
        };
        serde_json::from_value(value)
    }
}

/// Lazy stream of generated records.
pub type RecordStream<'a> = Box<dyn Iterator<Item = GeneratedRecord> + 'a>;

/// Produces the records of one entity kind from the row stream.
pub trait RecordGenerator: Send + Sync {
    /// The entity kind this generator produces.
    fn kind(&self) -> EntityKind;

    /// Start generating records.
    ///
    /// Errors that invalidate the whole run are returned before any record is
    /// yielded.
    fn generate<'a>(
        &self,
        rows: &'a [Row],
        ctx: ImportContext<'a>,
    ) -> Result<RecordStream<'a>, ImportError>;

    /// Returns a description of what this generator produces.
    fn description(&self) -> &str {
        self.kind().as_str()
    }
}

/// Partners found in auxiliary account columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartnerRecords;

impl RecordGenerator for PartnerRecords {
    fn kind(&self) -> EntityKind {
        EntityKind::Partner
    }

    fn generate<'a>(
        &self,
        rows: &'a [Row],
        ctx: ImportContext<'a>,
    ) -> Result<RecordStream<'a>, ImportError> {
        Ok(Box::new(
            PartnerGenerator::new(rows, ctx).map(GeneratedRecord::Partner),
        ))
    }

    fn description(&self) -> &str {
        "Partners from CompAuxNum/CompAuxLib"
    }
}

/// Balanced moves aggregated from every row.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveRecords;

impl RecordGenerator for MoveRecords {
    fn kind(&self) -> EntityKind {
        EntityKind::Move
    }

    fn generate<'a>(
        &self,
        rows: &'a [Row],
        ctx: ImportContext<'a>,
    ) -> Result<RecordStream<'a>, ImportError> {
        // Reconciliation needs every move, so nothing is yielded lazily here
        let moves = aggregate_moves(rows, ctx)?;
        Ok(Box::new(moves.into_iter().map(GeneratedRecord::Move)))
    }

    fn description(&self) -> &str {
        "Journal entries grouped by JournalCode/EcritureNum"
    }
}

/// Registry of record generators, one per entity kind.
pub struct GeneratorRegistry {
    generators: HashMap<EntityKind, Arc<dyn RecordGenerator>>,
}

impl GeneratorRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            generators: HashMap::new(),
        }
    }

    /// Create a registry with the partner and move generators.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PartnerRecords);
        registry.register(MoveRecords);
        registry
    }

    /// Register a generator, replacing any previous one for the same kind.
    pub fn register(&mut self, generator: impl RecordGenerator + 'static) {
        self.generators.insert(generator.kind(), Arc::new(generator));
    }

    /// Find the generator for `kind`.
    pub fn get(&self, kind: EntityKind) -> Option<Arc<dyn RecordGenerator>> {
        self.generators.get(&kind).map(Arc::clone)
    }

    /// List registered kinds with their description, sorted by kind.
    pub fn list_generators(&self) -> Vec<(EntityKind, &str)> {
        let mut list: Vec<_> = self
            .generators
            .iter()
            .map(|(kind, generator)| (*kind, generator.description()))
            .collect();
        list.sort_by_key(|(kind, _)| *kind);
        list
    }

    /// Get the number of registered generators.
    pub fn len(&self) -> usize {
        self.generators.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

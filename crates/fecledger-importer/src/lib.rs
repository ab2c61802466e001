//! FEC import pipeline for fecledger
//!
//! This crate turns the rows of a FEC export (Fichier des Écritures
//! Comptables, the flat ledger export French companies produce) into records
//! for an accounting store: partners first, then balanced journal moves.
//!
//! # Overview
//!
//! An [`Importer`] runs the generators of its [`GeneratorRegistry`] in the
//! configured order against a [`ResolutionCache`] of the entities already in
//! the store. Each generator reads the whole row stream:
//!
//! - partners are deduplicated on `(name, ref)` and created first, so that
//!   move lines can reference them;
//! - moves are grouped on `journal_code/move_name`, then repaired by a
//!   two-phase balance reconciler before anything is persisted.
//!
//! Once moves are posted, journals whose moves look like bank movements are
//! relabelled.
//!
//! # Example
//!
//! ```rust,no_run
//! use fecledger_importer::{ImportConfig, Importer, RowReader};
//! use fecledger_core::{CompanyRef, CurrencyRef, EntityId, ResolutionCache};
//! use std::path::Path;
//!
//! let config = ImportConfig::from_path(Path::new("fec.json"))?;
//! let rows = RowReader::from_config(&config).read_path(Path::new("FEC2024.txt"))?;
//!
//! let company = CompanyRef::new(EntityId(1), CurrencyRef::new(EntityId(1), "EUR", 2));
//! let mut importer = Importer::new(company, ResolutionCache::new()).with_config(config);
//! // importer.run(&rows, &mut collaborators)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregate;
pub mod amount;
pub mod classify;
pub mod collaborator;
pub mod config;
pub mod error;
pub mod partner;
pub mod pipeline;
pub mod reader;
pub mod reconcile;
pub mod registry;

use fecledger_core::{CompanyRef, ResolutionCache};

pub use aggregate::{aggregate_moves, MoveAggregator};
pub use classify::{Classification, JournalClassifier};
pub use collaborator::{
    CreateRequest, FieldTemplates, JournalMutator, NoTemplate, PersistedMove, PersistenceSink,
    PostingCollaborator, TemplateHook,
};
pub use config::{ClassifierConfig, ImportConfig};
pub use error::ImportError;
pub use partner::{PartnerGenerator, PartnerPayload};
pub use pipeline::{Collaborators, ImportSummary, Importer};
pub use reader::RowReader;
pub use reconcile::{BalanceReconciler, BalanceRecord, ImbalanceBuckets};
pub use registry::{GeneratedRecord, GeneratorRegistry, RecordGenerator, RecordStream};

/// Read-only state shared by generators during one stage.
///
/// Generators never write to the cache: the pipeline extends it between
/// stages, once the store has returned ids.
#[derive(Debug, Clone, Copy)]
pub struct ImportContext<'a> {
    /// Company the records belong to.
    pub company: &'a CompanyRef,
    /// Entities already in the store.
    pub cache: &'a ResolutionCache,
    /// Import configuration.
    pub config: &'a ImportConfig,
}

impl<'a> ImportContext<'a> {
    /// Bundle the shared state.
    pub const fn new(
        company: &'a CompanyRef,
        cache: &'a ResolutionCache,
        config: &'a ImportConfig,
    ) -> Self {
        Self {
            company,
            cache,
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fecledger_core::{CurrencyRef, EntityId};

    #[test]
    fn test_context_is_copy() {
        let company = CompanyRef::new(EntityId(1), CurrencyRef::new(EntityId(2), "EUR", 2));
        let cache = ResolutionCache::new();
        let config = ImportConfig::default();
        let ctx = ImportContext::new(&company, &cache, &config);
        let copy = ctx;
        assert_eq!(ctx.company.currency.name, copy.company.currency.name);
        assert_eq!(copy.config.rounding_tolerance, 1);
    }
}

//! Import orchestration.
//!
//! Stages run strictly one after another: each generator is drained, its
//! records persisted and folded back into the cache before the next one starts.
//! Moves reach the store only once every row aggregated and reconciled.

use crate::classify::{Classification, JournalClassifier};
use crate::collaborator::{
    CreateRequest, JournalMutator, NoTemplate, PersistedMove, PersistenceSink,
    PostingCollaborator, TemplateHook,
};
use crate::error::ImportError;
use crate::registry::{GeneratedRecord, GeneratorRegistry};
use crate::{ImportConfig, ImportContext};
use anyhow::{ensure, Context, Result};
use fecledger_core::{CompanyRef, EntityKind, PartnerRef, ResolutionCache, Row};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// The collaborators an import run writes through.
pub struct Collaborators<'a> {
    /// Creates records.
    pub sink: &'a mut dyn PersistenceSink,
    /// Adjusts records before creation.
    pub template: &'a dyn TemplateHook,
    /// Posts and reconciles moves.
    pub posting: &'a mut dyn PostingCollaborator,
    /// Applies inferred journal types.
    pub journals: &'a mut dyn JournalMutator,
}

impl<'a> Collaborators<'a> {
    /// Bundle collaborators, without a template hook.
    pub fn new(
        sink: &'a mut dyn PersistenceSink,
        posting: &'a mut dyn PostingCollaborator,
        journals: &'a mut dyn JournalMutator,
    ) -> Self {
        Self {
            sink,
            template: &NoTemplate,
            posting,
            journals,
        }
    }

    /// Use a template hook.
    #[must_use]
    pub fn with_template(mut self, template: &'a dyn TemplateHook) -> Self {
        self.template = template;
        self
    }
}

/// Outcome of a successful import run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Number of records created per kind.
    pub created: BTreeMap<EntityKind, usize>,
    /// Journals whose type changed.
    pub classified: Vec<Classification>,
}

impl ImportSummary {
    /// Number of records created for `kind`.
    pub fn created(&self, kind: EntityKind) -> usize {
        self.created.get(&kind).copied().unwrap_or_default()
    }
}

/// Runs a FEC import for one company.
pub struct Importer {
    company: CompanyRef,
    cache: ResolutionCache,
    config: ImportConfig,
    registry: GeneratorRegistry,
    classifier: JournalClassifier,
}

impl Importer {
    /// Create an importer with the default configuration and generators.
    pub fn new(company: CompanyRef, cache: ResolutionCache) -> Self {
        let config = ImportConfig::default();
        Self {
            company,
            cache,
            classifier: JournalClassifier::from_config(&config.classifier),
            config,
            registry: GeneratorRegistry::with_defaults(),
        }
    }

    /// Use a configuration.
    #[must_use]
    pub fn with_config(mut self, config: ImportConfig) -> Self {
        let target = self.classifier.target();
        self.classifier = JournalClassifier::from_config(&config.classifier).with_target(target);
        self.config = config;
        self
    }

    /// Use a generator registry.
    #[must_use]
    pub fn with_registry(mut self, registry: GeneratorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Use a journal classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: JournalClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// The resolution cache, including records created so far.
    pub const fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// The configuration in use.
    pub const fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Consume the importer and return its cache.
    pub fn into_cache(self) -> ResolutionCache {
        self.cache
    }

    /// Import `rows`.
    ///
    /// Any error aborts the run. Records of kinds processed before the failing
    /// stage may already be in the store, but no move is ever persisted unless
    /// every row aggregated and balanced.
    pub fn run(
        &mut self,
        rows: &[Row],
        collaborators: &mut Collaborators<'_>,
    ) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();
        let mut persisted = Vec::new();

        for kind in self.config.kinds.clone() {
            let generator = self.registry.get(kind).ok_or(ImportError::NoGenerator { kind })?;
            info!(%kind, rows = rows.len(), "generating records");

            let records: Vec<GeneratedRecord> = {
                let ctx = ImportContext::new(&self.company, &self.cache, &self.config);
                generator.generate(rows, ctx)?.collect()
            };
            let requests = self.prepare(kind, &records, collaborators.template)?;

            let created = requests.len();
            summary.created.insert(kind, created);
            if requests.is_empty() {
                debug!(%kind, "nothing to create");
                continue;
            }

            let ids = collaborators
                .sink
                .create(kind, &requests)
                .with_context(|| format!("Failed to create {kind} records"))?;
            ensure!(
                ids.len() == created,
                "store returned {} ids for {created} {kind} records",
                ids.len()
            );

            for ((record, request), id) in records.into_iter().zip(&requests).zip(ids) {
                match record {
                    GeneratedRecord::Partner(_) => {
                        self.cache.insert_partner(PartnerRef::new(
                            id,
                            request.str_field("name"),
                            request.str_field("ref"),
                        ));
                    }
                    GeneratedRecord::Move(record) => persisted.push(PersistedMove { id, record }),
                }
            }
            info!(%kind, created, "records created");
        }

        if !persisted.is_empty() {
            info!(moves = persisted.len(), "posting and reconciling moves");
            collaborators
                .posting
                .post(&persisted)
                .context("Failed to post moves")?;
            collaborators
                .posting
                .reconcile(&persisted)
                .context("Failed to reconcile matched lines")?;
        }

        summary.classified = self.apply_journal_types(&persisted, collaborators.journals)?;
        Ok(summary)
    }

    fn prepare(
        &self,
        kind: EntityKind,
        records: &[GeneratedRecord],
        template: &dyn TemplateHook,
    ) -> Result<Vec<CreateRequest>> {
        let interval = self.config.progress_interval;
        let mut requests = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            let mut values = record
                .to_values()
                .with_context(|| format!("Failed to serialize {kind} record {index}"))?;
            template
                .apply(kind, &mut values)
                .with_context(|| format!("Template failed on {kind} record {index}"))?;
            requests.push(CreateRequest::new(values));

            if interval > 0 && (index + 1) % interval == 0 {
                info!(%kind, done = index + 1, total = records.len(), "preparing records");
            }
        }
        Ok(requests)
    }

    fn apply_journal_types(
        &mut self,
        persisted: &[PersistedMove],
        journals: &mut dyn JournalMutator,
    ) -> Result<Vec<Classification>> {
        let classified = self
            .classifier
            .classify(persisted.iter().map(|p| &p.record), &self.cache);

        for classification in &classified {
            let Some(journal) = self.cache.journal_by_id(classification.journal).cloned() else {
                continue;
            };
            info!(
                journal = %journal.code,
                journal_type = %classification.journal_type,
                "journal type inferred"
            );
            journals
                .set_type(&journal, classification.journal_type)
                .with_context(|| format!("Failed to set type of journal {}", journal.code))?;
            journals
                .setup(&journal, classification.journal_type)
                .with_context(|| format!("Failed to set up journal {}", journal.code))?;
            self.cache
                .set_journal_type(classification.journal, classification.journal_type);
        }
        Ok(classified)
    }
}

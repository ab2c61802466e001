//! Journal type inference.
//!
//! A journal whose moves mostly pair its default account with a single other
//! account behaves like a bank or cash journal. This is a heuristic: a sales
//! journal with one revenue account can look the same, and a bank journal
//! full of split payments will not be recognized.

use crate::config::ClassifierConfig;
use fecledger_core::{EntityId, JournalType, Move, ResolutionCache};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// A journal whose type should change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Journal to relabel.
    pub journal: EntityId,
    /// Inferred type.
    pub journal_type: JournalType,
}

/// Infers journal types from the moves filed under them.
#[derive(Debug, Clone)]
pub struct JournalClassifier {
    ratio: Decimal,
    min_moves: usize,
    target: JournalType,
}

impl Default for JournalClassifier {
    fn default() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }
}

impl JournalClassifier {
    /// Create a classifier with explicit thresholds.
    pub const fn new(ratio: Decimal, min_moves: usize) -> Self {
        Self {
            ratio,
            min_moves,
            target: JournalType::Bank,
        }
    }

    /// Create a classifier from configuration.
    pub const fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(config.ratio, config.min_moves)
    }

    /// Set the type assigned to matching journals.
    #[must_use]
    pub const fn with_target(mut self, target: JournalType) -> Self {
        self.target = target;
        self
    }

    /// The type assigned to matching journals.
    pub const fn target(&self) -> JournalType {
        self.target
    }

    /// Classify every journal referenced by `moves`.
    ///
    /// Journals are returned in id order. Journals unknown to `cache` or
    /// already of the target type are left out.
    pub fn classify<'m>(
        &self,
        moves: impl IntoIterator<Item = &'m Move>,
        cache: &ResolutionCache,
    ) -> Vec<Classification> {
        let mut by_journal: BTreeMap<EntityId, Vec<&Move>> = BTreeMap::new();
        for mv in moves {
            by_journal.entry(mv.journal).or_default().push(mv);
        }

        let mut result = Vec::new();
        for (journal_id, moves) in by_journal {
            let Some(journal) = cache.journal_by_id(journal_id) else {
                continue;
            };
            if journal.journal_type == self.target {
                continue;
            }

            let default_account = journal
                .default_account
                .or_else(|| dominant_account(&moves));
            let single = moves
                .iter()
                .filter(|mv| is_single_counterpart(mv, default_account))
                .count();

            let matches = self.matches(single, moves.len());
            debug!(
                journal = %journal.code,
                moves = moves.len(),
                single_counterpart = single,
                matches,
                "journal type heuristic"
            );
            if matches {
                result.push(Classification {
                    journal: journal_id,
                    journal_type: self.target,
                });
            }
        }
        result
    }

    /// Check the thresholds for `single` single-counterpart moves out of `total`.
    pub fn matches(&self, single: usize, total: usize) -> bool {
        if total == 0 || total < self.min_moves {
            return false;
        }
        Decimal::from(single) >= self.ratio * Decimal::from(total)
    }
}

/// The account touched by the most moves. Ties go to the first account seen.
fn dominant_account(moves: &[&Move]) -> Option<EntityId> {
    let mut counts: HashMap<EntityId, usize> = HashMap::new();
    let mut order = Vec::new();
    for mv in moves {
        for account in mv.accounts() {
            let count = counts.entry(account).or_insert(0);
            if *count == 0 {
                order.push(account);
            }
            *count += 1;
        }
    }

    let mut best: Option<(EntityId, usize)> = None;
    for account in order {
        let count = counts[&account];
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((account, count));
        }
    }
    best.map(|(account, _)| account)
}

fn is_single_counterpart(mv: &Move, default_account: Option<EntityId>) -> bool {
    let counterparts = mv
        .accounts()
        .into_iter()
        .filter(|account| Some(*account) != default_account)
        .count();
    counterparts <= 1
}

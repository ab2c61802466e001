//! Balance reconciliation.
//!
//! Runs once the whole row stream has been aggregated, in two phases:
//!
//! 1. Per move: a residual of at most `rounding_tolerance` minor units is
//!    absorbed by the move's last line, unless the move carries a matching tag.
//! 2. Per journal and date: moves still imbalanced are looked at together with
//!    every line booked on the same journal and date. When each of those
//!    groups nets to zero, the source split entries that belong together, and
//!    the lines of every group are regrouped into a single move per journal
//!    and date, amounts unchanged. Otherwise the import fails with
//!    [`ImportError::UnrecoverableImbalance`].
//!
//! Exports rounded per line rather than per entry only balance at the coarser
//! grouping, which is what phase 2 recovers.

use crate::error::ImportError;
use chrono::NaiveDate;
use fecledger_core::{round_to, EntityId, Move, MoveLine};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Name given to a regrouped move, the FEC form of its date.
const REGROUPED_NAME_FORMAT: &str = "%Y%m%d";

/// Running balance of a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceRecord {
    /// `debit - credit`, rounded after each line.
    pub balance: Decimal,
    /// Whether any line carries a matching tag.
    pub matching: bool,
    /// Precision the balance is rounded at, fixed when the move is created.
    pub decimal_places: u32,
}

impl BalanceRecord {
    /// Create a zero balance.
    pub const fn new(decimal_places: u32) -> Self {
        Self {
            balance: Decimal::ZERO,
            matching: false,
            decimal_places,
        }
    }

    /// Account for one more line.
    pub fn add(&mut self, balance: Decimal, matched: bool) {
        self.balance = round_to(self.balance + balance, self.decimal_places);
        self.matching |= matched;
    }

    /// Check whether the balance rounds to zero.
    pub fn is_balanced(&self) -> bool {
        round_to(self.balance, self.decimal_places).is_zero()
    }

    fn tolerance(&self, units: u32) -> Decimal {
        Decimal::from(units) * Decimal::new(1, self.decimal_places)
    }
}

/// Position of a line inside the aggregated moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineRef {
    /// Index of the move.
    pub move_index: usize,
    /// Index of the line within the move.
    pub line_index: usize,
}

/// Lines grouped by journal, then by date.
#[derive(Debug, Clone, Default)]
pub struct ImbalanceBuckets {
    journals: BTreeMap<EntityId, BTreeMap<NaiveDate, Vec<LineRef>>>,
}

impl ImbalanceBuckets {
    /// Create an empty set of buckets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a line under its journal and date.
    pub fn push(&mut self, journal: EntityId, date: NaiveDate, line: LineRef) {
        self.journals
            .entry(journal)
            .or_default()
            .entry(date)
            .or_default()
            .push(line);
    }

    /// Lines recorded under `journal` and `date`, in insertion order.
    pub fn get(&self, journal: EntityId, date: NaiveDate) -> &[LineRef] {
        self.journals
            .get(&journal)
            .and_then(|dates| dates.get(&date))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Iterate over buckets in journal, then date order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, NaiveDate, &[LineRef])> {
        self.journals.iter().flat_map(|(journal, dates)| {
            dates
                .iter()
                .map(move |(date, lines)| (*journal, *date, lines.as_slice()))
        })
    }

    /// Number of `(journal, date)` buckets.
    pub fn len(&self) -> usize {
        self.journals.values().map(BTreeMap::len).sum()
    }

    /// Check whether no line was recorded.
    pub fn is_empty(&self) -> bool {
        self.journals.is_empty()
    }
}

/// What the reconciler repaired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Moves fixed in phase 1.
    pub rounding_repairs: usize,
    /// Moves whose lines were regrouped in phase 2.
    pub regrouped_moves: usize,
    /// Moves created in phase 2, one per journal and date.
    pub merged_moves: usize,
}

/// Two-phase imbalance repair.
#[derive(Debug, Clone, Copy)]
pub struct BalanceReconciler {
    tolerance_units: u32,
}

impl BalanceReconciler {
    /// Create a reconciler absorbing up to `tolerance_units` minor units in phase 1.
    pub const fn new(tolerance_units: u32) -> Self {
        Self { tolerance_units }
    }

    /// Repair every move so that it balances, or fail.
    ///
    /// `moves` and `balances` are indexed alike; `buckets` references lines of
    /// `moves` as they were before the call. Phase 2 replaces regrouped moves
    /// in both vectors, so `buckets` is stale afterwards. On error, nothing
    /// has been regrouped.
    pub fn reconcile(
        &self,
        moves: &mut Vec<Move>,
        balances: &mut Vec<BalanceRecord>,
        buckets: &ImbalanceBuckets,
    ) -> Result<ReconcileReport, ImportError> {
        let mut report = ReconcileReport::default();
        let mut pending = BTreeSet::new();

        for (index, (mv, record)) in moves.iter_mut().zip(balances.iter_mut()).enumerate() {
            if record.is_balanced() {
                continue;
            }
            if self.repair_rounding(mv, record) {
                report.rounding_repairs += 1;
            } else {
                pending.insert(index);
            }
        }

        if !pending.is_empty() {
            let plan = RegroupPlan::build(moves, balances, buckets, &pending)?;
            report.regrouped_moves = plan.regrouped.len();
            report.merged_moves = plan.apply(moves, balances);
        }
        Ok(report)
    }

    fn repair_rounding(&self, mv: &mut Move, record: &mut BalanceRecord) -> bool {
        // Matched lines belong to a reconciliation group and stay untouched
        if record.matching {
            return false;
        }
        let residual = record.balance;
        if residual.abs() > record.tolerance(self.tolerance_units) {
            return false;
        }
        let Some(last) = mv.lines.last_mut() else {
            return false;
        };

        last.absorb_residual(residual);
        record.balance = Decimal::ZERO;
        debug!(move_key = %mv.key, %residual, "rounding residual absorbed by last line");
        true
    }
}

/// Buckets to regroup and the moves whose lines they hold.
struct RegroupPlan<'b> {
    /// Every move with a line in one of `buckets`.
    regrouped: BTreeSet<usize>,
    /// `(journal, date, lines, decimal places)`, in journal then date order.
    buckets: Vec<(EntityId, NaiveDate, &'b [LineRef], u32)>,
}

impl<'b> RegroupPlan<'b> {
    /// Collect the buckets reachable from the pending moves and check that
    /// each of them nets to zero.
    ///
    /// A move spanning several dates pulls in every bucket it touches, and
    /// each of those buckets pulls in every move booked in it, until no new
    /// bucket is reached. All lines of a regrouped move then land in some
    /// regrouped bucket.
    fn build(
        moves: &[Move],
        balances: &[BalanceRecord],
        buckets: &'b ImbalanceBuckets,
        pending: &BTreeSet<usize>,
    ) -> Result<Self, ImportError> {
        let mut touched: Vec<BTreeSet<(EntityId, NaiveDate)>> =
            vec![BTreeSet::new(); moves.len()];
        for (journal, date, lines) in buckets.iter() {
            for line in lines {
                touched[line.move_index].insert((journal, date));
            }
        }

        if let Some(&index) = pending.iter().find(|&&index| touched[index].is_empty()) {
            // Only reachable when the buckets do not describe the moves
            return Err(ImportError::UnrecoverableImbalance {
                journal: moves[index].journal_code.clone(),
                date: moves[index].date,
            });
        }

        let mut regrouped = pending.clone();
        let mut keys = BTreeSet::new();
        let mut queue: Vec<usize> = pending.iter().copied().collect();
        while let Some(index) = queue.pop() {
            for &(journal, date) in &touched[index] {
                if !keys.insert((journal, date)) {
                    continue;
                }
                for line in buckets.get(journal, date) {
                    if regrouped.insert(line.move_index) {
                        queue.push(line.move_index);
                    }
                }
            }
        }

        let mut plan = Self {
            regrouped,
            buckets: Vec::with_capacity(keys.len()),
        };
        for (journal, date) in keys {
            let lines = buckets.get(journal, date);
            let decimal_places = lines
                .iter()
                .map(|line| balances[line.move_index].decimal_places)
                .max()
                .unwrap_or_default();
            let aggregate: Decimal = lines
                .iter()
                .map(|line| moves[line.move_index].lines[line.line_index].balance())
                .sum();

            if !round_to(aggregate, decimal_places).is_zero() {
                return Err(ImportError::UnrecoverableImbalance {
                    journal: moves[lines[0].move_index].journal_code.clone(),
                    date,
                });
            }
            plan.buckets.push((journal, date, lines, decimal_places));
        }
        Ok(plan)
    }

    /// Replace the regrouped moves with one move per bucket. Each new move
    /// takes the place of the first-seen move it draws lines from. Returns
    /// the number of moves created.
    fn apply(self, moves: &mut Vec<Move>, balances: &mut Vec<BalanceRecord>) -> usize {
        let mut anchored: BTreeMap<usize, Vec<(Move, BalanceRecord)>> = BTreeMap::new();
        let created = self.buckets.len();

        for (journal, date, lines, decimal_places) in self.buckets {
            let merged = merge_bucket(moves, date, lines, decimal_places);
            let record = BalanceRecord {
                balance: Decimal::ZERO,
                matching: merged.lines.iter().any(MoveLine::is_matched),
                decimal_places,
            };
            let sources: BTreeSet<usize> = lines.iter().map(|line| line.move_index).collect();
            debug!(
                %journal,
                %date,
                move_key = %merged.key,
                moves = sources.len(),
                "moves regrouped by journal and date"
            );
            let anchor = sources.first().copied().unwrap_or_default();
            anchored.entry(anchor).or_default().push((merged, record));
        }

        let previous = std::mem::take(moves).into_iter().zip(std::mem::take(balances));
        for (index, (mv, record)) in previous.enumerate() {
            if let Some(group) = anchored.remove(&index) {
                for (merged, merged_record) in group {
                    moves.push(merged);
                    balances.push(merged_record);
                }
            }
            if !self.regrouped.contains(&index) {
                moves.push(mv);
                balances.push(record);
            }
        }
        created
    }
}

/// Build the move holding every line of a bucket.
///
/// Lines keep their amounts. The bucket nets to zero at `decimal_places`, so
/// what is left is below half a minor unit; it goes to the line with the
/// largest absolute amount.
fn merge_bucket(moves: &[Move], date: NaiveDate, lines: &[LineRef], decimal_places: u32) -> Move {
    let first = &moves[lines[0].move_index];
    let name = date.format(REGROUPED_NAME_FORMAT).to_string();
    let mut merged = Move::new(
        format!("{}/{name}", first.journal_code),
        first.company,
        name,
        date,
        first.journal,
        first.journal_code.clone(),
    );
    merged.reference = first.reference.clone();
    merged.decimal_places = decimal_places;
    merged.lines = lines
        .iter()
        .map(|line| moves[line.move_index].lines[line.line_index].clone())
        .collect();

    let remainder = merged.balance();
    if !remainder.is_zero() {
        if let Some(target) = largest_line(&merged.lines) {
            merged.lines[target].absorb_residual(remainder);
            debug!(
                move_key = %merged.key,
                %remainder,
                "sub-unit remainder absorbed by largest line"
            );
        }
    }
    merged
}

/// The line with the largest absolute amount, preferring lines without a
/// matching tag. Ties go to the first line.
fn largest_line(lines: &[MoveLine]) -> Option<usize> {
    let mut best: Option<((bool, Decimal), usize)> = None;
    for (index, line) in lines.iter().enumerate() {
        let rank = (!line.is_matched(), line.balance().abs());
        if best.map_or(true, |(best_rank, _)| rank > best_rank) {
            best = Some((rank, index));
        }
    }
    best.map(|(_, index)| index)
}

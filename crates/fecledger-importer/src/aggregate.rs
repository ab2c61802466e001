//! Move aggregation.
//!
//! Rows are grouped into moves keyed by `journal_code/move_name`, in a single
//! pass over the row stream. Lines keep the order their rows were seen in and
//! moves keep the order their first row was seen in.
//!
//! Nothing can be emitted before the stream is exhausted: the reconciler needs
//! every move to repair imbalances, so the aggregator buffers all of them.

use crate::amount::{read_amount, LineAmounts};
use crate::error::ImportError;
use crate::reconcile::{BalanceReconciler, BalanceRecord, ImbalanceBuckets, LineRef};
use crate::ImportContext;
use chrono::NaiveDate;
use fecledger_core::{columns, JournalRef, Move, MoveLine, PartnerLink, Row};
use std::collections::HashMap;
use tracing::debug;

const DATE_FORMAT: &str = "%Y%m%d";

/// Accumulates rows into in-progress moves.
pub struct MoveAggregator<'a> {
    ctx: ImportContext<'a>,
    moves: Vec<Move>,
    index: HashMap<String, usize>,
    balances: Vec<BalanceRecord>,
    buckets: ImbalanceBuckets,
}

impl<'a> MoveAggregator<'a> {
    /// Create an empty aggregator.
    pub fn new(ctx: ImportContext<'a>) -> Self {
        Self {
            ctx,
            moves: Vec::new(),
            index: HashMap::new(),
            balances: Vec::new(),
            buckets: ImbalanceBuckets::new(),
        }
    }

    /// Add one row. `row_idx` is its position in the stream, used in errors.
    pub fn push(&mut self, row_idx: usize, row: &Row) -> Result<(), ImportError> {
        let ctx = self.ctx;

        // Move data -----------------------------------------

        // The move name falls back to the document reference
        let piece_ref = row.get(columns::PIECE_REF);
        let move_name = row
            .non_empty(columns::ECRITURE_NUM)
            .or_else(|| row.non_empty(columns::PIECE_REF))
            .ok_or(ImportError::MissingMoveIdentifier { row: row_idx })?;

        let move_date = match parse_date(row, columns::ECRITURE_DATE, row_idx)? {
            Some(date) => date,
            None => parse_date(row, columns::PIECE_DATE, row_idx)?
                .ok_or(ImportError::MissingMoveDate { row: row_idx })?,
        };

        let journal = resolve_journal(ctx, row.get(columns::JOURNAL_CODE), row_idx)?;
        let key = format!("{}/{}", journal.code, move_name);

        // Move line data ------------------------------------

        let account_code = row.get(columns::COMPTE_NUM);
        let account =
            ctx.cache
                .account(account_code)
                .ok_or_else(|| ImportError::UnresolvedAccount {
                    row: row_idx,
                    code: account_code.to_string(),
                })?;

        // Journal entries keep the partner on the line only
        let partner = match row.non_empty(columns::COMP_AUX_NUM) {
            None => PartnerLink::Absent,
            Some(reference) => ctx
                .cache
                .partner_by_ref(reference)
                .map_or(PartnerLink::Unresolved, |p| PartnerLink::Resolved(p.id)),
        };

        // Without a known foreign currency, the company currency only drives rounding
        let foreign = row
            .non_empty(columns::IDEVISE)
            .and_then(|name| ctx.cache.currency(name));
        let rounding = foreign.unwrap_or(&ctx.company.currency);

        let amounts = LineAmounts::from_row(row, rounding, row_idx)?;
        let mut line = MoveLine {
            company: ctx.company.id,
            name: row.get(columns::ECRITURE_LIB).to_string(),
            reference: piece_ref.to_string(),
            account: account.id,
            partner,
            currency: None,
            amount_currency: None,
            debit: amounts.debit,
            credit: amounts.credit,
            matching: row.non_empty(columns::ECRITURE_LET).map(str::to_string),
        };

        if let Some(currency) = foreign {
            line.currency = Some(currency.id);
            line.amount_currency = Some(read_amount(row, columns::MONTANT_DEVISE, row_idx)?);
            // Montantdevise is sometimes a magnitude on a credited line
            line.normalize_currency_sign();
        }

        // Append ---------------------------------------------

        let move_index = match self.index.get(&key) {
            Some(&index) => index,
            None => {
                let mut mv = Move::new(
                    key.clone(),
                    ctx.company.id,
                    move_name,
                    move_date,
                    journal.id,
                    &journal.code,
                );
                mv.reference = piece_ref.to_string();
                // The first line's currency fixes the precision of the whole move
                mv.decimal_places = rounding.decimal_places;
                self.moves.push(mv);
                self.balances
                    .push(BalanceRecord::new(rounding.decimal_places));
                self.index.insert(key, self.moves.len() - 1);
                self.moves.len() - 1
            }
        };

        let matched = line.is_matched();
        let mv = &mut self.moves[move_index];
        let line_index = mv.lines.len();
        mv.lines.push(line);

        self.balances[move_index].add(amounts.balance, matched);
        self.buckets.push(
            journal.id,
            move_date,
            LineRef {
                move_index,
                line_index,
            },
        );
        Ok(())
    }

    /// Number of moves aggregated so far.
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// Check whether no row was aggregated.
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Reconcile balances and return the finalized moves in first-seen order.
    ///
    /// A move regrouped by journal and date takes the place of the first move
    /// it draws lines from.
    pub fn finish(mut self) -> Result<Vec<Move>, ImportError> {
        let reconciler = BalanceReconciler::new(self.ctx.config.rounding_tolerance);
        let report = reconciler.reconcile(&mut self.moves, &mut self.balances, &self.buckets)?;
        debug!(
            moves = self.moves.len(),
            buckets = self.buckets.len(),
            rounding_repairs = report.rounding_repairs,
            regrouped_moves = report.regrouped_moves,
            merged_moves = report.merged_moves,
            "moves aggregated"
        );
        Ok(self.moves)
    }
}

/// Aggregate every row into balanced moves.
///
/// All-or-nothing: the first invalid row aborts the whole run.
pub fn aggregate_moves(rows: &[Row], ctx: ImportContext<'_>) -> Result<Vec<Move>, ImportError> {
    let mut aggregator = MoveAggregator::new(ctx);
    for (row_idx, row) in rows.iter().enumerate() {
        aggregator.push(row_idx, row)?;
    }
    aggregator.finish()
}

fn resolve_journal<'a>(
    ctx: ImportContext<'a>,
    code: &str,
    row_idx: usize,
) -> Result<&'a JournalRef, ImportError> {
    ctx.cache
        .journal(code)
        .or_else(|| {
            // Look for a shortened code
            ctx.config
                .journal_code_aliases
                .get(code)
                .and_then(|alias| ctx.cache.journal(alias))
        })
        .ok_or_else(|| ImportError::UnresolvedJournal {
            row: row_idx,
            code: code.to_string(),
        })
}

fn parse_date(
    row: &Row,
    column: &'static str,
    row_idx: usize,
) -> Result<Option<NaiveDate>, ImportError> {
    let Some(raw) = row.non_empty(column) else {
        return Ok(None);
    };
    let raw = raw.trim();
    let invalid = || ImportError::InvalidDate {
        row: row_idx,
        field: column,
        value: raw.to_string(),
    };

    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map(Some)
        .map_err(|_| invalid())
}

//! Property-based tests for fecledger-importer.
//!
//! These tests verify invariants hold for arbitrary inputs using proptest.
//!
//! Run with: cargo test -p fecledger-importer --test `property_tests`

use fecledger_core::{
    columns, AccountRef, AccountType, CompanyRef, CurrencyRef, EntityId, JournalRef, Move,
    ResolutionCache, Row,
};
use fecledger_importer::amount::parse_amount;
use fecledger_importer::{
    aggregate_moves, ImportConfig, ImportContext, ImportError, PartnerGenerator,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};

// ============================================================================
// Fixtures
// ============================================================================

const COUNTERPARTS: [&str; 3] = ["627000", "401000", "411000"];

struct Ledger {
    company: CompanyRef,
    cache: ResolutionCache,
    config: ImportConfig,
}

impl Ledger {
    fn new() -> Self {
        let mut cache = ResolutionCache::new();
        cache.insert_journal(JournalRef::new(EntityId(10), "BQ1"));
        for (id, code, account_type) in [
            (512, "512000", AccountType::Liquidity),
            (627, "627000", AccountType::Other),
            (401, "401000", AccountType::Payable),
            (411, "411000", AccountType::Receivable),
        ] {
            cache.insert_account(AccountRef::new(EntityId(id), code, account_type));
        }
        cache.insert_currency(CurrencyRef::new(EntityId(3), "USD", 2));
        Self {
            company: CompanyRef::new(EntityId(1), CurrencyRef::new(EntityId(2), "EUR", 2)),
            cache,
            config: ImportConfig::default(),
        }
    }

    fn ctx(&self) -> ImportContext<'_> {
        ImportContext::new(&self.company, &self.cache, &self.config)
    }
}

fn fec_amount(cents: i64) -> String {
    Decimal::new(cents, 2).to_string().replace('.', ",")
}

fn line_row(num: usize, day: u32, account: &str, debit: i64, credit: i64) -> Vec<(String, String)> {
    vec![
        (columns::JOURNAL_CODE.to_string(), "BQ1".to_string()),
        (columns::ECRITURE_NUM.to_string(), num.to_string()),
        (columns::ECRITURE_DATE.to_string(), format!("202403{day:02}")),
        (columns::COMPTE_NUM.to_string(), account.to_string()),
        (columns::DEBIT.to_string(), fec_amount(debit)),
        (columns::CREDIT.to_string(), fec_amount(credit)),
    ]
}

/// One move: debit lines on counterparts booked on `day`, then a bank credit
/// line booked on `bank_day` and off by `residual` cents.
#[derive(Debug, Clone)]
struct MoveSpec {
    debits: Vec<(usize, i64)>,
    residual: i64,
    day: u32,
    bank_day: u32,
}

impl MoveSpec {
    fn rows(&self, num: usize) -> Vec<Row> {
        let mut rows: Vec<Row> = self
            .debits
            .iter()
            .map(|(account, cents)| {
                Row::from_pairs(line_row(num, self.day, COUNTERPARTS[*account], *cents, 0))
            })
            .collect();
        let total: i64 = self.debits.iter().map(|(_, cents)| cents).sum();
        rows.push(Row::from_pairs(line_row(
            num,
            self.bank_day,
            "512000",
            0,
            total + self.residual,
        )));
        rows
    }
}

// ============================================================================
// Arbitrary generators
// ============================================================================

fn arb_cents() -> impl Strategy<Value = i64> {
    1i64..10_000_000i64
}

fn arb_move(max_residual: i64, max_spread: u32) -> impl Strategy<Value = MoveSpec> {
    (
        prop::collection::vec((0usize..COUNTERPARTS.len(), arb_cents()), 1..5),
        -max_residual..=max_residual,
        1u32..29u32,
        0u32..=max_spread,
    )
        .prop_map(|(debits, residual, day, spread)| MoveSpec {
            debits,
            residual,
            day,
            bank_day: day + spread,
        })
}

fn arb_rows(max_residual: i64) -> impl Strategy<Value = Vec<Row>> {
    arb_spread_rows(max_residual, 0)
}

/// Moves whose bank line may fall on a later date than their other lines.
fn arb_spread_rows(max_residual: i64, max_spread: u32) -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec(arb_move(max_residual, max_spread), 1..8).prop_map(|moves| {
        moves
            .iter()
            .enumerate()
            .flat_map(|(num, spec)| spec.rows(num))
            .collect()
    })
}

fn arb_partner_row() -> impl Strategy<Value = Row> {
    (
        prop_oneof![Just(""), Just("ACME"), Just("Globex"), Just("Initech")],
        prop_oneof![Just(""), Just("C1"), Just("C2")],
    )
        .prop_map(|(name, reference)| {
            Row::from_pairs([
                (columns::COMP_AUX_LIB, name),
                (columns::COMP_AUX_NUM, reference),
                (columns::COMPTE_NUM, "411"),
            ])
        })
}

/// Every `(account, debit - credit)` line of `rows`, sorted.
fn input_lines(ledger: &Ledger, rows: &[Row]) -> Vec<(EntityId, Decimal)> {
    let mut lines: Vec<_> = rows
        .iter()
        .map(|row| {
            let account = ledger.cache.account(row.get(columns::COMPTE_NUM)).unwrap().id;
            let debit = parse_amount(row.get(columns::DEBIT)).unwrap();
            let credit = parse_amount(row.get(columns::CREDIT)).unwrap();
            (account, debit - credit)
        })
        .collect();
    lines.sort();
    lines
}

fn output_lines(moves: &[Move]) -> Vec<(EntityId, Decimal)> {
    let mut lines: Vec<_> = moves
        .iter()
        .flat_map(|mv| &mv.lines)
        .map(|line| (line.account, line.balance()))
        .collect();
    lines.sort();
    lines
}

fn summarize(moves: &[Move]) -> BTreeMap<String, (Decimal, Vec<(EntityId, Decimal, Decimal)>)> {
    moves
        .iter()
        .map(|mv| {
            let mut lines: Vec<_> = mv
                .lines
                .iter()
                .map(|line| (line.account, line.debit, line.credit))
                .collect();
            lines.sort();
            (mv.key.clone(), (mv.balance(), lines))
        })
        .collect()
}

// ============================================================================
// Balance Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Every finalized move balances at its currency precision
    #[test]
    fn prop_finalized_moves_balance(rows in arb_rows(1)) {
        let ledger = Ledger::new();
        let moves = aggregate_moves(&rows, ledger.ctx()).unwrap();

        for mv in &moves {
            prop_assert!(!mv.lines.is_empty());
            prop_assert!(mv.is_balanced(), "move {} has balance {}", mv.key, mv.balance());
        }
    }

    /// Larger gaps either balance after regrouping or fail the whole import
    #[test]
    fn prop_no_imbalanced_move_escapes(rows in arb_rows(5)) {
        let ledger = Ledger::new();
        if let Ok(moves) = aggregate_moves(&rows, ledger.ctx()) {
            for mv in &moves {
                prop_assert!(mv.is_balanced(), "move {} has balance {}", mv.key, mv.balance());
            }
        }
    }

    /// Moves spread over several dates only get through when every date nets
    /// to zero, and no line moves by more than one minor unit
    #[test]
    fn prop_repairs_stay_within_tolerance(rows in arb_spread_rows(5, 1)) {
        let ledger = Ledger::new();
        let before = input_lines(&ledger, &rows);

        match aggregate_moves(&rows, ledger.ctx()) {
            Ok(moves) => {
                for mv in &moves {
                    prop_assert!(mv.is_balanced(), "move {} has balance {}", mv.key, mv.balance());
                }
                let after = output_lines(&moves);
                prop_assert_eq!(after.len(), before.len());
                for ((account, old), (new_account, new)) in before.iter().zip(&after) {
                    prop_assert_eq!(account, new_account);
                    prop_assert!(
                        (*old - *new).abs() <= Decimal::new(1, 2),
                        "{} became {}",
                        old,
                        new
                    );
                }
            }
            Err(err) => {
                prop_assert!(
                    matches!(err, ImportError::UnrecoverableImbalance { .. }),
                    "unexpected error {}",
                    err
                );
            }
        }
    }

    /// Reordering rows keeps each move's lines and balance
    #[test]
    fn prop_row_order_does_not_change_moves(
        (rows, shuffled) in arb_rows(0).prop_flat_map(|rows| {
            (Just(rows.clone()), Just(rows).prop_shuffle())
        })
    ) {
        let ledger = Ledger::new();
        let original = aggregate_moves(&rows, ledger.ctx()).unwrap();
        let reordered = aggregate_moves(&shuffled, ledger.ctx()).unwrap();

        prop_assert_eq!(summarize(&original), summarize(&reordered));
    }
}

// ============================================================================
// Line Properties
// ============================================================================

proptest! {
    /// A foreign amount always carries the sign of its line balance
    #[test]
    fn prop_foreign_amount_sign_follows_balance(
        lines in prop::collection::vec(
            (arb_cents(), -10_000_000i64..10_000_000i64, any::<bool>()),
            1..6,
        )
    ) {
        let rows: Vec<Row> = lines
            .iter()
            .enumerate()
            .flat_map(|(num, (cents, foreign, credited))| {
                let (debit, credit) = if *credited { (0, *cents) } else { (*cents, 0) };
                let mut foreign_line = line_row(num, 1, "411000", debit, credit);
                foreign_line.push((columns::IDEVISE.to_string(), "USD".to_string()));
                foreign_line.push((columns::MONTANT_DEVISE.to_string(), fec_amount(*foreign)));
                [
                    Row::from_pairs(foreign_line),
                    Row::from_pairs(line_row(num, 1, "512000", credit, debit)),
                ]
            })
            .collect();

        let ledger = Ledger::new();
        let moves = aggregate_moves(&rows, ledger.ctx()).unwrap();
        for line in moves.iter().flat_map(|mv| &mv.lines) {
            if let Some(amount) = line.amount_currency {
                prop_assert!(amount * line.balance() >= Decimal::ZERO);
                prop_assert_eq!(line.currency, Some(EntityId(3)));
            } else {
                prop_assert_eq!(line.currency, None);
            }
        }
    }
}

// ============================================================================
// Partner Properties
// ============================================================================

proptest! {
    /// At most one payload per (name, ref), never one without a name
    #[test]
    fn prop_partner_dedup(rows in prop::collection::vec(arb_partner_row(), 0..30)) {
        let ledger = Ledger::new();
        let payloads: Vec<_> = PartnerGenerator::new(&rows, ledger.ctx()).collect();

        let mut seen = HashSet::new();
        for payload in &payloads {
            prop_assert!(!payload.name.is_empty());
            prop_assert!(seen.insert((payload.name.clone(), payload.reference.clone())));
            prop_assert_eq!(payload.receivable_account, Some(EntityId(411)));
        }

        // With an empty cache every named pair is new
        let expected: HashSet<_> = rows
            .iter()
            .filter(|row| !row.get(columns::COMP_AUX_LIB).is_empty())
            .map(|row| (row.get(columns::COMP_AUX_LIB), row.get(columns::COMP_AUX_NUM)))
            .collect();
        prop_assert_eq!(payloads.len(), expected.len());
    }
}

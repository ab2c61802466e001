//! Amount columns of a FEC row.
//!
//! An export encodes amounts either as two `Debit`/`Credit` columns or as a
//! single `Montant` column with a `Sens` sign indicator. Both decimal commas
//! and decimal points occur in the wild.

use crate::error::ImportError;
use fecledger_core::{columns, CurrencyRef, Row};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a raw FEC amount.
///
/// Returns `Some(0)` for an empty value and `None` when the value is not a
/// number.
///
/// ```
/// use fecledger_importer::amount::parse_amount;
/// use rust_decimal::Decimal;
///
/// assert_eq!(parse_amount("1 234,56"), Some(Decimal::new(123_456, 2)));
/// assert_eq!(parse_amount(""), Some(Decimal::ZERO));
/// assert_eq!(parse_amount("abc"), None);
/// ```
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);

    if cleaned.is_empty() {
        return Some(Decimal::ZERO);
    }
    Decimal::from_str(cleaned).ok()
}

/// Read an amount column, failing the row when it is not a number.
pub fn read_amount(row: &Row, column: &str, row_idx: usize) -> Result<Decimal, ImportError> {
    let raw = row.get(column);
    parse_amount(raw).ok_or_else(|| ImportError::InvalidAmountEncoding {
        row: row_idx,
        reason: format!("{column} is not a number: {raw:?}"),
    })
}

/// Side of a `Montant` amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sens {
    /// Credit side.
    Credit,
    /// Debit side.
    Debit,
}

impl FromStr for Sens {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "C" | "CREDIT" => Ok(Self::Credit),
            "D" | "DEBIT" => Ok(Self::Debit),
            _ => Err(()),
        }
    }
}

/// Debit, credit and balance of a row, rounded to a currency.
///
/// Debit and credit are never negative: a negative amount is moved to the
/// opposite side, which leaves the balance unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmounts {
    /// Rounded debit.
    pub debit: Decimal,
    /// Rounded credit.
    pub credit: Decimal,
    /// Rounded `debit - credit`.
    pub balance: Decimal,
}

impl LineAmounts {
    /// Read the amount columns of `row` and round them to `currency`.
    pub fn from_row(
        row: &Row,
        currency: &CurrencyRef,
        row_idx: usize,
    ) -> Result<Self, ImportError> {
        let (debit, credit) = if row.has_column(columns::SENS) {
            let amount = read_amount(row, columns::MONTANT, row_idx)?;
            let raw = row.get(columns::SENS);
            match raw.parse::<Sens>() {
                Ok(Sens::Credit) => (Decimal::ZERO, amount),
                Ok(Sens::Debit) => (amount, Decimal::ZERO),
                Err(()) => {
                    return Err(ImportError::InvalidAmountEncoding {
                        row: row_idx,
                        reason: format!("Sens must be C or D, got {raw:?}"),
                    })
                }
            }
        } else {
            (
                read_amount(row, columns::DEBIT, row_idx)?,
                read_amount(row, columns::CREDIT, row_idx)?,
            )
        };

        let (debit, credit) = (currency.round(debit), currency.round(credit));
        let (debit, credit) = (
            debit.max(Decimal::ZERO) - credit.min(Decimal::ZERO),
            credit.max(Decimal::ZERO) - debit.min(Decimal::ZERO),
        );
        Ok(Self {
            debit,
            credit,
            balance: currency.round(debit - credit),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fecledger_core::EntityId;
    use rust_decimal_macros::dec;

    fn eur() -> CurrencyRef {
        CurrencyRef::new(EntityId(1), "EUR", 2)
    }

    #[test]
    fn test_parse_amount_formats() {
        assert_eq!(parse_amount("100.00"), Some(dec!(100.00)));
        assert_eq!(parse_amount("100,50"), Some(dec!(100.50)));
        assert_eq!(parse_amount(" -12,3 "), Some(dec!(-12.3)));
        assert_eq!(parse_amount("+7"), Some(dec!(7)));
        assert_eq!(parse_amount("1\u{a0}000,00"), Some(dec!(1000.00)));
        assert_eq!(parse_amount("   "), Some(Decimal::ZERO));
        assert_eq!(parse_amount("12,3,4"), None);
    }

    #[test]
    fn test_debit_credit_columns() {
        let row = Row::from_pairs([(columns::DEBIT, "100,004"), (columns::CREDIT, "0")]);
        let amounts = LineAmounts::from_row(&row, &eur(), 0).unwrap();
        assert_eq!(amounts.debit, dec!(100.00));
        assert_eq!(amounts.credit, dec!(0));
        assert_eq!(amounts.balance, dec!(100.00));
    }

    #[test]
    fn test_montant_sens() {
        let row = Row::from_pairs([(columns::MONTANT, "42,10"), (columns::SENS, "C")]);
        let amounts = LineAmounts::from_row(&row, &eur(), 0).unwrap();
        assert_eq!(amounts.credit, dec!(42.10));
        assert_eq!(amounts.debit, dec!(0));
        assert_eq!(amounts.balance, dec!(-42.10));

        let row = Row::from_pairs([(columns::MONTANT, "42,10"), (columns::SENS, "d")]);
        let amounts = LineAmounts::from_row(&row, &eur(), 0).unwrap();
        assert_eq!(amounts.debit, dec!(42.10));
    }

    #[test]
    fn test_negative_amounts_change_side() {
        let row = Row::from_pairs([(columns::DEBIT, "-25,00"), (columns::CREDIT, "")]);
        let amounts = LineAmounts::from_row(&row, &eur(), 0).unwrap();
        assert_eq!(amounts.debit, dec!(0));
        assert_eq!(amounts.credit, dec!(25.00));
        assert_eq!(amounts.balance, dec!(-25.00));

        let row = Row::from_pairs([(columns::DEBIT, "10"), (columns::CREDIT, "-2,50")]);
        let amounts = LineAmounts::from_row(&row, &eur(), 0).unwrap();
        assert_eq!(amounts.debit, dec!(12.50));
        assert_eq!(amounts.credit, dec!(0));
        assert_eq!(amounts.balance, dec!(12.50));

        let row = Row::from_pairs([(columns::MONTANT, "-42,10"), (columns::SENS, "D")]);
        let amounts = LineAmounts::from_row(&row, &eur(), 0).unwrap();
        assert_eq!(amounts.debit, dec!(0));
        assert_eq!(amounts.credit, dec!(42.10));
    }

    #[test]
    fn test_invalid_sens() {
        let row = Row::from_pairs([(columns::MONTANT, "1"), (columns::SENS, "X")]);
        let err = LineAmounts::from_row(&row, &eur(), 3).unwrap_err();
        assert!(matches!(
            err,
            ImportError::InvalidAmountEncoding { row: 3, .. }
        ));
    }

    #[test]
    fn test_non_numeric_debit() {
        let row = Row::from_pairs([(columns::DEBIT, "12a"), (columns::CREDIT, "")]);
        let err = LineAmounts::from_row(&row, &eur(), 8).unwrap_err();
        assert_eq!(err.row(), Some(8));
    }

    #[test]
    fn test_sens_parse() {
        assert_eq!("credit".parse::<Sens>(), Ok(Sens::Credit));
        assert_eq!(" D ".parse::<Sens>(), Ok(Sens::Debit));
        assert!("".parse::<Sens>().is_err());
    }
}

//! Import errors.

use chrono::NaiveDate;
use fecledger_core::EntityKind;
use thiserror::Error;

/// Errors that abort an import run.
///
/// Every variant is fatal: nothing is handed to the store once one is raised.
/// Row indices are zero-based positions in the row stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    /// Neither `EcritureNum` nor `PieceRef` is set.
    #[error("row {row} has no move identifier (EcritureNum and PieceRef are both empty)")]
    MissingMoveIdentifier {
        /// Offending row.
        row: usize,
    },

    /// Neither `EcritureDate` nor `PieceDate` is set.
    #[error("row {row} has no move date (EcritureDate and PieceDate are both empty)")]
    MissingMoveDate {
        /// Offending row.
        row: usize,
    },

    /// A date column is not `YYYYMMDD`.
    #[error("row {row} has an invalid {field} {value:?}, expected YYYYMMDD")]
    InvalidDate {
        /// Offending row.
        row: usize,
        /// Column name.
        field: &'static str,
        /// Raw value.
        value: String,
    },

    /// The journal code is unknown, even through the alias table.
    #[error("row {row} has an invalid journal code {code:?}")]
    UnresolvedJournal {
        /// Offending row.
        row: usize,
        /// Raw journal code.
        code: String,
    },

    /// The account code is unknown.
    #[error("row {row} has an invalid account {code:?}")]
    UnresolvedAccount {
        /// Offending row.
        row: usize,
        /// Raw account code.
        code: String,
    },

    /// The amount columns cannot be read.
    #[error("row {row} has an invalid amount encoding: {reason}")]
    InvalidAmountEncoding {
        /// Offending row.
        row: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// Lines of a journal and date do not balance even when grouped together.
    #[error("journal {journal} is imbalanced on {date}")]
    UnrecoverableImbalance {
        /// Journal code.
        journal: String,
        /// Move date.
        date: NaiveDate,
    },

    /// No generator is registered for an entity kind listed in the configuration.
    #[error("no generator registered for {kind} records")]
    NoGenerator {
        /// The requested kind.
        kind: EntityKind,
    },
}

impl ImportError {
    /// The offending row, for row-level errors.
    #[must_use]
    pub const fn row(&self) -> Option<usize> {
        match self {
            Self::MissingMoveIdentifier { row }
            | Self::MissingMoveDate { row }
            | Self::InvalidDate { row, .. }
            | Self::UnresolvedJournal { row, .. }
            | Self::UnresolvedAccount { row, .. }
            | Self::InvalidAmountEncoding { row, .. } => Some(*row),
            Self::UnrecoverableImbalance { .. } | Self::NoGenerator { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_row() {
        let err = ImportError::MissingMoveIdentifier { row: 4 };
        assert!(err.to_string().contains("row 4"));
        assert_eq!(err.row(), Some(4));

        let err = ImportError::UnresolvedAccount {
            row: 2,
            code: "999".to_string(),
        };
        assert_eq!(err.to_string(), "row 2 has an invalid account \"999\"");
    }

    #[test]
    fn test_imbalance_names_journal_and_date() {
        let err = ImportError::UnrecoverableImbalance {
            journal: "OD".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        };
        assert_eq!(err.to_string(), "journal OD is imbalanced on 2024-01-31");
        assert_eq!(err.row(), None);
    }
}

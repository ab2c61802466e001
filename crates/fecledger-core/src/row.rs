//! FEC rows.
//!
//! A [`Row`] is the source of truth for one accounting entry line. It is built
//! once by whatever decodes the export and is never mutated afterwards.

use std::collections::HashMap;

/// Column names of the FEC format the importer reads.
pub mod columns {
    /// Journal code.
    pub const JOURNAL_CODE: &str = "JournalCode";
    /// Journal label.
    pub const JOURNAL_LIB: &str = "JournalLib";
    /// Entry number, the move name.
    pub const ECRITURE_NUM: &str = "EcritureNum";
    /// Entry date, `YYYYMMDD`.
    pub const ECRITURE_DATE: &str = "EcritureDate";
    /// Account code.
    pub const COMPTE_NUM: &str = "CompteNum";
    /// Account label.
    pub const COMPTE_LIB: &str = "CompteLib";
    /// Auxiliary account number, the partner reference.
    pub const COMP_AUX_NUM: &str = "CompAuxNum";
    /// Auxiliary account label, the partner name.
    pub const COMP_AUX_LIB: &str = "CompAuxLib";
    /// Supporting document reference.
    pub const PIECE_REF: &str = "PieceRef";
    /// Supporting document date, `YYYYMMDD`.
    pub const PIECE_DATE: &str = "PieceDate";
    /// Line label.
    pub const ECRITURE_LIB: &str = "EcritureLib";
    /// Debit amount.
    pub const DEBIT: &str = "Debit";
    /// Credit amount.
    pub const CREDIT: &str = "Credit";
    /// Unsigned amount, paired with [`SENS`].
    pub const MONTANT: &str = "Montant";
    /// Sign indicator for [`MONTANT`], `C` or `D`.
    pub const SENS: &str = "Sens";
    /// Matching (lettering) tag.
    pub const ECRITURE_LET: &str = "EcritureLet";
    /// Matching date.
    pub const DATE_LET: &str = "DateLet";
    /// Validation date.
    pub const VALID_DATE: &str = "ValidDate";
    /// Amount in foreign currency.
    pub const MONTANT_DEVISE: &str = "Montantdevise";
    /// Foreign currency code.
    pub const IDEVISE: &str = "Idevise";
}

/// One line of a FEC export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: HashMap<String, String>,
}

impl Row {
    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value of a column, or the empty string when the column is absent.
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map_or("", String::as_str)
    }

    /// Value of a column, or `None` when the column is absent or empty.
    pub fn non_empty(&self, column: &str) -> Option<&str> {
        Some(self.get(column)).filter(|v| !v.is_empty())
    }

    /// Check whether the column exists, even if empty.
    pub fn has_column(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}

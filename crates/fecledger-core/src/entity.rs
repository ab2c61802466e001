//! Resolved entity handles.
//!
//! The import pipeline never owns accounts, journals, partners or currencies.
//! It only sees the minimal attributes it needs to make decisions, keyed by the
//! id the store assigned to them.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned to an entity by the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kinds of entity an import run can generate or resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Chart of accounts entry.
    Account,
    /// Ledger partition moves are filed under.
    Journal,
    /// Customer or supplier.
    Partner,
    /// Currency with its rounding precision.
    Currency,
    /// Journal entry.
    Move,
}

impl EntityKind {
    /// Lowercase tag used in configuration and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Journal => "journal",
            Self::Partner => "partner",
            Self::Currency => "currency",
            Self::Move => "move",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account classification, as far as the importer cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Customer receivables.
    Receivable,
    /// Supplier payables.
    Payable,
    /// Bank and cash accounts.
    Liquidity,
    /// Anything else.
    #[default]
    Other,
}

/// A resolved account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRef {
    /// Store id.
    pub id: EntityId,
    /// Account code as known by the store.
    pub code: String,
    /// Account classification.
    pub account_type: AccountType,
}

impl AccountRef {
    /// Create a new account handle.
    pub fn new(id: EntityId, code: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            id,
            code: code.into(),
            account_type,
        }
    }
}

/// Semantic journal type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalType {
    /// Customer invoices.
    Sale,
    /// Vendor bills.
    Purchase,
    /// Cash register.
    Cash,
    /// Bank statements.
    Bank,
    /// Miscellaneous operations.
    #[default]
    General,
}

impl fmt::Display for JournalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Sale => "sale",
            Self::Purchase => "purchase",
            Self::Cash => "cash",
            Self::Bank => "bank",
            Self::General => "general",
        };
        f.write_str(s)
    }
}

/// A resolved journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRef {
    /// Store id.
    pub id: EntityId,
    /// Journal code.
    pub code: String,
    /// Current semantic type.
    #[serde(default)]
    pub journal_type: JournalType,
    /// Default account, when the store has one configured.
    #[serde(default)]
    pub default_account: Option<EntityId>,
}

impl JournalRef {
    /// Create a new journal handle of the general type.
    pub fn new(id: EntityId, code: impl Into<String>) -> Self {
        Self {
            id,
            code: code.into(),
            journal_type: JournalType::General,
            default_account: None,
        }
    }

    /// Set the journal type.
    pub const fn with_type(mut self, journal_type: JournalType) -> Self {
        self.journal_type = journal_type;
        self
    }

    /// Set the default account.
    pub const fn with_default_account(mut self, account: EntityId) -> Self {
        self.default_account = Some(account);
        self
    }
}

/// A resolved partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerRef {
    /// Store id.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// External reference (auxiliary account number in FEC terms).
    #[serde(rename = "ref", default)]
    pub reference: String,
}

impl PartnerRef {
    /// Create a new partner handle.
    pub fn new(id: EntityId, name: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            reference: reference.into(),
        }
    }
}

/// A resolved currency and its rounding precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyRef {
    /// Store id.
    pub id: EntityId,
    /// ISO code.
    pub name: String,
    /// Number of decimal places amounts are rounded to.
    pub decimal_places: u32,
}

impl CurrencyRef {
    /// Create a new currency handle.
    pub fn new(id: EntityId, name: impl Into<String>, decimal_places: u32) -> Self {
        Self {
            id,
            name: name.into(),
            decimal_places,
        }
    }

    /// Round an amount to this currency's precision, half away from zero.
    #[must_use]
    pub fn round(&self, amount: Decimal) -> Decimal {
        round_to(amount, self.decimal_places)
    }

    /// Check whether an amount rounds to zero in this currency.
    #[must_use]
    pub fn is_zero(&self, amount: Decimal) -> bool {
        self.round(amount).is_zero()
    }

    /// The smallest representable amount, e.g. `0.01` for two decimal places.
    #[must_use]
    pub const fn minor_unit(&self) -> Decimal {
        Decimal::from_parts(1, 0, 0, false, self.decimal_places)
    }
}

/// Round `amount` to `decimal_places`, half away from zero.
#[must_use]
pub fn round_to(amount: Decimal, decimal_places: u32) -> Decimal {
    amount.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointAwayFromZero)
}

/// The company the import runs for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRef {
    /// Store id.
    pub id: EntityId,
    /// Company currency, used for rounding lines that carry no currency.
    pub currency: CurrencyRef,
}

impl CompanyRef {
    /// Create a new company handle.
    pub const fn new(id: EntityId, currency: CurrencyRef) -> Self {
        Self { id, currency }
    }
}

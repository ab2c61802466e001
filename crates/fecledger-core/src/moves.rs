//! Journal moves and their lines.
//!
//! A [`Move`] groups the [`MoveLine`]s that share a journal and a move name.
//! Serialization produces the creation payload handed to the store, which is
//! why field names follow the store's vocabulary (`journal_id`, `line_ids`...).

use crate::entity::{round_to, EntityId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

/// Partner assignment of a move line.
///
/// The distinction between [`PartnerLink::Absent`] and
/// [`PartnerLink::Unresolved`] is preserved in the payload: an absent partner
/// leaves the field out, an unresolved one writes an explicit null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartnerLink {
    /// The row carried no partner reference.
    #[default]
    Absent,
    /// The row carried a reference that is not in the cache.
    Unresolved,
    /// The reference resolved to this partner.
    Resolved(EntityId),
}

impl PartnerLink {
    /// The resolved partner id, if any.
    #[must_use]
    pub const fn id(&self) -> Option<EntityId> {
        match self {
            Self::Resolved(id) => Some(*id),
            Self::Absent | Self::Unresolved => None,
        }
    }

    /// Check whether the row carried no partner reference at all.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl Serialize for PartnerLink {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Resolved(id) => id.serialize(serializer),
            Self::Absent | Self::Unresolved => serializer.serialize_none(),
        }
    }
}

/// A single debit or credit line of a move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveLine {
    /// Owning company.
    #[serde(rename = "company_id")]
    pub company: EntityId,
    /// Line label.
    pub name: String,
    /// Supporting document reference.
    #[serde(rename = "ref")]
    pub reference: String,
    /// Account the line is booked on.
    #[serde(rename = "account_id")]
    pub account: EntityId,
    /// Partner assignment.
    #[serde(rename = "partner_id", skip_serializing_if = "PartnerLink::is_absent")]
    pub partner: PartnerLink,
    /// Foreign currency, when the row named a known one.
    #[serde(rename = "currency_id", skip_serializing_if = "Option::is_none")]
    pub currency: Option<EntityId>,
    /// Amount in the foreign currency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_currency: Option<Decimal>,
    /// Debit amount, never negative.
    pub debit: Decimal,
    /// Credit amount, never negative.
    pub credit: Decimal,
    /// Matching tag linking this line to a reconciliation group.
    #[serde(rename = "fec_matching_number")]
    pub matching: Option<String>,
}

impl MoveLine {
    /// Create a line on `account` with the given debit and credit.
    pub fn new(company: EntityId, account: EntityId, debit: Decimal, credit: Decimal) -> Self {
        Self {
            company,
            name: String::new(),
            reference: String::new(),
            account,
            partner: PartnerLink::Absent,
            currency: None,
            amount_currency: None,
            debit,
            credit,
            matching: None,
        }
    }

    /// Set the line label.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the foreign currency and amount.
    pub const fn with_currency(mut self, currency: EntityId, amount: Decimal) -> Self {
        self.currency = Some(currency);
        self.amount_currency = Some(amount);
        self
    }

    /// Set the matching tag.
    pub fn with_matching(mut self, tag: impl Into<String>) -> Self {
        self.matching = Some(tag.into());
        self
    }

    /// `debit - credit`.
    #[must_use]
    pub fn balance(&self) -> Decimal {
        self.debit - self.credit
    }

    /// Check whether the line carries a matching tag.
    #[must_use]
    pub const fn is_matched(&self) -> bool {
        self.matching.is_some()
    }

    /// Align the sign of the foreign amount with the line balance.
    ///
    /// The source format does not say whether the foreign amount is signed or
    /// a magnitude, so a disagreeing sign is flipped. This can hide a genuinely
    /// wrong foreign amount. Returns `true` if the sign was flipped.
    pub fn normalize_currency_sign(&mut self) -> bool {
        let balance = self.balance();
        match self.amount_currency.as_mut() {
            Some(amount) if *amount * balance < Decimal::ZERO => {
                *amount = -*amount;
                true
            }
            _ => false,
        }
    }

    /// Move `residual` out of this line so that its balance becomes
    /// `balance - residual`, keeping debit and credit non-negative.
    pub fn absorb_residual(&mut self, residual: Decimal) {
        let net = self.balance() - residual;
        if net < Decimal::ZERO {
            self.debit = Decimal::ZERO;
            self.credit = -net;
        } else {
            self.debit = net;
            self.credit = Decimal::ZERO;
        }
        self.normalize_currency_sign();
    }
}

/// A journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Move {
    /// Grouping key, `journal_code/move_name`.
    #[serde(skip)]
    pub key: String,
    /// Owning company.
    #[serde(rename = "company_id")]
    pub company: EntityId,
    /// Move name.
    pub name: String,
    /// Accounting date.
    pub date: NaiveDate,
    /// Supporting document reference.
    #[serde(rename = "ref")]
    pub reference: String,
    /// Journal the move is filed under.
    #[serde(rename = "journal_id")]
    pub journal: EntityId,
    /// Code of that journal.
    #[serde(skip)]
    pub journal_code: String,
    /// Decimal places the balance is checked at.
    #[serde(skip)]
    pub decimal_places: u32,
    /// Lines in first-seen order.
    #[serde(rename = "line_ids")]
    pub lines: Vec<MoveLine>,
}

impl Move {
    /// Create an empty move.
    pub fn new(
        key: impl Into<String>,
        company: EntityId,
        name: impl Into<String>,
        date: NaiveDate,
        journal: EntityId,
        journal_code: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            company,
            name: name.into(),
            date,
            reference: String::new(),
            journal,
            journal_code: journal_code.into(),
            decimal_places: 2,
            lines: Vec::new(),
        }
    }

    /// Add a line.
    pub fn with_line(mut self, line: MoveLine) -> Self {
        self.lines.push(line);
        self
    }

    /// Sum of `debit - credit` over all lines.
    #[must_use]
    pub fn balance(&self) -> Decimal {
        self.lines.iter().map(MoveLine::balance).sum()
    }

    /// Check whether the balance rounds to zero at the move's precision.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        round_to(self.balance(), self.decimal_places).is_zero()
    }

    /// Distinct accounts touched by the move, in first-seen order.
    #[must_use]
    pub fn accounts(&self) -> Vec<EntityId> {
        let mut accounts = Vec::new();
        for line in &self.lines {
            if !accounts.contains(&line.account) {
                accounts.push(line.account);
            }
        }
        accounts
    }
}

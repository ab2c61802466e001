//! Partner generation.
//!
//! Scans the rows for auxiliary accounts (`CompAuxLib` / `CompAuxNum`) and
//! yields one creation payload per partner the cache does not know yet.

use crate::ImportContext;
use fecledger_core::{columns, AccountType, EntityId, Row};
use serde::Serialize;
use std::collections::HashSet;

/// Creation payload for a partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartnerPayload {
    /// Owning company.
    #[serde(rename = "company_id")]
    pub company: EntityId,
    /// Display name.
    pub name: String,
    /// External reference.
    #[serde(rename = "ref")]
    pub reference: String,
    /// Default receivable account.
    #[serde(
        rename = "property_account_receivable_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub receivable_account: Option<EntityId>,
    /// Default payable account.
    #[serde(
        rename = "property_account_payable_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub payable_account: Option<EntityId>,
}

/// Lazy sequence of partner payloads.
///
/// Finite and non-restartable: it walks the rows once. Partners are deduplicated
/// on `(name, ref)`; a row without a partner name never produces a payload.
pub struct PartnerGenerator<'a> {
    rows: std::slice::Iter<'a, Row>,
    ctx: ImportContext<'a>,
    seen: HashSet<(&'a str, &'a str)>,
}

impl<'a> PartnerGenerator<'a> {
    /// Create a generator over `rows`.
    pub fn new(rows: &'a [Row], ctx: ImportContext<'a>) -> Self {
        Self {
            rows: rows.iter(),
            ctx,
            seen: HashSet::new(),
        }
    }
}

fn build_payload(
    ctx: ImportContext<'_>,
    row: &Row,
    name: &str,
    reference: &str,
) -> PartnerPayload {
    let mut payload = PartnerPayload {
        company: ctx.company.id,
        name: name.to_string(),
        reference: reference.to_string(),
        receivable_account: None,
        payable_account: None,
    };

    // Setup account properties
    let account = row
        .non_empty(columns::COMPTE_NUM)
        .and_then(|code| ctx.cache.account(code));
    if let Some(account) = account {
        match account.account_type {
            AccountType::Receivable => payload.receivable_account = Some(account.id),
            AccountType::Payable => payload.payable_account = Some(account.id),
            AccountType::Liquidity | AccountType::Other => {}
        }
    }

    payload
}

impl Iterator for PartnerGenerator<'_> {
    type Item = PartnerPayload;

    fn next(&mut self) -> Option<Self::Item> {
        for row in self.rows.by_ref() {
            let name = row.get(columns::COMP_AUX_LIB);
            let reference = row.get(columns::COMP_AUX_NUM);

            if name.is_empty() || !self.seen.insert((name, reference)) {
                continue;
            }

            let is_new = match self.ctx.cache.partner_by_name(name) {
                None => true,
                Some(existing) => !reference.is_empty() && reference != existing.reference,
            };
            if is_new {
                return Some(build_payload(self.ctx, row, name, reference));
            }
        }
        None
    }
}

//! Resolution cache.
//!
//! Maps the human-readable codes found in a FEC export to the entity handles
//! the store knows about. The cache is built once before an import starts and
//! is extended after every persistence round-trip so that later stages can
//! resolve references to freshly created entities.
//!
//! Read access goes through `&ResolutionCache`; every mutating method takes
//! `&mut self`. A stage that only holds a shared borrow cannot write to it.

use crate::entity::{AccountRef, CurrencyRef, EntityId, JournalRef, JournalType, PartnerRef};
use std::collections::HashMap;

/// Normalize an account code to its cache key.
///
/// FEC exports pad account codes with a variable run of trailing zeros, so
/// `411000` and `41100000` designate the same account.
///
/// ```
/// use fecledger_core::strip_account_code;
///
/// assert_eq!(strip_account_code("41100000"), "411");
/// assert_eq!(strip_account_code("512001"), "512001");
/// ```
#[must_use]
pub fn strip_account_code(code: &str) -> &str {
    code.trim_end_matches('0')
}

/// Lookup tables from external code to resolved entity, one per entity kind.
#[derive(Debug, Clone, Default)]
pub struct ResolutionCache {
    accounts: HashMap<String, AccountRef>,
    journals: HashMap<String, JournalRef>,
    partners_by_name: HashMap<String, PartnerRef>,
    partners_by_ref: HashMap<String, PartnerRef>,
    currencies: HashMap<String, CurrencyRef>,
}

impl ResolutionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    /// Register an account under its zero-stripped code.
    pub fn insert_account(&mut self, account: AccountRef) {
        let key = strip_account_code(&account.code).to_string();
        self.accounts.insert(key, account);
    }

    /// Resolve an account from a raw FEC account code.
    pub fn account(&self, code: &str) -> Option<&AccountRef> {
        self.accounts.get(strip_account_code(code))
    }

    /// Number of cached accounts.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    // ------------------------------------------------------------------
    // Journals
    // ------------------------------------------------------------------

    /// Register a journal under its code.
    pub fn insert_journal(&mut self, journal: JournalRef) {
        self.journals.insert(journal.code.clone(), journal);
    }

    /// Resolve a journal by exact code.
    pub fn journal(&self, code: &str) -> Option<&JournalRef> {
        self.journals.get(code)
    }

    /// Resolve a journal by store id.
    pub fn journal_by_id(&self, id: EntityId) -> Option<&JournalRef> {
        self.journals.values().find(|j| j.id == id)
    }

    /// Record a new semantic type for a cached journal.
    ///
    /// Returns `false` when no journal with that id is cached.
    pub fn set_journal_type(&mut self, id: EntityId, journal_type: JournalType) -> bool {
        match self.journals.values_mut().find(|j| j.id == id) {
            Some(journal) => {
                journal.journal_type = journal_type;
                true
            }
            None => false,
        }
    }

    /// Iterate over all cached journals.
    pub fn journals(&self) -> impl Iterator<Item = &JournalRef> {
        self.journals.values()
    }

    // ------------------------------------------------------------------
    // Partners
    // ------------------------------------------------------------------

    /// Register a partner by name and, when it has one, by reference.
    ///
    /// A later partner with the same name replaces the earlier one in the
    /// by-name table.
    pub fn insert_partner(&mut self, partner: PartnerRef) {
        if !partner.reference.is_empty() {
            self.partners_by_ref
                .insert(partner.reference.clone(), partner.clone());
        }
        self.partners_by_name.insert(partner.name.clone(), partner);
    }

    /// Resolve a partner by display name.
    pub fn partner_by_name(&self, name: &str) -> Option<&PartnerRef> {
        self.partners_by_name.get(name)
    }

    /// Resolve a partner by external reference.
    pub fn partner_by_ref(&self, reference: &str) -> Option<&PartnerRef> {
        self.partners_by_ref.get(reference)
    }

    /// Number of distinct partner names cached.
    pub fn partner_count(&self) -> usize {
        self.partners_by_name.len()
    }

    // ------------------------------------------------------------------
    // Currencies
    // ------------------------------------------------------------------

    /// Register a currency under its ISO code.
    pub fn insert_currency(&mut self, currency: CurrencyRef) {
        self.currencies.insert(currency.name.clone(), currency);
    }

    /// Resolve a currency by ISO code.
    pub fn currency(&self, name: &str) -> Option<&CurrencyRef> {
        self.currencies.get(name)
    }
}

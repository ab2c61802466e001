//! Core types for fecledger
//!
//! This crate provides the fundamental types shared by the FEC import pipeline:
//!
//! - [`Row`] - One immutable line of a FEC export, keyed by column name
//! - [`AccountRef`], [`JournalRef`], [`PartnerRef`], [`CurrencyRef`] - Resolved entity handles
//! - [`ResolutionCache`] - External codes mapped to resolved entity handles
//! - [`Move`] and [`MoveLine`] - A journal entry and its debit/credit lines
//!
//! # Example
//!
//! ```
//! use fecledger_core::{AccountRef, AccountType, EntityId, ResolutionCache};
//!
//! let mut cache = ResolutionCache::new();
//! cache.insert_account(AccountRef::new(EntityId(7), "411000", AccountType::Receivable));
//!
//! // FEC account codes carry a variable run of trailing zeros
//! assert_eq!(cache.account("4110000000").map(|a| a.id), Some(EntityId(7)));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod entity;
pub mod moves;
pub mod row;

pub use cache::{strip_account_code, ResolutionCache};
pub use entity::{
    round_to, AccountRef, AccountType, CompanyRef, CurrencyRef, EntityId, EntityKind, JournalRef,
    JournalType, PartnerRef,
};
pub use moves::{Move, MoveLine, PartnerLink};
pub use row::{columns, Row};

// Re-export commonly used external types
pub use chrono::NaiveDate;
pub use rust_decimal::Decimal;

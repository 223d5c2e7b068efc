//! Kudi Core Library
//!
//! Shared functionality for the kudi bank-alert reconciliation engine:
//! - Email body normalization (quoted-printable, entities, HTML flattening)
//! - Description-field decoding of fixed-width narration codes
//! - Multi-strategy field extraction (amount, sender name, account number)
//! - Bank-template recognition with dedicated per-bank decoders
//! - Duplicate detection and the payment-matching decision algorithm
//! - Append-only match-attempt audit log over SQLite
//! - Optional external account-name resolution

pub mod banks;
pub mod config;
pub mod db;
pub mod dedup;
pub mod description;
pub mod engine;
pub mod error;
pub mod extract;
pub mod lookup;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod similarity;

pub use banks::{BankTemplate, TemplateDecode, TemplateRegistry};
pub use config::MatchConfig;
pub use db::Database;
pub use dedup::DuplicateDetector;
pub use engine::{Outcome, Reconciler};
pub use error::{Error, Result};
pub use lookup::{AccountLookup, AccountLookupConfig, ResolvedAccount};
pub use matcher::match_payment;
pub use models::{
    AmountSource, Bank, ExtractedTransaction, ExtractionMethod, MatchAttemptRecord, MatchDecision,
    MatchResult, NewMatchAttempt, NewPaymentRequest, PendingPaymentRequest, RawEmailMessage,
    RequestStatus,
};
pub use similarity::{name_similarity, normalize_name};

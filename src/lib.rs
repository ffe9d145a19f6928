//! Offer Desk - Core Library
//! Offer composition: validated fields, reconciled quantities, guarded submission

// Public modules
pub mod core;
pub mod format;
pub mod validation;
pub mod draft;
pub mod fields;
pub mod reconcile;
pub mod submission;
pub mod wallet;
pub mod session;

// Re-exports
pub use crate::core::{Config, Error, Result};
pub use session::OfferSession;
pub use wallet::PaperWallet;

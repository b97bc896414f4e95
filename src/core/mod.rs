//! Core business logic: trip expansion, the session ledger, legal-text
//! amounts, and document generation.

pub mod amount;
pub mod compose;
pub mod expand;
pub mod ledger;

//! `travel-claims` - travel expense documents for a small utility office
//!
//! This crate turns user-entered trip descriptions into dated expense
//! line-items according to zone-based reimbursement rules, aggregates them
//! into a session ledger, and fills three pre-formatted XLSX templates
//! (expense claim, audit sheet, no-car certificates) with merge-aware safe
//! cell writes and dynamic row insertion.

// Deny the most critical lints that could lead to bugs
#![deny(
    unsafe_code,
    unsafe_op_in_unsafe_fn,
    unreachable_code,
    unreachable_patterns,
    unused_must_use,
    rustdoc::broken_intra_doc_links
)]
// Warn on things that should be fixed but aren't necessarily bugs
#![warn(
    clippy::all,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::semicolon_if_nothing_returned,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

/// Command-line surface over the settings store and generation pipeline
pub mod cli;
/// Persisted JSON settings store (claimants, rates, station, template paths)
pub mod config;
/// Core business logic - trip expansion, ledger, amounts, composition
pub mod core;
/// Unified error types and result handling
pub mod errors;
/// Shared data model - zones, rates, line-items, claimants
pub mod models;
/// Spreadsheet primitives - addressing, worksheet model, XLSX packages
pub mod sheet;

#[cfg(test)]
pub mod test_utils;

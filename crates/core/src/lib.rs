//! Core business logic for the loyalty platform.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `auth` - Platform roles and password hashing
//! - `points` - Earning calculation and purchase amount parsing
//! - `customer_code` - Human-readable customer identifiers
//! - `profile` - Membership tiers and the seeded defaults
//! - `business` - Business lifecycle and branding rules
//! - `qr` - QR payloads and registration deep links
//! - `ledger` - Wallet movements, running balances, reconciliation

pub mod auth;
pub mod business;
pub mod customer_code;
pub mod ledger;
pub mod points;
pub mod profile;
pub mod qr;

#[cfg(test)]
mod points_props;

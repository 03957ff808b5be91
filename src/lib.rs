//! # Vendor Console Library
//!
//! Operator console for vendor tenants: each vendor declares its tables as a
//! JSON schema, and the console provisions them in the shared database with
//! row-level security keyed on the vendor slug.

pub mod auth;
pub mod config;
pub mod console;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod procedures;
pub mod provisioning;
pub mod repositories;
pub mod server;
pub mod services;
pub mod telemetry;
pub use migration;

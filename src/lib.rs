//! ARBWATCH: terminal controller for a sports-betting arbitrage scanner
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod backend;
pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod engine;
pub mod notify;
pub mod session;
pub mod terminal;
pub mod types;
pub mod view;

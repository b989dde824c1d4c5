//! collections-service: multi-tenant accounts-receivable collections engine.
//!
//! The engine owns the invoice status state machine, the parallel
//! collection-case state machine, role-based permission gates, idempotent
//! organization provisioning, and bulk mutation with per-item failure
//! isolation. Persistence is reached through the repository traits in
//! [`store`]; an in-memory reference implementation backs the test suites.

pub mod config;
pub mod models;
pub mod services;
pub mod store;

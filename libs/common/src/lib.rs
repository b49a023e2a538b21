//! Common library for the marketplace backend
//!
//! This crate provides the infrastructure shared by the marketplace
//! services: PostgreSQL connection pooling, schema migrations, and the
//! database error taxonomy.

pub mod database;
pub mod error;

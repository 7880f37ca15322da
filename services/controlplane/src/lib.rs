//! Lattice control-plane library crate.
//!
//! # Purpose
//! Exposes the role graph and grant stores, the management HTTP API,
//! configuration, and observability wiring for use by the binary and tests.
//!
//! # Notes
//! Domain primitives (resources, privileges, versions, error kinds) live in
//! `lattice-authz`; this crate adds persistence and transport.
pub mod api;
pub mod app;
pub mod config;
pub mod model;
pub mod observability;
pub mod store;

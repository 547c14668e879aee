//! # nimbus-setup-common
//!
//! Shared error definitions and constants used across the entire
//! nimbus-configure workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and provides the failure taxonomy that every step of the
//! setup sequence reports through.

pub mod constants;
pub mod error;

//! External collaborators invoked by the setup sequence.
//!
//! Nothing here implements PKI, keystores or the container's configuration
//! schema. Those live in Java tools shipped with the installation, and this
//! crate only knows how to find them, call them and interpret their exit
//! status. Everything goes through a [`process::ProcessRunner`] so callers can
//! substitute a fake in tests.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod autoca;
pub mod container;
pub mod derby;
pub mod java;
pub mod pathutil;
pub mod process;
pub mod ssl;
pub mod toolkit;

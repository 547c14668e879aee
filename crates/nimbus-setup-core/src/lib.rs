//! Configuration store, interactive prompts and the setup orchestrator.
//!
//! [`setup::NimbusSetup`] drives a run: it resolves paths from the layered
//! [`config::SetupConfig`], validates the installation, asks for whatever is
//! missing through a [`prompt::Prompter`], calls out to the
//! [`nimbus_setup_tools::toolkit::Toolkit`], and writes the generated files in
//! [`artifacts`].

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod actions;
pub mod artifacts;
pub mod config;
pub mod paths;
pub mod prompt;
pub mod setup;

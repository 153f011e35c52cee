//! # Fortress Regression Harness
//!
//! End-to-end test orchestration for the Fortress application security
//! platform: fixture builders with collision-free naming, action façades
//! that drive business workflows and poll them to their expected states,
//! cross-session identity switching, and the verification oracles (SQL,
//! mail capture, bug tracker) the suites use where the product's API
//! surface is not enough.
//!
//! The regression suites themselves live under `tests/`; they are gated on
//! `FORTRESS_E2E=1` because they need a live lab environment. Everything in
//! this library is also unit-tested in isolation.
//!
//! ## Layering
//!
//! - [`fixtures`] - randomized-but-valid domain objects ([`runtag`] keeps
//!   names unique across parallel runs sharing one environment)
//! - [`actions`] - one call per business workflow, polling via [`wait`]
//! - [`session`] - one authenticated client per principal, consumed on
//!   log-off so identities cannot leak between scenario steps
//! - [`selection`] - grouped-audit checkbox semantics
//! - [`db`] / [`mail`] / [`bugtracker`] - verification backdoors, kept
//!   visibly separate from the black-box actions
//! - [`retry`] - coarse scenario-level retry for flaky lab conditions

pub mod actions;
pub mod bugtracker;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod fixtures;
pub mod mail;
pub mod retry;
pub mod runtag;
pub mod selection;
pub mod session;
pub mod wait;

pub use config::EnvConfig;
pub use error::{HarnessError, Result};
pub use session::Session;

//! Action façades: one call per business workflow.
//!
//! Each function drives a named workflow end-to-end against the product and
//! blocks (polls) until it reaches the expected state, returning typed data
//! for the next step. Failures surface as typed harness errors carrying
//! observed vs expected state; nothing is swallowed.

pub mod applications;
pub mod entitlements;
pub mod issues;
pub mod releases;
pub mod scans;
pub mod subscriptions;
pub mod tenants;

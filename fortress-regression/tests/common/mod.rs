//! Shared plumbing for the live regression suites.
//!
//! Every live suite starts with [`live`]: it returns `None` (after printing
//! why) unless `FORTRESS_E2E=1` and the environment is fully configured, so
//! `cargo test` stays green on machines without a lab environment. Suites
//! run `#[serial]` because the environment is shared.

#![allow(dead_code)] // each suite binary uses a different subset of this module

use fortress_regression::actions::tenants::{self, ProvisionedTenant};
use fortress_regression::config::EnvConfig;
use fortress_regression::error::Result;
use fortress_regression::fixtures::TenantFixture;
use fortress_regression::session::Session;

/// Initialize test logging once per binary.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info,fortress_regression=debug"),
    )
    .is_test(true)
    .try_init();
}

/// Live-environment context for one suite.
pub struct LiveContext {
    pub config: EnvConfig,
}

/// Gate for live suites. Returns `None` (and says why) when the live
/// environment is not opted in or not configured.
pub fn live() -> Option<LiveContext> {
    init_logging();
    if !EnvConfig::e2e_enabled() {
        eprintln!("skipping live suite: FORTRESS_E2E is not enabled");
        return None;
    }
    match EnvConfig::from_env() {
        Ok(config) => Some(LiveContext { config }),
        Err(err) => {
            eprintln!("skipping live suite: {err}");
            None
        }
    }
}

impl LiveContext {
    /// Fresh operator session.
    pub async fn admin(&self) -> Result<Session> {
        Session::admin(&self.config).await
    }

    /// Provision a tenant through a short-lived admin session.
    pub async fn provision_tenant(&self, fixture: &TenantFixture) -> Result<ProvisionedTenant> {
        let admin = self.admin().await?;
        let provisioned = tenants::create_tenant(&admin, fixture).await?;
        admin.log_off().await?;
        Ok(provisioned)
    }

    /// TAM session for a tenant this run provisioned.
    pub async fn tam(&self, fixture: &TenantFixture, tenant_code: &str) -> Result<Session> {
        Session::tam(&self.config, tenant_code, &fixture.tam_username).await
    }

    /// Read a payload fixture, with a pointed message when the payload pack
    /// is missing from the runner.
    pub fn payload(&self, relative: &str) -> Vec<u8> {
        self.config.load_payload(relative).unwrap_or_else(|err| {
            panic!(
                "payload fixture '{relative}' unavailable under '{}': {err}",
                self.config.payload_dir
            )
        })
    }
}

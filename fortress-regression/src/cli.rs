//! CLI for environment preflight, smoke checks, and run cleanup.
//!
//! CI invokes `preflight` before a suite run so a broken environment fails
//! in seconds instead of half-way through a scan wait, and `cleanup` after,
//! to neuter everything a tagged run left behind.

use clap::{Parser, Subcommand};
use log::{error, info, warn};

use crate::actions::{applications, releases, tenants};
use crate::bugtracker::DefectTracker;
use crate::config::EnvConfig;
use crate::db::SqlOracle;
use crate::error::Result;
use crate::fixtures::{ApplicationFixture, ReleaseFixture, TenantFixture};
use crate::mail::MailSpy;
use crate::retry::with_retries;
use crate::runtag;
use crate::session::Session;

#[derive(Parser)]
#[command(name = "fortress-regression")]
#[command(about = "Environment tooling for the Fortress regression suites")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate that every configured collaborator is reachable
    Preflight,
    /// Run a minimal tenant -> application -> release round trip
    Smoke,
    /// Disable entitlements of every tenant created by a tagged run
    Cleanup {
        /// Run tag to clean up (defaults to this process's tag)
        #[arg(long = "run-tag")]
        run_tag: Option<String>,
    },
}

/// Execute the parsed command. Returns a process exit code.
#[must_use]
pub async fn execute(args: Args) -> i32 {
    let config = match EnvConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            return 2;
        }
    };

    let outcome = match args.command {
        Commands::Preflight => preflight(&config).await,
        Commands::Smoke => smoke(&config).await,
        Commands::Cleanup { run_tag } => {
            cleanup(&config, run_tag.as_deref().unwrap_or_else(|| runtag::run_tag())).await
        }
    };

    match outcome {
        Ok(()) => 0,
        Err(err) => {
            error!("{err}");
            1
        }
    }
}

async fn preflight(config: &EnvConfig) -> Result<()> {
    info!("preflight: admin site login");
    // Logins are idempotent, so transient lab hiccups get absorbed here
    // instead of failing the whole preflight.
    let admin = with_retries("admin login", 2, || async move {
        Session::admin(config).await
    })
    .await?;
    let _ = admin.client().tenant_api().search_tenants("preflight").await?;
    info!("  admin site OK");

    if let Some(database_url) = &config.database_url {
        info!("preflight: database oracle");
        let _ = SqlOracle::connect(database_url).await?;
        info!("  database OK");
    } else {
        warn!("  database oracle not configured, SQL-backed suites will skip");
    }

    if let Some(mail_url) = &config.mail_url {
        info!("preflight: mail capture server");
        let spy = MailSpy::new(mail_url);
        let _ = spy.messages_for("preflight@mail.fortress.test").await?;
        info!("  mail capture OK");
    } else {
        warn!("  mail capture not configured, email suites will skip");
    }

    match (
        &config.bugtracker_url,
        &config.bugtracker_client_id,
        &config.bugtracker_client_secret,
    ) {
        (Some(url), Some(id), Some(secret)) => {
            info!("preflight: bug tracker");
            let mut tracker = DefectTracker::new(url, id, secret);
            tracker.authenticate().await?;
            info!("  bug tracker OK");
        }
        _ => warn!("  bug tracker not configured, bug-tracker suites will skip"),
    }

    admin.log_off().await?;
    info!("preflight passed");
    Ok(())
}

async fn smoke(config: &EnvConfig) -> Result<()> {
    info!("smoke: provisioning a throwaway tenant");
    let admin = Session::admin(config).await?;
    let tenant_fixture = TenantFixture::default_instance();
    let provisioned = tenants::create_tenant(&admin, &tenant_fixture).await?;
    admin.log_off().await?;

    info!("smoke: TAM round trip");
    let tenant_code = provisioned.tenant.tenant_code.clone();
    let tam = with_retries("TAM login", 2, || {
        let tenant_code = tenant_code.clone();
        let tam_username = tenant_fixture.tam_username.clone();
        async move { Session::tam(config, &tenant_code, &tam_username).await }
    })
    .await?;
    let (application, first_release) =
        applications::create_application(&tam, &ApplicationFixture::default_instance()).await?;
    let second = releases::create_release(
        &tam,
        application.id,
        &ReleaseFixture::default_instance(),
    )
    .await?;
    info!(
        "smoke: application {} with releases {} and {}",
        application.application_name, first_release.release_name, second.release_name
    );
    tam.log_off().await?;

    info!("smoke passed (run tag {})", runtag::run_tag());
    Ok(())
}

async fn cleanup(config: &EnvConfig, run_tag: &str) -> Result<()> {
    info!("cleanup: looking for tenants tagged '{run_tag}'");
    let admin = Session::admin(config).await?;
    let tenants = admin.client().tenant_api().search_tenants(run_tag).await?;

    if tenants.is_empty() {
        info!("cleanup: nothing to do");
    }
    for tenant in &tenants {
        info!("cleanup: disabling entitlements of '{}'", tenant.tenant_name);
        if let Err(err) = admin.client().entitlements_api().disable_all(tenant.id).await {
            // Best effort: a tenant mid-provisioning rejects this; the lab
            // environment reaper owns full teardown.
            warn!("cleanup: could not disable '{}': {err}", tenant.tenant_name);
        }
    }
    info!("cleanup finished ({} tenant(s))", tenants.len());
    admin.log_off().await?;
    Ok(())
}

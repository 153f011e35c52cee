//! Entitlement workflows and usage verification.
//!
//! Consumption counters update asynchronously after scan transitions, so
//! every verification here polls rather than reading once.

use std::time::Duration;

use fortress_platform::{Entitlement, EntitlementType};
use log::info;

use crate::error::Result;
use crate::fixtures::EntitlementFixture;
use crate::session::Session;
use crate::wait::{self, Compare, WaitOptions};

/// Ledger updates land within a couple of minutes.
const USAGE_TIMEOUT: Duration = Duration::from_secs(120);

/// Create entitlements for a tenant (operator action).
///
/// # Errors
///
/// Propagates API failures.
pub async fn create_entitlements(
    admin: &Session,
    tenant_id: u64,
    fixtures: &[EntitlementFixture],
) -> Result<Vec<Entitlement>> {
    let client = admin.client();
    let mut created = Vec::with_capacity(fixtures.len());
    for fixture in fixtures {
        let entitlement = client
            .entitlements_api()
            .create_entitlement(&fixture.to_request(tenant_id))
            .await?;
        info!(
            "created {} entitlement ({} units) for tenant {tenant_id}",
            fixture.entitlement_type.as_str(),
            fixture.quantity_purchased
        );
        created.push(entitlement);
    }
    Ok(created)
}

/// Admin-side purchased/consumed totals for one entitlement type.
///
/// # Errors
///
/// Propagates API failures.
pub async fn admin_usage(
    admin: &Session,
    tenant_id: u64,
    entitlement_type: EntitlementType,
) -> Result<(u64, u64)> {
    let rows = admin
        .client()
        .entitlements_api()
        .list_for_tenant(tenant_id, Some(entitlement_type))
        .await?;
    Ok(totals(&rows))
}

/// Poll the admin-side view until consumed matches the expectation, then
/// return (purchased, consumed).
///
/// # Errors
///
/// `WaitTimeout` carrying the last observed "purchased/consumed" string.
pub async fn wait_admin_usage(
    admin: &Session,
    tenant_id: u64,
    entitlement_type: EntitlementType,
    expected_purchased: u64,
    expected_consumed: u64,
) -> Result<(u64, u64)> {
    wait_usage(
        &format!(
            "admin {} entitlement usage for tenant {tenant_id}",
            entitlement_type.as_str()
        ),
        expected_purchased,
        expected_consumed,
        || async move { admin_usage(admin, tenant_id, entitlement_type).await },
    )
    .await
}

/// Tenant-side purchased/consumed totals across Fortify entitlements, as
/// the dashboard shows them.
///
/// # Errors
///
/// Propagates API failures.
pub async fn tenant_usage(portal: &Session) -> Result<(u64, u64)> {
    let rows = portal.client().entitlements_api().tenant_usage().await?;
    let fortify: Vec<Entitlement> = rows
        .into_iter()
        .filter(|e| e.entitlement_type == EntitlementType::Fortify)
        .collect();
    Ok(totals(&fortify))
}

/// Poll the tenant dashboard until consumed matches the expectation.
///
/// # Errors
///
/// `WaitTimeout` carrying the last observed "purchased/consumed" string.
pub async fn wait_tenant_usage(
    portal: &Session,
    expected_purchased: u64,
    expected_consumed: u64,
) -> Result<(u64, u64)> {
    wait_usage(
        "tenant entitlement usage",
        expected_purchased,
        expected_consumed,
        || async move { tenant_usage(portal).await },
    )
    .await
}

/// Disable every entitlement of a tenant.
///
/// # Errors
///
/// Propagates API failures.
pub async fn disable_all(admin: &Session, tenant_id: u64) -> Result<()> {
    info!("disabling all entitlements of tenant {tenant_id}");
    admin.client().entitlements_api().disable_all(tenant_id).await?;
    Ok(())
}

/// Whether the tenant currently sees no enabled entitlement at all.
///
/// # Errors
///
/// Propagates API failures.
pub async fn all_disabled(portal: &Session) -> Result<bool> {
    let rows = portal.client().entitlements_api().tenant_usage().await?;
    Ok(rows.iter().all(|e| !e.enabled))
}

async fn wait_usage<F, Fut>(
    what: &str,
    expected_purchased: u64,
    expected_consumed: u64,
    supplier: F,
) -> Result<(u64, u64)>
where
    F: Fn() -> Fut + Copy,
    Fut: std::future::Future<Output = Result<(u64, u64)>>,
{
    let expected = format!("{expected_purchased}/{expected_consumed}");
    wait::wait_for_value(
        what,
        Compare::Equals,
        &expected,
        &WaitOptions::timeout(USAGE_TIMEOUT),
        move || async move {
            let (purchased, consumed) = supplier().await?;
            Ok(format!("{purchased}/{consumed}"))
        },
    )
    .await?;
    Ok((expected_purchased, expected_consumed))
}

fn totals(rows: &[Entitlement]) -> (u64, u64) {
    rows.iter().fold((0, 0), |(purchased, consumed), row| {
        (
            purchased + row.quantity_purchased,
            consumed + row.quantity_consumed,
        )
    })
}

//! Tenant provisioning workflows.

use std::time::Duration;

use fortress_platform::{Entitlement, Tenant};
use log::info;

use crate::error::{HarnessError, Result};
use crate::fixtures::TenantFixture;
use crate::session::Session;
use crate::wait::{self, Compare, WaitOptions};

/// Provisioning can take a couple of minutes on a busy lab environment.
const PROVISIONING_TIMEOUT: Duration = Duration::from_secs(180);

/// Outcome of a tenant provisioning workflow.
#[derive(Debug)]
pub struct ProvisionedTenant {
    pub tenant: Tenant,
    pub entitlements: Vec<Entitlement>,
}

/// Create a tenant, wait for provisioning to finish, then attach the
/// fixture's entitlement (if any).
///
/// # Errors
///
/// `ElementNotCreated` when the tenant does not materialize, `WaitTimeout`
/// when provisioning never reaches Active.
pub async fn create_tenant(admin: &Session, fixture: &TenantFixture) -> Result<ProvisionedTenant> {
    info!("creating tenant '{}'", fixture.tenant_name);
    let client = admin.client();
    let tenant = client.tenant_api().create_tenant(&fixture.to_request()).await?;
    let tenant_id = tenant.id;

    wait::wait_for_value(
        &format!("tenant '{}' provisioning", fixture.tenant_name),
        Compare::Equals,
        "Active",
        &WaitOptions::timeout(PROVISIONING_TIMEOUT),
        || async move {
            let current = client.tenant_api().get_tenant(tenant_id).await?;
            Ok(current.status)
        },
    )
    .await?;

    let tenant = client
        .tenant_api()
        .get_tenant_by_name(&fixture.tenant_name)
        .await?
        .ok_or_else(|| {
            HarnessError::ElementNotCreated(format!(
                "tenant '{}' absent after provisioning",
                fixture.tenant_name
            ))
        })?;

    let mut entitlements = Vec::new();
    if let Some(entitlement_fixture) = &fixture.entitlement {
        let created = client
            .entitlements_api()
            .create_entitlement(&entitlement_fixture.to_request(tenant.id))
            .await?;
        entitlements.push(created);
    }

    info!(
        "tenant '{}' provisioned (id {}, {} entitlement(s))",
        tenant.tenant_name,
        tenant.id,
        entitlements.len()
    );
    Ok(ProvisionedTenant { tenant, entitlements })
}

/// Count event-log entries of a given type for a tenant.
///
/// # Errors
///
/// Propagates API failures.
pub async fn event_log_count(admin: &Session, tenant_id: u64, event_type: &str) -> Result<usize> {
    let log = admin.client().tenant_api().event_log(tenant_id).await?;
    Ok(log.iter().filter(|e| e.event_type == event_type).count())
}

//! Role-gated entitlement consumption: a user whose role denies consuming
//! entitlements cannot start scans that would consume them, and the event
//! log records exactly one consumption for the scan the TAM ran.

mod common;

use fortress_platform::{EntitlementType, ScanError};
use fortress_regression::actions::{applications, entitlements, scans, tenants};
use fortress_regression::fixtures::{
    ApplicationFixture, EntitlementFixture, RoleFixture, StaticScanFixture, TenantFixture,
    TenantUserFixture,
};
use fortress_regression::session::Session;
use fortress_regression::HarnessError;
use serial_test::serial;

const STATIC_PAYLOAD: &str = "fod/PerfStuffExtractor.zip";
const CONSUMED_EVENT: &str = "Tenant Entitlement Consumed";
const DENIED_MESSAGE: &str = "Your role does not allow you to consume entitlements.";

#[tokio::test]
#[serial]
async fn role_without_consumption_cannot_start_scans() {
    let Some(ctx) = common::live() else { return };

    let tenant_fixture = TenantFixture::default_instance()
        .with_options(&["Allow Binary Scanning"]);
    let provisioned = ctx
        .provision_tenant(&tenant_fixture)
        .await
        .expect("tenant should provision");
    let tenant_id = provisioned.tenant.id;
    let tenant_code = provisioned.tenant.tenant_code.clone();

    let admin = ctx.admin().await.expect("admin login");
    entitlements::create_entitlements(
        &admin,
        tenant_id,
        &[EntitlementFixture::default_of_type(EntitlementType::Debricked)],
    )
    .await
    .expect("debricked entitlement");

    let (_, initial_fortify) =
        entitlements::admin_usage(&admin, tenant_id, EntitlementType::Fortify)
            .await
            .expect("fortify usage");
    let (_, initial_debricked) =
        entitlements::admin_usage(&admin, tenant_id, EntitlementType::Debricked)
            .await
            .expect("debricked usage");

    // TAM provisions the restricted role and user.
    let tam = ctx.tam(&tenant_fixture, &tenant_code).await.expect("tam login");
    let role_fixture = RoleFixture::default_instance().denying_entitlement_consumption();
    tam.client()
        .identity_api()
        .create_role(&role_fixture.to_request())
        .await
        .expect("restricted role");

    let user_fixture = TenantUserFixture::default_instance();
    let user = tam
        .client()
        .identity_api()
        .create_user(&user_fixture.to_request())
        .await
        .expect("restricted user");
    tam.client()
        .identity_api()
        .assign_role(user.id, &role_fixture.role_name)
        .await
        .expect("role assigned");

    let (_, release) =
        applications::create_application(&tam, &ApplicationFixture::default_instance())
            .await
            .expect("application");
    tam.log_off().await.expect("tam log off");

    // The restricted user may not start a plain static scan...
    let restricted = Session::tenant_user(
        &ctx.config,
        &tenant_code,
        &user_fixture.user_name,
        &user_fixture.password,
    )
    .await
    .expect("restricted user login");

    let err = scans::start_static_scan(
        &restricted,
        &StaticScanFixture::default_instance(),
        release.id,
        ctx.payload(STATIC_PAYLOAD),
    )
    .await
    .expect_err("restricted role must not consume entitlements");
    match err {
        HarnessError::Scan(ScanError::ConsumptionDenied(msg)) => {
            assert!(msg.contains(DENIED_MESSAGE), "got: {msg}");
        }
        other => panic!("expected consumption denial, got: {other}"),
    }

    // ...nor one with software composition analysis enabled.
    let err = scans::start_static_scan(
        &restricted,
        &StaticScanFixture::default_instance().with_open_source_component(true),
        release.id,
        ctx.payload(STATIC_PAYLOAD),
    )
    .await
    .expect_err("open source consumption is also denied");
    match err {
        HarnessError::Scan(ScanError::ConsumptionDenied(msg)) => {
            assert!(msg.contains("consume entitlements"), "got: {msg}");
        }
        other => panic!("expected consumption denial, got: {other}"),
    }
    restricted.log_off().await.expect("restricted log off");

    // The TAM's role does consume: run one static scan to completion.
    let tam = ctx.tam(&tenant_fixture, &tenant_code).await.expect("tam relogin");
    let scan = scans::start_static_scan(
        &tam,
        &StaticScanFixture::default_instance(),
        release.id,
        ctx.payload(STATIC_PAYLOAD),
    )
    .await
    .expect("tam static scan starts");
    scans::complete_scan_admin(&admin, scan.scan_id)
        .await
        .expect("scan completes");

    // Exactly one consumption event, fortify consumed moved, debricked
    // untouched.
    let consumed_events = tenants::event_log_count(&admin, tenant_id, CONSUMED_EVENT)
        .await
        .expect("event log readable");
    assert_eq!(consumed_events, 1, "exactly one consumption event expected");

    let (_, fortify_consumed) =
        entitlements::admin_usage(&admin, tenant_id, EntitlementType::Fortify)
            .await
            .expect("fortify usage");
    assert!(
        fortify_consumed > initial_fortify,
        "fortify consumption should grow ({initial_fortify} -> {fortify_consumed})"
    );
    let (_, debricked_consumed) =
        entitlements::admin_usage(&admin, tenant_id, EntitlementType::Debricked)
            .await
            .expect("debricked usage");
    assert_eq!(
        debricked_consumed, initial_debricked,
        "debricked consumption must not move"
    );

    tam.log_off().await.expect("tam log off");
    admin.log_off().await.expect("admin log off");
}

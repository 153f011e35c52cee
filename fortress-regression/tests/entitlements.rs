//! Entitlement consumption lifecycle.
//!
//! Creates a Units-model tenant with purchased entitlements, runs scan sets
//! through their lifecycle, and verifies the consumed counter after every
//! transition: completion charges, remediation is free, cancel without
//! refund keeps the charge, cancel with refund credits it back, and a
//! second subscription scan in the same period neither charges nor refunds.

mod common;

use fortress_platform::{
    EntitlementFrequency, EntitlementModel, EntitlementType, PaymentModel, ScanStatus,
    SubscriptionModel,
};
use fortress_regression::actions::{applications, entitlements, scans};
use fortress_regression::fixtures::{
    ApplicationFixture, DynamicScanFixture, EntitlementFixture, MobileScanFixture,
    StaticScanFixture, TenantFixture,
};
use fortress_regression::HarnessError;
use serial_test::serial;

// Environment fixture facts: unit costs are configured per assessment type
// in the lab environment and tied to the canonical payloads below. They are
// not derivable from this repository.
const STATIC_PAYLOAD: &str = "fod/PerfStuffExtractor.zip";
const MOBILE_PAYLOAD: &str = "fod/mobile-payload.apk";
const SCAN_SET_UNITS: u64 = 60; // one completed static+dynamic+mobile set
const DYNAMIC_SINGLE_UNITS: u64 = 30;
const DYNAMIC_SUBSCRIPTION_UNITS: u64 = 31;
const MOBILE_SUBSCRIPTION_UNITS: u64 = 21;

#[tokio::test]
#[serial]
async fn entitlement_consumption_lifecycle() {
    let Some(ctx) = common::live() else { return };

    let fortify = EntitlementFixture::default_instance().with_quantity(200);
    let sonatype =
        EntitlementFixture::default_of_type(EntitlementType::Sonatype).with_quantity(100);

    let tenant_fixture = TenantFixture::default_instance()
        .with_entitlement(fortify)
        .with_entitlement_model(EntitlementModel::Units)
        .with_subscription_model(SubscriptionModel::Period)
        .with_options(&["Allow scanning with no entitlements"]);

    let provisioned = ctx
        .provision_tenant(&tenant_fixture)
        .await
        .expect("tenant should provision");
    let tenant_id = provisioned.tenant.id;
    let tenant_code = provisioned.tenant.tenant_code.clone();

    let admin = ctx.admin().await.expect("admin login");
    entitlements::create_entitlements(&admin, tenant_id, std::slice::from_ref(&sonatype))
        .await
        .expect("sonatype entitlement");

    // Applications for the web and mobile scan sets
    let tam = ctx.tam(&tenant_fixture, &tenant_code).await.expect("tam login");
    let (_web_app, web_release) =
        applications::create_application(&tam, &ApplicationFixture::default_instance())
            .await
            .expect("web application");
    let (_mobile_app, mobile_release) =
        applications::create_application(&tam, &ApplicationFixture::default_mobile_instance())
            .await
            .expect("mobile application");

    entitlements::wait_admin_usage(&admin, tenant_id, EntitlementType::Sonatype, 100, 0)
        .await
        .expect("sonatype starts unconsumed");
    entitlements::wait_tenant_usage(&tam, 200, 0)
        .await
        .expect("fortify starts unconsumed");

    // --- complete one static+dynamic+mobile set -------------------------
    let static_fixture = StaticScanFixture::default_instance()
        .with_technology_stack(fortress_platform::TechnologyStack::DotNet, Some("3.5"))
        .with_include_third_party(false)
        .with_open_source_component(true)
        .with_payload(STATIC_PAYLOAD);
    let dynamic_fixture = DynamicScanFixture::default_instance().starting_in_future();
    let mobile_fixture = MobileScanFixture::default_instance();

    let static_scan = scans::start_static_scan(
        &tam,
        &static_fixture,
        web_release.id,
        ctx.payload(STATIC_PAYLOAD),
    )
    .await
    .expect("static scan starts");
    let dynamic_scan = scans::start_dynamic_scan(
        &tam,
        &dynamic_fixture,
        web_release.id,
        ScanStatus::Scheduled,
    )
    .await
    .expect("dynamic scan schedules");
    let mobile_scan = scans::start_mobile_scan(
        &tam,
        &mobile_fixture,
        mobile_release.id,
        ctx.payload(MOBILE_PAYLOAD),
    )
    .await
    .expect("mobile scan starts");

    scans::complete_scan_admin(&admin, static_scan.scan_id)
        .await
        .expect("static completes");
    scans::complete_scan_admin(&admin, dynamic_scan.scan_id)
        .await
        .expect("dynamic completes");
    scans::complete_scan_admin(&admin, mobile_scan.scan_id)
        .await
        .expect("mobile completes");

    entitlements::wait_admin_usage(&admin, tenant_id, EntitlementType::Sonatype, 100, 1)
        .await
        .expect("open source component consumed one sonatype unit");
    entitlements::wait_tenant_usage(&tam, 200, SCAN_SET_UNITS)
        .await
        .expect("completed set charges 60 units");

    // --- remediation set is free of charge ------------------------------
    let static_remediation = static_fixture.clone().remediation();
    let dynamic_remediation = dynamic_fixture.clone().remediation().starting_in_future();
    let mobile_remediation = mobile_fixture.clone().remediation();

    let static_scan = scans::start_static_scan(
        &tam,
        &static_remediation,
        web_release.id,
        ctx.payload(STATIC_PAYLOAD),
    )
    .await
    .expect("remediation static starts");
    let dynamic_scan = scans::start_dynamic_scan(
        &tam,
        &dynamic_remediation,
        web_release.id,
        ScanStatus::Scheduled,
    )
    .await
    .expect("remediation dynamic schedules");
    let mobile_scan = scans::start_mobile_scan(
        &tam,
        &mobile_remediation,
        mobile_release.id,
        ctx.payload(MOBILE_PAYLOAD),
    )
    .await
    .expect("remediation mobile starts");

    scans::complete_scan_admin(&admin, static_scan.scan_id)
        .await
        .expect("remediation static completes");
    scans::complete_scan_admin(&admin, dynamic_scan.scan_id)
        .await
        .expect("remediation dynamic completes");
    scans::complete_scan_admin(&admin, mobile_scan.scan_id)
        .await
        .expect("remediation mobile completes");

    entitlements::wait_tenant_usage(&tam, 200, SCAN_SET_UNITS)
        .await
        .expect("remediation scans leave consumption untouched");

    // --- cancel without refund keeps the charge -------------------------
    let dynamic_single = DynamicScanFixture::default_instance().starting_in_future();
    let scan = scans::start_dynamic_scan(&tam, &dynamic_single, web_release.id, ScanStatus::Scheduled)
        .await
        .expect("single dynamic schedules");
    scans::cancel_scan_admin(&admin, scan.scan_id, false)
        .await
        .expect("cancel without refund");
    entitlements::wait_tenant_usage(&tam, 200, SCAN_SET_UNITS + DYNAMIC_SINGLE_UNITS)
        .await
        .expect("cancel without refund keeps the 30-unit charge");

    // --- cancel with refund credits the charge back ---------------------
    let dynamic_subscription = DynamicScanFixture::default_instance()
        .starting_in_future()
        .with_entitlement(EntitlementFrequency::Subscription);
    let scan = scans::start_dynamic_scan(
        &tam,
        &dynamic_subscription,
        web_release.id,
        ScanStatus::Scheduled,
    )
    .await
    .expect("subscription dynamic schedules");
    entitlements::wait_tenant_usage(
        &tam,
        200,
        SCAN_SET_UNITS + DYNAMIC_SINGLE_UNITS + DYNAMIC_SUBSCRIPTION_UNITS,
    )
    .await
    .expect("subscription start charges 31 units");
    scans::cancel_scan_admin(&admin, scan.scan_id, true)
        .await
        .expect("cancel with refund");
    entitlements::wait_tenant_usage(&tam, 200, SCAN_SET_UNITS + DYNAMIC_SINGLE_UNITS)
        .await
        .expect("refund returns the subscription units");

    // --- completed subscription scans charge ----------------------------
    let scan = scans::start_dynamic_scan(
        &tam,
        &dynamic_subscription,
        web_release.id,
        ScanStatus::Scheduled,
    )
    .await
    .expect("subscription dynamic schedules again");
    let mobile_subscription =
        MobileScanFixture::default_instance().with_entitlement(EntitlementFrequency::Subscription);
    let mobile_scan = scans::start_mobile_scan(
        &tam,
        &mobile_subscription,
        mobile_release.id,
        ctx.payload(MOBILE_PAYLOAD),
    )
    .await
    .expect("subscription mobile starts");

    scans::complete_scan_admin(&admin, scan.scan_id)
        .await
        .expect("subscription dynamic completes");
    scans::complete_scan_admin(&admin, mobile_scan.scan_id)
        .await
        .expect("subscription mobile completes");

    let consumed_after_subscriptions = SCAN_SET_UNITS
        + DYNAMIC_SINGLE_UNITS
        + DYNAMIC_SUBSCRIPTION_UNITS
        + MOBILE_SUBSCRIPTION_UNITS;
    entitlements::wait_tenant_usage(&tam, 200, consumed_after_subscriptions)
        .await
        .expect("completed subscription scans charge");

    // --- a second entitlement raises purchased, not consumed ------------
    let second = EntitlementFixture::default_instance().with_quantity(100);
    entitlements::create_entitlements(&admin, tenant_id, std::slice::from_ref(&second))
        .await
        .expect("second entitlement");
    entitlements::wait_tenant_usage(&tam, 300, consumed_after_subscriptions)
        .await
        .expect("purchased grows to 300");

    // --- second-period subscription scans: no charge, no refund ---------
    let scan = scans::start_dynamic_scan(
        &tam,
        &dynamic_subscription,
        web_release.id,
        ScanStatus::Scheduled,
    )
    .await
    .expect("second subscription dynamic schedules");
    let mobile_scan = scans::start_mobile_scan(
        &tam,
        &mobile_subscription,
        mobile_release.id,
        ctx.payload(MOBILE_PAYLOAD),
    )
    .await
    .expect("second subscription mobile starts");

    scans::cancel_scan_admin(&admin, scan.scan_id, true)
        .await
        .expect("cancel second subscription dynamic with refund");
    scans::complete_scan_admin(&admin, mobile_scan.scan_id)
        .await
        .expect("second subscription mobile completes");

    entitlements::wait_tenant_usage(&tam, 300, consumed_after_subscriptions)
        .await
        .expect("second-period subscription scans neither charge nor refund");

    // --- disable everything and verify ----------------------------------
    entitlements::disable_all(&admin, tenant_id)
        .await
        .expect("disable all entitlements");
    let disabled = entitlements::all_disabled(&tam).await.expect("usage readable");
    assert!(disabled, "every entitlement should report disabled");

    tam.log_off().await.expect("tam log off");
    admin.log_off().await.expect("admin log off");
}

#[tokio::test]
#[serial]
async fn scans_model_rejects_scan_beyond_purchase() {
    let Some(ctx) = common::live() else { return };

    let entitlement = EntitlementFixture::default_instance()
        .with_quantity(1)
        .with_frequency(EntitlementFrequency::SingleScan)
        .scoped_to(fortress_platform::AnalysisType::Dynamic, "AUTO-DYNAMIC");
    let tenant_fixture = TenantFixture::default_instance()
        .with_entitlement(entitlement)
        .with_entitlement_model(EntitlementModel::Scans)
        .with_subscription_model(SubscriptionModel::StartOnFirstScan)
        .with_payment_model(PaymentModel::Other);

    let provisioned = ctx
        .provision_tenant(&tenant_fixture)
        .await
        .expect("tenant should provision");
    let tenant_code = provisioned.tenant.tenant_code.clone();

    let tam = ctx.tam(&tenant_fixture, &tenant_code).await.expect("tam login");
    let (_, release) =
        applications::create_application(&tam, &ApplicationFixture::default_instance())
            .await
            .expect("application");

    let dynamic = DynamicScanFixture::default_instance().starting_in_future();
    let scan = scans::start_dynamic_scan(&tam, &dynamic, release.id, ScanStatus::Scheduled)
        .await
        .expect("first scan schedules");

    let admin = ctx.admin().await.expect("admin login");
    scans::complete_scan_admin(&admin, scan.scan_id)
        .await
        .expect("first scan completes");
    entitlements::wait_tenant_usage(&tam, 1, 1)
        .await
        .expect("the single purchased scan is consumed");

    // The second scan must be rejected: the only entitlement is spent.
    let err = scans::start_dynamic_scan(&tam, &dynamic, release.id, ScanStatus::Scheduled)
        .await
        .expect_err("no entitlement left for a second scan");
    match err {
        HarnessError::Scan(scan_err) => {
            assert!(
                scan_err.to_string().contains("No active entitlement"),
                "rejection should name the missing entitlement, got: {scan_err}"
            );
        }
        other => panic!("expected a scan rejection, got: {other}"),
    }

    entitlements::disable_all(&admin, provisioned.tenant.id)
        .await
        .expect("disable entitlements");
    assert!(
        entitlements::all_disabled(&tam).await.expect("usage readable"),
        "entitlements should report disabled"
    );

    tam.log_off().await.expect("tam log off");
    admin.log_off().await.expect("admin log off");
}

//! Scan job lifecycle transitions observed from outside: pause/resume,
//! cancellation legality, and clone handling on cancel.

mod common;

use fortress_platform::{AnalysisType, ScanError, ScanStatus};
use fortress_regression::actions::{applications, scans};
use fortress_regression::db::SqlOracle;
use fortress_regression::fixtures::{ApplicationFixture, StaticScanFixture, TenantFixture};
use fortress_regression::HarnessError;
use serial_test::serial;

const STATIC_PAYLOAD: &str = "fod/PerfStuffExtractor.zip";
const FPR_PAYLOAD: &str = "fod/static.java.fpr";

#[tokio::test]
#[serial]
async fn pause_and_resume_returns_to_in_progress() {
    let Some(ctx) = common::live() else { return };

    let tenant_fixture = TenantFixture::default_instance();
    let provisioned = ctx
        .provision_tenant(&tenant_fixture)
        .await
        .expect("tenant should provision");
    let tam = ctx
        .tam(&tenant_fixture, &provisioned.tenant.tenant_code)
        .await
        .expect("tam login");

    let (_, release) =
        applications::create_application(&tam, &ApplicationFixture::default_instance())
            .await
            .expect("application");
    let scan = scans::start_static_scan(
        &tam,
        &StaticScanFixture::default_instance(),
        release.id,
        ctx.payload(STATIC_PAYLOAD),
    )
    .await
    .expect("static scan starts");

    // The scheduler picks the job up on its own; wait for it.
    scans::wait_scan_status(&tam, scan.scan_id, ScanStatus::InProgress, scans::SETUP_TIMEOUT)
        .await
        .expect("scan moves to in progress");

    let admin = ctx.admin().await.expect("admin login");
    scans::pause_scan_admin(&admin, scan.scan_id, "environment maintenance")
        .await
        .expect("scan pauses");

    // The pause bookkeeping is not exposed through any API surface; read it
    // straight from the database when the oracle is configured.
    if let Some(database_url) = &ctx.config.database_url {
        let oracle = SqlOracle::connect(database_url).await.expect("oracle connects");
        let details = oracle
            .pause_details(scan.scan_id)
            .await
            .expect("pause details readable");
        assert!(
            details.iter().any(|d| d.reason == "environment maintenance"),
            "pause reason should be recorded, got: {details:?}"
        );
    } else {
        eprintln!("database oracle not configured, skipping pause-detail check");
    }

    scans::resume_scan_admin(&admin, scan.scan_id)
        .await
        .expect("pause then resume returns the job to in progress");

    scans::complete_scan_admin(&admin, scan.scan_id)
        .await
        .expect("scan completes");

    tam.log_off().await.expect("tam log off");
    admin.log_off().await.expect("admin log off");
}

#[tokio::test]
#[serial]
async fn cancelling_terminal_scan_is_rejected_with_status() {
    let Some(ctx) = common::live() else { return };

    let tenant_fixture = TenantFixture::default_instance();
    let provisioned = ctx
        .provision_tenant(&tenant_fixture)
        .await
        .expect("tenant should provision");
    let tam = ctx
        .tam(&tenant_fixture, &provisioned.tenant.tenant_code)
        .await
        .expect("tam login");

    let (_, release) =
        applications::create_application(&tam, &ApplicationFixture::default_instance())
            .await
            .expect("application");
    let summary = scans::import_scan(
        &tam,
        release.id,
        AnalysisType::Static,
        FPR_PAYLOAD,
        ctx.payload(FPR_PAYLOAD),
    )
    .await
    .expect("import completes");

    // Cancelling a completed job is illegal; the rejection names the
    // current status so the operator knows why.
    let err = tam
        .client()
        .scan_api()
        .cancel_scan(summary.scan_id)
        .await
        .expect_err("cancel of a completed scan must be rejected");
    match err {
        ScanError::NotAllowed(msg) => {
            assert!(
                msg.contains("Completed"),
                "rejection should name the terminal status, got: {msg}"
            );
        }
        other => panic!("expected NotAllowed, got: {other}"),
    }

    tam.log_off().await.expect("tam log off");
}

#[tokio::test]
#[serial]
async fn cancel_aborts_clone_together_with_parent() {
    let Some(ctx) = common::live() else { return };

    let tenant_fixture = TenantFixture::default_instance();
    let provisioned = ctx
        .provision_tenant(&tenant_fixture)
        .await
        .expect("tenant should provision");
    let tam = ctx
        .tam(&tenant_fixture, &provisioned.tenant.tenant_code)
        .await
        .expect("tam login");

    let (_, release) =
        applications::create_application(&tam, &ApplicationFixture::default_instance())
            .await
            .expect("application");
    let scan = scans::start_static_scan(
        &tam,
        &StaticScanFixture::default_instance(),
        release.id,
        ctx.payload(STATIC_PAYLOAD),
    )
    .await
    .expect("static scan starts");

    scans::wait_scan_status(&tam, scan.scan_id, ScanStatus::InProgress, scans::SETUP_TIMEOUT)
        .await
        .expect("scan moves to in progress");

    let admin = ctx.admin().await.expect("admin login");
    let summary = scans::cancel_scan_admin(&admin, scan.scan_id, false)
        .await
        .expect("parent cancels");

    // When the audit workflow had cloned the job, the clone must not
    // survive its parent. Audit clones are scheduler-driven, so not every
    // run produces one; assert only when it exists.
    if let Some(clone_id) = summary.cloned_scan_id {
        let err = scans::wait_scan_status(
            &admin,
            clone_id,
            ScanStatus::Aborted,
            scans::SETUP_TIMEOUT,
        )
        .await;
        match err {
            Ok(_) => {}
            Err(HarnessError::UnexpectedScanStatus { observed, .. })
                if observed == ScanStatus::Canceled.as_str() => {}
            Err(other) => panic!("clone should abort with its parent: {other}"),
        }
    } else {
        eprintln!("no clone existed for scan {}, nothing more to assert", scan.scan_id);
    }

    tam.log_off().await.expect("tam log off");
    admin.log_off().await.expect("admin log off");
}

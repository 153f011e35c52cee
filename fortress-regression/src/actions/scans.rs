//! Scan workflows: start, import, complete, cancel, pause/resume.
//!
//! All waits here poll the scan summary endpoint. A terminal status other
//! than the expected one fails immediately with `UnexpectedScanStatus` - no
//! point burning the rest of a thirty-minute budget watching a cancelled
//! job stay cancelled.

use std::time::Duration;

use fortress_platform::{AnalysisType, Scan, ScanStatus, ScanSummary};
use log::info;

use crate::error::{HarnessError, Result};
use crate::fixtures::{DynamicScanFixture, MobileScanFixture, StaticScanFixture};
use crate::session::Session;
use crate::wait::{self, Compare, WaitOptions};

/// Setup transitions (queued, scheduled) are quick.
pub const SETUP_TIMEOUT: Duration = Duration::from_secs(300);
/// Real scan completion can take tens of minutes.
pub const COMPLETION_TIMEOUT: Duration = Duration::from_secs(1800);

/// Poll a scan until it reaches `expected`, failing fast when it lands in a
/// different terminal status.
///
/// # Errors
///
/// `UnexpectedScanStatus` for a wrong terminal status, `WaitTimeout` when
/// the budget expires (carrying the last observed status).
pub async fn wait_scan_status(
    session: &Session,
    scan_id: u64,
    expected: ScanStatus,
    timeout: Duration,
) -> Result<ScanSummary> {
    let client = session.client();
    let options = WaitOptions::timeout(timeout).with_interval(Duration::from_secs(5));

    wait::wait_for_value(
        &format!("scan {scan_id} reaching {expected}"),
        Compare::Equals,
        expected.as_str(),
        &options,
        || async move {
            let summary = client.scan_api().get_summary(scan_id).await?;
            let observed = summary.analysis_status_type.clone();
            if let Ok(status) = summary.status()
                && status.is_terminal()
                && status != expected
            {
                return Err(HarnessError::UnexpectedScanStatus {
                    scan_id,
                    expected,
                    observed,
                });
            }
            Ok(observed)
        },
    )
    .await?;

    Ok(client.scan_api().get_summary(scan_id).await?)
}

/// Start a static scan: create the job, upload the payload, wait for it to
/// queue.
///
/// # Errors
///
/// Propagates scan API errors; `WaitTimeout` when the job never queues.
pub async fn start_static_scan(
    portal: &Session,
    fixture: &StaticScanFixture,
    release_id: u64,
    payload: Vec<u8>,
) -> Result<Scan> {
    info!(
        "starting static scan '{}' on release {release_id}",
        fixture.assessment_type
    );
    let client = portal.client();
    let scan = client.scan_api().start_scan(&fixture.to_request(release_id)).await?;
    client
        .scan_api()
        .upload_payload(scan.scan_id, &fixture.payload_file, payload)
        .await?;
    wait_scan_status(portal, scan.scan_id, ScanStatus::Queued, SETUP_TIMEOUT).await?;
    Ok(scan)
}

/// Start a dynamic scan and wait for the expected setup status (Scheduled
/// for start-in-future scans, Queued otherwise).
///
/// # Errors
///
/// Propagates scan API errors; `WaitTimeout` on a missed setup status.
pub async fn start_dynamic_scan(
    portal: &Session,
    fixture: &DynamicScanFixture,
    release_id: u64,
    expected: ScanStatus,
) -> Result<Scan> {
    info!(
        "starting dynamic scan '{}' on release {release_id}",
        fixture.assessment_type
    );
    let client = portal.client();
    let scan = client.scan_api().start_scan(&fixture.to_request(release_id)).await?;
    wait_scan_status(portal, scan.scan_id, expected, SETUP_TIMEOUT).await?;
    Ok(scan)
}

/// Start a mobile scan: create the job, upload the binary, wait for queue.
///
/// # Errors
///
/// Propagates scan API errors; `WaitTimeout` when the job never queues.
pub async fn start_mobile_scan(
    portal: &Session,
    fixture: &MobileScanFixture,
    release_id: u64,
    payload: Vec<u8>,
) -> Result<Scan> {
    info!(
        "starting mobile scan '{}' on release {release_id}",
        fixture.assessment_type
    );
    let client = portal.client();
    let scan = client.scan_api().start_scan(&fixture.to_request(release_id)).await?;
    client
        .scan_api()
        .upload_payload(scan.scan_id, &fixture.payload_file, payload)
        .await?;
    wait_scan_status(portal, scan.scan_id, ScanStatus::Queued, SETUP_TIMEOUT).await?;
    Ok(scan)
}

/// Import existing scan results and wait for the import job to complete.
///
/// # Errors
///
/// Propagates scan API errors; `UnexpectedScanStatus`/`WaitTimeout` when
/// the import does not complete.
pub async fn import_scan(
    portal: &Session,
    release_id: u64,
    scan_type: AnalysisType,
    file_name: &str,
    payload: Vec<u8>,
) -> Result<ScanSummary> {
    info!("importing {} results into release {release_id}", scan_type.type_value());
    let client = portal.client();
    let request = fortress_platform::ImportScanRequest {
        release_id,
        scan_type,
        file_name: file_name.to_string(),
    };
    let scan = client.scan_api().import_scan(&request, payload).await?;
    wait_scan_status(portal, scan.scan_id, ScanStatus::Completed, COMPLETION_TIMEOUT).await
}

/// The newest scan of a given type on a release.
///
/// # Errors
///
/// `ElementNotFound` when the release has no scan of that type.
pub async fn latest_scan_of_type(
    portal: &Session,
    release_id: u64,
    scan_type: AnalysisType,
) -> Result<Scan> {
    let scans = portal.client().scan_api().list_scans(release_id).await?;
    scans
        .into_iter()
        .find(|s| s.scan_type == scan_type)
        .ok_or_else(|| {
            HarnessError::ElementNotFound(format!(
                "{} scan on release {release_id}",
                scan_type.type_value()
            ))
        })
}

/// Complete a scan from the admin site and wait for Completed.
///
/// # Errors
///
/// `UnexpectedScanStatus` when the job lands elsewhere.
pub async fn complete_scan_admin(admin: &Session, scan_id: u64) -> Result<ScanSummary> {
    info!("completing scan {scan_id} from admin site");
    admin.client().scan_api().complete_scan(scan_id).await?;
    wait_scan_status(admin, scan_id, ScanStatus::Completed, COMPLETION_TIMEOUT).await
}

/// Cancel a scan from the admin site, with or without an entitlement
/// refund, and wait for Canceled.
///
/// # Errors
///
/// `UnexpectedScanStatus` when the job lands elsewhere.
pub async fn cancel_scan_admin(admin: &Session, scan_id: u64, refund: bool) -> Result<ScanSummary> {
    info!("cancelling scan {scan_id} (refund: {refund})");
    admin.client().scan_api().cancel_scan_admin(scan_id, refund).await?;
    wait_scan_status(admin, scan_id, ScanStatus::Canceled, SETUP_TIMEOUT).await
}

/// Pause an in-progress scan and wait for Paused.
///
/// # Errors
///
/// `UnexpectedScanStatus` when the job lands elsewhere.
pub async fn pause_scan_admin(admin: &Session, scan_id: u64, reason: &str) -> Result<ScanSummary> {
    info!("pausing scan {scan_id}: {reason}");
    admin.client().scan_api().pause_scan(scan_id, reason).await?;
    wait_scan_status(admin, scan_id, ScanStatus::Paused, SETUP_TIMEOUT).await
}

/// Resume a paused scan and wait for it to be back in progress.
///
/// # Errors
///
/// `UnexpectedScanStatus` when the job lands elsewhere.
pub async fn resume_scan_admin(admin: &Session, scan_id: u64) -> Result<ScanSummary> {
    info!("resuming scan {scan_id}");
    admin.client().scan_api().resume_scan(scan_id).await?;
    wait_scan_status(admin, scan_id, ScanStatus::InProgress, SETUP_TIMEOUT).await
}

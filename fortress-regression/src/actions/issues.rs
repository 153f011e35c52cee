//! Issue auditing workflows.

use fortress_platform::{AuditChange, BugSubmission, GridQuery, Issue};
use log::info;

use crate::error::{HarnessError, Result};
use crate::selection::IssueSelection;
use crate::session::Session;

/// Group the release's issues, select one whole group, and apply an audit
/// change to exactly its members. Returns the audited issue ids.
///
/// # Errors
///
/// `ElementNotFound` for an unknown group, API errors otherwise.
pub async fn audit_group(
    portal: &Session,
    release_id: u64,
    group_by: &str,
    group_name: &str,
    change: &AuditChange,
) -> Result<Vec<u64>> {
    let client = portal.client();
    let groups = client.issues_api().group_issues(release_id, group_by).await?;

    let mut selection = IssueSelection::new(&groups);
    let claimed = selection.select_group(group_name)?;
    let ids = selection.selected_issue_ids();
    info!(
        "auditing group '{group_name}' on release {release_id}: {claimed} issue(s)"
    );

    client.issues_api().bulk_audit(release_id, &ids, change).await?;
    Ok(ids)
}

/// Find an issue whose primary location contains `location_part`.
///
/// # Errors
///
/// `ElementNotFound` when nothing matches.
pub async fn find_issue_by_location(
    portal: &Session,
    release_id: u64,
    location_part: &str,
) -> Result<Issue> {
    let issues = portal
        .client()
        .issues_api()
        .list_issues(release_id, &GridQuery::new())
        .await?;
    issues
        .into_iter()
        .find(|i| i.primary_location.contains(location_part))
        .ok_or_else(|| {
            HarnessError::ElementNotFound(format!(
                "issue at location containing '{location_part}' in release {release_id}"
            ))
        })
}

/// Copy audit information from one release onto others.
///
/// # Errors
///
/// Propagates API failures.
pub async fn copy_audit(
    portal: &Session,
    source_release_id: u64,
    target_release_ids: Vec<u64>,
    include_attachments: bool,
) -> Result<()> {
    info!(
        "copying audit information from release {source_release_id} to {:?}",
        target_release_ids
    );
    let request = fortress_platform::CopyAuditRequest {
        source_release_id,
        target_release_ids,
        include_attachments,
    };
    portal.client().issues_api().copy_audit(&request).await?;
    Ok(())
}

/// Submit issues to the configured bug tracker as one defect.
///
/// # Errors
///
/// `ElementNotCreated` when the product returns no defect reference.
pub async fn submit_bug(
    portal: &Session,
    release_id: u64,
    issue_ids: &[u64],
    description: &str,
) -> Result<BugSubmission> {
    let submission = portal
        .client()
        .issues_api()
        .submit_bug(release_id, issue_ids, description)
        .await?;
    if submission.bug_id.is_empty() {
        return Err(HarnessError::ElementNotCreated(format!(
            "defect for issues {issue_ids:?} has no id"
        )));
    }
    info!("submitted defect {} ({})", submission.bug_id, submission.bug_url);
    Ok(submission)
}

//! Release issues: listing, grouping, auditing, history, attachments,
//! copy-audit, and bug-tracker submission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Site;
use crate::grid::{Grid, GridQuery};
use crate::{FortressClient, FortressError};

/// Issue severity as audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A vulnerability finding scoped to a release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub release_id: u64,
    pub release_name: String,
    pub primary_location: String,
    pub severity: Severity,
    pub scan_type: String,
    /// Engine that produced the finding ("Fortress", "Debricked", ...).
    pub scan_tool: String,
    pub audited: bool,
    #[serde(default)]
    pub has_attachments: bool,
    pub auditor_status: Option<String>,
    pub developer_status: Option<String>,
    pub assigned_user: Option<String>,
    /// Stable instance identifier carried across copy-state releases.
    pub instance_id: Option<String>,
    /// External defect link once the issue was submitted to a bug tracker.
    pub bug_url: Option<String>,
}

/// A group row when issues are grouped server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueGroup {
    pub name: String,
    pub count: u64,
    pub issue_ids: Vec<u64>,
}

/// Per-severity issue counters shown on the issues page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
    pub info: u64,
}

/// Bulk audit changes; unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditChange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auditor_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub developer_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl AuditChange {
    #[must_use]
    pub fn severity(severity: Severity) -> Self {
        Self {
            severity: Some(severity),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    #[must_use]
    pub fn with_assigned_user(mut self, user: impl Into<String>) -> Self {
        self.assigned_user = Some(user.into());
        self
    }
}

/// One audit-trail event on an issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub event: String,
    pub user: String,
    pub occurred: Option<DateTime<Utc>>,
}

/// A comment on an issue. Comments copied from another release arrive with
/// a "[Copied]" prefix the product adds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueComment {
    pub text: String,
    pub user: String,
}

/// An attachment on an issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueAttachment {
    pub id: u64,
    pub file_name: String,
}

/// Copy audit information from one release's issues onto matching issues in
/// other releases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyAuditRequest {
    pub source_release_id: u64,
    pub target_release_ids: Vec<u64>,
    pub include_attachments: bool,
}

/// Bug tracker binding for an application.
#[derive(Clone, Serialize, Deserialize)]
pub struct BugTrackerConfig {
    /// Tracker kind as shown in the product dropdown, e.g.
    /// "ValueEdge/ALM Octane" or "Other".
    pub tracker: String,
    pub url: String,
    pub username: String,
    password: String,
    pub bug_state_management: bool,
}

impl BugTrackerConfig {
    #[must_use]
    pub fn new(
        tracker: String,
        url: String,
        username: String,
        password: String,
        bug_state_management: bool,
    ) -> Self {
        Self {
            tracker,
            url,
            username,
            password,
            bug_state_management,
        }
    }
}

impl std::fmt::Debug for BugTrackerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BugTrackerConfig")
            .field("tracker", &self.tracker)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("bug_state_management", &self.bug_state_management)
            .finish()
    }
}

/// Result of submitting issues to the configured bug tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BugSubmission {
    pub bug_id: String,
    pub bug_url: String,
    /// Description the product pushed to the tracker, including the
    /// per-issue redirect links.
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct IssueListResponse {
    items: Vec<Issue>,
}

#[derive(Debug, Deserialize)]
struct IssueGroupResponse {
    groups: Vec<IssueGroup>,
}

/// Issues-specific error types.
#[derive(Debug)]
pub enum IssuesError {
    /// Fortress API error
    Api(FortressError),
    /// Issue or release not found
    NotFound,
    /// Request payload rejected
    InvalidInput(String),
    /// The principal may not audit these issues
    AccessDenied(String),
}

impl std::fmt::Display for IssuesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssuesError::Api(err) => write!(f, "API error: {err}"),
            IssuesError::NotFound => write!(f, "Issue not found"),
            IssuesError::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            IssuesError::AccessDenied(msg) => write!(f, "Access denied: {msg}"),
        }
    }
}

impl std::error::Error for IssuesError {}

impl From<FortressError> for IssuesError {
    fn from(err: FortressError) -> Self {
        IssuesError::Api(err)
    }
}

impl From<reqwest::Error> for IssuesError {
    fn from(err: reqwest::Error) -> Self {
        IssuesError::Api(FortressError::Http(err))
    }
}

/// Fortress release issues API (tenant portal).
pub struct IssuesApi<'a> {
    client: &'a FortressClient,
}

impl<'a> IssuesApi<'a> {
    #[must_use]
    pub fn new(client: &'a FortressClient) -> Self {
        Self { client }
    }

    /// List issues of a release.
    ///
    /// # Errors
    ///
    /// `NotFound` on 404.
    pub async fn list_issues(
        &self,
        release_id: u64,
        query: &GridQuery,
    ) -> Result<Vec<Issue>, IssuesError> {
        let endpoint = format!("/api/v3/releases/{release_id}/issues");
        let params = query.to_query_params();
        let response = self.client.get(Site::Portal, &endpoint, Some(&params)).await?;

        match response.status().as_u16() {
            200 => {
                let list: IssueListResponse = response.json().await?;
                Ok(list.items)
            }
            404 => Err(IssuesError::NotFound),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(IssuesError::Api(FortressError::InvalidResponse(format!(
                    "HTTP {status}: {text}"
                ))))
            }
        }
    }

    /// The issues grid as rendered, for table-level assertions.
    ///
    /// # Errors
    ///
    /// `NotFound` on 404.
    pub async fn issues_grid(
        &self,
        release_id: u64,
        query: &GridQuery,
    ) -> Result<Grid, IssuesError> {
        let endpoint = format!("/api/v3/releases/{release_id}/issues/grid");
        let params = query.to_query_params();
        let response = self.client.get(Site::Portal, &endpoint, Some(&params)).await?;

        match response.status().as_u16() {
            200 => Ok(response.json().await?),
            404 => Err(IssuesError::NotFound),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(IssuesError::Api(FortressError::InvalidResponse(format!(
                    "HTTP {status}: {text}"
                ))))
            }
        }
    }

    /// Group issues server-side (e.g. by "scanType").
    ///
    /// # Errors
    ///
    /// `NotFound` on 404.
    pub async fn group_issues(
        &self,
        release_id: u64,
        group_by: &str,
    ) -> Result<Vec<IssueGroup>, IssuesError> {
        let endpoint = format!("/api/v3/releases/{release_id}/issues/groups");
        let params = [("groupBy".to_string(), group_by.to_string())];
        let response = self.client.get(Site::Portal, &endpoint, Some(&params)).await?;

        match response.status().as_u16() {
            200 => {
                let groups: IssueGroupResponse = response.json().await?;
                Ok(groups.groups)
            }
            404 => Err(IssuesError::NotFound),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(IssuesError::Api(FortressError::InvalidResponse(format!(
                    "HTTP {status}: {text}"
                ))))
            }
        }
    }

    /// Per-severity counters for a release.
    ///
    /// # Errors
    ///
    /// `NotFound` on 404.
    pub async fn severity_counts(&self, release_id: u64) -> Result<SeverityCounts, IssuesError> {
        let endpoint = format!("/api/v3/releases/{release_id}/issues/counts");
        let response = self.client.get(Site::Portal, &endpoint, None).await?;

        match response.status().as_u16() {
            200 => Ok(response.json().await?),
            404 => Err(IssuesError::NotFound),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(IssuesError::Api(FortressError::InvalidResponse(format!(
                    "HTTP {status}: {text}"
                ))))
            }
        }
    }

    /// Apply an audit change to a set of issues in one submit.
    ///
    /// # Errors
    ///
    /// `AccessDenied` when the role forbids auditing, `InvalidInput` when
    /// the change is empty or an id is foreign to the release.
    pub async fn bulk_audit(
        &self,
        release_id: u64,
        issue_ids: &[u64],
        change: &AuditChange,
    ) -> Result<(), IssuesError> {
        #[derive(Serialize)]
        struct BulkAuditRequest<'a> {
            issue_ids: &'a [u64],
            #[serde(flatten)]
            change: &'a AuditChange,
        }

        let endpoint = format!("/api/v3/releases/{release_id}/issues/audit");
        let body = BulkAuditRequest { issue_ids, change };
        let response = self.client.post(Site::Portal, &endpoint, Some(&body)).await?;

        Self::interpret_mutation(response).await
    }

    /// Read an issue's audit history, newest first.
    ///
    /// # Errors
    ///
    /// `NotFound` on 404.
    pub async fn history(&self, issue_id: u64) -> Result<Vec<HistoryEvent>, IssuesError> {
        #[derive(Deserialize)]
        struct HistoryResponse {
            items: Vec<HistoryEvent>,
        }

        let endpoint = format!("/api/v3/issues/{issue_id}/history");
        let response = self.client.get(Site::Portal, &endpoint, None).await?;

        match response.status().as_u16() {
            200 => {
                let history: HistoryResponse = response.json().await?;
                Ok(history.items)
            }
            404 => Err(IssuesError::NotFound),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(IssuesError::Api(FortressError::InvalidResponse(format!(
                    "HTTP {status}: {text}"
                ))))
            }
        }
    }

    /// Read an issue's comments.
    ///
    /// # Errors
    ///
    /// `NotFound` on 404.
    pub async fn comments(&self, issue_id: u64) -> Result<Vec<IssueComment>, IssuesError> {
        #[derive(Deserialize)]
        struct CommentsResponse {
            items: Vec<IssueComment>,
        }

        let endpoint = format!("/api/v3/issues/{issue_id}/comments");
        let response = self.client.get(Site::Portal, &endpoint, None).await?;

        match response.status().as_u16() {
            200 => {
                let comments: CommentsResponse = response.json().await?;
                Ok(comments.items)
            }
            404 => Err(IssuesError::NotFound),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(IssuesError::Api(FortressError::InvalidResponse(format!(
                    "HTTP {status}: {text}"
                ))))
            }
        }
    }

    /// List an issue's attachments.
    ///
    /// # Errors
    ///
    /// `NotFound` on 404.
    pub async fn attachments(&self, issue_id: u64) -> Result<Vec<IssueAttachment>, IssuesError> {
        #[derive(Deserialize)]
        struct AttachmentsResponse {
            items: Vec<IssueAttachment>,
        }

        let endpoint = format!("/api/v3/issues/{issue_id}/attachments");
        let response = self.client.get(Site::Portal, &endpoint, None).await?;

        match response.status().as_u16() {
            200 => {
                let attachments: AttachmentsResponse = response.json().await?;
                Ok(attachments.items)
            }
            404 => Err(IssuesError::NotFound),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(IssuesError::Api(FortressError::InvalidResponse(format!(
                    "HTTP {status}: {text}"
                ))))
            }
        }
    }

    /// Attach a file to an issue.
    ///
    /// # Errors
    ///
    /// `NotFound` on 404, `InvalidInput` for rejected files.
    pub async fn add_attachment(
        &self,
        issue_id: u64,
        file_name: &str,
        payload: Vec<u8>,
    ) -> Result<IssueAttachment, IssuesError> {
        let endpoint = format!("/api/v3/issues/{issue_id}/attachments");
        let response = self
            .client
            .upload(Site::Portal, &endpoint, "file", file_name, payload, None)
            .await?;

        let status = response.status().as_u16();
        match status {
            200 | 201 => Ok(response.json().await?),
            404 => Err(IssuesError::NotFound),
            400 => {
                let text = response.text().await.unwrap_or_default();
                Err(IssuesError::InvalidInput(text))
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(IssuesError::Api(FortressError::InvalidResponse(format!(
                    "HTTP {status}: {text}"
                ))))
            }
        }
    }

    /// Copy audit information (statuses, comments, optionally attachments)
    /// from the source release onto matching issues in the targets. The
    /// product prefixes copied comments with "[Copied]".
    ///
    /// # Errors
    ///
    /// `InvalidInput` when targets share no matching issues.
    pub async fn copy_audit(&self, request: &CopyAuditRequest) -> Result<(), IssuesError> {
        let endpoint = format!(
            "/api/v3/releases/{}/issues/copy-audit",
            request.source_release_id
        );
        let response = self.client.post(Site::Portal, &endpoint, Some(request)).await?;
        Self::interpret_mutation(response).await
    }

    /// Bind a bug tracker to an application.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the tracker rejects the credentials.
    pub async fn configure_bugtracker(
        &self,
        application_id: u64,
        config: &BugTrackerConfig,
    ) -> Result<(), IssuesError> {
        let endpoint = format!("/api/v3/applications/{application_id}/bugtracker");
        let response = self.client.put(Site::Portal, &endpoint, config).await?;
        Self::interpret_mutation(response).await
    }

    /// Submit issues to the configured bug tracker as one defect.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when no tracker is configured.
    pub async fn submit_bug(
        &self,
        release_id: u64,
        issue_ids: &[u64],
        description: &str,
    ) -> Result<BugSubmission, IssuesError> {
        #[derive(Serialize)]
        struct SubmitBugRequest<'a> {
            issue_ids: &'a [u64],
            description: &'a str,
        }

        let endpoint = format!("/api/v3/releases/{release_id}/issues/submit-bug");
        let body = SubmitBugRequest {
            issue_ids,
            description,
        };
        let response = self.client.post(Site::Portal, &endpoint, Some(&body)).await?;

        let status = response.status().as_u16();
        match status {
            200 | 201 => Ok(response.json().await?),
            400 => {
                let text = response.text().await.unwrap_or_default();
                Err(IssuesError::InvalidInput(text))
            }
            403 => {
                let text = response.text().await.unwrap_or_default();
                Err(IssuesError::AccessDenied(text))
            }
            404 => Err(IssuesError::NotFound),
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(IssuesError::Api(FortressError::InvalidResponse(format!(
                    "HTTP {status}: {text}"
                ))))
            }
        }
    }

    async fn interpret_mutation(response: reqwest::Response) -> Result<(), IssuesError> {
        let status = response.status().as_u16();
        match status {
            200 | 204 => Ok(()),
            404 => Err(IssuesError::NotFound),
            400 => {
                let text = response.text().await.unwrap_or_default();
                Err(IssuesError::InvalidInput(text))
            }
            403 => {
                let text = response.text().await.unwrap_or_default();
                Err(IssuesError::AccessDenied(text))
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(IssuesError::Api(FortressError::InvalidResponse(format!(
                    "HTTP {status}: {text}"
                ))))
            }
        }
    }
}

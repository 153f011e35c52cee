//! Releases API: versioned snapshots of an application.
//!
//! Scans and issues are scoped to a release. A release can be created by
//! cloning scan/audit state from a prior release ("copy state"); the source
//! must be in a completed or cancelled state or the product rejects the
//! request.

use serde::{Deserialize, Serialize};

use crate::client::Site;
use crate::grid::{Grid, GridQuery};
use crate::{FortressClient, FortressError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SdlcStatus {
    Development,
    QA,
    Production,
    Retired,
}

/// A release as the portal reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub id: u64,
    pub release_name: String,
    pub application_id: u64,
    pub sdlc_status: SdlcStatus,
    /// Set when this release was created with copy state.
    pub copied_from_release_id: Option<u64>,
    #[serde(default)]
    pub retired: bool,
}

/// Copy-state parameters for release creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyStateRequest {
    pub copy_from_release_id: u64,
}

/// Request payload for creating a release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReleaseRequest {
    pub application_id: u64,
    pub release_name: String,
    pub sdlc_status: SdlcStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copy_state: Option<CopyStateRequest>,
}

impl CreateReleaseRequest {
    #[must_use]
    pub fn new(application_id: u64, release_name: String) -> Self {
        Self {
            application_id,
            release_name,
            sdlc_status: SdlcStatus::Development,
            copy_state: None,
        }
    }

    /// Clone scan/audit state from an existing release.
    #[must_use]
    pub fn with_copy_state(mut self, source_release_id: u64) -> Self {
        self.copy_state = Some(CopyStateRequest {
            copy_from_release_id: source_release_id,
        });
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReleaseListResponse {
    items: Vec<Release>,
}

/// Release-specific error types.
#[derive(Debug)]
pub enum ReleaseError {
    /// Fortress API error
    Api(FortressError),
    /// Release not found
    NotFound,
    /// Duplicate release name within the application
    AlreadyExists(String),
    /// Copy-state source is not in a completed or cancelled state
    CopySourceNotEligible(String),
    /// Request payload rejected
    InvalidInput(String),
}

impl std::fmt::Display for ReleaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReleaseError::Api(err) => write!(f, "API error: {err}"),
            ReleaseError::NotFound => write!(f, "Release not found"),
            ReleaseError::AlreadyExists(msg) => write!(f, "Release already exists: {msg}"),
            ReleaseError::CopySourceNotEligible(msg) => {
                write!(f, "Copy-state source not eligible: {msg}")
            }
            ReleaseError::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
        }
    }
}

impl std::error::Error for ReleaseError {}

impl From<FortressError> for ReleaseError {
    fn from(err: FortressError) -> Self {
        ReleaseError::Api(err)
    }
}

impl From<reqwest::Error> for ReleaseError {
    fn from(err: reqwest::Error) -> Self {
        ReleaseError::Api(FortressError::Http(err))
    }
}

/// Fortress releases API (tenant portal).
pub struct ReleaseApi<'a> {
    client: &'a FortressClient,
}

impl<'a> ReleaseApi<'a> {
    #[must_use]
    pub fn new(client: &'a FortressClient) -> Self {
        Self { client }
    }

    /// Create a release, optionally with copy state.
    ///
    /// # Errors
    ///
    /// `CopySourceNotEligible` when the source release is still running,
    /// `AlreadyExists` on duplicate names, `InvalidInput` on other 400s.
    pub async fn create_release(
        &self,
        request: &CreateReleaseRequest,
    ) -> Result<Release, ReleaseError> {
        let response = self
            .client
            .post(Site::Portal, "/api/v3/releases", Some(request))
            .await?;

        let status = response.status().as_u16();
        match status {
            200 | 201 => Ok(response.json().await?),
            400 | 409 => {
                let text = response.text().await.unwrap_or_default();
                if text.contains("already exists") {
                    Err(ReleaseError::AlreadyExists(text))
                } else if text.contains("completed or cancelled")
                    || text.contains("copy state source")
                {
                    Err(ReleaseError::CopySourceNotEligible(text))
                } else {
                    Err(ReleaseError::InvalidInput(text))
                }
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(ReleaseError::Api(FortressError::InvalidResponse(format!(
                    "HTTP {status}: {text}"
                ))))
            }
        }
    }

    /// Fetch a release by id.
    ///
    /// # Errors
    ///
    /// `NotFound` on 404.
    pub async fn get_release(&self, release_id: u64) -> Result<Release, ReleaseError> {
        let endpoint = format!("/api/v3/releases/{release_id}");
        let response = self.client.get(Site::Portal, &endpoint, None).await?;

        match response.status().as_u16() {
            200 => Ok(response.json().await?),
            404 => Err(ReleaseError::NotFound),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(ReleaseError::Api(FortressError::InvalidResponse(format!(
                    "HTTP {status}: {text}"
                ))))
            }
        }
    }

    /// List releases of an application.
    ///
    /// # Errors
    ///
    /// Returns an error for any non-200 response.
    pub async fn list_releases(&self, application_id: u64) -> Result<Vec<Release>, ReleaseError> {
        let endpoint = format!("/api/v3/applications/{application_id}/releases");
        let response = self.client.get(Site::Portal, &endpoint, None).await?;

        let status = response.status().as_u16();
        if status != 200 {
            let text = response.text().await.unwrap_or_default();
            return Err(ReleaseError::Api(FortressError::InvalidResponse(format!(
                "HTTP {status}: {text}"
            ))));
        }
        let list: ReleaseListResponse = response.json().await?;
        Ok(list.items)
    }

    /// Find a release of an application by exact name.
    ///
    /// # Errors
    ///
    /// Returns `Ok(None)` when nothing matches.
    pub async fn get_release_by_name(
        &self,
        application_id: u64,
        name: &str,
    ) -> Result<Option<Release>, ReleaseError> {
        let releases = self.list_releases(application_id).await?;
        Ok(releases.into_iter().find(|r| r.release_name == name))
    }

    /// The "Your Releases" grid, for table-level assertions.
    ///
    /// # Errors
    ///
    /// Returns an error for any non-200 response.
    pub async fn release_grid(&self, query: &GridQuery) -> Result<Grid, ReleaseError> {
        let params = query.to_query_params();
        let response = self
            .client
            .get(Site::Portal, "/api/v3/releases/grid", Some(&params))
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let text = response.text().await.unwrap_or_default();
            return Err(ReleaseError::Api(FortressError::InvalidResponse(format!(
                "HTTP {status}: {text}"
            ))));
        }
        Ok(response.json().await?)
    }

    /// Retire a release. Retired releases are read-only.
    ///
    /// # Errors
    ///
    /// `NotFound` on 404.
    pub async fn retire_release(&self, release_id: u64) -> Result<(), ReleaseError> {
        let endpoint = format!("/api/v3/releases/{release_id}/retire");
        let response = self
            .client
            .post::<()>(Site::Portal, &endpoint, None)
            .await?;

        match response.status().as_u16() {
            200 | 204 => Ok(()),
            404 => Err(ReleaseError::NotFound),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(ReleaseError::Api(FortressError::InvalidResponse(format!(
                    "HTTP {status}: {text}"
                ))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_state_serialization() {
        let request = CreateReleaseRequest::new(5, "2.0".to_string()).with_copy_state(17);
        let json = serde_json::to_string(&request).expect("serialize");
        assert!(json.contains("\"copy_from_release_id\":17"));

        let plain = CreateReleaseRequest::new(5, "2.0".to_string());
        let json = serde_json::to_string(&plain).expect("serialize");
        assert!(!json.contains("copy_state"));
    }

    #[test]
    fn test_error_display() {
        let err = ReleaseError::CopySourceNotEligible("source still running".to_string());
        assert_eq!(
            err.to_string(),
            "Copy-state source not eligible: source still running"
        );
    }
}

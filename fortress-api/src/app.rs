//! Applications API: the named containers releases hang off.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::client::Site;
use crate::{FortressClient, FortressError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppType {
    Web,
    Mobile,
    ThickClient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusinessCriticality {
    High,
    Medium,
    Low,
}

/// An application within a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: u64,
    pub application_name: String,
    pub app_type: AppType,
    pub business_criticality: BusinessCriticality,
    /// Release created together with the application, if any.
    pub first_release_id: Option<u64>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

/// Request payload for creating an application.
///
/// Creating an application always creates its first release; the product
/// rejects an application with no releases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApplicationRequest {
    pub application_name: String,
    pub app_type: AppType,
    pub business_criticality: BusinessCriticality,
    pub release_name: String,
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub attributes: HashMap<String, String>,
}

/// Query parameters for listing applications.
#[derive(Debug, Clone, Default)]
pub struct ApplicationQuery {
    pub name: Option<String>,
    pub app_type: Option<AppType>,
}

impl From<&ApplicationQuery> for Vec<(String, String)> {
    fn from(query: &ApplicationQuery) -> Self {
        let mut params = Vec::new();
        if let Some(ref name) = query.name {
            params.push(("name".to_string(), name.clone()));
        }
        if let Some(app_type) = query.app_type {
            let value = match app_type {
                AppType::Web => "Web",
                AppType::Mobile => "Mobile",
                AppType::ThickClient => "ThickClient",
            };
            params.push(("appType".to_string(), value.to_string()));
        }
        params
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApplicationListResponse {
    items: Vec<Application>,
}

/// Application-specific error types.
#[derive(Debug)]
pub enum ApplicationError {
    /// Fortress API error
    Api(FortressError),
    /// Application not found
    NotFound,
    /// Duplicate application name within the tenant
    AlreadyExists(String),
    /// Request payload rejected
    InvalidInput(String),
}

impl std::fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplicationError::Api(err) => write!(f, "API error: {err}"),
            ApplicationError::NotFound => write!(f, "Application not found"),
            ApplicationError::AlreadyExists(msg) => write!(f, "Application already exists: {msg}"),
            ApplicationError::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
        }
    }
}

impl std::error::Error for ApplicationError {}

impl From<FortressError> for ApplicationError {
    fn from(err: FortressError) -> Self {
        ApplicationError::Api(err)
    }
}

impl From<reqwest::Error> for ApplicationError {
    fn from(err: reqwest::Error) -> Self {
        ApplicationError::Api(FortressError::Http(err))
    }
}

/// Fortress applications API (tenant portal).
pub struct ApplicationApi<'a> {
    client: &'a FortressClient,
}

impl<'a> ApplicationApi<'a> {
    #[must_use]
    pub fn new(client: &'a FortressClient) -> Self {
        Self { client }
    }

    /// Create an application (and its first release).
    ///
    /// # Errors
    ///
    /// `AlreadyExists` on duplicate names, `InvalidInput` on a 400.
    pub async fn create_application(
        &self,
        request: &CreateApplicationRequest,
    ) -> Result<Application, ApplicationError> {
        let response = self
            .client
            .post(Site::Portal, "/api/v3/applications", Some(request))
            .await?;

        let status = response.status().as_u16();
        match status {
            200 | 201 => Ok(response.json().await?),
            400 | 409 => {
                let text = response.text().await.unwrap_or_default();
                if text.contains("already exists") {
                    Err(ApplicationError::AlreadyExists(text))
                } else {
                    Err(ApplicationError::InvalidInput(text))
                }
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(ApplicationError::Api(FortressError::InvalidResponse(
                    format!("HTTP {status}: {text}"),
                )))
            }
        }
    }

    /// List applications visible to the current principal.
    ///
    /// # Errors
    ///
    /// Returns an error for any non-200 response.
    pub async fn list_applications(
        &self,
        query: Option<&ApplicationQuery>,
    ) -> Result<Vec<Application>, ApplicationError> {
        let params = query.map(Vec::from);
        let response = self
            .client
            .get(Site::Portal, "/api/v3/applications", params.as_deref())
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let text = response.text().await.unwrap_or_default();
            return Err(ApplicationError::Api(FortressError::InvalidResponse(
                format!("HTTP {status}: {text}"),
            )));
        }
        let list: ApplicationListResponse = response.json().await?;
        Ok(list.items)
    }

    /// Find an application by exact name.
    ///
    /// # Errors
    ///
    /// Returns `Ok(None)` when nothing matches.
    pub async fn get_application_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Application>, ApplicationError> {
        let query = ApplicationQuery {
            name: Some(name.to_string()),
            app_type: None,
        };
        let apps = self.list_applications(Some(&query)).await?;
        Ok(apps.into_iter().find(|a| a.application_name == name))
    }

    /// Delete an application and everything under it.
    ///
    /// # Errors
    ///
    /// `NotFound` on 404.
    pub async fn delete_application(&self, application_id: u64) -> Result<(), ApplicationError> {
        let endpoint = format!("/api/v3/applications/{application_id}");
        let response = self.client.delete(Site::Portal, &endpoint, None).await?;

        match response.status().as_u16() {
            200 | 204 => Ok(()),
            404 => Err(ApplicationError::NotFound),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(ApplicationError::Api(FortressError::InvalidResponse(
                    format!("HTTP {status}: {text}"),
                )))
            }
        }
    }
}

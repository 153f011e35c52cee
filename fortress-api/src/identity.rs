//! Identity: tenant users and roles.

use serde::{Deserialize, Serialize};

use crate::client::Site;
use crate::{FortressClient, FortressError};

/// Application visibility granted by a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationAccess {
    All,
    Assigned,
}

/// A tenant user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantUser {
    pub id: u64,
    pub user_name: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role_name: Option<String>,
    #[serde(default)]
    pub inactive: bool,
    /// Set for accounts created by SSO JIT provisioning.
    #[serde(default)]
    pub sso_provisioned: bool,
}

/// Request payload for creating a tenant user.
#[derive(Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub user_name: String,
    pub email: String,
    password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl CreateUserRequest {
    #[must_use]
    pub fn new(user_name: String, email: String, password: String) -> Self {
        Self {
            user_name,
            email,
            password,
            first_name: None,
            last_name: None,
        }
    }
}

impl std::fmt::Debug for CreateUserRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateUserRequest")
            .field("user_name", &self.user_name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// A tenant role and its permissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantRole {
    pub id: u64,
    pub role_name: String,
    pub application_access: ApplicationAccess,
    pub allow_start_static_scan: bool,
    /// Whether members may consume entitlements when starting scans.
    pub consume_entitlements: bool,
}

/// Request payload for creating a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoleRequest {
    pub role_name: String,
    pub application_access: ApplicationAccess,
    pub allow_start_static_scan: bool,
    pub consume_entitlements: bool,
}

/// Identity-specific error types.
#[derive(Debug)]
pub enum IdentityError {
    /// Fortress API error
    Api(FortressError),
    /// User or role not found
    NotFound,
    /// Duplicate user name or role name
    AlreadyExists(String),
    /// Request payload rejected
    InvalidInput(String),
}

impl std::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityError::Api(err) => write!(f, "API error: {err}"),
            IdentityError::NotFound => write!(f, "User or role not found"),
            IdentityError::AlreadyExists(msg) => write!(f, "Already exists: {msg}"),
            IdentityError::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
        }
    }
}

impl std::error::Error for IdentityError {}

impl From<FortressError> for IdentityError {
    fn from(err: FortressError) -> Self {
        IdentityError::Api(err)
    }
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        IdentityError::Api(FortressError::Http(err))
    }
}

/// Fortress identity API (tenant portal).
pub struct IdentityApi<'a> {
    client: &'a FortressClient,
}

impl<'a> IdentityApi<'a> {
    #[must_use]
    pub fn new(client: &'a FortressClient) -> Self {
        Self { client }
    }

    /// Create a tenant user.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` on duplicates, `InvalidInput` on a 400.
    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<TenantUser, IdentityError> {
        let response = self
            .client
            .post(Site::Portal, "/api/v3/users", Some(request))
            .await?;

        let status = response.status().as_u16();
        match status {
            200 | 201 => Ok(response.json().await?),
            400 | 409 => {
                let text = response.text().await.unwrap_or_default();
                if text.contains("already exists") {
                    Err(IdentityError::AlreadyExists(text))
                } else {
                    Err(IdentityError::InvalidInput(text))
                }
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(IdentityError::Api(FortressError::InvalidResponse(format!(
                    "HTTP {status}: {text}"
                ))))
            }
        }
    }

    /// Find a user by exact user name.
    ///
    /// # Errors
    ///
    /// Returns `Ok(None)` when nothing matches.
    pub async fn get_user_by_name(&self, user_name: &str) -> Result<Option<TenantUser>, IdentityError> {
        #[derive(Deserialize)]
        struct UserListResponse {
            items: Vec<TenantUser>,
        }

        let params = [("name".to_string(), user_name.to_string())];
        let response = self
            .client
            .get(Site::Portal, "/api/v3/users", Some(&params))
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let text = response.text().await.unwrap_or_default();
            return Err(IdentityError::Api(FortressError::InvalidResponse(format!(
                "HTTP {status}: {text}"
            ))));
        }
        let list: UserListResponse = response.json().await?;
        Ok(list.items.into_iter().find(|u| u.user_name == user_name))
    }

    /// Create a role.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` on duplicate role names.
    pub async fn create_role(&self, request: &CreateRoleRequest) -> Result<TenantRole, IdentityError> {
        let response = self
            .client
            .post(Site::Portal, "/api/v3/roles", Some(request))
            .await?;

        let status = response.status().as_u16();
        match status {
            200 | 201 => Ok(response.json().await?),
            400 | 409 => {
                let text = response.text().await.unwrap_or_default();
                if text.contains("already exists") {
                    Err(IdentityError::AlreadyExists(text))
                } else {
                    Err(IdentityError::InvalidInput(text))
                }
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(IdentityError::Api(FortressError::InvalidResponse(format!(
                    "HTTP {status}: {text}"
                ))))
            }
        }
    }

    /// Assign a role to a user.
    ///
    /// # Errors
    ///
    /// `NotFound` when either side is unknown.
    pub async fn assign_role(&self, user_id: u64, role_name: &str) -> Result<(), IdentityError> {
        #[derive(Serialize)]
        struct AssignRoleRequest<'a> {
            role_name: &'a str,
        }

        let endpoint = format!("/api/v3/users/{user_id}/role");
        let response = self
            .client
            .put(Site::Portal, &endpoint, &AssignRoleRequest { role_name })
            .await?;

        match response.status().as_u16() {
            200 | 204 => Ok(()),
            404 => Err(IdentityError::NotFound),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(IdentityError::Api(FortressError::InvalidResponse(format!(
                    "HTTP {status}: {text}"
                ))))
            }
        }
    }

    /// Deactivate a user account.
    ///
    /// # Errors
    ///
    /// `NotFound` on 404.
    pub async fn deactivate_user(&self, user_id: u64) -> Result<(), IdentityError> {
        let endpoint = format!("/api/v3/users/{user_id}/deactivate");
        let response = self.client.post::<()>(Site::Portal, &endpoint, None).await?;

        match response.status().as_u16() {
            200 | 204 => Ok(()),
            404 => Err(IdentityError::NotFound),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(IdentityError::Api(FortressError::InvalidResponse(format!(
                    "HTTP {status}: {text}"
                ))))
            }
        }
    }
}

//! Tenant administration: provisioning, feature options, event log.
//!
//! All operations here hit the admin site and require an operator session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Site;
use crate::grid::GridQuery;
use crate::{FortressClient, FortressError};

/// Entitlement accounting model a tenant is provisioned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntitlementModel {
    Units,
    Scans,
}

/// When a tenant's subscription clock starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionModel {
    Period,
    StartOnFirstScan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentModel {
    PurchaseOrder,
    CreditCard,
    Other,
}

/// A customer tenant as the admin site reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: u64,
    pub tenant_name: String,
    pub tenant_code: String,
    pub tam_username: Option<String>,
    pub entitlement_model: EntitlementModel,
    pub subscription_model: SubscriptionModel,
    pub payment_model: PaymentModel,
    /// Provisioning status: "Provisioning" until the background job
    /// finishes, then "Active".
    pub status: String,
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub enabled_options: Vec<String>,
}

impl Tenant {
    /// Whether the provisioning job has finished.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("active")
    }
}

/// Request payload for creating a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenantRequest {
    pub tenant_name: String,
    pub tenant_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tam_username: Option<String>,
    pub entitlement_model: EntitlementModel,
    pub subscription_model: SubscriptionModel,
    pub payment_model: PaymentModel,
    /// Feature toggles switched on at creation, e.g.
    /// "Allow scanning with no entitlements".
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub options_to_enable: Vec<String>,
}

/// One row of a tenant's event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub event_type: String,
    pub message: String,
    pub occurred: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TenantListResponse {
    items: Vec<Tenant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EventLogResponse {
    items: Vec<EventLogEntry>,
}

/// Tenant-specific error types.
#[derive(Debug)]
pub enum TenantError {
    /// Fortress API error
    Api(FortressError),
    /// Tenant not found
    NotFound,
    /// A tenant with that name or code already exists
    AlreadyExists(String),
    /// Request payload rejected
    InvalidInput(String),
}

impl std::fmt::Display for TenantError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TenantError::Api(err) => write!(f, "API error: {err}"),
            TenantError::NotFound => write!(f, "Tenant not found"),
            TenantError::AlreadyExists(msg) => write!(f, "Tenant already exists: {msg}"),
            TenantError::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
        }
    }
}

impl std::error::Error for TenantError {}

impl From<FortressError> for TenantError {
    fn from(err: FortressError) -> Self {
        TenantError::Api(err)
    }
}

impl From<reqwest::Error> for TenantError {
    fn from(err: reqwest::Error) -> Self {
        TenantError::Api(FortressError::Http(err))
    }
}

/// Fortress tenant administration API.
pub struct TenantApi<'a> {
    client: &'a FortressClient,
}

impl<'a> TenantApi<'a> {
    #[must_use]
    pub fn new(client: &'a FortressClient) -> Self {
        Self { client }
    }

    /// Create a tenant.
    ///
    /// Provisioning is asynchronous: the returned tenant usually has status
    /// "Provisioning" and callers poll [`Self::get_tenant`] until it reports
    /// active.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` on a duplicate name/code, `InvalidInput` on a 400.
    pub async fn create_tenant(&self, request: &CreateTenantRequest) -> Result<Tenant, TenantError> {
        let response = self
            .client
            .post(Site::Admin, "/api/v3/tenants", Some(request))
            .await?;

        let status = response.status().as_u16();
        match status {
            200 | 201 => Ok(response.json().await?),
            400 | 409 => {
                let text = response.text().await.unwrap_or_default();
                if text.contains("already exists") {
                    Err(TenantError::AlreadyExists(text))
                } else {
                    Err(TenantError::InvalidInput(text))
                }
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(TenantError::Api(FortressError::InvalidResponse(format!(
                    "HTTP {status}: {text}"
                ))))
            }
        }
    }

    /// Fetch a tenant by numeric id.
    ///
    /// # Errors
    ///
    /// `NotFound` on 404.
    pub async fn get_tenant(&self, tenant_id: u64) -> Result<Tenant, TenantError> {
        let endpoint = format!("/api/v3/tenants/{tenant_id}");
        let response = self.client.get(Site::Admin, &endpoint, None).await?;

        match response.status().as_u16() {
            200 => Ok(response.json().await?),
            404 => Err(TenantError::NotFound),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(TenantError::Api(FortressError::InvalidResponse(format!(
                    "HTTP {status}: {text}"
                ))))
            }
        }
    }

    /// Find a tenant by its exact name. Admin views are shared across every
    /// concurrent run, so lookups always filter server-side by name rather
    /// than scanning the unfiltered list.
    ///
    /// # Errors
    ///
    /// Returns `Ok(None)` when no tenant matches; errors only for API
    /// failures.
    pub async fn get_tenant_by_name(&self, name: &str) -> Result<Option<Tenant>, TenantError> {
        let query = GridQuery::new().with_search(name).to_query_params();
        let response = self
            .client
            .get(Site::Admin, "/api/v3/tenants", Some(&query))
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let text = response.text().await.unwrap_or_default();
            return Err(TenantError::Api(FortressError::InvalidResponse(format!(
                "HTTP {status}: {text}"
            ))));
        }

        let list: TenantListResponse = response.json().await?;
        Ok(list.items.into_iter().find(|t| t.tenant_name == name))
    }

    /// All tenants whose name contains `fragment`. Used by run cleanup to
    /// find everything a tagged run created.
    ///
    /// # Errors
    ///
    /// Returns an error for any non-200 response.
    pub async fn search_tenants(&self, fragment: &str) -> Result<Vec<Tenant>, TenantError> {
        let query = GridQuery::new().with_search(fragment).to_query_params();
        let response = self
            .client
            .get(Site::Admin, "/api/v3/tenants", Some(&query))
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let text = response.text().await.unwrap_or_default();
            return Err(TenantError::Api(FortressError::InvalidResponse(format!(
                "HTTP {status}: {text}"
            ))));
        }
        let list: TenantListResponse = response.json().await?;
        Ok(list
            .items
            .into_iter()
            .filter(|t| t.tenant_name.contains(fragment))
            .collect())
    }

    /// Enable feature options on an existing tenant.
    ///
    /// # Errors
    ///
    /// `NotFound` on 404, `InvalidInput` when an option name is unknown.
    pub async fn enable_options(
        &self,
        tenant_id: u64,
        options: &[String],
    ) -> Result<(), TenantError> {
        #[derive(Serialize)]
        struct EnableOptionsRequest<'a> {
            options: &'a [String],
        }

        let endpoint = format!("/api/v3/tenants/{tenant_id}/options");
        let response = self
            .client
            .put(Site::Admin, &endpoint, &EnableOptionsRequest { options })
            .await?;

        match response.status().as_u16() {
            200 | 204 => Ok(()),
            404 => Err(TenantError::NotFound),
            400 => {
                let text = response.text().await.unwrap_or_default();
                Err(TenantError::InvalidInput(text))
            }
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(TenantError::Api(FortressError::InvalidResponse(format!(
                    "HTTP {status}: {text}"
                ))))
            }
        }
    }

    /// Read a tenant's event log, newest first.
    ///
    /// # Errors
    ///
    /// `NotFound` on 404.
    pub async fn event_log(&self, tenant_id: u64) -> Result<Vec<EventLogEntry>, TenantError> {
        let endpoint = format!("/api/v3/tenants/{tenant_id}/event-log");
        let response = self.client.get(Site::Admin, &endpoint, None).await?;

        match response.status().as_u16() {
            200 => {
                let log: EventLogResponse = response.json().await?;
                Ok(log.items)
            }
            404 => Err(TenantError::NotFound),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(TenantError::Api(FortressError::InvalidResponse(format!(
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
    fn test_tenant_is_active() {
        let raw = r#"{
            "id": 7,
            "tenant_name": "acme",
            "tenant_code": "ACME",
            "tam_username": "tam@acme.example",
            "entitlement_model": "Units",
            "subscription_model": "Period",
            "payment_model": "Other",
            "status": "Active",
            "created": null
        }"#;
        let tenant: Tenant = serde_json::from_str(raw).expect("tenant should parse");
        assert!(tenant.is_active());
        assert!(tenant.enabled_options.is_empty());
    }

    #[test]
    fn test_create_request_omits_empty_options() {
        let request = CreateTenantRequest {
            tenant_name: "acme".to_string(),
            tenant_code: "ACME".to_string(),
            tam_username: None,
            entitlement_model: EntitlementModel::Units,
            subscription_model: SubscriptionModel::Period,
            payment_model: PaymentModel::Other,
            options_to_enable: Vec::new(),
        };
        let json = serde_json::to_string(&request).expect("serialize");
        assert!(!json.contains("options_to_enable"));
        assert!(!json.contains("tam_username"));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(TenantError::NotFound.to_string(), "Tenant not found");
        assert_eq!(
            TenantError::AlreadyExists("acme".to_string()).to_string(),
            "Tenant already exists: acme"
        );
    }
}

//! Entitlements: purchased/consumed counters per tenant.
//!
//! The consumption ledger lives in the product; this module only reads the
//! counters and drives the admin-side management operations the tests need.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Site;
use crate::scan::{AnalysisType, EntitlementFrequency};
use crate::{FortressClient, FortressError};

/// Which engine an entitlement pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntitlementType {
    Fortify,
    Sonatype,
    Debricked,
}

impl EntitlementType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fortify => "Fortify",
            Self::Sonatype => "Sonatype",
            Self::Debricked => "Debricked",
        }
    }
}

/// An entitlement row as either site reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entitlement {
    pub id: u64,
    pub entitlement_type: EntitlementType,
    pub frequency: EntitlementFrequency,
    pub quantity_purchased: u64,
    pub quantity_consumed: u64,
    pub enabled: bool,
    pub analysis_type: Option<AnalysisType>,
    pub assessment_type: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Entitlement {
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.quantity_purchased.saturating_sub(self.quantity_consumed)
    }
}

/// Request payload for creating an entitlement (admin side).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEntitlementRequest {
    pub tenant_id: u64,
    pub entitlement_type: EntitlementType,
    pub frequency: EntitlementFrequency,
    pub quantity_purchased: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_type: Option<AnalysisType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment_type: Option<String>,
}

impl CreateEntitlementRequest {
    #[must_use]
    pub fn new(tenant_id: u64, entitlement_type: EntitlementType, quantity: u64) -> Self {
        Self {
            tenant_id,
            entitlement_type,
            frequency: EntitlementFrequency::Subscription,
            quantity_purchased: quantity,
            analysis_type: None,
            assessment_type: None,
        }
    }

    #[must_use]
    pub fn with_frequency(mut self, frequency: EntitlementFrequency) -> Self {
        self.frequency = frequency;
        self
    }

    #[must_use]
    pub fn scoped_to(mut self, analysis_type: AnalysisType, assessment_type: String) -> Self {
        self.analysis_type = Some(analysis_type);
        self.assessment_type = Some(assessment_type);
        self
    }
}

#[derive(Debug, Deserialize)]
struct EntitlementListResponse {
    items: Vec<Entitlement>,
}

/// Entitlements-specific error types.
#[derive(Debug)]
pub enum EntitlementsError {
    /// Fortress API error
    Api(FortressError),
    /// Entitlement or tenant not found
    NotFound,
    /// Request payload rejected
    InvalidInput(String),
}

impl std::fmt::Display for EntitlementsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntitlementsError::Api(err) => write!(f, "API error: {err}"),
            EntitlementsError::NotFound => write!(f, "Entitlement not found"),
            EntitlementsError::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
        }
    }
}

impl std::error::Error for EntitlementsError {}

impl From<FortressError> for EntitlementsError {
    fn from(err: FortressError) -> Self {
        EntitlementsError::Api(err)
    }
}

impl From<reqwest::Error> for EntitlementsError {
    fn from(err: reqwest::Error) -> Self {
        EntitlementsError::Api(FortressError::Http(err))
    }
}

/// Fortress entitlements API.
pub struct EntitlementsApi<'a> {
    client: &'a FortressClient,
}

impl<'a> EntitlementsApi<'a> {
    #[must_use]
    pub fn new(client: &'a FortressClient) -> Self {
        Self { client }
    }

    /// Create an entitlement for a tenant (operator action).
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown tenant, `InvalidInput` on a 400.
    pub async fn create_entitlement(
        &self,
        request: &CreateEntitlementRequest,
    ) -> Result<Entitlement, EntitlementsError> {
        let endpoint = format!("/api/v3/tenants/{}/entitlements", request.tenant_id);
        let response = self.client.post(Site::Admin, &endpoint, Some(request)).await?;

        let status = response.status().as_u16();
        match status {
            200 | 201 => Ok(response.json().await?),
            404 => Err(EntitlementsError::NotFound),
            400 => {
                let text = response.text().await.unwrap_or_default();
                Err(EntitlementsError::InvalidInput(text))
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(EntitlementsError::Api(FortressError::InvalidResponse(
                    format!("HTTP {status}: {text}"),
                )))
            }
        }
    }

    /// List a tenant's entitlements on the admin site, optionally filtered
    /// by type (the per-type tabs of the entitlements page).
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown tenant.
    pub async fn list_for_tenant(
        &self,
        tenant_id: u64,
        entitlement_type: Option<EntitlementType>,
    ) -> Result<Vec<Entitlement>, EntitlementsError> {
        let endpoint = format!("/api/v3/tenants/{tenant_id}/entitlements");
        let params = entitlement_type
            .map(|t| vec![("type".to_string(), t.as_str().to_string())]);
        let response = self
            .client
            .get(Site::Admin, &endpoint, params.as_deref())
            .await?;

        match response.status().as_u16() {
            200 => {
                let list: EntitlementListResponse = response.json().await?;
                Ok(list.items)
            }
            404 => Err(EntitlementsError::NotFound),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(EntitlementsError::Api(FortressError::InvalidResponse(
                    format!("HTTP {status}: {text}"),
                )))
            }
        }
    }

    /// The tenant-side view of its own entitlement usage (dashboard
    /// counters).
    ///
    /// # Errors
    ///
    /// Returns an error for any non-200 response.
    pub async fn tenant_usage(&self) -> Result<Vec<Entitlement>, EntitlementsError> {
        let response = self
            .client
            .get(Site::Portal, "/api/v3/entitlements", None)
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let text = response.text().await.unwrap_or_default();
            return Err(EntitlementsError::Api(FortressError::InvalidResponse(
                format!("HTTP {status}: {text}"),
            )));
        }
        let list: EntitlementListResponse = response.json().await?;
        Ok(list.items)
    }

    /// Disable a single entitlement.
    ///
    /// # Errors
    ///
    /// `NotFound` on 404.
    pub async fn disable_entitlement(&self, entitlement_id: u64) -> Result<(), EntitlementsError> {
        let endpoint = format!("/api/v3/entitlements/{entitlement_id}/disable");
        let response = self.client.post::<()>(Site::Admin, &endpoint, None).await?;

        match response.status().as_u16() {
            200 | 204 => Ok(()),
            404 => Err(EntitlementsError::NotFound),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(EntitlementsError::Api(FortressError::InvalidResponse(
                    format!("HTTP {status}: {text}"),
                )))
            }
        }
    }

    /// Disable every entitlement of a tenant.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown tenant.
    pub async fn disable_all(&self, tenant_id: u64) -> Result<(), EntitlementsError> {
        let endpoint = format!("/api/v3/tenants/{tenant_id}/entitlements/disable-all");
        let response = self.client.post::<()>(Site::Admin, &endpoint, None).await?;

        match response.status().as_u16() {
            200 | 204 => Ok(()),
            404 => Err(EntitlementsError::NotFound),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(EntitlementsError::Api(FortressError::InvalidResponse(
                    format!("HTTP {status}: {text}"),
                )))
            }
        }
    }
}

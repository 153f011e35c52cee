//! # Fortress Platform Client Library
//!
//! A Rust client library for the Fortress multi-tenant application security
//! platform, covering the tenant portal and admin site REST APIs: tenants,
//! applications, releases, scan orchestration, issue auditing, entitlements,
//! identity, and notifications.
//!
//! The library handles HMAC request signing for service credentials, bearer
//! token sessions for interactive principals, request/response serialization,
//! and error handling.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fortress_platform::{FortressConfig, FortressClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FortressConfig::new(
//!         "https://portal.fortress.example".to_string(),
//!         "https://admin.fortress.example".to_string(),
//!     )
//!     .with_api_credentials("your_api_id".to_string(), "your_api_key".to_string());
//!
//!     let client = FortressClient::new(config)?;
//!
//!     let apps = client.applications_api().list_applications(None).await?;
//!     println!("{} applications visible", apps.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Sites
//!
//! The platform exposes two HTTP surfaces with separate hostnames:
//!
//! - **Tenant portal** (`portal.*`) - everything a tenant user can do:
//!   applications, releases, scans, issues, subscriptions.
//! - **Admin site** (`admin.*`) - operator workflows: tenant provisioning,
//!   entitlement management, scan-job administration.
//!
//! Each API module routes to the correct site; a client authenticated as a
//! tenant principal simply receives 403s from admin endpoints.

pub mod auth;
pub mod client;
pub mod tenant;
pub mod app;
pub mod release;
pub mod scan;
pub mod issues;
pub mod entitlements;
pub mod identity;
pub mod notifications;
pub mod grid;

use std::fmt;
use reqwest::Error as ReqwestError;

// Re-export common types for convenience
pub use client::{FortressClient, RetryConfig};
pub use auth::{AuthApi, AuthError, SamlLoginRequest, TokenResponse, UserCredentials};
pub use tenant::{
    CreateTenantRequest, EntitlementModel, EventLogEntry, PaymentModel, SubscriptionModel,
    Tenant, TenantApi, TenantError,
};
pub use app::{
    AppType, Application, ApplicationApi, ApplicationError, ApplicationQuery,
    BusinessCriticality, CreateApplicationRequest,
};
pub use release::{
    CopyStateRequest, CreateReleaseRequest, Release, ReleaseApi, ReleaseError, SdlcStatus,
};
pub use scan::{
    AnalysisType, AuditPreference, EntitlementFrequency, ImportScanRequest, Scan, ScanApi,
    ScanError, ScanStatus, ScanSummary, StartScanRequest, TechnologyStack,
};
pub use issues::{
    AuditChange, BugSubmission, CopyAuditRequest, HistoryEvent, Issue, IssueGroup, IssuesApi,
    IssuesError, Severity,
};
pub use entitlements::{
    CreateEntitlementRequest, Entitlement, EntitlementType, EntitlementsApi, EntitlementsError,
};
pub use identity::{
    CreateRoleRequest, CreateUserRequest, IdentityApi, IdentityError, TenantRole, TenantUser,
};
pub use notifications::{
    CreateSubscriptionRequest, Notification, NotificationsApi, NotificationsError, Subscription,
};
pub use grid::{AppliedFilter, Grid, GridQuery, PageInfo};

/// Custom error type for Fortress API operations.
///
/// Represents all failure modes shared by every API module; individual
/// modules wrap this in their own error enums where they need richer
/// variants.
#[derive(Debug)]
pub enum FortressError {
    /// HTTP request failed
    Http(ReqwestError),
    /// JSON serialization/deserialization failed
    Serialization(serde_json::Error),
    /// Authentication error (invalid credentials, signature generation failure, etc.)
    Authentication(String),
    /// API returned an error response
    InvalidResponse(String),
    /// Configuration is invalid
    InvalidConfig(String),
    /// When an item is not found
    NotFound(String),
    /// Retries were exhausted without a successful response
    RetryExhausted(String),
}

impl fmt::Display for FortressError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FortressError::Http(e) => write!(f, "HTTP error: {e}"),
            FortressError::Serialization(e) => write!(f, "Serialization error: {e}"),
            FortressError::Authentication(e) => write!(f, "Authentication error: {e}"),
            FortressError::InvalidResponse(e) => write!(f, "Invalid response: {e}"),
            FortressError::InvalidConfig(e) => write!(f, "Invalid configuration: {e}"),
            FortressError::NotFound(e) => write!(f, "Item not found: {e}"),
            FortressError::RetryExhausted(e) => write!(f, "Retries exhausted: {e}"),
        }
    }
}

impl std::error::Error for FortressError {}

impl From<ReqwestError> for FortressError {
    fn from(error: ReqwestError) -> Self {
        FortressError::Http(error)
    }
}

impl From<serde_json::Error> for FortressError {
    fn from(error: serde_json::Error) -> Self {
        FortressError::Serialization(error)
    }
}

/// API credentials for HMAC request signing.
///
/// The key is kept out of `Debug` output so configs can be logged safely.
#[derive(Clone)]
pub struct ApiCredentials {
    pub api_id: String,
    api_key: String,
}

impl ApiCredentials {
    #[must_use]
    pub fn new(api_id: String, api_key: String) -> Self {
        Self { api_id, api_key }
    }

    /// Access the secret key material for signature generation.
    #[must_use]
    pub fn expose_api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_id", &self.api_id)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Configuration for the Fortress API client.
///
/// Carries the two site base URLs, optional service credentials, HTTP
/// timeouts, and the retry policy. The client defaults to the tenant portal
/// URL; admin-side API modules switch to the admin URL per request.
#[derive(Debug, Clone)]
pub struct FortressConfig {
    /// Tenant portal base URL (portal.*)
    pub portal_base_url: String,
    /// Admin site base URL (admin.*)
    pub admin_base_url: String,
    /// Service credentials for HMAC signing, if any
    pub credentials: Option<ApiCredentials>,
    /// Connect timeout in seconds
    pub connect_timeout: u64,
    /// Per-request timeout in seconds
    pub request_timeout: u64,
    /// Retry policy for transient failures
    pub retry: RetryConfig,
    /// Whether to validate TLS certificates (default: true)
    pub validate_certificates: bool,
}

impl FortressConfig {
    /// Create a new configuration from the two site base URLs.
    ///
    /// Trailing slashes are stripped so endpoint paths can always start
    /// with `/`.
    #[must_use]
    pub fn new(portal_base_url: String, admin_base_url: String) -> Self {
        Self {
            portal_base_url: portal_base_url.trim_end_matches('/').to_string(),
            admin_base_url: admin_base_url.trim_end_matches('/').to_string(),
            credentials: None,
            connect_timeout: 30,
            request_timeout: 120,
            retry: RetryConfig::default(),
            validate_certificates: true,
        }
    }

    /// Attach service API credentials for HMAC request signing.
    #[must_use]
    pub fn with_api_credentials(mut self, api_id: String, api_key: String) -> Self {
        self.credentials = Some(ApiCredentials::new(api_id, api_key));
        self
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Disable certificate validation for lab environments with self-signed
    /// certificates. Never use this against production.
    #[must_use]
    pub fn with_certificate_validation_disabled(mut self) -> Self {
        self.validate_certificates = false;
        self
    }
}

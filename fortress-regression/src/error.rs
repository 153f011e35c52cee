//! Error types for the regression harness.

use fortress_platform::ScanStatus;

/// Custom error type for harness operations.
///
/// Action façades raise `ElementNotCreated` / `ElementNotFound` /
/// `UnexpectedScanStatus` when a workflow cannot reach its expected state;
/// negative-path tests catch these and assert on their messages, so the
/// messages carry the observed state verbatim.
#[derive(thiserror::Error, Debug)]
pub enum HarnessError {
    /// Fortress API error
    #[error("Fortress API error: {0}")]
    Api(#[from] fortress_platform::FortressError),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(#[from] fortress_platform::AuthError),

    /// Tenant API error
    #[error("Tenant error: {0}")]
    Tenant(#[from] fortress_platform::TenantError),

    /// Application API error
    #[error("Application error: {0}")]
    Application(#[from] fortress_platform::ApplicationError),

    /// Release API error
    #[error("Release error: {0}")]
    Release(#[from] fortress_platform::ReleaseError),

    /// Scan API error
    #[error("Scan error: {0}")]
    Scan(#[from] fortress_platform::ScanError),

    /// Issues API error
    #[error("Issues error: {0}")]
    Issues(#[from] fortress_platform::IssuesError),

    /// Entitlements API error
    #[error("Entitlements error: {0}")]
    Entitlements(#[from] fortress_platform::EntitlementsError),

    /// Identity API error
    #[error("Identity error: {0}")]
    Identity(#[from] fortress_platform::IdentityError),

    /// Notifications API error
    #[error("Notifications error: {0}")]
    Notifications(#[from] fortress_platform::NotificationsError),

    /// A workflow finished but the entity it should have created is absent
    #[error("Element was not created: {0}")]
    ElementNotCreated(String),

    /// An entity the workflow relies on is absent
    #[error("Element was not found: {0}")]
    ElementNotFound(String),

    /// A scan reached a terminal status other than the expected one
    #[error("Scan {scan_id} reached status '{observed}', expected '{expected}'")]
    UnexpectedScanStatus {
        scan_id: u64,
        expected: ScanStatus,
        observed: String,
    },

    /// A poll expired; the message carries the last observed value
    #[error("Timed out after {timeout_secs}s waiting for {what}; last observed '{observed}'")]
    WaitTimeout {
        what: String,
        timeout_secs: u64,
        observed: String,
    },

    /// Database oracle error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Mail-capture oracle error
    #[error("Mail capture error: {0}")]
    Mail(String),

    /// Bug-tracker oracle error
    #[error("Bug tracker error: {0}")]
    BugTracker(String),

    /// HTTP error from an oracle client
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error from an oracle client
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error (payload staging)
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid environment configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

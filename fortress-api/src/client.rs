//! Core Fortress API client implementation.
//!
//! Authenticated HTTP plumbing shared by every API module: HMAC request
//! signing for service credentials, bearer tokens for interactive sessions,
//! site routing (portal vs admin), and bounded retry with backoff.

use hmac::{Hmac, Mac};
use log::{debug, info, warn};
use reqwest::{Client, multipart};
use serde::Serialize;
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use url::Url;

use crate::{
    AuthApi, ApplicationApi, EntitlementsApi, FortressConfig, FortressError, IdentityApi,
    IssuesApi, NotificationsApi, ReleaseApi, ScanApi, TenantApi,
};

type HmacSha256 = Hmac<Sha256>;

const HMAC_CREATION_FAILED_MSG: &str = "Failed to create HMAC";
const SIGNING_SALT: &str = "fortress_request_v1";

/// Which of the product's two HTTP surfaces a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    /// Tenant portal (portal.*)
    Portal,
    /// Admin site (admin.*)
    Admin,
}

/// How outgoing requests authenticate.
#[derive(Debug, Clone)]
enum AuthMode {
    /// No Authorization header; only the login endpoints accept this.
    Anonymous,
    /// HMAC-SHA-256 signing with the configured service credentials.
    Hmac,
    /// Bearer token minted by a login call.
    Bearer(String),
}

/// Retry policy for transient HTTP failures.
///
/// Network errors and 5xx responses are retried with exponential backoff;
/// 429 responses honor `Retry-After` when present and are counted against
/// their own attempt budget.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retry attempts after the initial request (0 disables retries)
    pub max_attempts: u32,
    /// Base delay before the first retry
    pub base_delay_ms: u64,
    /// Upper bound for a single backoff delay
    pub max_delay_ms: u64,
    /// Separate budget for rate-limited (429) responses
    pub rate_limit_max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 15_000,
            rate_limit_max_attempts: 5,
        }
    }
}

impl RetryConfig {
    /// Exponential backoff delay for the given attempt (1-based), capped at
    /// `max_delay_ms`.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let millis = self
            .base_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_delay_ms);
        Duration::from_millis(millis)
    }

    /// Whether a response status is worth retrying.
    #[must_use]
    pub fn is_retryable_status(&self, status: u16) -> bool {
        status >= 500 || status == 429
    }
}

/// Core Fortress API client.
///
/// Cheap to clone. One client represents one authenticated principal (or
/// the anonymous/service identity) - identity switching is done by building
/// a fresh client, never by mutating an existing one.
#[derive(Clone)]
pub struct FortressClient {
    config: FortressConfig,
    http: Client,
    auth: AuthMode,
}

impl FortressClient {
    /// Create a new client from a configuration.
    ///
    /// Uses HMAC signing when the config carries service credentials,
    /// otherwise starts anonymous (suitable only for login calls).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: FortressConfig) -> Result<Self, FortressError> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .timeout(Duration::from_secs(config.request_timeout));

        if !config.validate_certificates {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().map_err(FortressError::Http)?;
        let auth = if config.credentials.is_some() {
            AuthMode::Hmac
        } else {
            AuthMode::Anonymous
        };

        Ok(Self { config, http, auth })
    }

    /// Derive a client that authenticates with the given bearer token.
    ///
    /// The returned client shares nothing mutable with `self`; dropping it
    /// discards the session material.
    #[must_use]
    pub fn with_bearer_token(&self, token: String) -> Self {
        Self {
            config: self.config.clone(),
            http: self.http.clone(),
            auth: AuthMode::Bearer(token),
        }
    }

    /// Access the configuration.
    #[must_use]
    pub fn config(&self) -> &FortressConfig {
        &self.config
    }

    /// Whether this client currently holds a bearer session.
    #[must_use]
    pub fn has_session(&self) -> bool {
        matches!(self.auth, AuthMode::Bearer(_))
    }

    /// Base URL for the given site.
    #[must_use]
    pub fn base_url(&self, site: Site) -> &str {
        match site {
            Site::Portal => &self.config.portal_base_url,
            Site::Admin => &self.config.admin_base_url,
        }
    }

    // --- API module accessors -------------------------------------------

    /// Authentication API (login/logout, SSO).
    #[must_use]
    pub fn auth_api(&self) -> AuthApi {
        AuthApi::new(self)
    }

    /// Tenant administration API (admin site).
    #[must_use]
    pub fn tenant_api(&self) -> TenantApi {
        TenantApi::new(self)
    }

    /// Applications API (tenant portal).
    #[must_use]
    pub fn applications_api(&self) -> ApplicationApi {
        ApplicationApi::new(self)
    }

    /// Releases API (tenant portal).
    #[must_use]
    pub fn release_api(&self) -> ReleaseApi {
        ReleaseApi::new(self)
    }

    /// Scan orchestration API (portal + admin operations).
    #[must_use]
    pub fn scan_api(&self) -> ScanApi {
        ScanApi::new(self)
    }

    /// Release issues / audit API (tenant portal).
    #[must_use]
    pub fn issues_api(&self) -> IssuesApi {
        IssuesApi::new(self)
    }

    /// Entitlements API (admin + portal read side).
    #[must_use]
    pub fn entitlements_api(&self) -> EntitlementsApi {
        EntitlementsApi::new(self)
    }

    /// Identity API: tenant users, roles, groups.
    #[must_use]
    pub fn identity_api(&self) -> IdentityApi {
        IdentityApi::new(self)
    }

    /// Notifications and subscriptions API.
    #[must_use]
    pub fn notifications_api(&self) -> NotificationsApi {
        NotificationsApi::new(self)
    }

    // --- signing ---------------------------------------------------------

    /// Generate the Authorization header value for one request attempt.
    ///
    /// For HMAC mode the signature chains four HMAC-SHA-256 applications
    /// (key -> nonce -> timestamp -> salt) over the canonical request string,
    /// so a leaked signature is useless for any other request or minute.
    ///
    /// # Errors
    ///
    /// Returns an error if signing material cannot be derived or the URL
    /// cannot be parsed.
    pub fn authorization_header(
        &self,
        method: &str,
        url: &str,
    ) -> Result<Option<String>, FortressError> {
        match &self.auth {
            AuthMode::Anonymous => Ok(None),
            AuthMode::Bearer(token) => Ok(Some(format!("Bearer {token}"))),
            AuthMode::Hmac => {
                let creds = self.config.credentials.as_ref().ok_or_else(|| {
                    FortressError::Authentication("HMAC mode without credentials".to_string())
                })?;

                let parsed = Url::parse(url)
                    .map_err(|e| FortressError::Authentication(format!("Invalid URL: {e}")))?;
                let host = parsed.host_str().unwrap_or_default();
                let path_and_query = match parsed.query() {
                    Some(q) => format!("{}?{q}", parsed.path()),
                    None => parsed.path().to_string(),
                };

                #[allow(clippy::cast_possible_truncation)]
                let timestamp = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map_err(|e| {
                        FortressError::Authentication(format!("System time error: {e}"))
                    })?
                    .as_millis() as u64;

                let nonce_bytes: [u8; 16] = rand::random();
                let nonce = hex::encode(nonce_bytes);

                let data = format!(
                    "id={}&host={host}&url={path_and_query}&method={method}",
                    creds.api_id
                );
                let signature = Self::chained_signature(
                    creds.expose_api_key(),
                    &nonce_bytes,
                    timestamp,
                    &data,
                )?;

                Ok(Some(format!(
                    "FORTRESS-HMAC-SHA-256 id={},ts={timestamp},nonce={nonce},sig={signature}",
                    creds.api_id
                )))
            }
        }
    }

    fn chained_signature(
        api_key_hex: &str,
        nonce_bytes: &[u8],
        timestamp: u64,
        data: &str,
    ) -> Result<String, FortressError> {
        let key_bytes = hex::decode(api_key_hex).map_err(|_| {
            FortressError::Authentication("Invalid API key format - must be hex string".to_string())
        })?;

        let mut mac = HmacSha256::new_from_slice(&key_bytes)
            .map_err(|_| FortressError::Authentication(HMAC_CREATION_FAILED_MSG.to_string()))?;
        mac.update(nonce_bytes);
        let keyed_nonce = mac.finalize().into_bytes();

        let mut mac = HmacSha256::new_from_slice(&keyed_nonce)
            .map_err(|_| FortressError::Authentication(HMAC_CREATION_FAILED_MSG.to_string()))?;
        mac.update(timestamp.to_string().as_bytes());
        let keyed_ts = mac.finalize().into_bytes();

        let mut mac = HmacSha256::new_from_slice(&keyed_ts)
            .map_err(|_| FortressError::Authentication(HMAC_CREATION_FAILED_MSG.to_string()))?;
        mac.update(SIGNING_SALT.as_bytes());
        let derived = mac.finalize().into_bytes();

        let mut mac = HmacSha256::new_from_slice(&derived)
            .map_err(|_| FortressError::Authentication(HMAC_CREATION_FAILED_MSG.to_string()))?;
        mac.update(data.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    // --- request helpers -------------------------------------------------

    fn build_url(&self, site: Site, endpoint: &str, query: Option<&[(String, String)]>) -> String {
        let base = self.base_url(site);
        let mut url = String::with_capacity(base.len() + endpoint.len() + 64);
        url.push_str(base);
        url.push_str(endpoint);

        if let Some(params) = query
            && !params.is_empty()
        {
            url.push('?');
            for (i, (key, value)) in params.iter().enumerate() {
                if i > 0 {
                    url.push('&');
                }
                url.push_str(&urlencoding::encode(key));
                url.push('=');
                url.push_str(&urlencoding::encode(value));
            }
        }

        url
    }

    /// Make a GET request against the given site.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be signed, fails at the
    /// transport level, or the retry budget is exhausted.
    pub async fn get(
        &self,
        site: Site,
        endpoint: &str,
        query: Option<&[(String, String)]>,
    ) -> Result<reqwest::Response, FortressError> {
        let url = self.build_url(site, endpoint, query);
        let auth = self.authorization_header("GET", &url)?;
        let builder = || {
            let mut req = self.http.get(&url).header("Content-Type", "application/json");
            if let Some(value) = &auth {
                req = req.header("Authorization", value.clone());
            }
            req
        };
        self.execute_with_retry(builder, &format!("GET {endpoint}"))
            .await
    }

    /// Make a POST request with an optional JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the request itself fails.
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        site: Site,
        endpoint: &str,
        body: Option<&T>,
    ) -> Result<reqwest::Response, FortressError> {
        let url = self.build_url(site, endpoint, None);
        let auth = self.authorization_header("POST", &url)?;
        // Serialize once, outside the retry loop
        let payload = match body {
            Some(b) => Some(serde_json::to_string(b)?),
            None => None,
        };
        let builder = || {
            let mut req = self.http.post(&url).header("Content-Type", "application/json");
            if let Some(value) = &auth {
                req = req.header("Authorization", value.clone());
            }
            if let Some(json) = &payload {
                req = req.body(json.clone());
            }
            req
        };
        self.execute_with_retry(builder, &format!("POST {endpoint}"))
            .await
    }

    /// Make a PUT request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the request itself fails.
    pub async fn put<T: Serialize + ?Sized>(
        &self,
        site: Site,
        endpoint: &str,
        body: &T,
    ) -> Result<reqwest::Response, FortressError> {
        let url = self.build_url(site, endpoint, None);
        let auth = self.authorization_header("PUT", &url)?;
        let payload = serde_json::to_string(body)?;
        let builder = || {
            let mut req = self.http.put(&url).header("Content-Type", "application/json");
            if let Some(value) = &auth {
                req = req.header("Authorization", value.clone());
            }
            req.body(payload.clone())
        };
        self.execute_with_retry(builder, &format!("PUT {endpoint}"))
            .await
    }

    /// Make a DELETE request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be signed or fails.
    pub async fn delete(
        &self,
        site: Site,
        endpoint: &str,
        query: Option<&[(String, String)]>,
    ) -> Result<reqwest::Response, FortressError> {
        let url = self.build_url(site, endpoint, query);
        let auth = self.authorization_header("DELETE", &url)?;
        let builder = || {
            let mut req = self.http.delete(&url);
            if let Some(value) = &auth {
                req = req.header("Authorization", value.clone());
            }
            req
        };
        self.execute_with_retry(builder, &format!("DELETE {endpoint}"))
            .await
    }

    /// Upload a file as `multipart/form-data`.
    ///
    /// The payload bytes are cloned per attempt because a multipart form
    /// cannot be reused once sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload fails after retries.
    pub async fn upload(
        &self,
        site: Site,
        endpoint: &str,
        field_name: &str,
        file_name: &str,
        bytes: Vec<u8>,
        query: Option<&[(String, String)]>,
    ) -> Result<reqwest::Response, FortressError> {
        let url = self.build_url(site, endpoint, query);
        let auth = self.authorization_header("POST", &url)?;
        let field = field_name.to_string();
        let name = file_name.to_string();

        let builder = || {
            let part = multipart::Part::bytes(bytes.clone()).file_name(name.clone());
            let form = multipart::Form::new().part(field.clone(), part);
            let mut req = self.http.post(&url).multipart(form);
            if let Some(value) = &auth {
                req = req.header("Authorization", value.clone());
            }
            req
        };
        self.execute_with_retry(builder, &format!("UPLOAD {endpoint}"))
            .await
    }

    /// Execute a request with bounded retries.
    ///
    /// 5xx and transport errors back off exponentially; 429 honors the
    /// `Retry-After` header and draws from its own attempt budget. Any other
    /// response is returned to the caller untouched - status interpretation
    /// belongs to the API modules.
    async fn execute_with_retry<F>(
        &self,
        request_builder: F,
        operation: &str,
    ) -> Result<reqwest::Response, FortressError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let retry = &self.config.retry;
        let mut rate_limit_attempts: u32 = 0;
        let mut last_error: Option<FortressError> = None;

        for attempt in 1..=retry.max_attempts.saturating_add(1) {
            match request_builder().send().await {
                Ok(response) => {
                    let status = response.status().as_u16();

                    if status == 429 {
                        rate_limit_attempts = rate_limit_attempts.saturating_add(1);
                        if rate_limit_attempts > retry.rate_limit_max_attempts {
                            return Err(FortressError::RetryExhausted(format!(
                                "{operation} rate limited after {rate_limit_attempts} attempts"
                            )));
                        }
                        let delay = response
                            .headers()
                            .get("retry-after")
                            .and_then(|h| h.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                            .map_or_else(|| retry.backoff_delay(attempt), Duration::from_secs);
                        warn!("{operation} rate limited, waiting {}s", delay.as_secs());
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    if status >= 500 && attempt <= retry.max_attempts {
                        let delay = retry.backoff_delay(attempt);
                        warn!(
                            "{operation} returned HTTP {status} on attempt {attempt}, retrying in {}ms",
                            delay.as_millis()
                        );
                        tokio::time::sleep(delay).await;
                        last_error = Some(FortressError::InvalidResponse(format!(
                            "HTTP {status} from {operation}"
                        )));
                        continue;
                    }

                    if attempt > 1 {
                        info!("{operation} succeeded on attempt {attempt}");
                    } else {
                        debug!("{operation} -> HTTP {status}");
                    }
                    return Ok(response);
                }
                Err(e) => {
                    if attempt > retry.max_attempts {
                        return Err(FortressError::Http(e));
                    }
                    let delay = retry.backoff_delay(attempt);
                    warn!(
                        "{operation} transport error on attempt {attempt}: {e}, retrying in {}ms",
                        delay.as_millis()
                    );
                    last_error = Some(FortressError::Http(e));
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            FortressError::RetryExhausted(format!("{operation} failed with no attempts recorded"))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FortressConfig;

    fn test_client() -> FortressClient {
        let config = FortressConfig::new(
            "https://portal.fortress.example".to_string(),
            "https://admin.fortress.example".to_string(),
        )
        .with_api_credentials("test_id".to_string(), hex::encode("test_key"));
        FortressClient::new(config).expect("client should build")
    }

    #[test]
    fn test_build_url_with_params() {
        let client = test_client();
        let url = client.build_url(
            Site::Portal,
            "/api/v3/releases",
            Some(&[("name".to_string(), "rel one".to_string())]),
        );
        assert_eq!(
            url,
            "https://portal.fortress.example/api/v3/releases?name=rel%20one"
        );
    }

    #[test]
    fn test_build_url_admin_site() {
        let client = test_client();
        let url = client.build_url(Site::Admin, "/api/v3/tenants", None);
        assert_eq!(url, "https://admin.fortress.example/api/v3/tenants");
    }

    #[test]
    fn test_hmac_header_shape() {
        let client = test_client();
        let header = client
            .authorization_header("GET", "https://portal.fortress.example/api/v3/releases")
            .expect("signing should succeed")
            .expect("HMAC mode should produce a header");
        assert!(header.starts_with("FORTRESS-HMAC-SHA-256 id=test_id,ts="));
        assert!(header.contains(",nonce="));
        assert!(header.contains(",sig="));
    }

    #[test]
    fn test_chained_signature_deterministic() {
        let key = hex::encode("key material");
        let nonce = [7u8; 16];
        let a = FortressClient::chained_signature(&key, &nonce, 1_700_000_000_000, "data")
            .expect("signature");
        let b = FortressClient::chained_signature(&key, &nonce, 1_700_000_000_000, "data")
            .expect("signature");
        assert_eq!(a, b);
        let c = FortressClient::chained_signature(&key, &nonce, 1_700_000_000_001, "data")
            .expect("signature");
        assert_ne!(a, c);
    }

    #[test]
    fn test_bearer_token_client() {
        let client = test_client().with_bearer_token("tok-123".to_string());
        assert!(client.has_session());
        let header = client
            .authorization_header("GET", "https://portal.fortress.example/x")
            .expect("no signing needed")
            .expect("bearer header expected");
        assert_eq!(header, "Bearer tok-123");
    }

    #[test]
    fn test_transport_error_surfaces_as_http() {
        // Nothing listens on the discard port; with retries disabled the
        // connection failure must surface as FortressError::Http.
        let config = FortressConfig::new(
            "http://127.0.0.1:9".to_string(),
            "http://127.0.0.1:9".to_string(),
        )
        .with_retry(RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        });
        let client = FortressClient::new(config).expect("client should build");

        let result = tokio_test::block_on(client.get(Site::Portal, "/api/v3/ping", None));
        assert!(matches!(result, Err(FortressError::Http(_))));
    }

    #[test]
    fn test_backoff_delay_capped() {
        let retry = RetryConfig::default();
        assert_eq!(retry.backoff_delay(1), Duration::from_millis(500));
        assert_eq!(retry.backoff_delay(2), Duration::from_millis(1000));
        assert_eq!(retry.backoff_delay(10), Duration::from_millis(15_000));
    }
}

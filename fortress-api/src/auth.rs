//! Authentication: password logins, session revocation, and SAML SSO.
//!
//! A successful login mints a bearer token; the returned value is a *new*
//! `FortressClient` bound to that token, so callers never mutate an existing
//! session into a different principal.

use serde::{Deserialize, Serialize};

use crate::client::Site;
use crate::{FortressClient, FortressError};

/// Interactive user credentials for a portal login.
#[derive(Clone, Serialize)]
pub struct UserCredentials {
    pub tenant_code: String,
    pub username: String,
    password: String,
}

impl UserCredentials {
    #[must_use]
    pub fn new(tenant_code: String, username: String, password: String) -> Self {
        Self {
            tenant_code,
            username,
            password,
        }
    }
}

impl std::fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCredentials")
            .field("tenant_code", &self.tenant_code)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Token minted by any of the login endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: Option<u64>,
    /// Canonical username the token was issued for; for SSO logins this is
    /// the JIT-provisioned account name.
    pub principal: Option<String>,
}

/// Parameters for a SAML login through the lab IdP.
///
/// The IdP endpoint accepts form credentials and returns the base64 SAML
/// assertion, which is then exchanged at the portal's ACS endpoint. JIT
/// provisioning of the user and groups happens server-side during the
/// exchange.
#[derive(Debug, Clone)]
pub struct SamlLoginRequest {
    pub idp_sso_url: String,
    pub tenant_code: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
struct AcsExchangeRequest<'a> {
    saml_response: &'a str,
    tenant_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct IdpAssertionResponse {
    saml_response: String,
}

/// Authentication error types.
#[derive(Debug)]
pub enum AuthError {
    /// Underlying API error
    Api(FortressError),
    /// Credentials were rejected
    InvalidCredentials,
    /// The account exists but is deactivated
    AccountInactive,
    /// The IdP leg of an SSO login failed
    Saml(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Api(err) => write!(f, "API error: {err}"),
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::AccountInactive => write!(f, "Account is inactive"),
            AuthError::Saml(msg) => write!(f, "SAML login failed: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<FortressError> for AuthError {
    fn from(err: FortressError) -> Self {
        AuthError::Api(err)
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Api(FortressError::Http(err))
    }
}

/// Fortress authentication API operations.
pub struct AuthApi<'a> {
    client: &'a FortressClient,
}

impl<'a> AuthApi<'a> {
    #[must_use]
    pub fn new(client: &'a FortressClient) -> Self {
        Self { client }
    }

    /// Log in to the tenant portal and return a client bound to the session.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials` on 401, `AccountInactive` when the product
    /// reports a deactivated account, `Api` otherwise.
    pub async fn portal_login(
        &self,
        credentials: &UserCredentials,
    ) -> Result<FortressClient, AuthError> {
        let token = self
            .login_at(Site::Portal, "/api/v3/auth/token", credentials)
            .await?;
        Ok(self.client.with_bearer_token(token.access_token))
    }

    /// Log in to the admin site as an operator.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`Self::portal_login`].
    pub async fn admin_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<FortressClient, AuthError> {
        #[derive(Serialize)]
        struct AdminLoginRequest<'a> {
            username: &'a str,
            password: &'a str,
        }

        let body = AdminLoginRequest { username, password };
        let response = self
            .client
            .post(Site::Admin, "/api/v3/auth/token", Some(&body))
            .await?;
        let token = Self::token_from_response(response).await?;
        Ok(self.client.with_bearer_token(token.access_token))
    }

    /// Revoke the current bearer token on the given site.
    ///
    /// Idempotent: revoking an already-dead session is not an error, so
    /// teardown paths can always call this.
    ///
    /// # Errors
    ///
    /// Returns an error only for transport-level failures.
    pub async fn logout(&self, site: Site) -> Result<(), AuthError> {
        let response = self.client.delete(site, "/api/v3/auth/token", None).await?;
        match response.status().as_u16() {
            200 | 204 | 401 => Ok(()),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(AuthError::Api(FortressError::InvalidResponse(format!(
                    "HTTP {status}: {text}"
                ))))
            }
        }
    }

    /// Perform a SAML login: authenticate at the IdP, then exchange the
    /// assertion at the portal ACS endpoint.
    ///
    /// # Errors
    ///
    /// `Saml` for IdP-side failures, the usual taxonomy for the exchange.
    pub async fn sso_login(
        &self,
        request: &SamlLoginRequest,
    ) -> Result<(FortressClient, TokenResponse), AuthError> {
        // The IdP is a separate host, outside the two product sites, so it
        // gets its own plain HTTP client.
        let idp_client = reqwest::Client::new();
        let idp_response = idp_client
            .post(&request.idp_sso_url)
            .form(&[
                ("username", request.username.as_str()),
                ("password", request.password.as_str()),
            ])
            .send()
            .await?;

        let idp_status = idp_response.status().as_u16();
        if idp_status != 200 {
            let text = idp_response.text().await.unwrap_or_default();
            return Err(AuthError::Saml(format!("IdP returned HTTP {idp_status}: {text}")));
        }
        let assertion: IdpAssertionResponse = idp_response
            .json()
            .await
            .map_err(|e| AuthError::Saml(format!("IdP response not parseable: {e}")))?;

        let exchange = AcsExchangeRequest {
            saml_response: &assertion.saml_response,
            tenant_code: &request.tenant_code,
        };
        let response = self
            .client
            .post(Site::Portal, "/api/v3/auth/saml/acs", Some(&exchange))
            .await?;
        let token = Self::token_from_response(response).await?;
        let session = self.client.with_bearer_token(token.access_token.clone());
        Ok((session, token))
    }

    async fn login_at(
        &self,
        site: Site,
        endpoint: &str,
        credentials: &UserCredentials,
    ) -> Result<TokenResponse, AuthError> {
        let response = self.client.post(site, endpoint, Some(credentials)).await?;
        Self::token_from_response(response).await
    }

    async fn token_from_response(response: reqwest::Response) -> Result<TokenResponse, AuthError> {
        let status = response.status().as_u16();
        match status {
            200 => {
                let token: TokenResponse = response
                    .json()
                    .await
                    .map_err(|e| AuthError::Api(FortressError::Http(e)))?;
                Ok(token)
            }
            401 => Err(AuthError::InvalidCredentials),
            403 => {
                let text = response.text().await.unwrap_or_default();
                if text.to_lowercase().contains("inactive") {
                    Err(AuthError::AccountInactive)
                } else {
                    Err(AuthError::Api(FortressError::InvalidResponse(format!(
                        "HTTP 403: {text}"
                    ))))
                }
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(AuthError::Api(FortressError::InvalidResponse(format!(
                    "HTTP {status}: {text}"
                ))))
            }
        }
    }
}

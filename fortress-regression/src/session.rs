//! Cross-session identity switching.
//!
//! Many behaviors under test are role-dependent, so one scenario acts as
//! several principals in sequence: operator, TAM, a restricted tenant user,
//! an SSO user. Each principal gets its own `Session` holding its own
//! authenticated client; switching identities means logging the old session
//! off and building a new one from scratch. `log_off` consumes the session,
//! so stale handles cannot leak a previous principal's permissions into the
//! next step.

use fortress_platform::client::Site;
use fortress_platform::{FortressClient, SamlLoginRequest, TokenResponse, UserCredentials};
use log::info;

use crate::config::EnvConfig;
use crate::error::{HarnessError, Result};

/// An authenticated principal and the site it logged in to.
pub struct Session {
    client: FortressClient,
    site: Site,
    label: String,
}

impl Session {
    /// Log in to the admin site as the configured operator.
    ///
    /// # Errors
    ///
    /// Propagates authentication failures.
    pub async fn admin(config: &EnvConfig) -> Result<Session> {
        let base = FortressClient::new(config.client_config())?;
        let client = base
            .auth_api()
            .admin_login(&config.admin_username, &config.admin_password)
            .await?;
        info!("logged in to admin site as {}", config.admin_username);
        Ok(Session {
            client,
            site: Site::Admin,
            label: format!("admin:{}", config.admin_username),
        })
    }

    /// Log in to the tenant portal as a tenant's TAM user.
    ///
    /// # Errors
    ///
    /// Propagates authentication failures.
    pub async fn tam(config: &EnvConfig, tenant_code: &str, tam_username: &str) -> Result<Session> {
        Self::tenant_user(config, tenant_code, tam_username, &config.tam_password).await
    }

    /// Log in to the tenant portal as an arbitrary tenant user.
    ///
    /// # Errors
    ///
    /// Propagates authentication failures.
    pub async fn tenant_user(
        config: &EnvConfig,
        tenant_code: &str,
        username: &str,
        password: &str,
    ) -> Result<Session> {
        let base = FortressClient::new(config.client_config())?;
        let credentials = UserCredentials::new(
            tenant_code.to_string(),
            username.to_string(),
            password.to_string(),
        );
        let client = base.auth_api().portal_login(&credentials).await?;
        info!("logged in to portal as {tenant_code}\\{username}");
        Ok(Session {
            client,
            site: Site::Portal,
            label: format!("portal:{tenant_code}\\{username}"),
        })
    }

    /// Log in through the SAML IdP. First login JIT-provisions the user.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when no IdP is configured; authentication errors
    /// otherwise.
    pub async fn sso(
        config: &EnvConfig,
        tenant_code: &str,
        username: &str,
        password: &str,
    ) -> Result<(Session, TokenResponse)> {
        let idp_sso_url = config.idp_sso_url.clone().ok_or_else(|| {
            HarnessError::InvalidConfig("FORTRESS_IDP_SSO_URL is not set".to_string())
        })?;

        let base = FortressClient::new(config.client_config())?;
        let request = SamlLoginRequest {
            idp_sso_url,
            tenant_code: tenant_code.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        };
        let (client, token) = base.auth_api().sso_login(&request).await?;
        info!("logged in via SSO as {tenant_code}\\{username}");
        Ok((
            Session {
                client,
                site: Site::Portal,
                label: format!("sso:{tenant_code}\\{username}"),
            },
            token,
        ))
    }

    /// The authenticated client for this principal.
    #[must_use]
    pub fn client(&self) -> &FortressClient {
        &self.client
    }

    /// Human-readable principal label, for log lines and error messages.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Revoke the session server-side and drop the client.
    ///
    /// Consumes the session: after this call nothing can issue requests as
    /// the old principal, which is the isolation property the fan-out and
    /// permission suites rely on.
    ///
    /// # Errors
    ///
    /// Transport-level failures only; an already-dead session is fine.
    pub async fn log_off(self) -> Result<()> {
        self.client.auth_api().logout(self.site).await?;
        info!("logged off {}", self.label);
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("label", &self.label)
            .field("site", &self.site)
            .finish()
    }
}

//! Environment configuration for the harness.
//!
//! Everything comes from `FORTRESS_*` environment variables so the same
//! suites run unchanged against any lab environment. Mandatory variables are
//! validated together so a misconfigured runner fails once, with the full
//! list of what is missing.

use std::env;

use fortress_platform::FortressConfig;

use crate::error::{HarnessError, Result};

/// Environment flag that enables the live suites.
pub const E2E_FLAG: &str = "FORTRESS_E2E";

/// Typed view of the harness environment.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Tenant portal base URL
    pub portal_url: String,
    /// Admin site base URL
    pub admin_url: String,
    /// Operator login for the admin site
    pub admin_username: String,
    pub admin_password: String,
    /// Password assigned to TAM users of tenants this run provisions
    pub tam_password: String,
    /// Service API credentials, when HMAC-signed calls are wanted
    pub api_id: Option<String>,
    pub api_key: Option<String>,
    /// Postgres URL for the SQL verification backdoor
    pub database_url: Option<String>,
    /// Mail-capture server base URL
    pub mail_url: Option<String>,
    /// Bug-tracker base URL and client credentials
    pub bugtracker_url: Option<String>,
    pub bugtracker_client_id: Option<String>,
    pub bugtracker_client_secret: Option<String>,
    /// SAML IdP single-sign-on endpoint
    pub idp_sso_url: Option<String>,
    /// Directory holding scan payload fixtures
    pub payload_dir: String,
}

impl EnvConfig {
    /// Load the configuration from the environment.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` naming every missing mandatory variable.
    pub fn from_env() -> Result<Self> {
        let mut missing = Vec::new();
        let mut required = |name: &str| match env::var(name) {
            Ok(value) if !value.is_empty() => value,
            _ => {
                missing.push(name.to_string());
                String::new()
            }
        };

        let portal_url = required("FORTRESS_PORTAL_URL");
        let admin_url = required("FORTRESS_ADMIN_URL");
        let admin_username = required("FORTRESS_ADMIN_USER");
        let admin_password = required("FORTRESS_ADMIN_PASSWORD");
        let tam_password = required("FORTRESS_TAM_PASSWORD");

        if !missing.is_empty() {
            return Err(HarnessError::InvalidConfig(format!(
                "missing environment variables: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            portal_url: portal_url.trim_end_matches('/').to_string(),
            admin_url: admin_url.trim_end_matches('/').to_string(),
            admin_username,
            admin_password,
            tam_password,
            api_id: env::var("FORTRESS_API_ID").ok().filter(|v| !v.is_empty()),
            api_key: env::var("FORTRESS_API_KEY").ok().filter(|v| !v.is_empty()),
            database_url: env::var("FORTRESS_DATABASE_URL").ok().filter(|v| !v.is_empty()),
            mail_url: env::var("FORTRESS_MAIL_URL").ok().filter(|v| !v.is_empty()),
            bugtracker_url: env::var("FORTRESS_BUGTRACKER_URL").ok().filter(|v| !v.is_empty()),
            bugtracker_client_id: env::var("FORTRESS_BUGTRACKER_CLIENT_ID")
                .ok()
                .filter(|v| !v.is_empty()),
            bugtracker_client_secret: env::var("FORTRESS_BUGTRACKER_CLIENT_SECRET")
                .ok()
                .filter(|v| !v.is_empty()),
            idp_sso_url: env::var("FORTRESS_IDP_SSO_URL").ok().filter(|v| !v.is_empty()),
            payload_dir: env::var("FORTRESS_PAYLOAD_DIR")
                .unwrap_or_else(|_| "payloads".to_string()),
        })
    }

    /// Whether the live end-to-end suites should run at all.
    #[must_use]
    pub fn e2e_enabled() -> bool {
        env::var(E2E_FLAG).is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
    }

    /// Client configuration for the two product sites.
    #[must_use]
    pub fn client_config(&self) -> FortressConfig {
        let mut config = FortressConfig::new(self.portal_url.clone(), self.admin_url.clone());
        if let (Some(id), Some(key)) = (&self.api_id, &self.api_key) {
            config = config.with_api_credentials(id.clone(), key.clone());
        }
        config
    }

    /// Absolute path of a payload fixture.
    #[must_use]
    pub fn payload_path(&self, relative: &str) -> std::path::PathBuf {
        std::path::Path::new(&self.payload_dir).join(relative)
    }

    /// Read a payload fixture into memory.
    ///
    /// # Errors
    ///
    /// `Io` when the file is absent or unreadable.
    pub fn load_payload(&self, relative: &str) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.payload_path(relative))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var tests mutate process state; keep them in one test so they
    // cannot race each other under the parallel test runner.
    #[test]
    fn test_from_env_missing_lists_all() {
        let vars = [
            "FORTRESS_PORTAL_URL",
            "FORTRESS_ADMIN_URL",
            "FORTRESS_ADMIN_USER",
            "FORTRESS_ADMIN_PASSWORD",
            "FORTRESS_TAM_PASSWORD",
        ];
        let saved: Vec<_> = vars.iter().map(|v| (v, env::var(v).ok())).collect();
        for var in vars {
            unsafe { env::remove_var(var) };
        }

        let err = EnvConfig::from_env().expect_err("config must be incomplete");
        let message = err.to_string();
        for var in vars {
            assert!(message.contains(var), "missing {var} in '{message}'");
        }

        for (var, value) in saved {
            if let Some(value) = value {
                unsafe { env::set_var(var, value) };
            }
        }
    }

    #[test]
    fn test_load_payload_reads_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(dir.path().join("fod")).expect("payload subdir");
        std::fs::write(dir.path().join("fod/tiny.zip"), b"PK\x03\x04").expect("payload file");

        let mut config = minimal_config();
        config.payload_dir = dir.path().to_string_lossy().into_owned();

        let bytes = config.load_payload("fod/tiny.zip").expect("payload loads");
        assert!(bytes.starts_with(b"PK"));
        assert!(config.load_payload("fod/absent.zip").is_err());
    }

    fn minimal_config() -> EnvConfig {
        EnvConfig {
            portal_url: "p".into(),
            admin_url: "a".into(),
            admin_username: "u".into(),
            admin_password: "pw".into(),
            tam_password: "pw".into(),
            api_id: None,
            api_key: None,
            database_url: None,
            mail_url: None,
            bugtracker_url: None,
            bugtracker_client_id: None,
            bugtracker_client_secret: None,
            idp_sso_url: None,
            payload_dir: "payloads".into(),
        }
    }

    #[test]
    fn test_payload_path_joins() {
        let config = minimal_config();
        assert_eq!(
            config.payload_path("fod/static.java.fpr"),
            std::path::Path::new("payloads/fod/static.java.fpr")
        );
    }
}

//! Minimal defect-tracker client for bug-tracker round-trip suites.
//!
//! The product pushes defects into a ValueEdge/ALM Octane-style tracker;
//! the suites then read the defect back through the tracker's own REST API
//! to verify descriptions, redirect links, and edits made directly in the
//! tracker. Only the handful of operations the suites need are implemented.

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};

/// A defect as the tracker reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct Defect {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Client-credential tracker client.
pub struct DefectTracker {
    base_url: String,
    client_id: String,
    client_secret: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl DefectTracker {
    #[must_use]
    pub fn new(base_url: &str, client_id: &str, client_secret: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token: None,
            http: reqwest::Client::new(),
        }
    }

    /// Sign in with client credentials; stores the access token for
    /// subsequent calls.
    ///
    /// # Errors
    ///
    /// `BugTracker` for rejected credentials or transport failures.
    pub async fn authenticate(&mut self) -> Result<()> {
        #[derive(Serialize)]
        struct SignInRequest<'a> {
            client_id: &'a str,
            client_secret: &'a str,
        }

        #[derive(Deserialize)]
        struct SignInResponse {
            access_token: String,
        }

        let url = format!("{}/authentication/sign_in", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&SignInRequest {
                client_id: &self.client_id,
                client_secret: &self.client_secret,
            })
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let text = response.text().await.unwrap_or_default();
            return Err(HarnessError::BugTracker(format!(
                "sign-in failed, HTTP {status}: {text}"
            )));
        }
        let signed_in: SignInResponse = response.json().await?;
        self.token = Some(signed_in.access_token);
        Ok(())
    }

    /// Fetch a defect by id.
    ///
    /// # Errors
    ///
    /// `BugTracker` when unauthenticated, for 404s, and for transport
    /// failures.
    pub async fn get_defect(&self, defect_id: &str) -> Result<Defect> {
        let token = self.require_token()?;
        let url = format!("{}/api/defects/{defect_id}", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status().as_u16();
        match status {
            200 => Ok(response.json().await?),
            404 => Err(HarnessError::BugTracker(format!(
                "defect {defect_id} not found"
            ))),
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(HarnessError::BugTracker(format!("HTTP {status}: {text}")))
            }
        }
    }

    /// Overwrite a defect's description - the "custom edit made directly in
    /// the tracker" the copy-state suites expect to survive.
    ///
    /// # Errors
    ///
    /// `BugTracker` when unauthenticated or the update is rejected.
    pub async fn update_description(&self, defect_id: &str, description: &str) -> Result<()> {
        #[derive(Serialize)]
        struct UpdateRequest<'a> {
            description: &'a str,
        }

        let token = self.require_token()?;
        let url = format!("{}/api/defects/{defect_id}", self.base_url);
        let response = self
            .http
            .put(&url)
            .bearer_auth(token)
            .json(&UpdateRequest { description })
            .send()
            .await?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let text = response.text().await.unwrap_or_default();
            return Err(HarnessError::BugTracker(format!("HTTP {status}: {text}")));
        }
        Ok(())
    }

    fn require_token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| HarnessError::BugTracker("not authenticated".to_string()))
    }
}

impl std::fmt::Debug for DefectTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefectTracker")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

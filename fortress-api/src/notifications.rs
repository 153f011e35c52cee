//! Notifications and subscriptions.
//!
//! A subscription is a (trigger, scope, send-email) tuple owned by a user;
//! the product fans events out to in-app notifications and optionally email.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Site;
use crate::{FortressClient, FortressError};

/// A user's subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: u64,
    pub trigger: String,
    pub scope: String,
    pub send_email: bool,
}

/// Request payload for creating a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubscriptionRequest {
    /// Event trigger, e.g. "Scan Completed".
    pub trigger: String,
    /// Scope, e.g. "All Applications" or an application name.
    pub scope: String,
    pub send_email: bool,
}

/// An in-app notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub trigger: String,
    pub message: String,
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub read: bool,
}

/// Notifications-specific error types.
#[derive(Debug)]
pub enum NotificationsError {
    /// Fortress API error
    Api(FortressError),
    /// Subscription not found
    NotFound,
    /// Request payload rejected
    InvalidInput(String),
}

impl std::fmt::Display for NotificationsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationsError::Api(err) => write!(f, "API error: {err}"),
            NotificationsError::NotFound => write!(f, "Subscription not found"),
            NotificationsError::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
        }
    }
}

impl std::error::Error for NotificationsError {}

impl From<FortressError> for NotificationsError {
    fn from(err: FortressError) -> Self {
        NotificationsError::Api(err)
    }
}

impl From<reqwest::Error> for NotificationsError {
    fn from(err: reqwest::Error) -> Self {
        NotificationsError::Api(FortressError::Http(err))
    }
}

/// Fortress notifications API (tenant portal, per-principal).
pub struct NotificationsApi<'a> {
    client: &'a FortressClient,
}

impl<'a> NotificationsApi<'a> {
    #[must_use]
    pub fn new(client: &'a FortressClient) -> Self {
        Self { client }
    }

    /// Create a subscription for the current principal.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for unknown triggers or scopes.
    pub async fn create_subscription(
        &self,
        request: &CreateSubscriptionRequest,
    ) -> Result<Subscription, NotificationsError> {
        let response = self
            .client
            .post(Site::Portal, "/api/v3/subscriptions", Some(request))
            .await?;

        let status = response.status().as_u16();
        match status {
            200 | 201 => Ok(response.json().await?),
            400 => {
                let text = response.text().await.unwrap_or_default();
                Err(NotificationsError::InvalidInput(text))
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(NotificationsError::Api(FortressError::InvalidResponse(
                    format!("HTTP {status}: {text}"),
                )))
            }
        }
    }

    /// List the current principal's subscriptions.
    ///
    /// # Errors
    ///
    /// Returns an error for any non-200 response.
    pub async fn list_subscriptions(&self) -> Result<Vec<Subscription>, NotificationsError> {
        #[derive(Deserialize)]
        struct SubscriptionListResponse {
            items: Vec<Subscription>,
        }

        let response = self
            .client
            .get(Site::Portal, "/api/v3/subscriptions", None)
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let text = response.text().await.unwrap_or_default();
            return Err(NotificationsError::Api(FortressError::InvalidResponse(
                format!("HTTP {status}: {text}"),
            )));
        }
        let list: SubscriptionListResponse = response.json().await?;
        Ok(list.items)
    }

    /// Delete a subscription.
    ///
    /// # Errors
    ///
    /// `NotFound` on 404.
    pub async fn delete_subscription(&self, subscription_id: u64) -> Result<(), NotificationsError> {
        let endpoint = format!("/api/v3/subscriptions/{subscription_id}");
        let response = self.client.delete(Site::Portal, &endpoint, None).await?;

        match response.status().as_u16() {
            200 | 204 => Ok(()),
            404 => Err(NotificationsError::NotFound),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(NotificationsError::Api(FortressError::InvalidResponse(
                    format!("HTTP {status}: {text}"),
                )))
            }
        }
    }

    /// List the current principal's in-app notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error for any non-200 response.
    pub async fn list_notifications(&self) -> Result<Vec<Notification>, NotificationsError> {
        #[derive(Deserialize)]
        struct NotificationListResponse {
            items: Vec<Notification>,
        }

        let response = self
            .client
            .get(Site::Portal, "/api/v3/notifications", None)
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let text = response.text().await.unwrap_or_default();
            return Err(NotificationsError::Api(FortressError::InvalidResponse(
                format!("HTTP {status}: {text}"),
            )));
        }
        let list: NotificationListResponse = response.json().await?;
        Ok(list.items)
    }
}

//! Subscription and notification workflows.

use std::time::Duration;

use fortress_platform::{Notification, Subscription};
use log::info;

use crate::error::{HarnessError, Result};
use crate::fixtures::SubscriptionFixture;
use crate::session::Session;
use crate::wait::{self, WaitOptions};

/// Fan-out is quick but not synchronous.
const NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Create a subscription for the current principal.
///
/// # Errors
///
/// Propagates API failures.
pub async fn subscribe(portal: &Session, fixture: &SubscriptionFixture) -> Result<Subscription> {
    let subscription = portal
        .client()
        .notifications_api()
        .create_subscription(&fixture.to_request())
        .await?;
    info!(
        "subscribed {} to '{}' (email: {})",
        portal.label(),
        fixture.trigger,
        fixture.send_email
    );
    Ok(subscription)
}

/// Wait for an in-app notification matching trigger and message fragment.
///
/// # Errors
///
/// `WaitTimeout` when nothing arrives, `ElementNotFound` if it vanishes
/// between the final poll and the fetch.
pub async fn expect_notification(
    portal: &Session,
    trigger: &str,
    message_part: &str,
    timeout: Option<Duration>,
) -> Result<Notification> {
    let options = WaitOptions::timeout(timeout.unwrap_or(NOTIFICATION_TIMEOUT));
    wait::wait_until(
        &format!("notification '{trigger}' containing '{message_part}'"),
        &options,
        || async move { has_notification(portal, trigger, message_part).await },
    )
    .await?;

    let notifications = portal.client().notifications_api().list_notifications().await?;
    notifications
        .into_iter()
        .find(|n| n.trigger == trigger && n.message.contains(message_part))
        .ok_or_else(|| {
            HarnessError::ElementNotFound(format!("notification '{trigger}' after arrival"))
        })
}

/// One-shot check (no wait) whether a matching notification exists. Used to
/// assert the *absence* of fan-out for unsubscribed principals.
///
/// # Errors
///
/// Propagates API failures.
pub async fn has_notification(
    portal: &Session,
    trigger: &str,
    message_part: &str,
) -> Result<bool> {
    let notifications = portal.client().notifications_api().list_notifications().await?;
    Ok(notifications
        .iter()
        .any(|n| n.trigger == trigger && n.message.contains(message_part)))
}

//! Release workflows, including copy-state creation.

use fortress_platform::Release;
use log::info;

use crate::error::{HarnessError, Result};
use crate::fixtures::ReleaseFixture;
use crate::session::Session;

/// Create a release for an application. When the fixture names a copy-state
/// source, the source is resolved by name first - it must already exist and
/// be in a completed or cancelled state (the product enforces the latter).
///
/// # Errors
///
/// `ElementNotFound` when the named source release does not exist,
/// `ElementNotCreated` when the release is absent after creation.
pub async fn create_release(
    portal: &Session,
    application_id: u64,
    fixture: &ReleaseFixture,
) -> Result<Release> {
    let client = portal.client();

    let source_release_id = match &fixture.copy_from_release_name {
        Some(source_name) => {
            let source = client
                .release_api()
                .get_release_by_name(application_id, source_name)
                .await?
                .ok_or_else(|| {
                    HarnessError::ElementNotFound(format!(
                        "copy-state source release '{source_name}'"
                    ))
                })?;
            Some(source.id)
        }
        None => None,
    };

    info!(
        "creating release '{}'{}",
        fixture.release_name,
        source_release_id
            .map(|id| format!(" (copy state from release {id})"))
            .unwrap_or_default()
    );
    client
        .release_api()
        .create_release(&fixture.to_request(application_id, source_release_id))
        .await?;

    client
        .release_api()
        .get_release_by_name(application_id, &fixture.release_name)
        .await?
        .ok_or_else(|| {
            HarnessError::ElementNotCreated(format!(
                "release '{}' absent after creation",
                fixture.release_name
            ))
        })
}

/// Retire a release.
///
/// # Errors
///
/// Propagates API failures.
pub async fn retire_release(portal: &Session, release_id: u64) -> Result<()> {
    portal.client().release_api().retire_release(release_id).await?;
    Ok(())
}

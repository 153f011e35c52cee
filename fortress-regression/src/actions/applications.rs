//! Application creation workflows.

use fortress_platform::{Application, Release};
use log::info;

use crate::error::{HarnessError, Result};
use crate::fixtures::ApplicationFixture;
use crate::session::Session;

/// Create an application (with its first release) and hand back both.
///
/// # Errors
///
/// `ElementNotCreated` when the application or its first release is absent
/// after the create call returned.
pub async fn create_application(
    portal: &Session,
    fixture: &ApplicationFixture,
) -> Result<(Application, Release)> {
    info!("creating application '{}'", fixture.application_name);
    let client = portal.client();
    client.applications_api().create_application(&fixture.to_request()).await?;

    let application = client
        .applications_api()
        .get_application_by_name(&fixture.application_name)
        .await?
        .ok_or_else(|| {
            HarnessError::ElementNotCreated(format!(
                "application '{}' absent after creation",
                fixture.application_name
            ))
        })?;

    let release = client
        .release_api()
        .get_release_by_name(application.id, &fixture.release_name)
        .await?
        .ok_or_else(|| {
            HarnessError::ElementNotCreated(format!(
                "first release '{}' absent for application '{}'",
                fixture.release_name, fixture.application_name
            ))
        })?;

    Ok((application, release))
}

//! Auditing from the release issues view: grouped selection semantics,
//! bulk audit, and history recording.

mod common;

use fortress_platform::{AnalysisType, AuditChange, GridQuery, Severity};
use fortress_regression::actions::{applications, issues, releases, scans};
use fortress_regression::fixtures::{ApplicationFixture, ReleaseFixture, TenantFixture};
use fortress_regression::selection::IssueSelection;
use serial_test::serial;

// Environment fixture facts: the canonical CycloneDX payload yields 26 open
// source findings and the FPR yields 4 static findings; the counts are
// properties of the payload files, not of this repository.
const CYCLONEDX_PAYLOAD: &str = "fod/21210_51134_cyclonedx.json";
const FPR_PAYLOAD: &str = "fod/static.java.fpr";
const OPEN_SOURCE_ISSUES: u64 = 26;
const STATIC_ISSUES: u64 = 4;

#[tokio::test]
#[serial]
async fn grouped_selection_and_bulk_audit() {
    let Some(ctx) = common::live() else { return };

    let tenant_fixture = TenantFixture::default_instance();
    let provisioned = ctx
        .provision_tenant(&tenant_fixture)
        .await
        .expect("tenant should provision");
    let tam = ctx
        .tam(&tenant_fixture, &provisioned.tenant.tenant_code)
        .await
        .expect("tam login");

    let (application, release) =
        applications::create_application(&tam, &ApplicationFixture::default_instance())
            .await
            .expect("application");
    let second_release =
        releases::create_release(&tam, application.id, &ReleaseFixture::default_instance())
            .await
            .expect("second release");

    // Both releases get both result sets, like the canonical fixture data.
    for target in [second_release.id, release.id] {
        let imported = scans::import_scan(
            &tam,
            target,
            AnalysisType::OpenSource,
            CYCLONEDX_PAYLOAD,
            ctx.payload(CYCLONEDX_PAYLOAD),
        )
        .await
        .expect("open source import completes");
        assert!(
            imported.total_count.unwrap_or(0) > 0,
            "imported open source scan should carry issues"
        );
        scans::import_scan(
            &tam,
            target,
            AnalysisType::Static,
            FPR_PAYLOAD,
            ctx.payload(FPR_PAYLOAD),
        )
        .await
        .expect("static import completes");
    }

    // --- grouped selection semantics ------------------------------------
    let groups = tam
        .client()
        .issues_api()
        .group_issues(release.id, "scanType")
        .await
        .expect("grouping by scan type");

    let open_source_group = groups
        .iter()
        .find(|g| g.name == AnalysisType::OpenSource.type_value())
        .expect("open source group present");
    let static_group = groups
        .iter()
        .find(|g| g.name == AnalysisType::Static.type_value())
        .expect("static group present");
    assert_eq!(open_source_group.count, OPEN_SOURCE_ISSUES);
    assert_eq!(static_group.count, STATIC_ISSUES);

    let mut selection = IssueSelection::new(&groups);
    let claimed = selection.select_group("Open Source").expect("group selects");
    assert_eq!(claimed as u64, OPEN_SOURCE_ISSUES);

    // Inside the selected group individual checkboxes are disabled...
    let inside = open_source_group.issue_ids[0];
    assert!(!selection.is_issue_selectable(inside));
    assert!(selection.select_issue(inside).is_err());
    // ...while the static rows stay individually selectable.
    let outside = static_group.issue_ids[0];
    assert!(selection.is_issue_selectable(outside));
    selection.select_issue(outside).expect("static row selects");
    assert_eq!(
        selection.selected_issue_ids().len() as u64,
        OPEN_SOURCE_ISSUES + 1
    );

    // Unselecting the group releases exactly its members.
    selection.unselect_group("Open Source").expect("group unselects");
    assert_eq!(selection.selected_issue_ids(), vec![outside]);

    // --- the issues grid exposes the audit columns ----------------------
    let grid = tam
        .client()
        .issues_api()
        .issues_grid(release.id, &GridQuery::new())
        .await
        .expect("issues grid");
    for column in ["Issue Id", "Release", "Primary Location", "Audited", "Attachments", "Scan Tool"] {
        assert!(
            grid.column_index(column).is_some(),
            "issues grid should have a '{column}' column"
        );
    }
    let release_column = grid
        .column_values_by_name("Release")
        .expect("release column readable");
    assert!(release_column.iter().all(|v| *v == release.release_name));

    // --- bulk audit the whole open source group to Low ------------------
    let before = tam
        .client()
        .issues_api()
        .severity_counts(release.id)
        .await
        .expect("severity counts");

    let audited_ids = issues::audit_group(
        &tam,
        release.id,
        "scanType",
        "Open Source",
        &AuditChange::severity(Severity::Low).with_comment("bulk triage to low"),
    )
    .await
    .expect("bulk audit");
    assert_eq!(audited_ids.len() as u64, OPEN_SOURCE_ISSUES);

    let after = tam
        .client()
        .issues_api()
        .severity_counts(release.id)
        .await
        .expect("severity counts after audit");
    assert_eq!(after.critical, 0, "open source criticals were downgraded");
    assert_eq!(
        after.low,
        before.low + before.critical,
        "downgraded criticals landed in low"
    );

    // History of an audited issue records the change verbatim.
    let history = tam
        .client()
        .issues_api()
        .history(audited_ids[0])
        .await
        .expect("issue history");
    assert!(
        history
            .iter()
            .any(|e| e.event.contains("Changed Severity from '(Default)' to 'Low'")),
        "history should record the severity change, got: {history:?}"
    );

    tam.log_off().await.expect("tam log off");
}

#[tokio::test]
#[serial]
async fn issues_from_other_releases_share_instance_ids() {
    let Some(ctx) = common::live() else { return };

    let tenant_fixture = TenantFixture::default_instance();
    let provisioned = ctx
        .provision_tenant(&tenant_fixture)
        .await
        .expect("tenant should provision");
    let tam = ctx
        .tam(&tenant_fixture, &provisioned.tenant.tenant_code)
        .await
        .expect("tam login");

    let (application, release) =
        applications::create_application(&tam, &ApplicationFixture::default_instance())
            .await
            .expect("application");
    let second_release =
        releases::create_release(&tam, application.id, &ReleaseFixture::default_instance())
            .await
            .expect("second release");

    for target in [release.id, second_release.id] {
        scans::import_scan(
            &tam,
            target,
            AnalysisType::OpenSource,
            CYCLONEDX_PAYLOAD,
            ctx.payload(CYCLONEDX_PAYLOAD),
        )
        .await
        .expect("import completes");
    }

    // The same finding imported into two releases keeps one instance id,
    // which is what "include issues from other releases" joins on.
    let location = "cryptography@37.0.2";
    let first = issues::find_issue_by_location(&tam, release.id, location)
        .await
        .expect("finding in first release");
    let second = issues::find_issue_by_location(&tam, second_release.id, location)
        .await
        .expect("finding in second release");

    assert_ne!(first.id, second.id, "issue ids are per release");
    assert_eq!(
        first.instance_id, second.instance_id,
        "instance id is stable across releases"
    );
    assert_eq!(first.scan_tool, "Debricked");

    tam.log_off().await.expect("tam log off");
}

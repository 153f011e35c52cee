//! SAML SSO: first login JIT-provisions the user, later logins reuse the
//! same account.

mod common;

use fortress_regression::fixtures::TenantFixture;
use fortress_regression::runtag;
use fortress_regression::session::Session;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn first_sso_login_provisions_user_just_in_time() {
    let Some(ctx) = common::live() else { return };
    if ctx.config.idp_sso_url.is_none() {
        eprintln!("skipping: SAML IdP is not configured");
        return;
    }

    let tenant_fixture = TenantFixture::default_instance();
    let provisioned = ctx
        .provision_tenant(&tenant_fixture)
        .await
        .expect("tenant should provision");
    let tenant_code = provisioned.tenant.tenant_code.clone();

    // The IdP test realm accepts any user of the form below with the shared
    // lab password; the account must NOT pre-exist in the product.
    let sso_username = runtag::unique_email("sso");
    let tam = ctx.tam(&tenant_fixture, &tenant_code).await.expect("tam login");
    let pre_existing = tam
        .client()
        .identity_api()
        .get_user_by_name(&sso_username)
        .await
        .expect("user lookup");
    assert!(pre_existing.is_none(), "SSO user must not exist before login");

    // First login: JIT provisioning.
    let (session, token) = Session::sso(
        &ctx.config,
        &tenant_code,
        &sso_username,
        &ctx.config.tam_password,
    )
    .await
    .expect("first SSO login");
    assert_eq!(token.principal.as_deref(), Some(sso_username.as_str()));
    session.log_off().await.expect("sso session log off");

    let created = tam
        .client()
        .identity_api()
        .get_user_by_name(&sso_username)
        .await
        .expect("user lookup")
        .expect("JIT provisioning created the user");
    assert!(created.sso_provisioned, "account should be marked as SSO-provisioned");

    // Second login: reuse, not re-provisioning.
    let (session, token) = Session::sso(
        &ctx.config,
        &tenant_code,
        &sso_username,
        &ctx.config.tam_password,
    )
    .await
    .expect("second SSO login");
    assert_eq!(token.principal.as_deref(), Some(sso_username.as_str()));
    session.log_off().await.expect("sso session log off");

    let after_second = tam
        .client()
        .identity_api()
        .get_user_by_name(&sso_username)
        .await
        .expect("user lookup")
        .expect("user still present");
    assert_eq!(
        after_second.id, created.id,
        "second login must reuse the JIT-provisioned account"
    );

    tam.log_off().await.expect("tam log off");
}

//! Fixture builders: randomized-but-valid domain objects.
//!
//! Every builder produces an instance that the product will accept as-is,
//! with all names routed through the run-tag generator so parallel runs
//! cannot collide. Scenario-specific overrides go through the fluent
//! `with_*` setters, mirroring how the suites tweak one or two fields of an
//! otherwise default instance.

use fortress_platform::{
    AnalysisType, AuditPreference, CreateApplicationRequest, CreateEntitlementRequest,
    CreateReleaseRequest, CreateSubscriptionRequest, CreateTenantRequest, CreateUserRequest,
    EntitlementFrequency, EntitlementModel, EntitlementType, PaymentModel, StartScanRequest,
    SubscriptionModel, TechnologyStack,
};
use fortress_platform::app::AppType;
use fortress_platform::app::BusinessCriticality;
use fortress_platform::identity::ApplicationAccess;
use fortress_platform::identity::CreateRoleRequest;

use crate::runtag::{unique_code, unique_email, unique_name};

/// Tenant fixture with a default entitlement attached.
#[derive(Debug, Clone)]
pub struct TenantFixture {
    pub tenant_name: String,
    pub tenant_code: String,
    pub tam_username: String,
    pub entitlement_model: EntitlementModel,
    pub subscription_model: SubscriptionModel,
    pub payment_model: PaymentModel,
    pub options_to_enable: Vec<String>,
    /// Entitlement provisioned right after the tenant, if any.
    pub entitlement: Option<EntitlementFixture>,
}

impl TenantFixture {
    #[must_use]
    pub fn default_instance() -> Self {
        Self {
            tenant_name: unique_name("tenant"),
            tenant_code: unique_code("T"),
            tam_username: unique_email("tam"),
            entitlement_model: EntitlementModel::Units,
            subscription_model: SubscriptionModel::Period,
            payment_model: PaymentModel::Other,
            options_to_enable: Vec::new(),
            entitlement: Some(EntitlementFixture::default_instance()),
        }
    }

    #[must_use]
    pub fn with_entitlement_model(mut self, model: EntitlementModel) -> Self {
        self.entitlement_model = model;
        self
    }

    #[must_use]
    pub fn with_subscription_model(mut self, model: SubscriptionModel) -> Self {
        self.subscription_model = model;
        self
    }

    #[must_use]
    pub fn with_payment_model(mut self, model: PaymentModel) -> Self {
        self.payment_model = model;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options_to_enable = options.iter().map(|o| (*o).to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_entitlement(mut self, entitlement: EntitlementFixture) -> Self {
        self.entitlement = Some(entitlement);
        self
    }

    #[must_use]
    pub fn without_entitlement(mut self) -> Self {
        self.entitlement = None;
        self
    }

    #[must_use]
    pub fn to_request(&self) -> CreateTenantRequest {
        CreateTenantRequest {
            tenant_name: self.tenant_name.clone(),
            tenant_code: self.tenant_code.clone(),
            tam_username: Some(self.tam_username.clone()),
            entitlement_model: self.entitlement_model,
            subscription_model: self.subscription_model,
            payment_model: self.payment_model,
            options_to_enable: self.options_to_enable.clone(),
        }
    }
}

/// Entitlement fixture.
#[derive(Debug, Clone)]
pub struct EntitlementFixture {
    pub entitlement_type: EntitlementType,
    pub frequency: EntitlementFrequency,
    pub quantity_purchased: u64,
    pub analysis_type: Option<AnalysisType>,
    pub assessment_type: Option<String>,
}

impl EntitlementFixture {
    #[must_use]
    pub fn default_instance() -> Self {
        Self {
            entitlement_type: EntitlementType::Fortify,
            frequency: EntitlementFrequency::Subscription,
            quantity_purchased: 100,
            analysis_type: None,
            assessment_type: None,
        }
    }

    /// Default instance for a non-Fortify engine.
    #[must_use]
    pub fn default_of_type(entitlement_type: EntitlementType) -> Self {
        Self {
            entitlement_type,
            ..Self::default_instance()
        }
    }

    #[must_use]
    pub fn with_quantity(mut self, quantity: u64) -> Self {
        self.quantity_purchased = quantity;
        self
    }

    #[must_use]
    pub fn with_frequency(mut self, frequency: EntitlementFrequency) -> Self {
        self.frequency = frequency;
        self
    }

    #[must_use]
    pub fn scoped_to(mut self, analysis_type: AnalysisType, assessment_type: &str) -> Self {
        self.analysis_type = Some(analysis_type);
        self.assessment_type = Some(assessment_type.to_string());
        self
    }

    #[must_use]
    pub fn to_request(&self, tenant_id: u64) -> CreateEntitlementRequest {
        CreateEntitlementRequest {
            tenant_id,
            entitlement_type: self.entitlement_type,
            frequency: self.frequency,
            quantity_purchased: self.quantity_purchased,
            analysis_type: self.analysis_type,
            assessment_type: self.assessment_type.clone(),
        }
    }
}

/// Application fixture; creating the application also creates its first
/// release, so the fixture carries both names.
#[derive(Debug, Clone)]
pub struct ApplicationFixture {
    pub application_name: String,
    pub release_name: String,
    pub app_type: AppType,
    pub business_criticality: BusinessCriticality,
}

impl ApplicationFixture {
    #[must_use]
    pub fn default_instance() -> Self {
        Self {
            application_name: unique_name("app"),
            release_name: unique_name("release"),
            app_type: AppType::Web,
            business_criticality: BusinessCriticality::Medium,
        }
    }

    #[must_use]
    pub fn default_mobile_instance() -> Self {
        Self {
            application_name: unique_name("mobile-app"),
            app_type: AppType::Mobile,
            ..Self::default_instance()
        }
    }

    #[must_use]
    pub fn to_request(&self) -> CreateApplicationRequest {
        CreateApplicationRequest {
            application_name: self.application_name.clone(),
            app_type: self.app_type,
            business_criticality: self.business_criticality,
            release_name: self.release_name.clone(),
            attributes: std::collections::HashMap::new(),
        }
    }
}

/// Release fixture; `copy_from_release_name` is resolved to an id by the
/// release action before the request goes out.
#[derive(Debug, Clone)]
pub struct ReleaseFixture {
    pub release_name: String,
    pub copy_from_release_name: Option<String>,
}

impl ReleaseFixture {
    #[must_use]
    pub fn default_instance() -> Self {
        Self {
            release_name: unique_name("release"),
            copy_from_release_name: None,
        }
    }

    /// A copy-state release cloning the named source release.
    #[must_use]
    pub fn copy_state_of(source_release_name: &str) -> Self {
        Self {
            release_name: unique_name("release"),
            copy_from_release_name: Some(source_release_name.to_string()),
        }
    }

    #[must_use]
    pub fn to_request(&self, application_id: u64, source_release_id: Option<u64>) -> CreateReleaseRequest {
        let mut request = CreateReleaseRequest::new(application_id, self.release_name.clone());
        if let Some(source) = source_release_id {
            request = request.with_copy_state(source);
        }
        request
    }
}

/// Static scan fixture.
#[derive(Debug, Clone)]
pub struct StaticScanFixture {
    pub assessment_type: String,
    pub entitlement: EntitlementFrequency,
    pub audit_preference: AuditPreference,
    pub technology_stack: TechnologyStack,
    pub language_level: Option<String>,
    pub include_third_party: bool,
    pub open_source_component: bool,
    /// Payload path relative to the payload directory.
    pub payload_file: String,
}

impl StaticScanFixture {
    #[must_use]
    pub fn default_instance() -> Self {
        Self {
            assessment_type: "Static Assessment".to_string(),
            entitlement: EntitlementFrequency::SingleScan,
            audit_preference: AuditPreference::Manual,
            technology_stack: TechnologyStack::Java,
            language_level: Some("1.8".to_string()),
            include_third_party: true,
            open_source_component: false,
            payload_file: "fod/PerfStuffExtractor.zip".to_string(),
        }
    }

    #[must_use]
    pub fn with_technology_stack(mut self, stack: TechnologyStack, level: Option<&str>) -> Self {
        self.technology_stack = stack;
        self.language_level = level.map(str::to_string);
        self
    }

    #[must_use]
    pub fn with_open_source_component(mut self, enabled: bool) -> Self {
        self.open_source_component = enabled;
        self
    }

    #[must_use]
    pub fn with_include_third_party(mut self, enabled: bool) -> Self {
        self.include_third_party = enabled;
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload_file: &str) -> Self {
        self.payload_file = payload_file.to_string();
        self
    }

    /// Turn this fixture into its remediation variant: remediation
    /// assessment type, remediation entitlement, no charge.
    #[must_use]
    pub fn remediation(mut self) -> Self {
        self.assessment_type = format!("{} - Remediation", self.assessment_type);
        self.entitlement = EntitlementFrequency::Remediation;
        self
    }

    #[must_use]
    pub fn to_request(&self, release_id: u64) -> StartScanRequest {
        StartScanRequest::new(release_id, AnalysisType::Static, self.assessment_type.clone())
            .with_entitlement(self.entitlement)
            .with_audit_preference(self.audit_preference)
            .with_technology_stack(self.technology_stack, self.language_level.clone())
            .with_include_third_party(self.include_third_party)
            .with_open_source_component(self.open_source_component)
    }
}

/// Dynamic scan fixture.
#[derive(Debug, Clone)]
pub struct DynamicScanFixture {
    pub assessment_type: String,
    pub entitlement: EntitlementFrequency,
    pub start_in_future: bool,
}

impl DynamicScanFixture {
    #[must_use]
    pub fn default_instance() -> Self {
        Self {
            assessment_type: "AUTO-DYNAMIC".to_string(),
            entitlement: EntitlementFrequency::SingleScan,
            start_in_future: false,
        }
    }

    #[must_use]
    pub fn starting_in_future(mut self) -> Self {
        self.start_in_future = true;
        self
    }

    #[must_use]
    pub fn with_entitlement(mut self, frequency: EntitlementFrequency) -> Self {
        self.entitlement = frequency;
        self
    }

    #[must_use]
    pub fn remediation(mut self) -> Self {
        self.assessment_type = format!("{} - Remediation", self.assessment_type);
        self.entitlement = EntitlementFrequency::Remediation;
        self
    }

    #[must_use]
    pub fn to_request(&self, release_id: u64) -> StartScanRequest {
        let mut request = StartScanRequest::new(
            release_id,
            AnalysisType::Dynamic,
            self.assessment_type.clone(),
        )
        .with_entitlement(self.entitlement);
        if self.start_in_future {
            request = request.starting_in_future();
        }
        request
    }
}

/// Mobile scan fixture.
#[derive(Debug, Clone)]
pub struct MobileScanFixture {
    pub assessment_type: String,
    pub entitlement: EntitlementFrequency,
    pub payload_file: String,
}

impl MobileScanFixture {
    #[must_use]
    pub fn default_instance() -> Self {
        Self {
            assessment_type: "AUTO-MOBILE".to_string(),
            entitlement: EntitlementFrequency::SingleScan,
            payload_file: "fod/mobile-payload.apk".to_string(),
        }
    }

    #[must_use]
    pub fn with_entitlement(mut self, frequency: EntitlementFrequency) -> Self {
        self.entitlement = frequency;
        self
    }

    #[must_use]
    pub fn remediation(mut self) -> Self {
        self.assessment_type = format!("{} - Remediation", self.assessment_type);
        self.entitlement = EntitlementFrequency::Remediation;
        self
    }

    #[must_use]
    pub fn to_request(&self, release_id: u64) -> StartScanRequest {
        StartScanRequest::new(release_id, AnalysisType::Mobile, self.assessment_type.clone())
            .with_entitlement(self.entitlement)
    }
}

/// Tenant user fixture with a generated strong password.
#[derive(Debug, Clone)]
pub struct TenantUserFixture {
    pub user_name: String,
    pub email: String,
    pub password: String,
}

impl TenantUserFixture {
    #[must_use]
    pub fn default_instance() -> Self {
        Self {
            user_name: unique_name("user"),
            email: unique_email("user"),
            password: format!("Fr!{}", unique_code("pw")),
        }
    }

    #[must_use]
    pub fn to_request(&self) -> CreateUserRequest {
        CreateUserRequest::new(
            self.user_name.clone(),
            self.email.clone(),
            self.password.clone(),
        )
    }
}

/// Role fixture; defaults to a permissive role, restricted per scenario.
#[derive(Debug, Clone)]
pub struct RoleFixture {
    pub role_name: String,
    pub application_access: ApplicationAccess,
    pub allow_start_static_scan: bool,
    pub consume_entitlements: bool,
}

impl RoleFixture {
    #[must_use]
    pub fn default_instance() -> Self {
        Self {
            role_name: unique_name("role"),
            application_access: ApplicationAccess::All,
            allow_start_static_scan: true,
            consume_entitlements: true,
        }
    }

    #[must_use]
    pub fn denying_entitlement_consumption(mut self) -> Self {
        self.consume_entitlements = false;
        self
    }

    #[must_use]
    pub fn to_request(&self) -> CreateRoleRequest {
        CreateRoleRequest {
            role_name: self.role_name.clone(),
            application_access: self.application_access,
            allow_start_static_scan: self.allow_start_static_scan,
            consume_entitlements: self.consume_entitlements,
        }
    }
}

/// Subscription fixture.
#[derive(Debug, Clone)]
pub struct SubscriptionFixture {
    pub trigger: String,
    pub scope: String,
    pub send_email: bool,
}

impl SubscriptionFixture {
    #[must_use]
    pub fn scan_completed() -> Self {
        Self {
            trigger: "Scan Completed".to_string(),
            scope: "All Applications".to_string(),
            send_email: false,
        }
    }

    #[must_use]
    pub fn with_email(mut self) -> Self {
        self.send_email = true;
        self
    }

    #[must_use]
    pub fn scoped_to(mut self, scope: &str) -> Self {
        self.scope = scope.to_string();
        self
    }

    #[must_use]
    pub fn to_request(&self) -> CreateSubscriptionRequest {
        CreateSubscriptionRequest {
            trigger: self.trigger.clone(),
            scope: self.scope.clone(),
            send_email: self.send_email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_defaults() {
        let a = TenantFixture::default_instance();
        let b = TenantFixture::default_instance();
        assert_ne!(a.tenant_name, b.tenant_name);
        assert_ne!(a.tenant_code, b.tenant_code);
        assert!(a.entitlement.is_some());
        assert_eq!(a.entitlement_model, EntitlementModel::Units);
    }

    #[test]
    fn test_tenant_request_mapping() {
        let fixture = TenantFixture::default_instance()
            .with_options(&["Allow scanning with no entitlements"]);
        let request = fixture.to_request();
        assert_eq!(request.tenant_name, fixture.tenant_name);
        assert_eq!(
            request.options_to_enable,
            vec!["Allow scanning with no entitlements".to_string()]
        );
    }

    #[test]
    fn test_static_scan_remediation_transform() {
        let fixture = StaticScanFixture::default_instance().remediation();
        assert_eq!(fixture.assessment_type, "Static Assessment - Remediation");
        assert_eq!(fixture.entitlement, EntitlementFrequency::Remediation);
    }

    #[test]
    fn test_static_scan_request_mapping() {
        let fixture = StaticScanFixture::default_instance()
            .with_technology_stack(TechnologyStack::DotNet, Some("3.5"))
            .with_open_source_component(true)
            .with_include_third_party(false);
        let request = fixture.to_request(11);
        assert_eq!(request.release_id, 11);
        assert_eq!(request.language_level.as_deref(), Some("3.5"));
        assert_eq!(request.open_source_component, Some(true));
        assert_eq!(request.include_third_party, Some(false));
    }

    #[test]
    fn test_dynamic_scan_start_in_future() {
        let request = DynamicScanFixture::default_instance()
            .starting_in_future()
            .to_request(3);
        assert!(request.start_in_future);
    }

    #[test]
    fn test_copy_state_release_fixture() {
        let fixture = ReleaseFixture::copy_state_of("release-abc-1");
        assert_eq!(fixture.copy_from_release_name.as_deref(), Some("release-abc-1"));
        let request = fixture.to_request(5, Some(17));
        assert!(request.copy_state.is_some());
    }

    #[test]
    fn test_role_restriction() {
        let role = RoleFixture::default_instance().denying_entitlement_consumption();
        assert!(!role.to_request().consume_entitlements);
    }
}

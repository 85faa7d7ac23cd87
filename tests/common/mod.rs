use async_trait::async_trait;
use parking_lot::Mutex;

use route_guard::{
    BackOptions, GrantedPermissions, NavigateOptions, NavigationOutcome, NavigationProvider, PermissionRequirement,
    ProviderError, ProviderResult, RouteSpec,
};

/// Records every call and can be told to fail specific operations.
#[derive(Default)]
pub struct RecordingProvider {
    pub calls: Mutex<Vec<String>>,
    pub fail_back: bool,
    pub fail_targets: Vec<String>,
}

#[allow(dead_code)]
impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_back() -> Self {
        Self {
            fail_back: true,
            ..Self::default()
        }
    }

    pub fn failing_target(target: &str) -> Self {
        Self {
            fail_targets: vec![target.to_string()],
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, operation: &str, target: &str) -> ProviderResult {
        self.calls.lock().push(format!("{operation} {target}"));
        if self.fail_targets.iter().any(|t| t == target) {
            return Err(ProviderError::new(format!("{operation}:fail {target}")));
        }
        Ok(NavigationOutcome::ok(format!("{operation}:ok")))
    }
}

#[async_trait]
impl NavigationProvider for RecordingProvider {
    async fn forward(&self, options: NavigateOptions) -> ProviderResult {
        self.record("forward", &options.target_id)
    }

    async fn replace(&self, options: NavigateOptions) -> ProviderResult {
        self.record("replace", &options.target_id)
    }

    async fn switch_tab(&self, options: NavigateOptions) -> ProviderResult {
        self.record("switchTab", &options.target_id)
    }

    async fn back(&self, options: BackOptions) -> ProviderResult {
        self.calls.lock().push(format!("back {}", options.delta));
        if self.fail_back {
            return Err(ProviderError::new("navigateBack:fail"));
        }
        Ok(NavigationOutcome::ok("back:ok"))
    }
}

#[allow(dead_code)]
pub fn article_routes() -> Vec<RouteSpec> {
    vec![
        RouteSpec::new("/a").require(PermissionRequirement::exact("article").with_actions(["read"])),
        RouteSpec::new("/b")
            .require(
                PermissionRequirement::pattern(r"^sys:.+$")
                    .expect("valid pattern")
                    .with_actions(["manage"]),
            )
            .match_any(),
    ]
}

#[allow(dead_code)]
pub fn article_grants() -> GrantedPermissions {
    GrantedPermissions::new()
        .with_grant("article", ["read"])
        .with_grant("sys:role", ["manage"])
}

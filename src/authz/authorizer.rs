use std::sync::Arc;

use parking_lot::RwLock;

use super::matcher::requirement_satisfied;
use super::types::{GrantedPermissions, PermissionRequirement, RouteSpec};
use super::EnforcementMode;
use crate::config::GateConfig;
use crate::errors::{GuardError, GuardResult};
use crate::navigation::{BackOptions, NavigateOptions, NavigationKind, NavigationOutcome, NavigationProvider};

/// Route and requirement checks over one snapshot of routes and grants.
///
/// Evaluation order for a route:
/// 1. unknown route -> allow
/// 2. no requirements -> allow
/// 3. `match_any` -> allow if any requirement holds
/// 4. otherwise allow only if every requirement holds
pub struct Authorizer {
    routes: Vec<RouteSpec>,
    granted: RwLock<Arc<GrantedPermissions>>,
    provider: Arc<dyn NavigationProvider>,
    fallback_target: String,
    enforcement: EnforcementMode,
}

impl Authorizer {
    pub fn new(
        routes: Vec<RouteSpec>,
        granted: GrantedPermissions,
        provider: Arc<dyn NavigationProvider>,
    ) -> Self {
        let defaults = GateConfig::default();
        Self {
            routes,
            granted: RwLock::new(Arc::new(granted)),
            provider,
            fallback_target: defaults.fallback_target,
            enforcement: defaults.enforcement,
        }
    }

    pub fn with_config(mut self, config: &GateConfig) -> Self {
        self.fallback_target = config.fallback_target.clone();
        self.enforcement = config.enforcement;
        self
    }

    pub fn routes(&self) -> &[RouteSpec] {
        &self.routes
    }

    /// The grants in effect right now. Later updates do not touch the returned map.
    pub fn granted_permissions(&self) -> Arc<GrantedPermissions> {
        Arc::clone(&self.granted.read())
    }

    /// Replaces the grants wholesale.
    pub fn update_granted_permissions(&self, next: GrantedPermissions) {
        let resources = next.len();
        *self.granted.write() = Arc::new(next);
        tracing::info!(resources, "granted permissions replaced");
    }

    pub fn check_requirements(&self, requirements: &[PermissionRequirement], match_any: bool) -> bool {
        if requirements.is_empty() {
            return true;
        }

        let granted = self.granted_permissions();
        let satisfied = requirements
            .iter()
            .filter(|req| requirement_satisfied(req, &granted))
            .count();

        if match_any {
            satisfied > 0
        } else {
            satisfied == requirements.len()
        }
    }

    pub fn authorize_route(&self, route_id: &str) -> bool {
        let Some(route) = self.routes.iter().find(|route| route.id == route_id) else {
            tracing::debug!(route = %route_id, "route not restricted");
            return true;
        };

        let allowed = self.check_requirements(&route.requirements, route.match_any);
        tracing::debug!(
            route = %route_id,
            match_any = route.match_any,
            allowed,
            "route authorization"
        );
        allowed
    }

    fn permits(&self, route_id: &str) -> bool {
        match self.enforcement {
            EnforcementMode::Off => true,
            EnforcementMode::Strict => self.authorize_route(route_id),
            EnforcementMode::Advisory => {
                if !self.authorize_route(route_id) {
                    tracing::warn!(route = %route_id, "navigation would be denied (advisory mode)");
                }
                true
            }
        }
    }

    /// Checks the target route, then hands the navigation to the provider.
    ///
    /// Nothing is awaited between the check and the dispatch.
    pub async fn navigate(&self, kind: NavigationKind, options: NavigateOptions) -> GuardResult<NavigationOutcome> {
        if !self.permits(&options.target_id) {
            tracing::warn!(route = %options.target_id, kind = kind.as_str(), "navigation denied");
            return Err(GuardError::denied(options.target_id));
        }

        Ok(self.provider.dispatch(kind, options).await?)
    }

    /// Back-navigation is never checked and never fails: a provider failure
    /// sends the user to the fallback target instead.
    pub async fn navigate_back(&self, options: BackOptions) -> NavigationOutcome {
        let err = match self.provider.back(options).await {
            Ok(outcome) => return outcome,
            Err(err) => err,
        };

        tracing::warn!(
            error = %err,
            target = %self.fallback_target,
            "back navigation failed, using fallback target"
        );

        match self.provider.fallback(&self.fallback_target).await {
            Ok(outcome) => NavigationOutcome {
                fell_back: true,
                ..outcome
            },
            Err(fallback_err) => {
                tracing::error!(
                    error = %fallback_err,
                    target = %self.fallback_target,
                    "fallback navigation failed"
                );
                NavigationOutcome {
                    message: fallback_err.message,
                    fell_back: true,
                }
            }
        }
    }
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer")
            .field("routes", &self.routes)
            .field("granted", &self.granted_permissions())
            .field("fallback_target", &self.fallback_target)
            .field("enforcement", &self.enforcement)
            .finish_non_exhaustive()
    }
}

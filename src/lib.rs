pub mod authz;
pub mod config;
pub mod errors;
pub mod events;
pub mod lifecycle;
pub mod navigation;

// Public API
pub use authz::{Authorizer, GrantedPermissions, PermissionRequirement, ResourceMatcher, RouteSpec};
pub use config::{GateConfig, RouteManifest};
pub use errors::{GuardError, GuardResult};
pub use events::GateEvent;
pub use lifecycle::{Gate, Pending};
pub use navigation::{
    BackOptions, LoggingProvider, NavigateOptions, NavigationKind, NavigationOutcome, NavigationProvider,
    ProviderError, ProviderResult,
};

//! Authorization module - matching and route checks
//!
//! This module implements the permission engine with support for:
//! - Exact and pattern-keyed resource requirements
//! - Wildcard grants (`["*"]`)
//! - All-of / any-of route requirements
//! - Configurable enforcement modes (off/advisory/strict)

mod authorizer;
mod matcher;
mod types;

pub use authorizer::Authorizer;
pub use matcher::{actions_satisfy, requirement_satisfied};
pub use types::{GrantedPermissions, PermissionRequirement, ResourceMatcher, RouteSpec};

use crate::errors::GuardError;

/// Joined form of a grant that allows every action on its resource.
pub const WILDCARD: &str = "*";

/// Navigation enforcement mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnforcementMode {
    /// No permission checks on navigation
    Off,
    /// Log denials but dispatch anyway
    Advisory,
    /// Reject denied navigation with 401
    #[default]
    Strict,
}

impl EnforcementMode {
    pub fn parse(value: &str) -> Result<Self, GuardError> {
        match value.trim().to_lowercase().as_str() {
            "" | "strict" => Ok(EnforcementMode::Strict),
            "advisory" => Ok(EnforcementMode::Advisory),
            "off" => Ok(EnforcementMode::Off),
            other => Err(GuardError::configuration(format!(
                "unknown enforcement mode `{other}` (expected strict, advisory or off)"
            ))),
        }
    }
}

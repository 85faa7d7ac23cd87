use std::path::Path;

use serde::Deserialize;

use crate::authz::{EnforcementMode, GrantedPermissions, RouteSpec};
use crate::errors::GuardError;

pub const DEFAULT_FALLBACK_TARGET: &str = "/pages/index/index";
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Landing target used when back-navigation fails.
    pub fallback_target: String,
    pub event_capacity: usize,
    pub enforcement: EnforcementMode,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            fallback_target: DEFAULT_FALLBACK_TARGET.to_string(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            enforcement: EnforcementMode::Strict,
        }
    }
}

impl GateConfig {
    pub fn from_env() -> Result<Self, GuardError> {
        let fallback_target = std::env::var("ROUTE_GUARD_FALLBACK_TARGET")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FALLBACK_TARGET.to_string());

        let event_capacity = std::env::var("ROUTE_GUARD_EVENT_CAPACITY")
            .map(|val| val.parse::<usize>())
            .unwrap_or(Ok(DEFAULT_EVENT_CAPACITY))
            .ok()
            .filter(|capacity| *capacity > 0)
            .ok_or_else(|| GuardError::configuration("ROUTE_GUARD_EVENT_CAPACITY must be a positive integer"))?;

        let enforcement = match std::env::var("ROUTE_GUARD_ENFORCEMENT") {
            Ok(value) => EnforcementMode::parse(&value)?,
            Err(_) => EnforcementMode::Strict,
        };

        Ok(Self {
            fallback_target,
            event_capacity,
            enforcement,
        })
    }

    pub fn with_fallback_target(mut self, target: impl Into<String>) -> Self {
        self.fallback_target = target.into();
        self
    }

    pub fn with_enforcement(mut self, enforcement: EnforcementMode) -> Self {
        self.enforcement = enforcement;
        self
    }
}

/// Routes plus the caller's grants, as delivered by the application.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteManifest {
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
    #[serde(default)]
    pub granted: GrantedPermissions,
}

impl RouteManifest {
    pub fn from_json(json: &str) -> Result<Self, GuardError> {
        let de = &mut serde_json::Deserializer::from_str(json);
        serde_path_to_error::deserialize(de).map_err(|err| GuardError::Manifest {
            path: err.path().to_string(),
            message: err.inner().to_string(),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, GuardError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading route manifest");
        Self::from_json(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV_KEYS: [&str; 3] = [
        "ROUTE_GUARD_FALLBACK_TARGET",
        "ROUTE_GUARD_EVENT_CAPACITY",
        "ROUTE_GUARD_ENFORCEMENT",
    ];

    // Process environment is global; tests touching it take this lock.
    static ENV_LOCK: parking_lot::Mutex<()> = parking_lot::const_mutex(());

    /// Runs `f` with the given variables set and the others unset, then restores the originals.
    fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock();
        let saved: Vec<(&str, Option<String>)> = ENV_KEYS.iter().map(|key| (*key, std::env::var(key).ok())).collect();

        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
        for (key, value) in vars {
            std::env::set_var(key, value);
        }

        let result = f();

        for (key, value) in saved {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
        result
    }

    #[test]
    fn from_env_uses_defaults_when_unset() {
        let config = with_env(&[], GateConfig::from_env).unwrap();
        assert_eq!(config, GateConfig::default());
    }

    #[test]
    fn from_env_reads_every_variable() {
        let config = with_env(
            &[
                ("ROUTE_GUARD_FALLBACK_TARGET", "/home"),
                ("ROUTE_GUARD_EVENT_CAPACITY", "8"),
                ("ROUTE_GUARD_ENFORCEMENT", "Off"),
            ],
            GateConfig::from_env,
        )
        .unwrap();

        assert_eq!(config.fallback_target, "/home");
        assert_eq!(config.event_capacity, 8);
        assert_eq!(config.enforcement, EnforcementMode::Off);
    }

    #[test]
    fn from_env_blank_fallback_target_keeps_default() {
        let config = with_env(&[("ROUTE_GUARD_FALLBACK_TARGET", "  ")], GateConfig::from_env).unwrap();
        assert_eq!(config.fallback_target, DEFAULT_FALLBACK_TARGET);
    }

    #[test]
    fn from_env_rejects_non_positive_capacity() {
        for bad in ["0", "abc", "-3"] {
            let err = with_env(&[("ROUTE_GUARD_EVENT_CAPACITY", bad)], GateConfig::from_env).unwrap_err();
            assert!(matches!(err, GuardError::Configuration(_)), "{bad}: {err:?}");
            assert!(err.to_string().contains("ROUTE_GUARD_EVENT_CAPACITY"), "{err}");
        }
    }

    #[test]
    fn from_env_rejects_unknown_enforcement_mode() {
        let err = with_env(&[("ROUTE_GUARD_ENFORCEMENT", "lenient")], GateConfig::from_env).unwrap_err();
        assert!(matches!(err, GuardError::Configuration(_)), "{err:?}");
        assert!(err.to_string().contains("lenient"), "{err}");
    }

    #[test]
    fn manifest_parses_routes_and_grants() {
        let manifest = RouteManifest::from_json(
            r#"{
                "routes": [
                    {"id": "/a", "requirements": [{"resource": "article", "actions": ["read"]}]},
                    {"id": "/b", "matchAny": true, "requirements": [{"pattern": "^sys:.+$", "actions": ["manage"]}]}
                ],
                "granted": {"article": ["read"], "sys:role": ["manage"]}
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.routes.len(), 2);
        assert!(manifest.routes[1].match_any);
        assert_eq!(manifest.granted.len(), 2);
    }

    #[test]
    fn manifest_error_names_the_field() {
        let err = RouteManifest::from_json(r#"{"routes": [{"id": "/a", "requirements": [{"pattern": "("}]}]}"#)
            .unwrap_err();
        match err {
            GuardError::Manifest { path, .. } => assert!(path.starts_with("routes[0].requirements"), "{path}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_manifest_is_valid() {
        let manifest = RouteManifest::from_json("{}").unwrap();
        assert!(manifest.routes.is_empty());
        assert!(manifest.granted.is_empty());
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = GateConfig::default()
            .with_fallback_target("/home")
            .with_enforcement(EnforcementMode::Advisory);
        assert_eq!(config.fallback_target, "/home");
        assert_eq!(config.enforcement, EnforcementMode::Advisory);
        assert_eq!(config.event_capacity, DEFAULT_EVENT_CAPACITY);
    }
}

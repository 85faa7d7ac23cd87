use std::collections::HashMap;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::GuardError;

/// How a requirement selects resources out of the granted map.
#[derive(Clone)]
pub enum ResourceMatcher {
    /// A single resource key.
    Exact(String),
    /// Every granted key the expression matches.
    Pattern(Regex),
}

impl ResourceMatcher {
    pub fn matches(&self, key: &str) -> bool {
        match self {
            ResourceMatcher::Exact(exact) => exact == key,
            ResourceMatcher::Pattern(re) => re.is_match(key),
        }
    }
}

impl fmt::Debug for ResourceMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceMatcher::Exact(key) => f.debug_tuple("Exact").field(key).finish(),
            ResourceMatcher::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
        }
    }
}

/// A resource plus the actions required on it.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawRequirement")]
pub struct PermissionRequirement {
    pub resource: ResourceMatcher,
    pub actions: Vec<String>,
}

impl PermissionRequirement {
    pub fn exact(resource: impl Into<String>) -> Self {
        Self {
            resource: ResourceMatcher::Exact(resource.into()),
            actions: Vec::new(),
        }
    }

    pub fn pattern(pattern: &str) -> Result<Self, GuardError> {
        Ok(Self {
            resource: ResourceMatcher::Pattern(Regex::new(pattern)?),
            actions: Vec::new(),
        })
    }

    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions = actions.into_iter().map(Into::into).collect();
        self
    }
}

/// Manifest form: exactly one of `resource` or `pattern`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRequirement {
    resource: Option<String>,
    pattern: Option<String>,
    #[serde(default)]
    actions: Vec<String>,
}

impl TryFrom<RawRequirement> for PermissionRequirement {
    type Error = String;

    fn try_from(raw: RawRequirement) -> Result<Self, Self::Error> {
        let requirement = match (raw.resource, raw.pattern) {
            (Some(resource), None) => PermissionRequirement::exact(resource),
            (None, Some(pattern)) => PermissionRequirement {
                resource: ResourceMatcher::Pattern(Regex::new(&pattern).map_err(|err| err.to_string())?),
                actions: Vec::new(),
            },
            (Some(_), Some(_)) => return Err("use either `resource` or `pattern`, not both".into()),
            (None, None) => return Err("requirement needs `resource` or `pattern`".into()),
        };
        Ok(requirement.with_actions(raw.actions))
    }
}

/// A navigable target and what it takes to reach it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    pub id: String,
    #[serde(default)]
    pub requirements: Vec<PermissionRequirement>,
    /// Satisfy at least one requirement instead of all of them.
    #[serde(default)]
    pub match_any: bool,
}

impl RouteSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            requirements: Vec::new(),
            match_any: false,
        }
    }

    pub fn require(mut self, requirement: PermissionRequirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    pub fn match_any(mut self) -> Self {
        self.match_any = true;
        self
    }
}

/// Resource key → allowed actions for the current caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantedPermissions(HashMap<String, Vec<String>>);

impl GrantedPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grant<I, S>(mut self, resource: impl Into<String>, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .insert(resource.into(), actions.into_iter().map(Into::into).collect());
        self
    }

    pub fn get(&self, resource: &str) -> Option<&[String]> {
        self.0.get(resource).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V, S> FromIterator<(K, V)> for GrantedPermissions
where
    K: Into<String>,
    V: IntoIterator<Item = S>,
    S: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into_iter().map(Into::into).collect()))
                .collect(),
        )
    }
}

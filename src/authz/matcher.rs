//! Pure matching of required actions against granted permissions.

use super::types::{GrantedPermissions, PermissionRequirement, ResourceMatcher};
use super::WILDCARD;

/// Whether `granted` covers every action in `required`.
///
/// An absent or empty grant never satisfies anything, not even an empty
/// requirement. A grant whose joined form is `*` satisfies everything.
pub fn actions_satisfy<S: AsRef<str>>(required: &[S], granted: Option<&[String]>) -> bool {
    let granted = match granted {
        Some(granted) if !granted.is_empty() => granted,
        _ => return false,
    };

    if granted.concat() == WILDCARD {
        return true;
    }

    required
        .iter()
        .all(|action| granted.iter().any(|g| g == action.as_ref()))
}

/// Whether a single requirement holds against the full granted map.
///
/// A pattern must match at least one granted key, and every matched key
/// must satisfy the required actions.
pub fn requirement_satisfied(req: &PermissionRequirement, granted: &GrantedPermissions) -> bool {
    match &req.resource {
        ResourceMatcher::Exact(key) => actions_satisfy(&req.actions, granted.get(key)),
        ResourceMatcher::Pattern(_) => {
            let mut matched = granted.iter().filter(|(key, _)| req.resource.matches(key)).peekable();
            if matched.peek().is_none() {
                return false;
            }
            matched.all(|(_, actions)| actions_satisfy(&req.actions, Some(actions)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn absent_or_empty_grant_never_satisfies() {
        assert!(!actions_satisfy::<&str>(&[], None));
        let none: &[String] = &[];
        assert!(!actions_satisfy::<&str>(&[], Some(none)));
        assert!(!actions_satisfy(&["read"], Some(none)));
    }

    #[test]
    fn empty_requirement_is_vacuous_once_granted() {
        assert!(actions_satisfy::<&str>(&[], Some(strings(&["read"]).as_slice())));
    }

    #[test]
    fn wildcard_grants_everything() {
        let all = strings(&["*"]);
        assert!(actions_satisfy(&["read", "write", "delete"], Some(all.as_slice())));
        assert!(actions_satisfy::<&str>(&[], Some(all.as_slice())));
    }

    #[test]
    fn wildcard_only_counts_as_joined_form() {
        // "*" alongside other actions is just another action name
        let mixed = strings(&["*", "read"]);
        assert!(!actions_satisfy(&["write"], Some(mixed.as_slice())));
        assert!(actions_satisfy(&["read"], Some(mixed.as_slice())));

        // joined form of ["", "*"] is still "*"
        let joined = strings(&["", "*"]);
        assert!(actions_satisfy(&["write"], Some(joined.as_slice())));
    }

    #[test]
    fn membership_is_order_independent() {
        let granted = strings(&["write", "read"]);
        assert!(actions_satisfy(&["read", "write"], Some(granted.as_slice())));
        assert!(!actions_satisfy(&["read", "delete"], Some(granted.as_slice())));
    }

    #[test]
    fn exact_requirement_looks_up_one_key() {
        let granted = GrantedPermissions::new().with_grant("article", ["read"]);
        let req = PermissionRequirement::exact("article").with_actions(["read"]);
        assert!(requirement_satisfied(&req, &granted));

        let req = PermissionRequirement::exact("comment").with_actions(["read"]);
        assert!(!requirement_satisfied(&req, &granted));

        let req = PermissionRequirement::exact("comment");
        assert!(!requirement_satisfied(&req, &granted));
    }

    #[test]
    fn pattern_requires_every_match() {
        let req = PermissionRequirement::pattern("^sys:.+$")
            .unwrap()
            .with_actions(["manage"]);

        let granted = GrantedPermissions::new()
            .with_grant("sys:role", ["manage"])
            .with_grant("sys:user", ["manage", "read"]);
        assert!(requirement_satisfied(&req, &granted));

        let granted = granted.with_grant("sys:menu", ["read"]);
        assert!(!requirement_satisfied(&req, &granted));
    }

    #[test]
    fn pattern_matching_nothing_fails() {
        let req = PermissionRequirement::pattern("^sys:.+$").unwrap();
        let granted = GrantedPermissions::new().with_grant("article", ["*"]);
        assert!(!requirement_satisfied(&req, &granted));
        assert!(!requirement_satisfied(&req, &GrantedPermissions::new()));
    }

    #[test]
    fn pattern_match_respects_wildcard() {
        let req = PermissionRequirement::pattern("^sys:")
            .unwrap()
            .with_actions(["manage", "delete"]);
        let granted = GrantedPermissions::new()
            .with_grant("sys:role", ["*"])
            .with_grant("sys:user", ["manage", "delete"]);
        assert!(requirement_satisfied(&req, &granted));
    }
}

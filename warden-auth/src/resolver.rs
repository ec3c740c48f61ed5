//! Permission resolution
//!
//! Pure functions over a loaded [`User`] snapshot. The superuser bypass
//! lives here and only here; callers must not re-implement it.

use crate::model::{Permission, User};
use std::collections::HashSet;

/// Compute a user's effective permission set.
///
/// Superusers implicitly hold the entire declared `universe` regardless of
/// role linkage; everyone else gets the union of permission names across
/// their linked roles.
pub fn effective_permissions(user: &User, universe: &[Permission]) -> HashSet<String> {
    if user.is_superuser {
        return universe.iter().map(|p| p.name.clone()).collect();
    }

    user.roles
        .iter()
        .flat_map(|role| role.permissions.iter().map(|p| p.name.clone()))
        .collect()
}

/// Does the user hold `permission_name`?
pub fn has_permission(user: &User, permission_name: &str) -> bool {
    if user.is_superuser {
        return true;
    }

    user.roles
        .iter()
        .any(|role| role.permissions.iter().any(|p| p.name == permission_name))
}

/// Is the user a member of `role_name`?
pub fn has_role(user: &User, role_name: &str) -> bool {
    if user.is_superuser {
        return true;
    }

    user.roles.iter().any(|role| role.name == role_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use chrono::Utc;

    fn permission(id: i64, name: &str, resource: &str, action: &str) -> Permission {
        Permission {
            id,
            name: name.to_string(),
            display_name: name.to_string(),
            description: None,
            resource: resource.to_string(),
            action: action.to_string(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn role(id: i64, name: &str, permissions: Vec<Permission>) -> Role {
        Role {
            id,
            name: name.to_string(),
            display_name: name.to_string(),
            description: None,
            is_active: true,
            is_system: false,
            created_at: Utc::now(),
            permissions,
        }
    }

    fn user(roles: Vec<Role>, is_superuser: bool) -> User {
        User {
            id: 1,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: String::new(),
            full_name: None,
            is_active: true,
            is_verified: true,
            is_superuser,
            last_login: None,
            password_changed_at: Utc::now(),
            created_at: Utc::now(),
            roles,
        }
    }

    #[test]
    fn editor_has_write_but_not_delete() {
        let editor = role(1, "editor", vec![permission(1, "doc:write", "doc", "write")]);
        let alice = user(vec![editor], false);

        assert!(has_permission(&alice, "doc:write"));
        assert!(!has_permission(&alice, "doc:delete"));
        assert!(has_role(&alice, "editor"));
        assert!(!has_role(&alice, "admin"));
    }

    #[test]
    fn effective_set_is_union_across_roles() {
        let read = permission(1, "doc:read", "doc", "read");
        let write = permission(2, "doc:write", "doc", "write");

        let viewer = role(1, "viewer", vec![read.clone()]);
        let editor = role(2, "editor", vec![read, write]);
        let alice = user(vec![viewer, editor], false);

        let effective = effective_permissions(&alice, &[]);
        assert_eq!(
            effective,
            ["doc:read", "doc:write"]
                .into_iter()
                .map(String::from)
                .collect()
        );
    }

    #[test]
    fn superuser_gets_whole_universe_with_no_roles() {
        let universe = vec![
            permission(1, "doc:read", "doc", "read"),
            permission(2, "doc:write", "doc", "write"),
            permission(3, "user:delete", "user", "delete"),
        ];
        let root = user(vec![], true);

        let effective = effective_permissions(&root, &universe);
        assert_eq!(effective.len(), 3);
        assert!(has_permission(&root, "anything:at-all"));
        assert!(has_role(&root, "any-role"));
    }

    #[test]
    fn no_roles_means_no_permissions() {
        let nobody = user(vec![], false);
        assert!(effective_permissions(&nobody, &[]).is_empty());
        assert!(!has_permission(&nobody, "doc:read"));
    }
}

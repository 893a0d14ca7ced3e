/*!
 * # Permissions Module
 *
 * Static role → permission table. Permissions are `resource.action`
 * strings; a trailing `.*` grants every action on the resource.
 */

use crate::entities::Role;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Common permission string constants for compile-time safety
pub mod consts {
    pub const MANAGER_ACCESS: &str = "manager.access";

    // Sites
    pub const SITES_CREATE: &str = "sites.create";
    pub const SITES_UPDATE: &str = "sites.update";
    pub const SITES_DELETE: &str = "sites.delete";

    // Users
    pub const USERS_READ: &str = "users.read";
    pub const USERS_MANAGE: &str = "users.manage";
    pub const USERS_ALL: &str = "users.*";

    // Warehouse
    pub const INVENTORY_READ: &str = "inventory.read";
    pub const INVENTORY_MANAGE: &str = "inventory.manage";
    pub const INVENTORY_ALL: &str = "inventory.*";

    pub const REPORTS_READ_ALL: &str = "reports.read_all";
    pub const RECORDS_DELETE: &str = "records.delete";
    pub const SETTINGS_MANAGE: &str = "settings.manage";
}

use consts::*;

const MANAGER_PERMISSIONS: &[&str] = &[
    MANAGER_ACCESS,
    SITES_CREATE,
    SITES_UPDATE,
    USERS_READ,
    INVENTORY_READ,
];

const ADMIN_EXTRA_PERMISSIONS: &[&str] = &[
    SITES_DELETE,
    USERS_ALL,
    SETTINGS_MANAGE,
    RECORDS_DELETE,
    INVENTORY_ALL,
];

static ROLE_PERMISSIONS: Lazy<HashMap<Role, HashSet<&'static str>>> = Lazy::new(|| {
    let mut roles = HashMap::new();

    roles.insert(Role::Caposquadra, HashSet::new());
    roles.insert(Role::Manager, MANAGER_PERMISSIONS.iter().copied().collect());
    roles.insert(
        Role::Admin,
        MANAGER_PERMISSIONS
            .iter()
            .chain(ADMIN_EXTRA_PERMISSIONS)
            .copied()
            .collect(),
    );
    roles.insert(
        Role::Magazzino,
        [INVENTORY_READ, INVENTORY_MANAGE].into_iter().collect(),
    );
    roles.insert(Role::Contabilita, [REPORTS_READ_ALL].into_iter().collect());
    roles.insert(Role::Hr, [USERS_READ].into_iter().collect());

    roles
});

/// Permissions granted by a role alone.
pub fn role_permissions(role: Role) -> HashSet<&'static str> {
    ROLE_PERMISSIONS.get(&role).cloned().unwrap_or_default()
}

/// Effective permissions for a user. A manager flagged as warehouse manager
/// additionally holds `inventory.manage`.
pub fn effective_permissions(role: Role, is_warehouse_manager: bool) -> HashSet<&'static str> {
    let mut permissions = role_permissions(role);
    if role == Role::Manager && is_warehouse_manager {
        permissions.insert(INVENTORY_MANAGE);
    }
    permissions
}

/// Check if a granted permission satisfies a requested one.
///
/// `x.*` granted matches any `x.…`; `x.*` requested matches any granted
/// permission under `x.`.
pub fn permission_matches(granted: &str, requested: &str) -> bool {
    if granted == requested {
        return true;
    }

    if let Some(prefix) = granted.strip_suffix(".*") {
        if requested
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.'))
        {
            return true;
        }
    }

    if let Some(prefix) = requested.strip_suffix(".*") {
        if granted
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.'))
        {
            return true;
        }
    }

    false
}

pub fn has_permission(role: Role, is_warehouse_manager: bool, requested: &str) -> bool {
    effective_permissions(role, is_warehouse_manager)
        .iter()
        .any(|granted| permission_matches(granted, requested))
}

/// Roles whose users can manage the warehouse without a per-user flag.
pub fn warehouse_manager_roles() -> impl Iterator<Item = Role> {
    [Role::Admin, Role::Magazzino].into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matching_both_directions() {
        assert!(permission_matches("users.*", "users.read"));
        assert!(permission_matches("users.read", "users.*"));
        assert!(permission_matches("sites.create", "sites.create"));
        assert!(!permission_matches("users.*", "usersx.read"));
        assert!(!permission_matches("sites.create", "sites.delete"));
        assert!(!permission_matches("inventory.read", "users.*"));
    }

    #[test]
    fn admin_holds_manager_set_plus_extras() {
        for p in MANAGER_PERMISSIONS {
            assert!(has_permission(Role::Admin, false, p), "admin lacks {p}");
        }
        assert!(has_permission(Role::Admin, false, "users.manage"));
        assert!(has_permission(Role::Admin, false, INVENTORY_MANAGE));
        assert!(has_permission(Role::Admin, false, RECORDS_DELETE));
    }

    #[test]
    fn manager_needs_flag_for_inventory_manage() {
        assert!(has_permission(Role::Manager, false, INVENTORY_READ));
        assert!(!has_permission(Role::Manager, false, INVENTORY_MANAGE));
        assert!(has_permission(Role::Manager, true, INVENTORY_MANAGE));
        assert!(!has_permission(Role::Manager, true, SITES_DELETE));
    }

    #[test]
    fn restricted_roles() {
        assert!(role_permissions(Role::Caposquadra).is_empty());
        assert!(has_permission(Role::Magazzino, false, INVENTORY_MANAGE));
        assert!(!has_permission(Role::Magazzino, false, USERS_READ));
        assert!(has_permission(Role::Contabilita, false, REPORTS_READ_ALL));
        assert!(has_permission(Role::Hr, false, USERS_READ));
        assert!(!has_permission(Role::Hr, false, USERS_MANAGE));
        // the flag only applies to managers
        assert!(!has_permission(Role::Caposquadra, true, INVENTORY_MANAGE));
    }
}

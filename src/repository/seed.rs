//! Demo data for `STORE_BACKEND=memory`.

use crate::entity::menu::{Menu, MenuStatus, MenuType};
use crate::entity::role::Role;
use crate::entity::user::{User, UserStatus};
use crate::repository::memory::InMemoryCredentialStore;
use chrono::Utc;

pub const DEMO_ADMIN_PASSWORD: &str = "admin123";
pub const DEMO_EDITOR_PASSWORD: &str = "editor123";

/// Super admin `admin` (role 1, no explicit grants) and `editor` (role 2, user
/// management pages only), over a small system menu.
pub fn seed_demo_data(store: &InMemoryCredentialStore, password_cost: u32) -> Result<(), bcrypt::BcryptError> {
    let now = Utc::now();
    let accounts = [
        (1, "admin", "admin@example.com", DEMO_ADMIN_PASSWORD, 1),
        (2, "editor", "editor@example.com", DEMO_EDITOR_PASSWORD, 2),
    ];
    for (id, username, email, password, role_id) in accounts {
        store.insert_user(User {
            id,
            username: username.to_string(),
            email: email.to_string(),
            nickname: Some(username.to_string()),
            password: bcrypt::hash(password, password_cost)?,
            status: UserStatus::Enabled,
            login_count: 0,
            last_login_at: None,
            last_login_ip: None,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        });
        store.assign_role(id, role_id);
    }

    store.insert_role(Role {
        id: 1,
        name: "Super Admin".to_string(),
        code: "super_admin".to_string(),
        status: 1,
        is_system_default: true,
    });
    store.insert_role(Role {
        id: 2,
        name: "Editor".to_string(),
        code: "editor".to_string(),
        status: 1,
        is_system_default: false,
    });

    let menus = [
        (1, "Dashboard", MenuType::Page, Some("/dashboard"), None, 1, None),
        (2, "System", MenuType::Directory, Some("/system"), None, 2, None),
        (3, "Users", MenuType::Page, Some("/system/users"), Some(2), 1, Some("system:user:list")),
        (4, "Roles", MenuType::Page, Some("/system/roles"), Some(2), 2, Some("system:role:list")),
        (5, "Menus", MenuType::Page, Some("/system/menus"), Some(2), 3, Some("system:menu:list")),
        (6, "Create user", MenuType::Action, None, Some(3), 1, Some("system:user:create")),
    ];
    for (id, name, menu_type, path, parent_id, sort_order, perm) in menus {
        store.insert_menu(Menu {
            id,
            name: name.to_string(),
            menu_type,
            path: path.map(str::to_string),
            parent_id,
            status: MenuStatus::Active,
            sort_order,
            hide_in_menu: menu_type == MenuType::Action,
            is_external_link: false,
            perm: perm.map(str::to_string),
            icon: None,
        });
    }
    store.insert_menu(Menu {
        id: 7,
        name: "Documentation".to_string(),
        menu_type: MenuType::Page,
        path: Some("https://docs.example.com".to_string()),
        parent_id: None,
        status: MenuStatus::Active,
        sort_order: 9,
        hide_in_menu: false,
        is_external_link: true,
        perm: None,
        icon: None,
    });

    store.grant_menu(2, 3);
    store.grant_menu(2, 6);
    Ok(())
}

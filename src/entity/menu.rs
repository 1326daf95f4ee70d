use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[repr(i16)]
#[serde(rename_all = "lowercase")]
pub enum MenuType {
    Directory = 0,
    Page = 1,
    Action = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[repr(i16)]
#[serde(rename_all = "lowercase")]
pub enum MenuStatus {
    Disabled = 0,
    Active = 1,
}

/// Flat menu row; the tree is assembled from `parent_id` at read time.
#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct Menu {
    pub id: i64,
    pub name: String,
    pub menu_type: MenuType,
    pub path: Option<String>,
    /// `None` and `Some(0)` both mean "root"
    pub parent_id: Option<i64>,
    pub status: MenuStatus,
    pub sort_order: i32,
    pub hide_in_menu: bool,
    pub is_external_link: bool,
    pub perm: Option<String>,
    pub icon: Option<String>,
}

impl Menu {
    pub fn parent(&self) -> Option<i64> {
        self.parent_id.filter(|id| *id != 0)
    }

    pub fn is_active(&self) -> bool {
        self.status == MenuStatus::Active
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, sqlx::FromRow)]
pub struct RoleMenu {
    pub role_id: i64,
    pub menu_id: i64,
}

use crate::entity::menu::{Menu, MenuType};
use serde::{Deserialize, Serialize};

/// A node of the role-scoped menu tree
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuTreeNodeDto {
    pub id: i64,
    pub name: String,
    pub menu_type: MenuType,
    pub path: Option<String>,
    pub parent_id: Option<i64>,
    pub sort_order: i32,
    pub hide_in_menu: bool,
    pub is_external_link: bool,
    pub perm: Option<String>,
    pub icon: Option<String>,
    pub children: Vec<MenuTreeNodeDto>,
}

impl MenuTreeNodeDto {
    pub fn leaf(menu: &Menu) -> Self {
        Self {
            id: menu.id,
            name: menu.name.clone(),
            menu_type: menu.menu_type,
            path: menu.path.clone(),
            parent_id: menu.parent(),
            sort_order: menu.sort_order,
            hide_in_menu: menu.hide_in_menu,
            is_external_link: menu.is_external_link,
            perm: menu.perm.clone(),
            icon: menu.icon.clone(),
            children: Vec::new(),
        }
    }
}

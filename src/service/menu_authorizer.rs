use crate::config::parameter;
use crate::dto::menu_dto::MenuTreeNodeDto;
use crate::entity::menu::Menu;
use crate::error::store_error::StoreError;
use crate::repository::credential_repository::CredentialStore;
use crate::service::cache_service::{Cache, MENU_NAMESPACE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct MenuConfig {
    pub super_admin_role_id: i64,
    pub cache_ttl: Duration,
}

impl MenuConfig {
    pub fn from_parameters() -> Self {
        Self {
            super_admin_role_id: parameter::get_i64("SUPER_ADMIN_ROLE_ID"),
            cache_ttl: Duration::from_secs(parameter::get_u64("MENU_CACHE_TTL_SECONDS")),
        }
    }
}

/// Computes the slice of the menu tree a set of roles may see.
///
/// Only directly granted ids are stored; every granted node drags its whole ancestor
/// chain along so the rendered tree stays navigable.
#[derive(Clone)]
pub struct MenuAuthorizer {
    credentials: Arc<dyn CredentialStore>,
    cache: Arc<dyn Cache>,
    config: MenuConfig,
}

impl MenuAuthorizer {
    pub fn new(credentials: Arc<dyn CredentialStore>, cache: Arc<dyn Cache>, config: MenuConfig) -> Self {
        Self {
            credentials,
            cache,
            config,
        }
    }

    pub async fn get_authorized_tree(&self, role_ids: &[i64]) -> Result<Vec<MenuTreeNodeDto>, StoreError> {
        let key = cache_key("tree", role_ids);
        if let Some(tree) = self.cached(&key).await {
            return Ok(tree);
        }

        let (menus, allow) = self.resolve(role_ids).await?;
        let tree = build_tree(&menus, &allow);
        self.remember(&key, &tree).await;
        Ok(tree)
    }

    /// Navigable paths for client-side route guarding; external links are not routes
    pub async fn get_authorized_paths(&self, role_ids: &[i64]) -> Result<Vec<String>, StoreError> {
        let key = cache_key("paths", role_ids);
        if let Some(paths) = self.cached(&key).await {
            return Ok(paths);
        }

        let (menus, allow) = self.resolve(role_ids).await?;
        let paths: BTreeSet<String> = allow
            .iter()
            .filter_map(|id| menus.get(id))
            .filter(|menu| menu.is_active() && !menu.is_external_link)
            .filter_map(|menu| menu.path.as_deref())
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(str::to_string)
            .collect();

        let paths: Vec<String> = paths.into_iter().collect();
        self.remember(&key, &paths).await;
        Ok(paths)
    }

    /// Call after any change to menus, roles or role-menu grants
    pub async fn invalidate_menu_cache(&self) {
        match self.cache.invalidate_prefix(MENU_NAMESPACE).await {
            Ok(count) => info!("Menu cache invalidated ({} entries)", count),
            Err(e) => warn!("Menu cache invalidation failed: {}", e),
        }
    }

    /// Full menu set keyed by id, plus the ids the roles may see
    async fn resolve(&self, role_ids: &[i64]) -> Result<(HashMap<i64, Menu>, HashSet<i64>), StoreError> {
        let distinct: BTreeSet<i64> = role_ids.iter().copied().collect();
        let role_ids: Vec<i64> = distinct.iter().copied().collect();

        let menus: HashMap<i64, Menu> = self
            .credentials
            .list_menus()
            .await?
            .into_iter()
            .map(|menu| (menu.id, menu))
            .collect();

        if role_ids.is_empty() {
            return Ok((menus, HashSet::new()));
        }

        let granted = self.credentials.menu_ids_for_roles(&role_ids).await?;

        let allow = if granted.is_empty() && role_ids == [self.config.super_admin_role_id] {
            debug!("Super admin without explicit grants sees every active menu");
            menus.values().filter(|menu| menu.is_active()).map(|menu| menu.id).collect()
        } else {
            ancestor_closure(&menus, &granted)
        };
        Ok((menus, allow))
    }

    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(cached)) => match serde_json::from_str(&cached) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Discarding undecodable cached menu entry: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Menu cache read failed: {}", e);
                None
            }
        }
    }

    async fn remember<T: Serialize>(&self, key: &str, value: &T) {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Menu entry could not be encoded for cache: {}", e);
                return;
            }
        };
        if let Err(e) = self.cache.set(key, encoded, self.config.cache_ttl).await {
            warn!("Menu cache write failed: {}", e);
        }
    }
}

/// `menu:<kind>:<sorted distinct role ids>`, so role order never splits the cache
fn cache_key(kind: &str, role_ids: &[i64]) -> String {
    let distinct: BTreeSet<i64> = role_ids.iter().copied().collect();
    let ids: Vec<String> = distinct.iter().map(i64::to_string).collect();
    format!("{MENU_NAMESPACE}{kind}:{}", ids.join(","))
}

/// Granted ids plus every ancestor of each. Ids missing from `menus` are ignored, and each
/// walk is bounded by the node count so a malformed parent cycle cannot spin forever.
pub fn ancestor_closure(menus: &HashMap<i64, Menu>, granted: &[i64]) -> HashSet<i64> {
    let mut allow = HashSet::new();

    for id in granted {
        let mut current = menus.get(id);
        let mut steps = 0;
        while let Some(menu) = current {
            // Already walked from here on a previous grant
            if !allow.insert(menu.id) || steps >= menus.len() {
                break;
            }
            steps += 1;
            current = menu.parent().and_then(|parent_id| menus.get(&parent_id));
        }
    }
    allow
}

/// Assemble the forest of active, allowed nodes. A node whose parent did not survive the
/// filter becomes a root. Siblings are ordered by `sort_order`, then id.
pub fn build_tree(menus: &HashMap<i64, Menu>, allow: &HashSet<i64>) -> Vec<MenuTreeNodeDto> {
    let visible: HashMap<i64, &Menu> = allow
        .iter()
        .filter_map(|id| menus.get(id))
        .filter(|menu| menu.is_active())
        .map(|menu| (menu.id, menu))
        .collect();

    let mut children: HashMap<i64, Vec<&Menu>> = HashMap::new();
    let mut roots: Vec<&Menu> = Vec::new();
    for menu in visible.values().copied() {
        match menu.parent().filter(|parent_id| visible.contains_key(parent_id)) {
            Some(parent_id) => children.entry(parent_id).or_default().push(menu),
            None => roots.push(menu),
        }
    }

    let mut placed = HashSet::new();
    let tree = assemble(roots, &children, &mut placed);
    if placed.len() < visible.len() {
        warn!(
            "Menu tree dropped {} node(s) caught in a parent cycle",
            visible.len() - placed.len()
        );
    }
    tree
}

fn assemble(
    mut level: Vec<&Menu>,
    children: &HashMap<i64, Vec<&Menu>>,
    placed: &mut HashSet<i64>,
) -> Vec<MenuTreeNodeDto> {
    level.sort_by_key(|menu| (menu.sort_order, menu.id));

    let mut nodes = Vec::with_capacity(level.len());
    for menu in level {
        if !placed.insert(menu.id) {
            continue;
        }
        let mut node = MenuTreeNodeDto::leaf(menu);
        if let Some(kids) = children.get(&menu.id) {
            node.children = assemble(kids.clone(), children, placed);
        }
        nodes.push(node);
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::menu::{MenuStatus, MenuType};
    use crate::repository::memory::InMemoryCredentialStore;
    use crate::service::cache_service::InMemoryCache;
    use crate::service::token_store::tests::BrokenCache;

    fn menu(id: i64, parent_id: i64, sort_order: i32, path: &str) -> Menu {
        Menu {
            id,
            name: format!("menu-{id}"),
            menu_type: if path.is_empty() { MenuType::Directory } else { MenuType::Page },
            path: Some(path.to_string()).filter(|p| !p.is_empty()),
            parent_id: Some(parent_id),
            status: MenuStatus::Active,
            sort_order,
            hide_in_menu: false,
            is_external_link: false,
            perm: None,
            icon: None,
        }
    }

    /// root(1) -> dir(2) -> {page(3), page(4)}; root(1) -> page(5); external(6) at top level
    fn seeded() -> Arc<InMemoryCredentialStore> {
        let store = InMemoryCredentialStore::new_shared();
        store.insert_menu(menu(1, 0, 1, ""));
        store.insert_menu(menu(2, 1, 2, ""));
        store.insert_menu(menu(3, 2, 2, "/system/users"));
        store.insert_menu(menu(4, 2, 1, "/system/roles"));
        store.insert_menu(menu(5, 1, 1, "/dashboard"));
        let mut external = menu(6, 0, 9, "https://docs.example.com");
        external.is_external_link = true;
        store.insert_menu(external);
        store
    }

    fn authorizer(store: Arc<InMemoryCredentialStore>) -> MenuAuthorizer {
        MenuAuthorizer::new(
            store,
            InMemoryCache::new_shared(),
            MenuConfig {
                super_admin_role_id: 1,
                cache_ttl: Duration::from_secs(600),
            },
        )
    }

    fn ids(nodes: &[MenuTreeNodeDto]) -> Vec<i64> {
        nodes.iter().map(|node| node.id).collect()
    }

    #[tokio::test]
    async fn test_granted_leaf_brings_its_ancestors() {
        let store = seeded();
        store.grant_menu(7, 3);
        let tree = authorizer(store).get_authorized_tree(&[7]).await.unwrap();

        assert_eq!(ids(&tree), vec![1]);
        assert_eq!(ids(&tree[0].children), vec![2]);
        // Sibling page 4 was never granted
        assert_eq!(ids(&tree[0].children[0].children), vec![3]);
    }

    #[tokio::test]
    async fn test_super_admin_without_grants_sees_everything() {
        let tree = authorizer(seeded()).get_authorized_tree(&[1]).await.unwrap();
        assert_eq!(ids(&tree), vec![1, 6]);
        assert_eq!(ids(&tree[0].children), vec![5, 2]);
        assert_eq!(ids(&tree[0].children[1].children), vec![4, 3]);
    }

    #[tokio::test]
    async fn test_super_admin_with_grants_is_scoped() {
        let store = seeded();
        store.grant_menu(1, 5);
        let tree = authorizer(store).get_authorized_tree(&[1]).await.unwrap();
        assert_eq!(ids(&tree), vec![1]);
        assert_eq!(ids(&tree[0].children), vec![5]);
    }

    #[tokio::test]
    async fn test_super_admin_plus_other_role_gets_no_default() {
        let tree = authorizer(seeded()).get_authorized_tree(&[1, 2]).await.unwrap();
        assert!(tree.is_empty());
    }

    #[tokio::test]
    async fn test_super_admin_paths_skip_disabled_menus() {
        let store = InMemoryCredentialStore::new_shared();
        store.insert_menu(menu(1, 0, 1, "/dashboard"));
        let mut retired = menu(2, 0, 2, "/retired");
        retired.status = MenuStatus::Disabled;
        store.insert_menu(retired);

        let authorizer = authorizer(store);
        assert_eq!(ids(&authorizer.get_authorized_tree(&[1]).await.unwrap()), vec![1]);
        assert_eq!(authorizer.get_authorized_paths(&[1]).await.unwrap(), vec!["/dashboard".to_string()]);
    }

    #[tokio::test]
    async fn test_granted_disabled_page_has_no_path() {
        let store = seeded();
        let mut users = menu(3, 2, 2, "/system/users");
        users.status = MenuStatus::Disabled;
        store.insert_menu(users);
        store.grant_menu(7, 3);
        store.grant_menu(7, 5);

        let paths = authorizer(store).get_authorized_paths(&[7]).await.unwrap();
        assert_eq!(paths, vec!["/dashboard".to_string()]);
    }

    #[tokio::test]
    async fn test_inactive_parent_promotes_child_to_root() {
        let store = seeded();
        let mut dir = menu(2, 1, 2, "");
        dir.status = MenuStatus::Disabled;
        store.insert_menu(dir);
        store.grant_menu(7, 3);

        let tree = authorizer(store).get_authorized_tree(&[7]).await.unwrap();
        assert_eq!(ids(&tree), vec![1, 3]);
        assert!(tree[0].children.is_empty());
    }

    #[tokio::test]
    async fn test_missing_menu_ids_are_ignored() {
        let store = seeded();
        store.grant_menu(7, 42);
        store.grant_menu(7, 5);
        let tree = authorizer(store).get_authorized_tree(&[7]).await.unwrap();
        assert_eq!(ids(&tree), vec![1]);
        assert_eq!(ids(&tree[0].children), vec![5]);
    }

    #[tokio::test]
    async fn test_paths_skip_directories_and_external_links() {
        let store = seeded();
        let mut link = menu(8, 2, 5, "https://grafana.example.com");
        link.is_external_link = true;
        store.insert_menu(link);

        let paths = authorizer(store).get_authorized_paths(&[1]).await.unwrap();
        assert_eq!(paths, vec!["/dashboard", "/system/roles", "/system/users"]);
    }

    #[tokio::test]
    async fn test_no_roles_sees_nothing() {
        let authorizer = authorizer(seeded());
        assert!(authorizer.get_authorized_tree(&[]).await.unwrap().is_empty());
        assert!(authorizer.get_authorized_paths(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cache_serves_until_invalidated() {
        let store = seeded();
        store.grant_menu(7, 5);
        let authorizer = authorizer(store.clone());
        assert_eq!(authorizer.get_authorized_paths(&[7]).await.unwrap(), vec!["/dashboard"]);

        store.grant_menu(7, 4);
        assert_eq!(authorizer.get_authorized_paths(&[7]).await.unwrap(), vec!["/dashboard"]);

        authorizer.invalidate_menu_cache().await;
        assert_eq!(
            authorizer.get_authorized_paths(&[7]).await.unwrap(),
            vec!["/dashboard", "/system/roles"]
        );
    }

    #[tokio::test]
    async fn test_broken_cache_is_ignored() {
        let store = seeded();
        store.grant_menu(7, 3);
        let authorizer = MenuAuthorizer::new(
            store,
            Arc::new(BrokenCache),
            MenuConfig {
                super_admin_role_id: 1,
                cache_ttl: Duration::from_secs(600),
            },
        );
        assert_eq!(authorizer.get_authorized_paths(&[7]).await.unwrap(), vec!["/system/users"]);
        authorizer.invalidate_menu_cache().await;
    }

    #[test]
    fn test_cache_key_ignores_role_order() {
        assert_eq!(cache_key("tree", &[3, 1, 3]), cache_key("tree", &[1, 3]));
        assert_eq!(cache_key("tree", &[1, 3]), "menu:tree:1,3");
    }

    #[test]
    fn test_parent_cycle_terminates() {
        let menus: HashMap<i64, Menu> = [menu(1, 2, 1, "/a"), menu(2, 1, 1, "/b"), menu(3, 1, 1, "/c")]
            .into_iter()
            .map(|menu| (menu.id, menu))
            .collect();

        let allow = ancestor_closure(&menus, &[3]);
        assert_eq!(allow, HashSet::from([1, 2, 3]));
        // No member of the cycle is a root, so nothing is reachable
        assert!(build_tree(&menus, &allow).is_empty());
    }
}

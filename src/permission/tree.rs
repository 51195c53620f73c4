use std::collections::{BTreeMap, HashMap};

use crate::models::{Access, RolePermission};

/// Menu with its accesses keyed by name and its resolved children
#[derive(Debug, Clone, PartialEq)]
pub struct MenuNode {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub sequence_no: i32,
    pub accesses: BTreeMap<String, Access>,
    pub children: Vec<MenuNode>,
}

impl MenuNode {
    pub fn access(&self, name: &str) -> Option<&Access> {
        self.accesses.get(name)
    }

    /// Depth-first visit, parents before children
    pub fn walk<'a>(&'a self, depth: usize, visit: &mut impl FnMut(&'a MenuNode, usize)) {
        visit(self, depth);
        for child in &self.children {
            child.walk(depth + 1, visit);
        }
    }
}

/// Role permission matrix: menu forest plus every access name seen, in
/// first-seen order (the matrix columns)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PermissionTree {
    pub roots: Vec<MenuNode>,
    pub access_types: Vec<String>,
    /// Menus whose `parentId` matched nothing; they are also kept as roots
    pub orphans: Vec<String>,
}

impl PermissionTree {
    pub fn rows(&self) -> Vec<(&MenuNode, usize)> {
        let mut rows = Vec::new();
        for root in &self.roots {
            root.walk(0, &mut |node, depth| rows.push((node, depth)));
        }
        rows
    }

    pub fn find(&self, id: &str) -> Option<&MenuNode> {
        self.rows().into_iter().map(|(n, _)| n).find(|n| n.id == id)
    }
}

/// Rebuild the menu forest from the flat permission list.
///
/// Pass one collects every menu by id, merging accesses when the same menu
/// appears in several role permissions. Pass two attaches children through
/// `parentId`. Siblings are ordered by `sequenceNo`, then name.
pub fn build_permission_tree(permissions: &[RolePermission]) -> PermissionTree {
    let mut nodes: HashMap<String, MenuNode> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    let mut access_types: Vec<String> = Vec::new();

    for permission in permissions {
        for menu in &permission.menus {
            let node = nodes.entry(menu.id.clone()).or_insert_with(|| {
                order.push(menu.id.clone());
                MenuNode {
                    id: menu.id.clone(),
                    name: menu.name.clone(),
                    parent_id: menu.parent_id.clone().filter(|p| !p.is_empty()),
                    sequence_no: menu.sequence_no,
                    accesses: BTreeMap::new(),
                    children: Vec::new(),
                }
            });

            for access in &menu.accesses {
                if !access_types.contains(&access.name) {
                    access_types.push(access.name.clone());
                }
                node.accesses.insert(
                    access.name.clone(),
                    Access {
                        id: access.id.clone(),
                        name: access.name.clone(),
                        is_active: Some(access.granted()),
                    },
                );
            }
        }
    }

    let mut orphans = Vec::new();
    let mut children_of: HashMap<String, Vec<String>> = HashMap::new();
    let mut root_ids = Vec::new();

    for id in &order {
        let node = &nodes[id];
        match &node.parent_id {
            Some(parent) if nodes.contains_key(parent) && parent != id => {
                children_of.entry(parent.clone()).or_default().push(id.clone());
            }
            Some(parent) => {
                tracing::warn!(
                    menu_id = %id,
                    menu = %node.name,
                    parent_id = %parent,
                    "menu parent not found in permission tree, treating as root"
                );
                orphans.push(id.clone());
                root_ids.push(id.clone());
            }
            None => root_ids.push(id.clone()),
        }
    }

    let mut roots: Vec<MenuNode> = root_ids
        .iter()
        .filter_map(|id| assemble(id, &mut nodes, &children_of))
        .collect();
    sort_siblings(&mut roots);

    // Anything left is on a parent cycle; surface it rather than drop it
    let leftover: Vec<String> = order.iter().filter(|id| nodes.contains_key(*id)).cloned().collect();
    for id in leftover {
        if let Some(node) = assemble(&id, &mut nodes, &children_of) {
            tracing::warn!(menu_id = %id, "menu parent chain is cyclic, treating as root");
            orphans.push(id);
            roots.push(node);
        }
    }

    PermissionTree {
        roots,
        access_types,
        orphans,
    }
}

fn assemble(
    id: &str,
    nodes: &mut HashMap<String, MenuNode>,
    children_of: &HashMap<String, Vec<String>>,
) -> Option<MenuNode> {
    let mut node = nodes.remove(id)?;
    if let Some(child_ids) = children_of.get(id) {
        for child_id in child_ids {
            if let Some(child) = assemble(child_id, nodes, children_of) {
                node.children.push(child);
            }
        }
    }
    sort_siblings(&mut node.children);
    Some(node)
}

fn sort_siblings(nodes: &mut [MenuNode]) {
    nodes.sort_by(|a, b| a.sequence_no.cmp(&b.sequence_no).then_with(|| a.name.cmp(&b.name)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Menu;

    fn menu(id: &str, name: &str, parent: Option<&str>, seq: i32, accesses: &[(&str, bool)]) -> Menu {
        Menu {
            id: id.into(),
            name: name.into(),
            parent_id: parent.map(Into::into),
            sequence_no: seq,
            accesses: accesses
                .iter()
                .map(|(n, a)| Access {
                    id: format!("{}-{}", id, n),
                    name: n.to_string(),
                    is_active: Some(*a),
                })
                .collect(),
        }
    }

    fn perm(menus: Vec<Menu>) -> RolePermission {
        RolePermission { id: None, role: None, menus }
    }

    #[test]
    fn children_attach_to_parents_in_sequence_order() {
        let tree = build_permission_tree(&[perm(vec![
            menu("c2", "Users", Some("p"), 2, &[("read", true)]),
            menu("p", "Settings", None, 1, &[("read", true)]),
            menu("c1", "Roles", Some("p"), 1, &[("read", false), ("update", true)]),
            menu("d", "Dashboard", None, 0, &[]),
        ])]);

        let names: Vec<&str> = tree.roots.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Dashboard", "Settings"]);

        let settings = &tree.roots[1];
        let children: Vec<&str> = settings.children.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(children, vec!["Roles", "Users"]);
        assert_eq!(tree.access_types, vec!["read", "update"]);
        assert!(tree.orphans.is_empty());
    }

    #[test]
    fn unresolved_parent_becomes_orphan_root() {
        let tree = build_permission_tree(&[perm(vec![
            menu("a", "Download", Some("missing"), 1, &[("read", true)]),
            menu("b", "Video", None, 0, &[]),
        ])]);

        assert_eq!(tree.roots.len(), 2);
        assert_eq!(tree.orphans, vec!["a".to_string()]);
        assert!(tree.find("a").is_some());
    }

    #[test]
    fn menus_repeated_across_permissions_merge_accesses() {
        let tree = build_permission_tree(&[
            perm(vec![menu("m", "Video", None, 0, &[("read", true)])]),
            perm(vec![menu("m", "Video", None, 0, &[("delete", false)])]),
        ]);

        assert_eq!(tree.roots.len(), 1);
        let node = &tree.roots[0];
        assert!(node.access("read").unwrap().granted());
        assert!(!node.access("delete").unwrap().granted());
    }

    #[test]
    fn cyclic_parents_are_not_dropped() {
        let tree = build_permission_tree(&[perm(vec![
            menu("x", "X", Some("y"), 0, &[]),
            menu("y", "Y", Some("x"), 0, &[]),
        ])]);

        assert_eq!(tree.rows().len(), 2);
        assert_eq!(tree.orphans.len(), 1);
    }

    #[test]
    fn rows_report_depth() {
        let tree = build_permission_tree(&[perm(vec![
            menu("p", "Settings", None, 0, &[]),
            menu("c", "Menu", Some("p"), 0, &[]),
            menu("g", "Access", Some("c"), 0, &[]),
        ])]);

        let depths: Vec<(&str, usize)> = tree.rows().iter().map(|(n, d)| (n.name.as_str(), *d)).collect();
        assert_eq!(depths, vec![("Settings", 0), ("Menu", 1), ("Access", 2)]);
    }
}

use std::collections::{HashMap, HashSet};

use crate::model::menu::Menu;

#[derive(Clone, Debug, PartialEq)]
pub struct MenuNode {
    pub menu: Menu,
    pub children: Vec<MenuNode>,
}

/// Arrange a flat, already ordered list of menus into a forest.
///
/// Roots are menus without a parent. A menu whose parent is missing from
/// `flat` (inactive, filtered by role, or deleted) is dropped together with
/// its subtree. Sibling order follows the order of `flat`.
pub fn build_tree(flat: &[Menu]) -> Vec<MenuNode> {
    let ids: HashSet<i64> = flat.iter().map(|menu| menu.id).collect();
    let mut roots: Vec<&Menu> = vec![];
    let mut children: HashMap<i64, Vec<&Menu>> = HashMap::new();
    for menu in flat {
        match menu.parent_id {
            None => roots.push(menu),
            Some(parent_id) if ids.contains(&parent_id) => {
                children.entry(parent_id).or_default().push(menu)
            }
            Some(_) => {}
        }
    }
    roots
        .into_iter()
        .map(|root| attach(root, &children))
        .collect()
}

// Only nodes reachable from a root are visited, so a parent cycle in the
// input can't recurse forever.
fn attach(menu: &Menu, children: &HashMap<i64, Vec<&Menu>>) -> MenuNode {
    let kids = match children.get(&menu.id) {
        Some(kids) => kids.iter().map(|kid| attach(kid, children)).collect(),
        None => vec![],
    };
    MenuNode {
        menu: menu.clone(),
        children: kids,
    }
}

/// Depth-first pre-order walk, the inverse of `build_tree` for inputs
/// without orphans.
pub fn flatten_tree(nodes: &[MenuNode]) -> Vec<Menu> {
    let mut flat = vec![];
    for node in nodes {
        flat.push(node.menu.clone());
        flat.extend(flatten_tree(&node.children));
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu(id: i64, parent_id: Option<i64>, order_no: i32) -> Menu {
        Menu {
            id,
            parent_id,
            name: format!("menu_{}", id),
            display_name: format!("Menu {}", id),
            icon: None,
            url: Some(format!("/menu/{}", id)),
            order_no,
            is_active: true,
            created_date: None,
            updated_date: None,
        }
    }

    fn ids(nodes: &[MenuNode]) -> Vec<i64> {
        nodes.iter().map(|node| node.menu.id).collect()
    }

    #[test]
    fn test_orphans_are_dropped() {
        let flat = vec![menu(1, None, 1), menu(3, Some(2), 1)];
        let tree = build_tree(&flat);
        assert_eq!(ids(&tree), vec![1]);
        assert!(tree[0].children.is_empty());
    }

    #[test]
    fn test_orphan_subtree_is_dropped() {
        let flat = vec![menu(1, None, 1), menu(3, Some(2), 1), menu(4, Some(3), 1)];
        let tree = build_tree(&flat);
        assert_eq!(flatten_tree(&tree).len(), 1);
    }

    #[test]
    fn test_nesting_keeps_input_order() {
        let flat = vec![
            menu(10, None, 1),
            menu(20, None, 2),
            menu(12, Some(10), 1),
            menu(11, Some(10), 2),
            menu(21, Some(20), 1),
            menu(111, Some(11), 1),
        ];
        let tree = build_tree(&flat);
        assert_eq!(ids(&tree), vec![10, 20]);
        assert_eq!(ids(&tree[0].children), vec![12, 11]);
        assert_eq!(ids(&tree[0].children[1].children), vec![111]);
        assert_eq!(ids(&tree[1].children), vec![21]);
    }

    #[test]
    fn test_child_listed_before_parent_is_attached() {
        let flat = vec![menu(2, Some(1), 1), menu(1, None, 1)];
        let tree = build_tree(&flat);
        assert_eq!(ids(&tree), vec![1]);
        assert_eq!(ids(&tree[0].children), vec![2]);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let flat = vec![
            menu(1, None, 1),
            menu(2, Some(1), 1),
            menu(3, Some(2), 1),
            menu(4, None, 2),
            menu(5, Some(1), 2),
        ];
        let tree = build_tree(&flat);
        let rebuilt = build_tree(&flatten_tree(&tree));
        assert_eq!(tree, rebuilt);
    }

    #[test]
    fn test_parent_cycle_without_root_yields_nothing() {
        let flat = vec![menu(1, Some(2), 1), menu(2, Some(1), 1)];
        assert!(build_tree(&flat).is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(build_tree(&[]).is_empty());
        assert!(flatten_tree(&[]).is_empty());
    }
}

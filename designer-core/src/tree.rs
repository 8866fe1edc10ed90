//! Hierarchy index over the flat component map.
//!
//! [`ComponentTree`] is derived data: it is rebuilt from a [`ComponentMap`]
//! whenever the design changes and only records who is whose parent and the
//! sibling order. Geometry lives in the layout engine.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{ComponentId, ComponentInstance};

/// The flat design store: every component keyed by id.
pub type ComponentMap = BTreeMap<ComponentId, ComponentInstance>;

/// A structural problem found by [`ComponentTree::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeIssue {
    /// `parent_id` points at a component that does not exist.
    DanglingParent {
        /// The component with the bad reference.
        id: ComponentId,
        /// The missing parent.
        parent_id: ComponentId,
    },
    /// Two siblings share the same `order`.
    DuplicateOrder {
        /// Shared parent (`None` for roots).
        parent_id: Option<ComponentId>,
        /// The duplicated order value.
        order: u32,
        /// Siblings sharing it.
        ids: Vec<ComponentId>,
    },
    /// Parent references form a loop.
    Cycle {
        /// Components on the loop, in parent-to-child order.
        path: Vec<ComponentId>,
    },
}

/// Parent/children adjacency derived from a [`ComponentMap`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentTree {
    /// Root component ids in sibling order.
    roots: Vec<ComponentId>,
    /// Children of each parent, in sibling order.
    children: BTreeMap<ComponentId, Vec<ComponentId>>,
    /// Parent of each non-root component.
    parents: BTreeMap<ComponentId, ComponentId>,
}

impl ComponentTree {
    /// Build the hierarchy index from the flat map.
    ///
    /// Components whose parent does not exist are treated as roots so the
    /// rest of the design stays reachable.
    #[must_use]
    pub fn build(components: &ComponentMap) -> Self {
        let mut roots: Vec<&ComponentInstance> = Vec::new();
        let mut grouped: BTreeMap<ComponentId, Vec<&ComponentInstance>> = BTreeMap::new();
        let mut parents = BTreeMap::new();

        for component in components.values() {
            match &component.parent_id {
                Some(parent_id) if components.contains_key(parent_id) => {
                    parents.insert(component.id.clone(), parent_id.clone());
                    grouped.entry(parent_id.clone()).or_default().push(component);
                }
                _ => roots.push(component),
            }
        }

        let ordered = |mut list: Vec<&ComponentInstance>| {
            list.sort_by(|a, b| {
                a.position
                    .order
                    .cmp(&b.position.order)
                    .then_with(|| a.id.cmp(&b.id))
            });
            list.into_iter().map(|c| c.id.clone()).collect::<Vec<_>>()
        };

        Self {
            roots: ordered(roots),
            children: grouped
                .into_iter()
                .map(|(parent, list)| (parent, ordered(list)))
                .collect(),
            parents,
        }
    }

    /// Root component ids in sibling order.
    #[must_use]
    pub fn roots(&self) -> &[ComponentId] {
        &self.roots
    }

    /// Children of a component in sibling order.
    #[must_use]
    pub fn children_of(&self, id: &ComponentId) -> &[ComponentId] {
        self.children.get(id).map_or(&[][..], Vec::as_slice)
    }

    /// Parent of a component, `None` for roots.
    #[must_use]
    pub fn parent_of(&self, id: &ComponentId) -> Option<&ComponentId> {
        self.parents.get(id)
    }

    /// Components sharing this component's parent, excluding itself.
    #[must_use]
    pub fn siblings_of(&self, id: &ComponentId) -> Vec<ComponentId> {
        let siblings = match self.parent_of(id) {
            Some(parent) => self.children_of(parent),
            None => self.roots.as_slice(),
        };
        siblings.iter().filter(|s| *s != id).cloned().collect()
    }

    /// Ancestors from the direct parent up to the root.
    #[must_use]
    pub fn ancestors(&self, id: &ComponentId) -> Vec<ComponentId> {
        let mut ancestors = Vec::new();
        let mut seen = BTreeSet::new();
        let mut current = id;
        while let Some(parent) = self.parents.get(current) {
            if !seen.insert(parent.clone()) {
                break;
            }
            ancestors.push(parent.clone());
            current = parent;
        }
        ancestors
    }

    /// All descendants in depth-first pre-order.
    #[must_use]
    pub fn descendants(&self, id: &ComponentId) -> Vec<ComponentId> {
        let mut out = Vec::new();
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&ComponentId> = self.children_of(id).iter().rev().collect();
        while let Some(next) = stack.pop() {
            if !seen.insert(next.clone()) {
                continue;
            }
            out.push(next.clone());
            stack.extend(self.children_of(next).iter().rev());
        }
        out
    }

    /// Nesting depth (roots are 0).
    #[must_use]
    pub fn depth(&self, id: &ComponentId) -> usize {
        self.ancestors(id).len()
    }

    /// Number of indexed components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len() + self.parents.len()
    }

    /// Check if the tree is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty() && self.parents.is_empty()
    }

    /// Check the structural invariants of a component map.
    #[must_use]
    pub fn validate(components: &ComponentMap) -> Vec<TreeIssue> {
        let mut issues = Vec::new();

        for component in components.values() {
            if let Some(parent_id) = &component.parent_id {
                if !components.contains_key(parent_id) {
                    issues.push(TreeIssue::DanglingParent {
                        id: component.id.clone(),
                        parent_id: parent_id.clone(),
                    });
                }
            }
        }

        let mut orders: BTreeMap<(Option<ComponentId>, u32), Vec<ComponentId>> = BTreeMap::new();
        for component in components.values() {
            orders
                .entry((component.parent_id.clone(), component.position.order))
                .or_default()
                .push(component.id.clone());
        }
        for ((parent_id, order), ids) in orders {
            if ids.len() > 1 {
                issues.push(TreeIssue::DuplicateOrder {
                    parent_id,
                    order,
                    ids,
                });
            }
        }

        issues.extend(find_cycles(components));
        issues
    }
}

/// Depth-first search over parent->child edges with a recursion stack.
fn find_cycles(components: &ComponentMap) -> Vec<TreeIssue> {
    let mut edges: BTreeMap<&ComponentId, Vec<&ComponentId>> = BTreeMap::new();
    for component in components.values() {
        if let Some(parent_id) = &component.parent_id {
            if components.contains_key(parent_id) {
                edges.entry(parent_id).or_default().push(&component.id);
            }
        }
    }

    let mut visited: BTreeSet<&ComponentId> = BTreeSet::new();
    let mut cycles = Vec::new();

    for start in components.keys() {
        if visited.contains(start) {
            continue;
        }
        let mut stack_path: Vec<&ComponentId> = Vec::new();
        let mut on_stack: BTreeSet<&ComponentId> = BTreeSet::new();
        visit(
            start,
            &edges,
            &mut visited,
            &mut on_stack,
            &mut stack_path,
            &mut cycles,
        );
    }

    cycles
}

fn visit<'a>(
    node: &'a ComponentId,
    edges: &BTreeMap<&'a ComponentId, Vec<&'a ComponentId>>,
    visited: &mut BTreeSet<&'a ComponentId>,
    on_stack: &mut BTreeSet<&'a ComponentId>,
    path: &mut Vec<&'a ComponentId>,
    cycles: &mut Vec<TreeIssue>,
) {
    visited.insert(node);
    on_stack.insert(node);
    path.push(node);

    for &next in edges.get(node).map_or(&[][..], Vec::as_slice) {
        if on_stack.contains(next) {
            let start = path.iter().position(|id| *id == next).unwrap_or(0);
            cycles.push(TreeIssue::Cycle {
                path: path[start..].iter().map(|id| (*id).clone()).collect(),
            });
        } else if !visited.contains(next) {
            visit(next, edges, visited, on_stack, path, cycles);
        }
    }

    path.pop();
    on_stack.remove(node);
}

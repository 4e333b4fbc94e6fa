//! Arena-indexed view over one blueprint's live field tree.
//!
//! Built per operation from the persisted field rows. Nodes live in a flat
//! vector; parent/child relationships and path lookups go through index
//! maps, so recomputing derived `full_path` values after a rename or
//! re-parent is a single top-down pass.

use crate::schema::types::FieldNode;
use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

pub struct FieldTree {
    nodes: Vec<FieldNode>,
    by_id: HashMap<Uuid, usize>,
    /// Children indexes per parent id (`None` = root level), path-sorted.
    children: HashMap<Option<Uuid>, Vec<usize>>,
    by_path: HashMap<String, usize>,
}

impl FieldTree {
    /// Builds the tree from a blueprint's live fields.
    pub fn from_fields(mut fields: Vec<FieldNode>) -> Self {
        fields.sort_by(|a, b| a.full_path.cmp(&b.full_path));

        let mut by_id = HashMap::with_capacity(fields.len());
        let mut children: HashMap<Option<Uuid>, Vec<usize>> = HashMap::new();
        let mut by_path = HashMap::with_capacity(fields.len());

        for (idx, field) in fields.iter().enumerate() {
            by_id.insert(field.id, idx);
            children.entry(field.parent_id).or_default().push(idx);
            by_path.insert(field.full_path.clone(), idx);
        }

        Self {
            nodes: fields,
            by_id,
            children,
            by_path,
        }
    }

    /// Every node in the tree, in path order.
    pub fn nodes(&self) -> &[FieldNode] {
        &self.nodes
    }

    /// False when two live nodes share a `full_path` (the per-blueprint
    /// uniqueness invariant is violated).
    pub fn paths_are_unique(&self) -> bool {
        self.by_path.len() == self.nodes.len()
    }

    pub fn get(&self, id: Uuid) -> Option<&FieldNode> {
        self.by_id.get(&id).map(|&idx| &self.nodes[idx])
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.by_path.contains_key(path)
    }

    /// All live field paths of the blueprint.
    pub fn paths(&self) -> HashSet<String> {
        self.by_path.keys().cloned().collect()
    }

    /// Direct children of a node (`None` = root-level fields), path-sorted.
    pub fn children_of(&self, parent_id: Option<Uuid>) -> Vec<&FieldNode> {
        self.children
            .get(&parent_id)
            .map(|idxs| idxs.iter().map(|&i| &self.nodes[i]).collect())
            .unwrap_or_default()
    }

    /// Every node of the tree, parents before children.
    pub fn iter_top_down(&self) -> Vec<&FieldNode> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut queue: VecDeque<Option<Uuid>> = VecDeque::new();
        queue.push_back(None);
        while let Some(parent) = queue.pop_front() {
            for child in self.children_of(parent) {
                out.push(child);
                queue.push_back(Some(child.id));
            }
        }
        out
    }

    /// All descendants of a node (the node itself excluded), parents first.
    pub fn descendants_of(&self, id: Uuid) -> Vec<&FieldNode> {
        let mut out = Vec::new();
        let mut queue: VecDeque<Uuid> = VecDeque::new();
        queue.push_back(id);
        while let Some(current) = queue.pop_front() {
            for child in self.children_of(Some(current)) {
                out.push(child);
                queue.push_back(child.id);
            }
        }
        out
    }

    /// True if `candidate` lies in the subtree rooted at `id`.
    pub fn is_descendant_of(&self, candidate: Uuid, id: Uuid) -> bool {
        self.descendants_of(id).iter().any(|f| f.id == candidate)
    }

    /// The derived path a field would have under the given parent.
    pub fn path_under(&self, parent_id: Option<Uuid>, name: &str) -> String {
        match parent_id.and_then(|id| self.get(id)) {
            Some(parent) => format!("{}.{}", parent.full_path, name),
            None => name.to_string(),
        }
    }

    /// Recomputes `full_path` for the subtree rooted at `id` after its name
    /// or parent changed, propagating top-down to every descendant.
    /// Returns the updated nodes for persistence.
    pub fn recompute_paths(&mut self, id: Uuid) -> Vec<FieldNode> {
        let mut updated = Vec::new();
        let mut queue: VecDeque<Uuid> = VecDeque::new();
        queue.push_back(id);

        while let Some(current) = queue.pop_front() {
            let idx = match self.by_id.get(&current) {
                Some(&idx) => idx,
                None => continue,
            };
            let new_path = {
                let node = &self.nodes[idx];
                self.path_under(node.parent_id, &node.name)
            };
            if self.nodes[idx].full_path != new_path {
                let old_path = self.nodes[idx].full_path.clone();
                self.by_path.remove(&old_path);
                self.nodes[idx].full_path = new_path.clone();
                self.by_path.insert(new_path, idx);
                updated.push(self.nodes[idx].clone());
            }
            let child_ids: Vec<Uuid> = self
                .children_of(Some(current))
                .iter()
                .map(|f| f.id)
                .collect();
            queue.extend(child_ids.into_iter());
        }

        updated
    }

    /// Applies a name and/or parent change to one node, then recomputes the
    /// affected subtree. Returns every node whose record changed.
    pub fn apply_move(
        &mut self,
        id: Uuid,
        new_name: Option<&str>,
        new_parent: Option<Option<Uuid>>,
    ) -> Vec<FieldNode> {
        let idx = match self.by_id.get(&id) {
            Some(&idx) => idx,
            None => return Vec::new(),
        };

        if let Some(name) = new_name {
            self.nodes[idx].name = name.to_string();
        }
        if let Some(parent) = new_parent {
            let old_parent = self.nodes[idx].parent_id;
            if old_parent != parent {
                if let Some(siblings) = self.children.get_mut(&old_parent) {
                    siblings.retain(|&i| i != idx);
                }
                self.children.entry(parent).or_default().push(idx);
                self.nodes[idx].parent_id = parent;
            }
        }

        let mut updated = self.recompute_paths(id);
        // The moved node itself is persisted even when its path is unchanged.
        if !updated.iter().any(|f| f.id == id) {
            updated.push(self.nodes[idx].clone());
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{FieldOrigin, FieldType};
    use chrono::Utc;

    fn field(blueprint: Uuid, parent: Option<&FieldNode>, name: &str) -> FieldNode {
        let full_path = match parent {
            Some(p) => format!("{}.{}", p.full_path, name),
            None => name.to_string(),
        };
        let now = Utc::now();
        FieldNode {
            id: Uuid::new_v4(),
            blueprint_id: blueprint,
            parent_id: parent.map(|p| p.id),
            name: name.to_string(),
            full_path,
            field_type: FieldType::Group,
            required: false,
            indexed: false,
            cardinality: None,
            validations: Vec::new(),
            ui: Default::default(),
            origin: FieldOrigin::Authored,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn builds_paths_and_children() {
        let bp = Uuid::new_v4();
        let root = field(bp, None, "office");
        let child = field(bp, Some(&root), "street");
        let tree = FieldTree::from_fields(vec![child.clone(), root.clone()]);

        assert!(tree.contains_path("office"));
        assert!(tree.contains_path("office.street"));
        assert_eq!(tree.children_of(Some(root.id)).len(), 1);
        assert_eq!(tree.iter_top_down()[0].id, root.id);
    }

    #[test]
    fn rename_propagates_to_descendants() {
        let bp = Uuid::new_v4();
        let root = field(bp, None, "office");
        let mid = field(bp, Some(&root), "geo");
        let leaf = field(bp, Some(&mid), "lat");
        let mut tree = FieldTree::from_fields(vec![root.clone(), mid, leaf]);

        let updated = tree.apply_move(root.id, Some("hq"), None);
        assert_eq!(updated.len(), 3);
        assert!(tree.contains_path("hq.geo.lat"));
        assert!(!tree.contains_path("office.geo.lat"));
    }

    #[test]
    fn reparent_recomputes_subtree() {
        let bp = Uuid::new_v4();
        let a = field(bp, None, "a");
        let b = field(bp, None, "b");
        let leaf = field(bp, Some(&a), "x");
        let mut tree = FieldTree::from_fields(vec![a.clone(), b.clone(), leaf.clone()]);

        tree.apply_move(leaf.id, None, Some(Some(b.id)));
        assert!(tree.contains_path("b.x"));
        assert!(!tree.contains_path("a.x"));
        assert!(tree.is_descendant_of(leaf.id, b.id));
    }
}

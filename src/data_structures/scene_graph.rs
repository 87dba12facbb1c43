//! Scene graph and hierarchical scene organization.
//!
//! A [`Scene`] owns every [`Node`] in an arena. Ownership flows from the root
//! to the children: a node's children are listed only by that node, and the
//! `parent` link is a plain [`NodeId`] back-reference that never owns anything.
//! The arena is only appended to while a scene is built and is immutable
//! afterwards, so ids stay valid for the lifetime of the scene.

use std::fmt;

use cgmath::{Matrix4, SquareMatrix};

use crate::{data_structures::mesh::MeshUnit, gpu::Backend};

/// Stable handle of a node inside its [`Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Every scene has exactly one root and it is always the first node.
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// One element of the scene hierarchy.
pub struct Node<B: Backend> {
    pub name: String,
    /// Transform relative to the parent node.
    pub transform: Matrix4<f32>,
    pub meshes: Vec<MeshUnit<B>>,
    id: NodeId,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl<B: Backend> Node<B> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Back-reference to the parent; `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

impl<B: Backend> fmt::Debug for Node<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("transform", &self.transform)
            .field("meshes", &self.meshes)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .finish()
    }
}

/// A loaded scene: an owned node tree plus the scene name.
///
/// Dropping a scene drops every node and with it every mesh and texture the
/// scene created, each exactly once.
pub struct Scene<B: Backend> {
    pub name: String,
    nodes: Vec<Node<B>>,
}

impl<B: Backend> Scene<B> {
    /// Creates a scene that holds only its root node.
    pub fn new(
        name: impl Into<String>,
        root_name: impl Into<String>,
        root_transform: Matrix4<f32>,
        root_meshes: Vec<MeshUnit<B>>,
    ) -> Self {
        Self {
            name: name.into(),
            nodes: vec![Node {
                name: root_name.into(),
                transform: root_transform,
                meshes: root_meshes,
                id: NodeId::ROOT,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /**
     * Appends a node below `parent`.
     *
     * The new node's back-reference is set before it is listed among the
     * parent's children, so a child is never reachable without its parent chain.
     * Returns `None` if `parent` does not belong to this scene.
     */
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        transform: Matrix4<f32>,
        meshes: Vec<MeshUnit<B>>,
    ) -> Option<NodeId> {
        if parent.0 >= self.nodes.len() {
            return None;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.into(),
            transform,
            meshes,
            id,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        Some(id)
    }

    pub fn root(&self) -> &Node<B> {
        &self.nodes[NodeId::ROOT.0]
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<B>> {
        self.nodes.get(id.0)
    }

    /// All nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node<B>> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A scene always has a root, so it is never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn parent(&self, id: NodeId) -> Option<&Node<B>> {
        self.node(id)?.parent.and_then(|parent| self.node(parent))
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &Node<B>> {
        self.node(id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|&child| &self.nodes[child.0])
    }

    /// First node with the given name in pre-order.
    pub fn find(&self, name: &str) -> Option<&Node<B>> {
        let mut pending = vec![NodeId::ROOT];
        while let Some(id) = pending.pop() {
            let node = &self.nodes[id.0];
            if node.name == name {
                return Some(node);
            }
            pending.extend(node.children.iter().rev());
        }
        None
    }

    pub fn mesh_count(&self) -> usize {
        self.nodes.iter().map(|node| node.meshes.len()).sum()
    }

    /**
     * Global transform of a node, following parent back-references up to the
     * root: `global = parent_global * local`, with the identity above the root.
     */
    pub fn global_transform(&self, id: NodeId) -> Option<Matrix4<f32>> {
        let mut node = self.node(id)?;
        let mut global = node.transform;
        while let Some(parent) = node.parent {
            node = &self.nodes[parent.0];
            global = node.transform * global;
        }
        Some(global)
    }

    /// Visits every node depth-first in pre-order together with its global
    /// transform. A parent's global transform is always computed before any of
    /// its children is visited.
    pub fn walk<'a, F>(&'a self, mut visit: F)
    where
        F: FnMut(&'a Node<B>, &Matrix4<f32>),
    {
        self.walk_from(NodeId::ROOT, &Matrix4::identity(), &mut visit);
    }

    fn walk_from<'a, F>(&'a self, id: NodeId, parent_global: &Matrix4<f32>, visit: &mut F)
    where
        F: FnMut(&'a Node<B>, &Matrix4<f32>),
    {
        let node = &self.nodes[id.0];
        let global = *parent_global * node.transform;
        visit(node, &global);
        for &child in &node.children {
            self.walk_from(child, &global, visit);
        }
    }
}

impl<B: Backend> fmt::Debug for Scene<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field("nodes", &self.nodes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Vector3, Vector4};

    use super::*;
    use crate::gpu::headless::HeadlessBackend;

    type TestScene = Scene<HeadlessBackend>;

    fn translation(x: f32, y: f32, z: f32) -> Matrix4<f32> {
        Matrix4::from_translation(Vector3::new(x, y, z))
    }

    fn tree() -> TestScene {
        // root -> [a, b], a -> [c]
        let mut scene = TestScene::new("tree", "root", Matrix4::identity(), Vec::new());
        let a = scene
            .add_child(NodeId::ROOT, "a", Matrix4::identity(), Vec::new())
            .unwrap();
        scene
            .add_child(NodeId::ROOT, "b", Matrix4::identity(), Vec::new())
            .unwrap();
        scene.add_child(a, "c", Matrix4::identity(), Vec::new()).unwrap();
        scene
    }

    #[test]
    fn walks_in_pre_order() {
        let scene = tree();
        let mut visited = Vec::new();
        scene.walk(|node, _| visited.push(node.name.clone()));
        assert_eq!(visited, vec!["root", "a", "c", "b"]);
    }

    #[test]
    fn find_returns_the_first_match_in_pre_order() {
        let mut scene = tree();
        let a = scene.find("a").unwrap().id();
        let b = scene.find("b").unwrap().id();
        // b's child is created first but a's child comes first in pre-order
        scene.add_child(b, "dup", Matrix4::identity(), Vec::new()).unwrap();
        scene.add_child(a, "dup", Matrix4::identity(), Vec::new()).unwrap();

        let found = scene.find("dup").unwrap();

        assert_eq!(found.parent(), Some(a));
        assert!(scene.find("missing").is_none());
    }

    #[test]
    fn children_point_back_to_their_parent() {
        let scene = tree();
        let a = scene.find("a").unwrap();
        let c = scene.find("c").unwrap();

        assert!(scene.root().is_root());
        assert_eq!(c.parent(), Some(a.id()));
        assert_eq!(scene.parent(c.id()).unwrap().name, "a");
        let names: Vec<_> = scene.children(NodeId::ROOT).map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn global_transform_composes_parent_times_local() {
        let t0 = Matrix4::from_scale(2.0);
        let t1 = translation(1.0, 0.0, 0.0);
        let t2 = Matrix4::from_angle_z(cgmath::Deg(90.0));
        let mut scene = TestScene::new("chain", "t0", t0, Vec::new());
        let n1 = scene.add_child(NodeId::ROOT, "t1", t1, Vec::new()).unwrap();
        let n2 = scene.add_child(n1, "t2", t2, Vec::new()).unwrap();

        let expected = t0 * t1 * t2;
        assert_eq!(scene.global_transform(n2), Some(expected));

        let mut walked = None;
        scene.walk(|node, global| {
            if node.id() == n2 {
                walked = Some(*global);
            }
        });
        assert_eq!(walked, Some(expected));

        // the unit x axis is rotated onto y, shifted by one and scaled by two
        let p = expected * Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert!((p.x - 2.0).abs() < 1e-5);
        assert!((p.y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn rejects_foreign_parent_ids() {
        let mut scene = tree();
        assert!(scene
            .add_child(NodeId(42), "orphan", Matrix4::identity(), Vec::new())
            .is_none());
        assert_eq!(scene.len(), 4);
    }
}

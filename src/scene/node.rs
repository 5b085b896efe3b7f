//! Transform nodes and the node algebra used by the camera rig.
//!
//! Nodes live in a [`NodeArena`] and refer to their parent by [`NodeId`].
//! A node's world transform is `parent.world * local`, evaluated on demand
//! every time it is asked for, so mutating an ancestor is immediately
//! visible to every descendant.
//!
//! ## Axis conventions
//! ```text
//!   +Z up
//!   +Y forward (the camera looks down its local +Y axis)
//!   +X right
//! ```

use crate::util::{Mat4, Quat, Vec3, Vec4};

/// Handle to a node inside a [`NodeArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single node: local position + local orientation, optionally parented.
#[derive(Clone, Debug)]
pub struct TransformNode {
    pub name: String,
    /// Position in the parent's coordinate space.
    pub position: Vec3,
    /// Accumulated orientation relative to the parent.
    pub rotation: Quat,
    parent: Option<NodeId>,
}

impl TransformNode {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Local transform (rotation then translation).
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }
}

/// Owning storage for a small transform hierarchy.
///
/// Nodes are never removed individually; a hierarchy is replaced wholesale
/// when a new model is loaded. A parent is always created before its
/// children, which keeps the parent chain acyclic.
#[derive(Clone, Debug, Default)]
pub struct NodeArena {
    nodes: Vec<TransformNode>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node at `position` with identity orientation.
    pub fn add(&mut self, name: impl Into<String>, parent: Option<NodeId>, position: Vec3) -> NodeId {
        if let Some(p) = parent {
            debug_assert!(p.0 < self.nodes.len(), "parent must exist before child");
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(TransformNode {
            name: name.into(),
            position,
            rotation: Quat::IDENTITY,
            parent,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> &TransformNode {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut TransformNode {
        &mut self.nodes[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TransformNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// World transform: composition of every ancestor's local transform,
    /// applied parent-to-child.
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let node = self.get(id);
        match node.parent {
            Some(parent) => self.world_matrix(parent) * node.local_matrix(),
            None => node.local_matrix(),
        }
    }

    /// World-space origin of a node.
    pub fn world_position(&self, id: NodeId) -> Vec3 {
        self.world_matrix(id).transform_point3(Vec3::ZERO)
    }

    /// Move a node by `delta`, expressed in the node's own local axes.
    pub fn translate(&mut self, id: NodeId, delta: Vec3) {
        let node = self.get_mut(id);
        node.position += node.rotation * delta;
    }

    /// Rotate a node by `angle` radians about `axis`.
    ///
    /// Without `about`, `axis` is one of the node's own axes and the pivot is
    /// the node's own origin: only the orientation changes.
    ///
    /// With `about`, `axis` is one of the other node's axes and the pivot is
    /// that node's origin: the node swings around it, changing both position
    /// and orientation.
    pub fn rotate_axis(&mut self, id: NodeId, axis: Vec3, angle: f32, about: Option<NodeId>) {
        let Some(about) = about else {
            let node = self.get_mut(id);
            node.rotation = (node.rotation * Quat::from_axis_angle(axis.normalize(), angle)).normalize();
            return;
        };

        // Express the pivot and axis in the node's parent space, where
        // position and rotation live.
        let to_parent = match self.get(id).parent {
            Some(parent) => self.world_matrix(parent).inverse(),
            None => Mat4::IDENTITY,
        };
        let about_world = self.world_matrix(about);
        let pivot = to_parent.transform_point3(about_world.transform_point3(Vec3::ZERO));
        let axis = to_parent
            .transform_vector3(about_world.transform_vector3(axis))
            .normalize_or_zero();
        if axis == Vec3::ZERO {
            return;
        }

        let q = Quat::from_axis_angle(axis, angle);
        let node = self.get_mut(id);
        node.position = pivot + q * (node.position - pivot);
        node.rotation = (q * node.rotation).normalize();
    }

    pub fn rotate_x(&mut self, id: NodeId, angle: f32, about: Option<NodeId>) {
        self.rotate_axis(id, Vec3::X, angle, about);
    }

    pub fn rotate_y(&mut self, id: NodeId, angle: f32, about: Option<NodeId>) {
        self.rotate_axis(id, Vec3::Y, angle, about);
    }

    pub fn rotate_z(&mut self, id: NodeId, angle: f32, about: Option<NodeId>) {
        self.rotate_axis(id, Vec3::Z, angle, about);
    }

    /// Re-express `v` from `from`'s local axes into `into`'s local axes.
    ///
    /// `w = 0` maps a direction, `w = 1` maps a point.
    pub fn map_pos(&self, from: NodeId, v: Vec4, into: NodeId) -> Vec4 {
        if from == into {
            return v;
        }
        self.world_matrix(into).inverse() * (self.world_matrix(from) * v)
    }
}

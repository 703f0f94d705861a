//! The quadtree node and its level of detail state machine.

use crate::{
    config::LandscapeConfig,
    generator::{patch_channel, MeshGenerator, PatchRequest, PendingPatch},
    landscape::LandscapeStats,
    patch::{MeshPatch, PatchId},
    scene::LandscapeScene,
};
use bevy::prelude::*;
use std::mem;

/// The quadrant offsets of the four children, in units of a quarter of the parent size.
const CHILD_OFFSETS: [Vec2; 4] = [
    Vec2::new(-1.0, -1.0),
    Vec2::new(1.0, -1.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(-1.0, 1.0),
];

/// Everything a node needs from its surroundings during an update pass.
pub struct LandscapeContext<'a> {
    pub config: &'a LandscapeConfig,
    pub generator: &'a dyn MeshGenerator,
    pub scene: &'a mut dyn LandscapeScene,
    /// The viewer position, lowered by the height of the terrain below it.
    pub viewer: Vec3,
    pub(crate) next_patch: &'a mut u64,
}

impl LandscapeContext<'_> {
    fn allocate_patch(&mut self) -> PatchId {
        let id = PatchId(*self.next_patch);
        *self.next_patch += 1;
        id
    }
}

enum PatchState {
    /// The generator has not answered yet.
    Pending {
        request: PatchRequest,
        pending: PendingPatch,
    },
    Ready(MeshPatch),
    /// The generator failed. The node stays without a mesh until the landscape is rebuilt.
    Faulted,
    /// The node was destroyed.
    Released,
}

/// A node of a section quadtree.
///
/// Each node owns the patch covering its footprint and either no or four children,
/// which cover one quadrant each.
pub struct LandscapeNode {
    /// The depth of the node, starting at 1 for the root.
    level: u32,
    /// The center of the node footprint.
    position: Vec3,
    /// The edge length of the node footprint.
    scale: f32,
    id: PatchId,
    patch: PatchState,
    /// Whether the patch is currently attached to the scene.
    displayed: bool,
    children: Option<Box<[LandscapeNode; 4]>>,
}

impl LandscapeNode {
    /// Creates the node and requests its patch right away.
    pub fn new(level: u32, position: Vec3, scale: f32, context: &mut LandscapeContext) -> Self {
        let request = PatchRequest {
            resolution: context.config.cells_per_chunk,
            x: position.x,
            y: position.y,
            scale,
        };

        let (reply, pending) = patch_channel();
        context.generator.request(request, reply);

        Self {
            level,
            position,
            scale,
            id: context.allocate_patch(),
            patch: PatchState::Pending { request, pending },
            displayed: false,
            children: None,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn patch_id(&self) -> PatchId {
        self.id
    }

    pub fn patch(&self) -> Option<&MeshPatch> {
        match &self.patch {
            PatchState::Ready(patch) => Some(patch),
            _ => None,
        }
    }

    pub fn children(&self) -> Option<&[LandscapeNode; 4]> {
        self.children.as_deref()
    }

    /// Whether the patch of this node has been built.
    pub fn is_ready(&self) -> bool {
        matches!(self.patch, PatchState::Ready(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.patch, PatchState::Pending { .. })
    }

    pub fn is_displayed(&self) -> bool {
        self.displayed
    }

    /// The level of detail this node should have for the current viewer position.
    pub fn desired_lod(&self, context: &LandscapeContext) -> u32 {
        let distance = context.viewer.distance(self.position);
        context.config.desired_lod(distance, self.scale)
    }

    /// Advances the state machine of this node and its subtree by one frame.
    pub fn update(&mut self, context: &mut LandscapeContext) {
        self.receive_patch();

        if self.desired_lod(context) > self.level {
            self.subdivide(context);
        } else {
            self.collapse(context.scene);
        }

        if let Some(children) = &mut self.children {
            for child in children.iter_mut() {
                child.update(context);
            }
        }
    }

    /// Destroys the subtree and releases the patch of this node.
    ///
    /// A pending request is abandoned, its result will be discarded once it arrives.
    pub fn destroy(&mut self, scene: &mut dyn LandscapeScene) {
        self.destroy_children(scene);
        self.hide(scene);

        if let PatchState::Ready(patch) = mem::replace(&mut self.patch, PatchState::Released) {
            scene.release(&patch);
        }
    }

    /// Attaches the patch, if it is ready and not displayed yet.
    pub fn show(&mut self, scene: &mut dyn LandscapeScene) {
        if let PatchState::Ready(patch) = &self.patch {
            if !self.displayed {
                scene.attach(patch);
                self.displayed = true;
            }
        }
    }

    /// Detaches the patch, if it is displayed.
    pub fn hide(&mut self, scene: &mut dyn LandscapeScene) {
        if self.displayed {
            if let PatchState::Ready(patch) = &self.patch {
                scene.detach(patch);
            }
            self.displayed = false;
        }
    }

    pub(crate) fn collect_stats(&self, stats: &mut LandscapeStats) {
        stats.nodes += 1;
        stats.max_level = stats.max_level.max(self.level);

        if self.displayed {
            stats.displayed += 1;
        }
        if self.is_pending() {
            stats.pending += 1;
        }

        match &self.children {
            Some(children) => children.iter().for_each(|child| child.collect_stats(stats)),
            None => stats.leaves += 1,
        }
    }

    fn receive_patch(&mut self) {
        let PatchState::Pending { request, pending } = &self.patch else {
            return;
        };

        let Some(result) = pending.poll() else {
            return;
        };
        let request = *request;

        self.patch = match result.and_then(|raw| MeshPatch::build(self.id, &raw, &request)) {
            Ok(patch) => PatchState::Ready(patch),
            Err(error) => {
                warn!(
                    "Failed to generate the landscape patch at {} (level {}): {error}",
                    self.position, self.level
                );
                PatchState::Faulted
            }
        };
    }

    /// Splits the node into four children.
    ///
    /// The own patch stays visible until all children are ready to replace it,
    /// so subdividing never opens a hole.
    fn subdivide(&mut self, context: &mut LandscapeContext) {
        if let Some(children) = &self.children {
            if children.iter().all(LandscapeNode::is_ready) {
                self.hide(context.scene);
            } else {
                // the own patch may have arrived after the children were created
                self.show(context.scene);
            }
            return;
        }

        let offset = 0.25 * self.scale;
        let children = CHILD_OFFSETS.map(|direction| {
            let position = self.position + (direction * offset).extend(0.0);
            LandscapeNode::new(self.level + 1, position, 0.5 * self.scale, context)
        });

        self.children = Some(Box::new(children));

        debug!(
            "Subdivided the landscape node at {} (level {}).",
            self.position, self.level
        );
    }

    /// Displays the own patch and drops the children immediately.
    fn collapse(&mut self, scene: &mut dyn LandscapeScene) {
        self.show(scene);

        if self.children.is_some() {
            self.destroy_children(scene);

            debug!(
                "Collapsed the landscape node at {} (level {}).",
                self.position, self.level
            );
        }
    }

    fn destroy_children(&mut self, scene: &mut dyn LandscapeScene) {
        if let Some(mut children) = self.children.take() {
            for child in children.iter_mut() {
                child.destroy(scene);
            }
        }
    }
}

use crate::{
    landscape::LandscapeStats,
    node::{LandscapeContext, LandscapeNode},
    scene::LandscapeScene,
};
use bevy::prelude::*;

/// One tile of the section grid, holding the root of a quadtree.
pub struct LandscapeSection {
    cell: IVec2,
    position: Vec3,
    root: Option<LandscapeNode>,
}

impl LandscapeSection {
    pub fn new(cell: IVec2, context: &mut LandscapeContext) -> Self {
        let scale = context.config.section_width;
        let position = (cell.as_vec2() * scale).extend(0.0);

        Self {
            cell,
            position,
            root: Some(LandscapeNode::new(1, position, scale, context)),
        }
    }

    /// The grid cell of the section.
    pub fn cell(&self) -> IVec2 {
        self.cell
    }

    /// The center of the section.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn root(&self) -> Option<&LandscapeNode> {
        self.root.as_ref()
    }

    pub fn update(&mut self, context: &mut LandscapeContext) {
        if let Some(root) = &mut self.root {
            root.update(context);
        }
    }

    /// Destroys the quadtree of this section. Calling it again does nothing.
    pub fn destroy(&mut self, scene: &mut dyn LandscapeScene) {
        if let Some(mut root) = self.root.take() {
            root.destroy(scene);
        }
    }

    pub(crate) fn collect_stats(&self, stats: &mut LandscapeStats) {
        stats.sections += 1;

        if let Some(root) = &self.root {
            root.collect_stats(stats);
        }
    }
}

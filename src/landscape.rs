//! The landscape, a grid of quadtree sections kept around the viewer.

use crate::{
    config::LandscapeConfig,
    generator::{HeightQuery, MeshGenerator},
    node::LandscapeContext,
    procedural::{NoiseConfig, ProceduralGenerator},
    scene::LandscapeScene,
    section::LandscapeSection,
};
use bevy::{prelude::*, utils::HashSet};
use itertools::iproduct;

/// A summary of the current state of all quadtrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LandscapeStats {
    pub sections: usize,
    pub nodes: usize,
    pub leaves: usize,
    /// Nodes whose patch is attached to the scene.
    pub displayed: usize,
    /// Nodes still waiting for the generator.
    pub pending: usize,
    pub max_level: u32,
}

/// The whole landscape.
///
/// It owns `(2 * view_distance + 1)²` sections centered around a grid cell.
/// Every frame [`Landscape::tick`] updates all of their quadtrees to the viewer position.
#[derive(Resource)]
pub struct Landscape {
    config: LandscapeConfig,
    generator: Box<dyn MeshGenerator>,
    heights: Box<dyn HeightQuery>,
    sections: Vec<LandscapeSection>,
    /// The grid cell the sections are centered around.
    center: IVec2,
    /// The ground relative viewer position of the last tick.
    viewer: Vec3,
    time: f32,
    next_patch: u64,
}

impl Landscape {
    /// Creates an empty landscape, call [`Landscape::rebuild`] to populate it.
    pub fn new(
        config: LandscapeConfig,
        generator: impl MeshGenerator,
        heights: impl HeightQuery,
    ) -> Self {
        Self {
            config,
            generator: Box::new(generator),
            heights: Box::new(heights),
            sections: Vec::new(),
            center: IVec2::ZERO,
            viewer: Vec3::ZERO,
            time: 0.0,
            next_patch: 0,
        }
    }

    /// Creates an empty landscape shaped by noise.
    pub fn procedural(config: LandscapeConfig, noise: &NoiseConfig) -> Self {
        let generator = ProceduralGenerator::new(noise);
        Self::new(config, generator.clone(), generator)
    }

    pub fn config(&self) -> &LandscapeConfig {
        &self.config
    }

    pub fn sections(&self) -> &[LandscapeSection] {
        &self.sections
    }

    pub fn center(&self) -> IVec2 {
        self.center
    }

    /// The accumulated time of all ticks.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn stats(&self) -> LandscapeStats {
        let mut stats = LandscapeStats::default();

        for section in &self.sections {
            section.collect_stats(&mut stats);
        }

        stats
    }

    /// Destroys all sections and creates the full grid from scratch.
    ///
    /// Any failed patch is requested again.
    pub fn rebuild(&mut self, scene: &mut dyn LandscapeScene) {
        self.teardown(scene);

        let radius = self.config.view_distance as i32;
        let mut context = LandscapeContext {
            config: &self.config,
            generator: self.generator.as_ref(),
            scene,
            viewer: self.viewer,
            next_patch: &mut self.next_patch,
        };

        for (x, y) in iproduct!(-radius..=radius, -radius..=radius) {
            let cell = self.center + IVec2::new(x, y);
            self.sections.push(LandscapeSection::new(cell, &mut context));
        }

        info!(
            "Rebuilt the landscape with {} sections around {}.",
            self.sections.len(),
            self.center
        );
    }

    /// Destroys all sections, detaching every displayed patch.
    pub fn teardown(&mut self, scene: &mut dyn LandscapeScene) {
        if self.sections.is_empty() {
            return;
        }

        for section in &mut self.sections {
            section.destroy(scene);
        }
        self.sections.clear();

        info!("Tore down the landscape.");
    }

    /// Moves the grid to a new center cell.
    ///
    /// Sections that are still in range keep their quadtrees. All others are destroyed,
    /// before the missing ones are created.
    pub fn recenter(&mut self, center: IVec2, scene: &mut dyn LandscapeScene) {
        let radius = self.config.view_distance as i32;
        let in_range = |cell: IVec2| (cell - center).abs().max_element() <= radius;

        self.center = center;
        self.sections.retain_mut(|section| {
            let keep = in_range(section.cell());
            if !keep {
                section.destroy(scene);
            }
            keep
        });

        let existing = self
            .sections
            .iter()
            .map(LandscapeSection::cell)
            .collect::<HashSet<_>>();

        let mut context = LandscapeContext {
            config: &self.config,
            generator: self.generator.as_ref(),
            scene,
            viewer: self.viewer,
            next_patch: &mut self.next_patch,
        };

        for (x, y) in iproduct!(-radius..=radius, -radius..=radius) {
            let cell = center + IVec2::new(x, y);
            if !existing.contains(&cell) {
                self.sections.push(LandscapeSection::new(cell, &mut context));
            }
        }

        info!("Moved the landscape center to {center}.");
    }

    /// Advances the landscape by one frame.
    ///
    /// `viewer` is the position of the viewer in the landscape frame. Its distance to the
    /// nodes is measured relative to the terrain height right below it.
    pub fn tick(&mut self, delta: f32, viewer: Vec3, scene: &mut dyn LandscapeScene) {
        self.time += delta;
        self.viewer = viewer - Vec3::Z * self.heights.height_at(viewer.x, viewer.y);

        if self.config.follow_viewer && !self.sections.is_empty() {
            let cell = self.config.section_cell(viewer);

            if cell != self.center {
                self.recenter(cell, scene);
            }
        }

        let mut context = LandscapeContext {
            config: &self.config,
            generator: self.generator.as_ref(),
            scene,
            viewer: self.viewer,
            next_patch: &mut self.next_patch,
        };

        for section in &mut self.sections {
            section.update(&mut context);
        }
    }
}

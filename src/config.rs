use anyhow::Result;
use bevy::prelude::*;
use serde::Deserialize;
use std::{fs, path::Path};

/// The settings of a [`Landscape`](crate::landscape::Landscape).
#[derive(Clone, Debug, PartialEq, Deserialize, Resource)]
#[serde(default)]
pub struct LandscapeConfig {
    /// The number of sections loaded in each direction around the center section.
    pub view_distance: u32,
    /// The resolution of every patch, in cells per edge.
    pub cells_per_chunk: u32,
    /// The edge length of a section, which is the size of its root node.
    pub section_width: f32,
    /// The distance that has to be covered to drop a single level of detail.
    pub lod_distance: f32,
    /// The deepest level a node may be subdivided to.
    pub max_lod: u32,
    /// Whether the section grid re-centers, once the viewer enters another section.
    pub follow_viewer: bool,
}

impl Default for LandscapeConfig {
    fn default() -> Self {
        Self {
            view_distance: 6,
            cells_per_chunk: 20,
            section_width: 20000.0,
            lod_distance: 500.0,
            max_lod: 8,
            follow_viewer: true,
        }
    }
}

impl LandscapeConfig {
    pub fn from_ron(source: &str) -> Result<Self> {
        Ok(ron::from_str(source)?)
    }

    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_ron(&source)
    }

    /// The number of sections along each axis of the grid.
    #[inline]
    pub fn grid_size(&self) -> u32 {
        2 * self.view_distance + 1
    }

    /// The grid cell containing the horizontal position.
    pub fn section_cell(&self, position: Vec3) -> IVec2 {
        (Vec2::new(position.x, position.y) / self.section_width).round().as_ivec2()
    }

    /// The level of detail a node of size `scale` should have at `distance` from the viewer.
    ///
    /// The node size is subtracted from the distance, so the viewer counts as close
    /// as soon as it is within the footprint of a node. The result lies in `0..=max_lod`.
    pub fn desired_lod(&self, distance: f32, scale: f32) -> u32 {
        let max_lod = self.max_lod as f32;
        let falloff = ((distance - scale) / self.lod_distance).clamp(0.0, max_lod);

        (max_lod - falloff).floor() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn closest_nodes_want_the_maximum_lod() {
        let config = LandscapeConfig::default();

        for scale in [0.0, 100.0, 4000.0, 20000.0, 1.0e6] {
            assert_eq!(config.desired_lod(0.0, scale), 8);
        }
    }

    #[test]
    fn far_nodes_want_the_minimum_lod() {
        let config = LandscapeConfig::default();

        assert_eq!(config.desired_lod(20000.0 + 8.0 * 500.0, 20000.0), 0);
        assert_eq!(config.desired_lod(1.0e9, 20000.0), 0);
        assert_eq!(config.desired_lod(20000.0 + 3.5 * 500.0, 20000.0), 4);
    }

    #[test]
    fn lod_does_not_increase_with_distance() {
        let config = LandscapeConfig::default();
        let mut rng = rand::rng();

        for _ in 0..64 {
            let scale = rng.random_range(10.0..40000.0);
            let mut distances = (0..32)
                .map(|_| rng.random_range(0.0..60000.0))
                .collect::<Vec<f32>>();
            distances.sort_by(f32::total_cmp);

            let lods = distances
                .iter()
                .map(|&distance| config.desired_lod(distance, scale))
                .collect::<Vec<_>>();

            assert!(lods.windows(2).all(|pair| pair[0] >= pair[1]), "{lods:?}");
        }
    }

    #[test]
    fn section_cells() {
        let config = LandscapeConfig::default();

        assert_eq!(config.grid_size(), 13);
        assert_eq!(config.section_cell(Vec3::new(0.0, 0.0, 500.0)), IVec2::ZERO);
        assert_eq!(
            config.section_cell(Vec3::new(9999.0, -10001.0, 0.0)),
            IVec2::new(0, -1)
        );
        assert_eq!(
            config.section_cell(Vec3::new(45000.0, 30001.0, 0.0)),
            IVec2::new(2, 2)
        );
    }

    #[test]
    fn parse_partial_ron() {
        let config = LandscapeConfig::from_ron(
            "(view_distance: 1, cells_per_chunk: 8, follow_viewer: false)",
        )
        .unwrap();

        assert_eq!(
            config,
            LandscapeConfig {
                view_distance: 1,
                cells_per_chunk: 8,
                follow_viewer: false,
                ..default()
            }
        );
        assert!(LandscapeConfig::from_ron("(view_distance: -1)").is_err());
    }

    #[test]
    fn bundled_config_matches_the_defaults() {
        let config = LandscapeConfig::from_ron(include_str!("../assets/landscape.ron")).unwrap();

        assert_eq!(config, LandscapeConfig::default());
    }
}

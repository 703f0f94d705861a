//! Keyboard controls to inspect and reset the landscape at runtime.

use crate::{landscape::Landscape, plugin::RebuildLandscape};
use bevy::prelude::*;

/// Adds the landscape debug controls.
///
/// - `G` rebuilds the landscape from scratch.
/// - `I` logs the current quadtree statistics.
pub struct LandscapeDebugPlugin;

impl Plugin for LandscapeDebugPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, debug_controls);
    }
}

pub fn debug_controls(
    input: Res<ButtonInput<KeyCode>>,
    landscape: Res<Landscape>,
    mut rebuild: EventWriter<RebuildLandscape>,
) {
    if input.just_pressed(KeyCode::KeyG) {
        info!("Rebuilding the landscape.");
        rebuild.send(RebuildLandscape);
    }
    if input.just_pressed(KeyCode::KeyI) {
        let stats = landscape.stats();
        info!(
            "Landscape at {:.1}s: {} sections, {} nodes ({} leaves, max level {}), {} displayed, {} pending.",
            landscape.time(),
            stats.sections,
            stats.nodes,
            stats.leaves,
            stats.max_level,
            stats.displayed,
            stats.pending
        );
    }
}

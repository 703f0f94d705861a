//! This crate renders endless height-field landscapes with a quadtree level of detail.
//!
//! # Background
//! The landscape is partitioned into a grid of square sections around the viewer.
//! Each section is the root of a quadtree, whose nodes are split into four children
//! when the viewer comes close and merged back once it moves away.
//! Every node owns a mesh patch covering its footprint, which is requested from a
//! [`MeshGenerator`](generator::MeshGenerator) when the node is created.
//!
//! Generators may answer asynchronously. Until all four children of a node are ready,
//! the node keeps displaying its own patch, so the landscape never shows holes.
//! Merging is immediate, because the coarser patch is always available.
//!
//! The patches of neighbouring nodes may differ in resolution. Each patch carries a skirt
//! of vertices folded down below its edges, which hides the cracks in between.
//! See the [`patch`] module for more information.
//!
//! The quadtree itself does not know about Bevy entities. It attaches and detaches
//! patches through the [`LandscapeScene`](scene::LandscapeScene) trait, which the
//! [`LandscapePlugin`] implements by spawning one entity per visible patch.

pub mod config;
pub mod debug;
pub mod generator;
pub mod landscape;
pub mod node;
pub mod patch;
pub mod plugin;
pub mod procedural;
pub mod scene;
pub mod section;

#[cfg(test)]
mod testing;

pub use crate::{
    debug::LandscapeDebugPlugin,
    plugin::{LandscapePlugin, LandscapeViewer, RebuildLandscape},
};

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use crate::{
        config::LandscapeConfig,
        debug::LandscapeDebugPlugin,
        generator::{HeightQuery, MeshGenerator, PatchReply, PatchRequest},
        landscape::{Landscape, LandscapeStats},
        patch::{PatchError, RawPatch},
        plugin::{LandscapePlugin, LandscapeViewer, RebuildLandscape},
        procedural::{NoiseConfig, ProceduralGenerator},
        scene::{from_landscape_space, to_landscape_space, LandscapeScene},
    };
}

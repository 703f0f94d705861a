//! The connection between the landscape quadtree and the rendered scene.
//!
//! The quadtree works in a z-up frame, where x and y span the ground plane.
//! Patches are placed into Bevy's y-up world by [`landscape_rotation`].

use crate::patch::{MeshPatch, PatchId};
use bevy::{prelude::*, utils::HashMap};
use std::f32::consts::FRAC_PI_2;

/// Receives the patches that should currently be visible.
///
/// The landscape guarantees that `attach` and `detach` calls for the same patch alternate,
/// starting with `attach`, and that `release` is the last call for a patch.
pub trait LandscapeScene {
    fn attach(&mut self, patch: &MeshPatch);

    fn detach(&mut self, patch: &MeshPatch);

    /// The patch is dropped and will never be attached again.
    fn release(&mut self, _patch: &MeshPatch) {}
}

/// The rotation turning the z-up landscape frame into Bevy's y-up frame.
pub fn landscape_rotation() -> Quat {
    Quat::from_rotation_x(-FRAC_PI_2)
}

/// Converts a Bevy world position into the landscape frame.
#[inline]
pub fn to_landscape_space(position: Vec3) -> Vec3 {
    Vec3::new(position.x, -position.z, position.y)
}

/// Converts a landscape position into the Bevy world frame.
#[inline]
pub fn from_landscape_space(position: Vec3) -> Vec3 {
    Vec3::new(position.x, position.z, -position.y)
}

/// Tracks the entities and mesh assets spawned for landscape patches.
#[derive(Default, Resource)]
pub struct LandscapeEntities {
    entities: HashMap<PatchId, Entity>,
    meshes: HashMap<PatchId, Handle<Mesh>>,
}

impl LandscapeEntities {
    /// The entity currently displaying the patch.
    pub fn entity(&self, patch: PatchId) -> Option<Entity> {
        self.entities.get(&patch).copied()
    }

    pub fn displayed(&self) -> usize {
        self.entities.len()
    }
}

/// The shared material of all landscape patches.
#[derive(Clone, Resource)]
pub struct LandscapeMaterial(pub Handle<StandardMaterial>);

/// A [`LandscapeScene`] spawning one entity per displayed patch.
///
/// The mesh asset of a patch is created on its first attach and kept until the patch
/// is released, so hiding and showing a patch again does not upload it twice.
pub struct EntityScene<'a, 'w, 's> {
    pub commands: &'a mut Commands<'w, 's>,
    pub meshes: &'a mut Assets<Mesh>,
    pub material: &'a LandscapeMaterial,
    pub entities: &'a mut LandscapeEntities,
}

impl LandscapeScene for EntityScene<'_, '_, '_> {
    fn attach(&mut self, patch: &MeshPatch) {
        let meshes = &mut *self.meshes;
        let mesh = self
            .entities
            .meshes
            .entry(patch.id())
            .or_insert_with(|| meshes.add(patch.to_mesh()))
            .clone();

        let entity = self
            .commands
            .spawn((
                Name::new(format!("Landscape Patch {}", patch.id().0)),
                Mesh3d(mesh),
                MeshMaterial3d(self.material.0.clone()),
                Transform::from_rotation(landscape_rotation()),
            ))
            .id();

        if let Some(previous) = self.entities.entities.insert(patch.id(), entity) {
            warn!("Landscape patch {:?} was attached twice.", patch.id());
            self.commands.entity(previous).despawn();
        }
    }

    fn detach(&mut self, patch: &MeshPatch) {
        if let Some(entity) = self.entities.entities.remove(&patch.id()) {
            self.commands.entity(entity).despawn();
        }
    }

    fn release(&mut self, patch: &MeshPatch) {
        self.detach(patch);

        if let Some(mesh) = self.entities.meshes.remove(&patch.id()) {
            self.meshes.remove(&mesh);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_conversion_matches_rotation() {
        let rotation = landscape_rotation();

        for position in [
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(-20000.0, 5.0, 0.5),
            Vec3::Z,
        ] {
            let world = from_landscape_space(position);

            assert!((rotation * position).abs_diff_eq(world, 1.0e-3));
            assert_eq!(to_landscape_space(world), position);
        }

        // landscape up is world up
        assert_eq!(from_landscape_space(Vec3::Z), Vec3::Y);
    }
}

use crate::{
    config::LandscapeConfig,
    landscape::Landscape,
    procedural::NoiseConfig,
    scene::{to_landscape_space, EntityScene, LandscapeEntities, LandscapeMaterial},
};
use bevy::prelude::*;

/// Marks the camera whose position drives the level of detail.
#[derive(Clone, Copy, Default, Component)]
pub struct LandscapeViewer;

/// Destroys and recreates all sections of the landscape on the next update.
#[derive(Clone, Copy, Default, Event)]
pub struct RebuildLandscape;

/// The plugin for the landscape.
///
/// It uses the noise based generator, unless a [`Landscape`] resource was inserted before.
#[derive(Clone, Default)]
pub struct LandscapePlugin {
    pub config: LandscapeConfig,
    pub noise: NoiseConfig,
}

impl Plugin for LandscapePlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<Landscape>() {
            app.insert_resource(Landscape::procedural(self.config.clone(), &self.noise));
        }

        app.init_resource::<LandscapeEntities>()
            .add_event::<RebuildLandscape>()
            .add_systems(Startup, initialize_landscape)
            .add_systems(Update, update_landscape);
    }
}

fn initialize_landscape(
    mut commands: Commands,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut rebuild: EventWriter<RebuildLandscape>,
) {
    // the patches carry their color in the vertex colors
    let material = materials.add(StandardMaterial {
        base_color: Color::WHITE,
        perceptual_roughness: 0.9,
        ..default()
    });

    commands.insert_resource(LandscapeMaterial(material));
    rebuild.send(RebuildLandscape);
}

/// Rebuilds the landscape if requested and updates it to the viewer position.
///
/// Without a [`LandscapeViewer`] the landscape is paused.
#[allow(clippy::too_many_arguments)]
pub fn update_landscape(
    mut commands: Commands,
    time: Res<Time>,
    mut landscape: ResMut<Landscape>,
    mut entities: ResMut<LandscapeEntities>,
    mut meshes: ResMut<Assets<Mesh>>,
    material: Res<LandscapeMaterial>,
    mut rebuild: EventReader<RebuildLandscape>,
    viewers: Query<&GlobalTransform, With<LandscapeViewer>>,
) {
    let mut scene = EntityScene {
        commands: &mut commands,
        meshes: &mut meshes,
        material: &material,
        entities: &mut entities,
    };

    if rebuild.read().count() > 0 {
        landscape.rebuild(&mut scene);
    }

    let Ok(viewer) = viewers.get_single() else {
        return;
    };

    let position = to_landscape_space(viewer.translation());
    landscape.tick(time.delta_secs(), position, &mut scene);
}

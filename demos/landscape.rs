use bevy::prelude::*;
use bevy_landscape::prelude::*;

const SPEED: f32 = 2000.0;
const TURN_SPEED: f32 = 1.2;

#[derive(Component)]
struct FlyCamera {
    yaw: f32,
    pitch: f32,
    speed: f32,
}

fn main() {
    let config = LandscapeConfig::load_file("assets/landscape.ron").unwrap_or_else(|error| {
        println!("Using the default landscape config: {error}");
        LandscapeConfig::default()
    });

    App::new()
        .add_plugins((
            DefaultPlugins,
            LandscapePlugin {
                config,
                noise: NoiseConfig::default(),
            },
            LandscapeDebugPlugin,
        ))
        .insert_resource(ClearColor(Color::srgb(0.55, 0.7, 0.9)))
        .add_systems(Startup, setup)
        .add_systems(Update, fly_camera)
        .run();
}

fn setup(mut commands: Commands) {
    commands.spawn((
        Name::new("Sun"),
        DirectionalLight {
            illuminance: 10000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(EulerRot::YXZ, 0.6, -0.8, 0.0)),
    ));

    // start above the landscape center, looking north
    commands.spawn((
        Name::new("Viewer"),
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            far: 400_000.0,
            ..default()
        }),
        Transform::from_translation(from_landscape_space(Vec3::new(0.0, 0.0, 4000.0))),
        FlyCamera {
            yaw: 0.0,
            pitch: -0.3,
            speed: SPEED,
        },
        LandscapeViewer,
    ));
}

/// `WASD` moves, `Space`/`ShiftLeft` rise and sink, the arrow keys look around
/// and `PageUp`/`PageDown` change the speed.
fn fly_camera(
    time: Res<Time>,
    keys: Res<ButtonInput<KeyCode>>,
    mut cameras: Query<(&mut Transform, &mut FlyCamera)>,
) {
    let delta = time.delta_secs();

    for (mut transform, mut camera) in &mut cameras {
        if keys.pressed(KeyCode::ArrowLeft) {
            camera.yaw += TURN_SPEED * delta;
        }
        if keys.pressed(KeyCode::ArrowRight) {
            camera.yaw -= TURN_SPEED * delta;
        }
        if keys.pressed(KeyCode::ArrowUp) {
            camera.pitch += TURN_SPEED * delta;
        }
        if keys.pressed(KeyCode::ArrowDown) {
            camera.pitch -= TURN_SPEED * delta;
        }
        if keys.pressed(KeyCode::PageUp) {
            camera.speed *= 1.02;
        }
        if keys.pressed(KeyCode::PageDown) {
            camera.speed /= 1.02;
        }
        camera.pitch = camera.pitch.clamp(-1.5, 1.5);

        transform.rotation = Quat::from_euler(EulerRot::YXZ, camera.yaw, camera.pitch, 0.0);

        let mut direction = Vec3::ZERO;
        if keys.pressed(KeyCode::KeyW) {
            direction += *transform.forward();
        }
        if keys.pressed(KeyCode::KeyS) {
            direction -= *transform.forward();
        }
        if keys.pressed(KeyCode::KeyD) {
            direction += *transform.right();
        }
        if keys.pressed(KeyCode::KeyA) {
            direction -= *transform.right();
        }
        if keys.pressed(KeyCode::Space) {
            direction += Vec3::Y;
        }
        if keys.pressed(KeyCode::ShiftLeft) {
            direction -= Vec3::Y;
        }

        transform.translation += direction.normalize_or_zero() * camera.speed * delta;
    }
}

//! A self-contained noise based [`MeshGenerator`], used when no other generator is provided.

use crate::{
    generator::{HeightQuery, MeshGenerator, PatchReply, PatchRequest},
    patch::RawPatch,
};
use anyhow::Result;
use bevy::{
    math::Vec3,
    tasks::{AsyncComputeTaskPool, TaskPool},
};
use itertools::iproduct;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use serde::Deserialize;
use std::sync::Arc;

const SAND: Vec3 = Vec3::new(0.76, 0.70, 0.50);
const GRASS: Vec3 = Vec3::new(0.25, 0.45, 0.16);
const ROCK: Vec3 = Vec3::new(0.42, 0.38, 0.35);
const SNOW: Vec3 = Vec3::new(0.95, 0.95, 0.97);

/// The shape of the procedural terrain.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub seed: u32,
    pub octaves: usize,
    /// The frequency of the first octave, in cycles per world unit.
    pub frequency: f64,
    /// The height difference between the lowest and the highest possible point.
    pub amplitude: f32,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 6,
            frequency: 1.0 / 12000.0,
            amplitude: 3000.0,
        }
    }
}

impl NoiseConfig {
    pub fn from_ron(source: &str) -> Result<Self> {
        Ok(ron::from_str(source)?)
    }
}

struct Terrain {
    noise: Fbm<Perlin>,
    amplitude: f32,
}

impl Terrain {
    fn height(&self, x: f32, y: f32) -> f32 {
        0.5 * self.amplitude * self.noise.get([x as f64, y as f64]) as f32
    }

    fn color(&self, height: f32) -> [f32; 3] {
        let h = (height / (0.5 * self.amplitude)).clamp(-1.0, 1.0);

        let color = if h < -0.3 {
            SAND
        } else if h < 0.2 {
            SAND.lerp(GRASS, ((h + 0.3) / 0.1).min(1.0))
        } else if h < 0.55 {
            GRASS.lerp(ROCK, ((h - 0.2) / 0.35).min(1.0))
        } else {
            ROCK.lerp(SNOW, ((h - 0.55) / 0.15).min(1.0))
        };

        color.to_array()
    }
}

/// Generates patches from fractal Perlin noise on the [`AsyncComputeTaskPool`].
#[derive(Clone)]
pub struct ProceduralGenerator {
    terrain: Arc<Terrain>,
}

impl ProceduralGenerator {
    pub fn new(config: &NoiseConfig) -> Self {
        let noise = Fbm::<Perlin>::new(config.seed)
            .set_octaves(config.octaves)
            .set_frequency(config.frequency);

        Self {
            terrain: Arc::new(Terrain {
                noise,
                amplitude: config.amplitude,
            }),
        }
    }

    /// Generates the patch on the calling thread.
    pub fn generate(&self, request: &PatchRequest) -> RawPatch {
        grid_patch(
            request,
            |x, y| self.terrain.height(x, y),
            |height| self.terrain.color(height),
        )
    }
}

impl Default for ProceduralGenerator {
    fn default() -> Self {
        Self::new(&NoiseConfig::default())
    }
}

impl HeightQuery for ProceduralGenerator {
    fn height_at(&self, x: f32, y: f32) -> f32 {
        self.terrain.height(x, y)
    }
}

impl MeshGenerator for ProceduralGenerator {
    fn request(&self, request: PatchRequest, reply: PatchReply) {
        let generator = self.clone();

        AsyncComputeTaskPool::get_or_init(TaskPool::default)
            .spawn(async move {
                // the node may have collapsed while the task was queued
                if reply.is_wanted() {
                    reply.send(Ok(generator.generate(&request)));
                }
            })
            .detach();
    }
}

/// Lays out the `(resolution + 3)`² vertex grid of a patch.
///
/// The grid covers the requested square plus one ring of cells outside of it.
/// Rows advance along +y, columns along +x, and triangles wind counter clockwise
/// when seen from above.
pub fn grid_patch(
    request: &PatchRequest,
    height: impl Fn(f32, f32) -> f32,
    color: impl Fn(f32) -> [f32; 3],
) -> RawPatch {
    let vertices_per_row = request.resolution + 3;
    let cell_size = request.cell_size();
    let origin_x = request.x - 0.5 * request.scale - cell_size;
    let origin_y = request.y - 0.5 * request.scale - cell_size;

    let (positions, colors): (Vec<_>, Vec<_>) =
        iproduct!(0..vertices_per_row, 0..vertices_per_row)
            .map(|(row, column)| {
                let x = origin_x + column as f32 * cell_size;
                let y = origin_y + row as f32 * cell_size;
                let z = height(x, y);

                ([x, y, z], color(z))
            })
            .unzip();

    let indices = iproduct!(0..vertices_per_row - 1, 0..vertices_per_row - 1)
        .flat_map(|(row, column)| {
            let a = row * vertices_per_row + column;
            let b = a + 1;
            let c = b + vertices_per_row;
            let d = a + vertices_per_row;

            [a, b, c, a, c, d]
        })
        .collect::<Vec<_>>();

    RawPatch::pack(&indices, &positions, &colors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{generator::patch_channel, patch::MeshPatch, patch::PatchId};
    use std::time::{Duration, Instant};

    fn request() -> PatchRequest {
        PatchRequest {
            resolution: 20,
            x: 20000.0,
            y: -20000.0,
            scale: 20000.0,
        }
    }

    #[test]
    fn grid_covers_the_footprint_and_its_border() {
        let request = PatchRequest {
            resolution: 4,
            x: 100.0,
            y: 50.0,
            scale: 40.0,
        };
        let raw = grid_patch(&request, |_, _| 0.0, |_| [1.0; 3]);
        let buffers = raw.decode().unwrap();

        assert_eq!(buffers.positions.len(), 49);
        assert_eq!(buffers.indices.len(), 6 * 6 * 6);
        assert_eq!(buffers.positions[0], [70.0, 20.0, 0.0]);
        assert_eq!(buffers.positions[48], [130.0, 80.0, 0.0]);
        // the first vertex of the footprint itself
        assert_eq!(buffers.positions[8], [80.0, 30.0, 0.0]);
    }

    #[test]
    fn heights_match_the_height_query() {
        let generator = ProceduralGenerator::default();
        let raw = generator.generate(&request());

        for &[x, y, z] in raw.decode().unwrap().positions {
            assert_eq!(z, generator.height_at(x, y));
            assert!(z.abs() <= 0.5 * NoiseConfig::default().amplitude * 1.5);
        }
    }

    #[test]
    fn generated_patches_build() {
        let generator = ProceduralGenerator::new(&NoiseConfig {
            seed: 7,
            ..NoiseConfig::default()
        });
        let request = request();

        assert!(MeshPatch::build(PatchId(0), &generator.generate(&request), &request).is_ok());
    }

    #[test]
    fn requests_reply_asynchronously() {
        let generator = ProceduralGenerator::default();
        let (reply, pending) = patch_channel();

        generator.request(request(), reply);

        let start = Instant::now();
        let result = loop {
            if let Some(result) = pending.poll() {
                break result;
            }
            assert!(start.elapsed() < Duration::from_secs(10));
            std::thread::sleep(Duration::from_millis(1));
        };

        assert_eq!(result, Ok(generator.generate(&request())));
    }

    #[test]
    fn parse_noise_config() {
        let config = NoiseConfig::from_ron("(seed: 3, amplitude: 100.0)").unwrap();

        assert_eq!(config.seed, 3);
        assert_eq!(config.amplitude, 100.0);
        assert_eq!(config.octaves, NoiseConfig::default().octaves);
    }
}

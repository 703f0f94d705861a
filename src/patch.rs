//! Decoding and post-processing of generated patch geometry.
//!
//! Generators answer with a [`RawPatch`], a single packed word buffer laid out as
//!
//! ```text
//! [vertex_count: i32][index_count: i32][indices: u32 * index_count]
//! [positions: f32 * 3 * vertex_count][colors: f32 * 3 * vertex_count]
//! ```
//!
//! The vertices form a square grid of `resolution + 3` vertices per row, that is the
//! `resolution + 1` vertices of the patch itself plus one ring outside of the footprint.
//! After decoding, this ring is folded down below the patch edge to form a skirt, which
//! hides the cracks between neighbouring patches of different resolutions.

use crate::generator::PatchRequest;
use bevy::{
    math::Vec3,
    render::{
        mesh::{Indices, Mesh, PrimitiveTopology},
        render_asset::RenderAssetUsages,
    },
};
use bytemuck::cast_slice;
use derive_more::derive::{Display, Error};

const HEADER_SIZE: usize = 2;

/// Everything that can go wrong between requesting and building a patch.
#[derive(Clone, Debug, PartialEq, Eq, Display, Error)]
pub enum PatchError {
    #[display("the patch buffer is shorter than its header")]
    MissingHeader,
    #[display("the patch header contains a negative count ({count})")]
    NegativeCount { count: i32 },
    #[display("the patch buffer holds {available} words, but its header requires {required}")]
    Truncated { required: usize, available: usize },
    #[display("the index count {count} is not a multiple of three")]
    IncompleteTriangle { count: usize },
    #[display("index {index} exceeds the vertex count {vertex_count}")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[display("expected {expected} vertices for the patch grid, found {actual}")]
    GridMismatch { expected: usize, actual: usize },
    #[display("the patch byte buffer length {length} is not a multiple of four")]
    Unaligned { length: usize },
    #[display("the mesh generator failed: {message}")]
    Generator { message: String },
    #[display("the mesh generator dropped the request without answering")]
    Abandoned,
}

/// The packed buffer returned by a [`MeshGenerator`](crate::generator::MeshGenerator).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawPatch {
    words: Vec<u32>,
}

/// The borrowed contents of a validated [`RawPatch`].
#[derive(Clone, Copy, Debug)]
pub struct PatchBuffers<'a> {
    pub indices: &'a [u32],
    pub positions: &'a [[f32; 3]],
    pub colors: &'a [[f32; 3]],
}

impl RawPatch {
    pub fn from_words(words: Vec<u32>) -> Self {
        Self { words }
    }

    /// Copies a native endian byte buffer, as handed out by a foreign generator.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PatchError> {
        if bytes.len() % 4 != 0 {
            return Err(PatchError::Unaligned {
                length: bytes.len(),
            });
        }

        Ok(Self {
            words: bytemuck::pod_collect_to_vec(bytes),
        })
    }

    /// Packs the geometry into the layout generators are expected to produce.
    pub fn pack(indices: &[u32], positions: &[[f32; 3]], colors: &[[f32; 3]]) -> Self {
        let mut words =
            Vec::with_capacity(HEADER_SIZE + indices.len() + 3 * (positions.len() + colors.len()));

        words.push(positions.len() as u32);
        words.push(indices.len() as u32);
        words.extend_from_slice(indices);
        words.extend_from_slice(cast_slice(positions));
        words.extend_from_slice(cast_slice(colors));

        Self { words }
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Validates the header against the payload and splits the buffer.
    pub fn decode(&self) -> Result<PatchBuffers<'_>, PatchError> {
        let words = self.words.as_slice();

        if words.len() < HEADER_SIZE {
            return Err(PatchError::MissingHeader);
        }

        let count = |word: u32| {
            let count = word as i32;
            usize::try_from(count).map_err(|_| PatchError::NegativeCount { count })
        };

        let vertex_count = count(words[0])?;
        let index_count = count(words[1])?;

        let required = vertex_count
            .checked_mul(6)
            .and_then(|vertex_words| vertex_words.checked_add(HEADER_SIZE + index_count))
            .unwrap_or(usize::MAX);

        if words.len() < required {
            return Err(PatchError::Truncated {
                required,
                available: words.len(),
            });
        }

        if index_count % 3 != 0 {
            return Err(PatchError::IncompleteTriangle { count: index_count });
        }

        let (indices, payload) = words[HEADER_SIZE..].split_at(index_count);
        let (positions, payload) = payload.split_at(3 * vertex_count);
        let colors = &payload[..3 * vertex_count];

        if let Some(&index) = indices.iter().find(|&&index| index as usize >= vertex_count) {
            return Err(PatchError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }

        Ok(PatchBuffers {
            indices,
            positions: cast_slice(positions),
            colors: cast_slice(colors),
        })
    }
}

/// Identifies a patch towards the [`LandscapeScene`](crate::scene::LandscapeScene).
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct PatchId(pub(crate) u64);

/// The render ready geometry of a single quadtree node.
#[derive(Clone, Debug)]
pub struct MeshPatch {
    id: PatchId,
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    colors: Vec<[f32; 3]>,
    indices: Vec<u32>,
}

impl MeshPatch {
    /// Builds the patch for the `request` from the generated buffer.
    ///
    /// Normals are computed before the skirt is folded down, so the border keeps
    /// the shading of the surface it continues.
    pub fn build(id: PatchId, raw: &RawPatch, request: &PatchRequest) -> Result<Self, PatchError> {
        let buffers = raw.decode()?;

        let vertices_per_row = request.resolution as usize + 3;
        let expected = vertices_per_row * vertices_per_row;

        if buffers.positions.len() != expected {
            return Err(PatchError::GridMismatch {
                expected,
                actual: buffers.positions.len(),
            });
        }

        let mut positions = buffers.positions.to_vec();
        let normals = smooth_normals(&positions, buffers.indices);

        stitch_seams(&mut positions, vertices_per_row, request.cell_size());

        Ok(Self {
            id,
            positions,
            normals,
            colors: buffers.colors.to_vec(),
            indices: buffers.indices.to_vec(),
        })
    }

    pub fn id(&self) -> PatchId {
        self.id
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    pub fn colors(&self) -> &[[f32; 3]] {
        &self.colors
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Converts the patch into a Bevy mesh with vertex colors.
    pub fn to_mesh(&self) -> Mesh {
        let colors = self
            .colors
            .iter()
            .map(|&[r, g, b]| [r, g, b, 1.0])
            .collect::<Vec<_>>();

        Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::RENDER_WORLD,
        )
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, self.positions.clone())
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, self.normals.clone())
        .with_inserted_attribute(Mesh::ATTRIBUTE_COLOR, colors)
        .with_inserted_indices(Indices::U32(self.indices.clone()))
    }
}

/// Area weighted vertex normals of an indexed triangle list.
pub fn smooth_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![Vec3::ZERO; positions.len()];

    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|index| index as usize);
        let [pa, pb, pc] = [a, b, c].map(|index| Vec3::from(positions[index]));

        let normal = (pb - pa).cross(pc - pa);

        normals[a] += normal;
        normals[b] += normal;
        normals[c] += normal;
    }

    normals
        .into_iter()
        .map(|normal| normal.normalize_or_zero().to_array())
        .collect()
}

/// Moves the outer ring of a `vertices_per_row`² grid one cell inwards and one cell down.
///
/// Rows run along +y and columns along +x. The first row (lowest y) is called the
/// north edge and the first column (lowest x) the west edge. Corner vertices belong
/// to two edges and are moved by both.
pub fn stitch_seams(positions: &mut [[f32; 3]], vertices_per_row: usize, cell_size: f32) {
    let last = vertices_per_row - 1;

    for index in 0..vertices_per_row {
        let north = &mut positions[index];
        north[1] += cell_size;
        north[2] -= cell_size;

        let south = &mut positions[last * vertices_per_row + index];
        south[1] -= cell_size;
        south[2] -= cell_size;

        let west = &mut positions[index * vertices_per_row];
        west[0] += cell_size;
        west[2] -= cell_size;

        let east = &mut positions[index * vertices_per_row + last];
        east[0] -= cell_size;
        east[2] -= cell_size;
    }
}

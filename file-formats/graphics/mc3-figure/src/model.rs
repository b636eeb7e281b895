//! Decoded MBAC mesh data.
//!
//! A [`Model`] is immutable after decode and may be shared between any
//! number of figures; posed (animated) buffers live on the figure, not here.

use bitflags::bitflags;

use crate::math::Mat3x4;

/// Hard bounds declared by the format. Exceeding any of these fails the
/// decode before buffers are allocated.
pub const MAX_VERTICES: u32 = 21845;
pub const MAX_TEXTURE_UNITS: u32 = 16;
pub const MAX_PATTERNS: u32 = 33;
pub const MAX_PALETTE_COLORS: u32 = 256;

bitflags! {
    /// Per-polygon material attribute bits, shared by colored and textured
    /// polygons. The two blend-mode bits of the raw material word are not
    /// flags; see [`BlendMode`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
    pub struct MaterialFlags: u16 {
        const TRANSPARENT = 0x01;
        const DOUBLE_FACE = 0x10;
        const LIGHTING = 0x20;
        const SPECULAR = 0x40;
    }
}

/// Blend mode extracted from bits 1-2 of the material word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum BlendMode {
    Normal,
    Half,
    Add,
    Sub,
}

impl BlendMode {
    pub(crate) fn from_material(material: u16) -> Self {
        match material & 0x06 {
            0x00 => Self::Normal,
            0x02 => Self::Half,
            0x04 => Self::Add,
            _ => Self::Sub,
        }
    }
}

/// Number of attribute bytes stored per emitted vertex index.
pub const ATTRS_PER_VERTEX: usize = 5;

/// One decoded polygon. Quads are stored pre-split into two triangles
/// sharing the diagonal (`a,b,c` and `c,b,d`), so `indices` holds either 3
/// or 6 entries.
///
/// `attrs` carries one quintuple per index entry: `r,g,b,light,specular`
/// for colored polygons, `u,v,light,specular,transparent` for textured
/// ones.
#[derive(Debug, Clone)]
pub struct Polygon {
    pub indices: Vec<u16>,
    pub attrs: Vec<u8>,
    pub flags: MaterialFlags,
    pub blend: BlendMode,
    /// Pattern bits this polygon requires; it is drawn under an active
    /// pattern `p` iff `pattern & p == pattern`.
    pub pattern: u32,
    /// Texture unit for textured polygons.
    pub texture: Option<u16>,
}

impl Polygon {
    pub(crate) fn new(material: u16, indices: Vec<u16>, attrs: Vec<u8>) -> Self {
        Self {
            indices,
            attrs,
            flags: MaterialFlags::from_bits_truncate(material),
            blend: BlendMode::from_material(material),
            pattern: 0,
            texture: None,
        }
    }
}

/// One bone of the skeleton: a contiguous run of owned vertices, a parent
/// link, and the bind-pose local matrix.
#[derive(Debug, Clone)]
pub struct ModelBone {
    /// Number of vertices this bone owns. Ownership partitions the vertex
    /// buffer into contiguous runs in bone declaration order.
    pub vertex_count: usize,
    /// Parent bone index; -1 for a root. Always earlier-declared.
    pub parent: i32,
    /// Bind-pose local transform in Q12.
    pub matrix: Mat3x4,
}

/// An immutable decoded MBAC mesh.
#[derive(Debug, Clone)]
pub struct Model {
    /// Declared vertex count (each vertex is 3 consecutive `i16`s).
    pub vertex_count: usize,
    /// Bind-pose vertex coordinates, `vertex_count * 3` entries.
    pub bind_vertices: Vec<i16>,
    /// Bind-pose normals, `vertex_count * 3` signed components with unit
    /// length 64; absent when the file carries no normal section.
    pub bind_normals: Option<Vec<i8>>,
    /// Flat-colored polygons, triangles first, then quads.
    pub polygons_c: Vec<Polygon>,
    /// Textured polygons, triangles first, then quads.
    pub polygons_t: Vec<Polygon>,
    /// Skeleton in declaration order; parents precede children.
    pub bones: Vec<ModelBone>,
    pub num_patterns: u16,
    pub num_textures: u16,
}

impl Model {
    /// Length of the draw-index buffer: the total index entries over all
    /// polygons, stable across pattern changes.
    pub fn index_count(&self) -> usize {
        self.polygons_c
            .iter()
            .chain(self.polygons_t.iter())
            .map(|p| p.indices.len())
            .sum()
    }

    pub fn has_normals(&self) -> bool {
        self.bind_normals.is_some()
    }
}

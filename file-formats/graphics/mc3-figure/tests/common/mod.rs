//! Shared helpers for building synthetic MBAC/MTRA buffers.
#![allow(dead_code)] // not every test target uses every builder

/// Little-endian byte writer with an LSB-first bit packer, mirroring the
/// layout the decoders consume.
#[derive(Default)]
pub struct ByteWriter {
    bytes: Vec<u8>,
    cache: u32,
    cached: u32,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.bytes.push(value);
        self
    }

    pub fn u16(&mut self, value: u16) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn i16(&mut self, value: i16) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn i32(&mut self, value: i32) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Append `width` bits of `value`, LSB-first.
    pub fn bits(&mut self, value: i32, width: u32) -> &mut Self {
        let mask = if width == 32 { u32::MAX } else { !(u32::MAX << width) };
        self.cache |= ((value as u32) & mask) << self.cached;
        self.cached += width;
        while self.cached >= 8 {
            self.bytes.push((self.cache & 0xFF) as u8);
            self.cache >>= 8;
            self.cached -= 8;
        }
        self
    }

    /// Pad the current partial byte with zeros, ending a packed section.
    pub fn flush_bits(&mut self) -> &mut Self {
        if self.cached > 0 {
            self.bytes.push((self.cache & 0xFF) as u8);
        }
        self.cache = 0;
        self.cached = 0;
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

fn identity_matrix(w: &mut ByteWriter) {
    for value in [4096, 0, 0, 0, 0, 4096, 0, 0, 0, 0, 4096, 0] {
        w.i16(value);
    }
}

/// A version-4 MBAC with 3 vertices, one textured triangle, and a single
/// root bone with an identity bind matrix. `bone_vertex_count` lets tests
/// violate the vertex-ownership invariant.
pub fn simple_mbac(bone_vertex_count: u16) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.u8(b'M').u8(b'B').u8(4).u8(0);
    w.u8(1).u8(0).u8(1).u8(1); // vertex/normal/polygon/bone sub-formats
    w.u16(3).u16(1).u16(0).u16(1); // vertices, tex tris, tex quads, bones

    // bind vertices
    for (x, y, z) in [(0, 0, 0), (100, 0, 0), (0, 100, 0)] {
        w.i16(x).i16(y).i16(z);
    }

    // one textured triangle, sub-format 1
    w.u16(0); // material
    w.u16(0).u16(1).u16(2); // vertex indices
    for uv in [0u8, 0, 127, 0, 0, 127] {
        w.u8(uv);
    }

    // bone table
    w.u16(bone_vertex_count).i16(-1);
    identity_matrix(&mut w);
    w.into_bytes()
}

/// A version-4 MBAC exercising the packed vertex (sub-format 2) and packed
/// normal (sub-format 2) sections: 2 vertices, no polygons, one root bone.
pub fn packed_mbac() -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.u8(b'M').u8(b'B').u8(4).u8(0);
    w.u8(2).u8(2).u8(1).u8(1);
    w.u16(2).u16(0).u16(0).u16(1);

    // one run of 2 vertices at 8 bits per component
    w.bits(0b00_000001, 8);
    for component in [1, -2, 3, -4, 5, -6] {
        w.bits(component, 8);
    }
    w.flush_bits();

    // normal 0: explicit x/y with reconstructed z; normal 1: pool entry 2
    w.bits(10, 7).bits(-5, 7).bits(0, 1);
    w.bits(64, 7).bits(2, 3);
    w.flush_bits();

    w.u16(2).i16(-1);
    identity_matrix(&mut w);
    w.into_bytes()
}

/// A version-5 MBAC with two colored triangles split across two patterns:
/// triangle 0 belongs to pattern 0 (always visible), triangle 1 requires
/// pattern bit 2.
pub fn patterned_mbac() -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.u8(b'M').u8(b'B').u8(5).u8(0);
    w.u8(1).u8(0).u8(3).u8(1);
    w.u16(4).u16(0).u16(0).u16(1); // vertices, tex tris, tex quads, bones
    w.u16(2).u16(0); // colored tris, colored quads
    w.u16(1).u16(2).u16(2); // texture units, patterns, palette colors

    // pattern table: {colored tris, colored quads} then one texture unit
    w.u16(1).u16(0).u16(0).u16(0); // pattern 0
    w.u16(1).u16(0).u16(0).u16(0); // pattern 1

    for (x, y, z) in [(0, 0, 0), (10, 0, 0), (0, 10, 0), (10, 10, 0)] {
        w.i16(x).i16(y).i16(z);
    }

    // colored section: width bytes, palette, triangles
    w.u8(8).u8(8).u8(8).u8(8).u8(0);
    for component in [255, 0, 0, 0, 255, 0] {
        w.bits(component, 8);
    }
    // material 0x10 becomes 0x20 (lighting) after the decoder's shift
    w.bits(0x10, 8).bits(0, 8).bits(1, 8).bits(2, 8).bits(0, 8);
    w.bits(0x10, 8).bits(1, 8).bits(2, 8).bits(3, 8).bits(1, 8);
    w.flush_bits();

    w.u16(4).i16(-1);
    identity_matrix(&mut w);
    w.into_bytes()
}

fn mtra_header(w: &mut ByteWriter, version: u8, num_actions: u16, num_bones: u16) {
    w.u8(b'M').u8(b'T').u8(version).u8(0);
    w.u16(num_actions).u16(num_bones);
    for _ in 0..8 {
        w.u16(0); // per-motion-type bone counts (advisory)
    }
    w.i32(0); // declared data size (advisory)
}

/// A version-4 MTRA with one action: a single fully-keyed bone whose
/// translate curve runs from (0,0,0) at frame 0 to (100,0,0) at frame 4096
/// with constant scale/rotate/roll.
pub fn translate_mtra() -> Vec<u8> {
    let mut w = ByteWriter::new();
    mtra_header(&mut w, 4, 1, 1);

    w.u16(2); // frame count
    w.u8(2); // motion type: fully keyed
    // translate
    w.u16(2);
    w.u16(0).i16(0).i16(0).i16(0);
    w.u16(4096).i16(100).i16(0).i16(0);
    // scale
    w.u16(1);
    w.u16(0).i16(4096).i16(4096).i16(4096);
    // rotate
    w.u16(1);
    w.u16(0).i16(0).i16(0).i16(0);
    // roll
    w.u16(1);
    w.u16(0).i16(0);
    w.into_bytes()
}

/// A version-5 MTRA with one identity-bone action whose sparse pattern
/// table switches from mask 0 at frame 0 to mask 2 at frame 2.
pub fn pattern_mtra() -> Vec<u8> {
    let mut w = ByteWriter::new();
    mtra_header(&mut w, 5, 1, 1);

    w.u16(4); // frame count
    w.u8(1); // motion type: identity
    w.u16(2); // pattern key count
    w.u16(0).i32(0);
    w.u16(2).i32(2);
    w.into_bytes()
}

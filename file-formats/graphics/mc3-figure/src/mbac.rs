//! MBAC static-model decoder.
//!
//! MBAC carries the bind-pose mesh: vertices, optional normals, colored and
//! textured polygons, the bone hierarchy, and (version 5) a pattern table
//! mapping visibility patterns to polygon ranges. All multi-byte fields are
//! little-endian; several sections are LSB-first bit-packed with their own
//! alignment. Decoding either yields a complete [`Model`] or fails - no
//! partially decoded model is ever returned.

use log::warn;

use crate::error::{Mc3Error, Result};
use crate::math::Mat3x4;
use crate::model::{
    MAX_PALETTE_COLORS, MAX_PATTERNS, MAX_TEXTURE_UNITS, MAX_VERTICES, Model, ModelBone, Polygon,
};
use crate::reader::{BitReader, MAX_BIT_WIDTH};

/// Magic bytes of a static model file.
pub const MBAC_MAGIC: [u8; 2] = *b"MB";

/// Component widths selectable by a packed vertex run header.
const RUN_WIDTHS: [u32; 4] = [8, 10, 13, 16];

/// Axis-aligned unit normals addressed by the packed-normal pool scheme:
/// index k yields (z, y, x) = (POOL[k], POOL[k+1], POOL[k+2]).
const NORMAL_POOL: [i8; 8] = [0, 0, 64, 0, 0, -64, 0, 0];

struct SectionFormats {
    vertex: u8,
    normal: u8,
    polygon: u8,
}

/// Decode a complete MBAC buffer into an immutable [`Model`].
pub fn decode_model(bytes: &[u8]) -> Result<Model> {
    let mut r = BitReader::new(bytes);

    let magic = [r.read_u8()?, r.read_u8()?];
    if magic != MBAC_MAGIC {
        return Err(Mc3Error::InvalidMagic {
            expected: "MB",
            actual: String::from_utf8_lossy(&magic).into_owned(),
        });
    }
    let version = r.read_u8()?;
    if !(2..=5).contains(&version) {
        return Err(Mc3Error::UnsupportedVersion(version));
    }
    let reserved = r.read_u8()?;
    if reserved != 0 {
        return Err(Mc3Error::Format(format!(
            "nonzero reserved header byte: {reserved}"
        )));
    }

    let formats = if version >= 4 {
        let vertex = r.read_u8()?;
        let normal = r.read_u8()?;
        let polygon = r.read_u8()?;
        let bone = r.read_u8()?;
        if bone != 1 {
            return Err(Mc3Error::UnsupportedSubFormat {
                kind: "bone",
                value: bone,
            });
        }
        SectionFormats {
            vertex,
            normal,
            polygon,
        }
    } else {
        SectionFormats {
            vertex: 1,
            normal: 0,
            polygon: 1,
        }
    };

    let num_vertices = u32::from(r.read_u16()?);
    let num_poly_t3 = usize::from(r.read_u16()?);
    let num_poly_t4 = usize::from(r.read_u16()?);
    let num_bones = usize::from(r.read_u16()?);

    let mut num_poly_c3 = 0usize;
    let mut num_poly_c4 = 0usize;
    let mut num_textures = 1u32;
    let mut num_patterns = 1u32;
    let mut num_colors = 0u32;
    if formats.polygon >= 3 {
        num_poly_c3 = usize::from(r.read_u16()?);
        num_poly_c4 = usize::from(r.read_u16()?);
        num_textures = u32::from(r.read_u16()?);
        num_patterns = u32::from(r.read_u16()?);
        num_colors = u32::from(r.read_u16()?);
    }

    if num_vertices > MAX_VERTICES
        || num_textures > MAX_TEXTURE_UNITS
        || num_patterns > MAX_PATTERNS
        || num_colors > MAX_PALETTE_COLORS
    {
        return Err(Mc3Error::Range(format!(
            "header counts exceed format bounds: vertices={num_vertices} textures={num_textures} \
             patterns={num_patterns} colors={num_colors}"
        )));
    }
    let num_vertices = num_vertices as usize;

    // Per pattern: entry 0 is {colored triangles, colored quads}, entries
    // 1..=num_textures are {textured triangles, textured quads} per unit.
    let mut pattern_table = vec![vec![[0u16; 2]; num_textures as usize + 1]; num_patterns as usize];
    if version == 5 {
        for pattern in &mut pattern_table {
            for entry in pattern.iter_mut() {
                entry[0] = r.read_u16()?;
                entry[1] = r.read_u16()?;
            }
        }
    } else if let Some(first) = pattern_table.first_mut() {
        // a single implicit pattern covering every polygon on texture unit 0
        first[0] = [num_poly_c3 as u16, num_poly_c4 as u16];
        if let Some(textured) = first.get_mut(1) {
            *textured = [num_poly_t3 as u16, num_poly_t4 as u16];
        }
    }

    let mut bind_vertices = Vec::with_capacity(num_vertices * 3);
    match formats.vertex {
        1 => {
            for _ in 0..num_vertices * 3 {
                bind_vertices.push(r.read_i16()?);
            }
        }
        2 => read_packed_vertices(&mut r, &mut bind_vertices, num_vertices)?,
        other => {
            return Err(Mc3Error::UnsupportedSubFormat {
                kind: "vertex",
                value: other,
            });
        }
    }
    r.clear_bit_cache();

    let bind_normals = match formats.normal {
        0 => None,
        1 => {
            let mut normals = Vec::with_capacity(num_vertices * 3);
            for _ in 0..num_vertices * 3 {
                // stored as +-4096, quantized to the +-64 unit sphere
                normals.push((r.read_i16()? >> 6) as i8);
            }
            Some(normals)
        }
        2 => Some(read_packed_normals(&mut r, num_vertices)?),
        other => {
            return Err(Mc3Error::UnsupportedSubFormat {
                kind: "normal",
                value: other,
            });
        }
    };
    r.clear_bit_cache();

    let mut polygons_c = Vec::with_capacity(num_poly_c3 + num_poly_c4);
    if num_poly_c3 + num_poly_c4 > 0 {
        read_colored_polygons(
            &mut r,
            &mut polygons_c,
            num_poly_c3,
            num_poly_c4,
            num_vertices,
            num_colors as usize,
        )?;
    }

    let mut polygons_t = Vec::with_capacity(num_poly_t3 + num_poly_t4);
    if num_poly_t3 + num_poly_t4 > 0 {
        match formats.polygon {
            1 => read_textured_v1(&mut r, &mut polygons_t, num_poly_t3, num_poly_t4, num_vertices)?,
            2 => read_textured_v2(&mut r, &mut polygons_t, num_poly_t3, num_poly_t4, num_vertices)?,
            3 => read_textured_v3(&mut r, &mut polygons_t, num_poly_t3, num_poly_t4, num_vertices)?,
            other => {
                return Err(Mc3Error::UnsupportedSubFormat {
                    kind: "polygon",
                    value: other,
                });
            }
        }
    }
    r.clear_bit_cache();

    assign_patterns(
        &mut polygons_c,
        &mut polygons_t,
        &pattern_table,
        num_poly_c3,
        num_poly_t3,
    )?;

    let bones = read_bones(&mut r, num_bones, num_vertices)?;

    let mut trailing = r.remaining() as i64;
    if version >= 4 {
        trailing -= 20;
    }
    if trailing > 0 {
        warn!("MBAC: {trailing} uninterpreted byte(s) after decode (version {version})");
    }

    Ok(Model {
        vertex_count: num_vertices,
        bind_vertices,
        bind_normals,
        polygons_c,
        polygons_t,
        bones,
        num_patterns: num_patterns as u16,
        num_textures: num_textures as u16,
    })
}

/// Run-length vertex section: each header byte selects a component width
/// from {8, 10, 13, 16} (top 2 bits) and a run of 1-64 vertices (low 6
/// bits + 1), every component sign-extended from the selected width.
fn read_packed_vertices(r: &mut BitReader, out: &mut Vec<i16>, total: usize) -> Result<()> {
    while out.len() < total * 3 {
        let header = r.read_ubits(8)?;
        let width = RUN_WIDTHS[(header >> 6) as usize];
        let count = (header & 0x3F) as usize + 1;
        let left = total - out.len() / 3;
        if count > left {
            return Err(Mc3Error::Range(format!(
                "vertex run of {count} exceeds the {left} vertices left in the buffer"
            )));
        }
        for _ in 0..count * 3 {
            out.push(r.read_bits(width)? as i16);
        }
    }
    Ok(())
}

/// Packed normal section: 7 bits of x; the sentinel x == 64 selects one of
/// six axis-aligned pool normals via 3 more bits, otherwise 7-bit y follows
/// and z is reconstructed as sqrt(4096 - x^2 - y^2) with a trailing sign
/// bit.
fn read_packed_normals(r: &mut BitReader, total: usize) -> Result<Vec<i8>> {
    let mut normals = Vec::with_capacity(total * 3);
    for _ in 0..total {
        let raw_x = r.read_ubits(7)? as i32;
        let (x, y, z) = if raw_x == 64 {
            let pool = r.read_ubits(3)? as usize;
            if pool > 5 {
                return Err(Mc3Error::Format(format!(
                    "invalid packed-normal pool index: {pool}"
                )));
            }
            (
                i32::from(NORMAL_POOL[pool + 2]),
                i32::from(NORMAL_POOL[pool + 1]),
                i32::from(NORMAL_POOL[pool]),
            )
        } else {
            let x = (raw_x << 25) >> 25;
            let y = ((r.read_ubits(7)? as i32) << 25) >> 25;
            let negate = r.read_ubits(1)? == 1;
            let dq = 4096 - x * x - y * y;
            let magnitude = if dq > 0 { (f64::from(dq)).sqrt() as i32 } else { 0 };
            (x, y, if negate { -magnitude } else { magnitude })
        };
        normals.push(x as i8);
        normals.push(y as i8);
        normals.push(z as i8);
    }
    Ok(normals)
}

/// Read a field-width byte and keep it inside what the bit reader accepts.
fn field_width(r: &mut BitReader, what: &'static str, packed: bool) -> Result<u32> {
    let width = if packed {
        r.read_ubits(8)?
    } else {
        u32::from(r.read_u8()?)
    };
    if width > MAX_BIT_WIDTH {
        return Err(Mc3Error::Range(format!(
            "{what} bit width {width} exceeds {MAX_BIT_WIDTH}"
        )));
    }
    Ok(width)
}

fn read_vertex_index(r: &mut BitReader, width: u32, num_vertices: usize) -> Result<u16> {
    let index = r.read_ubits(width)? as usize;
    if index >= num_vertices {
        return Err(Mc3Error::Range(format!(
            "vertex index {index} out of range (vertex count {num_vertices})"
        )));
    }
    Ok(index as u16)
}

fn check_vertex_index(index: u16, num_vertices: usize) -> Result<u16> {
    if usize::from(index) >= num_vertices {
        return Err(Mc3Error::Range(format!(
            "vertex index {index} out of range (vertex count {num_vertices})"
        )));
    }
    Ok(index)
}

fn read_colored_polygons(
    r: &mut BitReader,
    out: &mut Vec<Polygon>,
    triangles: usize,
    quads: usize,
    num_vertices: usize,
    num_colors: usize,
) -> Result<()> {
    let material_bits = field_width(r, "colored material", false)?;
    let index_bits = field_width(r, "colored vertex index", false)?;
    let color_bits = field_width(r, "palette color", false)?;
    let color_id_bits = field_width(r, "color id", false)?;
    let reserved = r.read_u8()?;
    if reserved != 0 {
        warn!("colored polygon section: nonzero reserved byte {reserved}");
    }

    let mut palette = vec![0u8; num_colors * 3];
    for component in &mut palette {
        *component = r.read_ubits(color_bits)? as u8;
    }

    for i in 0..triangles + quads {
        let quad = i >= triangles;
        let material = r.read_ubits(material_bits)? << 1;
        if material & 0xFC09 != 0 {
            return Err(Mc3Error::Range(format!(
                "unexpected colored material word: {material:#06x}"
            )));
        }
        let corners = if quad { 4 } else { 3 };
        let mut quad_indices = [0u16; 4];
        for corner in quad_indices.iter_mut().take(corners) {
            *corner = read_vertex_index(r, index_bits, num_vertices)?;
        }
        let color_id = r.read_ubits(color_id_bits)? as usize * 3;
        let rgb = palette.get(color_id..color_id + 3).ok_or_else(|| {
            Mc3Error::Range(format!(
                "color id {} out of range (palette of {num_colors})",
                color_id / 3
            ))
        })?;
        let light = ((material >> 5) & 1) as u8;
        let specular = ((material >> 6) & 1) as u8;
        let corner_attrs = [rgb[0], rgb[1], rgb[2], light, specular];

        let [a, b, c, d] = quad_indices;
        let indices = if quad {
            vec![a, b, c, c, b, d]
        } else {
            vec![a, b, c]
        };
        let attrs = corner_attrs.repeat(indices.len());
        out.push(Polygon::new(material as u16, indices, attrs));
    }
    Ok(())
}

/// Textured polygons, sub-format 1: fixed 16-bit fields, one unsigned byte
/// per UV component, and a material word whose blend/double-face bits live
/// in a legacy layout that is remapped to the common one.
fn read_textured_v1(
    r: &mut BitReader,
    out: &mut Vec<Polygon>,
    triangles: usize,
    quads: usize,
    num_vertices: usize,
) -> Result<()> {
    for i in 0..triangles + quads {
        let quad = i >= triangles;
        let material = r.read_u16()?;
        let bad = if quad {
            material & 0xFFF8 != 0 || material & 1 == 0
        } else {
            material & 0xFFF9 != 0
        };
        if bad {
            return Err(Mc3Error::Range(format!(
                "unexpected textured material word: {material:#06x}"
            )));
        }
        let corners = if quad { 4 } else { 3 };
        let mut quad_indices = [0u16; 4];
        for corner in quad_indices.iter_mut().take(corners) {
            *corner = check_vertex_index(r.read_u16()?, num_vertices)?;
        }
        let mat = (material & 4) << 2 | (material & 2) >> 1;
        let transparent = (mat & 1) as u8;
        let mut uv = [[0u8; 2]; 4];
        for corner in uv.iter_mut().take(corners) {
            corner[0] = r.read_u8()?;
            corner[1] = r.read_u8()?;
        }
        out.push(assemble_textured(
            mat,
            &quad_indices,
            &uv,
            quad,
            1,
            0,
            transparent,
        ));
    }
    Ok(())
}

/// Textured polygons, sub-format 2: explicit material/vertex-index bit
/// widths, 7-bit UV components.
fn read_textured_v2(
    r: &mut BitReader,
    out: &mut Vec<Polygon>,
    triangles: usize,
    quads: usize,
    num_vertices: usize,
) -> Result<()> {
    let material_bits = field_width(r, "textured material", false)?;
    let index_bits = field_width(r, "textured vertex index", false)?;
    read_textured_packed(
        r,
        out,
        triangles,
        quads,
        num_vertices,
        material_bits,
        index_bits,
        7,
        0xFF88,
    )
}

/// Textured polygons, sub-format 3: like sub-format 2 with an explicit UV
/// bit width and a reserved byte, all read through the bit stream.
fn read_textured_v3(
    r: &mut BitReader,
    out: &mut Vec<Polygon>,
    triangles: usize,
    quads: usize,
    num_vertices: usize,
) -> Result<()> {
    let material_bits = field_width(r, "textured material", true)?;
    let index_bits = field_width(r, "textured vertex index", true)?;
    let uv_bits = field_width(r, "texture coordinate", true)?;
    let reserved = r.read_ubits(8)?;
    if reserved != 0 {
        warn!("textured polygon section: nonzero reserved byte {reserved}");
    }
    read_textured_packed(
        r,
        out,
        triangles,
        quads,
        num_vertices,
        material_bits,
        index_bits,
        uv_bits,
        0xFC08,
    )
}

#[allow(clippy::too_many_arguments)]
fn read_textured_packed(
    r: &mut BitReader,
    out: &mut Vec<Polygon>,
    triangles: usize,
    quads: usize,
    num_vertices: usize,
    material_bits: u32,
    index_bits: u32,
    uv_bits: u32,
    reserved_mask: u32,
) -> Result<()> {
    for i in 0..triangles + quads {
        let quad = i >= triangles;
        let material = r.read_ubits(material_bits)?;
        if material & reserved_mask != 0 {
            return Err(Mc3Error::Range(format!(
                "unexpected textured material word: {material:#06x}"
            )));
        }
        let corners = if quad { 4 } else { 3 };
        let mut quad_indices = [0u16; 4];
        for corner in quad_indices.iter_mut().take(corners) {
            *corner = read_vertex_index(r, index_bits, num_vertices)?;
        }
        let transparent = (material & 1) as u8;
        let light = ((material >> 5) & 1) as u8;
        let specular = ((material >> 6) & 1) as u8;
        let mut uv = [[0u8; 2]; 4];
        for corner in uv.iter_mut().take(corners) {
            corner[0] = r.read_ubits(uv_bits)? as u8;
            corner[1] = r.read_ubits(uv_bits)? as u8;
        }
        out.push(assemble_textured(
            material as u16,
            &quad_indices,
            &uv,
            quad,
            light,
            specular,
            transparent,
        ));
    }
    Ok(())
}

fn assemble_textured(
    material: u16,
    quad_indices: &[u16; 4],
    uv: &[[u8; 2]; 4],
    quad: bool,
    light: u8,
    specular: u8,
    transparent: u8,
) -> Polygon {
    let [a, b, c, d] = *quad_indices;
    // quads split into two triangles sharing the b-c diagonal
    let corner_order: &[usize] = if quad { &[0, 1, 2, 2, 1, 3] } else { &[0, 1, 2] };
    let indices: Vec<u16> = corner_order
        .iter()
        .map(|&k| [a, b, c, d][k])
        .collect();
    let mut attrs = Vec::with_capacity(indices.len() * 5);
    for &k in corner_order {
        attrs.extend_from_slice(&[uv[k][0], uv[k][1], light, specular, transparent]);
    }
    Polygon::new(material, indices, attrs)
}

/// Tag every polygon with its owning pattern bitmask (and, for textured
/// polygons, the texture unit) by walking the pattern table in declaration
/// order and consuming the per-pattern polygon counts.
fn assign_patterns(
    polygons_c: &mut [Polygon],
    polygons_t: &mut [Polygon],
    pattern_table: &[Vec<[u16; 2]>],
    num_poly_c3: usize,
    num_poly_t3: usize,
) -> Result<()> {
    let mut c3_cursor = 0usize;
    let mut c4_cursor = num_poly_c3;
    let mut t3_cursor = 0usize;
    let mut t4_cursor = num_poly_t3;

    let overrun = || Mc3Error::Range("pattern table covers more polygons than declared".into());

    for (i, pattern) in pattern_table.iter().enumerate() {
        let bit = if i == 0 { 0 } else { 1u32.wrapping_shl(i as u32) };
        let [tri, quad] = pattern[0];
        for _ in 0..tri {
            polygons_c.get_mut(c3_cursor).ok_or_else(overrun)?.pattern = bit;
            c3_cursor += 1;
        }
        for _ in 0..quad {
            polygons_c.get_mut(c4_cursor).ok_or_else(overrun)?.pattern = bit;
            c4_cursor += 1;
        }
        for (unit, entry) in pattern[1..].iter().enumerate() {
            for _ in 0..entry[0] {
                let polygon = polygons_t.get_mut(t3_cursor).ok_or_else(overrun)?;
                polygon.pattern = bit;
                polygon.texture = Some(unit as u16);
                t3_cursor += 1;
            }
            for _ in 0..entry[1] {
                let polygon = polygons_t.get_mut(t4_cursor).ok_or_else(overrun)?;
                polygon.pattern = bit;
                polygon.texture = Some(unit as u16);
                t4_cursor += 1;
            }
        }
    }
    Ok(())
}

fn read_bones(r: &mut BitReader, num_bones: usize, num_vertices: usize) -> Result<Vec<ModelBone>> {
    let mut bones = Vec::with_capacity(num_bones);
    let mut owned_total = 0usize;
    for i in 0..num_bones {
        let vertex_count = usize::from(r.read_u16()?);
        let parent = i32::from(r.read_i16()?);
        if parent < -1 {
            return Err(Mc3Error::Format(format!("negative bone parent: {parent}")));
        }
        if parent >= i as i32 {
            return Err(Mc3Error::Format(format!(
                "bone {i} references parent {parent}, which is not declared earlier"
            )));
        }
        let mut matrix = [0i32; 12];
        for value in &mut matrix {
            *value = i32::from(r.read_i16()?);
        }
        owned_total += vertex_count;
        bones.push(ModelBone {
            vertex_count,
            parent,
            matrix: Mat3x4(matrix),
        });
    }
    if owned_total != num_vertices {
        return Err(Mc3Error::Format(format!(
            "bones own {owned_total} vertices, but the model declares {num_vertices}"
        )));
    }
    Ok(bones)
}

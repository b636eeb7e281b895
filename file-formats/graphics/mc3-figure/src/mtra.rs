//! MTRA action-table decoder.
//!
//! MTRA carries the keyframed motions for a skeleton: per action, one
//! motion record per bone, each selected by a type byte that decides which
//! curves are present and whether they are keyed per frame or constant for
//! the whole action. Version 5 adds a sparse frame -> pattern table per
//! action for frame-driven polygon visibility.

use log::{debug, warn};

use crate::action::{Action, MotionChannel, ScalarTrack, Vec3Track};
use crate::error::{Mc3Error, Result};
use crate::math::Mat3x4;
use crate::reader::BitReader;

/// Magic bytes of an action-table file.
pub const MTRA_MAGIC: [u8; 2] = *b"MT";

/// Decode a complete MTRA buffer into its list of actions.
pub fn decode_actions(bytes: &[u8]) -> Result<Vec<Action>> {
    let mut r = BitReader::new(bytes);

    let magic = [r.read_u8()?, r.read_u8()?];
    if magic != MTRA_MAGIC {
        return Err(Mc3Error::InvalidMagic {
            expected: "MT",
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

    let num_actions = usize::from(r.read_u16()?);
    let num_bones = usize::from(r.read_u16()?);

    // bone counts by motion type; advisory only. The meaning of the eighth
    // entry is unknown and no file with a nonzero value has been seen.
    let mut type_counts = [0u16; 8];
    for count in &mut type_counts {
        *count = r.read_u16()?;
    }
    if type_counts[7] != 0 {
        warn!("MTRA: nonzero bone count {} for motion type 7", type_counts[7]);
    }
    let data_size = r.read_i32()?;
    debug!("MTRA: declared data size {data_size} byte(s)");

    let mut actions = Vec::with_capacity(num_actions);
    for _ in 0..num_actions {
        let frame_count = r.read_u16()?;
        let mut channels = Vec::with_capacity(num_bones);
        for _ in 0..num_bones {
            channels.push(read_motion_channel(&mut r)?);
        }
        let mut pattern_keys = Vec::new();
        if version >= 5 {
            let count = usize::from(r.read_u16()?);
            pattern_keys.reserve(count);
            for _ in 0..count {
                let frame = r.read_u16()?;
                let mask = r.read_i32()? as u32;
                pattern_keys.push((frame, mask));
            }
        }
        actions.push(Action {
            frame_count,
            channels,
            pattern_keys,
        });
    }

    let mut trailing = r.remaining() as i64;
    if version >= 4 {
        trailing -= 20;
    }
    if trailing > 0 {
        warn!("MTRA: {trailing} uninterpreted byte(s) after decode (version {version})");
    }

    Ok(actions)
}

fn read_motion_channel(r: &mut BitReader) -> Result<MotionChannel> {
    let motion_type = r.read_u8()?;
    match motion_type {
        0 => {
            let mut matrix = [0i32; 12];
            for value in &mut matrix {
                *value = i32::from(r.read_i16()?);
            }
            Ok(MotionChannel::Explicit(Mat3x4(matrix)))
        }
        1 => Ok(MotionChannel::Identity),
        2 => Ok(MotionChannel::Full {
            translate: read_vec3_track(r)?,
            scale: read_vec3_track(r)?,
            rotate: read_vec3_track(r)?,
            roll: read_scalar_track(r)?,
        }),
        3 => {
            let translate = [
                i32::from(r.read_i16()?),
                i32::from(r.read_i16()?),
                i32::from(r.read_i16()?),
            ];
            let rotate = read_vec3_track(r)?;
            let roll = i32::from(r.read_i16()?);
            Ok(MotionChannel::PivotRotate {
                translate,
                rotate,
                roll,
            })
        }
        4 => Ok(MotionChannel::RotateRoll {
            rotate: read_vec3_track(r)?,
            roll: read_scalar_track(r)?,
        }),
        5 => Ok(MotionChannel::Rotate(read_vec3_track(r)?)),
        6 => Ok(MotionChannel::TranslateRotateRoll {
            translate: read_vec3_track(r)?,
            rotate: read_vec3_track(r)?,
            roll: read_scalar_track(r)?,
        }),
        other => Err(Mc3Error::UnsupportedMotionType(other)),
    }
}

fn read_vec3_track(r: &mut BitReader) -> Result<Vec3Track> {
    let count = usize::from(r.read_u16()?);
    if count == 0 {
        return Err(Mc3Error::Format("keyed curve with no keyframes".into()));
    }
    let mut keys = Vec::with_capacity(count);
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        keys.push(i32::from(r.read_u16()?));
        values.push([
            i32::from(r.read_i16()?),
            i32::from(r.read_i16()?),
            i32::from(r.read_i16()?),
        ]);
    }
    Vec3Track::new(keys, values)
}

fn read_scalar_track(r: &mut BitReader) -> Result<ScalarTrack> {
    let count = usize::from(r.read_u16()?);
    if count == 0 {
        return Err(Mc3Error::Format("keyed curve with no keyframes".into()));
    }
    let mut keys = Vec::with_capacity(count);
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        keys.push(i32::from(r.read_u16()?));
        values.push(i32::from(r.read_i16()?));
    }
    ScalarTrack::new(keys, values)
}

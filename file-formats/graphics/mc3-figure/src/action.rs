//! Decoded MTRA action data: keyed curves, per-bone motion channels, and
//! the action table wrapper.
//!
//! Everything in this module is immutable after decode and shareable
//! between figures; per-figure evaluation state (the current frame, the
//! evaluated matrices) lives on [`crate::figure::Figure`].

use crate::error::{Mc3Error, Result};
use crate::math::Mat3x4;
use crate::mtra;

/// A 3-component piecewise-linear keyed curve.
///
/// Keys are integer frame indices in strictly increasing order. Sampling
/// clamps to the first sample before the first key and to the last sample
/// at or after the last key; between keys it interpolates with a Q12
/// fractional weight.
#[derive(Debug, Clone)]
pub struct Vec3Track {
    keys: Vec<i32>,
    values: Vec<[i32; 3]>,
}

impl Vec3Track {
    /// Build a track from parallel key/value arrays. At least one key is
    /// required and the arrays must be the same length.
    pub fn new(keys: Vec<i32>, values: Vec<[i32; 3]>) -> Result<Self> {
        if keys.is_empty() || keys.len() != values.len() {
            return Err(Mc3Error::InvalidArgument(format!(
                "track needs matching non-empty key/value arrays ({} keys, {} values)",
                keys.len(),
                values.len()
            )));
        }
        Ok(Self { keys, values })
    }

    /// A track holding a single constant sample.
    pub fn constant(value: [i32; 3]) -> Self {
        Self {
            keys: vec![0],
            values: vec![value],
        }
    }

    pub fn sample(&self, frame: i32) -> [i32; 3] {
        let last = self.keys.len() - 1;
        if frame >= self.keys[last] {
            return self.values[last];
        }
        for i in (0..last).rev() {
            let k0 = self.keys[i];
            if k0 > frame {
                continue;
            }
            if k0 == frame {
                return self.values[i];
            }
            let k1 = self.keys[i + 1];
            let delta = 4096 * (frame - k0) / (k1 - k0);
            let v0 = self.values[i];
            let v1 = self.values[i + 1];
            return [
                v0[0] + (((v1[0] - v0[0]) * delta) >> 12),
                v0[1] + (((v1[1] - v0[1]) * delta) >> 12),
                v0[2] + (((v1[2] - v0[2]) * delta) >> 12),
            ];
        }
        // before the first key: clamp to the first sample
        self.values[0]
    }
}

/// A scalar piecewise-linear keyed curve with the same sampling rules as
/// [`Vec3Track`].
#[derive(Debug, Clone)]
pub struct ScalarTrack {
    keys: Vec<i32>,
    values: Vec<i32>,
}

impl ScalarTrack {
    pub fn new(keys: Vec<i32>, values: Vec<i32>) -> Result<Self> {
        if keys.is_empty() || keys.len() != values.len() {
            return Err(Mc3Error::InvalidArgument(format!(
                "track needs matching non-empty key/value arrays ({} keys, {} values)",
                keys.len(),
                values.len()
            )));
        }
        Ok(Self { keys, values })
    }

    pub fn sample(&self, frame: i32) -> i32 {
        let last = self.keys.len() - 1;
        if frame >= self.keys[last] {
            return self.values[last];
        }
        for i in (0..last).rev() {
            let k0 = self.keys[i];
            if k0 > frame {
                continue;
            }
            if k0 == frame {
                return self.values[i];
            }
            let k1 = self.keys[i + 1];
            let delta = 4096 * (frame - k0) / (k1 - k0);
            return self.values[i] + (((self.values[i + 1] - self.values[i]) * delta) >> 12);
        }
        self.values[0]
    }
}

/// Per-bone pose generator: which curves exist and whether they are keyed
/// per frame or constant for the whole action. Each variant carries exactly
/// the curves its motion type defines.
#[derive(Debug, Clone)]
pub enum MotionChannel {
    /// A constant explicit local matrix.
    Explicit(Mat3x4),
    /// The identity local matrix.
    Identity,
    /// Keyed translate, scale, rotate-direction, and roll.
    Full {
        translate: Vec3Track,
        scale: Vec3Track,
        rotate: Vec3Track,
        roll: ScalarTrack,
    },
    /// Constant translate and roll around a keyed aim direction.
    PivotRotate {
        translate: [i32; 3],
        rotate: Vec3Track,
        roll: i32,
    },
    /// Keyed rotate-direction and roll.
    RotateRoll {
        rotate: Vec3Track,
        roll: ScalarTrack,
    },
    /// Keyed rotate-direction only.
    Rotate(Vec3Track),
    /// Keyed translate, rotate-direction, and roll (no scale).
    TranslateRotateRoll {
        translate: Vec3Track,
        rotate: Vec3Track,
        roll: ScalarTrack,
    },
}

impl MotionChannel {
    /// Rebuild the local Q12 matrix for `frame`, applying in order:
    /// translate, rotate-direction, roll, scale.
    pub fn evaluate(&self, frame: i32, out: &mut Mat3x4) {
        match self {
            Self::Explicit(matrix) => *out = *matrix,
            Self::Identity => *out = Mat3x4::IDENTITY,
            Self::Full {
                translate,
                scale,
                rotate,
                roll,
            } => {
                *out = Mat3x4::IDENTITY;
                let t = translate.sample(frame);
                out.set_translation(t[0], t[1], t[2]);
                let r = rotate.sample(frame);
                out.rotate_to_z_axis(r[0], r[1], r[2]);
                out.roll_z(roll.sample(frame));
                let s = scale.sample(frame);
                out.scale_columns(s[0], s[1], s[2]);
            }
            Self::PivotRotate {
                translate,
                rotate,
                roll,
            } => {
                *out = Mat3x4::IDENTITY;
                out.set_translation(translate[0], translate[1], translate[2]);
                let r = rotate.sample(frame);
                out.rotate_to_z_axis(r[0], r[1], r[2]);
                out.roll_z(*roll);
            }
            Self::RotateRoll { rotate, roll } => {
                *out = Mat3x4::IDENTITY;
                let r = rotate.sample(frame);
                out.rotate_to_z_axis(r[0], r[1], r[2]);
                out.roll_z(roll.sample(frame));
            }
            Self::Rotate(rotate) => {
                *out = Mat3x4::IDENTITY;
                let r = rotate.sample(frame);
                out.rotate_to_z_axis(r[0], r[1], r[2]);
            }
            Self::TranslateRotateRoll {
                translate,
                rotate,
                roll,
            } => {
                *out = Mat3x4::IDENTITY;
                let t = translate.sample(frame);
                out.set_translation(t[0], t[1], t[2]);
                let r = rotate.sample(frame);
                out.rotate_to_z_axis(r[0], r[1], r[2]);
                out.roll_z(roll.sample(frame));
            }
        }
    }
}

/// One named motion: a frame count, a motion channel per skeleton bone,
/// and an optional sparse frame -> pattern table for frame-driven polygon
/// visibility.
#[derive(Debug, Clone)]
pub struct Action {
    /// Keyframe count as stored in the file.
    pub frame_count: u16,
    /// One channel per skeleton bone, in bone declaration order.
    pub channels: Vec<MotionChannel>,
    /// Sparse `(frame, pattern mask)` pairs; empty for versions without a
    /// pattern chunk.
    pub pattern_keys: Vec<(u16, u32)>,
}

impl Action {
    /// Frame count in the public fixed-point frame unit (count << 16).
    pub fn num_frames(&self) -> i32 {
        i32::from(self.frame_count) << 16
    }

    /// The pattern mask active at `frame`: the last table entry whose frame
    /// does not exceed it, scanned from the end.
    pub fn pattern_for_frame(&self, frame: i32) -> Option<u32> {
        self.pattern_keys
            .iter()
            .rev()
            .find(|&&(key, _)| i32::from(key) <= frame)
            .map(|&(_, mask)| mask)
    }
}

/// A decoded set of actions with the original API's dispose semantics.
///
/// The table is immutable and shareable; disposing it releases the decoded
/// data and makes every subsequent access fail with
/// [`Mc3Error::Disposed`].
#[derive(Debug)]
pub struct ActionTable {
    actions: Option<Vec<Action>>,
}

impl ActionTable {
    pub fn new(actions: Vec<Action>) -> Self {
        Self {
            actions: Some(actions),
        }
    }

    /// Decode an MTRA buffer into a table.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(Self::new(mtra::decode_actions(bytes)?))
    }

    pub(crate) fn actions(&self) -> Result<&[Action]> {
        self.actions
            .as_deref()
            .ok_or(Mc3Error::Disposed("ActionTable"))
    }

    pub fn num_actions(&self) -> Result<usize> {
        Ok(self.actions()?.len())
    }

    /// Frame count of one action in the fixed-point frame unit.
    pub fn num_frames(&self, index: usize) -> Result<i32> {
        let actions = self.actions()?;
        actions
            .get(index)
            .map(Action::num_frames)
            .ok_or_else(|| {
                Mc3Error::InvalidArgument(format!(
                    "action index {index} out of range ({} actions)",
                    actions.len()
                ))
            })
    }

    pub fn action(&self, index: usize) -> Result<&Action> {
        let actions = self.actions()?;
        actions.get(index).ok_or_else(|| {
            Mc3Error::InvalidArgument(format!(
                "action index {index} out of range ({} actions)",
                actions.len()
            ))
        })
    }

    /// Release the decoded actions. Idempotent.
    pub fn dispose(&mut self) {
        self.actions = None;
    }
}

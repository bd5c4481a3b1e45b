//! 姿态归一化：以髋部中点为原点，以肩宽为单位长度
//!
//! Every frame is handled on its own; there is no smoothing across frames.
//! When the shoulders collapse onto each other (width ≤ [`MIN_SHOULDER_WIDTH`])
//! the frame is only re-centered and keeps unit scale.

use rayon::prelude::*;

use super::sequence::RawSequence;
use crate::core::pose::landmark::{LEFT_HIP, LEFT_SHOULDER, RIGHT_HIP, RIGHT_SHOULDER};
use crate::core::pose::LANDMARK_COUNT;

pub const MIN_SHOULDER_WIDTH: f32 = 1e-6;

pub type Points = [[f32; 2]; LANDMARK_COUNT];

/// 归一化后的一帧
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFrame {
    pub frame_index: u64,
    pub points: Points,
    /// Carried over from detection untouched.
    pub visibility: [f32; LANDMARK_COUNT],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedSequence {
    pub frames: Vec<NormalizedFrame>,
}

impl NormalizedSequence {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Array shape when stored: (frames, 33, 2).
    pub fn shape(&self) -> [usize; 3] {
        [self.frames.len(), LANDMARK_COUNT, 2]
    }

    pub fn frame_indices(&self) -> Vec<u64> {
        self.frames.iter().map(|f| f.frame_index).collect()
    }

    /// Row-major x,y values, `shape()` elements in total.
    pub fn flatten(&self) -> Vec<f32> {
        self.frames
            .iter()
            .flat_map(|f| f.points.iter().flatten().copied())
            .collect()
    }
}

pub fn shoulder_width(points: &Points) -> f32 {
    distance(points[LEFT_SHOULDER], points[RIGHT_SHOULDER])
}

pub fn hip_center(points: &Points) -> [f32; 2] {
    let l = points[LEFT_HIP];
    let r = points[RIGHT_HIP];
    [(l[0] + r[0]) / 2.0, (l[1] + r[1]) / 2.0]
}

fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

pub fn normalize_points(points: &Points) -> Points {
    let [cx, cy] = hip_center(points);
    let centered = points.map(|[x, y]| [x - cx, y - cy]);

    let width = shoulder_width(&centered);
    let scale = if width > MIN_SHOULDER_WIDTH { width } else { 1.0 };

    centered.map(|[x, y]| [x / scale, y / scale])
}

pub fn normalize_sequence(raw: &RawSequence) -> NormalizedSequence {
    let frames = raw
        .frames
        .par_iter()
        .map(|tagged| NormalizedFrame {
            frame_index: tagged.frame_index,
            points: normalize_points(&tagged.landmarks.xy()),
            visibility: tagged.landmarks.visibility(),
        })
        .collect();

    NormalizedSequence { frames }
}

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// One tracked point from the vision pipeline, in normalized camera space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// 0..1, left to right in camera space.
    pub x: f32,
    /// 0..1, top to bottom.
    pub y: f32,
    #[serde(default)]
    pub z: Option<f32>,
    /// Detection confidence 0..1, when the model reports one.
    #[serde(default)]
    pub visibility: Option<f32>,
}

impl Landmark {
    pub const FLAT_FLOATS: usize = 4;

    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            z: None,
            visibility: None,
        }
    }

    pub fn with_visibility(mut self, visibility: f32) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Decode `[x, y, z, visibility]` quads. A negative visibility means "not reported".
    pub fn from_flat(data: &[f32]) -> Vec<Landmark> {
        data.chunks_exact(Self::FLAT_FLOATS)
            .map(|q| Landmark {
                x: q[0],
                y: q[1],
                z: Some(q[2]),
                visibility: (q[3] >= 0.0).then_some(q[3]),
            })
            .collect()
    }

    /// Visible above `threshold`. Landmarks without a confidence count as visible.
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.visibility.map_or(true, |v| v >= threshold)
    }

    /// Project into world pixels, mirroring x for a selfie camera.
    pub fn to_world(&self, world: Vec2, mirror: bool) -> Vec2 {
        let x = if mirror { 1.0 - self.x } else { self.x };
        Vec2::new(x * world.x, self.y * world.y)
    }
}

/// Which model produced a landmark list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkKind {
    /// Concatenated hands, 21 points each.
    Hands,
    /// Face mesh.
    Face,
    /// Full-body pose, 33 points.
    Pose,
}

impl LandmarkKind {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(LandmarkKind::Hands),
            1 => Some(LandmarkKind::Face),
            2 => Some(LandmarkKind::Pose),
            _ => None,
        }
    }
}

/// Pose model indices.
pub mod pose {
    pub const NOSE: usize = 0;
    pub const LEFT_SHOULDER: usize = 11;
    pub const RIGHT_SHOULDER: usize = 12;
    pub const LEFT_WRIST: usize = 15;
    pub const RIGHT_WRIST: usize = 16;
    pub const LEFT_HIP: usize = 23;
    pub const RIGHT_HIP: usize = 24;
    pub const LEFT_ANKLE: usize = 27;
    pub const RIGHT_ANKLE: usize = 28;

    /// Points that must all be visible for the player to count as in frame.
    pub const REQUIRED_FOR_PRESENCE: [usize; 7] = [
        NOSE,
        LEFT_SHOULDER,
        RIGHT_SHOULDER,
        LEFT_HIP,
        RIGHT_HIP,
        LEFT_ANKLE,
        RIGHT_ANKLE,
    ];
}

/// Hand model indices.
pub mod hand {
    pub const POINTS_PER_HAND: usize = 21;
    pub const INDEX_TIP: usize = 8;
}

/// Face mesh indices.
pub mod face {
    pub const FOREHEAD: usize = 10;
    pub const UPPER_LIP: usize = 13;
    pub const LOWER_LIP: usize = 14;
    pub const CHIN: usize = 152;
}

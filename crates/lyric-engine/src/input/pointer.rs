//! Every input modality reduced to "a point that may be holding something".
//!
//! The scoring engine only ever sees [`PointerSample`]s. Vision-specific parsing
//! (which landmark is a fingertip, what counts as an open mouth) lives in the
//! adapters below.

use glam::Vec2;

use crate::input::landmark::{face, hand, pose, Landmark};
use crate::input::queue::InputEvent;

/// A normalized input point in world pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub pos: Vec2,
    pub radius: f32,
    /// Whether this point is currently trying to hold.
    pub active: bool,
}

/// How camera space maps onto the world.
#[derive(Debug, Clone, Copy)]
pub struct SampleSpace {
    pub world: Vec2,
    pub mirror: bool,
    pub radius: f32,
}

/// Anything that yields pointer-like samples each frame.
pub trait PointerLikeSource {
    fn sample(&self, space: &SampleSpace, out: &mut Vec<PointerSample>);
}

/// Mouse or touch pointer, tracked from input events.
#[derive(Debug, Default, Clone, Copy)]
pub struct MousePointer {
    pos: Option<Vec2>,
    active: bool,
}

impl MousePointer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one input event into the pointer state. Returns whether it was a pointer event.
    pub fn apply(&mut self, event: &InputEvent) -> bool {
        match *event {
            InputEvent::PointerDown { x, y } | InputEvent::PointerMove { x, y } => {
                self.pos = Some(Vec2::new(x, y));
                self.active = true;
                true
            }
            InputEvent::PointerUp { x, y } => {
                self.pos = Some(Vec2::new(x, y));
                self.active = false;
                true
            }
            _ => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl PointerLikeSource for MousePointer {
    fn sample(&self, space: &SampleSpace, out: &mut Vec<PointerSample>) {
        if let Some(pos) = self.pos {
            out.push(PointerSample {
                pos,
                radius: space.radius,
                active: self.active,
            });
        }
    }
}

/// Index fingertips of every detected hand.
#[derive(Debug, Default, Clone)]
pub struct HandLandmarks {
    points: Vec<Landmark>,
}

impl HandLandmarks {
    pub fn update(&mut self, landmarks: &[Landmark]) {
        self.points.clear();
        self.points.extend_from_slice(landmarks);
    }
}

impl PointerLikeSource for HandLandmarks {
    fn sample(&self, space: &SampleSpace, out: &mut Vec<PointerSample>) {
        for hand in self.points.chunks_exact(hand::POINTS_PER_HAND) {
            let tip = hand[hand::INDEX_TIP];
            out.push(PointerSample {
                pos: tip.to_world(space.world, space.mirror),
                radius: space.radius,
                active: true,
            });
        }
    }
}

/// Mouth centre, holding only while the mouth is open.
#[derive(Debug, Clone)]
pub struct FaceLandmarks {
    points: Vec<Landmark>,
    open_ratio: f32,
}

impl FaceLandmarks {
    pub fn new(open_ratio: f32) -> Self {
        Self {
            points: Vec::new(),
            open_ratio,
        }
    }

    pub fn update(&mut self, landmarks: &[Landmark]) {
        self.points.clear();
        self.points.extend_from_slice(landmarks);
    }

    /// Lip gap relative to face height, if the mesh is complete.
    pub fn mouth_openness(&self) -> Option<f32> {
        let p = &self.points;
        if p.len() <= face::CHIN {
            return None;
        }
        let face_h = (p[face::CHIN].y - p[face::FOREHEAD].y).abs();
        if face_h <= f32::EPSILON {
            return None;
        }
        Some((p[face::LOWER_LIP].y - p[face::UPPER_LIP].y).abs() / face_h)
    }
}

impl PointerLikeSource for FaceLandmarks {
    fn sample(&self, space: &SampleSpace, out: &mut Vec<PointerSample>) {
        let Some(openness) = self.mouth_openness() else {
            return;
        };
        let upper = self.points[face::UPPER_LIP].to_world(space.world, space.mirror);
        let lower = self.points[face::LOWER_LIP].to_world(space.world, space.mirror);
        out.push(PointerSample {
            pos: (upper + lower) * 0.5,
            radius: space.radius,
            active: openness >= self.open_ratio,
        });
    }
}

/// Both wrists of a full-body pose.
#[derive(Debug, Clone)]
pub struct PoseLandmarks {
    points: Vec<Landmark>,
    visibility_threshold: f32,
}

impl PoseLandmarks {
    pub fn new(visibility_threshold: f32) -> Self {
        Self {
            points: Vec::new(),
            visibility_threshold,
        }
    }

    pub fn update(&mut self, landmarks: &[Landmark]) {
        self.points.clear();
        self.points.extend_from_slice(landmarks);
    }
}

impl PointerLikeSource for PoseLandmarks {
    fn sample(&self, space: &SampleSpace, out: &mut Vec<PointerSample>) {
        for idx in [pose::LEFT_WRIST, pose::RIGHT_WRIST] {
            if let Some(lm) = self.points.get(idx) {
                out.push(PointerSample {
                    pos: lm.to_world(space.world, space.mirror),
                    radius: space.radius,
                    active: lm.is_visible(self.visibility_threshold),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> SampleSpace {
        SampleSpace {
            world: Vec2::new(1000.0, 1000.0),
            mirror: false,
            radius: 10.0,
        }
    }

    #[test]
    fn mouse_active_until_released() {
        let mut m = MousePointer::new();
        let mut out = Vec::new();
        m.sample(&space(), &mut out);
        assert!(out.is_empty());

        m.apply(&InputEvent::PointerDown { x: 5.0, y: 6.0 });
        m.sample(&space(), &mut out);
        assert_eq!(out[0].pos, Vec2::new(5.0, 6.0));
        assert!(out[0].active);

        m.apply(&InputEvent::PointerUp { x: 5.0, y: 6.0 });
        out.clear();
        m.sample(&space(), &mut out);
        assert!(!out[0].active);
    }

    #[test]
    fn two_hands_give_two_samples() {
        let mut hands = HandLandmarks::default();
        let mut points = vec![Landmark::new(0.1, 0.1); hand::POINTS_PER_HAND * 2];
        points[hand::INDEX_TIP] = Landmark::new(0.2, 0.3);
        points[hand::POINTS_PER_HAND + hand::INDEX_TIP] = Landmark::new(0.8, 0.3);
        hands.update(&points);

        let mut out = Vec::new();
        hands.sample(&space(), &mut out);
        assert_eq!(out.len(), 2);
        assert!((out[0].pos.x - 200.0).abs() < 1e-3);
        assert!((out[1].pos.x - 800.0).abs() < 1e-3);
    }

    fn face_mesh(lip_gap: f32) -> Vec<Landmark> {
        let mut points = vec![Landmark::new(0.5, 0.5); face::CHIN + 1];
        points[face::FOREHEAD] = Landmark::new(0.5, 0.2);
        points[face::CHIN] = Landmark::new(0.5, 0.8);
        points[face::UPPER_LIP] = Landmark::new(0.5, 0.6);
        points[face::LOWER_LIP] = Landmark::new(0.5, 0.6 + lip_gap);
        points
    }

    #[test]
    fn open_mouth_is_active() {
        let mut face = FaceLandmarks::new(0.35);
        face.update(&face_mesh(0.3));
        let mut out = Vec::new();
        face.sample(&space(), &mut out);
        assert!(out[0].active);

        face.update(&face_mesh(0.05));
        out.clear();
        face.sample(&space(), &mut out);
        assert!(!out[0].active);
    }

    #[test]
    fn incomplete_face_mesh_yields_nothing() {
        let mut face = FaceLandmarks::new(0.35);
        face.update(&[Landmark::new(0.5, 0.5); 20]);
        let mut out = Vec::new();
        face.sample(&space(), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn hidden_wrist_is_inactive() {
        let mut pose_src = PoseLandmarks::new(0.5);
        let mut points = vec![Landmark::new(0.5, 0.5).with_visibility(0.9); 33];
        points[pose::LEFT_WRIST] = Landmark::new(0.1, 0.1).with_visibility(0.1);
        pose_src.update(&points);
        let mut out = Vec::new();
        pose_src.sample(&space(), &mut out);
        assert_eq!(out.len(), 2);
        assert!(!out[0].active);
        assert!(out[1].active);
    }
}

use bytemuck::{Pod, Zeroable};

use crate::components::bubble::BubbleHandle;

/// Per-bubble render data read by the host through a raw pointer.
/// Must match the host protocol: 8 floats = 32 bytes stride.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct BubbleInstance {
    /// Bubble id, for looking up its text.
    pub id: f32,
    /// Centre in world pixels.
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    /// Hold progress 0..1.
    pub progress: f32,
    /// Opacity (0.0 = invisible, 1.0 = opaque).
    pub alpha: f32,
    /// Fraction of the lifetime elapsed, 0..1.
    pub age: f32,
    /// Bit set of `FLAG_*`.
    pub flags: f32,
}

impl BubbleInstance {
    pub const FLOATS: usize = 8;
    pub const STRIDE_BYTES: usize = Self::FLOATS * 4;

    pub const FLAG_INTERACTIVE: u32 = 1;
    pub const FLAG_COMPLETED: u32 = 2;
    pub const FLAG_HELD: u32 = 4;

    pub fn from_bubble(bubble: &BubbleHandle, age: f32) -> Self {
        let mut flags = 0;
        if bubble.interactive {
            flags |= Self::FLAG_INTERACTIVE;
        }
        if bubble.completed {
            flags |= Self::FLAG_COMPLETED;
        }
        if bubble.progress > 0.0 && !bubble.completed {
            flags |= Self::FLAG_HELD;
        }
        Self {
            id: bubble.id.0 as f32,
            x: bubble.pos.x,
            y: bubble.pos.y,
            radius: bubble.radius,
            progress: bubble.progress,
            alpha: bubble.opacity,
            age,
            flags: flags as f32,
        }
    }

    pub fn has_flag(&self, flag: u32) -> bool {
        (self.flags as u32) & flag != 0
    }
}

/// Bubble instances for one frame, in spawn order.
pub struct RenderBuffer {
    pub instances: Vec<BubbleInstance>,
}

impl RenderBuffer {
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            instances: Vec::with_capacity(capacity),
        }
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }

    pub fn push(&mut self, instance: BubbleInstance) {
        self.instances.push(instance);
    }

    pub fn instance_count(&self) -> u32 {
        self.instances.len() as u32
    }

    /// Raw pointer to instance data for host reads.
    pub fn instances_ptr(&self) -> *const f32 {
        self.instances.as_ptr() as *const f32
    }

    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.instances)
    }
}

impl Default for RenderBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::BubbleId;
    use glam::Vec2;

    #[test]
    fn bubble_instance_is_8_floats() {
        assert_eq!(std::mem::size_of::<BubbleInstance>(), 32);
        assert_eq!(BubbleInstance::STRIDE_BYTES, 32);
    }

    #[test]
    fn flags_follow_bubble_state() {
        let mut b = BubbleHandle::blank()
            .with_id(BubbleId(7))
            .with_pos(Vec2::new(10.0, 20.0))
            .with_radius(30.0);
        b.progress = 0.5;
        let inst = BubbleInstance::from_bubble(&b, 0.25);
        assert_eq!(inst.id, 7.0);
        assert!(inst.has_flag(BubbleInstance::FLAG_INTERACTIVE));
        assert!(inst.has_flag(BubbleInstance::FLAG_HELD));
        assert!(!inst.has_flag(BubbleInstance::FLAG_COMPLETED));

        b.completed = true;
        b.interactive = false;
        let inst = BubbleInstance::from_bubble(&b, 0.25);
        assert!(inst.has_flag(BubbleInstance::FLAG_COMPLETED));
        assert!(!inst.has_flag(BubbleInstance::FLAG_HELD));
    }

    #[test]
    fn buffer_exposes_flat_floats() {
        let mut buf = RenderBuffer::new();
        buf.push(BubbleInstance::default());
        buf.push(BubbleInstance { x: 3.0, ..Default::default() });
        assert_eq!(buf.instance_count(), 2);
        assert_eq!(buf.as_floats().len(), 16);
        assert_eq!(buf.as_floats()[9], 3.0);
    }
}

pub mod instance;
pub mod sink;

pub use instance::{BubbleInstance, RenderBuffer};
pub use sink::{FrameSink, HitEffect};

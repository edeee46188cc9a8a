pub mod clock;
pub mod control;
pub mod pool;
pub mod rng;
pub mod scene;
pub mod timers;

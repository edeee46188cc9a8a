pub mod landmark;
pub mod pointer;
pub mod queue;

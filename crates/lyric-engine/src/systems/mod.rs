pub mod bubbles;
pub mod completion;
pub mod hold;
pub mod presence;

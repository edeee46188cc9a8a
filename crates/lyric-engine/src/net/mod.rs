//! Payloads exchanged with the score and ranking service. Transport stays in the host.
pub mod ranking;
pub mod score;

//! Internal helpers shared by the encoder and decoder

pub mod chars;
pub mod escape;

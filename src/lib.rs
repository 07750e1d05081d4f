//! Wavescript — a small language for looping audio samples to a beat.

pub mod audio;
pub mod config;
pub mod dsl;
pub mod runtime;

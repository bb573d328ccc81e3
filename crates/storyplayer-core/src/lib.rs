//! Story Player Core: shared playback abstractions.
//!
//! This crate defines the script model and the ports that the timeline and
//! audio crates depend on. It contains no infrastructure code: concrete
//! asset loaders and audio backends live in their own crates.

pub mod asset;
pub mod audio;
pub mod clock;
pub mod error;
pub mod intent;
pub mod loader;
pub mod names;
pub mod presentation;
pub mod script;
pub mod track;

//! Story Player: Audio Channel Manager.
//!
//! Music, sound-effect and voice channels, each with its own gain, decoded
//! buffer cache and at most one live playback node.

pub mod channel;
pub mod manager;
pub mod settings;

//! Story Player: Timeline Playback & Seek.
//!
//! Responsible for walking a recorded script, resolving label jumps and
//! branch choices, deriving background and audio state at any position, and
//! seeking deterministically over effects that cannot be undone.

pub mod application;
pub mod domain;

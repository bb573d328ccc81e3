//! Shared test doubles and fixtures for the Story Player engine.

mod audio;
mod clock;
mod fixtures;
mod loader;

pub use audio::{BackendCall, FailingAudioPort, RecordingAudioBackend};
pub use clock::{FixedClock, fixed_now};
pub use fixtures::{fallback_loader, track_from_value};
pub use loader::{FailingLoader, InMemoryLoader};

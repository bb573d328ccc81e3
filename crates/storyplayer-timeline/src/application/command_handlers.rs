//! Command handlers for the Timeline context.
//!
//! Each handler applies one command to a playback session through the
//! interpreter. Callers serialize access to a session; handlers never run
//! two commands against the same session concurrently.

use std::sync::Arc;

use storyplayer_core::asset::AssetKind;
use storyplayer_core::clock::Clock;
use storyplayer_core::error::PlaybackError;
use storyplayer_core::loader::FallbackLoader;
use storyplayer_core::names::NameAliasIndex;
use storyplayer_core::track::Track;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::branch::ChoiceOutcome;
use crate::domain::commands::{
    AdvanceTurn, ChooseOption, DestroySession, SeekTo, StartSession, SyncBackground,
};
use crate::domain::interpreter::{Interpreter, PlaybackPorts, TimelineSettings, TurnReport};
use crate::domain::seek::SeekOutcome;
use crate::domain::session::{PlaybackMode, PlaybackSession};

/// Loads the speaker alias list. A missing or malformed list is logged and
/// replaced by an empty index; every speaker then gets the default icon.
pub async fn load_name_index(assets: &FallbackLoader) -> NameAliasIndex {
    let loaded = match assets.load(&AssetKind::NameList, "").await {
        Ok(asset) => NameAliasIndex::from_json(&asset.bytes),
        Err(e) => Err(e),
    };
    match loaded {
        Ok(index) => {
            info!(aliases = index.len(), "name alias list loaded");
            index
        }
        Err(e) => {
            warn!(error = %e, "name alias list unavailable, using default icons");
            NameAliasIndex::default()
        }
    }
}

/// Handles the `StartSession` command: loads the script and opens a session.
/// Auto-play sessions play their first turn immediately.
///
/// # Errors
///
/// Returns `PlaybackError::AssetUnavailable` if the script cannot be fetched
/// from either source, or `PlaybackError::Decode` if it is malformed.
pub async fn handle_start_session(
    command: &StartSession,
    clock: &dyn Clock,
    names: Arc<NameAliasIndex>,
    ports: &PlaybackPorts,
    settings: &TimelineSettings,
) -> Result<PlaybackSession, PlaybackError> {
    let kind = AssetKind::Script {
        category: command.category.clone(),
    };
    let asset = ports.assets.load(&kind, &command.script_id).await?;
    let track = Track::from_json(&asset.bytes)?;

    let mode = PlaybackMode::from_flag(command.auto_play);
    let mut session = PlaybackSession::new(Uuid::new_v4(), track, names, mode);
    session.started_at = Some(clock.now());
    info!(
        correlation_id = %command.correlation_id,
        session_id = %session.id(),
        script = %kind.relative_path(&command.script_id),
        origin = ?asset.origin,
        records = session.track().len(),
        ?mode,
        "playback session started"
    );

    if mode == PlaybackMode::AutoPlay {
        Interpreter::new(ports, settings)
            .play_turn(&mut session)
            .await?;
    }
    Ok(session)
}

/// Handles the `AdvanceTurn` command, then waits out the settle delay of a
/// manual turn.
///
/// # Errors
///
/// Returns `PlaybackError::Destroyed` if the session was destroyed.
pub async fn handle_advance_turn(
    command: &AdvanceTurn,
    session: &mut PlaybackSession,
    ports: &PlaybackPorts,
    settings: &TimelineSettings,
) -> Result<TurnReport, PlaybackError> {
    let report = Interpreter::new(ports, settings)
        .play_turn(session)
        .await?;
    info!(
        correlation_id = %command.correlation_id,
        session_id = %command.session_id,
        from = report.from,
        to = report.to,
        state = ?report.state,
        "turn played"
    );

    if session.mode() == PlaybackMode::Manual && !settings.settle_delay.is_zero() {
        tokio::time::sleep(settings.settle_delay).await;
    }
    Ok(report)
}

/// Handles the `ChooseOption` command.
///
/// # Errors
///
/// Returns `PlaybackError::Validation` if no branch is pending or the option
/// is out of range, and `PlaybackError::Destroyed` after destroy.
pub async fn handle_choose_option(
    command: &ChooseOption,
    session: &mut PlaybackSession,
    ports: &PlaybackPorts,
    settings: &TimelineSettings,
) -> Result<ChoiceOutcome, PlaybackError> {
    let outcome = Interpreter::new(ports, settings)
        .choose(session, command.option)
        .await?;
    info!(
        correlation_id = %command.correlation_id,
        session_id = %command.session_id,
        option = command.option,
        ?outcome,
        "branch choice applied"
    );
    Ok(outcome)
}

/// Handles the `SeekTo` command. Negative and out-of-range positions are
/// rejected without touching the session.
///
/// # Errors
///
/// Returns `PlaybackError::Destroyed` if the session was destroyed.
pub async fn handle_seek(
    command: &SeekTo,
    session: &mut PlaybackSession,
    ports: &PlaybackPorts,
    settings: &TimelineSettings,
) -> Result<SeekOutcome, PlaybackError> {
    session.ensure_live()?;
    let Ok(position) = usize::try_from(command.position) else {
        warn!(
            correlation_id = %command.correlation_id,
            position = command.position,
            "negative seek position"
        );
        return Ok(SeekOutcome::Rejected {
            position: 0,
            length: session.track().len(),
        });
    };

    Interpreter::new(ports, settings).seek(session, position).await
}

/// Handles the `SyncBackground` command.
///
/// # Errors
///
/// Returns `PlaybackError::Destroyed` if the session was destroyed.
pub async fn handle_sync_background(
    command: &SyncBackground,
    session: &mut PlaybackSession,
    ports: &PlaybackPorts,
    settings: &TimelineSettings,
) -> Result<Option<String>, PlaybackError> {
    Interpreter::new(ports, settings)
        .sync_background(session, &command.inputs, command.viewport, &command.layout)
        .await
}

/// Handles the `DestroySession` command.
pub async fn handle_destroy_session(
    command: &DestroySession,
    session: &mut PlaybackSession,
    ports: &PlaybackPorts,
    settings: &TimelineSettings,
) {
    Interpreter::new(ports, settings).destroy(session).await;
    info!(
        correlation_id = %command.correlation_id,
        session_id = %command.session_id,
        "playback session destroyed"
    );
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use storyplayer_core::intent::{Intent, IntentLog};
    use storyplayer_test_support::{FixedClock, InMemoryLoader, fallback_loader, fixed_now};

    use super::*;
    use crate::domain::session::PlaybackState;

    const SCRIPT: &str = "json/produce_events/300100101.json";

    fn script_bytes() -> Vec<u8> {
        serde_json::to_vec(&json!([
            {"bg": "A", "textFrame": "001", "speaker": "真乃", "text": "hi", "textCtrl": "p"},
            {"textFrame": "002", "text": "hello", "textCtrl": "l"},
            {"select": "yes", "nextLabel": "yes"},
            {"select": "no", "nextLabel": "no"},
            {"textCtrl": "cm"},
            {"label": "yes", "textFrame": "001", "text": "great", "textCtrl": "p"},
            {"label": "no", "bg": "B", "textFrame": "001", "text": "oh", "textCtrl": "p"},
            {}
        ]))
        .unwrap()
    }

    fn setup(local: InMemoryLoader) -> (Arc<IntentLog>, PlaybackPorts, TimelineSettings) {
        let log = Arc::new(IntentLog::new());
        let ports = PlaybackPorts {
            presentation: log.clone(),
            audio: log.clone(),
            assets: fallback_loader(Arc::new(local)),
        };
        let settings = TimelineSettings {
            settle_delay: Duration::ZERO,
            ..TimelineSettings::default()
        };
        (log, ports, settings)
    }

    fn default_local() -> InMemoryLoader {
        InMemoryLoader::new("local")
            .with_file(SCRIPT, script_bytes())
            .with_file("images/event/bg/A.jpg", b"a".to_vec())
            .with_file("images/event/bg/B.jpg", b"b".to_vec())
    }

    fn start_command(auto_play: Option<bool>) -> StartSession {
        StartSession {
            correlation_id: Uuid::new_v4(),
            category: "produce_events".to_owned(),
            script_id: "300100101".to_owned(),
            auto_play,
        }
    }

    #[tokio::test]
    async fn test_handle_start_session_defaults_to_manual() {
        // Arrange
        let (log, ports, settings) = setup(default_local());

        // Act
        let session = handle_start_session(
            &start_command(None),
            &FixedClock(fixed_now()),
            Arc::new(NameAliasIndex::default()),
            &ports,
            &settings,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(session.mode(), PlaybackMode::Manual);
        assert_eq!(session.state(), PlaybackState::AwaitingInput);
        assert_eq!(session.track().len(), 8);
        assert_eq!(session.started_at(), Some(fixed_now()));
        assert!(log.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_handle_start_session_auto_play_runs_to_branch() {
        // Arrange
        let (_log, ports, settings) = setup(default_local());

        // Act
        let session = handle_start_session(
            &start_command(Some(true)),
            &FixedClock(fixed_now()),
            Arc::new(NameAliasIndex::default()),
            &ports,
            &settings,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(session.state(), PlaybackState::AwaitingBranch);
        assert_eq!(session.cursor().index, 1);
        assert!(session.cursor().muted);
    }

    #[tokio::test]
    async fn test_handle_start_session_fails_when_script_missing() {
        // Arrange
        let (_log, ports, settings) = setup(InMemoryLoader::new("local"));

        // Act
        let result = handle_start_session(
            &start_command(None),
            &FixedClock(fixed_now()),
            Arc::new(NameAliasIndex::default()),
            &ports,
            &settings,
        )
        .await;

        // Assert
        assert!(matches!(
            result,
            Err(PlaybackError::AssetUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_handle_start_session_rejects_malformed_script() {
        // Arrange
        let local = InMemoryLoader::new("local").with_file(SCRIPT, b"{\"bg\": 1}".to_vec());
        let (_log, ports, settings) = setup(local);

        // Act
        let result = handle_start_session(
            &start_command(None),
            &FixedClock(fixed_now()),
            Arc::new(NameAliasIndex::default()),
            &ports,
            &settings,
        )
        .await;

        // Assert
        assert!(matches!(result, Err(PlaybackError::Decode(_))));
    }

    #[tokio::test]
    async fn test_manual_session_walkthrough() {
        // Arrange
        let (log, ports, settings) = setup(default_local());
        let mut session = handle_start_session(
            &start_command(None),
            &FixedClock(fixed_now()),
            Arc::new(NameAliasIndex::default()),
            &ports,
            &settings,
        )
        .await
        .unwrap();
        let session_id = session.id();
        let advance = AdvanceTurn {
            correlation_id: Uuid::new_v4(),
            session_id,
        };

        // Act
        handle_advance_turn(&advance, &mut session, &ports, &settings)
            .await
            .unwrap();
        let halted = handle_advance_turn(&advance, &mut session, &ports, &settings)
            .await
            .unwrap();
        let outcome = handle_choose_option(
            &ChooseOption {
                correlation_id: Uuid::new_v4(),
                session_id,
                option: 1,
            },
            &mut session,
            &ports,
            &settings,
        )
        .await
        .unwrap();
        handle_advance_turn(&advance, &mut session, &ports, &settings)
            .await
            .unwrap();

        // Assert
        assert_eq!(halted.state, PlaybackState::AwaitingBranch);
        assert_eq!(
            outcome,
            ChoiceOutcome::Resolved {
                chosen: 1,
                target: 6,
                fell_back: false
            }
        );
        assert_eq!(session.current_background(), Some("B"));
        assert_eq!(session.cursor().index, 7);
        let voice_stops = log
            .snapshot()
            .iter()
            .filter(|intent| matches!(intent, Intent::Stop { .. }))
            .count();
        assert_eq!(voice_stops, 3);
    }

    #[tokio::test]
    async fn test_handle_seek_rejects_negative_position() {
        // Arrange
        let (log, ports, settings) = setup(default_local());
        let mut session = handle_start_session(
            &start_command(None),
            &FixedClock(fixed_now()),
            Arc::new(NameAliasIndex::default()),
            &ports,
            &settings,
        )
        .await
        .unwrap();
        let command = SeekTo {
            correlation_id: Uuid::new_v4(),
            session_id: session.id(),
            position: -1,
        };

        // Act
        let outcome = handle_seek(&command, &mut session, &ports, &settings)
            .await
            .unwrap();

        // Assert
        assert!(matches!(outcome, SeekOutcome::Rejected { length: 8, .. }));
        assert!(log.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_handle_destroy_session_makes_later_commands_fail() {
        // Arrange
        let (_log, ports, settings) = setup(default_local());
        let mut session = handle_start_session(
            &start_command(None),
            &FixedClock(fixed_now()),
            Arc::new(NameAliasIndex::default()),
            &ports,
            &settings,
        )
        .await
        .unwrap();
        let session_id = session.id();

        // Act
        handle_destroy_session(
            &DestroySession {
                correlation_id: Uuid::new_v4(),
                session_id,
            },
            &mut session,
            &ports,
            &settings,
        )
        .await;
        let result = handle_advance_turn(
            &AdvanceTurn {
                correlation_id: Uuid::new_v4(),
                session_id,
            },
            &mut session,
            &ports,
            &settings,
        )
        .await;

        // Assert
        assert!(matches!(result, Err(PlaybackError::Destroyed)));
    }

    #[tokio::test]
    async fn test_load_name_index_falls_back_to_empty() {
        // Arrange
        let assets = fallback_loader(Arc::new(InMemoryLoader::new("local")));

        // Act
        let index = load_name_index(&assets).await;

        // Assert
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_load_name_index_reads_alias_list() {
        // Arrange
        let local = InMemoryLoader::new("local").with_file(
            "json/name_list.json",
            serde_json::to_vec(&json!({"櫻木真乃": ["真乃", "まの"]})).unwrap(),
        );
        let assets = fallback_loader(Arc::new(local));

        // Act
        let index = load_name_index(&assets).await;

        // Assert
        assert_eq!(index.canonical("まの"), Some("櫻木真乃"));
    }
}

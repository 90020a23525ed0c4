//! Controller scenarios driven message by message
//!
//! The harness stands in for the session loop: it hands commands to the
//! controller, pumps loopback messages (resolution results, inserts) and
//! delivers backend events reported through the fake players.

use cadence_core::{
    FavoriteGateway, PersistenceGateway, PlayerErrorKind, PlaybackStatus, RepeatMode, Selector,
    ShuffleMode, Track, TrackId,
};
use cadence_playback::player::BackendEvent;
use cadence_playback::testing::{
    song, FakePlayer, FakePlayerMonitor, InMemoryFavorites, InMemoryPersistence, InMemoryRetriever,
};
use cadence_playback::{
    Collaborators, Command, DualPlayer, EventSink, FocusChange, Message, PlayTarget,
    PlaybackConfig, PlaybackController, PlaybackEvent, Persister,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

// ===== Test Harness =====

struct Harness {
    controller: PlaybackController,
    loopback: mpsc::UnboundedReceiver<Message>,
    backend: mpsc::UnboundedReceiver<BackendEvent>,
    monitors: [FakePlayerMonitor; 2],
    library: InMemoryRetriever,
    store: InMemoryPersistence,
    favorites: InMemoryFavorites,
    persister: Persister,
    events: broadcast::Receiver<PlaybackEvent>,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(PlaybackConfig::default())
    }

    fn with_config(config: PlaybackConfig) -> Self {
        let (backend_tx, backend) = mpsc::unbounded_channel();
        let (players, monitors) = FakePlayer::pair(EventSink::pair(&backend_tx));
        let player = DualPlayer::new(players, config.crossfade.clone());

        let library = InMemoryRetriever::new();
        library.insert(
            "albums/1",
            vec![song("a", "X"), song("b", "Y"), song("c", "Z")],
        );
        library.insert("albums/2", vec![song("d", "W"), song("e", "W")]);
        library.insert("albums/single", vec![song("solo", "X")]);
        library.insert(
            "podcasts/show",
            vec![
                Track::new(TrackId::new("p1"), "Episode 1", 600_000).podcast(),
                Track::new(TrackId::new("p2"), "Episode 2", 600_000).podcast(),
            ],
        );

        let store = InMemoryPersistence::new();
        let favorites = InMemoryFavorites::new();
        let (persister, _task) = Persister::spawn(Arc::new(store.clone()));
        let (loopback_tx, loopback) = mpsc::unbounded_channel();

        let controller = PlaybackController::new(
            config,
            player,
            Collaborators {
                retriever: Arc::new(library.clone()),
                persistence: Arc::new(store.clone()),
                favorites: Arc::new(favorites.clone()),
            },
            persister.clone(),
            loopback_tx,
        );
        let events = controller.subscribe();

        Self {
            controller,
            loopback,
            backend,
            monitors,
            library,
            store,
            favorites,
            persister,
            events,
        }
    }

    async fn send(&mut self, command: Command) {
        self.controller.handle(Message::Command(command)).await;
    }

    /// Handle the next loopback message
    async fn pump(&mut self) {
        let message = tokio::time::timeout(Duration::from_secs(5), self.loopback.recv())
            .await
            .expect("no loopback message arrived")
            .expect("loopback channel closed");
        self.controller.handle(message).await;
    }

    async fn play(&mut self, selector: &str) {
        let selector: Selector = selector.parse().unwrap();
        self.send(Command::PlayFromSelection {
            selector,
            filter: None,
        })
        .await;
        self.pump().await;
    }

    /// Deliver every backend event reported so far
    async fn deliver_backend_events(&mut self) {
        while let Ok(event) = self.backend.try_recv() {
            self.controller.handle(Message::Backend(event)).await;
        }
    }

    fn active(&self) -> &FakePlayerMonitor {
        &self.monitors[self.controller.player().active_slot()]
    }

    fn status(&self) -> PlaybackStatus {
        self.controller.session().status
    }

    fn current_id(&self) -> Option<String> {
        self.controller.queue().current().map(|e| e.id.to_string())
    }

    async fn saves(&self) -> Vec<String> {
        self.persister.flush().await;
        self.store.log()
    }

    fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

// ===== Play requests =====

#[tokio::test]
async fn play_from_selection_starts_requested_track() {
    let mut h = Harness::new();

    h.play("albums/1/b").await;

    assert_eq!(h.current_id().as_deref(), Some("b"));
    assert_eq!(h.controller.queue().len(), 3);
    assert_eq!(h.status(), PlaybackStatus::Playing);
    assert_eq!(h.active().loaded().unwrap().as_str(), "b");
    assert!(h.active().is_playing());

    let events = h.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        PlaybackEvent::MetadataChanged { metadata: Some(m) } if m.id.as_str() == "b"
    )));
}

#[tokio::test]
async fn empty_resolution_settles_stopped() {
    let mut h = Harness::new();

    h.play("albums/missing").await;

    assert_eq!(h.status(), PlaybackStatus::Stopped);
    assert!(h.controller.queue().is_empty());
}

#[tokio::test(start_paused = true)]
async fn newer_play_request_supersedes_pending_resolution() {
    let mut h = Harness::new();
    h.library.delay("albums/1", Duration::from_secs(2));

    h.send(Command::PlayFromSelection {
        selector: "albums/1".parse().unwrap(),
        filter: None,
    })
    .await;
    h.send(Command::PlayFromSelection {
        selector: "albums/2".parse().unwrap(),
        filter: None,
    })
    .await;
    h.pump().await;

    assert_eq!(h.current_id().as_deref(), Some("d"));

    // The first request was aborted and never reports back
    let late = tokio::time::timeout(Duration::from_secs(10), h.loopback.recv()).await;
    assert!(late.is_err());
    assert_eq!(h.current_id().as_deref(), Some("d"));
}

#[tokio::test]
async fn stale_resolution_is_ignored() {
    let mut h = Harness::new();
    h.play("albums/2").await;

    h.controller
        .handle(Message::Resolved {
            generation: 0,
            target: PlayTarget {
                source_id: "albums/1".to_string(),
                start: None,
                shuffled: false,
                podcast: false,
            },
            result: Ok(vec![song("zzz", "Q")]),
        })
        .await;

    assert_eq!(h.current_id().as_deref(), Some("d"));
    assert_eq!(h.controller.queue().len(), 2);
}

#[tokio::test]
async fn shuffled_play_turns_shuffle_on() {
    let mut h = Harness::new();

    h.send(Command::PlayShuffled {
        selector: "albums/1".parse().unwrap(),
        filter: None,
    })
    .await;
    h.pump().await;

    assert_eq!(h.controller.queue().shuffle_mode(), ShuffleMode::On);
    assert_eq!(h.controller.queue().len(), 3);
    assert_eq!(h.status(), PlaybackStatus::Playing);
    assert!(h.saves().await.contains(&"modes:off:on".to_string()));
}

#[tokio::test]
async fn filter_narrows_resolved_tracks() {
    let mut h = Harness::new();

    h.send(Command::PlayFromSelection {
        selector: "albums/1".parse().unwrap(),
        filter: Some("Song b".to_string()),
    })
    .await;
    h.pump().await;

    assert_eq!(h.controller.queue().len(), 1);
    assert_eq!(h.current_id().as_deref(), Some("b"));
}

// ===== Navigation =====

#[tokio::test]
async fn end_of_queue_rewinds_and_pauses() {
    let mut h = Harness::new();
    h.play("albums/1/c").await;
    h.active().set_position(Duration::from_secs(179));

    h.active().finish();
    h.deliver_backend_events().await;

    assert_eq!(h.current_id().as_deref(), Some("c"));
    assert_eq!(h.status(), PlaybackStatus::Paused);
    assert!(!h.active().is_playing());
    assert_eq!(h.active().position(), Duration::ZERO);
}

#[tokio::test]
async fn track_end_advances_to_next_entry() {
    let mut h = Harness::new();
    h.play("albums/1").await;

    h.active().finish();
    h.deliver_backend_events().await;

    assert_eq!(h.current_id().as_deref(), Some("b"));
    assert_eq!(h.status(), PlaybackStatus::Playing);
    assert_eq!(h.active().loaded().unwrap().as_str(), "b");
}

#[tokio::test]
async fn track_end_queued_before_skip_is_not_applied_twice() {
    let mut h = Harness::new();
    h.play("albums/1").await;

    // "a" ends while the skip command is already on its way
    h.active().finish();
    h.send(Command::SkipToNext).await;
    h.deliver_backend_events().await;

    assert_eq!(h.current_id().as_deref(), Some("b"));
    assert_eq!(h.status(), PlaybackStatus::Playing);
    assert_eq!(h.active().loaded().unwrap().as_str(), "b");
}

#[tokio::test]
async fn failure_of_replaced_entry_does_not_mark_new_one() {
    let mut h = Harness::new();
    h.play("albums/1").await;

    h.active().fail(PlayerErrorKind::Source, "bad file");
    h.send(Command::SkipToNext).await;
    h.deliver_backend_events().await;

    assert_eq!(h.current_id().as_deref(), Some("b"));
    assert_eq!(h.status(), PlaybackStatus::Playing);
    assert!(h.controller.session().last_error.is_none());
}

#[tokio::test]
async fn repeat_one_replays_current_entry() {
    let mut h = Harness::new();
    h.play("albums/1").await;
    h.send(Command::SetRepeatMode(RepeatMode::One)).await;

    h.active().finish();
    h.deliver_backend_events().await;

    assert_eq!(h.current_id().as_deref(), Some("a"));
    assert_eq!(h.status(), PlaybackStatus::Playing);
    assert_eq!(h.active().position(), Duration::ZERO);
}

#[tokio::test]
async fn repeat_all_wraps_to_first_entry() {
    let mut h = Harness::new();
    h.play("albums/1/c").await;
    h.send(Command::SetRepeatMode(RepeatMode::All)).await;

    h.send(Command::SkipToNext).await;

    assert_eq!(h.current_id().as_deref(), Some("a"));
    assert_eq!(h.status(), PlaybackStatus::Playing);
}

#[tokio::test]
async fn skip_to_previous_honors_restart_threshold() {
    let mut h = Harness::new();
    h.play("albums/1/b").await;

    // Past the threshold: restart the current entry
    h.active().set_position(Duration::from_secs(15));
    h.send(Command::SkipToPrevious).await;
    assert_eq!(h.current_id().as_deref(), Some("b"));
    assert_eq!(h.active().position(), Duration::ZERO);

    // Within the threshold: go back one entry
    h.active().set_position(Duration::from_secs(3));
    h.send(Command::SkipToPrevious).await;
    assert_eq!(h.current_id().as_deref(), Some("a"));
    assert_eq!(h.status(), PlaybackStatus::Playing);
}

#[tokio::test]
async fn skip_to_queue_item_uses_ordinal() {
    let mut h = Harness::new();
    h.play("albums/1").await;

    h.send(Command::SkipToQueueItem(2)).await;
    assert_eq!(h.current_id().as_deref(), Some("c"));

    // Unknown ordinals leave the queue alone
    h.send(Command::SkipToQueueItem(42)).await;
    assert_eq!(h.current_id().as_deref(), Some("c"));
}

#[tokio::test]
async fn seek_is_clamped_to_duration() {
    let mut h = Harness::new();
    h.play("albums/1").await;

    h.send(Command::SeekTo(Duration::from_secs(999))).await;

    assert_eq!(h.active().position(), Duration::from_secs(180));
    assert_eq!(h.controller.session().bookmark_ms, 180_000);
}

// ===== Persistence ordering =====

#[tokio::test]
async fn outgoing_bookmark_is_saved_before_queue() {
    let mut h = Harness::new();
    h.play("podcasts/show").await;
    h.active().set_position(Duration::from_secs(60));

    h.send(Command::SkipToNext).await;

    assert_eq!(
        h.saves().await,
        vec![
            "queue:2@0".to_string(),
            "bookmark:p1:60000".to_string(),
            "queue:2@1".to_string(),
        ]
    );
}

#[tokio::test]
async fn podcast_resumes_from_bookmark() {
    let mut h = Harness::new();
    h.play("podcasts/show").await;
    h.active().set_position(Duration::from_secs(60));
    h.send(Command::SkipToNext).await;
    assert_eq!(h.current_id().as_deref(), Some("p2"));

    h.send(Command::SkipToPrevious).await;

    assert_eq!(h.current_id().as_deref(), Some("p1"));
    assert_eq!(h.active().position(), Duration::from_secs(60));
}

#[tokio::test]
async fn bookmark_near_end_is_saved_as_zero() {
    let mut h = Harness::new();
    h.play("podcasts/show").await;
    h.active().set_position(Duration::from_secs(598));

    h.send(Command::SkipToNext).await;

    h.saves().await;
    assert_eq!(h.store.bookmark("p1"), Some(0));
}

#[tokio::test]
async fn restore_prepares_saved_queue_paused() {
    let mut first = Harness::new();
    first.play("albums/1/b").await;
    first.saves().await;
    let (entries, position) = first.store.saved_queue();

    let mut h = Harness::new();
    PersistenceGateway::save_queue(&h.store, &entries, position)
        .await
        .unwrap();
    h.controller.restore().await;

    assert_eq!(h.current_id().as_deref(), Some("b"));
    assert_eq!(h.status(), PlaybackStatus::Paused);
    assert_eq!(h.active().loaded().unwrap().as_str(), "b");
    assert!(!h.active().is_playing());

    h.send(Command::Play).await;
    assert!(h.active().is_playing());
}

// ===== Queue edits =====

#[tokio::test]
async fn removing_only_entry_stops_playback() {
    let mut h = Harness::new();
    h.play("albums/single").await;

    h.send(Command::CustomAction {
        name: "REMOVE".to_string(),
        extras: json!({ "position": 0 }),
    })
    .await;

    assert!(h.controller.queue().is_empty());
    assert_eq!(h.status(), PlaybackStatus::Stopped);
    assert!(!h.active().is_playing());
}

#[tokio::test]
async fn removing_current_entry_plays_following_one() {
    let mut h = Harness::new();
    h.play("albums/1").await;

    h.send(Command::CustomAction {
        name: "REMOVE".to_string(),
        extras: json!({ "position": 0 }),
    })
    .await;

    assert_eq!(h.current_id().as_deref(), Some("b"));
    assert_eq!(h.controller.queue().len(), 2);
    assert!(h.active().is_playing());
}

#[tokio::test]
async fn oversized_relative_offsets_are_ignored() {
    let mut h = Harness::new();
    h.play("albums/1").await;

    for (name, extras) in [
        ("REMOVE_RELATIVE", json!({ "position": u64::MAX })),
        ("SWAP_RELATIVE", json!({ "from": 0, "to": u64::MAX })),
        ("MOVE_RELATIVE", json!({ "position": u64::MAX })),
    ] {
        h.send(Command::CustomAction {
            name: name.to_string(),
            extras,
        })
        .await;
    }
    h.send(Command::RemoveRelative(usize::MAX)).await;
    h.send(Command::MoveRelative {
        from: usize::MAX,
        to: 0,
    })
    .await;

    let ids: Vec<_> = h
        .controller
        .queue()
        .entries()
        .iter()
        .map(|e| e.id.to_string())
        .collect();
    assert_eq!(ids, ["a", "b", "c"]);
    assert_eq!(h.current_id().as_deref(), Some("a"));
    assert_eq!(h.status(), PlaybackStatus::Playing);
    assert!(h.active().is_playing());
}

#[tokio::test]
async fn relative_move_reorders_upcoming_entries() {
    let mut h = Harness::new();
    h.play("albums/1").await;

    h.send(Command::MoveRelative { from: 1, to: 0 }).await;

    let ids: Vec<_> = h
        .controller
        .queue()
        .entries()
        .iter()
        .map(|e| e.id.to_string())
        .collect();
    assert_eq!(ids, ["a", "c", "b"]);
    assert_eq!(h.current_id().as_deref(), Some("a"));
}

#[tokio::test]
async fn play_next_inserts_after_current() {
    let mut h = Harness::new();
    h.play("albums/1").await;

    h.send(Command::AddToPlayNext(vec![TrackId::new("d")])).await;
    h.pump().await;

    let ids: Vec<_> = h
        .controller
        .queue()
        .entries()
        .iter()
        .map(|e| e.id.to_string())
        .collect();
    assert_eq!(ids, ["a", "d", "b", "c"]);
    assert_eq!(h.controller.queue().entries()[1].position, 3);
}

#[tokio::test]
async fn shuffle_mode_toggle_keeps_current_entry() {
    let mut h = Harness::new();
    h.play("albums/1/b").await;

    h.send(Command::SetShuffleMode(ShuffleMode::On)).await;
    assert_eq!(h.controller.queue().current_index(), Some(0));
    assert_eq!(h.current_id().as_deref(), Some("b"));

    h.send(Command::SetShuffleMode(ShuffleMode::Off)).await;
    assert_eq!(h.controller.queue().current_index(), Some(1));
    assert_eq!(h.current_id().as_deref(), Some("b"));
}

// ===== Errors & custom actions =====

#[tokio::test]
async fn repeated_player_errors_settle_stopped() {
    let mut h = Harness::new();
    h.play("albums/1").await;

    h.active().fail(PlayerErrorKind::Source, "bad file");
    h.deliver_backend_events().await;
    assert_eq!(h.current_id().as_deref(), Some("b"));
    assert_eq!(h.status(), PlaybackStatus::Playing);

    h.active().fail(PlayerErrorKind::Source, "bad file");
    h.deliver_backend_events().await;
    assert_eq!(h.current_id().as_deref(), Some("c"));

    h.active().fail(PlayerErrorKind::Renderer, "device gone");
    h.deliver_backend_events().await;
    assert_eq!(h.status(), PlaybackStatus::Stopped);
    assert!(h.controller.session().last_error.is_some());
}

#[tokio::test]
async fn unknown_custom_action_is_ignored() {
    let mut h = Harness::new();
    h.play("albums/1").await;

    h.send(Command::CustomAction {
        name: "LAUNCH_ROCKET".to_string(),
        extras: json!({}),
    })
    .await;
    h.send(Command::CustomAction {
        name: "SWAP".to_string(),
        extras: json!({ "from": 1 }),
    })
    .await;

    assert_eq!(h.current_id().as_deref(), Some("a"));
    assert_eq!(h.status(), PlaybackStatus::Playing);
    assert_eq!(h.controller.queue().len(), 3);
}

#[tokio::test]
async fn forward_action_seeks_by_step() {
    let mut h = Harness::new();
    h.play("albums/1").await;
    h.active().set_position(Duration::from_secs(20));

    h.send(Command::CustomAction {
        name: "FORWARD_30".to_string(),
        extras: json!({}),
    })
    .await;
    assert_eq!(h.active().position(), Duration::from_secs(50));

    h.send(Command::CustomAction {
        name: "REPLAY_10".to_string(),
        extras: json!({}),
    })
    .await;
    assert_eq!(h.active().position(), Duration::from_secs(40));
}

// ===== Focus & favorites =====

#[tokio::test]
async fn transient_focus_loss_resumes_on_gain() {
    let mut h = Harness::new();
    h.play("albums/1").await;

    h.send(Command::AudioFocus(FocusChange::LossTransient)).await;
    assert_eq!(h.status(), PlaybackStatus::Paused);
    assert!(!h.active().is_playing());

    h.send(Command::AudioFocus(FocusChange::Gain)).await;
    assert_eq!(h.status(), PlaybackStatus::Playing);
    assert!(h.active().is_playing());
}

#[tokio::test]
async fn permanent_focus_loss_does_not_resume() {
    let mut h = Harness::new();
    h.play("albums/1").await;

    h.send(Command::AudioFocus(FocusChange::Loss)).await;
    h.send(Command::AudioFocus(FocusChange::Gain)).await;

    assert_eq!(h.status(), PlaybackStatus::Paused);
}

#[tokio::test]
async fn duck_lowers_volume_until_gain() {
    let mut h = Harness::new();
    h.play("albums/1").await;

    h.send(Command::AudioFocus(FocusChange::Duck)).await;
    assert!((h.active().volume() - 0.2).abs() < f32::EPSILON);

    h.send(Command::AudioFocus(FocusChange::Gain)).await;
    assert!((h.active().volume() - 1.0).abs() < f32::EPSILON);
}

#[tokio::test]
async fn toggle_favorite_updates_gateway() {
    let mut h = Harness::new();
    h.play("albums/1").await;
    let mut changes = h.favorites.subscribe();

    h.send(Command::ToggleFavorite).await;

    let change = tokio::time::timeout(Duration::from_secs(5), changes.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(change.track_id.as_str(), "a");
    assert!(change.is_favorite);
    assert!(h.favorites.contains("a"));
}

// ===== Teardown =====

#[tokio::test]
async fn shutdown_releases_both_players() {
    let mut h = Harness::new();
    h.play("albums/1").await;

    h.controller.shutdown();

    assert!(h.monitors.iter().all(FakePlayerMonitor::is_released));
    assert_eq!(h.status(), PlaybackStatus::Stopped);
}

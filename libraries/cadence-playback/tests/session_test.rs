//! End-to-end session lifecycle tests

use cadence_core::{PersistenceGateway, PlaybackStatus, QueueEntry};
use cadence_playback::testing::{
    song, FakePlayer, FakePlayerMonitor, InMemoryFavorites, InMemoryPersistence, InMemoryRetriever,
    RecordingRenderer, RendererCall,
};
use cadence_playback::{Collaborators, Command, PlaybackConfig, PlaybackEvent, Session};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

struct Running {
    session: Session,
    monitors: Arc<Mutex<Vec<FakePlayerMonitor>>>,
    store: InMemoryPersistence,
    renderer: RecordingRenderer,
}

fn start(store: InMemoryPersistence) -> Running {
    let library = InMemoryRetriever::new();
    library.insert("albums/1", vec![song("a", "X"), song("b", "Y")]);
    let renderer = RecordingRenderer::new();
    let monitors = Arc::new(Mutex::new(Vec::new()));

    let captured = Arc::clone(&monitors);
    let session = Session::start(
        PlaybackConfig::default(),
        move |sinks| {
            let (players, monitors) = FakePlayer::pair(sinks);
            captured.lock().unwrap().extend(monitors);
            players
        },
        Collaborators {
            retriever: Arc::new(library),
            persistence: Arc::new(store.clone()),
            favorites: Arc::new(InMemoryFavorites::new()),
        },
        Box::new(renderer.clone()),
    );

    Running {
        session,
        monitors,
        store,
        renderer,
    }
}

async fn wait_for_status(events: &mut broadcast::Receiver<PlaybackEvent>, wanted: PlaybackStatus) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(PlaybackEvent::StateChanged { session }) = events.recv().await {
                if session.status == wanted {
                    return;
                }
            }
        }
    })
    .await
    .expect("status never reached");
}

#[tokio::test]
async fn play_then_stop_releases_everything() {
    let running = start(InMemoryPersistence::new());
    let mut events = running.session.subscribe();

    running
        .session
        .send(Command::PlayFromSelection {
            selector: "albums/1".parse().unwrap(),
            filter: None,
        })
        .unwrap();
    wait_for_status(&mut events, PlaybackStatus::Playing).await;

    let sender = running.session.sender();
    running.session.stop().await;

    assert!(running
        .monitors
        .lock()
        .unwrap()
        .iter()
        .all(FakePlayerMonitor::is_released));
    assert_eq!(
        running.renderer.calls().last(),
        Some(&RendererCall::Demote { remove: true })
    );

    let (entries, position) = running.store.saved_queue();
    assert_eq!(entries.len(), 2);
    assert_eq!(position, 0);
    assert!(running.store.bookmark("a").is_some());

    // Commands after stop are rejected
    assert!(sender.send(Command::Play).is_err());
}

#[tokio::test]
async fn user_stop_removes_notification() {
    let running = start(InMemoryPersistence::new());
    let mut events = running.session.subscribe();

    running
        .session
        .send(Command::PlayFromSelection {
            selector: "albums/1".parse().unwrap(),
            filter: None,
        })
        .unwrap();
    wait_for_status(&mut events, PlaybackStatus::Playing).await;

    running.session.send(Command::Stop).unwrap();
    wait_for_status(&mut events, PlaybackStatus::Stopped).await;

    let removed = Some(&RendererCall::Demote { remove: true });
    tokio::time::timeout(Duration::from_secs(5), async {
        while running.renderer.calls().last() != removed {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("notification was never removed");

    // The pending Stopped render was dropped rather than published
    tokio::time::sleep(Duration::from_millis(500)).await;
    let calls = running.renderer.calls();
    assert_eq!(calls.last(), removed);
    assert!(!calls.contains(&RendererCall::Demote { remove: false }));

    // Still running: playback can start again
    running.session.send(Command::Play).unwrap();
    wait_for_status(&mut events, PlaybackStatus::Playing).await;
    running.session.stop().await;
}

#[tokio::test]
async fn commands_queued_before_stop_are_handled() {
    let running = start(InMemoryPersistence::new());

    running
        .session
        .send(Command::SetRepeatMode(cadence_core::RepeatMode::All))
        .unwrap();
    running.session.stop().await;

    assert_eq!(
        running.store.saved_modes().repeat,
        cadence_core::RepeatMode::All
    );
}

#[tokio::test]
async fn start_restores_saved_queue() {
    let store = InMemoryPersistence::new();
    let entries: Vec<QueueEntry> = [song("a", "X"), song("b", "Y")]
        .into_iter()
        .zip(0u32..)
        .map(|(track, position)| QueueEntry::from_track(track, "albums/1", position))
        .collect();
    store.save_queue(&entries, 1).await.unwrap();

    let running = start(store);
    let mut events = running.session.subscribe();
    wait_for_status(&mut events, PlaybackStatus::Paused).await;

    {
        let monitors = running.monitors.lock().unwrap();
        assert!(monitors
            .iter()
            .any(|p| p.loaded().is_some_and(|id| id.as_str() == "b")));
        assert!(!monitors.iter().any(FakePlayerMonitor::is_playing));
    }

    running.session.send(Command::Play).unwrap();
    wait_for_status(&mut events, PlaybackStatus::Playing).await;
    running.session.stop().await;
}

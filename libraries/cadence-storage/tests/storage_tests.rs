//! Round trips through a real SQLite file

use cadence_core::{
    DataRetriever, FavoriteGateway, PersistenceGateway, PlaybackModes, QueueEntry, RepeatMode,
    SearchFocus, SearchHints, Selector, ShuffleMode, Track, TrackId,
};
use cadence_storage::library::{self, NewTrack};
use cadence_storage::{create_pool, run_migrations, SqliteLibrary, SqliteStore};
use sqlx::SqlitePool;
use tempfile::TempDir;
use url::Url;

async fn setup() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("cadence.db").display());
    let pool = create_pool(&url).await.unwrap();
    run_migrations(&pool).await.unwrap();
    (dir, pool)
}

fn entry(id: &str, position: u32) -> QueueEntry {
    let track = Track::new(TrackId::new(id), format!("Song {id}"), 200_000).with_artist("Band");
    QueueEntry::from_track(track, "albums/Debut", position)
}

async fn seed_library(pool: &SqlitePool) {
    let tracks = [
        NewTrack::new(
            Track::new(TrackId::new("1"), "Opening", 180_000)
                .with_artist("Band")
                .with_album("Debut"),
        )
        .with_genre("Rock")
        .with_path("/music/rock/opening.flac")
        .added_at(100),
        NewTrack::new(
            Track::new(TrackId::new("2"), "Closing", 240_000)
                .with_artist("Band")
                .with_album("Debut"),
        )
        .with_genre("Rock")
        .with_path("/music/rock/closing.flac")
        .added_at(300),
        NewTrack::new(
            Track::new(TrackId::new("3"), "Ballad", 200_000)
                .with_artist("Singer")
                .with_album("Solo"),
        )
        .with_genre("Pop")
        .with_path("/music/pop/ballad.mp3")
        .added_at(200),
        NewTrack::new(
            Track::new(TrackId::new("e1"), "Episode 1", 3_600_000)
                .with_artist("Host")
                .with_album("Show")
                .podcast(),
        )
        .added_at(50),
    ];
    for track in &tracks {
        library::upsert_track(pool, track).await.unwrap();
    }
}

fn ids(tracks: &[Track]) -> Vec<&str> {
    tracks.iter().map(|t| t.id.as_str()).collect()
}

// ===== Persistence gateway =====

#[tokio::test]
async fn queue_round_trip_keeps_order_and_position() {
    let (_dir, pool) = setup().await;
    let store = SqliteStore::new(pool);
    let entries = vec![entry("c", 2), entry("a", 0), entry("b", 1)];

    store.save_queue(&entries, 1).await.unwrap();
    let (loaded, position) = store.load_queue().await.unwrap();

    assert_eq!(loaded, entries);
    assert_eq!(position, 1);
}

#[tokio::test]
async fn saving_queue_replaces_previous_one() {
    let (_dir, pool) = setup().await;
    let store = SqliteStore::new(pool);

    store
        .save_queue(&[entry("a", 0), entry("b", 1), entry("c", 2)], 2)
        .await
        .unwrap();
    store.save_queue(&[entry("z", 0)], 0).await.unwrap();

    let (loaded, position) = store.load_queue().await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id.as_str(), "z");
    assert_eq!(position, 0);
}

#[tokio::test]
async fn empty_database_loads_defaults() {
    let (_dir, pool) = setup().await;
    let store = SqliteStore::new(pool);

    assert_eq!(store.load_queue().await.unwrap(), (Vec::new(), 0));
    assert_eq!(store.load_bookmark(&TrackId::new("x")).await.unwrap(), 0);
    assert_eq!(store.load_modes().await.unwrap(), PlaybackModes::default());
}

#[tokio::test]
async fn bookmarks_and_modes_round_trip() {
    let (_dir, pool) = setup().await;
    let store = SqliteStore::new(pool);
    let id = TrackId::new("e1");

    store.save_bookmark(&id, 1_500).await.unwrap();
    store.save_bookmark(&id, 90_000).await.unwrap();
    assert_eq!(store.load_bookmark(&id).await.unwrap(), 90_000);

    let modes = PlaybackModes {
        repeat: RepeatMode::One,
        shuffle: ShuffleMode::On,
    };
    store.save_modes(modes).await.unwrap();
    assert_eq!(store.load_modes().await.unwrap(), modes);
}

#[tokio::test]
async fn data_survives_reopening_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("cadence.db").display());

    {
        let pool = create_pool(&url).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let store = SqliteStore::new(pool.clone());
        store.save_queue(&[entry("a", 0), entry("b", 1)], 1).await.unwrap();
        pool.close().await;
    }

    let pool = create_pool(&url).await.unwrap();
    run_migrations(&pool).await.unwrap();
    let (loaded, position) = SqliteStore::new(pool).load_queue().await.unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(position, 1);
}

// ===== Favorites =====

#[tokio::test]
async fn toggling_favorite_publishes_change() {
    let (_dir, pool) = setup().await;
    let store = SqliteStore::new(pool);
    let mut changes = store.subscribe();
    let id = TrackId::new("1");

    assert!(!store.is_favorite(&id).await.unwrap());
    assert!(store.toggle_favorite(&id).await.unwrap());
    assert!(store.is_favorite(&id).await.unwrap());

    let change = changes.recv().await.unwrap();
    assert_eq!(change.track_id, id);
    assert!(change.is_favorite);

    assert!(!store.toggle_favorite(&id).await.unwrap());
    assert!(!changes.recv().await.unwrap().is_favorite);
}

// ===== Media library =====

#[tokio::test]
async fn resolves_collections_by_category() {
    let (_dir, pool) = setup().await;
    seed_library(&pool).await;
    let lib = SqliteLibrary::new(pool);

    let album = lib
        .resolve(&"albums/Debut".parse().unwrap(), None)
        .await
        .unwrap();
    assert_eq!(ids(&album), ["1", "2"]);

    let genre = lib.resolve(&"genres/Pop".parse().unwrap(), None).await.unwrap();
    assert_eq!(ids(&genre), ["3"]);

    let folder = lib.resolve(&"folders/rock".parse().unwrap(), None).await.unwrap();
    assert_eq!(ids(&folder), ["1", "2"]);

    let songs = lib.resolve(&"songs/all".parse().unwrap(), None).await.unwrap();
    assert_eq!(songs.len(), 4);

    let podcasts = lib.resolve(&"podcasts/Show".parse().unwrap(), None).await.unwrap();
    assert_eq!(ids(&podcasts), ["e1"]);
    assert!(podcasts[0].is_podcast);
}

#[tokio::test]
async fn filter_narrows_collection() {
    let (_dir, pool) = setup().await;
    seed_library(&pool).await;
    let lib = SqliteLibrary::new(pool);

    let tracks = lib
        .resolve(&"artists/Band".parse().unwrap(), Some("clos"))
        .await
        .unwrap();
    assert_eq!(ids(&tracks), ["2"]);
}

#[tokio::test]
async fn playlists_keep_their_order() {
    let (_dir, pool) = setup().await;
    seed_library(&pool).await;
    library::save_playlist(
        &pool,
        "mix",
        "Mix",
        &[TrackId::new("3"), TrackId::new("1")],
    )
    .await
    .unwrap();
    let lib = SqliteLibrary::new(pool);

    let tracks = lib.resolve(&"playlists/mix".parse().unwrap(), None).await.unwrap();
    assert_eq!(ids(&tracks), ["3", "1"]);
}

#[tokio::test]
async fn recently_added_and_most_played_order() {
    let (_dir, pool) = setup().await;
    seed_library(&pool).await;
    library::record_play(&pool, &TrackId::new("3")).await.unwrap();
    library::record_play(&pool, &TrackId::new("3")).await.unwrap();
    library::record_play(&pool, &TrackId::new("1")).await.unwrap();
    let lib = SqliteLibrary::new(pool);
    let songs: Selector = "songs/all".parse().unwrap();

    let recent = lib.resolve_recently_added(&songs).await.unwrap();
    assert_eq!(ids(&recent), ["2", "3", "1", "e1"]);

    let played = lib.resolve_most_played(&songs).await.unwrap();
    assert_eq!(&ids(&played)[..2], ["3", "1"]);
}

#[tokio::test]
async fn search_honors_focus_and_hints() {
    let (_dir, pool) = setup().await;
    seed_library(&pool).await;
    let lib = SqliteLibrary::new(pool);

    let anywhere = lib
        .resolve_by_search("band", &SearchHints::default())
        .await
        .unwrap();
    assert_eq!(anywhere.len(), 2);

    let by_title = lib
        .resolve_by_search(
            "band",
            &SearchHints {
                focus: SearchFocus::Track,
                ..SearchHints::default()
            },
        )
        .await
        .unwrap();
    assert!(by_title.is_empty());

    let hinted = lib
        .resolve_by_search(
            "",
            &SearchHints {
                focus: SearchFocus::Any,
                album: Some("Solo".to_string()),
                ..SearchHints::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(ids(&hinted), ["3"]);
}

#[tokio::test]
async fn resolves_uris_and_ids() {
    let (_dir, pool) = setup().await;
    seed_library(&pool).await;
    let lib = SqliteLibrary::new(pool);

    let file = Url::parse("file:///music/pop/ballad.mp3").unwrap();
    assert_eq!(ids(&lib.resolve_by_uri(&file).await.unwrap()), ["3"]);

    let selector = Url::parse("cadence:albums/Debut").unwrap();
    assert_eq!(ids(&lib.resolve_by_uri(&selector).await.unwrap()), ["1", "2"]);

    let tracks = lib
        .resolve_tracks(&[TrackId::new("2"), TrackId::new("missing"), TrackId::new("1")])
        .await
        .unwrap();
    assert_eq!(ids(&tracks), ["2", "1"]);
}

use crossbeam_channel::{unbounded, Receiver};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tempokv::Store;
use tempoqueue::{
    Access, ModifyPlaylistListener, MusicItem, Playlist, PlaylistChange, PlaylistManager,
};

const NAMESPACE: &str = "tests.PlayerService";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Crée un store temporaire et un manager éditable
fn create_test_manager() -> (TempDir, Store, PlaylistManager) {
    init_tracing();
    let temp_dir = tempfile::tempdir().unwrap();
    let store = Store::new(temp_dir.path());
    let manager = PlaylistManager::open(&store, NAMESPACE, Access::ReadWrite).unwrap();
    (temp_dir, store, manager)
}

fn item(id: &str) -> MusicItem {
    MusicItem::new(id, format!("Title {id}"), format!("file:///music/{id}.flac"))
}

fn items(ids: &[&str]) -> Vec<MusicItem> {
    ids.iter().map(|id| item(id)).collect()
}

fn ids(playlist: &Playlist) -> Vec<String> {
    playlist.iter().map(|i| i.id().to_string()).collect()
}

/// Enregistre un listener qui recopie les changements dans un canal
fn record_changes(manager: &PlaylistManager) -> Receiver<PlaylistChange> {
    let (tx, rx) = unbounded();
    manager.set_on_modify_playlist_listener(Some(Arc::new(move |change: &PlaylistChange| {
        let _ = tx.send(change.clone());
    })));
    rx
}

fn seed(manager: &PlaylistManager, ids: &[&str]) {
    manager.replace_playlist(Playlist::new(items(ids)));
    manager.flush();
}

#[test]
fn test_empty_manager() {
    let (_temp_dir, _store, manager) = create_test_manager();

    assert_eq!(manager.playlist_size(), 0);
    assert!(manager.playlist().is_empty());
    assert!(manager.is_editable());
    assert_eq!(manager.namespace_id(), NAMESPACE);
}

#[test]
fn test_append_all_to_empty_playlist() {
    let (_temp_dir, _store, manager) = create_test_manager();
    let changes = record_changes(&manager);

    manager.append_all_music_item(items(&["a", "b", "c"]));
    manager.flush();

    assert_eq!(manager.playlist_size(), 3);
    assert_eq!(ids(&manager.playlist()), ["a", "b", "c"]);
    assert_eq!(
        changes.try_iter().collect::<Vec<_>>(),
        vec![PlaylistChange::Inserted {
            position: 0,
            count: 3
        }]
    );
}

#[test]
fn test_append_reports_old_size() {
    let (_temp_dir, _store, manager) = create_test_manager();
    seed(&manager, &["a", "b"]);
    let changes = record_changes(&manager);

    manager.append_music_item(item("c"));
    manager.flush();

    assert_eq!(ids(&manager.playlist()), ["a", "b", "c"]);
    assert_eq!(
        changes.recv().unwrap(),
        PlaylistChange::Inserted {
            position: 2,
            count: 1
        }
    );
}

#[test]
fn test_move_item() {
    let (_temp_dir, _store, manager) = create_test_manager();
    seed(&manager, &["a", "b", "c", "d"]);
    let changes = record_changes(&manager);

    manager.move_music_item(0, 2);
    manager.flush();

    assert_eq!(ids(&manager.playlist()), ["b", "c", "a", "d"]);
    assert_eq!(
        changes.try_iter().collect::<Vec<_>>(),
        vec![PlaylistChange::Moved { from: 0, to: 2 }]
    );
}

#[test]
fn test_move_to_same_position_is_noop() {
    let (_temp_dir, _store, manager) = create_test_manager();
    seed(&manager, &["a", "b", "c"]);
    let changes = record_changes(&manager);

    manager.move_music_item(1, 1);
    manager.flush();

    assert_eq!(ids(&manager.playlist()), ["a", "b", "c"]);
    assert!(changes.try_recv().is_err());
}

#[test]
fn test_remove_items() {
    let (_temp_dir, _store, manager) = create_test_manager();
    seed(&manager, &["a", "b", "c", "d"]);
    let changes = record_changes(&manager);

    manager.remove_music_item(vec![1, 3]);
    manager.flush();

    assert_eq!(ids(&manager.playlist()), ["a", "c"]);
    assert_eq!(manager.playlist_size(), 2);
    assert_eq!(
        changes.try_iter().collect::<Vec<_>>(),
        vec![PlaylistChange::Removed {
            positions: vec![1, 3]
        }]
    );
}

#[test]
fn test_remove_keeps_other_duplicates() {
    let (_temp_dir, _store, manager) = create_test_manager();
    let a = item("a").with_extra("take", "1");
    let b = item("b");
    manager.replace_playlist(Playlist::new(vec![a.clone(), b.clone(), a.clone(), b.clone()]));

    manager.remove_music_item(vec![2]);
    manager.flush();

    assert_eq!(manager.playlist().into_items(), vec![a, b.clone(), b]);
}

#[test]
fn test_remove_empty_positions_is_noop() {
    let (_temp_dir, _store, manager) = create_test_manager();
    seed(&manager, &["a"]);
    let changes = record_changes(&manager);

    manager.remove_music_item(Vec::new());
    manager.flush();

    assert_eq!(manager.playlist_size(), 1);
    assert!(changes.try_recv().is_err());
}

#[test]
fn test_insert_items() {
    let (_temp_dir, _store, manager) = create_test_manager();
    seed(&manager, &["a", "d"]);
    let changes = record_changes(&manager);

    manager.insert_all_music_item(1, items(&["b", "c"]));
    manager.insert_music_item(0, item("z"));
    manager.flush();

    assert_eq!(ids(&manager.playlist()), ["z", "a", "b", "c", "d"]);
    assert_eq!(
        changes.try_iter().collect::<Vec<_>>(),
        vec![
            PlaylistChange::Inserted {
                position: 1,
                count: 2
            },
            PlaylistChange::Inserted {
                position: 0,
                count: 1
            },
        ]
    );
}

#[test]
fn test_set_playlist_clamps_negative_position() {
    let (_temp_dir, _store, manager) = create_test_manager();
    seed(&manager, &["old"]);
    let changes = record_changes(&manager);

    manager.set_playlist(Playlist::new(items(&["x", "y"])), -5, true);
    manager.flush();

    assert_eq!(ids(&manager.playlist()), ["x", "y"]);
    assert_eq!(
        changes.try_iter().collect::<Vec<_>>(),
        vec![PlaylistChange::Swapped {
            position: 0,
            play_on_prepared: true
        }]
    );
}

#[test]
fn test_set_playlist_keeps_position() {
    let (_temp_dir, _store, manager) = create_test_manager();
    let changes = record_changes(&manager);

    manager.set_playlist(Playlist::new(items(&["x", "y", "z"])), 2, false);
    manager.flush();

    assert_eq!(
        changes.recv().unwrap(),
        PlaylistChange::Swapped {
            position: 2,
            play_on_prepared: false
        }
    );
}

#[test]
fn test_read_only_manager_ignores_mutations() {
    let (_temp_dir, store, writer) = create_test_manager();
    seed(&writer, &["a", "b", "c"]);

    let reader = PlaylistManager::open(&store, NAMESPACE, Access::ReadOnly).unwrap();
    let changes = record_changes(&reader);
    assert!(!reader.is_editable());

    reader.set_playlist(Playlist::new(items(&["x"])), 0, true);
    reader.move_music_item(0, 2);
    reader.append_music_item(item("d"));
    reader.append_all_music_item(items(&["e", "f"]));
    reader.insert_music_item(0, item("g"));
    reader.insert_all_music_item(1, items(&["h"]));
    reader.remove_music_item(vec![0]);
    reader.flush();

    assert_eq!(ids(&reader.playlist()), ["a", "b", "c"]);
    assert_eq!(reader.playlist_size(), 3);
    assert!(changes.try_recv().is_err());
}

#[test]
fn test_read_only_view_follows_writer() {
    let (_temp_dir, store, writer) = create_test_manager();
    let reader = PlaylistManager::open(&store, NAMESPACE, Access::ReadOnly).unwrap();

    writer.append_all_music_item(items(&["a", "b"]));
    writer.flush();

    assert_eq!(reader.playlist_size(), 2);
    assert_eq!(ids(&reader.playlist()), ["a", "b"]);
}

#[test]
fn test_out_of_range_task_is_abandoned() {
    let (_temp_dir, _store, manager) = create_test_manager();
    seed(&manager, &["a", "b"]);
    let changes = record_changes(&manager);

    manager.move_music_item(0, 5);
    manager.insert_music_item(9, item("x"));
    manager.remove_music_item(vec![0, 2]);
    // Le worker continue de servir les tâches suivantes
    manager.append_music_item(item("c"));
    manager.flush();

    assert_eq!(ids(&manager.playlist()), ["a", "b", "c"]);
    assert_eq!(
        changes.try_iter().collect::<Vec<_>>(),
        vec![PlaylistChange::Inserted {
            position: 2,
            count: 1
        }]
    );
}

#[test]
fn test_listener_replace_and_remove() {
    let (_temp_dir, _store, manager) = create_test_manager();
    let first = record_changes(&manager);
    let second = record_changes(&manager);

    manager.append_music_item(item("a"));
    manager.flush();
    assert!(first.try_recv().is_err());
    assert_eq!(second.try_iter().count(), 1);

    manager.set_on_modify_playlist_listener(None);
    manager.append_music_item(item("b"));
    manager.flush();
    assert!(second.try_recv().is_err());
    assert_eq!(manager.playlist_size(), 2);
}

#[test]
fn test_size_matches_content_after_each_task() {
    let (_temp_dir, store, manager) = create_test_manager();
    let observed = PlaylistManager::open(&store, NAMESPACE, Access::ReadOnly).unwrap();
    let (tx, rx) = unbounded();
    manager.set_on_modify_playlist_listener(Some(Arc::new(move |_: &PlaylistChange| {
        let _ = tx.send((observed.playlist_size(), observed.playlist().len()));
    })));

    manager.append_all_music_item(items(&["a", "b", "c"]));
    manager.remove_music_item(vec![0]);
    manager.insert_music_item(1, item("d"));
    manager.replace_playlist(Playlist::default());
    manager.flush();

    let pairs: Vec<_> = rx.try_iter().collect();
    assert_eq!(pairs, vec![(3, 3), (2, 2), (3, 3), (0, 0)]);
}

#[test]
fn test_drop_releases_listener() {
    let (_temp_dir, _store, manager) = create_test_manager();
    let token = Arc::new(());
    let held = token.clone();
    manager.set_on_modify_playlist_listener(Some(Arc::new(move |_: &PlaylistChange| {
        assert!(Arc::strong_count(&held) >= 2);
    })));

    manager.append_all_music_item(items(&["a", "b"]));
    drop(manager);

    assert_eq!(Arc::strong_count(&token), 1);
}

#[test]
fn test_mutations_match_reference_model() {
    let (_temp_dir, _store, manager) = create_test_manager();
    let mut rng = StdRng::seed_from_u64(0x7e57);
    let mut model: Vec<MusicItem> = Vec::new();
    let mut next_id = 0;
    let mut fresh = |count: usize| -> Vec<MusicItem> {
        (0..count)
            .map(|_| {
                next_id += 1;
                item(&next_id.to_string())
            })
            .collect()
    };

    for _ in 0..200 {
        match rng.random_range(0..5) {
            0 => {
                let added = fresh(rng.random_range(0..3));
                model.extend(added.iter().cloned());
                manager.append_all_music_item(added);
            }
            1 => {
                let position = rng.random_range(0..=model.len());
                let added = fresh(rng.random_range(1..3));
                model.splice(position..position, added.iter().cloned());
                manager.insert_all_music_item(position, added);
            }
            2 if !model.is_empty() => {
                let from = rng.random_range(0..model.len());
                let to = rng.random_range(0..model.len());
                let moved = model.remove(from);
                model.insert(to, moved);
                manager.move_music_item(from, to);
            }
            3 if !model.is_empty() => {
                let mut positions: Vec<usize> = (0..rng.random_range(1..3))
                    .map(|_| rng.random_range(0..model.len()))
                    .collect();
                positions.dedup();
                let mut ordered = positions.clone();
                ordered.sort_unstable();
                ordered.dedup();
                for &p in ordered.iter().rev() {
                    model.remove(p);
                }
                manager.remove_music_item(positions);
            }
            4 if rng.random_bool(0.1) => {
                let replacement = fresh(rng.random_range(0..4));
                model = replacement.clone();
                manager.set_playlist(Playlist::new(replacement), 0, false);
            }
            _ => {}
        }
    }
    manager.flush();

    assert_eq!(manager.playlist().into_items(), model);
    assert_eq!(manager.playlist_size(), model.len());
}

#[test]
fn test_playlist_survives_reopen() {
    let (_temp_dir, store, manager) = create_test_manager();
    manager.append_all_music_item(items(&["a", "b"]));
    manager.shutdown();
    drop(manager);

    let reopened = PlaylistManager::open(&store, NAMESPACE, Access::ReadWrite).unwrap();
    assert_eq!(ids(&reopened.playlist()), ["a", "b"]);
    assert_eq!(reopened.playlist_size(), 2);
}

#[test]
fn test_namespaces_are_independent() {
    let (_temp_dir, store, manager) = create_test_manager();
    let other = PlaylistManager::open(&store, "tests.OtherService", Access::ReadWrite).unwrap();

    manager.append_music_item(item("a"));
    other.append_all_music_item(items(&["x", "y"]));
    manager.flush();
    other.flush();

    assert_eq!(manager.playlist_size(), 1);
    assert_eq!(other.playlist_size(), 2);
}

#[test]
fn test_playlist_async_runs_after_pending_edits() {
    let (_temp_dir, _store, manager) = create_test_manager();
    let (tx, rx) = unbounded();

    manager.append_all_music_item(items(&["a", "b"]));
    manager.playlist_async(move |playlist| {
        let _ = tx.send(playlist);
    });

    let playlist = rx.recv().unwrap();
    assert_eq!(ids(&playlist), ["a", "b"]);
}

#[tokio::test]
async fn test_fetch_playlist() {
    let (_temp_dir, _store, manager) = create_test_manager();
    manager.append_all_music_item(items(&["a", "b", "c"]));

    let playlist = manager.fetch_playlist().await.unwrap();
    assert_eq!(playlist.len(), 3);
}

#[tokio::test]
async fn test_subscribe_receives_changes_in_order() {
    let (_temp_dir, _store, manager) = create_test_manager();
    let mut events = manager.subscribe();

    manager.append_all_music_item(items(&["a", "b", "c"]));
    manager.move_music_item(2, 0);
    manager.remove_music_item(vec![1]);

    assert_eq!(
        events.recv().await.unwrap(),
        PlaylistChange::Inserted {
            position: 0,
            count: 3
        }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        PlaylistChange::Moved { from: 2, to: 0 }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        PlaylistChange::Removed { positions: vec![1] }
    );
}

struct RemoteListener {
    changes: AtomicUsize,
    shutdowns: AtomicUsize,
}

impl ModifyPlaylistListener for RemoteListener {
    fn on_playlist_changed(&self, _change: &PlaylistChange) {
        self.changes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_shutdown_drains_and_notifies_listener() {
    let (_temp_dir, _store, manager) = create_test_manager();
    let listener = Arc::new(RemoteListener {
        changes: AtomicUsize::new(0),
        shutdowns: AtomicUsize::new(0),
    });
    manager.set_on_modify_playlist_listener(Some(listener.clone()));

    manager.append_music_item(item("a"));
    manager.append_music_item(item("b"));
    manager.shutdown();

    assert_eq!(listener.changes.load(Ordering::SeqCst), 2);
    assert_eq!(listener.shutdowns.load(Ordering::SeqCst), 1);

    // Après l'arrêt : lectures possibles, modifications abandonnées
    manager.append_music_item(item("c"));
    manager.shutdown();
    assert_eq!(manager.playlist_size(), 2);
    assert_eq!(listener.shutdowns.load(Ordering::SeqCst), 1);
}

#[test]
fn test_namespace_for_service_type() {
    struct PlayerService;
    let id = PlaylistManager::namespace_for::<PlayerService>();
    assert!(id.ends_with("PlayerService"));
}

#[test]
fn test_open_with_config() {
    init_tracing();
    let temp_dir = tempfile::tempdir().unwrap();
    let config = tempoconfig::Config::load_config(temp_dir.path().to_str().unwrap()).unwrap();

    let manager = PlaylistManager::open_with_config(&config, NAMESPACE, Access::ReadWrite).unwrap();
    manager.append_music_item(item("a"));
    manager.flush();

    assert_eq!(manager.playlist_size(), 1);
    assert!(temp_dir.path().join("state").is_dir());
}

//! PlaylistManager : propriétaire unique de la file de lecture persistante

use crate::item::MusicItem;
use crate::listener::{ModifyPlaylistListener, PlaylistChange};
use crate::playlist::edit::Edit;
use crate::playlist::Playlist;
use crate::worker::Worker;
use crate::{Error, Result};
use std::sync::{Arc, PoisonError, RwLock};
use tempokv::{Mode, Namespace, Store};
use tokio::sync::{broadcast, oneshot};

const KEY_PLAYLIST: &str = "playlist";
const KEY_PLAYLIST_SIZE: &str = "playlist_size";

/// Default capacity of the change broadcast channel
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Capability granted to a manager at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Reads only; every mutation request is dropped with a diagnostic.
    ReadOnly,
    /// Reads and mutations.
    ReadWrite,
}

type SharedListener = Arc<dyn ModifyPlaylistListener>;

/// State reachable from worker tasks
struct Shared {
    storage: Namespace,
    listener: RwLock<Option<SharedListener>>,
    event_tx: broadcast::Sender<PlaylistChange>,
}

impl Shared {
    fn load(&self) -> Playlist {
        self.storage.decode_or_default(KEY_PLAYLIST)
    }

    fn size(&self) -> usize {
        self.storage.decode(KEY_PLAYLIST_SIZE, 0)
    }

    /// Content first, then size, in one storage transaction
    fn save(&self, playlist: &Playlist) -> Result<()> {
        self.storage.write_batch(|batch| {
            batch.encode(KEY_PLAYLIST, playlist)?;
            batch.encode(KEY_PLAYLIST_SIZE, &playlist.len())
        })?;
        Ok(())
    }

    /// Read-modify-write of one edit, then notification
    fn commit(&self, edit: Edit) {
        let label = edit.label();
        let mut items = if edit.reads_current() {
            self.load().into_items()
        } else {
            Vec::new()
        };

        let change = match edit.apply(&mut items) {
            Ok(change) => change,
            Err(e) => {
                tracing::error!(
                    namespace = %self.storage.id(),
                    edit = label,
                    error = %e,
                    "Playlist edit abandoned"
                );
                return;
            }
        };

        let playlist = Playlist::new(items);
        if let Err(e) = self.save(&playlist) {
            tracing::error!(
                namespace = %self.storage.id(),
                edit = label,
                error = %e,
                "Failed to persist playlist"
            );
            return;
        }

        tracing::debug!(
            namespace = %self.storage.id(),
            edit = label,
            size = playlist.len(),
            "Playlist committed"
        );
        self.notify(change);
    }

    fn listener(&self) -> Option<SharedListener> {
        self.listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn notify(&self, change: PlaylistChange) {
        if let Some(listener) = self.listener() {
            listener.on_playlist_changed(&change);
        }

        // Diffusion via canal interne (ignoré si aucun abonné)
        let _ = self.event_tx.send(change);
    }
}

struct ManagerInner {
    access: Access,
    shared: Arc<Shared>,
    worker: Worker,
}

/// Owner of the persistent playback queue of one namespace
///
/// All mutations are queued on a dedicated worker thread and applied one at a
/// time in call order, each as a read-modify-write of the stored list followed
/// by a [`PlaylistChange`] notification. Reads run on the caller's thread.
///
/// A manager opened with [`Access::ReadOnly`] serves reads and silently drops
/// mutation requests, which lets a remote controller hold a view of the queue
/// without being able to edit it.
///
/// Cloning yields another handle on the same manager.
///
/// # Example
///
/// ```no_run
/// use tempokv::Store;
/// use tempoqueue::{Access, MusicItem, PlaylistManager};
///
/// # fn main() -> tempoqueue::Result<()> {
/// let store = Store::new("/tmp/tempo-state");
/// let manager = PlaylistManager::open(&store, "player.PlayerService", Access::ReadWrite)?;
///
/// manager.set_on_modify_playlist_listener(Some(std::sync::Arc::new(
///     |change: &tempoqueue::PlaylistChange| println!("{change:?}"),
/// )));
/// manager.append_music_item(MusicItem::new("1", "Song", "file:///song.flac"));
/// manager.flush();
///
/// assert_eq!(manager.playlist_size(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PlaylistManager {
    inner: Arc<ManagerInner>,
}

impl PlaylistManager {
    /// Opens the queue stored under `namespace_id`
    ///
    /// The namespace is opened in multi-process mode so other processes may
    /// read the queue while this one writes it.
    pub fn open(store: &Store, namespace_id: &str, access: Access) -> Result<Self> {
        Self::open_with_capacity(store, namespace_id, access, DEFAULT_EVENT_CAPACITY)
    }

    /// Same as [`PlaylistManager::open`] with an explicit broadcast capacity
    pub fn open_with_capacity(
        store: &Store,
        namespace_id: &str,
        access: Access,
        event_capacity: usize,
    ) -> Result<Self> {
        let storage = store.open(namespace_id, Mode::MultiProcess)?;
        let worker = Worker::spawn(format!("tempoqueue-{namespace_id}"))?;
        let (event_tx, _) = broadcast::channel(event_capacity.max(1));

        tracing::info!(namespace = namespace_id, ?access, "Playlist manager opened");

        Ok(Self {
            inner: Arc::new(ManagerInner {
                access,
                shared: Arc::new(Shared {
                    storage,
                    listener: RwLock::new(None),
                    event_tx,
                }),
                worker,
            }),
        })
    }

    /// Opens the queue using the store and tunables of `config`
    #[cfg(feature = "tempoconfig")]
    pub fn open_with_config(
        config: &tempoconfig::Config,
        namespace_id: &str,
        access: Access,
    ) -> Result<Self> {
        use crate::config_ext::QueueConfigExt;

        let store = config.queue_store()?;
        let capacity = config.get_playlist_event_capacity()?;
        tracing::debug!(
            namespace = namespace_id,
            config_dir = config.dir(),
            capacity,
            "Opening playlist manager from configuration"
        );
        Self::open_with_capacity(&store, namespace_id, access, capacity)
    }

    /// Opens the queue using the process-wide configuration
    ///
    /// See [`tempoconfig::get_config`] for how the configuration directory is
    /// found.
    #[cfg(feature = "tempoconfig")]
    pub fn open_default(namespace_id: &str, access: Access) -> Result<Self> {
        let config = tempoconfig::get_config();
        Self::open_with_config(&config, namespace_id, access)
    }

    /// Conventional namespace id of the queue owned by service type `S`
    pub fn namespace_for<S: ?Sized>() -> &'static str {
        std::any::type_name::<S>()
    }

    pub fn namespace_id(&self) -> &str {
        self.inner.shared.storage.id()
    }

    /// Returns true if mutations are accepted
    pub fn is_editable(&self) -> bool {
        self.inner.access == Access::ReadWrite
    }

    pub fn access(&self) -> Access {
        self.inner.access
    }

    /// Replaces (or with `None` removes) the change listener
    ///
    /// The manager owns the listener until it is replaced or the manager is
    /// dropped. A listener must not hold a clone of this manager: the cycle
    /// keeps the worker thread and the storage connection alive forever. Open
    /// a separate [`Access::ReadOnly`] view when the listener needs to read
    /// the queue.
    pub fn set_on_modify_playlist_listener(&self, listener: Option<Arc<dyn ModifyPlaylistListener>>) {
        *self
            .inner
            .shared
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = listener;
    }

    /// Receives every committed change, independently of the listener
    pub fn subscribe(&self) -> broadcast::Receiver<PlaylistChange> {
        self.inner.shared.event_tx.subscribe()
    }

    /// Size of the stored queue (0 if never written)
    ///
    /// Reads a single small key; cheap enough for latency-sensitive callers.
    pub fn playlist_size(&self) -> usize {
        self.inner.shared.size()
    }

    /// Decodes the whole stored queue (empty if never written)
    ///
    /// Performs storage I/O on the calling thread; prefer
    /// [`PlaylistManager::playlist_async`] or [`PlaylistManager::fetch_playlist`]
    /// from latency-sensitive code.
    pub fn playlist(&self) -> Playlist {
        self.inner.shared.load()
    }

    /// Decodes the queue on the worker and hands it to `callback` there
    pub fn playlist_async<F>(&self, callback: F)
    where
        F: FnOnce(Playlist) + Send + 'static,
    {
        let shared = self.inner.shared.clone();
        if !self.inner.worker.execute(move || callback(shared.load())) {
            tracing::warn!(namespace = %self.namespace_id(), "Worker stopped, playlist read dropped");
        }
    }

    /// Async flavour of [`PlaylistManager::playlist_async`]
    ///
    /// Resolves after every mutation queued before the call is committed.
    pub async fn fetch_playlist(&self) -> Result<Playlist> {
        let (tx, rx) = oneshot::channel();
        self.playlist_async(move |playlist| {
            let _ = tx.send(playlist);
        });
        rx.await
            .map_err(|_| Error::WorkerStopped(self.namespace_id().to_string()))
    }

    /// Replaces the whole queue
    ///
    /// Listeners receive `Swapped` with `position` clamped to 0 when negative.
    pub fn set_playlist(&self, playlist: Playlist, position: i64, play_on_prepared: bool) {
        if !self.check_editable("set_playlist") {
            return;
        }

        let position = usize::try_from(position.max(0)).unwrap_or(usize::MAX);
        self.submit(Edit::Replace {
            playlist,
            position,
            play_on_prepared,
        });
    }

    /// Replaces the whole queue, position 0, no autoplay
    pub fn replace_playlist(&self, playlist: Playlist) {
        self.set_playlist(playlist, 0, false);
    }

    /// Moves the item at `from` to `to` (no-op if equal)
    pub fn move_music_item(&self, from: usize, to: usize) {
        if !self.check_editable("move_music_item") {
            return;
        }

        if from == to {
            return;
        }

        self.submit(Edit::Move { from, to });
    }

    pub fn append_music_item(&self, item: MusicItem) {
        self.append_all_music_item(vec![item]);
    }

    pub fn append_all_music_item(&self, items: Vec<MusicItem>) {
        if !self.check_editable("append_all_music_item") {
            return;
        }

        self.submit(Edit::Append { items });
    }

    pub fn insert_music_item(&self, position: usize, item: MusicItem) {
        self.insert_all_music_item(position, vec![item]);
    }

    pub fn insert_all_music_item(&self, position: usize, items: Vec<MusicItem>) {
        if !self.check_editable("insert_all_music_item") {
            return;
        }

        self.submit(Edit::Insert { position, items });
    }

    /// Removes the items at `positions`, indices taken before any removal
    pub fn remove_music_item(&self, positions: Vec<usize>) {
        if positions.is_empty() {
            return;
        }

        if !self.check_editable("remove_music_item") {
            return;
        }

        self.submit(Edit::Remove { positions });
    }

    /// Blocks until every request queued before this call is committed
    ///
    /// Returns immediately when called from a listener.
    pub fn flush(&self) {
        self.inner.worker.flush();
    }

    /// Drains pending requests, stops the worker and tells the listener
    ///
    /// Later mutation requests are dropped. Reads keep working.
    pub fn shutdown(&self) {
        if !self.inner.worker.shutdown() {
            return;
        }

        tracing::info!(namespace = %self.namespace_id(), "Playlist manager shut down");

        if let Some(listener) = self.inner.shared.listener() {
            listener.on_shutdown();
        }
    }

    fn check_editable(&self, operation: &str) -> bool {
        if self.is_editable() {
            return true;
        }

        tracing::warn!(
            namespace = %self.namespace_id(),
            operation,
            "Playlist is not editable, request ignored"
        );
        false
    }

    fn submit(&self, edit: Edit) {
        let label = edit.label();
        let shared = self.inner.shared.clone();
        if !self.inner.worker.execute(move || shared.commit(edit)) {
            tracing::warn!(
                namespace = %self.namespace_id(),
                edit = label,
                "Worker stopped, playlist edit dropped"
            );
        }
    }
}

impl std::fmt::Debug for PlaylistManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaylistManager")
            .field("namespace", &self.namespace_id())
            .field("access", &self.inner.access)
            .field("worker", &self.inner.worker.name())
            .finish()
    }
}

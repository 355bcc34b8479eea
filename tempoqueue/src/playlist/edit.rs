//! Edit : une mutation de playlist appliquée par le worker

use crate::item::MusicItem;
use crate::listener::PlaylistChange;
use crate::playlist::Playlist;
use crate::{Error, Result};

/// One queued mutation
///
/// Positions are checked against the list read by the worker, never on the
/// caller's thread. An edit that fails leaves `items` untouched.
#[derive(Debug)]
pub(crate) enum Edit {
    Replace {
        playlist: Playlist,
        position: usize,
        play_on_prepared: bool,
    },
    Move {
        from: usize,
        to: usize,
    },
    Append {
        items: Vec<MusicItem>,
    },
    Insert {
        position: usize,
        items: Vec<MusicItem>,
    },
    Remove {
        positions: Vec<usize>,
    },
}

impl Edit {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Edit::Replace { .. } => "replace",
            Edit::Move { .. } => "move",
            Edit::Append { .. } => "append",
            Edit::Insert { .. } => "insert",
            Edit::Remove { .. } => "remove",
        }
    }

    /// False when the edit does not depend on the stored list
    pub(crate) fn reads_current(&self) -> bool {
        !matches!(self, Edit::Replace { .. })
    }

    /// Applies the edit and describes it for listeners
    pub(crate) fn apply(self, items: &mut Vec<MusicItem>) -> Result<PlaylistChange> {
        match self {
            Edit::Replace {
                playlist,
                position,
                play_on_prepared,
            } => {
                *items = playlist.into_items();
                Ok(PlaylistChange::Swapped {
                    position,
                    play_on_prepared,
                })
            }
            Edit::Move { from, to } => {
                check_index(from, items.len())?;
                check_index(to, items.len())?;

                let item = items.remove(from);
                items.insert(to, item);
                Ok(PlaylistChange::Moved { from, to })
            }
            Edit::Append { items: added } => {
                let position = items.len();
                let count = added.len();
                items.extend(added);
                Ok(PlaylistChange::Inserted { position, count })
            }
            Edit::Insert {
                position,
                items: added,
            } => {
                if position > items.len() {
                    return Err(Error::IndexOutOfRange {
                        index: position,
                        len: items.len(),
                    });
                }

                let count = added.len();
                items.splice(position..position, added);
                Ok(PlaylistChange::Inserted { position, count })
            }
            Edit::Remove { positions } => {
                for &position in &positions {
                    check_index(position, items.len())?;
                }

                // Retrait par index d'origine, du plus grand au plus petit
                let mut ordered = positions.clone();
                ordered.sort_unstable();
                ordered.dedup();
                for &position in ordered.iter().rev() {
                    items.remove(position);
                }

                Ok(PlaylistChange::Removed { positions })
            }
        }
    }
}

fn check_index(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(Error::IndexOutOfRange { index, len })
    }
}

use crate::model::{Playlist, QueueEntry};
use crate::queue::QueueStore;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QueueMode {
    /// The queue is an ephemeral session, not tied to a saved playlist.
    #[default]
    Temporary,
    /// The queue mirrors the playlist with this id.
    Bound(String),
}

/// Tag for work started under one mode. Any transition issues a new token,
/// so results carrying an older token no longer apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SessionToken(u64);

impl SessionToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct ModeController {
    mode: QueueMode,
    holding: Option<Vec<QueueEntry>>,
    token: SessionToken,
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> &QueueMode {
        &self.mode
    }

    pub fn is_temporary(&self) -> bool {
        self.mode == QueueMode::Temporary
    }

    pub fn bound_playlist(&self) -> Option<&str> {
        match &self.mode {
            QueueMode::Bound(id) => Some(id.as_str()),
            QueueMode::Temporary => None,
        }
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }

    pub fn holding(&self) -> Option<&[QueueEntry]> {
        self.holding.as_deref()
    }

    /// Loads `playlist` into the queue. A Temporary queue with entries is
    /// held aside first; switching between two playlists goes through
    /// Temporary so that the held queue survives.
    pub fn bind(&mut self, queue: &mut QueueStore, playlist: &Playlist) {
        if !self.is_temporary() {
            self.unbind(queue);
        }

        self.holding = if queue.is_empty() {
            None
        } else {
            Some(queue.entries().to_vec())
        };
        queue.replace_all(playlist.entries.clone());
        self.mode = QueueMode::Bound(playlist.id.clone());
        self.next_token();
        debug!(
            playlist = %playlist.id,
            held = self.holding.as_ref().map_or(0, Vec::len),
            "bound queue to playlist"
        );
    }

    /// Returns to Temporary, restoring the held queue or leaving it empty.
    /// Returns `false` when already Temporary.
    pub fn unbind(&mut self, queue: &mut QueueStore) -> bool {
        if self.is_temporary() {
            return false;
        }

        let restored = self.holding.take().unwrap_or_default();
        debug!(restored = restored.len(), "switched to temporary queue");
        queue.replace_all(restored);
        self.mode = QueueMode::Temporary;
        self.next_token();
        true
    }

    /// Falls back to Temporary when the deleted playlist is the bound one.
    pub fn on_playlist_deleted(&mut self, id: &str, queue: &mut QueueStore) -> bool {
        if self.bound_playlist() != Some(id) {
            return false;
        }
        self.unbind(queue)
    }

    /// Invalidates outstanding work after the queue was replaced wholesale
    /// without a mode change.
    pub fn note_queue_replaced(&mut self) {
        self.next_token();
    }

    fn next_token(&mut self) {
        self.token = SessionToken(self.token.0.wrapping_add(1));
    }
}

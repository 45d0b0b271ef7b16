use crate::error::{Committed, Error, Result};
use crate::model::{Playlist, QueueEntry};
use crate::repository::PlaylistRepository;
use rand::Rng;
use std::collections::HashSet;
use time::OffsetDateTime;
use tracing::{debug, warn};

const ID_PREFIX: &str = "playlist_";
const ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

/// Named playlists kept on the client. The in-memory list is authoritative;
/// every mutation is written through the repository before returning.
#[derive(Debug)]
pub struct LocalPlaylistStore<R: PlaylistRepository> {
    repository: R,
    playlists: Vec<Playlist>,
    issued_ids: HashSet<String>,
}

impl<R: PlaylistRepository> LocalPlaylistStore<R> {
    pub fn open(repository: R) -> Result<Self> {
        let playlists = repository.load()?;
        let issued_ids = playlists.iter().map(|p| p.id.clone()).collect();
        Ok(Self {
            repository,
            playlists,
            issued_ids,
        })
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn repository_mut(&mut self) -> &mut R {
        &mut self.repository
    }

    /// Playlists in creation order.
    pub fn list(&self) -> &[Playlist] {
        &self.playlists
    }

    pub fn get(&self, id: &str) -> Option<&Playlist> {
        self.playlists.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Playlist> {
        let name = name.trim();
        self.playlists
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn create(&mut self, name: &str, description: &str) -> Result<Committed<String>> {
        self.create_with_entries(name, description, Vec::new())
    }

    /// Creates a playlist already holding `entries`, dropping repeated ids.
    pub fn create_with_entries(
        &mut self,
        name: &str,
        description: &str,
        entries: Vec<QueueEntry>,
    ) -> Result<Committed<String>> {
        validate_name(name)?;

        let id = self.next_id();
        let mut playlist = Playlist::new(id.clone(), name, description, OffsetDateTime::now_utc());
        for entry in entries.into_iter().filter(QueueEntry::has_id) {
            if !playlist.contains(&entry.external_id) {
                playlist.entries.push(entry);
            }
        }

        debug!(id = %id, name = %playlist.name, entries = playlist.entries.len(), "created playlist");
        self.playlists.push(playlist);
        let index = self.playlists.len() - 1;
        Ok(self.commit(index, id))
    }

    pub fn delete(&mut self, id: &str) -> Result<Committed<Playlist>> {
        let index = self.index_of(id)?;
        let removed = self.playlists.remove(index);
        let persisted = self.repository.delete(id);
        log_persistence(&persisted);
        debug!(id = %id, "deleted playlist");
        Ok(Committed::with_persistence(removed, persisted))
    }

    pub fn add_entry(&mut self, id: &str, entry: QueueEntry) -> Result<Committed<AddOutcome>> {
        if !entry.has_id() {
            return Err(Error::validation("entry has no video id"));
        }
        let index = self.index_of(id)?;
        let playlist = &mut self.playlists[index];
        if playlist.contains(&entry.external_id) {
            return Ok(Committed::durable(AddOutcome::AlreadyPresent));
        }

        playlist.entries.push(entry);
        playlist.updated_at = OffsetDateTime::now_utc();
        Ok(self.commit(index, AddOutcome::Added))
    }

    pub fn remove_entry(&mut self, id: &str, external_id: &str) -> Result<Committed<QueueEntry>> {
        let index = self.index_of(id)?;
        let playlist = &mut self.playlists[index];
        let Some(position) = playlist
            .entries
            .iter()
            .position(|entry| entry.external_id == external_id)
        else {
            return Err(Error::not_found("video", external_id));
        };

        let removed = playlist.entries.remove(position);
        playlist.updated_at = OffsetDateTime::now_utc();
        Ok(self.commit(index, removed))
    }

    pub fn move_entry(&mut self, id: &str, from: usize, to: usize) -> Result<Committed<()>> {
        let index = self.index_of(id)?;
        let playlist = &mut self.playlists[index];
        let len = playlist.entries.len();
        if from >= len || to >= len {
            return Err(Error::validation(format!(
                "cannot move entry {from} to {to} in a playlist of {len}"
            )));
        }

        let entry = playlist.entries.remove(from);
        playlist.entries.insert(to, entry);
        playlist.updated_at = OffsetDateTime::now_utc();
        Ok(self.commit(index, ()))
    }

    /// Overwrites the entries, keeping the first occurrence of each id.
    pub fn replace_entries(&mut self, id: &str, entries: Vec<QueueEntry>) -> Result<Committed<usize>> {
        let index = self.index_of(id)?;
        let mut seen = HashSet::new();
        let entries: Vec<QueueEntry> = entries
            .into_iter()
            .filter(|entry| entry.has_id() && seen.insert(entry.external_id.clone()))
            .collect();
        let count = entries.len();

        let playlist = &mut self.playlists[index];
        playlist.entries = entries;
        playlist.updated_at = OffsetDateTime::now_utc();
        Ok(self.commit(index, count))
    }

    pub fn rename(&mut self, id: &str, name: &str) -> Result<Committed<()>> {
        validate_name(name)?;
        let index = self.index_of(id)?;
        let playlist = &mut self.playlists[index];
        playlist.name = name.trim().to_string();
        playlist.updated_at = OffsetDateTime::now_utc();
        Ok(self.commit(index, ()))
    }

    pub fn describe(&mut self, id: &str, description: &str) -> Result<Committed<()>> {
        let index = self.index_of(id)?;
        let playlist = &mut self.playlists[index];
        playlist.description = description.trim().to_string();
        playlist.updated_at = OffsetDateTime::now_utc();
        Ok(self.commit(index, ()))
    }

    /// Counts one more load of the playlist into the main queue.
    pub fn record_play(&mut self, id: &str) -> Result<Committed<u64>> {
        let index = self.index_of(id)?;
        let playlist = &mut self.playlists[index];
        playlist.play_count += 1;
        playlist.last_played_at = Some(OffsetDateTime::now_utc());
        let count = playlist.play_count;
        Ok(self.commit(index, count))
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.playlists
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| Error::not_found("playlist", id))
    }

    fn commit<T>(&mut self, index: usize, value: T) -> Committed<T> {
        let persisted = self.repository.put(&self.playlists[index]);
        log_persistence(&persisted);
        Committed::with_persistence(value, persisted)
    }

    fn next_id(&mut self) -> String {
        let mut rng = rand::rng();
        loop {
            let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
            let suffix: String = (0..ID_SUFFIX_LEN)
                .map(|_| char::from(BASE36[rng.random_range(0..BASE36.len())]))
                .collect();
            let id = format!("{ID_PREFIX}{millis}_{suffix}");
            if self.issued_ids.insert(id.clone()) {
                return id;
            }
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("playlist name cannot be empty"));
    }
    Ok(())
}

fn log_persistence(persisted: &Result<()>) {
    if let Err(err) = persisted {
        warn!("playlist change kept in memory only: {err}");
    }
}

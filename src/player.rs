use crate::autoplay::{AutoplayExtender, ExtensionOutcome};
use crate::dispatch::{ProviderEvent, ProviderRequest};
use crate::error::{Committed, Error, Result};
use crate::mode::{ModeController, QueueMode, SessionToken};
use crate::model::{Playlist, QueueEntry, RepeatMode, Settings, StreamQuality};
use crate::playlists::{AddOutcome, LocalPlaylistStore};
use crate::providers::SearchResults;
use crate::queue::QueueStore;
use crate::repository::PlaylistRepository;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::collections::HashSet;
use std::mem;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    pub external_id: String,
    pub stream_url: String,
}

/// Owns the live queue session and everything that mutates it. Remote work
/// is queued as tagged requests (see `take_requests`) and its results fed
/// back through `handle_event`.
#[derive(Debug)]
pub struct Player<R: PlaylistRepository> {
    queue: QueueStore,
    playlists: LocalPlaylistStore<R>,
    mode: ModeController,
    radio: AutoplayExtender,
    stream_quality: StreamQuality,
    search_max_results: u8,
    search_results: Option<SearchResults>,
    now_playing: Option<NowPlaying>,
    pending_info: HashSet<String>,
    outbox: Vec<ProviderRequest>,
    rng: SmallRng,
    pub dirty: bool,
    pub status: String,
}

impl<R: PlaylistRepository> Player<R> {
    pub fn new(playlists: LocalPlaylistStore<R>, settings: &Settings) -> Self {
        Self {
            queue: QueueStore::new(settings.repeat_mode),
            playlists,
            mode: ModeController::new(),
            radio: AutoplayExtender::new(settings.autoplay_low_water_mark),
            stream_quality: settings.stream_quality,
            search_max_results: settings.search_max_results,
            search_results: None,
            now_playing: None,
            pending_info: HashSet::new(),
            outbox: Vec::new(),
            rng: SmallRng::from_os_rng(),
            dirty: true,
            status: String::from("Ready"),
        }
    }

    pub fn queue(&self) -> &QueueStore {
        &self.queue
    }

    pub fn playlists(&self) -> &LocalPlaylistStore<R> {
        &self.playlists
    }

    pub fn mode(&self) -> &QueueMode {
        self.mode.mode()
    }

    pub fn token(&self) -> SessionToken {
        self.mode.token()
    }

    pub fn autoplay(&self) -> &AutoplayExtender {
        &self.radio
    }

    pub fn search_results(&self) -> Option<&SearchResults> {
        self.search_results.as_ref()
    }

    pub fn now_playing(&self) -> Option<&NowPlaying> {
        self.now_playing.as_ref()
    }

    pub fn stream_quality(&self) -> StreamQuality {
        self.stream_quality
    }

    pub fn set_stream_quality(&mut self, quality: StreamQuality) {
        self.stream_quality = quality;
        self.set_status(&format!("Stream quality: {}", quality.as_query()));
    }

    /// Drains the requests that should be handed to the dispatcher.
    pub fn take_requests(&mut self) -> Vec<ProviderRequest> {
        mem::take(&mut self.outbox)
    }

    pub fn has_pending_requests(&self) -> bool {
        !self.outbox.is_empty()
    }

    // Queue editing

    pub fn add(&mut self, entry: QueueEntry) -> bool {
        let label = entry.display_title().to_string();
        if !self.queue.append(entry) {
            self.set_status("Ignored entry without a video id");
            return false;
        }
        self.set_status(&format!("Queued {label}"));
        self.after_queue_change();
        true
    }

    pub fn play_next(&mut self, entry: QueueEntry) -> bool {
        let label = entry.display_title().to_string();
        if !self.queue.insert_next(entry) {
            self.set_status("Ignored entry without a video id");
            return false;
        }
        self.set_status(&format!("Playing next: {label}"));
        self.after_queue_change();
        true
    }

    /// Queues the `index`-th item of the last search.
    pub fn add_search_result(&mut self, index: usize) -> Result<QueueEntry> {
        let entry = self
            .search_results
            .as_ref()
            .and_then(|results| results.items.get(index))
            .map(|item| item.to_entry())
            .ok_or_else(|| Error::validation(format!("no search result #{}", index + 1)))?;
        self.add(entry.clone());
        Ok(entry)
    }

    pub fn remove(&mut self, index: usize) -> Option<QueueEntry> {
        let was_current = self.queue.current_index() == Some(index);
        let removed = self.queue.remove_at(index)?;
        self.set_status(&format!("Removed {}", removed.display_title()));
        if was_current {
            self.start_current();
        }
        self.after_queue_change();
        Some(removed)
    }

    pub fn move_entry(&mut self, from: usize, to: usize) -> bool {
        if !self.queue.move_to(from, to) {
            self.set_status("Nothing to move");
            return false;
        }
        self.set_status(&format!("Moved {} to {}", from + 1, to + 1));
        self.after_queue_change();
        true
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
        self.mode.note_queue_replaced();
        self.session_changed();
        self.set_status("Queue cleared");
        self.after_queue_change();
    }

    pub fn shuffle(&mut self) {
        self.queue.shuffle_upcoming(&mut self.rng);
        self.set_status("Shuffled upcoming entries");
        self.after_queue_change();
    }

    pub fn set_repeat(&mut self, repeat: RepeatMode) {
        self.queue.set_repeat(repeat);
        self.set_status(&format!("Repeat: {}", repeat.label()));
    }

    pub fn cycle_repeat(&mut self) -> RepeatMode {
        let next = self.queue.repeat().next();
        self.set_repeat(next);
        next
    }

    // Playback

    pub fn select(&mut self, index: usize) -> Option<QueueEntry> {
        let entry = self.queue.select(index).cloned();
        if entry.is_none() {
            self.set_status("No such entry");
            return None;
        }
        self.start_current();
        self.after_queue_change();
        entry
    }

    pub fn next(&mut self) -> Option<QueueEntry> {
        let entry = self.queue.advance().cloned();
        match &entry {
            Some(_) => self.start_current(),
            None => {
                self.now_playing = None;
                self.set_status("End of queue");
            }
        }
        self.after_queue_change();
        entry
    }

    pub fn previous(&mut self) -> Option<QueueEntry> {
        let entry = self.queue.retreat().cloned();
        if entry.is_some() {
            self.start_current();
            self.after_queue_change();
        } else {
            self.set_status("Nothing before this");
        }
        entry
    }

    /// Asks for a fresh stream URL of the current entry.
    pub fn refresh_stream(&mut self) -> bool {
        if self.queue.current().is_none() {
            self.set_status("Nothing is playing");
            return false;
        }
        self.start_current();
        true
    }

    /// Fills in a title or duration learned while playing.
    pub fn resolve_metadata(&mut self, external_id: &str, title: &str, duration_seconds: u32) -> usize {
        let changed = self.queue.resolve_metadata(external_id, title, duration_seconds);
        if changed > 0 {
            self.dirty = true;
        }
        changed
    }

    pub fn search(&mut self, query: &str) -> Result<()> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::validation("search query is required"));
        }
        self.outbox.push(ProviderRequest::Search {
            token: self.mode.token(),
            query: query.to_string(),
            max_results: self.search_max_results,
        });
        self.set_status(&format!("Searching for {query}..."));
        Ok(())
    }

    // Playlists and modes

    pub fn create_playlist(&mut self, name: &str, description: &str) -> Result<Committed<String>> {
        let created = self.playlists.create(name, description)?;
        self.report(&created, &format!("Created playlist {}", name.trim()));
        Ok(created)
    }

    /// Snapshots the live queue into a new playlist. The mode is unchanged.
    pub fn save_queue_as_playlist(&mut self, name: &str, description: &str) -> Result<Committed<String>> {
        if self.queue.is_empty() {
            return Err(Error::validation("the queue is empty"));
        }
        let entries = self.queue.entries().to_vec();
        let created = self.playlists.create_with_entries(name, description, entries)?;
        self.report(&created, &format!("Saved queue as {}", name.trim()));
        Ok(created)
    }

    /// Writes the edited queue back into the playlist it is bound to.
    pub fn save_queue_to_bound_playlist(&mut self) -> Result<Committed<usize>> {
        let Some(id) = self.mode.bound_playlist().map(str::to_string) else {
            return Err(Error::validation("the queue is not bound to a playlist"));
        };
        let entries = self.queue.entries().to_vec();
        let saved = self.playlists.replace_entries(&id, entries)?;
        self.report(&saved, &format!("Saved {} entries to playlist", saved.value));
        Ok(saved)
    }

    pub fn add_to_playlist(&mut self, playlist_id: &str, entry: QueueEntry) -> Result<Committed<AddOutcome>> {
        let label = entry.display_title().to_string();
        let outcome = self.playlists.add_entry(playlist_id, entry)?;
        let message = match outcome.value {
            AddOutcome::Added => format!("Added {label} to playlist"),
            AddOutcome::AlreadyPresent => format!("{label} is already in that playlist"),
        };
        self.report(&outcome, &message);
        Ok(outcome)
    }

    pub fn add_queue_entry_to_playlist(
        &mut self,
        playlist_id: &str,
        index: usize,
    ) -> Result<Committed<AddOutcome>> {
        let entry = self
            .queue
            .get(index)
            .cloned()
            .ok_or_else(|| Error::validation(format!("no queue entry #{}", index + 1)))?;
        self.add_to_playlist(playlist_id, entry)
    }

    pub fn add_current_to_playlist(&mut self, playlist_id: &str) -> Result<Committed<AddOutcome>> {
        let entry = self
            .queue
            .current()
            .cloned()
            .ok_or_else(|| Error::validation("nothing is playing"))?;
        self.add_to_playlist(playlist_id, entry)
    }

    pub fn remove_from_playlist(&mut self, playlist_id: &str, external_id: &str) -> Result<Committed<QueueEntry>> {
        let removed = self.playlists.remove_entry(playlist_id, external_id)?;
        self.report(&removed, &format!("Removed {} from playlist", removed.value.display_title()));
        Ok(removed)
    }

    pub fn rename_playlist(&mut self, playlist_id: &str, name: &str) -> Result<Committed<()>> {
        let renamed = self.playlists.rename(playlist_id, name)?;
        self.report(&renamed, &format!("Renamed playlist to {}", name.trim()));
        Ok(renamed)
    }

    pub fn describe_playlist(&mut self, playlist_id: &str, description: &str) -> Result<Committed<()>> {
        let described = self.playlists.describe(playlist_id, description)?;
        self.report(&described, "Updated playlist description");
        Ok(described)
    }

    /// Binds the queue to a playlist, starts its first entry and counts the
    /// play. The held Temporary queue comes back on `switch_to_temporary`.
    pub fn load_playlist(&mut self, playlist_id: &str) -> Result<Committed<u64>> {
        let playlist: Playlist = self
            .playlists
            .get(playlist_id)
            .cloned()
            .ok_or_else(|| Error::not_found("playlist", playlist_id))?;

        self.mode.bind(&mut self.queue, &playlist);
        self.session_changed();
        let played = self.playlists.record_play(playlist_id)?;
        info!(playlist = %playlist.id, entries = playlist.entries.len(), "playlist loaded");
        self.report(&played, &format!("Loaded {}", playlist.name));

        if !self.queue.is_empty() {
            self.queue.select(0);
            self.start_current();
        }
        self.after_queue_change();
        Ok(played)
    }

    pub fn switch_to_temporary(&mut self) -> bool {
        if !self.mode.unbind(&mut self.queue) {
            self.set_status("Already on the temporary queue");
            return false;
        }
        self.session_changed();
        self.set_status("Switched to temporary queue");
        self.after_queue_change();
        true
    }

    /// Deletes a playlist. Deleting the bound one drops back to Temporary.
    pub fn delete_playlist(&mut self, playlist_id: &str) -> Result<Committed<Playlist>> {
        let deleted = self.playlists.delete(playlist_id)?;
        if self.mode.on_playlist_deleted(playlist_id, &mut self.queue) {
            self.session_changed();
            self.after_queue_change();
        }
        self.report(&deleted, &format!("Deleted {}", deleted.value.name));
        Ok(deleted)
    }

    // Radio

    pub fn radio_on(&mut self) {
        self.radio.enable();
        self.set_status("Radio on");
        self.after_queue_change();
    }

    pub fn radio_off(&mut self) {
        self.radio.disable();
        self.set_status("Radio off");
    }

    /// Restarts the radio from the `index`-th queue entry.
    pub fn radio_seed(&mut self, index: usize) -> Result<()> {
        let seed = self
            .queue
            .get(index)
            .map(|entry| entry.external_id.clone())
            .ok_or_else(|| Error::validation(format!("no queue entry #{}", index + 1)))?;
        self.radio.set_seed(&seed);
        self.set_status(&format!("Radio seeded from {seed}"));
        self.after_queue_change();
        Ok(())
    }

    // Results

    pub fn handle_event(&mut self, event: ProviderEvent) {
        let current = self.mode.token();
        match event {
            ProviderEvent::SearchDone {
                token,
                query,
                results,
            } => {
                if self.is_stale(token, "search") {
                    return;
                }
                self.set_status(&format!("{} results for {query}", results.items.len()));
                self.search_results = Some(results);
            }
            ProviderEvent::SearchFailed {
                token,
                query,
                error,
            } => {
                if self.is_stale(token, "search") {
                    return;
                }
                self.set_status(&format!("Search for {query} failed: {error}"));
            }
            ProviderEvent::VideoInfoReady {
                token,
                external_id,
                info,
            } => {
                self.pending_info.remove(&external_id);
                if self.is_stale(token, "video info") {
                    return;
                }
                self.resolve_metadata(&external_id, &info.title, info.duration_seconds);
            }
            ProviderEvent::VideoInfoFailed {
                token,
                external_id,
                error,
            } => {
                self.pending_info.remove(&external_id);
                if self.is_stale(token, "video info") {
                    return;
                }
                warn!(video = %external_id, "video info lookup failed: {error}");
            }
            ProviderEvent::StreamReady {
                token,
                external_id,
                stream,
            } => {
                if self.is_stale(token, "stream")
                    || self.queue.current().map(|e| e.external_id.as_str())
                        != Some(external_id.as_str())
                {
                    return;
                }
                self.resolve_metadata(&external_id, "", stream.duration_seconds);
                let title = self
                    .queue
                    .current()
                    .map(|entry| entry.display_title().to_string())
                    .unwrap_or_else(|| external_id.clone());
                self.now_playing = Some(NowPlaying {
                    external_id,
                    stream_url: stream.url,
                });
                self.set_status(&format!("Playing {title}"));
            }
            ProviderEvent::StreamFailed {
                token,
                external_id,
                error,
            } => {
                if self.is_stale(token, "stream") {
                    return;
                }
                self.set_status(&format!("Cannot play {external_id}: {error}"));
            }
            ProviderEvent::RelatedDone { request, result } => {
                let outcome = self.radio.complete(&request, result, &mut self.queue, current);
                match outcome {
                    ExtensionOutcome::Appended(0) => self.set_status("Radio has nothing new"),
                    ExtensionOutcome::Appended(count) => {
                        self.set_status(&format!("Radio added {count} videos"));
                        if self.queue.resume_index().is_some() && self.queue.advance().is_some() {
                            self.start_current();
                        }
                    }
                    ExtensionOutcome::Failed => self.set_status("Radio stopped: lookup failed"),
                    ExtensionOutcome::Stale => {}
                }
                self.after_queue_change();
            }
        }
    }

    fn is_stale(&self, token: SessionToken, what: &str) -> bool {
        let stale = token != self.mode.token();
        if stale {
            debug!(
                what,
                token = token.value(),
                current = self.mode.token().value(),
                "dropping result for an old session"
            );
        }
        stale
    }

    fn start_current(&mut self) {
        self.now_playing = None;
        let Some(entry) = self.queue.current() else {
            return;
        };
        let external_id = entry.external_id.clone();
        let label = entry.display_title().to_string();
        self.outbox.push(ProviderRequest::Stream {
            token: self.mode.token(),
            external_id,
            quality: self.stream_quality,
        });
        self.set_status(&format!("Loading {label}..."));
    }

    fn session_changed(&mut self) {
        self.pending_info.clear();
        self.now_playing = None;
        self.radio.restart();
    }

    /// Runs after every queue mutation: looks up missing metadata and lets
    /// the radio top the queue up.
    fn after_queue_change(&mut self) {
        let token = self.mode.token();
        let missing: Vec<String> = self
            .queue
            .entries()
            .iter()
            .filter(|entry| entry.needs_metadata())
            .map(|entry| entry.external_id.clone())
            .collect();
        for external_id in missing {
            if self.pending_info.insert(external_id.clone()) {
                self.outbox.push(ProviderRequest::VideoInfo { token, external_id });
            }
        }

        if let Some(request) = self.radio.evaluate(&self.queue, token) {
            self.outbox.push(ProviderRequest::Related(request));
        }
        self.dirty = true;
    }

    fn report<T>(&mut self, committed: &Committed<T>, message: &str) {
        match &committed.persistence {
            None => self.set_status(message),
            Some(err) => self.set_status(&format!("{message} (not saved: {err})")),
        }
    }

    fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::run_request;
    use crate::providers::StaticCatalog;
    use crate::repository::MemoryRepository;

    fn player() -> Player<MemoryRepository> {
        let store = LocalPlaylistStore::open(MemoryRepository::new()).expect("open store");
        Player::new(store, &Settings::default())
    }

    fn catalog() -> StaticCatalog {
        StaticCatalog::new()
            .with_video("a", "Alpha", 100)
            .with_video("b", "Bravo", 200)
            .with_video("c", "Charlie", 300)
            .with_video("x", "X-ray", 60)
            .with_video("y", "Yankee", 70)
            .with_video("z", "Zulu", 80)
            .with_related("x", &["y", "z"])
    }

    fn pump(player: &mut Player<MemoryRepository>, backend: &StaticCatalog) {
        for _ in 0..32 {
            let requests = player.take_requests();
            if requests.is_empty() {
                return;
            }
            for request in requests {
                player.handle_event(run_request(backend, request));
            }
        }
        panic!("requests kept coming");
    }

    fn ids(player: &Player<MemoryRepository>) -> Vec<&str> {
        player
            .queue()
            .entries()
            .iter()
            .map(|e| e.external_id.as_str())
            .collect()
    }

    #[test]
    fn adding_unknown_metadata_requests_video_info() {
        let mut player = player();
        player.add(QueueEntry::new("a", "", 0));
        pump(&mut player, &catalog());

        let entry = player.queue().get(0).expect("entry");
        assert_eq!(entry.title, "Alpha");
        assert_eq!(entry.duration_seconds, 100);
    }

    #[test]
    fn selecting_requests_stream_and_records_now_playing() {
        let mut player = player();
        player.add(QueueEntry::new("a", "Alpha", 100));
        player.select(0);
        pump(&mut player, &catalog());

        let playing = player.now_playing().expect("playing");
        assert_eq!(playing.external_id, "a");
        assert!(player.status.starts_with("Playing"));
    }

    #[test]
    fn stream_for_previous_entry_is_ignored() {
        let mut player = player();
        player.add(QueueEntry::new("a", "Alpha", 100));
        player.add(QueueEntry::new("b", "Bravo", 200));
        player.select(0);
        let stale = player.take_requests();
        player.next();
        player.take_requests();

        for request in stale {
            player.handle_event(run_request(&catalog(), request));
        }
        assert!(player.now_playing().is_none());
    }

    #[test]
    fn radio_appends_only_new_related_videos() {
        let mut player = player();
        player.add(QueueEntry::new("x", "X-ray", 60));
        player.select(0);
        player.add(QueueEntry::new("y", "Yankee", 70));
        player.radio_on();
        pump(&mut player, &catalog());

        assert_eq!(ids(&player), vec!["x", "y", "z"]);
        let z = player.queue().get(2).expect("z");
        assert_eq!(z.title, "Zulu");
    }

    #[test]
    fn radio_resumes_playback_that_ran_off_the_end() {
        let backend = StaticCatalog::new()
            .with_video("x", "X-ray", 60)
            .with_video("y", "Yankee", 70)
            .with_video("z", "Zulu", 80)
            .with_related("x", &["y"])
            .with_related("y", &["z"]);
        let mut player = player();
        player.add(QueueEntry::new("x", "X-ray", 60));
        player.select(0);
        player.radio_on();
        let in_flight = player.take_requests();

        assert!(player.next().is_none());
        assert!(!player.has_pending_requests());
        for request in in_flight {
            player.handle_event(run_request(&backend, request));
        }
        pump(&mut player, &backend);

        assert_eq!(ids(&player), vec!["x", "y", "z"]);
        assert_eq!(player.queue().current_index(), Some(1));
        assert_eq!(player.now_playing().map(|p| p.external_id.as_str()), Some("y"));
        assert!(player.autoplay().is_exhausted());
    }

    #[test]
    fn radio_failure_is_swallowed() {
        let mut player = player();
        player.add(QueueEntry::new("x", "X-ray", 60));
        player.select(0);
        player.radio_on();
        pump(&mut player, &catalog().failing());

        assert_eq!(ids(&player), vec!["x"]);
        assert!(player.autoplay().is_exhausted());
    }

    #[test]
    fn related_result_after_mode_switch_is_discarded() {
        let mut player = player();
        player.add(QueueEntry::new("x", "X-ray", 60));
        player.select(0);
        player.radio_on();
        let in_flight = player.take_requests();

        let created = player.create_playlist("Chill", "").expect("create");
        player.add_to_playlist(&created.value, QueueEntry::new("a", "Alpha", 100)).expect("add");
        player.load_playlist(&created.value).expect("load");
        player.take_requests();

        for request in in_flight {
            player.handle_event(run_request(&catalog(), request));
        }
        assert_eq!(ids(&player), vec!["a"]);
    }

    #[test]
    fn load_playlist_binds_plays_and_counts() {
        let mut player = player();
        player.add(QueueEntry::new("t", "Temp", 10));
        let id = player
            .save_queue_as_playlist("Saved", "")
            .expect("save")
            .value;
        assert!(player.mode() == &QueueMode::Temporary);

        let plays = player.load_playlist(&id).expect("load");
        assert_eq!(plays.value, 1);
        assert_eq!(player.mode(), &QueueMode::Bound(id.clone()));
        assert_eq!(player.queue().current_index(), Some(0));
        let playlist = player.playlists().get(&id).expect("playlist");
        assert!(playlist.last_played_at.is_some());
    }

    #[test]
    fn save_empty_queue_is_rejected() {
        let mut player = player();
        let err = player.save_queue_as_playlist("Nothing", "").expect_err("empty");
        assert!(err.is_validation());
        assert!(player.playlists().list().is_empty());
    }

    #[test]
    fn bound_edits_are_written_back_explicitly() {
        let mut player = player();
        let id = player.create_playlist("Mix", "").expect("create").value;
        player.add_to_playlist(&id, QueueEntry::new("a", "Alpha", 100)).expect("add a");
        player.add_to_playlist(&id, QueueEntry::new("b", "Bravo", 200)).expect("add b");

        player.load_playlist(&id).expect("load");
        player.remove(1);
        assert_eq!(player.playlists().get(&id).expect("pl").entries.len(), 2);

        let saved = player.save_queue_to_bound_playlist().expect("save back");
        assert_eq!(saved.value, 1);
        assert_eq!(player.playlists().get(&id).expect("pl").entries.len(), 1);
    }

    #[test]
    fn save_back_requires_bound_mode() {
        let mut player = player();
        assert!(player.save_queue_to_bound_playlist().expect_err("temp").is_validation());
    }

    #[test]
    fn deleting_bound_playlist_restores_temporary_queue() {
        let mut player = player();
        player.add(QueueEntry::new("t", "Temp", 10));
        let id = player.create_playlist("Mix", "").expect("create").value;
        player.add_to_playlist(&id, QueueEntry::new("a", "Alpha", 100)).expect("add");
        player.load_playlist(&id).expect("load");

        let deleted = player.delete_playlist(&id).expect("delete");
        assert!(deleted.is_durable());
        assert_eq!(player.mode(), &QueueMode::Temporary);
        assert_eq!(ids(&player), vec!["t"]);
    }

    #[test]
    fn persistence_failure_keeps_change_and_reports_it() {
        let mut player = player();
        let id = player.create_playlist("Mix", "").expect("create").value;
        player.playlists.repository_mut().set_fail_writes(true);

        let added = player
            .add_to_playlist(&id, QueueEntry::new("a", "Alpha", 100))
            .expect("added in memory");
        assert!(!added.is_durable());
        assert!(player.status.contains("not saved"));
        assert!(player.playlists().get(&id).expect("pl").contains("a"));
    }

    #[test]
    fn search_results_can_be_queued() {
        let mut player = player();
        player.search("alpha").expect("search");
        pump(&mut player, &catalog());

        let entry = player.add_search_result(0).expect("queued");
        assert_eq!(entry.external_id, "a");
        assert!(player.add_search_result(5).expect_err("missing").is_validation());
        assert!(player.search("   ").expect_err("empty").is_validation());
    }

    #[test]
    fn next_past_the_end_stops() {
        let mut player = player();
        player.add(QueueEntry::new("a", "Alpha", 100));
        player.select(0);
        assert!(player.next().is_none());
        assert_eq!(player.queue().position(), 1);
        assert!(player.now_playing().is_none());
    }
}

//! Server-side playlist tier: one JSON file per playlist in a directory.
//! Independent of the local playlist store.

use crate::error::{Error, Result};
use crate::model::QueueEntry;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::{info, warn};

const ID_BYTES: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPlaylist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "videos", default)]
    pub entries: Vec<QueueEntry>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default)]
    pub video_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerPlaylistSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub video_count: usize,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<&ServerPlaylist> for ServerPlaylistSummary {
    fn from(playlist: &ServerPlaylist) -> Self {
        Self {
            id: playlist.id.clone(),
            name: playlist.name.clone(),
            description: playlist.description.clone(),
            video_count: playlist.video_count,
            created_at: playlist.created_at,
            updated_at: playlist.updated_at,
        }
    }
}

/// Fields to change; `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct ServerPlaylistUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub entries: Option<Vec<QueueEntry>>,
}

pub fn is_valid_id(id: &str) -> bool {
    id.len() == ID_BYTES * 2
        && id
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

fn new_id() -> String {
    let mut bytes = [0u8; ID_BYTES];
    rand::rng().fill(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug, Clone)]
pub struct ServerPlaylistStore {
    dir: PathBuf,
}

impl ServerPlaylistStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, id: &str) -> Result<PathBuf> {
        if !is_valid_id(id) {
            return Err(Error::validation(format!(
                "playlist id must be 32 lowercase hex characters, got {id:?}"
            )));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    fn persistence(&self, path: &Path, err: io::Error) -> Error {
        Error::persistence(path.display().to_string(), err)
    }

    fn write(&self, path: &Path, playlist: &ServerPlaylist) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|err| self.persistence(&self.dir, err))?;
        let json = serde_json::to_string_pretty(playlist)
            .map_err(|err| self.persistence(path, io::Error::from(err)))?;
        fs::write(path, json).map_err(|err| self.persistence(path, err))
    }

    pub fn create(
        &self,
        name: &str,
        description: &str,
        entries: Vec<QueueEntry>,
    ) -> Result<ServerPlaylist> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("playlist name is required"));
        }

        let mut id = new_id();
        while self.file_for(&id)?.exists() {
            id = new_id();
        }
        let path = self.file_for(&id)?;
        let now = OffsetDateTime::now_utc();
        let entries: Vec<QueueEntry> = entries.into_iter().filter(QueueEntry::has_id).collect();
        let playlist = ServerPlaylist {
            id,
            name: name.to_string(),
            description: description.trim().to_string(),
            video_count: entries.len(),
            entries,
            created_at: now,
            updated_at: now,
        };
        self.write(&path, &playlist)?;
        info!(id = %playlist.id, name = %playlist.name, "server playlist created");
        Ok(playlist)
    }

    pub fn get(&self, id: &str) -> Result<ServerPlaylist> {
        let path = self.file_for(id)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(Error::not_found("playlist", id));
            }
            Err(err) => return Err(self.persistence(&path, err)),
        };
        serde_json::from_str(&raw).map_err(|err| self.persistence(&path, io::Error::from(err)))
    }

    pub fn update(&self, id: &str, update: ServerPlaylistUpdate) -> Result<ServerPlaylist> {
        let mut playlist = self.get(id)?;
        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::validation("playlist name is required"));
            }
            playlist.name = name.to_string();
        }
        if let Some(description) = update.description {
            playlist.description = description.trim().to_string();
        }
        if let Some(entries) = update.entries {
            playlist.entries = entries.into_iter().filter(QueueEntry::has_id).collect();
            playlist.video_count = playlist.entries.len();
        }
        playlist.updated_at = OffsetDateTime::now_utc();

        let path = self.file_for(id)?;
        self.write(&path, &playlist)?;
        Ok(playlist)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let path = self.file_for(id)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(id, "server playlist deleted");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Err(Error::not_found("playlist", id)),
            Err(err) => Err(self.persistence(&path, err)),
        }
    }

    /// Newest first. Files that fail to parse are skipped.
    pub fn list(&self) -> Result<Vec<ServerPlaylistSummary>> {
        let dir = match fs::read_dir(&self.dir) {
            Ok(dir) => dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(self.persistence(&self.dir, err)),
        };

        let mut summaries = Vec::new();
        for entry in dir {
            let entry = entry.map_err(|err| self.persistence(&self.dir, err))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let parsed = fs::read_to_string(&path)
                .map_err(|err| err.to_string())
                .and_then(|raw| {
                    serde_json::from_str::<ServerPlaylist>(&raw).map_err(|err| err.to_string())
                });
            match parsed {
                Ok(playlist) => summaries.push(ServerPlaylistSummary::from(&playlist)),
                Err(err) => warn!(path = %path.display(), "skipping unreadable playlist: {err}"),
            }
        }

        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use time::Duration;

    fn entries() -> Vec<QueueEntry> {
        vec![QueueEntry::new("v1", "One", 60), QueueEntry::new("v2", "Two", 0)]
    }

    #[test]
    fn ids_are_32_lowercase_hex() {
        let id = new_id();
        assert!(is_valid_id(&id), "{id}");
        assert!(!is_valid_id("ABCDEF0123456789ABCDEF0123456789"));
        assert!(!is_valid_id("../../etc/passwd"));
        assert!(!is_valid_id(""));
    }

    #[test]
    fn create_get_update_delete() {
        let dir = tempdir().expect("tempdir");
        let store = ServerPlaylistStore::new(dir.path().join("server"));

        let created = store.create(" Road trip ", "", entries()).expect("create");
        assert_eq!(created.name, "Road trip");
        assert_eq!(created.video_count, 2);
        assert!(dir.path().join("server").join(format!("{}.json", created.id)).exists());

        let fetched = store.get(&created.id).expect("get");
        assert_eq!(fetched, created);

        let updated = store
            .update(
                &created.id,
                ServerPlaylistUpdate {
                    description: Some(String::from("summer")),
                    entries: Some(vec![QueueEntry::new("v3", "Three", 30)]),
                    ..ServerPlaylistUpdate::default()
                },
            )
            .expect("update");
        assert_eq!(updated.name, "Road trip");
        assert_eq!(updated.description, "summer");
        assert_eq!(updated.video_count, 1);

        store.delete(&created.id).expect("delete");
        assert!(store.get(&created.id).expect_err("gone").is_not_found());
        assert!(store.delete(&created.id).expect_err("gone").is_not_found());
    }

    #[test]
    fn malformed_ids_are_rejected_before_touching_disk() {
        let dir = tempdir().expect("tempdir");
        let store = ServerPlaylistStore::new(dir.path());
        assert!(store.get("nope").expect_err("invalid").is_validation());
        assert!(store.delete("../x").expect_err("invalid").is_validation());
    }

    #[test]
    fn create_requires_a_name() {
        let dir = tempdir().expect("tempdir");
        let store = ServerPlaylistStore::new(dir.path());
        assert!(store.create("  ", "", entries()).expect_err("empty").is_validation());
        assert!(store.list().expect("list").is_empty());
    }

    #[test]
    fn list_is_newest_first_and_skips_garbage() {
        let dir = tempdir().expect("tempdir");
        let store = ServerPlaylistStore::new(dir.path());

        let older = store.create("Older", "", Vec::new()).expect("older");
        let newer = store.create("Newer", "", Vec::new()).expect("newer");

        let mut backdated = store.get(&older.id).expect("get");
        backdated.created_at = newer.created_at - Duration::hours(1);
        let path = store.file_for(&older.id).expect("path");
        store.write(&path, &backdated).expect("backdate");
        fs::write(dir.path().join("broken.json"), "{").expect("garbage");

        let listed = store.list().expect("list");
        let names: Vec<&str> = listed.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Newer", "Older"]);
    }

    #[test]
    fn missing_directory_lists_empty() {
        let dir = tempdir().expect("tempdir");
        let store = ServerPlaylistStore::new(dir.path().join("absent"));
        assert!(store.list().expect("list").is_empty());
    }
}

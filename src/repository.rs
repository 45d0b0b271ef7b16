use crate::error::{Error, Result};
use crate::model::Playlist;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// Durable home of the local playlists. Writes go through synchronously;
/// a failed write surfaces as `Error::Persistence`.
pub trait PlaylistRepository {
    fn load(&self) -> Result<Vec<Playlist>>;
    fn get(&self, id: &str) -> Option<Playlist>;
    fn put(&mut self, playlist: &Playlist) -> Result<()>;
    fn delete(&mut self, id: &str) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistDocument {
    #[serde(default)]
    playlists: Vec<Playlist>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    last_updated: Option<OffsetDateTime>,
}

/// Keeps every playlist in one JSON document and rewrites the whole
/// document on each mutation.
#[derive(Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
    playlists: Vec<Playlist>,
}

impl JsonFileRepository {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let playlists = read_document(&path)?.playlists;
        Ok(Self { path, playlists })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn upsert_cached(&mut self, playlist: &Playlist) {
        match self.playlists.iter_mut().find(|p| p.id == playlist.id) {
            Some(existing) => *existing = playlist.clone(),
            None => self.playlists.push(playlist.clone()),
        }
    }

    fn flush(&self) -> Result<()> {
        let document = PlaylistDocument {
            playlists: self.playlists.clone(),
            last_updated: Some(OffsetDateTime::now_utc()),
        };
        write_document(&self.path, &document)
            .map_err(|err| Error::persistence(self.path.display().to_string(), err))
    }
}

impl PlaylistRepository for JsonFileRepository {
    fn load(&self) -> Result<Vec<Playlist>> {
        Ok(self.playlists.clone())
    }

    fn get(&self, id: &str) -> Option<Playlist> {
        self.playlists.iter().find(|p| p.id == id).cloned()
    }

    fn put(&mut self, playlist: &Playlist) -> Result<()> {
        self.upsert_cached(playlist);
        self.flush()
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.playlists.retain(|p| p.id != id);
        self.flush()
    }
}

fn read_document(path: &Path) -> Result<PlaylistDocument> {
    if !path.exists() {
        return Ok(PlaylistDocument::default());
    }

    let raw = fs::read_to_string(path)
        .map_err(|err| Error::persistence(path.display().to_string(), err))?;
    serde_json::from_str(&raw)
        .map_err(|err| Error::persistence(path.display().to_string(), io::Error::from(err)))
}

fn write_document(path: &Path, document: &PlaylistDocument) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    if path.exists() {
        let backup = path.with_extension("json.bak");
        let _ = fs::copy(path, &backup);
    }
    let json = serde_json::to_string_pretty(document)?;
    fs::write(path, json)
}

/// Volatile repository; `set_fail_writes` simulates a full storage quota.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    playlists: Vec<Playlist>,
    fail_writes: bool,
    writes: usize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_playlists(playlists: Vec<Playlist>) -> Self {
        Self {
            playlists,
            ..Self::default()
        }
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    fn check_quota(&mut self) -> Result<()> {
        if self.fail_writes {
            return Err(Error::persistence(
                "memory repository",
                io::Error::other("storage quota exceeded"),
            ));
        }
        self.writes += 1;
        Ok(())
    }
}

impl PlaylistRepository for MemoryRepository {
    fn load(&self) -> Result<Vec<Playlist>> {
        Ok(self.playlists.clone())
    }

    fn get(&self, id: &str) -> Option<Playlist> {
        self.playlists.iter().find(|p| p.id == id).cloned()
    }

    fn put(&mut self, playlist: &Playlist) -> Result<()> {
        self.check_quota()?;
        match self.playlists.iter_mut().find(|p| p.id == playlist.id) {
            Some(existing) => *existing = playlist.clone(),
            None => self.playlists.push(playlist.clone()),
        }
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.check_quota()?;
        self.playlists.retain(|p| p.id != id);
        Ok(())
    }
}

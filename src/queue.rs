use crate::model::{QueueEntry, RepeatMode};
use rand::Rng;
use rand::seq::SliceRandom;

/// Where playback stands inside the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    /// Nothing selected yet (position -1).
    #[default]
    Unset,
    At(usize),
    /// Playback ran past the last entry (position == len).
    Ended,
}

/// Ordered list of entries that are eligible for playback, plus the cursor
/// of the entry currently playing.
#[derive(Debug, Clone, Default)]
pub struct QueueStore {
    entries: Vec<QueueEntry>,
    cursor: Cursor,
    // first entry not yet played once the cursor has ended
    ended_at: usize,
    repeat: RepeatMode,
    revision: u64,
}

impl QueueStore {
    pub fn new(repeat: RepeatMode) -> Self {
        Self {
            repeat,
            ..Self::default()
        }
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&QueueEntry> {
        self.entries.get(index)
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Bumped by every mutation, cursor moves included.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    pub fn set_repeat(&mut self, repeat: RepeatMode) {
        self.repeat = repeat;
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.cursor {
            Cursor::At(index) => Some(index),
            Cursor::Unset | Cursor::Ended => None,
        }
    }

    pub fn current(&self) -> Option<&QueueEntry> {
        self.current_index().and_then(|index| self.entries.get(index))
    }

    /// Integer view of the cursor: -1 when unset, `len` once ended.
    pub fn position(&self) -> isize {
        match self.cursor {
            Cursor::Unset => -1,
            Cursor::At(index) => index as isize,
            Cursor::Ended => self.entries.len() as isize,
        }
    }

    /// Entries left after the current one (`len - cursor - 1`, never negative).
    pub fn remaining(&self) -> usize {
        let remaining = self.entries.len() as isize - self.position() - 1;
        remaining.max(0) as usize
    }

    /// Index `advance` resumes from after playback ended, if entries were
    /// added since.
    pub fn resume_index(&self) -> Option<usize> {
        match self.cursor {
            Cursor::Ended if self.ended_at < self.entries.len() => Some(self.ended_at),
            _ => None,
        }
    }

    pub fn contains(&self, external_id: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.external_id == external_id)
    }

    pub fn append(&mut self, entry: QueueEntry) -> bool {
        if !entry.has_id() {
            return false;
        }
        self.entries.push(entry);
        self.touch();
        true
    }

    /// Inserts right after the current entry so it plays next.
    pub fn insert_next(&mut self, entry: QueueEntry) -> bool {
        if !entry.has_id() {
            return false;
        }
        let at = match self.cursor {
            Cursor::Unset => 0,
            Cursor::At(index) => index + 1,
            Cursor::Ended => self.entries.len(),
        };
        self.entries.insert(at, entry);
        self.touch();
        true
    }

    pub fn remove_at(&mut self, index: usize) -> Option<QueueEntry> {
        if index >= self.entries.len() {
            return None;
        }

        let removed = self.entries.remove(index);
        let len = self.entries.len();
        self.cursor = match self.cursor {
            _ if len == 0 => Cursor::Unset,
            Cursor::At(current) if index < current => Cursor::At(current - 1),
            Cursor::At(current) if index == current => {
                if current < len {
                    Cursor::At(current)
                } else if self.repeat == RepeatMode::All {
                    Cursor::At(0)
                } else {
                    self.ended_at = len;
                    Cursor::Ended
                }
            }
            Cursor::Ended if index < self.ended_at => {
                self.ended_at -= 1;
                Cursor::Ended
            }
            other => other,
        };
        self.touch();
        Some(removed)
    }

    /// Moves one entry with a single splice. The cursor keeps pointing at the
    /// same logical entry, not the same index.
    pub fn move_to(&mut self, from: usize, to: usize) -> bool {
        let len = self.entries.len();
        if from >= len || to >= len {
            return false;
        }
        if from == to {
            return true;
        }

        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        if let Cursor::At(current) = self.cursor {
            let shifted = if current == from {
                to
            } else if from < current && current <= to {
                current - 1
            } else if to <= current && current < from {
                current + 1
            } else {
                current
            };
            self.cursor = Cursor::At(shifted);
        }
        self.touch();
        true
    }

    /// Replaces every entry; entries without an id are dropped and the
    /// cursor is reset.
    pub fn replace_all(&mut self, entries: Vec<QueueEntry>) {
        self.entries = entries.into_iter().filter(QueueEntry::has_id).collect();
        self.cursor = Cursor::Unset;
        self.touch();
    }

    pub fn clear(&mut self) {
        self.replace_all(Vec::new());
    }

    pub fn select(&mut self, index: usize) -> Option<&QueueEntry> {
        if index >= self.entries.len() {
            return None;
        }
        self.cursor = Cursor::At(index);
        self.touch();
        self.entries.get(index)
    }

    pub fn advance(&mut self) -> Option<&QueueEntry> {
        if self.entries.is_empty() {
            self.cursor = Cursor::Unset;
            return None;
        }

        let len = self.entries.len();
        self.cursor = match self.cursor {
            Cursor::Unset => Cursor::At(0),
            Cursor::At(current) if self.repeat == RepeatMode::One => Cursor::At(current),
            Cursor::At(current) if current + 1 < len => Cursor::At(current + 1),
            Cursor::Ended if self.ended_at < len => Cursor::At(self.ended_at),
            Cursor::At(_) | Cursor::Ended if self.repeat == RepeatMode::All => Cursor::At(0),
            Cursor::At(_) | Cursor::Ended => {
                self.ended_at = len;
                Cursor::Ended
            }
        };
        self.touch();
        self.current()
    }

    pub fn retreat(&mut self) -> Option<&QueueEntry> {
        let len = self.entries.len();
        let previous = match self.cursor {
            Cursor::Unset => None,
            Cursor::At(0) if self.repeat == RepeatMode::All => len.checked_sub(1),
            Cursor::At(0) => Some(0),
            Cursor::At(current) => Some(current - 1),
            Cursor::Ended => self.ended_at.min(len).checked_sub(1),
        }?;
        self.cursor = Cursor::At(previous);
        self.touch();
        self.current()
    }

    /// Shuffles the entries after the current one; the current entry and
    /// everything already played keep their places.
    pub fn shuffle_upcoming<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let start = match self.cursor {
            Cursor::Unset => 0,
            Cursor::At(index) => index + 1,
            Cursor::Ended => self.ended_at,
        };
        if start >= self.entries.len() {
            return;
        }
        self.entries[start..].shuffle(rng);
        self.touch();
    }

    /// Fills in a missing title or unknown duration on every entry with this
    /// id. Returns how many entries changed.
    pub fn resolve_metadata(&mut self, external_id: &str, title: &str, duration_seconds: u32) -> usize {
        let mut changed = 0;
        for entry in self
            .entries
            .iter_mut()
            .filter(|entry| entry.external_id == external_id)
        {
            let mut touched = false;
            if entry.title.trim().is_empty() && !title.trim().is_empty() {
                entry.title = title.trim().to_string();
                touched = true;
            }
            if entry.duration_seconds == 0 && duration_seconds > 0 {
                entry.duration_seconds = duration_seconds;
                touched = true;
            }
            if touched {
                changed += 1;
            }
        }
        if changed > 0 {
            self.touch();
        }
        changed
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

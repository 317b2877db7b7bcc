// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The town activity feed: append-only `.events.jsonl`.
//!
//! Writers append one JSON line per event; readers seek to the end and
//! poll. No cross-process lock: appends are line-atomic at the sizes
//! involved and readers tolerate partial trailing lines.

use gt_core::event::ActivityEvent;
use gt_core::town::TownPaths;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Append one event to the feed. Failures are the caller's to log;
/// event emission must not break a dispatch.
pub fn append_event(paths: &TownPaths, event: &ActivityEvent) -> io::Result<()> {
    let path = paths.events_file();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut line = serde_json::to_string(event).map_err(io::Error::other)?;
    line.push('\n');
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}

/// Line-aware tail over the events file.
///
/// Opens at end-of-file and keeps reading as the file grows; a plain
/// scanner would stop at the first EOF, so partial lines are buffered
/// until their newline arrives.
pub struct EventTail {
    file: File,
    partial: String,
}

impl EventTail {
    /// Open the feed and seek to its current end. The file is created
    /// empty when missing so a fresh town can be awaited immediately.
    pub fn open(paths: &TownPaths) -> io::Result<Self> {
        let path = paths.events_file();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;
        file.seek(SeekFrom::End(0))?;
        Ok(Self {
            file,
            partial: String::new(),
        })
    }

    /// Return the next complete line, if one has been appended since
    /// the last call. Non-blocking.
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut chunk = String::new();
        self.file.read_to_string(&mut chunk)?;
        self.partial.push_str(&chunk);

        match self.partial.find('\n') {
            Some(pos) => {
                let line = self.partial[..pos].to_string();
                self.partial.drain(..=pos);
                Ok(Some(line))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
#[path = "activity_tests.rs"]
mod tests;

// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Song file watcher.
//!
//! Watches a song file, or a directory of `.json` songs, and reloads songs
//! when they change on disk. Reloading never touches a running playback
//! session; callers stop playback and rebuild the timing plan themselves.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use super::Song;

/// Events emitted by the song watcher
#[derive(Debug, Clone)]
pub enum SongEvent {
    /// A song file changed and validated
    Reloaded(Box<Song>),
    /// A song file changed but failed to load
    Error(String),
    /// A new file appeared in the watch directory
    FileCreated(PathBuf),
    /// A file was removed from the watch directory
    FileDeleted(PathBuf),
}

/// Song file watcher with debouncing
pub struct SongWatcher {
    _watcher: RecommendedWatcher,
    event_receiver: Receiver<SongEvent>,
    watched_path: PathBuf,
}

impl SongWatcher {
    /// Watch a song file or directory.
    ///
    /// Modifications are collected until `debounce_ms` (default 500) passes
    /// without further changes, then each modified song is reloaded once.
    pub fn new<P: AsRef<Path>>(path: P, debounce_ms: Option<u64>) -> Result<Self> {
        let watched_path = path.as_ref().to_path_buf();
        let debounce_duration = Duration::from_millis(debounce_ms.unwrap_or(500));

        let (event_tx, event_rx): (Sender<SongEvent>, Receiver<SongEvent>) = mpsc::channel();
        let (notify_tx, notify_rx): (Sender<Event>, Receiver<Event>) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    let _ = notify_tx.send(event);
                }
            },
            Config::default(),
        )
        .context("Failed to create file watcher")?;

        let mode = if watched_path.is_dir() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(&watched_path, mode)
            .with_context(|| format!("Failed to watch path {:?}", watched_path))?;
        info!(path = ?watched_path, "watching songs");

        let root = watched_path.clone();
        std::thread::spawn(move || {
            let mut last_event_time: Option<Instant> = None;
            let mut pending_paths: Vec<PathBuf> = Vec::new();

            loop {
                match notify_rx.recv_timeout(Duration::from_millis(100)) {
                    Ok(event) => match event.kind {
                        EventKind::Create(_) => {
                            for path in event.paths {
                                let _ = event_tx.send(SongEvent::FileCreated(path));
                            }
                        }
                        EventKind::Remove(_) => {
                            for path in event.paths {
                                let _ = event_tx.send(SongEvent::FileDeleted(path));
                            }
                        }
                        EventKind::Modify(_) => {
                            for path in event.paths {
                                if !pending_paths.contains(&path) {
                                    pending_paths.push(path);
                                }
                            }
                            last_event_time = Some(Instant::now());
                        }
                        _ => {}
                    },
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        let settled = last_event_time
                            .is_some_and(|last| last.elapsed() >= debounce_duration);
                        if settled {
                            for path in pending_paths.drain(..) {
                                if is_song_path(&path, &root) {
                                    let _ = event_tx.send(reload(&path));
                                }
                            }
                            last_event_time = None;
                        }
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("song watcher thread exiting");
        });

        Ok(Self {
            _watcher: watcher,
            event_receiver: event_rx,
            watched_path,
        })
    }

    /// Try to receive the next event (non-blocking)
    pub fn try_recv(&self) -> Option<SongEvent> {
        self.event_receiver.try_recv().ok()
    }

    /// Receive all pending events
    pub fn recv_all(&self) -> Vec<SongEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv() {
            events.push(event);
        }
        events
    }

    /// Block until the next event is received
    pub fn recv(&self) -> Option<SongEvent> {
        self.event_receiver.recv().ok()
    }

    /// Get the path being watched
    pub fn watched_path(&self) -> &Path {
        &self.watched_path
    }
}

/// JSON files, or the watched path itself
fn is_song_path(path: &Path, root: &Path) -> bool {
    path == root || path.extension().is_some_and(|ext| ext == "json")
}

fn reload(path: &Path) -> SongEvent {
    match Song::load(path) {
        Ok(song) => {
            info!(path = ?path, song = song.name(), "song reloaded");
            SongEvent::Reloaded(Box::new(song))
        }
        Err(e) => {
            warn!(path = ?path, error = %e, "song reload failed");
            SongEvent::Error(format!("Failed to load {:?}: {}", path, e))
        }
    }
}

/// Validate a song file without playing it
pub fn validate_song<P: AsRef<Path>>(path: P) -> Result<Song> {
    let path = path.as_ref();
    Song::load(path).with_context(|| format!("Invalid song file {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::tempdir;

    fn song_json(name: &str, tempo: u32) -> String {
        format!(
            r#"{{ "songName": "{}", "blocks": [
                {{ "type": "verse", "measures": 4, "rootNote": "D", "mode": "Dorian",
                   "tempo": {}, "timeSignature": "4/4" }}
            ] }}"#,
            name, tempo
        )
    }

    #[test]
    fn test_validate_song() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_song.json");
        fs::write(&file_path, song_json("Test Song", 120)).unwrap();

        let song = validate_song(&file_path).unwrap();
        assert_eq!(song.name(), "Test Song");
        assert_eq!(song.block(0).unwrap().tempo(), 120);
    }

    #[test]
    fn test_validate_invalid_song() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("invalid.json");
        fs::write(&file_path, song_json("Bad", 0)).unwrap();

        let err = validate_song(&file_path).unwrap_err();
        assert!(format!("{:#}", err).contains("Block 1: tempo"));
    }

    #[test]
    fn test_song_paths() {
        let root = Path::new("/songs");
        assert!(is_song_path(Path::new("/songs/a.json"), root));
        assert!(!is_song_path(Path::new("/songs/a.yaml"), root));
        assert!(is_song_path(root, root));
    }

    #[test]
    fn test_reload_reports_errors() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("broken.json");
        fs::write(&file_path, "{").unwrap();
        assert!(matches!(reload(&file_path), SongEvent::Error(_)));

        fs::write(&file_path, song_json("Fixed", 90)).unwrap();
        match reload(&file_path) {
            SongEvent::Reloaded(song) => assert_eq!(song.name(), "Fixed"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_watcher_creation() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("watch_test.json"), song_json("Watch", 100)).unwrap();

        let watcher = SongWatcher::new(dir.path(), Some(100)).unwrap();
        assert_eq!(watcher.watched_path(), dir.path());
    }

    #[test]
    fn test_watcher_detects_changes() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("detect_test.json");
        fs::write(&file_path, song_json("Initial", 120)).unwrap();

        let watcher = SongWatcher::new(dir.path(), Some(100)).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        let mut file = fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&file_path)
            .unwrap();
        file.write_all(song_json("Modified", 140).as_bytes()).unwrap();
        file.flush().unwrap();
        drop(file);

        std::thread::sleep(Duration::from_millis(300));

        // Filesystem notification timing varies between platforms, so only
        // check the contents of a reload if one arrived.
        let events = watcher.recv_all();
        if let Some(SongEvent::Reloaded(song)) =
            events.iter().find(|e| matches!(e, SongEvent::Reloaded(_)))
        {
            assert_eq!(song.name(), "Modified");
            assert_eq!(song.block(0).unwrap().tempo(), 140);
        }
    }
}

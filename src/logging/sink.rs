//! Rotating file sinks.
//!
//! Every named sink is owned by one dedicated thread fed through an unbounded
//! channel. Producers only enqueue, so a slow disk never blocks a log call, and
//! the size-check / rotate / write sequence of one sink is serialized without
//! holding a lock across unrelated sinks.
//!
//! Before every append the worker stats the sink's file; at or over the size
//! threshold the file is renamed to `<name>-<timestamp>.log` and a fresh one
//! is opened under the canonical name. Archives always end in `.log`, the
//! structured sink included.

use crate::constants::{STRUCTURED_EXT, STRUCTURED_SINK, TEXT_EXT};
use crate::error::{LogError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

enum SinkCommand {
    Append(String),
    /// Acknowledged once every earlier append has been written
    Flush(mpsc::SyncSender<()>),
}

struct SinkHandle {
    tx: Sender<SinkCommand>,
    worker: JoinHandle<()>,
}

#[derive(Default)]
struct SinkMap {
    handles: HashMap<String, SinkHandle>,
    closed: bool,
}

/// The set of named sinks under one log directory
pub struct SinkSet {
    dir: PathBuf,
    max_bytes: Arc<AtomicU64>,
    sinks: RwLock<SinkMap>,
}

impl SinkSet {
    /// Create the directory (if needed) and an empty sink set
    pub fn new(dir: impl Into<PathBuf>, max_bytes: u64) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| LogError::Io {
            path: dir.clone(),
            source: e,
        })?;

        Ok(Self {
            dir,
            max_bytes: Arc::new(AtomicU64::new(max_bytes)),
            sinks: RwLock::new(SinkMap::default()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Canonical file path of a sink
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, extension_for(name)))
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes.load(Ordering::Relaxed)
    }

    /// Takes effect from the next append on every sink
    pub fn set_max_bytes(&self, max_bytes: u64) {
        self.max_bytes.store(max_bytes, Ordering::Relaxed);
    }

    /// Open a sink eagerly; a no-op if it already exists
    pub fn open(&self, name: &str) -> Result<()> {
        let mut map = self.sinks.write();
        if map.closed {
            return Err(LogError::EngineClosed);
        }
        if !map.handles.contains_key(name) {
            let handle = self.spawn(name)?;
            map.handles.insert(name.to_string(), handle);
        }
        Ok(())
    }

    /// Queue one line (newline appended by the worker). Unknown names are
    /// created on first use. Failures are reported, never returned.
    pub fn append(&self, name: &str, line: &str) {
        {
            let map = self.sinks.read();
            if map.closed {
                return;
            }
            if let Some(handle) = map.handles.get(name) {
                if handle.tx.send(SinkCommand::Append(line.to_string())).is_err() {
                    warn!("Sink '{}' worker is gone, dropping line", name);
                }
                return;
            }
        }

        let mut map = self.sinks.write();
        if map.closed {
            return;
        }
        if !map.handles.contains_key(name) {
            match self.spawn(name) {
                Ok(handle) => {
                    map.handles.insert(name.to_string(), handle);
                }
                Err(e) => {
                    warn!("Cannot open sink '{}': {}", name, e);
                    return;
                }
            }
        }
        if let Some(handle) = map.handles.get(name) {
            if handle.tx.send(SinkCommand::Append(line.to_string())).is_err() {
                warn!("Sink '{}' worker is gone, dropping line", name);
            }
        }
    }

    /// Block until every append queued so far on `name` has been written
    pub fn flush(&self, name: &str) {
        let tx = match self.sinks.read().handles.get(name) {
            Some(handle) => handle.tx.clone(),
            None => return,
        };
        let (ack_tx, ack_rx) = mpsc::sync_channel(1);
        if tx.send(SinkCommand::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }

    /// Flush every open sink
    pub fn flush_all(&self) {
        for name in self.names() {
            self.flush(&name);
        }
    }

    /// Names of the currently open sinks (unordered)
    pub fn names(&self) -> Vec<String> {
        self.sinks.read().handles.keys().cloned().collect()
    }

    /// Drain every queue, flush, and release all file handles.
    /// Later appends are ignored.
    pub fn close(&self) {
        let handles = {
            let mut map = self.sinks.write();
            map.closed = true;
            std::mem::take(&mut map.handles)
        };

        for (name, handle) in handles {
            drop(handle.tx);
            if handle.worker.join().is_err() {
                warn!("Sink '{}' worker panicked", name);
            }
        }
    }

    fn spawn(&self, name: &str) -> Result<SinkHandle> {
        let path = self.path_for(name);
        let file = open_append(&path).map_err(|e| LogError::Io {
            path: path.clone(),
            source: e,
        })?;

        let worker = SinkWorker {
            name: name.to_string(),
            dir: self.dir.clone(),
            path,
            file,
            max_bytes: Arc::clone(&self.max_bytes),
        };

        let (tx, rx) = mpsc::channel::<SinkCommand>();
        let worker = thread::Builder::new()
            .name(format!("loglens-sink-{}", name))
            .spawn(move || worker.run(rx))
            .map_err(|e| LogError::Io {
                path: self.path_for(name),
                source: e,
            })?;

        Ok(SinkHandle { tx, worker })
    }
}

impl Drop for SinkSet {
    fn drop(&mut self) {
        self.close();
    }
}

struct SinkWorker {
    name: String,
    dir: PathBuf,
    path: PathBuf,
    file: File,
    max_bytes: Arc<AtomicU64>,
}

impl SinkWorker {
    fn run(mut self, rx: Receiver<SinkCommand>) {
        for cmd in rx {
            match cmd {
                SinkCommand::Append(line) => self.append(&line),
                SinkCommand::Flush(ack) => {
                    let _ = self.file.flush();
                    let _ = ack.send(());
                }
            }
        }

        if let Err(e) = self.file.flush() {
            warn!("Flush failed on {}: {}", self.path.display(), e);
        }
        debug!("Sink '{}' closed", self.name);
    }

    fn append(&mut self, line: &str) {
        if self.over_threshold() {
            self.rotate();
        }

        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');

        if let Err(e) = self.file.write_all(buf.as_bytes()) {
            warn!("Write failed on {}: {}", self.path.display(), e);
        }
    }

    /// A failed stat counts as "not over"
    fn over_threshold(&self) -> bool {
        match fs::metadata(&self.path) {
            Ok(meta) => meta.len() >= self.max_bytes.load(Ordering::Relaxed),
            Err(_) => false,
        }
    }

    /// On failure the current handle is kept, so the line still lands somewhere.
    fn rotate(&mut self) {
        let archive = archive_path(
            &self.dir,
            &self.name,
            TEXT_EXT,
            &archive_stamp(chrono::Local::now()),
        );

        if let Err(e) = fs::rename(&self.path, &archive) {
            warn!(
                "Rotation of {} failed: {}, keeping current file",
                self.path.display(),
                e
            );
            return;
        }

        match open_append(&self.path) {
            Ok(file) => {
                let _ = self.file.flush();
                self.file = file;
                debug!("Rotated {} -> {}", self.path.display(), archive.display());
            }
            Err(e) => {
                warn!(
                    "Cannot reopen {} after rotation: {}, writing to {}",
                    self.path.display(),
                    e,
                    archive.display()
                );
            }
        }
    }
}

fn extension_for(name: &str) -> &'static str {
    if name == STRUCTURED_SINK {
        STRUCTURED_EXT
    } else {
        TEXT_EXT
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// `2026-10-18 09:15:02.123` with colons and spaces turned into underscores
pub fn archive_stamp(now: chrono::DateTime<chrono::Local>) -> String {
    now.format("%Y-%m-%d %H:%M:%S%.3f")
        .to_string()
        .replace([':', ' '], "_")
}

/// `<name>-<stamp>.<ext>`
pub fn archive_name(name: &str, ext: &str, stamp: &str) -> String {
    format!("{}-{}.{}", name, stamp, ext)
}

/// First free archive path; never overwrites an earlier archive
fn archive_path(dir: &Path, name: &str, ext: &str, stamp: &str) -> PathBuf {
    let first = dir.join(archive_name(name, ext, stamp));
    if !first.exists() {
        return first;
    }

    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{}-{}-{}.{}", name, stamp, n, ext));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

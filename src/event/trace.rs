//! NDJSON Trace Files
//!
//! One JSON object per line. A line carrying a `unit` field is a unit
//! registration (`{unitId, unit, sourceText}`, `unit` as a flat pre-order
//! node list); every other line is an event. Readers route by that field,
//! never by position. Sinks flush after every line.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use super::listener::TraceListener;
use super::trev::Trev;
use crate::ast::{Node, NodeIndex};
use crate::error::{Result, TrevError};
use crate::store::{EventStore, UnitRecord};

/// File extension for trace files
pub const TRACE_EXTENSION: &str = "ndjson";

/// One line of a trace file
#[derive(Debug, Clone, PartialEq)]
pub enum TraceLine {
    Unit(UnitRecord),
    Event(Trev),
}

impl TraceLine {
    /// Parse one line; `line` is 1-based, for diagnostics
    pub fn parse(text: &str, line: usize) -> Result<Self> {
        let malformed = |e: serde_json::Error| TrevError::TraceLine {
            line,
            reason: e.to_string(),
        };
        let value: Value = serde_json::from_str(text).map_err(malformed)?;
        if value.get("unit").is_some() {
            serde_json::from_value(value).map(Self::Unit).map_err(malformed)
        } else {
            serde_json::from_value(value).map(Self::Event).map_err(malformed)
        }
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(match self {
            Self::Unit(unit) => serde_json::to_string(unit)?,
            Self::Event(event) => serde_json::to_string(event)?,
        })
    }
}

/// Read a whole trace into a store, replaying unit registrations in file
/// order. Blank lines are skipped. References are checked lazily, when the
/// store is resolved.
pub fn read_ndjson<R: BufRead>(reader: R) -> Result<EventStore> {
    let mut index = NodeIndex::new();
    let mut events = Vec::new();

    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match TraceLine::parse(&line, n + 1)? {
            TraceLine::Unit(record) => {
                index.add_unit_with_source(&record.unit_id, &record.unit, record.source_text)?
            }
            TraceLine::Event(event) => events.push(event),
        }
    }

    tracing::debug!(
        units = index.unit_count(),
        events = events.len(),
        "Read NDJSON trace"
    );
    Ok(EventStore::new(events, Arc::new(index)))
}

/// Read a trace file from disk
pub fn load_trace(path: &Path) -> Result<EventStore> {
    let file = File::open(path)?;
    read_ndjson(BufReader::new(file))
}

/// Listener writing every registration and event as an NDJSON line.
///
/// Write failures cannot propagate through the listener contract; they are
/// logged and counted, and [`NdjsonSink::flush`] reports the last one.
pub struct NdjsonSink<W: Write + Send> {
    writer: Mutex<BufWriter<W>>,
    failures: AtomicUsize,
    last_error: Mutex<Option<String>>,
}

impl<W: Write + Send> NdjsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            failures: AtomicUsize::new(0),
            last_error: Mutex::new(None),
        }
    }

    pub fn write_line(&self, line: &TraceLine) -> Result<()> {
        let json = line.to_json_string()?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", json)?;
        writer.flush()?;
        Ok(())
    }

    fn write_or_log(&self, line: TraceLine) {
        if let Err(e) = self.write_line(&line) {
            self.failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(error = %e, "Failed to write trace line");
            *self.last_error.lock() = Some(e.to_string());
        }
    }

    /// Number of lines that could not be written
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    /// Flush buffered lines; fails if any earlier line was lost
    pub fn flush(&self) -> Result<()> {
        self.writer.lock().flush()?;
        match self.last_error.lock().take() {
            Some(reason) => Err(self.lost_lines(&reason)),
            None => Ok(()),
        }
    }

    /// Flush and hand back the underlying writer; fails if any line was lost
    pub fn into_inner(self) -> Result<W> {
        if self.failures() > 0 {
            let reason = self.last_error.lock().take().unwrap_or_default();
            return Err(self.lost_lines(&reason));
        }
        self.writer
            .into_inner()
            .into_inner()
            .map_err(|e| TrevError::Io(e.into_error()))
    }

    fn lost_lines(&self, reason: &str) -> TrevError {
        TrevError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("{} trace line(s) lost, last: {}", self.failures(), reason),
        ))
    }
}

impl<W: Write + Send> TraceListener for NdjsonSink<W> {
    fn on_unit_registered(&self, unit_id: &str, unit: &Node, source_text: Option<&str>) {
        self.write_or_log(TraceLine::Unit(UnitRecord {
            unit_id: unit_id.to_string(),
            unit: unit.clone(),
            source_text: source_text.map(str::to_string),
        }));
    }

    fn on_event(&self, event: &Trev) {
        self.write_or_log(TraceLine::Event(event.clone()));
    }
}

/// NDJSON sink backed by a file in a trace directory
pub struct TraceWriter {
    sink: NdjsonSink<File>,
    path: PathBuf,
}

impl TraceWriter {
    /// Create `<dir>/<name>.ndjson`, creating `dir` if needed.
    ///
    /// # Security
    ///
    /// `name` is validated to prevent path traversal: only alphanumeric
    /// characters, hyphens and underscores are allowed.
    pub fn create(dir: &Path, name: &str) -> Result<Self> {
        validate_trace_name(name)?;
        fs::create_dir_all(dir)?;

        let path = dir.join(format!("{}.{}", name, TRACE_EXTENSION));
        let file = File::create(&path)?;

        tracing::info!(path = %path.display(), "Created trace file");

        Ok(Self {
            sink: NdjsonSink::new(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn flush(&self) -> Result<()> {
        self.sink.flush()
    }
}

impl TraceListener for TraceWriter {
    fn on_unit_registered(&self, unit_id: &str, unit: &Node, source_text: Option<&str>) {
        self.sink.on_unit_registered(unit_id, unit, source_text);
    }

    fn on_event(&self, event: &Trev) {
        self.sink.on_event(event);
    }
}

fn validate_trace_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(TrevError::InvalidTraceName {
            reason: "name is empty".to_string(),
        });
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(TrevError::InvalidTraceName {
            reason: format!("'{}' contains characters outside [A-Za-z0-9_-]", name),
        });
    }
    Ok(())
}

/// Information about a trace file
#[derive(Debug)]
pub struct TraceInfo {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: Option<std::time::SystemTime>,
}

/// List trace files in `dir`, newest first. A missing directory is empty.
pub fn list_traces(dir: &Path) -> Result<Vec<TraceInfo>> {
    if !dir.exists() {
        return Ok(vec![]);
    }

    let mut traces = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.extension().map(|e| e == TRACE_EXTENSION).unwrap_or(false) {
            let metadata = entry.metadata()?;
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unknown")
                .to_string();

            traces.push(TraceInfo {
                name,
                path,
                size_bytes: metadata.len(),
                modified: metadata.modified().ok(),
            });
        }
    }

    traces.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
    Ok(traces)
}

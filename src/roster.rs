//! Attendee roster and its CSV storage
//!
//! The roster keeps every header and field of the source file verbatim, so
//! columns this tool does not interpret survive a save. Only the `Scanned`
//! column is touched: normalised to `True`/`False` on load and updated on
//! check-in.

use crate::error::RosterError;
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tempfile::NamedTempFile;

/// Header of the durable served flag
pub const SCANNED_COLUMN: &str = "Scanned";

/// One attendee as seen by the check-in workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attendee {
    /// Roll identifier (primary key, compared as text)
    pub roll: String,
    /// Display name
    pub name: String,
    /// Department label
    pub dept: String,
    /// Already granted service
    pub served: bool,
}

/// Column indices discovered from the header row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    roll: usize,
    name: usize,
    dept: usize,
    scanned: usize,
}

impl Columns {
    fn discover(headers: &[String]) -> Result<(Self, bool), RosterError> {
        // Substring match first, then the conventional header name
        let find = |needle: &str, fallback: &str, skip: &[usize]| {
            let usable = |i: &usize| !skip.contains(i);
            headers
                .iter()
                .enumerate()
                .find(|(i, h)| usable(i) && h.to_lowercase().contains(needle))
                .or_else(|| {
                    headers
                        .iter()
                        .enumerate()
                        .find(|(i, h)| usable(i) && *h == fallback)
                })
                .map(|(i, _)| i)
        };

        let roll =
            find("roll", "Roll Number", &[]).ok_or(RosterError::MissingColumn("roll number"))?;
        let name =
            find("name", "Student Name", &[roll]).ok_or(RosterError::MissingColumn("name"))?;
        let dept = find("dept", "Department", &[roll, name])
            .ok_or(RosterError::MissingColumn("department"))?;

        let (scanned, added) = match headers.iter().position(|h| h == SCANNED_COLUMN) {
            Some(idx) => (idx, false),
            None => (headers.len(), true),
        };

        Ok((
            Self {
                roll,
                name,
                dept,
                scanned,
            },
            added,
        ))
    }
}

/// Ordered collection of attendee rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    columns: Columns,
}

impl Roster {
    /// Parse a roster from CSV with a header row.
    ///
    /// A `Scanned` column is appended, all `False`, when the file has none.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, RosterError> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let mut headers: Vec<String> = rdr.headers()?.iter().map(String::from).collect();
        let (columns, added) = Columns::discover(&headers)?;
        if added {
            headers.push(SCANNED_COLUMN.to_string());
        }

        let mut rows = Vec::new();
        for (idx, record) in rdr.records().enumerate() {
            let record = record?;
            let mut fields: Vec<String> = record.iter().map(String::from).collect();

            // Flags are normalised to True/False on load
            let flag = if added {
                fields.push(String::new());
                false
            } else {
                let raw = &fields[columns.scanned];
                parse_flag(raw).ok_or_else(|| RosterError::InvalidFlag {
                    line: record
                        .position()
                        .map(|p| p.line() as usize)
                        .unwrap_or(idx + 2),
                    value: raw.clone(),
                })?
            };
            fields[columns.scanned] = flag_text(flag).to_string();
            rows.push(fields);
        }

        Ok(Self {
            headers,
            rows,
            columns,
        })
    }

    /// Write the roster as CSV, `Scanned` rendered as `True`/`False`
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), RosterError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    /// Index of the first attendee whose roll identifier equals `roll`
    pub fn find(&self, roll: &str) -> Option<usize> {
        self.rows.iter().position(|row| row[self.columns.roll] == roll)
    }

    /// Attendee at `index` in roster order
    pub fn attendee(&self, index: usize) -> Option<Attendee> {
        let row = self.rows.get(index)?;
        Some(Attendee {
            roll: row[self.columns.roll].clone(),
            name: row[self.columns.name].clone(),
            dept: row[self.columns.dept].clone(),
            served: self.is_served(index),
        })
    }

    /// All attendees in roster order
    pub fn iter(&self) -> impl Iterator<Item = Attendee> + '_ {
        (0..self.rows.len()).filter_map(|i| self.attendee(i))
    }

    /// Number of attendees
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the roster has no attendees
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of attendees already served
    pub fn served_count(&self) -> usize {
        (0..self.rows.len()).filter(|&i| self.is_served(i)).count()
    }

    /// Header row as it will be written
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Roll identifiers appearing more than once, in first-seen order
    pub fn duplicate_rolls(&self) -> Vec<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut order = Vec::new();
        for row in &self.rows {
            let roll = row[self.columns.roll].as_str();
            let count = counts.entry(roll).or_insert(0);
            *count += 1;
            if *count == 2 {
                order.push(roll.to_string());
            }
        }
        order
    }

    pub(crate) fn is_served(&self, index: usize) -> bool {
        self.rows[index][self.columns.scanned] == flag_text(true)
    }

    pub(crate) fn set_served(&mut self, index: usize, served: bool) {
        self.rows[index][self.columns.scanned] = flag_text(served).to_string();
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" | "" => Some(false),
        _ => None,
    }
}

fn flag_text(served: bool) -> &'static str {
    if served { "True" } else { "False" }
}

/// Durable home of the roster
pub trait RosterStore: Send {
    /// Read the whole roster
    fn load(&self) -> Result<Roster, RosterError>;

    /// Replace the stored roster. Must not report success unless the write
    /// is durable.
    fn save(&self, roster: &Roster) -> Result<(), RosterError>;
}

/// Roster stored as a CSV file
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    /// Store backed by the file at `path`
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Path of the roster file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> RosterError {
        RosterError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl RosterStore for CsvStore {
    fn load(&self) -> Result<Roster, RosterError> {
        let file = File::open(&self.path).map_err(|e| self.io_error(e))?;
        Roster::from_reader(file)
    }

    fn save(&self, roster: &Roster) -> Result<(), RosterError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        // Write beside the target, then rename over it
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        roster.write_to(&mut tmp)?;
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;
        Ok(())
    }
}

/// Roster kept in memory as CSV text
///
/// Saves can be made to fail on demand, which is how the persistence-error
/// path is exercised without a real disk fault.
#[derive(Debug, Default)]
pub struct MemoryStore {
    contents: Mutex<Vec<u8>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    /// Store seeded with CSV text
    pub fn new(csv: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(csv.into().into_bytes()),
            ..Self::default()
        }
    }

    /// Make every following save fail (or succeed again)
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Current stored CSV text
    pub fn contents(&self) -> String {
        let contents = self.contents.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&contents).into_owned()
    }
}

impl RosterStore for MemoryStore {
    fn load(&self) -> Result<Roster, RosterError> {
        let contents = self.contents.lock().unwrap_or_else(|e| e.into_inner());
        Roster::from_reader(contents.as_slice())
    }

    fn save(&self, roster: &Roster) -> Result<(), RosterError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(RosterError::Unavailable("saves disabled".to_string()));
        }

        let mut buf = Vec::new();
        roster.write_to(&mut buf)?;
        *self.contents.lock().unwrap_or_else(|e| e.into_inner()) = buf;
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

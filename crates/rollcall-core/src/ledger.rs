//! Ledger store: one CSV file per calendar date, rewritten on every mutation.

use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{AttendanceError, Result};
use crate::storage::{atomic_write, ledger_file_name, parse_ledger_file_name, read_optional};
use crate::types::{AttendanceEvent, Category, DailyLedger, EventIndex, TIME_FORMAT};

pub(crate) const HEADER: [&str; 7] = [
    "name",
    "category",
    "organization",
    "roll_number",
    "purpose",
    "in_time",
    "out_time",
];

/// On-disk row. An empty or missing `out_time` marks an open session.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct LedgerRow {
    name: String,
    category: Category,
    #[serde(alias = "startup", default)]
    organization: String,
    roll_number: String,
    #[serde(default)]
    purpose: String,
    in_time: String,
    #[serde(default)]
    out_time: String,
}

impl From<&AttendanceEvent> for LedgerRow {
    fn from(e: &AttendanceEvent) -> Self {
        Self {
            name: e.name.clone(),
            category: e.category,
            organization: e.organization.clone(),
            roll_number: e.roll_number.clone(),
            purpose: e.purpose.clone(),
            in_time: e.in_time.format(TIME_FORMAT).to_string(),
            out_time: e
                .out_time
                .map(|t| t.format(TIME_FORMAT).to_string())
                .unwrap_or_default(),
        }
    }
}

impl LedgerRow {
    fn into_event(self) -> std::result::Result<AttendanceEvent, String> {
        let in_time = parse_time(&self.in_time)
            .ok_or_else(|| format!("bad in_time {:?} for {}", self.in_time, self.name))?;
        let out_time = match self.out_time.trim() {
            "" => None,
            raw => Some(
                parse_time(raw)
                    .ok_or_else(|| format!("bad out_time {raw:?} for {}", self.name))?,
            ),
        };
        Ok(AttendanceEvent {
            name: self.name,
            category: self.category,
            organization: self.organization,
            roll_number: self.roll_number,
            purpose: self.purpose,
            in_time,
            out_time,
        })
    }
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), TIME_FORMAT).ok()
}

/// Serialize a ledger as CSV with the canonical header, even when empty.
pub(crate) fn encode_ledger(ledger: &DailyLedger) -> std::result::Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(HEADER)?;
    for event in ledger.events() {
        writer.serialize(LedgerRow::from(event))?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

fn decode_ledger(path: &Path, date: NaiveDate, bytes: &[u8]) -> Result<DailyLedger> {
    let mut reader = csv::Reader::from_reader(bytes);
    let mut events = Vec::new();
    for row in reader.deserialize::<LedgerRow>() {
        let row = row.map_err(|e| AttendanceError::format(path, e))?;
        events.push(row.into_event().map_err(|e| AttendanceError::format(path, e))?);
    }
    Ok(DailyLedger::with_events(date, events))
}

/// Daily ledgers under a single directory.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    dir: PathBuf,
}

impl LedgerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(ledger_file_name(date))
    }

    /// The ledger for `date` if a file exists for it. A file with only a
    /// header is an empty ledger, not an absent one.
    pub fn load(&self, date: NaiveDate) -> Result<Option<DailyLedger>> {
        let path = self.path_for(date);
        match read_optional(&path)? {
            Some(bytes) => decode_ledger(&path, date, &bytes).map(Some),
            None => Ok(None),
        }
    }

    /// The ledger for `date`, or a new empty one. Nothing is written until
    /// the first event is appended.
    pub fn open_ledger(&self, date: NaiveDate) -> Result<DailyLedger> {
        Ok(self
            .load(date)?
            .unwrap_or_else(|| DailyLedger::new(date)))
    }

    pub fn most_recent_event_for<'a>(
        &self,
        ledger: &'a DailyLedger,
        name: &str,
    ) -> Option<(EventIndex, &'a AttendanceEvent)> {
        let idx = ledger.most_recent_index(name)?;
        ledger.get(idx).map(|e| (idx, e))
    }

    /// Append `event` and persist the whole ledger. On a failed write the
    /// in-memory ledger is left unchanged.
    pub fn append_event(
        &self,
        ledger: &mut DailyLedger,
        event: AttendanceEvent,
    ) -> Result<EventIndex> {
        let idx = ledger.push(event);
        if let Err(e) = self.save(ledger) {
            ledger.truncate(idx.0);
            return Err(e);
        }
        Ok(idx)
    }

    /// Set the check-out time of the event at `index` and persist.
    pub fn update_checkout(
        &self,
        ledger: &mut DailyLedger,
        index: EventIndex,
        time: NaiveTime,
    ) -> Result<()> {
        let event = ledger.event_mut(index).ok_or_else(|| {
            AttendanceError::Validation(format!("no event at position {}", index.0))
        })?;
        let previous = event.out_time.replace(time);
        if let Err(e) = self.save(ledger) {
            if let Some(event) = ledger.event_mut(index) {
                event.out_time = previous;
            }
            return Err(e);
        }
        Ok(())
    }

    /// Rewrite the file for `ledger.date()` atomically.
    pub fn save(&self, ledger: &DailyLedger) -> Result<()> {
        let path = self.path_for(ledger.date());
        let bytes = encode_ledger(ledger).map_err(|e| AttendanceError::format(&path, e))?;
        atomic_write(&path, &bytes)?;
        tracing::debug!(date = %ledger.date(), events = ledger.len(), "ledger saved");
        Ok(())
    }

    /// Dates that have a ledger file, oldest first.
    pub fn dates(&self) -> Result<Vec<NaiveDate>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AttendanceError::storage(&self.dir, e)),
        };
        let mut dates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| AttendanceError::storage(&self.dir, e))?;
            if let Some(date) = entry.file_name().to_str().and_then(parse_ledger_file_name) {
                dates.push(date);
            }
        }
        dates.sort();
        Ok(dates)
    }
}

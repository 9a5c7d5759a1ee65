use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// `HH:MM:SS`, the on-disk representation of check-in and check-out times.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// `YYYY-MM-DD`, used for ledger file names and date arguments.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Affiliation of a registered user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "organization-staff", alias = "ecell")]
    OrganizationStaff,
    #[serde(rename = "startup-affiliate", alias = "startup")]
    StartupAffiliate,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrganizationStaff => "organization-staff",
            Self::StartupAffiliate => "startup-affiliate",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "organization-staff" | "ecell" => Ok(Self::OrganizationStaff),
            "startup-affiliate" | "startup" => Ok(Self::StartupAffiliate),
            other => Err(format!(
                "unknown category {other:?} (expected organization-staff or startup-affiliate)"
            )),
        }
    }
}

/// A registered person. Immutable once written to the identity store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub category: Category,
    /// Empty unless `category` is [`Category::StartupAffiliate`].
    pub organization: String,
    pub roll_number: String,
}

/// One attendance session. Profile fields are copied at check-in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceEvent {
    pub name: String,
    pub category: Category,
    pub organization: String,
    pub roll_number: String,
    pub purpose: String,
    pub in_time: NaiveTime,
    /// `None` while the session is open.
    pub out_time: Option<NaiveTime>,
}

impl AttendanceEvent {
    /// Start a new open session for `profile`.
    pub fn check_in(profile: &UserProfile, purpose: &str, in_time: NaiveTime) -> Self {
        Self {
            name: profile.name.clone(),
            category: profile.category,
            organization: profile.organization.clone(),
            roll_number: profile.roll_number.clone(),
            purpose: purpose.to_string(),
            in_time,
            out_time: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.out_time.is_none()
    }
}

/// Position of an event inside its [`DailyLedger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventIndex(pub usize);

/// Attendance events for one calendar date, in scan order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyLedger {
    date: NaiveDate,
    events: Vec<AttendanceEvent>,
}

impl DailyLedger {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            events: Vec::new(),
        }
    }

    pub(crate) fn with_events(date: NaiveDate, events: Vec<AttendanceEvent>) -> Self {
        Self { date, events }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn events(&self) -> &[AttendanceEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, index: EventIndex) -> Option<&AttendanceEvent> {
        self.events.get(index.0)
    }

    /// Index of the last event recorded for `name`, if any.
    pub fn most_recent_index(&self, name: &str) -> Option<EventIndex> {
        self.events
            .iter()
            .rposition(|e| e.name == name)
            .map(EventIndex)
    }

    pub fn most_recent_event_for(&self, name: &str) -> Option<&AttendanceEvent> {
        self.most_recent_index(name).and_then(|idx| self.get(idx))
    }

    /// Number of sessions still waiting for a check-out.
    pub fn open_sessions(&self) -> usize {
        self.events.iter().filter(|e| e.is_open()).count()
    }

    pub(crate) fn push(&mut self, event: AttendanceEvent) -> EventIndex {
        self.events.push(event);
        EventIndex(self.events.len() - 1)
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }

    pub(crate) fn event_mut(&mut self, index: EventIndex) -> Option<&mut AttendanceEvent> {
        self.events.get_mut(index.0)
    }
}

/// What a recognised scan did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Transition {
    CheckedIn,
    CheckedOut,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CheckedIn => f.write_str("Checked IN"),
            Self::CheckedOut => f.write_str("Checked OUT"),
        }
    }
}

/// Result of reconciling one scan, for display to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanOutcome {
    pub name: String,
    pub transition: Transition,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} at {}",
            self.name,
            self.transition,
            self.time.format(TIME_FORMAT)
        )
    }
}

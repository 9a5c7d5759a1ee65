//! rollcall-core — Attendance check-in/check-out reconciliation.
//!
//! Registered profiles live in a CSV identity store; each calendar date gets
//! its own CSV ledger. A recognised scan either opens a session for the
//! person or closes their open one.

pub mod clock;
pub mod desk;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod matcher;
pub mod reconcile;
pub mod report;
pub mod storage;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use desk::AttendanceDesk;
pub use error::{AttendanceError, ErrorKind, Result};
pub use identity::IdentityStore;
pub use ledger::LedgerStore;
pub use matcher::FaceMatcher;
pub use reconcile::{decide, reconcile, Decision};
pub use report::{
    export_ledger, view_ledger, CsvExporter, JsonExporter, LedgerExporter, XlsxExporter,
    XLSX_SHEET_NAME,
};
pub use storage::StoreConfig;
pub use types::{
    AttendanceEvent, Category, DailyLedger, EventIndex, ScanOutcome, Transition, UserProfile,
    DATE_FORMAT, TIME_FORMAT,
};

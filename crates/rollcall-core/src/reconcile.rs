//! Session reconciliation: decide whether a recognised scan is an arrival or
//! a departure and apply it to the day's ledger.

use chrono::{NaiveDateTime, Timelike};

use crate::error::Result;
use crate::identity::IdentityStore;
use crate::ledger::LedgerStore;
use crate::types::{AttendanceEvent, DailyLedger, EventIndex, ScanOutcome, Transition};

/// What a scan for a given name should do to a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    CheckIn,
    /// Close the open session at this position.
    CheckOut(EventIndex),
}

/// Only the most recent event for `name` is consulted: if it is still open
/// the scan closes it, otherwise (or if there is none) a new session starts.
pub fn decide(ledger: &DailyLedger, name: &str) -> Decision {
    match ledger.most_recent_index(name) {
        Some(idx) if ledger.get(idx).is_some_and(AttendanceEvent::is_open) => {
            Decision::CheckOut(idx)
        }
        _ => Decision::CheckIn,
    }
}

/// Record a scan for `identity` at `timestamp`.
///
/// The identity must be registered. `purpose` is stored on check-in only;
/// a check-out leaves the session's purpose untouched. Times are kept to
/// whole seconds.
pub fn reconcile(
    identities: &IdentityStore,
    ledgers: &LedgerStore,
    identity: &str,
    purpose: &str,
    timestamp: NaiveDateTime,
) -> Result<ScanOutcome> {
    let profile = identities.lookup(identity)?;
    let date = timestamp.date();
    let time = timestamp.time();
    let time = time.with_nanosecond(0).unwrap_or(time);

    let mut ledger = ledgers.open_ledger(date)?;
    let transition = match decide(&ledger, &profile.name) {
        Decision::CheckIn => {
            let event = AttendanceEvent::check_in(profile, purpose.trim(), time);
            ledgers.append_event(&mut ledger, event)?;
            Transition::CheckedIn
        }
        Decision::CheckOut(idx) => {
            ledgers.update_checkout(&mut ledger, idx, time)?;
            Transition::CheckedOut
        }
    };

    tracing::info!(
        name = %profile.name,
        %date,
        %time,
        transition = ?transition,
        "scan reconciled"
    );

    Ok(ScanOutcome {
        name: profile.name.clone(),
        transition,
        date,
        time,
    })
}

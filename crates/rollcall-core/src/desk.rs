//! The attendance desk ties the stores, the reconciler and a clock together
//! behind the operations an operator performs.

use chrono::NaiveDate;

use crate::clock::Clock;
use crate::error::{AttendanceError, Result};
use crate::identity::IdentityStore;
use crate::ledger::LedgerStore;
use crate::matcher::FaceMatcher;
use crate::reconcile::reconcile;
use crate::report::{export_ledger, view_ledger, LedgerExporter};
use crate::storage::StoreConfig;
use crate::types::{Category, DailyLedger, ScanOutcome, UserProfile};

pub struct AttendanceDesk<C: Clock> {
    identities: IdentityStore,
    ledgers: LedgerStore,
    clock: C,
}

impl<C: Clock> AttendanceDesk<C> {
    /// Open both stores described by `config`, creating directories as needed.
    pub fn open(config: &StoreConfig, clock: C) -> Result<Self> {
        config.ensure_dirs()?;
        Ok(Self {
            identities: IdentityStore::open(&config.users_file)?,
            ledgers: LedgerStore::new(&config.ledger_dir),
            clock,
        })
    }

    pub fn identities(&self) -> &IdentityStore {
        &self.identities
    }

    pub fn ledgers(&self) -> &LedgerStore {
        &self.ledgers
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.now().date()
    }

    pub fn register(
        &mut self,
        name: &str,
        category: Category,
        organization: &str,
        roll_number: &str,
    ) -> Result<&UserProfile> {
        self.identities
            .register(name, category, organization, roll_number)
    }

    /// Record a scan for an already-resolved identity at the current time.
    pub fn record(&self, identity: &str, purpose: &str) -> Result<ScanOutcome> {
        require_purpose(purpose)?;
        reconcile(
            &self.identities,
            &self.ledgers,
            identity,
            purpose,
            self.clock.now(),
        )
    }

    /// Resolve `image` with `matcher`, then record the scan.
    ///
    /// Matcher failures and "no match" both surface as `Match` errors so the
    /// operator can retry; the ledger is only touched once a name resolves.
    pub fn scan<I, M>(&self, matcher: &M, image: &I, purpose: &str) -> Result<ScanOutcome>
    where
        I: ?Sized,
        M: FaceMatcher<I>,
    {
        require_purpose(purpose)?;
        let name = matcher
            .best_match_name(image)
            .map_err(|e| AttendanceError::Match(e.to_string()))?
            .ok_or_else(|| AttendanceError::Match("face not recognized".into()))?;
        tracing::debug!(name = %name, "face matched");
        self.record(&name, purpose)
    }

    pub fn view(&self, date: NaiveDate) -> Result<Option<DailyLedger>> {
        view_ledger(&self.ledgers, date)
    }

    pub fn export(&self, date: NaiveDate, exporter: &dyn LedgerExporter) -> Result<Vec<u8>> {
        export_ledger(&self.ledgers, date, exporter)
    }
}

fn require_purpose(purpose: &str) -> Result<()> {
    if purpose.trim().is_empty() {
        return Err(AttendanceError::Validation(
            "purpose is required before scanning".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::ErrorKind;
    use crate::report::CsvExporter;
    use crate::types::Transition;
    use chrono::{NaiveDateTime, NaiveTime};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::fmt;
    use tempfile::tempdir;

    #[derive(Debug)]
    struct NoFace;

    impl fmt::Display for NoFace {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("no face detected")
        }
    }

    impl std::error::Error for NoFace {}

    /// Replays a fixed sequence of match results, ignoring the image.
    struct ScriptedMatcher {
        script: RefCell<VecDeque<std::result::Result<Option<String>, NoFace>>>,
    }

    impl ScriptedMatcher {
        fn new(script: Vec<std::result::Result<Option<&str>, NoFace>>) -> Self {
            Self {
                script: RefCell::new(
                    script
                        .into_iter()
                        .map(|r| r.map(|o| o.map(str::to_string)))
                        .collect(),
                ),
            }
        }
    }

    impl FaceMatcher<[u8]> for ScriptedMatcher {
        type Error = NoFace;

        fn best_match_name(&self, _image: &[u8]) -> std::result::Result<Option<String>, NoFace> {
            self.script.borrow_mut().pop_front().unwrap_or(Ok(None))
        }
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, 8)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_alice_day_scenario() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::new(dir.path());
        let mut desk = AttendanceDesk::open(&config, FixedClock::new(at(9, 0, 0))).unwrap();
        desk.register("alice", Category::OrganizationStaff, "", "R1")
            .unwrap();

        let matcher = ScriptedMatcher::new(vec![
            Ok(Some("alice")),
            Ok(Some("alice")),
            Ok(Some("alice")),
        ]);
        let frame: &[u8] = &[0u8; 4];

        let first = desk.scan(&matcher, frame, "meeting").unwrap();
        assert_eq!(first.transition, Transition::CheckedIn);
        let ledger = desk.view(desk.today()).unwrap().unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.events()[0].purpose, "meeting");
        assert!(ledger.events()[0].is_open());

        desk.clock.set(at(17, 0, 0));
        let second = desk.scan(&matcher, frame, "meeting").unwrap();
        assert_eq!(second.transition, Transition::CheckedOut);
        let ledger = desk.view(desk.today()).unwrap().unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(
            ledger.events()[0].out_time,
            Some(NaiveTime::from_hms_opt(17, 0, 0).unwrap())
        );

        desk.clock.set(at(17, 5, 0));
        let third = desk.scan(&matcher, frame, "followup").unwrap();
        assert_eq!(third.transition, Transition::CheckedIn);
        assert_eq!(third.to_string(), "alice Checked IN at 17:05:00");
        let ledger = desk.view(desk.today()).unwrap().unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.events()[1].purpose, "followup");
        assert!(ledger.events()[1].is_open());
    }

    #[test]
    fn test_unmatched_or_failed_scans_leave_ledger_absent() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::new(dir.path());
        let mut desk = AttendanceDesk::open(&config, FixedClock::new(at(9, 0, 0))).unwrap();
        desk.register("alice", Category::OrganizationStaff, "", "R1")
            .unwrap();

        let matcher = ScriptedMatcher::new(vec![Ok(None), Err(NoFace)]);
        let frame: &[u8] = &[];

        let err = desk.scan(&matcher, frame, "meeting").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Match);
        let err = desk.scan(&matcher, frame, "meeting").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Match);
        assert!(err.to_string().contains("no face detected"));

        assert!(desk.view(desk.today()).unwrap().is_none());
        assert_eq!(
            desk.export(desk.today(), &CsvExporter).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_blank_purpose_is_rejected_before_matching() {
        let dir = tempdir().unwrap();
        let desk =
            AttendanceDesk::open(&StoreConfig::new(dir.path()), FixedClock::new(at(9, 0, 0)))
                .unwrap();
        let matcher = ScriptedMatcher::new(vec![Ok(Some("alice"))]);

        let err = desk.scan(&matcher, &[0u8][..], "   ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(matcher.script.borrow().len(), 1);
    }

    #[test]
    fn test_matched_name_without_profile_is_not_found() {
        let dir = tempdir().unwrap();
        let desk =
            AttendanceDesk::open(&StoreConfig::new(dir.path()), FixedClock::new(at(9, 0, 0)))
                .unwrap();
        let matcher = ScriptedMatcher::new(vec![Ok(Some("ghost"))]);

        let err = desk.scan(&matcher, &[0u8][..], "visit").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

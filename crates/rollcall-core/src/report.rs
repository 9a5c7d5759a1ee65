//! Read-only views of a day's ledger and spreadsheet export.

use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::error::{AttendanceError, Result};
use crate::ledger::{encode_ledger, LedgerRow, LedgerStore, HEADER};
use crate::types::{DailyLedger, DATE_FORMAT, TIME_FORMAT};

/// Serializes a ledger into a downloadable byte stream.
pub trait LedgerExporter {
    /// File extension for the produced format, without the dot.
    fn extension(&self) -> &'static str;

    fn export(&self, ledger: &DailyLedger) -> Result<Vec<u8>>;

    /// `attendance_YYYY-MM-DD.<ext>`
    fn file_name(&self, date: NaiveDate) -> String {
        format!("attendance_{}.{}", date.format(DATE_FORMAT), self.extension())
    }
}

/// Comma-separated rows with a header, as opened by any spreadsheet tool.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvExporter;

impl LedgerExporter for CsvExporter {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn export(&self, ledger: &DailyLedger) -> Result<Vec<u8>> {
        encode_ledger(ledger).map_err(|e| export_error(ledger, e))
    }
}

/// A JSON array of row objects using the ledger column names.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonExporter;

impl LedgerExporter for JsonExporter {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn export(&self, ledger: &DailyLedger) -> Result<Vec<u8>> {
        let rows: Vec<LedgerRow> = ledger.events().iter().map(LedgerRow::from).collect();
        serde_json::to_vec_pretty(&rows).map_err(|e| export_error(ledger, e))
    }
}

/// Excel workbook with a single `Attendance` sheet: a bold header row, then
/// one row per event. An open session leaves its `out_time` cell blank.
#[derive(Debug, Default, Clone, Copy)]
pub struct XlsxExporter;

pub const XLSX_SHEET_NAME: &str = "Attendance";

impl LedgerExporter for XlsxExporter {
    fn extension(&self) -> &'static str {
        "xlsx"
    }

    fn export(&self, ledger: &DailyLedger) -> Result<Vec<u8>> {
        write_workbook(ledger).map_err(|e| export_error(ledger, e))
    }
}

fn write_workbook(ledger: &DailyLedger) -> std::result::Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(XLSX_SHEET_NAME)?;

    for (col, title) in (0u16..).zip(HEADER) {
        sheet.write_string_with_format(0, col, title, &bold)?;
    }
    for (row, event) in (1u32..).zip(ledger.events()) {
        sheet.write_string(row, 0, &event.name)?;
        sheet.write_string(row, 1, event.category.as_str())?;
        sheet.write_string(row, 2, &event.organization)?;
        sheet.write_string(row, 3, &event.roll_number)?;
        sheet.write_string(row, 4, &event.purpose)?;
        sheet.write_string(row, 5, event.in_time.format(TIME_FORMAT).to_string())?;
        if let Some(out) = event.out_time {
            sheet.write_string(row, 6, out.format(TIME_FORMAT).to_string())?;
        }
    }
    sheet.autofit();

    workbook.save_to_buffer()
}

fn export_error(ledger: &DailyLedger, err: impl std::fmt::Display) -> AttendanceError {
    AttendanceError::format(
        CsvExporter.file_name(ledger.date()),
        format!("export failed: {err}"),
    )
}

/// The ledger for `date`, or `None` when no file was ever written for it.
pub fn view_ledger(ledgers: &LedgerStore, date: NaiveDate) -> Result<Option<DailyLedger>> {
    ledgers.load(date)
}

/// Export the ledger for `date`; fails with `NoLedger` when there is none.
pub fn export_ledger(
    ledgers: &LedgerStore,
    date: NaiveDate,
    exporter: &dyn LedgerExporter,
) -> Result<Vec<u8>> {
    let ledger = view_ledger(ledgers, date)?.ok_or(AttendanceError::NoLedger(date))?;
    let bytes = exporter.export(&ledger)?;
    tracing::info!(
        %date,
        format = exporter.extension(),
        events = ledger.len(),
        bytes = bytes.len(),
        "ledger exported"
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::{AttendanceEvent, Category, UserProfile};
    use chrono::NaiveTime;
    use tempfile::tempdir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
    }

    fn seeded(store: &LedgerStore) {
        let alice = UserProfile {
            name: "alice".into(),
            category: Category::OrganizationStaff,
            organization: String::new(),
            roll_number: "R1".into(),
        };
        let mut ledger = store.open_ledger(date()).unwrap();
        let idx = store
            .append_event(
                &mut ledger,
                AttendanceEvent::check_in(&alice, "meeting", NaiveTime::from_hms_opt(9, 0, 0).unwrap()),
            )
            .unwrap();
        store
            .update_checkout(&mut ledger, idx, NaiveTime::from_hms_opt(17, 0, 0).unwrap())
            .unwrap();
    }

    #[test]
    fn test_view_distinguishes_absent_from_empty() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path());
        assert!(view_ledger(&store, date()).unwrap().is_none());

        store.save(&DailyLedger::new(date())).unwrap();
        let ledger = view_ledger(&store, date()).unwrap().unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_export_without_ledger_is_not_found() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path());
        let err = export_ledger(&store, date(), &CsvExporter).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(matches!(err, AttendanceError::NoLedger(d) if d == date()));
    }

    #[test]
    fn test_csv_export_has_header_and_rows() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path());
        seeded(&store);

        let bytes = export_ledger(&store, date(), &CsvExporter).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "name,category,organization,roll_number,purpose,in_time,out_time\n\
             alice,organization-staff,,R1,meeting,09:00:00,17:00:00\n"
        );
        assert_eq!(CsvExporter.file_name(date()), "attendance_2024-02-29.csv");
    }

    #[test]
    fn test_json_export_uses_column_names() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path());
        seeded(&store);

        let bytes = export_ledger(&store, date(), &JsonExporter).unwrap();
        let rows: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(rows[0]["name"], "alice");
        assert_eq!(rows[0]["category"], "organization-staff");
        assert_eq!(rows[0]["out_time"], "17:00:00");
        assert_eq!(JsonExporter.file_name(date()), "attendance_2024-02-29.json");
    }

    #[test]
    fn test_xlsx_export_has_header_and_blank_open_checkout() {
        use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};

        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path());
        seeded(&store);
        let bob = UserProfile {
            name: "bob".into(),
            category: Category::StartupAffiliate,
            organization: "Acme".into(),
            roll_number: "R2".into(),
        };
        let mut ledger = store.open_ledger(date()).unwrap();
        store
            .append_event(
                &mut ledger,
                AttendanceEvent::check_in(&bob, "demo", NaiveTime::from_hms_opt(10, 5, 0).unwrap()),
            )
            .unwrap();

        let bytes = export_ledger(&store, date(), &XlsxExporter).unwrap();
        assert!(bytes.starts_with(b"PK\x03\x04"));
        assert_eq!(XlsxExporter.file_name(date()), "attendance_2024-02-29.xlsx");

        let mut book: Xlsx<_> = open_workbook_from_rs(std::io::Cursor::new(bytes)).unwrap();
        let sheet = book.worksheet_range(XLSX_SHEET_NAME).unwrap();
        assert_eq!(sheet.height(), 3);
        let text = |row: u32, col: u32| match sheet.get_value((row, col)) {
            Some(Data::String(s)) => s.clone(),
            _ => String::new(),
        };
        let header: Vec<String> = (0..7).map(|c| text(0, c)).collect();
        assert_eq!(header, HEADER);
        assert_eq!(text(1, 0), "alice");
        assert_eq!(text(1, 6), "17:00:00");
        assert_eq!(text(2, 1), "startup-affiliate");
        assert_eq!(text(2, 5), "10:05:00");
        assert!(text(2, 6).is_empty());
    }
}

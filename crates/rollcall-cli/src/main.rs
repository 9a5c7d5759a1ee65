use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use rollcall_core::{
    AttendanceDesk, AttendanceError, Category, Clock, CsvExporter, DailyLedger, JsonExporter,
    LedgerExporter, SystemClock, UserProfile, XlsxExporter, DATE_FORMAT, TIME_FORMAT,
};
use rollcall_vision::{
    CaptureSource, Frame, GalleryMatcher, ReferenceGallery, StillImageSource, ThumbnailEmbedder,
};
use tracing_subscriber::EnvFilter;

mod config;
mod session;

use config::Config;

#[derive(Parser)]
#[command(name = "rollcall", about = "Face-scan attendance: check in, check out, report")]
struct Cli {
    /// TOML config file (defaults to $ROLLCALL_CONFIG when set)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new user and optionally store their reference photo
    Register {
        #[arg(short, long)]
        name: String,
        /// organization-staff or startup-affiliate
        #[arg(short, long)]
        category: Category,
        /// Startup name (startup affiliates only)
        #[arg(short, long, default_value = "")]
        organization: String,
        #[arg(short, long)]
        roll: String,
        /// Still image of the user's face to enroll as reference
        #[arg(short, long)]
        photo: Option<PathBuf>,
    },
    /// Scan a face and check the matched user in or out
    Scan {
        /// Reason for the visit, recorded on check-in
        #[arg(short, long)]
        purpose: String,
        /// Snapshot written by the camera
        #[arg(short, long)]
        image: PathBuf,
        /// Keep prompting until a face is recognised or the operator quits
        #[arg(short, long)]
        watch: bool,
    },
    /// Show the attendance ledger for a date
    View {
        /// YYYY-MM-DD, defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Export a date's ledger as a spreadsheet file
    Export {
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// List registered users
    Users,
    /// List dates that have attendance data
    Dates,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Csv,
    Json,
    Xlsx,
}

impl ExportFormat {
    fn exporter(self) -> &'static dyn LedgerExporter {
        match self {
            Self::Csv => &CsvExporter,
            Self::Json => &JsonExporter,
            Self::Xlsx => &XlsxExporter,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(?config, "configuration resolved");

    let mut desk = AttendanceDesk::open(&config.store_config(), SystemClock)
        .with_context(|| format!("opening data directory {}", config.data_dir.display()))?;
    let gallery = ReferenceGallery::new(&config.reference_dir);

    match cli.command {
        Commands::Register {
            name,
            category,
            organization,
            roll,
            photo,
        } => {
            let profile = register_user(
                &mut desk,
                &gallery,
                &name,
                category,
                &organization,
                &roll,
                photo.as_deref(),
            )?;
            if photo.is_none() {
                println!(
                    "No photo given: add {}/{}.png before {} can scan in.",
                    gallery.dir().display(),
                    profile.name,
                    profile.name
                );
            }
            println!("{} registered successfully!", profile.name);
        }
        Commands::Scan {
            purpose,
            image,
            watch,
        } => {
            if purpose.trim().is_empty() {
                bail!("purpose is required before scanning");
            }
            let matcher = GalleryMatcher::from_gallery(&gallery, ThumbnailEmbedder::default())?
                .with_threshold(config.match_threshold)
                .with_dark_threshold(config.dark_threshold);
            if matcher.is_empty() {
                bail!("no registered users found in {}", gallery.dir().display());
            }
            tracing::info!(references = matcher.len(), "reference gallery ready");

            let mut source = StillImageSource::new(image);
            if watch {
                let stdin = std::io::stdin();
                session::run_watch(
                    &desk,
                    &matcher,
                    &mut source,
                    &purpose,
                    stdin.lock(),
                    std::io::stdout(),
                )?;
            } else {
                let frame = source.capture()?;
                let outcome = desk.scan(&matcher, &frame, &purpose)?;
                println!("{outcome}");
            }
        }
        Commands::View { date, json } => {
            let date = date.unwrap_or_else(|| desk.today());
            match desk.view(date)? {
                Some(ledger) if json => {
                    let bytes = JsonExporter.export(&ledger)?;
                    println!("{}", String::from_utf8_lossy(&bytes));
                }
                Some(ledger) => print_ledger(&ledger),
                None => println!("No attendance data found for this date."),
            }
        }
        Commands::Export { date, format, out } => {
            let date = date.unwrap_or_else(|| desk.today());
            let exporter = format.exporter();
            let bytes = desk.export(date, exporter)?;
            let out = out.unwrap_or_else(|| PathBuf::from(exporter.file_name(date)));
            std::fs::write(&out, &bytes).with_context(|| format!("writing {}", out.display()))?;
            println!("Wrote {} ({} bytes)", out.display(), bytes.len());
        }
        Commands::Users => {
            let profiles = desk.identities().profiles();
            if profiles.is_empty() {
                println!("No registered users.");
            }
            for p in profiles {
                println!(
                    "{:<20} {:<18} {:<20} {}",
                    p.name, p.category, p.organization, p.roll_number
                );
            }
        }
        Commands::Dates => {
            for date in desk.ledgers().dates()? {
                println!("{}", date.format(DATE_FORMAT));
            }
        }
    }

    Ok(())
}

/// Store the reference photo, then the profile. The photo is removed again
/// when the profile cannot be saved, so a registered user always has the
/// reference image they were registered with.
fn register_user<C: Clock>(
    desk: &mut AttendanceDesk<C>,
    gallery: &ReferenceGallery,
    name: &str,
    category: Category,
    organization: &str,
    roll: &str,
    photo: Option<&Path>,
) -> Result<UserProfile> {
    let name = name.trim();
    ReferenceGallery::validate_identity(name)?;
    if desk.identities().exists(name) {
        return Err(AttendanceError::Duplicate(name.to_string()).into());
    }

    let frame = photo
        .map(Frame::open)
        .transpose()
        .context("loading reference photo")?;
    let enrolled = match &frame {
        Some(frame) => Some(
            gallery
                .enroll(name, frame)
                .with_context(|| format!("storing reference image for {name}"))?,
        ),
        None => None,
    };

    match desk.register(name, category, organization, roll) {
        Ok(profile) => Ok(profile.clone()),
        Err(err) => {
            if let Some(path) = enrolled {
                if let Err(e) = std::fs::remove_file(&path) {
                    tracing::warn!(path = %path.display(), error = %e, "reference image left behind");
                }
            }
            Err(err.into())
        }
    }
}

fn print_ledger(ledger: &DailyLedger) {
    println!(
        "Attendance for {} ({} entries, {} open)",
        ledger.date().format(DATE_FORMAT),
        ledger.len(),
        ledger.open_sessions()
    );
    println!(
        "{:<20} {:<18} {:<16} {:<10} {:<20} {:<8} {:<8}",
        "name", "category", "organization", "roll", "purpose", "in", "out"
    );
    for e in ledger.events() {
        let out = e
            .out_time
            .map(|t| t.format(TIME_FORMAT).to_string())
            .unwrap_or_default();
        println!(
            "{:<20} {:<18} {:<16} {:<10} {:<20} {:<8} {:<8}",
            e.name,
            e.category,
            e.organization,
            e.roll_number,
            e.purpose,
            e.in_time.format(TIME_FORMAT).to_string(),
            out
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use image::{GrayImage, Luma};
    use rollcall_core::{ErrorKind, FixedClock, StoreConfig};
    use tempfile::tempdir;

    fn desk(dir: &Path) -> AttendanceDesk<FixedClock> {
        let clock = FixedClock::new(
            NaiveDate::from_ymd_opt(2024, 10, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        );
        AttendanceDesk::open(&StoreConfig::new(dir.join("data")), clock).unwrap()
    }

    fn photo(dir: &Path) -> PathBuf {
        let path = dir.join("photo.png");
        GrayImage::from_fn(48, 48, |x, _| Luma([if x < 24 { 220 } else { 40 }]))
            .save(&path)
            .unwrap();
        path
    }

    fn attendance_error(err: &anyhow::Error) -> Option<&AttendanceError> {
        err.downcast_ref::<AttendanceError>()
    }

    #[test]
    fn test_register_stores_profile_and_reference() {
        let dir = tempdir().unwrap();
        let mut desk = desk(dir.path());
        let gallery = ReferenceGallery::new(dir.path().join("faces"));
        let photo = photo(dir.path());

        let profile = register_user(
            &mut desk,
            &gallery,
            " alice ",
            Category::OrganizationStaff,
            "",
            "R1",
            Some(&photo),
        )
        .unwrap();
        assert_eq!(profile.name, "alice");
        assert!(desk.identities().exists("alice"));
        assert!(gallery.dir().join("alice.png").exists());
    }

    #[test]
    fn test_failed_enroll_leaves_user_unregistered() {
        let dir = tempdir().unwrap();
        let mut desk = desk(dir.path());
        // A regular file where the reference directory should be.
        let blocker = dir.path().join("faces");
        std::fs::write(&blocker, b"").unwrap();
        let gallery = ReferenceGallery::new(&blocker);
        let photo = photo(dir.path());

        let result = register_user(
            &mut desk,
            &gallery,
            "alice",
            Category::OrganizationStaff,
            "",
            "R1",
            Some(&photo),
        );
        assert!(result.is_err());
        assert!(!desk.identities().exists("alice"));

        // Once the directory problem is fixed the same registration succeeds.
        std::fs::remove_file(&blocker).unwrap();
        register_user(
            &mut desk,
            &gallery,
            "alice",
            Category::OrganizationStaff,
            "",
            "R1",
            Some(&photo),
        )
        .unwrap();
        assert!(desk.identities().exists("alice"));
    }

    #[test]
    fn test_rejected_profile_removes_reference() {
        let dir = tempdir().unwrap();
        let mut desk = desk(dir.path());
        let gallery = ReferenceGallery::new(dir.path().join("faces"));
        let photo = photo(dir.path());

        let err = register_user(
            &mut desk,
            &gallery,
            "alice",
            Category::OrganizationStaff,
            "",
            "  ",
            Some(&photo),
        )
        .unwrap_err();
        assert_eq!(
            attendance_error(&err).map(AttendanceError::kind),
            Some(ErrorKind::Validation)
        );
        assert!(!gallery.dir().join("alice.png").exists());
    }

    #[test]
    fn test_duplicate_keeps_existing_reference() {
        let dir = tempdir().unwrap();
        let mut desk = desk(dir.path());
        let gallery = ReferenceGallery::new(dir.path().join("faces"));
        let photo = photo(dir.path());
        register_user(
            &mut desk,
            &gallery,
            "alice",
            Category::OrganizationStaff,
            "",
            "R1",
            Some(&photo),
        )
        .unwrap();

        let err = register_user(
            &mut desk,
            &gallery,
            "alice",
            Category::OrganizationStaff,
            "",
            "R2",
            Some(&photo),
        )
        .unwrap_err();
        assert_eq!(
            attendance_error(&err).map(AttendanceError::kind),
            Some(ErrorKind::Duplicate)
        );
        assert!(gallery.dir().join("alice.png").exists());
    }
}

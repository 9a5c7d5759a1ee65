//! Interactive capture loop: Enter scans, `q` quits.

use std::io::{BufRead, Write};

use anyhow::Result;
use rollcall_core::{AttendanceDesk, Clock, ErrorKind, FaceMatcher, ScanOutcome};
use rollcall_vision::{CaptureSource, Frame};

/// Prompt until one scan is recorded or the operator quits.
///
/// Capture and match failures are reported and the operator may try again;
/// only I/O on the terminal itself ends the loop with an error.
pub fn run_watch<C, M, S, R, W>(
    desk: &AttendanceDesk<C>,
    matcher: &M,
    source: &mut S,
    purpose: &str,
    mut input: R,
    mut output: W,
) -> Result<Option<ScanOutcome>>
where
    C: Clock,
    M: FaceMatcher<Frame>,
    S: CaptureSource,
    R: BufRead,
    W: Write,
{
    let mut line = String::new();
    loop {
        write!(output, "Press Enter to scan your face, or q then Enter to quit: ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(None);
        }
        if line.trim().eq_ignore_ascii_case("q") {
            return Ok(None);
        }

        let frame = match source.capture() {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(error = %err, "capture failed");
                writeln!(output, "Capture failed: {err}")?;
                continue;
            }
        };

        match desk.scan(matcher, &frame, purpose) {
            Ok(outcome) => {
                writeln!(output, "{outcome}")?;
                return Ok(Some(outcome));
            }
            Err(err) if err.kind() == ErrorKind::Match => {
                writeln!(output, "Face not recognized ({err}). Try again.")?;
            }
            Err(err) => {
                tracing::error!(error = %err, "scan failed");
                writeln!(output, "Error: {err}")?;
            }
        }
    }
}

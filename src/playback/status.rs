//! The single overwritten status line on the terminal.

use std::io::Write;

use super::session::MediaStatus;

/// Shown when the device has not reported a value yet.
pub const UNKNOWN_TIME: &str = "-:--:--";

/// Trailing spaces that blank out leftovers of a longer previous line.
const LINE_PAD: &str = "                      ";

/// Format seconds as `H:MM:SS`, flooring fractions.
pub fn format_clock(seconds: Option<f64>) -> String {
    match seconds {
        Some(s) if s.is_finite() && s >= 0.0 => {
            let total = s.floor() as u64;
            format!("{}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
        }
        _ => UNKNOWN_TIME.to_string(),
    }
}

/// `elapsed/duration player_state`
pub fn render_status(status: &MediaStatus) -> String {
    format!(
        "{}/{} {}",
        format_clock(status.elapsed),
        format_clock(status.duration),
        status.player_state
    )
}

/// Writes status lines that overwrite each other with a carriage return.
pub struct StatusLine {
    out: Box<dyn Write + Send>,
    dirty: bool,
}

impl StatusLine {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out, dirty: false }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Redraw the line. Terminal write failures are not worth stopping
    /// playback over and are ignored.
    pub fn update(&mut self, status: &MediaStatus) {
        let _ = write!(self.out, "{}{}\r", render_status(status), LINE_PAD);
        let _ = self.out.flush();
        self.dirty = true;
    }

    /// Move past the status line so that following output starts on a
    /// fresh line.
    pub fn finish(&mut self) {
        if self.dirty {
            let _ = writeln!(self.out);
            let _ = self.out.flush();
            self.dirty = false;
        }
    }
}

//! ICS calendar renderer
//!
//! Generates an RFC 5545 calendar with one all-day `VEVENT` per
//! (physician, task) assignment, suitable for importing into any calendar
//! application.
//!
//! ## Example Output
//!
//! ```text
//! BEGIN:VCALENDAR
//! VERSION:2.0
//! PRODID:-//rotaplan//rotaplan//EN
//! BEGIN:VEVENT
//! UID:CTU_A-20230103-John-Doe@rotaplan
//! DTSTART;VALUE=DATE:20230103
//! DTEND;VALUE=DATE:20230107
//! SUMMARY:CTU_A - John Doe
//! DESCRIPTION:Task: CTU_A\nPhysician: John Doe\nScore: 15
//! END:VEVENT
//! END:VCALENDAR
//! ```

use chrono::Days;
use std::path::Path;

use rotaplan_core::Schedule;

use crate::RenderError;

/// ICS calendar renderer
#[derive(Clone, Debug)]
pub struct IcsRenderer {
    /// PRODID advertised in the calendar envelope.
    pub product_id: String,
}

impl Default for IcsRenderer {
    fn default() -> Self {
        Self {
            product_id: "-//rotaplan//rotaplan//EN".into(),
        }
    }
}

impl IcsRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom PRODID
    pub fn product_id(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = product_id.into();
        self
    }

    /// Render the schedule as an ICS document (CRLF line endings).
    pub fn render(&self, schedule: &Schedule) -> String {
        let mut lines: Vec<String> = vec![
            "BEGIN:VCALENDAR".into(),
            "VERSION:2.0".into(),
            format!("PRODID:{}", self.product_id),
        ];

        for (physician, assignments) in schedule.iter() {
            for assignment in assignments {
                let start = assignment.start_date.format("%Y%m%d");
                // DTEND is exclusive for all-day events.
                let end = (assignment.end_date + Days::new(1)).format("%Y%m%d");

                lines.push("BEGIN:VEVENT".into());
                lines.push(format!(
                    "UID:{}-{}-{}@rotaplan",
                    Self::uid_token(&assignment.task),
                    start,
                    Self::uid_token(physician),
                ));
                lines.push(format!("DTSTART;VALUE=DATE:{start}"));
                lines.push(format!("DTEND;VALUE=DATE:{end}"));
                lines.push(format!(
                    "SUMMARY:{} - {}",
                    Self::escape_text(&assignment.task),
                    Self::escape_text(physician)
                ));
                lines.push(format!(
                    "DESCRIPTION:Task: {}\\nPhysician: {}\\nScore: {}",
                    Self::escape_text(&assignment.task),
                    Self::escape_text(physician),
                    assignment.score
                ));
                lines.push("END:VEVENT".into());
            }
        }

        lines.push("END:VCALENDAR".into());
        let mut out = lines.join("\r\n");
        out.push_str("\r\n");
        out
    }

    /// Render and write to a file.
    pub fn write(&self, schedule: &Schedule, path: &Path) -> Result<(), RenderError> {
        Ok(std::fs::write(path, self.render(schedule))?)
    }

    // RFC 5545 text escaping for SUMMARY/DESCRIPTION values.
    fn escape_text(text: &str) -> String {
        text.replace('\\', "\\\\")
            .replace(';', "\\;")
            .replace(',', "\\,")
            .replace('\n', "\\n")
    }

    // UIDs must not contain whitespace.
    fn uid_token(text: &str) -> String {
        text.chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect()
    }
}

//! Calendar export.
//!
//! Renders scheduled blocks as an iCalendar (RFC 5545) document. Times are
//! written as floating local time, matching what calendar apps import as
//! "same wall clock" events.

use chrono::{DateTime, FixedOffset};

use crate::models::ScheduledBlock;

const PRODID: &str = "-//Secretary Scheduler//NONSGML v1.0//EN";
const UID_DOMAIN: &str = "secretary-scheduler";
const MAX_LINE_OCTETS: usize = 75;

// YYYYMMDDTHHMMSS, no zone suffix
fn format_ics_time(dt: DateTime<FixedOffset>) -> String {
    dt.naive_local().format("%Y%m%dT%H%M%S").to_string()
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

// Content lines longer than 75 octets continue on the next line after a space
fn push_line(out: &mut String, line: &str) {
    let mut used = 0;
    for c in line.chars() {
        let len = c.len_utf8();
        if used + len > MAX_LINE_OCTETS {
            out.push_str("\r\n ");
            used = 1;
        }
        out.push(c);
        used += len;
    }
    out.push_str("\r\n");
}

/// Render `blocks` as a VCALENDAR document.
///
/// `stamp` fills DTSTAMP so output is reproducible for a given call.
pub fn render_calendar(blocks: &[ScheduledBlock], stamp: DateTime<FixedOffset>) -> String {
    let mut out = String::new();
    push_line(&mut out, "BEGIN:VCALENDAR");
    push_line(&mut out, "VERSION:2.0");
    push_line(&mut out, &format!("PRODID:{PRODID}"));
    push_line(&mut out, "CALSCALE:GREGORIAN");

    let dtstamp = format_ics_time(stamp);
    for b in blocks {
        push_line(&mut out, "BEGIN:VEVENT");
        push_line(&mut out, &format!("UID:{}@{UID_DOMAIN}", escape_text(&b.id)));
        push_line(&mut out, &format!("DTSTAMP:{dtstamp}"));
        push_line(&mut out, &format!("SUMMARY:{}", escape_text(&b.name)));
        push_line(&mut out, &format!("DTSTART:{}", format_ics_time(b.start)));
        push_line(&mut out, &format!("DTEND:{}", format_ics_time(b.end)));
        push_line(&mut out, "END:VEVENT");
    }

    push_line(&mut out, "END:VCALENDAR");
    out
}

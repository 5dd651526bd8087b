//! Input validation.
//!
//! JSON payloads are parsed against a strict schema: unknown fields and
//! missing required fields are rejected before any model value is built.
//! Schedules produced outside the packer (e.g. by an external assistant)
//! go through [`parse_external_schedule`] before they are trusted.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::error::ValidationError;
use crate::logic::{self, ScheduleOutcome};
use crate::models::{BlockKind, FixedInterval, FlexibleTaskRequest, ScheduledBlock};

/// Body of a stateless scheduling run.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScheduleRequest {
    pub fixed_intervals: Vec<FixedInterval>,
    pub tasks: Vec<FlexibleTaskRequest>,
    pub work_day_start: DateTime<FixedOffset>,
    pub work_day_end: DateTime<FixedOffset>,
}

impl ScheduleRequest {
    pub fn run(&self) -> Result<ScheduleOutcome, ValidationError> {
        logic::schedule(
            &self.fixed_intervals,
            &self.tasks,
            self.work_day_start,
            self.work_day_end,
        )
    }
}

pub fn parse_schedule_request(text: &str) -> Result<ScheduleRequest, ValidationError> {
    Ok(serde_json::from_str(text)?)
}

pub fn check_interval(f: &FixedInterval, field: &str) -> Result<(), ValidationError> {
    if f.start >= f.end {
        return Err(ValidationError::InvalidTimeRange {
            field: field.to_string(),
            start: f.start,
            end: f.end,
        });
    }
    Ok(())
}

pub fn check_task(t: &FlexibleTaskRequest, field: &str) -> Result<(), ValidationError> {
    if t.total_duration <= 0 {
        return Err(ValidationError::invalid(
            format!("{field}.totalDuration"),
            "must be greater than 0",
        ));
    }
    if t.min_chunk <= 0 {
        return Err(ValidationError::invalid(
            format!("{field}.minChunk"),
            "must be greater than 0",
        ));
    }
    if t.min_chunk > t.max_chunk {
        return Err(ValidationError::invalid(
            format!("{field}.minChunk"),
            format!("{} exceeds maxChunk {}", t.min_chunk, t.max_chunk),
        ));
    }
    Ok(())
}

/// Reject malformed scheduler input.
///
/// Field names follow the wire format, e.g. `tasks[2].minChunk`.
pub fn validate_inputs(
    fixed: &[FixedInterval],
    tasks: &[FlexibleTaskRequest],
    day_start: DateTime<FixedOffset>,
    day_end: DateTime<FixedOffset>,
) -> Result<(), ValidationError> {
    if day_start >= day_end {
        return Err(ValidationError::InvalidTimeRange {
            field: "workDayStart".to_string(),
            start: day_start,
            end: day_end,
        });
    }

    let mut seen = HashSet::new();
    for (i, f) in fixed.iter().enumerate() {
        check_interval(f, &format!("fixedIntervals[{i}]"))?;
        if !seen.insert(f.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                field: "fixedIntervals".to_string(),
                id: f.id.clone(),
            });
        }
    }

    let mut seen = HashSet::new();
    for (i, t) in tasks.iter().enumerate() {
        check_task(t, &format!("tasks[{i}]"))?;
        if !seen.insert(t.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                field: "tasks".to_string(),
                id: t.id.clone(),
            });
        }
    }

    Ok(())
}

// Assistants like to wrap JSON in ```json fences
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn overlaps(a: &ScheduledBlock, start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> bool {
    a.start < end && start < a.end
}

/// Parse and check a schedule produced outside the packer.
///
/// The reference intervals and working hours are checked like scheduler
/// input. Every block must have `start < end`. Task blocks must sit inside working
/// hours and must not overlap a fixed interval or another task block.
/// Returns the blocks sorted by start.
pub fn parse_external_schedule(
    text: &str,
    fixed: &[FixedInterval],
    day_start: DateTime<FixedOffset>,
    day_end: DateTime<FixedOffset>,
) -> Result<Vec<ScheduledBlock>, ValidationError> {
    validate_inputs(fixed, &[], day_start, day_end)?;
    let mut blocks: Vec<ScheduledBlock> = serde_json::from_str(strip_code_fences(text))?;

    for (i, b) in blocks.iter().enumerate() {
        let field = format!("blocks[{i}]");
        if b.start >= b.end {
            return Err(ValidationError::InvalidTimeRange {
                field,
                start: b.start,
                end: b.end,
            });
        }
        if b.kind != BlockKind::Task {
            continue;
        }
        if b.start < day_start || b.end > day_end {
            return Err(ValidationError::invalid(field, "outside working hours"));
        }
        if let Some(f) = fixed.iter().find(|f| f.start < b.end && b.start < f.end) {
            return Err(ValidationError::Overlap {
                field,
                other: f.id.clone(),
            });
        }
    }

    blocks.sort_by_key(|b| b.start);

    let tasks: Vec<&ScheduledBlock> = blocks.iter().filter(|b| b.kind == BlockKind::Task).collect();
    for pair in tasks.windows(2) {
        if overlaps(pair[0], pair[1].start, pair[1].end) {
            return Err(ValidationError::Overlap {
                field: pair[1].id.clone(),
                other: pair[0].id.clone(),
            });
        }
    }

    Ok(blocks)
}

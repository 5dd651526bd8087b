/*
Interval-packing scheduler.
Module is independent from HTTP / Axum so it can be tested directly
*/

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ValidationError;
use crate::models::{BlockKind, DaySettings, FixedInterval, FlexibleTaskRequest, ScheduledBlock};
use crate::validate::validate_inputs;

// Contiguous span of unallocated time inside working hours.
// Consuming time only ever advances `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl FreeWindow {
    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    // Take `minutes` off the front of the window, returning the taken span
    fn consume(&mut self, minutes: i64) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
        let start = self.start;
        let end = start + Duration::minutes(minutes);
        self.start = end;
        (start, end)
    }
}

// Task that could not be (fully) placed. Informational, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnplacedTask {
    pub task_id: String,
    pub name: String,
    pub requested_minutes: i64,
    pub unplaced_minutes: i64,
}

// Result of one scheduling run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOutcome {
    pub blocks: Vec<ScheduledBlock>, // fixed + placed, sorted by start
    pub unplaced: Vec<UnplacedTask>, // in placement order
}

impl ScheduleOutcome {
    /// True when every task was placed in full.
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }

    pub fn unplaced_minutes(&self, task_id: &str) -> i64 {
        self.unplaced
            .iter()
            .find(|u| u.task_id == task_id)
            .map(|u| u.unplaced_minutes)
            .unwrap_or(0)
    }
}

// Time span placed for one task inside window `window_index`
#[derive(Debug, Clone)]
struct Placement {
    window_index: usize,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

// Free windows between fixed intervals, clamped to working hours.
//
// The cursor only moves forward, so overlapping or back-to-back
// fixed intervals collapse into a single busy span.
pub fn free_windows(
    fixed: &[FixedInterval],
    day_start: DateTime<FixedOffset>,
    day_end: DateTime<FixedOffset>,
) -> Vec<FreeWindow> {
    let mut sorted: Vec<&FixedInterval> = fixed.iter().collect();
    sorted.sort_by_key(|f| f.start);

    let mut windows = Vec::new();
    let mut cursor = day_start;

    for f in sorted {
        if cursor >= day_end {
            break;
        }
        if f.start > cursor {
            windows.push(FreeWindow {
                start: cursor,
                end: f.start.min(day_end),
            });
        }
        cursor = cursor.max(f.end);
    }

    if cursor < day_end {
        windows.push(FreeWindow {
            start: cursor,
            end: day_end,
        });
    }

    windows
}

// Tasks in placement order.
//
// Sorting rules:
// 1) Higher priority weight first
// 2) If tied, original input order (stable sort)
pub fn order_tasks(tasks: &[FlexibleTaskRequest]) -> Vec<&FlexibleTaskRequest> {
    let mut ordered: Vec<&FlexibleTaskRequest> = tasks.iter().collect();
    ordered.sort_by(|a, b| b.priority.weight().cmp(&a.priority.weight()));
    ordered
}

// Size of the next fragment for a task that cannot be placed whole here.
//
// Never above `max_chunk`, never below `min_chunk`. Trims the fragment when
// taking the full amount would leave a tail too short to ever be placed.
fn chunk_size(capacity: i64, remaining: i64, min_chunk: i64, max_chunk: i64) -> Option<i64> {
    let size = capacity.min(max_chunk).min(remaining);
    if size < min_chunk {
        return None;
    }

    let tail = remaining - size;
    if tail > 0 && tail < min_chunk {
        let trimmed = remaining - min_chunk;
        if trimmed >= min_chunk {
            return Some(trimmed);
        }
    }
    Some(size)
}

// Greedily fill windows left to right with one task.
// Returns the placements made and the minutes left over.
fn pack_task(task: &FlexibleTaskRequest, windows: &mut [FreeWindow]) -> (Vec<Placement>, i64) {
    // a task shorter than its min chunk may still be placed whole
    let min_chunk = task.min_chunk.min(task.total_duration);
    let max_chunk = task.max_chunk;

    let mut remaining = task.total_duration;
    let mut placements: Vec<Placement> = Vec::new();

    for (index, window) in windows.iter_mut().enumerate() {
        // a window keeps hosting fragments while it has room
        while remaining > 0 {
            let capacity = window.minutes();
            if capacity <= 0 {
                break;
            }

            let split = !placements.is_empty();
            let fits_whole = capacity >= remaining
                && remaining <= max_chunk
                && (!split || remaining >= min_chunk);

            let size = if fits_whole {
                remaining
            } else {
                match chunk_size(capacity, remaining, min_chunk, max_chunk) {
                    Some(size) => size,
                    None => break,
                }
            };

            let (start, end) = window.consume(size);
            placements.push(Placement {
                window_index: index,
                start,
                end,
            });
            remaining -= size;
        }

        if remaining == 0 {
            break;
        }
    }

    (placements, remaining)
}

// Turn a task's placements into output blocks.
// Chunk status belongs to the whole placement set, not to a single attempt.
fn placement_blocks(task: &FlexibleTaskRequest, placements: Vec<Placement>) -> Vec<ScheduledBlock> {
    let is_chunk = placements.len() > 1;
    let mut blocks = Vec::with_capacity(placements.len());
    let mut last_window = None;
    let mut nth_in_window = 0;

    for p in placements {
        if last_window == Some(p.window_index) {
            nth_in_window += 1;
        } else {
            last_window = Some(p.window_index);
            nth_in_window = 1;
        }

        let (id, name) = if is_chunk {
            let id = if nth_in_window == 1 {
                format!("{}-chunk-{}", task.id, p.window_index)
            } else {
                format!("{}-chunk-{}-{}", task.id, p.window_index, nth_in_window)
            };
            (id, format!("{} (Part)", task.name))
        } else {
            (task.id.clone(), task.name.clone())
        };

        blocks.push(ScheduledBlock {
            id,
            name,
            start: p.start,
            end: p.end,
            kind: BlockKind::Task,
            is_chunk,
        });
    }

    blocks
}

/// Pack flexible tasks into the free time around fixed intervals.
///
/// Process:
/// - Validate input, failing on the first malformed field
/// - Echo fixed intervals as `fixed` blocks
/// - Derive free windows within `[day_start, day_end)`
/// - Place tasks by priority, splitting across windows when needed
/// - Report minutes that could not be placed per task
/// - Return every block sorted by start time
///
/// The run is deterministic: identical input gives identical output.
pub fn schedule(
    fixed: &[FixedInterval],
    tasks: &[FlexibleTaskRequest],
    day_start: DateTime<FixedOffset>,
    day_end: DateTime<FixedOffset>,
) -> Result<ScheduleOutcome, ValidationError> {
    validate_inputs(fixed, tasks, day_start, day_end)?;

    let mut blocks: Vec<ScheduledBlock> = fixed
        .iter()
        .map(|f| ScheduledBlock {
            id: f.id.clone(),
            name: f.name.clone(),
            start: f.start,
            end: f.end,
            kind: BlockKind::Fixed,
            is_chunk: false,
        })
        .collect();

    let mut windows = free_windows(fixed, day_start, day_end);
    debug!(
        fixed = fixed.len(),
        tasks = tasks.len(),
        windows = windows.len(),
        "computed free windows"
    );

    let mut unplaced = Vec::new();
    for task in order_tasks(tasks) {
        let (placements, remaining) = pack_task(task, &mut windows);
        debug!(task_id = %task.id, pieces = placements.len(), remaining, "placed task");

        if remaining > 0 {
            warn!(
                task_id = %task.id,
                requested = task.total_duration,
                unplaced = remaining,
                "insufficient free time for task"
            );
            unplaced.push(UnplacedTask {
                task_id: task.id.clone(),
                name: task.name.clone(),
                requested_minutes: task.total_duration,
                unplaced_minutes: remaining,
            });
        }

        blocks.extend(placement_blocks(task, placements));
    }

    blocks.sort_by_key(|b| b.start);

    Ok(ScheduleOutcome { blocks, unplaced })
}

// Parse a "HH:MM" string into a DateTime on the given date.
pub fn parse_hhmm_on(
    date: NaiveDate,
    hhmm: &str,
    offset: FixedOffset,
) -> Option<DateTime<FixedOffset>> {
    let (h, m) = hhmm.split_once(':')?;
    let h: u32 = h.trim().parse().ok()?;
    let m: u32 = m.trim().parse().ok()?;
    let naive = date.and_hms_opt(h, m, 0)?;
    offset.from_local_datetime(&naive).single()
}

/// Working-hours bounds for `date` taken from the day settings.
pub fn working_hours(
    date: NaiveDate,
    settings: &DaySettings,
    offset: FixedOffset,
) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>), ValidationError> {
    let start = parse_hhmm_on(date, &settings.day_start, offset)
        .ok_or_else(|| ValidationError::invalid("dayStart", "expected HH:MM"))?;
    let end = parse_hhmm_on(date, &settings.day_end, offset)
        .ok_or_else(|| ValidationError::invalid("dayEnd", "expected HH:MM"))?;
    Ok((start, end))
}

// Appointments that overlap `[day_start, day_end)`, whatever offset they were saved in.
// One scheduling run covers a single day.
pub fn appointments_within(
    appointments: &[FixedInterval],
    day_start: DateTime<FixedOffset>,
    day_end: DateTime<FixedOffset>,
) -> Vec<FixedInterval> {
    appointments
        .iter()
        .filter(|a| a.start < day_end && day_start < a.end)
        .cloned()
        .collect()
}

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

// Ordinal priority category of a flexible task.
// Wire names match what the task form submits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Priority {
    High,
    Medium,
    Low,
    #[serde(rename = "Based on Due Date")]
    BasedOnDueDate,
}

impl Priority {
    /// Placement weight, higher is scheduled first.
    ///
    /// `BasedOnDueDate` is a flat `Medium`; the due date itself is not consulted.
    pub fn weight(self) -> i64 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
            Priority::BasedOnDueDate => 2,
        }
    }
}

// Immovable busy period (appointment)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FixedInterval {
    pub id: String,
    pub name: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

// Unit of flexible work to place around fixed intervals
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FlexibleTaskRequest {
    pub id: String,
    pub name: String,
    pub total_duration: i64, // minutes
    pub min_chunk: i64,      // minutes
    pub max_chunk: i64,      // minutes
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date_days: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Fixed,
    Task,
}

// One entry on the produced timeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScheduledBlock {
    pub id: String,
    pub name: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub kind: BlockKind,
    #[serde(default)]
    pub is_chunk: bool,
}

impl ScheduledBlock {
    pub fn duration_min(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

// Defaults applied to tasks created without explicit chunk bounds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskDefaults {
    pub duration: i64,
    pub min_chunk: i64,
    pub max_chunk: i64,
}

impl Default for TaskDefaults {
    fn default() -> Self {
        Self {
            duration: 60,
            min_chunk: 30,
            max_chunk: 120,
        }
    }
}

// Minutes of slack around appointments / between tasks.
// Saved with the settings; the packer does not apply them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BufferTimes {
    pub appointments: i64,
    pub tasks: i64,
}

impl Default for BufferTimes {
    fn default() -> Self {
        Self {
            appointments: 15,
            tasks: 10,
        }
    }
}

fn default_categories() -> Vec<String> {
    ["Personal", "Academic", "Physical", "Military"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DaySettings {
    pub day_start: String, // "HH:MM"
    pub day_end: String,   // "HH:MM"
    #[serde(default)]
    pub task_defaults: TaskDefaults,
    #[serde(default)]
    pub buffer_times: BufferTimes,
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    #[serde(default)]
    pub rules: Vec<String>, // free-text scheduling rules
}

impl Default for DaySettings {
    fn default() -> Self {
        Self {
            day_start: "08:00".to_string(),
            day_end: "22:00".to_string(),
            task_defaults: TaskDefaults::default(),
            buffer_times: BufferTimes::default(),
            categories: default_categories(),
            rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Db {
    #[serde(default)]
    pub settings: DaySettings,
    #[serde(default)]
    pub tasks: Vec<FlexibleTaskRequest>,
    #[serde(default)]
    pub appointments: Vec<FixedInterval>,
}

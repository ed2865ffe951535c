//! The session context aggregate.
//!
//! [`Context`] is the single mutable snapshot of session telemetry plus the
//! classification derived from it. It is owned exclusively by the
//! [`ContextTracker`](super::ContextTracker); every other component reads
//! defensive clones.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::stage::{UserIntent, WorkflowStage};

/// Cap on `recent_files` (most-recent first).
pub const MAX_RECENT_FILES: usize = 10;

/// One externally-observed tool, as reported by the desktop-integration
/// bridge. Replaced wholesale on every telemetry push, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRecord {
    pub name: String,
    /// Lower-cased process name.
    pub process_name: String,
    #[serde(default)]
    pub window_title: Option<String>,
    pub is_active: bool,
    pub last_active: DateTime<Utc>,
}

/// Coarse wall-clock bucket, recomputed hourly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    /// Bucket for an hour in `0..24`: 06-11 morning, 12-16 afternoon,
    /// 17-21 evening, else night.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=21 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }

    pub fn now() -> Self {
        Self::from_hour(chrono::Local::now().hour())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Night => "night",
        }
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The canonical in-memory session snapshot.
///
/// `workflow_stage`, `blender_stage` and `stage_confidence` are written
/// only by the tracker's inference pass; they always reflect the last run
/// over the current `active_tools` / `detected_file_types`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub active_tools: Vec<ToolRecord>,
    #[serde(default)]
    pub current_project: Option<String>,
    /// Most-recent first, at most [`MAX_RECENT_FILES`] entries.
    pub recent_files: Vec<String>,
    /// Lower-cased extensions with a leading dot, first-seen order, no
    /// duplicates. Derived from `recent_files`.
    #[serde(default)]
    pub detected_file_types: Vec<String>,
    pub user_intent: UserIntent,
    pub workflow_stage: WorkflowStage,
    #[serde(default)]
    pub blender_stage: Option<crate::stage::BlenderStage>,
    pub time_of_day: TimeOfDay,
    pub session_duration_secs: u64,
    pub stage_confidence: f32,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            active_tools: Vec::new(),
            current_project: None,
            recent_files: Vec::new(),
            detected_file_types: Vec::new(),
            user_intent: UserIntent::GeneralModding,
            workflow_stage: WorkflowStage::Planning,
            blender_stage: None,
            time_of_day: TimeOfDay::now(),
            session_duration_secs: 0,
            stage_confidence: 1.0,
        }
    }
}

impl Context {
    /// Lower-cased extension of `path` (after the last `.`), with a
    /// leading dot. `None` when the path has no extension.
    pub fn file_extension(path: &str) -> Option<String> {
        let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(format!(".{}", ext.to_lowercase()))
    }

    /// Derive the file-type set from a file list: first-seen order,
    /// deduplicated, lower-cased.
    pub fn derive_file_types(files: &[String]) -> Vec<String> {
        let mut types = Vec::new();
        for file in files {
            if let Some(ext) = Self::file_extension(file) {
                if !types.contains(&ext) {
                    types.push(ext);
                }
            }
        }
        types
    }
}

//! Context tracker: owns the canonical [`Context`] and applies telemetry.
//!
//! Every update re-runs stage/intent inference synchronously before the
//! new snapshot is persisted, so readers never observe a stage that is
//! stale relative to the tool list. Persistence is best-effort: failures
//! are logged and the in-memory context stays authoritative.

use std::sync::Arc;

use crate::context::model::{Context, TimeOfDay, ToolRecord, MAX_RECENT_FILES};
use crate::stage;
use crate::storage::{EngineConfig, SnapshotStore};

/// Fixed key the snapshot is persisted under.
pub const SNAPSHOT_KEY: &str = "current-context";

/// Owns and mutates the session [`Context`].
pub struct ContextTracker {
    context: Context,
    store: Arc<dyn SnapshotStore>,
    snapshot_ttl: chrono::Duration,
}

impl ContextTracker {
    /// Create a tracker, restoring the last persisted snapshot when one
    /// exists. A missing or corrupt snapshot silently falls back to the
    /// defaults (planning stage, full confidence, empty collections).
    pub fn new(store: Arc<dyn SnapshotStore>, config: &EngineConfig) -> Self {
        let mut context = match store.load(SNAPSHOT_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("discarding corrupt context snapshot: {e}");
                Context::default()
            }),
            Ok(None) => Context::default(),
            Err(e) => {
                log::warn!("failed to restore context snapshot: {e}");
                Context::default()
            }
        };
        // The persisted bucket may be hours old.
        context.time_of_day = TimeOfDay::now();

        Self {
            context,
            store,
            snapshot_ttl: config.snapshot_ttl(),
        }
    }

    /// Defensive copy of the current context.
    pub fn context(&self) -> Context {
        self.context.clone()
    }

    /// Replace the active tool list and re-run stage and intent inference.
    pub fn update_tool_context(&mut self, tools: Vec<ToolRecord>) {
        self.context.active_tools = tools;
        self.reinfer();
        self.persist();
    }

    /// Replace the recent-file list (truncated to the 10 most recent,
    /// most-recent first) and recompute the derived file-type set. File
    /// types influence sub-stage detection, so inference re-runs too.
    pub fn update_file_context(&mut self, mut files: Vec<String>, project: Option<String>) {
        files.truncate(MAX_RECENT_FILES);
        self.context.detected_file_types = Context::derive_file_types(&files);
        self.context.recent_files = files;
        if let Some(project) = project {
            self.context.current_project = Some(project);
        }
        self.reinfer();
        self.persist();
    }

    /// Recompute the wall-clock bucket. Idempotent within an hour.
    pub fn tick_time_of_day(&mut self) {
        self.context.time_of_day = TimeOfDay::now();
    }

    /// Advance the session counter by one minute and re-persist.
    pub fn tick_session_minute(&mut self) {
        self.context.session_duration_secs += 60;
        self.persist();
    }

    fn reinfer(&mut self) {
        let inference = stage::infer_stage(
            &self.context.active_tools,
            &self.context.detected_file_types,
        );
        self.context.workflow_stage = inference.stage;
        self.context.blender_stage = inference.blender_stage;
        self.context.stage_confidence = inference.confidence;
        self.context.user_intent = stage::infer_intent(&self.context.active_tools);
    }

    fn persist(&self) {
        let raw = match serde_json::to_string(&self.context) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("failed to serialize context snapshot: {e}");
                return;
            }
        };
        if let Err(e) = self.store.save(SNAPSHOT_KEY, &raw, self.snapshot_ttl) {
            log::warn!("failed to persist context snapshot: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{UserIntent, WorkflowStage};
    use crate::storage::MemoryStore;
    use chrono::Utc;

    fn tracker() -> (ContextTracker, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let tracker = ContextTracker::new(store.clone(), &EngineConfig::default());
        (tracker, store)
    }

    fn tool(name: &str, title: Option<&str>) -> ToolRecord {
        ToolRecord {
            name: name.to_string(),
            process_name: name.to_lowercase(),
            window_title: title.map(str::to_string),
            is_active: true,
            last_active: Utc::now(),
        }
    }

    #[test]
    fn tool_update_runs_inference_and_persists() {
        let (mut tracker, store) = tracker();
        tracker.update_tool_context(vec![tool("Blender", Some("Armature Edit Mode"))]);

        let ctx = tracker.context();
        assert_eq!(ctx.workflow_stage, WorkflowStage::Rigging);
        assert_eq!(ctx.stage_confidence, 0.85);
        assert_eq!(ctx.user_intent, UserIntent::ThreeDModeling);

        let raw = store.load(SNAPSHOT_KEY).unwrap().unwrap();
        let saved: Context = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved.workflow_stage, WorkflowStage::Rigging);
    }

    #[test]
    fn file_signals_do_not_override_no_tool_default() {
        let (mut tracker, _) = tracker();
        tracker.update_file_context(
            vec!["model.nif".to_string(), "texture.dds".to_string()],
            None,
        );

        let ctx = tracker.context();
        assert_eq!(ctx.detected_file_types, vec![".nif", ".dds"]);
        assert_eq!(ctx.workflow_stage, WorkflowStage::Planning);
        assert_eq!(ctx.stage_confidence, 1.0);
    }

    #[test]
    fn recent_files_are_capped_at_ten() {
        let (mut tracker, _) = tracker();
        let files: Vec<String> = (0..25).map(|i| format!("file{i}.nif")).collect();
        tracker.update_file_context(files, None);

        let ctx = tracker.context();
        assert_eq!(ctx.recent_files.len(), 10);
        assert_eq!(ctx.recent_files[0], "file0.nif");
    }

    #[test]
    fn file_update_can_refine_substage() {
        let (mut tracker, _) = tracker();
        tracker.update_tool_context(vec![tool("Blender", None)]);
        assert_eq!(tracker.context().workflow_stage, WorkflowStage::Modeling);

        tracker.update_file_context(vec!["out.fbx".to_string()], Some("MyMod".to_string()));
        let ctx = tracker.context();
        assert_eq!(ctx.workflow_stage, WorkflowStage::Export);
        assert_eq!(ctx.current_project.as_deref(), Some("MyMod"));
    }

    #[test]
    fn restores_persisted_snapshot() {
        let store = Arc::new(MemoryStore::new());
        {
            let mut tracker = ContextTracker::new(store.clone(), &EngineConfig::default());
            tracker.update_tool_context(vec![tool("LOOT", None)]);
            tracker.tick_session_minute();
        }

        let tracker = ContextTracker::new(store, &EngineConfig::default());
        let ctx = tracker.context();
        assert_eq!(ctx.workflow_stage, WorkflowStage::Testing);
        assert_eq!(ctx.session_duration_secs, 60);
    }

    #[test]
    fn corrupt_snapshot_falls_back_to_defaults() {
        let store = Arc::new(MemoryStore::new());
        store
            .save(SNAPSHOT_KEY, "not json", chrono::Duration::hours(1))
            .unwrap();

        let tracker = ContextTracker::new(store, &EngineConfig::default());
        let ctx = tracker.context();
        assert_eq!(ctx.workflow_stage, WorkflowStage::Planning);
        assert_eq!(ctx.stage_confidence, 1.0);
    }
}

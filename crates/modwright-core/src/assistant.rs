//! The composed assistant service.
//!
//! [`Assistant`] wires the context tracker, suggestion generator and
//! warning engine together behind one explicitly-constructed object (no
//! module-load singletons) and enforces the update ordering: within one
//! telemetry push, stage inference completes and the context event is
//! published before the suggestion and warning passes run, so consumers
//! never see a suggestions or warnings refresh against a stale stage.
//!
//! All inference is synchronous. Wall-clock cadence (hourly time-of-day,
//! per-minute session counter, suggestion refresh, warning backstop) is
//! driven by [`tick`](Assistant::tick); [`start`](Assistant::start) just
//! spawns a tokio task that calls it once per second.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;

use crate::context::{Context, ContextTracker, ToolRecord};
use crate::error::CoreError;
use crate::events::{Subscription, Topic};
use crate::storage::{EngineConfig, SnapshotStore, SqliteStore};
use crate::suggest::{Suggestion, SuggestionGenerator};
use crate::warn::{
    ErrorHistory, ErrorRecord, FixOutcome, ProactiveWarning, ValidationResult, WarningCount,
    WarningEngine,
};

struct Inner {
    tracker: ContextTracker,
    suggester: SuggestionGenerator,
    warner: WarningEngine,
    last_hour_tick: DateTime<Utc>,
    last_minute_tick: DateTime<Utc>,
    last_suggest_tick: DateTime<Utc>,
    last_warning_tick: DateTime<Utc>,
}

/// Context inference and proactive-warning engine for one session.
pub struct Assistant {
    inner: Mutex<Inner>,
    config: EngineConfig,
    history: ErrorHistory,
    context_topic: Topic<Context>,
    suggestions_topic: Topic<Vec<Suggestion>>,
    warnings_topic: Topic<Vec<ProactiveWarning>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Assistant {
    /// Build an assistant over an explicit store and configuration.
    pub fn new(store: Arc<dyn SnapshotStore>, config: EngineConfig) -> Self {
        let now = Utc::now();
        let history = ErrorHistory::new(store.clone());
        let inner = Inner {
            tracker: ContextTracker::new(store, &config),
            suggester: SuggestionGenerator::new(&config),
            warner: WarningEngine::new(&config),
            last_hour_tick: now,
            last_minute_tick: now,
            last_suggest_tick: now,
            last_warning_tick: now,
        };
        Self {
            inner: Mutex::new(inner),
            config,
            history,
            context_topic: Topic::new(),
            suggestions_topic: Topic::new(),
            warnings_topic: Topic::new(),
            timer: Mutex::new(None),
        }
    }

    /// Build an assistant over the default on-disk store and config file.
    ///
    /// # Errors
    /// Returns an error if the backing database cannot be opened.
    pub fn open() -> Result<Self, CoreError> {
        let store = Arc::new(SqliteStore::open()?);
        Ok(Self::new(store, EngineConfig::load()))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ── Telemetry input ─────────────────────────────────────────────

    /// Replace the active tool list with a complete snapshot.
    pub fn update_tool_context(&self, tools: Vec<ToolRecord>) {
        let ctx = {
            let mut inner = self.lock();
            inner.tracker.update_tool_context(tools);
            inner.tracker.context()
        };
        self.context_topic.publish(&ctx);
        self.refresh_suggestions(&ctx);
        self.refresh_warnings(&ctx, Utc::now());
    }

    /// Replace the recent-file list (and optionally the current project).
    pub fn update_file_context(&self, files: Vec<String>, project: Option<String>) {
        let ctx = {
            let mut inner = self.lock();
            inner.tracker.update_file_context(files, project);
            inner.tracker.context()
        };
        self.context_topic.publish(&ctx);
        self.refresh_suggestions(&ctx);
        self.refresh_warnings(&ctx, Utc::now());
    }

    fn refresh_suggestions(&self, ctx: &Context) {
        let list = self.lock().suggester.regenerate(ctx);
        self.suggestions_topic.publish(&list);
    }

    fn refresh_warnings(&self, ctx: &Context, now: DateTime<Utc>) {
        let ran = {
            let mut inner = self.lock();
            inner.warner.check_at(ctx, now)
        };
        if ran {
            let warnings = self.lock().warner.current_warnings();
            self.warnings_topic.publish(&warnings);
        }
    }

    // ── Cadence ─────────────────────────────────────────────────────

    /// Advance the wall-clock-driven state. Idempotent within each
    /// interval; safe to call as often as the host likes.
    pub fn tick(&self, now: DateTime<Utc>) {
        let mut refresh_suggestions = false;
        let mut refresh_warnings = false;
        {
            let mut inner = self.lock();
            if now - inner.last_hour_tick >= Duration::hours(1) {
                inner.last_hour_tick = now;
                inner.tracker.tick_time_of_day();
            }
            if now - inner.last_minute_tick >= Duration::seconds(60) {
                inner.last_minute_tick = now;
                inner.tracker.tick_session_minute();
            }
            if now - inner.last_suggest_tick
                >= Duration::seconds(self.config.suggestion_interval_secs as i64)
            {
                inner.last_suggest_tick = now;
                refresh_suggestions = true;
            }
            if now - inner.last_warning_tick
                >= Duration::seconds(self.config.warning_interval_secs as i64)
            {
                inner.last_warning_tick = now;
                refresh_warnings = true;
            }
        }

        if refresh_suggestions || refresh_warnings {
            let ctx = self.current_context();
            if refresh_suggestions {
                self.refresh_suggestions(&ctx);
            }
            if refresh_warnings {
                self.refresh_warnings(&ctx, now);
            }
        }
    }

    /// Spawn the timer task driving [`tick`](Self::tick) once per second.
    /// Requires a tokio runtime. Calling `start` twice replaces the
    /// previous task.
    pub fn start(self: &Arc<Self>) {
        let assistant = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                assistant.tick(Utc::now());
            }
        });
        if let Some(previous) = self.swap_timer(Some(handle)) {
            previous.abort();
        }
    }

    /// Tear down the timer task. The assistant itself stays usable.
    pub fn stop(&self) {
        if let Some(handle) = self.swap_timer(None) {
            handle.abort();
        }
    }

    fn swap_timer(&self, handle: Option<JoinHandle<()>>) -> Option<JoinHandle<()>> {
        let mut timer = self
            .timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *timer, handle)
    }

    // ── Event bus ───────────────────────────────────────────────────

    /// Subscribe to context updates. Each delivery carries the entire
    /// current context, never a diff.
    pub fn on_context_update(
        &self,
        callback: impl Fn(&Context) + Send + Sync + 'static,
    ) -> Subscription {
        self.context_topic.subscribe(callback)
    }

    /// Subscribe to suggestion-list updates.
    pub fn on_suggestions_update(
        &self,
        callback: impl Fn(&Vec<Suggestion>) + Send + Sync + 'static,
    ) -> Subscription {
        self.suggestions_topic.subscribe(callback)
    }

    /// Subscribe to warning-list updates.
    pub fn on_warnings_update(
        &self,
        callback: impl Fn(&Vec<ProactiveWarning>) + Send + Sync + 'static,
    ) -> Subscription {
        self.warnings_topic.subscribe(callback)
    }

    // ── Query surface ───────────────────────────────────────────────

    pub fn current_context(&self) -> Context {
        self.lock().tracker.context()
    }

    pub fn current_suggestions(&self) -> Vec<Suggestion> {
        self.lock().suggester.current()
    }

    pub fn current_warnings(&self) -> Vec<ProactiveWarning> {
        self.lock().warner.current_warnings()
    }

    pub fn critical_warnings(&self) -> Vec<ProactiveWarning> {
        self.lock().warner.critical_warnings()
    }

    pub fn warning_count(&self) -> WarningCount {
        self.lock().warner.warning_count()
    }

    /// Dismiss one warning by id; publishes the updated list when the id
    /// was present.
    pub fn dismiss_warning(&self, id: &str) -> bool {
        let dismissed = self.lock().warner.dismiss(id);
        if dismissed {
            let warnings = self.current_warnings();
            self.warnings_topic.publish(&warnings);
        }
        dismissed
    }

    /// Run every available auto-fix sequentially, never concurrently.
    /// Successful fixes drop their warning; failures leave it active.
    pub async fn auto_fix_all(&self) -> FixOutcome {
        let fixes = self.lock().warner.fixable();
        let mut outcome = FixOutcome::default();
        for (id, fix) in fixes {
            match fix().await {
                Ok(()) => {
                    self.lock().warner.resolve(&id);
                    outcome.fixed += 1;
                }
                Err(e) => {
                    log::warn!("auto-fix for '{id}' failed: {e}");
                    outcome.failed += 1;
                }
            }
        }
        // Empty or all-unfixable set: nothing ran, nothing to announce.
        if outcome.fixed + outcome.failed > 0 {
            let warnings = self.current_warnings();
            self.warnings_topic.publish(&warnings);
        }
        outcome
    }

    /// Log an occurrence of a known error pattern against the current
    /// context. The history is persisted (capped, 30-day expiry) and
    /// feeds future tuning of the pattern catalog.
    pub fn record_error(&self, pattern_id: &str) {
        let ctx = self.current_context();
        self.history.record(pattern_id, &ctx);
    }

    /// Recorded pattern occurrences, oldest first.
    pub fn error_history(&self) -> Vec<ErrorRecord> {
        self.history.recent()
    }

    /// Fold the active warnings into a pre-export quality gate.
    pub fn validate_before_export(&self) -> ValidationResult {
        self.lock().warner.validate_before_export()
    }

    /// Append a flat, human-readable rendering of the current context to
    /// `base_prompt`, giving downstream advisory text session awareness.
    pub fn enhance_prompt_with_context(&self, base_prompt: &str) -> String {
        let ctx = self.current_context();
        let mut parts = Vec::new();

        let active: Vec<&str> = ctx
            .active_tools
            .iter()
            .filter(|t| t.is_active)
            .map(|t| t.name.as_str())
            .collect();
        if !active.is_empty() {
            parts.push(format!("Active Tools: {}", active.join(", ")));
        }
        if let Some(project) = &ctx.current_project {
            parts.push(format!("Current Project: {project}"));
        }
        parts.push(format!(
            "Workflow Stage: {} ({:.0}% confident)",
            ctx.workflow_stage,
            ctx.stage_confidence * 100.0
        ));
        if let Some(sub) = ctx.blender_stage {
            parts.push(format!("Blender Stage: {sub}"));
        }
        parts.push(format!("User Intent: {}", ctx.user_intent));
        parts.push(format!("Time of Day: {}", ctx.time_of_day));
        parts.push(format!(
            "Session Length: {} min",
            ctx.session_duration_secs / 60
        ));
        if !ctx.detected_file_types.is_empty() {
            parts.push(format!(
                "File Types: {}",
                ctx.detected_file_types.join(", ")
            ));
        }
        if !ctx.recent_files.is_empty() {
            let head: Vec<&str> = ctx.recent_files.iter().take(3).map(String::as_str).collect();
            parts.push(format!("Recent Files: {}", head.join(", ")));
        }

        format!("{base_prompt}\n\nContext Information:\n{}", parts.join("\n"))
    }
}

impl Drop for Assistant {
    fn drop(&mut self) {
        self.stop();
    }
}

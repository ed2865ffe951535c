//! Proactive warning engine.
//!
//! A static catalog of [`ErrorPattern`]s is evaluated against the live
//! context. Each check cycle clears the active-warnings map, filters the
//! catalog to patterns applicable to the current workflow stage, runs
//! each surviving pattern's detector and rebuilds the map from scratch
//! ("replace, don't merge"). Cycles are debounced to at most one per
//! second; the host additionally re-runs them on a periodic backstop.
//!
//! Several detectors are deliberately broad templates: they key off the
//! stage, the active tools and session length rather than real tool
//! state, because the engine performs no file-content analysis.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::CoreError;
use crate::stage::{BlenderStage, WorkflowStage, IMAGE_TYPES};
use crate::storage::{EngineConfig, SnapshotStore};

/// Warning severity, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

/// Why a warning exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    ErrorPrevention,
    BestPractice,
    Optimization,
    Compatibility,
}

/// A transient, detector-fired instance of an error pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProactiveWarning {
    pub id: String,
    pub kind: WarningKind,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub stage: WorkflowStage,
    pub auto_fix_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learn_more: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Future returned by an auto-fix closure.
pub type AutoFixFuture = Pin<Box<dyn Future<Output = Result<(), CoreError>> + Send>>;

/// Asynchronous remediation attached to a warning.
pub type AutoFixFn = Arc<dyn Fn() -> AutoFixFuture + Send + Sync>;

/// What a detector hands back when its condition holds.
pub struct DetectedWarning {
    pub warning: ProactiveWarning,
    pub auto_fix: Option<AutoFixFn>,
}

/// Detector thresholds lifted from the engine configuration.
#[derive(Debug, Clone, Copy)]
pub struct WarnThresholds {
    pub long_session_secs: u64,
    pub scale_check_secs: u64,
}

impl From<&EngineConfig> for WarnThresholds {
    fn from(config: &EngineConfig) -> Self {
        Self {
            long_session_secs: config.long_session_secs,
            scale_check_secs: config.scale_check_secs,
        }
    }
}

/// Pattern-specific pure detector.
pub type DetectorFn = fn(&Context, &WarnThresholds) -> Option<DetectedWarning>;

/// One entry of the static error-pattern catalog.
pub struct ErrorPattern {
    pub id: &'static str,
    pub description: &'static str,
    pub severity: Severity,
    /// Stages this pattern is evaluated in; the detector never runs
    /// outside them.
    pub applicable_stages: &'static [WorkflowStage],
    /// Catalog-only entries carry no detector yet.
    pub detector: Option<DetectorFn>,
}

/// Per-severity tally of the active warnings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningCount {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// Counts returned by [`WarningEngine::auto_fix_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixOutcome {
    pub fixed: usize,
    pub failed: usize,
}

/// Result of folding the active warnings into a pre-export gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    /// Quality score in `0..=100`.
    pub score: u32,
    pub warnings: Vec<ProactiveWarning>,
    pub errors: Vec<ProactiveWarning>,
    pub suggestions: Vec<String>,
    pub can_proceed: bool,
}

/// Snapshot key of the persisted error history.
pub const ERROR_HISTORY_KEY: &str = "error-history";
/// The history keeps only the most recent occurrences.
pub const ERROR_HISTORY_CAP: usize = 100;
const ERROR_HISTORY_TTL_DAYS: i64 = 30;

/// One recorded occurrence of a known error pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub pattern_id: String,
    pub stage: WorkflowStage,
    pub tools: Vec<String>,
    pub file_types: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Persisted log of pattern occurrences, used to tune the catalog over
/// time. Storage failures never surface to callers.
pub struct ErrorHistory {
    store: Arc<dyn SnapshotStore>,
}

impl ErrorHistory {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    /// Append one occurrence of `pattern_id` against `ctx`, dropping the
    /// oldest entries past the cap. Failures are logged and swallowed.
    pub fn record(&self, pattern_id: &str, ctx: &Context) {
        let mut history = self.recent();
        history.push(ErrorRecord {
            pattern_id: pattern_id.to_string(),
            stage: ctx.workflow_stage,
            tools: ctx
                .active_tools
                .iter()
                .filter(|t| t.is_active)
                .map(|t| t.name.clone())
                .collect(),
            file_types: ctx.detected_file_types.clone(),
            recorded_at: Utc::now(),
        });
        let overflow = history.len().saturating_sub(ERROR_HISTORY_CAP);
        if overflow > 0 {
            history.drain(..overflow);
        }

        let payload = match serde_json::to_string(&history) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("failed to serialize error history: {e}");
                return;
            }
        };
        if let Err(e) = self.store.save(
            ERROR_HISTORY_KEY,
            &payload,
            chrono::Duration::days(ERROR_HISTORY_TTL_DAYS),
        ) {
            log::warn!("failed to persist error history: {e}");
        }
    }

    /// Recorded occurrences, oldest first. A missing, expired or corrupt
    /// history reads as empty.
    pub fn recent(&self) -> Vec<ErrorRecord> {
        match self.store.load(ERROR_HISTORY_KEY) {
            Ok(Some(payload)) => serde_json::from_str(&payload).unwrap_or_else(|e| {
                log::warn!("corrupt error history discarded: {e}");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("failed to load error history: {e}");
                Vec::new()
            }
        }
    }
}

struct ActiveWarning {
    warning: ProactiveWarning,
    auto_fix: Option<AutoFixFn>,
}

/// Owns the active-warnings map and the check-cycle state machine.
pub struct WarningEngine {
    catalog: Vec<ErrorPattern>,
    active: BTreeMap<String, ActiveWarning>,
    thresholds: WarnThresholds,
    debounce: chrono::Duration,
    last_check: Option<DateTime<Utc>>,
}

impl WarningEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_catalog(config, default_catalog())
    }

    /// Build an engine over a custom catalog (used by tests and by hosts
    /// that extend the pattern set).
    pub fn with_catalog(config: &EngineConfig, catalog: Vec<ErrorPattern>) -> Self {
        Self {
            catalog,
            active: BTreeMap::new(),
            thresholds: WarnThresholds::from(config),
            debounce: chrono::Duration::milliseconds(config.warning_debounce_ms as i64),
            last_check: None,
        }
    }

    /// Run one check cycle against `ctx`, debounced. Returns `true` when
    /// the cycle actually ran (the active set may have changed).
    pub fn check(&mut self, ctx: &Context) -> bool {
        self.check_at(ctx, Utc::now())
    }

    /// [`check`](Self::check) with an explicit clock, for tests and for
    /// tick-driven hosts.
    pub fn check_at(&mut self, ctx: &Context, now: DateTime<Utc>) -> bool {
        if let Some(last) = self.last_check {
            if now - last < self.debounce {
                return false;
            }
        }
        self.last_check = Some(now);

        self.active.clear();
        for pattern in &self.catalog {
            if !pattern.applicable_stages.contains(&ctx.workflow_stage) {
                continue;
            }
            let Some(detector) = pattern.detector else {
                continue;
            };
            if let Some(detected) = detector(ctx, &self.thresholds) {
                self.active.insert(
                    detected.warning.id.clone(),
                    ActiveWarning {
                        warning: detected.warning,
                        auto_fix: detected.auto_fix,
                    },
                );
            }
        }
        true
    }

    /// Defensive copies of the active warnings.
    pub fn current_warnings(&self) -> Vec<ProactiveWarning> {
        self.active.values().map(|a| a.warning.clone()).collect()
    }

    pub fn critical_warnings(&self) -> Vec<ProactiveWarning> {
        self.active
            .values()
            .filter(|a| a.warning.severity == Severity::Critical)
            .map(|a| a.warning.clone())
            .collect()
    }

    pub fn warning_count(&self) -> WarningCount {
        let mut count = WarningCount::default();
        for active in self.active.values() {
            match active.warning.severity {
                Severity::Critical => count.critical += 1,
                Severity::High => count.high += 1,
                Severity::Medium => count.medium += 1,
                Severity::Low => count.low += 1,
            }
        }
        count
    }

    /// Remove one warning by id. Returns whether it was present.
    pub fn dismiss(&mut self, id: &str) -> bool {
        self.active.remove(id).is_some()
    }

    /// Ids and remediation closures of every fixable active warning, in
    /// map order. The closures are cheap clones; awaiting them does not
    /// require holding the engine.
    pub fn fixable(&self) -> Vec<(String, AutoFixFn)> {
        self.active
            .values()
            .filter_map(|a| {
                a.auto_fix
                    .as_ref()
                    .map(|fix| (a.warning.id.clone(), fix.clone()))
            })
            .collect()
    }

    /// Remove a warning whose remediation succeeded.
    pub fn resolve(&mut self, id: &str) -> bool {
        self.active.remove(id).is_some()
    }

    /// Run every available auto-fix sequentially. Successful fixes remove
    /// their warning; failures are counted and the warning stays active.
    /// No rollback of partial fixes.
    pub async fn auto_fix_all(&mut self) -> FixOutcome {
        let mut outcome = FixOutcome::default();
        for (id, fix) in self.fixable() {
            match fix().await {
                Ok(()) => {
                    self.resolve(&id);
                    outcome.fixed += 1;
                }
                Err(e) => {
                    log::warn!("auto-fix for '{id}' failed: {e}");
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }

    /// Fold the active warnings into a pre-export quality gate.
    ///
    /// Critical warnings block (`can_proceed == false`); the score starts
    /// at 100 and loses 20 per critical, 10 per high and 5 per medium.
    pub fn validate_before_export(&self) -> ValidationResult {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();
        for active in self.active.values() {
            if active.warning.severity == Severity::Critical {
                errors.push(active.warning.clone());
            } else {
                warnings.push(active.warning.clone());
            }
        }

        let mut score: i32 = 100;
        score -= errors.len() as i32 * 20;
        score -= warnings
            .iter()
            .filter(|w| w.severity == Severity::High)
            .count() as i32
            * 10;
        score -= warnings
            .iter()
            .filter(|w| w.severity == Severity::Medium)
            .count() as i32
            * 5;
        let score = score.max(0) as u32;

        let mut suggestions = Vec::new();
        if !errors.is_empty() {
            suggestions.push("Fix critical issues before exporting".to_string());
        }
        if score < 70 {
            suggestions.push("Consider addressing warnings to improve quality".to_string());
        }
        if score >= 90 {
            suggestions.push("Asset looks good! Ready for export".to_string());
        }

        let passed = errors.is_empty();
        ValidationResult {
            passed,
            score,
            warnings,
            errors,
            suggestions,
            can_proceed: passed,
        }
    }
}

fn blender_active(ctx: &Context) -> bool {
    ctx.active_tools
        .iter()
        .any(|t| t.is_active && t.name.to_lowercase().contains("blender"))
}

fn logging_fix(action: &'static str) -> AutoFixFn {
    Arc::new(move || {
        Box::pin(async move {
            // Placeholder remediation: the real fix is dispatched to the
            // host's worker-task collaborator.
            log::info!("auto-fix requested: {action}");
            Ok(())
        })
    })
}

fn warning(
    id: &str,
    kind: WarningKind,
    title: &str,
    message: &str,
    severity: Severity,
    stage: WorkflowStage,
    auto_fix: Option<AutoFixFn>,
) -> DetectedWarning {
    DetectedWarning {
        warning: ProactiveWarning {
            id: id.to_string(),
            kind,
            title: title.to_string(),
            message: message.to_string(),
            severity,
            stage,
            auto_fix_available: auto_fix.is_some(),
            learn_more: None,
            created_at: Utc::now(),
        },
        auto_fix,
    }
}

fn detect_blender_scale(ctx: &Context, thresholds: &WarnThresholds) -> Option<DetectedWarning> {
    if !blender_active(ctx) || ctx.session_duration_secs <= thresholds.scale_check_secs {
        return None;
    }
    Some(warning(
        "warn-blender-scale",
        WarningKind::ErrorPrevention,
        "Scale Check Required",
        "Ensure all objects are at 1.0 scale in Blender. Fallout 4 requires this for proper sizing.",
        Severity::Critical,
        ctx.workflow_stage,
        Some(logging_fix("reset object scale to 1.0")),
    ))
}

fn detect_animation_fps(ctx: &Context, _: &WarnThresholds) -> Option<DetectedWarning> {
    if ctx.blender_stage != Some(BlenderStage::Animation) {
        return None;
    }
    let mut detected = warning(
        "warn-animation-fps",
        WarningKind::ErrorPrevention,
        "Animation FPS Critical",
        "Fallout 4 requires exactly 30 FPS for animations. Verify your timeline settings before exporting.",
        Severity::Critical,
        WorkflowStage::Animation,
        Some(logging_fix("set timeline to 30 FPS")),
    );
    detected.warning.learn_more = Some("/guides/animation".to_string());
    Some(detected)
}

fn detect_texture_paths(ctx: &Context, _: &WarnThresholds) -> Option<DetectedWarning> {
    let has_textures = ctx
        .detected_file_types
        .iter()
        .any(|t| IMAGE_TYPES.contains(&t.as_str()));
    if !has_textures {
        return None;
    }
    Some(warning(
        "warn-texture-paths",
        WarningKind::ErrorPrevention,
        "Texture Path Validation",
        "Ensure texture paths are relative, not absolute. Absolute paths will break your mod on other systems.",
        Severity::Critical,
        ctx.workflow_stage,
        Some(logging_fix("rewrite texture paths as relative")),
    ))
}

fn detect_poly_count(ctx: &Context, thresholds: &WarnThresholds) -> Option<DetectedWarning> {
    if ctx.workflow_stage != WorkflowStage::Modeling
        || ctx.session_duration_secs <= thresholds.long_session_secs
    {
        return None;
    }
    let mut detected = warning(
        "warn-poly-count",
        WarningKind::BestPractice,
        "Performance Check",
        "Check your poly count. Keep triangles under 50,000 for good performance in Fallout 4.",
        Severity::Medium,
        WorkflowStage::Modeling,
        None,
    );
    detected.warning.learn_more = Some("/guides/optimization".to_string());
    Some(detected)
}

fn detect_uv_maps(ctx: &Context, _: &WarnThresholds) -> Option<DetectedWarning> {
    if ctx.workflow_stage != WorkflowStage::Texturing || ctx.stage_confidence <= 0.7 {
        return None;
    }
    Some(warning(
        "warn-uv-maps",
        WarningKind::ErrorPrevention,
        "UV Map Check",
        "Verify your model has proper UV maps. Without them, textures won't display correctly.",
        Severity::High,
        WorkflowStage::Texturing,
        None,
    ))
}

fn detect_textures_packed(ctx: &Context, _: &WarnThresholds) -> Option<DetectedWarning> {
    if ctx.workflow_stage != WorkflowStage::Export || !blender_active(ctx) {
        return None;
    }
    Some(warning(
        "warn-textures-packed",
        WarningKind::ErrorPrevention,
        "Pack Textures",
        "Before exporting, pack all external textures into your .blend file to avoid missing textures.",
        Severity::High,
        WorkflowStage::Export,
        Some(logging_fix("pack external textures")),
    ))
}

/// The static error-pattern catalog.
///
/// Four entries are catalog-only: their conditions need signals (bone
/// names, vertex weights, texture dimensions, collision meshes) that the
/// desktop bridge does not report yet.
pub fn default_catalog() -> Vec<ErrorPattern> {
    use WorkflowStage::*;
    vec![
        ErrorPattern {
            id: "blender-wrong-scale",
            description: "Blender objects not at 1.0 scale - will cause size issues in Fallout 4",
            severity: Severity::Critical,
            applicable_stages: &[Modeling, Rigging, Animation],
            detector: Some(detect_blender_scale),
        },
        ErrorPattern {
            id: "animation-wrong-fps",
            description: "Animation not at 30 FPS - required for Fallout 4",
            severity: Severity::Critical,
            applicable_stages: &[Animation],
            detector: Some(detect_animation_fps),
        },
        ErrorPattern {
            id: "absolute-texture-paths",
            description: "Textures using absolute paths - mod will break on other systems",
            severity: Severity::Critical,
            applicable_stages: &[Texturing, Export],
            detector: Some(detect_texture_paths),
        },
        ErrorPattern {
            id: "high-poly-count",
            description: "Triangle count exceeds 50k - will cause performance issues",
            severity: Severity::High,
            applicable_stages: &[Modeling, Export],
            detector: Some(detect_poly_count),
        },
        ErrorPattern {
            id: "missing-uv-maps",
            description: "Model missing UV maps - textures will not display",
            severity: Severity::High,
            applicable_stages: &[Modeling, Texturing],
            detector: Some(detect_uv_maps),
        },
        ErrorPattern {
            id: "textures-not-packed",
            description: "Textures not packed in .blend file - may be missing on export",
            severity: Severity::High,
            applicable_stages: &[Texturing, Export],
            detector: Some(detect_textures_packed),
        },
        ErrorPattern {
            id: "invalid-bone-names",
            description: "Skeleton bone names don't match FO4 conventions",
            severity: Severity::High,
            applicable_stages: &[Rigging],
            detector: None,
        },
        ErrorPattern {
            id: "unweighted-vertices",
            description: "Some vertices have no weight assignment",
            severity: Severity::Medium,
            applicable_stages: &[Rigging],
            detector: None,
        },
        ErrorPattern {
            id: "non-power-of-2-textures",
            description: "Texture dimensions not power of 2 - may cause issues",
            severity: Severity::Medium,
            applicable_stages: &[Texturing],
            detector: None,
        },
        ErrorPattern {
            id: "missing-collision",
            description: "No collision mesh detected - objects will be non-solid",
            severity: Severity::Medium,
            applicable_stages: &[Modeling, Export],
            detector: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ToolRecord;
    use chrono::Duration;

    fn blender_ctx(stage: WorkflowStage) -> Context {
        let mut ctx = Context::default();
        ctx.workflow_stage = stage;
        ctx.active_tools.push(ToolRecord {
            name: "Blender".to_string(),
            process_name: "blender".to_string(),
            window_title: None,
            is_active: true,
            last_active: Utc::now(),
        });
        ctx
    }

    fn engine() -> WarningEngine {
        WarningEngine::new(&EngineConfig::default())
    }

    #[test]
    fn planning_stage_has_no_applicable_patterns() {
        let mut engine = engine();
        let mut ctx = Context::default();
        ctx.session_duration_secs = 9000;
        assert!(engine.check(&ctx));
        assert!(engine.current_warnings().is_empty());
    }

    #[test]
    fn export_with_blender_fires_pack_textures() {
        let mut engine = engine();
        let ctx = blender_ctx(WorkflowStage::Export);
        engine.check(&ctx);

        let warnings = engine.current_warnings();
        assert!(warnings.iter().any(|w| w.id == "warn-textures-packed"));
        let packed = warnings
            .iter()
            .find(|w| w.id == "warn-textures-packed")
            .unwrap();
        assert!(packed.auto_fix_available);
        assert_eq!(packed.severity, Severity::High);
    }

    #[test]
    fn scale_check_is_gated_on_session_length() {
        let mut engine = engine();
        let mut ctx = blender_ctx(WorkflowStage::Modeling);

        ctx.session_duration_secs = 60;
        engine.check_at(&ctx, Utc::now());
        assert!(!engine
            .current_warnings()
            .iter()
            .any(|w| w.id == "warn-blender-scale"));

        ctx.session_duration_secs = 301;
        engine.check_at(&ctx, Utc::now() + Duration::seconds(2));
        assert!(engine
            .current_warnings()
            .iter()
            .any(|w| w.id == "warn-blender-scale"));
    }

    #[test]
    fn cycles_replace_rather_than_merge() {
        let mut engine = engine();
        let base = Utc::now();

        let ctx = blender_ctx(WorkflowStage::Export);
        engine.check_at(&ctx, base);
        assert!(!engine.current_warnings().is_empty());

        // Condition gone: next cycle rebuilds an empty map.
        let idle = Context::default();
        engine.check_at(&idle, base + Duration::seconds(2));
        assert!(engine.current_warnings().is_empty());
    }

    #[test]
    fn checks_are_debounced_to_one_per_second() {
        let mut engine = engine();
        let base = Utc::now();
        let ctx = blender_ctx(WorkflowStage::Export);

        assert!(engine.check_at(&ctx, base));
        assert!(!engine.check_at(&ctx, base + Duration::milliseconds(400)));
        assert!(engine.check_at(&ctx, base + Duration::milliseconds(1100)));
    }

    #[test]
    fn dismiss_removes_exactly_one_warning() {
        let mut engine = engine();
        let mut ctx = blender_ctx(WorkflowStage::Export);
        ctx.detected_file_types = vec![".dds".to_string()];
        engine.check(&ctx);

        let before = engine.current_warnings();
        assert!(before.len() >= 2);

        assert!(engine.dismiss("warn-textures-packed"));
        let after = engine.current_warnings();
        assert_eq!(after.len(), before.len() - 1);
        assert!(!after.iter().any(|w| w.id == "warn-textures-packed"));
        assert!(after.iter().any(|w| w.id == "warn-texture-paths"));

        assert!(!engine.dismiss("warn-textures-packed"));
    }

    #[test]
    fn warning_count_tallies_by_severity() {
        let mut engine = engine();
        let mut ctx = blender_ctx(WorkflowStage::Export);
        ctx.detected_file_types = vec![".dds".to_string()];
        engine.check(&ctx);

        let count = engine.warning_count();
        assert_eq!(count.critical, 1); // texture paths
        assert_eq!(count.high, 1); // textures not packed
        assert_eq!(count.low, 0);
    }

    #[tokio::test]
    async fn auto_fix_all_on_empty_set_is_a_no_op() {
        let mut engine = engine();
        let outcome = engine.auto_fix_all().await;
        assert_eq!(outcome, FixOutcome { fixed: 0, failed: 0 });
        assert!(engine.current_warnings().is_empty());
    }

    #[tokio::test]
    async fn auto_fix_all_removes_fixed_warnings() {
        let mut engine = engine();
        let ctx = blender_ctx(WorkflowStage::Export);
        engine.check(&ctx);
        assert_eq!(engine.current_warnings().len(), 1);

        let outcome = engine.auto_fix_all().await;
        assert_eq!(outcome.fixed, 1);
        assert_eq!(outcome.failed, 0);
        assert!(engine.current_warnings().is_empty());
    }

    fn detect_always_failing_fix(ctx: &Context, _: &WarnThresholds) -> Option<DetectedWarning> {
        let fix: AutoFixFn = Arc::new(|| {
            Box::pin(async { Err(CoreError::Custom("fix transport unavailable".into())) })
        });
        Some(warning(
            "warn-unfixable",
            WarningKind::Compatibility,
            "Unfixable",
            "Cannot be remediated automatically.",
            Severity::High,
            ctx.workflow_stage,
            Some(fix),
        ))
    }

    #[tokio::test]
    async fn failed_fixes_are_counted_and_warning_stays() {
        let catalog = vec![ErrorPattern {
            id: "always-fails",
            description: "test pattern",
            severity: Severity::High,
            applicable_stages: &[WorkflowStage::Planning],
            detector: Some(detect_always_failing_fix),
        }];
        let mut engine = WarningEngine::with_catalog(&EngineConfig::default(), catalog);
        engine.check(&Context::default());
        assert_eq!(engine.current_warnings().len(), 1);

        let outcome = engine.auto_fix_all().await;
        assert_eq!(outcome, FixOutcome { fixed: 0, failed: 1 });
        assert!(engine
            .current_warnings()
            .iter()
            .any(|w| w.id == "warn-unfixable"));
    }

    #[test]
    fn validation_scores_and_gates_on_criticals() {
        let mut engine = engine();
        let mut ctx = blender_ctx(WorkflowStage::Export);
        ctx.detected_file_types = vec![".dds".to_string()];
        engine.check(&ctx);

        // One critical (-20) and one high (-10).
        let result = engine.validate_before_export();
        assert_eq!(result.score, 70);
        assert!(!result.passed);
        assert!(!result.can_proceed);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.warnings.len(), 1);
        assert!(result
            .suggestions
            .iter()
            .any(|s| s.contains("critical issues")));
    }

    #[test]
    fn error_history_records_pattern_and_context() {
        let store = Arc::new(crate::storage::MemoryStore::new());
        let history = ErrorHistory::new(store);

        let mut ctx = blender_ctx(WorkflowStage::Rigging);
        ctx.detected_file_types = vec![".nif".to_string()];
        history.record("invalid-bone-names", &ctx);

        let records = history.recent();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pattern_id, "invalid-bone-names");
        assert_eq!(records[0].stage, WorkflowStage::Rigging);
        assert_eq!(records[0].tools, vec!["Blender"]);
        assert_eq!(records[0].file_types, vec![".nif"]);
    }

    #[test]
    fn error_history_caps_at_most_recent_entries() {
        let store = Arc::new(crate::storage::MemoryStore::new());
        let history = ErrorHistory::new(store);
        let ctx = Context::default();

        for i in 0..=ERROR_HISTORY_CAP {
            history.record(&format!("pattern-{i}"), &ctx);
        }

        let records = history.recent();
        assert_eq!(records.len(), ERROR_HISTORY_CAP);
        assert_eq!(records[0].pattern_id, "pattern-1");
        assert_eq!(
            records.last().unwrap().pattern_id,
            format!("pattern-{ERROR_HISTORY_CAP}")
        );
    }

    #[test]
    fn corrupt_error_history_reads_as_empty() {
        let store = Arc::new(crate::storage::MemoryStore::new());
        store
            .save(ERROR_HISTORY_KEY, "not json", chrono::Duration::days(30))
            .unwrap();

        let history = ErrorHistory::new(store);
        assert!(history.recent().is_empty());

        // Recording over the corrupt payload starts a fresh list.
        history.record("blender-wrong-scale", &Context::default());
        assert_eq!(history.recent().len(), 1);
    }

    #[test]
    fn clean_validation_reports_ready() {
        let engine = engine();
        let result = engine.validate_before_export();
        assert_eq!(result.score, 100);
        assert!(result.passed);
        assert!(result.can_proceed);
        assert!(result.suggestions.iter().any(|s| s.contains("Ready")));
    }
}

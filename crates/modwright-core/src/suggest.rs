//! Ranked advisory suggestions derived from the live context.
//!
//! Four independent generator functions (tool complementarity, workflow
//! stage, resources, automation) each contribute zero or more templates
//! keyed off the current [`Context`]. Their outputs are concatenated,
//! sorted urgent-first then by relevance descending, and truncated. The
//! published list is rebuilt wholesale on every cycle -- never merged --
//! so ids are not stable across cycles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::{Context, TimeOfDay};
use crate::stage::{UserIntent, WorkflowStage};
use crate::storage::EngineConfig;

/// Advisory priority. Ordering is `Low < Medium < High < Urgent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

/// What kind of advice a suggestion carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Action,
    Tip,
    Warning,
    Automation,
    Resource,
}

/// A command a UI collaborator can run on the user's behalf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub label: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl SuggestedAction {
    pub fn new(label: &str, command: &str) -> Self {
        Self {
            label: label.to_string(),
            command: command.to_string(),
            params: None,
        }
    }

    pub fn with_params(label: &str, command: &str, params: serde_json::Value) -> Self {
        Self {
            label: label.to_string(),
            command: command.to_string(),
            params: Some(params),
        }
    }
}

/// A transient, ranked advisory message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub kind: SuggestionKind,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    /// Relevance score in `[0, 1]`.
    pub relevance: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<SuggestedAction>,
    pub created_at: DateTime<Utc>,
}

fn suggestion(
    id: &str,
    kind: SuggestionKind,
    title: &str,
    description: &str,
    priority: Priority,
    relevance: f32,
    now: DateTime<Utc>,
) -> Suggestion {
    Suggestion {
        id: id.to_string(),
        kind,
        title: title.to_string(),
        description: description.to_string(),
        priority,
        relevance,
        actions: Vec::new(),
        created_at: now,
    }
}

/// Owns the live suggestion list; rebuilds it on demand.
pub struct SuggestionGenerator {
    suggestions: Vec<Suggestion>,
    max_suggestions: usize,
    long_session_secs: u64,
}

impl SuggestionGenerator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            suggestions: Vec::new(),
            max_suggestions: config.max_suggestions,
            long_session_secs: config.long_session_secs,
        }
    }

    /// Defensive copy of the current list.
    pub fn current(&self) -> Vec<Suggestion> {
        self.suggestions.clone()
    }

    /// Discard the old list and rebuild it from the context.
    pub fn regenerate(&mut self, ctx: &Context) -> Vec<Suggestion> {
        let now = Utc::now();
        let mut all = Vec::new();
        all.extend(self.tool_suggestions(ctx, now));
        all.extend(self.workflow_suggestions(ctx, now));
        all.extend(resource_suggestions(ctx, now));
        all.extend(automation_suggestions(ctx, now));

        // Urgent entries always lead; everything else ranks by relevance.
        all.sort_by(|a, b| {
            let a_urgent = a.priority == Priority::Urgent;
            let b_urgent = b.priority == Priority::Urgent;
            b_urgent
                .cmp(&a_urgent)
                .then_with(|| b.relevance.total_cmp(&a.relevance))
        });
        all.truncate(self.max_suggestions);

        self.suggestions = all;
        self.current()
    }

    fn tool_suggestions(&self, ctx: &Context, now: DateTime<Utc>) -> Vec<Suggestion> {
        let mut out = Vec::new();
        let active: Vec<String> = ctx
            .active_tools
            .iter()
            .filter(|t| t.is_active)
            .map(|t| t.name.to_lowercase())
            .collect();
        let blender_active = active.iter().any(|n| n.contains("blender"));
        let auditor_active = active.iter().any(|n| n.contains("auditor"));

        if blender_active && !auditor_active {
            let mut s = suggestion(
                "suggest-auditor-with-blender",
                SuggestionKind::Tip,
                "Asset Analysis Available",
                "While working in Blender, consider using The Auditor to analyze your NIF files for performance issues.",
                Priority::Medium,
                0.8,
                now,
            );
            s.actions.push(SuggestedAction::with_params(
                "Open The Auditor",
                "navigate",
                serde_json::json!({ "route": "/auditor" }),
            ));
            out.push(s);
        }

        let creative = matches!(
            ctx.workflow_stage,
            WorkflowStage::Modeling
                | WorkflowStage::Rigging
                | WorkflowStage::Animation
                | WorkflowStage::Texturing
        );
        if creative && ctx.session_duration_secs > self.long_session_secs {
            let mut s = suggestion(
                "suggest-optimization-break",
                SuggestionKind::Tip,
                "Consider Performance Optimization",
                "You've been creating for a while. Save a checkpoint and let The Auditor confirm your assets are still lean.",
                Priority::Low,
                0.6,
                now,
            );
            s.actions.push(SuggestedAction::with_params(
                "Check Performance",
                "navigate",
                serde_json::json!({ "route": "/auditor" }),
            ));
            out.push(s);
        }

        out
    }

    fn workflow_suggestions(&self, ctx: &Context, now: DateTime<Utc>) -> Vec<Suggestion> {
        let mut out = Vec::new();
        match ctx.workflow_stage {
            WorkflowStage::Planning => {
                out.push(suggestion(
                    "workflow-planning-tip",
                    SuggestionKind::Tip,
                    "Ready to Start Creating?",
                    "Consider opening Blender or the Creation Kit to begin your modding project.",
                    Priority::Low,
                    0.5,
                    now,
                ));
            }
            WorkflowStage::Modeling => {
                if matches!(ctx.time_of_day, TimeOfDay::Evening | TimeOfDay::Night) {
                    out.push(suggestion(
                        "workflow-evening-break",
                        SuggestionKind::Tip,
                        "Evening Session Tip",
                        "Consider taking a break and testing your work tomorrow. Fresh eyes catch more issues.",
                        Priority::Low,
                        0.7,
                        now,
                    ));
                }
            }
            WorkflowStage::Rigging => {
                out.push(suggestion(
                    "workflow-rigging-bones",
                    SuggestionKind::Tip,
                    "Bone Naming Conventions",
                    "Match skeleton bone names to the Fallout 4 conventions now; renaming after weighting is painful.",
                    Priority::Medium,
                    0.7,
                    now,
                ));
            }
            WorkflowStage::Animation => {
                out.push(suggestion(
                    "workflow-animation-fps",
                    SuggestionKind::Warning,
                    "Animation Frame Rate",
                    "Fallout 4 animations must run at exactly 30 FPS. Check your timeline settings before going further.",
                    Priority::Urgent,
                    0.9,
                    now,
                ));
            }
            WorkflowStage::Texturing => {
                out.push(suggestion(
                    "workflow-texturing-dimensions",
                    SuggestionKind::Tip,
                    "Texture Dimensions",
                    "Keep texture dimensions at powers of two and export to DDS for the engine.",
                    Priority::Medium,
                    0.7,
                    now,
                ));
            }
            WorkflowStage::Export => {
                let mut validate = suggestion(
                    "workflow-export-validate",
                    SuggestionKind::Action,
                    "Validate Export Settings",
                    "Export stage detected. Validate scale, units and texture paths before writing the NIF.",
                    Priority::High,
                    0.85,
                    now,
                );
                validate
                    .actions
                    .push(SuggestedAction::new("Validate Settings", "validate-export"));
                out.push(validate);

                let mut analyze = suggestion(
                    "workflow-export-analyze",
                    SuggestionKind::Action,
                    "Analyze Exported Asset",
                    "Run the exported asset through The Auditor to catch problems before they reach the game.",
                    Priority::Medium,
                    0.75,
                    now,
                );
                analyze
                    .actions
                    .push(SuggestedAction::new("Analyze Output", "analyze-asset"));
                out.push(analyze);
            }
            WorkflowStage::Testing => {
                let mut s = suggestion(
                    "workflow-testing-validation",
                    SuggestionKind::Action,
                    "Validate Your Load Order",
                    "Testing phase detected. Ensure your load order is correct with LOOT integration.",
                    Priority::Medium,
                    0.8,
                    now,
                );
                s.actions
                    .push(SuggestedAction::new("Check Load Order", "run-loot"));
                out.push(s);
            }
            WorkflowStage::Debugging => {
                out.push(suggestion(
                    "workflow-debugging-conflicts",
                    SuggestionKind::Tip,
                    "Conflict Filtering",
                    "Apply the conflict filter in xEdit to see exactly which records your plugin overrides.",
                    Priority::Medium,
                    0.7,
                    now,
                ));
            }
            WorkflowStage::Optimizing => {
                out.push(suggestion(
                    "workflow-optimizing-budget",
                    SuggestionKind::Tip,
                    "Performance Budget",
                    "Keep triangle counts and draw calls inside your budget; measure before and after each change.",
                    Priority::Low,
                    0.6,
                    now,
                ));
            }
            WorkflowStage::Packaging => {
                let mut s = suggestion(
                    "workflow-packaging-archive",
                    SuggestionKind::Action,
                    "Check Archive Contents",
                    "Verify the archive contains every loose file your plugin references before uploading.",
                    Priority::Medium,
                    0.7,
                    now,
                );
                s.actions
                    .push(SuggestedAction::new("List Archive", "inspect-archive"));
                out.push(s);
            }
        }
        out
    }
}

fn resource_suggestions(ctx: &Context, now: DateTime<Utc>) -> Vec<Suggestion> {
    let mut out = Vec::new();
    match ctx.user_intent {
        UserIntent::ThreeDModeling => {
            let mut s = suggestion(
                "resource-blender-guide",
                SuggestionKind::Resource,
                "Blender Modeling Guide Available",
                "Access comprehensive Blender tutorials and best practices for Fallout 4 modding.",
                Priority::Low,
                0.6,
                now,
            );
            s.actions.push(SuggestedAction::with_params(
                "Open Guide",
                "navigate",
                serde_json::json!({ "route": "/guides/blender" }),
            ));
            out.push(s);
        }
        UserIntent::Scripting => {
            let mut s = suggestion(
                "resource-papyrus-guide",
                SuggestionKind::Resource,
                "Papyrus Scripting Reference",
                "Detailed Papyrus scripting guide with examples and best practices.",
                Priority::Low,
                0.6,
                now,
            );
            s.actions.push(SuggestedAction::with_params(
                "Open Scripting Guide",
                "navigate",
                serde_json::json!({ "route": "/guides/papyrus" }),
            ));
            out.push(s);
        }
        UserIntent::LevelDesign => {
            let mut s = suggestion(
                "resource-ck-guide",
                SuggestionKind::Resource,
                "Creation Kit Walkthrough",
                "Level design reference covering cells, navmeshes and quest hookups.",
                Priority::Low,
                0.6,
                now,
            );
            s.actions.push(SuggestedAction::with_params(
                "Open Walkthrough",
                "navigate",
                serde_json::json!({ "route": "/guides/creation-kit" }),
            ));
            out.push(s);
        }
        _ => {}
    }
    out
}

fn automation_suggestions(ctx: &Context, now: DateTime<Utc>) -> Vec<Suggestion> {
    let mut out = Vec::new();
    let has_blender = ctx
        .active_tools
        .iter()
        .any(|t| t.name.to_lowercase().contains("blender"));
    if has_blender {
        let mut s = suggestion(
            "automation-blender-alignment",
            SuggestionKind::Automation,
            "Automate Scale Alignment",
            "Create a workflow to automatically align Blender scenes to Fallout 4 standards (1.0 scale, 30 FPS).",
            Priority::Medium,
            0.7,
            now,
        );
        s.actions.push(SuggestedAction::with_params(
            "Create Alignment Script",
            "generate-workflow",
            serde_json::json!({ "type": "blender-alignment" }),
        ));
        out.push(s);
    }
    out
}

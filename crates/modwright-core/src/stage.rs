//! Workflow stage inference.
//!
//! Pure, deterministic classification of the current session into a
//! [`WorkflowStage`] given the active tools and recently-touched file
//! types. The rules form an ordered decision list: the first family that
//! matches wins and nothing backtracks, so specific signals (an explicit
//! rigging window title, export-ready mesh files) always dominate the
//! generic "Blender is open" default.
//!
//! Everything here operates on borrowed slices and returns plain values;
//! the [`ContextTracker`](crate::context::ContextTracker) is the only
//! caller that writes the result back into a `Context`.

use serde::{Deserialize, Serialize};

use crate::context::ToolRecord;

/// Coarse-grained phase of a modding session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStage {
    Planning,
    Modeling,
    Rigging,
    Animation,
    Texturing,
    Export,
    Testing,
    Debugging,
    Optimizing,
    Packaging,
}

impl WorkflowStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStage::Planning => "planning",
            WorkflowStage::Modeling => "modeling",
            WorkflowStage::Rigging => "rigging",
            WorkflowStage::Animation => "animation",
            WorkflowStage::Texturing => "texturing",
            WorkflowStage::Export => "export",
            WorkflowStage::Testing => "testing",
            WorkflowStage::Debugging => "debugging",
            WorkflowStage::Optimizing => "optimizing",
            WorkflowStage::Packaging => "packaging",
        }
    }
}

impl std::fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finer-grained Blender pipeline stage, only meaningful while a
/// 3D-authoring tool is detected active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlenderStage {
    Modeling,
    Rigging,
    Animation,
    Export,
}

impl BlenderStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlenderStage::Modeling => "modeling",
            BlenderStage::Rigging => "rigging",
            BlenderStage::Animation => "animation",
            BlenderStage::Export => "export",
        }
    }
}

impl std::fmt::Display for BlenderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user appears to be working on, inferred from tool names alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UserIntent {
    #[serde(rename = "3d-modeling")]
    ThreeDModeling,
    #[serde(rename = "level-design")]
    LevelDesign,
    #[serde(rename = "texturing")]
    Texturing,
    #[serde(rename = "scripting")]
    Scripting,
    #[serde(rename = "audio-design")]
    AudioDesign,
    #[default]
    #[serde(rename = "general-modding")]
    GeneralModding,
}

impl UserIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserIntent::ThreeDModeling => "3d-modeling",
            UserIntent::LevelDesign => "level-design",
            UserIntent::Texturing => "texturing",
            UserIntent::Scripting => "scripting",
            UserIntent::AudioDesign => "audio-design",
            UserIntent::GeneralModding => "general-modding",
        }
    }
}

impl std::fmt::Display for UserIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one stage-inference run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageInference {
    pub stage: WorkflowStage,
    /// Blender pipeline sub-stage; `None` outside the 3D-authoring family
    /// (and for the texturing rule, which has no sub-stage).
    pub blender_stage: Option<BlenderStage>,
    /// Heuristic certainty in `[0, 1]`.
    pub confidence: f32,
}

impl StageInference {
    fn new(stage: WorkflowStage, confidence: f32) -> Self {
        Self {
            stage,
            blender_stage: None,
            confidence,
        }
    }

    fn blender(stage: WorkflowStage, sub: BlenderStage, confidence: f32) -> Self {
        Self {
            stage,
            blender_stage: Some(sub),
            confidence,
        }
    }
}

// Tool families, matched as lower-cased substrings of the tool name.
const FAMILY_3D: &[&str] = &["blender"];
const FAMILY_LEVEL: &[&str] = &["creation", "ck"];
const FAMILY_CONFLICT: &[&str] = &["xedit", "fo4edit"];
const FAMILY_LOAD_ORDER: &[&str] = &["loot"];
const FAMILY_OPTIMIZER: &[&str] = &["optimizer", "auditor"];
const FAMILY_PACKAGING: &[&str] = &["archive2", "bsarch", "fomod", "installer"];
const FAMILY_IMAGE: &[&str] = &["texture", "image"];
const FAMILY_SCRIPT: &[&str] = &["script", "papyrus"];
const FAMILY_AUDIO: &[&str] = &["audio", "sound"];

// Blender window-title keyword sets, matched lower-cased.
const RIGGING_KEYWORDS: &[&str] = &["rig", "armature", "bone", "weight paint"];
const ANIMATION_KEYWORDS: &[&str] = &["animation", "action editor", "dope sheet", "nla", "keyframe"];
const TEXTURING_KEYWORDS: &[&str] = &["shading", "shader", "material", "uv", "texture paint"];

/// File-type families. Extensions are stored lower-cased with a leading dot.
pub const IMAGE_TYPES: &[&str] = &[".dds", ".png", ".jpg", ".tga"];
pub const MESH_TYPES: &[&str] = &[".nif", ".fbx", ".obj"];
pub const PLUGIN_TYPES: &[&str] = &[".esp", ".esm", ".esl"];

fn matches_family(name: &str, family: &[&str]) -> bool {
    family.iter().any(|needle| name.contains(needle))
}

fn any_tool_in(names: &[String], family: &[&str]) -> bool {
    names.iter().any(|n| matches_family(n, family))
}

fn has_any_type(file_types: &[String], family: &[&str]) -> bool {
    file_types.iter().any(|t| family.contains(&t.as_str()))
}

/// Classify the current workflow stage from the active tools and the
/// detected file types.
///
/// Deterministic: identical inputs always yield the identical inference.
pub fn infer_stage(tools: &[ToolRecord], file_types: &[String]) -> StageInference {
    let active: Vec<&ToolRecord> = tools.iter().filter(|t| t.is_active).collect();
    if active.is_empty() {
        return StageInference::new(WorkflowStage::Planning, 1.0);
    }

    let names: Vec<String> = active.iter().map(|t| t.name.to_lowercase()).collect();

    if any_tool_in(&names, FAMILY_3D) {
        return infer_blender_stage(&active, file_types);
    }
    if any_tool_in(&names, FAMILY_LEVEL) {
        // A finished plugin on disk means the user is already iterating
        // in-game rather than still building.
        return if has_any_type(file_types, PLUGIN_TYPES) {
            StageInference::new(WorkflowStage::Testing, 0.8)
        } else {
            StageInference::new(WorkflowStage::Modeling, 0.7)
        };
    }
    if any_tool_in(&names, FAMILY_CONFLICT) {
        return StageInference::new(WorkflowStage::Debugging, 0.9);
    }
    if any_tool_in(&names, FAMILY_LOAD_ORDER) {
        return StageInference::new(WorkflowStage::Testing, 0.9);
    }
    if any_tool_in(&names, FAMILY_OPTIMIZER) {
        return StageInference::new(WorkflowStage::Optimizing, 0.9);
    }
    if any_tool_in(&names, FAMILY_PACKAGING) {
        return StageInference::new(WorkflowStage::Packaging, 0.9);
    }

    StageInference::new(WorkflowStage::Planning, 0.5)
}

/// Sub-stage rule for the 3D-authoring family.
///
/// Window-title keywords are checked before file-type signals so that a
/// user doing narrow work (rigging, animation) is never classified with
/// the generic modeling default.
fn infer_blender_stage(active: &[&ToolRecord], file_types: &[String]) -> StageInference {
    let titles: Vec<String> = active
        .iter()
        .filter(|t| t.name.to_lowercase().contains("blender"))
        .filter_map(|t| t.window_title.as_deref())
        .map(str::to_lowercase)
        .collect();

    let title_has = |keywords: &[&str]| {
        titles
            .iter()
            .any(|title| keywords.iter().any(|k| title.contains(k)))
    };

    if title_has(RIGGING_KEYWORDS) {
        return StageInference::blender(WorkflowStage::Rigging, BlenderStage::Rigging, 0.85);
    }
    if title_has(ANIMATION_KEYWORDS) {
        return StageInference::blender(WorkflowStage::Animation, BlenderStage::Animation, 0.85);
    }
    if title_has(TEXTURING_KEYWORDS) || has_any_type(file_types, IMAGE_TYPES) {
        return StageInference::new(WorkflowStage::Texturing, 0.8);
    }
    if has_any_type(file_types, MESH_TYPES) {
        return StageInference::blender(WorkflowStage::Export, BlenderStage::Export, 0.9);
    }
    StageInference::blender(WorkflowStage::Modeling, BlenderStage::Modeling, 0.7)
}

/// Infer what the user is working on from active tool names.
///
/// Independent of [`infer_stage`]; this decision list never touches the
/// workflow stage.
pub fn infer_intent(tools: &[ToolRecord]) -> UserIntent {
    let names: Vec<String> = tools
        .iter()
        .filter(|t| t.is_active)
        .map(|t| t.name.to_lowercase())
        .collect();

    if any_tool_in(&names, FAMILY_3D) {
        UserIntent::ThreeDModeling
    } else if any_tool_in(&names, FAMILY_LEVEL) {
        UserIntent::LevelDesign
    } else if any_tool_in(&names, FAMILY_IMAGE) {
        UserIntent::Texturing
    } else if any_tool_in(&names, FAMILY_SCRIPT) {
        UserIntent::Scripting
    } else if any_tool_in(&names, FAMILY_AUDIO) {
        UserIntent::AudioDesign
    } else {
        UserIntent::GeneralModding
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn tool(name: &str, title: Option<&str>, active: bool) -> ToolRecord {
        ToolRecord {
            name: name.to_string(),
            process_name: name.to_lowercase(),
            window_title: title.map(str::to_string),
            is_active: active,
            last_active: Utc::now(),
        }
    }

    fn types(exts: &[&str]) -> Vec<String> {
        exts.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn no_active_tools_is_planning_with_full_confidence() {
        let inference = infer_stage(&[], &[]);
        assert_eq!(inference.stage, WorkflowStage::Planning);
        assert_eq!(inference.confidence, 1.0);

        // Inactive tools do not count.
        let tools = vec![tool("Blender", None, false)];
        let inference = infer_stage(&tools, &[]);
        assert_eq!(inference.stage, WorkflowStage::Planning);
        assert_eq!(inference.confidence, 1.0);
    }

    #[test]
    fn armature_title_wins_over_modeling_default() {
        let tools = vec![tool("Blender", Some("Armature Edit Mode"), true)];
        let inference = infer_stage(&tools, &[]);
        assert_eq!(inference.stage, WorkflowStage::Rigging);
        assert_eq!(inference.blender_stage, Some(BlenderStage::Rigging));
        assert_eq!(inference.confidence, 0.85);
    }

    #[test]
    fn animation_keywords_detected() {
        let tools = vec![tool("Blender", Some("Dope Sheet - walk cycle"), true)];
        let inference = infer_stage(&tools, &[]);
        assert_eq!(inference.stage, WorkflowStage::Animation);
        assert_eq!(inference.blender_stage, Some(BlenderStage::Animation));
    }

    #[test]
    fn image_files_push_blender_to_texturing() {
        let tools = vec![tool("Blender", Some("untitled.blend"), true)];
        let inference = infer_stage(&tools, &types(&[".dds"]));
        assert_eq!(inference.stage, WorkflowStage::Texturing);
        assert_eq!(inference.blender_stage, None);
        assert_eq!(inference.confidence, 0.8);
    }

    #[test]
    fn mesh_files_push_blender_to_export() {
        let tools = vec![tool("Blender", None, true)];
        let inference = infer_stage(&tools, &types(&[".nif"]));
        assert_eq!(inference.stage, WorkflowStage::Export);
        assert_eq!(inference.blender_stage, Some(BlenderStage::Export));
        assert_eq!(inference.confidence, 0.9);
    }

    #[test]
    fn blender_defaults_to_modeling() {
        let tools = vec![tool("Blender", Some("untitled.blend"), true)];
        let inference = infer_stage(&tools, &[]);
        assert_eq!(inference.stage, WorkflowStage::Modeling);
        assert_eq!(inference.blender_stage, Some(BlenderStage::Modeling));
        assert_eq!(inference.confidence, 0.7);
    }

    #[test]
    fn rigging_keyword_beats_export_file_signal() {
        // Keywords are evaluated before file types.
        let tools = vec![tool("Blender", Some("Weight Paint"), true)];
        let inference = infer_stage(&tools, &types(&[".fbx"]));
        assert_eq!(inference.stage, WorkflowStage::Rigging);
    }

    #[test]
    fn creation_kit_without_plugin_is_modeling() {
        let tools = vec![tool("Creation Kit", None, true)];
        let inference = infer_stage(&tools, &[]);
        assert_eq!(inference.stage, WorkflowStage::Modeling);
        assert_eq!(inference.confidence, 0.7);
    }

    #[test]
    fn creation_kit_with_plugin_is_testing() {
        let tools = vec![tool("Creation Kit", None, true)];
        let inference = infer_stage(&tools, &types(&[".esp"]));
        assert_eq!(inference.stage, WorkflowStage::Testing);
        assert_eq!(inference.confidence, 0.8);
    }

    #[test]
    fn remaining_tool_families() {
        for (name, stage) in [
            ("FO4Edit", WorkflowStage::Debugging),
            ("LOOT", WorkflowStage::Testing),
            ("The Auditor", WorkflowStage::Optimizing),
            ("Archive2", WorkflowStage::Packaging),
        ] {
            let tools = vec![tool(name, None, true)];
            let inference = infer_stage(&tools, &[]);
            assert_eq!(inference.stage, stage, "tool {name}");
            assert_eq!(inference.confidence, 0.9, "tool {name}");
        }
    }

    #[test]
    fn blender_outranks_other_families() {
        let tools = vec![
            tool("LOOT", None, true),
            tool("Blender", Some("untitled"), true),
        ];
        let inference = infer_stage(&tools, &[]);
        assert_eq!(inference.stage, WorkflowStage::Modeling);
    }

    #[test]
    fn unknown_tools_fall_through_to_planning() {
        let tools = vec![tool("Notepad", None, true)];
        let inference = infer_stage(&tools, &[]);
        assert_eq!(inference.stage, WorkflowStage::Planning);
        assert_eq!(inference.confidence, 0.5);
    }

    #[test]
    fn intent_decision_list() {
        for (name, intent) in [
            ("Blender", UserIntent::ThreeDModeling),
            ("Creation Kit", UserIntent::LevelDesign),
            ("Texture Editor", UserIntent::Texturing),
            ("Papyrus Studio", UserIntent::Scripting),
            ("Audacity Sound Lab", UserIntent::AudioDesign),
            ("Notepad", UserIntent::GeneralModding),
        ] {
            let tools = vec![tool(name, None, true)];
            assert_eq!(infer_intent(&tools), intent, "tool {name}");
        }
    }

    #[test]
    fn intent_ignores_inactive_tools() {
        let tools = vec![tool("Blender", None, false)];
        assert_eq!(infer_intent(&tools), UserIntent::GeneralModding);
    }

    #[test]
    fn serde_names_match_wire_vocabulary() {
        assert_eq!(
            serde_json::to_string(&UserIntent::ThreeDModeling).unwrap(),
            "\"3d-modeling\""
        );
        assert_eq!(
            serde_json::to_string(&WorkflowStage::Rigging).unwrap(),
            "\"rigging\""
        );
    }

    proptest! {
        #[test]
        fn inference_is_deterministic(
            names in proptest::collection::vec("[a-zA-Z0-9 ]{0,16}", 0..6),
            actives in proptest::collection::vec(any::<bool>(), 0..6),
            exts in proptest::collection::vec("\\.[a-z]{2,4}", 0..4),
        ) {
            let tools: Vec<ToolRecord> = names
                .iter()
                .zip(actives.iter().chain(std::iter::repeat(&true)))
                .map(|(name, active)| tool(name, None, *active))
                .collect();
            let first = infer_stage(&tools, &exts);
            let second = infer_stage(&tools, &exts);
            prop_assert_eq!(first, second);
            prop_assert!((0.0..=1.0).contains(&first.confidence));
        }
    }
}

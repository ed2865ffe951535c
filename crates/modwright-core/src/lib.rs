//! # Modwright Core Library
//!
//! Context inference and proactive-warning engine for a modding
//! workstation. The library watches a live working session -- which
//! external tools are running, which file types were recently touched,
//! how long the session has run -- and turns that telemetry into a
//! classified workflow stage, a ranked suggestion list and a set of
//! auto-fixable warnings.
//!
//! ## Architecture
//!
//! - **Context Tracker**: owns the canonical in-memory [`Context`],
//!   applies telemetry snapshots and persists/restores state
//! - **Stage Inference**: pure ordered decision lists mapping tools and
//!   file types to a [`WorkflowStage`] with a confidence score
//! - **Suggestion Generator**: rebuilds a ranked, size-bounded advisory
//!   list on every context update
//! - **Warning Engine**: evaluates a static error-pattern catalog per
//!   check cycle, with dismiss and sequential auto-fix
//! - **Event Bus**: synchronous pub/sub topics for context, suggestion
//!   and warning updates
//!
//! The engine is an in-process library: telemetry is pushed in by a
//! desktop-integration collaborator and the published collections are
//! rendered by UI collaborators. Nothing here is fatal to the host;
//! every failure degrades to stale or defaulted classifications.
//!
//! ## Key Components
//!
//! - [`Assistant`]: the composed service object with `start`/`stop`
//! - [`ContextTracker`]: telemetry application and snapshot persistence
//! - [`SnapshotStore`]: durable key/value port with per-entry expiry
//! - [`EngineConfig`]: TOML-backed tuning knobs

pub mod assistant;
pub mod context;
pub mod error;
pub mod events;
pub mod stage;
pub mod storage;
pub mod suggest;
pub mod warn;

pub use assistant::Assistant;
pub use context::{Context, ContextTracker, TimeOfDay, ToolRecord};
pub use error::{ConfigError, CoreError, StorageError};
pub use events::{Subscription, Topic};
pub use stage::{infer_intent, infer_stage, BlenderStage, StageInference, UserIntent, WorkflowStage};
pub use storage::{EngineConfig, MemoryStore, SnapshotStore, SqliteStore};
pub use suggest::{Priority, SuggestedAction, Suggestion, SuggestionGenerator, SuggestionKind};
pub use warn::{
    default_catalog, ErrorHistory, ErrorPattern, ErrorRecord, FixOutcome, ProactiveWarning,
    Severity, ValidationResult, WarningCount, WarningEngine, WarningKind,
};

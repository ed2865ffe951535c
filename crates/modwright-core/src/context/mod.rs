mod model;
mod tracker;

pub use model::{Context, TimeOfDay, ToolRecord, MAX_RECENT_FILES};
pub use tracker::{ContextTracker, SNAPSHOT_KEY};

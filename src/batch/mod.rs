pub mod events;
pub mod orchestrator;
pub mod state;

pub use events::{BatchEvent, EventBus};
pub use orchestrator::{BatchOrchestrator, BatchSettings};
pub use state::{compute_idle_status, PairResult, ResultSlot, RunSummary, StatusMessage};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::overlay::AnnotatedImage;
use crate::pairing::{count_mismatch, FilePair};

/// Aggregate status shown to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusMessage {
    #[default]
    NoMessage,
    PromptGenerate,
    InProgress,
    Done,
    /// At least one pair failed; the rest may still have results.
    Failed,
    PromptXml,
    PromptScreenshot,
    PromptXmlAndScreenshot,
    TitleMismatch,
    FileCountMismatch,
    /// Strict mode only: two dumps share a base name.
    DuplicateName,
}

impl StatusMessage {
    pub fn text(&self) -> &'static str {
        match self {
            Self::NoMessage => "",
            Self::PromptGenerate => "Press “Generate Highlights” to view results",
            Self::InProgress => "Generating highlights…",
            Self::Done => "Done!",
            Self::Failed => "Error: Some highlights could not be generated. Check the log for the affected files.",
            Self::PromptXml => "Please upload corresponding XML file(s) to view results",
            Self::PromptScreenshot => "Please upload corresponding Screenshot(s) to view results",
            Self::PromptXmlAndScreenshot => {
                "Please upload Screenshot(s) and XML file(s) to view results"
            }
            Self::TitleMismatch => "Error: Not every provided Screenshot had a corresponding XML, or vice-versa. Please double check the file names and try again.",
            Self::FileCountMismatch => "Error: Different amounts of Screenshots and XMLs provided. Please ensure all files were uploaded.",
            Self::DuplicateName => "Error: More than one XML file resolves to the same name. Please rename them and try again.",
        }
    }

    /// Only `PromptGenerate` lets a run start.
    pub fn allows_run(&self) -> bool {
        matches!(self, Self::PromptGenerate)
    }
}

impl std::fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}

pub fn loading_text(name: &str) -> String {
    format!("Loading {name}…")
}

/// Status before any run, from the current upload counts.
pub fn compute_idle_status(screenshot_count: usize, dump_count: usize) -> StatusMessage {
    match (screenshot_count, dump_count) {
        (0, 0) => StatusMessage::PromptXmlAndScreenshot,
        (_, 0) => StatusMessage::PromptXml,
        (0, _) => StatusMessage::PromptScreenshot,
        (s, x) if count_mismatch(x, s) => StatusMessage::FileCountMismatch,
        _ => StatusMessage::PromptGenerate,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultSlot {
    /// Placeholder registered when a run starts.
    Loading,
    Ready(AnnotatedImage),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairResult {
    pub name: String,
    pub slot: ResultSlot,
}

impl PairResult {
    pub fn placeholder_text(&self) -> Option<String> {
        matches!(self.slot, ResultSlot::Loading).then(|| loading_text(&self.name))
    }
}

#[derive(Debug, Default)]
pub struct BatchState {
    pub status: StatusMessage,
    pub pairs: Vec<FilePair>,
    /// Ordered by first registration; one entry per name.
    pub results: Vec<PairResult>,
    pub(crate) status_clear_timer: Option<JoinHandle<()>>,
    /// Bumped on every status change; a clear timer only fires if it still matches.
    pub(crate) status_epoch: u64,
}

impl BatchState {
    pub fn new(status: StatusMessage) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn register_placeholder(&mut self, name: &str) {
        self.set_slot(name, ResultSlot::Loading);
    }

    /// Last write wins for a repeated name.
    pub fn set_slot(&mut self, name: &str, slot: ResultSlot) {
        match self.results.iter_mut().find(|r| r.name == name) {
            Some(existing) => existing.slot = slot,
            None => self.results.push(PairResult {
                name: name.to_string(),
                slot,
            }),
        }
    }

    pub fn cancel_status_clear(&mut self) {
        if let Some(timer) = self.status_clear_timer.take() {
            timer.abort();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairFailure {
    pub name: String,
    pub reason: String,
}

/// Outcome of one `run()` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub generation: u64,
    pub status: StatusMessage,
    pub succeeded: Vec<String>,
    pub failed: Vec<PairFailure>,
    /// A newer run started before this one finished; nothing was written.
    #[serde(default)]
    pub superseded: bool,
}

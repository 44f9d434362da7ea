use std::{
    fmt,
    time::{Duration, Instant},
};

use humanizer_core::{HumanizeRequest, HumanizeResult, SamplingParams, Tone};

/// How long the transient "copied" indicator stays on after a copy.
pub const COPIED_FLAG_RESET: Duration = Duration::from_millis(2000);

/// Pause between reaching 100% and clearing the processing flag, so the
/// full bar is visible for a moment.
pub const COMPLETE_DISPLAY_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Analyzing,
    Transforming,
    Optimizing,
    Complete,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Analyzing => "Analyzing",
            Stage::Transforming => "Transforming",
            Stage::Optimizing => "Optimizing",
            Stage::Complete => "Complete",
        }
    }
}

/// Cosmetic progress schedule. The stages advance on these fixed timers
/// regardless of what the relay is actually doing; the request itself is
/// only issued after the last delay elapses.
pub const STAGE_SCHEDULE: [(Stage, Duration, u8); 3] = [
    (Stage::Analyzing, Duration::from_millis(500), 0),
    (Stage::Transforming, Duration::from_millis(1000), 25),
    (Stage::Optimizing, Duration::from_millis(300), 50),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingState {
    pub is_processing: bool,
    pub stage: Stage,
    pub progress: u8,
}

impl Default for ProcessingState {
    fn default() -> Self {
        Self {
            is_processing: false,
            stage: Stage::Analyzing,
            progress: 0,
        }
    }
}

/// Events the background runtime reports back to the UI thread.
#[derive(Debug)]
pub enum ProcessorEvent {
    StageAdvanced { stage: Stage, progress: u8 },
    Completed(HumanizeResult),
    Failed { original: String, message: String },
}

#[derive(Debug, PartialEq, Eq)]
pub enum SubmitError {
    EmptyInput,
    RequestInFlight,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::EmptyInput => write!(f, "input text is empty"),
            SubmitError::RequestInFlight => write!(f, "a request is already in flight"),
        }
    }
}

impl std::error::Error for SubmitError {}

/// Request-lifecycle state machine. Owns the processing state and the last
/// result; the UI reads both and the runtime feeds it events. At most one
/// request is in flight at a time; a second submission is rejected, never
/// queued.
#[derive(Debug, Default)]
pub struct Controller {
    processing: ProcessingState,
    result: HumanizeResult,
    copied_at: Option<Instant>,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn processing(&self) -> ProcessingState {
        self.processing
    }

    pub fn result(&self) -> &HumanizeResult {
        &self.result
    }

    pub fn humanized_text(&self) -> &str {
        &self.result.humanized
    }

    /// Whether a submission with this input would be accepted right now.
    /// The submit affordance is enabled from exactly this predicate.
    pub fn can_submit(&self, input: &str) -> bool {
        !self.processing.is_processing && !input.trim().is_empty()
    }

    /// Guarded `Idle -> Analyzing` transition. On success the returned
    /// request is handed to the runtime; the processing state is reset and
    /// marked in flight.
    pub fn begin_submission(
        &mut self,
        input: &str,
        tone: Tone,
        params: SamplingParams,
    ) -> Result<HumanizeRequest, SubmitError> {
        if self.processing.is_processing {
            return Err(SubmitError::RequestInFlight);
        }
        let request = HumanizeRequest::new(input, tone, params)
            .map_err(|_| SubmitError::EmptyInput)?;

        self.processing = ProcessingState {
            is_processing: true,
            stage: Stage::Analyzing,
            progress: 0,
        };
        self.copied_at = None;
        Ok(request)
    }

    pub fn apply_event(&mut self, event: ProcessorEvent) {
        match event {
            ProcessorEvent::StageAdvanced { stage, progress } => {
                if self.processing.is_processing {
                    self.processing.stage = stage;
                    self.processing.progress = progress.min(100);
                }
            }
            ProcessorEvent::Completed(result) => {
                self.result = result;
                self.processing = ProcessingState {
                    is_processing: false,
                    stage: Stage::Complete,
                    progress: 100,
                };
            }
            ProcessorEvent::Failed { original, message } => {
                self.result = HumanizeResult::failure(
                    original,
                    format!("Error: {message}. Please check the relay server and your API key."),
                );
                self.processing = ProcessingState::default();
            }
        }
    }

    pub fn mark_copied(&mut self, now: Instant) {
        self.copied_at = Some(now);
    }

    /// True while the transient "copied" indicator should be shown.
    pub fn copied(&self, now: Instant) -> bool {
        self.copied_at
            .is_some_and(|at| now.saturating_duration_since(at) < COPIED_FLAG_RESET)
    }
}

/// Phase of the press-to-talk gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingPhase {
    #[default]
    Idle,
    Recording,
    /// Released past the cancel threshold or cancelled explicitly; waiting to settle.
    Cancelled,
    /// Released normally; waiting to settle. `kept` is false for too-short takes.
    Committed { kept: bool },
}

/// Thresholds driving the recording state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordingLimits {
    pub max_duration_secs: u32,
    /// Upward drag distance beyond which a release cancels.
    pub cancel_threshold: f32,
    pub min_duration_secs: u32,
}

impl Default for RecordingLimits {
    fn default() -> Self {
        Self {
            max_duration_secs: 60,
            cancel_threshold: 50.0,
            min_duration_secs: 1,
        }
    }
}

/// Transient recording view state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RecordingState {
    pub phase: RecordingPhase,
    pub elapsed_secs: u32,
    pub cancel_intent: bool,
    pub origin_y: f32,
}

/// Input to the recording state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordingTransition {
    Start { origin_y: f32 },
    Tick,
    Track { y: f32 },
    /// A release without a coordinate counts as zero displacement.
    Release { y: Option<f32> },
    Cancel,
    Settle,
}

/// Observable result of one accepted transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingOutcome {
    Started,
    Ticked {
        elapsed_secs: u32,
        ceiling_reached: bool,
    },
    Tracked { cancel_intent: bool },
    Cancelled,
    TooShort,
    Kept { duration_secs: u32 },
    Settled,
}

/// Rejection reason for transitions illegal in the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingRejection {
    AlreadyRecording,
    NotRecording,
    NotSettling,
}

pub type RecordingResult = Result<RecordingOutcome, RecordingRejection>;

impl RecordingState {
    pub fn is_recording(&self) -> bool {
        self.phase == RecordingPhase::Recording
    }

    /// Applies one transition, mutating state only when it is accepted.
    pub fn apply(
        &mut self,
        transition: RecordingTransition,
        limits: &RecordingLimits,
    ) -> RecordingResult {
        match transition {
            RecordingTransition::Start { origin_y } => self.apply_start(origin_y),
            RecordingTransition::Tick => self.apply_tick(limits),
            RecordingTransition::Track { y } => self.apply_track(y, limits),
            RecordingTransition::Release { y } => self.apply_release(y, limits),
            RecordingTransition::Cancel => self.apply_cancel(),
            RecordingTransition::Settle => self.apply_settle(),
        }
    }

    fn apply_start(&mut self, origin_y: f32) -> RecordingResult {
        if self.is_recording() {
            return Err(RecordingRejection::AlreadyRecording);
        }

        *self = Self {
            phase: RecordingPhase::Recording,
            elapsed_secs: 0,
            cancel_intent: false,
            origin_y,
        };
        Ok(RecordingOutcome::Started)
    }

    fn apply_tick(&mut self, limits: &RecordingLimits) -> RecordingResult {
        if !self.is_recording() {
            return Err(RecordingRejection::NotRecording);
        }

        self.elapsed_secs = self.elapsed_secs.saturating_add(1);
        Ok(RecordingOutcome::Ticked {
            elapsed_secs: self.elapsed_secs,
            ceiling_reached: self.elapsed_secs >= limits.max_duration_secs,
        })
    }

    fn apply_track(&mut self, y: f32, limits: &RecordingLimits) -> RecordingResult {
        if !self.is_recording() {
            return Err(RecordingRejection::NotRecording);
        }

        self.cancel_intent = self.exceeds_cancel_threshold(y, limits);
        Ok(RecordingOutcome::Tracked {
            cancel_intent: self.cancel_intent,
        })
    }

    fn apply_release(&mut self, y: Option<f32>, limits: &RecordingLimits) -> RecordingResult {
        if !self.is_recording() {
            return Err(RecordingRejection::NotRecording);
        }

        let y = y.unwrap_or(self.origin_y);
        self.cancel_intent = self.exceeds_cancel_threshold(y, limits);
        if self.cancel_intent {
            self.phase = RecordingPhase::Cancelled;
            return Ok(RecordingOutcome::Cancelled);
        }

        if self.elapsed_secs < limits.min_duration_secs {
            self.phase = RecordingPhase::Committed { kept: false };
            return Ok(RecordingOutcome::TooShort);
        }

        self.phase = RecordingPhase::Committed { kept: true };
        Ok(RecordingOutcome::Kept {
            duration_secs: self.elapsed_secs,
        })
    }

    fn apply_cancel(&mut self) -> RecordingResult {
        if !self.is_recording() {
            return Err(RecordingRejection::NotRecording);
        }

        self.cancel_intent = true;
        self.phase = RecordingPhase::Cancelled;
        Ok(RecordingOutcome::Cancelled)
    }

    fn apply_settle(&mut self) -> RecordingResult {
        match self.phase {
            RecordingPhase::Cancelled | RecordingPhase::Committed { .. } => {
                self.phase = RecordingPhase::Idle;
                self.elapsed_secs = 0;
                self.cancel_intent = false;
                Ok(RecordingOutcome::Settled)
            }
            RecordingPhase::Idle | RecordingPhase::Recording => {
                Err(RecordingRejection::NotSettling)
            }
        }
    }

    // Screen coordinates grow downward, so dragging up yields a positive displacement.
    fn exceeds_cancel_threshold(&self, y: f32, limits: &RecordingLimits) -> bool {
        self.origin_y - y > limits.cancel_threshold
    }
}

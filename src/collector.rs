//! Response collection
//!
//! The timing state machine for a running test: stamps stimulus presentation,
//! classifies key responses, and enforces the retry-until-correct rule.
//!
//! Contract: an incorrect response never creates a [`Response`] record. It
//! triggers error feedback and a retry on the same trial with a fresh
//! presentation timestamp, so the log holds exactly one record per trial and
//! that record carries the latency of the terminal correct answer. A
//! `correct = false` record can only enter a log from a host-supplied,
//! pre-classified source (see [`crate::schema`]), never from this collector.

use crate::clock::Clock;
use crate::error::EngineError;
use crate::types::{KeySide, Response, Trial};
use std::time::Duration;

/// Feedback delay after a correct response
pub const FEEDBACK_CORRECT: Duration = Duration::from_millis(500);

/// Feedback delay after an incorrect response. Longer than the correct-path
/// delay to reinforce the correction.
pub const FEEDBACK_ERROR: Duration = Duration::from_millis(1000);

/// Collector phase for the trial in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorPhase {
    /// No trial presented
    Idle,
    /// Stimulus on screen, clock running
    AwaitingResponse,
    /// Feedback on screen, waiting for the host's timer to elapse
    Feedback,
}

/// Outcome of a single key submission
#[derive(Debug, Clone, Copy)]
pub struct SubmitOutcome {
    /// Whether the answer matched the trial's correct side
    pub correct: bool,
    /// Latency from presentation (or feedback clear, on a retry) in seconds
    pub response_time_s: f64,
    /// How long the host should display feedback before calling
    /// [`ResponseCollector::acknowledge_feedback`]
    pub feedback_delay: Duration,
}

/// What to do once feedback has been displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackResolution {
    /// Trial resolved; move to the next trial
    Advance,
    /// Answer was wrong; the same trial is re-presented with a fresh clock
    Retry,
}

#[derive(Debug, Clone)]
struct PendingTrial {
    effective_block: u8,
    correct_response: KeySide,
}

/// Timing state machine collecting the session's response log
#[derive(Debug)]
pub struct ResponseCollector<C: Clock> {
    clock: C,
    phase: CollectorPhase,
    presented_at: Duration,
    pending: Option<PendingTrial>,
    last_correct: bool,
    responses: Vec<Response>,
}

impl<C: Clock> ResponseCollector<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            phase: CollectorPhase::Idle,
            presented_at: Duration::ZERO,
            pending: None,
            last_correct: false,
            responses: Vec::new(),
        }
    }

    pub fn phase(&self) -> CollectorPhase {
        self.phase
    }

    /// Present a trial and start its clock
    pub fn present_trial(&mut self, trial: &Trial) -> Result<(), EngineError> {
        if self.phase != CollectorPhase::Idle {
            return Err(EngineError::InvalidState(format!(
                "cannot present a trial while {:?}",
                self.phase
            )));
        }
        self.pending = Some(PendingTrial {
            effective_block: trial.effective_block,
            correct_response: trial.correct_response,
        });
        self.presented_at = self.clock.now();
        self.phase = CollectorPhase::AwaitingResponse;
        Ok(())
    }

    /// Classify a key response against the trial in flight.
    ///
    /// A correct answer appends a [`Response`] to the log; an incorrect one
    /// appends nothing. Either way the collector enters `Feedback` and the
    /// host must display feedback for `feedback_delay` before acknowledging.
    pub fn submit_response(&mut self, input: KeySide) -> Result<SubmitOutcome, EngineError> {
        if self.phase != CollectorPhase::AwaitingResponse {
            return Err(EngineError::InvalidState(format!(
                "cannot submit a response while {:?}",
                self.phase
            )));
        }
        let pending = self
            .pending
            .as_ref()
            .ok_or_else(|| EngineError::InvalidState("no trial in flight".to_string()))?;

        let response_time_s = (self.clock.now() - self.presented_at).as_secs_f64();
        let correct = input == pending.correct_response;

        if correct {
            self.responses.push(Response {
                block: pending.effective_block,
                response_time_s,
                correct: true,
            });
        }

        self.last_correct = correct;
        self.phase = CollectorPhase::Feedback;

        Ok(SubmitOutcome {
            correct,
            response_time_s,
            feedback_delay: if correct {
                FEEDBACK_CORRECT
            } else {
                FEEDBACK_ERROR
            },
        })
    }

    /// Clear feedback. After an error the same trial stays in flight with a
    /// fresh presentation timestamp; after a correct answer the trial is done.
    pub fn acknowledge_feedback(&mut self) -> Result<FeedbackResolution, EngineError> {
        if self.phase != CollectorPhase::Feedback {
            return Err(EngineError::InvalidState(format!(
                "cannot acknowledge feedback while {:?}",
                self.phase
            )));
        }

        if self.last_correct {
            self.pending = None;
            self.phase = CollectorPhase::Idle;
            Ok(FeedbackResolution::Advance)
        } else {
            // Retry: latency is measured from the moment feedback clears.
            self.presented_at = self.clock.now();
            self.phase = CollectorPhase::AwaitingResponse;
            Ok(FeedbackResolution::Retry)
        }
    }

    /// Responses collected so far
    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    /// Consume the collector and return the full response log
    pub fn into_responses(self) -> Vec<Response> {
        self.responses
    }
}

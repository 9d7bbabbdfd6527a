//! Session orchestration
//!
//! This module drives the full seven-block procedure: it plans and shuffles
//! each block, runs the response collector over the shuffled trials, raises
//! the "categories have changed" notice at the key reversal, and on
//! completion scores the log and emits a [`SessionRecord`] to the sink.
//!
//! The session is single-user and client-local. Dropping it before block 7
//! completes is session teardown: nothing is emitted, no partial log is ever
//! flushed.

use crate::catalog::StimulusCatalog;
use crate::clock::{Clock, MonotonicClock};
use crate::collector::{FeedbackResolution, ResponseCollector, SubmitOutcome};
use crate::error::EngineError;
use crate::planner::{block_spec, plan_block, reversal_notice_required, BLOCK_COUNT};
use crate::scoring::compute_d_score;
use crate::sequencer::TrialSequencer;
use crate::sink::ResultSink;
use crate::types::{KeySide, Producer, SessionRecord, TestModel, Trial};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Block instructions on screen, waiting for the explicit "begin" action.
    /// When `reversal_notice` is set the instructions must include the
    /// blocking "categories have changed" notice.
    BlockIntro { block: u8, reversal_notice: bool },
    /// Trials running; the collector phase says whether a stimulus or
    /// feedback is on screen
    InBlock,
    /// Absorbing terminal state; the record has been emitted
    Complete,
}

/// What happened as a result of clearing feedback
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    /// Wrong answer: the same trial is live again with a fresh clock
    RetryTrial,
    /// Next trial of the same block is live
    NextTrial,
    /// Block finished; session is at the next block's intro screen
    BlockComplete { next_block: u8, reversal_notice: bool },
    /// All seven blocks resolved; the record was emitted to the sink
    SessionComplete { d_score: f64, validity_warning: bool },
}

/// A running test session
pub struct TestSession<S: ResultSink, C: Clock = MonotonicClock> {
    catalog: StimulusCatalog,
    model: TestModel,
    rng: StdRng,
    collector: ResponseCollector<C>,
    sequencer: TrialSequencer,
    current_block: u8,
    phase: SessionPhase,
    sink: S,
    session_id: Uuid,
    started_at: DateTime<Utc>,
}

impl<S: ResultSink> TestSession<S, MonotonicClock> {
    /// Start a session with the default monotonic clock and a fresh RNG,
    /// assigning the test model by coin flip.
    pub fn start(catalog: StimulusCatalog, sink: S) -> Result<Self, EngineError> {
        let mut rng = StdRng::from_entropy();
        let model = TestModel::random(&mut rng);
        Self::start_with(catalog, model, rng, MonotonicClock::new(), sink)
    }
}

impl<S: ResultSink, C: Clock> TestSession<S, C> {
    /// Start a session with explicit model, RNG, and clock. Tests use this to
    /// force a model and script both shuffling and latencies.
    pub fn start_with(
        catalog: StimulusCatalog,
        model: TestModel,
        mut rng: StdRng,
        clock: C,
        sink: S,
    ) -> Result<Self, EngineError> {
        if !sink.test_enabled() {
            return Err(EngineError::TestingDisabled);
        }
        catalog.validate()?;

        let trials = plan_block(&catalog, 1, model)?;
        let sequencer = TrialSequencer::new(trials, &mut rng);

        Ok(Self {
            catalog,
            model,
            rng,
            collector: ResponseCollector::new(clock),
            sequencer,
            current_block: 1,
            phase: SessionPhase::BlockIntro {
                block: 1,
                reversal_notice: false,
            },
            sink,
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
        })
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn model(&self) -> TestModel {
        self.model
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// The trial currently in flight, if a block is running
    pub fn current_trial(&self) -> Option<&Trial> {
        match self.phase {
            SessionPhase::InBlock => self.sequencer.current(),
            _ => None,
        }
    }

    /// The participant's explicit "begin" action on the block intro screen.
    /// Acknowledges the reversal notice when one is showing.
    pub fn begin_block(&mut self) -> Result<(), EngineError> {
        match self.phase {
            SessionPhase::BlockIntro { .. } => {}
            _ => {
                return Err(EngineError::InvalidState(
                    "begin_block is only valid on a block intro screen".to_string(),
                ))
            }
        }

        let trial = self.sequencer.current().ok_or_else(|| {
            EngineError::InvalidState("block has no trials".to_string())
        })?;
        let trial = trial.clone();
        self.collector.present_trial(&trial)?;
        self.phase = SessionPhase::InBlock;
        Ok(())
    }

    /// Submit a key response for the live trial
    pub fn submit(&mut self, input: KeySide) -> Result<SubmitOutcome, EngineError> {
        if self.phase != SessionPhase::InBlock {
            return Err(EngineError::InvalidState(
                "no trial is awaiting a response".to_string(),
            ));
        }
        self.collector.submit_response(input)
    }

    /// Clear feedback after the host's feedback timer elapses. Advances to
    /// the next trial, the next block intro, or session completion.
    pub fn acknowledge_feedback(&mut self) -> Result<SessionEvent, EngineError> {
        if self.phase != SessionPhase::InBlock {
            return Err(EngineError::InvalidState(
                "no feedback is being displayed".to_string(),
            ));
        }

        match self.collector.acknowledge_feedback()? {
            FeedbackResolution::Retry => Ok(SessionEvent::RetryTrial),
            FeedbackResolution::Advance => {
                self.sequencer.advance();
                if self.sequencer.has_more() {
                    let trial = self.sequencer.current().expect("has_more").clone();
                    self.collector.present_trial(&trial)?;
                    return Ok(SessionEvent::NextTrial);
                }

                if self.current_block < BLOCK_COUNT {
                    self.enter_next_block()
                } else {
                    self.finalize()
                }
            }
        }
    }

    fn enter_next_block(&mut self) -> Result<SessionEvent, EngineError> {
        let prev_spec = block_spec(self.current_block, self.model)?;
        self.current_block += 1;
        let next_spec = block_spec(self.current_block, self.model)?;
        let reversal_notice = reversal_notice_required(&prev_spec, &next_spec);

        let trials = plan_block(&self.catalog, self.current_block, self.model)?;
        self.sequencer = TrialSequencer::new(trials, &mut self.rng);
        self.phase = SessionPhase::BlockIntro {
            block: self.current_block,
            reversal_notice,
        };

        Ok(SessionEvent::BlockComplete {
            next_block: self.current_block,
            reversal_notice,
        })
    }

    fn finalize(&mut self) -> Result<SessionEvent, EngineError> {
        let responses = self.collector.responses().to_vec();
        let score = compute_d_score(&responses);

        let record = SessionRecord {
            session_id: self.session_id,
            test_model: self.model,
            d_score: score.value,
            validity_warning: score.validity_warning,
            responses,
            started_at_utc: self.started_at,
            computed_at_utc: Utc::now(),
            producer: Producer::default(),
        };

        self.sink.on_session_complete(&record);
        self.phase = SessionPhase::Complete;

        Ok(SessionEvent::SessionComplete {
            d_score: score.value,
            validity_warning: score.validity_warning,
        })
    }

    /// Consume the session and hand back the sink
    pub fn into_sink(self) -> S {
        self.sink
    }
}

/// Run a complete synthetic session with scripted latencies and all-correct
/// answers. Used by the CLI and FFI surfaces for demos and smoke checks.
pub fn simulate_session(
    catalog: StimulusCatalog,
    model: TestModel,
    seed: u64,
) -> Result<SessionRecord, EngineError> {
    use crate::clock::ManualClock;
    use crate::sink::MemorySink;
    use std::time::Duration;

    let mut latency_rng = StdRng::seed_from_u64(seed ^ 0x9e37_79b9_7f4a_7c15);
    let clock = ManualClock::new();
    let time = clock.clone();
    let mut session = TestSession::start_with(
        catalog,
        model,
        StdRng::seed_from_u64(seed),
        clock,
        MemorySink::new(),
    )?;

    session.begin_block()?;
    loop {
        let (correct, effective_block) = {
            let trial = session
                .current_trial()
                .ok_or_else(|| EngineError::InvalidState("no trial in flight".to_string()))?;
            (trial.correct_response, trial.effective_block)
        };

        // Combined blocks run a little slower, as real participants do
        let base_ms = match effective_block {
            3 | 4 => 700,
            6 | 7 => 850,
            _ => 600,
        };
        let jitter_ms = latency_rng.gen_range(0..200);
        time.advance(Duration::from_millis(base_ms + jitter_ms));

        session.submit(correct)?;
        match session.acknowledge_feedback()? {
            SessionEvent::SessionComplete { .. } => break,
            SessionEvent::BlockComplete { .. } => session.begin_block()?,
            SessionEvent::NextTrial | SessionEvent::RetryTrial => {}
        }
    }

    session
        .into_sink()
        .into_record()
        .ok_or_else(|| EngineError::InvalidState("session completed without a record".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::collector::CollectorPhase;
    use crate::sink::MemorySink;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn scripted_session(
        model: TestModel,
        seed: u64,
    ) -> (TestSession<MemorySink, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let session = TestSession::start_with(
            StimulusCatalog::builtin(),
            model,
            StdRng::seed_from_u64(seed),
            clock.clone(),
            MemorySink::new(),
        )
        .unwrap();
        (session, clock)
    }

    /// Answer every remaining trial correctly with the given latency,
    /// returning the block-complete / session-complete events seen.
    fn run_to_completion(
        session: &mut TestSession<MemorySink, ManualClock>,
        time: &ManualClock,
        latency: Duration,
    ) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        session.begin_block().unwrap();
        loop {
            let correct = session.current_trial().unwrap().correct_response;
            time.advance(latency);
            session.submit(correct).unwrap();
            match session.acknowledge_feedback().unwrap() {
                SessionEvent::SessionComplete {
                    d_score,
                    validity_warning,
                } => {
                    events.push(SessionEvent::SessionComplete {
                        d_score,
                        validity_warning,
                    });
                    return events;
                }
                SessionEvent::BlockComplete {
                    next_block,
                    reversal_notice,
                } => {
                    events.push(SessionEvent::BlockComplete {
                        next_block,
                        reversal_notice,
                    });
                    session.begin_block().unwrap();
                }
                _ => {}
            }
        }
    }

    #[test]
    fn test_disabled_flag_blocks_session_start() {
        let result = TestSession::start_with(
            StimulusCatalog::builtin(),
            TestModel::A,
            StdRng::seed_from_u64(0),
            ManualClock::new(),
            MemorySink::disabled(),
        );
        assert!(matches!(result, Err(EngineError::TestingDisabled)));
    }

    #[test]
    fn test_full_session_emits_one_record_with_full_log() {
        let (mut session, time) = scripted_session(TestModel::A, 11);
        let events = run_to_completion(&mut session, &time, Duration::from_millis(700));

        // Six block transitions plus the completion event
        assert_eq!(events.len(), 7);
        assert_eq!(session.phase(), SessionPhase::Complete);

        let record = session.into_sink().into_record().unwrap();
        assert_eq!(record.responses.len(), 180);
        assert_eq!(record.test_model, TestModel::A);
        assert!(record.responses.iter().all(|r| r.correct));
        // Uniform latencies produce a zero-variance fallback score
        assert_eq!(record.d_score, 0.0);
    }

    #[test]
    fn test_reversal_notice_raised_entering_block_5() {
        for model in [TestModel::A, TestModel::B] {
            let (mut session, time) = scripted_session(model, 3);
            let events = run_to_completion(&mut session, &time, Duration::from_millis(650));

            let notices: Vec<u8> = events
                .iter()
                .filter_map(|e| match e {
                    SessionEvent::BlockComplete {
                        next_block,
                        reversal_notice: true,
                    } => Some(*next_block),
                    _ => None,
                })
                .collect();
            assert_eq!(notices, vec![5], "model {:?}", model);
        }
    }

    #[test]
    fn test_wrong_answer_retries_without_logging() {
        let (mut session, time) = scripted_session(TestModel::A, 21);
        session.begin_block().unwrap();

        let correct = session.current_trial().unwrap().correct_response;
        time.advance(Duration::from_millis(450));

        let outcome = session.submit(correct.flipped()).unwrap();
        assert!(!outcome.correct);
        assert_eq!(
            session.acknowledge_feedback().unwrap(),
            SessionEvent::RetryTrial
        );
        assert_eq!(session.collector.responses().len(), 0);

        // Same trial is still live; answering correctly logs exactly one entry
        time.advance(Duration::from_millis(300));
        let outcome = session.submit(correct).unwrap();
        assert!(outcome.correct);
        assert_eq!(
            session.acknowledge_feedback().unwrap(),
            SessionEvent::NextTrial
        );
        assert_eq!(session.collector.responses().len(), 1);
        assert!(session.collector.responses()[0].correct);
    }

    #[test]
    fn test_abandoned_session_emits_nothing() {
        let (mut session, time) = scripted_session(TestModel::B, 8);
        session.begin_block().unwrap();

        // Answer a handful of trials, then walk away
        for _ in 0..5 {
            let correct = session.current_trial().unwrap().correct_response;
            time.advance(Duration::from_millis(600));
            session.submit(correct).unwrap();
            session.acknowledge_feedback().unwrap();
        }

        let sink = session.into_sink();
        assert!(sink.record().is_none());
    }

    #[test]
    fn test_responses_record_effective_blocks() {
        // Under model B the first presented block is effective block 1, the
        // second is effective block 5.
        let (mut session, time) = scripted_session(TestModel::B, 14);
        session.begin_block().unwrap();

        loop {
            let correct = session.current_trial().unwrap().correct_response;
            time.advance(Duration::from_millis(600));
            session.submit(correct).unwrap();
            if let SessionEvent::BlockComplete { .. } = session.acknowledge_feedback().unwrap() {
                break;
            }
        }

        let blocks: Vec<u8> = session
            .collector
            .responses()
            .iter()
            .map(|r| r.block)
            .collect();
        assert_eq!(blocks.len(), 20);
        assert!(blocks.iter().all(|b| *b == 1));

        session.begin_block().unwrap();
        let trial = session.current_trial().unwrap();
        assert_eq!(trial.block, 2);
        assert_eq!(trial.effective_block, 5);
    }

    #[test]
    fn test_submit_on_intro_screen_is_a_state_error() {
        let (mut session, _time) = scripted_session(TestModel::A, 2);
        assert!(matches!(
            session.submit(KeySide::Left),
            Err(EngineError::InvalidState(_))
        ));
        session.begin_block().unwrap();
        assert_eq!(session.collector.phase(), CollectorPhase::AwaitingResponse);
    }

    #[test]
    fn test_simulated_session_produces_positive_score() {
        let record =
            simulate_session(StimulusCatalog::builtin(), TestModel::A, 42).unwrap();
        assert_eq!(record.responses.len(), 180);
        // Simulated combined blocks 6/7 are slower than 3/4
        assert!(record.d_score > 0.0);
        assert!(!record.validity_warning);
    }

    #[test]
    fn test_simulation_is_reproducible() {
        let a = simulate_session(StimulusCatalog::builtin(), TestModel::B, 7).unwrap();
        let b = simulate_session(StimulusCatalog::builtin(), TestModel::B, 7).unwrap();
        assert_eq!(a.d_score, b.d_score);
        assert_eq!(a.responses, b.responses);
    }
}

//! Core types for the IAT trial and scoring pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: stimuli, block specifications, trials, responses, and the final
//! scored session record.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stimulus category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryTag {
    CommunicationDisorder,
    NormalCommunication,
    PositiveAttribute,
    NegativeAttribute,
}

impl CategoryTag {
    pub const ALL: [CategoryTag; 4] = [
        CategoryTag::CommunicationDisorder,
        CategoryTag::NormalCommunication,
        CategoryTag::PositiveAttribute,
        CategoryTag::NegativeAttribute,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryTag::CommunicationDisorder => "communication_disorder",
            CategoryTag::NormalCommunication => "normal_communication",
            CategoryTag::PositiveAttribute => "positive_attribute",
            CategoryTag::NegativeAttribute => "negative_attribute",
        }
    }
}

/// Logical response input. Physical key/touch binding is the host's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySide {
    Left,
    Right,
}

impl KeySide {
    /// The opposite side
    pub fn flipped(&self) -> KeySide {
        match self {
            KeySide::Left => KeySide::Right,
            KeySide::Right => KeySide::Left,
        }
    }
}

/// Counterbalancing assignment. Model B swaps the combined-block pairings
/// (2↔5, 3↔6, 4↔7) relative to model A to cancel order effects across
/// participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestModel {
    A,
    B,
}

impl TestModel {
    /// Assign a model by coin flip. Takes the RNG as a parameter so tests can
    /// force a deterministic assignment.
    pub fn random<R: Rng>(rng: &mut R) -> TestModel {
        if rng.gen_bool(0.5) {
            TestModel::A
        } else {
            TestModel::B
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestModel::A => "A",
            TestModel::B => "B",
        }
    }
}

/// A single stimulus: an opaque text-or-asset reference plus its category.
/// The engine never interprets or validates asset reachability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimulusItem {
    /// Word text or image asset path
    pub stimulus: String,
    /// Category the stimulus belongs to
    pub category: CategoryTag,
}

impl StimulusItem {
    pub fn new(stimulus: impl Into<String>, category: CategoryTag) -> Self {
        Self {
            stimulus: stimulus.into(),
            category,
        }
    }
}

/// Specification of one block: which categories are shown and which side each
/// category maps to. Derived deterministically from block number and model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockSpec {
    /// Presented block number (1-7)
    pub block: u8,
    /// Effective block number after counterbalancing remap (1-7)
    pub effective_block: u8,
    /// Category-to-side assignment for this block
    pub key_mapping: HashMap<CategoryTag, KeySide>,
}

impl BlockSpec {
    /// Side assigned to a category, or None if the category is not shown
    pub fn key_for(&self, category: CategoryTag) -> Option<KeySide> {
        self.key_mapping.get(&category).copied()
    }

    /// Categories included in this block
    pub fn categories(&self) -> Vec<CategoryTag> {
        let mut cats: Vec<CategoryTag> = CategoryTag::ALL
            .iter()
            .copied()
            .filter(|c| self.key_mapping.contains_key(c))
            .collect();
        cats.sort_by_key(|c| c.as_str());
        cats
    }
}

/// One planned trial. Immutable after creation; the participant's response is
/// recorded separately as a [`Response`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trial {
    /// The stimulus to present
    pub stimulus: StimulusItem,
    /// Presented block number (1-7)
    pub block: u8,
    /// Effective block number after counterbalancing remap
    pub effective_block: u8,
    /// The side that resolves this trial
    pub correct_response: KeySide,
}

/// One resolved trial. Created exactly once per trial, when the participant
/// answers; incorrect keypresses trigger error feedback and a retry without
/// creating a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Effective block number (1-7). Scoring partitions by effective block so
    /// the critical-block groups are identical under model A and model B.
    pub block: u8,
    /// Latency from stimulus presentation to the answer, in seconds
    pub response_time_s: f64,
    /// Whether the answer matched the trial's correct side
    pub correct: bool,
}

/// The improved D-score with its validity flag
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DScoreResult {
    /// Normalized bias score. Positive values indicate a faster
    /// disorder-with-negative association.
    pub value: f64,
    /// Set when the score is computable but suspect (excess fast responses,
    /// missing critical-block data, degenerate input)
    pub validity_warning: bool,
}

impl DScoreResult {
    /// Defined fallback when a score cannot be computed from the input
    pub fn invalid() -> Self {
        Self {
            value: 0.0,
            validity_warning: true,
        }
    }
}

/// Producer metadata embedded in every session record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Producer {
    /// Name of the producing software
    pub name: String,
    /// Version of the producing software
    pub version: String,
}

impl Default for Producer {
    fn default() -> Self {
        Self {
            name: crate::PRODUCER_NAME.to_string(),
            version: crate::ENGINE_VERSION.to_string(),
        }
    }
}

/// The complete result of a finished session, emitted once to the
/// [`ResultSink`](crate::sink::ResultSink).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Unique session identifier
    pub session_id: uuid::Uuid,
    /// Counterbalancing model used for this session
    pub test_model: TestModel,
    /// Improved D-score
    pub d_score: f64,
    /// Validity flag from scoring
    pub validity_warning: bool,
    /// Full append-only response log for the session
    pub responses: Vec<Response>,
    /// When the session started (UTC)
    pub started_at_utc: DateTime<Utc>,
    /// When the score was computed (UTC)
    pub computed_at_utc: DateTime<Utc>,
    /// Producer metadata
    pub producer: Producer,
}

impl SessionRecord {
    /// Serialize the record to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

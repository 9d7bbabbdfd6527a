//! iat.response_log.v1 schema definition
//!
//! The interchange payload a host UI submits for offline rescoring: the test
//! model plus the ordered response log of one completed session. Parsed from
//! a JSON object or from NDJSON (one response per line), with per-record
//! validation.

use crate::error::EngineError;
use crate::types::{Response, TestModel};
use serde::{Deserialize, Serialize};

/// Current schema version
pub const SCHEMA_VERSION: &str = "iat.response_log.v1";

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// A response log submitted for scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseLog {
    /// Schema version tag
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    /// Counterbalancing model the session ran under
    pub test_model: TestModel,
    /// Ordered responses, one per resolved trial
    pub responses: Vec<Response>,
}

impl ResponseLog {
    /// Parse a log from a single JSON object
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let log: ResponseLog = serde_json::from_str(json)?;
        log.validate()?;
        Ok(log)
    }

    /// Parse responses from NDJSON (one response object per line). The model
    /// is supplied separately because NDJSON lines carry no envelope.
    pub fn from_ndjson(ndjson: &str, test_model: TestModel) -> Result<Self, EngineError> {
        let mut responses = Vec::new();
        for (line_no, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let response: Response = serde_json::from_str(trimmed).map_err(|e| {
                EngineError::InvalidResponseLog(format!("line {}: {}", line_no + 1, e))
            })?;
            responses.push(response);
        }

        let log = ResponseLog {
            schema_version: SCHEMA_VERSION.to_string(),
            test_model,
            responses,
        };
        log.validate()?;
        Ok(log)
    }

    /// Validate the log: known schema version, block numbers in range, and
    /// non-negative finite latencies.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(EngineError::InvalidResponseLog(format!(
                "unsupported schema version {}",
                self.schema_version
            )));
        }

        for (idx, response) in self.responses.iter().enumerate() {
            if !(1..=7).contains(&response.block) {
                return Err(EngineError::InvalidResponseLog(format!(
                    "response {}: block {} out of range 1-7",
                    idx, response.block
                )));
            }
            if !response.response_time_s.is_finite() || response.response_time_s < 0.0 {
                return Err(EngineError::InvalidResponseLog(format!(
                    "response {}: invalid latency {}",
                    idx, response.response_time_s
                )));
            }
        }

        Ok(())
    }

    /// Serialize the log to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_log_json() -> &'static str {
        r#"{
            "schema_version": "iat.response_log.v1",
            "test_model": "A",
            "responses": [
                {"block": 3, "response_time_s": 0.65, "correct": true},
                {"block": 6, "response_time_s": 0.91, "correct": true},
                {"block": 4, "response_time_s": 0.58, "correct": false},
                {"block": 7, "response_time_s": 1.02, "correct": true}
            ]
        }"#
    }

    #[test]
    fn test_parse_json_log() {
        let log = ResponseLog::from_json(sample_log_json()).unwrap();
        assert_eq!(log.test_model, TestModel::A);
        assert_eq!(log.responses.len(), 4);
        assert_eq!(log.responses[0].block, 3);
    }

    #[test]
    fn test_schema_version_defaults_when_absent() {
        let json = r#"{"test_model": "B", "responses": []}"#;
        let log = ResponseLog::from_json(json).unwrap();
        assert_eq!(log.schema_version, SCHEMA_VERSION);
        assert_eq!(log.test_model, TestModel::B);
    }

    #[test]
    fn test_unknown_schema_version_rejected() {
        let json = r#"{"schema_version": "iat.response_log.v9", "test_model": "A", "responses": []}"#;
        let result = ResponseLog::from_json(json);
        assert!(matches!(result, Err(EngineError::InvalidResponseLog(_))));
    }

    #[test]
    fn test_out_of_range_block_rejected() {
        let json = r#"{
            "test_model": "A",
            "responses": [{"block": 9, "response_time_s": 0.5, "correct": true}]
        }"#;
        assert!(ResponseLog::from_json(json).is_err());
    }

    #[test]
    fn test_negative_latency_rejected() {
        let json = r#"{
            "test_model": "A",
            "responses": [{"block": 3, "response_time_s": -0.1, "correct": true}]
        }"#;
        assert!(ResponseLog::from_json(json).is_err());
    }

    #[test]
    fn test_parse_ndjson() {
        let ndjson = "\
{\"block\": 3, \"response_time_s\": 0.6, \"correct\": true}

{\"block\": 6, \"response_time_s\": 0.9, \"correct\": true}
";
        let log = ResponseLog::from_ndjson(ndjson, TestModel::B).unwrap();
        assert_eq!(log.responses.len(), 2);
        assert_eq!(log.test_model, TestModel::B);
    }

    #[test]
    fn test_ndjson_reports_bad_line() {
        let ndjson = "{\"block\": 3, \"response_time_s\": 0.6, \"correct\": true}\nnot json\n";
        let err = ResponseLog::from_ndjson(ndjson, TestModel::A).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_round_trip() {
        let log = ResponseLog::from_json(sample_log_json()).unwrap();
        let json = log.to_json().unwrap();
        let reparsed = ResponseLog::from_json(&json).unwrap();
        assert_eq!(reparsed.responses.len(), log.responses.len());
    }
}

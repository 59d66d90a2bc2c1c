//! Situation records — the raw contextual input that triggered a decision
//!
//! A `Situation` bundles the detected scenario tags with the sensor/vision
//! analysis payload. Both are retained verbatim on the resulting
//! `Intervention` for audit.

use serde::{Deserialize, Serialize};

/// One detected scenario (e.g. meal confusion, stove hazard).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario tag, e.g. `"meal_confusion"`, `"stove_safety"`.
    pub kind: String,
    #[serde(default)]
    pub description: String,
    /// Detector confidence in `[0, 1]`.
    #[serde(default)]
    pub confidence: f64,
}

impl Scenario {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            description: String::new(),
            confidence: 1.0,
        }
    }
}

/// Analysis payload from the vision/audio collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SensorAnalysis {
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub activity: String,
    #[serde(default)]
    pub emotional_indicators: String,
    #[serde(default)]
    pub safety_concerns: Vec<String>,
    /// Urgency estimated by the analysis layer, in `[0, 1]`.
    #[serde(default)]
    pub urgency_level: Option<f64>,
    /// Raw analysis output, carried for emergency-notice evidence.
    #[serde(default)]
    pub raw: serde_json::Value,
}

/// The originating context for one `process()` call.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Situation {
    pub scenarios: Vec<Scenario>,
    pub analysis: SensorAnalysis,
}

impl Situation {
    /// Contextual urgency fed to the escalation policy.
    ///
    /// An absent urgency estimate is treated as `0.0` so a missing sensor
    /// field can never block classification.
    pub fn urgency(&self) -> f64 {
        self.analysis.urgency_level.unwrap_or(0.0)
    }

    /// Scenario tags, in detection order.
    pub fn scenario_kinds(&self) -> Vec<String> {
        self.scenarios.iter().map(|s| s.kind.clone()).collect()
    }

    /// Build a situation from a single scenario tag (manual triggers, demo).
    pub fn from_scenario(kind: impl Into<String>) -> Self {
        Self {
            scenarios: vec![Scenario::new(kind)],
            analysis: SensorAnalysis::default(),
        }
    }
}

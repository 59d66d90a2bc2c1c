//! Engine configuration
//!
//! Defaults come from the environment (same pattern as the demo deployment:
//! every knob has a `CARE_*` variable), and a TOML file can override the lot
//! for test rigs and packaged deployments.

use serde::{Deserialize, Serialize};

use crate::policy::Thresholds;

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok()?.parse().ok()
}

fn env_bool(key: &str) -> bool {
    std::env::var(key).map(|v| v == "true" || v == "1").unwrap_or(false)
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok()?.parse().ok()
}

/// Timing constants for the demo scheduler.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DemoTiming {
    /// Delay after a timeline entry's start before the intervention fires,
    /// letting the underlying scenario visibly unfold first.
    pub trigger_offset_ms: u64,
    /// Extra time after the final entry's end before auto-stop.
    pub stop_buffer_ms: u64,
}

impl Default for DemoTiming {
    fn default() -> Self {
        Self {
            trigger_offset_ms: env_u64("CARE_DEMO_TRIGGER_OFFSET_MS").unwrap_or(3000),
            stop_buffer_ms: env_u64("CARE_DEMO_STOP_BUFFER_MS").unwrap_or(2000),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tier boundary thresholds compared against urgency scores.
    pub thresholds: Thresholds,
    /// Ring-buffer bound for intervention history.
    pub history_limit: usize,
    /// Ring-buffer bound for the conversational log.
    pub conversation_limit: usize,
    /// Whether AI_ONLY interventions also send a caregiver notice.
    /// Off by default; when on, such notices count toward notifications
    /// sent but never toward the notify tier counter.
    pub notify_on_ai_only: bool,
    pub demo: DemoTiming,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds {
                notify: env_f64("CARE_NOTIFY_THRESHOLD").unwrap_or(0.70),
                emergency: env_f64("CARE_EMERGENCY_THRESHOLD").unwrap_or(0.85),
            },
            history_limit: 100,
            conversation_limit: 50,
            notify_on_ai_only: env_bool("CARE_NOTIFY_AI_ONLY"),
            demo: DemoTiming::default(),
        }
    }
}

impl EngineConfig {
    /// Load from a TOML document; missing fields keep their defaults.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

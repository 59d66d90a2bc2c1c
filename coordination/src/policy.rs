//! Escalation Policy — deterministic tier classification
//!
//! Maps a `Decision` plus contextual urgency onto one of three escalation
//! tiers. All routing is deterministic — no LLM calls in this module. The
//! upstream reasoning collaborator gets an override path (an explicit tier
//! hint can escalate), but the numeric floor cannot be bypassed: a hint of
//! `AiOnly` is still escalated when the score crosses a threshold.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::decision::{Decision, TierHint};

/// Escalation severity tier, strictly ordered: `AiOnly < Notify < Emergency`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// The engine handles the situation alone — no caregiver alert.
    #[default]
    AiOnly,
    /// Engage the patient while notifying the caregiver.
    Notify,
    /// Critical safety issue — immediate alert, priority forced to critical.
    Emergency,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AiOnly => write!(f, "ai_only"),
            Self::Notify => write!(f, "notify"),
            Self::Emergency => write!(f, "emergency"),
        }
    }
}

/// Urgency thresholds the tier boundaries are compared against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Thresholds {
    /// Scores at or above this value escalate to at least `Notify`.
    pub notify: f64,
    /// Scores at or above this value escalate to `Emergency`.
    pub emergency: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            notify: 0.70,
            emergency: 0.85,
        }
    }
}

/// Classify a decision into an escalation tier.
///
/// Rules, in priority order:
/// 1. Emergency hint OR `max(urgency_score, context_urgency) >= emergency`
///    threshold → `Emergency`
/// 2. Notify hint OR `max(...) >= notify` threshold → `Notify`
/// 3. Otherwise → `AiOnly`
///
/// Pure function: same inputs always yield the same tier. A missing context
/// urgency is treated as `0.0` by the caller (see `Situation::urgency`).
pub fn classify(decision: &Decision, context_urgency: f64, thresholds: &Thresholds) -> Tier {
    let urgency = decision.urgency_score.max(context_urgency);

    if decision.tier_hint == Some(TierHint::Emergency) || urgency >= thresholds.emergency {
        return Tier::Emergency;
    }

    if decision.tier_hint == Some(TierHint::Notify) || urgency >= thresholds.notify {
        return Tier::Notify;
    }

    Tier::AiOnly
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(score: f64, hint: Option<TierHint>) -> Decision {
        Decision {
            urgency_score: score,
            tier_hint: hint,
            ..Decision::safe_default()
        }
    }

    #[test]
    fn test_low_score_no_hint_is_ai_only() {
        let thresholds = Thresholds::default();
        for score in [0.0, 0.1, 0.4, 0.69] {
            assert_eq!(
                classify(&decision(score, None), 0.0, &thresholds),
                Tier::AiOnly,
                "score {score} should stay AiOnly"
            );
        }
    }

    #[test]
    fn test_notify_floor() {
        let thresholds = Thresholds::default();
        assert_eq!(
            classify(&decision(0.70, None), 0.0, &thresholds),
            Tier::Notify
        );
        assert_eq!(
            classify(&decision(0.84, None), 0.0, &thresholds),
            Tier::Notify
        );
    }

    #[test]
    fn test_emergency_floor_overrides_ai_only_hint() {
        // The numeric floor cannot be bypassed by a downgrade hint.
        let thresholds = Thresholds::default();
        assert_eq!(
            classify(&decision(0.92, Some(TierHint::AiOnly)), 0.0, &thresholds),
            Tier::Emergency
        );
        assert_eq!(
            classify(&decision(0.85, Some(TierHint::Notify)), 0.0, &thresholds),
            Tier::Emergency
        );
    }

    #[test]
    fn test_hint_escalates_low_score() {
        let thresholds = Thresholds::default();
        assert_eq!(
            classify(&decision(0.1, Some(TierHint::Emergency)), 0.0, &thresholds),
            Tier::Emergency
        );
        assert_eq!(
            classify(&decision(0.1, Some(TierHint::Notify)), 0.0, &thresholds),
            Tier::Notify
        );
    }

    #[test]
    fn test_context_urgency_takes_max() {
        let thresholds = Thresholds::default();
        // Decision score is low but the sensor analysis saw something urgent.
        assert_eq!(
            classify(&decision(0.2, None), 0.9, &thresholds),
            Tier::Emergency
        );
        assert_eq!(
            classify(&decision(0.2, None), 0.75, &thresholds),
            Tier::Notify
        );
    }

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::AiOnly < Tier::Notify);
        assert!(Tier::Notify < Tier::Emergency);
    }

    #[test]
    fn test_tier_serde_snake_case() {
        let json = serde_json::to_string(&Tier::AiOnly).unwrap();
        assert_eq!(json, "\"ai_only\"");
        let tier: Tier = serde_json::from_str("\"emergency\"").unwrap();
        assert_eq!(tier, Tier::Emergency);
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = Thresholds {
            notify: 0.5,
            emergency: 0.9,
        };
        assert_eq!(
            classify(&decision(0.6, None), 0.0, &thresholds),
            Tier::Notify
        );
        assert_eq!(
            classify(&decision(0.95, None), 0.0, &thresholds),
            Tier::Emergency
        );
    }
}

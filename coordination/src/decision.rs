//! Decision data contract
//!
//! The immutable record produced by the external reasoning collaborator.
//! Field names mirror the wire JSON the reasoning service emits
//! (`intervention_needed`, `urgency_score`, `voice_message`, ...). The core
//! never fails on a malformed upstream response: `parse_lenient` substitutes
//! a documented safe default instead of propagating a parse error.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Advisory tier classification from the reasoning collaborator.
///
/// Not authoritative — the escalation policy treats this as an override path
/// upward only; the numeric urgency floor still applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TierHint {
    AiOnly,
    Notify,
    Emergency,
}

/// Priority the caregiver notice should carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NoticePriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for NoticePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Caregiver notification block inside a decision.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CaregiverNotice {
    #[serde(default)]
    pub needed: bool,
    #[serde(default)]
    pub priority: NoticePriority,
    #[serde(default)]
    pub message: String,
}

/// Judgement about a situation, produced externally and consumed by the
/// escalation engine. No logic of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Whether any observable action should be taken at all.
    #[serde(default)]
    pub intervention_needed: bool,

    /// Urgency in `[0, 1]`. Always present; defaults to `0.0` when the
    /// upstream response omitted it.
    #[serde(default)]
    pub urgency_score: f64,

    /// Advisory tier classification (`intervention_type` on the wire).
    #[serde(default, rename = "intervention_type")]
    pub tier_hint: Option<TierHint>,

    /// Free-text explanation from the reasoning collaborator, kept verbatim
    /// for audit.
    #[serde(default)]
    pub reasoning: String,

    /// Text to speak/show to the patient.
    #[serde(default, rename = "voice_message")]
    pub message: Option<String>,

    /// Free-form action descriptors, executed in order.
    #[serde(default)]
    pub actions: Vec<String>,

    #[serde(default, rename = "caregiver_notification")]
    pub caregiver_notice: CaregiverNotice,

    /// Appended to long-term pattern memory; stored, never parsed.
    #[serde(default, rename = "learning_notes")]
    pub learning_note: String,
}

impl Decision {
    /// The documented safe default: no intervention, zero urgency, no
    /// actions. Substituted whenever upstream parsing fails.
    pub fn safe_default() -> Self {
        Self {
            intervention_needed: false,
            urgency_score: 0.0,
            tier_hint: None,
            reasoning: String::new(),
            message: None,
            actions: Vec::new(),
            caregiver_notice: CaregiverNotice::default(),
            learning_note: String::new(),
        }
    }

    /// Parse a decision out of a free-text reasoning-service response.
    ///
    /// The service wraps its JSON in prose, so we extract the first balanced
    /// `{...}` block before deserializing. Any failure — no JSON found,
    /// invalid JSON, wrong shape — yields `safe_default()` rather than an
    /// error (malformed upstream output must never abort a care cycle).
    pub fn parse_lenient(text: &str) -> Self {
        let Some(json) = extract_json_object(text) else {
            warn!("no JSON object in reasoning response; using safe default");
            return Self::safe_default();
        };

        match serde_json::from_str::<Decision>(json) {
            Ok(decision) => decision,
            Err(e) => {
                warn!(error = %e, "failed to parse reasoning response; using safe default");
                Self::safe_default()
            }
        }
    }
}

impl Default for Decision {
    fn default() -> Self {
        Self::safe_default()
    }
}

/// Find the first balanced top-level `{...}` block in `text`.
///
/// Brace counting ignores braces inside JSON string literals.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

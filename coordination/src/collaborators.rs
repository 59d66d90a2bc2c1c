//! Collaborator seams
//!
//! The engine consumes every external service — reasoning, speech, smart-home
//! actuation, caregiver notification — through one of these narrow async
//! traits. Transports and SDKs live entirely behind them; the core sees only
//! success or `CollaboratorError`.
//!
//! Speech additionally goes through `SpeechChain`: an ordered list of
//! providers tried in sequence with the first success short-circuiting. This
//! makes the "try the real backend, then fall back" contract explicit and
//! testable instead of implicit in error handling.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::decision::{Decision, NoticePriority};
use crate::situation::Situation;

/// Error raised by any collaborator dispatch.
///
/// These are always recovered locally: a failed speak/notify/actuate degrades
/// that one effect, never the cycle.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("speech provider '{provider}' failed: {reason}")]
    Speech { provider: String, reason: String },

    #[error("safety actuation failed: {0}")]
    Actuation(String),

    #[error("caregiver notification failed: {0}")]
    Notification(String),

    #[error("reasoning service failed: {0}")]
    Reasoning(String),
}

/// What kind of safety actuation to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyKind {
    StoveOff,
}

impl std::fmt::Display for SafetyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StoveOff => write!(f, "stove_off"),
        }
    }
}

/// Outbound caregiver notice, fully assembled by the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaregiverNoticeOut {
    pub priority: NoticePriority,
    pub kind: String,
    pub message: String,
    /// Raw sensor evidence, attached only on the emergency tier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<serde_json::Value>,
    /// Emergency contact block, attached only on the emergency tier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_info: Option<serde_json::Value>,
}

/// Delivery receipt from the notification collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyReceipt {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Produces a `Decision` from raw situational input. May be an LLM call, a
/// rule table, or a human.
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn reason(&self, situation: &Situation) -> Result<Decision, CollaboratorError>;
}

/// Speech/audio output device.
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Identifier used in audit entries and fallback warnings.
    fn name(&self) -> &str;

    async fn speak(&self, text: &str) -> Result<(), CollaboratorError>;

    async fn play_media(&self, reference: &str) -> Result<(), CollaboratorError>;
}

/// Smart-home safety actuation.
#[async_trait]
pub trait SafetyActuator: Send + Sync {
    async fn actuate(&self, kind: SafetyKind) -> Result<(), CollaboratorError>;
}

/// Caregiver notification channel (dashboard push, email, SMS — irrelevant
/// here).
#[async_trait]
pub trait CaregiverNotifier: Send + Sync {
    async fn notify(&self, notice: &CaregiverNoticeOut) -> Result<NotifyReceipt, CollaboratorError>;
}

/// Ordered speech providers tried in sequence; the first success
/// short-circuits.
#[derive(Clone)]
pub struct SpeechChain {
    providers: Vec<Arc<dyn SpeechOutput>>,
}

impl SpeechChain {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Append a provider tier. Order of calls is the fallback order.
    pub fn with_provider(mut self, provider: Arc<dyn SpeechOutput>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Speak through the first provider that succeeds.
    ///
    /// Returns the name of the provider that served the request. Fails only
    /// when every tier fails (or none is configured).
    pub async fn speak(&self, text: &str) -> Result<String, CollaboratorError> {
        let mut last_reason = "no speech provider configured".to_string();

        for (idx, provider) in self.providers.iter().enumerate() {
            match provider.speak(text).await {
                Ok(()) => {
                    if idx > 0 {
                        warn!(provider = provider.name(), "primary speech tier failed, served by fallback");
                    } else {
                        debug!(provider = provider.name(), "speech served by primary");
                    }
                    return Ok(provider.name().to_string());
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "speech provider failed, trying next");
                    last_reason = e.to_string();
                }
            }
        }

        Err(CollaboratorError::Speech {
            provider: "all".to_string(),
            reason: last_reason,
        })
    }

    /// Play media through the first provider that succeeds.
    pub async fn play_media(&self, reference: &str) -> Result<String, CollaboratorError> {
        let mut last_reason = "no speech provider configured".to_string();

        for provider in &self.providers {
            match provider.play_media(reference).await {
                Ok(()) => return Ok(provider.name().to_string()),
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "media playback failed, trying next");
                    last_reason = e.to_string();
                }
            }
        }

        Err(CollaboratorError::Speech {
            provider: "all".to_string(),
            reason: last_reason,
        })
    }
}

impl Default for SpeechChain {
    fn default() -> Self {
        Self::new()
    }
}

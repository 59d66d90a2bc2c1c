//! Console-backed collaborators for demo runs.
//!
//! Every side effect lands in the log instead of touching real hardware or
//! notification channels. The speech chain still gets two tiers so fallback
//! behavior is visible in a demo.

use async_trait::async_trait;
use care_coordination::{
    CaregiverNoticeOut, CaregiverNotifier, CollaboratorError, NotifyReceipt, SafetyActuator,
    SafetyKind, SpeechOutput,
};
use tracing::{info, warn};

/// Primary speech tier: pretends to synthesize audio.
pub struct ConsoleVoice;

#[async_trait]
impl SpeechOutput for ConsoleVoice {
    fn name(&self) -> &str {
        "console-voice"
    }

    async fn speak(&self, text: &str) -> Result<(), CollaboratorError> {
        info!(provider = self.name(), "🔊 \"{text}\"");
        Ok(())
    }

    async fn play_media(&self, reference: &str) -> Result<(), CollaboratorError> {
        info!(provider = self.name(), media = %reference, "▶ playing");
        Ok(())
    }
}

/// Fallback tier: plain text log, never fails.
pub struct TextFallback;

#[async_trait]
impl SpeechOutput for TextFallback {
    fn name(&self) -> &str {
        "text-fallback"
    }

    async fn speak(&self, text: &str) -> Result<(), CollaboratorError> {
        info!(provider = self.name(), "{text}");
        Ok(())
    }

    async fn play_media(&self, reference: &str) -> Result<(), CollaboratorError> {
        info!(provider = self.name(), media = %reference, "would play");
        Ok(())
    }
}

pub struct ConsoleActuator;

#[async_trait]
impl SafetyActuator for ConsoleActuator {
    async fn actuate(&self, kind: SafetyKind) -> Result<(), CollaboratorError> {
        warn!(device = %kind, "⚡ safety actuation");
        Ok(())
    }
}

pub struct ConsoleNotifier;

#[async_trait]
impl CaregiverNotifier for ConsoleNotifier {
    async fn notify(&self, notice: &CaregiverNoticeOut) -> Result<NotifyReceipt, CollaboratorError> {
        let at = chrono::Local::now().format("%H:%M:%S");
        info!(
            priority = %notice.priority,
            kind = %notice.kind,
            "📨 [{at}] caregiver notice: {}",
            notice.message
        );
        if let Some(info) = &notice.patient_info {
            info!("   contacts: {info}");
        }
        Ok(NotifyReceipt {
            success: true,
            reason: None,
        })
    }
}

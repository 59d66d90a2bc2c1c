//! Intervention Coordinator — one `process()` call per incoming situation
//!
//! The coordinator owns the full intervention cycle: classify the decision
//! into a tier, drive the tier-specific side effects through the collaborator
//! seams, and fold the outcome into statistics, history, and the patient
//! profile. `process()` never returns an error — collaborator failures
//! degrade the affected effect and are recorded on the `Intervention`, the
//! cycle itself always completes and is always counted.
//!
//! All mutable state (statistics, history, conversation log) sits behind one
//! lock, taken in short scopes that never cross an await point.

use std::sync::Mutex;
use std::time::Instant;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::collaborators::{CaregiverNoticeOut, CaregiverNotifier, SafetyActuator, SpeechChain};
use crate::config::EngineConfig;
use crate::decision::{Decision, NoticePriority};
use crate::events::{CareEvent, EventBus, SharedEventBus};
use crate::executor::{ActionExecutor, ActionKind, ExecutedAction};
use crate::history::BoundedLog;
use crate::policy::{classify, Tier};
use crate::profile::{ActivityEntry, OutcomeEntry, SharedProfile};
use crate::situation::Situation;
use crate::stats::{self, DailySummary, StatisticsSnapshot, StatisticsTracker};

/// What was spoken to the patient, and through which provider tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceResponse {
    pub text: String,
    /// Name of the speech provider that served the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub served_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A caregiver notice as actually dispatched, with its delivery outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentNotice {
    pub timestamp: DateTime<Utc>,
    pub priority: NoticePriority,
    pub kind: String,
    pub message: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The complete audit record of one intervention cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intervention {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub tier: Tier,
    pub decision: Decision,
    pub situation: Situation,
    /// What was said to the patient, if anything.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<VoiceResponse>,
    pub executed_actions: Vec<ExecutedAction>,
    pub notifications: Vec<SentNotice>,
    /// At least one side effect failed but the cycle completed.
    pub partial: bool,
    /// Cycle-level failure summary, `None` on a clean run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One utterance in the bounded conversational log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub timestamp: DateTime<Utc>,
    pub speaker: String,
    pub text: String,
}

/// The injected collaborator bundle. Constructed by the embedding
/// application, never discovered by the engine.
#[derive(Clone)]
pub struct CollaboratorSet {
    pub speech: SpeechChain,
    pub actuator: std::sync::Arc<dyn SafetyActuator>,
    pub notifier: std::sync::Arc<dyn CaregiverNotifier>,
}

struct Inner {
    stats: StatisticsTracker,
    history: BoundedLog<Intervention>,
    conversation: BoundedLog<ConversationEntry>,
}

/// Orchestrates intervention cycles and owns their shared state.
pub struct InterventionCoordinator {
    config: EngineConfig,
    collaborators: CollaboratorSet,
    profile: SharedProfile,
    events: SharedEventBus,
    inner: Mutex<Inner>,
}

impl InterventionCoordinator {
    pub fn new(config: EngineConfig, collaborators: CollaboratorSet, profile: SharedProfile) -> Self {
        Self::with_events(config, collaborators, profile, EventBus::shared())
    }

    pub fn with_events(
        config: EngineConfig,
        collaborators: CollaboratorSet,
        profile: SharedProfile,
        events: SharedEventBus,
    ) -> Self {
        let inner = Inner {
            stats: StatisticsTracker::new(),
            history: BoundedLog::new(config.history_limit),
            conversation: BoundedLog::new(config.conversation_limit),
        };
        Self {
            config,
            collaborators,
            profile,
            events,
            inner: Mutex::new(inner),
        }
    }

    pub fn events(&self) -> &SharedEventBus {
        &self.events
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one full intervention cycle.
    ///
    /// Infallible by contract: any collaborator failure is folded into the
    /// returned `Intervention` (`partial`, per-action errors, `error`), and
    /// the intervention is recorded and counted either way.
    pub async fn process(&self, decision: Decision, situation: Situation) -> Intervention {
        let started = Instant::now();
        let tier = classify(&decision, situation.urgency(), &self.config.thresholds);
        let rotation = {
            let inner = self.inner.lock().expect("coordinator lock poisoned");
            inner.stats.total() as usize
        };

        info!(
            tier = %tier,
            urgency = decision.urgency_score,
            scenarios = ?situation.scenario_kinds(),
            "processing intervention"
        );

        let mut intervention = Intervention {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            tier,
            decision,
            situation,
            voice: None,
            executed_actions: Vec::new(),
            notifications: Vec::new(),
            partial: false,
            error: None,
        };

        match tier {
            Tier::AiOnly => self.handle_ai_only(&mut intervention, rotation).await,
            Tier::Notify => self.handle_notify(&mut intervention, rotation).await,
            Tier::Emergency => self.handle_emergency(&mut intervention, rotation).await,
        }

        self.finalize(&mut intervention, started.elapsed().as_secs_f64() * 1000.0);
        intervention
    }

    /// AI handles it alone: speak and act, no caregiver involvement unless
    /// opted in. A decision with no intervention needed records a single
    /// explicit no-op so the cycle still appears in the audit trail.
    async fn handle_ai_only(&self, intervention: &mut Intervention, rotation: usize) {
        if !intervention.decision.intervention_needed {
            debug!("no intervention needed; recording no-op");
            intervention
                .executed_actions
                .push(ExecutedAction::ok(ActionKind::NoAction, "monitoring only"));
            return;
        }

        self.speak_and_execute(intervention, rotation).await;

        if self.config.notify_on_ai_only {
            // Opt-in informational notice; counts toward notifications sent,
            // never toward the notify tier.
            self.send_notice(intervention, NoticePriority::Low, false).await;
        }
    }

    /// Intervene and tell the caregiver, at the decision's stated priority.
    async fn handle_notify(&self, intervention: &mut Intervention, rotation: usize) {
        self.speak_and_execute(intervention, rotation).await;
        let priority = intervention.decision.caregiver_notice.priority;
        self.send_notice(intervention, priority, false).await;
    }

    /// Immediate response: safety actions first-class, caregiver notice
    /// forced to critical with evidence attached. The notice is never
    /// suppressed, whatever the decision left out.
    async fn handle_emergency(&self, intervention: &mut Intervention, rotation: usize) {
        warn!(urgency = intervention.decision.urgency_score, "emergency tier engaged");
        self.speak_and_execute(intervention, rotation).await;
        self.send_notice(intervention, NoticePriority::Critical, true).await;
    }

    /// Speak the decision's message (if any) and execute its action list.
    async fn speak_and_execute(&self, intervention: &mut Intervention, rotation: usize) {
        if let Some(message) = intervention.decision.message.clone() {
            let voice = match self.collaborators.speech.speak(&message).await {
                Ok(served_by) => VoiceResponse {
                    text: message.clone(),
                    served_by: Some(served_by),
                    error: None,
                },
                Err(e) => {
                    error!(error = %e, "all speech tiers failed");
                    intervention.partial = true;
                    VoiceResponse {
                        text: message.clone(),
                        served_by: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            intervention.voice = Some(voice);

            let mut inner = self.inner.lock().expect("coordinator lock poisoned");
            inner.conversation.push(ConversationEntry {
                timestamp: Utc::now(),
                speaker: "assistant".to_string(),
                text: message,
            });
        }

        let executor = ActionExecutor::new(
            &self.collaborators.speech,
            self.collaborators.actuator.as_ref(),
            &self.profile,
        );
        let scenario_kinds = intervention.situation.scenario_kinds();
        let (executed, partial) = executor
            .execute_all(&intervention.decision.actions, &scenario_kinds, rotation)
            .await;
        intervention.executed_actions = executed;
        intervention.partial |= partial;
    }

    /// Assemble and dispatch a caregiver notice. Delivery failure marks the
    /// cycle partial and is recorded on the notice, nothing is retried here.
    async fn send_notice(
        &self,
        intervention: &mut Intervention,
        priority: NoticePriority,
        emergency: bool,
    ) {
        let kind = intervention
            .situation
            .scenarios
            .first()
            .map(|s| s.kind.clone())
            .unwrap_or_else(|| "general".to_string());

        let message = {
            let from_decision = &intervention.decision.caregiver_notice.message;
            if !from_decision.is_empty() {
                from_decision.clone()
            } else if !intervention.decision.reasoning.is_empty() {
                intervention.decision.reasoning.clone()
            } else if emergency {
                "Emergency intervention triggered".to_string()
            } else {
                format!("Intervention performed ({kind})")
            }
        };

        let (evidence, patient_info) = if emergency {
            let info = {
                let profile = self.profile.lock().expect("profile lock poisoned");
                profile.emergency_info()
            };
            (Some(intervention.situation.analysis.raw.clone()), Some(info))
        } else {
            (None, None)
        };

        let notice = CaregiverNoticeOut {
            priority,
            kind: kind.clone(),
            message: message.clone(),
            evidence,
            patient_info,
        };

        let mut sent = SentNotice {
            timestamp: Utc::now(),
            priority,
            kind: kind.clone(),
            message,
            success: false,
            error: None,
        };

        match self.collaborators.notifier.notify(&notice).await {
            Ok(receipt) => {
                sent.success = receipt.success;
                if !receipt.success {
                    sent.error = receipt.reason;
                    intervention.partial = true;
                }
            }
            Err(e) => {
                error!(error = %e, "caregiver notification failed");
                sent.error = Some(e.to_string());
                intervention.partial = true;
            }
        }

        if sent.success {
            self.events.publish(CareEvent::CaregiverNotified {
                intervention_id: intervention.id,
                priority,
                kind,
            });
        }

        intervention.notifications.push(sent);
    }

    /// Fold the completed cycle into statistics, history, and the profile,
    /// then announce it on the bus.
    fn finalize(&self, intervention: &mut Intervention, elapsed_ms: f64) {
        if intervention.error.is_none() && intervention.partial {
            let first_failure = intervention
                .executed_actions
                .iter()
                .filter_map(|a| a.error.as_deref())
                .chain(intervention.voice.iter().filter_map(|v| v.error.as_deref()))
                .chain(intervention.notifications.iter().filter_map(|n| n.error.as_deref()))
                .next();
            intervention.error = first_failure.map(|e| format!("partial cycle: {e}"));
        }

        let success = !intervention.partial && intervention.error.is_none();
        {
            let mut profile = self.profile.lock().expect("profile lock poisoned");
            profile.log_activity(ActivityEntry {
                timestamp: intervention.timestamp,
                kind: "intervention".to_string(),
                tier: Some(intervention.tier),
                scenarios: intervention.situation.scenario_kinds(),
                success,
            });
            if success && intervention.decision.intervention_needed {
                let technique = intervention
                    .executed_actions
                    .iter()
                    .map(|a| a.kind.to_string())
                    .collect::<Vec<_>>()
                    .join("+");
                profile.record_outcome(OutcomeEntry {
                    timestamp: intervention.timestamp,
                    situation: intervention
                        .situation
                        .scenarios
                        .first()
                        .map(|s| s.kind.clone())
                        .unwrap_or_else(|| "general".to_string()),
                    technique,
                    effectiveness: effectiveness_for(intervention.tier),
                    learning_note: intervention.decision.learning_note.clone(),
                });
            }
        }

        {
            let mut inner = self.inner.lock().expect("coordinator lock poisoned");
            inner.stats.record(intervention, elapsed_ms);
            inner.history.push(intervention.clone());
        }

        self.events.publish(CareEvent::InterventionCompleted {
            id: intervention.id,
            tier: intervention.tier,
            timestamp: intervention.timestamp,
            partial: intervention.partial,
        });

        info!(
            id = %intervention.id,
            tier = %intervention.tier,
            actions = intervention.executed_actions.len(),
            partial = intervention.partial,
            elapsed_ms = format!("{elapsed_ms:.1}"),
            "intervention recorded"
        );
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        self.inner
            .lock()
            .expect("coordinator lock poisoned")
            .stats
            .snapshot()
    }

    pub fn daily_summary(&self) -> DailySummary {
        let inner = self.inner.lock().expect("coordinator lock poisoned");
        stats::daily_summary(inner.history.iter(), Local::now())
    }

    /// The most recent `limit` interventions, oldest first.
    pub fn history(&self, limit: usize) -> Vec<Intervention> {
        let inner = self.inner.lock().expect("coordinator lock poisoned");
        inner.history.recent(limit).into_iter().cloned().collect()
    }

    /// The most recent `limit` conversation entries, oldest first.
    pub fn conversation(&self, limit: usize) -> Vec<ConversationEntry> {
        let inner = self.inner.lock().expect("coordinator lock poisoned");
        inner.conversation.recent(limit).into_iter().cloned().collect()
    }

    /// Record a patient utterance into the conversational log.
    pub fn record_utterance(&self, speaker: impl Into<String>, text: impl Into<String>) {
        let mut inner = self.inner.lock().expect("coordinator lock poisoned");
        inner.conversation.push(ConversationEntry {
            timestamp: Utc::now(),
            speaker: speaker.into(),
            text: text.into(),
        });
    }
}

/// Outcome effectiveness attributed per tier when a cycle succeeds: a calm
/// AI-only redirection is the best result, an emergency the least desirable
/// path even when it works.
fn effectiveness_for(tier: Tier) -> f64 {
    match tier {
        Tier::AiOnly => 0.85,
        Tier::Notify => 0.75,
        Tier::Emergency => 0.6,
    }
}

//! Action Executor — free-text descriptors to typed side effects
//!
//! The reasoning collaborator emits free-form action strings ("show photos
//! and play music", "turn off stove"). Matching is an explicit ordered table
//! of keyword rows evaluated deterministically — not ad hoc string
//! containment — so the dispatch behavior stays auditable and testable in
//! isolation.
//!
//! Matching is many-to-one on purpose: one descriptor can fire several rows
//! ("show photos and play music" triggers both a media-show and an
//! audio-play). Unmatched descriptors are never silently dropped — they land
//! in the audit trail with kind `Unrecognized` and are dispatched nowhere.
//! A failed dispatch records its error on that entry and the loop continues;
//! one failed effect must not block attempts at the others.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::collaborators::{SafetyActuator, SafetyKind, SpeechChain};
use crate::profile::SharedProfile;

/// Typed side-effect classes the engine knows how to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Show photos/media on the patient-facing display.
    ShowMedia,
    /// Play calming audio.
    PlayAudio,
    /// Smart-home safety actuation (stove off).
    ActuateSafety,
    /// Show timestamped evidence of a recent meal.
    ShowEvidence,
    /// Explicit no-op recorded when no intervention was needed.
    NoAction,
    /// Descriptor matched no capability keyword; recorded for audit only.
    Unrecognized,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShowMedia => write!(f, "show_media"),
            Self::PlayAudio => write!(f, "play_audio"),
            Self::ActuateSafety => write!(f, "actuate_safety"),
            Self::ShowEvidence => write!(f, "show_evidence"),
            Self::NoAction => write!(f, "no_action"),
            Self::Unrecognized => write!(f, "unrecognized"),
        }
    }
}

/// One performed (or attempted) side effect, as recorded on the
/// intervention's audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutedAction {
    pub kind: ActionKind,
    /// The originating descriptor plus what was actually done.
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ExecutedAction {
    pub fn ok(kind: ActionKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(kind: ActionKind, detail: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }
}

/// Capability keyword table, evaluated top to bottom per descriptor.
const CAPABILITY_TABLE: &[(ActionKind, &[&str])] = &[
    (ActionKind::ShowMedia, &["photo", "picture"]),
    (ActionKind::PlayAudio, &["music", "play"]),
    (ActionKind::ActuateSafety, &["stove", "turn off"]),
    (ActionKind::ShowEvidence, &["meal", "food"]),
];

/// All capability classes a descriptor matches, in table order.
/// Case-insensitive substring match.
pub fn matched_kinds(descriptor: &str) -> Vec<ActionKind> {
    let lower = descriptor.to_lowercase();
    CAPABILITY_TABLE
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(kind, _)| *kind)
        .collect()
}

/// Interprets a decision's action list and dispatches to collaborators.
///
/// Stateless per call; borrows the collaborators for the duration of one
/// `execute_all`.
pub struct ActionExecutor<'a> {
    speech: &'a SpeechChain,
    actuator: &'a dyn SafetyActuator,
    profile: &'a SharedProfile,
}

impl<'a> ActionExecutor<'a> {
    pub fn new(
        speech: &'a SpeechChain,
        actuator: &'a dyn SafetyActuator,
        profile: &'a SharedProfile,
    ) -> Self {
        Self {
            speech,
            actuator,
            profile,
        }
    }

    /// Execute every descriptor in order, returning the full audit trail and
    /// whether any dispatch failed (the cycle is then marked partial, not
    /// aborted).
    ///
    /// `rotation` feeds deterministic music selection; the caller passes the
    /// running intervention count.
    pub async fn execute_all(
        &self,
        actions: &[String],
        scenario_kinds: &[String],
        rotation: usize,
    ) -> (Vec<ExecutedAction>, bool) {
        let mut executed = Vec::new();
        let mut partial = false;

        for descriptor in actions {
            let kinds = matched_kinds(descriptor);
            if kinds.is_empty() {
                debug!(descriptor = %descriptor, "unrecognized action descriptor");
                executed.push(ExecutedAction::ok(
                    ActionKind::Unrecognized,
                    descriptor.clone(),
                ));
                continue;
            }

            for kind in kinds {
                let entry = self.dispatch(kind, descriptor, scenario_kinds, rotation).await;
                if entry.error.is_some() {
                    partial = true;
                }
                executed.push(entry);
            }
        }

        (executed, partial)
    }

    async fn dispatch(
        &self,
        kind: ActionKind,
        descriptor: &str,
        scenario_kinds: &[String],
        rotation: usize,
    ) -> ExecutedAction {
        match kind {
            ActionKind::ShowMedia => {
                // Profile lock is dropped before the await.
                let photos = {
                    let profile = self.profile.lock().expect("profile lock poisoned");
                    profile.photos_for(scenario_kinds)
                };
                let detail = format!("{descriptor}: photos [{}]", photos.join(", "));
                match self.speech.play_media(&photos.join(",")).await {
                    Ok(_) => ExecutedAction::ok(kind, detail),
                    Err(e) => {
                        warn!(error = %e, "media show failed");
                        ExecutedAction::failed(kind, detail, e.to_string())
                    }
                }
            }
            ActionKind::PlayAudio => {
                let song = {
                    let profile = self.profile.lock().expect("profile lock poisoned");
                    profile.calming_song(rotation).map(str::to_string)
                };
                let Some(song) = song else {
                    return ExecutedAction::failed(
                        kind,
                        descriptor.to_string(),
                        "no calming songs configured",
                    );
                };
                let detail = format!("{descriptor}: song '{song}'");
                match self.speech.play_media(&song).await {
                    Ok(_) => ExecutedAction::ok(kind, detail),
                    Err(e) => {
                        warn!(error = %e, "audio playback failed");
                        ExecutedAction::failed(kind, detail, e.to_string())
                    }
                }
            }
            ActionKind::ActuateSafety => {
                let detail = format!("{descriptor}: {}", SafetyKind::StoveOff);
                match self.actuator.actuate(SafetyKind::StoveOff).await {
                    Ok(()) => ExecutedAction::ok(kind, detail),
                    Err(e) => {
                        warn!(error = %e, "safety actuation failed");
                        ExecutedAction::failed(kind, detail, e.to_string())
                    }
                }
            }
            ActionKind::ShowEvidence => {
                // Record-only: the dashboard renders the evidence from the
                // audit trail; there is no collaborator to call.
                let detail = {
                    let profile = self.profile.lock().expect("profile lock poisoned");
                    match (
                        &profile.current_state.last_meal_type,
                        &profile.current_state.last_meal_time,
                    ) {
                        (Some(meal), Some(at)) => {
                            format!("{descriptor}: {meal} at {}", at.format("%H:%M"))
                        }
                        _ => format!("{descriptor}: no meal on record"),
                    }
                };
                ExecutedAction::ok(kind, detail)
            }
            // NoAction and Unrecognized are produced by callers, never
            // dispatched.
            ActionKind::NoAction | ActionKind::Unrecognized => {
                ExecutedAction::ok(kind, descriptor.to_string())
            }
        }
    }
}

//! Care Coordination Library
//!
//! The intervention escalation engine for automated patient-care responses.
//! Takes a judgement (`Decision`) produced by an external reasoning
//! collaborator, deterministically classifies it into an escalation tier,
//! drives the tier-specific side effects through narrow collaborator traits,
//! and maintains running statistics plus a bounded audit history.
//!
//! # Components
//!
//! - `policy`: pure tier classification against configured urgency thresholds
//! - `executor`: free-text action descriptors → typed, audited side effects
//! - `coordinator`: one `process()` call per incoming situation; owns
//!   history and statistics
//! - `stats`: running counters, incremental latency average, daily summaries
//!   and temporal-pattern heuristics
//! - `scheduler`: timer-driven demo sequencer with cancellable timer sets
//! - `collaborators`: speech / actuation / notification seams, including an
//!   ordered speech fallback chain
//! - `events`: broadcast bus the dashboard layer subscribes to

#![allow(clippy::uninlined_format_args)]

pub mod collaborators;
pub mod config;
pub mod coordinator;
pub mod decision;
pub mod events;
pub mod executor;
pub mod history;
pub mod policy;
pub mod profile;
pub mod scheduler;
pub mod situation;
pub mod stats;

// Re-export the data contracts
pub use decision::{CaregiverNotice, Decision, NoticePriority, TierHint};
pub use situation::{Scenario, SensorAnalysis, Situation};

// Re-export policy types
pub use policy::{classify, Thresholds, Tier};

// Re-export executor types
pub use executor::{ActionExecutor, ActionKind, ExecutedAction};

// Re-export coordinator types
pub use coordinator::{
    CollaboratorSet, ConversationEntry, Intervention, InterventionCoordinator, SentNotice,
    VoiceResponse,
};

// Re-export statistics types
pub use stats::{
    DailySummary, HourlyPeak, ScenarioCount, StatisticsSnapshot, StatisticsTracker, TierCounts,
};

// Re-export scheduler types
pub use scheduler::{DemoScheduler, FireHandler, SchedulerStatus, TimelineEntry};

// Re-export collaborator seams
pub use collaborators::{
    CaregiverNoticeOut, CaregiverNotifier, CollaboratorError, NotifyReceipt, Reasoner,
    SafetyActuator, SafetyKind, SpeechChain, SpeechOutput,
};

// Re-export event bus types
pub use events::{CareEvent, EventBus, SharedEventBus};

// Re-export config and profile
pub use config::{DemoTiming, EngineConfig};
pub use profile::{ActivityEntry, OutcomeEntry, PatientProfile, SharedProfile};

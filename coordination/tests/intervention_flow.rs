//! End-to-end intervention cycles through the public API, with recording
//! collaborator doubles in place of real speech, actuation, and
//! notification backends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use care_coordination::{
    ActionKind, CareEvent, CaregiverNotice, CaregiverNoticeOut, CaregiverNotifier,
    CollaboratorError, CollaboratorSet, Decision, EngineConfig, EventBus, InterventionCoordinator,
    NoticePriority, NotifyReceipt, PatientProfile, SafetyActuator, SafetyKind, Situation,
    SpeechChain, SpeechOutput, Tier, TierHint,
};

/// Route test logs through the capture writer; safe to call repeatedly.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Speech provider double; optionally fails every call.
struct FakeSpeech {
    name: &'static str,
    fail: bool,
    spoken: Mutex<Vec<String>>,
}

impl FakeSpeech {
    fn new(name: &'static str, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail,
            spoken: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl SpeechOutput for FakeSpeech {
    fn name(&self) -> &str {
        self.name
    }

    async fn speak(&self, text: &str) -> Result<(), CollaboratorError> {
        if self.fail {
            return Err(CollaboratorError::Speech {
                provider: self.name.to_string(),
                reason: "offline".to_string(),
            });
        }
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn play_media(&self, reference: &str) -> Result<(), CollaboratorError> {
        self.speak(reference).await
    }
}

struct FakeActuator {
    calls: AtomicUsize,
}

#[async_trait]
impl SafetyActuator for FakeActuator {
    async fn actuate(&self, _kind: SafetyKind) -> Result<(), CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct FakeNotifier {
    notices: Mutex<Vec<CaregiverNoticeOut>>,
}

#[async_trait]
impl CaregiverNotifier for FakeNotifier {
    async fn notify(&self, notice: &CaregiverNoticeOut) -> Result<NotifyReceipt, CollaboratorError> {
        self.notices.lock().unwrap().push(notice.clone());
        Ok(NotifyReceipt {
            success: true,
            reason: None,
        })
    }
}

struct Rig {
    coordinator: InterventionCoordinator,
    speech: Arc<FakeSpeech>,
    actuator: Arc<FakeActuator>,
    notifier: Arc<FakeNotifier>,
}

fn rig_with(config: EngineConfig) -> Rig {
    init_tracing();
    let speech = FakeSpeech::new("primary", false);
    let actuator = Arc::new(FakeActuator {
        calls: AtomicUsize::new(0),
    });
    let notifier = Arc::new(FakeNotifier::default());
    let collaborators = CollaboratorSet {
        speech: SpeechChain::new().with_provider(speech.clone()),
        actuator: actuator.clone(),
        notifier: notifier.clone(),
    };
    let coordinator = InterventionCoordinator::new(
        config,
        collaborators,
        PatientProfile::demo_default().shared(),
    );
    Rig {
        coordinator,
        speech,
        actuator,
        notifier,
    }
}

fn rig() -> Rig {
    rig_with(EngineConfig::default())
}

fn stove_emergency() -> (Decision, Situation) {
    let decision = Decision {
        intervention_needed: true,
        urgency_score: 0.92,
        tier_hint: Some(TierHint::Emergency),
        reasoning: "stove on with no cookware".to_string(),
        message: Some("Margaret, let's look at the garden instead.".to_string()),
        actions: vec!["turn off stove".to_string(), "play music".to_string()],
        caregiver_notice: CaregiverNotice {
            needed: true,
            priority: NoticePriority::Critical,
            message: "Stove activated, patient confused".to_string(),
        },
        learning_note: String::new(),
    };
    let mut situation = Situation::from_scenario("stove_safety");
    situation.analysis.raw = serde_json::json!({"sensor": "stove-1", "state": "on"});
    (decision, situation)
}

#[tokio::test]
async fn stove_emergency_runs_both_actions_and_notifies_critically() {
    let rig = rig();
    let (decision, situation) = stove_emergency();

    let intervention = rig.coordinator.process(decision, situation).await;

    assert_eq!(intervention.tier, Tier::Emergency);
    assert!(intervention.error.is_none());
    assert!(!intervention.partial);

    // Two executed actions: stove off, then music.
    assert_eq!(intervention.executed_actions.len(), 2);
    assert_eq!(intervention.executed_actions[0].kind, ActionKind::ActuateSafety);
    assert_eq!(intervention.executed_actions[1].kind, ActionKind::PlayAudio);
    assert_eq!(rig.actuator.calls.load(Ordering::SeqCst), 1);

    // Exactly one notice, critical, with evidence and contacts attached.
    let notices = rig.notifier.notices.lock().unwrap();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].priority, NoticePriority::Critical);
    assert_eq!(notices[0].evidence.as_ref().unwrap()["sensor"], "stove-1");
    assert!(notices[0].patient_info.is_some());

    // The calming message was spoken.
    assert_eq!(intervention.voice.as_ref().unwrap().served_by.as_deref(), Some("primary"));
}

#[tokio::test]
async fn meal_confusion_stays_ai_only() {
    let rig = rig();
    let decision = Decision {
        intervention_needed: true,
        urgency_score: 0.4,
        message: Some("You had tomato soup at noon, remember?".to_string()),
        actions: vec!["show meal evidence with timestamp".to_string()],
        ..Decision::safe_default()
    };

    let intervention = rig
        .coordinator
        .process(decision, Situation::from_scenario("meal_confusion"))
        .await;

    assert_eq!(intervention.tier, Tier::AiOnly);
    assert!(rig.notifier.notices.lock().unwrap().is_empty());
    assert_eq!(intervention.executed_actions.len(), 1);
    assert_eq!(intervention.executed_actions[0].kind, ActionKind::ShowEvidence);

    let snapshot = rig.coordinator.snapshot();
    assert_eq!(snapshot.ai_only_count, 1);
    assert_eq!(snapshot.notify_count, 0);
    assert_eq!(snapshot.notifications_sent, 0);
}

#[tokio::test]
async fn low_urgency_with_no_actions_is_counted_but_silent() {
    let rig = rig();
    let decision = Decision {
        intervention_needed: true,
        urgency_score: 0.4,
        ..Decision::safe_default()
    };

    let intervention = rig
        .coordinator
        .process(decision, Situation::from_scenario("meal_confusion"))
        .await;

    assert_eq!(intervention.tier, Tier::AiOnly);
    assert!(intervention.executed_actions.is_empty());
    assert!(intervention.voice.is_none());
    assert!(rig.notifier.notices.lock().unwrap().is_empty());
    assert_eq!(rig.coordinator.snapshot().total_interventions, 1);
}

#[tokio::test]
async fn no_intervention_needed_touches_no_collaborator() {
    let rig = rig();

    let intervention = rig
        .coordinator
        .process(Decision::safe_default(), Situation::default())
        .await;

    assert_eq!(intervention.tier, Tier::AiOnly);
    assert_eq!(intervention.executed_actions.len(), 1);
    assert_eq!(intervention.executed_actions[0].kind, ActionKind::NoAction);
    assert!(rig.speech.spoken.lock().unwrap().is_empty());
    assert_eq!(rig.actuator.calls.load(Ordering::SeqCst), 0);
    assert!(rig.notifier.notices.lock().unwrap().is_empty());
    assert_eq!(rig.coordinator.snapshot().total_interventions, 1);
}

#[tokio::test]
async fn garbage_reasoning_output_degrades_to_monitoring() {
    let rig = rig();
    let decision = Decision::parse_lenient("sorry, something went wrong upstream");

    let intervention = rig
        .coordinator
        .process(decision, Situation::from_scenario("agitation"))
        .await;

    assert_eq!(intervention.tier, Tier::AiOnly);
    assert!(rig.notifier.notices.lock().unwrap().is_empty());
    assert_eq!(rig.coordinator.snapshot().total_interventions, 1);
}

#[tokio::test]
async fn speech_falls_back_and_records_serving_provider() {
    init_tracing();
    let primary = FakeSpeech::new("primary", true);
    let fallback = FakeSpeech::new("fallback", false);
    let notifier = Arc::new(FakeNotifier::default());
    let collaborators = CollaboratorSet {
        speech: SpeechChain::new()
            .with_provider(primary.clone())
            .with_provider(fallback.clone()),
        actuator: Arc::new(FakeActuator {
            calls: AtomicUsize::new(0),
        }),
        notifier,
    };
    let coordinator = InterventionCoordinator::new(
        EngineConfig::default(),
        collaborators,
        PatientProfile::demo_default().shared(),
    );

    let decision = Decision {
        intervention_needed: true,
        urgency_score: 0.3,
        message: Some("Let's listen to some music.".to_string()),
        ..Decision::safe_default()
    };
    let intervention = coordinator
        .process(decision, Situation::from_scenario("agitation"))
        .await;

    let voice = intervention.voice.unwrap();
    assert_eq!(voice.served_by.as_deref(), Some("fallback"));
    assert!(voice.error.is_none());
    assert_eq!(fallback.spoken.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn percentages_reflect_tier_mix() {
    let rig = rig();

    // Two AI_ONLY, one NOTIFY, one EMERGENCY.
    for _ in 0..2 {
        rig.coordinator
            .process(Decision::safe_default(), Situation::default())
            .await;
    }
    let notify = Decision {
        intervention_needed: true,
        urgency_score: 0.75,
        ..Decision::safe_default()
    };
    rig.coordinator
        .process(notify, Situation::from_scenario("agitation"))
        .await;
    let (decision, situation) = stove_emergency();
    rig.coordinator.process(decision, situation).await;

    let snapshot = rig.coordinator.snapshot();
    assert_eq!(snapshot.total_interventions, 4);
    assert_eq!(snapshot.ai_only_percentage, 50.0);
    assert_eq!(snapshot.notify_percentage, 25.0);
    assert_eq!(snapshot.emergency_percentage, 25.0);
}

#[tokio::test]
async fn history_is_bounded_and_keeps_newest() {
    let config = EngineConfig {
        history_limit: 5,
        ..EngineConfig::default()
    };
    let rig = rig_with(config);

    for i in 0..12u32 {
        let decision = Decision {
            reasoning: format!("cycle {i}"),
            ..Decision::safe_default()
        };
        rig.coordinator.process(decision, Situation::default()).await;
    }

    let history = rig.coordinator.history(100);
    assert_eq!(history.len(), 5);
    assert_eq!(history[0].decision.reasoning, "cycle 7");
    assert_eq!(history[4].decision.reasoning, "cycle 11");
    // Evicted entries stay counted.
    assert_eq!(rig.coordinator.snapshot().total_interventions, 12);
}

#[tokio::test]
async fn completed_cycles_are_announced_on_the_bus() {
    init_tracing();
    let events = EventBus::shared();
    let mut rx = events.subscribe();

    let notifier = Arc::new(FakeNotifier::default());
    let collaborators = CollaboratorSet {
        speech: SpeechChain::new().with_provider(FakeSpeech::new("primary", false)),
        actuator: Arc::new(FakeActuator {
            calls: AtomicUsize::new(0),
        }),
        notifier,
    };
    let coordinator = InterventionCoordinator::with_events(
        EngineConfig::default(),
        collaborators,
        PatientProfile::demo_default().shared(),
        events,
    );

    let (decision, situation) = stove_emergency();
    let intervention = coordinator.process(decision, situation).await;

    // Notification event first (sent mid-cycle), then completion.
    match rx.recv().await.unwrap() {
        CareEvent::CaregiverNotified {
            intervention_id,
            priority,
            ..
        } => {
            assert_eq!(intervention_id, intervention.id);
            assert_eq!(priority, NoticePriority::Critical);
        }
        other => panic!("expected CaregiverNotified, got {other:?}"),
    }
    match rx.recv().await.unwrap() {
        CareEvent::InterventionCompleted { id, tier, .. } => {
            assert_eq!(id, intervention.id);
            assert_eq!(tier, Tier::Emergency);
        }
        other => panic!("expected InterventionCompleted, got {other:?}"),
    }
}

#[tokio::test]
async fn daily_summary_covers_todays_cycles() {
    let rig = rig();

    for _ in 0..2 {
        let decision = Decision {
            intervention_needed: true,
            urgency_score: 0.4,
            ..Decision::safe_default()
        };
        rig.coordinator
            .process(decision, Situation::from_scenario("meal_confusion"))
            .await;
    }
    let (decision, situation) = stove_emergency();
    rig.coordinator.process(decision, situation).await;

    let summary = rig.coordinator.daily_summary();
    assert_eq!(summary.total_interventions, 3);
    assert_eq!(summary.by_tier.ai_only, 2);
    assert_eq!(summary.by_tier.emergency, 1);
    assert_eq!(summary.top_scenarios[0].kind, "meal_confusion");
    assert_eq!(summary.top_scenarios[0].count, 2);
}

#[tokio::test]
async fn tier_hint_escalates_but_never_downgrades() {
    let rig = rig();

    // Low urgency with an emergency hint escalates.
    let (mut decision, situation) = stove_emergency();
    decision.urgency_score = 0.2;
    let intervention = rig.coordinator.process(decision, situation).await;
    assert_eq!(intervention.tier, Tier::Emergency);

    // High urgency with an AI_ONLY hint still crosses the numeric floor.
    let decision = Decision {
        intervention_needed: true,
        urgency_score: 0.9,
        tier_hint: Some(TierHint::AiOnly),
        ..Decision::safe_default()
    };
    let intervention = rig
        .coordinator
        .process(decision, Situation::from_scenario("wandering"))
        .await;
    assert_eq!(intervention.tier, Tier::Emergency);
}

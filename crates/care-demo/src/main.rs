mod console;
mod responses;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use care_coordination::{
    CollaboratorSet, DemoScheduler, EngineConfig, EventBus, FireHandler, InterventionCoordinator,
    PatientProfile, Reasoner, Situation, SpeechChain, TimelineEntry,
};
use clap::Parser;
use console::{ConsoleActuator, ConsoleNotifier, ConsoleVoice, TextFallback};
use responses::DemoReasoner;
use tracing::info;

#[derive(Parser)]
#[command(name = "care-demo", about = "Demo driver for the care coordination engine")]
struct Cli {
    /// Run a single scenario (meal_confusion, stove_safety, wandering,
    /// agitation) and exit; without it the continuous timeline runs
    #[arg(long)]
    scenario: Option<String>,

    /// TOML config file overriding the environment defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };

    let collaborators = CollaboratorSet {
        speech: SpeechChain::new()
            .with_provider(Arc::new(ConsoleVoice))
            .with_provider(Arc::new(TextFallback)),
        actuator: Arc::new(ConsoleActuator),
        notifier: Arc::new(ConsoleNotifier),
    };

    let events = EventBus::shared();
    let demo_timing = config.demo;
    let coordinator = Arc::new(InterventionCoordinator::with_events(
        config,
        collaborators,
        PatientProfile::demo_default().shared(),
        events.clone(),
    ));

    // Mirror bus traffic into the log, the way a dashboard would consume it.
    let mut event_rx = events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = event_rx.recv().await {
            info!(?event, "bus");
        }
    });

    if let Some(scenario) = cli.scenario {
        run_once(&coordinator, &scenario).await?;
    } else {
        run_continuous(coordinator.clone(), demo_timing, events).await;
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&coordinator.snapshot())?
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&coordinator.daily_summary())?
    );
    Ok(())
}

async fn run_once(coordinator: &InterventionCoordinator, scenario: &str) -> Result<()> {
    info!(scenario, "running single scenario");
    let situation = Situation::from_scenario(scenario);
    let decision = DemoReasoner
        .reason(&situation)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    let intervention = coordinator.process(decision, situation).await;
    println!("{}", serde_json::to_string_pretty(&intervention)?);
    Ok(())
}

async fn run_continuous(
    coordinator: Arc<InterventionCoordinator>,
    timing: care_coordination::DemoTiming,
    events: care_coordination::SharedEventBus,
) {
    let scheduler = DemoScheduler::new(timing, events);

    let target = coordinator.clone();
    let handler: FireHandler = Arc::new(move |scenario, index| {
        let coordinator = target.clone();
        tokio::spawn(async move {
            info!(scenario = %scenario, index, "timeline scenario triggered");
            let situation = Situation::from_scenario(&scenario);
            match DemoReasoner.reason(&situation).await {
                Ok(decision) => {
                    coordinator.process(decision, situation).await;
                }
                Err(e) => tracing::error!(error = %e, "demo reasoner failed"),
            }
        });
    });

    if !scheduler.start(TimelineEntry::demo_timeline(), handler) {
        tracing::error!("demo scheduler refused to start");
        return;
    }

    info!("continuous demo running; Ctrl-C to stop early");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received");
                scheduler.stop();
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(500)) => {
                let status = scheduler.status();
                if !status.running {
                    break;
                }
                info!(
                    elapsed_ms = status.elapsed_ms,
                    scenario = status.current_scenario.as_deref().unwrap_or("-"),
                    "demo progress"
                );
            }
        }
    }
}

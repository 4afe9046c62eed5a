use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use transmute::cli::{Cli, Command, SimulateArgs};
use transmute::config::TransmuteConfig;
use transmute::lifecycle::{Actor, TransmutationStatus};
use transmute::observer::SessionState;
use transmute::pricing::SimulationRequest;
use transmute::{Engine, ui};

// Base duration used by the demo so auto-completion happens within seconds.
const DEMO_BASE_DURATION_SECS: u64 = 2;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = TransmuteConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Simulate(args) => {
            let request = build_request(args)?;
            let engine = Engine::from_config(&config);
            let result = engine.simulate(&request)?;
            ui::print_simulation(&result);
        }
        Command::Materials => {
            let engine = Engine::from_config(&config);
            ui::print_materials(&engine.catalog().materials());
        }
        Command::Demo => run_demo(config).await?,
    }

    Ok(())
}

/// Reads the optional request file, then applies the flag overrides.
fn build_request(args: SimulateArgs) -> Result<SimulationRequest> {
    let mut request = match &args.file {
        Some(path) => read_request(path)?,
        None => SimulationRequest::default(),
    };
    if let Some(description) = args.description {
        request.description = description;
    }
    request.materials.extend(args.materials);
    if args.complexity.is_some() {
        request.complexity = args.complexity;
    }
    if args.risk.is_some() {
        request.risk_level = args.risk;
    }
    if args.catalyst.is_some() {
        request.catalyst_quality = args.catalyst;
    }
    Ok(request)
}

fn read_request(path: &Path) -> Result<SimulationRequest> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("invalid request in {}", path.display()))
}

async fn run_demo(mut config: TransmuteConfig) -> Result<()> {
    config.pricing.base_duration_secs = DEMO_BASE_DURATION_SECS;
    config.lifecycle.auto_complete = true;

    let Some(alchemist) = config.alchemists.first().cloned() else {
        bail!("demo needs at least one configured alchemist");
    };
    let engine = Engine::from_config(&config);

    let sessions = [engine.observe(), engine.observe()];
    for session in &sessions {
        if !session
            .wait_for_state(SessionState::Connected, Duration::from_secs(5))
            .await
        {
            bail!("observer session did not connect");
        }
    }

    let mut request = SimulationRequest::new("Transmute lead into gold with a steady catalyst")
        .with_catalyst(4.0);
    for material in engine.catalog().materials().iter().take(2) {
        request = request.with_material(material.id.0, 2.0);
    }

    let progress = ui::DemoProgress::start(&format!("{} starts a transmutation", alchemist.name));
    let started = engine.start(alchemist.id, &request).await?;
    progress.step(&started);

    progress.update("alchemist tries to approve their own work");
    match engine
        .transition(started.id, TransmutationStatus::InProgress, &Actor::alchemist(alchemist.id))
        .await
    {
        Ok(_) => bail!("alchemist approval should have been refused"),
        Err(err) => progress.fail(&err.to_string()),
    }

    progress.update("supervisor approves");
    let approved = engine
        .transition(started.id, TransmutationStatus::InProgress, &Actor::supervisor())
        .await?;
    progress.step(&approved);

    progress.update(format!(
        "waiting {}s for completion",
        approved.estimated_duration_seconds
    ));
    let deadline = Duration::from_secs(approved.estimated_duration_seconds + 5);
    for session in &sessions {
        let done = session
            .wait_until(deadline, |view| {
                view.get(started.id).map(|t| t.status) == Some(TransmutationStatus::Completed)
            })
            .await;
        if !done {
            bail!("session never observed completion of {}", started.id);
        }
    }
    progress.finish("every session observed the completion");

    for (n, session) in sessions.iter().enumerate() {
        ui::print_view(&format!("session {}", n + 1), &session.snapshot());
    }
    for session in sessions {
        session.shutdown().await;
    }
    Ok(())
}

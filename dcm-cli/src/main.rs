mod logging;
mod runner;
mod ui;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{self, Event as CEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend, widgets::ListState};
use tokio::sync::mpsc;

use dcm_core::config::DcmConfig;
use dcm_core::controller::{Flow, InteractiveController};
use dcm_core::orchestrator::{Completion, LifecycleOrchestrator};
use dcm_core::registry::ProjectRegistry;
use dcm_core::runner::ProcessRunner;

use runner::SystemRunner;
use ui::{Spinner, Theme};

#[derive(Parser)]
#[command(name = "dcm")]
#[command(about = "Start and stop docker compose projects from a list", long_about = None)]
struct Cli {
    /// Config file
    #[arg(short, long, env = "CONFIG", default_value = "config.yml")]
    config: PathBuf,

    /// Write debug logs to debug.log
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let _log_guard = logging::init(cli.debug, Path::new(logging::DEBUG_LOG))?;

    let config = DcmConfig::load(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    let descriptors = config.descriptors();
    tracing::info!(config = %cli.config.display(), projects = descriptors.len(), "loaded config");

    let runner: Arc<dyn ProcessRunner> = Arc::new(SystemRunner);
    eprintln!("Checking status of {} project(s)...", descriptors.len());
    let registry = ProjectRegistry::load(descriptors, runner.as_ref()).await;

    let (orchestrator, mut completions) = LifecycleOrchestrator::new(runner);
    let mut controller = InteractiveController::new(registry, orchestrator);
    let theme = Theme::default();

    let mut terminal = setup_terminal().context("failed to set up terminal")?;
    let res = tui_loop(&mut terminal, &mut controller, &mut completions, &theme);
    restore_terminal(terminal).context("failed to restore terminal")?;

    // Exiting now would close the pipes the external commands write to.
    for project in controller.pending() {
        if let Some(target) = project.pending_target() {
            eprintln!("Waiting for {} to finish ({}) ...", project.name(), target);
        }
    }
    for applied in controller.finish_pending(&mut completions).await {
        tracing::info!(?applied, "operation finished after quit");
    }

    res?;
    Ok(())
}

// --- Terminal setup/teardown ---
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Single-threaded event loop.
///
/// Completions are drained before every frame; start/stop commands run on
/// the runtime's worker threads, so polling the terminal here never waits on
/// an external process.
fn tui_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    controller: &mut InteractiveController,
    completions: &mut mpsc::UnboundedReceiver<Completion>,
    theme: &Theme,
) -> io::Result<()> {
    let spinner = Spinner::default();
    let mut list_state = ListState::default();

    loop {
        while let Ok(completion) = completions.try_recv() {
            controller.handle_completion(completion);
        }

        terminal.draw(|f| ui::render(f, controller, theme, &spinner, &mut list_state))?;

        if !event::poll(Duration::from_millis(80))? {
            continue;
        }

        let CEvent::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if let Some(input) = ui::map_key(key) {
            if controller.handle_input(input) == Flow::Quit {
                return Ok(());
            }
        }
    }
}

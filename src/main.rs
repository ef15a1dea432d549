//! Codeplay - scripted playback of code-editing tutorials.
//!
//! # Usage
//!
//! ```bash
//! codeplay lesson.json5
//! codeplay --watch --locale ru lesson.json5
//! codeplay --headless lesson.json5 > final.txt
//! codeplay --check lesson.json5
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use codeplay::app::{self, App};
use codeplay::config::{
    ConfigFlags, clear_config_flags, global_config_path, load_config_flags, local_override_path,
    save_config_flags,
};
use codeplay::perf;
use codeplay::player::PlayerConfig;
use codeplay::registry::ActionRegistry;
use codeplay::scenario::Scenario;
use codeplay::texts::Texts;

/// Scripted playback of code-editing tutorials
#[derive(Parser, Debug)]
#[command(name = "codeplay", version, about, long_about = None)]
struct Cli {
    /// Scenario file (JSON5)
    #[arg(value_name = "SCENARIO")]
    scenario: PathBuf,

    /// Play every step instantly
    #[arg(long)]
    fast_forward: bool,

    /// Only play steps written for this locale
    #[arg(long, value_name = "LOCALE")]
    locale: Option<String>,

    /// Reload the scenario when the file changes
    #[arg(short, long)]
    watch: bool,

    /// Play to the end without a terminal UI and print the final code
    #[arg(long)]
    headless: bool,

    /// List steps with unknown action types and exit
    #[arg(long)]
    check: bool,

    /// Print timings of startup and reloads
    #[arg(long)]
    perf: bool,

    /// Write the timestamped playback event log to a file
    #[arg(long, value_name = "PATH")]
    trace_log: Option<PathBuf>,

    /// JSON5 file with interface text overrides
    #[arg(long, value_name = "PATH")]
    texts: Option<PathBuf>,

    /// Save the current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

impl Cli {
    fn flags(&self) -> ConfigFlags {
        ConfigFlags {
            watch: self.watch,
            fast_forward: self.fast_forward,
            perf: self.perf,
            headless: self.headless,
            locale: self.locale.clone(),
            trace_log: self.trace_log.clone(),
            texts: self.texts.clone(),
        }
    }
}

fn player_config(flags: &ConfigFlags) -> Result<PlayerConfig> {
    let texts = match &flags.texts {
        Some(path) => Texts::load(path)
            .with_context(|| format!("Failed to load texts {}", path.display()))?,
        None => Texts::default(),
    };
    Ok(PlayerConfig {
        locale: flags.locale.clone(),
        fast_forward: flags.fast_forward,
        texts,
        ..PlayerConfig::default()
    })
}

fn check(path: &Path) -> Result<()> {
    let scenario = Scenario::load(path)
        .with_context(|| format!("Failed to load scenario {}", path.display()))?;
    let problems = scenario.validate(&ActionRegistry::with_builtins());
    if problems.is_empty() {
        println!("{}: {} steps ok", path.display(), scenario.steps.len());
        return Ok(());
    }
    for (index, kind) in &problems {
        println!("step {index}: unknown action \"{kind}\"");
    }
    anyhow::bail!("{} unknown action(s) in {}", problems.len(), path.display())
}

fn headless(path: &Path, config: PlayerConfig) -> Result<()> {
    let scenario = app::load_scenario(path, &config)?;
    let mut player = app::build_player(scenario, config);
    let _scope = perf::scope("headless.play");
    player.play().context("Playback failed")?;
    player.run_to_end().context("Playback failed")?;
    info!(elapsed = ?player.now(), "playback finished");
    print!("{}", player.editor().text());
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = cli.flags();

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    perf::set_enabled(effective.perf);
    if let Err(err) = perf::set_trace_log(effective.trace_log.as_deref()) {
        eprintln!("[warn] Failed to open trace log: {err}");
    }

    if !cli.scenario.exists() {
        anyhow::bail!("Scenario not found: {}", cli.scenario.display());
    }
    if cli.check {
        return check(&cli.scenario);
    }

    let config = player_config(&effective)?;
    if effective.headless {
        return headless(&cli.scenario, config);
    }

    let mut app = App::new(cli.scenario)
        .with_watch(effective.watch)
        .with_player_config(config)
        .with_autoplay(true);
    app.run().context("Application error")
}

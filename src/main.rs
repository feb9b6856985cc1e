use anyhow::{bail, Context, Result};
use autoshred::observer::{ChannelObserver, EraseEvent, ObserverSet};
use autoshred::ui::ConsoleObserver;
use autoshred::{
    ControlOutcome, EraseConfig, EraseObserver, ErasureTimer, SecureErase, TimerState,
    TracingObserver,
};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "autoshred")]
#[command(about = "Multi-pass secure file erasure with an auto-erase countdown")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "AUTOSHRED_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Securely erase a file immediately
    Erase {
        /// File to erase
        path: PathBuf,

        /// Print the erase report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Arm an auto-erase countdown and accept r/e/q commands until it fires
    Watch {
        /// File to erase when the countdown expires
        path: PathBuf,

        /// Countdown before erasure (e.g. 30s, 2m); overrides the configured delay
        #[arg(short, long, value_parser = humantime::parse_duration)]
        delay: Option<Duration>,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.debug, cli.log_format);

    if !cfg!(feature = "color-output") {
        colored::control::set_override(false);
    }

    let config = EraseConfig::load(cli.config.as_deref()).context("invalid configuration")?;

    match cli.command {
        Commands::Erase { path, json } => erase_file(path, config, json).await,
        Commands::Watch { path, delay } => {
            let config = config
                .with_delay_override(delay)
                .context("invalid --delay")?;
            watch_file(path, &config).await
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn init_tracing(debug: bool, format: LogFormat) {
    let filter = if debug {
        EnvFilter::new("autoshred=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn console_observers() -> ObserverSet {
    ObserverSet::new()
        .with(Arc::new(ConsoleObserver::new()))
        .with(Arc::new(TracingObserver))
}

async fn erase_file(path: PathBuf, config: EraseConfig, json: bool) -> Result<()> {
    let report = tokio::task::spawn_blocking(move || {
        let observers = console_observers();
        let result = SecureErase::from_config(&config).erase(&path, &observers);
        match &result {
            Ok(_) => observers.on_erase_finished(true, None),
            Err(e) => observers.on_erase_finished(false, Some(e.to_string())),
        }
        result
    })
    .await?
    .context("secure erase failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

async fn watch_file(path: PathBuf, config: &EraseConfig) -> Result<()> {
    let delay = config.delay;
    if !path.is_file() {
        bail!("{} is not an existing regular file", path.display());
    }

    let (tx, mut events) = unbounded_channel();
    let observer = console_observers().with(Arc::new(ChannelObserver::new(tx)));
    let timer = ErasureTimer::from_config(config, Arc::new(observer));

    let _ = timer.start(&path, delay);
    println!(
        "Auto-erase timer started: {} for {}\n",
        humantime::format_duration(delay).to_string().bold(),
        path.display()
    );
    println!(
        "{}",
        "Commands: r=reset timer | e=erase now | q=quit without erase".dimmed()
    );

    let mut commands = spawn_command_reader();
    let mut stdin_open = true;
    let mut failure: Option<String> = None;

    loop {
        tokio::select! {
            line = commands.recv(), if stdin_open => {
                let Some(line) = line else {
                    // Non-interactive: just wait for the countdown
                    stdin_open = false;
                    continue;
                };
                match line.trim().to_lowercase().as_str() {
                    "r" => match timer.reset() {
                        ControlOutcome::Applied => println!(
                            "Timer reset: {} remaining",
                            humantime::format_duration(timer.delay())
                        ),
                        ControlOutcome::Ignored(misuse) => println!("{}", misuse.to_string().yellow()),
                    },
                    "e" => {
                        if let Some(Err(e)) = erase_now(&timer, &path).await? {
                            return Err(e).context("secure erase failed");
                        }
                        break;
                    }
                    "q" => {
                        if timer.cancel().is_applied() {
                            println!("\n{}\n", "Exiting without erasure".yellow());
                        }
                        break;
                    }
                    "" => {}
                    _ => println!("{}", "Invalid command. Use: r (reset) | e (erase) | q (quit)".dimmed()),
                }
            }
            Some(event) = events.recv() => {
                if let EraseEvent::Finished { success, reason } = event {
                    if !success {
                        failure = reason;
                    }
                    if timer.state() == TimerState::Fired {
                        return finish(failure);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if timer.cancel().is_applied() {
                    println!("\n\n{}\n", "Monitoring interrupted".yellow());
                }
                break;
            }
        }
    }

    // A countdown that fired just before we stopped is still writing; let it finish
    if timer.state() == TimerState::Fired {
        println!("{}", "Waiting for the erasure in progress...".dimmed());
        while let Some(event) = events.recv().await {
            if let EraseEvent::Finished { success, reason } = event {
                if !success {
                    failure = reason;
                }
                break;
            }
        }
    }

    finish(failure)
}

async fn erase_now(
    timer: &ErasureTimer,
    path: &Path,
) -> Result<Option<autoshred::EraseResult<autoshred::EraseReport>>> {
    let timer = timer.clone();
    let path = path.to_path_buf();

    let outcome = tokio::task::spawn_blocking(move || {
        if path.exists() {
            timer.erase_now(&path)
        } else {
            let _ = timer.cancel();
            None
        }
    })
    .await?;

    Ok(outcome)
}

fn finish(failure: Option<String>) -> Result<()> {
    match failure {
        Some(reason) => bail!("secure erase failed: {}", reason),
        None => Ok(()),
    }
}

/// Read commands on a plain thread; a blocked stdin read must not hold up runtime shutdown
fn spawn_command_reader() -> UnboundedReceiver<String> {
    let (tx, rx) = unbounded_channel();

    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    rx
}

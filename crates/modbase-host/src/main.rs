use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use modbase::{ConfigLoadError, FrameworkConfig, HookDispatcher, Host, ModRegistry, UpdateChecker};

mod console;
mod demo;
mod logging;
mod reload;

use console::{ConsoleKeybindBackend, Flow, Session};
use demo::FileReleaseSource;

#[derive(Parser)]
#[command(version = env!("VERSION_STRING"), about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for per-mod settings files
    #[arg(short, long)]
    settings_dir: Option<PathBuf>,

    /// Directory to scan for mod manifests
    #[arg(short, long)]
    mods_dir: Option<PathBuf>,

    /// Also log to a file
    #[arg(long)]
    log_file: bool,

    /// Log file to write to instead of the default location
    #[arg(long, requires = "log_file")]
    log_path: Option<PathBuf>,

    /// Skip update checks
    #[arg(long)]
    no_update_check: bool,
}

fn load_config(cli: &Cli) -> anyhow::Result<FrameworkConfig> {
    let result = match &cli.config {
        Some(path) => FrameworkConfig::load_from(path),
        None => FrameworkConfig::load(),
    };
    match result {
        Ok(config) => Ok(config),
        Err(ConfigLoadError::NotFound) if cli.config.is_none() => Ok(FrameworkConfig::default()),
        Err(e) => Err(e.into()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let log_path = (cli.log_file || config.log_to_file).then(|| {
        cli.log_path
            .clone()
            .unwrap_or_else(logging::default_log_path)
    });
    let _log_guard = logging::init_logging(log_path.as_deref())?;

    info!("Starting modbase host {}", env!("VERSION_STRING"));

    let settings_dir = cli.settings_dir.clone().unwrap_or_else(|| config.settings_dir());
    let mods_dir = cli.mods_dir.clone().unwrap_or_else(|| config.mods_dir());
    info!(target: "settings", path = %settings_dir.display(), "Using settings directory");

    let dispatcher = HookDispatcher::new();
    let host = Host::new(dispatcher.clone(), ConsoleKeybindBackend);
    let mut registry = ModRegistry::new(host, Some(settings_dir));

    registry.build_and_register_base(demo::base_template())?;
    let mut templates = vec![demo::sprint_template()];
    templates.extend(demo::discover_manifests(&mods_dir));
    for template in templates {
        // Skip mods that fail to build
        if let Err(e) = registry.build_and_register(template) {
            error!(target: "registry", error = %e, "Failed to register mod");
        }
    }

    let mut session = Session::new(registry, dispatcher);
    if config.update_checks && !cli.no_update_check {
        let checker = UpdateChecker::new(env!("CARGO_PKG_VERSION"), config.update_check_interval());
        let source = FileReleaseSource::new(FrameworkConfig::data_dir().join("latest_release.toml"));
        session = session.with_updates(checker, source);
    }
    session.check_updates(Instant::now(), false);

    let mut reload_requests = reload::listen_for_reloads();
    let mut reload_active = true;
    let mut update_tick = tokio::time::interval(std::time::Duration::from_secs(60));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Type /help for commands");
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if session.handle_line(&line) == Flow::Quit {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!("Failed to read console input: {}", e);
                        break;
                    }
                }
            }
            request = reload_requests.next(), if reload_active => {
                match request {
                    Some(request) => {
                        info!(target: "registry", coalesced = request.coalesced, "Reload requested by signal");
                        session.reload();
                    }
                    None => reload_active = false,
                }
            }
            _ = update_tick.tick() => {
                session.check_updates(Instant::now(), false);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    session.shutdown();
    info!("Shut down");
    Ok(())
}

//! `midihub`: keeps the per-port MIDI daemons running and meshes their
//! participants until interrupted.

use std::env;
use std::process::ExitCode;

use midihub_daemon::{
    already_running, check_prerequisites, control_channel, install_signal_handlers, HubConfig,
    ModinfoModules, Orchestrator, SysinfoProcessTable,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "midihub=info,midihub_daemon=info".into());
    let json = env::var("MIDIHUB_LOG_JSON").is_ok_and(|v| v == "1" || v == "true");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn own_name() -> String {
    env::current_exe()
        .ok()
        .and_then(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "midihub".to_string())
}

fn main() -> ExitCode {
    init_tracing();

    let config = match HubConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!(
        daemon = %config.daemon_path.display(),
        ports_file = %config.ports_file.display(),
        interval_secs = config.interval.as_secs(),
        location = config.location.as_deref().unwrap_or(""),
        "Configuration loaded"
    );

    if already_running(&mut SysinfoProcessTable::new(), &own_name(), std::process::id()) {
        info!("This is the second copy - stopping");
        return ExitCode::SUCCESS;
    }

    let (tx, rx) = control_channel();
    if let Err(e) = install_signal_handlers(tx) {
        error!("Failed to install signal handlers: {}", e);
        return ExitCode::FAILURE;
    }

    if let Err(e) = check_prerequisites(&config, &mut ModinfoModules::new()) {
        error!("{} - stopping", e);
        return ExitCode::FAILURE;
    }

    let mut hub = match Orchestrator::builder(config).build() {
        Ok(hub) => hub,
        Err(e) => {
            error!("Failed to start: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("MIDI ports: {}", hub.ports());

    hub.run(&rx);
    ExitCode::SUCCESS
}

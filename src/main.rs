//! Wavescript — run a sample-looping script.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn, Level};

use wavescript::audio::{AudioBackend, AudioEngine, SilentBackend};
use wavescript::config::{default_config_path, load_config, Config};
use wavescript::runtime::{CancellationToken, Interpreter, Outcome};

#[derive(Parser)]
#[command(name = "wavescript")]
#[command(version, about = "Loop audio samples to a beat from a script")]
struct Cli {
    /// Script to run
    #[arg(default_value = "demos/example.wv")]
    script: PathBuf,

    /// Config file (defaults to ~/.wavescript/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory imported samples are looked up in
    #[arg(long)]
    vendor_dir: Option<PathBuf>,

    /// Stop after this many seconds
    #[arg(long)]
    duration: Option<f64>,

    /// Log plays instead of opening an audio device
    #[arg(long)]
    silent: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn load(cli: &Cli) -> Config {
    let path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = match load_config(&path) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), "ignoring config: {e}");
            Config::default()
        }
    };
    if let Some(dir) = &cli.vendor_dir {
        config.vendor_dir = dir.clone();
    }
    config
}

fn audio_backend(silent: bool) -> Arc<dyn AudioBackend> {
    if silent {
        return Arc::new(SilentBackend::new());
    }
    let engine = AudioEngine::new();
    match engine.initialize() {
        Ok(()) => Arc::new(engine),
        Err(e) => {
            warn!("audio unavailable, running silent: {e}");
            Arc::new(SilentBackend::new())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(log_level(cli.verbose))
        .with_writer(std::io::stderr)
        .init();

    let source = match std::fs::read_to_string(&cli.script) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("could not read {}: {e}", cli.script.display());
            return ExitCode::FAILURE;
        }
    };

    let config = load(&cli);
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        if let Err(e) = ctrlc::set_handler(move || cancel.cancel()) {
            warn!("could not install Ctrl-C handler: {e}");
        }
    }
    if let Some(secs) = cli.duration {
        match Duration::try_from_secs_f64(secs) {
            Ok(limit) => cancel.cancel_after(limit),
            Err(e) => warn!("ignoring --duration {secs}: {e}"),
        }
    }

    let audio = audio_backend(cli.silent);

    info!(script = %cli.script.display(), "running");
    let mut interpreter = Interpreter::new(&config, Arc::clone(&audio), cancel);
    let outcome = interpreter.run_script(&source);
    audio.shutdown();

    for diagnostic in interpreter.diagnostics().snapshot() {
        eprintln!("{diagnostic}");
    }
    if outcome == Outcome::Cancelled {
        info!("stopped");
    }
    ExitCode::SUCCESS
}

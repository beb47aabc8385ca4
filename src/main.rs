//! loglens - leveled, masked, rotating file logger
//!
//! Usage:
//!   loglens serve [--port N]        Log stdin lines, stream to WebSocket viewers
//!   loglens emit <level> <message>  Log one message
//!   loglens snapshot                Print logs.json records
//!   loglens init [--force]          Write a default loglens.toml

use clap::Parser;
use loglens::cli::{parse_input_line, Cli, Command};
use loglens::config::{self, Config};
use loglens::constants::{DEFAULT_CONFIG_FILE, STRUCTURED_EXT, STRUCTURED_SINK};
use loglens::error::{LogError, Result};
use loglens::logging::{self, engine::read_records, Level, LogEngine};
use loglens::server::LiveServer;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Some(Command::Init { force }) = cli.command {
        let path = cli
            .config
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        return config::init(&path, force);
    }

    let mut config = match &cli.config {
        Some(path) => config::read(path)?,
        None => config::load(Path::new(DEFAULT_CONFIG_FILE)),
    };
    if let Some(dir) = cli.log_dir {
        config.engine.log_dir = dir;
    }
    if let Some(level) = cli.level {
        config.engine.level = level;
    }

    match cli.command {
        None => run_serve(&config, None),
        Some(Command::Serve { port }) => run_serve(&config, port),
        Some(Command::Emit { level, message }) => run_emit(&config, &level, &message.join(" ")),
        Some(Command::Snapshot) => run_snapshot(&config.engine.log_dir),
        Some(Command::Init { .. }) => Ok(()),
    }
}

fn open_engine(config: &Config) -> Result<LogEngine> {
    LogEngine::open(config.engine.log_dir.clone(), config.engine_config()?)
}

fn run_emit(config: &Config, level: &str, message: &str) -> Result<()> {
    let level = level.parse::<Level>()?;
    let engine = open_engine(config)?;
    engine.log(level, message);
    engine.close();
    Ok(())
}

fn run_snapshot(log_dir: &Path) -> Result<()> {
    let path: PathBuf = log_dir.join(format!("{}.{}", STRUCTURED_SINK, STRUCTURED_EXT));
    for record in read_records(&path) {
        println!("{}", record.to_json());
    }
    Ok(())
}

fn run_serve(config: &Config, port: Option<u16>) -> Result<()> {
    let engine = Arc::new(open_engine(config)?);
    let port = port.unwrap_or(config.server.port);

    let panic_engine = Arc::clone(&engine);
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        panic_engine.exception(&info.to_string());
        panic_engine.flush();
        default_hook(info);
    }));

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| LogError::Runtime { source: e })?;

    let result = rt.block_on(serve(Arc::clone(&engine), port));
    // The stdin reader may still be parked in a blocking read.
    rt.shutdown_timeout(Duration::from_millis(500));
    engine.close();
    result
}

async fn serve(engine: Arc<LogEngine>, port: u16) -> Result<()> {
    let server = LiveServer::bind(port).await?;
    let shutdown = Arc::new(AtomicBool::new(false));
    let server_task = tokio::spawn(server.serve(Arc::clone(&engine), Arc::clone(&shutdown)));

    // Stdin is optional input; EOF stops reading but keeps the server up.
    let input_engine = Arc::clone(&engine);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some((level, message)) = parse_input_line(&line) {
                        input_engine.log_named(level, message);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Stdin read failed: {}", e);
                    break;
                }
            }
        }
    });

    shutdown_signal().await;
    shutdown.store(true, Ordering::SeqCst);

    let closing = Arc::clone(&engine);
    let _ = tokio::task::spawn_blocking(move || closing.close()).await;
    let _ = server_task.await;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {},
                    _ = sigint.recv() => {},
                }
            }
            _ => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use phabwatch::categories::classify;
use phabwatch::cli::{Cli, CliCommand};
use phabwatch::config::{Config, FileSettings};
use phabwatch::credentials;
use phabwatch::error::Result;
use phabwatch::scheduler::{CycleOutcome, RefreshHandle, Scheduler};
use phabwatch::sources::RevisionSource;
use phabwatch::sources::phabricator::PhabricatorSource;
use phabwatch::ui::{StderrDisplay, StderrNotifier, render_text};

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging();

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when a `--once` refresh failed.
async fn run(cli: Cli) -> Result<bool> {
    let config = Config::load(&cli)?;
    info!(?config, "config loaded");

    let creds = credentials::resolve(&config)?;
    let source = PhabricatorSource::new(&creds, &config);

    if let Some(CliCommand::Whoami) = cli.command {
        let user = source.whoami()?;
        println!("{} ({})", user.user_name, user.real_name);
        println!("{}", user.phid);
        return Ok(true);
    }

    let user_id = match config.user.clone() {
        Some(user) => user,
        None => {
            let user = source.whoami()?;
            info!(user = user.user_name, phid = user.phid, "resolved current user");
            user.phid
        }
    };

    if let Some(CliCommand::List { json }) = cli.command {
        let revisions = source.fetch_active_revisions()?;
        let classification = classify(&user_id, &revisions);
        if json {
            println!("{:#}", classification.to_json());
        } else {
            print!("{}", render_text(&classification));
        }
        return Ok(true);
    }

    let mut scheduler = Scheduler::new(
        user_id,
        source,
        StderrNotifier,
        StderrDisplay,
        FileSettings::new(&cli),
    );

    if cli.once {
        let outcome = scheduler.poll_once().await;
        return Ok(matches!(outcome, CycleOutcome::Refreshed { .. }));
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_signal_handlers(shutdown_tx, scheduler.refresh_handle())?;

    info!(url = creds.url, "phabwatch starting");
    scheduler.run(shutdown_rx).await;
    Ok(true)
}

/// Ctrl-C / SIGTERM stop the loop between cycles; SIGUSR1 asks for a refresh.
fn spawn_signal_handlers(shutdown: watch::Sender<bool>, refresh: RefreshHandle) -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigusr1 = signal(SignalKind::user_defined1())?;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    _ = sigterm.recv() => break,
                    _ = sigusr1.recv() => {
                        if !refresh.refresh_now() {
                            warn!("refresh already in progress");
                        }
                    }
                }
            }
            let _ = shutdown.send(true);
        });
    }

    #[cfg(not(unix))]
    {
        let _ = refresh;
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            let _ = shutdown.send(true);
        });
    }

    Ok(())
}

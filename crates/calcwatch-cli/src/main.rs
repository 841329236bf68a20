mod args;
mod output;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use futures_util::StreamExt;
use tracing::warn;

use calcwatch_core::{ClientConfig, HttpClusterClient, Session};
use calcwatch_store::FileKvStore;

use crate::args::{Args, Command, SettingsCommand};
use crate::output::{event_line, print_jobs, print_report, print_servers, print_settings};

async fn open_session(args: &Args) -> Result<Session> {
    let mut config = ClientConfig::new(&args.orchestrator_url);
    config.request_timeout =
        (args.request_timeout_secs > 0).then(|| Duration::from_secs(args.request_timeout_secs));
    let api = HttpClusterClient::new(config).context("failed to build HTTP client")?;

    let store = FileKvStore::open(args.state_file.clone())
        .await
        .with_context(|| format!("failed to open state file {}", args.state_file.display()))?;

    Session::open(Arc::new(api), Arc::new(store)).await
}

async fn watch(
    session: &Session,
    interval: Duration,
    health_interval: Option<Duration>,
) -> Result<()> {
    let mut events = session.subscribe();

    if let Err(e) = session.load_all().await {
        warn!(error=%e, "could not load job listing, continuing with local state");
    }
    session.fetch_health().await;
    session.apply_settings().await?;
    session.start_polling(interval).await;
    if let Some(interval) = health_interval {
        session.start_health_polling(interval).await;
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(event) => println!("{}", event_line(&event)),
                None => break,
            },
            _ = &mut ctrl_c => break,
        }
    }

    session.stop_polling().await;
    session.stop_health_polling().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _telemetry = calcwatch_common::telemetry::init_tracing(
        "calcwatch",
        args.otlp_endpoint.as_deref(),
        args.otlp_token.as_deref(),
    );
    let session = open_session(&args).await?;

    match args.command {
        Command::Submit { expression } => match session.submit(&expression).await {
            Ok(id) => println!("submitted job {id}: {expression}"),
            Err(e) => anyhow::bail!("{expression}: {}", e.display_message()),
        },
        Command::Jobs => print_jobs(&session.jobs().await),
        Command::Sync => {
            let jobs = session.load_all().await?;
            print_jobs(&jobs);
        }
        Command::Poll => {
            let report = session.poll_once().await;
            print_report(&report);
            print_jobs(&session.jobs().await);
        }
        Command::Health => print_servers(&session.fetch_health().await),
        Command::Clear => {
            session.clear_all().await?;
            println!("all jobs cleared");
        }
        Command::Watch {
            interval_secs,
            health_interval_secs,
        } => {
            watch(
                &session,
                Duration::from_secs(interval_secs),
                health_interval_secs.map(Duration::from_secs),
            )
            .await?;
        }
        Command::Settings { subcommand } => match subcommand {
            SettingsCommand::Show => print_settings(&session.get_settings().await?),
            SettingsCommand::Set {
                add,
                subtract,
                multiply,
                divide,
                inactive_server_time,
            } => {
                let mut settings = session.get_settings().await?;
                let d = &mut settings.durations;
                d.add = add.or(d.add);
                d.subtract = subtract.or(d.subtract);
                d.multiply = multiply.or(d.multiply);
                d.divide = divide.or(d.divide);
                if let Some(secs) = inactive_server_time {
                    settings.inactivity_timeout_secs = secs;
                }
                session.save_settings(&settings).await?;
                print_settings(&settings);
            }
        },
    }

    Ok(())
}

use anyhow::Context;
use clap::Parser;
use desk_core::bus::{Address, ErrorSink, EventBus, SubscriptionHandle, TracingErrorSink};
use desk_core::domain::allocation::EntryId;
use desk_core::portfolio::PortfolioStore;
use desk_core::session::PortfolioSession;
use script::{Command, Target};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod script;
mod view;

#[derive(Debug, Parser)]
#[command(name = "desk_cli")]
struct Args {
    /// Command script, one command per line. Reads stdin when omitted.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Seed the portfolio before the script runs. Repeatable.
    #[arg(long = "entry", value_name = "NAME=WEIGHT")]
    entries: Vec<String>,

    /// Print presentation events as JSON lines.
    #[arg(long)]
    json: bool,
}

/// Logs handler failures and forwards them to Sentry.
struct SentryErrorSink;

impl ErrorSink for SentryErrorSink {
    fn report(&self, address: Address, subscription: SubscriptionHandle, error: &anyhow::Error) {
        TracingErrorSink.report(address, subscription, error);
        sentry_anyhow::capture_anyhow(error);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = desk_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let seed = args
        .entries
        .iter()
        .map(|raw| script::parse_seed(raw))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let commands = script::parse_script(&read_script(args.script.as_ref())?);

    let bus = EventBus::with_error_sink(Arc::new(SentryErrorSink));
    let session = PortfolioSession::from_settings(bus.clone(), &settings);
    let format = if args.json {
        view::Format::Json
    } else {
        view::Format::Text
    };
    let mut console = view::ConsoleView::attach(&bus, format);

    if !seed.is_empty() {
        session
            .store()
            .add_entries(seed.iter().map(|(name, weight)| (name.as_str(), *weight)))
            .context("seeding --entry values failed")?;
    }

    let mut failed = 0usize;
    for (line, parsed) in &commands {
        let command = match parsed {
            Ok(command) => command,
            Err(err) => {
                failed += 1;
                sentry_anyhow::capture_anyhow(err);
                tracing::warn!(line, error = %format!("{err:#}"), "command skipped");
                continue;
            }
        };
        if let Err(err) = execute(&session, command).await {
            failed += 1;
            sentry_anyhow::capture_anyhow(&err);
            tracing::warn!(line, ?command, error = %err, "command failed");
        }
    }

    console.detach();
    tracing::info!(commands = commands.len(), failed, "script finished");
    Ok(())
}

async fn execute(session: &PortfolioSession, command: &Command) -> anyhow::Result<()> {
    let store = session.store();
    match command {
        Command::Add { name, weight } => {
            if store.add_ticker(name, *weight)?.is_none() {
                tracing::debug!(?name, "blank ticker ignored");
            }
        }
        Command::Set { target, weight } => {
            let id = resolve(store, target)?;
            store.set_weight_input(id, weight)?;
        }
        Command::Remove { target } => {
            let id = resolve(store, target)?;
            store.remove_entry(id);
        }
        Command::Pick => {
            store.request_selection();
        }
        Command::Select { ticker } => {
            session.catalog().select(ticker)?;
        }
        Command::Save => {
            session.save().await?;
        }
        Command::Dismiss => {
            if !session.saver().dismiss() {
                tracing::debug!(state = ?session.saver().state(), "nothing to dismiss");
            }
        }
        Command::Show => {
            println!("{}", view::render_entries(&store.entries(), store.total()));
        }
        Command::Chart(kind) => {
            let chart = desk_core::chart::render(*kind, &store.snapshot())?;
            println!("{chart}");
        }
    }
    Ok(())
}

fn resolve(store: &PortfolioStore, target: &Target) -> anyhow::Result<EntryId> {
    store
        .find_nth(&target.ticker, target.occurrence)
        .with_context(|| format!("no entry {target}"))
}

fn read_script(path: Option<&PathBuf>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read script from stdin")?;
            Ok(buf)
        }
    }
}

fn init_sentry(settings: &desk_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

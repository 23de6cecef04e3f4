use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use pulse_bridge::{AppBridgeClient, BridgeClient, NoopBridge, TcpConnector};
use pulse_sender::{
    config::{BridgeConfig, Config},
    generator::{DEFAULT_HYPER_GLUCOSE, DEFAULT_HYPO_GLUCOSE, coerce_glucose},
    ledger::summarize,
    session::{SendIntent, Session},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "pulse-sender")]
#[command(about = "Publishes synthetic CGM events to a companion app")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "pulse-sender.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate and send events of one kind
    Send {
        #[command(subcommand)]
        kind: SendKind,
    },
    /// Send random events on an interval until the count is reached or Ctrl+C
    Burst {
        #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
        interval_ms: u64,
        #[arg(long)]
        count: Option<u64>,
    },
}

#[derive(Subcommand)]
enum SendKind {
    Hypo {
        /// Glucose in mg/dL; non-numeric input falls back to 55
        #[arg(long)]
        glucose: Option<String>,
    },
    Hyper {
        /// Glucose in mg/dL; non-numeric input falls back to 300
        #[arg(long)]
        glucose: Option<String>,
    },
    Device {
        #[arg(long)]
        device_id: Option<String>,
    },
    Alert {
        #[arg(long)]
        alert_type: Option<String>,
    },
    Random {
        #[arg(long, default_value_t = 1)]
        count: u64,
    },
}

impl SendKind {
    fn intents(self) -> Vec<SendIntent> {
        match self {
            SendKind::Hypo { glucose } => vec![SendIntent::Hypo {
                glucose: glucose.map(|raw| coerce_glucose(&raw, DEFAULT_HYPO_GLUCOSE)),
            }],
            SendKind::Hyper { glucose } => vec![SendIntent::Hyper {
                glucose: glucose.map(|raw| coerce_glucose(&raw, DEFAULT_HYPER_GLUCOSE)),
            }],
            SendKind::Device { device_id } => vec![SendIntent::Device { device_id }],
            SendKind::Alert { alert_type } => vec![SendIntent::Alert { alert_type }],
            SendKind::Random { count } => (0..count).map(|_| SendIntent::Random).collect(),
        }
    }
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        info!(path = ?cli.config, "Loading configuration");
        Config::load(&cli.config)?
    } else {
        info!("No configuration file found, using defaults");
        Config::default()
    };

    match config.bridge {
        BridgeConfig::Noop => {
            info!("Using noop bridge, events are only logged");
            run(Session::new(NoopBridge::new()), cli.command).await?;
        }
        BridgeConfig::AppBridge(settings) => {
            info!(addr = %settings.addr, remote_app_id = %settings.remote_app_id, "Using app bridge");
            let connector = TcpConnector::new(settings.addr.clone())
                .with_timeout(settings.timeout())
                .with_max_frame_bytes(settings.max_frame_bytes);
            let bridge = AppBridgeClient::new(connector, settings.app_config());
            run(Session::new(bridge), cli.command).await?;
        }
    }

    Ok(())
}

async fn run<B>(mut session: Session<B>, command: Command) -> color_eyre::Result<()>
where
    B: BridgeClient,
{
    session.connect().await?;

    match command {
        Command::Send { kind } => {
            for intent in kind.intents() {
                send_one(&mut session, &intent).await;
            }
        }
        Command::Burst { interval_ms, count } => {
            burst(&mut session, Duration::from_millis(interval_ms), count).await;
        }
    }

    print_sent_events(&session);
    session.disconnect().await;

    Ok(())
}

async fn send_one<B: BridgeClient>(session: &mut Session<B>, intent: &SendIntent) {
    match session.send(intent).await {
        Ok(event) => info!(event_id = %event.event_id, "Sent"),
        Err(e) => error!(error = %e, ?intent, "Could not send event"),
    }
}

async fn burst<B: BridgeClient>(session: &mut Session<B>, interval: Duration, count: Option<u64>) {
    let cancel = CancellationToken::new();
    let interval = interval.max(Duration::from_millis(1));

    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, stopping burst...");
            cancel_on_signal.cancel();
        }
    });

    let mut ticker = tokio::time::interval(interval);
    let mut attempted = 0u64;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if count.is_some_and(|limit| attempted >= limit) {
                    break;
                }
                send_one(session, &SendIntent::Random).await;
                attempted += 1;
            }
        }
    }

    info!(attempted, sent = session.sent_events().len(), "Burst finished");
}

fn print_sent_events<B: BridgeClient>(session: &Session<B>) {
    let events = session.sent_events();
    println!("Sent Events ({})", events.len());

    if events.is_empty() {
        println!("No events sent yet");
        return;
    }

    for event in events {
        println!("{}", summarize(event));
    }
}

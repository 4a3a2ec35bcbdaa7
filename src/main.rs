//! CLI for PopNotify
//!
//! Subcommands:
//! - `publish`: publish a message to a topic
//! - `poll`: print the messages currently buffered for a topic
//! - `subscribe`: stream a topic until the connection fails or Ctrl-C
//! - `run`: watch the configured subscriptions as a long-running service

use std::time::Duration;

use clap::Parser;
use popnotify::codec::Notification;
use popnotify::config::{Settings, load_config};
use popnotify::service::{ServiceCommand, ServiceController};
use popnotify::subscriber::{
    NotificationSink, Poller, SubscriptionDescriptor, SubscriptionId, WatchEvent, Watcher,
};
use popnotify::transport::{ApiClient, SinceCursor};
use popnotify::utils::error::Error;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

const DEFAULT_BASE_URL: &str = "https://ntfy.sh";

#[derive(Parser)]
#[command(name = "popnotify")]
enum Command {
    /// Publish a message to a topic
    Publish {
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        base_url: String,
        topic: String,
        message: String,
    },
    /// Print the messages currently buffered for a topic, one JSON object per line
    Poll {
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        base_url: String,
        #[arg(long, default_value_t = 0)]
        subscription_id: SubscriptionId,
        topic: String,
    },
    /// Stream a topic until the connection fails (no reconnect)
    Subscribe {
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        base_url: String,
        /// `all` or a timestamp to resume from
        #[arg(long, default_value = "all")]
        since: SinceCursor,
        #[arg(long, default_value_t = 0)]
        subscription_id: SubscriptionId,
        topic: String,
    },
    /// Watch the subscriptions listed in the configuration
    Run,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            popnotify::utils::logging::init("info");
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    popnotify::utils::logging::init(&config.logging.level);

    let result = match Command::parse() {
        Command::Publish {
            base_url,
            topic,
            message,
        } => run_publish(&config, &base_url, &topic, &message).await,
        Command::Poll {
            base_url,
            subscription_id,
            topic,
        } => run_poll(&config, subscription_id, &base_url, &topic).await,
        Command::Subscribe {
            base_url,
            since,
            subscription_id,
            topic,
        } => run_subscribe(&config, subscription_id, &base_url, &topic, since).await,
        Command::Run => run_service(config).await,
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run_publish(
    config: &Settings,
    base_url: &str,
    topic: &str,
    message: &str,
) -> Result<(), Error> {
    let client = ApiClient::new(&config.client)?;
    client.publish(base_url, topic, message).await?;
    Ok(())
}

async fn run_poll(
    config: &Settings,
    subscription_id: SubscriptionId,
    base_url: &str,
    topic: &str,
) -> Result<(), Error> {
    let client = ApiClient::new(&config.client)?;
    for notification in client.poll(subscription_id, base_url, topic).await? {
        print_notification(&notification);
    }
    Ok(())
}

async fn run_subscribe(
    config: &Settings,
    subscription_id: SubscriptionId,
    base_url: &str,
    topic: &str,
    since: SinceCursor,
) -> Result<(), Error> {
    let client = ApiClient::new(&config.client)?;
    let (handle, mut events) = client.subscribe_channel(subscription_id, base_url, topic, since);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(WatchEvent::Connected(_)) => info!("Connected to {}/{}", base_url, topic),
                Some(WatchEvent::Notification(notification)) => print_notification(&notification),
                Some(WatchEvent::Failure { error, .. }) => return Err(error),
                None => return Ok(()),
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received. Exiting gracefully.");
                handle.cancel();
                handle.join().await;
                return Ok(());
            }
        }
    }
}

/// Prints notifications to stdout and failures to the log.
struct StdoutSink;

impl NotificationSink for StdoutSink {
    fn on_notification(&self, notification: Notification) {
        print_notification(&notification);
    }

    fn on_failure(&self, subscription_id: SubscriptionId, error: Error) {
        warn!(subscription_id, "Subscription unhealthy: {}", error);
    }
}

async fn run_service(config: Settings) -> Result<(), Error> {
    let client = ApiClient::new(&config.client)?;
    let descriptors: Vec<SubscriptionDescriptor> = config
        .subscriptions
        .iter()
        .map(SubscriptionDescriptor::from)
        .collect();
    let instant: Vec<SubscriptionDescriptor> =
        descriptors.iter().filter(|d| d.instant).cloned().collect();
    let polled: Vec<SubscriptionDescriptor> =
        descriptors.iter().filter(|d| !d.instant).cloned().collect();

    let watcher = Watcher::new(client.clone(), config.reconnect.clone(), StdoutSink);
    let (commands_tx, mut commands) = mpsc::unbounded_channel();
    let controller = ServiceController::new(commands_tx);
    controller.refresh(descriptors.iter().map(SubscriptionDescriptor::instant_status))?;

    let poll_interval = Duration::from_secs(config.poll.interval_secs);
    let poller = (!polled.is_empty())
        .then(|| Poller::new(client, polled, poll_interval).spawn(StdoutSink));

    loop {
        tokio::select! {
            Some(command) = commands.recv() => match command {
                ServiceCommand::Start => watcher.refresh(&instant),
                ServiceCommand::Stop => watcher.shutdown().await,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received. Exiting gracefully.");
                break;
            }
        }
    }

    if let Some(poller) = poller {
        poller.abort();
    }
    controller.refresh(std::iter::empty())?;
    watcher.shutdown().await;
    Ok(())
}

fn print_notification(notification: &Notification) {
    match serde_json::to_string(notification) {
        Ok(json) => println!("{json}"),
        Err(e) => error!("Failed to serialize notification {}: {}", notification.id, e),
    }
}

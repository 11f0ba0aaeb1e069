//! squery CLI - command-line client for the server query protocol
//!
//! Run commands against a virtual server, follow its notifications and
//! export snapshots from the command line.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use squery_client::{EventSender, EventSlot, ServerQuery, Subscription, TextMessageTarget};
use squery_core::events::{
    names, ChannelCreatedEvent, ChannelDeletedEvent, ChannelDescriptionChangedEvent,
    ChannelEditedEvent, ChannelMovedEvent, ChannelPasswordChangedEvent, ClientEnterViewEvent,
    ClientLeftViewEvent, ClientMovedEvent, ServerEditedEvent, TextMessageEvent, TokenUsedEvent,
};
use squery_core::{split_response, Event, EventCategory, Request};
use squery_snapshot::RawSnapshot;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod output;

use config::Config;

/// squery - server query client
#[derive(Parser)]
#[command(name = "squery")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Server address (host:port)
    #[arg(short, long, global = true, env = "SQUERY_ADDRESS")]
    address: Option<String>,

    /// Login name
    #[arg(short, long, global = true, env = "SQUERY_USERNAME")]
    username: Option<String>,

    /// Login password
    #[arg(short, long, global = true, env = "SQUERY_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Virtual server id to select
    #[arg(short, long, global = true, env = "SQUERY_SERVER")]
    server: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one command and print the reply
    Exec {
        /// Print the reply as JSON
        #[arg(long)]
        json: bool,

        /// Command name
        command: String,

        /// Arguments: key=value or -flag
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Print notifications until interrupted
    Listen {
        /// Categories to register for
        #[arg(value_enum, required = true)]
        categories: Vec<Category>,

        /// Channel for channel events (0 = all channels)
        #[arg(long, default_value = "0")]
        channel: u32,
    },

    /// Export a snapshot of the selected virtual server
    Snapshot {
        /// Snapshot encryption password
        #[arg(long, default_value = "")]
        snapshot_password: String,

        /// Write the raw snapshot as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show client and server version
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Category {
    Server,
    Channel,
    TextServer,
    TextChannel,
    TextPrivate,
    TokenUsed,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.log_level, cli.json_logs)?;

    let config = Config::load(cli.config.as_deref())?;
    let query = connect(&cli, &config).await?;

    let result = match cli.command {
        Commands::Exec {
            json,
            command,
            args,
        } => {
            let server_id = cli.server.or(config.server).unwrap_or(0);
            run_exec(&query, &command, &args, server_id, json).await
        }

        Commands::Listen {
            categories,
            channel,
        } => {
            let server_id = cli.server.or(config.server).unwrap_or(0);
            run_listen(&query, &categories, channel, server_id).await
        }

        Commands::Snapshot {
            snapshot_password,
            output,
        } => {
            let Some(server_id) = cli.server.or(config.server) else {
                bail!("A virtual server is required for snapshots (--server)");
            };
            run_snapshot(&query, server_id, &snapshot_password, output).await
        }

        Commands::Version => run_version(&query).await,
    };

    if let Err(e) = query.close().await {
        warn!("Close failed: {}", e);
    }
    result
}

fn setup_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Failed to parse log level")?;

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

async fn connect(cli: &Cli, config: &Config) -> Result<ServerQuery> {
    let address = cli
        .address
        .clone()
        .or_else(|| config.address.clone())
        .unwrap_or_else(|| config::DEFAULT_ADDRESS.to_string());

    let mut builder = ServerQuery::builder(&address);

    let username = cli.username.as_ref().or(config.username.as_ref());
    let password = cli.password.as_ref().or(config.password.as_ref());
    match (username, password) {
        (Some(user), Some(password)) => builder = builder.credentials(user, password),
        (Some(_), None) => bail!("A password is required with --username"),
        _ => {}
    }

    if let Some(sid) = cli.server.or(config.server) {
        builder = builder.server(sid);
    }
    if let Some(keepalive) = config.keepalive() {
        builder = builder.keepalive(keepalive);
    }
    if let Some(timeout) = config.command_timeout() {
        builder = builder.command_timeout(timeout);
    }

    let query = builder
        .connect()
        .await
        .with_context(|| format!("Failed to connect to {}", address))?;
    info!("Connected to {}", address);
    Ok(query)
}

async fn run_exec(
    query: &ServerQuery,
    command: &str,
    args: &[String],
    server_id: u32,
    json: bool,
) -> Result<()> {
    let request = output::parse_request(command, args, server_id)?;
    let reply = query.execute_raw(&request).await?;

    match reply {
        Some(line) => output::print_objects(&split_response(&line), json)?,
        None if json => println!("[]"),
        None => println!("{}", "ok".green()),
    }
    Ok(())
}

/// One registration covering every notification of `category`
fn subscription(category: Category, channel: u32, tx: &EventSender) -> Subscription {
    match category {
        Category::Server => Subscription::new(EventCategory::Server)
            .event(names::SERVER_EDITED, EventSlot::new::<ServerEditedEvent>(tx.clone()))
            .event(names::CLIENT_ENTER_VIEW, EventSlot::new::<ClientEnterViewEvent>(tx.clone()))
            .event(names::CLIENT_LEFT_VIEW, EventSlot::new::<ClientLeftViewEvent>(tx.clone())),
        Category::Channel => {
            let mut sub = Subscription::new(EventCategory::Channel).channel(channel);
            // Creation is only reported to subscriptions on all channels
            if channel == 0 {
                sub = sub.event(
                    names::CHANNEL_CREATED,
                    EventSlot::new::<ChannelCreatedEvent>(tx.clone()),
                );
            }
            sub.event(names::CHANNEL_DELETED, EventSlot::new::<ChannelDeletedEvent>(tx.clone()))
                .event(names::CHANNEL_MOVED, EventSlot::new::<ChannelMovedEvent>(tx.clone()))
                .event(names::CHANNEL_EDITED, EventSlot::new::<ChannelEditedEvent>(tx.clone()))
                .event(
                    names::CHANNEL_DESCRIPTION_CHANGED,
                    EventSlot::new::<ChannelDescriptionChangedEvent>(tx.clone()),
                )
                .event(
                    names::CHANNEL_PASSWORD_CHANGED,
                    EventSlot::new::<ChannelPasswordChangedEvent>(tx.clone()),
                )
                .event(names::CLIENT_MOVED, EventSlot::new::<ClientMovedEvent>(tx.clone()))
        }
        Category::TextServer => text_subscription(TextMessageTarget::Server, tx),
        Category::TextChannel => text_subscription(TextMessageTarget::Channel, tx),
        Category::TextPrivate => text_subscription(TextMessageTarget::Private, tx),
        Category::TokenUsed => Subscription::new(EventCategory::TokenUsed)
            .event(names::TOKEN_USED, EventSlot::new::<TokenUsedEvent>(tx.clone())),
    }
}

fn text_subscription(target: TextMessageTarget, tx: &EventSender) -> Subscription {
    Subscription::new(target.category())
        .event(names::TEXT_MESSAGE, EventSlot::new::<TextMessageEvent>(tx.clone()))
}

async fn run_listen(
    query: &ServerQuery,
    categories: &[Category],
    channel: u32,
    server_id: u32,
) -> Result<()> {
    let subscriber = query.subscriber(server_id);
    let (tx, mut rx) = mpsc::channel(64);

    for category in categories {
        subscriber.subscribe(subscription(*category, channel, &tx)).await?;
    }
    drop(tx);

    println!(
        "{} Listening on {} event(s), press Ctrl+C to stop",
        "squery".cyan().bold(),
        subscriber.store().count()
    );

    loop {
        tokio::select! {
            delivery = rx.recv() => match delivery {
                Some(Ok(event)) => print_event(&event),
                Some(Err(e)) => warn!("Undecodable notification: {}", e),
                None => {
                    println!("{}", "Connection closed".yellow());
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                if let Err(e) = subscriber.unsubscribe_all().await {
                    warn!("Unregister failed: {}", e);
                }
                break;
            }
        }
    }

    Ok(())
}

fn print_event(event: &Event) {
    println!("{} {}", event.name().cyan(), output::describe(event));
}

async fn run_snapshot(
    query: &ServerQuery,
    server_id: u32,
    password: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let raw: RawSnapshot = query
        .query(&squery_snapshot::create_request(server_id, password))
        .await?;

    if let Some(path) = output {
        let document = serde_json::json!({
            "version": raw.version,
            "salt": raw.salt,
            "data": raw.data,
        });
        std::fs::write(&path, serde_json::to_string_pretty(&document)?)
            .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;
        println!("{} Snapshot written to {}", "OK".green().bold(), path.display());
    }

    if !password.is_empty() {
        return Ok(());
    }

    let snapshot = raw.decode().context("Failed to decode snapshot")?;
    println!("Server:          {}", snapshot.virtual_server.name);
    println!("Channels:        {}", snapshot.channels.len());
    println!("Clients:         {}", snapshot.clients.len());
    println!("Server groups:   {}", snapshot.server_groups.len());
    println!("Channel groups:  {}", snapshot.channel_groups.len());
    println!("API keys:        {}", snapshot.api_keys.len());
    Ok(())
}

async fn run_version(query: &ServerQuery) -> Result<()> {
    println!("squery {}", env!("CARGO_PKG_VERSION"));
    println!("Banner: {}", query.banner());

    let reply = query.execute_raw(&Request::new("version")).await?;
    if let Some(line) = reply {
        output::print_objects(&split_response(&line), false)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_exec_keeps_flag_arguments() {
        let cli = Cli::try_parse_from(["squery", "-s", "1", "exec", "clientlist", "-uid", "-away"])
            .unwrap();
        assert_eq!(cli.server, Some(1));
        match cli.command {
            Commands::Exec { command, args, json } => {
                assert_eq!(command, "clientlist");
                assert_eq!(args, vec!["-uid", "-away"]);
                assert!(!json);
            }
            _ => panic!("expected exec"),
        }
    }

    #[test]
    fn test_listen_categories() {
        let cli = Cli::try_parse_from(["squery", "listen", "server", "text-private"]).unwrap();
        match cli.command {
            Commands::Listen { categories, channel } => {
                assert_eq!(categories, vec![Category::Server, Category::TextPrivate]);
                assert_eq!(channel, 0);
            }
            _ => panic!("expected listen"),
        }
        assert!(Cli::try_parse_from(["squery", "listen"]).is_err());
    }

    fn names_of(sub: &Subscription) -> Vec<&str> {
        sub.events.iter().map(|(name, _)| name.as_str()).collect()
    }

    #[test]
    fn test_one_subscription_per_category() {
        let (tx, _rx) = mpsc::channel(1);

        let server = subscription(Category::Server, 7, &tx);
        assert_eq!(server.category, EventCategory::Server);
        assert_eq!(
            names_of(&server),
            vec![names::SERVER_EDITED, names::CLIENT_ENTER_VIEW, names::CLIENT_LEFT_VIEW]
        );

        let all = subscription(Category::Channel, 0, &tx);
        assert_eq!(all.channel_id, 0);
        assert_eq!(all.events.len(), 7);
        assert!(names_of(&all).contains(&names::CHANNEL_CREATED));

        let one = subscription(Category::Channel, 7, &tx);
        assert_eq!(one.channel_id, 7);
        assert_eq!(one.events.len(), 6);
        assert!(!names_of(&one).contains(&names::CHANNEL_CREATED));

        let private = subscription(Category::TextPrivate, 0, &tx);
        assert_eq!(private.category, TextMessageTarget::Private.category());
        assert_eq!(names_of(&private), vec![names::TEXT_MESSAGE]);
    }
}

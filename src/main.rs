use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use castfeed::api::client::CastApiClient;
use castfeed::api::traits::FeedBackend;
use castfeed::config::Config;
use castfeed::engagement::EngagementController;
use castfeed::feed::aggregator::{event_channel, FeedAggregator};
use castfeed::feed::models::{FeedItem, Level};
use castfeed::output::terminal;
use castfeed::realtime::socket::SocketChannel;
use castfeed::realtime::{DetachedChannel, RoomChannel};
use castfeed::session::Session;

/// castfeed: the Cast civic feed from the terminal.
///
/// Reads a level's feed, follows it live, and likes, reposts, quotes or
/// comments on posts as the configured user.
#[derive(Parser)]
#[command(name = "castfeed", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct LevelArgs {
    /// Level type (e.g. county, constituency, ward). Defaults to CAST_LEVEL_TYPE.
    #[arg(long)]
    level_type: Option<String>,

    /// Level value (e.g. Nairobi). Defaults to CAST_LEVEL_VALUE.
    #[arg(long)]
    level_value: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the configured identity
    Whoami,

    /// Load and print a level's feed
    Feed {
        #[command(flatten)]
        level: LevelArgs,

        /// Print the feed as JSON
        #[arg(long)]
        json: bool,
    },

    /// Follow a level's feed live until Ctrl-C
    Watch {
        #[command(flatten)]
        level: LevelArgs,
    },

    /// Toggle your like on a post
    Like {
        post_id: String,
        #[command(flatten)]
        level: LevelArgs,
    },

    /// Repost a post without commentary
    Recast {
        post_id: String,
        #[command(flatten)]
        level: LevelArgs,
    },

    /// Quote-repost a post
    Recite {
        post_id: String,

        /// Quote text (may be empty)
        #[arg(long, default_value = "")]
        quote: String,

        #[command(flatten)]
        level: LevelArgs,
    },

    /// Count a view on a post
    View {
        post_id: String,
        #[command(flatten)]
        level: LevelArgs,
    },

    /// Delete one of your posts
    Delete {
        post_id: String,
        #[command(flatten)]
        level: LevelArgs,
    },

    /// List a post's comments
    Comments {
        post_id: String,
        #[command(flatten)]
        level: LevelArgs,
    },

    /// Comment on a post
    Comment {
        post_id: String,

        /// Comment text
        text: String,

        /// Optional image URL to attach
        #[arg(long)]
        image: Option<String>,

        #[command(flatten)]
        level: LevelArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("castfeed=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let backend: Arc<dyn FeedBackend> =
        Arc::new(CastApiClient::new(&config.api_url, config.request_timeout)?);

    match cli.command {
        Commands::Whoami => {
            let session = resolve_session(&config, backend.as_ref()).await;
            terminal::display_session(&session);
        }

        Commands::Feed { level, json } => {
            let level = config.level_with(level.level_type, level.level_value);
            let session = resolve_session(&config, backend.as_ref()).await;
            let feed = load_feed(&backend, &level).await;

            if json {
                println!("{}", serde_json::to_string_pretty(feed.items())?);
            } else {
                terminal::display_feed(&level, feed.items(), feed.status(), &session);
            }
        }

        Commands::Watch { level } => {
            let level = config.level_with(level.level_type, level.level_value);
            let session = resolve_session(&config, backend.as_ref()).await;

            let (events_tx, mut events) = event_channel();
            let socket = Arc::new(
                SocketChannel::connect(&config.socket_url, events_tx)
                    .await
                    .context("Failed to open the real-time channel")?,
            );
            let channel: Arc<dyn RoomChannel> = socket.clone();

            let mut feed = FeedAggregator::new(Arc::clone(&backend), channel);
            if let Err(e) = feed.set_level(level.clone()).await {
                warn!(error = %e, "Joining the level's room failed; feed will not update live");
            }
            terminal::display_feed(&level, feed.items(), feed.status(), &session);
            println!("Watching {} for new activity (Ctrl-C to stop)...", level.room());

            tokio::select! {
                _ = feed.run(&mut events, |event, items| terminal::display_event(event, items.len())) => {
                    info!("Real-time channel ended");
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, leaving room");
                }
            }

            feed.close().await?;
            drop(feed);
            if let Ok(socket) = Arc::try_unwrap(socket) {
                socket.disconnect().await?;
            }
        }

        Commands::Like { post_id, level } => {
            let mut controller = controller_for(&config, &backend, &post_id, level).await?;
            let outcome = controller.toggle_like().await;
            let action = if controller.is_liked() { "like" } else { "unlike" };
            terminal::display_outcome(action, outcome);
            terminal::display_item(controller.item(), controller.session());
        }

        Commands::Recast { post_id, level } => {
            let mut controller = controller_for(&config, &backend, &post_id, level).await?;
            let outcome = controller.recast().await;
            terminal::display_outcome("recast", outcome);
            terminal::display_item(controller.item(), controller.session());
        }

        Commands::Recite {
            post_id,
            quote,
            level,
        } => {
            let mut controller = controller_for(&config, &backend, &post_id, level).await?;
            let outcome = controller.recite(&quote).await;
            terminal::display_outcome("recite", outcome);
            terminal::display_item(controller.item(), controller.session());
        }

        Commands::View { post_id, level } => {
            let mut controller = controller_for(&config, &backend, &post_id, level).await?;
            let outcome = controller.increment_view().await;
            terminal::display_outcome("view", outcome);
        }

        Commands::Delete { post_id, level } => {
            let mut controller = controller_for(&config, &backend, &post_id, level).await?;
            if !controller.is_owner() {
                anyhow::bail!("Post {post_id} was not authored by {}", config.user_id);
            }
            let outcome = controller.delete_post().await;
            terminal::display_outcome("delete", outcome);
        }

        Commands::Comments { post_id, level } => {
            let mut controller = controller_for(&config, &backend, &post_id, level).await?;
            let comments = controller.load_comments().await;
            terminal::display_comments(&post_id, comments);
        }

        Commands::Comment {
            post_id,
            text,
            image,
            level,
        } => {
            let mut controller = controller_for(&config, &backend, &post_id, level).await?;
            let outcome = controller.add_comment(&text, image).await;
            terminal::display_outcome("comment", outcome);
        }
    }

    Ok(())
}

/// Build the session for the configured user, or an anonymous one.
async fn resolve_session(config: &Config, backend: &dyn FeedBackend) -> Session {
    if config.user_id.trim().is_empty() {
        return Session::anonymous();
    }
    match Session::resolve(backend, &config.user_id).await {
        Ok(session) => session,
        Err(e) => {
            warn!(error = %e, "Profile lookup failed, continuing with bare user id");
            Session::new(&config.user_id)
        }
    }
}

/// One-shot feed load with a spinner; no live updates.
async fn load_feed(backend: &Arc<dyn FeedBackend>, level: &Level) -> FeedAggregator {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Loading {level}..."));
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let mut feed = FeedAggregator::new(Arc::clone(backend), Arc::new(DetachedChannel));
    feed.load_feed(level).await;

    spinner.finish_and_clear();
    feed
}

/// Find `post_id` in the level's feed and wrap it in a controller acting as
/// the configured user.
async fn controller_for(
    config: &Config,
    backend: &Arc<dyn FeedBackend>,
    post_id: &str,
    level: LevelArgs,
) -> Result<EngagementController> {
    config.require_identity()?;
    let level = config.level_with(level.level_type, level.level_value);
    let session = resolve_session(config, backend.as_ref()).await;

    let feed = load_feed(backend, &level).await;
    let item: FeedItem = feed.item(post_id).cloned().with_context(|| {
        format!(
            "Post {post_id} not found in the {level} feed. \
             Pass --level-type/--level-value for the post's level."
        )
    })?;

    Ok(EngagementController::new(item, session, Arc::clone(backend))
        .with_counter_rollback(config.counter_rollback))
}

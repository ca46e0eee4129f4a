use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use codeit_channels::console::ConsoleBot;
use codeit_channels::discord::DiscordBot;
use codeit_channels::ChannelBot;
use codeit_core::*;
use codeit_provider::{create_provider, ProviderConfig, ProviderType};
use codeit_schema::GuildId;

#[derive(Parser)]
#[command(name = "codeit", version, about = "Programming challenge chat bot")]
struct Cli {
    #[arg(
        long,
        default_value = "~/.codeit",
        help = "Config root directory (contains config/ and logs/)"
    )]
    config_root: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Start the configured channel bots and the session evictor")]
    Start,
    #[command(about = "Validate the config file")]
    Validate,
    #[command(about = "Talk to the bot from the terminal")]
    Chat {
        #[arg(long, default_value = "local", help = "Guild id the console speaks as")]
        guild: String,
        #[arg(long, help = "Use the offline stub provider")]
        stub: bool,
    },
}

fn expand_home(path: PathBuf, home: Option<PathBuf>) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path;
    };
    match home {
        Some(home) => home.join(rest),
        None => path,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();
    cli.config_root = expand_home(cli.config_root, std::env::var_os("HOME").map(PathBuf::from));

    let log_dir = cli.config_root.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "codeit.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Validate => {
            let config = load_config(&cli.config_root)?;
            println!(
                "Config valid. provider {:?} ({}), prefix '{}', discord {}, eviction every {}s after {}s idle.",
                config.provider.provider_type,
                config.provider.model,
                config.commands.prefix,
                if config.discord.enabled { "enabled" } else { "disabled" },
                config.session.eviction_interval_secs,
                config.session.inactivity_threshold_secs
            );
        }
        Commands::Start => {
            start_bot(&cli.config_root).await?;
        }
        Commands::Chat { guild, stub } => {
            run_console(&cli.config_root, &guild, stub).await?;
        }
    }

    Ok(())
}

fn bootstrap(config: &CodeitConfig, stub: bool) -> Result<Arc<CommandDispatcher>> {
    let provider_config = if stub {
        ProviderConfig {
            model: config.provider.model.clone(),
            ..ProviderConfig::new(ProviderType::Stub)
        }
    } else {
        config.provider.clone()
    };
    let provider = create_provider(&provider_config)?;

    let ledger = ConversationLedger::new(prompt::SYSTEM_PROMPT)
        .with_turn_limit(config.session.history_turn_limit);
    let registry = Arc::new(SessionRegistry::new(ledger, ChallengeStore::new()));

    Ok(Arc::new(CommandDispatcher::new(
        registry,
        provider,
        provider_config.model,
        config.commands.prefix.clone(),
    )))
}

fn spawn_evictor(
    config: &CodeitConfig,
    dispatcher: &CommandDispatcher,
    cancel: CancellationToken,
) -> Result<tokio::task::JoinHandle<()>> {
    let policy = config.session.eviction_policy()?;
    tracing::info!(
        "evictor: sweeping every {}s, threshold {}s",
        policy.interval.as_secs(),
        policy.threshold.num_seconds()
    );
    Ok(Evictor::new(dispatcher.registry().clone(), policy).spawn(cancel))
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => tracing::info!("Received SIGINT, shutting down..."),
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(err) => {
                tracing::warn!("failed to install SIGTERM handler: {err}");
                ctrl_c.await.ok();
                tracing::info!("Received SIGINT, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        tracing::info!("Received SIGINT, shutting down...");
    }
}

async fn start_bot(root: &Path) -> Result<()> {
    let config = load_config(root)?;
    tracing::info!("Starting {}", config.app.name);

    let dispatcher = bootstrap(&config, false)?;
    let cancel = CancellationToken::new();
    let evictor = spawn_evictor(&config, &dispatcher, cancel.clone())?;

    let mut bots: Vec<Box<dyn ChannelBot>> = Vec::new();
    if config.discord.enabled {
        tracing::info!("Registering Discord bot");
        bots.push(Box::new(DiscordBot::new(
            config.discord.token.clone(),
            dispatcher.clone(),
        )));
    }

    if bots.is_empty() {
        tracing::warn!("No channel bots enabled. Use `codeit chat` for a local session.");
        shutdown_signal().await;
    } else {
        tracing::info!("Starting {} channel bot(s)", bots.len());
        let bot_future = async {
            let mut handles = Vec::new();
            for bot in bots {
                let channel = bot.channel_type().to_string();
                handles.push(tokio::spawn(async move {
                    tracing::info!("Starting {channel} bot");
                    if let Err(err) = bot.run().await {
                        tracing::error!("{channel} bot exited with error: {err}");
                    }
                }));
            }
            for handle in handles {
                let _ = handle.await;
            }
        };

        tokio::select! {
            _ = bot_future => tracing::warn!("all channel bots stopped"),
            _ = shutdown_signal() => {}
        }
    }

    cancel.cancel();
    let _ = evictor.await;
    tracing::info!("Goodbye.");
    Ok(())
}

async fn run_console(root: &Path, guild: &str, stub: bool) -> Result<()> {
    let config = match load_config(root) {
        Ok(config) => config,
        Err(err) if stub => {
            tracing::warn!("{err:#}; using default config");
            CodeitConfig::default()
        }
        Err(err) => return Err(err),
    };

    let dispatcher = bootstrap(&config, stub)?;
    let cancel = CancellationToken::new();
    let evictor = spawn_evictor(&config, &dispatcher, cancel.clone())?;

    let bot = ConsoleBot::new(
        tokio::io::BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        GuildId(format!("console:{guild}")),
        dispatcher,
    );
    let result = Box::new(bot).run().await;

    cancel.cancel();
    let _ = evictor.await;
    result
}

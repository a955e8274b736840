/*
[INPUT]:  CLI arguments, YAML configuration file, OS shutdown signals
[OUTPUT]: Task operations against the case generation service
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, startup flow, or shutdown handling
*/

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use casegen_adapter::{
    ArtifactSink, AuthManager, CasegenClient, ClarificationReply, DirectorySink, TaskBoard, TaskId,
};
use casegen_cli::cli::commands::{self, CreateArgs};
use casegen_cli::cli::interactive::prompt_credentials;
use casegen_cli::config::LoggingConfig;
use casegen_cli::{CliConfig, DialoguerPrompter, Storage, WatchExit, WatchOptions, run_watch};

#[derive(Parser, Debug)]
#[command(name = "casegen", version, about = "Document-to-test-case generation client")]
struct Cli {
    #[arg(long = "config", value_name = "PATH", global = true)]
    config_path: Option<PathBuf>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info", global = true)]
    log_level: String,
    #[arg(long = "dry-run", global = true)]
    dry_run: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Follow the task list, answering clarifications as they come up
    Watch {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        auto_download: bool,
    },
    /// Print one page of tasks
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Upload a document and start generating test cases
    Create {
        file: PathBuf,
        #[arg(long)]
        output: String,
        #[arg(long)]
        template: Option<i64>,
        /// provider:model
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        advanced_parsing: bool,
    },
    /// Answer a pending clarification
    Clarify {
        id: TaskId,
        #[command(flatten)]
        reply: ReplyArgs,
    },
    Summary {
        id: TaskId,
    },
    Download {
        id: TaskId,
        #[arg(long, value_name = "PATH")]
        dir: Option<PathBuf>,
    },
    Delete {
        id: TaskId,
    },
    /// List selectable models
    Models,
    Templates,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct ReplyArgs {
    #[arg(long)]
    answer: Option<String>,
    /// Continue without clarifying
    #[arg(long)]
    skip: bool,
    /// Stop generation
    #[arg(long)]
    stop: bool,
}

impl ReplyArgs {
    fn into_reply(self) -> ClarificationReply {
        match (self.answer, self.skip) {
            (Some(answer), _) => ClarificationReply::answer(answer),
            (None, true) => ClarificationReply::Skip,
            (None, false) => ClarificationReply::Stop,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let config = CliConfig::load(args.config_path.as_deref()).context("load config")?;
    config.validate().context("invalid config")?;
    let _log_guard = init_tracing(&args.log_level, &config.logging)?;

    info!(
        base_url = %config.server.base_url,
        dry_run = args.dry_run,
        "starting casegen"
    );

    if args.dry_run {
        info!("dry-run requested; configuration validated");
        return Ok(());
    }

    let command = args.command.unwrap_or(Command::Watch {
        page: 1,
        auto_download: false,
    });

    let client = CasegenClient::with_config(config.client_config())
        .map_err(|err| anyhow!("create client failed: {err}"))?;
    login(&client, &config).await?;

    let page_size = config.polling.page_size;
    match command {
        Command::Watch {
            page,
            auto_download,
        } => {
            let shutdown = CancellationToken::new();
            setup_signal_handlers(shutdown.clone());

            let options = WatchOptions {
                page,
                interval: config.poll_interval(),
                auto_download: auto_download.then(|| {
                    Box::new(DirectorySink::new(config.downloads.directory.clone()))
                        as Box<dyn ArtifactSink>
                }),
            };
            let board = TaskBoard::new(client, page_size);
            let exit = run_watch(board, options, Arc::new(DialoguerPrompter), shutdown).await?;
            if exit == WatchExit::SignedOut {
                return Err(anyhow!("signed out"));
            }
            info!("watch stopped");
        }
        Command::List { page } => commands::list(&client, page, page_size).await?,
        Command::Create {
            file,
            output,
            template,
            model,
            advanced_parsing,
        } => {
            let storage = Storage::new().await.context("open local state")?;
            let args = CreateArgs {
                file,
                output,
                template,
                model,
                advanced_parsing,
            };
            commands::create(&client, &storage, args).await?;
        }
        Command::Clarify { id, reply } => {
            commands::clarify(&client, id, reply.into_reply(), page_size).await?
        }
        Command::Summary { id } => commands::summary(&client, id, page_size).await?,
        Command::Download { id, dir } => {
            let dir = dir.unwrap_or_else(|| config.downloads.directory.clone());
            commands::download(&client, id, &dir, page_size).await?;
        }
        Command::Delete { id } => commands::delete(&client, id).await?,
        Command::Models => {
            let storage = Storage::new().await.context("open local state")?;
            commands::models(&client, &storage).await?;
        }
        Command::Templates => commands::templates(&client).await?,
    }

    Ok(())
}

async fn login(client: &CasegenClient, config: &CliConfig) -> Result<()> {
    let credentials = config.credentials.clone();
    let (username, password) = tokio::task::spawn_blocking(move || {
        prompt_credentials(credentials.username, credentials.password)
    })
    .await
    .context("credential prompt panicked")??;

    AuthManager::new(client.clone())
        .login(&username, &password)
        .await
        .context("login")?;
    Ok(())
}

fn init_tracing(log_level: &str, logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match &logging.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "casegen.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            builder
                .with_writer(writer)
                .with_ansi(false)
                .try_init()
                .map_err(|err| anyhow!(err))
                .context("initialize tracing subscriber")?;
            Ok(Some(guard))
        }
        None => {
            builder
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|err| anyhow!(err))
                .context("initialize tracing subscriber")?;
            Ok(None)
        }
    }
}

fn setup_signal_handlers(shutdown: CancellationToken) {
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        shutdown_clone.cancel();
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    info!("received SIGTERM");
                    shutdown_clone.cancel();
                }
                Err(err) => {
                    warn!(error = %err, "failed to install SIGTERM handler");
                }
            }
        });
    }
}

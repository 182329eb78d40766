use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use snaptask_core::time::parse_date;
use snaptask_core::{ReasoningOracle, Task};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod auth;
mod codex_cli;
mod config;
mod llm;
mod reminders_cmd;
mod schedule_cmd;
mod state;
mod tasks_cmd;

use schedule_cmd::RequestArgs;

#[derive(Parser, Debug)]
#[command(
    name = "snaptask",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("SNAPTASK_BUILD_SHA"), ")"),
    about = "Turn task lists and free time into a conflict-free schedule"
)]
struct Cli {
    /// Debug logging to stderr (RUST_LOG still wins)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pack tasks into availability deterministically (no model involved)
    Pack {
        #[command(flatten)]
        request: RequestArgs,

        /// Save the result as the latest schedule
        #[arg(long, default_value_t = false)]
        save: bool,
    },

    /// Ask the model for a schedule, then sanitize and verify it
    Schedule {
        #[command(flatten)]
        request: RequestArgs,

        /// Pack tasks the model dropped into the remaining free time
        #[arg(long, default_value_t = false)]
        fallback: bool,

        #[arg(long, default_value_t = false)]
        save: bool,
    },

    /// Sanitize and verify a saved model reply offline
    Sanitize {
        /// File holding the raw model reply
        #[arg(long)]
        response: PathBuf,

        #[command(flatten)]
        request: RequestArgs,

        #[arg(long, default_value_t = false)]
        fallback: bool,

        #[arg(long, default_value_t = false)]
        save: bool,
    },

    /// Ask the model to find tasks in a text file
    Extract {
        file: PathBuf,

        /// Use a saved model reply instead of calling the model
        #[arg(long)]
        response: Option<PathBuf>,
    },

    /// Read tasks from a CSV or plain-text list
    Import { file: PathBuf },

    /// Split a task into subtasks whose durations add up to the task's
    Breakdown {
        description: String,

        #[arg(long, default_value_t = 30)]
        minutes: i32,

        #[arg(long)]
        response: Option<PathBuf>,
    },

    /// Reminder queue
    Reminders {
        #[command(subcommand)]
        command: reminders_cmd::RemindersCommand,
    },

    /// Daily routine maintenance
    Routine {
        #[command(subcommand)]
        command: RoutineCommand,
    },

    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Store model credentials in ~/.snaptask/auth.json
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
}

#[derive(Subcommand, Debug)]
enum RoutineCommand {
    /// Carry daily-routine items over to the next day
    Roll {
        /// Schedule JSON (defaults to the last saved schedule)
        #[arg(long)]
        schedule: Option<PathBuf>,

        /// Target date, YYYY-MM-DD (default: the day after the schedule's last day)
        #[arg(long)]
        date: Option<String>,

        /// Re-pack the routine into these windows instead of keeping its times (repeatable)
        #[arg(long = "window")]
        windows: Vec<String>,

        #[arg(long, default_value_t = false)]
        save: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default ~/.snaptask/config.toml
    Init,
    /// Print the effective configuration
    Show,
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    PasteOpenaiApiKey,
    PasteAnthropicToken,
}

fn init_tracing(configured: &str, verbose: bool) {
    let fallback = if verbose { "debug" } else { configured };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn oracle(cfg: &config::Config, response: Option<&PathBuf>) -> Result<Box<dyn ReasoningOracle>> {
    match response {
        Some(p) => {
            let response =
                std::fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
            Ok(Box::new(llm::ReplayOracle { response }))
        }
        None => Ok(Box::new(llm::LlmOracle::from_config(&cfg.llm)?)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config();
    init_tracing(
        cfg.as_ref().map(|c| c.logging.level.as_str()).unwrap_or("warn"),
        cli.verbose,
    );
    let cfg = cfg?;
    let policy = &cfg.policy;

    match cli.command {
        Command::Pack { request, save } => schedule_cmd::run_pack(&request, policy, save)?,

        Command::Schedule {
            request,
            fallback,
            save,
        } => {
            let oracle = oracle(&cfg, None)?;
            schedule_cmd::run_schedule(&*oracle, &request, policy, fallback, save)?;
        }

        Command::Sanitize {
            response,
            request,
            fallback,
            save,
        } => {
            let oracle = oracle(&cfg, Some(&response))?;
            schedule_cmd::run_schedule(&*oracle, &request, policy, fallback, save)?;
        }

        Command::Extract { file, response } => {
            let oracle = oracle(&cfg, response.as_ref())?;
            tasks_cmd::run_extract(&*oracle, &file)?;
        }

        Command::Import { file } => tasks_cmd::run_import(&file)?,

        Command::Breakdown {
            description,
            minutes,
            response,
        } => {
            let oracle = oracle(&cfg, response.as_ref())?;
            let task = Task::new(description).with_duration(minutes);
            tasks_cmd::run_breakdown(&*oracle, &task)?;
        }

        Command::Reminders { command } => reminders_cmd::run(command)?,

        Command::Routine { command } => match command {
            RoutineCommand::Roll {
                schedule,
                date,
                windows,
                save,
            } => {
                let date = date.as_deref().map(parse_date).transpose()?;
                schedule_cmd::run_routine_roll(schedule.as_deref(), date, &windows, policy, save)?;
            }
        },

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                println!("# {}", config::config_path()?.display());
                println!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
                let a = auth::load_auth()?;
                println!("# openai_api_key: {}", auth::mask(a.get(auth::Secret::OpenAiKey).as_deref()));
                println!("# anthropic_token: {}", auth::mask(a.get(auth::Secret::AnthropicToken).as_deref()));
            }
        },

        Command::Auth { command } => match command {
            AuthCommand::PasteOpenaiApiKey => auth::paste(auth::Secret::OpenAiKey)?,
            AuthCommand::PasteAnthropicToken => auth::paste(auth::Secret::AnthropicToken)?,
        },
    }

    Ok(())
}

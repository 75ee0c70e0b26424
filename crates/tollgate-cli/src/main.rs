//! Tollgate CLI - policy and plan management over the local state file.

#![deny(unsafe_code)]
#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod commands;
mod config_bridge;
mod context;
mod prompt;
mod theme;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tollgate_config::Config;

use crate::commands::OutputFormat;
use crate::context::CliContext;
use crate::prompt::TerminalPrompt;
use crate::theme::Theme;

/// Tollgate - approval gate and reversible plan executor
#[derive(Parser)]
#[command(name = "tollgate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,

    /// Directory holding the state file (overrides configuration)
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how a tool call would be classified
    Classify {
        /// Tool name (e.g. `shell_exec`, `browser_navigate`, `file_write`)
        tool: String,
        /// Tool input as a JSON object
        #[arg(short, long)]
        input: Option<String>,
    },

    /// Run a tool call through the approval gate, prompting if required
    Authorize {
        /// Tool name
        tool: String,
        /// Tool input as a JSON object
        #[arg(short, long)]
        input: Option<String>,
        /// Conversation that TASK approvals are scoped to
        #[arg(short, long, default_value = "cli")]
        conversation: String,
    },

    /// Show or change the autonomy mode
    Mode {
        #[command(subcommand)]
        command: ModeCommands,
    },

    /// Manage global ALWAYS approvals
    Overrides {
        #[command(subcommand)]
        command: OverrideCommands,
    },

    /// Build, run and undo action plans
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
}

#[derive(Subcommand)]
enum ModeCommands {
    /// Print the current mode
    Show,
    /// Persist a new mode (`safe`, `guided` or `unrestricted`)
    Set {
        /// The new mode
        mode: String,
    },
}

#[derive(Subcommand)]
enum OverrideCommands {
    /// List always-approved risk levels
    Show,
    /// Revoke the ALWAYS approval of one risk level
    Revoke {
        /// Risk level (`ELEVATED`, `EXFIL`, `SENSITIVE_DOMAIN`)
        risk: String,
    },
    /// Revoke every ALWAYS approval
    Reset,
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Create a draft plan
    Create {
        /// What the plan is for
        description: String,
    },
    /// Append an action to a draft plan
    Add {
        /// Plan ID
        plan: String,
        /// Action type (`fs_write`, `fs_delete`, `fs_move`, ...)
        action_type: String,
        /// Action payload as a JSON object
        payload: String,
        /// Sequence position (default: after the last action)
        #[arg(long)]
        seq: Option<u32>,
    },
    /// List all plans
    List,
    /// Show a plan and its actions
    Show {
        /// Plan ID
        plan: String,
    },
    /// Execute a plan
    Run {
        /// Plan ID
        plan: String,
    },
    /// Roll back an executed plan
    Undo {
        /// Plan ID
        plan: String,
    },
    /// Delete a plan's quarantined backups
    Purge {
        /// Plan ID
        plan: String,
        /// Purge even when undo may still need the backups
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let result = runtime.block_on(run(cli));
    // An expired terminal prompt can still hold a blocking thread.
    runtime.shutdown_timeout(Duration::from_millis(100));

    match result {
        Ok(code) => Ok(code),
        Err(e) => {
            eprintln!("{}", Theme::error(&format!("{e:#}")));
            Ok(ExitCode::FAILURE)
        },
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let workspace_root = std::env::current_dir().ok();
    let resolved =
        Config::load(workspace_root.as_deref()).context("failed to load configuration")?;

    let log_config = config_bridge::to_log_config(&resolved.config, cli.verbose);
    if let Err(e) = tollgate_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }
    tracing::debug!(files = ?resolved.loaded_files, "Loaded configuration");

    let format = cli.format;
    match cli.command {
        Commands::Classify { tool, input } => {
            let input = commands::parse_input(input.as_deref())?;
            let classifier = context::classifier(&resolved)?;
            commands::classify::classify(&classifier, &tool, &input, format)?;
        },
        Commands::Authorize {
            tool,
            input,
            conversation,
        } => {
            let input = commands::parse_input(input.as_deref())?;
            let ctx = CliContext::open(resolved, cli.state_dir).await?;
            let gate = ctx.gate().await?;
            let allowed = commands::authorize::authorize(
                &gate,
                &tool,
                &input,
                &conversation,
                &TerminalPrompt,
                format,
            )
            .await?;
            if !allowed {
                return Ok(ExitCode::FAILURE);
            }
        },
        Commands::Mode { command } => {
            let ctx = CliContext::open(resolved, cli.state_dir).await?;
            let gate = ctx.gate().await?;
            match command {
                ModeCommands::Show => commands::mode::show_mode(gate.settings(), format)?,
                ModeCommands::Set { mode } => {
                    commands::mode::set_mode(gate.settings(), &mode, format).await?;
                },
            }
        },
        Commands::Overrides { command } => {
            let ctx = CliContext::open(resolved, cli.state_dir).await?;
            let gate = ctx.gate().await?;
            handle_overrides(command, &gate, format).await?;
        },
        Commands::Plan { command } => {
            let ctx = CliContext::open(resolved, cli.state_dir).await?;
            if !handle_plan(command, &ctx, format).await? {
                return Ok(ExitCode::FAILURE);
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}

async fn handle_overrides(
    command: OverrideCommands,
    gate: &tollgate_approval::ApprovalGate,
    format: OutputFormat,
) -> Result<()> {
    let state = gate.state();
    match command {
        OverrideCommands::Show => commands::overrides::show_overrides(state, format).await,
        OverrideCommands::Revoke { risk } => {
            commands::overrides::revoke_override(state, &risk, format).await
        },
        OverrideCommands::Reset => commands::overrides::reset_overrides(state, format).await,
    }
}

/// Returns `false` when the command completed but left work undone.
async fn handle_plan(
    command: PlanCommands,
    ctx: &CliContext,
    format: OutputFormat,
) -> Result<bool> {
    let executor = ctx.executor()?;
    let ledger = executor.ledger().as_ref();
    match command {
        PlanCommands::Create { description } => {
            commands::plan::create_plan(ledger, &description, format).await?;
        },
        PlanCommands::Add {
            plan,
            action_type,
            payload,
            seq,
        } => {
            commands::plan::add_action(ledger, &plan, &action_type, &payload, seq, format).await?;
        },
        PlanCommands::List => commands::plan::list_plans(ledger, format).await?,
        PlanCommands::Show { plan } => commands::plan::show_plan(ledger, &plan, format).await?,
        PlanCommands::Run { plan } => commands::plan::run_plan(&executor, &plan, format).await?,
        PlanCommands::Undo { plan } => {
            return commands::plan::undo_plan(&executor, &plan, format).await;
        },
        PlanCommands::Purge { plan, force } => {
            commands::plan::purge_plan(&executor, &plan, force, format).await?;
        },
    }
    Ok(true)
}

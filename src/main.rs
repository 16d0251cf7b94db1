// ANPTOP Engine - Main Entry Point
//
// Command-line front end for the security tool execution engine:
// - Catalog browsing (list, summary, show)
// - Command building from templates
// - Policy-gated, audited tool runs

use anptop_engine::audit::{AuditEvent, AuditSink, TracingAuditSink};
use anptop_engine::catalog::{Catalog, OsType, ToolCategory, ToolRepository};
use anptop_engine::config::Config;
use anptop_engine::logging::init_tracing;
use anptop_engine::policy::{ExecutionPolicy, Role};
use anptop_engine::tools::{
    ExecutionHistory, ExecutionRequest, ToolExecutor, ToolInfo, ToolManager, ToolParameters,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// ANPTOP: security tool catalog and execution engine
#[derive(Parser, Debug)]
#[command(name = "anptop")]
#[command(author = "ANPTOP Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Security tool catalog and audited execution engine", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (default: ~/.config/anptop/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List catalog tools
    List {
        /// Only tools in this category
        #[arg(long)]
        category: Option<ToolCategory>,

        /// Only tools for this platform (cross-platform tools included)
        #[arg(long)]
        os: Option<OsType>,

        /// Only tools with risk level 4 or higher
        #[arg(long)]
        high_risk: bool,

        /// Only tools that require approval
        #[arg(long)]
        approval: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show catalog counts
    Summary {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show one tool's definition
    Show {
        /// Tool key
        tool: String,
    },
    /// Print the command a tool would run
    Build {
        /// Tool key
        tool: String,

        /// Template parameter as key=value
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// Run a tool and record evidence
    Run {
        /// Tool key
        tool: String,

        /// Template parameter as key=value
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Timeout in seconds, overriding the tool's (0 disables it)
        #[arg(long)]
        timeout: Option<u64>,

        /// Discard output instead of capturing it
        #[arg(long)]
        no_capture: bool,

        /// Role the run is authorized as
        #[arg(long, default_value = "tester")]
        role: Role,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse command-line arguments
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            anyhow::ensure!(path.exists(), "Config file not found: {}", path.display());
            Config::load_from_path(path)?
        }
        None => Config::load()?,
    };

    init_tracing(&config.logging, args.verbose)?;
    debug!("ANPTOP engine v{} starting", env!("CARGO_PKG_VERSION"));

    let manager = load_manager(&config)?;

    match args.command {
        Commands::List {
            category,
            os,
            high_risk,
            approval,
            json,
        } => list_tools(&manager, category, os, high_risk, approval, json)?,
        Commands::Summary { json } => print_summary(&manager, json)?,
        Commands::Show { tool } => show_tool(&manager, &tool)?,
        Commands::Build { tool, params } => build_command(&manager, &tool, params)?,
        Commands::Run {
            tool,
            params,
            timeout,
            no_capture,
            role,
            json,
        } => {
            let request = ExecutionRequest::new(tool)
                .params(params.into_iter().collect())
                .capture_output(!no_capture);
            let request = match timeout {
                Some(secs) => request.timeout_secs(secs),
                None => request,
            };
            return run_tool(&config, manager, request, role, json).await;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn load_manager(config: &Config) -> Result<ToolManager> {
    let catalog = match &config.catalog.path {
        Some(path) => Catalog::load_from_path(path)
            .with_context(|| format!("Failed to load tool catalog from {}", path))?,
        None => Catalog::builtin().context("Failed to load built-in tool catalog")?,
    };
    debug!(tools = catalog.len(), "Tool catalog ready");
    Ok(ToolManager::new(Arc::new(catalog)))
}

fn list_tools(
    manager: &ToolManager,
    category: Option<ToolCategory>,
    os: Option<OsType>,
    high_risk: bool,
    approval: bool,
    json: bool,
) -> Result<()> {
    let tools: Vec<ToolInfo> = manager
        .list_tool_infos()
        .into_iter()
        .filter(|t| category.map_or(true, |c| t.category == c))
        .filter(|t| os.map_or(true, |o| t.os_type.matches(o)))
        .filter(|t| !high_risk || t.risk_level >= 4)
        .filter(|t| !approval || t.requires_approval)
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }

    for tool in &tools {
        println!(
            "{:<28} {:<26} {:<15} risk={}{}",
            tool.key,
            tool.category.as_str(),
            tool.os_type.as_str(),
            tool.risk_level,
            if tool.requires_approval {
                " approval"
            } else {
                ""
            }
        );
    }
    println!("{} tools", tools.len());
    Ok(())
}

fn print_summary(manager: &ToolManager, json: bool) -> Result<()> {
    let summary = manager.get_tool_summary();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Total tools: {}", summary.total_tools);
    println!("High risk: {}", summary.high_risk_count);
    println!("Approval required: {}", summary.approval_required_count);
    println!("By category:");
    for (category, count) in &summary.by_category {
        println!("  {:<26} {}", category, count);
    }
    println!("By OS:");
    for (os, count) in &summary.by_os {
        println!("  {:<26} {}", os, count);
    }
    Ok(())
}

fn show_tool(manager: &ToolManager, key: &str) -> Result<()> {
    let tool = manager
        .get_tool(key)
        .with_context(|| format!("Tool '{}' not found", key))?;
    println!("{}", serde_json::to_string_pretty(tool)?);
    Ok(())
}

fn build_command(manager: &ToolManager, key: &str, params: Vec<(String, String)>) -> Result<()> {
    anyhow::ensure!(manager.get_tool(key).is_some(), "Tool '{}' not found", key);

    let params: ToolParameters = params.into_iter().collect();
    let command = manager.build_command(key, &params);
    anyhow::ensure!(
        !command.is_empty(),
        "Cannot build command for tool '{}'",
        key
    );

    let unresolved = manager.unresolved_placeholders(key, &params);
    if !unresolved.is_empty() {
        warn!(tool = key, "Unresolved placeholders: {}", unresolved.join(", "));
    }

    println!("{}", command);
    Ok(())
}

async fn run_tool(
    config: &Config,
    manager: ToolManager,
    request: ExecutionRequest,
    role: Role,
    json: bool,
) -> Result<ExitCode> {
    let policy = ExecutionPolicy::new();
    let tool = manager.get_tool(&request.tool_name).cloned();
    if let Some(tool) = &tool {
        policy.authorize(role, &request.tool_name, tool)?;
    }

    let history = Arc::new(ExecutionHistory::new(config.execution.history_capacity));
    let executor = ToolExecutor::with_history(manager, config.executor_config(), history);

    info!(tool = %request.tool_name, role = %role, "Starting tool run");
    let result = executor.execute(request).await;
    TracingAuditSink.record(&AuditEvent::from_result(&result, tool.as_ref(), Some(role)));

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.summary());
        println!("Command: {}", result.command);
        if let Some(file) = &result.output_file {
            println!("Output file: {}", file.display());
        }
        if let Some(hash) = &result.hash_sha256 {
            println!("SHA-256: {}", hash);
        }
        if !result.stdout.is_empty() {
            println!("{}", result.stdout);
        }
        if !result.stderr.is_empty() {
            eprintln!("{}", result.stderr);
        }
    }

    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

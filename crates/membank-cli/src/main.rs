//! membank: CLI entry point for the graph memory service.

use anyhow::bail;
use clap::{Parser, Subcommand};
use membank_core::{CancelToken, ServerConfig};
use membank_mcp::{McpServer, NoopProgress};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "membank",
    about = "Graph-structured memory bank for AI coding agents"
)]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server on stdio
    Serve,

    /// Start the MCP server on HTTP with SSE notifications
    ServeHttp {
        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Initialise the memory bank for a repository
    Init {
        /// Logical repository name
        repo: String,

        #[arg(long, default_value = "main")]
        branch: String,

        /// Project root (defaults to the working directory)
        #[arg(long)]
        project_root: Option<PathBuf>,
    },

    /// Record an agent observation
    AddContext {
        repo: String,

        #[arg(long)]
        agent: String,

        #[arg(long)]
        summary: String,

        #[arg(long)]
        observation: String,

        /// ISO date (defaults to today)
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        issue: Option<String>,

        /// Attach the context to this item (e.g. comp-Auth)
        #[arg(long)]
        item: Option<String>,

        /// Type of the attached item
        #[arg(long, default_value = "component")]
        item_type: String,

        #[arg(long, default_value = "main")]
        branch: String,

        #[arg(long)]
        project_root: Option<PathBuf>,
    },

    /// Create or update a component
    AddComponent {
        repo: String,

        /// Logical id, prefixed comp-
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        kind: Option<String>,

        #[arg(long, default_value = "active")]
        status: String,

        /// Dependency ids (repeatable)
        #[arg(long = "depends-on")]
        depends_on: Vec<String>,

        #[arg(long, default_value = "main")]
        branch: String,

        #[arg(long)]
        project_root: Option<PathBuf>,
    },

    /// Create or update a decision
    AddDecision {
        repo: String,

        /// Logical id, prefixed dec-
        id: String,

        #[arg(long)]
        name: String,

        /// ISO date (defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Rationale
        #[arg(long)]
        context: Option<String>,

        #[arg(long, default_value = "proposed")]
        status: String,

        /// Component this decision governs
        #[arg(long)]
        component: Option<String>,

        #[arg(long, default_value = "main")]
        branch: String,

        #[arg(long)]
        project_root: Option<PathBuf>,
    },

    /// Create or update a governance rule
    AddRule {
        repo: String,

        /// Logical id, prefixed rule-
        id: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        content: String,

        /// ISO date (defaults to today)
        #[arg(long)]
        created: Option<String>,

        /// Trigger keywords (repeatable)
        #[arg(long)]
        triggers: Vec<String>,

        #[arg(long, default_value = "active")]
        status: String,

        #[arg(long, default_value = "main")]
        branch: String,

        #[arg(long)]
        project_root: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();

    // Stdout belongs to JSON-RPC; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let server = Arc::new(McpServer::new(config));

    match cli.command {
        Commands::Serve => {
            membank_mcp::stdio::run(server).await?;
        }
        Commands::ServeHttp { port } => {
            let config = server.config();
            let addr: std::net::SocketAddr =
                format!("{}:{}", config.host, port.unwrap_or(config.http_stream_port))
                    .parse()?;
            membank_mcp::http::serve(Arc::clone(&server), addr).await?;
        }
        Commands::Init {
            repo,
            branch,
            project_root,
        } => {
            init_bank(&server, &repo, &branch, project_root.as_deref())?;
            println!("memory bank ready for {repo} ({branch})");
        }
        Commands::AddContext {
            repo,
            agent,
            summary,
            observation,
            date,
            issue,
            item,
            item_type,
            branch,
            project_root,
        } => {
            init_bank(&server, &repo, &branch, project_root.as_deref())?;
            let mut args = json!({
                "agent": agent,
                "summary": summary,
                "observation": observation,
                "date": date.unwrap_or_else(today),
                "issue": issue,
            });
            if let Some(item) = item {
                args["itemId"] = json!(item);
                args["itemType"] = json!(item_type);
            }
            run_tool(&server, "add-context", args)?;
        }
        Commands::AddComponent {
            repo,
            id,
            name,
            kind,
            status,
            depends_on,
            branch,
            project_root,
        } => {
            init_bank(&server, &repo, &branch, project_root.as_deref())?;
            let name = name.unwrap_or_else(|| id.clone());
            let args = json!({
                "id": id,
                "name": name,
                "kind": kind,
                "status": status,
                "dependsOn": depends_on,
            });
            run_tool(&server, "upsert-component", args)?;
        }
        Commands::AddDecision {
            repo,
            id,
            name,
            date,
            context,
            status,
            component,
            branch,
            project_root,
        } => {
            init_bank(&server, &repo, &branch, project_root.as_deref())?;
            let args = json!({
                "id": id,
                "name": name,
                "date": date.unwrap_or_else(today),
                "context": context,
                "status": status,
                "componentId": component,
            });
            run_tool(&server, "upsert-decision", args)?;
        }
        Commands::AddRule {
            repo,
            id,
            name,
            content,
            created,
            triggers,
            status,
            branch,
            project_root,
        } => {
            init_bank(&server, &repo, &branch, project_root.as_deref())?;
            let args = json!({
                "id": id,
                "name": name,
                "content": content,
                "created": created.unwrap_or_else(today),
                "triggers": triggers,
                "status": status,
            });
            run_tool(&server, "upsert-rule", args)?;
        }
    }

    Ok(())
}

/// Session key for one-shot CLI invocations.
const CLI_SESSION: &str = "cli";

fn init_bank(
    server: &McpServer,
    repo: &str,
    branch: &str,
    project_root: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    let mut args = json!({ "repository": repo, "branch": branch });
    if let Some(root) = project_root {
        args["projectRoot"] = json!(root.display().to_string());
    }
    run_tool(server, "init-memory-bank", args)?;
    Ok(())
}

fn run_tool(server: &McpServer, tool: &str, args: Value) -> anyhow::Result<Value> {
    let result = server.dispatch_tool(
        CLI_SESSION,
        tool,
        &args,
        &NoopProgress,
        &CancelToken::new(),
    );
    if result.is_error {
        bail!("{tool} failed: {}", result.content[0].text);
    }
    let payload = result.structured_content.unwrap_or(Value::Null);
    if tool != "init-memory-bank" {
        println!("{}", serde_json::to_string_pretty(&payload)?);
    }
    Ok(payload)
}

fn today() -> String {
    chrono::Utc::now().date_naive().to_string()
}

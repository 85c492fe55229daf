use admin_mcp_server::agent::{AgentToolContext, AgentToolRegistry};
use admin_mcp_server::config::DEFAULT_BACKEND_API_URL;
use admin_mcp_server::mcp::{unwrap_envelope, McpClient};
use admin_mcp_server::{BackendGateway, ToolCallResult, ToolRegistry};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(version, about = "Calls admin tools from the command line")]
struct CliArgs {
    /// Bearer token forwarded to the server or backend.
    #[clap(long, global = true, env = "BEARER_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Timeout in seconds for each HTTP exchange.
    #[clap(long, global = true, env = "API_TIMEOUT", default_value_t = 30)]
    timeout_sec: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lists the tool catalogue.
    List,

    /// Calls a tool through an MCP endpoint.
    Call {
        tool: String,

        /// Tool arguments as a JSON object.
        #[clap(long, default_value = "{}")]
        args: String,

        /// Full URL of the MCP endpoint.
        #[clap(long, env = "MCP_ENDPOINT", default_value = "http://localhost:8080/mcp")]
        endpoint: String,

        /// Skip the event-stream attempt and use a plain POST.
        #[clap(long)]
        no_stream: bool,
    },

    /// Calls a tool in-process, straight against the backend.
    Direct {
        tool: String,

        /// Tool arguments as a JSON object.
        #[clap(long, default_value = "{}")]
        args: String,

        /// Base URL of the backend REST API.
        #[clap(long, env = "BACKEND_API_URL", default_value = DEFAULT_BACKEND_API_URL)]
        backend_api_url: String,
    },
}

fn parse_args(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("--args is not valid JSON: {}", raw))
}

fn print_result(result: &ToolCallResult) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn list_tools() {
    let registry = ToolRegistry::with_default_tools();
    for descriptor in registry.list() {
        println!("{}", descriptor.name);
        println!("    {}", descriptor.description);
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let timeout = Duration::from_secs(cli_args.timeout_sec);

    match cli_args.command {
        Command::List => {
            list_tools();
            Ok(ExitCode::SUCCESS)
        }
        Command::Call {
            tool,
            args,
            endpoint,
            no_stream,
        } => {
            let arguments = parse_args(&args)?;
            let client = McpClient::new(endpoint, timeout)?
                .with_bearer_token(cli_args.token)
                .with_streaming(!no_stream);
            let result = unwrap_envelope(client.call_tool(&tool, arguments).await);
            print_result(&result)
        }
        Command::Direct {
            tool,
            args,
            backend_api_url,
        } => {
            let arguments = parse_args(&args)?;
            let gateway = Arc::new(BackendGateway::new(
                backend_api_url.trim_end_matches('/'),
                None,
                timeout,
            )?);
            let registry = AgentToolRegistry::direct(&ToolRegistry::with_default_tools(), gateway);
            let ctx = AgentToolContext::new(cli_args.token);
            let value = registry.execute(&tool, arguments, &ctx).await?;
            let result: ToolCallResult =
                serde_json::from_value(value).context("Unexpected tool output")?;
            print_result(&result)
        }
    }
}

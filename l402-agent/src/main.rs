//! Command-line agent for L402 metered APIs.
//!
//! # Usage
//!
//! ```bash
//! # Create an account, then fetch a quote (paying if credits ran out)
//! l402-agent signup
//! l402-agent fetch ticker/AAPL --token <TOKEN>
//!
//! # Serve the tools to an MCP host over stdio
//! l402-agent mcp
//!
//! # Configure logging level (logs go to stderr)
//! RUST_LOG=debug l402-agent info --token <TOKEN>
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG`: path to the TOML configuration file (default: `l402.toml`)
//! - `L402_BASE_URL`: override the resource server URL
//! - `L402_EXECUTOR_URL`: override the payment service URL
//! - `L402_TOKEN`: bearer token for `fetch` and `info`
//! - `LIGHTSPARK_*`: node credentials when the config has no `[node]` table
//! - `RUST_LOG`: log level filter (default: `info`)
//!
//! A `.env` file in the working directory is loaded first.

#![allow(clippy::print_stdout)]

mod cli;
mod config;

use std::sync::Arc;

use clap::Parser;
use l402::{
    AccountToken, Invoice, InvoiceIssuer, MilliSatoshis, NoPayments, PaymentExecutor,
    TestInvoiceRequest,
};
use l402_http::executor::ExecutorConfig;
use l402_http::{HttpPaymentExecutor, MeteredClient};
use l402_mcp::{ToolCall, ToolServer, openai, rmcp_compat};
use tracing_subscriber::EnvFilter;

use crate::cli::{AgentCommand, Cli};
use crate::config::AgentConfig;

type BoxError = Box<dyn std::error::Error>;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // stdout carries command output and MCP traffic
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!("l402-agent failed: {e}");
        std::process::exit(1);
    }
}

/// The metered client plus the node service, when one is configured.
struct Agent {
    client: MeteredClient,
    node: Option<(String, Arc<HttpPaymentExecutor>)>,
}

impl Agent {
    fn from_config(config: &AgentConfig) -> Result<Self, BoxError> {
        let base_url = config.base_url()?;
        let limits = config.payment_limits()?;

        let node = match (&config.executor_url, config.node_config()) {
            (Some(url), Ok(node)) => {
                let executor = HttpPaymentExecutor::new(ExecutorConfig::for_node(url, &node))?;
                tracing::info!(executor = %url, node_id = %node.node_id, "Payments enabled");
                Some((node.node_id, Arc::new(executor)))
            }
            (None, _) => {
                tracing::warn!("No executor_url configured, payments are disabled");
                None
            }
            (Some(_), Err(e)) => {
                tracing::warn!("Node credentials unavailable, payments are disabled: {e}");
                None
            }
        };

        let mut node_id = String::new();
        let mut executor: Arc<dyn PaymentExecutor> = Arc::new(NoPayments);
        if let Some((id, http)) = &node {
            node_id.clone_from(id);
            executor = Arc::<HttpPaymentExecutor>::clone(http);
        }

        let client = MeteredClient::builder(base_url, node_id, executor)
            .limits(limits)
            .build()?;
        tracing::debug!(?client, "Client ready");

        Ok(Self { client, node })
    }

    fn node(&self) -> Result<&(String, Arc<HttpPaymentExecutor>), BoxError> {
        self.node
            .as_ref()
            .ok_or_else(|| "this command needs executor_url and node credentials".into())
    }

    fn tool_server(&self) -> ToolServer {
        let server = ToolServer::new(self.client.clone());
        match &self.node {
            Some((_, executor)) => {
                let issuer: Arc<dyn InvoiceIssuer> = Arc::<HttpPaymentExecutor>::clone(executor);
                server.with_invoice_issuer(issuer)
            }
            None => server,
        }
    }
}

async fn run(cli: Cli) -> Result<(), BoxError> {
    let config =
        AgentConfig::load_from(&cli.config)?.with_overrides(cli.base_url, cli.executor_url);
    tracing::debug!(path = %cli.config.display(), base_url = %config.base_url, "Loaded configuration");

    if let AgentCommand::Tools = cli.command {
        println!("{}", serde_json::to_string_pretty(&openai::function_tools())?);
        return Ok(());
    }

    let agent = Agent::from_config(&config)?;

    match cli.command {
        AgentCommand::Signup => {
            let token = agent.client.signup().await?;
            println!("{token}");
        }
        AgentCommand::Fetch { path, token } => {
            let token = match token {
                Some(token) => AccountToken::new(token),
                None => {
                    let token = agent.client.signup().await?;
                    tracing::info!("Signed up for a new account");
                    token
                }
            };
            let response = agent.client.fetch(&path, &token).await?;
            if let Some(receipt) = &response.receipt {
                tracing::info!(offer = ?receipt.offer_id, payment_id = %receipt.payment_id, "Paid for request");
            }
            println!("{}", response.text());
            if !response.is_success() {
                return Err(format!("server returned {}", response.status).into());
            }
        }
        AgentCommand::Info { token } => {
            let info = agent.client.user_info(&AccountToken::new(token)).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        AgentCommand::Pay {
            invoice,
            amount_msats,
        } => {
            agent.node()?;
            let invoice = Invoice::parse(&invoice)?;
            let payment_id = agent
                .client
                .pay_invoice(&invoice, amount_msats.map(MilliSatoshis))
                .await?;
            println!("{payment_id}");
        }
        AgentCommand::Invoice { amount_msats, memo } => {
            let (node_id, executor) = agent.node()?;
            let invoice = executor
                .create_test_invoice(&TestInvoiceRequest {
                    node_id: node_id.clone(),
                    amount: MilliSatoshis(amount_msats),
                    memo: Some(memo),
                })
                .await?;
            println!("{invoice}");
        }
        AgentCommand::Mcp => {
            tracing::info!("Serving MCP tools on stdio");
            rmcp_compat::serve_stdio(agent.tool_server()).await?;
        }
        AgentCommand::Call { tool, args } => {
            let arguments: serde_json::Value = serde_json::from_str(&args)?;
            let call = ToolCall::decode(&tool, arguments)?;
            let result = agent.tool_server().run(call).await;
            println!("{}", result.text());
            if result.is_error {
                return Err(format!("tool `{tool}` failed").into());
            }
        }
        AgentCommand::Tools => {}
    }

    Ok(())
}

//! CLI definition for l402-agent.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use url::Url;

/// Pay-per-request client for L402 metered APIs.
#[derive(Parser, Debug)]
#[command(name = "l402-agent")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "CONFIG", default_value = "l402.toml")]
    pub config: PathBuf,

    /// Resource server base URL (overrides the config file).
    #[arg(long, env = "L402_BASE_URL")]
    pub base_url: Option<Url>,

    /// Payment service URL (overrides the config file).
    #[arg(long, env = "L402_EXECUTOR_URL")]
    pub executor_url: Option<String>,

    /// Command to run.
    #[command(subcommand)]
    pub command: AgentCommand,
}

/// Agent commands.
#[derive(Subcommand, Debug)]
pub enum AgentCommand {
    /// Create an account and print its bearer token.
    Signup,
    /// GET a path on the server, paying when it answers 402.
    Fetch {
        /// Path relative to the base URL, e.g. `ticker/AAPL`.
        path: String,
        /// Bearer token; a new account is created if omitted.
        #[arg(long, env = "L402_TOKEN")]
        token: Option<String>,
    },
    /// Print account info and credit balance.
    Info {
        /// Bearer token.
        #[arg(long, env = "L402_TOKEN")]
        token: String,
    },
    /// Pay a Lightning invoice from the configured node.
    Pay {
        /// BOLT-11 invoice.
        invoice: String,
        /// Amount for invoices that do not encode one.
        #[arg(long)]
        amount_msats: Option<u64>,
    },
    /// Create a test-mode invoice on the configured node.
    Invoice {
        /// Invoice amount in millisatoshis.
        #[arg(long, default_value_t = 50_000)]
        amount_msats: u64,
        /// Memo shown to the payer.
        #[arg(long, default_value = "Test Payment")]
        memo: String,
    },
    /// Print the tools as OpenAI function definitions.
    Tools,
    /// Serve the tools as an MCP server on stdin/stdout.
    Mcp,
    /// Run one tool with JSON arguments.
    Call {
        /// Tool name.
        tool: String,
        /// Arguments as a JSON object.
        #[arg(default_value = "{}")]
        args: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_fetch() {
        let cli = Cli::try_parse_from([
            "l402-agent",
            "--base-url",
            "http://localhost:8080",
            "fetch",
            "ticker/AAPL",
            "--token",
            "tok",
        ])
        .unwrap();
        assert_eq!(cli.base_url.unwrap().as_str(), "http://localhost:8080/");
        match cli.command {
            AgentCommand::Fetch { path, token } => {
                assert_eq!(path, "ticker/AAPL");
                assert_eq!(token.as_deref(), Some("tok"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_invoice_defaults() {
        let cli = Cli::try_parse_from(["l402-agent", "invoice"]).unwrap();
        match cli.command {
            AgentCommand::Invoice { amount_msats, memo } => {
                assert_eq!(amount_msats, 50_000);
                assert_eq!(memo, "Test Payment");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ledger_core::wire::RegisterRequest;
use ledger_core::NewTransaction;
use reqwest::{Client, Method};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for a ledger node")]
struct Cli {
    /// Node base URL
    #[arg(long, global = true, default_value = "http://127.0.0.1:5000")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a transaction to the pending pool
    Submit {
        /// Sender
        #[arg(long)]
        origin: String,
        /// Recipient
        #[arg(long)]
        destination: String,
        /// Amount
        #[arg(long, allow_negative_numbers = true)]
        amount: i64,
    },
    /// Mine the pending transactions
    Mine,
    /// Print the node's chain
    Chain,
    /// Replace the node's peers and push its chain to them
    Register {
        /// Peer base URLs
        #[arg(required = true)]
        peers: Vec<String>,
    },
    /// Ask the node to ping its peers
    Ping,
    /// Describe the machine the node runs on
    System,
}

impl Command {
    fn method_and_path(&self) -> (Method, &'static str) {
        match self {
            Command::Submit { .. } => (Method::POST, "/transactions/new"),
            Command::Mine => (Method::GET, "/mine"),
            Command::Chain => (Method::GET, "/chain"),
            Command::Register { .. } => (Method::POST, "/nodes/register"),
            Command::Ping => (Method::GET, "/ping"),
            Command::System => (Method::GET, "/system"),
        }
    }

    fn body(&self) -> Option<serde_json::Value> {
        match self {
            Command::Submit {
                origin,
                destination,
                amount,
            } => to_value(&NewTransaction {
                origin: origin.clone(),
                destination: destination.clone(),
                amount: *amount,
            }),
            Command::Register { peers } => to_value(&RegisterRequest {
                node_addresses: peers.clone(),
            }),
            _ => None,
        }
    }
}

fn to_value<T: Serialize>(body: &T) -> Option<serde_json::Value> {
    serde_json::to_value(body).ok()
}

fn endpoint(node: &str, path: &str) -> String {
    format!("{}{path}", node.trim_end_matches('/'))
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let (method, path) = cli.cmd.method_and_path();
    let url = endpoint(&cli.node, path);
    debug!(%method, %url, "sending request");

    let client = Client::new();
    let mut request = client.request(method, &url);
    if let Some(body) = cli.cmd.body() {
        request = request.json(&body);
    }
    let res = request
        .send()
        .await
        .with_context(|| format!("request {url}"))?;
    let status = res.status();
    let body = res.text().await?;
    println!("status: {status}");
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_defaults_to_local_port_5000() {
        let cli = Cli::parse_from(["ledger-cli", "mine"]);
        assert_eq!(cli.node, "http://127.0.0.1:5000");
        assert_eq!(cli.cmd.method_and_path(), (Method::GET, "/mine"));
    }

    #[test]
    fn submit_builds_transaction_body() {
        let cli = Cli::parse_from([
            "ledger-cli",
            "submit",
            "--origin",
            "A",
            "--destination",
            "B",
            "--amount",
            "-3",
            "--node",
            "http://10.0.0.2:5001/",
        ]);
        assert_eq!(endpoint(&cli.node, "/transactions/new"), "http://10.0.0.2:5001/transactions/new");
        assert_eq!(
            cli.cmd.body(),
            Some(json!({ "origin": "A", "destination": "B", "amount": -3 }))
        );
    }

    #[test]
    fn register_lists_peers() {
        let cli = Cli::parse_from(["ledger-cli", "register", "http://a:1", "http://b:2"]);
        assert_eq!(
            cli.cmd.body(),
            Some(json!({ "node_addresses": ["http://a:1", "http://b:2"] }))
        );
        assert!(Cli::try_parse_from(["ledger-cli", "register"]).is_err());
    }
}

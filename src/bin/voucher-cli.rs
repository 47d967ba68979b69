use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "voucher-cli")]
#[command(about = "Management CLI for the voucher relayer", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Publisher wallet address for the statistics commands
    #[arg(short, long)]
    address: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Redeem a voucher by minting to an address
    Mint {
        #[arg(long)]
        dest: String,
        #[arg(long)]
        code: String,
    },
    /// Show whether a voucher is still redeemable
    Verify {
        #[arg(long)]
        code: String,
    },
    /// Address a redeemed voucher minted to
    Binding {
        #[arg(long)]
        code: String,
    },
    /// Check whether --address holds the publisher role
    CheckAccess,
    /// Cumulative daily sales (publisher only)
    Stats,
    /// Latest redemption attempts (publisher only)
    Recent {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Relayer addresses and cached nonces
    Pool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Mint { dest, code } => {
            client
                .post(format!("{}/relay/mint", base))
                .json(&json!({ "dest": dest, "codeHash": code }))
                .send()
                .await?
        }
        Commands::Verify { code } => {
            client
                .get(format!("{}/relay/verify", base))
                .query(&[("codeHash", code)])
                .send()
                .await?
        }
        Commands::Binding { code } => {
            client
                .get(format!("{}/relay/binding", base))
                .query(&[("codeHash", code)])
                .send()
                .await?
        }
        Commands::CheckAccess => {
            let req = client.get(format!("{}/api/admin/check-access", base));
            with_address(req, cli.address.as_deref()).send().await?
        }
        Commands::Stats => {
            let req = client.get(format!("{}/api/v1/stats/sales", base));
            with_address(req, cli.address.as_deref()).send().await?
        }
        Commands::Recent { limit } => {
            let req = client
                .get(format!("{}/api/v1/stats/recent", base))
                .query(&[("limit", limit)]);
            with_address(req, cli.address.as_deref()).send().await?
        }
        Commands::Pool => client.get(format!("{}/relay/pool", base)).send().await?,
    };
    print_response(res).await
}

fn with_address(req: reqwest::RequestBuilder, address: Option<&str>) -> reqwest::RequestBuilder {
    match address {
        Some(address) => req.bearer_auth(address),
        None => req,
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    // Error bodies are JSON too; fall back to raw text for anything else
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => {
            let pretty = serde_json::to_string_pretty(&json)?;
            if status.is_success() {
                println!("{}", pretty);
            } else {
                eprintln!("Error: relayer returned status {}", status);
                eprintln!("{}", pretty);
                std::process::exit(1);
            }
        }
        Err(_) => {
            eprintln!("Error: relayer returned status {}", status);
            eprintln!("Response: {}", text);
            std::process::exit(1);
        }
    }
    Ok(())
}

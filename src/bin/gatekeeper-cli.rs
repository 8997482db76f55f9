use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gatekeeper-cli")]
#[command(about = "Management CLI for the admission gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(short, long, default_value = "admin-secret-key")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway status
    Status,
    /// List blacklist and whitelist contents
    Blacklist,
    /// Add an address to the blacklist
    Block { address: String },
    /// Remove an address from the blacklist
    Unblock { address: String },
    /// View rate limiter statistics
    RateLimit {
        /// How many top clients to show
        #[arg(short, long)]
        top: Option<usize>,
    },
    /// Reset the rate-limit record for a client key
    Reset { key: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    match cli.command {
        Commands::Status => {
            let res = client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Blacklist => {
            let res = client
                .get(format!("{}/admin/blacklist", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Block { address } => {
            let res = client
                .post(format!("{}/admin/blacklist", cli.url))
                .headers(headers)
                .json(&json!({ "address": address }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Unblock { address } => {
            let res = client
                .delete(format!("{}/admin/blacklist/{}", cli.url, address))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::RateLimit { top } => {
            let mut url = format!("{}/admin/rate-limit", cli.url);
            if let Some(top) = top {
                url.push_str(&format!("?top={}", top));
            }
            let res = client.get(url).headers(headers).send().await?;
            print_response(res).await?;
        }
        Commands::Reset { key } => {
            let res = client
                .delete(format!("{}/admin/rate-limit/{}", cli.url, key))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

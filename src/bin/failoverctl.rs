use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::RequestBuilder;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "failoverctl")]
#[command(about = "Management CLI for the failover control daemon", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081", env = "FAILOVER_ADMIN_URL")]
    url: String,

    #[arg(short, long, env = "FAILOVER_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daemon version and pending recoveries
    Status,
    /// State counts for every pool
    Pools,
    /// Full snapshot of one pool
    Pool { service: String },
    /// Aggregate failover metrics
    Metrics,
    /// Recent failover events, newest first
    Events {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Mark an instance failed and fail over
    Fail { service: String, instance: String },
    /// Probe a failed instance immediately
    Recover { service: String, instance: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", cli.key))?);

    let base = cli.url.trim_end_matches('/');
    let request: RequestBuilder = match &cli.command {
        Commands::Status => client.get(format!("{}/admin/status", base)),
        Commands::Pools => client.get(format!("{}/admin/pools", base)),
        Commands::Pool { service } => client.get(format!("{}/admin/pools/{}", base, service)),
        Commands::Metrics => client.get(format!("{}/admin/metrics", base)),
        Commands::Events { limit } => client.get(format!("{}/admin/events", base)).query(&[("limit", limit)]),
        Commands::Fail { service, instance } => {
            client.post(format!("{}/admin/pools/{}/instances/{}/fail", base, service, instance))
        }
        Commands::Recover { service, instance } => {
            client.post(format!("{}/admin/pools/{}/instances/{}/recover", base, service, instance))
        }
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

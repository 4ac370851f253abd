use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "rotator-cli")]
#[command(about = "Client for the proxy-rotator admin API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8082")]
    url: String,

    /// Admin API key (`admin.api_key`)
    #[arg(short, long)]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check rotator status
    Status,
    /// Show every task's last outcome and active node
    Tasks,
    /// List monitored services with summaries
    Services,
    /// Show summary and node ranking for one service
    Stats { group: String, service: String },
    /// Delete all recorded statistics
    ClearStats {
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );
    let client = reqwest::Client::builder()
        .default_headers(headers)
        .no_proxy()
        .build()?;
    let base = cli.url.trim_end_matches('/');

    let (method, path) = match &cli.command {
        Commands::Status => (Method::GET, "/admin/status".to_string()),
        Commands::Tasks => (Method::GET, "/admin/tasks".to_string()),
        Commands::Services => (Method::GET, "/admin/services".to_string()),
        Commands::Stats { group, service } => {
            let mut url = reqwest::Url::parse(base)?;
            url.path_segments_mut()
                .map_err(|_| "admin URL cannot be a base")?
                .pop_if_empty()
                .extend(["admin", "stats", group.as_str(), service.as_str()]);
            let res = client.get(url).send().await?;
            return print_response(res).await;
        }
        Commands::ClearStats { yes } => {
            if !yes {
                eprintln!("Refusing to delete statistics without --yes");
                std::process::exit(1);
            }
            (Method::DELETE, "/admin/stats".to_string())
        }
    };

    let res = client
        .request(method, format!("{}{}", base, path))
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            if !text.is_empty() {
                eprintln!("Response: {}", text);
            }
        }
        std::process::exit(1);
    }

    let text = res.text().await?;
    if text.is_empty() {
        println!("OK ({})", status);
        return Ok(());
    }
    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

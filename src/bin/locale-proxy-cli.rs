use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "locale-proxy-cli")]
#[command(about = "Operator CLI for a running locale gateway", long_about = None)]
struct Cli {
    /// Base URL of the gateway.
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Refresh callback path configured on the gateway.
    #[arg(long, default_value = "/_locale_callback")]
    callback: String,

    /// Purge key (`site.purge_key`).
    #[arg(short, long)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-fetch site metadata
    Refresh,
    /// Purge the page cache, or a single page when both --page and --locale are given
    Purge {
        #[arg(long)]
        page: Option<String>,
        #[arg(long)]
        locale: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Refresh => client.post(format!("{}{}", base, cli.callback)).send().await?,
        Commands::Purge { page, locale } => {
            let mut query = Vec::new();
            if let (Some(page), Some(locale)) = (page, locale) {
                query.push(("url", page));
                query.push(("locale", locale));
            }
            let Some(key) = cli.key else {
                eprintln!("Error: purging requires --key");
                std::process::exit(1);
            };
            client
                .post(format!("{}{}/purge", base, cli.callback))
                .bearer_auth(key)
                .query(&query)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        eprintln!("Response: {}", text);
        std::process::exit(1);
    }
    println!("{}", text);
    Ok(())
}

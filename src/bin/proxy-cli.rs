use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Control CLI for retarget-proxy", long_about = None)]
struct Cli {
    /// Base URL of the proxy
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Control path
    #[arg(short, long, default_value = "/proxy_target")]
    path: String,

    /// Bearer key, when the control plane requires one
    #[arg(short, long)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current default target
    Get,
    /// Point the proxy at a new default target
    Set {
        /// Absolute http(s) URL
        target: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let endpoint = format!("{}{}", cli.url.trim_end_matches('/'), cli.path);

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", key))?,
        );
    }

    let res = match cli.command {
        Commands::Get => client.get(&endpoint).headers(headers).send().await?,
        Commands::Set { target } => {
            client
                .post(&endpoint)
                .query(&[("target", target)])
                .headers(headers)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: control endpoint returned status {}", status);
        eprint!("{}", text);
        std::process::exit(1);
    }
    print!("{}", text);
    Ok(())
}

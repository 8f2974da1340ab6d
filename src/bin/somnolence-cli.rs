use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "somnolence-cli")]
#[command(about = "Client for a running somnolence server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    /// Bearer token sent with every request.
    #[arg(short, long)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every route's declared schemas
    Schema {
        #[arg(long, default_value = "/__schema")]
        path: String,
    },
    /// Call a route
    Call {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        method: String,
        /// Route path, optionally with a query string
        path: String,
        /// JSON request body
        #[arg(short, long)]
        body: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    if let Some(token) = &cli.token {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))?,
        );
    }

    match cli.command {
        Commands::Schema { path } => {
            let res = client
                .get(format!("{}/{}", base, path.trim_start_matches('/')))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Call { method, path, body } => {
            let method = reqwest::Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;
            let mut req = client
                .request(method, format!("{}/{}", base, path.trim_start_matches('/')))
                .headers(headers);
            if let Some(body) = body {
                // Fail early on malformed JSON instead of letting the server reject it.
                let parsed: Value = serde_json::from_str(&body)?;
                req = req
                    .header(CONTENT_TYPE, "application/json")
                    .body(parsed.to_string());
            }
            print_response(req.send().await?).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let is_json = res
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        eprintln!("Response: {}", text);
        return Ok(());
    }

    if is_json {
        let json: Value = serde_json::from_str(&text)?;
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!("{}", text);
    }
    Ok(())
}

use serde_json::json;
use signet_rest::{ApiClient, ClientConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Reads API_HOST, API_API_KEY and optionally API_SIGNATURE_KEY (from .env if present)
    #[cfg(feature = "env-file")]
    let config = ClientConfig::from_env_file("API")?;
    #[cfg(not(feature = "env-file"))]
    let config = ClientConfig::from_env("API")?;
    let client = ApiClient::new(config)?;

    client.debug_start();

    println!("Sending mirror request...");
    match client.post("/api/v1/mirror", &json!({"foo": "Bar"})).await {
        Ok(response) => {
            println!("Status: {}", response.status_code());
            println!("Body: {}", response.text());
        }
        Err(e) => {
            println!("Request failed: {}", e);
        }
    }

    client.debug_stop();

    let report = client.debug_report();
    println!("Debug: {} request(s) in {:.3}s", report.count, report.time);
    for entry in &report.trace {
        println!("  {} {}", entry.timestamp, entry.message);
    }

    Ok(())
}

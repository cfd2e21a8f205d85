//! End-to-end demo: submit an invoice access key, poll the job, and answer
//! a captcha from stdin if the portal asks for one.
//!
//! Run against a local portal:
//!
//! ```sh
//! cargo run --example poll_job -- <44-digit-access-key>
//! ```

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use invoice_jobs::{JobClient, JobInput};
use portal_client::PortalClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let access_key = std::env::args()
        .nth(1)
        .ok_or("usage: poll_job <access-key>")?;
    let base_url = std::env::var("PORTAL_URL").unwrap_or_else(|_| "http://localhost:8080/api".into());

    let portal = Arc::new(PortalClient::new(base_url)?);
    let client = JobClient::new(portal.clone(), portal.clone(), portal);

    let job_id = client.create(JobInput::new(access_key)).await?;
    println!("job {job_id} created, waiting...");

    let mut updates = client.subscribe();
    loop {
        let state = updates.wait_for(|s| !s.is_processing()).await?.clone();

        if state.is_awaiting_verification() {
            let challenge = state.challenge().expect("awaiting job carries a challenge");
            println!(
                "captcha required (challenge {}, {} base64 bytes)",
                challenge.id,
                challenge.image.len()
            );
            print!("solution: ");
            io::stdout().flush()?;

            let mut solution = String::new();
            io::stdin().lock().read_line(&mut solution)?;

            match client.resolve_captcha(solution.trim()).await {
                // The snapshot only moves off the challenge on the next
                // poll; wait for that before checking the phase again.
                Ok(()) => {
                    updates.wait_for(|s| !s.is_awaiting_verification()).await?;
                }
                Err(err) => eprintln!("captcha rejected: {err}"),
            }
            continue;
        }

        if state.is_completed() {
            println!(
                "{}",
                serde_json::to_string_pretty(state.result().unwrap_or(&serde_json::Value::Null))?
            );
        } else if let Some(error) = state.error() {
            eprintln!("job failed: {error}");
        }
        return Ok(());
    }
}

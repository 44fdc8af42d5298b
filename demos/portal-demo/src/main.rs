use std::time::Duration;

use portal::prelude::*;
use tracing_subscriber::EnvFilter;

/// Inactivity window used by the walkthrough, short enough to watch.
const DEMO_TIMEOUT_SECS: u64 = 5;

// ---------------------------------------------------------------------------
// Walkthrough
// ---------------------------------------------------------------------------

/// Runs a scripted visit and returns the page shown at each step.
///
/// 1. Anonymous visitor opens the dashboard and lands on the login page.
/// 2. Alice signs in with a passkey and reaches the dashboard.
/// 3. She keeps typing for a while; the session stays up.
/// 4. She walks away; the session times out and the next navigation
///    goes back to the login page.
async fn walkthrough(portal: &Portal) -> Result<Vec<Navigation>, PortalError> {
    let mut pages = Vec::new();

    pages.push(portal.navigate("/dashboard").await);

    portal
        .store()
        .store_credential(
            CredentialRecord {
                id: "cred-alice".into(),
                raw_id: "Y3JlZC1hbGljZQ".into(),
                credential_type: "public-key".into(),
                response: serde_json::json!({}),
            },
            "alice",
        )
        .await?;
    portal
        .login(
            User::named("alice").with_id("u-1").with_display_name("Alice"),
            "cred-alice",
        )
        .await?;
    pages.push(portal.navigate("/dashboard").await);

    for _ in 0..3 {
        tokio::time::sleep(Duration::from_secs(DEMO_TIMEOUT_SECS - 2)).await;
        portal.activity().emit(ActivitySignal::KeyPress);
    }
    pages.push(portal.navigate("/security").await);

    tokio::time::sleep(Duration::from_secs(DEMO_TIMEOUT_SECS + 1)).await;
    pages.push(portal.navigate("/profile").await);

    Ok(pages)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let portal = Portal::builder()
        .timeout_secs(DEMO_TIMEOUT_SECS)
        .secret(b"portal-demo-secret-do-not-reuse".to_vec())
        .build()?;

    for page in walkthrough(&portal).await? {
        tracing::info!(
            path = %page.path,
            title = %page.title,
            redirected = page.redirected,
            "page shown"
        );
    }

    for entry in portal.store().events().await {
        println!("{}", serde_json::to_string(&entry)?);
    }

    portal.teardown();
    Ok(())
}

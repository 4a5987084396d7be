use std::sync::Arc;

use syllabus_client::{
    api::{self, Page},
    auth::TracingNavigator,
    config::Config,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    info!(message = "Starting", api_url = %config.api_url, proactive_refresh = config.proactive_refresh);

    let (client, session) = syllabus_client::bootstrap(&config, Arc::new(TracingNavigator))?;

    if let Some((access_token, refresh_token)) = &config.initial_tokens {
        let user = session.login(access_token, refresh_token)?;
        info!(message = "Session started", email = ?user.email, role = ?user.role);
    } else if session.current_user().is_none() {
        warn!("No stored session, requests will be sent unauthenticated");
    }

    let courses: serde_json::Value = api::courses::list(&client, Page::default()).await?;
    println!("{}", serde_json::to_string_pretty(&courses)?);

    Ok(())
}

use std::{collections::HashMap, time::Duration};

use clap::Parser;
use tokenwell::{config::keys, ClientId, ClientSecret, CredentialProvider, TokenStatus};
use tokenwell_clock::DurationSecs;
use tokio::time;

#[derive(Debug, Parser)]
struct Opts {
    /// The client ID of the client
    #[arg(short, long, env)]
    client_id: ClientId,

    /// The client secret used to identify the client to the issuing authority
    #[arg(short = 's', long, env, hide_env_values = true)]
    client_secret: ClientSecret,

    /// The deployment to request tokens from (`live` or `sandbox`)
    #[arg(short, long, env, default_value = "sandbox")]
    mode: String,

    /// Overrides the token endpoint base URL
    #[arg(short, long, env)]
    endpoint: Option<String>,

    /// Renew tokens this many seconds before they expire
    #[arg(short = 'g', long, env, default_value_t = 120)]
    safety_gap: u64,

    /// How often to ask the provider for a token, in seconds
    #[arg(short, long, default_value_t = 5)]
    interval: u64,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();

    let mut config = HashMap::new();
    config.insert(keys::MODE.to_owned(), opts.mode);
    if let Some(endpoint) = opts.endpoint {
        config.insert(keys::OAUTH_ENDPOINT.to_owned(), endpoint);
    }

    let provider = CredentialProvider::with_reqwest(config, opts.client_id, opts.client_secret)?
        .with_expiration_safety_gap(DurationSecs(opts.safety_gap));

    let mut interval = time::interval(Duration::from_secs(opts.interval));
    loop {
        interval.tick().await;

        let status = provider.token_status();
        match provider.access_token().await {
            Ok(token) => {
                let level_hint = match status {
                    TokenStatus::Fresh => "cached",
                    TokenStatus::Expired | TokenStatus::Absent => "renewed",
                };
                tracing::info!(
                    token = format_args!("{:#?}", token),
                    app_id = provider.application_id().as_ref().map(|a| a.as_str()),
                    expires_in = provider.access_token_expiration().map(|d| d.0),
                    issued = provider.access_token_last_creation().map(|t| t.0),
                    "{} access token",
                    level_hint,
                );
            }
            Err(error) if error.is_retryable() => {
                tracing::warn!(
                    error = (&error as &dyn std::error::Error),
                    "unable to obtain token, will retry"
                );
            }
            Err(error) => return Err(error.into()),
        }
    }
}

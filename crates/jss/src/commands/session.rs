//! Commands that authenticate without touching a resource.

use jss_api::{ConnectorConfig, ScrapedResource, ScraperConnector, UapiConnector};

use crate::cli::LoginArgs;
use crate::error::CliError;

/// Bootstrap a session, request a token, and report its expiry.
pub async fn token(config: ConnectorConfig) -> Result<(), CliError> {
    let api = UapiConnector::new(config)?;
    api.init_session_id().await?;
    let token = api.create_token().await?;

    match token.expires() {
        Some(at) => println!("Token issued, expires {}", at.to_rfc3339()),
        None => println!("Token issued (no expiry reported)"),
    }
    Ok(())
}

/// Sign in to the web UI; with a page, list the forms found on it.
pub async fn login(config: ConnectorConfig, args: LoginArgs) -> Result<(), CliError> {
    let web = ScraperConnector::new(config)?;
    web.login().await?;
    eprintln!("Logged in");

    let page = if args.jcds {
        Some(web.fetch_resource(ScrapedResource::JcdsConfiguration).await?)
    } else if let Some(ref path) = args.page {
        Some(web.fetch_page(path).await?)
    } else {
        None
    };

    if let Some(page) = page {
        for form in page.forms() {
            println!(
                "form {} {}",
                form.method,
                form.action.as_deref().unwrap_or("(same page)")
            );
            for (name, value) in &form.fields {
                println!("  {name} = {value}");
            }
        }
    }
    Ok(())
}

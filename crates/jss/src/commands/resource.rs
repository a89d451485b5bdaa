//! get / post / put / delete over either API.

use std::path::Path;

use serde_json::Value;

use jss_api::{ConnectorConfig, Element, UapiConnector, XmlApiConnector};

use crate::cli::{Api, DeleteArgs, GetArgs, PostArgs, PutArgs};
use crate::error::CliError;

pub async fn get(config: ConnectorConfig, args: GetArgs) -> Result<(), CliError> {
    match args.api {
        Api::Classic => {
            let api = XmlApiConnector::new(config)?;
            let document = api.get(&args.path).await?;
            println!("{document}");
        }
        Api::Uapi => {
            let api = UapiConnector::new(config)?;
            let value: Value = api.get(&args.path).await?;
            print_json(&value)?;
        }
    }
    Ok(())
}

pub async fn post(config: ConnectorConfig, args: PostArgs) -> Result<(), CliError> {
    match args.api {
        Api::Classic => {
            let Some(kind) = args.kind else {
                return Err(CliError::Validation {
                    field: "kind".into(),
                    reason: "--kind is required for Classic API posts".into(),
                });
            };
            let path = args.path.unwrap_or_else(|| kind.create_path());
            let document = read_xml(&args.file)?;

            let api = XmlApiConnector::new(config)?;
            let created = api.post(kind, &path, &document).await?;
            eprintln!("Created {kind} {}", created.id);
            println!("{}", created.document);
        }
        Api::Uapi => {
            let Some(path) = args.path else {
                return Err(CliError::Validation {
                    field: "path".into(),
                    reason: "a path is required for UAPI posts".into(),
                });
            };
            let body = read_json(&args.file)?;

            let api = UapiConnector::new(config)?;
            let value: Value = api.post(&path, &body).await?;
            print_json(&value)?;
        }
    }
    Ok(())
}

pub async fn put(config: ConnectorConfig, args: PutArgs) -> Result<(), CliError> {
    match args.api {
        Api::Classic => {
            let document = read_xml(&args.file)?;
            let api = XmlApiConnector::new(config)?;
            api.put(&args.path, &document).await?;
            eprintln!("Updated {}", args.path);
        }
        Api::Uapi => {
            let body = read_json(&args.file)?;
            let api = UapiConnector::new(config)?;
            let value: Value = api.put(&args.path, &body).await?;
            print_json(&value)?;
        }
    }
    Ok(())
}

pub async fn delete(config: ConnectorConfig, args: DeleteArgs) -> Result<(), CliError> {
    match args.api {
        Api::Classic => {
            let payload = args.file.as_deref().map(read_xml).transpose()?;
            let api = XmlApiConnector::new(config)?;
            api.delete(&args.path, payload.as_ref()).await?;
        }
        Api::Uapi => {
            if args.file.is_some() {
                return Err(CliError::Validation {
                    field: "file".into(),
                    reason: "UAPI deletions take no payload".into(),
                });
            }
            let api = UapiConnector::new(config)?;
            api.delete(&args.path).await?;
        }
    }
    eprintln!("Deleted {}", args.path);
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────────

fn read_xml(path: &Path) -> Result<Element, CliError> {
    let text = std::fs::read_to_string(path)?;
    Element::parse(&text).map_err(|e| CliError::Validation {
        field: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn read_json(path: &Path) -> Result<Value, CliError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

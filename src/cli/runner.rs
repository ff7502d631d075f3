//! CLI runner - executes commands

use crate::catalog::{discover, Catalog};
use crate::cli::commands::{Cli, Commands};
use crate::config::TapConfig;
use crate::engine::SyncEngine;
use crate::error::{Error, Result};
use crate::store::{DocumentStore, FirestoreStore};
use serde_json::{json, Value};
use std::io::{self, BufWriter, Write};
use std::sync::Arc;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command against Firestore, writing to stdout
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;
        let store: Arc<dyn DocumentStore> = Arc::new(FirestoreStore::from_config(&config)?);

        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        self.execute(store, config, &mut out).await
    }

    /// Run the CLI command against the given store
    pub async fn execute<W: Write>(
        &self,
        store: Arc<dyn DocumentStore>,
        config: TapConfig,
        out: &mut W,
    ) -> Result<()> {
        match &self.cli.command {
            Commands::Check => self.check(store.as_ref(), out).await,
            Commands::Discover => self.discover(store.as_ref(), out).await,
            Commands::Read { .. } => self.read(store, config, out).await,
        }
    }

    /// Load the tap configuration
    fn load_config(&self) -> Result<TapConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Config file not specified (use --config)"))?;
        TapConfig::from_file(path)
    }

    /// Check connectivity by listing collections
    async fn check<W: Write>(&self, store: &dyn DocumentStore, out: &mut W) -> Result<()> {
        match store.list_collections().await {
            Ok(collections) => {
                output_message(
                    out,
                    &json!({
                        "type": "CONNECTION_STATUS",
                        "connectionStatus": {
                            "status": "SUCCEEDED",
                            "message": format!("Found {} collections", collections.len())
                        }
                    }),
                )?;
                Ok(())
            }
            Err(e) => {
                output_message(
                    out,
                    &json!({
                        "type": "CONNECTION_STATUS",
                        "connectionStatus": {
                            "status": "FAILED",
                            "message": format!("Connection failed: {e}")
                        }
                    }),
                )?;
                Err(e)
            }
        }
    }

    /// Print the discovered catalog
    async fn discover<W: Write>(&self, store: &dyn DocumentStore, out: &mut W) -> Result<()> {
        let catalog = discover(store).await?;
        serde_json::to_writer_pretty(&mut *out, &catalog)?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }

    /// Sync the selected streams
    async fn read<W: Write>(
        &self,
        store: Arc<dyn DocumentStore>,
        config: TapConfig,
        out: &mut W,
    ) -> Result<()> {
        let catalog = match &self.cli.catalog {
            Some(path) => Catalog::from_file(path)?,
            None => discover(store.as_ref()).await?,
        };

        let selected = self.cli.command.selected_streams();
        let catalog = if selected.is_empty() {
            catalog
        } else {
            catalog.select(&selected)?
        };
        info!("Syncing streams: {}", catalog.names().join(", "));

        let mut engine = SyncEngine::new(store, config);
        engine.sync(&catalog, out).await?;
        Ok(())
    }
}

fn output_message<W: Write>(out: &mut W, msg: &Value) -> Result<()> {
    writeln!(out, "{}", serde_json::to_string(msg)?)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Document, MemoryStore};
    use clap::Parser;
    use pretty_assertions::assert_eq;

    fn store() -> Arc<dyn DocumentStore> {
        Arc::new(
            MemoryStore::new()
                .with_collection(
                    "orders",
                    vec![
                        Document::from_value("o1", json!({"total": 10})),
                        Document::from_value("o2", json!({"total": 20})),
                    ],
                )
                .with_collection("users", vec![Document::from_value("u1", json!({}))]),
        )
    }

    fn config() -> TapConfig {
        TapConfig {
            service_account_path: "key.json".to_string(),
            ..TapConfig::default()
        }
        .with_pagination_field("orders", "total")
        .with_pagination_limit(1)
    }

    async fn run(args: &[&str]) -> (Result<()>, Vec<Value>) {
        let mut argv = vec!["tap-firestore"];
        argv.extend_from_slice(args);
        let runner = Runner::new(Cli::parse_from(argv));

        let mut out = Vec::new();
        let result = runner.execute(store(), config(), &mut out).await;
        let text = String::from_utf8(out).unwrap();
        let values = serde_json::Deserializer::from_str(&text)
            .into_iter::<Value>()
            .map(|v| v.unwrap())
            .collect();
        (result, values)
    }

    #[tokio::test]
    async fn test_check_reports_success() {
        let (result, output) = run(&["check"]).await;

        assert!(result.is_ok());
        assert_eq!(output[0]["connectionStatus"]["status"], "SUCCEEDED");
        assert_eq!(
            output[0]["connectionStatus"]["message"],
            "Found 2 collections"
        );
    }

    #[tokio::test]
    async fn test_discover_prints_catalog() {
        let (result, output) = run(&["discover"]).await;

        assert!(result.is_ok());
        let catalog: Catalog = serde_json::from_value(output[0].clone()).unwrap();
        assert_eq!(catalog.names(), vec!["orders", "users"]);
    }

    #[tokio::test]
    async fn test_read_selected_streams() {
        let (result, output) = run(&["read", "--streams", "orders"]).await;

        assert!(result.is_ok());
        let ids: Vec<&str> = output
            .iter()
            .filter(|m| m["type"] == "RECORD")
            .map(|m| m["record"]["_id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["o1", "o2"]);
        assert!(output.iter().all(|m| m["stream"] == "orders"));
    }

    #[tokio::test]
    async fn test_read_unknown_stream_fails() {
        let (result, output) = run(&["read", "--streams", "missing"]).await;

        assert!(matches!(result, Err(Error::StreamNotFound { .. })));
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_read_uses_catalog_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"streams": [{{"tap_stream_id": "users", "stream": "users"}}]}}"#
        )
        .unwrap();
        let catalog_path = file.path().to_str().unwrap().to_string();

        let (result, output) = run(&["--catalog", catalog_path.as_str(), "read"]).await;

        assert!(result.is_ok());
        assert_eq!(output.len(), 2);
        assert_eq!(output[0]["type"], "SCHEMA");
        assert_eq!(output[1]["record"]["_id"], "u1");
    }

    #[test]
    fn test_missing_config_path() {
        let runner = Runner::new(Cli::parse_from(["tap-firestore", "check"]));
        assert!(matches!(runner.load_config(), Err(Error::Config { .. })));
    }
}

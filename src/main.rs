//! A thin demo binary wiring the archive connector to a real `scylla`
//! session. Configuration-file parsing and process wiring are out of scope;
//! flags here are the minimum needed to exercise the connector from the
//! command line.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::Parser;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use tsarchive::config::ConnectorConfig;
use tsarchive::connector::ArchiveConnector;
use tsarchive::driver::scylla_driver::ScyllaDriver;
use tsarchive::series::render;

#[derive(Parser, Debug)]
#[command(about = "Fetch a time-series attribute from the archive")]
struct Cli {
    /// Comma-separated contact points, e.g. "127.0.0.1,127.0.0.2".
    #[arg(long, default_value = "127.0.0.1")]
    contact_points: String,

    #[arg(long, default_value = "hdbpp")]
    keyspace: String,

    /// Zone "today" is decided in.
    #[arg(long, default_value = "UTC")]
    zone: String,

    /// Fully-qualified attribute name, `cs/domain/family/member/attr`.
    attribute: String,

    #[arg(long)]
    from: Option<DateTime<Utc>>,

    #[arg(long)]
    to: Option<DateTime<Utc>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let zone = Tz::from_str(&cli.zone).map_err(|e| anyhow::anyhow!("invalid zone {}: {e}", cli.zone))?;
    let contact_points: Vec<String> = cli.contact_points.split(',').map(str::to_string).collect();

    info!(attribute = %cli.attribute, "connecting to archive");
    let driver = Arc::new(ScyllaDriver::connect(&contact_points, &cli.keyspace).await?);
    let config = ConnectorConfig::new(contact_points, cli.keyspace, zone);
    let connector = ArchiveConnector::new(driver, config, tokio::runtime::Handle::current()).await;

    let series = connector
        .get_attribute_data(&cli.attribute, cli.from, cli.to)
        .await?;
    print!("{}", render::render_csv(&cli.attribute, &series));
    Ok(())
}

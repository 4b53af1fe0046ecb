//! Run one search and print its pages

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use clp_session::{Page, SessionManager};
use tracing::debug;

use super::connect_driver;
use crate::config::ClpConfig;
use crate::tools::SearchTools;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// KQL query
    pub query: String,

    /// Start of the time range: epoch milliseconds or RFC 3339
    #[arg(long, value_parser = parse_timestamp, default_value = "0")]
    pub begin: i64,

    /// End of the time range: epoch milliseconds or RFC 3339 [default: now]
    #[arg(long, value_parser = parse_timestamp)]
    pub end: Option<i64>,

    /// Zero-based page to print
    #[arg(long, default_value_t = 0, conflicts_with = "all")]
    pub page: usize,

    /// Print every page
    #[arg(long)]
    pub all: bool,
}

/// Parse epoch milliseconds or an RFC 3339 timestamp into epoch milliseconds.
pub fn parse_timestamp(value: &str) -> Result<i64, String> {
    let value = value.trim();
    if let Ok(ms) = value.parse::<i64>() {
        return Ok(ms);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| format!("expected epoch milliseconds or an RFC 3339 timestamp: {e}"))
}

fn print_page(page: &Page) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(page)?);
    Ok(())
}

pub async fn run(args: SearchArgs, config: &ClpConfig) -> Result<()> {
    let driver = connect_driver(config).await?;
    let sessions = Arc::new(SessionManager::new(config.session.clone()));
    let tools = SearchTools::new(driver, sessions);

    let session_id = uuid::Uuid::new_v4().to_string();
    tools.get_instructions(&session_id).await;

    let end = args.end.unwrap_or_else(|| Utc::now().timestamp_millis());
    debug!(query = %args.query, begin = args.begin, end, "Running search");
    let first = tools
        .search_page(&session_id, &args.query, args.begin, end)
        .await?;

    if args.all {
        print_page(&first)?;
        let mut has_next = first.has_next;
        let mut index = 1;
        while has_next {
            let page = tools.page(&session_id, index).await?;
            print_page(&page)?;
            has_next = page.has_next;
            index += 1;
        }
    } else if args.page == 0 {
        print_page(&first)?;
    } else {
        print_page(&tools.page(&session_id, args.page).await?)?;
    }
    Ok(())
}

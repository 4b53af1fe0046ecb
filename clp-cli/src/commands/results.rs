use anyhow::Result;
use clap::Args;
use clp_query::{JobId, clean_record};

use super::connect_driver;
use crate::config::ClpConfig;

#[derive(Args, Debug)]
pub struct ResultsArgs {
    /// Query job id
    pub job_id: JobId,

    /// Keep store-internal fields such as `_id`
    #[arg(long)]
    pub raw: bool,
}

/// Print the job's records as JSON lines, in store order.
pub async fn run(args: ResultsArgs, config: &ClpConfig) -> Result<()> {
    let driver = connect_driver(config).await?;
    let records = driver.read_results(args.job_id).await?;

    for record in records {
        let line = if args.raw {
            serde_json::to_string(&record)?
        } else {
            serde_json::to_string(&clean_record(record))?
        };
        println!("{line}");
    }
    Ok(())
}

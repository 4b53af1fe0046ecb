use anyhow::Result;
use clap::Args;
use clp_query::JobId;

use super::connect_driver;
use crate::config::ClpConfig;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Query job id
    pub job_id: JobId,

    /// Poll until the job finishes
    #[arg(short, long)]
    pub wait: bool,
}

pub async fn run(args: StatusArgs, config: &ClpConfig) -> Result<()> {
    let driver = connect_driver(config).await?;

    if args.wait {
        driver.await_completion(args.job_id).await?;
    }
    let status = driver.read_status(args.job_id).await?;
    println!("{}: {}", args.job_id, status);
    Ok(())
}

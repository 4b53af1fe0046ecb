//! Serve tool calls as JSON lines over stdin/stdout

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use clp_session::SessionManager;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::connect_driver;
use crate::config::ClpConfig;
use crate::tools::SearchTools;

/// Read one request per line until stdin closes.
///
/// Requests run concurrently, so replies may come back out of order; each
/// reply carries the id of its request.
pub async fn run(config: &ClpConfig) -> Result<()> {
    let driver = connect_driver(config).await?;
    let sessions = Arc::new(SessionManager::new(config.session.clone()));
    let tools = SearchTools::new(driver, Arc::clone(&sessions));

    let cancel = CancellationToken::new();
    let sweeper = {
        let sessions = Arc::clone(&sessions);
        let cancel = cancel.clone();
        let interval = config.session.sweep_interval;
        tokio::spawn(async move { sessions.run_sweeper(interval, cancel).await })
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(reply) = rx.recv().await {
            let mut line = reply.to_string();
            line.push('\n');
            if let Err(e) = stdout.write_all(line.as_bytes()).await {
                warn!(error = %e, "Failed to write reply");
                break;
            }
            stdout.flush().await.ok();
        }
    });

    info!("Serving tool calls on stdin");
    let handler = move |line: String| {
        let tools = tools.clone();
        async move { tools.handle_line(&line).await }
    };
    let summary = serve_lines(BufReader::new(tokio::io::stdin()), handler, tx).await?;
    writer.await?;

    cancel.cancel();
    sweeper.await?;
    info!(
        requests = summary.requests,
        failed = summary.failed,
        "Input closed, stopped serving"
    );
    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ServeSummary {
    requests: usize,
    /// Requests whose task ended without sending a reply.
    failed: usize,
}

/// Run `handler` on every non-blank line of `reader` concurrently and send
/// each reply to `replies`. Finished requests are collected as they end.
/// Returns once the input is closed and every request has finished.
async fn serve_lines<R, H, F>(
    reader: R,
    handler: H,
    replies: mpsc::UnboundedSender<Value>,
) -> Result<ServeSummary>
where
    R: AsyncBufRead + Unpin,
    H: Fn(String) -> F,
    F: Future<Output = Value> + Send + 'static,
{
    let mut lines = reader.lines();
    let mut requests = JoinSet::new();
    let mut summary = ServeSummary::default();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                summary.requests += 1;
                let reply = handler(line);
                let replies = replies.clone();
                requests.spawn(async move {
                    replies.send(reply.await).ok();
                });
            }
            Some(joined) = requests.join_next() => {
                if !request_finished(joined) {
                    summary.failed += 1;
                }
            }
        }
    }

    while let Some(joined) = requests.join_next().await {
        if !request_finished(joined) {
            summary.failed += 1;
        }
    }
    Ok(summary)
}

fn request_finished(joined: Result<(), JoinError>) -> bool {
    match joined {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Request task ended without a reply");
            false
        }
    }
}

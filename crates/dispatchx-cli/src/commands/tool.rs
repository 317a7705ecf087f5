//! Tool-call server over stdio
//!
//! Reads one JSON tool call per line from stdin and writes one JSON response
//! per line to stdout, in order. Blank lines are skipped. Logs go to stderr.

use anyhow::Result;
use dispatchx_engine::tool::handle_tool_line;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::build_engine;
use crate::config::DispatchConfig;

pub async fn execute(config: &DispatchConfig) -> Result<()> {
    let engine = build_engine(config)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    let mut served = 0usize;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_tool_line(&engine, &line).await;
        stdout.write_all(response.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
        served += 1;
    }

    tracing::info!(served, "Tool input closed");
    Ok(())
}

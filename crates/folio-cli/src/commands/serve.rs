//! Stdio host
//!
//! Each stdin line is one request envelope and each stdout line one response
//! envelope. Unparseable lines are logged and dropped. On end of input the
//! queued requests still run and their responses are flushed before exit.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::io::{self, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use folio_core::rpc::{Endpoint, Response};
use folio_core::{Config, Gateway, StoreHandle};

pub async fn run(config: &Config) -> Result<()> {
    let gateway = Gateway::new(Arc::new(StoreHandle::new(config)));
    let Endpoint {
        requests,
        responses,
    } = gateway.spawn();
    info!("Serving requests on stdio");

    let writer = tokio::spawn(write_responses(responses, io::stdout()));

    let mut lines = BufReader::new(io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if let Some(message) = parse_line(&line) {
            if requests.send(message).is_err() {
                break;
            }
        }
    }
    drop(requests);

    writer.await.context("Response writer panicked")??;
    info!("Input closed; exiting");
    Ok(())
}

fn parse_line(line: &str) -> Option<Value> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Dropping unparseable request line: {}", e);
            None
        }
    }
}

async fn write_responses<W>(mut responses: mpsc::UnboundedReceiver<Response>, mut out: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = responses.recv().await {
        let mut line = serde_json::to_vec(&response).context("Failed to encode response")?;
        line.push(b'\n');
        out.write_all(&line).await.context("Failed to write response")?;
        out.flush().await.context("Failed to flush stdout")?;
    }
    Ok(())
}

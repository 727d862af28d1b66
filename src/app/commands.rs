use crate::domain::Record;
use crate::lifecycle::{BootLog, BootLogStats};
use crate::persistence::{LogHeader, LogReader, WorkerReport};
use crate::settings::{RecordingDriverWatch, SettingsTree};
use anyhow::Context;
use serde::Serialize;
use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use super::config::Config;

const WORKER_READY_LIMIT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Serialize)]
pub struct RecordSummary {
    pub submitted: u64,
    pub stats: BootLogStats,
    pub report: Option<WorkerReport>,
}

/// Starts the engine, either from a settings file or unconditionally.
pub fn start_engine(config: &Config) -> anyhow::Result<BootLog> {
    let bootlog = BootLog::new(config.engine_config());
    match &config.settings_file {
        Some(path) => {
            let source = SettingsTree::from_file(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?;
            let watch = RecordingDriverWatch::new();
            let settings = bootlog.init(&source, &watch)?;
            if let Some(driver) = &settings.watched_driver {
                info!(driver = %driver.name, "Driver registered for monitoring");
            }
        }
        None => bootlog.start()?,
    }
    Ok(bootlog)
}

/// Submits every input line as a length-prefixed record until the input
/// ends or `shutdown` resolves, then disables logging.
pub async fn record<R, S>(bootlog: BootLog, input: R, shutdown: S) -> anyhow::Result<RecordSummary>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    if !bootlog.is_enabled() {
        warn!("Boot logging is disabled, records will not be persisted");
    } else if !bootlog.wait_for_worker(WORKER_READY_LIMIT).await {
        warn!("Boot log worker has not opened the log file yet");
    }

    let admission = bootlog.admission();
    let mut lines = input.lines();
    let mut submitted = 0u64;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                admission.submit_blocking(Record::length_prefixed(line.as_bytes())?);
                submitted += 1;
            }
        }
    }

    let report = bootlog.disable().await?;
    let stats = bootlog.stats();
    bootlog.finit().await?;
    info!(submitted, written = stats.records_written, "Recording finished");

    Ok(RecordSummary {
        submitted,
        stats,
        report,
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DumpOptions {
    pub json: bool,
    pub hex: bool,
}

const HEX_PREVIEW_LEN: usize = 32;

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum DumpLine<'a> {
    Header(&'a LogHeader),
    Record {
        index: usize,
        offset: usize,
        len: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        hex: Option<String>,
    },
}

/// Writes the header and one line per record. Returns the record count.
pub async fn dump<W: Write>(path: &Path, options: DumpOptions, out: &mut W) -> anyhow::Result<usize> {
    let mut reader = LogReader::open(path)
        .await
        .with_context(|| format!("Failed to open boot log {}", path.display()))?;
    let header = *reader.header();

    if options.json {
        writeln!(out, "{}", serde_json::to_string(&DumpLine::Header(&header))?)?;
    } else {
        writeln!(
            out,
            "signature={:#010x} version={} architecture={:?}",
            header.signature, header.version, header.architecture
        )?;
    }

    let mut count = 0;
    loop {
        let offset = reader.offset();
        let Some(record) = reader.next() else {
            break;
        };
        let payload =
            record.with_context(|| format!("Corrupt record {count} at offset {offset}"))?;
        let hex = options
            .hex
            .then(|| hex::encode(&payload[..payload.len().min(HEX_PREVIEW_LEN)]));

        if options.json {
            let line = DumpLine::Record {
                index: count,
                offset,
                len: payload.len(),
                hex,
            };
            writeln!(out, "{}", serde_json::to_string(&line)?)?;
        } else {
            match hex {
                Some(hex) => writeln!(out, "#{count} offset={offset} len={} {hex}", payload.len())?,
                None => writeln!(out, "#{count} offset={offset} len={}", payload.len())?,
            }
        }
        count += 1;
    }

    Ok(count)
}

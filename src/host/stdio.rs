//! Stdin/stdout JSON bridge for running the scheduler under a host process.
//!
//! Reads newline-delimited [`InboundEvent`] JSON from the input. Every event
//! is offered to the activity tracker and its text is recorded as a user turn
//! in the conversation store. `/rekindle_talk` runs the manual trigger.
//! Command replies and proactive messages are written to the output as
//! newline-delimited [`BridgeOutput`] JSON.
//!
//! Stdout is exclusively reserved for the JSON protocol; all diagnostic
//! output (tracing, logs) must be routed to stderr.

use crate::commands::Command;
use crate::config::ConfigHandle;
use crate::error::{RekindleError, Result};
use crate::host::conversation::MemoryConversationStore;
use crate::host::traits::{HistoryTurn, MessageChain, MessageSink, ProviderRegistry};
use crate::scheduler::ProactiveScheduler;
use crate::session::{InboundEvent, SessionKey};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// One line written by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BridgeOutput {
    /// Reply to a command from `session`.
    Reply { session: SessionKey, text: String },
    /// Message the scheduler decided to send on its own.
    Proactive { session: SessionKey, text: String },
    /// An input line could not be handled.
    Error { message: String },
}

type SharedWriter<W> = Arc<Mutex<W>>;

/// Serialize `output` as one JSON line and flush.
async fn write_output<W>(writer: &SharedWriter<W>, output: &BridgeOutput) -> Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    let json = serde_json::to_string(output)
        .map_err(|e| RekindleError::Delivery(format!("failed to serialize bridge output: {e}")))?;
    let mut w = writer.lock().await;
    w.write_all(json.as_bytes()).await?;
    w.write_all(b"\n").await?;
    w.flush().await?;
    Ok(())
}

/// Message sink writing proactive messages to the bridge output.
///
/// Delivered text is also recorded as an assistant turn so the next chat
/// prompt sees it in the history.
pub struct JsonLineSink<W> {
    writer: SharedWriter<W>,
    store: Arc<MemoryConversationStore>,
}

impl<W> JsonLineSink<W> {
    pub fn new(writer: SharedWriter<W>, store: Arc<MemoryConversationStore>) -> Self {
        Self { writer, store }
    }
}

#[async_trait]
impl<W> MessageSink for JsonLineSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn send_message(&self, session: &SessionKey, chain: MessageChain) -> anyhow::Result<()> {
        let text = chain.plain_text();
        write_output(
            &self.writer,
            &BridgeOutput::Proactive {
                session: session.clone(),
                text: text.clone(),
            },
        )
        .await?;
        self.store.append(session, HistoryTurn::assistant(text));
        Ok(())
    }
}

/// Bridge settings taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct BridgeOptions {
    /// Sender ids allowed to run admin commands, on top of events that
    /// arrive already flagged as admin.
    pub admins: Vec<String>,
}

/// Run the bridge until the input closes or `shutdown` is cancelled.
///
/// The scan loop runs for the lifetime of the bridge. Manual triggers run off
/// the reader loop and are awaited before returning. Dispatches still
/// deferred at exit are abandoned.
///
/// # Errors
///
/// Returns an error if reading the input or writing the output fails.
pub async fn run_bridge<R, W>(
    config: ConfigHandle,
    providers: Arc<dyn ProviderRegistry>,
    store: Arc<MemoryConversationStore>,
    options: BridgeOptions,
    input: R,
    output: W,
    shutdown: CancellationToken,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let writer: SharedWriter<W> = Arc::new(Mutex::new(output));
    let sink = Arc::new(JsonLineSink::new(Arc::clone(&writer), Arc::clone(&store)));
    let scheduler =
        Arc::new(ProactiveScheduler::builder(config, providers, store.clone(), sink).build());
    let handle = scheduler.start();
    let commands = TaskTracker::new();

    let result = run_reader(
        &scheduler, &store, &options, input, &writer, &commands, &shutdown,
    )
    .await;

    commands.close();
    commands.wait().await;

    if let Some(handle) = handle {
        handle.shutdown().await;
    }
    let pending = scheduler.dispatches().len();
    if pending > 0 {
        tracing::info!(pending, "leaving in-flight dispatches behind");
    }

    result
}

/// Run the bridge on the process's stdin and stdout.
///
/// # Errors
///
/// Returns an error if stdin cannot be read or stdout cannot be written.
pub async fn run_stdio_bridge(
    config: ConfigHandle,
    providers: Arc<dyn ProviderRegistry>,
    store: Arc<MemoryConversationStore>,
    options: BridgeOptions,
    shutdown: CancellationToken,
) -> Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::BufWriter::new(tokio::io::stdout());
    run_bridge(config, providers, store, options, stdin, stdout, shutdown).await
}

async fn run_reader<R, W>(
    scheduler: &Arc<ProactiveScheduler>,
    store: &MemoryConversationStore,
    options: &BridgeOptions,
    mut input: R,
    writer: &SharedWriter<W>,
    commands: &TaskTracker,
    shutdown: &CancellationToken,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("shutdown requested; stopping bridge");
                break;
            }
            read = input.read_line(&mut line) => read?,
        };

        // EOF
        if bytes_read == 0 {
            tracing::info!("input closed (EOF); stopping bridge");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut event: InboundEvent = match serde_json::from_str(trimmed) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, raw_line = %trimmed, "failed to parse inbound event");
                write_output(
                    writer,
                    &BridgeOutput::Error {
                        message: format!("failed to parse inbound event: {e}"),
                    },
                )
                .await?;
                continue;
            }
        };
        if options.admins.iter().any(|a| a == &event.sender_id) {
            event.is_admin = true;
        }

        scheduler.observe(&event);

        match Command::parse(&event.text) {
            // Generation can take minutes; keep reading events meanwhile.
            Some(Command::Talk) => {
                let scheduler = Arc::clone(scheduler);
                let writer = Arc::clone(writer);
                commands.spawn(async move {
                    let reply = scheduler.manual_trigger(&event).await;
                    for text in reply.lines {
                        let output = BridgeOutput::Reply {
                            session: event.session.clone(),
                            text,
                        };
                        if let Err(e) = write_output(&writer, &output).await {
                            tracing::warn!(error = %e, session = %event.session, "failed to write command reply");
                            break;
                        }
                    }
                });
            }
            None if !event.text.trim().is_empty() => {
                store.append(&event.session, HistoryTurn::user(event.text.clone()));
            }
            None => {}
        }
    }

    Ok(())
}

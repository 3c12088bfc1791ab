//! Coordinator handshake client.
//!
//! One connect call owns one control connection, driven by a dedicated
//! background task through the states dial → negotiate → armed → closed.
//! Negotiation sends the session's label filter and expects an `ACK` line;
//! arming means the socket is held open so the coordinator can treat
//! connection loss as the teardown trigger for everything matching the
//! filter. The caller closes the connection through the returned
//! [`HandshakeHandle`].
//!
//! Negotiation failures are retried up to a fixed bound and then discarded:
//! the task arms anyway and the caller never sees the outcome. The discarded
//! failure is observable through the diagnostics channel, a warn log, and
//! the negotiation-failure counter.

use std::collections::BTreeMap;
use std::time::Duration;

use metrics::{counter, gauge};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use custodian_core::metrics::{
    REAPER_ACTIVE_HANDSHAKES, REAPER_HANDSHAKES_ARMED_TOTAL, REAPER_NEGOTIATION_ATTEMPTS_TOTAL,
    REAPER_NEGOTIATION_FAILURES_TOTAL,
};
use custodian_core::types::{Endpoint, SessionId};

use crate::error::ReaperError;
use crate::event::{CleanupEvent, CleanupEventKind};
use crate::labels;

/// Upper bound on establishing the TCP connection to the coordinator.
const DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Total write-flush-read attempts before the task arms without an ACK.
const MAX_NEGOTIATION_ATTEMPTS: u32 = 3;

/// Expected coordinator acknowledgement line.
const ACK_LINE: &str = "ACK\n";

/// Owner of one armed handshake session.
///
/// Holds the one-shot termination sender and the background task's join
/// handle, so signaling closure is an explicit operation on this type.
/// Dropping the handle without signaling leaves the connection (and with it
/// the coordinator's session state) open until the process exits.
#[derive(Debug)]
pub struct HandshakeHandle {
    termination: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl HandshakeHandle {
    /// Signals the task to close the control connection, which is the
    /// coordinator-side teardown trigger, and waits for it to finish.
    pub async fn terminate(self) {
        let _ = self.termination.send(());
        let _ = self.task.await;
    }

    /// Signals teardown without waiting; the returned join handle completes
    /// once the connection is closed.
    pub fn signal(self) -> JoinHandle<()> {
        let _ = self.termination.send(());
        self.task
    }
}

/// Dials the coordinator and spawns the handshake task.
///
/// Returns as soon as the connection is established; negotiation runs in
/// the background. A dial failure is terminal for this call and is never
/// retried.
pub(crate) async fn connect(
    endpoint: &Endpoint,
    session_labels: BTreeMap<String, String>,
    session_id: &SessionId,
    diagnostics: Option<mpsc::Sender<CleanupEvent>>,
) -> Result<HandshakeHandle, ReaperError> {
    let stream = match timeout(DIAL_TIMEOUT, TcpStream::connect(endpoint.as_str())).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            return Err(ReaperError::Dial {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            });
        }
        Err(_) => {
            return Err(ReaperError::Dial {
                endpoint: endpoint.to_string(),
                reason: format!("timed out after {}s", DIAL_TIMEOUT.as_secs()),
            });
        }
    };
    debug!(endpoint = %endpoint, session_id = %session_id, "connected to cleanup coordinator");

    let (termination_tx, termination_rx) = oneshot::channel();
    let filter = labels::filter_expression(&session_labels);
    let session_id = session_id.clone();
    let task = tokio::spawn(async move {
        run_session(stream, filter, session_id, diagnostics, termination_rx).await;
    });

    Ok(HandshakeHandle {
        termination: termination_tx,
        task,
    })
}

async fn run_session(
    stream: TcpStream,
    filter: String,
    session_id: SessionId,
    diagnostics: Option<mpsc::Sender<CleanupEvent>>,
    termination: oneshot::Receiver<()>,
) {
    gauge!(REAPER_ACTIVE_HANDSHAKES).increment(1.0);

    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut writer = BufWriter::new(write_half);

    negotiate(
        &mut reader,
        &mut writer,
        &filter,
        &session_id,
        diagnostics.as_ref(),
    )
    .await;

    counter!(REAPER_HANDSHAKES_ARMED_TOTAL).increment(1);

    if termination.await.is_err() {
        // The handle was dropped without an explicit signal. Teardown fires
        // on connection loss, so the socket must stay open; park forever.
        debug!(
            session_id = %session_id,
            "handshake handle dropped without a termination signal, connection stays armed"
        );
        std::future::pending::<()>().await;
    }

    let _ = writer.shutdown().await;
    drop(reader);
    debug!(session_id = %session_id, "cleanup coordinator connection closed");
    emit(
        diagnostics.as_ref(),
        &session_id,
        CleanupEventKind::ConnectionClosed,
    );
    gauge!(REAPER_ACTIVE_HANDSHAKES).decrement(1.0);
}

/// Runs the negotiation loop. The outcome is not surfaced to the caller;
/// arming proceeds regardless.
async fn negotiate(
    reader: &mut BufReader<OwnedReadHalf>,
    writer: &mut BufWriter<OwnedWriteHalf>,
    filter: &str,
    session_id: &SessionId,
    diagnostics: Option<&mpsc::Sender<CleanupEvent>>,
) {
    for attempt in 1..=MAX_NEGOTIATION_ATTEMPTS {
        counter!(REAPER_NEGOTIATION_ATTEMPTS_TOTAL).increment(1);
        match negotiate_once(reader, writer, filter).await {
            Ok(()) => {
                debug!(
                    session_id = %session_id,
                    attempt,
                    "cleanup coordinator acknowledged session filter"
                );
                emit(
                    diagnostics,
                    session_id,
                    CleanupEventKind::NegotiationAcknowledged { attempts: attempt },
                );
                return;
            }
            Err(reason) => {
                debug!(
                    session_id = %session_id,
                    attempt,
                    reason = %reason,
                    "negotiation attempt failed"
                );
            }
        }
    }

    warn!(
        session_id = %session_id,
        attempts = MAX_NEGOTIATION_ATTEMPTS,
        "cleanup coordinator never acknowledged the session filter, teardown armed but not guaranteed"
    );
    counter!(REAPER_NEGOTIATION_FAILURES_TOTAL).increment(1);
    emit(
        diagnostics,
        session_id,
        CleanupEventKind::NegotiationExhausted {
            attempts: MAX_NEGOTIATION_ATTEMPTS,
        },
    );
}

async fn negotiate_once(
    reader: &mut BufReader<OwnedReadHalf>,
    writer: &mut BufWriter<OwnedWriteHalf>,
    filter: &str,
) -> Result<(), String> {
    writer
        .write_all(filter.as_bytes())
        .await
        .map_err(|e| format!("write: {e}"))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| format!("write: {e}"))?;
    writer.flush().await.map_err(|e| format!("flush: {e}"))?;

    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .await
        .map_err(|e| format!("read: {e}"))?;
    if read == 0 {
        return Err("connection closed before acknowledgement".to_owned());
    }
    if line == ACK_LINE {
        Ok(())
    } else {
        Err(format!("unexpected response: {:?}", line.trim_end()))
    }
}

/// Best-effort diagnostics delivery; a full or closed channel never blocks
/// or fails the handshake.
fn emit(
    diagnostics: Option<&mpsc::Sender<CleanupEvent>>,
    session_id: &SessionId,
    kind: CleanupEventKind,
) {
    if let Some(tx) = diagnostics {
        if tx
            .try_send(CleanupEvent::new(session_id.clone(), kind))
            .is_err()
        {
            debug!("diagnostics channel unavailable, dropping cleanup event");
        }
    }
}

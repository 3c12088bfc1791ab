//! Integration tests -- full cleanup coordination flow.
//!
//! Registry creation → handshake negotiation → armed → termination close,
//! exercised against an in-process mock coordinator over real TCP sockets.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use custodian_core::types::SessionId;
use custodian_reaper::{CleanupEventKind, ReaperOptions, ReaperRegistry};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;

// Mock coordinator and provider for integration tests
mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicU32;

    use custodian_core::types::Endpoint;
    use custodian_reaper::{
        ContainerRequest, ProviderConfig, ProvisionedContainer, ReaperError, ReaperProvider,
    };
    use tokio::sync::oneshot;

    /// In-process stand-in for the watchdog's control endpoint.
    ///
    /// Replies are consumed one per received line; once exhausted the
    /// connection is held open until the client closes it. Every received
    /// line is forwarded on `lines`, and `closed` fires when the client
    /// connection reaches EOF.
    pub struct Coordinator {
        pub endpoint: Endpoint,
        pub lines: mpsc::UnboundedReceiver<String>,
        pub closed: oneshot::Receiver<()>,
    }

    pub async fn spawn_coordinator(replies: Vec<&'static str>) -> Coordinator {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (line_tx, line_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);
            let mut replies = replies.into_iter();
            loop {
                let mut line = String::new();
                match reader.read_line(&mut line).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        let _ = line_tx.send(line);
                        if let Some(reply) = replies.next() {
                            let _ = write_half.write_all(reply.as_bytes()).await;
                            let _ = write_half.flush().await;
                        }
                    }
                }
            }
            let _ = closed_tx.send(());
        });

        Coordinator {
            endpoint: Endpoint::new(addr.to_string()),
            lines: line_rx,
            closed: closed_rx,
        }
    }

    /// Provider double that "runs" the watchdog by pointing at an already
    /// listening mock coordinator.
    pub struct TestProvider {
        endpoint: Endpoint,
        pub runs: AtomicU32,
        pub last_request: Mutex<Option<ContainerRequest>>,
        pub privileged: bool,
        pub default_network: Option<String>,
    }

    impl TestProvider {
        pub fn new(endpoint: Endpoint) -> Self {
            Self {
                endpoint,
                runs: AtomicU32::new(0),
                last_request: Mutex::new(None),
                privileged: false,
                default_network: None,
            }
        }
    }

    pub struct TestContainer {
        endpoint: Endpoint,
    }

    impl ProvisionedContainer for TestContainer {
        async fn port_endpoint(&self, _port: u16) -> Result<Endpoint, ReaperError> {
            Ok(self.endpoint.clone())
        }
    }

    impl ReaperProvider for TestProvider {
        type Container = TestContainer;

        async fn run_container(
            &self,
            request: ContainerRequest,
        ) -> Result<TestContainer, ReaperError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            // The listening-port wait is already satisfied: the mock
            // coordinator accepts connections before the provider runs.
            *self.last_request.lock().unwrap() = Some(request);
            Ok(TestContainer {
                endpoint: self.endpoint.clone(),
            })
        }

        fn config(&self) -> ProviderConfig {
            ProviderConfig {
                privileged_reaper: self.privileged,
            }
        }

        fn default_network(&self) -> Option<String> {
            self.default_network.clone()
        }
    }
}

#[tokio::test]
async fn full_flow_negotiates_and_tears_down() {
    let mut coordinator = mock::spawn_coordinator(vec!["ACK\n"]).await;
    let provider = Arc::new(mock::TestProvider::new(coordinator.endpoint.clone()));
    let (diag_tx, mut diag_rx) = mpsc::channel(16);

    let registry = ReaperRegistry::new();
    let reaper = registry
        .get_or_create(
            SessionId::new("it-session"),
            Arc::clone(&provider),
            ReaperOptions::new().diagnostics_sender(diag_tx),
        )
        .await
        .unwrap();
    assert_eq!(reaper.endpoint(), &coordinator.endpoint);

    // The watchdog request carries the merged label set and the socket mount.
    let request = provider.last_request.lock().unwrap().take().unwrap();
    assert_eq!(request.labels.len(), 3);
    assert_eq!(request.reaper_image, request.image);
    assert!(request.auto_remove);
    assert!(request.skip_cleanup);
    assert_eq!(request.mounts.len(), 1);
    assert!(!request.mounts[0].read_only);

    let handle = reaper.connect().await.unwrap();

    let event = timeout(Duration::from_secs(5), diag_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        event.kind,
        CleanupEventKind::NegotiationAcknowledged { attempts: 1 }
    );

    handle.terminate().await;
    timeout(Duration::from_secs(5), coordinator.closed)
        .await
        .unwrap()
        .unwrap();

    // Exactly one negotiation attempt, carrying the canonical filter.
    let line = coordinator.lines.recv().await.unwrap();
    assert_eq!(
        line,
        "label=io.custodian.session=true&label=io.custodian.session.id=it-session\n"
    );
    assert!(coordinator.lines.try_recv().is_err());

    let event = timeout(Duration::from_secs(5), diag_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.kind, CleanupEventKind::ConnectionClosed);
}

#[tokio::test]
async fn negotiation_retries_until_third_attempt_acks() {
    let mut coordinator = mock::spawn_coordinator(vec!["RETRY\n", "RETRY\n", "ACK\n"]).await;
    let provider = Arc::new(mock::TestProvider::new(coordinator.endpoint.clone()));
    let (diag_tx, mut diag_rx) = mpsc::channel(16);

    let registry = ReaperRegistry::new();
    let reaper = registry
        .get_or_create(
            SessionId::generate(),
            provider,
            ReaperOptions::new().diagnostics_sender(diag_tx),
        )
        .await
        .unwrap();

    let handle = reaper.connect().await.unwrap();

    let event = timeout(Duration::from_secs(5), diag_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        event.kind,
        CleanupEventKind::NegotiationAcknowledged { attempts: 3 }
    );

    handle.terminate().await;
    timeout(Duration::from_secs(5), coordinator.closed)
        .await
        .unwrap()
        .unwrap();

    let mut attempts = 0;
    while coordinator.lines.try_recv().is_ok() {
        attempts += 1;
    }
    assert_eq!(attempts, 3);
}

#[tokio::test]
async fn exhausted_negotiation_still_arms_and_reports_no_error() {
    let mut coordinator = mock::spawn_coordinator(vec!["NO\n", "NO\n", "NO\n"]).await;
    let provider = Arc::new(mock::TestProvider::new(coordinator.endpoint.clone()));
    let (diag_tx, mut diag_rx) = mpsc::channel(16);

    let registry = ReaperRegistry::new();
    let reaper = registry
        .get_or_create(
            SessionId::generate(),
            provider,
            ReaperOptions::new().diagnostics_sender(diag_tx),
        )
        .await
        .unwrap();

    // The connect call itself succeeds; the failed negotiation is only
    // visible through diagnostics.
    let handle = reaper.connect().await.unwrap();

    let event = timeout(Duration::from_secs(5), diag_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        event.kind,
        CleanupEventKind::NegotiationExhausted { attempts: 3 }
    );

    // Teardown still works: the armed task closes the connection on signal.
    handle.terminate().await;
    timeout(Duration::from_secs(5), coordinator.closed)
        .await
        .unwrap()
        .unwrap();

    let mut attempts = 0;
    while coordinator.lines.try_recv().is_ok() {
        attempts += 1;
    }
    assert_eq!(attempts, 3);
}

#[tokio::test]
async fn coordinator_closing_early_exhausts_attempts() {
    // A coordinator that hangs up after the first line: the remaining
    // attempts fail on a dead connection and the task arms regardless.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        let _ = reader.read_line(&mut line).await;
        // Dropping the stream closes the connection without replying.
    });

    let provider = Arc::new(mock::TestProvider::new(
        custodian_core::types::Endpoint::new(addr.to_string()),
    ));
    let (diag_tx, mut diag_rx) = mpsc::channel(16);

    let registry = ReaperRegistry::new();
    let reaper = registry
        .get_or_create(
            SessionId::generate(),
            provider,
            ReaperOptions::new().diagnostics_sender(diag_tx),
        )
        .await
        .unwrap();

    let handle = reaper.connect().await.unwrap();

    let event = timeout(Duration::from_secs(5), diag_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        event.kind,
        CleanupEventKind::NegotiationExhausted { attempts: 3 }
    );

    handle.terminate().await;
}

#[tokio::test]
async fn dropping_handle_leaves_connection_armed() {
    let coordinator = mock::spawn_coordinator(vec!["ACK\n"]).await;
    let provider = Arc::new(mock::TestProvider::new(coordinator.endpoint.clone()));

    let registry = ReaperRegistry::new();
    let reaper = registry
        .get_or_create(SessionId::generate(), provider, ReaperOptions::new())
        .await
        .unwrap();

    let handle = reaper.connect().await.unwrap();
    drop(handle);

    // No termination signal was sent, so the connection must stay open.
    assert!(
        timeout(Duration::from_millis(400), coordinator.closed)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn registry_reuses_coordinator_across_sessions() {
    let coordinator = mock::spawn_coordinator(vec![]).await;
    let provider = Arc::new(mock::TestProvider::new(coordinator.endpoint.clone()));

    let registry = ReaperRegistry::new();
    let first = registry
        .get_or_create(
            SessionId::new("run-1"),
            Arc::clone(&provider),
            ReaperOptions::new(),
        )
        .await
        .unwrap();
    let second = registry
        .get_or_create(
            SessionId::new("run-2"),
            Arc::clone(&provider),
            ReaperOptions::new().image_name("example.com/other:1"),
        )
        .await
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.session_id().as_str(), "run-1");
    assert_eq!(provider.runs.load(Ordering::SeqCst), 1);
}

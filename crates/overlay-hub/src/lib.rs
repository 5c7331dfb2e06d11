//! Single-connection telemetry fan-out hub.
//!
//! `TelemetryHub` owns exactly one [`TelemetrySource`] connection and
//! re-publishes its decoded events to any number of registered subscribers,
//! so N overlays never open N sockets against the simulator. The hub is an
//! explicit service object: construct it once at process start and share it
//! by `Arc` with every consumer.
//!
//! Connection outcome is reported asynchronously: `connect` marks the hub
//! transport-open optimistically, and only a successful
//! [`ConnectionEvent`](openoverlay_telemetry::ConnectionEvent) on the stream
//! flips it to stream-confirmed. The hub never retries by itself; retry
//! policy belongs to whoever observes the failure event.

use std::sync::Mutex as StdMutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use openoverlay_telemetry::{
    EventKind, SourceCredentials, SourceEndpoint, TelemetryError, TelemetryEvent, TelemetryReceiver,
    TelemetrySource,
};

pub mod cache;
pub mod registry;

pub use cache::SnapshotCache;
pub use registry::{EventHandler, SubscriberRegistry, SubscriptionId};

pub struct TelemetryHub {
    source: Mutex<Box<dyn TelemetrySource>>,
    registry: Arc<SubscriberRegistry>,
    cache: Arc<SnapshotCache>,
    forward_task: StdMutex<Option<JoinHandle<()>>>,
    /// Bumped on every teardown; the forward task drops events from a
    /// superseded connection.
    generation: Arc<AtomicU64>,
    transport_open: AtomicBool,
    stream_confirmed: Arc<AtomicBool>,
}

impl TelemetryHub {
    pub fn new(source: Box<dyn TelemetrySource>) -> Self {
        Self {
            source: Mutex::new(source),
            registry: Arc::new(SubscriberRegistry::new()),
            cache: Arc::new(SnapshotCache::new()),
            forward_task: StdMutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
            transport_open: AtomicBool::new(false),
            stream_confirmed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Open (or re-open) the underlying source connection.
    ///
    /// An existing connection is fully torn down first, so at most one live
    /// connection exists at any instant and no events from the previous one
    /// are delivered after this call returns. The cached snapshots of the
    /// previous connection are dropped as part of teardown.
    ///
    /// # Errors
    ///
    /// Propagates transport-level failures from the source; the hub is left
    /// disconnected (transport closed, cache empty) when that happens. A
    /// broadcast registration rejected by the simulator is not an error
    /// here; it arrives as a failed `ConnectionEvent` through the fan-out.
    pub async fn connect(
        &self,
        endpoint: &SourceEndpoint,
        credentials: &SourceCredentials,
        update_interval: Duration,
    ) -> Result<(), TelemetryError> {
        // The source lock covers teardown, transport attempt and forwarder
        // spawn, so a concurrent connect cannot interleave and leave a
        // superseded forwarding task running.
        let mut source = self.source.lock().await;

        self.stop_forwarding();
        self.transport_open.store(false, Ordering::SeqCst);
        self.cache.clear();

        source.disconnect().await?;
        let receiver = source.connect(endpoint, credentials, update_interval).await?;

        self.transport_open.store(true, Ordering::SeqCst);
        info!(host = %endpoint.host, port = endpoint.port, "Telemetry hub connected to source");

        self.spawn_forwarding(receiver);
        Ok(())
    }

    /// Tear down the connection. No-op when already disconnected.
    ///
    /// # Errors
    ///
    /// Propagates source teardown failures; the hub is marked disconnected
    /// either way.
    pub async fn disconnect(&self) -> Result<(), TelemetryError> {
        let mut source = self.source.lock().await;

        self.stop_forwarding();
        let was_open = self.transport_open.swap(false, Ordering::SeqCst);
        self.cache.clear();

        let result = source.disconnect().await;

        if was_open {
            info!("Telemetry hub disconnected from source");
        } else {
            debug!("Disconnect requested while already disconnected");
        }
        result
    }

    /// Register a callback for one event kind.
    pub fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId {
        self.registry.subscribe(kind, handler)
    }

    /// Remove a registration. Idempotent.
    pub fn unsubscribe(&self, subscription: SubscriptionId) -> bool {
        self.registry.unsubscribe(subscription)
    }

    /// Latest-snapshot cache for pull consumers.
    pub fn cache(&self) -> Arc<SnapshotCache> {
        Arc::clone(&self.cache)
    }

    /// A transport-level connection attempt has been made and not torn down.
    pub fn is_transport_open(&self) -> bool {
        self.transport_open.load(Ordering::SeqCst)
    }

    /// The source confirmed registration and telemetry is flowing.
    pub fn is_stream_confirmed(&self) -> bool {
        self.stream_confirmed.load(Ordering::SeqCst)
    }

    fn spawn_forwarding(&self, mut receiver: TelemetryReceiver) {
        let registry = Arc::clone(&self.registry);
        let cache = Arc::clone(&self.cache);
        let stream_confirmed = Arc::clone(&self.stream_confirmed);
        let generation_counter = Arc::clone(&self.generation);
        let generation = generation_counter.load(Ordering::SeqCst);

        let handle = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                if generation_counter.load(Ordering::SeqCst) != generation {
                    debug!("Dropping event from superseded connection");
                    break;
                }

                if let TelemetryEvent::Connection(connection) = &event {
                    stream_confirmed.store(connection.success, Ordering::SeqCst);
                    if connection.success {
                        info!(
                            connection_id = connection.connection_id,
                            readonly = connection.readonly,
                            "Source registration confirmed"
                        );
                    } else {
                        warn!(
                            connection_id = connection.connection_id,
                            error = connection.error.as_deref().unwrap_or("unknown"),
                            "Source registration failed"
                        );
                    }
                }

                cache.update(&event);
                registry.dispatch(&event);
            }
            debug!("Source event stream ended");
        });

        let mut slot = self.forward_task.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(handle);
    }

    /// Abort the forwarding task and invalidate its generation so in-flight
    /// events from the old connection are never dispatched.
    fn stop_forwarding(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.stream_confirmed.store(false, Ordering::SeqCst);

        let handle = {
            let mut slot = self.forward_task.lock().unwrap_or_else(|e| e.into_inner());
            slot.take()
        };
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl Drop for TelemetryHub {
    fn drop(&mut self) {
        self.stop_forwarding();
        if self.transport_open.load(Ordering::SeqCst) {
            // Graceful teardown needs `disconnect().await`; here we can only
            // stop forwarding and let the source close with the process.
            warn!("Telemetry hub dropped while connected; call disconnect() for graceful teardown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use openoverlay_telemetry::{
        ConnectionEvent, PhysicsSnapshot, TelemetrySender, DEFAULT_UPDATE_INTERVAL,
    };

    /// Source double: every `connect` hands back a fresh channel and parks
    /// the sender where the test can reach it.
    #[derive(Default)]
    struct ScriptedSource {
        senders: Arc<StdMutex<Vec<TelemetrySender>>>,
        disconnects: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn senders(&self) -> Arc<StdMutex<Vec<TelemetrySender>>> {
            Arc::clone(&self.senders)
        }

        fn disconnect_count(&self) -> Arc<AtomicUsize> {
            Arc::clone(&self.disconnects)
        }
    }

    #[async_trait]
    impl TelemetrySource for ScriptedSource {
        async fn connect(
            &mut self,
            _endpoint: &SourceEndpoint,
            _credentials: &SourceCredentials,
            _update_interval: Duration,
        ) -> Result<TelemetryReceiver, TelemetryError> {
            let (tx, rx) = mpsc::channel(32);
            let mut senders = self.senders.lock().unwrap_or_else(|e| e.into_inner());
            senders.push(tx);
            Ok(rx)
        }

        async fn disconnect(&mut self) -> Result<(), TelemetryError> {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Source double whose transport starts failing after `fail_from`
    /// successful connects.
    struct FlakySource {
        inner: ScriptedSource,
        attempts: AtomicUsize,
        fail_from: usize,
    }

    impl FlakySource {
        fn failing_from(fail_from: usize) -> Self {
            Self {
                inner: ScriptedSource::default(),
                attempts: AtomicUsize::new(0),
                fail_from,
            }
        }
    }

    #[async_trait]
    impl TelemetrySource for FlakySource {
        async fn connect(
            &mut self,
            endpoint: &SourceEndpoint,
            credentials: &SourceCredentials,
            update_interval: Duration,
        ) -> Result<TelemetryReceiver, TelemetryError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt >= self.fail_from {
                return Err(TelemetryError::ConnectionFailed(
                    "socket bind failed".to_string(),
                ));
            }
            self.inner.connect(endpoint, credentials, update_interval).await
        }

        async fn disconnect(&mut self) -> Result<(), TelemetryError> {
            self.inner.disconnect().await
        }
    }

    fn sender_at(senders: &Arc<StdMutex<Vec<TelemetrySender>>>, index: usize) -> TelemetrySender {
        let senders = senders.lock().unwrap_or_else(|e| e.into_inner());
        senders[index].clone()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    fn counting_handler(counter: &Arc<AtomicUsize>) -> EventHandler {
        let counter = Arc::clone(counter);
        Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn test_fan_out_delivers_once_per_subscriber() -> anyhow::Result<()> {
        let source = ScriptedSource::default();
        let senders = source.senders();
        let hub = TelemetryHub::new(Box::new(source));

        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        hub.subscribe(EventKind::Physics, counting_handler(&first));
        hub.subscribe(EventKind::Physics, counting_handler(&second));

        hub.connect(
            &SourceEndpoint::localhost(),
            &SourceCredentials::default(),
            DEFAULT_UPDATE_INTERVAL,
        )
        .await?;

        sender_at(&senders, 0)
            .send(TelemetryEvent::Physics(PhysicsSnapshot::default()))
            .await?;
        settle().await;

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_reconnect_leaves_exactly_one_live_connection() -> anyhow::Result<()> {
        let source = ScriptedSource::default();
        let senders = source.senders();
        let disconnects = source.disconnect_count();
        let hub = TelemetryHub::new(Box::new(source));

        let deliveries = Arc::new(AtomicUsize::new(0));
        hub.subscribe(EventKind::Physics, counting_handler(&deliveries));

        let endpoint = SourceEndpoint::localhost();
        let credentials = SourceCredentials::default();
        hub.connect(&endpoint, &credentials, DEFAULT_UPDATE_INTERVAL)
            .await?;
        let stale = sender_at(&senders, 0);

        // Second connect without an intervening disconnect: the first
        // connection must be torn down before the new one is established.
        hub.connect(&endpoint, &credentials, DEFAULT_UPDATE_INTERVAL)
            .await?;
        assert_eq!(disconnects.load(Ordering::SeqCst), 2);

        let _ = stale
            .send(TelemetryEvent::Physics(PhysicsSnapshot::default()))
            .await;
        sender_at(&senders, 1)
            .send(TelemetryEvent::Physics(PhysicsSnapshot::default()))
            .await?;
        settle().await;

        // Only the live connection's event arrives.
        assert_eq!(deliveries.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_registration_keeps_transport_open() -> anyhow::Result<()> {
        let source = ScriptedSource::default();
        let senders = source.senders();
        let hub = TelemetryHub::new(Box::new(source));

        let failures = Arc::new(AtomicUsize::new(0));
        hub.subscribe(EventKind::Connection, counting_handler(&failures));

        hub.connect(
            &SourceEndpoint::localhost(),
            &SourceCredentials::default(),
            DEFAULT_UPDATE_INTERVAL,
        )
        .await?;
        assert!(hub.is_transport_open());
        assert!(!hub.is_stream_confirmed());

        sender_at(&senders, 0)
            .send(TelemetryEvent::Connection(ConnectionEvent::failed(
                -1,
                "wrong connection password",
            )))
            .await?;
        settle().await;

        // Failure is surfaced to subscribers, not retried by the hub.
        assert_eq!(failures.load(Ordering::SeqCst), 1);
        assert!(hub.is_transport_open());
        assert!(!hub.is_stream_confirmed());
        Ok(())
    }

    #[tokio::test]
    async fn test_successful_registration_confirms_stream() -> anyhow::Result<()> {
        let source = ScriptedSource::default();
        let senders = source.senders();
        let hub = TelemetryHub::new(Box::new(source));

        hub.connect(
            &SourceEndpoint::localhost(),
            &SourceCredentials::default(),
            DEFAULT_UPDATE_INTERVAL,
        )
        .await?;

        sender_at(&senders, 0)
            .send(TelemetryEvent::Connection(ConnectionEvent::succeeded(7, false)))
            .await?;
        settle().await;

        assert!(hub.is_stream_confirmed());

        hub.disconnect().await?;
        assert!(!hub.is_transport_open());
        assert!(!hub.is_stream_confirmed());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_reconnect_marks_hub_disconnected() -> anyhow::Result<()> {
        let source = FlakySource::failing_from(1);
        let senders = source.inner.senders();
        let hub = TelemetryHub::new(Box::new(source));

        let endpoint = SourceEndpoint::localhost();
        let credentials = SourceCredentials::default();
        hub.connect(&endpoint, &credentials, DEFAULT_UPDATE_INTERVAL)
            .await?;
        sender_at(&senders, 0)
            .send(TelemetryEvent::Physics(PhysicsSnapshot::default()))
            .await?;
        settle().await;
        assert!(hub.is_transport_open());
        assert!(hub.cache().latest_physics().is_some());

        // Second connect fails at transport level: the hub must not keep
        // reporting the dead first connection as open.
        let result = hub
            .connect(&endpoint, &credentials, DEFAULT_UPDATE_INTERVAL)
            .await;
        assert!(result.is_err());
        assert!(!hub.is_transport_open());
        assert!(!hub.is_stream_confirmed());
        assert!(hub.cache().latest_physics().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_reconnect_clears_cached_snapshots() -> anyhow::Result<()> {
        let source = ScriptedSource::default();
        let senders = source.senders();
        let hub = TelemetryHub::new(Box::new(source));

        let endpoint = SourceEndpoint::localhost();
        let credentials = SourceCredentials::default();
        hub.connect(&endpoint, &credentials, DEFAULT_UPDATE_INTERVAL)
            .await?;
        sender_at(&senders, 0)
            .send(TelemetryEvent::Physics(PhysicsSnapshot::default()))
            .await?;
        settle().await;
        assert!(hub.cache().latest_physics().is_some());

        // Fresh connection: pull consumers must not read the previous
        // connection's snapshots while the new stream warms up.
        hub.connect(&endpoint, &credentials, DEFAULT_UPDATE_INTERVAL)
            .await?;
        assert!(hub.cache().latest_physics().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_connects_leave_one_forwarder() -> anyhow::Result<()> {
        let source = ScriptedSource::default();
        let senders = source.senders();
        let hub = Arc::new(TelemetryHub::new(Box::new(source)));

        let deliveries = Arc::new(AtomicUsize::new(0));
        hub.subscribe(EventKind::Physics, counting_handler(&deliveries));

        let endpoint = SourceEndpoint::localhost();
        let credentials = SourceCredentials::default();
        let first = {
            let hub = Arc::clone(&hub);
            let endpoint = endpoint.clone();
            let credentials = credentials.clone();
            tokio::spawn(async move {
                hub.connect(&endpoint, &credentials, DEFAULT_UPDATE_INTERVAL)
                    .await
            })
        };
        let second = {
            let hub = Arc::clone(&hub);
            let endpoint = endpoint.clone();
            let credentials = credentials.clone();
            tokio::spawn(async move {
                hub.connect(&endpoint, &credentials, DEFAULT_UPDATE_INTERVAL)
                    .await
            })
        };
        first.await??;
        second.await??;

        // Whichever connect ran last owns the only forwarding task; pushing
        // an event through every connection the source handed out must reach
        // subscribers exactly once.
        let all_senders: Vec<TelemetrySender> = {
            let senders = senders.lock().unwrap_or_else(|e| e.into_inner());
            senders.clone()
        };
        assert_eq!(all_senders.len(), 2);
        for sender in all_senders {
            let _ = sender
                .send(TelemetryEvent::Physics(PhysicsSnapshot::default()))
                .await;
        }
        settle().await;

        assert_eq!(deliveries.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_disconnect_when_disconnected_is_noop() -> anyhow::Result<()> {
        let source = ScriptedSource::default();
        let disconnects = source.disconnect_count();
        let hub = TelemetryHub::new(Box::new(source));

        hub.disconnect().await?;
        hub.disconnect().await?;

        assert_eq!(disconnects.load(Ordering::SeqCst), 2);
        assert!(!hub.is_transport_open());
        Ok(())
    }

    #[tokio::test]
    async fn test_cache_tracks_latest_snapshot() -> anyhow::Result<()> {
        let source = ScriptedSource::default();
        let senders = source.senders();
        let hub = TelemetryHub::new(Box::new(source));

        hub.connect(
            &SourceEndpoint::localhost(),
            &SourceCredentials::default(),
            DEFAULT_UPDATE_INTERVAL,
        )
        .await?;

        let sender = sender_at(&senders, 0);
        for fuel in [50.0, 49.5, 49.0] {
            sender
                .send(TelemetryEvent::Physics(PhysicsSnapshot {
                    fuel_l: fuel,
                    ..PhysicsSnapshot::default()
                }))
                .await?;
        }
        settle().await;

        let cache = hub.cache();
        let latest = cache.latest_physics();
        assert_eq!(latest.map(|p| p.fuel_l), Some(49.0));
        Ok(())
    }
}

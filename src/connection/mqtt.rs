//! MQTT implementation of the connection manager.

use crate::config::ConnectorConfig;
use crate::connection::{ConnectionManager, ConnectionState, LinkEvent};
use crate::metrics::ConnectorMetrics;
use crate::retry::ReconnectStrategy;
use crate::signal::CompletionSignal;
use crate::tap::{MessageTap, Tapped};
use crate::{ConnectorError, ConnectorResult};
use async_trait::async_trait;
use rumqttc::v5::mqttbytes::v5::{ConnectReturnCode, Packet};
use rumqttc::v5::mqttbytes::QoS;
use rumqttc::v5::{AsyncClient, Event, EventLoop, MqttOptions};
use rumqttc::{Outgoing, TlsConfiguration, Transport};
use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Topic root the upstream broker republishes device telemetry under
const TELEMETRY_ROOT: &str = "telemetry";

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// Active MQTT session: request handle plus its event loop
struct Session {
    client: AsyncClient,
    eventloop: EventLoop,
}

/// Connection manager for an upstream MQTT broker
///
/// Owns the session lifecycle: CONNECT/CONNACK establishment, one telemetry
/// subscription for the first configured tenant, loss detection inside
/// [`ConnectionManager::poll`], and the bounded autonomous reconnect path.
pub struct MqttConnectionManager {
    config: ConnectorConfig,
    client_id: String,
    metrics: ConnectorMetrics,
    tap: MessageTap,
    state_tx: watch::Sender<ConnectionState>,
    /// Completed on every session establishment; the exactly-once guarantee
    /// distinguishes the connect call from later autonomous re-establishment.
    ready: CompletionSignal,
    session: Option<Session>,
}

impl MqttConnectionManager {
    /// Create a manager for the given configuration
    pub fn new(config: ConnectorConfig) -> Self {
        let client_id = generate_client_id();
        let metrics = ConnectorMetrics::new(config.primary_tenant());
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (ready, _) = CompletionSignal::new();

        Self {
            config,
            client_id,
            metrics,
            tap: MessageTap::new(),
            state_tx,
            ready,
            session: None,
        }
    }

    /// Client id this manager connects with
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Observe connection state transitions
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    fn set_state(&mut self, next: ConnectionState) {
        let previous = *self.state_tx.borrow();
        if previous == next {
            return;
        }
        debug!(?previous, ?next, "connection state changed");
        self.metrics.set_connected(next == ConnectionState::Connected);
        self.state_tx.send_replace(next);
    }

    /// Subscription filter for one tenant's telemetry
    fn telemetry_filter(tenant: &str) -> String {
        format!("{}/{}/#", TELEMETRY_ROOT, tenant)
    }

    fn build_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(
            self.client_id.clone(),
            self.config.host.clone(),
            self.config.port,
        );
        options.set_keep_alive(KEEP_ALIVE);
        options.set_clean_start(true);

        if let (Some(username), Some(password)) =
            (self.config.username.as_ref(), self.config.password.as_ref())
        {
            options.set_credentials(username, password);
        }

        options.set_transport(transport_for(self.config.truststore_file.as_deref()));
        options
    }

    /// Open a session and issue the telemetry subscription
    ///
    /// Shared by `connect()` and the autonomous reconnect path; the caller
    /// sets the pre-state (`Connecting` or `Reconnecting`).
    async fn establish(&mut self) -> ConnectorResult<()> {
        let options = self.build_options();
        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);

        Self::await_connack(&mut eventloop).await?;

        let tenant = self.config.primary_tenant().to_string();
        if self.config.tenant_ids.len() > 1 {
            warn!(
                active = %tenant,
                skipped = self.config.tenant_ids.len() - 1,
                "only the first configured tenant is subscribed"
            );
        }

        // Subscribe at the highest QoS so the broker does not downgrade
        // deliveries; a failed request is logged but does not tear down the
        // freshly established session.
        let filter = Self::telemetry_filter(&tenant);
        if let Err(err) = client.subscribe(filter.clone(), QoS::ExactlyOnce).await {
            error!(%filter, error = %err, "cannot create telemetry subscription");
        } else {
            info!(%filter, "telemetry subscription issued");
        }

        self.session = Some(Session { client, eventloop });
        self.set_state(ConnectionState::Connected);

        if self.ready.complete() {
            debug!(client_id = %self.client_id, host = %self.config.host, "session established");
        } else {
            info!(client_id = %self.client_id, host = %self.config.host, "session re-established");
        }
        Ok(())
    }

    /// Drive the event loop until the broker accepts or refuses the session
    async fn await_connack(eventloop: &mut EventLoop) -> ConnectorResult<()> {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        return Ok(());
                    }
                    return Err(ConnectorError::connection(format!(
                        "broker refused connection: {:?}",
                        ack.code
                    )));
                }
                Ok(_) => continue,
                Err(err) => {
                    return Err(ConnectorError::connection_with_source(
                        "cannot reach broker",
                        err,
                    ));
                }
            }
        }
    }

    /// Bounded reconnect loop, entered after a transport error
    async fn reconnect(&mut self) -> ConnectorResult<()> {
        let strategy = ReconnectStrategy::from(&self.config.reconnect);
        let mut attempts = 0;

        while strategy.should_retry(attempts) {
            attempts += 1;
            self.metrics.record_reconnect();
            tokio::time::sleep(strategy.delay()).await;

            info!(
                attempt = attempts,
                max = strategy.max_attempts(),
                "reconnecting to broker"
            );
            match self.establish().await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!(attempt = attempts, error = %err, "reconnect attempt failed");
                }
            }
        }

        self.set_state(ConnectionState::Disconnected);
        Err(ConnectorError::ReconnectExhausted { attempts })
    }
}

#[async_trait]
impl ConnectionManager for MqttConnectionManager {
    async fn connect(&mut self) -> ConnectorResult<()> {
        if self.state() == ConnectionState::Connected {
            self.disconnect().await?;
        }

        // fresh completion signal per connect call; later re-establishments
        // complete it idempotently
        let (ready, _) = CompletionSignal::new();
        self.ready = ready;

        self.set_state(ConnectionState::Connecting);
        match self.establish().await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.session = None;
                self.set_state(ConnectionState::Disconnected);
                Err(err)
            }
        }
    }

    async fn disconnect(&mut self) -> ConnectorResult<()> {
        if let Some(mut session) = self.session.take() {
            match session.client.disconnect().await {
                Ok(()) => {
                    // drive the close handshake until the DISCONNECT flushes
                    // or the link drops
                    loop {
                        match session.eventloop.poll().await {
                            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                                debug!("close handshake finished");
                                break;
                            }
                            Ok(_) => continue,
                            Err(_) => break,
                        }
                    }
                }
                Err(err) => {
                    debug!(error = %err, "disconnect request failed, tearing down locally");
                }
            }
        }

        self.set_state(ConnectionState::Disconnected);
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    async fn poll(&mut self) -> ConnectorResult<LinkEvent> {
        loop {
            let event = match self.session.as_mut() {
                Some(session) => session.eventloop.poll().await,
                None => {
                    return Err(ConnectorError::connection(
                        "no active session; call connect() first",
                    ))
                }
            };

            match event {
                Ok(event) => {
                    if let Some(tapped) = self.tap.tap(event) {
                        match tapped {
                            Tapped::Telemetry(raw) => return Ok(LinkEvent::Message(raw)),
                            Tapped::Notification(notice) => {
                                return Ok(LinkEvent::PeerDisconnecting(notice))
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "connection to broker lost");
                    self.session = None;
                    self.set_state(ConnectionState::Reconnecting);
                    self.reconnect().await?;
                }
            }
        }
    }
}

fn generate_client_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("connector-{}", &uuid[..8])
}

/// TLS transport when a readable trust store is configured, plain TCP
/// otherwise; a missing file is a warning, not a startup failure
fn transport_for(truststore_file: Option<&Path>) -> Transport {
    match truststore_file {
        Some(path) => match std::fs::read(path) {
            Ok(ca) => Transport::Tls(TlsConfiguration::Simple {
                ca,
                alpn: None,
                client_auth: None,
            }),
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "cannot read trust store file, continuing without TLS"
                );
                Transport::Tcp
            }
        },
        None => Transport::Tcp,
    }
}

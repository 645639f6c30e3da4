// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// MQTT over TLS, authenticated with a signed token as the session password

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Packet, QoS,
    TlsConfiguration, Transport,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::backend::CloudTransport;
use super::token::{SignedToken, TokenMinter};
use crate::config::MqttConfig;
use crate::error::{GatewayError, GatewayResult};

/// Pause between reconnect attempts of the event loop
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Upper bound between two renewal checks
const MAX_REFRESH_CHECK: Duration = Duration::from_secs(60);

/// Requests buffered between the client handle and its event loop
const REQUEST_CAPACITY: usize = 64;

/// A broker connection authenticated with one token
#[async_trait]
trait BrokerSession: Send + Sync {
    fn is_connected(&self) -> bool;

    async fn publish(&self, topic: &str, payload: &[u8]) -> std::result::Result<(), String>;

    async fn close(&self);
}

/// Opens a new authenticated session for a freshly minted token
#[async_trait]
trait SessionConnector: Send + Sync {
    async fn open(&self, token: &SignedToken)
        -> std::result::Result<Box<dyn BrokerSession>, String>;
}

struct RumqttConnector {
    name: String,
    config: MqttConfig,
    trust_root: Vec<u8>,
}

#[async_trait]
impl SessionConnector for RumqttConnector {
    async fn open(
        &self,
        token: &SignedToken,
    ) -> std::result::Result<Box<dyn BrokerSession>, String> {
        let mut options = MqttOptions::new(
            self.config.client_id.clone(),
            self.config.host.clone(),
            self.config.port,
        );
        options
            .set_keep_alive(self.config.keep_alive())
            .set_clean_session(true)
            .set_credentials(self.config.username.clone(), token.value.clone())
            .set_transport(Transport::tls_with_config(TlsConfiguration::Simple {
                ca: self.trust_root.clone(),
                alpn: None,
                client_auth: None,
            }));

        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);

        let timeout = self.config.connect_timeout();
        tokio::time::timeout(timeout, wait_for_connack(&mut eventloop))
            .await
            .map_err(|_| format!("no CONNACK within {:?}", timeout))??;

        let connected = Arc::new(AtomicBool::new(true));
        let driver = tokio::spawn(drive(self.name.clone(), eventloop, connected.clone()));

        Ok(Box::new(RumqttSession {
            client,
            driver,
            connected,
        }))
    }
}

/// Client handle plus the task driving its event loop
struct RumqttSession {
    client: AsyncClient,
    driver: JoinHandle<()>,
    connected: Arc<AtomicBool>,
}

#[async_trait]
impl BrokerSession for RumqttSession {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn publish(&self, topic: &str, payload: &[u8]) -> std::result::Result<(), String> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload.to_vec())
            .await
            .map_err(|e| e.to_string())
    }

    async fn close(&self) {
        if let Err(e) = self.client.disconnect().await {
            debug!("Ignoring disconnect error on retired session: {}", e);
        }
        self.driver.abort();
    }
}

impl Drop for RumqttSession {
    fn drop(&mut self) {
        // A retired session must never keep redialing with its stale token
        self.driver.abort();
    }
}

struct ActiveSession {
    link: Box<dyn BrokerSession>,
    token: SignedToken,
}

#[derive(Default)]
struct SessionState {
    active: Option<ActiveSession>,
    /// Earliest retry after a failed renewal while the old token still holds
    renew_after: Option<Instant>,
}

struct MqttInner {
    name: String,
    topic: Option<String>,
    minter: TokenMinter,
    connector: Arc<dyn SessionConnector>,
    renewal_backoff: Duration,
    // Publishes and reconnects run one at a time under this lock
    state: Mutex<SessionState>,
}

/// MQTT transport holding a single long-lived session
pub struct MqttTransport {
    inner: Arc<MqttInner>,
    refresher: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl MqttTransport {
    /// Read the trust root and signing key; both are required to start
    pub fn new(name: &str, config: MqttConfig) -> GatewayResult<Self> {
        let trust_root = std::fs::read(&config.trust_root_path).map_err(|e| {
            GatewayError::StartupFatal(format!(
                "cannot read trust root '{}': {}",
                config.trust_root_path, e
            ))
        })?;
        let minter = TokenMinter::from_config(&config.token)?;

        info!(
            backend = %name,
            host = %config.host,
            port = config.port,
            "Initializing MQTT transport"
        );

        let topic = config.topic.clone();
        let connector = RumqttConnector {
            name: name.to_string(),
            config,
            trust_root,
        };
        Ok(Self::with_connector(name, topic, minter, Arc::new(connector)))
    }

    fn with_connector(
        name: &str,
        topic: Option<String>,
        minter: TokenMinter,
        connector: Arc<dyn SessionConnector>,
    ) -> Self {
        let renewal_backoff = refresh_check_interval(&minter);
        Self {
            inner: Arc::new(MqttInner {
                name: name.to_string(),
                topic,
                minter,
                connector,
                renewal_backoff,
                state: Mutex::new(SessionState::default()),
            }),
            refresher: std::sync::Mutex::new(None),
        }
    }

    /// Topic a publish for `analytics_name` lands on
    pub fn resolve_topic<'a>(&'a self, analytics_name: &'a str) -> &'a str {
        self.inner.topic.as_deref().unwrap_or(analytics_name)
    }

    fn spawn_refresher(&self) {
        let interval = refresh_check_interval(&self.inner.minter);
        let handle = tokio::spawn(refresh_loop(Arc::downgrade(&self.inner), interval));
        if let Ok(mut slot) = self.refresher.lock() {
            if let Some(previous) = slot.replace(handle) {
                previous.abort();
            }
        }
    }
}

impl Drop for MqttTransport {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.refresher.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

impl MqttInner {
    /// Mint a token and open a session with it
    async fn open(&self) -> GatewayResult<ActiveSession> {
        let token = self.minter.mint()?;
        let link = self
            .connector
            .open(&token)
            .await
            .map_err(|e| GatewayError::transport(&self.name, e))?;

        info!(
            backend = %self.name,
            expires_at = token.expires_at,
            "MQTT session authenticated"
        );
        Ok(ActiveSession { link, token })
    }

    /// Swap in a newly authenticated session, then retire the old one
    async fn reconnect(&self, state: &mut SessionState) -> GatewayResult<()> {
        let fresh = self.open().await?;
        state.renew_after = None;
        if let Some(old) = state.active.replace(fresh) {
            old.link.close().await;
        }
        Ok(())
    }

    /// Renew the session if its token is inside the refresh margin
    ///
    /// When renewal fails the current session stays in use until its token
    /// actually expires, and renewal is not retried before `renewal_backoff`.
    async fn refresh_if_due(&self, state: &mut SessionState) -> GatewayResult<()> {
        let now = Utc::now();
        let still_valid = match state.active.as_ref() {
            Some(active) if !self.minter.is_due(&active.token, now) => return Ok(()),
            Some(active) => !active.token.is_expired(now),
            None => false,
        };

        if still_valid && state.renew_after.is_some_and(|at| Instant::now() < at) {
            return Ok(());
        }

        info!(backend = %self.name, "Renewing MQTT session token");
        match self.reconnect(state).await {
            Ok(()) => Ok(()),
            Err(e) if still_valid => {
                warn!(
                    backend = %self.name,
                    error = %e,
                    "Token renewal failed, keeping current session until expiry"
                );
                state.renew_after = Some(Instant::now() + self.renewal_backoff);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn try_publish(
        &self,
        state: &SessionState,
        topic: &str,
        payload: &[u8],
    ) -> GatewayResult<()> {
        let active = state
            .active
            .as_ref()
            .ok_or_else(|| GatewayError::transport(&self.name, "not connected"))?;

        if !active.link.is_connected() {
            return Err(GatewayError::transport(&self.name, "connection lost"));
        }

        active
            .link
            .publish(topic, payload)
            .await
            .map_err(|e| GatewayError::transport(&self.name, e))
    }
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> std::result::Result<(), String> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                return match ack.code {
                    ConnectReturnCode::Success => Ok(()),
                    code => Err(format!("broker refused connection: {:?}", code)),
                };
            }
            Ok(_) => continue,
            Err(e) => return Err(e.to_string()),
        }
    }
}

/// Drive the event loop for the lifetime of a session
async fn drive(name: String, mut eventloop: EventLoop, connected: Arc<AtomicBool>) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                let ok = ack.code == ConnectReturnCode::Success;
                connected.store(ok, Ordering::Release);
                if ok {
                    info!(backend = %name, "MQTT session re-established");
                } else {
                    warn!(backend = %name, code = ?ack.code, "MQTT reconnect refused");
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                connected.store(false, Ordering::Release);
                warn!(backend = %name, "Broker closed MQTT session");
            }
            Ok(_) => {}
            Err(ConnectionError::RequestsDone) => {
                connected.store(false, Ordering::Release);
                debug!(backend = %name, "MQTT client handle dropped, event loop stopped");
                return;
            }
            Err(e) => {
                connected.store(false, Ordering::Release);
                warn!(backend = %name, error = %e, "MQTT connection error, retrying");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

fn refresh_check_interval(minter: &TokenMinter) -> Duration {
    let half_margin = minter.refresh_margin().num_seconds().max(2) as u64 / 2;
    Duration::from_secs(half_margin).min(MAX_REFRESH_CHECK)
}

/// Renew tokens ahead of expiry even when no publishes arrive
async fn refresh_loop(inner: Weak<MqttInner>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            return;
        };
        let mut state = inner.state.lock().await;
        if let Err(e) = inner.refresh_if_due(&mut state).await {
            error!(backend = %inner.name, error = %e, "Token renewal failed, will retry");
        }
    }
}

#[async_trait]
impl CloudTransport for MqttTransport {
    async fn initialize(&self) -> Result<()> {
        {
            let mut state = self.inner.state.lock().await;
            self.inner.reconnect(&mut state).await?;
        }
        self.spawn_refresher();
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> GatewayResult<()> {
        let topic = self.resolve_topic(topic);
        let mut state = self.inner.state.lock().await;

        self.inner.refresh_if_due(&mut state).await?;

        match self.inner.try_publish(&state, topic, &payload).await {
            Ok(()) => Ok(()),
            Err(first) => {
                // Broker may have dropped us over an expired or revoked token
                warn!(
                    backend = %self.inner.name,
                    error = %first,
                    "Publish failed, renewing session and retrying once"
                );
                self.inner.reconnect(&mut state).await?;
                self.inner.try_publish(&state, topic, &payload).await
            }
        }
    }

    async fn health_check(&self) -> Result<bool> {
        let state = self.inner.state.lock().await;
        Ok(state
            .active
            .as_ref()
            .map(|active| active.link.is_connected())
            .unwrap_or(false))
    }

    fn name(&self) -> &str {
        &self.inner.name
    }

    fn backend_type(&self) -> &str {
        "mqtt"
    }
}

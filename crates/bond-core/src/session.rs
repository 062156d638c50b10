//! Agent session lifecycle
//!
//! An [`Agent`] is an unregistered, validated set of options built with
//! [`AgentBuilder`]. [`Agent::start`] connects, registers and returns a
//! running [`Session`]: the keepalive watchdog, the configuration stream and
//! the shutdown trigger are then running as supervised tasks.
//!
//! Shutdown runs once, whichever path asks for it first (process signal,
//! external token, [`Session::shutdown`]):
//!
//! 1. unregister the agent
//! 2. close the NDK connection
//! 3. close attached session resources
//! 4. cancel the session token
//!
//! Every step runs even if an earlier one failed. Cancellation is last, so the
//! cleanup RPCs go out while the notification loops are still alive.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, OnceCell};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::client::{GrpcNdkClient, NdkClient};
use crate::config::AgentConfig;
use crate::error::{AgentError, BoxError, OptionsError};
use crate::keepalive::{KeepAlivePolicy, Watchdog};
use crate::notification::{
    self, AppIdentity, BfdSession, Category, Config, Interface, LldpNeighbor, NetworkInstance,
    NextHopGroup, NotificationCategory, NotificationSenders, NotificationSink, Notifications,
    Route,
};
use crate::registration::{self, DEFAULT_RETRY_INTERVAL, RegistrationFlags};
use crate::transport::{self, DEFAULT_ENDPOINT};

/// Protocol-specific resource closed during shutdown, after the NDK
/// connection.
#[async_trait]
pub trait SessionResource: Send + Sync {
    /// Name used in shutdown logs.
    fn name(&self) -> &str;

    async fn close(&self) -> Result<(), BoxError>;
}

/// Validated agent options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOptions {
    pub name: String,
    pub endpoint: String,
    pub retry_interval: Duration,
    pub keepalive: Option<KeepAlivePolicy>,
    pub flags: RegistrationFlags,
    pub handle_signals: bool,
}

/// Builder for [`Agent`]
///
/// Problems are collected as options are set and reported together by
/// [`AgentBuilder::build`].
pub struct AgentBuilder {
    options: AgentOptions,
    shutdown_token: Option<CancellationToken>,
    resources: Vec<Box<dyn SessionResource>>,
    problems: Vec<String>,
}

impl AgentBuilder {
    /// Start building an agent registered as `name`.
    ///
    /// Defaults: the SR Linux unix socket endpoint, a 5 second retry
    /// interval, no keepalive, all registration flags off and signal handling
    /// enabled.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            options: AgentOptions {
                name: name.into(),
                endpoint: DEFAULT_ENDPOINT.to_string(),
                retry_interval: DEFAULT_RETRY_INTERVAL,
                keepalive: None,
                flags: RegistrationFlags::default(),
                handle_signals: true,
            },
            shutdown_token: None,
            resources: Vec::new(),
            problems: Vec::new(),
        }
    }

    /// Builder preloaded from resolved configuration.
    pub fn from_config(config: &AgentConfig) -> Self {
        let mut builder = Self::new(config.name.clone())
            .endpoint(config.endpoint.clone())
            .retry_interval(Duration::from_secs(config.retry_interval_secs))
            .wait_config_ack(config.wait_config_ack)
            .auto_telemetry_state(config.auto_telemetry_state)
            .enable_cache(config.enable_cache);
        if let Some(keepalive) = config.keepalive {
            builder = builder.keepalive(
                Duration::from_secs(keepalive.interval_secs),
                keepalive.threshold,
            );
        }
        builder
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.options.endpoint = endpoint.into();
        self
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.options.retry_interval = interval;
        self
    }

    /// Enable the keepalive watchdog.
    pub fn keepalive(mut self, interval: Duration, threshold: u32) -> Self {
        let policy = KeepAlivePolicy::new(interval, threshold);
        if policy.is_set() {
            self.options.keepalive = Some(policy);
        } else {
            self.problems.push(format!(
                "keepalive interval ({interval:?}) and threshold ({threshold}) must both be non-zero"
            ));
        }
        self
    }

    pub fn wait_config_ack(mut self, enabled: bool) -> Self {
        self.options.flags.wait_config_ack = enabled;
        self
    }

    pub fn auto_telemetry_state(mut self, enabled: bool) -> Self {
        self.options.flags.auto_telemetry_state = enabled;
        self
    }

    pub fn enable_cache(mut self, enabled: bool) -> Self {
        self.options.flags.enable_cache = enabled;
        self
    }

    /// Shut down on SIGINT/SIGTERM. On by default.
    pub fn handle_signals(mut self, enabled: bool) -> Self {
        self.options.handle_signals = enabled;
        self
    }

    /// Shut down when `token` is cancelled.
    pub fn shutdown_on(mut self, token: CancellationToken) -> Self {
        self.shutdown_token = Some(token);
        self
    }

    /// Close `resource` during shutdown.
    pub fn attach(mut self, resource: impl SessionResource + 'static) -> Self {
        self.resources.push(Box::new(resource));
        self
    }

    /// Validate the options.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidOptions`] listing every problem found.
    pub fn build(self) -> Result<Agent, AgentError> {
        let mut problems = self.problems;
        let options = self.options;

        if options.name.is_empty() {
            problems.push("agent name must not be empty".to_string());
        } else if !options.name.chars().all(|c| c.is_ascii_graphic()) {
            problems.push(format!(
                "agent name {:?} must be printable ASCII without spaces",
                options.name
            ));
        }
        if let Err(message) = transport::validate_endpoint(&options.endpoint) {
            problems.push(format!("endpoint {:?}: {message}", options.endpoint));
        }
        if options.retry_interval.is_zero() {
            problems.push("retry interval must be greater than zero".to_string());
        }

        if !problems.is_empty() {
            return Err(OptionsError { problems }.into());
        }
        Ok(Agent {
            options,
            shutdown_token: self.shutdown_token,
            resources: self.resources,
        })
    }
}

/// An agent that has not registered yet.
pub struct Agent {
    options: AgentOptions,
    shutdown_token: Option<CancellationToken>,
    resources: Vec<Box<dyn SessionResource>>,
}

impl Agent {
    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    /// Connect to the configured endpoint, register and start the session.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Connect`] when the endpoint cannot be reached and
    /// [`AgentError::RegistrationExhausted`] when `sdk_mgr` never accepts the
    /// registration.
    pub async fn start(self) -> Result<Session, AgentError> {
        let endpoint = self.options.endpoint.clone();
        let channel = transport::connect(&endpoint)
            .await
            .map_err(|source| AgentError::Connect { endpoint, source })?;
        let client = GrpcNdkClient::new(channel, &self.options.name)?;
        self.start_with(Arc::new(client)).await
    }

    /// Register and start the session over an existing client.
    pub async fn start_with(self, client: Arc<dyn NdkClient>) -> Result<Session, AgentError> {
        let Agent {
            options,
            shutdown_token,
            resources,
        } = self;

        let app_id = registration::register(
            client.as_ref(),
            &options.name,
            options.flags,
            options.retry_interval,
        )
        .await?;

        let shared = Arc::new(SessionShared {
            name: options.name.clone(),
            app_id,
            client,
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
            resources: Mutex::new(Some(resources)),
            shutdown: OnceCell::new(),
        });

        spawn_shutdown_trigger(&shared, options.handle_signals, shutdown_token);

        if let Some(policy) = options.keepalive.filter(KeepAlivePolicy::is_set) {
            let watchdog = Watchdog::new(
                Arc::clone(&shared.client),
                policy,
                options.retry_interval,
                shared.cancel.clone(),
            );
            shared.tracker.spawn(watchdog.run());
        }

        let (mut senders, notifications) = notification::channels();
        start_category::<Config, _>(&shared, &mut senders.config)?;

        Ok(Session {
            shared,
            senders,
            notifications: Some(notifications),
        })
    }
}

/// State shared by the session handle and its tasks.
struct SessionShared {
    name: String,
    app_id: u32,
    client: Arc<dyn NdkClient>,
    cancel: CancellationToken,
    tracker: TaskTracker,
    /// `None` once shutdown has taken the list for closing.
    resources: Mutex<Option<Vec<Box<dyn SessionResource>>>>,
    shutdown: OnceCell<()>,
}

impl SessionShared {
    /// Run the shutdown sequence, or wait for the run already in progress.
    async fn shutdown(&self) {
        self.shutdown.get_or_init(|| self.run_shutdown()).await;
    }

    async fn run_shutdown(&self) {
        info!(agent = %self.name, app_id = self.app_id, "Shutting down agent");

        if let Err(e) = registration::unregister(self.client.as_ref(), &self.name).await {
            error!(agent = %self.name, error = %e, "Failed to unregister agent");
        }

        if let Err(e) = self.client.close().await {
            error!(agent = %self.name, error = %e, "Failed to close NDK connection");
        }

        let resources = self.resources.lock().await.take().unwrap_or_default();
        for resource in resources {
            match resource.close().await {
                Ok(()) => debug!(resource = resource.name(), "Closed session resource"),
                Err(e) => error!(
                    resource = resource.name(),
                    error = %e,
                    "Failed to close session resource"
                ),
            }
        }

        self.cancel.cancel();
        info!(agent = %self.name, "Agent shut down");
    }
}

fn spawn_shutdown_trigger(
    shared: &Arc<SessionShared>,
    handle_signals: bool,
    external: Option<CancellationToken>,
) {
    let session = Arc::clone(shared);
    shared.tracker.spawn(async move {
        let signal = async {
            if handle_signals {
                shutdown_signal().await;
            } else {
                std::future::pending::<()>().await;
            }
        };
        let external = async {
            match &external {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = session.cancel.cancelled() => return,
            _ = signal => {}
            _ = external => info!("External shutdown requested"),
        }
        session.shutdown().await;
    });
}

/// Resolves on the first SIGINT or SIGTERM.
///
/// A handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT (Ctrl+C)"),
            Err(e) => {
                warn!("Failed to listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let sigterm = async {
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                    info!("Received SIGTERM");
                }
                Err(e) => {
                    warn!("Failed to create SIGTERM handler: {e}");
                    std::future::pending::<()>().await;
                }
            }
        };

        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm => {}
        }
    }

    #[cfg(not(unix))]
    ctrl_c.await;
}

fn start_category<C, S>(shared: &SessionShared, slot: &mut Option<S>) -> Result<(), AgentError>
where
    C: NotificationCategory,
    S: NotificationSink<C::Payload>,
{
    if shared.cancel.is_cancelled() {
        return Err(AgentError::SessionClosed);
    }
    let sink = slot
        .take()
        .ok_or(AgentError::CategoryAlreadyStarted { category: C::NAME })?;
    debug!(category = C::NAME, "Starting notification stream");
    shared.tracker.spawn(notification::receive::<C, S>(
        Arc::clone(&shared.client),
        sink,
        shared.cancel.clone(),
    ));
    Ok(())
}

/// A registered agent session.
///
/// Dropping the session cancels its tasks without unregistering; call
/// [`Session::shutdown`] for a clean exit.
pub struct Session {
    shared: Arc<SessionShared>,
    senders: NotificationSenders,
    notifications: Option<Notifications>,
}

impl Session {
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// App id assigned by `sdk_mgr` at registration.
    pub fn app_id(&self) -> u32 {
        self.shared.app_id
    }

    /// Token cancelled as the last step of shutdown.
    ///
    /// This is a child token: cancelling it does not shut the session down.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shared.cancel.child_token()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Take the notification queues. Returns `None` after the first call.
    pub fn take_notifications(&mut self) -> Option<Notifications> {
        self.notifications.take()
    }

    pub fn receive_interface_notifications(&mut self) -> Result<(), AgentError> {
        start_category::<Interface, _>(&self.shared, &mut self.senders.interface)
    }

    pub fn receive_network_instance_notifications(&mut self) -> Result<(), AgentError> {
        start_category::<NetworkInstance, _>(&self.shared, &mut self.senders.network_instance)
    }

    pub fn receive_route_notifications(&mut self) -> Result<(), AgentError> {
        start_category::<Route, _>(&self.shared, &mut self.senders.route)
    }

    pub fn receive_next_hop_group_notifications(&mut self) -> Result<(), AgentError> {
        start_category::<NextHopGroup, _>(&self.shared, &mut self.senders.next_hop_group)
    }

    pub fn receive_lldp_neighbor_notifications(&mut self) -> Result<(), AgentError> {
        start_category::<LldpNeighbor, _>(&self.shared, &mut self.senders.lldp_neighbor)
    }

    pub fn receive_bfd_session_notifications(&mut self) -> Result<(), AgentError> {
        start_category::<BfdSession, _>(&self.shared, &mut self.senders.bfd_session)
    }

    pub fn receive_app_identity_notifications(&mut self) -> Result<(), AgentError> {
        start_category::<AppIdentity, _>(&self.shared, &mut self.senders.app_identity)
    }

    /// Start `category` by name.
    pub fn receive(&mut self, category: Category) -> Result<(), AgentError> {
        match category {
            Category::Interface => self.receive_interface_notifications(),
            Category::NetworkInstance => self.receive_network_instance_notifications(),
            Category::Route => self.receive_route_notifications(),
            Category::NextHopGroup => self.receive_next_hop_group_notifications(),
            Category::Lldp => self.receive_lldp_neighbor_notifications(),
            Category::Bfd => self.receive_bfd_session_notifications(),
            Category::AppId => self.receive_app_identity_notifications(),
        }
    }

    /// Close `resource` during shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::SessionClosed`] once shutdown has started
    /// closing resources.
    pub async fn attach(&self, resource: impl SessionResource + 'static) -> Result<(), AgentError> {
        match self.shared.resources.lock().await.as_mut() {
            Some(resources) => {
                resources.push(Box::new(resource));
                Ok(())
            }
            None => Err(AgentError::SessionClosed),
        }
    }

    /// Run the shutdown sequence (once) and wait for every session task.
    pub async fn shutdown(&self) {
        self.shared.shutdown().await;
        self.join().await;
    }

    /// Wait until shutdown has been triggered by any path, then for every
    /// session task.
    pub async fn wait(&self) {
        self.shared.cancel.cancelled().await;
        self.join().await;
    }

    async fn join(&self) {
        self.shared.tracker.close();
        self.shared.tracker.wait().await;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.shared.cancel.is_cancelled() {
            debug!(agent = %self.shared.name, "Session dropped without shutdown");
            self.shared.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests;

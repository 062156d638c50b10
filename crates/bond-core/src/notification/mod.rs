//! Notification stream multiplexer.
//!
//! Every category runs the same pull loop: allocate a stream on `sdk_mgr`, add
//! the category subscription to it, then pull frames and push each extracted
//! payload into the category's queue. Queues hold a single item, so a slow
//! consumer holds back its own stream and no other.
//!
//! The pull loop owns the only sender of its queue. When the loop ends
//! (stream ended, receive error, cancellation) the sender is dropped and the
//! consumer sees the queue close. That is the only terminal signal.

mod category;

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use bond_proto::notification_register_request::Operation;
use bond_proto::{
    AppIdentNotification, BfdSessionNotification, ConfigNotification, InterfaceNotification,
    IpRouteNotification, LldpNeighborNotification, NetworkInstanceNotification,
    NextHopGroupNotification, NotificationRegisterRequest, SdkMgrStatus,
};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::{FrameStream, NdkClient};

pub use category::{
    AppIdentity, BfdSession, Config, Interface, LldpNeighbor, NetworkInstance, NextHopGroup,
    NotificationCategory, Route,
};

/// Capacity of every category queue.
pub const QUEUE_CAPACITY: usize = 1;

/// Categories an application can start on demand.
///
/// Configuration is not listed: its stream is started with the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Interface,
    NetworkInstance,
    Route,
    NextHopGroup,
    Lldp,
    Bfd,
    AppId,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Interface,
        Category::NetworkInstance,
        Category::Route,
        Category::NextHopGroup,
        Category::Lldp,
        Category::Bfd,
        Category::AppId,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Interface => Interface::NAME,
            Category::NetworkInstance => NetworkInstance::NAME,
            Category::Route => Route::NAME,
            Category::NextHopGroup => NextHopGroup::NAME,
            Category::Lldp => LldpNeighbor::NAME,
            Category::Bfd => BfdSession::NAME,
            Category::AppId => AppIdentity::NAME,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown notification category {0:?}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// The consumer side of a category queue has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("notification sink closed")]
pub struct SinkClosed;

/// Where a pull loop delivers extracted payloads.
pub trait NotificationSink<T>: Send + 'static {
    /// Deliver one payload, waiting until the consumer can take it.
    fn deliver(&mut self, item: T) -> impl Future<Output = Result<(), SinkClosed>> + Send;
}

impl<T: Send + 'static> NotificationSink<T> for mpsc::Sender<T> {
    async fn deliver(&mut self, item: T) -> Result<(), SinkClosed> {
        self.send(item).await.map_err(|_| SinkClosed)
    }
}

/// Sink for the configuration stream.
///
/// Commit-end markers are not forwarded. The first one raises the
/// full-configuration signal, which then closes.
#[derive(Debug)]
pub struct ConfigSink {
    config: mpsc::Sender<ConfigNotification>,
    full_config: Option<mpsc::Sender<()>>,
}

impl ConfigSink {
    pub fn new(config: mpsc::Sender<ConfigNotification>, full_config: mpsc::Sender<()>) -> Self {
        Self {
            config,
            full_config: Some(full_config),
        }
    }
}

impl NotificationSink<ConfigNotification> for ConfigSink {
    async fn deliver(&mut self, item: ConfigNotification) -> Result<(), SinkClosed> {
        if item.is_commit_end() {
            if let Some(signal) = self.full_config.take() {
                info!("Full configuration received");
                // Fresh queue, so the single slot is free.
                let _ = signal.try_send(());
            }
            return Ok(());
        }
        self.config.send(item).await.map_err(|_| SinkClosed)
    }
}

/// Receiving ends of every category queue.
///
/// A queue that yields `None` will never deliver again.
#[derive(Debug)]
pub struct Notifications {
    pub full_config_received: mpsc::Receiver<()>,
    pub config: mpsc::Receiver<ConfigNotification>,
    pub interface: mpsc::Receiver<InterfaceNotification>,
    pub network_instance: mpsc::Receiver<NetworkInstanceNotification>,
    pub route: mpsc::Receiver<IpRouteNotification>,
    pub next_hop_group: mpsc::Receiver<NextHopGroupNotification>,
    pub lldp_neighbor: mpsc::Receiver<LldpNeighborNotification>,
    pub bfd_session: mpsc::Receiver<BfdSessionNotification>,
    pub app_identity: mpsc::Receiver<AppIdentNotification>,
}

/// Producer ends, each taken once by the pull loop that owns it.
#[derive(Debug)]
pub(crate) struct NotificationSenders {
    pub(crate) config: Option<ConfigSink>,
    pub(crate) interface: Option<mpsc::Sender<InterfaceNotification>>,
    pub(crate) network_instance: Option<mpsc::Sender<NetworkInstanceNotification>>,
    pub(crate) route: Option<mpsc::Sender<IpRouteNotification>>,
    pub(crate) next_hop_group: Option<mpsc::Sender<NextHopGroupNotification>>,
    pub(crate) lldp_neighbor: Option<mpsc::Sender<LldpNeighborNotification>>,
    pub(crate) bfd_session: Option<mpsc::Sender<BfdSessionNotification>>,
    pub(crate) app_identity: Option<mpsc::Sender<AppIdentNotification>>,
}

pub(crate) fn channels() -> (NotificationSenders, Notifications) {
    let (full_config_tx, full_config_received) = mpsc::channel(QUEUE_CAPACITY);
    let (config_tx, config) = mpsc::channel(QUEUE_CAPACITY);
    let (interface_tx, interface) = mpsc::channel(QUEUE_CAPACITY);
    let (network_instance_tx, network_instance) = mpsc::channel(QUEUE_CAPACITY);
    let (route_tx, route) = mpsc::channel(QUEUE_CAPACITY);
    let (next_hop_group_tx, next_hop_group) = mpsc::channel(QUEUE_CAPACITY);
    let (lldp_neighbor_tx, lldp_neighbor) = mpsc::channel(QUEUE_CAPACITY);
    let (bfd_session_tx, bfd_session) = mpsc::channel(QUEUE_CAPACITY);
    let (app_identity_tx, app_identity) = mpsc::channel(QUEUE_CAPACITY);

    let senders = NotificationSenders {
        config: Some(ConfigSink::new(config_tx, full_config_tx)),
        interface: Some(interface_tx),
        network_instance: Some(network_instance_tx),
        route: Some(route_tx),
        next_hop_group: Some(next_hop_group_tx),
        lldp_neighbor: Some(lldp_neighbor_tx),
        bfd_session: Some(bfd_session_tx),
        app_identity: Some(app_identity_tx),
    };
    let receivers = Notifications {
        full_config_received,
        config,
        interface,
        network_instance,
        route,
        next_hop_group,
        lldp_neighbor,
        bfd_session,
        app_identity,
    };
    (senders, receivers)
}

/// Allocate a stream, subscribe `C` on it and open it.
///
/// Returns `None` when the stream cannot be created or opened. A failed
/// subscription is only logged.
async fn open_stream<C: NotificationCategory>(client: &dyn NdkClient) -> Option<(u64, FrameStream)> {
    let create = NotificationRegisterRequest {
        op: Operation::Create as i32,
        ..Default::default()
    };
    let stream_id = match client.notification_register(create).await {
        Ok(resp) if resp.status() == SdkMgrStatus::Success => resp.stream_id,
        Ok(resp) => {
            error!(
                category = C::NAME,
                status = %resp.status(),
                "Failed to create notification stream"
            );
            return None;
        }
        Err(e) => {
            error!(category = C::NAME, error = %e, "Failed to create notification stream");
            return None;
        }
    };

    let subscribe = NotificationRegisterRequest {
        op: Operation::AddSubscription as i32,
        stream_id,
        subscription_types: Some(C::subscription()),
        ..Default::default()
    };
    match client.notification_register(subscribe).await {
        Ok(resp) if resp.status() == SdkMgrStatus::Success => info!(
            category = C::NAME,
            stream_id,
            sub_id = resp.sub_id,
            "Subscribed to {} notifications",
            C::NAME
        ),
        Ok(resp) => warn!(
            category = C::NAME,
            stream_id,
            status = %resp.status(),
            "Failed to subscribe to {} notifications",
            C::NAME
        ),
        Err(e) => warn!(
            category = C::NAME,
            stream_id,
            error = %e,
            "Failed to subscribe to {} notifications",
            C::NAME
        ),
    }

    match client.notification_stream(stream_id).await {
        Ok(frames) => Some((stream_id, frames)),
        Err(e) => {
            error!(category = C::NAME, stream_id, error = %e, "Failed to open notification stream");
            None
        }
    }
}

/// Pull loop for one category.
///
/// Runs until the server ends the stream, a receive error occurs or `cancel`
/// fires, then drops `sink`, closing the category queue.
pub async fn receive<C, S>(client: Arc<dyn NdkClient>, mut sink: S, cancel: CancellationToken)
where
    C: NotificationCategory,
    S: NotificationSink<C::Payload>,
{
    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        opened = open_stream::<C>(client.as_ref()) => opened,
    };
    let Some((stream_id, mut frames)) = opened else {
        debug!(category = C::NAME, "Closing notification queue");
        return;
    };

    'stream: loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(category = C::NAME, stream_id, "Notification stream cancelled");
                break;
            }
            frame = frames.next() => frame,
        };

        let frame = match frame {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => {
                error!(category = C::NAME, stream_id, error = %e, "Notification stream failed");
                break;
            }
            None => {
                info!(category = C::NAME, stream_id, "Notification stream ended");
                break;
            }
        };

        debug!(
            category = C::NAME,
            stream_id,
            "Received {} notifications:\n{:#?}",
            frame.notifications.len(),
            frame
        );

        for record in frame.notifications {
            let sub_id = record.sub_id;
            let Some(payload) = C::extract(record) else {
                info!(category = C::NAME, stream_id, sub_id, "Empty {} notification, skipping", C::NAME);
                continue;
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(category = C::NAME, stream_id, "Notification stream cancelled");
                    break 'stream;
                }
                delivered = sink.deliver(payload) => {
                    if delivered.is_err() {
                        debug!(category = C::NAME, stream_id, "Notification queue receiver dropped");
                        break 'stream;
                    }
                }
            }
        }
    }

    drop(sink);
    debug!(category = C::NAME, stream_id, "Closed notification queue");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCall, MockNdkClient, MockReply};
    use bond_proto::notification::SubscriptionTypes as Record;
    use bond_proto::{ConfigKey, InterfaceData, Notification, NotificationStreamResponse};
    use std::time::Duration;
    use tokio::task::JoinHandle;

    fn interface_record(mtu: u32) -> Notification {
        Notification {
            sub_id: 100,
            subscription_types: Some(Record::Interface(InterfaceNotification {
                data: Some(InterfaceData {
                    mtu,
                    ..Default::default()
                }),
                ..Default::default()
            })),
        }
    }

    fn config_record(js_path: &str) -> Notification {
        Notification {
            sub_id: 100,
            subscription_types: Some(Record::Config(ConfigNotification {
                key: Some(ConfigKey {
                    js_path: js_path.to_string(),
                    keys: Vec::new(),
                }),
                ..Default::default()
            })),
        }
    }

    fn frame(records: Vec<Notification>) -> NotificationStreamResponse {
        NotificationStreamResponse {
            notifications: records,
        }
    }

    fn mtu(payload: InterfaceNotification) -> u32 {
        payload.data.unwrap().mtu
    }

    fn spawn_interface(
        client: &MockNdkClient,
        cancel: &CancellationToken,
    ) -> (JoinHandle<()>, mpsc::Receiver<InterfaceNotification>) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let task = tokio::spawn(receive::<Interface, _>(
            Arc::new(client.clone()),
            tx,
            cancel.clone(),
        ));
        (task, rx)
    }

    #[tokio::test]
    async fn test_records_arrive_in_stream_order() {
        let client = MockNdkClient::new();
        let cancel = CancellationToken::new();
        let (task, mut rx) = spawn_interface(&client, &cancel);
        let stream_id = client.wait_for_stream("interface").await;

        client.send_frame(stream_id, frame(vec![interface_record(1), interface_record(2)]));
        client.send_frame(stream_id, frame(vec![interface_record(3)]));
        client.send_frame(stream_id, frame(vec![interface_record(4), interface_record(5)]));
        client.end_stream(stream_id);

        let mut received = Vec::new();
        while let Some(payload) = rx.recv().await {
            received.push(mtu(payload));
        }
        assert_eq!(received, vec![1, 2, 3, 4, 5]);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_creates_subscribes_then_opens() {
        let client = MockNdkClient::new();
        let cancel = CancellationToken::new();
        let (task, _rx) = spawn_interface(&client, &cancel);
        let stream_id = client.wait_for_stream("interface").await;

        assert_eq!(
            client.calls(),
            vec![
                MockCall::CreateStream { stream_id },
                MockCall::Subscribe {
                    stream_id,
                    category: "interface"
                },
                MockCall::OpenStream { stream_id },
            ]
        );
        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_record_is_skipped_without_ending_stream() {
        let client = MockNdkClient::new();
        let cancel = CancellationToken::new();
        let (task, mut rx) = spawn_interface(&client, &cancel);
        let stream_id = client.wait_for_stream("interface").await;

        let empty = Notification {
            sub_id: 100,
            subscription_types: None,
        };
        client.send_frame(stream_id, frame(vec![empty.clone(), interface_record(7)]));
        assert_eq!(mtu(rx.recv().await.unwrap()), 7);

        client.send_frame(stream_id, frame(vec![empty, config_record(".x")]));
        client.send_frame(stream_id, frame(vec![interface_record(8)]));
        assert_eq!(mtu(rx.recv().await.unwrap()), 8);

        client.end_stream(stream_id);
        assert!(rx.recv().await.is_none());
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_receive_error_closes_queue() {
        let client = MockNdkClient::new();
        let cancel = CancellationToken::new();
        let (task, mut rx) = spawn_interface(&client, &cancel);
        let stream_id = client.wait_for_stream("interface").await;

        client.send_frame(stream_id, frame(vec![interface_record(1)]));
        client.fail_stream(stream_id);

        assert_eq!(mtu(rx.recv().await.unwrap()), 1);
        assert!(rx.recv().await.is_none());
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_closes_idle_queue() {
        let client = MockNdkClient::new();
        let cancel = CancellationToken::new();
        let (task, mut rx) = spawn_interface(&client, &cancel);
        client.wait_for_stream("interface").await;

        cancel.cancel();

        assert!(rx.recv().await.is_none());
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_interrupts_blocked_delivery() {
        let client = MockNdkClient::new();
        let cancel = CancellationToken::new();
        let (task, mut rx) = spawn_interface(&client, &cancel);
        let stream_id = client.wait_for_stream("interface").await;

        client.send_frame(
            stream_id,
            frame(vec![interface_record(1), interface_record(2), interface_record(3)]),
        );
        // Queue holds one item; the loop is now parked on the second.
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        task.await.unwrap();

        assert_eq!(mtu(rx.recv().await.unwrap()), 1);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_receiver_ends_loop() {
        let client = MockNdkClient::new();
        let cancel = CancellationToken::new();
        let (task, rx) = spawn_interface(&client, &cancel);
        let stream_id = client.wait_for_stream("interface").await;

        drop(rx);
        client.send_frame(stream_id, frame(vec![interface_record(1)]));

        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_subscription_failure_is_not_fatal() {
        let client = MockNdkClient::new();
        client.set_subscribe_reply(MockReply::Failed);
        let cancel = CancellationToken::new();
        let (task, mut rx) = spawn_interface(&client, &cancel);
        let stream_id = client.wait_for_stream("interface").await;

        client.send_frame(stream_id, frame(vec![interface_record(9)]));
        assert_eq!(mtu(rx.recv().await.unwrap()), 9);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_create_failure_closes_queue_without_opening() {
        let client = MockNdkClient::new();
        client.set_create_stream_reply(MockReply::Failed);
        let cancel = CancellationToken::new();
        let (task, mut rx) = spawn_interface(&client, &cancel);

        assert!(rx.recv().await.is_none());
        task.await.unwrap();
        assert_eq!(
            client.count(|call| matches!(call, MockCall::OpenStream { .. })),
            0
        );
    }

    #[tokio::test]
    async fn test_config_sink_signals_first_commit_end() {
        let client = MockNdkClient::new();
        let cancel = CancellationToken::new();
        let (senders, mut notifications) = channels();
        let sink = senders.config.unwrap();
        let task = tokio::spawn(receive::<Config, _>(
            Arc::new(client.clone()),
            sink,
            cancel.clone(),
        ));
        let stream_id = client.wait_for_stream("config").await;

        client.send_frame(
            stream_id,
            frame(vec![
                config_record(".greeter"),
                config_record(".commit.end"),
                config_record(".greeter.name"),
                config_record(".commit.end"),
            ]),
        );

        let first = notifications.config.recv().await.unwrap();
        assert_eq!(first.key.unwrap().js_path, ".greeter");
        let second = notifications.config.recv().await.unwrap();
        assert_eq!(second.key.unwrap().js_path, ".greeter.name");

        assert_eq!(notifications.full_config_received.recv().await, Some(()));
        assert_eq!(notifications.full_config_received.recv().await, None);

        client.end_stream(stream_id);
        assert!(notifications.config.recv().await.is_none());
        task.await.unwrap();
    }

    #[test]
    fn test_category_parse_and_display() {
        for category in Category::ALL {
            assert_eq!(category.to_string().parse::<Category>().unwrap(), category);
        }
        assert_eq!("lldp".parse::<Category>().unwrap(), Category::Lldp);
        assert_eq!("app-id".parse::<Category>().unwrap(), Category::AppId);
        assert!("config".parse::<Category>().is_err());
        assert!("routes".parse::<Category>().is_err());
    }
}

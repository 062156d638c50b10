//! Scripted in-memory NDK client for testing
//!
//! Simulates `sdk_mgr` without a socket: replies are scripted per RPC, every
//! call is recorded, and notification streams are fed frame by frame by the
//! test.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bond_proto::notification_register_request::{Operation, SubscriptionTypes};
use bond_proto::{
    AgentRegistrationRequest, AgentRegistrationResponse, KeepAliveResponse,
    NotificationRegisterRequest, NotificationRegisterResponse, NotificationStreamResponse,
    SdkMgrStatus,
};
use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::client::{FrameStream, NdkClient};
use crate::transport::{Result, TransportError};

/// Scripted outcome of one RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockReply {
    /// Response with `SDK_MGR_STATUS_SUCCESS`
    Success,
    /// Response with `SDK_MGR_STATUS_FAILED`
    Failed,
    /// Transport-level error, no response
    Unavailable,
}

/// A recorded call against the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Register(AgentRegistrationRequest),
    Unregister,
    KeepAlive,
    CreateStream { stream_id: u64 },
    Subscribe { stream_id: u64, category: &'static str },
    OpenStream { stream_id: u64 },
    Close,
}

type FrameSender = mpsc::UnboundedSender<Result<NotificationStreamResponse>>;
type FrameReceiver = mpsc::UnboundedReceiver<Result<NotificationStreamResponse>>;

#[derive(Debug)]
struct MockState {
    app_id: u32,
    register_replies: VecDeque<MockReply>,
    unregister_reply: MockReply,
    keepalive_replies: VecDeque<MockReply>,
    create_stream_reply: MockReply,
    subscribe_reply: MockReply,
    fail_close: bool,
    hang_keepalive: bool,
    closed: bool,
    next_stream_id: u64,
    stream_categories: HashMap<u64, &'static str>,
    senders: HashMap<u64, FrameSender>,
    receivers: HashMap<u64, FrameReceiver>,
    calls: Vec<MockCall>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            app_id: 42,
            register_replies: VecDeque::new(),
            unregister_reply: MockReply::Success,
            keepalive_replies: VecDeque::new(),
            create_stream_reply: MockReply::Success,
            subscribe_reply: MockReply::Success,
            fail_close: false,
            hang_keepalive: false,
            closed: false,
            next_stream_id: 1,
            stream_categories: HashMap::new(),
            senders: HashMap::new(),
            receivers: HashMap::new(),
            calls: Vec::new(),
        }
    }
}

/// Mock NDK client
///
/// Clones share state, so a test can keep one handle while the session owns
/// another. Unscripted RPCs succeed.
#[derive(Debug, Clone, Default)]
pub struct MockNdkClient {
    state: Arc<Mutex<MockState>>,
}

fn status(reply: MockReply) -> Result<i32> {
    match reply {
        MockReply::Success => Ok(SdkMgrStatus::Success as i32),
        MockReply::Failed => Ok(SdkMgrStatus::Failed as i32),
        MockReply::Unavailable => Err(TransportError::Rpc(tonic::Status::unavailable(
            "sdk_mgr unavailable",
        ))),
    }
}

fn subscription_category(subscription: Option<&SubscriptionTypes>) -> &'static str {
    match subscription {
        Some(SubscriptionTypes::Interface(_)) => "interface",
        Some(SubscriptionTypes::NetworkInstance(_)) => "network-instance",
        Some(SubscriptionTypes::LldpNeighbor(_)) => "lldp",
        Some(SubscriptionTypes::Config(_)) => "config",
        Some(SubscriptionTypes::BfdSession(_)) => "bfd",
        Some(SubscriptionTypes::Route(_)) => "route",
        Some(SubscriptionTypes::Appid(_)) => "app-id",
        Some(SubscriptionTypes::Nhg(_)) => "next-hop-group",
        None => "none",
    }
}

impl MockNdkClient {
    /// Create a mock where every RPC succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// App id returned on successful registration
    pub fn set_app_id(&self, app_id: u32) {
        self.state.lock().unwrap().app_id = app_id;
    }

    /// Queue registration replies, consumed one per attempt
    pub fn script_register(&self, replies: impl IntoIterator<Item = MockReply>) {
        self.state.lock().unwrap().register_replies.extend(replies);
    }

    /// Queue keepalive replies, consumed one per heartbeat
    pub fn script_keepalive(&self, replies: impl IntoIterator<Item = MockReply>) {
        self.state.lock().unwrap().keepalive_replies.extend(replies);
    }

    pub fn set_unregister_reply(&self, reply: MockReply) {
        self.state.lock().unwrap().unregister_reply = reply;
    }

    pub fn set_create_stream_reply(&self, reply: MockReply) {
        self.state.lock().unwrap().create_stream_reply = reply;
    }

    pub fn set_subscribe_reply(&self, reply: MockReply) {
        self.state.lock().unwrap().subscribe_reply = reply;
    }

    /// Make heartbeats hang: `keep_alive()` is recorded but never answers
    pub fn set_keepalive_hang(&self, hang: bool) {
        self.state.lock().unwrap().hang_keepalive = hang;
    }

    /// Make `close()` fail
    pub fn set_fail_close(&self, fail: bool) {
        self.state.lock().unwrap().fail_close = fail;
    }

    /// All calls recorded so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of recorded calls matching `predicate`
    pub fn count(&self, predicate: impl Fn(&MockCall) -> bool) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| predicate(call))
            .count()
    }

    /// Stream id allocated for `category`, if its subscription was added
    pub fn stream_for(&self, category: &str) -> Option<u64> {
        let state = self.state.lock().unwrap();
        state
            .stream_categories
            .iter()
            .find(|(_, c)| **c == category)
            .map(|(id, _)| *id)
    }

    /// Wait (polling) until `category` has an open stream, returning its id
    pub async fn wait_for_stream(&self, category: &str) -> u64 {
        loop {
            if let Some(stream_id) = self.stream_for(category) {
                let opened = self.count(|call| *call == MockCall::OpenStream { stream_id }) > 0;
                if opened {
                    return stream_id;
                }
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    /// Push one frame onto a stream
    pub fn send_frame(&self, stream_id: u64, frame: NotificationStreamResponse) {
        let state = self.state.lock().unwrap();
        if let Some(tx) = state.senders.get(&stream_id) {
            let _ = tx.send(Ok(frame));
        }
    }

    /// Fail a stream with a receive error
    pub fn fail_stream(&self, stream_id: u64) {
        let mut state = self.state.lock().unwrap();
        if let Some(tx) = state.senders.remove(&stream_id) {
            let _ = tx.send(Err(TransportError::Rpc(tonic::Status::internal(
                "stream reset",
            ))));
        }
    }

    /// Half-close a stream from the server side
    pub fn end_stream(&self, stream_id: u64) {
        self.state.lock().unwrap().senders.remove(&stream_id);
    }

    fn record(&self, call: MockCall) -> std::sync::MutexGuard<'_, MockState> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state
    }
}

#[async_trait]
impl NdkClient for MockNdkClient {
    async fn agent_register(
        &self,
        request: AgentRegistrationRequest,
    ) -> Result<AgentRegistrationResponse> {
        let mut state = self.record(MockCall::Register(request));
        if state.closed {
            return Err(TransportError::Closed);
        }
        let reply = state
            .register_replies
            .pop_front()
            .unwrap_or(MockReply::Success);
        let status = status(reply)?;
        let app_id = if reply == MockReply::Success {
            state.app_id
        } else {
            0
        };
        Ok(AgentRegistrationResponse {
            status,
            error_str: String::new(),
            app_id,
        })
    }

    async fn agent_unregister(&self) -> Result<AgentRegistrationResponse> {
        let state = self.record(MockCall::Unregister);
        if state.closed {
            return Err(TransportError::Closed);
        }
        Ok(AgentRegistrationResponse {
            status: status(state.unregister_reply)?,
            error_str: String::new(),
            app_id: state.app_id,
        })
    }

    async fn keep_alive(&self) -> Result<KeepAliveResponse> {
        let reply = {
            let mut state = self.record(MockCall::KeepAlive);
            if state.closed {
                return Err(TransportError::Closed);
            }
            if state.hang_keepalive {
                None
            } else {
                Some(
                    state
                        .keepalive_replies
                        .pop_front()
                        .unwrap_or(MockReply::Success),
                )
            }
        };
        let Some(reply) = reply else {
            return std::future::pending().await;
        };
        Ok(KeepAliveResponse {
            status: status(reply)?,
            error_str: String::new(),
        })
    }

    async fn notification_register(
        &self,
        request: NotificationRegisterRequest,
    ) -> Result<NotificationRegisterResponse> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(TransportError::Closed);
        }

        match request.op() {
            Operation::Create => {
                let stream_id = state.next_stream_id;
                state.calls.push(MockCall::CreateStream { stream_id });
                let status = status(state.create_stream_reply)?;
                if status != SdkMgrStatus::Success as i32 {
                    return Ok(NotificationRegisterResponse {
                        stream_id: 0,
                        sub_id: 0,
                        status,
                    });
                }
                state.next_stream_id += 1;
                let (tx, rx) = mpsc::unbounded_channel();
                state.senders.insert(stream_id, tx);
                state.receivers.insert(stream_id, rx);
                Ok(NotificationRegisterResponse {
                    stream_id,
                    sub_id: 0,
                    status,
                })
            }
            _ => {
                let stream_id = request.stream_id;
                let category = subscription_category(request.subscription_types.as_ref());
                state.calls.push(MockCall::Subscribe {
                    stream_id,
                    category,
                });
                state.stream_categories.insert(stream_id, category);
                Ok(NotificationRegisterResponse {
                    stream_id,
                    sub_id: stream_id * 100,
                    status: status(state.subscribe_reply)?,
                })
            }
        }
    }

    async fn notification_stream(&self, stream_id: u64) -> Result<FrameStream> {
        let mut state = self.record(MockCall::OpenStream { stream_id });
        if state.closed {
            return Err(TransportError::Closed);
        }
        let Some(rx) = state.receivers.remove(&stream_id) else {
            return Err(TransportError::Rpc(tonic::Status::not_found(format!(
                "unknown stream {stream_id}"
            ))));
        };
        let frames = futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|frame| (frame, rx))
        });
        Ok(frames.boxed())
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.record(MockCall::Close);
        if state.fail_close {
            return Err(TransportError::Rpc(tonic::Status::internal(
                "channel close failed",
            )));
        }
        if state.closed {
            return Err(TransportError::Closed);
        }
        state.closed = true;
        Ok(())
    }
}

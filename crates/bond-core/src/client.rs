//! NDK client seam shared by every session task.
//!
//! [`NdkClient`] is the boundary between the session layer and the wire. The
//! production implementation, [`GrpcNdkClient`], calls the NDK gRPC services
//! over a connected channel; tests use the scripted `MockNdkClient`
//! (feature `test-support`).
//!
//! The trait is object-safe via [`async_trait`] so a single
//! `Arc<dyn NdkClient>` can be shared read-only by the watchdog, every
//! notification pull loop and the shutdown sequence.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use bond_proto::{
    AgentRegistrationRequest, AgentRegistrationResponse, KeepAliveRequest, KeepAliveResponse,
    NotificationRegisterRequest, NotificationRegisterResponse, NotificationStreamRequest,
    NotificationStreamResponse, SdkMgrServiceClient, SdkNotificationServiceClient,
};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tonic::metadata::AsciiMetadataValue;
use tonic::transport::Channel;
use tracing::debug;

use crate::transport::{Result, TransportError};

/// Metadata key identifying the agent on every outgoing request.
pub const AGENT_METADATA_KEY: &str = "agent_name";

/// Raw frames of one notification stream, in server order.
pub type FrameStream = BoxStream<'static, Result<NotificationStreamResponse>>;

/// Calls the session layer makes against the NDK service manager.
#[async_trait]
pub trait NdkClient: Send + Sync + std::fmt::Debug {
    /// Register the agent with `sdk_mgr`.
    async fn agent_register(
        &self,
        request: AgentRegistrationRequest,
    ) -> Result<AgentRegistrationResponse>;

    /// Unregister the agent.
    async fn agent_unregister(&self) -> Result<AgentRegistrationResponse>;

    /// Send one heartbeat.
    async fn keep_alive(&self) -> Result<KeepAliveResponse>;

    /// Allocate a notification stream or manage subscriptions on one.
    async fn notification_register(
        &self,
        request: NotificationRegisterRequest,
    ) -> Result<NotificationRegisterResponse>;

    /// Open the server stream for an allocated stream id.
    async fn notification_stream(&self, stream_id: u64) -> Result<FrameStream>;

    /// Stop issuing calls: later calls fail with [`TransportError::Closed`].
    ///
    /// Calls and streams already in flight keep their own handle on the
    /// connection, so it only goes away once they finish or are dropped.
    async fn close(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
struct Stubs {
    sdk_mgr: SdkMgrServiceClient,
    notification: SdkNotificationServiceClient,
}

/// [`NdkClient`] over a tonic channel.
#[derive(Debug)]
pub struct GrpcNdkClient {
    agent_name: AsciiMetadataValue,
    stubs: Mutex<Option<Stubs>>,
}

impl GrpcNdkClient {
    /// Bind the NDK service stubs to `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidAgentName`] if `agent_name` cannot be
    /// sent as ASCII request metadata.
    pub fn new(channel: Channel, agent_name: &str) -> Result<Self> {
        let agent_name = AsciiMetadataValue::try_from(agent_name).map_err(|_| {
            TransportError::InvalidAgentName {
                name: agent_name.to_string(),
            }
        })?;

        Ok(Self {
            agent_name,
            stubs: Mutex::new(Some(Stubs {
                sdk_mgr: SdkMgrServiceClient::new(channel.clone()),
                notification: SdkNotificationServiceClient::new(channel),
            })),
        })
    }

    fn stubs(&self) -> Result<Stubs> {
        self.stubs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(TransportError::Closed)
    }

    fn request<T>(&self, message: T) -> tonic::Request<T> {
        let mut request = tonic::Request::new(message);
        request
            .metadata_mut()
            .insert(AGENT_METADATA_KEY, self.agent_name.clone());
        request
    }
}

#[async_trait]
impl NdkClient for GrpcNdkClient {
    async fn agent_register(
        &self,
        request: AgentRegistrationRequest,
    ) -> Result<AgentRegistrationResponse> {
        let mut stubs = self.stubs()?;
        let response = stubs.sdk_mgr.agent_register(self.request(request)).await?;
        Ok(response.into_inner())
    }

    async fn agent_unregister(&self) -> Result<AgentRegistrationResponse> {
        let mut stubs = self.stubs()?;
        let response = stubs
            .sdk_mgr
            .agent_un_register(self.request(AgentRegistrationRequest::default()))
            .await?;
        Ok(response.into_inner())
    }

    async fn keep_alive(&self) -> Result<KeepAliveResponse> {
        let mut stubs = self.stubs()?;
        let response = stubs
            .sdk_mgr
            .keep_alive(self.request(KeepAliveRequest {}))
            .await?;
        Ok(response.into_inner())
    }

    async fn notification_register(
        &self,
        request: NotificationRegisterRequest,
    ) -> Result<NotificationRegisterResponse> {
        let mut stubs = self.stubs()?;
        let response = stubs
            .sdk_mgr
            .notification_register(self.request(request))
            .await?;
        Ok(response.into_inner())
    }

    async fn notification_stream(&self, stream_id: u64) -> Result<FrameStream> {
        let mut stubs = self.stubs()?;
        let response = stubs
            .notification
            .notification_stream(self.request(NotificationStreamRequest { stream_id }))
            .await?;
        Ok(response
            .into_inner()
            .map(|frame| frame.map_err(TransportError::from))
            .boxed())
    }

    async fn close(&self) -> Result<()> {
        let stubs = self
            .stubs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match stubs {
            Some(_) => {
                debug!("Released NDK service handles");
                Ok(())
            }
            None => Err(TransportError::Closed),
        }
    }
}

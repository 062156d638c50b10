//! gRPC client stubs for the NDK management and notification services.

use tonic::codegen::GrpcMethod;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;
use tonic::{IntoRequest, Request, Response, Status, Streaming};

use crate::sdk_service::{
    AgentRegistrationRequest, AgentRegistrationResponse, KeepAliveRequest, KeepAliveResponse,
    NotificationRegisterRequest, NotificationRegisterResponse, NotificationStreamRequest,
    NotificationStreamResponse,
};

const SDK_MGR_SERVICE: &str = "srlinux.sdk.SdkMgrService";
const SDK_NOTIFICATION_SERVICE: &str = "srlinux.sdk.SdkNotificationService";

/// Client for `srlinux.sdk.SdkMgrService`.
#[derive(Debug, Clone)]
pub struct SdkMgrServiceClient {
    inner: tonic::client::Grpc<Channel>,
}

impl SdkMgrServiceClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    pub async fn agent_register(
        &mut self,
        request: impl IntoRequest<AgentRegistrationRequest>,
    ) -> Result<Response<AgentRegistrationResponse>, Status> {
        unary(
            &mut self.inner,
            request.into_request(),
            SDK_MGR_SERVICE,
            "AgentRegister",
            "/srlinux.sdk.SdkMgrService/AgentRegister",
        )
        .await
    }

    pub async fn agent_un_register(
        &mut self,
        request: impl IntoRequest<AgentRegistrationRequest>,
    ) -> Result<Response<AgentRegistrationResponse>, Status> {
        unary(
            &mut self.inner,
            request.into_request(),
            SDK_MGR_SERVICE,
            "AgentUnRegister",
            "/srlinux.sdk.SdkMgrService/AgentUnRegister",
        )
        .await
    }

    pub async fn notification_register(
        &mut self,
        request: impl IntoRequest<NotificationRegisterRequest>,
    ) -> Result<Response<NotificationRegisterResponse>, Status> {
        unary(
            &mut self.inner,
            request.into_request(),
            SDK_MGR_SERVICE,
            "NotificationRegister",
            "/srlinux.sdk.SdkMgrService/NotificationRegister",
        )
        .await
    }

    pub async fn keep_alive(
        &mut self,
        request: impl IntoRequest<KeepAliveRequest>,
    ) -> Result<Response<KeepAliveResponse>, Status> {
        unary(
            &mut self.inner,
            request.into_request(),
            SDK_MGR_SERVICE,
            "KeepAlive",
            "/srlinux.sdk.SdkMgrService/KeepAlive",
        )
        .await
    }
}

/// Client for `srlinux.sdk.SdkNotificationService`.
#[derive(Debug, Clone)]
pub struct SdkNotificationServiceClient {
    inner: tonic::client::Grpc<Channel>,
}

impl SdkNotificationServiceClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    /// Open the server stream for an allocated notification stream id.
    pub async fn notification_stream(
        &mut self,
        request: impl IntoRequest<NotificationStreamRequest>,
    ) -> Result<Response<Streaming<NotificationStreamResponse>>, Status> {
        ready(&mut self.inner).await?;
        let codec =
            tonic::codec::ProstCodec::<NotificationStreamRequest, NotificationStreamResponse>::default();
        let path = PathAndQuery::from_static("/srlinux.sdk.SdkNotificationService/NotificationStream");
        let mut req = request.into_request();
        req.extensions_mut()
            .insert(GrpcMethod::new(SDK_NOTIFICATION_SERVICE, "NotificationStream"));
        self.inner.server_streaming(req, path, codec).await
    }
}

async fn ready(inner: &mut tonic::client::Grpc<Channel>) -> Result<(), Status> {
    inner
        .ready()
        .await
        .map_err(|e| Status::unknown(format!("Service was not ready: {e}")))
}

async fn unary<Req, Resp>(
    inner: &mut tonic::client::Grpc<Channel>,
    mut request: Request<Req>,
    service: &'static str,
    method: &'static str,
    path: &'static str,
) -> Result<Response<Resp>, Status>
where
    Req: prost::Message + Send + Sync + 'static,
    Resp: prost::Message + Default + Send + Sync + 'static,
{
    ready(inner).await?;
    let codec = tonic::codec::ProstCodec::<Req, Resp>::default();
    request
        .extensions_mut()
        .insert(GrpcMethod::new(service, method));
    inner
        .unary(request, PathAndQuery::from_static(path), codec)
        .await
}

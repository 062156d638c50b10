//! `SdkMgrService` / `SdkNotificationService` request and response messages.

use crate::payload::{
    AppIdentNotification, BfdSessionNotification, ConfigNotification, InterfaceNotification,
    IpRouteNotification, LldpNeighborNotification, NetworkInstanceNotification,
    NextHopGroupNotification,
};

/// Status returned by `sdk_mgr` for every management call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SdkMgrStatus {
    Success = 0,
    Failed = 1,
}

impl SdkMgrStatus {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Success => "SDK_MGR_STATUS_SUCCESS",
            Self::Failed => "SDK_MGR_STATUS_FAILED",
        }
    }
}

impl std::fmt::Display for SdkMgrStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str_name())
    }
}

/// Registration request. Also sent (empty) to unregister.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AgentRegistrationRequest {
    /// `sdk_mgr` waits for an explicit acknowledgement after delivering configuration.
    #[prost(bool, tag = "1")]
    pub wait_config_ack: bool,
    /// `sdk_mgr` publishes the agent's configuration as state automatically.
    #[prost(bool, tag = "2")]
    pub auto_telemetry_state: bool,
    /// `sdk_mgr` caches notifications streamed to the agent.
    #[prost(bool, tag = "3")]
    pub enable_cache: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AgentRegistrationResponse {
    #[prost(enumeration = "SdkMgrStatus", tag = "1")]
    pub status: i32,
    #[prost(string, tag = "2")]
    pub error_str: String,
    #[prost(uint32, tag = "3")]
    pub app_id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeepAliveRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeepAliveResponse {
    #[prost(enumeration = "SdkMgrStatus", tag = "1")]
    pub status: i32,
    #[prost(string, tag = "2")]
    pub error_str: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InterfaceSubscriptionRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NetworkInstanceSubscriptionRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LldpNeighborSubscriptionRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConfigSubscriptionRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BfdSessionSubscriptionRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IpRouteSubscriptionRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AppIdentSubscriptionRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NextHopGroupSubscriptionRequest {}

/// Allocates a notification stream (`Create`) or manages subscriptions on one.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NotificationRegisterRequest {
    #[prost(enumeration = "notification_register_request::Operation", tag = "1")]
    pub op: i32,
    #[prost(uint64, tag = "2")]
    pub stream_id: u64,
    #[prost(uint64, tag = "5")]
    pub sub_id: u64,
    #[prost(
        oneof = "notification_register_request::SubscriptionTypes",
        tags = "10, 11, 12, 13, 14, 15, 16, 17"
    )]
    pub subscription_types: Option<notification_register_request::SubscriptionTypes>,
}

pub mod notification_register_request {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Operation {
        Create = 0,
        Delete = 1,
        AddSubscription = 2,
        DeleteSubscription = 3,
    }

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum SubscriptionTypes {
        #[prost(message, tag = "10")]
        Interface(super::InterfaceSubscriptionRequest),
        #[prost(message, tag = "11")]
        NetworkInstance(super::NetworkInstanceSubscriptionRequest),
        #[prost(message, tag = "12")]
        LldpNeighbor(super::LldpNeighborSubscriptionRequest),
        #[prost(message, tag = "13")]
        Config(super::ConfigSubscriptionRequest),
        #[prost(message, tag = "14")]
        BfdSession(super::BfdSessionSubscriptionRequest),
        #[prost(message, tag = "15")]
        Route(super::IpRouteSubscriptionRequest),
        #[prost(message, tag = "16")]
        Appid(super::AppIdentSubscriptionRequest),
        #[prost(message, tag = "17")]
        Nhg(super::NextHopGroupSubscriptionRequest),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NotificationRegisterResponse {
    #[prost(uint64, tag = "1")]
    pub stream_id: u64,
    #[prost(uint64, tag = "2")]
    pub sub_id: u64,
    #[prost(enumeration = "SdkMgrStatus", tag = "3")]
    pub status: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NotificationStreamRequest {
    #[prost(uint64, tag = "1")]
    pub stream_id: u64,
}

/// One frame of a notification stream.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NotificationStreamResponse {
    #[prost(message, repeated, tag = "1")]
    pub notifications: Vec<Notification>,
}

/// A single category-tagged record inside a stream frame.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Notification {
    #[prost(uint64, tag = "1")]
    pub sub_id: u64,
    #[prost(
        oneof = "notification::SubscriptionTypes",
        tags = "10, 11, 12, 13, 14, 15, 16, 17"
    )]
    pub subscription_types: Option<notification::SubscriptionTypes>,
}

pub mod notification {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum SubscriptionTypes {
        #[prost(message, tag = "10")]
        Interface(super::InterfaceNotification),
        #[prost(message, tag = "11")]
        NetworkInstance(super::NetworkInstanceNotification),
        #[prost(message, tag = "12")]
        LldpNeighbor(super::LldpNeighborNotification),
        #[prost(message, tag = "13")]
        Config(super::ConfigNotification),
        #[prost(message, tag = "14")]
        BfdSession(super::BfdSessionNotification),
        #[prost(message, tag = "15")]
        Route(super::IpRouteNotification),
        #[prost(message, tag = "16")]
        Appid(super::AppIdentNotification),
        #[prost(message, tag = "17")]
        Nhg(super::NextHopGroupNotification),
    }
}

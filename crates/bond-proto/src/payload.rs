//! Category payloads carried inside streamed notifications.
//!
//! Each payload follows the NDK `op` / `key` / `data` layout. The session layer
//! does not interpret them; they are delivered to applications as-is.

/// Operation reported by a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SdkMgrOperation {
    Create = 0,
    Update = 1,
    Delete = 2,
}

impl SdkMgrOperation {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Create => "SDK_MGR_OPERATION_CREATE",
            Self::Update => "SDK_MGR_OPERATION_UPDATE",
            Self::Delete => "SDK_MGR_OPERATION_DELETE",
        }
    }
}

// interface

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InterfaceKey {
    #[prost(string, tag = "1")]
    pub if_name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InterfaceData {
    #[prost(bool, tag = "1")]
    pub admin_is_up: bool,
    #[prost(bool, tag = "2")]
    pub oper_is_up: bool,
    #[prost(uint32, tag = "3")]
    pub mtu: u32,
    #[prost(string, tag = "4")]
    pub description: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InterfaceNotification {
    #[prost(enumeration = "SdkMgrOperation", tag = "1")]
    pub op: i32,
    #[prost(message, optional, tag = "2")]
    pub key: Option<InterfaceKey>,
    #[prost(message, optional, tag = "3")]
    pub data: Option<InterfaceData>,
}

// network instance

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NetworkInstanceKey {
    #[prost(string, tag = "1")]
    pub inst_name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NetworkInstanceData {
    #[prost(bool, tag = "1")]
    pub oper_is_up: bool,
    #[prost(uint32, tag = "2")]
    pub vrf_id: u32,
    #[prost(string, tag = "3")]
    pub description: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NetworkInstanceNotification {
    #[prost(enumeration = "SdkMgrOperation", tag = "1")]
    pub op: i32,
    #[prost(message, optional, tag = "2")]
    pub key: Option<NetworkInstanceKey>,
    #[prost(message, optional, tag = "3")]
    pub data: Option<NetworkInstanceData>,
}

// lldp neighbor

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LldpNeighborKey {
    #[prost(string, tag = "1")]
    pub interface_name: String,
    #[prost(string, tag = "2")]
    pub chassis_id: String,
    #[prost(string, tag = "3")]
    pub port_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LldpNeighborData {
    #[prost(string, tag = "1")]
    pub system_name: String,
    #[prost(string, tag = "2")]
    pub system_description: String,
    #[prost(string, tag = "3")]
    pub port_description: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LldpNeighborNotification {
    #[prost(enumeration = "SdkMgrOperation", tag = "1")]
    pub op: i32,
    #[prost(message, optional, tag = "2")]
    pub key: Option<LldpNeighborKey>,
    #[prost(message, optional, tag = "3")]
    pub data: Option<LldpNeighborData>,
}

// configuration

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConfigKey {
    /// Schema path of the changed object, e.g. `.greeter` or `.commit.end`.
    #[prost(string, tag = "1")]
    pub js_path: String,
    /// List keys along the path.
    #[prost(string, repeated, tag = "2")]
    pub keys: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConfigData {
    #[prost(string, tag = "1")]
    pub json: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConfigNotification {
    #[prost(enumeration = "SdkMgrOperation", tag = "1")]
    pub op: i32,
    #[prost(message, optional, tag = "2")]
    pub key: Option<ConfigKey>,
    #[prost(message, optional, tag = "3")]
    pub data: Option<ConfigData>,
}

/// Path the manager uses to mark the end of a configuration commit.
pub const COMMIT_END_PATH: &str = ".commit.end";

impl ConfigNotification {
    /// Returns `true` for the marker that closes a configuration commit.
    pub fn is_commit_end(&self) -> bool {
        self.key
            .as_ref()
            .is_some_and(|key| key.js_path == COMMIT_END_PATH)
    }
}

// bfd session

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BfdSessionKey {
    #[prost(string, tag = "1")]
    pub local_address: String,
    #[prost(string, tag = "2")]
    pub remote_address: String,
    #[prost(uint32, tag = "3")]
    pub instance: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BfdSessionData {
    #[prost(bool, tag = "1")]
    pub status_up: bool,
    #[prost(uint32, tag = "2")]
    pub remote_discriminator: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BfdSessionNotification {
    #[prost(enumeration = "SdkMgrOperation", tag = "1")]
    pub op: i32,
    #[prost(message, optional, tag = "2")]
    pub key: Option<BfdSessionKey>,
    #[prost(message, optional, tag = "3")]
    pub data: Option<BfdSessionData>,
}

// ip route

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RouteKey {
    #[prost(string, tag = "1")]
    pub net_inst_name: String,
    /// Prefix in `address/length` form.
    #[prost(string, tag = "2")]
    pub ip_prefix: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RouteData {
    #[prost(uint64, tag = "1")]
    pub nhg_id: u64,
    #[prost(uint32, tag = "2")]
    pub preference: u32,
    #[prost(uint32, tag = "3")]
    pub metric: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IpRouteNotification {
    #[prost(enumeration = "SdkMgrOperation", tag = "1")]
    pub op: i32,
    #[prost(message, optional, tag = "2")]
    pub key: Option<RouteKey>,
    #[prost(message, optional, tag = "3")]
    pub data: Option<RouteData>,
}

// application identity

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AppIdentKey {
    #[prost(uint32, tag = "1")]
    pub id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AppIdentData {
    #[prost(string, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AppIdentNotification {
    #[prost(enumeration = "SdkMgrOperation", tag = "1")]
    pub op: i32,
    #[prost(message, optional, tag = "2")]
    pub key: Option<AppIdentKey>,
    #[prost(message, optional, tag = "3")]
    pub data: Option<AppIdentData>,
}

// next hop group

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NextHopGroupKey {
    #[prost(string, tag = "1")]
    pub net_inst_name: String,
    #[prost(string, tag = "2")]
    pub name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NextHopGroupData {
    /// Next-hop addresses in the group.
    #[prost(string, repeated, tag = "1")]
    pub next_hops: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NextHopGroupNotification {
    #[prost(enumeration = "SdkMgrOperation", tag = "1")]
    pub op: i32,
    #[prost(message, optional, tag = "2")]
    pub key: Option<NextHopGroupKey>,
    #[prost(message, optional, tag = "3")]
    pub data: Option<NextHopGroupData>,
}

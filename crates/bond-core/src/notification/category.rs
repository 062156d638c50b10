//! Category descriptors.
//!
//! Each descriptor ties a subscription filter to the payload it extracts from
//! a streamed record. The pull loop in the parent module is generic over them.

use bond_proto::notification::SubscriptionTypes as Record;
use bond_proto::notification_register_request::SubscriptionTypes;
use bond_proto::{
    AppIdentNotification, AppIdentSubscriptionRequest, BfdSessionNotification,
    BfdSessionSubscriptionRequest, ConfigNotification, ConfigSubscriptionRequest,
    InterfaceNotification, InterfaceSubscriptionRequest, IpRouteNotification,
    IpRouteSubscriptionRequest, LldpNeighborNotification, LldpNeighborSubscriptionRequest,
    NetworkInstanceNotification, NetworkInstanceSubscriptionRequest, NextHopGroupNotification,
    NextHopGroupSubscriptionRequest, Notification,
};

/// A notification category the multiplexer can subscribe to.
pub trait NotificationCategory: Send + 'static {
    /// Typed payload delivered on the category's queue.
    type Payload: std::fmt::Debug + Send + 'static;

    /// Name used in logs and errors.
    const NAME: &'static str;

    /// Filter sent with the `AddSubscription` request.
    fn subscription() -> SubscriptionTypes;

    /// The category payload of `record`, or `None` when absent.
    fn extract(record: Notification) -> Option<Self::Payload>;
}

macro_rules! category {
    ($(#[$meta:meta])* $ty:ident, $name:literal, $variant:ident, $request:ident, $payload:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $ty;

        impl NotificationCategory for $ty {
            type Payload = $payload;
            const NAME: &'static str = $name;

            fn subscription() -> SubscriptionTypes {
                SubscriptionTypes::$variant($request {})
            }

            fn extract(record: Notification) -> Option<Self::Payload> {
                match record.subscription_types {
                    Some(Record::$variant(payload)) => Some(payload),
                    _ => None,
                }
            }
        }
    };
}

category!(
    /// Interface state changes.
    Interface, "interface", Interface, InterfaceSubscriptionRequest, InterfaceNotification
);
category!(
    /// Network instance state changes.
    NetworkInstance,
    "network-instance",
    NetworkInstance,
    NetworkInstanceSubscriptionRequest,
    NetworkInstanceNotification
);
category!(
    /// IP route changes.
    Route, "route", Route, IpRouteSubscriptionRequest, IpRouteNotification
);
category!(
    /// Next hop group changes.
    NextHopGroup,
    "next-hop-group",
    Nhg,
    NextHopGroupSubscriptionRequest,
    NextHopGroupNotification
);
category!(
    /// LLDP neighbor discovery.
    LldpNeighbor, "lldp", LldpNeighbor, LldpNeighborSubscriptionRequest, LldpNeighborNotification
);
category!(
    /// BFD session liveness.
    BfdSession, "bfd", BfdSession, BfdSessionSubscriptionRequest, BfdSessionNotification
);
category!(
    /// Application identity changes.
    AppIdentity, "app-id", Appid, AppIdentSubscriptionRequest, AppIdentNotification
);
category!(
    /// Agent configuration, including commit-end markers.
    Config, "config", Config, ConfigSubscriptionRequest, ConfigNotification
);

//! NDK wire boundary for bond.
//!
//! This crate carries the subset of the SR Linux NDK protobuf surface that the
//! session layer consumes: agent registration, keepalive, notification stream
//! allocation/subscription and the streamed notification frames, plus the
//! category payload types delivered to applications.
//!
//! The gRPC clients are written out by hand in the shape `tonic-build`
//! generates, so the crate builds without `protoc`:
//!
//! - [`SdkMgrServiceClient`] for `srlinux.sdk.SdkMgrService`
//! - [`SdkNotificationServiceClient`] for `srlinux.sdk.SdkNotificationService`

pub mod client;
pub mod payload;
pub mod sdk_service;

pub use client::{SdkMgrServiceClient, SdkNotificationServiceClient};
pub use payload::*;
pub use sdk_service::*;

/// Protobuf package of the NDK services.
pub const PACKAGE: &str = "srlinux.sdk";

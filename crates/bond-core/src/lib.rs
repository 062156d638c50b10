//! Session layer for SR Linux NDK agents.
//!
//! `bond-core` registers an agent with the NDK service manager (`sdk_mgr`),
//! keeps it alive with heartbeats and turns the shared notification service
//! into one typed, backpressured queue per notification category.
//!
//! ```no_run
//! # async fn run() -> Result<(), bond_core::AgentError> {
//! use bond_core::AgentBuilder;
//! use std::time::Duration;
//!
//! let mut session = AgentBuilder::new("greeter")
//!     .keepalive(Duration::from_secs(10), 3)
//!     .build()?
//!     .start()
//!     .await?;
//!
//! session.receive_interface_notifications()?;
//! let mut notifications = session.take_notifications().expect("first take");
//! while let Some(interface) = notifications.interface.recv().await {
//!     println!("{interface:?}");
//! }
//! session.wait().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod keepalive;
pub mod logging;
pub mod notification;
pub mod registration;
pub mod session;
pub mod transport;

#[cfg(any(test, feature = "test-support"))]
pub mod mock;

pub use client::{GrpcNdkClient, NdkClient};
pub use error::{AgentError, OptionsError};
pub use keepalive::KeepAlivePolicy;
pub use notification::{Category, Notifications};
pub use session::{Agent, AgentBuilder, AgentOptions, Session, SessionResource};
pub use transport::TransportError;

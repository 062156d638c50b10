//! Agent registration with the NDK service manager.
//!
//! Registration is retried a fixed number of times at a fixed interval.
//! Unregistration is a single attempt made during shutdown.

use std::time::Duration;

use bond_proto::{AgentRegistrationRequest, SdkMgrStatus};
use tracing::{info, warn};

use crate::client::NdkClient;
use crate::error::AgentError;

/// Registration attempts before giving up.
pub const MAX_REGISTRATION_ATTEMPTS: u32 = 5;

/// Default wait between registration attempts (and after keepalive transport errors).
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Behaviour flags declared to `sdk_mgr` at registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrationFlags {
    /// `sdk_mgr` waits for an explicit acknowledgement after delivering configuration.
    pub wait_config_ack: bool,
    /// `sdk_mgr` publishes configuration as state automatically.
    pub auto_telemetry_state: bool,
    /// `sdk_mgr` caches streamed notifications.
    pub enable_cache: bool,
}

impl RegistrationFlags {
    fn request(&self) -> AgentRegistrationRequest {
        AgentRegistrationRequest {
            wait_config_ack: self.wait_config_ack,
            auto_telemetry_state: self.auto_telemetry_state,
            enable_cache: self.enable_cache,
        }
    }
}

/// Register `name` and return the app id assigned by `sdk_mgr`.
///
/// An attempt succeeds only when the call returns without a transport error
/// and with `SDK_MGR_STATUS_SUCCESS`. Failed attempts are logged and retried
/// after `retry_interval`; there is no wait after the last attempt.
///
/// # Errors
///
/// Returns [`AgentError::RegistrationExhausted`] after
/// [`MAX_REGISTRATION_ATTEMPTS`] failed attempts.
pub async fn register(
    client: &dyn NdkClient,
    name: &str,
    flags: RegistrationFlags,
    retry_interval: Duration,
) -> Result<u32, AgentError> {
    for attempt in 1..=MAX_REGISTRATION_ATTEMPTS {
        match client.agent_register(flags.request()).await {
            Ok(resp) if resp.status() == SdkMgrStatus::Success => {
                info!(
                    app_id = resp.app_id,
                    agent = name,
                    config_ack = flags.wait_config_ack,
                    auto_telemetry_state = flags.auto_telemetry_state,
                    cache_notifications = flags.enable_cache,
                    "Application registered successfully!"
                );
                return Ok(resp.app_id);
            }
            Ok(resp) => warn!(
                status = %resp.status(),
                error = %resp.error_str,
                "Agent registration failed {attempt} out of {MAX_REGISTRATION_ATTEMPTS} times"
            ),
            Err(e) => warn!(
                error = %e,
                "Agent registration failed {attempt} out of {MAX_REGISTRATION_ATTEMPTS} times"
            ),
        }

        if attempt < MAX_REGISTRATION_ATTEMPTS {
            warn!(
                "Retrying agent registration in {:.1} seconds",
                retry_interval.as_secs_f64()
            );
            tokio::time::sleep(retry_interval).await;
        }
    }

    Err(AgentError::RegistrationExhausted {
        attempts: MAX_REGISTRATION_ATTEMPTS,
    })
}

/// Unregister the agent. Single attempt, no retry.
///
/// # Errors
///
/// Returns [`AgentError::Unregister`] on a transport error or a non-success
/// status. The caller reports it and carries on with shutdown.
pub async fn unregister(client: &dyn NdkClient, name: &str) -> Result<u32, AgentError> {
    match client.agent_unregister().await {
        Ok(resp) if resp.status() == SdkMgrStatus::Success => {
            info!(app_id = resp.app_id, agent = name, "Application unregistered successfully!");
            Ok(resp.app_id)
        }
        Ok(resp) => Err(AgentError::Unregister {
            message: format!("status {}", resp.status()),
        }),
        Err(e) => Err(AgentError::Unregister {
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCall, MockNdkClient, MockReply};
    use tracing_test::traced_test;

    fn register_calls(client: &MockNdkClient) -> usize {
        client.count(|call| matches!(call, MockCall::Register(_)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_first_attempt_success() {
        let client = MockNdkClient::new();
        client.set_app_id(7);

        let app_id = register(&client, "bond-test", RegistrationFlags::default(), DEFAULT_RETRY_INTERVAL)
            .await
            .unwrap();

        assert_eq!(app_id, 7);
        assert_eq!(register_calls(&client), 1);
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_register_retries_until_success_then_stops() {
        let client = MockNdkClient::new();
        client.script_register([MockReply::Unavailable, MockReply::Failed, MockReply::Success]);
        let started = tokio::time::Instant::now();

        let app_id = register(&client, "bond-test", RegistrationFlags::default(), DEFAULT_RETRY_INTERVAL)
            .await
            .unwrap();

        assert_eq!(app_id, 42);
        assert_eq!(register_calls(&client), 3);
        // Two waits, one after each failed attempt.
        let elapsed = started.elapsed();
        assert!(elapsed >= DEFAULT_RETRY_INTERVAL * 2 && elapsed < DEFAULT_RETRY_INTERVAL * 3);
        logs_assert(|lines: &[&str]| {
            let successes = lines
                .iter()
                .filter(|line| line.contains("Application registered successfully!"))
                .count();
            if successes == 1 {
                Ok(())
            } else {
                Err(format!("expected one success log, found {successes}"))
            }
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_exhausts_after_max_attempts() {
        let client = MockNdkClient::new();
        client.script_register([MockReply::Failed; 10]);
        let started = tokio::time::Instant::now();

        let err = register(&client, "bond-test", RegistrationFlags::default(), Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AgentError::RegistrationExhausted {
                attempts: MAX_REGISTRATION_ATTEMPTS
            }
        ));
        assert_eq!(register_calls(&client), MAX_REGISTRATION_ATTEMPTS as usize);
        // No wait after the final attempt.
        let elapsed = started.elapsed();
        let waits = Duration::from_secs(u64::from(MAX_REGISTRATION_ATTEMPTS - 1));
        assert!(elapsed >= waits && elapsed < waits + Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_sends_flags() {
        let client = MockNdkClient::new();
        let flags = RegistrationFlags {
            wait_config_ack: true,
            auto_telemetry_state: false,
            enable_cache: true,
        };

        register(&client, "bond-test", flags, DEFAULT_RETRY_INTERVAL)
            .await
            .unwrap();

        assert_eq!(
            client.calls(),
            vec![MockCall::Register(AgentRegistrationRequest {
                wait_config_ack: true,
                auto_telemetry_state: false,
                enable_cache: true,
            })]
        );
    }

    #[tokio::test]
    async fn test_unregister_single_attempt_on_failure() {
        let client = MockNdkClient::new();
        client.set_unregister_reply(MockReply::Failed);

        let err = unregister(&client, "bond-test").await.unwrap_err();

        assert!(matches!(err, AgentError::Unregister { .. }));
        assert_eq!(client.count(|call| *call == MockCall::Unregister), 1);
    }

    #[tokio::test]
    async fn test_unregister_transport_error_is_reported() {
        let client = MockNdkClient::new();
        client.set_unregister_reply(MockReply::Unavailable);

        let err = unregister(&client, "bond-test").await.unwrap_err();
        assert!(err.to_string().contains("sdk_mgr unavailable"));
    }
}

//! Keepalive watchdog.
//!
//! Sends a heartbeat every `interval` and counts consecutive `Failed`
//! statuses. Reaching the threshold stops the watchdog for good; the session
//! itself keeps running. Transport errors are not counted: the watchdog waits
//! the retry interval and tries again on the next tick.

use std::sync::Arc;
use std::time::Duration;

use bond_proto::SdkMgrStatus;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::NdkClient;

/// Heartbeat interval and consecutive-failure threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlivePolicy {
    interval: Duration,
    threshold: u32,
}

impl KeepAlivePolicy {
    pub fn new(interval: Duration, threshold: u32) -> Self {
        Self {
            interval,
            threshold,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// A policy only enables the watchdog when both values are non-zero.
    pub fn is_set(&self) -> bool {
        !self.interval.is_zero() && self.threshold > 0
    }
}

/// Why the watchdog loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogExit {
    /// The session token was cancelled.
    Cancelled,
    /// `failures` consecutive `Failed` statuses were received.
    ThresholdReached { failures: u32 },
}

/// Heartbeat loop for one session.
pub struct Watchdog {
    client: Arc<dyn NdkClient>,
    policy: KeepAlivePolicy,
    retry_interval: Duration,
    cancel: CancellationToken,
}

impl Watchdog {
    pub fn new(
        client: Arc<dyn NdkClient>,
        policy: KeepAlivePolicy,
        retry_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            policy,
            retry_interval,
            cancel,
        }
    }

    /// Run until cancelled or until the failure threshold is reached.
    pub async fn run(self) -> WatchdogExit {
        let mut ticker = tokio::time::interval_at(
            Instant::now() + self.policy.interval,
            self.policy.interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.policy.interval.as_secs_f64(),
            threshold = self.policy.threshold,
            "Starting keepalive watchdog"
        );

        let mut failures: u32 = 0;
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("Keepalive watchdog cancelled");
                    return WatchdogExit::Cancelled;
                }
                _ = ticker.tick() => {}
            }

            let sent_at = chrono::Utc::now().to_rfc3339();
            let response = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(sent_at = %sent_at, "Keepalive watchdog cancelled with heartbeat in flight");
                    return WatchdogExit::Cancelled;
                }
                response = self.client.keep_alive() => response,
            };
            match response {
                Err(e) => {
                    warn!(
                        error = %e,
                        sent_at = %sent_at,
                        "Keepalive request failed, retrying in {:.1} seconds",
                        self.retry_interval.as_secs_f64()
                    );
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => {
                            debug!("Keepalive watchdog cancelled");
                            return WatchdogExit::Cancelled;
                        }
                        _ = tokio::time::sleep(self.retry_interval) => {}
                    }
                }
                Ok(resp) if resp.status() == SdkMgrStatus::Success => {
                    debug!(sent_at = %sent_at, "Keepalive acknowledged");
                    failures = 0;
                }
                Ok(resp) => {
                    failures += 1;
                    warn!(
                        sent_at = %sent_at,
                        status = %resp.status(),
                        error = %resp.error_str,
                        "Keepalive failed {failures} out of {} times",
                        self.policy.threshold
                    );
                    if failures >= self.policy.threshold {
                        error!(
                            failures,
                            "Keepalive failure threshold reached, stopping keepalive watchdog"
                        );
                        return WatchdogExit::ThresholdReached { failures };
                    }
                }
            }
        }
    }
}

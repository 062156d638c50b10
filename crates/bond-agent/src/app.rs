//! Agent event loop: start the configured categories and log every
//! notification until the session shuts down.

use std::fmt::Debug;

use anyhow::{Context, Result};
use bond_core::{Category, Notifications, Session};
use bond_proto::ConfigNotification;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Run until the session shuts down. Returns the number of notifications
/// consumed.
pub async fn run(mut session: Session, categories: &[Category]) -> Result<usize> {
    let mut started = Vec::new();
    for &category in categories {
        if started.contains(&category) {
            warn!(%category, "Category listed twice, ignoring");
            continue;
        }
        session
            .receive(category)
            .with_context(|| format!("Failed to start {category} notifications"))?;
        started.push(category);
    }

    let notifications = session
        .take_notifications()
        .context("Notification queues already taken")?;
    let mut consumers = spawn_consumers(notifications, &started);

    info!(
        agent = session.name(),
        app_id = session.app_id(),
        categories = started.len(),
        "Agent running"
    );
    session.wait().await;

    let mut delivered = 0;
    while let Some(joined) = consumers.join_next().await {
        match joined {
            Ok(count) => delivered += count,
            Err(e) => warn!("Notification consumer failed: {e}"),
        }
    }
    Ok(delivered)
}

/// One consumer per started queue. Queues of categories that were never
/// started stay open for the life of the session, so they get no consumer.
fn spawn_consumers(notifications: Notifications, started: &[Category]) -> JoinSet<usize> {
    let Notifications {
        full_config_received,
        config,
        interface,
        network_instance,
        route,
        next_hop_group,
        lldp_neighbor,
        bfd_session,
        app_identity,
    } = notifications;

    let mut consumers = JoinSet::new();
    consumers.spawn(log_full_config(full_config_received));
    consumers.spawn(log_config(config));

    let is_started = |category| started.contains(&category);
    if is_started(Category::Interface) {
        consumers.spawn(log_notifications(Category::Interface, interface));
    }
    if is_started(Category::NetworkInstance) {
        consumers.spawn(log_notifications(Category::NetworkInstance, network_instance));
    }
    if is_started(Category::Route) {
        consumers.spawn(log_notifications(Category::Route, route));
    }
    if is_started(Category::NextHopGroup) {
        consumers.spawn(log_notifications(Category::NextHopGroup, next_hop_group));
    }
    if is_started(Category::Lldp) {
        consumers.spawn(log_notifications(Category::Lldp, lldp_neighbor));
    }
    if is_started(Category::Bfd) {
        consumers.spawn(log_notifications(Category::Bfd, bfd_session));
    }
    if is_started(Category::AppId) {
        consumers.spawn(log_notifications(Category::AppId, app_identity));
    }
    consumers
}

async fn log_notifications<T: Debug>(category: Category, mut rx: mpsc::Receiver<T>) -> usize {
    let mut count = 0;
    while let Some(notification) = rx.recv().await {
        count += 1;
        info!(%category, "Received {category} notification: {notification:?}");
    }
    info!(%category, count, "Notification queue closed");
    count
}

async fn log_config(mut rx: mpsc::Receiver<ConfigNotification>) -> usize {
    let mut count = 0;
    while let Some(notification) = rx.recv().await {
        count += 1;
        let path = notification
            .key
            .as_ref()
            .map(|key| key.js_path.as_str())
            .unwrap_or_default();
        let json = notification
            .data
            .as_ref()
            .map(|data| data.json.as_str())
            .unwrap_or_default();
        info!(
            op = notification.op().as_str_name(),
            path,
            "Received config notification: {json}"
        );
    }
    count
}

async fn log_full_config(mut rx: mpsc::Receiver<()>) -> usize {
    match rx.recv().await {
        Some(()) => {
            info!("Full configuration received");
            0
        }
        None => 0,
    }
}

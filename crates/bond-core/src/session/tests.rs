use std::sync::Mutex as StdMutex;

use bond_proto::notification::SubscriptionTypes as Record;
use bond_proto::{InterfaceData, InterfaceNotification, Notification, NotificationStreamResponse};
use tracing_test::traced_test;

use super::*;
use crate::mock::{MockCall, MockNdkClient, MockReply};

#[derive(Debug)]
struct Observed {
    calls: Vec<MockCall>,
    cancelled: bool,
}

/// Records what had happened by the time it was closed.
struct RecordingResource {
    client: MockNdkClient,
    token: CancellationToken,
    observed: Arc<StdMutex<Option<Observed>>>,
    fail: bool,
}

#[async_trait]
impl SessionResource for RecordingResource {
    fn name(&self) -> &str {
        "recorder"
    }

    async fn close(&self) -> Result<(), BoxError> {
        *self.observed.lock().unwrap() = Some(Observed {
            calls: self.client.calls(),
            cancelled: self.token.is_cancelled(),
        });
        if self.fail {
            Err("recorder close failed".into())
        } else {
            Ok(())
        }
    }
}

fn builder() -> AgentBuilder {
    AgentBuilder::new("bond-test").handle_signals(false)
}

async fn start(client: &MockNdkClient) -> Session {
    builder()
        .build()
        .unwrap()
        .start_with(Arc::new(client.clone()))
        .await
        .unwrap()
}

async fn attach_recorder(
    session: &Session,
    client: &MockNdkClient,
    fail: bool,
) -> Arc<StdMutex<Option<Observed>>> {
    let observed = Arc::new(StdMutex::new(None));
    session
        .attach(RecordingResource {
            client: client.clone(),
            token: session.cancellation_token(),
            observed: Arc::clone(&observed),
            fail,
        })
        .await
        .unwrap();
    observed
}

fn cleanup_calls(calls: &[MockCall]) -> Vec<MockCall> {
    calls
        .iter()
        .filter(|call| matches!(call, MockCall::Unregister | MockCall::Close))
        .cloned()
        .collect()
}

#[test]
fn test_build_reports_every_problem() {
    let err = AgentBuilder::new("")
        .endpoint("ftp://sdk")
        .retry_interval(Duration::ZERO)
        .keepalive(Duration::ZERO, 3)
        .build()
        .err()
        .unwrap();

    match err {
        AgentError::InvalidOptions(OptionsError { problems }) => {
            assert_eq!(problems.len(), 4, "{problems:?}");
        }
        other => panic!("expected invalid options, got {other:?}"),
    }
}

#[test]
fn test_build_rejects_non_ascii_name() {
    let err = AgentBuilder::new("grüße").build().err().unwrap();
    assert!(err.to_string().contains("printable ASCII"));
}

#[test]
fn test_build_defaults() {
    let agent = AgentBuilder::new("greeter").build().unwrap();
    let options = agent.options();

    assert_eq!(options.endpoint, DEFAULT_ENDPOINT);
    assert_eq!(options.retry_interval, DEFAULT_RETRY_INTERVAL);
    assert!(options.keepalive.is_none());
    assert!(options.handle_signals);
    assert_eq!(options.flags, RegistrationFlags::default());
}

#[tokio::test]
async fn test_start_with_registers_and_starts_config_stream() {
    let client = MockNdkClient::new();
    client.set_app_id(17);

    let session = start(&client).await;
    assert_eq!(session.app_id(), 17);
    assert_eq!(session.name(), "bond-test");

    let stream_id = client.wait_for_stream("config").await;
    assert_eq!(client.calls()[0], MockCall::Register(Default::default()));
    assert!(client.calls().contains(&MockCall::Subscribe {
        stream_id,
        category: "config"
    }));

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_registration_exhausted_produces_no_session() {
    let client = MockNdkClient::new();
    client.script_register([MockReply::Failed; 5]);

    let err = builder()
        .build()
        .unwrap()
        .start_with(Arc::new(client.clone()))
        .await
        .err()
        .unwrap();

    assert!(matches!(err, AgentError::RegistrationExhausted { attempts: 5 }));
    assert_eq!(
        client.count(|call| matches!(call, MockCall::CreateStream { .. })),
        0
    );
}

#[tokio::test]
async fn test_start_unreachable_endpoint_is_connect_error() {
    let dir = tempfile::tempdir().unwrap();
    let endpoint = format!("unix://{}", dir.path().join("sdk.sock").display());

    let err = builder()
        .endpoint(endpoint.clone())
        .build()
        .unwrap()
        .start()
        .await
        .err()
        .unwrap();

    match err {
        AgentError::Connect { endpoint: reported, .. } => assert_eq!(reported, endpoint),
        other => panic!("expected connect error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_shutdown_order_cancels_last() {
    let client = MockNdkClient::new();
    let session = start(&client).await;
    let token = session.cancellation_token();
    let observed = attach_recorder(&session, &client, false).await;

    session.shutdown().await;

    let observed = observed.lock().unwrap().take().unwrap();
    assert_eq!(
        cleanup_calls(&observed.calls),
        vec![MockCall::Unregister, MockCall::Close]
    );
    assert!(!observed.cancelled, "token cancelled before resources closed");
    assert!(token.is_cancelled());
    assert!(session.is_shut_down());
}

#[tokio::test]
#[traced_test]
async fn test_shutdown_continues_past_failures() {
    let client = MockNdkClient::new();
    client.set_unregister_reply(MockReply::Failed);
    client.set_fail_close(true);
    let session = start(&client).await;
    let observed = attach_recorder(&session, &client, true).await;

    session.shutdown().await;

    let observed = observed.lock().unwrap().take().unwrap();
    assert_eq!(
        cleanup_calls(&observed.calls),
        vec![MockCall::Unregister, MockCall::Close]
    );
    assert!(session.is_shut_down());
    assert!(logs_contain("Failed to unregister agent"));
    assert!(logs_contain("Failed to close NDK connection"));
    assert!(logs_contain("Failed to close session resource"));
}

#[tokio::test]
async fn test_shutdown_runs_once() {
    let client = MockNdkClient::new();
    let session = start(&client).await;

    session.shutdown().await;
    session.shutdown().await;

    assert_eq!(cleanup_calls(&client.calls()), vec![MockCall::Unregister, MockCall::Close]);
}

#[tokio::test]
async fn test_external_token_triggers_shutdown() {
    let client = MockNdkClient::new();
    let external = CancellationToken::new();
    let session = builder()
        .shutdown_on(external.clone())
        .build()
        .unwrap()
        .start_with(Arc::new(client.clone()))
        .await
        .unwrap();

    external.cancel();
    tokio::time::timeout(Duration::from_secs(5), session.wait())
        .await
        .unwrap();

    assert_eq!(cleanup_calls(&client.calls()), vec![MockCall::Unregister, MockCall::Close]);
}

#[tokio::test]
async fn test_child_token_cancel_does_not_shut_down() {
    let client = MockNdkClient::new();
    let session = start(&client).await;

    session.cancellation_token().cancel();

    assert!(!session.is_shut_down());
    session.shutdown().await;
}

#[tokio::test]
async fn test_category_started_twice_is_rejected() {
    let client = MockNdkClient::new();
    let mut session = start(&client).await;

    session.receive_route_notifications().unwrap();
    let err = session.receive(Category::Route).unwrap_err();
    assert!(matches!(
        err,
        AgentError::CategoryAlreadyStarted { category: "route" }
    ));

    session.shutdown().await;
}

#[tokio::test]
async fn test_category_after_shutdown_is_rejected() {
    let client = MockNdkClient::new();
    let mut session = start(&client).await;
    session.shutdown().await;

    let err = session.receive_bfd_session_notifications().unwrap_err();
    assert!(matches!(err, AgentError::SessionClosed));
}

#[tokio::test]
async fn test_notifications_flow_and_close_on_shutdown() {
    let client = MockNdkClient::new();
    let mut session = start(&client).await;
    let mut notifications = session.take_notifications().unwrap();
    assert!(session.take_notifications().is_none());

    session.receive_interface_notifications().unwrap();
    let stream_id = client.wait_for_stream("interface").await;
    client.send_frame(
        stream_id,
        NotificationStreamResponse {
            notifications: vec![Notification {
                sub_id: 1,
                subscription_types: Some(Record::Interface(InterfaceNotification {
                    data: Some(InterfaceData {
                        mtu: 9000,
                        ..Default::default()
                    }),
                    ..Default::default()
                })),
            }],
        },
    );

    let delivered = notifications.interface.recv().await.unwrap();
    assert_eq!(delivered.data.unwrap().mtu, 9000);

    session.shutdown().await;
    assert!(notifications.interface.recv().await.is_none());
    assert!(notifications.config.recv().await.is_none());
    assert!(notifications.full_config_received.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_keepalive_watchdog_runs_with_session() {
    let client = MockNdkClient::new();
    let session = builder()
        .keepalive(Duration::from_secs(10), 3)
        .build()
        .unwrap()
        .start_with(Arc::new(client.clone()))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(client.count(|call| *call == MockCall::KeepAlive), 2);

    session.shutdown().await;
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(client.count(|call| *call == MockCall::KeepAlive), 2);
}

#[tokio::test]
async fn test_drop_cancels_session_tasks() {
    let client = MockNdkClient::new();
    let session = start(&client).await;
    let token = session.cancellation_token();

    drop(session);

    assert!(token.is_cancelled());
    assert_eq!(client.count(|call| *call == MockCall::Unregister), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_completes_with_heartbeat_in_flight() {
    let client = MockNdkClient::new();
    client.set_keepalive_hang(true);
    let session = builder()
        .keepalive(Duration::from_secs(10), 3)
        .build()
        .unwrap()
        .start_with(Arc::new(client.clone()))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(client.count(|call| *call == MockCall::KeepAlive), 1);

    tokio::time::timeout(Duration::from_secs(60), session.shutdown())
        .await
        .expect("shutdown stuck behind unanswered heartbeat");

    assert!(session.is_shut_down());
    assert_eq!(cleanup_calls(&client.calls()), vec![MockCall::Unregister, MockCall::Close]);
}

#[tokio::test]
async fn test_attach_rejected_once_resources_are_taken() {
    let client = MockNdkClient::new();
    let session = start(&client).await;
    attach_recorder(&session, &client, false).await;

    // Shutdown takes the list before the token is cancelled.
    let taken = session.shared.resources.lock().await.take().unwrap();
    assert_eq!(taken.len(), 1);
    assert!(!session.is_shut_down());

    let observed = Arc::new(StdMutex::new(None));
    let err = session
        .attach(RecordingResource {
            client: client.clone(),
            token: session.cancellation_token(),
            observed: Arc::clone(&observed),
            fail: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::SessionClosed));

    session.shutdown().await;
    assert!(observed.lock().unwrap().is_none(), "rejected resource was closed");
}

#[tokio::test]
async fn test_attach_after_shutdown_is_rejected() {
    let client = MockNdkClient::new();
    let session = start(&client).await;
    session.shutdown().await;

    let observed = Arc::new(StdMutex::new(None));
    let err = session
        .attach(RecordingResource {
            client: client.clone(),
            token: session.cancellation_token(),
            observed,
            fail: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::SessionClosed));
}

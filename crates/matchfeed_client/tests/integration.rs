//! Integration tests for the session engine and the async client.

use matchfeed_client::{
    parse_events, Client, ClientConfig, ClientError, ErrorKind, Session, SummaryFile, Verdict,
};
use matchfeed_protocol::{ClientFrame, GameKey, ServerFrame};
use matchfeed_testkit::{
    game_name_strategy, message_frame, BrokerOptions, DisconnectBehaviour, FixtureDir,
    LoopbackBroker, EVENTS_FULL_JSON, GERMANY_JAPAN, GERMANY_JAPAN_SUMMARY,
};
use proptest::prelude::*;
use std::time::Duration;
use tokio::sync::mpsc;

fn alice() -> Session {
    let mut session = Session::new(ClientConfig::default());
    session.execute("login 127.0.0.1:7777 alice pass").unwrap();
    session.execute("join Germany_Japan").unwrap();
    session
}

fn summarise(session: &mut Session, line: &str) -> SummaryFile {
    session.execute(line).unwrap().summary.unwrap()
}

fn deliver_bobs_timeline(session: &mut Session) {
    let report = parse_events(EVENTS_FULL_JSON).unwrap();
    for event in report.events {
        let event = event.with_owner("bob");
        let frame = message_frame(GERMANY_JAPAN, &event, "bob");
        session.handle_frame(ServerFrame::from_raw(frame).unwrap());
    }
}

#[test]
fn full_report_renders_reference_summary() {
    let fixtures = FixtureDir::new();
    let events = fixtures.full_events();

    let mut session = alice();
    let outcome = session
        .execute(&format!("report {}", events.display()))
        .unwrap();
    assert_eq!(outcome.frames.len(), 8);
    assert!(outcome
        .frames
        .iter()
        .all(|f| matches!(f, ClientFrame::Send { destination, .. } if destination == "/Germany_Japan")));

    let summary = summarise(&mut session, "summary Germany_Japan alice full_summary.txt");
    assert_eq!(summary.contents, GERMANY_JAPAN_SUMMARY);
}

#[test]
fn incomplete_report_yields_empty_summary() {
    let fixtures = FixtureDir::new();
    let events = fixtures.partial_events();

    let mut session = alice();
    session
        .execute(&format!("report {}", events.display()))
        .unwrap();
    let summary = summarise(&mut session, "summary Germany_Japan alice incomplete.txt");

    assert!(summary.is_empty());
}

#[test]
fn incomplete_report_falls_back_to_another_reporter() {
    let fixtures = FixtureDir::new();
    let events = fixtures.partial_events();

    let mut session = alice();
    session
        .execute(&format!("report {}", events.display()))
        .unwrap();
    deliver_bobs_timeline(&mut session);

    let key = GameKey::new(GERMANY_JAPAN);
    let reconciliation = matchfeed_client::reconcile(session.store(), &key, "alice");
    assert_eq!(reconciliation.verdict, Verdict::Fallback { owner: "bob".into() });

    let summary = summarise(&mut session, "summary Germany_Japan alice fallback.txt");
    assert_eq!(summary.contents, GERMANY_JAPAN_SUMMARY);
}

#[test]
fn summary_of_another_reporter() {
    let mut session = alice();
    deliver_bobs_timeline(&mut session);
    let summary = summarise(&mut session, "summary germany-japan bob bob.txt");

    assert_eq!(summary.contents, GERMANY_JAPAN_SUMMARY);
}

#[test]
fn resubmitted_report_replaces_previous_one() {
    let fixtures = FixtureDir::new();
    let full = fixtures.full_events();
    let partial = fixtures.partial_events();

    let mut session = alice();
    session.execute(&format!("report {}", full.display())).unwrap();
    session.execute(&format!("report {}", partial.display())).unwrap();

    let timeline = session
        .store()
        .timeline(&GameKey::new(GERMANY_JAPAN), "alice")
        .unwrap();
    assert_eq!(timeline.len(), 4);
}

#[test]
fn local_errors_leave_state_untouched() {
    let fixtures = FixtureDir::new();
    let mut session = alice();

    let err = session.execute("join").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Usage);

    let err = session.execute("join GERMANY japan").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);

    let err = session
        .execute(&format!("report {}", fixtures.path("missing.json").display()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);

    assert_eq!(session.registry().len(), 1);
    assert_eq!(session.receipts().len(), 1);
    assert!(session.is_logged_in());
}

proptest! {
    #[test]
    fn one_subscription_per_canonical_game(names in prop::collection::vec(game_name_strategy(), 1..12)) {
        let mut session = Session::new(ClientConfig::default());
        session.execute("login 127.0.0.1:7777 alice pass").unwrap();

        let mut keys = std::collections::HashSet::new();
        for name in &names {
            let result = session.execute(&format!("join {name}"));
            if keys.insert(GameKey::new(name)) {
                prop_assert!(result.is_ok());
            } else {
                prop_assert!(matches!(result, Err(ClientError::AlreadySubscribed(_))));
            }
        }
        prop_assert_eq!(session.registry().len(), keys.len());
    }
}

async fn next_notice(notices: &mut mpsc::UnboundedReceiver<String>) -> String {
    tokio::time::timeout(Duration::from_secs(5), notices.recv())
        .await
        .expect("timed out waiting for a notice")
        .expect("notice channel closed")
}

async fn login(client: &mut Client, notices: &mut mpsc::UnboundedReceiver<String>, broker: &LoopbackBroker) {
    client
        .execute(&format!("login {} alice pass", broker.addr()))
        .await;
    assert_eq!(next_notice(notices).await, "Login successful");
    client.execute("join Germany_Japan").await;
    assert_eq!(next_notice(notices).await, "Joined channel Germany_Japan");
}

#[tokio::test]
async fn client_reports_and_summarises_over_tcp() {
    let broker = LoopbackBroker::start().await.unwrap();
    let fixtures = FixtureDir::new();
    let events = fixtures.full_events();
    let output = fixtures.path("summary.txt");

    let (mut client, mut notices) = Client::new(ClientConfig::default());
    login(&mut client, &mut notices, &broker).await;

    client.execute(&format!("report {}", events.display())).await;
    client
        .execute(&format!("summary Germany_Japan alice {}", output.display()))
        .await;
    assert_eq!(
        next_notice(&mut notices).await,
        format!("Summary written to {}", output.display())
    );
    assert_eq!(fixtures.read("summary.txt"), GERMANY_JAPAN_SUMMARY);

    client.execute("exit Germany_Japan").await;
    assert_eq!(next_notice(&mut notices).await, "Exited channel Germany_Japan");

    client.execute("logout").await;
    assert_eq!(next_notice(&mut notices).await, "Logged out");
    assert!(!client.is_connected());
    assert_eq!(broker.received_commands("SEND").len(), 8);
    assert_eq!(broker.subscriber_count("/Germany_Japan"), 0);
}

#[tokio::test]
async fn resubmission_over_tcp_is_not_undone_by_echoes() {
    let broker = LoopbackBroker::start().await.unwrap();
    let fixtures = FixtureDir::new();
    let full = fixtures.full_events();
    let partial = fixtures.partial_events();
    let output = fixtures.path("resubmitted.txt");

    let (mut client, mut notices) = Client::new(ClientConfig::default());
    login(&mut client, &mut notices, &broker).await;
    client.execute(&format!("report {}", full.display())).await;
    client.execute(&format!("report {}", partial.display())).await;

    // The broker delivers every echo before the receipt of a later command.
    client.execute("exit Germany_Japan").await;
    assert_eq!(next_notice(&mut notices).await, "Exited channel Germany_Japan");

    let timeline_len = client
        .session()
        .lock()
        .store()
        .timeline(&GameKey::new(GERMANY_JAPAN), "alice")
        .map(|t| t.len());
    assert_eq!(timeline_len, Some(4));

    client
        .execute(&format!("summary Germany_Japan alice {}", output.display()))
        .await;
    assert_eq!(
        next_notice(&mut notices).await,
        format!("Summary written to {}", output.display())
    );
    assert_eq!(fixtures.read("resubmitted.txt"), "");
    assert_eq!(broker.received_commands("SEND").len(), 12);
}

#[tokio::test]
async fn client_falls_back_to_published_timeline() {
    let broker = LoopbackBroker::start().await.unwrap();
    let fixtures = FixtureDir::new();
    let partial = fixtures.partial_events();
    let output = fixtures.path("fallback.txt");

    let (mut client, mut notices) = Client::new(ClientConfig::default());
    login(&mut client, &mut notices, &broker).await;
    client.execute(&format!("report {}", partial.display())).await;

    let report = parse_events(EVENTS_FULL_JSON).unwrap();
    for event in &report.events {
        broker.publish("/Germany_Japan", &event.to_body("bob"));
    }

    let session = client.session();
    let key = GameKey::new(GERMANY_JAPAN);
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let received = session
                .lock()
                .store()
                .timeline(&key, "bob")
                .map_or(0, |t| t.len());
            if received == report.events.len() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("bob's events never arrived");

    client
        .execute(&format!("summary Germany_Japan alice {}", output.display()))
        .await;
    assert_eq!(fixtures.read("fallback.txt"), GERMANY_JAPAN_SUMMARY);
}

#[tokio::test]
async fn logout_times_out_without_receipt() {
    let broker = LoopbackBroker::start_with(BrokerOptions {
        on_disconnect: DisconnectBehaviour::Ignore,
    })
    .await
    .unwrap();
    let config = ClientConfig::default().with_receipt_timeout(Duration::from_millis(200));

    let (mut client, mut notices) = Client::new(config);
    login(&mut client, &mut notices, &broker).await;

    client.execute("logout").await;
    assert_eq!(next_notice(&mut notices).await, "Logged out");
    assert!(!client.is_connected());
    assert!(!client.session().lock().is_logged_in());
}

#[tokio::test]
async fn closed_connection_is_released_by_the_broker() {
    let broker = LoopbackBroker::start_with(BrokerOptions {
        on_disconnect: DisconnectBehaviour::Ignore,
    })
    .await
    .unwrap();
    let config = ClientConfig::default().with_receipt_timeout(Duration::from_millis(200));

    let (mut client, mut notices) = Client::new(config);
    login(&mut client, &mut notices, &broker).await;
    client.execute("logout").await;
    assert_eq!(next_notice(&mut notices).await, "Logged out");

    // The broker only forgets alice once it reads the end of our stream.
    assert_eq!(broker.subscriber_count("/Germany_Japan"), 0);
    login(&mut client, &mut notices, &broker).await;
    assert!(client.is_connected());
}

#[tokio::test]
async fn server_closing_during_logout_completes_it() {
    let broker = LoopbackBroker::start_with(BrokerOptions {
        on_disconnect: DisconnectBehaviour::CloseSilently,
    })
    .await
    .unwrap();

    let (mut client, mut notices) = Client::new(ClientConfig::default());
    login(&mut client, &mut notices, &broker).await;

    client.execute("logout").await;
    assert_eq!(next_notice(&mut notices).await, "Logged out");
    assert!(!client.is_connected());
}

#[tokio::test]
async fn server_error_ends_the_session() {
    let broker = LoopbackBroker::start().await.unwrap();
    let (mut client, mut notices) = Client::new(ClientConfig::default());
    login(&mut client, &mut notices, &broker).await;

    // A second login for the same user is refused by the broker.
    let (mut intruder, mut intruder_notices) = Client::new(ClientConfig::default());
    intruder
        .execute(&format!("login {} alice pass", broker.addr()))
        .await;
    assert_eq!(next_notice(&mut intruder_notices).await, "User already logged in");
    assert!(!intruder.session().lock().is_logged_in());

    intruder.execute("join Germany_Japan").await;
    assert_eq!(next_notice(&mut intruder_notices).await, "Please login first");
}

#[tokio::test]
async fn unreachable_server_is_reported_once() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (mut client, mut notices) = Client::new(ClientConfig::default());
    client.execute(&format!("login {addr} alice pass")).await;

    let notice = next_notice(&mut notices).await;
    assert!(notice.starts_with("transport error: could not connect"));
    assert!(!client.is_connected());
    assert!(!client.session().lock().is_logged_in());
}

//! Exception-handling toggle tests: interception versus raw propagation.

mod common;

use std::sync::Arc;

use common::FixtureBootstrapper;
use drydock::{Connector, DispatchError, HarnessConfig, TransportRequest};

fn exploding_host() -> FixtureBootstrapper {
    FixtureBootstrapper::new().route("GET", "/explode", |_, _| Err("kaput".into()))
}

#[tokio::test]
async fn intercepting_renders_an_error_response() {
    let host = exploding_host();
    let reported = Arc::clone(&host.reported_errors);
    let mut connector = Connector::new(host, HarnessConfig::default()).expect("boot");

    let response = connector
        .dispatch(TransportRequest::get("http://localhost/explode"))
        .await
        .expect("intercepted into a response");

    assert_eq!(response.status, 500);
    assert_eq!(response.body_text(), "kaput");
    assert_eq!(response.header("x-rendered-by"), Some("fixture-handler"));
    assert_eq!(*reported.lock().expect("reported lock"), vec!["kaput"]);
}

#[tokio::test]
async fn passthrough_surfaces_the_raw_error_without_reporting() {
    let host = exploding_host();
    let reported = Arc::clone(&host.reported_errors);
    let mut connector = Connector::new(host, HarnessConfig::default()).expect("boot");
    connector.disable_exception_handling();

    let err = connector
        .dispatch(TransportRequest::get("http://localhost/explode"))
        .await
        .expect_err("error reaches the caller");

    let DispatchError::Unhandled(source) = err else {
        panic!("expected the raw application error");
    };
    assert_eq!(source.to_string(), "kaput");
    assert!(reported.lock().expect("reported lock").is_empty());
}

#[tokio::test]
async fn toggle_flips_take_effect_mid_test_and_survive_reboots() {
    let mut connector = Connector::new(exploding_host(), HarnessConfig::default()).expect("boot");

    connector.disable_exception_handling();
    connector
        .dispatch(TransportRequest::get("http://localhost/explode"))
        .await
        .expect_err("passthrough");

    // The second dispatch reboots; the toggle is connector-scoped.
    connector
        .dispatch(TransportRequest::get("http://localhost/explode"))
        .await
        .expect_err("still passthrough after reboot");

    connector.enable_exception_handling();
    let response = connector
        .dispatch(TransportRequest::get("http://localhost/explode"))
        .await
        .expect("intercepting again");
    assert_eq!(response.status, 500);
}

#[tokio::test]
async fn config_can_start_the_test_in_passthrough() {
    let config = HarnessConfig {
        disable_exception_handling: true,
        ..HarnessConfig::default()
    };
    let mut connector = Connector::new(exploding_host(), config).expect("boot");

    connector
        .dispatch(TransportRequest::get("http://localhost/explode"))
        .await
        .expect_err("configured passthrough");
}

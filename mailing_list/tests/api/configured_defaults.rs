use crate::helpers::init_tracing;
use claims::{assert_matches, assert_ok};
use mailing_list::configuration::{get_configuration, DirectoryBackend, Settings};
use mailing_list::enrollment::{EnrollmentError, EnrollmentRequest};
use mailing_list::startup::build_enrollment;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn configuration_pointing_at(notification_server: &MockServer) -> Settings {
    init_tracing();

    let mut c = get_configuration()
        .await
        .expect("Failed to read configuration.");
    // Keep the directory in-process and send notifications to the mock server
    c.directory.backend = DirectoryBackend::InMemory;
    c.notifications.base_url = notification_server.uri();
    c
}

#[tokio::test]
async fn the_local_configuration_uses_the_in_memory_directory() {
    let configuration = get_configuration()
        .await
        .expect("Failed to read configuration.");

    assert_eq!(configuration.directory.backend, DirectoryBackend::InMemory);
    assert!(configuration.directory.use_local);
    assert!(configuration.telemetry.otlp_endpoint.is_empty());
}

#[tokio::test]
async fn enroll_with_configured_defaults_sends_one_notification() {
    // Arrange
    let notification_server = MockServer::start().await;
    let configuration = configuration_pointing_at(&notification_server).await;
    let enrollment = build_enrollment(&configuration);

    Mock::given(path("/notifications"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&notification_server)
        .await;

    // Act
    let user = assert_ok!(
        enrollment
            .enroll(EnrollmentRequest::new("alice", "blog_list"))
            .await
    );

    // Assert
    assert_eq!(user.list_membership.unwrap().as_ref(), "blog_list");
    assert!(enrollment.defaults().directory_is_resolved());
    assert!(enrollment.defaults().notifier_is_resolved());
}

#[tokio::test]
async fn the_notification_carries_the_username_and_list() {
    let notification_server = MockServer::start().await;
    let configuration = configuration_pointing_at(&notification_server).await;
    let enrollment = build_enrollment(&configuration);

    Mock::given(path("/notifications"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&notification_server)
        .await;

    enrollment
        .enroll(EnrollmentRequest::new("alice", "blog_list"))
        .await
        .unwrap();

    let notification_request = &notification_server.received_requests().await.unwrap()[0];
    let body: serde_json::Value = serde_json::from_slice(&notification_request.body).unwrap();
    assert_eq!(body["Username"], "alice");
    assert_eq!(body["ListId"], "blog_list");
    assert_eq!(body["From"], configuration.notifications.sender.as_str());
}

#[tokio::test]
async fn a_rejected_notification_fails_the_enrollment() {
    let notification_server = MockServer::start().await;
    let configuration = configuration_pointing_at(&notification_server).await;
    let enrollment = build_enrollment(&configuration);

    Mock::given(path("/notifications"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&notification_server)
        .await;

    let outcome = enrollment
        .enroll(EnrollmentRequest::new("alice", "blog_list"))
        .await;

    assert_matches!(outcome, Err(EnrollmentError::NotificationError(_)));
}

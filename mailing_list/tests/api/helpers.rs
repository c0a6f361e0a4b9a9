use async_trait::async_trait;
use mailing_list::adapters::InMemoryUserDirectory;
use mailing_list::collaborators::DefaultCollaborators;
use mailing_list::domain::{DirectoryError, ListId, Notifier, User, UserDirectory, Username};
use mailing_list::enrollment::{EnrollmentError, EnrollmentRequest, ListEnrollment};
use once_cell::sync::Lazy;
use secrecy::Secret;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use telemetry::{get_subscriber, init_subscriber, init_tracer, TelemetrySettings};

// Ensure that the `tracing` stack is only initialised once
static TRACING: Lazy<()> = Lazy::new(|| {
    let telemetry_settings = TelemetrySettings {
        otlp_endpoint: String::new(),
        honeycomb_api_key: Secret::new(String::new()),
        dataset_name: "test-mailing-list".to_string(),
    };
    let default_trace_provider =
        init_tracer(&telemetry_settings).expect("Failed to build the test tracer");
    let default_filter = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(
            subscriber_name,
            default_filter,
            std::io::stdout,
            &telemetry_settings,
            &default_trace_provider,
        );
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(
            subscriber_name,
            default_filter,
            std::io::sink,
            &telemetry_settings,
            &default_trace_provider,
        );
        init_subscriber(subscriber);
    }
});

pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// A collaborator invocation, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FindOrCreate(String),
    FindByUsername(String),
    Notify { username: String, list_id: String },
    UpdateListMembership { username: String, list_id: String },
}

impl Call {
    pub fn notify(username: &str, list_id: &str) -> Self {
        Self::Notify {
            username: username.to_string(),
            list_id: list_id.to_string(),
        }
    }

    pub fn update(username: &str, list_id: &str) -> Self {
        Self::UpdateListMembership {
            username: username.to_string(),
            list_id: list_id.to_string(),
        }
    }
}

/// Shared, ordered record of calls made to the test doubles.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn record(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }
}

/// Directory double that records every call and delegates storage to an in-memory directory.
pub struct RecordingDirectory {
    log: CallLog,
    store: InMemoryUserDirectory,
    fail_updates: bool,
}

#[async_trait]
impl UserDirectory for RecordingDirectory {
    async fn find_or_create(&self, username: &Username) -> Result<User, DirectoryError> {
        self.log.record(Call::FindOrCreate(username.to_string()));
        self.store.find_or_create(username).await
    }

    async fn find_by_username(&self, username: &Username) -> Result<Option<User>, DirectoryError> {
        self.log.record(Call::FindByUsername(username.to_string()));
        self.store.find_by_username(username).await
    }

    async fn update_list_membership(
        &self,
        user: &User,
        list_id: &ListId,
    ) -> Result<User, DirectoryError> {
        self.log
            .record(Call::update(user.username.as_ref(), list_id.as_ref()));
        if self.fail_updates {
            return Err(anyhow::anyhow!("Provisioned write capacity exceeded").into());
        }
        self.store.update_list_membership(user, list_id).await
    }
}

/// Notifier double that records every call and optionally fails.
pub struct RecordingNotifier {
    log: CallLog,
    fail: bool,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user: &User, list_id: &ListId) -> Result<(), anyhow::Error> {
        self.log
            .record(Call::notify(user.username.as_ref(), list_id.as_ref()));
        if self.fail {
            anyhow::bail!("The notification service is down");
        }
        Ok(())
    }
}

pub struct TestApp {
    pub enrollment: ListEnrollment,
    pub log: CallLog,
    pub store: InMemoryUserDirectory,
    pub default_directory_builds: Arc<AtomicUsize>,
    pub default_notifier_builds: Arc<AtomicUsize>,
}

impl TestApp {
    pub fn recording_directory(&self) -> Arc<dyn UserDirectory> {
        Arc::new(RecordingDirectory {
            log: self.log.clone(),
            store: self.store.clone(),
            fail_updates: false,
        })
    }

    pub fn directory_failing_updates(&self) -> Arc<dyn UserDirectory> {
        Arc::new(RecordingDirectory {
            log: self.log.clone(),
            store: self.store.clone(),
            fail_updates: true,
        })
    }

    pub fn recording_notifier(&self) -> Arc<dyn Notifier> {
        Arc::new(RecordingNotifier {
            log: self.log.clone(),
            fail: false,
        })
    }

    pub fn failing_notifier(&self) -> Arc<dyn Notifier> {
        Arc::new(RecordingNotifier {
            log: self.log.clone(),
            fail: true,
        })
    }

    /// Enroll with both collaborators overridden by recording doubles.
    pub async fn enroll(&self, username: &str, list_id: &str) -> Result<User, EnrollmentError> {
        self.enrollment
            .enroll(
                EnrollmentRequest::new(username, list_id)
                    .with_directory(self.recording_directory())
                    .with_notifier(self.recording_notifier()),
            )
            .await
    }

    pub async fn seed_user(&self, username: &str) {
        self.store
            .insert(User::new(Username::parse(username.to_string()).unwrap()))
            .await
            .expect("Failed to seed user");
    }

    pub async fn stored_user(&self, username: &str) -> Option<User> {
        self.store
            .find_by_username(&Username::parse(username.to_string()).unwrap())
            .await
            .unwrap()
    }

    pub fn default_directory_builds(&self) -> usize {
        self.default_directory_builds.load(Ordering::SeqCst)
    }

    pub fn default_notifier_builds(&self) -> usize {
        self.default_notifier_builds.load(Ordering::SeqCst)
    }
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(|enrollment| enrollment)
}

/// Build a `ListEnrollment` whose defaults are recording doubles that count how often they are built.
pub fn spawn_app_with(configure: impl FnOnce(ListEnrollment) -> ListEnrollment) -> TestApp {
    init_tracing();

    let log = CallLog::default();
    let store = InMemoryUserDirectory::new();
    let default_directory_builds = Arc::new(AtomicUsize::new(0));
    let default_notifier_builds = Arc::new(AtomicUsize::new(0));

    let defaults = {
        let (log, store, builds) = (
            log.clone(),
            store.clone(),
            default_directory_builds.clone(),
        );
        let (notifier_log, notifier_builds) = (log.clone(), default_notifier_builds.clone());
        DefaultCollaborators::new(
            move || {
                builds.fetch_add(1, Ordering::SeqCst);
                let directory: Arc<dyn UserDirectory> = Arc::new(RecordingDirectory {
                    log: log.clone(),
                    store: store.clone(),
                    fail_updates: false,
                });
                async move { Ok(directory) }
            },
            move || {
                notifier_builds.fetch_add(1, Ordering::SeqCst);
                let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier {
                    log: notifier_log.clone(),
                    fail: false,
                });
                async move { Ok(notifier) }
            },
        )
    };

    TestApp {
        enrollment: configure(ListEnrollment::new(defaults)),
        log,
        store,
        default_directory_builds,
        default_notifier_builds,
    }
}

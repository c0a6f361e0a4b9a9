use clap::Parser;
use mailing_list::configuration::get_configuration;
use mailing_list::enrollment::{EnrollmentRequest, LookupPolicy};
use mailing_list::startup::build_enrollment;
use telemetry::{get_subscriber, init_subscriber, init_tracer};

/// Enroll a user in a mailing list using the configured directory and notifier.
#[derive(Parser, Debug)]
#[command(name = "enroll", version)]
struct Args {
    /// Username to enroll.
    username: String,
    /// Identifier of the mailing list, e.g. `blog_list`.
    list_id: String,
    /// Fail instead of creating the user when the username is unknown.
    #[arg(long)]
    require_existing: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let configuration = get_configuration()
        .await
        .expect("Failed to read configuration");

    let tracer = init_tracer(&configuration.telemetry).expect("Failed to build tracer");
    let subscriber = get_subscriber(
        configuration.telemetry.dataset_name.clone(),
        "info".into(),
        std::io::stdout,
        &configuration.telemetry,
        &tracer,
    );

    init_subscriber(subscriber);

    let mut enrollment = build_enrollment(&configuration);
    if args.require_existing {
        enrollment = enrollment.with_lookup_policy(LookupPolicy::RequireExisting);
    }

    let outcome = enrollment
        .enroll(EnrollmentRequest::new(args.username, args.list_id))
        .await;

    match &outcome {
        Ok(user) => {
            let user = serde_json::to_string(user)?;
            tracing::info!(%user, "Enrollment completed");
        }
        Err(e) => tracing::error!(error.cause_chain = ?e, "Enrollment failed"),
    }

    // Spans are exported in batches; flush before the process exits.
    let _ = tracer.force_flush();

    outcome?;

    Ok(())
}

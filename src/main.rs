use std::fmt::{Debug, Display};

use chirp::configuration::get_configuration;
use chirp::session_purge_worker::run_worker_until_stopped;
use chirp::startup::Application;
use chirp::telemetry::{get_subscriber, init_subscriber};
use tokio::task::JoinError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber(get_subscriber(
        "chirp".into(),
        "info".into(),
        std::io::stdout,
    ));

    let configuration = get_configuration().expect("failed to read configuration");
    let application = Application::build(configuration).await?;

    let purge_task = tokio::spawn(run_worker_until_stopped(
        application.sessions(),
        application.clock(),
    ));
    let api_task = tokio::spawn(application.run_until_stopped());
    tokio::select! {
        outcome = api_task => report_exit("API", outcome),
        outcome = purge_task => report_exit("Session purge worker", outcome),
    };

    Ok(())
}

fn report_exit<E>(task_name: &str, outcome: Result<Result<(), E>, JoinError>)
where
    E: Debug + Display,
{
    match outcome {
        Ok(Ok(())) => tracing::info!("{} has exited", task_name),
        Ok(Err(e)) => tracing::error!(
            error.cause_chain = ?e,
            error.message = %e,
            "{} failed",
            task_name
        ),
        Err(e) => tracing::error!(
            error.cause_chain = ?e,
            error.message = %e,
            "{} task failed to complete",
            task_name
        ),
    }
}

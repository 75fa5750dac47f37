//! Real Time Response examples

use std::path::PathBuf;
use std::time::Duration;

use caracara_client::modules::rtr::constants::DEFAULT_TIMEOUT;
use caracara_client::{BatchGetCmdRequest, GetFile, RtrBatchSession};
use caracara_filters::Dialect;
use tracing::{debug, info};

use super::{ExampleContext, pretty_print};
use crate::cli::RtrExample;
use crate::error::{ExampleError, Result};

const EVENT_LOG_DIRECTORY: &str = "C:\\Windows\\System32\\winevt\\Logs";

pub async fn run(example: RtrExample, ctx: &ExampleContext) -> Result<()> {
    match example {
        RtrExample::ClearQueuedSessions => {
            info!("Clearing all queued RTR sessions");
            ctx.client.rtr().clear_queued_sessions().await?;
            Ok(())
        }
        RtrExample::DescribePutFiles => {
            info!("Listing available PUT files");
            let put_files = ctx.client.rtr().describe_put_files(()).await?;
            pretty_print(&put_files, false)
        }
        RtrExample::DescribeQueuedSessions => {
            info!("Listing queued RTR sessions");
            let sessions = ctx.client.rtr().describe_queued_sessions().await?;
            pretty_print(&sessions, false)
        }
        RtrExample::DescribeScripts => {
            info!("Listing available cloud scripts");
            let scripts = ctx.client.rtr().describe_scripts(()).await?;
            pretty_print(&scripts, false)
        }
        RtrExample::DownloadEventLog => download_event_log(ctx).await,
        RtrExample::QueueCommand => queue_command(ctx).await,
    }
}

/// Connect to every host matching the example's filters
async fn connect_to_filtered_hosts(ctx: &ExampleContext, queueing: bool) -> Result<RtrBatchSession> {
    let filters = ctx.configured_filter(Dialect::Hosts)?;
    let fql = filters.get_fql();
    info!("Getting a list of hosts that match the FQL string {}", fql);

    let device_ids = ctx.client.hosts().get_device_ids(&filters).await?;
    if device_ids.is_empty() {
        return Err(ExampleError::no_devices(&fql));
    }

    info!(
        "Connecting to {} devices (queueing: {})",
        device_ids.len(),
        queueing
    );
    let mut session = ctx.client.rtr().batch_session();
    session.connect(&device_ids, queueing, DEFAULT_TIMEOUT).await?;

    let connected = session.device_ids().await?;
    if connected.is_empty() {
        info!(
            "No devices successfully connected within {}s",
            DEFAULT_TIMEOUT
        );
        return Err(ExampleError::NoSessionsConnected);
    }
    info!("Connected to {} systems", connected.len());
    Ok(session)
}

async fn queue_command(ctx: &ExampleContext) -> Result<()> {
    let command = ctx.settings.require_str("command")?;
    info!("Running the command: {}", command);

    let mut session = connect_to_filtered_hosts(ctx, true).await?;
    let result = session
        .run_generic_command(&command, None, DEFAULT_TIMEOUT)
        .await?;
    pretty_print(&result, true)
}

/// Download settings read from the profile
#[derive(Debug)]
struct DownloadSettings {
    filename: String,
    output_folder: PathBuf,
    attempt_delay: Duration,
    attempt_limit: u64,
}

impl DownloadSettings {
    fn from_context(ctx: &ExampleContext) -> Result<Self> {
        let filename = ctx.settings.require_str("filename")?;
        let output_folder = PathBuf::from(ctx.settings.require_str("output_folder")?);
        if !output_folder.is_dir() {
            return Err(ExampleError::InvalidSetting {
                name: "output_folder".to_string(),
                reason: format!("{} is not a directory", output_folder.display()),
            });
        }

        Ok(Self {
            filename,
            output_folder,
            attempt_delay: Duration::from_secs(ctx.settings.get_u64("attempt_delay", 30)?),
            attempt_limit: ctx.settings.get_u64("attempt_limit", 10)?,
        })
    }

    fn remote_path(&self) -> String {
        format!("{EVENT_LOG_DIRECTORY}\\{}", self.filename)
    }
}

async fn download_event_log(ctx: &ExampleContext) -> Result<()> {
    let settings = DownloadSettings::from_context(ctx)?;
    info!("Downloading the event log {}", settings.filename);

    let mut session = connect_to_filtered_hosts(ctx, false).await?;

    let log_file_path = settings.remote_path();
    info!("Requesting the file {}", log_file_path);
    let requests = session.get(&log_file_path, None, DEFAULT_TIMEOUT).await?;

    let expected_uploads: usize = requests.iter().map(|r| r.devices.len()).sum();
    info!(
        "{} batch get requests executed successfully against {} systems",
        requests.len(),
        expected_uploads
    );
    debug!(
        "{:?}",
        requests
            .iter()
            .map(|r| r.batch_get_cmd_req_id.as_str())
            .collect::<Vec<_>>()
    );

    let files = wait_for_uploads(&session, &requests, expected_uploads, &settings).await?;

    info!("Downloading log files from {} systems", files.len());
    for file in &files {
        let path = file.download(&settings.output_folder, true, false).await?;
        info!("Saved {}", path.display());
    }
    Ok(())
}

/// Poll the batch GET requests until every host has uploaded or the attempt
/// limit is reached
async fn wait_for_uploads(
    session: &RtrBatchSession,
    requests: &[BatchGetCmdRequest],
    expected_uploads: usize,
    settings: &DownloadSettings,
) -> Result<Vec<GetFile>> {
    let mut files = Vec::new();

    for attempt in 1..=settings.attempt_limit {
        info!("Download attempt {} of {}", attempt, settings.attempt_limit);
        info!(
            "Waiting {}s before checking for upload completion",
            settings.attempt_delay.as_secs()
        );
        tokio::time::sleep(settings.attempt_delay).await;

        files = session.get_status(requests, DEFAULT_TIMEOUT).await?;
        info!("{} systems have finished uploading the log file", files.len());
        debug!("{:?}", files);

        if files.len() >= expected_uploads {
            break;
        }
    }

    Ok(files)
}

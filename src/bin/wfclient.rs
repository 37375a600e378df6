use std::{
    env, fs,
    net::SocketAddr,
    path::Path,
    time::{Duration, SystemTime},
};

use anyhow::Context;
use log::{error, info, LevelFilter};
use tarpc::{client, context, tokio_serde::formats::Json};
use word_freq_rs::wf::{
    coordinator::{UploadServiceClient, UploadedFile},
    logging,
};

/// Big batches take a while to count, the default RPC deadline is far too short
const UPLOAD_DEADLINE: Duration = Duration::from_secs(600);

/// The client only does two things
/// 1. Ping the server, to fail early with a clear message if it isn't there
/// 2. Upload every file given on the command line as one batch, then print the result as JSON
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = env::args().collect::<Vec<String>>();
    if args.len() < 3 {
        println!("Usage: cargo run --bin wfclient -- <server address> <file>...");
        return Ok(());
    }
    logging::init(LevelFilter::Info)?;

    let server_address = args[1]
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid server address `{}`", args[1]))?;

    let files = args[2..]
        .iter()
        .map(|path| read_upload(Path::new(path)))
        .collect::<anyhow::Result<Vec<UploadedFile>>>()?;

    let mut connect = tarpc::serde_transport::tcp::connect(server_address, Json::default);
    connect.config_mut().max_frame_length(usize::MAX);
    let client_transport = match connect.await {
        Ok(t) => t,
        Err(e) => {
            error!(
                "[Preparation] Failed to connect to the server at {}, please check that it is running: {}",
                server_address,
                e
            );
            return Ok(());
        }
    };

    let client = UploadServiceClient::new(client::Config::default(), client_transport).spawn();

    let pong = client.ping(context::current()).await?;
    info!("[Preparation] Server answered `{}`: {}", pong.status, pong.message);

    info!("[Upload] Sending #{} file(s)", files.len());
    let mut ctx = context::current();
    ctx.deadline = SystemTime::now() + UPLOAD_DEADLINE;
    let result = client.upload_files(ctx, files).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn read_upload(path: &Path) -> anyhow::Result<UploadedFile> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?;
    Ok(UploadedFile::new(filename, content_type_for(path), bytes))
}

/// Guess the MIME type from the extension, the server only reports it back
fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "doc" => "application/msword",
        "txt" | "md" | "csv" | "log" => "text/plain",
        _ => "application/octet-stream",
    }
}

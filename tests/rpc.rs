use std::time::{Duration, SystemTime};

use tarpc::{client, context, server::{BaseChannel, Channel}};
use tempfile::TempDir;
use word_freq_rs::{
    wf::coordinator::{Coordinator, UploadService, UploadServiceClient, UploadedFile},
    BatchStatus, ServiceConfig, WordEntry,
};

fn spawn_service(temp: &TempDir) -> UploadServiceClient {
    let config = ServiceConfig {
        upload_dir: temp.path().to_path_buf(),
        workers: Some(2),
        ..ServiceConfig::default()
    };
    let coordinator = Coordinator::new(&config).unwrap();

    let (client_transport, server_transport) = tarpc::transport::channel::unbounded();
    let server = BaseChannel::with_defaults(server_transport);
    tokio::spawn(server.execute(coordinator.serve()));

    UploadServiceClient::new(client::Config::default(), client_transport).spawn()
}

#[tokio::test]
async fn ping_answers() {
    let temp = TempDir::new().unwrap();
    let client = spawn_service(&temp);

    let pong = client.ping(context::current()).await.unwrap();
    assert_eq!(pong.status, "ok");
    assert_eq!(pong.message, "Server is alive!");
}

#[tokio::test]
async fn upload_round_trip() {
    let temp = TempDir::new().unwrap();
    let client = spawn_service(&temp);

    let mut ctx = context::current();
    ctx.deadline = SystemTime::now() + Duration::from_secs(60);
    let result = client
        .upload_files(
            ctx,
            vec![
                UploadedFile::new("a.txt", "text/plain", "Hello, world! Hello again.".as_bytes()),
                UploadedFile::new("b.txt", "text/plain", "world peace".as_bytes()),
            ],
        )
        .await
        .unwrap();

    assert_eq!(result.status, BatchStatus::Success);
    assert_eq!(result.total_files_received, 2);
    assert_eq!(result.files[0].total_words, 4);
    assert_eq!(result.files[1].total_words, 2);
    assert_eq!(result.overall_top_30_words[0], WordEntry::new("hello".into(), 2));
    assert_eq!(result.overall_top_30_words[1], WordEntry::new("world".into(), 2));
    assert!(temp.path().join("a.txt").exists());
    assert!(temp.path().join("result.json").exists());
}

use std::{env, net::{IpAddr, Ipv4Addr, UdpSocket}, path::Path};

use anyhow::Context;
use futures::StreamExt;
use log::info;
use tarpc::{server::incoming::Incoming, tokio_serde::formats::Json};
use word_freq_rs::{
    wf::{coordinator::{Coordinator, UploadService}, logging},
    ServiceConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = env::args().collect::<Vec<String>>();
    if args.len() > 2 {
        // Every setting has a default, the config file only overrides some of them
        println!("Usage: cargo run --bin wfserver -- [config file]");
        return Ok(());
    }

    let config = match args.get(1) {
        Some(path) => ServiceConfig::load(Path::new(path))?,
        None => ServiceConfig::default(),
    };
    logging::init(config.log_level())?;

    info!(
        "[Server Configuration] {:?} backend | {:?} device | #{} worker(s) | uploads in {}",
        config.backend,
        config.device,
        config.worker_count(),
        config.upload_dir.display()
    );

    // The worker pool and the histogram device are created here, once, and live as long as the server
    let coordinator = Coordinator::new(&config)?;
    coordinator.store().ensure_dir()?;

    let mut listener = tarpc::serde_transport::tcp::listen(config.address, Json::default)
        .await
        .with_context(|| format!("failed to listen on {}", config.address))?;
    // A whole batch of uploads travels in a single frame
    listener.config_mut().max_frame_length(config.max_frame_bytes);

    let port = listener.local_addr().port();
    let ip_address = local_ip();
    info!("[Preparation] Server running at {}:{}", ip_address, port);
    info!("[Preparation] Point your client to {}:{}", ip_address, port);

    let server = listener
        // Accepts if this is a valid connection, otherwise ignores this connection
        .filter_map(|r| async { r.ok() })
        .map(tarpc::server::BaseChannel::with_defaults)
        .execute(coordinator.serve());

    tokio::select! {
        _ = server => {}
        _ = tokio::signal::ctrl_c() => {
            info!("[Shutdown] Interrupted, the server will now stop");
        }
    }

    Ok(())
}

/// The address other machines on the network can reach us at
/// Connecting a UDP socket sends nothing, it only makes the OS pick the outgoing interface
fn local_ip() -> IpAddr {
    let lookup = || -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect("8.8.8.8:80")?;
        Ok(socket.local_addr()?.ip())
    };
    lookup().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

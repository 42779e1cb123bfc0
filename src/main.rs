use anyhow::{bail, Context, Result};
use clap::Parser;
use roverlink_client::{NtripClient, RECEIVE_DATA_SIZE};
use roverlink_core::types::{CasterConfig, ClientState, Credentials};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

/// roverlink - stream NTRIP correction data from a caster
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Caster hostname
    #[arg(long)]
    host: String,

    /// Caster port
    #[arg(long, default_value_t = 2101)]
    port: u16,

    /// Mountpoint to request
    #[arg(long)]
    mountpoint: String,

    /// Username for basic authentication
    #[arg(long)]
    username: Option<String>,

    /// Password for basic authentication
    #[arg(long, env = "ROVERLINK_PASSWORD")]
    password: Option<String>,

    /// User-Agent presented to the caster
    #[arg(long, default_value = "NTRIP roverlink/0.2")]
    user_agent: String,

    /// GGA sentence to answer caster position requests with
    #[arg(long)]
    gga: Option<String>,

    /// Write correction data to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let credentials = match (&args.username, &args.password) {
        (Some(username), Some(password)) => {
            Credentials::basic(username, password, &args.user_agent)
        }
        (None, None) => Credentials::anonymous(&args.user_agent),
        _ => bail!("--username and --password must be given together"),
    };

    let mut sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path)
                .with_context(|| format!("failed to create output file {:?}", path))?,
        ),
        None => Box::new(io::stdout()),
    };

    let gga_sentence = args.gga.as_ref().map(|gga| {
        let mut sentence = gga.clone().into_bytes();
        if !sentence.ends_with(b"\r\n") {
            sentence.extend_from_slice(b"\r\n");
        }
        sentence
    });

    if gga_sentence.is_none() {
        warn!("no --gga sentence given; casters that require position feedback will time out");
    }

    let mut client = NtripClient::new();
    client.set_config(CasterConfig::new(
        &args.host,
        args.port,
        &args.mountpoint,
        gga_sentence.is_some(),
    ));
    client.set_credentials(credentials);

    client.init().await.context("caster handshake failed")?;
    info!(mountpoint = %args.mountpoint, "connected, streaming corrections");

    let mut buf = vec![0u8; RECEIVE_DATA_SIZE];
    loop {
        match client.state().await {
            ClientState::RequestGga => {
                let sentence = gga_sentence
                    .as_deref()
                    .expect("RequestGga cannot occur without a configured GGA sentence");
                match client.send_gga(sentence).await {
                    Ok(()) => {}
                    Err(roverlink_core::ClientError::Busy) => {}
                    Err(e) => {
                        error!(error = %e, "failed to answer GGA request");
                    }
                }
            }
            ClientState::CorrectionDataAvailable => {
                match client.correction_data(&mut buf).await {
                    Ok(n) => {
                        sink.write_all(&buf[..n])
                            .context("failed to write correction data")?;
                        sink.flush().ok();
                    }
                    Err(roverlink_core::ClientError::Busy) => {}
                    Err(e) => {
                        error!(error = %e, "failed to read correction data");
                    }
                }
            }
            ClientState::ConnectionReset | ClientState::Error => {
                let detail = client.detailed_error().await;
                error!(detail = %detail, "session ended");
                client.deinit().await;
                bail!("session ended: {detail}");
            }
            ClientState::Ready | ClientState::Busy => {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    }
}

//! Standalone ALSA gateway service.
//!
//! Binds configured audio channels to multicast loops and runs the
//! mix-and-replay loop until terminated.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use voxloop_audio_gateway::{AudioApp, AudioBackend, GatewayConfig};

#[derive(Parser, Debug)]
#[command(name = "alsa-gateway", about = "voxloop multicast audio gateway")]
struct Args {
    /// Path to the gateway configuration (JSON).
    #[arg(short, long)]
    config: PathBuf,

    /// Use mock audio devices instead of real hardware.
    #[arg(long)]
    mock: bool,
}

fn make_backend(mock: bool) -> anyhow::Result<Box<dyn AudioBackend>> {
    if mock {
        #[cfg(feature = "device-mock")]
        return Ok(Box::new(voxloop_audio_gateway::mock::MockBackend::default()));
        #[cfg(not(feature = "device-mock"))]
        anyhow::bail!("built without the device-mock feature");
    }
    #[cfg(all(feature = "device-alsa", target_os = "linux"))]
    return Ok(Box::new(voxloop_audio_gateway::alsa_backend::AlsaAudioBackend));
    #[cfg(not(all(feature = "device-alsa", target_os = "linux")))]
    anyhow::bail!("no hardware backend compiled in, run with --mock");
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = GatewayConfig::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let backend = make_backend(args.mock)?;

    let mut app = AudioApp::from_config(config, backend.as_ref()).context("building channels")?;
    tracing::info!(output = app.channels().len(), "gateway running");

    let stop = AtomicBool::new(false);
    app.run(&stop);
    Ok(())
}

use clap::Parser;
use std::net::IpAddr;

use castplay::cast::CastTarget;

#[derive(Parser)]
#[command(name = "castplay")]
#[command(author, version, about = "Stream a local or remote video file to a Cast device")]
pub struct Cli {
    /// Video source (local file or http(s) URL)
    #[arg(required = true)]
    pub video_source: String,

    /// Cast device address (host or host:port)
    #[arg(short, long)]
    pub device: CastTarget,

    /// Seconds the device may stay idle before playback is considered finished
    #[arg(long, default_value = "10")]
    pub idle_timeout: u64,

    /// Seconds to wait for the device to connect and become active
    #[arg(long, default_value = "5")]
    pub wait_timeout: u64,

    /// Local IP for serving video (default: autodetect)
    #[arg(long)]
    pub local_ip: Option<IpAddr>,

    /// Local port for serving video
    #[arg(long, default_value = "8080")]
    pub local_port: u16,

    /// Video source content type (default: autodetect)
    #[arg(long)]
    pub video_mimetype: Option<String>,

    /// Subtitles source (local file or http(s) URL)
    #[arg(long)]
    pub subs: Option<String>,

    /// Subtitles source content type (default: autodetect)
    #[arg(long)]
    pub subs_mimetype: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

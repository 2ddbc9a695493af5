mod error;
mod server;
mod state;

use std::{io::Write, path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};
use u2net_extractor::Variant;

#[derive(Parser)]
#[command(name = "u2net-server")]
#[command(about = "Background removal service backed by U²-Net salient object detection")]
struct Cli {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Path to the pretrained checkpoint (.pth or .mpk)
    #[arg(long, default_value = "models/u2net.pth")]
    weights: PathBuf,

    /// Network variant matching the checkpoint
    #[arg(long, value_enum, default_value = "full")]
    variant: VariantArg,

    /// Per-request inference timeout in seconds
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum VariantArg {
    /// u2net.pth (~176 MB)
    Full,
    /// u2netp.pth (~4.7 MB)
    Lite,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Full => Self::Full,
            VariantArg::Lite => Self::Lite,
        }
    }
}

fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    // default level is info
    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, log::LevelFilter::Info)
        .init();

    let state = state::AppState::initialize(
        cli.variant.into(),
        &cli.weights,
        Duration::from_secs(cli.timeout_secs),
    );

    actix_web::rt::System::new().block_on(server::startup(cli.host, cli.port, state))
}

use clap::Parser;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "concord-node")]
#[command(about = "Crash-tolerant register and consensus process")]
pub struct Args {
    /// Owner alias reported to the hub
    #[arg(long)]
    pub owner: Option<String>,

    /// Process index within the owner
    #[arg(long)]
    pub index: Option<u32>,

    /// Host to listen on and advertise
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,

    /// Hub address, host:port
    #[arg(long)]
    pub hub: Option<String>,

    #[arg(long, default_value = "config.json")]
    pub config: String,
}

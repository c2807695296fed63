use clap::Parser;

// Default directory holding the sled database
pub const DEFAULT_DATA_DIR: &str = "usdtg_data";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "USDTgVerse core runtime daemon")]
pub struct NodeConfig {
    /// Directory for the persistent state
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: String,

    /// Log level filter (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

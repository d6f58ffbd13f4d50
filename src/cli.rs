use clap::Parser;

#[derive(Parser)]
#[command(name = "chatbot-arena")]
#[command(version = "0.2.0")]
#[command(about = "Compare chatbot configurations head-to-head and vote blind on the best reply")]
pub struct Args {
    /// Path to the arena config (bots + common settings). When the file does
    /// not exist, the stock three-bot roster is used.
    #[arg(long, default_value = "arena.toml")]
    pub config: String,

    /// Base URL of the OpenAI-compatible backend
    #[arg(long, default_value = "http://localhost:5000")]
    pub backend: String,

    /// Model name passed to the backend
    #[arg(long, default_value = "default")]
    pub model: String,

    /// Bearer token for the backend; local servers usually need none
    #[arg(long)]
    pub api_key: Option<String>,

    /// Directory of generation-parameter preset files
    #[arg(long, default_value = "presets")]
    pub presets: String,

    /// List the presets found in the preset directory and exit
    #[arg(long)]
    pub list_presets: bool,
}

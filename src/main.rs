use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "doc-translator-rust",
    version,
    about = "Serve a web form that translates uploaded PDF and DOCX documents"
)]
struct Cli {
    /// Address to listen on (default from settings: 127.0.0.1:5000)
    #[arg(long = "addr")]
    addr: Option<String>,

    /// Translation provider: google, openai or openai:MODEL_ID
    #[arg(short = 'p', long = "provider")]
    provider: Option<String>,

    /// API key (overrides environment variables)
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    doc_translator_rust::logging::init(cli.verbose)?;

    doc_translator_rust::run(doc_translator_rust::Config {
        addr: cli.addr,
        provider: cli.provider,
        key: cli.key,
        settings_path: cli.read_settings,
    })
    .await
}

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "weft")]
#[command(about = "Weaves content, templates and layouts into a static site", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Build {
        #[arg(long, short, default_value = ".")]
        root: PathBuf,

        #[arg(long)]
        theme: Option<String>,

        #[arg(long)]
        base_url: Option<String>,
    },
    Serve {
        #[arg(long, short, default_value = ".")]
        root: PathBuf,

        #[arg(long)]
        theme: Option<String>,

        #[arg(long)]
        base_url: Option<String>,

        #[arg(long, default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    commands::init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Build {
            root,
            theme,
            base_url,
        } => commands::build_site(&root, theme.as_deref(), base_url.as_deref()),
        Commands::Serve {
            root,
            theme,
            base_url,
            port,
        } => commands::serve_site(&root, theme.as_deref(), base_url.as_deref(), port).await,
    };

    if let Err(error) = result {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

use clap::{CommandFactory, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "lexiloop-cli", version, about = "Lexiloop CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Word navigation
    Word {
        #[command(subcommand)]
        action: commands::word::WordAction,
    },
    /// Session status and clock
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Library management
    Library {
        #[command(subcommand)]
        action: commands::library::LibraryAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completions
    Completions { shell: clap_complete::Shell },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Word { action } => commands::word::run(action).await,
        Commands::Session { action } => commands::session::run(action).await,
        Commands::Library { action } => commands::library::run(action).await,
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "lexiloop-cli",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

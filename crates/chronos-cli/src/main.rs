use clap::{CommandFactory, Parser, Subcommand};

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "chronos", version, about = "Chronos focus timer")]
struct Cli {
    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Task list
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Timer settings (durations, auto-start, sound)
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Account sign-in
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Cloud sync
    Sync {
        #[command(subcommand)]
        action: commands::sync::SyncAction,
    },
    /// Interactive timer driven by keyboard shortcuts
    Run,
    /// Print shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action).await,
        Commands::Task { action } => commands::task::run(action).await,
        Commands::Settings { action } => commands::settings::run(action).await,
        Commands::Config { action } => commands::config::run(action),
        Commands::Auth { action } => commands::auth::run(action).await,
        Commands::Sync { action } => commands::sync::run(action).await,
        Commands::Run => commands::run::run().await,
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "chronos", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

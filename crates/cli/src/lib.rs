pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "matreq",
    about = "Material request tracker operator CLI",
    long_about = "Operate the matreq store: migrations, demo data, config inspection, \
                  readiness checks, CSV export and priority suggestions.",
    after_help = "Examples:\n  matreq doctor --json\n  matreq seed\n  \
                  matreq export --user user-site-lead --status pending\n  \
                  matreq suggest \"Portland Cement\" 150 kg"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo companies, sessions and material requests")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, database connectivity and suggestion readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Export the requests visible to a user's company as CSV")]
    Export {
        #[arg(long, help = "User whose company scope is exported")]
        user: String,
        #[arg(long, help = "Only export requests in this status")]
        status: Option<String>,
        #[arg(long, help = "Destination file (defaults to material-requests-YYYY-MM-DD.csv)")]
        output: Option<PathBuf>,
    },
    #[command(about = "Suggest a priority for a material using the configured suggester")]
    Suggest {
        material_name: String,
        quantity: f64,
        unit: String,
        #[arg(long)]
        notes: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Export { user, status, output } => {
            commands::export::run(commands::export::ExportArgs { user, status, output })
        }
        Command::Suggest { material_name, quantity, unit, notes } => {
            commands::suggest::run(commands::suggest::SuggestArgs {
                material_name,
                quantity,
                unit,
                notes,
            })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

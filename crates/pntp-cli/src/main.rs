mod commands;
mod config;
mod display;
mod prompt;

use std::io;

use clap::{Parser, Subcommand};
use pntp_core::EntityType;
use tracing_subscriber::EnvFilter;

use commands::{App, Edit, Selector, Target};
use config::ConfigArgs;

#[derive(Debug, Parser)]
#[command(name = "pntp", version, about = "PNTP transparency self-assessment")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the criteria of an entity type with their explanations.
    Catalog {
        #[arg(long = "tipo")]
        entity_type: EntityType,
    },
    /// List saved assessments.
    List,
    /// Print a saved assessment.
    Show(Selector),
    /// Answer the questionnaire interactively and save it.
    Fill(Selector),
    /// Change one criterion and save.
    Set {
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        edit: Edit,
    },
    /// Save the assessment and write its PDF report.
    Report(Target),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();
    tracing::debug!("pntp v{}", env!("CARGO_PKG_VERSION"));

    let app = App::open(cli.config.resolve()?)?;
    let mut out = io::stdout();
    match cli.command {
        Command::Catalog { entity_type } => app.catalog(&mut out, entity_type),
        Command::List => app.list(&mut out).await,
        Command::Show(selector) => app.show(&mut out, &selector).await,
        Command::Fill(selector) => app.fill(io::stdin().lock(), &mut out, &selector).await,
        Command::Set { target, edit } => app.set(&mut out, &target, &edit).await,
        Command::Report(target) => app.report(&mut out, &target).await,
    }
}

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use variations_switch::{add_variations, switch_to, Workspace};

#[derive(Parser)]
#[command(
    name = "variations",
    version,
    about = "Switch a white-label React Native app between its variations"
)]
struct Cli {
    /// Workspace root holding ios/, android/, src/ and the variations folder
    #[arg(long, global = true, env = "VARIATIONS_ROOT", default_value = ".")]
    root: PathBuf,

    /// Android rename tool, overriding the configuration file
    #[arg(long, global = true, value_name = "PATH")]
    rename_tool: Option<PathBuf>,

    /// Gradle wrapper run inside the Android root, overriding the configuration file
    #[arg(long, global = true, value_name = "PATH")]
    gradle: Option<PathBuf>,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply a variation to the iOS, Android and shared source trees
    Switch { variation: String },
    /// Create the folders and registry entry of one or more new variations
    Add {
        variation: String,
        others: Vec<String>,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with_target(false)
        .without_time()
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut workspace = Workspace::open(&cli.root)
        .with_context(|| format!("could not open workspace {}", cli.root.display()))?;
    if let Some(rename_tool) = cli.rename_tool {
        workspace.layout.rename_tool = rename_tool;
    }
    if let Some(gradle) = cli.gradle {
        workspace.layout.gradle = gradle;
    }
    debug!(root = %workspace.root.display(), layout = ?workspace.layout, "workspace");

    match cli.command {
        Command::Switch { variation } => {
            let tooling = workspace.command_tooling();
            switch_to(&workspace, &tooling, &variation)
                .with_context(|| format!("could not switch to \"{variation}\""))?;
        }
        Command::Add { variation, others } => {
            let names: Vec<String> = std::iter::once(variation).chain(others).collect();
            add_variations(&workspace, &names).context("could not add variations")?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e)
            if matches!(
                e.kind(),
                ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand | ErrorKind::MissingSubcommand
            ) =>
        {
            // No command given: show what there is to run.
            let _ = Cli::command().print_help();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            eprintln!("\n{}", Cli::command().render_help());
            return ExitCode::FAILURE;
        }
    };

    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "landclaim",
    about = "Inspect and migrate flat-file land-claim data",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Data root holding ClaimData/ and PlayerData/ (overrides the config file)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load the store, upgrading legacy data, and print a summary
    Load,
    /// Allocate one claim ID and print it
    NextId,
    /// Copy all data into a flat-file store at another root and retire this one
    Migrate(MigrateArgs),
}

#[derive(Args)]
pub struct MigrateArgs {
    /// Data root of the target store
    #[arg(long)]
    pub target: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_migrate_with_globals() {
        let cli = Cli::parse_from([
            "landclaim", "migrate", "--target", "/srv/new", "--root", "/srv/old", "-v",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.root, Some(PathBuf::from("/srv/old")));
        match cli.command {
            Command::Migrate(args) => assert_eq!(args.target, PathBuf::from("/srv/new")),
            _ => panic!("expected migrate"),
        }
    }

    #[test]
    fn next_id_is_kebab_case() {
        let cli = Cli::parse_from(["landclaim", "next-id"]);
        assert!(matches!(cli.command, Command::NextId));
        assert!(matches!(cli.format, OutputFormat::Text));
    }
}

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::PolicyKind;
use crate::league::Provider;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate palette-locked logos for every team in a fantasy league", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate logos for the built-in demo league
    Demo,
    /// Import a league from a provider, then generate logos
    Import {
        #[arg(short, long, value_enum)]
        provider: Provider,
        #[arg(short, long)]
        league_id: String,
        /// ESPN SWID cookie (private leagues)
        #[arg(long)]
        swid: Option<String>,
        /// ESPN espn_s2 cookie (private leagues)
        #[arg(long)]
        s2: Option<String>,
    },
}

/// How to (re)color teams before generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PaletteMode {
    /// Keep the colors each team already has
    #[default]
    Keep,
    /// Assign preset palettes in order
    Preset,
    /// Assign a random preset to each team
    Remix,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Output directory (overrides LOGO_OUTPUT_DIR)
    #[arg(short, long, global = true)]
    pub out: Option<PathBuf>,

    /// Batch policy (overrides LOGO_BATCH_POLICY)
    #[arg(long, value_enum, global = true)]
    pub policy: Option<PolicyKind>,

    #[arg(long, value_enum, default_value_t = PaletteMode::Keep, global = true)]
    pub palette: PaletteMode,

    /// Draw a fresh seed for every team before generating
    #[arg(long, default_value_t = false, global = true)]
    pub reseed: bool,

    /// Skip the SVG trace and export PNG only
    #[arg(long, default_value_t = false, global = true)]
    pub no_svg: bool,

    /// Copy each generated logo url to the clipboard
    #[arg(long, default_value_t = false, global = true)]
    pub copy_urls: bool,

    /// Emit logs as JSON lines
    #[arg(long, default_value_t = false, global = true)]
    pub json_logs: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_demo_with_flags() {
        let cli = Cli::try_parse_from(["league-logos", "demo", "--policy", "sequential", "--no-svg", "--reseed"]).unwrap();
        assert!(matches!(cli.command, Command::Demo));
        assert!(cli.run.reseed);
        assert_eq!(cli.run.policy, Some(PolicyKind::Sequential));
        assert!(cli.run.no_svg);
        assert_eq!(cli.run.palette, PaletteMode::Keep);
    }

    #[test]
    fn test_parse_import() {
        let cli = Cli::try_parse_from([
            "league-logos", "import", "--provider", "espn", "--league-id", "778", "--swid", "{ABC}",
        ])
        .unwrap();
        match cli.command {
            Command::Import { provider, league_id, swid, s2 } => {
                assert_eq!(provider, Provider::Espn);
                assert_eq!(league_id, "778");
                assert_eq!(swid.as_deref(), Some("{ABC}"));
                assert!(s2.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_import_requires_league_id() {
        assert!(Cli::try_parse_from(["league-logos", "import", "--provider", "mfl"]).is_err());
    }
}

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// without CLI options.
#[derive(Debug, Parser)]
#[command(
    name = "without",
    version,
    about = "Find Visual Basic With blocks and rewrite them to use local variables",
    args_conflicts_with_subcommands = true,
    subcommand_precedence_over_arg = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub lint: LintArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Lint files or directories.
    Lint(LintArgs),

    /// List available lints.
    ListRules,

    /// Explain a lint.
    Explain {
        /// Lint name or code.
        rule: String,
    },
}

#[derive(Debug, Clone, ClapArgs)]
pub struct LintArgs {
    /// Files/directories to lint. Defaults to stdin when absent.
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,

    /// Only run these lints (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Skip these lints (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Exit with code 1 if any diagnostics are emitted.
    #[arg(long)]
    pub deny_warnings: bool,

    /// Path to a `without.toml`; otherwise searched upward from the first path.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Apply machine-applicable fixes in place.
    #[arg(long, conflicts_with = "fix_dry_run")]
    pub fix: bool,

    /// Print the fixes as a unified diff without writing files.
    #[arg(long)]
    pub fix_dry_run: bool,

    /// Do not keep a `.bak` copy of files rewritten by `--fix`.
    #[arg(long, requires = "fix")]
    pub no_backup: bool,

    /// Also apply fixes that may lose information, such as comments inside
    /// a rewritten block.
    #[arg(long)]
    pub unsafe_fixes: bool,
}

impl LintArgs {
    pub fn wants_fixes(&self) -> bool {
        self.fix || self.fix_dry_run
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
    Github,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_paths_mean_lint() {
        let args = Args::try_parse_from(["without", "src", "--fix"]).unwrap();
        assert!(args.command.is_none());
        assert_eq!(args.lint.paths, vec![PathBuf::from("src")]);
        assert!(args.lint.fix);
    }

    #[test]
    fn lint_subcommand_parses_filters() {
        let args = Args::try_parse_from([
            "without",
            "lint",
            "--only",
            "with_block,WITHOUT001",
            "--format",
            "json",
            "a.vb",
        ])
        .unwrap();
        let Some(Command::Lint(lint)) = args.command else {
            panic!("expected lint subcommand");
        };
        assert_eq!(lint.only, vec!["with_block", "WITHOUT001"]);
        assert_eq!(lint.format, OutputFormat::Json);
    }

    #[test]
    fn unsafe_fixes_flag() {
        let args = Args::try_parse_from(["without", "--fix", "--unsafe-fixes", "a.vb"]).unwrap();
        assert!(args.lint.unsafe_fixes);
        assert!(!Args::try_parse_from(["without", "a.vb"]).unwrap().lint.unsafe_fixes);
    }

    #[test]
    fn fix_and_dry_run_conflict() {
        assert!(Args::try_parse_from(["without", "--fix", "--fix-dry-run", "a.vb"]).is_err());
    }

    #[test]
    fn no_backup_requires_fix() {
        assert!(Args::try_parse_from(["without", "--no-backup", "a.vb"]).is_err());
    }

    #[test]
    fn explain_takes_rule() {
        let args = Args::try_parse_from(["without", "explain", "WITHOUT001"]).unwrap();
        assert!(matches!(args.command, Some(Command::Explain { rule }) if rule == "WITHOUT001"));
    }
}

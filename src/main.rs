use anyhow::Context;
use clap::Parser;
use itertools::Itertools;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use without::LintEngine;
use without::cli::{Args, Command, LintArgs, OutputFormat};
use without::config;
use without::diagnostics::Diagnostic;
use without::fixer;
use without::level::LintLevel;
use without::lint::resolve_lint_alias;
use without::rules::ALL_DESCRIPTORS;

fn main() -> ExitCode {
    without::telemetry::init_tracing();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(2)
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    match args.command {
        Some(Command::ListRules) => {
            list_rules();
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Explain { rule }) => {
            explain_rule(&rule)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Lint(lint)) => lint_command(lint),
        None => lint_command(args.lint),
    }
}

fn list_rules() {
    for d in ALL_DESCRIPTORS.iter().sorted_by_key(|d| d.name) {
        let fix_status = if d.fix.available { " [fix]" } else { "" };
        println!(
            "{}\t{}\t{}\t{}{}",
            d.name,
            d.code,
            d.category.as_str(),
            d.description,
            fix_status
        );
    }
}

fn explain_rule(rule: &str) -> anyhow::Result<()> {
    let canonical = resolve_lint_alias(rule);
    let Some(d) = ALL_DESCRIPTORS.iter().find(|d| d.name == canonical) else {
        anyhow::bail!("unknown lint: {rule}");
    };

    println!("name: {}", d.name);
    println!("code: {}", d.code);
    println!("category: {}", d.category.as_str());
    println!("description: {}", d.description);
    if d.fix.available {
        println!("fix: available");
        if !d.fix.description.is_empty() {
            println!("fix description: {}", d.fix.description);
        }
    } else {
        println!("fix: not available");
    }
    Ok(())
}

fn build_engine(args: &LintArgs) -> anyhow::Result<LintEngine> {
    let start_dir = infer_start_dir(args)?;
    let loaded_cfg = config::load_config(args.config.as_deref(), &start_dir)?;
    LintEngine::from_config(loaded_cfg.as_ref().map(|(_, cfg)| cfg), &args.only, &args.skip)
}

fn lint_command(args: LintArgs) -> anyhow::Result<ExitCode> {
    if args.wants_fixes() {
        return fix_command(args);
    }

    let engine = build_engine(&args)?;

    let mut total = 0usize;
    let mut has_error = false;
    let mut failed = false;

    if matches!(args.format, OutputFormat::Json) {
        let mut all = Vec::new();
        if args.paths.is_empty() {
            let source = read_stdin()?;
            let diagnostics = engine.lint_source(&source)?;
            has_error |= any_error(&diagnostics);
            total += diagnostics.len();
            all.extend(diagnostics.iter().map(|d| JsonDiagnostic::new(d, "stdin")));
        } else {
            for path in collect_vb_files(&args.paths)? {
                let Some(diagnostics) = report_failure(lint_file(&engine, &path), &mut failed)
                else {
                    continue;
                };
                has_error |= any_error(&diagnostics);
                total += diagnostics.len();
                let file = path.display().to_string();
                all.extend(diagnostics.iter().map(|d| JsonDiagnostic::new(d, &file)));
            }
        }
        println!("{}", serde_json::to_string_pretty(&all)?);
    } else if args.paths.is_empty() {
        let source = read_stdin()?;
        let diagnostics = engine.lint_source(&source)?;
        total += diagnostics.len();
        has_error |= print_diagnostics(&diagnostics, "stdin", args.format, args.deny_warnings);
    } else {
        for path in collect_vb_files(&args.paths)? {
            let Some(diagnostics) = report_failure(lint_file(&engine, &path), &mut failed) else {
                continue;
            };
            total += diagnostics.len();
            let file = path.display().to_string();
            has_error |= print_diagnostics(&diagnostics, &file, args.format, args.deny_warnings);
        }
    }

    if failed {
        Ok(ExitCode::from(2))
    } else if has_error || (args.deny_warnings && total > 0) {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn fix_command(args: LintArgs) -> anyhow::Result<ExitCode> {
    if args.paths.is_empty() {
        anyhow::bail!("--fix requires file paths (stdin not supported)");
    }

    let engine = build_engine(&args)?;

    let files = collect_vb_files(&args.paths)?;
    let mut total_fixed = 0usize;
    let mut total_skipped = 0usize;
    let mut files_modified = 0usize;
    let mut failed = false;

    for path in &files {
        let fixed = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))
            .and_then(|source| {
                let outcome = engine
                    .fix_source_with(&source, args.unsafe_fixes)
                    .with_context(|| format!("failed to fix {}", path.display()))?;
                Ok((source, outcome))
            });
        let Some((original_source, outcome)) = report_failure(fixed, &mut failed) else {
            continue;
        };

        if !outcome.converged {
            eprintln!(
                "Warning: Max fix iterations ({}) reached for {}",
                without::MAX_FIX_ROUNDS,
                path.display()
            );
        }
        total_skipped += outcome.fixes_skipped;

        if outcome.fixes_applied == 0 {
            continue;
        }

        if args.fix_dry_run {
            let diff = fixer::format_diff(&original_source, &outcome.fixed_source, path);
            if !diff.is_empty() {
                println!("{diff}");
            }
        } else {
            if !args.no_backup {
                let backup_path = path.with_extension(format!(
                    "{}.bak",
                    path.extension().unwrap_or_default().to_string_lossy()
                ));
                std::fs::write(&backup_path, &original_source)?;
            }
            std::fs::write(path, &outcome.fixed_source)?;
            files_modified += 1;
        }
        total_fixed += outcome.fixes_applied;
    }

    if args.fix_dry_run {
        println!(
            "\n{} fix(es) would be applied to {} file(s)",
            total_fixed,
            files.len()
        );
    } else {
        println!(
            "Applied {} fix(es) to {} file(s)",
            total_fixed, files_modified
        );
    }
    if total_skipped > 0 {
        println!("{total_skipped} fix(es) skipped (use --unsafe-fixes to apply)");
    }

    if failed {
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

#[derive(Debug, Serialize)]
struct JsonDiagnostic {
    file: String,
    row: usize,
    column: usize,
    end_row: usize,
    end_column: usize,
    level: String,
    lint: String,
    code: String,
    message: String,
    fixable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    applicability: Option<&'static str>,
}

impl JsonDiagnostic {
    fn new(d: &Diagnostic, fallback_file: &str) -> Self {
        Self {
            file: d.file.clone().unwrap_or_else(|| fallback_file.to_string()),
            row: d.span.start.row,
            column: d.span.start.column,
            end_row: d.span.end.row,
            end_column: d.span.end.column,
            level: d.level.as_str().to_string(),
            lint: d.lint.name.to_string(),
            code: d.lint.code.to_string(),
            message: d.message.clone(),
            fixable: d.suggestion.is_some(),
            applicability: d.suggestion.as_ref().map(|s| s.applicability.as_str()),
        }
    }
}

fn lint_file(engine: &LintEngine, path: &Path) -> anyhow::Result<Vec<Diagnostic>> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    engine
        .lint_source(&source)
        .with_context(|| format!("failed to lint {}", path.display()))
}

/// Print a per-file error and remember it, so the remaining files still run.
fn report_failure<T>(result: anyhow::Result<T>, failed: &mut bool) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            eprintln!("{err:#}");
            *failed = true;
            None
        }
    }
}

fn read_stdin() -> anyhow::Result<String> {
    let mut source = String::new();
    std::io::stdin().read_to_string(&mut source)?;
    Ok(source)
}

fn any_error(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| d.level.is_error())
}

/// Print `diagnostics` in a text format; returns whether any counts as an error.
fn print_diagnostics(
    diagnostics: &[Diagnostic],
    fallback_file: &str,
    format: OutputFormat,
    deny_warnings: bool,
) -> bool {
    let mut has_error = false;

    match format {
        OutputFormat::Pretty => {
            for diag in diagnostics {
                let file = diag
                    .file
                    .clone()
                    .unwrap_or_else(|| fallback_file.to_string());
                println!(
                    "{}:{}:{}: {}: {} [{}]: {}",
                    file,
                    diag.span.start.row,
                    diag.span.start.column,
                    diag.level.as_str(),
                    diag.lint.name,
                    diag.lint.code,
                    diag.message
                );
                if let Some(help) = &diag.help {
                    println!("  help: {help}");
                }
                has_error |= diag.level.is_error();
            }
            println!("{} diagnostics for {}", diagnostics.len(), fallback_file);
        }
        OutputFormat::Github => {
            for diag in diagnostics {
                let file = diag
                    .file
                    .clone()
                    .unwrap_or_else(|| fallback_file.to_string());
                let kind = if diag.level == LintLevel::Error
                    || (deny_warnings && diag.level == LintLevel::Warn)
                {
                    "error"
                } else {
                    "warning"
                };

                println!(
                    "::{} file={},line={},col={},endLine={},endColumn={},title={}::{}",
                    kind,
                    github_escape(&file),
                    diag.span.start.row,
                    diag.span.start.column,
                    diag.span.end.row,
                    diag.span.end.column,
                    diag.lint.code,
                    github_escape(&diag.message)
                );
                has_error |= kind == "error";
            }
        }
        OutputFormat::Json => unreachable!("json handled by lint_command"),
    }

    has_error
}

fn github_escape(s: &str) -> String {
    s.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn collect_vb_files(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for path in paths {
        collect_from_path(path, &mut out)?;
    }

    out.sort();
    out.dedup();
    Ok(out)
}

fn collect_from_path(path: &Path, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    let meta =
        std::fs::metadata(path).with_context(|| format!("cannot access {}", path.display()))?;
    if meta.is_dir() {
        collect_from_dir(path, out)
    } else {
        out.push(path.to_path_buf());
        Ok(())
    }
}

fn collect_from_dir(dir: &Path, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            if should_skip_dir(&path) {
                continue;
            }
            collect_from_dir(&path, out)?;
            continue;
        }

        if is_vb_file(&path) {
            out.push(path);
        }
    }

    Ok(())
}

fn is_vb_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("vb"))
}

fn should_skip_dir(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
        return false;
    };

    name.starts_with('.') || matches!(name, "bin" | "obj")
}

fn infer_start_dir(args: &LintArgs) -> anyhow::Result<PathBuf> {
    let base = if let Some(p) = args.paths.first() {
        p.clone()
    } else {
        std::env::current_dir()?
    };

    let base = if base.is_file() {
        base.parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    } else {
        base
    };

    Ok(base)
}

//! logfix — fix memory lookup/writer.
//!
//! Matches error text against a flat-file YAML knowledge base of past
//! fixes, and appends new entries as issues get resolved.

use std::io::Read;
use std::path::PathBuf;

use clap::Parser;
use dialoguer::Input;

use logpilot::fixdb::matcher::{FixMatch, MIN_CONFIDENCE, match_fixes};
use logpilot::fixdb::{self, Fix};
use logpilot::paths;
use logpilot::text::contains_ci;

const HELP_TEXT: &str = "\
logfix - Fix memory lookup/writer

Usage: logfix [OPTIONS]

Matches error patterns against a YAML knowledge base of fixes.

Options:
  --check            Read logparse output from stdin, match all errors
  --query <text>     Match a single error string
  --add              Interactive: create a new fix entry
  --add-from <file>  Create fix entry from a YAML file
  --tags <csv>       Filter matches by tags
  --validate         Check all fix entries against schema
  --stats            Show database statistics
  --help             Show this help
  --help agent       Machine-readable self-update instructions

Examples:
  logparse build.log | logfix --check
  logfix --query \"undefined node 'ord,\"
  logfix --add --tags zephyr,devicetree
  logfix --validate
";

const HELP_AGENT_TEXT: &str = "\
AGENT SELF-UPDATE INSTRUCTIONS
===============================
TO ADD A NEW FIX ENTRY:
  1. Create: fixes/<primary-tag>/<slug>.yaml
  2. Required fields: pattern, tags, fix
  3. Optional fields: regex, context, resolved, commit_ref, severity
  4. Validate: logfix --validate
  5. Or use interactive: logfix --add

TO UPDATE AN EXISTING FIX:
  1. Locate: logfix --query \"<pattern>\"
  2. Edit the YAML file directly
  3. Validate: logfix --validate

NAMING CONVENTION:
  File: fixes/{tag}/{short-description}.yaml
  Example: fixes/zephyr/devicetree-ord-undefined.yaml

PATTERN WRITING GUIDELINES:
  - Use the shortest unique substring that identifies the error
  - Strip paths, line numbers, and hex values
  - Include build-system-specific fragments
  - The regex field is optional but improves precision
";

#[derive(Parser)]
#[command(name = "logfix", disable_help_flag = true)]
struct Cli {
    /// Read logparse output from stdin and match every error line.
    #[arg(long)]
    check: bool,

    /// Match a single error string.
    #[arg(long, value_name = "TEXT")]
    query: Option<String>,

    /// Interactively create a new fix entry.
    #[arg(long)]
    add: bool,

    /// Create a fix entry from an existing YAML file.
    #[arg(long, value_name = "FILE")]
    add_from: Option<PathBuf>,

    /// Filter matches by tags.
    #[arg(long, value_delimiter = ',')]
    tags: Vec<String>,

    /// Check every fix entry against the schema.
    #[arg(long)]
    validate: bool,

    /// Show database statistics.
    #[arg(long)]
    stats: bool,

    /// Show help; `--help agent` prints self-update instructions.
    #[arg(long, value_name = "TOPIC", num_args = 0..=1, default_missing_value = "usage")]
    help: Option<String>,
}

/// Pull candidate error lines out of logparse output (or any raw log).
fn extract_errors(input: &str) -> Vec<String> {
    input
        .lines()
        .filter(|line| {
            line.starts_with("[error]")
                || contains_ci(line, "error:")
                || contains_ci(line, "fatal:")
                || contains_ci(line, "undefined reference")
        })
        .map(ToString::to_string)
        .collect()
}

fn matches_tag_filter(fix: &Fix, tags: &[String]) -> bool {
    tags.is_empty() || fix.tags.iter().any(|t| tags.contains(t))
}

fn print_match(m: &FixMatch, show_path: bool) {
    print!("  [{:.0}% confidence] ", f64::from(m.confidence) * 100.0);
    if let Some(severity) = &m.fix.severity {
        print!("({severity}) ");
    }
    println!("Pattern: {}", m.fix.pattern);
    if !m.fix.tags.is_empty() {
        println!("    Tags: {}", m.fix.tags.join(", "));
    }
    if !m.fix.fix_text.is_empty() {
        println!("    Fix: {}", m.fix.fix_text);
    }
    if let Some(context) = &m.fix.context {
        println!("    Context: {context}");
    }
    if show_path && let Some(path) = &m.fix.source_path {
        println!("    File: {}", path.display());
    }
    println!();
}

fn prompt(label: &str) -> Option<String> {
    Input::<String>::new()
        .with_prompt(label)
        .allow_empty(true)
        .interact_text()
        .ok()
        .map(|s| s.trim().to_string())
}

fn interactive_add(filter_tags: &[String]) -> i32 {
    println!("=== Add new fix entry ===\n");

    let Some(pattern) = prompt("Error pattern (shortest unique substring)") else {
        return 1;
    };
    if pattern.is_empty() {
        eprintln!("logfix: pattern is required");
        return 1;
    }

    let regex = prompt("Regex pattern (optional, Enter to skip)").filter(|s| !s.is_empty());

    let tags: Vec<String> = if filter_tags.is_empty() {
        prompt("Tags (comma-separated)")
            .map(|s| {
                s.split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    } else {
        filter_tags.to_vec()
    };

    let fix_text = prompt("Fix description").unwrap_or_default();
    let context = prompt("Context (when/why encountered, optional)").filter(|s| !s.is_empty());
    let severity = prompt("Severity (error/warning, default: error)")
        .filter(|s| !s.is_empty())
        .or_else(|| Some("error".to_string()));

    let fix = Fix {
        pattern,
        regex,
        tags,
        fix_text,
        context,
        severity,
        resolved: Some(chrono::Local::now().format("%Y-%m-%d").to_string()),
        commit_ref: None,
        source_path: None,
    };

    if let Err(err) = fix.validate() {
        eprintln!("logfix: validation failed: {err}");
        return 1;
    }

    let fix_dir = paths::fixes_dir().unwrap_or_else(|| PathBuf::from("fixes"));
    let primary_tag = fix.tags.first().map_or("general", String::as_str);
    let file_path = fix_dir
        .join(primary_tag)
        .join(format!("{}.yaml", fixdb::slugify(&fix.pattern)));

    println!("\nWriting fix to: {}", file_path.display());
    match fixdb::write_fix(&file_path, &fix) {
        Ok(()) => {
            println!("Fix entry created successfully.");
            0
        }
        Err(err) => {
            eprintln!("logfix: failed to write fix file: {err}");
            1
        }
    }
}

fn cmd_add_from(path: &std::path::Path) -> i32 {
    let fix = match fixdb::load_fix(path) {
        Ok(fix) => fix,
        Err(_) => {
            eprintln!("logfix: cannot load '{}'", path.display());
            return 1;
        }
    };
    if let Err(err) = fix.validate() {
        eprintln!("logfix: validation failed: {err}");
        return 1;
    }
    println!("Fix entry loaded and validated from: {}", path.display());
    println!("  Pattern: {}", fix.pattern);
    println!("  Tags: {}", fix.tags.join(", "));
    0
}

fn cmd_stats(fixes: &[Fix], fix_dir: &std::path::Path) -> i32 {
    println!("[LOGFIX STATS]");
    println!("  Fix directory: {}", fix_dir.display());
    println!("  Total entries: {}", fixes.len());

    let errors = fixes
        .iter()
        .filter(|f| f.severity.as_deref() == Some("error"))
        .count();
    let warnings = fixes
        .iter()
        .filter(|f| f.severity.as_deref() == Some("warning"))
        .count();
    println!(
        "  Errors: {errors} | Warnings: {warnings} | Other: {}",
        fixes.len() - errors - warnings
    );

    let mut seen_tags: Vec<&str> = Vec::new();
    for fix in fixes {
        for tag in &fix.tags {
            if !seen_tags.contains(&tag.as_str()) {
                seen_tags.push(tag);
            }
        }
    }
    println!("  Unique tags: {} ({})", seen_tags.len(), seen_tags.join(", "));
    0
}

fn cmd_validate(fixes: &[Fix]) -> i32 {
    println!("[LOGFIX VALIDATE] Checking {} entries...", fixes.len());
    let mut invalid = 0;
    for fix in fixes {
        if let Err(err) = fix.validate() {
            let path = fix
                .source_path
                .as_ref()
                .map_or_else(|| "(unknown)".to_string(), |p| p.display().to_string());
            println!("  INVALID: {path} -- {err}");
            invalid += 1;
        }
    }
    if invalid == 0 {
        println!("  All {} entries are valid.", fixes.len());
    }
    0
}

fn cmd_query(query: &str, fixes: &[Fix], tags: &[String], fix_dir: &std::path::Path) -> i32 {
    if fixes.is_empty() {
        println!(
            "logfix: no fix entries found (fixes directory: {})",
            fix_dir.display()
        );
        return 0;
    }

    let matches = match_fixes(query, fixes, MIN_CONFIDENCE);
    println!("[LOGFIX] Query: {query}");
    println!("[LOGFIX] {} matches found:\n", matches.len());
    for m in &matches {
        if matches_tag_filter(m.fix, tags) {
            print_match(m, true);
        }
    }
    if matches.is_empty() {
        println!("  No matching fixes found.");
    }
    0
}

fn cmd_check(fixes: &[Fix], tags: &[String]) -> i32 {
    let mut input = String::new();
    if std::io::stdin().lock().read_to_string(&mut input).is_err() {
        eprintln!("logfix: cannot read stdin");
        return 1;
    }
    let errors = extract_errors(&input);

    println!(
        "[LOGFIX CHECK] Scanning {} error lines against {} fix entries...\n",
        errors.len(),
        fixes.len()
    );

    let mut total_matches = 0;
    for error in &errors {
        let matches = match_fixes(error, fixes, MIN_CONFIDENCE);
        if matches.is_empty() {
            continue;
        }
        println!("Error: {error}");
        for m in &matches {
            if matches_tag_filter(m.fix, tags) {
                print_match(m, false);
                total_matches += 1;
            }
        }
    }
    if total_matches == 0 {
        println!("No known fixes matched the errors.");
    }
    0
}

fn run(cli: &Cli) -> i32 {
    if cli.add {
        return interactive_add(&cli.tags);
    }

    let fix_dir = paths::fixes_dir();
    if fix_dir.is_none() && (cli.stats || cli.validate) {
        eprintln!("logfix: no fixes directory found");
        return 1;
    }
    let fix_dir = fix_dir.unwrap_or_else(|| PathBuf::from("fixes"));
    let fixes = fixdb::load_all_fixes();

    if let Some(path) = &cli.add_from {
        return cmd_add_from(path);
    }
    if cli.stats {
        return cmd_stats(&fixes, &fix_dir);
    }
    if cli.validate {
        return cmd_validate(&fixes);
    }
    if let Some(query) = &cli.query {
        return cmd_query(query, &fixes, &cli.tags, &fix_dir);
    }
    if cli.check {
        return cmd_check(&fixes, &cli.tags);
    }

    print!("{HELP_TEXT}");
    0
}

fn main() {
    let cli = Cli::parse();
    if let Some(topic) = &cli.help {
        let text = if topic == "agent" {
            HELP_AGENT_TEXT
        } else {
            HELP_TEXT
        };
        print!("{text}");
        std::process::exit(0);
    }
    std::process::exit(run(&cli));
}

//! logparse — semantic build log compression.
//!
//! Pipeline: mode detection, dedup + frequency, segment detection, interest
//! scoring, budget packing, rendering.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;

use logpilot::budget;
use logpilot::dedup::DedupTable;
use logpilot::input;
use logpilot::mode::{self, GENERIC_MODE, Mode, SNIFF_LINES};
use logpilot::render::{self, Report};
use logpilot::score::score_all;
use logpilot::segment::{SegType, detect_segments};
use logpilot::summary::extract_summary;

const RESERVE_TOKENS: usize = 200;
const TOKENS_PER_LINE: usize = 10;

const HELP_TEXT: &str = "\
logparse - Semantic build log compression

Usage: logparse [OPTIONS] [FILE]
       command | logparse [OPTIONS]

Compresses build logs into token-efficient summaries.
Reads from FILE, or stdin if no file given.

Options:
  --mode <name>      Force a specific build system mode
  --budget <lines>   Target output size in lines (default: 300)
  --keywords <csv>   Additional keywords to score as high-interest
  --raw-freq         Show full frequency table, not just top N
  --no-tail          Omit final lines of log
  --json             Output as JSON
  --help             Show this help
  --help agent       Machine-readable self-update instructions

Examples:
  logparse build.log
  logparse build.log --mode zephyr --budget 400
  west build 2>&1 | logparse --mode zephyr
";

const HELP_AGENT_TEXT: &str = "\
AGENT SELF-UPDATE INSTRUCTIONS
===============================
TO ADD A NEW BUILD SYSTEM MODE:
  1. Run: logexplore <sample.log> --suggest-mode > modes/draft.toml
  2. Edit the generated TOML to refine signatures, triggers, segments
  3. Rename to modes/<name>.toml
  4. Test: logparse <sample.log> --mode <name> and verify output quality

MODE FILE SCHEMA (modes/*.toml):
  [mode]
  name = \"example\"
  description = \"Example build system\"

  [detection]
  signatures = [\"BUILD\", \"make\"]

  [dedup]
  strip_patterns = [\"\\\"[^\\\"]*\\\"\", \"0x[0-9a-f]+\"]

  [segments]
  phase_markers = [\"Configuring\", \"Compiling\", \"Linking\"]
  block_triggers = [\"error:\", \"warning:\"]

  [interest]
  keywords = [\"FAILED\", \"undefined\"]
  error_patterns = [\"error:\", \"fatal:\"]
  warning_patterns = [\"warning:\"]
";

#[derive(Parser)]
#[command(name = "logparse", disable_help_flag = true)]
struct Cli {
    /// Input log file; stdin when omitted.
    file: Option<PathBuf>,

    /// Force a specific build system mode.
    #[arg(long)]
    mode: Option<String>,

    /// Target output size in lines.
    #[arg(long, default_value_t = 300)]
    budget: usize,

    /// Additional keywords to score as high-interest.
    #[arg(long, value_delimiter = ',')]
    keywords: Vec<String>,

    /// Show the full frequency table, not just the top entries.
    #[arg(long)]
    raw_freq: bool,

    /// Omit the final lines of the log.
    #[arg(long)]
    no_tail: bool,

    /// Output as JSON.
    #[arg(long)]
    json: bool,

    /// Show help; `--help agent` prints self-update instructions.
    #[arg(long, value_name = "TOPIC", num_args = 0..=1, default_missing_value = "usage")]
    help: Option<String>,
}

fn select_mode<'m>(
    requested: Option<&str>,
    lines: &[String],
    modes: &'m [Mode],
) -> Option<&'m Mode> {
    if let Some(name) = requested {
        let found = mode::find(modes, name);
        if found.is_none() {
            eprintln!("logparse: warning: mode '{name}' not found, using generic");
        }
        return found;
    }
    let sniff = &lines[..lines.len().min(SNIFF_LINES)];
    mode::detect(sniff, modes)
}

fn run(cli: &Cli) -> i32 {
    let lines = match input::load_input(cli.file.as_deref()) {
        Ok(lines) => lines,
        Err(err) => {
            match &cli.file {
                Some(path) => eprintln!("logparse: cannot open '{}'", path.display()),
                None => eprintln!("logparse: {err}"),
            }
            return 1;
        }
    };
    if lines.is_empty() {
        eprintln!("logparse: empty input");
        return 1;
    }

    let modes = mode::load_modes();
    let active = select_mode(cli.mode.as_deref(), &lines, &modes);
    let mode_name = active.map_or(GENERIC_MODE, |m| m.name.as_str());
    let strip_patterns = active.map_or(&[][..], |m| m.strip_patterns.as_slice());

    let mut dedup = DedupTable::with_capacity_hint(lines.len() / 2 + 64);
    for (i, line) in lines.iter().enumerate() {
        dedup.insert(line, i, strip_patterns);
    }

    let mut segments = detect_segments(&lines, active);
    score_all(&mut segments, &lines, active, &cli.keywords, &dedup);

    let error_blocks = segments
        .iter()
        .filter(|s| s.seg_type == SegType::Error)
        .count();
    let warning_blocks = segments
        .iter()
        .filter(|s| s.seg_type == SegType::Warning)
        .count();

    let packed = budget::pack(&segments, cli.budget * TOKENS_PER_LINE, RESERVE_TOKENS);
    let summary = extract_summary(&lines);

    let report = Report {
        mode_name,
        mode: active,
        lines: &lines,
        dedup: &dedup,
        segments: &segments,
        budget: &packed,
        error_blocks,
        warning_blocks,
        summary: &summary,
        raw_freq: cli.raw_freq,
        show_tail: !cli.no_tail,
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = if cli.json {
        render::json::render(&mut out, &report)
    } else {
        render::text::render(&mut out, &report).map_err(Into::into)
    };
    if result.is_err() {
        // Downstream closed the pipe; nothing sensible left to do.
        return 0;
    }
    let _ = out.flush();
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

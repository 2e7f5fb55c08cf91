//! logexplore — structure discovery for unfamiliar logs.
//!
//! Reveals phases, frequency patterns, and segment boundaries. Used before
//! creating new logparse modes.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;

use logpilot::dedup::DedupTable;
use logpilot::input;
use logpilot::mode::{self, Mode, SNIFF_LINES};
use logpilot::segment::{SegType, Segment, detect_segments, is_blank};

const DEFAULT_TOP: usize = 15;

/// Segments separated by a gap larger than this are distinct phases.
const PHASE_GAP_LINES: usize = 10;

const HELP_TEXT: &str = "\
logexplore - Structure discovery for unfamiliar logs

Usage: logexplore [OPTIONS] <FILE>

Analyzes log files to reveal structure, frequency patterns,
and segment boundaries. Use before creating new logparse modes.

Options:
  --show-freq        Full frequency table
  --show-segments    All detected segments with preview
  --show-phases      Phase boundary analysis only
  --top <N>          Number of frequency entries to show (default: 15)
  --suggest-mode     Output a draft TOML mode file based on analysis
  --help             Show this help
  --help agent       Machine-readable self-update instructions

Examples:
  logexplore build.log
  logexplore build.log --show-freq --top 20
  logexplore build.log --suggest-mode > modes/draft.toml
";

const HELP_AGENT_TEXT: &str = "\
AGENT SELF-UPDATE INSTRUCTIONS
===============================
TO ADD NEW FORMAT SIGNATURES:
  1. Edit an existing mode file -> [detection] -> signatures
  2. Or create a new mode file (see logparse --help agent)

SEGMENT DETECTION SIGNALS:
  - Blank line boundaries
  - Indentation level changes (>2 level shift)
  - Mode-specific phase markers
  - Tabular data detection (consistent column alignment)

TO REGISTER A NEW LOG FORMAT:
  1. Run: logexplore <sample.log> --suggest-mode
  2. Review and edit the generated TOML
  3. Save to modes/<name>.toml
  4. Test: logparse <sample.log> --mode <name>
";

#[derive(Parser)]
#[command(name = "logexplore", disable_help_flag = true)]
struct Cli {
    /// Input log file.
    file: Option<PathBuf>,

    /// Print the full frequency table.
    #[arg(long)]
    show_freq: bool,

    /// List every detected segment with a preview.
    #[arg(long)]
    show_segments: bool,

    /// Phase boundary analysis only.
    #[arg(long)]
    show_phases: bool,

    /// Number of frequency entries to show.
    #[arg(long, default_value_t = DEFAULT_TOP)]
    top: usize,

    /// Emit a draft TOML mode profile for this log.
    #[arg(long)]
    suggest_mode: bool,

    /// Show help; `--help agent` prints self-update instructions.
    #[arg(long, value_name = "TOPIC", num_args = 0..=1, default_missing_value = "usage")]
    help: Option<String>,
}

fn analyze_encoding<W: Write>(out: &mut W, lines: &[String]) -> std::io::Result<()> {
    let mut longest = 0;
    let mut total_len = 0;
    let mut all_ascii = true;
    for line in lines {
        total_len += line.len();
        longest = longest.max(line.len());
        if !line.is_ascii() {
            all_ascii = false;
        }
    }
    let avg = if lines.is_empty() {
        0
    } else {
        total_len / lines.len()
    };
    writeln!(
        out,
        "[ENCODING] {} | longest line: {} chars | avg: {} chars",
        if all_ascii { "ASCII" } else { "UTF-8" },
        longest,
        avg
    )
}

/// Group segments into phases at PHASE segments and large line gaps.
fn detect_phases<W: Write>(
    out: &mut W,
    lines: &[String],
    segments: &[Segment],
    detailed: bool,
) -> std::io::Result<()> {
    writeln!(
        out,
        "\n[PHASE BOUNDARIES] (detected by blank lines + pattern shifts)"
    )?;

    let mut phase_num = 0;
    let mut i = 0;
    while i < segments.len() {
        let phase_start = segments[i].start_line;
        let mut phase_end = segments[i].end_line;
        let mut j = i + 1;
        while j < segments.len() {
            if segments[j].seg_type == SegType::Phase {
                break;
            }
            if segments[j].start_line > segments[j - 1].end_line + PHASE_GAP_LINES {
                break;
            }
            phase_end = segments[j].end_line;
            j += 1;
        }

        let label: String = lines
            .get(phase_start)
            .map(|l| l.trim_start().chars().take(100).collect())
            .unwrap_or_default();

        phase_num += 1;
        writeln!(
            out,
            "  Phase {}: lines {}-{}      ({})",
            phase_num,
            phase_start + 1,
            phase_end + 1,
            label
        )?;

        if detailed {
            for line in lines.iter().skip(phase_start).take(3) {
                writeln!(out, "    | {line}")?;
            }
        }
        i = j;
    }
    Ok(())
}

fn suggest_mode_toml<W: Write>(
    out: &mut W,
    lines: &[String],
    segments: &[Segment],
) -> std::io::Result<()> {
    writeln!(out, "# Draft mode generated by logexplore")?;
    writeln!(out, "# Review and customize before using")?;
    writeln!(out)?;
    writeln!(out, "[mode]")?;
    writeln!(out, "name = \"draft\"")?;
    writeln!(out, "description = \"Auto-generated mode\"")?;
    writeln!(out)?;

    // Signature candidates: the first few substantial head lines.
    write!(out, "[detection]\nsignatures = [")?;
    let mut sig_count = 0;
    for line in lines.iter().take(20) {
        if sig_count >= 3 {
            break;
        }
        if is_blank(line) {
            continue;
        }
        let trimmed = line.trim();
        if trimmed.len() > 5 && trimmed.len() < 80 {
            if sig_count > 0 {
                write!(out, ", ")?;
            }
            let candidate: String = trimmed.chars().take(40).collect();
            write!(out, "\"{}\"", candidate.replace('\\', "\\\\").replace('"', "\\\""))?;
            sig_count += 1;
        }
    }
    writeln!(out, "]")?;
    writeln!(out)?;

    writeln!(out, "[dedup]")?;
    writeln!(
        out,
        "strip_patterns = [\"\\\"[^\\\"]*\\\"\", \"0x[0-9a-f]+\"]"
    )?;
    writeln!(out)?;

    writeln!(out, "[segments]")?;
    write!(out, "phase_markers = [")?;
    let mut marker_count = 0;
    for seg in segments {
        if marker_count >= 5 {
            break;
        }
        if seg.seg_type == SegType::Phase && seg.line_count > 0 {
            if marker_count > 0 {
                write!(out, ", ")?;
            }
            write!(out, "\"{}\"", lines[seg.start_line].trim())?;
            marker_count += 1;
        }
    }
    writeln!(out, "]")?;
    writeln!(out, "block_triggers = [\"error:\", \"warning:\", \"FAILED\"]")?;
    writeln!(out)?;

    writeln!(out, "[interest]")?;
    writeln!(
        out,
        "keywords = [\"error\", \"warning\", \"FAILED\", \"undefined\"]"
    )?;
    writeln!(
        out,
        "error_patterns = [\"error:\", \"fatal:\", \"FAILED\", \"undefined reference\"]"
    )?;
    writeln!(out, "warning_patterns = [\"warning:\"]")?;
    Ok(())
}

fn segment_type_label(seg_type: SegType) -> &'static str {
    match seg_type {
        SegType::Error => "error",
        SegType::Warning => "warning",
        SegType::Data => "tabular data",
        SegType::Phase => "phase marker",
        SegType::Info => "info",
        SegType::BuildProgress => "build progress",
        SegType::Boilerplate => "boilerplate",
        SegType::Normal => "block",
    }
}

#[allow(clippy::too_many_lines)]
fn run(cli: &Cli) -> std::io::Result<i32> {
    let Some(file) = &cli.file else {
        eprintln!("logexplore: no input file specified");
        eprintln!("Usage: logexplore [OPTIONS] <FILE>");
        return Ok(1);
    };

    let lines = match input::load_input(Some(file.as_path())) {
        Ok(lines) => lines,
        Err(_) => {
            eprintln!("logexplore: cannot open '{}'", file.display());
            return Ok(1);
        }
    };
    if lines.is_empty() {
        eprintln!("logexplore: empty input");
        return Ok(1);
    }

    let mut dedup = DedupTable::with_capacity_hint(lines.len() / 2 + 64);
    for (i, line) in lines.iter().enumerate() {
        dedup.insert(line, i, &[]);
    }

    let modes = mode::load_modes();
    let sniff = &lines[..lines.len().min(SNIFF_LINES)];
    let active: Option<&Mode> = mode::detect(sniff, &modes);

    let segments = detect_segments(&lines, active);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if cli.suggest_mode {
        suggest_mode_toml(&mut out, &lines, &segments)?;
        return Ok(0);
    }

    let sorted = dedup.sorted_by_frequency();
    let unique = sorted.len();
    writeln!(
        out,
        "[LOGEXPLORE] {} lines | {} unique | {} duplicates",
        lines.len(),
        unique,
        lines.len() - unique
    )?;
    analyze_encoding(&mut out, &lines)?;

    if !cli.show_freq || cli.show_phases {
        detect_phases(&mut out, &lines, &segments, cli.show_phases)?;
    }

    if !cli.show_phases || cli.show_freq {
        let top = if cli.show_freq {
            sorted.len()
        } else {
            cli.top.min(sorted.len())
        };
        writeln!(out, "\n[FREQUENCY TABLE: top {top}]")?;
        for entry in &sorted[..top] {
            writeln!(out, "  x{:<4} {}", entry.count, entry.original)?;
        }
    }

    if cli.show_segments || (!cli.show_freq && !cli.show_phases) {
        writeln!(out, "\n[SEGMENTS DETECTED: {}]", segments.len())?;
        for (i, seg) in segments.iter().enumerate() {
            writeln!(
                out,
                "  #{:<3} lines {}-{}  ({} lines, {})",
                i + 1,
                seg.start_line + 1,
                seg.end_line + 1,
                seg.line_count,
                segment_type_label(seg.seg_type)
            )?;
            if cli.show_segments && seg.line_count > 0 {
                for line in seg.lines(&lines).iter().take(2) {
                    writeln!(out, "    | {line}")?;
                }
                if seg.line_count > 2 {
                    writeln!(out, "    | ... ({} more lines)", seg.line_count - 2)?;
                }
            }
        }
    }

    if !cli.show_phases && !cli.show_freq && !cli.show_segments {
        writeln!(out, "\n[SIGNATURES FOUND]")?;
        match active {
            Some(m) => writeln!(out, "  Detected mode: {}", m.name)?,
            None => writeln!(
                out,
                "  No matching mode found. Use --suggest-mode to generate a draft."
            )?,
        }
    }

    Ok(0)
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
    std::process::exit(run(&cli).unwrap_or(0));
}

use std::fmt::Write as _;
use std::ops::Range;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use colored::{ColoredString, Colorize};
use tracing::{debug, info};
use weft_diff::{inline_chunk, unified_diff, TextDiffer};
use weft_merge::{MarkerLabels, ThreeWayMerger};
use weft_tree::{spawn_tree_diff, EntryState, TreeEntry, TreeRoot, WalkEvent};
use weft_types::{CancelToken, ChunkList, ChunkTag, Sequence};

use crate::cli::*;
use crate::config::Config;

/// Nothing differs.
const EXIT_SAME: u8 = 0;
/// Differences or unresolved conflicts were found.
const EXIT_DIFFERENT: u8 = 1;

pub fn run_command(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply(&cli.filters);
    let json = matches!(cli.format, OutputFormat::Json);

    let different = match cli.command {
        Command::Diff(args) => cmd_diff(args, &config, json)?,
        Command::Merge(args) => cmd_merge(args, &config, json)?,
        Command::Dir(args) => cmd_dir(args, &config, json)?,
    };
    Ok(ExitCode::from(if different { EXIT_DIFFERENT } else { EXIT_SAME }))
}

fn read_sequence(path: &Path) -> anyhow::Result<Sequence> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(Sequence::from_bytes(&bytes))
}

fn cmd_diff(args: DiffArgs, config: &Config, json: bool) -> anyhow::Result<bool> {
    let a = read_sequence(&args.left)?;
    let b = read_sequence(&args.right)?;
    let differ = TextDiffer::new(&config.diff)?;
    let chunks = differ.diff(a.lines(), b.lines());
    info!(chunks = chunks.len(), changes = chunks.change_count(), "diffed files");

    if json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
    } else {
        let left = args.left.display().to_string();
        let right = args.right.display().to_string();
        print!("{}", render_diff(&left, &right, a.lines(), b.lines(), &chunks, args.context));
        if args.inline {
            print!("{}", render_inline(a.lines(), b.lines(), &chunks));
        }
    }
    Ok(!chunks.is_identical())
}

/// Unified diff with hunk headers and changed lines coloured.
pub fn render_diff(
    left: &str,
    right: &str,
    a: &[String],
    b: &[String],
    chunks: &ChunkList,
    context: usize,
) -> String {
    if chunks.is_identical() {
        return String::new();
    }
    let mut out = String::new();
    for line in unified_diff(left, right, a, b, chunks, context).lines() {
        let painted = if line.starts_with("---") || line.starts_with("+++") {
            line.bold()
        } else if line.starts_with("@@") {
            line.cyan()
        } else if line.starts_with('+') {
            line.green()
        } else if line.starts_with('-') {
            line.red()
        } else {
            line.normal()
        };
        let _ = writeln!(out, "{painted}");
    }
    out
}

/// Replaced line pairs with the characters that changed highlighted.
pub fn render_inline(a: &[String], b: &[String], chunks: &ChunkList) -> String {
    let mut out = String::new();
    for chunk in chunks.iter().filter(|c| c.tag == ChunkTag::Replace) {
        for pair in inline_chunk(a, b, chunk) {
            let old: Vec<Range<usize>> = pair.changes.iter().map(|c| c.a.clone()).collect();
            let new: Vec<Range<usize>> = pair.changes.iter().map(|c| c.b.clone()).collect();
            let _ = writeln!(out, "{}", format!("@@ {} / {} @@", pair.a_line + 1, pair.b_line + 1).cyan());
            let _ = writeln!(out, "-{}", highlight(&a[pair.a_line], &old, |s| s.red().bold().underline()));
            let _ = writeln!(out, "+{}", highlight(&b[pair.b_line], &new, |s| s.green().bold().underline()));
        }
    }
    out
}

/// Paint the characters of `line` covered by `spans` (character offsets).
fn highlight(line: &str, spans: &[Range<usize>], paint: impl Fn(&str) -> ColoredString) -> String {
    let mut out = String::new();
    let mut run = String::new();
    let mut in_span = false;
    for (i, ch) in line.chars().enumerate() {
        let inside = spans.iter().any(|s| s.contains(&i));
        if inside != in_span && !run.is_empty() {
            flush(&mut out, &mut run, in_span, &paint);
        }
        in_span = inside;
        run.push(ch);
    }
    flush(&mut out, &mut run, in_span, &paint);
    out
}

fn flush(out: &mut String, run: &mut String, painted: bool, paint: &impl Fn(&str) -> ColoredString) {
    if run.is_empty() {
        return;
    }
    if painted {
        let _ = write!(out, "{}", paint(run.as_str()));
    } else {
        out.push_str(run);
    }
    run.clear();
}

fn cmd_merge(args: MergeArgs, config: &Config, json: bool) -> anyhow::Result<bool> {
    let mine = read_sequence(&args.mine)?;
    let base = read_sequence(&args.base)?;
    let theirs = read_sequence(&args.theirs)?;

    let mut opts = config.merge_options();
    if args.no_coalesce {
        opts.coalesce_adjacent_conflicts = false;
    }
    let merger = ThreeWayMerger::new(&opts)?;
    let result = merger.merge(base.lines(), mine.lines(), theirs.lines());
    info!(regions = result.len(), conflicts = result.conflict_count(), "merged files");

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(result.has_conflicts());
    }

    let labels = MarkerLabels {
        a: args.mine.display().to_string(),
        ancestor: args.base.display().to_string(),
        b: args.theirs.display().to_string(),
    };
    let text = result.render_with_markers(base.lines(), mine.lines(), theirs.lines(), &labels);
    match &args.output {
        Some(path) => {
            std::fs::write(path, &text).with_context(|| format!("writing {}", path.display()))?;
            debug!(path = %path.display(), "wrote merge result");
        }
        None => print!("{text}"),
    }

    let conflicts = result.conflict_count();
    if conflicts > 0 {
        eprintln!("{} {} unresolved conflict(s)", "!".yellow().bold(), conflicts);
    } else if args.output.is_some() {
        eprintln!("{} Merged cleanly.", "✓".green().bold());
    }
    Ok(conflicts > 0)
}

fn cmd_dir(args: DirArgs, config: &Config, json: bool) -> anyhow::Result<bool> {
    let mut opts = config.tree_options();
    opts.shallow_comparison |= args.shallow;
    if args.ignore_name_case {
        opts.case_sensitive = false;
    }
    if args.no_default_excludes {
        opts.excludes.clear();
    }
    if args.no_follow {
        opts.follow_symlinks = false;
    }
    opts.excludes.extend(args.excludes.iter().cloned());

    let roots: Vec<TreeRoot> = args.roots.iter().map(TreeRoot::fs).collect();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting runtime")?;
    let root = runtime.block_on(walk(roots, opts))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&root)?);
    } else {
        print!("{}", render_tree(&root, args.all));
    }
    Ok(!root.state.is_same_like())
}

/// Run the comparison, cancelling it on Ctrl-C.
async fn walk(roots: Vec<TreeRoot>, opts: weft_tree::TreeOptions) -> anyhow::Result<TreeEntry> {
    let mut worker = spawn_tree_diff(roots, opts, CancelToken::new());
    let mut compared = 0usize;
    loop {
        tokio::select! {
            event = worker.recv() => match event {
                Some(WalkEvent::Entry(report)) => {
                    compared += 1;
                    debug!(path = %report.path.display(), state = report.state.as_str(), "compared");
                }
                Some(WalkEvent::Finished(root)) => {
                    info!(entries = compared, "tree comparison finished");
                    return Ok(*root);
                }
                Some(WalkEvent::Cancelled) => anyhow::bail!("interrupted"),
                Some(WalkEvent::Failed(reason)) => anyhow::bail!("comparison failed: {reason}"),
                None => anyhow::bail!("comparison ended without a result"),
            },
            _ = tokio::signal::ctrl_c() => {
                eprintln!("{}", "Cancelling...".yellow());
                worker.cancel();
            }
        }
    }
}

fn paint_state(state: &EntryState) -> ColoredString {
    let label = state.as_str();
    match state {
        EntryState::Same | EntryState::SameFiltered => label.dimmed(),
        EntryState::DodgySame | EntryState::DodgyDifferent => label.yellow(),
        EntryState::Changed => label.red(),
        EntryState::NewLeft | EntryState::NewRight | EntryState::NewOther => label.green(),
        EntryState::Deleted => label.magenta(),
        EntryState::Error(_) => label.red().bold(),
    }
}

/// Indented listing of the compared entries. Without `all`, only entries
/// that differ are shown.
pub fn render_tree(root: &TreeEntry, all: bool) -> String {
    let mut out = String::new();
    for entry in root.iter().skip(1) {
        if !all && entry.state.is_same_like() {
            continue;
        }
        let depth = entry.path.components().count().saturating_sub(1);
        let suffix = if entry.is_dir() { "/" } else { "" };
        let _ = write!(
            out,
            "{}{:<16} {}{}",
            "  ".repeat(depth),
            paint_state(&entry.state),
            entry.name,
            suffix
        );
        if let EntryState::Error(reason) = &entry.state {
            let _ = write!(out, " ({})", reason.dimmed());
        }
        out.push('\n');
    }
    let changed = root.differing().filter(|e| !e.is_dir()).count();
    if changed == 0 {
        let _ = writeln!(out, "{} No differences.", "✓".green().bold());
    } else {
        let _ = writeln!(out, "{} {} entr{} differ.", "!".yellow().bold(), changed, if changed == 1 { "y" } else { "ies" });
    }
    out
}

//! Command dispatch for the binary: batch commands and the study shell.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::warn;

use repertoire::domain::PieceKind;
use repertoire::{ImportReport, Study, StudyConfig, StudySnapshot};

use crate::{Cli, Command};

/// Run one invocation of the binary
pub fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => StudyConfig::load(path)?,
        None => StudyConfig::default(),
    };
    let mut study = Study::from_config(&config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Merge { files } => {
            merge_files(&mut study, &files)?;
            write!(out, "{}", study.export_document(&[]))?;
        }
        Command::Stats { files, depth } => {
            merge_files(&mut study, &files)?;
            for entry in study.main_line_stats(depth) {
                let stats = entry.stats.unwrap_or_default();
                writeln!(
                    out,
                    "{:<8} {:>6} games  +{} ={} -{}  ({} alternative(s))",
                    entry.san,
                    stats.total,
                    stats.white,
                    stats.draw,
                    stats.black,
                    entry.alternatives
                )?;
            }
        }
        Command::Tree { files } => {
            merge_files(&mut study, &files)?;
            serde_json::to_writer_pretty(&mut out, &study.snapshot())?;
            writeln!(out)?;
        }
        Command::Schema => {
            serde_json::to_writer_pretty(&mut out, &StudySnapshot::json_schema())?;
            writeln!(out)?;
        }
        Command::Shell => {
            let stdin = io::stdin();
            run_shell(&mut study, stdin.lock(), &mut out)?;
        }
    }
    Ok(())
}

fn read_pgn(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn merge_files(study: &mut Study, files: &[PathBuf]) -> Result<ImportReport> {
    let texts = files
        .iter()
        .map(|path| read_pgn(path))
        .collect::<Result<Vec<_>>>()?;
    let report = study.import_merge(&texts);
    for failure in &report.parse_failures {
        warn!(
            "{} game {}: {}",
            files[failure.text].display(),
            failure.game,
            failure.error
        );
    }
    Ok(report)
}

enum Flow {
    Continue,
    Quit,
}

const HELP: &str = "\
commands:
  move <from> <to> [piece]   play a move by squares, e.g. move e7 e8 n
  play <san>                 play a move in SAN
  back | forward | reset     navigate
  goto <id>                  make a node active
  delete <id>                delete a node and its subtree
  comment [text]             set or clear the active node's comment
  import <file>              replace the study with a PGN file
  merge <file>               merge a PGN file into the study
  export                     print the study as PGN
  moves                      legal moves from the active position
  show                       describe the active node
  clear                      start a new empty study
  quit";

/// Read commands line by line until `quit` or end of input.
/// A failing command is reported and the loop goes on.
fn run_shell<R: BufRead, W: Write>(study: &mut Study, input: R, out: &mut W) -> Result<()> {
    for line in input.lines() {
        match execute(study, &line?, out) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => writeln!(out, "error: {e:#}")?,
        }
    }
    Ok(())
}

fn execute<W: Write>(study: &mut Study, line: &str, out: &mut W) -> Result<Flow> {
    let line = line.trim();
    let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let args: Vec<&str> = rest.split_whitespace().collect();

    match command {
        "" => {}
        "move" => {
            let (from, to) = match args.as_slice() {
                [from, to] | [from, to, _] => (*from, *to),
                _ => bail!("usage: move <from> <to> [piece]"),
            };
            let promotion = args
                .get(2)
                .map(|piece| {
                    PieceKind::parse(piece)
                        .filter(|kind| kind.is_promotion_piece())
                        .with_context(|| format!("cannot promote to '{piece}'"))
                })
                .transpose()?;
            study.make_move_with_promotion(from, to, promotion)?;
            show_active(study, out)?;
        }
        "play" => {
            if rest.is_empty() {
                bail!("usage: play <san>");
            }
            study.make_san_move(rest)?;
            show_active(study, out)?;
        }
        "back" => {
            study.navigate_back();
            show_active(study, out)?;
        }
        "forward" => {
            study.navigate_forward();
            show_active(study, out)?;
        }
        "reset" => {
            study.reset();
            show_active(study, out)?;
        }
        "goto" => {
            study.navigate_to(parse_id(rest)?)?;
            show_active(study, out)?;
        }
        "delete" => {
            let removed = study.delete_subtree(parse_id(rest)?)?;
            writeln!(out, "removed {removed} node(s)")?;
        }
        "comment" => {
            study.set_comment(study.active_id(), rest)?;
        }
        "import" => {
            let report = study.import_replace(&read_pgn(Path::new(rest))?);
            print_report(&report, out)?;
        }
        "merge" => {
            let report = study.import_merge(&[read_pgn(Path::new(rest))?]);
            print_report(&report, out)?;
        }
        "export" => writeln!(out, "{}", study.export())?,
        "moves" => {
            for (from, dests) in study.legal_destinations() {
                let dests: Vec<String> = dests.iter().map(ToString::to_string).collect();
                writeln!(out, "{from}: {}", dests.join(" "))?;
            }
        }
        "show" => show_active(study, out)?,
        "clear" => {
            study.clear();
            show_active(study, out)?;
        }
        "help" => writeln!(out, "{HELP}")?,
        "quit" | "exit" => return Ok(Flow::Quit),
        other => bail!("unknown command '{other}', try 'help'"),
    }
    Ok(Flow::Continue)
}

fn parse_id(text: &str) -> Result<usize> {
    text.parse()
        .with_context(|| format!("'{text}' is not a node id"))
}

fn show_active<W: Write>(study: &Study, out: &mut W) -> Result<()> {
    let node = study.active();
    writeln!(
        out,
        "node {} {} [{}]",
        node.id,
        node.san().unwrap_or("(start)"),
        node.board.fen()
    )?;
    let path: Vec<&str> = study
        .tree()
        .path_to_current()
        .into_iter()
        .filter_map(|id| study.tree().get(id).and_then(|n| n.san()))
        .collect();
    if !path.is_empty() {
        writeln!(out, "  line: {}", path.join(" "))?;
    }
    if let Some(comment) = &node.comment {
        writeln!(out, "  {{ {comment} }}")?;
    }
    for &child_id in &node.children {
        if let Some(child) = study.tree().get(child_id) {
            let total = child.stats.map(|s| s.total).unwrap_or(0);
            writeln!(
                out,
                "  -> {} {} ({total} games)",
                child.id,
                child.san().unwrap_or_default()
            )?;
        }
    }
    Ok(())
}

fn print_report<W: Write>(report: &ImportReport, out: &mut W) -> Result<()> {
    writeln!(
        out,
        "{} of {} game(s) folded",
        report.games_folded, report.games_parsed
    )?;
    for truncated in &report.truncated {
        writeln!(
            out,
            "  game {} stopped after {} ply at '{}': {}",
            truncated.game, truncated.ply, truncated.token, truncated.error
        )?;
    }
    for skipped in &report.skipped {
        writeln!(out, "  game {} skipped: {}", skipped.game, skipped.reason)?;
    }
    for failure in &report.parse_failures {
        writeln!(out, "  game {} unparsable: {}", failure.game, failure.error)?;
    }
    Ok(())
}

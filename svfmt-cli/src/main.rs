//! Command-line interface for svfmt
//! Formats SystemVerilog files to stdout, in place, or in check mode.
//!
//! Usage:
//!   svfmt `<path>`                          - Format to stdout
//!   svfmt --inplace `<path>`                - Rewrite the file
//!   svfmt --check `<path>`                  - Exit non-zero if formatting would change the file
//!   svfmt --lines 3-7 `<path>`              - Only format the given 1-based line ranges

use clap::{Arg, ArgAction, Command};
use std::fs;
use std::process;
use svfmt_core::{format, ExecutionControl, FormatError, LineNumberSet};

fn main() {
    let matches = Command::new("svfmt")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A SystemVerilog source formatter")
        .arg_required_else_help(true)
        .arg(Arg::new("path").help("Path to the SystemVerilog file").required(true).index(1))
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Configuration file layered over the built-in defaults"),
        )
        .arg(
            Arg::new("inplace")
                .long("inplace")
                .short('i')
                .help("Rewrite the file instead of printing to stdout")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .help("Print nothing; exit 1 if the file is not formatted")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("lines")
                .long("lines")
                .help("Comma-separated 1-based line ranges to format (e.g. '3-7,12')"),
        )
        .arg(
            Arg::new("column-limit")
                .long("column-limit")
                .value_parser(clap::value_parser!(i64))
                .help("Override the configured column limit"),
        )
        .arg(
            Arg::new("show-tree")
                .long("show-tree")
                .help("Dump the token partition tree and stop")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("show-largest")
                .long("show-largest")
                .value_parser(clap::value_parser!(usize))
                .help("Show the N largest token partitions and stop"),
        )
        .arg(
            Arg::new("show-optimal")
                .long("show-optimal")
                .help("Report equally optimal wrappings while formatting")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let path = matches.get_one::<String>("path").expect("path is required");
    let config = load_config(&matches);
    let style = config.style.to_format_style();

    let lines = matches
        .get_one::<String>("lines")
        .map(|spec| parse_line_ranges(spec))
        .unwrap_or_default();

    let show_largest = matches.get_one::<usize>("show-largest").copied().unwrap_or(0);
    let show_tree = matches.get_flag("show-tree");
    let control = ExecutionControl {
        max_search_states: config.search.max_search_states,
        show_token_partition_tree: show_tree,
        show_largest_token_partitions: show_largest,
        show_equally_optimal_wrappings: matches.get_flag("show-optimal"),
        any_stop: show_tree || show_largest > 0,
        cancel: None,
    };

    let source = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {}", path, e);
        process::exit(1);
    });

    let mut stderr = std::io::stderr();
    match format(&source, &style, &lines, &control, &mut stderr) {
        Ok(output) => {
            write_output(path, &source, &output, &matches);
        }
        Err(FormatError::Cancelled(reason)) if control.any_stop => {
            eprintln!("{}", reason);
        }
        Err(FormatError::ResourceExhausted {
            formatted_text,
            detail,
        }) => {
            // Best-effort output, flagged with a non-zero exit.
            eprintln!("Warning: {}", detail);
            write_output(path, &source, &formatted_text, &matches);
            process::exit(1);
        }
        Err(error) => {
            eprintln!("Error formatting {}: {}", path, error);
            process::exit(1);
        }
    }
}

fn load_config(matches: &clap::ArgMatches) -> svfmt_config::SvfmtConfig {
    let mut loader = svfmt_config::Loader::new().with_optional_file(".svfmt.toml");
    if let Some(path) = matches.get_one::<String>("config") {
        loader = loader.with_file(path);
    }
    if let Some(limit) = matches.get_one::<i64>("column-limit") {
        loader = loader
            .set_override("style.column_limit", *limit)
            .unwrap_or_else(|e| {
                eprintln!("Error applying --column-limit: {}", e);
                process::exit(1);
            });
    }
    loader.build().unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        process::exit(1);
    })
}

/// Parse "3-7,12" into line ranges (inclusive lo, exclusive hi).
fn parse_line_ranges(spec: &str) -> LineNumberSet {
    let mut lines = LineNumberSet::new();
    for piece in spec.split(',') {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        let parsed = match piece.split_once('-') {
            Some((lo, hi)) => lo
                .trim()
                .parse::<usize>()
                .and_then(|lo| hi.trim().parse::<usize>().map(|hi| (lo, hi + 1))),
            None => piece.parse::<usize>().map(|line| (line, line + 1)),
        };
        match parsed {
            Ok((lo, hi)) => lines.add(lo, hi),
            Err(_) => {
                eprintln!("Invalid line range: '{}'", piece);
                process::exit(1);
            }
        }
    }
    lines
}

fn write_output(path: &str, source: &str, output: &str, matches: &clap::ArgMatches) {
    if matches.get_flag("check") {
        if output != source {
            eprintln!("{} needs formatting", path);
            process::exit(1);
        }
        return;
    }
    if matches.get_flag("inplace") {
        if output != source {
            if let Err(e) = fs::write(path, output) {
                eprintln!("Error writing {}: {}", path, e);
                process::exit(1);
            }
        }
        return;
    }
    print!("{}", output);
}

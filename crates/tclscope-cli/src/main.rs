//! Offline analyzer: parse and index one script, then report what the index
//! contains. Useful for poking at the pipeline without an editor attached.

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser as ClapParser;
use log::debug;
use serde::Serialize;

use tclscope_index::{build, Index, ReferenceKind};
use tclscope_syntax::{parse_script, ParseContext, SourceFile, Span};

#[derive(ClapParser)]
#[command(
    name = "tclscope-cli",
    version,
    about = "Index a Tcl script and report its namespaces, procedures and references"
)]
struct Args {
    /// Script file to analyze; `-` reads standard input.
    #[arg(conflicts_with = "script")]
    file: Option<PathBuf>,

    /// Analyze an inline script string instead of a file.
    #[arg(long)]
    script: Option<String>,

    /// Emit the report as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct ProcedureReport {
    name: String,
    arguments: Vec<String>,
    required_args: usize,
    optional_args: usize,
    is_variadic: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    doc: Option<String>,
    usages: usize,
}

#[derive(Serialize)]
struct Report {
    namespaces: Vec<String>,
    procedures: Vec<ProcedureReport>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let (name, text) = match read_input(&args) {
        Ok(input) => input,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let file = SourceFile::new(name, text);
    let mut ctx = ParseContext::new(Arc::clone(&file));
    let script = parse_script(&mut ctx, Span::new(0, file.contents().len()));
    debug!("parsed {} top-level commands", script.commands.len());

    let mut index = Index::new();
    build(&mut index, &script);

    let report = report(&index);
    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(out) => println!("{out}"),
            Err(err) => {
                eprintln!("failed to serialise report: {err}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_report(&report);
    }
    ExitCode::SUCCESS
}

fn read_input(args: &Args) -> std::result::Result<(String, String), String> {
    if let Some(script) = &args.script {
        return Ok(("<script>".to_string(), script.clone()));
    }
    match &args.file {
        Some(path) if path.as_os_str() == "-" => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|err| format!("unable to read stdin: {err}"))?;
            Ok(("<stdin>".to_string(), text))
        }
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|err| format!("unable to read {}: {err}", path.display()))?;
            Ok((path.display().to_string(), text))
        }
        None => Err("no script supplied; pass a file, `-`, or --script".to_string()),
    }
}

fn report(index: &Index) -> Report {
    let mut namespaces: Vec<String> = index
        .namespaces
        .iter()
        .filter(|ns| ns.parent.is_some())
        .map(|ns| index.namespace_path(ns.id))
        .collect();
    namespaces.sort();

    let procedures = index
        .procs
        .iter()
        .map(|proc| {
            let arguments = proc
                .arguments
                .iter()
                .map(|&id| index.variables.get(id).name.clone())
                .collect();
            let usages = index
                .procs
                .references_to(proc.id)
                .filter(|r| r.kind == ReferenceKind::Usage)
                .count();
            ProcedureReport {
                name: index.proc_path(proc),
                arguments,
                required_args: proc.required_args,
                optional_args: proc.optional_args,
                is_variadic: proc.is_variadic,
                doc: proc.doc.clone(),
                usages,
            }
        })
        .collect();

    Report { namespaces, procedures }
}

fn print_report(report: &Report) {
    for namespace in &report.namespaces {
        println!("namespace {namespace}");
    }
    for proc in &report.procedures {
        println!(
            "proc {} {{{}}} ({} required, {} optional{}) used {} time{}",
            proc.name,
            proc.arguments.join(" "),
            proc.required_args,
            proc.optional_args,
            if proc.is_variadic { ", variadic" } else { "" },
            proc.usages,
            if proc.usages == 1 { "" } else { "s" },
        );
        if let Some(doc) = &proc.doc {
            for line in doc.lines() {
                println!("  # {line}");
            }
        }
    }
}

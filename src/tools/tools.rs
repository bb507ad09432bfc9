mod dump_disassemble;
use dump_disassemble::dump_disassemble;
mod dump_list_objects;
use dump_list_objects::dump_list_objects;
mod dump_pool;
use dump_pool::dump_pool;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tjs2_disasm::Disassembler;

/// Disassemble TJS2 (Kirikiri) bytecode files
#[derive(Clone, Debug, Parser)]
struct Args {
    /// input .tjs bytecode file, or a directory to disassemble in bulk
    #[arg(short, long)]
    input: PathBuf,
    /// output format, defaults to text
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,
    #[command(subcommand)]
    operation: Operation,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl Args {
    fn format(&self) -> OutputFormat {
        self.format.unwrap_or(OutputFormat::Text)
    }
}

#[derive(Clone, Debug, Subcommand)]
enum Operation {
    /// Disassemble one code context
    Disassemble(DisassembleArgs),
    /// List every code context with its summary metadata
    ListObjects,
    /// Dump the raw constant pool
    DumpPool,
}

#[derive(Clone, Debug, Parser)]
struct DisassembleArgs {
    /// code context index, defaults to the top-level context
    #[arg(short, long)]
    object: Option<usize>,
    /// first code word to disassemble
    #[arg(long, default_value_t = 0)]
    start: usize,
    /// last code word (exclusive) to disassemble, defaults to the end
    #[arg(long)]
    end: Option<usize>,
}

/// Expand a CLI `--input` path into the file(s) to process: itself if
/// it names a file, or every file found by recursing into it if it
/// names a directory (the documented "path to a file or directory"
/// invocation).
fn collect_input_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    collect_dir(path, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_dir(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_dir(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

fn load_disassembler(path: &Path) -> Result<Disassembler> {
    let data = fs::read(path)?;
    Disassembler::load(&data)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let files = collect_input_files(&args.input)?;
    let batch = files.len() > 1;
    let mut had_error = false;

    for path in &files {
        if batch {
            println!("==> {} <==", path.display());
        }
        let result = load_disassembler(path).and_then(|disasm| match &args.operation {
            Operation::Disassemble(disasm_args) => dump_disassemble(&disasm, &args, disasm_args),
            Operation::ListObjects => dump_list_objects(&disasm, &args),
            Operation::DumpPool => dump_pool(&disasm, &args),
        });
        if let Err(err) = result {
            eprintln!("{}: {:#}", path.display(), err);
            had_error = true;
        }
    }

    if had_error {
        bail!("one or more input files failed to disassemble");
    }
    Ok(())
}

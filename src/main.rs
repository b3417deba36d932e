use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
    time::Instant,
};

use clap::Parser;
use listc::{compile_source, display_error, CompileFailure, CompilerOptions, StringCoercion};
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(name = "listc", about = "Compiles list scripts to WebAssembly text")]
struct Args {
    /// Source files to compile. Each one is compiled independently.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Directory for the generated `.wat` files (defaults to next to each input).
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Initial linear memory size in 64KiB pages.
    #[arg(long, default_value_t = 1)]
    memory_pages: u32,

    /// Maximum number of lambdas in one module.
    #[arg(long, default_value_t = 256)]
    max_table_size: u32,

    /// Maximum number of live scratch locals of one kind in a function.
    /// This bounds how deeply list literals, loops and switches may nest.
    #[arg(long, default_value_t = 32)]
    max_scratch_locals: u32,

    /// Treat every integral number concatenated with a string as an address.
    #[arg(long)]
    heuristic_strings: bool,

    /// Export name of the entry function.
    #[arg(long, default_value = "run")]
    entry: String,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn options(&self) -> CompilerOptions {
        CompilerOptions {
            memory_pages: self.memory_pages,
            max_table_size: self.max_table_size,
            max_scratch_locals: self.max_scratch_locals,
            string_coercion: if self.heuristic_strings {
                StringCoercion::Heuristic
            } else {
                StringCoercion::Static
            },
            entry_export: self.entry.clone(),
        }
    }

    fn level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

fn output_path(input: &Path, out_dir: Option<&Path>) -> PathBuf {
    let stem = input.file_stem().unwrap_or(input.as_os_str());
    let mut name = PathBuf::from(stem);
    name.set_extension("wat");

    match out_dir {
        Some(dir) => dir.join(name),
        None => input.with_file_name(name),
    }
}

/// Compiles one file, printing its diagnostics. Returns whether it succeeded.
fn compile_file(path: &Path, options: &CompilerOptions, out_dir: Option<&Path>) -> bool {
    let start = Instant::now();
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            error!(file = %path.display(), "failed to read file: {}", err);
            return false;
        }
    };

    let module = match compile_source(&source, &file_name, options) {
        Ok(module) => module,
        Err(CompileFailure::Syntax(err)) => {
            eprint!("{}", display_error(&err, &source, &file_name));
            return false;
        }
        Err(CompileFailure::Semantic(errors)) => {
            for err in &errors {
                eprint!("{}", display_error(err, &source, &file_name));
            }
            eprintln!("{}: {} error(s)", file_name, errors.len());
            return false;
        }
        Err(failure @ CompileFailure::Internal(_)) => {
            error!(file = %file_name, "{}", failure);
            return false;
        }
    };
    info!(file = %file_name, "compiled in {:?}", start.elapsed());

    let output = output_path(path, out_dir);
    if let Err(err) = fs::write(&output, module) {
        error!(file = %output.display(), "failed to write module: {}", err);
        return false;
    }
    info!(file = %output.display(), "wrote module");
    true
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.level())
        .with_writer(std::io::stderr)
        .init();

    if let Some(dir) = &args.out_dir {
        if let Err(err) = fs::create_dir_all(dir) {
            error!(dir = %dir.display(), "failed to create output directory: {}", err);
            return ExitCode::FAILURE;
        }
    }

    let start = Instant::now();
    let options = args.options();
    let mut failed = 0;
    for file in &args.files {
        if !compile_file(file, &options, args.out_dir.as_deref()) {
            failed += 1;
        }
    }
    info!(files = args.files.len(), failed, "total time: {:?}", start.elapsed());

    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

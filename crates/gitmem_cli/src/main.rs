//! The `gitmem` binary: parse a program, then interpret it, step it
//! interactively, or model-check it, writing the event graph(s) alongside.

mod debugger;

use {
    anyhow::{Context, Result},
    clap::Parser,
    gitmem::GlobalContext,
    gitmem_core::Block,
    gitmem_verifier::{print_report, Explorer},
    std::{
        fs,
        path::{Path, PathBuf},
        process::ExitCode,
    },
};

/// Interpreter and stateless model checker for the gitmem language.
#[derive(Parser, Debug)]
#[command(name = "gitmem")]
#[command(about = "Run gitmem programs against versioned git-like memory", long_about = None)]
struct Cli {
    /// Path to the source file.
    input: PathBuf,

    /// Event-graph output path. The extension picks the format: `mmd` or
    /// `md` for Mermaid, anything else for Graphviz. Defaults to the
    /// input path with a `.dot` extension.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Trace-level logging on stderr.
    #[arg(short, long)]
    verbose: bool,

    /// Step threads interactively.
    #[arg(short, long)]
    interactive: bool,

    /// Explore every schedule with the model checker.
    #[arg(short, long)]
    explore: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "trace" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("cannot read {}", cli.input.display()))?;
    let program = gitmem_lang::parse(&source)
        .with_context(|| format!("{}: parse error", cli.input.display()))?;
    let output = cli
        .output
        .unwrap_or_else(|| cli.input.with_extension("dot"));

    if cli.interactive {
        debugger::run(program, &|gctx| write_graph(gctx, &output))
    } else if cli.explore {
        explore(program, &output)
    } else {
        interpret(program, &output)
    }
}

fn interpret(program: Block, output: &Path) -> Result<ExitCode> {
    let mut gctx = GlobalContext::new(program);
    let faulted = gitmem::run_threads(&mut gctx);
    write_graph(&gctx, output)?;
    Ok(exit_code(faulted))
}

fn explore(program: Block, output: &Path) -> Result<ExitCode> {
    let mut explorer = Explorer::new(program);
    let exploration = explorer.run();
    print_report(&exploration);

    // One graph per failing or deadlocked final state, on indexed paths.
    for (idx, state) in exploration
        .failing()
        .chain(exploration.deadlocked())
        .enumerate()
    {
        write_graph(&state.context, &indexed_path(output, idx))?;
    }

    Ok(exit_code(exploration.any_fault()))
}

fn exit_code(faulted: bool) -> ExitCode {
    if faulted {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn write_graph(gctx: &GlobalContext, path: &Path) -> Result<()> {
    let text = match path.extension().and_then(|ext| ext.to_str()) {
        Some("mmd" | "md") => gitmem::mermaid::render(gctx),
        _ => gitmem::graphviz::render(gctx),
    };
    fs::write(path, text).with_context(|| format!("cannot write {}", path.display()))
}

/// `graph.dot` becomes `graph_0.dot`, `graph_1.dot`, … so the graphs of
/// several traces do not overwrite each other.
fn indexed_path(path: &Path, idx: usize) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("graph");
    let name = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("{stem}_{idx}.{ext}"),
        None => format!("{stem}_{idx}"),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn indexed_paths_keep_directory_and_extension() {
        assert_eq!(
            indexed_path(Path::new("out/graph.dot"), 2),
            PathBuf::from("out/graph_2.dot")
        );
        assert_eq!(indexed_path(Path::new("graph"), 0), PathBuf::from("graph_0"));
    }
}

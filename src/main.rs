//! CLI entry point: a thin shell around the `rascheme` library. Parses
//! arguments, builds the heap and interpreter, installs the interrupt
//! handler, loads the init script, and hands off to `(sys:toplevel)`.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use rascheme::config::{Config, HeapConfig};
use rascheme::error::FatalError;
use rascheme::reader::Reader;
use rascheme::{Heap, Interpreter};

fn main() -> ExitCode {
    let config = match Config::try_parse() {
        Ok(config) => config,
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .compact()
        .init();

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: Config) -> Result<(), FatalError> {
    let heap = Heap::new(HeapConfig::default().cell_capacity)?;
    let mut interp = Interpreter::new(heap);
    rascheme::primitives::install(&mut interp.heap);

    install_interrupt_handler(&interp);

    load_init_script(&mut interp, &config.init_script)?;

    let toplevel_call = Reader::new("(sys:toplevel)")
        .read(&mut interp.heap)
        .expect("literal source never fails to parse")
        .expect("literal source always yields one form");
    let _ = interp.eval_top(toplevel_call);

    Ok(())
}

/// `SIGINT` flips the interpreter's cooperative interrupt flag rather than
/// terminating the process; `evaluate` polls it at the top of every call and
/// unwinds to the REPL's recovery point (§5).
fn install_interrupt_handler(interp: &Interpreter) {
    if let Err(e) = signal_hook::flag::register(signal_hook::consts::SIGINT, interp.interrupt_flag()) {
        tracing::warn!("failed to install SIGINT handler: {e}");
    }
}

fn load_init_script(interp: &mut Interpreter, path: &Path) -> Result<(), FatalError> {
    let path_str = path.display().to_string();
    let source = std::fs::read_to_string(path).map_err(|e| FatalError::InitScriptFailed(path_str.clone(), e.to_string()))?;

    let mut reader = Reader::new(&source);
    loop {
        let mark = interp.heap.root_mark();
        let form = reader
            .read(&mut interp.heap)
            .map_err(|e| FatalError::InitScriptFailed(path_str.clone(), e.to_string()))?;
        let Some(form) = form else { break };
        interp.heap.push_root(form);
        interp
            .eval_top(form)
            .map_err(|e| FatalError::InitScriptFailed(path_str.clone(), e.to_string()))?;
        interp.heap.unroot_to(mark);
    }
    Ok(())
}

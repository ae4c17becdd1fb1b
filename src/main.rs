// memviz: step-through memory model simulator for a C++-like subset

use std::fs;
use std::io;
use std::path::Path;
use std::process;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use memviz::demos::{self, DEMOS};
use memviz::interpreter::Interpreter;
use memviz::memory::{MemoryManager, Storage};
use memviz::snapshot::record;
use memviz::ui::App;

/// Snapshot history memory limit (256 MB)
const SNAPSHOT_LIMIT: usize = 256 * 1024 * 1024;

enum Input {
    File(String),
    Demo(usize),
    List,
}

struct Options {
    input: Input,
    batch: bool,
    verbose: bool,
}

fn usage(program_name: &str) -> ! {
    eprintln!("Usage: {} [--batch] [--verbose] <script.cpp>", program_name);
    eprintln!("       {} [--batch] [--verbose] --demo <n>", program_name);
    eprintln!("       {} --list", program_name);
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} --list             # Show the built-in demos", program_name);
    eprintln!("  {} --demo 4           # Step through shared_ptr reference counting", program_name);
    eprintln!("  {} --batch leak.cpp   # Print a text report instead of the viewer", program_name);
    process::exit(1);
}

fn parse_args() -> Options {
    let args: Vec<String> = std::env::args().collect();
    let program_name = args.first().map(|s| s.as_str()).unwrap_or("memviz");

    let mut input = None;
    let mut batch = false;
    let mut verbose = false;
    let mut rest = args.iter().skip(1);

    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--batch" => batch = true,
            "--verbose" | "-v" => verbose = true,
            "--list" => input = Some(Input::List),
            "--demo" => {
                let number = rest.next().and_then(|n| n.parse().ok());
                match number {
                    Some(n) => input = Some(Input::Demo(n)),
                    None => {
                        eprintln!("Error: --demo needs a number between 1 and {}", DEMOS.len());
                        usage(program_name);
                    }
                }
            }
            "-h" | "--help" => usage(program_name),
            flag if flag.starts_with('-') => {
                eprintln!("Error: unknown option '{}'", flag);
                usage(program_name);
            }
            path => input = Some(Input::File(path.to_string())),
        }
    }

    match input {
        Some(input) => Options {
            input,
            batch,
            verbose,
        },
        None => {
            eprintln!("Error: No input script provided");
            eprintln!();
            usage(program_name);
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_module("memviz", level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();
}

fn list_demos() {
    println!("Built-in demos:");
    for (i, demo) in DEMOS.iter().enumerate() {
        println!("  {}. {}", i + 1, demo.title);
    }
}

/// Print the final memory state of a batch run
fn print_report(memory: &MemoryManager) {
    println!("=== Memory Blocks ===");
    for block in memory.blocks() {
        let storage = match block.storage {
            Storage::Stack { slot } => format!("stack[{}]", slot),
            Storage::Heap => "heap".to_string(),
            Storage::UniqueHeap => "heap (unique_ptr)".to_string(),
            Storage::SharedHeap { ref_count } => format!("heap (shared_ptr, refs: {})", ref_count),
        };
        let state = if block.allocated { "live" } else { "freed" };
        let target = match block.pointer() {
            Some(slot) => match slot.points_to {
                Some(id) => format!(" -> #{}", id),
                None => " -> nullptr".to_string(),
            },
            None => String::new(),
        };
        println!(
            "  #{:<3} 0x{:08x} {:<12} {:>4} B  {:<28} {}{}",
            block.id, block.address, block.name, block.size, storage, state, target
        );
    }

    println!();
    println!("=== Events ===");
    for event in memory.events().iter() {
        println!("  [{:>3}] {:<6} {}", event.timestamp, event.kind.to_string(), event.description);
    }

    let stats = memory.stats();
    println!();
    println!(
        "Stack: {} B   Heap: {} B   Live blocks: {}   Leaked: {} block(s), {} B",
        stats.stack_bytes, stats.heap_bytes, stats.live_blocks, stats.leaked_blocks, stats.leaked_bytes
    );
}

fn run_batch(source: &str) -> bool {
    let mut interpreter = Interpreter::new();
    let result = interpreter.execute(source);
    print_report(interpreter.memory());
    match result {
        Ok(()) => true,
        Err(err) => {
            eprintln!();
            eprintln!("Error: {}", err);
            false
        }
    }
}

fn run_viewer(source: String) -> Result<(), Box<dyn std::error::Error>> {
    let mut interpreter = Interpreter::new();
    let recording = record(&mut interpreter, &source, SNAPSHOT_LIMIT);

    let (outcome, failed) = match &recording.error {
        Some(err) => (err.to_string(), true),
        None if recording.truncated => ("Recording truncated at snapshot limit".to_string(), false),
        None => {
            let leaks = interpreter.memory().stats().leaked_blocks;
            if leaks == 0 {
                ("Program finished: no leaks".to_string(), false)
            } else {
                (format!("Program finished: {} block(s) leaked", leaks), false)
            }
        }
    };

    if recording.history.is_empty() {
        eprintln!("Nothing to show: {}", outcome);
        return Ok(());
    }

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(recording.history, source, outcome, failed);
    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = parse_args();
    init_logging(options.verbose);

    let source = match options.input {
        Input::List => {
            list_demos();
            return Ok(());
        }
        Input::Demo(n) => match demos::get(n) {
            Some(demo) => demo.source.to_string(),
            None => {
                eprintln!("Error: no demo {} (there are {})", n, DEMOS.len());
                process::exit(1);
            }
        },
        Input::File(path) => {
            if !Path::new(&path).exists() {
                eprintln!("Error: File '{}' not found", path);
                process::exit(1);
            }
            fs::read_to_string(&path)?
        }
    };

    if options.batch {
        if !run_batch(&source) {
            process::exit(1);
        }
        return Ok(());
    }

    run_viewer(source)
}

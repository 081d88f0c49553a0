//! sqlweave CLI
//!
//! Usage:
//!   sqlweave [OPTIONS] [FILE]
//!
//! Options:
//!   -s, --sources <FILE>  TOML file declaring named data sources
//!   -o, --output <FILE>   Write rendered HTML to a file instead of stdout
//!   -h, --help            Print help

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::Parser;

use sqlweave::source::config;
use sqlweave::{render, SourceRegistry};

#[derive(Parser)]
#[command(name = "sqlweave")]
#[command(about = "Render HTML pages with embedded SQL query blocks")]
struct Cli {
    /// Input file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// TOML file declaring named data sources
    #[arg(short, long)]
    sources: Option<PathBuf>,

    /// Write rendered HTML to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    // If no input file and stdin is a terminal (interactive), show intro help
    if cli.input.is_none() && io::stdin().is_terminal() {
        print_intro();
        return;
    }

    // Load data sources
    let registry = match &cli.sources {
        Some(path) => match config::load_file(path) {
            Ok(registry) => registry,
            Err(e) => {
                eprintln!("Error loading sources '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => SourceRegistry::new(),
    };

    // Read input
    let (source_text, filename) = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => (buffer, "<stdin>".to_string()),
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    // Render; document problems surface in out.errors, never as a failure
    let out = match render(source_text.as_bytes(), &registry) {
        Ok(out) => out,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match &cli.output {
        Some(path) => {
            if let Err(e) = fs::write(path, &out.html) {
                eprintln!("Error writing '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        }
        None => print!("{}", out.html),
    }

    for err in &out.errors {
        eprintln!("{}", err.format(&source_text, &filename));
    }
}

fn print_intro() {
    println!(
        r#"sqlweave - Render HTML pages with embedded SQL query blocks

USAGE:
    sqlweave [OPTIONS] [FILE]
    cat page.html | sqlweave -s sources.toml

OPTIONS:
    -s, --sources   TOML file declaring named data sources
    -o, --output    Write rendered HTML to a file instead of stdout
    -h, --help      Print help

QUICK START:
    echo '<sql id="p">SELECT * FROM persons</sql>{{{{#p}}}}{{{{name}}}} {{{{/p}}}}' \
        | sqlweave -s sources.toml

A page is plain HTML. Each <sql> block runs against the data source named by
its src attribute (or the per-render in-memory store) and binds its rows under
the name in its id attribute; {{{{placeholders}}}} substitute those rows into
the surrounding markup. Render errors are reported here on stderr while the
page itself still renders best-effort."#
    );
}

//! Builds the toy-language parser and dumps its grammar tables, or, with
//! an input file, parses it and pretty-prints the module.

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use pylr_lang::{lang_parser, parse_module};
use std::path::PathBuf;

#[derive(ClapParser, Debug)]
#[command(version, about = "Dump the toy language grammar tables")]
struct Args {
    /// Source file to parse and pretty-print instead of dumping the
    /// grammar
    #[arg(short, long)]
    input: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let mut parser = lang_parser()?;

    match args.input {
        Some(path) => {
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("can't read {}", path.display()))?;
            let module = parse_module(&mut parser, &source)?;
            println!("{}", module);
        }
        None => {
            let stdout = std::io::stdout();
            parser.dump_grammar(&mut stdout.lock())?;
        }
    }
    Ok(())
}

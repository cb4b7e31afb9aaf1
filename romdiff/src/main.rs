//! # romdiff
//!
//! Disassembly differ for GBA decompilation projects.
//!
//! ## Usage
//! ```usage
//! romdiff diff <BASE_ROM> <BASE_SYMBOLS> <ROM> <SYMBOLS> <FUNCTION>
//! romdiff disasm <ROM> <SYMBOLS> [FUNCTION] [--address <ADDRESS>]
//! ```

mod args;
mod error;
mod printer;
mod symfile;

use colored::Colorize;
use log::trace;
use romdiff_lib::disasm::Disassembler;
use romdiff_lib::rom::Rom;
use romdiff_lib::runner::CompareConfigBuilder;
use structopt::StructOpt;

use std::{fs, process};

use crate::args::{Args, DiffArgs, DisasmArgs, SubCommand};
use crate::error::Error;

fn main() {
    pretty_env_logger::init();

    let args = Args::from_args();
    if let Err(e) = run(args) {
        println!("{}: {}", "Error".red().bold(), e);
        process::exit(1)
    }
}

fn run(args: Args) -> Result<(), Error> {
    match args.subcommand {
        SubCommand::Diff(args) => diff_functions(&args),
        SubCommand::Disasm(args) => print_function(&args),
    }
}

fn diff_functions(args: &DiffArgs) -> Result<(), Error> {
    trace!("Loading images and symbol files..");
    let base_image = fs::read(&args.base_rom)?;
    let modified_image = fs::read(&args.rom)?;
    let base_symbols = symfile::read_symbol_file(&args.base_symbols)?;
    let modified_symbols = symfile::read_symbol_file(&args.symbols)?;

    trace!("Running compare..");
    let results = CompareConfigBuilder::default()
        .with_base_image(&base_image)
        .with_modified_image(&modified_image)
        .with_base_symbols(&base_symbols)
        .with_modified_symbols(&modified_symbols)
        .with_function(&args.function)
        .build()
        .expect("Failed to create CompareConfig");
    let results = results.run()?;

    printer::print_diff(&results.events);
    printer::print_summary(&args.function, &results.events);
    Ok(())
}

fn print_function(args: &DisasmArgs) -> Result<(), Error> {
    trace!("Loading image and symbol file..");
    let image = fs::read(&args.rom)?;
    let symbols = symfile::read_symbol_file(&args.symbols)?;

    let entry = match (&args.function, args.address) {
        (_, Some(address)) => address,
        (Some(function), None) => symbols
            .lookup_name(function)
            .map(|symbol| symbol.effective_start())
            .ok_or_else(|| {
                Error::InvalidInput(format!("no symbol named {:?}", function))
            })?,
        (None, None) => {
            return Err(Error::InvalidInput(
                "either a function name or --address is required".to_string(),
            ));
        }
    };

    trace!("Disassembling {:#010x}..", entry);
    let disassembly = Disassembler::new(Rom::new(&image), &symbols)
        .disassemble(entry)
        .map_err(Error::from)?;
    printer::print_listing(disassembly);
    Ok(())
}

//! The compiler executable.

use std::fs;

use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use tacmips::{
    backend::reg_alloc::TieBreak,
    driver::{self, CompileConfig},
};

fn cli() -> Command {
    Command::new("compiler")
        .about("Allocate registers for three-address code and emit MIPS assembly")
        .arg(Arg::new("input").required(true).help("TAC source file"))
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Write to this file instead of stdout"),
        )
        .arg(
            Arg::new("max-regs")
                .long("max-regs")
                .value_parser(clap::value_parser!(usize))
                .default_value("8")
                .help("Number of allocatable registers (1-16)"),
        )
        .arg(
            Arg::new("order")
                .long("order")
                .value_parser(["insertion", "lexical"])
                .default_value("insertion")
                .help("Tie-break order among equally saturated variables"),
        )
        .arg(
            Arg::new("emit")
                .long("emit")
                .value_parser(["asm", "liveness", "interference", "regmap"])
                .default_value("asm")
                .help("What to print"),
        )
        .arg(
            Arg::new("name")
                .long("name")
                .default_value("main")
                .help("Label of the emitted unit"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Raise log verbosity, overridden by RUST_LOG"),
        )
}

fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let level = match matches.get_count("verbose") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let input = matches
        .get_one::<String>("input")
        .context("missing input file")?;
    let src = fs::read_to_string(input).with_context(|| format!("failed to read `{}`", input))?;

    let tie_break = match matches.get_one::<String>("order").map(String::as_str) {
        Some("lexical") => TieBreak::Lexical,
        _ => TieBreak::Insertion,
    };
    let config = CompileConfig {
        max_regs: matches.get_one::<usize>("max-regs").copied().unwrap_or(8),
        tie_break,
        name: matches
            .get_one::<String>("name")
            .cloned()
            .unwrap_or_else(|| "main".to_string()),
    };

    let output = driver::compile(&src, &config).map_err(|e| anyhow::anyhow!("{}", e))?;

    let text = match matches.get_one::<String>("emit").map(String::as_str) {
        Some("liveness") => output.liveness.display(&output.cfg),
        Some("interference") => output.graph.to_mermaid(),
        Some("regmap") => output.alloc.to_string(),
        _ => output.function.to_string(),
    };

    match matches.get_one::<String>("output") {
        Some(path) => fs::write(path, text).with_context(|| format!("failed to write `{}`", path))?,
        None => print!("{}", text),
    }

    Ok(())
}

use anyhow::Context as _;
use clap::Parser;
use lr1gen::{grammar::Grammar, lr1::LR1Automaton, table::ParseTable};
use std::{fmt::Write as _, fs, path::PathBuf, time::Instant};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Print the grammar analysis (rules, symbol sets, FIRST/FOLLOW sets).
    #[arg(long)]
    dump_grammar: bool,

    /// Print every automaton state with its items and transitions.
    #[arg(long)]
    dump_states: bool,

    /// Print the ACTION and GOTO table rows.
    #[arg(long)]
    dump_tables: bool,

    /// Write the report to the specified file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// The path of the grammar definition file.
    input: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::debug!("parsed CLI args = {:?}", args);

    process_file(&args)
        .with_context(|| anyhow::anyhow!("errored during processing {}", args.input.display()))?;

    Ok(())
}

fn process_file(args: &Args) -> anyhow::Result<()> {
    let s = Instant::now();
    let grammar = Grammar::from_file(&args.input)?;
    tracing::info!("grammar analysis: {:?} elapsed", s.elapsed());

    let mut unreferenced = vec![];
    for variable in grammar.variables() {
        if variable == grammar.accept_symbol() {
            continue;
        }
        if grammar.rules().all(|(_, rule)| !rule.right().contains(&variable)) {
            unreferenced.push(grammar.symbol_name(variable));
        }
    }
    if !unreferenced.is_empty() {
        println!(
            "[warning] The following variables are not referenced by any rule: {:?}",
            unreferenced
        );
    }

    let s = Instant::now();
    let automaton = LR1Automaton::generate(&grammar);
    tracing::info!(
        "canonical collection: {:?} elapsed ({} states)",
        s.elapsed(),
        automaton.len()
    );

    let s = Instant::now();
    let table = ParseTable::generate(&grammar, &automaton) //
        .context("the grammar is not LR(1)")?;
    tracing::info!("table synthesis: {:?} elapsed", s.elapsed());

    let everything = !(args.dump_grammar || args.dump_states || args.dump_tables);
    let mut report = String::new();
    if everything || args.dump_grammar {
        writeln!(report, "{}", grammar)?;
    }
    if everything || args.dump_states {
        writeln!(report, "{}", automaton.display(&grammar))?;
    }
    if everything || args.dump_tables {
        writeln!(report, "{}", table.display(&grammar))?;
    }

    match &args.output {
        Some(path) => fs::write(path, &report)
            .with_context(|| anyhow::anyhow!("failed to write report to {}", path.display()))?,
        None => print!("{}", report),
    }

    Ok(())
}

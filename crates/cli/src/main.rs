use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gnuopt::{OptionSpec, ParseConfig, compile, default_options, parse_compiled, summarize};
use std::{fs, path::PathBuf};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "gnuopt")]
#[command(
    version,
    about = "Parse command lines against JSON option declarations",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse arguments given after `--` and print the result as JSON
    Parse(ParseArgs),

    /// Print the option summary table
    Summary(SpecArgs),

    /// Print the options an empty command line resolves to
    Defaults(SpecArgs),
}

#[derive(Args)]
struct SpecArgs {
    /// JSON declaration document
    #[arg(short, long, value_name = "FILE", env = "GNUOPT_SPEC")]
    spec: PathBuf,
}

#[derive(Args)]
struct ParseArgs {
    #[command(flatten)]
    spec: SpecArgs,

    /// Stop option processing at the first positional argument
    #[arg(long)]
    in_order: bool,

    /// Only report options set on the command line
    #[arg(long)]
    no_defaults: bool,

    /// Treat option arguments that look like known switches as missing
    #[arg(long)]
    strict: bool,

    /// Only output JSON (no error lines on stderr)
    #[arg(long)]
    json: bool,

    /// Arguments to parse
    #[arg(last = true, value_name = "ARGS")]
    args: Vec<String>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse(args) => parse_command(args),
        Commands::Summary(args) => summary_command(args),
        Commands::Defaults(args) => defaults_command(args),
    }
}

fn load_specs(args: &SpecArgs) -> Result<Vec<OptionSpec>> {
    let path = &args.spec;
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read declarations: {}", path.display()))?;
    let loaded = gnuopt_metadata::load_declarations(&contents)
        .with_context(|| format!("failed to load declarations: {}", path.display()))?;
    compile(loaded.decls)
        .with_context(|| format!("invalid option declarations: {}", path.display()))
}

fn parse_command(args: ParseArgs) -> Result<()> {
    tracing::debug!("executing parse command");

    let specs = load_specs(&args.spec)?;
    let config = ParseConfig::new()
        .in_order(args.in_order)
        .no_defaults(args.no_defaults)
        .strict(args.strict);
    let parsed = parse_compiled(&specs, &args.args, &config);

    println!("{}", serde_json::to_string_pretty(&parsed)?);

    if !parsed.is_ok() {
        if !args.json {
            for err in &parsed.errors {
                eprintln!("error: {err}");
            }
        }
        std::process::exit(1);
    }

    Ok(())
}

fn summary_command(args: SpecArgs) -> Result<()> {
    tracing::debug!("executing summary command");

    let specs = load_specs(&args)?;
    println!("{}", summarize(&specs));
    Ok(())
}

fn defaults_command(args: SpecArgs) -> Result<()> {
    tracing::debug!("executing defaults command");

    let specs = load_specs(&args)?;
    println!("{}", serde_json::to_string_pretty(&default_options(&specs))?);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

use clap::{Parser, Subcommand};
use sdfread::{ReaderOptions, SdfFile, UnknownBlockPolicy};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sdfdump", about = "Inspect the metadata of SDF files")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Skip blocks with no metadata decoder instead of reporting them
    #[arg(long, global = true)]
    skip_unknown: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the file preamble
    Header {
        input: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// List every block in the summary region
    List {
        input: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let opts = ReaderOptions {
        unknown_blocks: if cli.skip_unknown { UnknownBlockPolicy::Skip } else { UnknownBlockPolicy::Error },
        ..ReaderOptions::default()
    };

    match cli.command {

        // ── Header ───────────────────────────────────────────────────────────
        Commands::Header { input, json } => {
            let sdf = SdfFile::open_with_options(&input, opts)?;
            let h = sdf.header();
            if json {
                println!("{}", serde_json::to_string_pretty(h)?);
                return Ok(());
            }
            println!("── SDF file ─────────────────────────────────────────────");
            println!("  Path            {}", input.display());
            println!("  Version         {}.{}", h.file_version, h.file_revision);
            println!("  Endianness      {:?}", h.endianness);
            println!("  Code            {} (I/O version {})", h.code_name, h.code_io_version);
            println!("  Step            {}", h.step);
            println!("  Time            {}", h.time);
            println!("  Job id          {}.{}", h.jobid1, h.jobid2);
            println!("  Blocks          {}", h.nblocks);
            println!("  Summary         {} B at {}", h.summary_size, h.summary_location);
            println!("  First block     {}", h.first_block_location);
            println!("  Restart dump    {}", h.restart_flag);
            println!("  Other domains   {}", h.other_domains);
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input, json } => {
            let sdf = SdfFile::open_with_options(&input, opts)?;
            if json {
                println!("{}", sdf.to_json()?);
                return Ok(());
            }
            println!("{:<24} {:<18} {:<10} {:>5} {:>12}  Name",
                     "Id", "Type", "Datatype", "Dims", "Data bytes");
            for b in sdf.blocks() {
                let datatype = b.datatype.map(|d| d.name()).unwrap_or("-");
                println!("{:<24} {:<18} {:<10} {:>5} {:>12}  {}",
                    b.id, b.kind().to_string(), datatype, b.ndims, b.data_length, b.name);
                if let Some(v) = &b.const_value {
                    println!("{:>26} = {}", "", v);
                }
                if !b.variable_ids.is_empty() {
                    println!("{:>26} → {}", "", b.variable_ids.join(", "));
                }
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

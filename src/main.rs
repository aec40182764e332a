use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use ropcheck::binary::tools::check_prerequisites;
use ropcheck::config::{normalize_mnemonic, DecoderBackend, RopCheckConfig, SectionSource};
use ropcheck::disasm::Architecture;
use ropcheck::hashing::DigestAlgorithm;
use ropcheck::logging::{init_tracing, init_tracing_json};
use ropcheck::pipeline::GadgetPipeline;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "ropcheck")]
#[command(version, about = "Find ROP gadgets in the executable sections of a binary", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn", value_name = "LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a binary and dump its gadgets
    Scan(ScanArgs),

    /// Report missing readelf/objdump/udcli
    Check,
}

#[derive(Args)]
struct ScanArgs {
    /// Binary to scan
    file: PathBuf,

    /// JSON configuration file; flags below override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only print counts, not the gadgets themselves
    #[arg(long)]
    no_dump: bool,

    /// Window size in bytes, anchor included (minimum 2)
    #[arg(short = 'w', long, value_name = "N")]
    window_bytes: Option<usize>,

    /// Anchor opcode in hex (e.g. c3)
    #[arg(long, value_name = "HEX", value_parser = parse_hex_byte)]
    anchor: Option<u8>,

    /// Mnemonic a gadget must end with
    #[arg(long, value_name = "MNEMONIC")]
    terminal: Option<String>,

    /// Decoder backend: auto, iced, capstone, external
    #[arg(long)]
    backend: Option<DecoderBackend>,

    /// Override the detected architecture
    #[arg(long)]
    arch: Option<Architecture>,

    /// Section source: object, or objdump to drive binutils
    #[arg(long, visible_alias = "source")]
    extractor: Option<SectionSource>,

    /// Dump each distinct gadget once
    #[arg(long)]
    unique: bool,

    /// Digest for content deduplication: md5, sha256, blake3
    #[arg(long)]
    digest: Option<DigestAlgorithm>,

    /// Worker threads; 0 uses every core
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Per-section time budget in milliseconds
    #[arg(long, value_name = "MS")]
    budget_ms: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn parse_hex_byte(s: &str) -> std::result::Result<u8, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u8::from_str_radix(digits, 16).map_err(|e| format!("invalid hex byte '{}': {}", s, e))
}

impl ScanArgs {
    fn resolve_config(&self) -> Result<RopCheckConfig> {
        let mut cfg = match &self.config {
            Some(path) => RopCheckConfig::from_json_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => RopCheckConfig::default(),
        };
        if self.no_dump {
            cfg.pipeline.dump = false;
        }
        if let Some(n) = self.window_bytes {
            cfg.gadgets.max_window = n;
        }
        if let Some(b) = self.anchor {
            cfg.gadgets.anchor_byte = b;
        }
        if let Some(t) = &self.terminal {
            cfg.gadgets.terminal_mnemonic = normalize_mnemonic(t);
        }
        if let Some(b) = self.backend {
            cfg.decoder.backend = b;
        }
        if self.arch.is_some() {
            cfg.decoder.arch = self.arch;
        }
        if let Some(s) = self.extractor {
            cfg.pipeline.source = s;
        }
        if self.unique {
            cfg.pipeline.unique_only = true;
        }
        if let Some(d) = self.digest {
            cfg.pipeline.digest = d;
        }
        if let Some(j) = self.jobs {
            cfg.pipeline.jobs = j;
        }
        if self.budget_ms.is_some() {
            cfg.pipeline.section_budget_ms = self.budget_ms;
        }
        cfg.gadgets.validate()?;
        Ok(cfg)
    }
}

fn cmd_scan(args: &ScanArgs) -> Result<ExitCode> {
    let cfg = args.resolve_config()?;
    let pipeline = GadgetPipeline::from_config(&args.file, &cfg)
        .with_context(|| format!("preparing scan of {}", args.file.display()))?;
    let report = pipeline.run(&args.file)?;

    // gadget dumps run to many thousands of lines
    let mut out = BufWriter::new(std::io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    } else {
        report.write_text(&mut out)?;
    }
    out.flush()?;

    if report.has_size_mismatch() {
        error!(path = %args.file.display(), "At least one section had a size mismatch");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_check() -> Result<ExitCode> {
    let missing = check_prerequisites();
    if missing.is_empty() {
        println!("All external tools found");
        return Ok(ExitCode::SUCCESS);
    }
    for tool in &missing {
        println!("{} not found", tool);
    }
    info!(missing = missing.len(), "Prerequisite check failed");
    Ok(ExitCode::FAILURE)
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.log_json {
        init_tracing_json(&cli.log_level);
    } else {
        init_tracing(&cli.log_level);
    }

    match &cli.command {
        Commands::Scan(args) => {
            if !args.file.exists() {
                bail!("{} does not exist", args.file.display());
            }
            cmd_scan(args)
        }
        Commands::Check => cmd_check(),
    }
}

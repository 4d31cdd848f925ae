//! # Main — CLI Entry Point
//!
//! Parses the single optional `power` argument, runs the sieve, and writes
//! the primes to `./primes.txt`.
//!
//! Input handling follows a recover-don't-reject policy: a missing,
//! non-numeric, or too-small `power` falls back to the default (20) with a
//! warning on the diagnostic stream. The two fatal failure modes — the bit
//! field cannot be allocated, or the output file cannot be created — exit
//! non-zero with a diagnostic message; neither is retried.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing::{info, warn};

use eratos::sieve::{self, Sieve};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Where the prime list lands, matching the historical fixed destination.
const OUTPUT_PATH: &str = "./primes.txt";

#[derive(Parser)]
#[command(name = "eratos", about = "Compute all primes below 2^power")]
struct Cli {
    /// Bound exponent: sieve the range [0, 2^power). Non-numeric values or
    /// values below 3 fall back to the default with a warning.
    power: Option<String>,
}

/// Resolve the effective bound exponent from the raw argument.
///
/// Recovery is local: bad input substitutes the default rather than failing,
/// so the run always produces a prime list.
fn resolve_power(arg: Option<&str>) -> u32 {
    let Some(raw) = arg else {
        return sieve::DEFAULT_POWER;
    };
    match raw.parse::<u32>() {
        Ok(power) if power >= sieve::MIN_POWER => power,
        _ => {
            warn!(
                power = raw,
                default = sieve::DEFAULT_POWER,
                "invalid value for power, using default"
            );
            sieve::DEFAULT_POWER
        }
    }
}

fn main() -> Result<()> {
    // Structured logging on stderr: LOG_FORMAT=json for machine consumers,
    // human-readable otherwise
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();
    let power = resolve_power(cli.power.as_deref());
    info!(power, "sieving primes below 2^{}", power);

    let mut sieve = Sieve::new(power)?;
    sieve.run();

    let file = File::create(OUTPUT_PATH)
        .with_context(|| format!("failed to create {}", OUTPUT_PATH))?;
    let mut out = BufWriter::new(file);
    sieve
        .write_primes(&mut out)
        .with_context(|| format!("failed to write {}", OUTPUT_PATH))?;
    out.flush()
        .with_context(|| format!("failed to write {}", OUTPUT_PATH))?;

    Ok(())
}

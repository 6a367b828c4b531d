use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use num_bigint::BigUint;
use rand::{rngs::StdRng, SeedableRng};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rsa_oracle::{
    blind,
    keys::{KeyPair, PUBLIC_EXPONENT},
    remote::{RemoteOracle, DEFAULT_HOST},
    simulated::SimulatedOracle,
    solver::boundary,
    Interval, MessagePoint, Oracle, Outcome, Solver,
};

/// Recover a secret from an RSA oracle that reads one line per request
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a key pair and store it as JSON
    Keygen {
        #[arg(long, default_value_t = 1024)]
        bits: usize,
        #[arg(long, default_value = "key.json")]
        out: PathBuf,
        /// Seed for reproducible keys
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run the whole attack against a local model of the service
    Simulate {
        #[arg(long, default_value = "key.json")]
        key: PathBuf,
        /// Plaintext the simulated service keeps secret
        #[arg(long)]
        secret: String,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Run the attack against the remote service
    Attack {
        #[arg(long, default_value = DEFAULT_HOST)]
        host: String,
        #[arg(long)]
        port: u16,
        /// File holding the intercepted ciphertext as a decimal number
        #[arg(long, default_value = "secret.enc")]
        secret_file: PathBuf,
        /// Seconds to wait on each connection
        #[arg(long, default_value_t = 5)]
        timeout: u64,
        #[command(flatten)]
        search: SearchArgs,
    },
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Stop after this many halvings and take the interval end as modulus
    #[arg(long)]
    steps: Option<usize>,
    /// Blinding factor
    #[arg(long, default_value_t = blind::DEFAULT_FACTOR)]
    blind: u32,
    /// Byte repeated across the bracket's lower end
    #[arg(long, default_value_t = 90)]
    low: u8,
    /// Byte repeated across the bracket's upper end
    #[arg(long, default_value_t = 255)]
    high: u8,
    /// Bracket width in bytes; defaults to the key size or 64
    #[arg(long)]
    width: Option<usize>,
}

fn find_modulus<O: Oracle>(oracle: &mut O, search: &SearchArgs, width: usize) -> Result<BigUint> {
    let interval = Interval::new(
        MessagePoint::repeated(search.low, width),
        MessagePoint::repeated(search.high, width),
    )
    .context("invalid search bracket")?;

    let mut solver = Solver::new(oracle);
    match solver.run(interval, search.steps) {
        Outcome::Done(done) => {
            let n = boundary(&done).context("collapsed interval has no boundary")?;
            info!(steps = solver.steps(), "found modulus");
            Ok(n)
        }
        Outcome::Halted(halted) => {
            warn!(
                width_bits = halted.width().bits(),
                "interval not collapsed, taking its end as the modulus"
            );
            Ok(halted.end().value())
        }
        Outcome::Failed { interval, error } => Err(error).with_context(|| {
            format!(
                "search failed between {} and {}",
                interval.start().hex(),
                interval.end().hex()
            )
        }),
    }
}

fn recover_secret<O: Oracle>(
    oracle: &mut O,
    target: &BigUint,
    n: &BigUint,
    e: &BigUint,
    factor: u32,
) -> Result<MessagePoint> {
    let k = BigUint::from(factor);
    let observed = blind::blind(oracle, &k, n).context("could not encrypt the blinding factor")?;
    if observed != blind::expected_blind(&k, e, n) {
        warn!("oracle's E(k) differs from k^e mod N; the modulus is probably off");
    }
    blind::recover(oracle, target, n, &k).context("blinding attack failed")
}

fn keygen(bits: usize, out: PathBuf, seed: Option<u64>) -> Result<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    info!(bits, "generating key");
    let key = KeyPair::generate(bits, &mut rng);
    key.save(&out)
        .with_context(|| format!("could not write {}", out.display()))?;
    println!("N: {}", key.n);
    println!("e: {}", key.e);
    Ok(())
}

fn simulate(key_file: PathBuf, secret: String, search: SearchArgs) -> Result<()> {
    let key = KeyPair::load(&key_file)
        .with_context(|| format!("could not read {}", key_file.display()))?;
    let e = key.e.clone();
    let width = search.width.unwrap_or_else(|| key.size());
    if MessagePoint::repeated(search.low, width).value() >= key.n {
        bail!("bracket starts above the modulus, try a smaller --low");
    }
    let mut oracle = SimulatedOracle::new(key);
    let target = oracle.protect(secret.as_bytes());
    println!("cyphertext: {}", target);

    let n = find_modulus(&mut oracle, &search, width)?;
    if n != oracle.key().n {
        bail!("search ended on {} instead of the real modulus", n);
    }
    let recovered = recover_secret(&mut oracle, &target, &n, &e, search.blind)?;
    println!("{}", recovered.text());
    Ok(())
}

fn attack(
    host: String,
    port: u16,
    secret_file: PathBuf,
    timeout: u64,
    search: SearchArgs,
) -> Result<()> {
    let target = blind::read_target(&secret_file)
        .with_context(|| format!("could not read {}", secret_file.display()))?;
    let mut oracle = RemoteOracle::new(host, port).with_timeout(Duration::from_secs(timeout));
    let width = search.width.unwrap_or(64);

    let n = find_modulus(&mut oracle, &search, width)?;
    println!("N: {}", n);
    let e = BigUint::from(PUBLIC_EXPONENT);
    let recovered = recover_secret(&mut oracle, &target, &n, &e, search.blind)?;
    println!("{}", recovered.text());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Keygen { bits, out, seed } => keygen(bits, out, seed),
        Command::Simulate {
            key,
            secret,
            search,
        } => simulate(key, secret, search),
        Command::Attack {
            host,
            port,
            secret_file,
            timeout,
            search,
        } => attack(host, port, secret_file, timeout, search),
    }
}

//! `weighted-sampler --seconds 3 stress --items 100000`

use std::{
    collections::HashMap,
    io::{self, BufRead},
    path::PathBuf,
    time::{Duration, Instant},
};

use clap::{Parser, Subcommand};
use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::info;
use weighted_sampler::{
    configure::load_sampler_config,
    rand::new_rng,
    weights_file::{read_weights, write_weights, WeightsFile},
    Decimal, DecimalBuilder, Exact, IntegerBuilder, SamplerConfig, WeightedSampler,
};

const DEFAULT_STRESS_ITEMS: usize = 1_000_000;
const STRESS_WEIGHT_BOUND: i64 = 1_000_000_000;
const CHECK_CLOCK_EVERY: u64 = 1_000_000;

#[derive(Parser)]
#[command(version, about = "Draw weighted random items and report how often each was drawn")]
struct Cli {
    /// Seconds to keep drawing
    #[arg(long, default_value_t = 3)]
    seconds: u64,
    /// Seed for both the generated population and the sampler
    #[arg(long)]
    seed: Option<u64>,
    /// Sampler config file, overridden by SAMPLER_* env vars
    #[arg(long)]
    config: Option<String>,
    #[arg(long, default_value = "info")]
    log: String,
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand)]
enum Mode {
    /// Type words and their weights; an empty first word runs the stress test
    Interactive,
    /// Random words with random integer weights
    Stress {
        #[arg(long, default_value_t = DEFAULT_STRESS_ITEMS)]
        items: usize,
        /// Write the generated population to a TOML weights file
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Words and weights from a TOML weights file
    File { path: PathBuf },
}

struct Population {
    sampler: WeightedSampler<String, Exact>,
    /// Widest word, for the per item report. `None` reports totals only.
    width: Option<usize>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    weighted_sampler::log::init_log_filter(&cli.log)?;

    let mut config = load_sampler_config(cli.config.as_deref())?;
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    let population = match cli.mode.unwrap_or(Mode::Interactive) {
        Mode::Interactive => interactive(&config)?,
        Mode::Stress { items, save } => stress(items, save, &config)?,
        Mode::File { path } => from_file(path, &config)?,
    };
    run(population, Duration::from_secs(cli.seconds));
    Ok(())
}

fn interactive(config: &SamplerConfig) -> Result<Population> {
    let mut builder = DecimalBuilder::decimal();
    builder.configure(config)?;
    let mut width = 0;

    println!("Hit <Enter> to run stress test or type a word to begin manual input");
    let mut lines = io::stdin().lock().lines();
    loop {
        let word = match lines.next() {
            Some(line) => line?.trim().to_owned(),
            None => String::new(),
        };
        if word.is_empty() {
            break;
        }
        println!("Input weight for the above word:");
        let weight: Decimal = lines
            .next()
            .ok_or_else(|| eyre!("missing weight for `{word}`"))??
            .trim()
            .parse()
            .wrap_err_with(|| format!("weight for `{word}`"))?;
        width = width.max(word.len());
        builder.add(word, weight)?;
        println!("Type next word or hit <Enter> to finish input");
    }

    if builder.is_empty() {
        return stress(DEFAULT_STRESS_ITEMS, None, config);
    }
    Ok(Population {
        sampler: builder.build()?,
        width: Some(width),
    })
}

fn random_word(rng: &mut ChaCha8Rng) -> String {
    let len = rng.gen_range(10..20);
    (0..len)
        .map(|_| char::from(b'A' + rng.gen_range(0..26u8)))
        .collect()
}

fn stress(items: usize, save: Option<PathBuf>, config: &SamplerConfig) -> Result<Population> {
    info!("generating {} random items", items);
    let mut rng = new_rng(config.seed);
    let mut builder = IntegerBuilder::integer();
    builder.configure(config)?;
    let mut file = save.as_ref().map(|_| WeightsFile::default());

    for _ in 0..items {
        let word = random_word(&mut rng);
        let weight = rng.gen_range(1..STRESS_WEIGHT_BOUND);
        if let Some(file) = file.as_mut() {
            file.push(word.clone(), weight);
        }
        builder.add(word, weight)?;
    }

    if let (Some(path), Some(file)) = (save, file) {
        write_weights(&file, &path)?;
        info!("population written to {:?}", path);
    }
    Ok(Population {
        sampler: builder.build()?,
        width: None,
    })
}

fn from_file(path: PathBuf, config: &SamplerConfig) -> Result<Population> {
    let file = read_weights(&path)?;
    let width = file.items.iter().map(|w| w.item.len()).max().unwrap_or_default();
    let mut builder = file.into_builder()?;
    builder.configure(config)?;
    Ok(Population {
        sampler: builder.build()?,
        width: Some(width),
    })
}

fn run(population: Population, budget: Duration) {
    let Population { mut sampler, width } = population;
    println!(
        "Gathering stats, please wait for {} seconds...",
        budget.as_secs()
    );

    let mut counts: HashMap<String, u64> = HashMap::new();
    let mut total: u64 = 0;
    let start = Instant::now();
    loop {
        let item = sampler.next_item();
        if width.is_some() {
            match counts.get_mut(item) {
                Some(count) => *count += 1,
                None => {
                    counts.insert(item.clone(), 1);
                }
            }
        }
        total += 1;
        if total % CHECK_CLOCK_EVERY == 0 && start.elapsed() > budget {
            break;
        }
    }
    let elapsed = start.elapsed();

    println!(
        "# of samples: {} ({:.0} ns/sample)",
        total,
        elapsed.as_nanos() as f64 / total as f64
    );
    match width {
        None => {
            println!("# of items: {}", sampler.item_count());
            println!(
                "# of buckets (distinct weights): {}",
                sampler.bucket_count()
            );
        }
        Some(width) => {
            let mut rows: Vec<_> = counts.into_iter().collect();
            rows.sort();
            for (word, count) in rows {
                println!(
                    "# of '{word:>width$}': {count:>10} ({:.2}%)",
                    count as f64 / total as f64 * 100.0
                );
            }
        }
    }
}

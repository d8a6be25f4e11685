use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{info, LevelFilter};
use serde::Serialize;

use hexfill::{
    generate_levels, Cell, FallbackTier, GeneratedLevel, GenerationFailure, GenerationProfile, Language,
};

/// Generate hex word-search levels from a word list
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Word list, one word per line (anything after `,` or `;` is ignored)
    word_list: PathBuf,

    /// JSON generation profile; missing fields take their defaults
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Alphabet of the word list (EN or RU), overriding the profile
    #[arg(short, long)]
    language: Option<Language>,

    /// Number of levels to generate
    #[arg(short = 'n', long, default_value_t = 1)]
    levels: usize,

    /// Base seed; level i uses seed + i
    #[arg(short, long, default_value_t = 1)]
    seed: u64,

    /// How many levels may share a word (0 = unlimited)
    #[arg(short = 'r', long, default_value_t = 0)]
    max_word_reuse: usize,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

/// One level of the JSON catalog written to stdout.
#[derive(Serialize)]
struct LevelRecord {
    level: usize,
    seed: u64,
    tier: FallbackTier,
    words: Vec<String>,
    cells: Vec<Cell>,
}

fn init_logger(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

    let mut builder = env_logger::Builder::new();
    builder.filter(None, level).format_timestamp(None).format_target(false);

    // RUST_LOG wins over the default filter.
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }

    builder.init();
}

fn load_word_list(path: &Path) -> Result<Vec<String>, Box<dyn Error>> {
    let words = fs::read_to_string(path)?
        .lines()
        .filter_map(|line| line.split([',', ';']).next())
        .map(str::trim)
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect();
    Ok(words)
}

fn load_profile(path: Option<&Path>) -> Result<GenerationProfile, Box<dyn Error>> {
    match path {
        Some(path) => Ok(serde_json::from_str(&fs::read_to_string(path)?)?),
        None => Ok(GenerationProfile::default()),
    }
}

/// Number the generated levels from 1, leaving gaps where a level failed. Failures are already
/// logged by the generator.
fn build_records(results: Vec<Result<GeneratedLevel, GenerationFailure>>) -> Vec<LevelRecord> {
    let mut records = Vec::new();
    for (index, result) in results.into_iter().enumerate() {
        let Ok(level) = result else {
            continue;
        };

        info!(
            "level {}: {} ({} tier, {} cells)",
            index + 1,
            level.target_words.join(" "),
            level.tier,
            level.cells.len(),
        );
        records.push(LevelRecord {
            level: index + 1,
            seed: level.seed,
            tier: level.tier,
            words: level.target_words,
            cells: level.cells,
        });
    }
    records
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match try_main(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn try_main(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let mut profile = load_profile(cli.profile.as_deref())?;
    if let Some(language) = cli.language {
        profile.language = language;
    }

    let words = load_word_list(&cli.word_list)?;
    info!("loaded {} words from {}", words.len(), cli.word_list.display());

    let results = generate_levels(&words, &profile, cli.seed, cli.levels, cli.max_word_reuse);

    let records = build_records(results);

    println!("{}", serde_json::to_string_pretty(&records)?);

    if records.len() < cli.levels {
        eprintln!("Generated {}/{} levels", records.len(), cli.levels);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexfill::GenerationStatistics;

    fn level(seed: u64, word: &str) -> GeneratedLevel {
        GeneratedLevel {
            seed,
            target_words: vec![word.to_string()],
            cells: Vec::new(),
            tier: FallbackTier::Strict,
            statistics: GenerationStatistics::default(),
        }
    }

    #[test]
    fn test_build_records_skips_failed_levels() {
        let failure = GenerationFailure {
            reason: "no words".to_string(),
            statistics: GenerationStatistics::default(),
        };
        let records = build_records(vec![Ok(level(1, "CAT")), Err(failure), Ok(level(3, "DOG"))]);

        let numbered: Vec<(usize, u64)> = records.iter().map(|record| (record.level, record.seed)).collect();
        assert_eq!(numbered, vec![(1, 1), (3, 3)]);
        assert_eq!(records[1].words, vec!["DOG".to_string()]);
    }
}

//! Afrique Sports commentary CLI
//!
//! Harvests French live match commentary, cleans it and builds a
//! fine-tuning dataset.

use afcon::data::collector::{self, Collector, FILTERED_FILE, RAW_FILE};
use afcon::data::discovery::{self, MatchFinder, COMMENTED_MATCHES_FILE};
use afcon::data::review::{self, ReviewSession};
use afcon::data::scrapers::{loader_from_config, page_delay};
use afcon::data::synthetic::{self, SyntheticGenerator};
use afcon::data::{dataset, validate, CommentaryScraper, PromptStyle, TranscriptParser};
use afcon::stop::StopFlag;
use afcon::{commentary, data, Config, Result, Source};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "afcon")]
#[command(about = "French football commentary harvesting and dataset building", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "afcon.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new project with default config
    Init,
    /// Scrape the commentary of one match page
    Scrape {
        /// Match page URL
        url: String,
        /// Output JSON file (defaults to the raw file in the data dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Batch-collect matches from URL lists, then filter and report
    Collect {
        /// File with one L'Équipe match URL per line
        #[arg(long)]
        lequipe_urls: Option<PathBuf>,
        /// File with one RMC Sport match URL per line
        #[arg(long)]
        rmc_urls: Option<PathBuf>,
        /// Use the strict quality thresholds
        #[arg(long)]
        strict: bool,
        /// Discovery output whose fully commented matches are added to the L'Équipe list
        #[arg(long)]
        commented_matches: Option<PathBuf>,
        /// Continue from the last checkpoint instead of starting over
        #[arg(long)]
        resume: bool,
    },
    /// Find L'Équipe matches with full live commentary
    Discover {
        /// Where to write the match checks (defaults to the data dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also write the match URLs, one per line
        #[arg(long)]
        url_list: Option<PathBuf>,
    },
    /// Generate template-based training examples
    Generate {
        /// Output JSONL file (defaults to the data dir)
        output: Option<PathBuf>,
        #[arg(short = 'n', long, default_value_t = synthetic::DEFAULT_COUNT)]
        count: usize,
        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Approve, reject or edit entries one by one
    Review {
        /// Entries to review; without it the saved review is resumed
        input: Option<PathBuf>,
        /// Export approved entries to this JSONL file and exit
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Deduplicate and quality-filter a JSON file of entries
    Filter {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        strict: bool,
    },
    /// Export entries as chat-format JSONL training data
    Export {
        input: PathBuf,
        output: PathBuf,
        /// Prompt style (compact or detailed)
        #[arg(long)]
        style: Option<PromptStyle>,
    },
    /// Check a JSONL training file
    Validate { file: PathBuf },
    /// Print and save dataset quality metrics
    Report {
        input: PathBuf,
        /// Where to write the metrics JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Parse a pasted commentary text dump
    Parse {
        file: PathBuf,
        /// Match label, e.g. "Maroc vs Comores"
        #[arg(long = "match")]
        match_label: Option<String>,
        /// Page the text was copied from, used to tag the source
        #[arg(long)]
        url: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let config = match Config::load_or_default(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Init => commands::init(&cli.config),
        Commands::Scrape { url, output } => commands::scrape(&config, &url, output),
        Commands::Collect {
            lequipe_urls,
            rmc_urls,
            commented_matches,
            strict,
            resume,
        } => commands::collect(config, lequipe_urls, rmc_urls, commented_matches, strict, resume),
        Commands::Discover { output, url_list } => commands::discover(&config, output, url_list),
        Commands::Generate { output, count, seed } => commands::generate(&config, output, count, seed),
        Commands::Review { input, export } => commands::review(&config, input, export),
        Commands::Filter {
            input,
            output,
            strict,
        } => commands::filter(&config, &input, &output, strict),
        Commands::Export {
            input,
            output,
            style,
        } => commands::export(&config, &input, &output, style),
        Commands::Validate { file } => commands::validate(&file),
        Commands::Report { input, output } => commands::report(&config, &input, output),
        Commands::Parse {
            file,
            match_label,
            url,
            output,
        } => commands::parse(&config, &file, match_label, url, output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all(&config.data.data_dir)?;
        println!("Created {}/ directory", config.data.data_dir);

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'afcon collect --lequipe-urls urls.txt' to harvest commentary");
        println!("  3. Run 'afcon export {}/{} train.jsonl' to build the dataset", config.data.data_dir, FILTERED_FILE);
        println!("  4. Run 'afcon validate train.jsonl' before uploading");
        println!("\nOptional:");
        println!("  'afcon discover' finds L'Équipe matches with full live commentary");
        println!("  'afcon review <file>' approves entries by hand before export");

        Ok(())
    }

    pub fn scrape(config: &Config, url: &str, output: Option<PathBuf>) -> Result<()> {
        let scraper = CommentaryScraper::from_config(config)?;
        let entries = scraper.try_scrape_match(url)?;
        println!("Extracted {} entries from {}", entries.len(), Source::from_url(url));

        for entry in entries.iter().take(5) {
            println!(
                "  [{}] {:<12} {}",
                entry.time,
                entry.event_type.as_str(),
                commentary::dedup::preview(&entry.text, 80)
            );
        }

        let path = output.unwrap_or_else(|| config.data.path(RAW_FILE));
        data::save_entries(&path, &entries)?;
        println!("Saved to {}", path.display());
        Ok(())
    }

    pub fn collect(
        mut config: Config,
        lequipe_urls: Option<PathBuf>,
        rmc_urls: Option<PathBuf>,
        commented_matches: Option<PathBuf>,
        strict: bool,
        resume: bool,
    ) -> Result<()> {
        let read = |path: Option<PathBuf>| match path {
            Some(p) => collector::read_url_list(&p),
            None => Ok(Vec::new()),
        };
        let mut lequipe = read(lequipe_urls)?;
        let rmc = read(rmc_urls)?;

        if let Some(path) = commented_matches {
            for url in discovery::load_commented_urls(&path)? {
                if !lequipe.contains(&url) {
                    lequipe.push(url);
                }
            }
        }

        if lequipe.is_empty() && rmc.is_empty() {
            println!("No match URLs given. Use --lequipe-urls, --rmc-urls or --commented-matches.");
            return Ok(());
        }

        config.filter.strict |= strict;
        let stop = StopFlag::on_ctrl_c()?;
        let collector = Collector::new(CommentaryScraper::from_config(&config)?, &config).with_stop(stop.clone());
        let metrics = collector.run(&lequipe, &rmc, resume)?;

        if stop.is_stopped() {
            println!("\nStopped by user; rerun with --resume to continue");
        }
        println!("\nCollection complete: {} usable entries", metrics.total_examples);
        println!("  Filtered data: {}", config.data.path(FILTERED_FILE).display());
        Ok(())
    }

    pub fn discover(config: &Config, output: Option<PathBuf>, url_list: Option<PathBuf>) -> Result<()> {
        let stop = StopFlag::on_ctrl_c()?;
        let loader = loader_from_config(config)?;
        let finder = MatchFinder::new(loader.as_ref(), page_delay(&config.scraper)).with_stop(stop);
        let matches = finder.find_commented_matches();

        let path = output.unwrap_or_else(|| config.data.path(COMMENTED_MATCHES_FILE));
        discovery::save_matches(&path, &matches)?;
        println!("Found {} fully commented matches", matches.len());
        for m in &matches {
            println!("  {} ({} events)", m.title, m.total_events);
        }
        println!("Saved to {}", path.display());

        if let Some(list) = url_list {
            let urls: Vec<_> = matches.iter().map(|m| m.url.as_str()).collect();
            std::fs::write(&list, urls.join("\n") + "\n")?;
            println!("URL list saved to {}", list.display());
        }
        Ok(())
    }

    pub fn generate(config: &Config, output: Option<PathBuf>, count: usize, seed: Option<u64>) -> Result<()> {
        let examples = SyntheticGenerator::new(seed).generate(count);
        let path = output.unwrap_or_else(|| config.data.path(synthetic::DEFAULT_OUTPUT_FILE));
        let written = dataset::write_jsonl(&path, &examples)?;
        println!("Generated {} examples to {}", written, path.display());

        println!("\nEvent type distribution:");
        for (event_type, _) in synthetic::EVENT_DISTRIBUTION {
            let count = examples
                .iter()
                .filter(|e| synthetic::prompt_event_type(e) == Some(*event_type))
                .count();
            let share = if written == 0 { 0.0 } else { count as f64 / written as f64 * 100.0 };
            println!("  {:<14} {:>5} ({:.1}%)", event_type.as_str(), count, share);
        }
        Ok(())
    }

    pub fn review(config: &Config, input: Option<PathBuf>, export: Option<PathBuf>) -> Result<()> {
        let dir = PathBuf::from(&config.data.data_dir);
        let mut session = ReviewSession::open(&dir)?;

        if let Some(out) = export {
            let written = session.export_approved(&out, config.export.style, &config.export.system_prompt)?;
            println!("Exported {} approved examples to {}", written, out.display());
            return Ok(());
        }

        if let Some(input) = input {
            session.load_entries(data::load_entries(&input)?)?;
        }
        if session.current().is_none() {
            println!("Nothing to review. Pass a file of entries to start.");
            return Ok(());
        }

        let stdin = std::io::stdin();
        review::run_interactive(&mut session, &mut stdin.lock(), &mut std::io::stdout())
    }

    pub fn filter(config: &Config, input: &Path, output: &Path, strict: bool) -> Result<()> {
        let mut filter_config = config.filter.clone();
        filter_config.strict |= strict;
        let filter = commentary::QualityFilter::from_config(&filter_config);

        let entries = data::load_entries(input)?;
        let total = entries.len();
        let kept = collector::clean(entries, &filter);
        data::save_entries(output, &kept)?;

        println!("Kept {} of {} entries", kept.len(), total);
        println!("Saved to {}", output.display());
        Ok(())
    }

    pub fn export(config: &Config, input: &Path, output: &Path, style: Option<PromptStyle>) -> Result<()> {
        let entries = data::load_entries(input)?;
        let style = style.unwrap_or(config.export.style);
        let examples = dataset::export(&entries, style, &config.export.system_prompt);
        let written = dataset::write_jsonl(output, &examples)?;

        println!("Exported {} training examples to {}", written, output.display());
        if let Some(first) = examples.first() {
            println!("\nSample:");
            println!("  User: {}", first.user_prompt);
            println!("  Assistant: {}", commentary::dedup::preview(&first.assistant_response, 100));
        }
        Ok(())
    }

    pub fn validate(file: &Path) -> Result<()> {
        println!("Validating {}", file.display());
        let report = validate::validate_file(file)?;
        report.print();

        if !report.is_valid() {
            eprintln!("\nValidation failed");
            std::process::exit(1);
        }
        println!("\nValidation passed");
        Ok(())
    }

    pub fn report(config: &Config, input: &Path, output: Option<PathBuf>) -> Result<()> {
        let entries = data::load_entries(input)?;
        let path = output.unwrap_or_else(|| config.data.path(collector::STATS_FILE));
        let metrics = collector::write_report(&entries, &path)?;

        println!("Dataset Report");
        println!("───────────────────────────────");
        println!("  Examples:    {}", metrics.total_examples);
        println!("  Avg length:  {:.0} chars, {:.1} words", metrics.avg_length_chars, metrics.avg_length_words);
        println!("  Vocabulary:  {} ({:.1}% diversity)", metrics.vocabulary_size, metrics.vocabulary_diversity * 100.0);
        for (source, count) in &metrics.sources {
            println!("  {:<12} {}", source, count);
        }
        for (event_type, count) in &metrics.event_types {
            println!("  {:<12} {}", event_type, count);
        }
        Ok(())
    }

    pub fn parse(
        config: &Config,
        file: &Path,
        match_label: Option<String>,
        url: Option<String>,
        output: Option<PathBuf>,
    ) -> Result<()> {
        let source = url.as_deref().map(Source::from_url).unwrap_or(Source::Unknown);
        let parser = TranscriptParser::new(source, match_label.as_deref());

        let mut entries = parser.parse_file(file)?;
        if let Some(url) = &url {
            entries = entries.into_iter().map(|e| e.from_url(url)).collect();
        }

        let path = output.unwrap_or_else(|| config.data.path(RAW_FILE));
        data::save_entries(&path, &entries)?;
        println!("Parsed {} entries, saved to {}", entries.len(), path.display());
        Ok(())
    }
}

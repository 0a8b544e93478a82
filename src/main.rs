mod logging;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, error, info};

use levantine_translate::config::AppConfig;
use levantine_translate::errors::{ExitCode, InputError};
use levantine_translate::pipeline::TranslationService;
use levantine_translate::review::ReviewLog;
use levantine_translate::rules::{self, JsonRuleStore, ReplacementRule, RuleStore};
use levantine_translate::substitute;
use levantine_translate::translator::GeminiTranslator;
use levantine_translate::transliterate::ChatAlphabet;
use logging::Verbosity;

/// Translate English to Levantine Arabic and curate the correction dictionary.
#[derive(Parser)]
#[command(name = "levantine", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: ~/.config/levantine/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the rule store and review log
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose (debug) console output
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all console output except errors
    #[arg(long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Custom log file path (default: ~/.cache/levantine/logs/levantine.log)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Translate English text and apply the Levantine corrections
    Translate {
        text: String,
        /// Domain hint passed to the translator
        #[arg(short, long, default_value = "")]
        context: String,
        /// Do not queue the result for review
        #[arg(long)]
        no_review: bool,
        #[arg(long)]
        json: bool,
    },

    /// Apply the correction dictionary to existing Arabic text
    Correct {
        #[arg(long)]
        arabic: String,
        /// Derived from the Arabic when omitted
        #[arg(long)]
        transliteration: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Print the chat-alphabet transliteration of Arabic text
    Transliterate { text: String },

    /// Manage replacement rules
    #[command(subcommand)]
    Rules(RulesCommand),

    /// Review queued translations
    #[command(subcommand)]
    Review(ReviewCommand),
}

#[derive(Subcommand)]
enum RulesCommand {
    /// List all rules
    List {
        #[arg(long)]
        json: bool,
    },
    /// Add or overwrite a rule
    Add(AddRule),
    /// Delete a rule by its original Arabic
    Delete { original_arabic: String },
    /// Show usage statistics
    Stats,
    /// Install the starter vocabulary
    Seed,
}

#[derive(Args)]
struct AddRule {
    original_arabic: String,
    original_transliteration: String,
    replacement_arabic: String,
    replacement_transliteration: String,
    #[arg(long, default_value = "")]
    context: String,
    #[arg(long, default_value = "")]
    reason: String,
}

#[derive(Subcommand)]
enum ReviewCommand {
    /// List pending translations, newest first
    Pending {
        #[arg(long, default_value_t = 50)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Approve a translation and add it to the training corpus
    Approve(Verdict),
    /// Decline a translation
    Decline(Verdict),
    /// Add a corrected translation straight to the training corpus
    Correct {
        english: String,
        arabic: String,
        transliteration: String,
        /// Domain hint for the pair
        #[arg(long, default_value = "")]
        context: String,
        /// Why the correction was made
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Show review and corpus counts
    Stats,
}

#[derive(Args)]
struct Verdict {
    id: u64,
    #[arg(long, default_value = "admin")]
    reviewer: String,
    #[arg(long, default_value = "")]
    notes: String,
}

fn main() {
    let cli = Cli::parse();

    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);

    // _guard must live until program exit to flush the log file
    let _guard = logging::init(verbosity, cli.log_file.as_ref());

    log_system_info();

    if let Err(err) = run_app(cli) {
        let code = ExitCode::from_error(&err);

        // Full chain to the log file for post-mortem
        error!("Fatal error (exit code {code}): {err:#}");

        eprintln!("Error: {err}");
        std::process::exit(code);
    }
}

fn run_app(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load(),
    };
    if let Some(dir) = cli.data_dir {
        config.data.data_dir = Some(dir);
    }
    let data_dir = config.data_dir();
    debug!(data_dir = %data_dir.display(), "Resolved data directory");

    match cli.command {
        Command::Translate {
            text,
            context,
            no_review,
            json,
        } => {
            let translator = GeminiTranslator::from_env(&config.translator)?;
            let store = open_rules(&data_dir);
            let alphabet = load_alphabet(&config)?;
            let review = (!no_review).then(|| open_review(&data_dir));

            let mut service = TranslationService::new(&translator, &store, &alphabet);
            if let Some(review) = &review {
                service = service.with_review(review);
            }
            let outcome = service.translate(&text, &context)?;

            if json {
                print_json(&outcome)?;
            } else {
                println!("{}", outcome.corrected.arabic);
                println!("{}", outcome.corrected.transliteration);
                print_fired(&outcome.corrected.fired());
                if let Some(id) = outcome.review_id {
                    println!("Queued for review as #{id}");
                }
            }
        }

        Command::Correct {
            arabic,
            transliteration,
            json,
        } => {
            if arabic.trim().is_empty() {
                return Err(InputError::Empty { field: "arabic" }.into());
            }
            let transliteration = match transliteration {
                Some(t) => t,
                None => load_alphabet(&config)?.transliterate(&arabic),
            };
            let store = open_rules(&data_dir);
            let result = substitute::correct(&store, &arabic, &transliteration);

            if json {
                print_json(&result)?;
            } else {
                println!("{}", result.arabic);
                println!("{}", result.transliteration);
                print_fired(&result.fired());
            }
        }

        Command::Transliterate { text } => {
            println!("{}", load_alphabet(&config)?.transliterate(&text));
        }

        Command::Rules(cmd) => run_rules(cmd, &open_rules(&data_dir))?,

        Command::Review(cmd) => run_review(cmd, &open_review(&data_dir))?,
    }

    Ok(())
}

fn run_rules(cmd: RulesCommand, store: &JsonRuleStore) -> Result<()> {
    match cmd {
        RulesCommand::List { json } => {
            let rules = store
                .list_rules()
                .with_context(|| format!("Reading rules from {}", store.path().display()))?;
            if json {
                print_json(&rules)?;
            } else if rules.is_empty() {
                println!("No replacement rules.");
            } else {
                for r in &rules {
                    println!(
                        "{} ({}) → {} ({})  [used {}x]",
                        r.original_arabic,
                        r.original_transliteration,
                        r.replacement_arabic,
                        r.replacement_transliteration,
                        r.usage_count
                    );
                }
            }
        }
        RulesCommand::Add(add) => {
            let rule = ReplacementRule::new(
                add.original_arabic,
                add.original_transliteration,
                add.replacement_arabic,
                add.replacement_transliteration,
            )
            .with_context(add.context)
            .with_reason(add.reason);
            let description = rule.describe();
            store
                .add_rule(rule)
                .with_context(|| format!("Adding rule {description}"))?;
            println!("Added {description}");
        }
        RulesCommand::Delete { original_arabic } => {
            let removed = store
                .delete_rule(&original_arabic)
                .with_context(|| format!("Deleting rule for {original_arabic}"))?;
            println!("Deleted {}", removed.describe());
        }
        RulesCommand::Stats => {
            let stats = store.stats()?;
            println!("Rules: {}", stats.total_rules);
            println!("Total usage: {}", stats.total_usage);
            match stats.most_used {
                Some((key, count)) => println!("Most used: {key} ({count}x)"),
                None => println!("Most used: -"),
            }
        }
        RulesCommand::Seed => {
            let existing = store.list_rules()?;
            let mut added = 0;
            for rule in rules::seed_rules() {
                if existing
                    .iter()
                    .all(|r| r.original_arabic != rule.original_arabic)
                {
                    store.add_rule(rule)?;
                    added += 1;
                }
            }
            info!(added, "Seeded starter vocabulary");
            println!("Seeded {added} rule(s)");
        }
    }
    Ok(())
}

fn run_review(cmd: ReviewCommand, log: &ReviewLog) -> Result<()> {
    match cmd {
        ReviewCommand::Pending { limit, json } => {
            let pending = log.pending(limit)?;
            if json {
                print_json(&pending)?;
            } else if pending.is_empty() {
                println!("Nothing to review.");
            } else {
                for r in &pending {
                    println!("#{}  {}  [{}]", r.id, r.english, r.created_at.format("%Y-%m-%d %H:%M"));
                    println!("    translator: {} / {}", r.raw_arabic, r.raw_transliteration);
                    println!("    corrected:  {} / {}", r.final_arabic, r.final_transliteration);
                    for fired in &r.replacements {
                        println!("    - {fired}");
                    }
                }
            }
        }
        ReviewCommand::Approve(v) => {
            log.approve(v.id, &v.reviewer, &v.notes)
                .with_context(|| format!("Approving translation #{}", v.id))?;
            println!("Approved #{}", v.id);
        }
        ReviewCommand::Decline(v) => {
            log.decline(v.id, &v.reviewer, &v.notes)
                .with_context(|| format!("Declining translation #{}", v.id))?;
            println!("Declined #{}", v.id);
        }
        ReviewCommand::Correct {
            english,
            arabic,
            transliteration,
            context,
            reason,
        } => {
            log.add_correction(&english, &arabic, &transliteration, &context, &reason)?;
            println!("Correction added to the training corpus");
        }
        ReviewCommand::Stats => {
            let stats = log.stats()?;
            println!("Pending: {}", stats.pending);
            println!("Approved: {}", stats.approved);
            println!("Declined: {}", stats.declined);
            println!("Corpus entries: {}", stats.corpus_size);
        }
    }
    Ok(())
}

fn open_rules(data_dir: &Path) -> JsonRuleStore {
    JsonRuleStore::open(data_dir.join(JsonRuleStore::FILE_NAME))
}

fn open_review(data_dir: &Path) -> ReviewLog {
    ReviewLog::open(data_dir.join(ReviewLog::FILE_NAME))
}

fn load_alphabet(config: &AppConfig) -> Result<ChatAlphabet> {
    match &config.alphabet.table_file {
        Some(path) => {
            let alphabet = ChatAlphabet::from_json(path)?;
            debug!(path = %path.display(), "Loaded alphabet table");
            Ok(alphabet)
        }
        None => Ok(ChatAlphabet::levantine()),
    }
}

fn print_fired(fired: &[String]) {
    if fired.is_empty() {
        return;
    }
    println!("Replacements:");
    for entry in fired {
        println!("  {entry}");
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Log system info at startup for diagnostics.
fn log_system_info() {
    debug!(
        version = env!("CARGO_PKG_VERSION"),
        os = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        "System info"
    );
}

//! Soul CLI - ask the soul, watch it think, and teach it.

use anyhow::{bail, Context};
use clap::Parser;
use futures::StreamExt;
use soul_core::{Activation, ConfigPatch, Soul, SoulConfig, SoulRegistry};
use soul_registry::{parse_scope, Habit, Learning, NewHabit};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "soul")]
#[command(about = "Soul - three inner faculties, one answer, and a trainer when unsure")]
struct Cli {
    /// Configuration file (TOML); defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Registry database directory
    #[arg(long, global = true, default_value = "./soul.db")]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Ask a question and wait for the answer
    Ask {
        message: String,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Ask a question and print events as they arrive
    Stream { message: String },
    /// Print the effective configuration, optionally patched
    Config {
        #[arg(long)]
        manas: Option<f64>,
        #[arg(long)]
        buddhi: Option<f64>,
        #[arg(long)]
        sanskaras: Option<f64>,
        #[arg(long)]
        temperature: Option<f32>,
        #[arg(long)]
        max_tokens: Option<u32>,
        #[arg(long)]
        model: Option<String>,
    },
    /// List questions waiting for the trainer
    Pending,
    /// List active learnings
    Learnings,
    /// Answer a pending question, or teach something new without an id
    Teach {
        /// Pending question to answer
        id: Option<u64>,
        #[arg(long)]
        guidance: String,
        #[arg(long, default_value = "")]
        note: String,
        /// Retrieval weight of this learning
        #[arg(long, default_value_t = 0.5)]
        boost: f64,
        /// `all` or a comma-separated faculty list
        #[arg(long, default_value = "all")]
        scope: String,
        /// What the learning is about; required without an id
        #[arg(long, required_unless_present = "id")]
        trigger: Option<String>,
        /// Comma-separated keywords; required without an id
        #[arg(long, required_unless_present = "id")]
        keywords: Option<String>,
        /// Situation the learning came from
        #[arg(long, default_value = "")]
        context: String,
    },
    /// Retire a learning so it is no longer retrieved
    Supersede { id: u64 },
    /// List habits
    Habits {
        #[arg(long)]
        category: Option<String>,
        /// Minimum effective weight
        #[arg(long, default_value_t = 0.0)]
        min_weight: f64,
    },
    /// Add a habit
    AddHabit {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "general")]
        category: String,
        /// Comma-separated keywords
        #[arg(long)]
        keywords: String,
        #[arg(long, default_value_t = 1.0)]
        weight: f64,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        valence: f64,
    },
    /// Record one more repetition of a habit
    Reinforce { id: u64 },
    /// Seed the default habits into an empty registry
    Seed {
        /// Seed even if habits exist
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Ask { message, json } => {
            let soul = Soul::open(config, &cli.db)?;
            let result = soul.ask(&message).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else if let Some(escalation) = &result.trainer_needed {
                println!("{}", result.response());
                match escalation.record_id {
                    Some(id) => println!("(asked trainer #{id}: {})", escalation.trigger_summary),
                    None => println!("(could not record question: {})", escalation.trigger_summary),
                }
            } else {
                println!("{}", result.response());
            }
            soul.registry().flush()?;
        }
        Commands::Stream { message } => {
            let soul = Soul::open(config, &cli.db)?;
            let mut events = soul.stream(message);
            while let Some(event) = events.next().await {
                print!("{}", event.to_sse());
            }
            soul.registry().flush()?;
        }
        Commands::Config {
            manas,
            buddhi,
            sanskaras,
            temperature,
            max_tokens,
            model,
        } => {
            let patch = ConfigPatch {
                weight_manas: manas,
                weight_buddhi: buddhi,
                weight_sanskaras: sanskaras,
                temperature,
                max_tokens,
                model,
                ..ConfigPatch::default()
            };
            let effective = config.apply(&patch)?;
            print!("{}", effective.to_toml()?);
        }
        command => {
            let registry = open_registry(&cli.db)?;
            let output = manage(&registry, command)?;
            registry.flush()?;
            print!("{output}");
        }
    }

    Ok(())
}

/// Runs a trainer or habit command against the registry and returns what
/// to print.
fn manage(registry: &SoulRegistry, command: Commands) -> anyhow::Result<String> {
    let mut out = String::new();
    match command {
        Commands::Pending => {
            let pending = registry.pending()?;
            if pending.is_empty() {
                out.push_str("No pending questions.\n");
            }
            for learning in &pending {
                writeln!(
                    out,
                    "#{} [{}] {}\n    context: {}\n    keywords: {}",
                    learning.id,
                    learning.created_at.format("%Y-%m-%d %H:%M"),
                    learning.trigger_summary,
                    learning.question_context,
                    learning.keywords
                )?;
            }
        }
        Commands::Learnings => {
            let active = registry.active()?;
            if active.is_empty() {
                out.push_str("No active learnings yet.\n");
            }
            for learning in &active {
                out.push_str(&describe_learning(learning));
            }
        }
        Commands::Teach {
            id,
            guidance,
            note,
            boost,
            scope,
            trigger,
            keywords,
            context,
        } => {
            if guidance.trim().is_empty() {
                bail!("guidance must not be empty");
            }
            let activation = Activation {
                guidance,
                application_note: note,
                scope: parse_scope(&scope),
                confidence_boost: boost,
            };
            let learning = match id {
                Some(id) => registry
                    .activate(id, activation)
                    .with_context(|| format!("cannot activate learning #{id}"))?,
                None => {
                    let (Some(trigger), Some(keywords)) = (trigger, keywords) else {
                        bail!("teaching without an id needs --trigger and --keywords");
                    };
                    registry.create_active(&context, &trigger, &keywords, activation)?
                }
            };
            writeln!(out, "Learning #{} is active ({})", learning.id, learning.scope)?;
        }
        Commands::Supersede { id } => {
            let learning = registry
                .supersede(id)
                .with_context(|| format!("cannot supersede learning #{id}"))?;
            writeln!(out, "Learning #{} superseded", learning.id)?;
        }
        Commands::Habits {
            category,
            min_weight,
        } => {
            let habits = registry.habits(category.as_deref(), min_weight)?;
            if habits.is_empty() {
                out.push_str("No habits.\n");
            }
            for habit in &habits {
                out.push_str(&describe_habit(habit));
            }
        }
        Commands::AddHabit {
            name,
            description,
            category,
            keywords,
            weight,
            valence,
        } => {
            let habit = registry.create_habit(NewHabit {
                name,
                description,
                category,
                keywords,
                base_weight: weight,
                valence,
                ..NewHabit::default()
            })?;
            writeln!(out, "Habit #{} {} created", habit.id, habit.name)?;
        }
        Commands::Reinforce { id } => {
            let habit = registry
                .reinforce(id)
                .with_context(|| format!("cannot reinforce habit #{id}"))?;
            writeln!(
                out,
                "Habit #{} {} now at {} repetitions (weight {:.2})",
                habit.id,
                habit.name,
                habit.repetition_count,
                habit.effective_weight()
            )?;
        }
        Commands::Seed { force } => {
            let created = registry.seed_if_empty(force)?;
            writeln!(out, "Seeded {created} habits ({} total)", registry.habit_count())?;
        }
        Commands::Ask { .. } | Commands::Stream { .. } | Commands::Config { .. } => {
            bail!("not a registry command")
        }
    }
    Ok(out)
}

fn describe_learning(learning: &Learning) -> String {
    let mut line = format!(
        "#{} [{}] {}\n    guidance: {}\n",
        learning.id, learning.scope, learning.trigger_summary, learning.guidance
    );
    if !learning.application_note.is_empty() {
        line.push_str(&format!("    note: {}\n", learning.application_note));
    }
    line.push_str(&format!(
        "    keywords: {}  boost: {:.2}  applied: {}\n",
        learning.keywords, learning.confidence_boost, learning.times_applied
    ));
    line
}

fn describe_habit(habit: &Habit) -> String {
    format!(
        "#{} {} [{}] weight {:.2} x{}\n    {}\n    keywords: {}\n",
        habit.id,
        habit.name,
        habit.category,
        habit.effective_weight(),
        habit.repetition_count,
        habit.description,
        habit.keywords
    )
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SoulConfig> {
    match path {
        Some(path) => Ok(SoulConfig::load(path)?),
        None => {
            info!("no configuration file given, using defaults");
            Ok(SoulConfig::default().with_env_api_key())
        }
    }
}

fn open_registry(db: &Path) -> anyhow::Result<SoulRegistry> {
    SoulRegistry::open(db).with_context(|| format!("cannot open registry at {}", db.display()))
}

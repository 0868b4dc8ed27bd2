//! todo-digest CLI - todo service with LLM digests
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments and handling top-level errors.

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use todo_digest::server::{self, AppState};
use todo_digest::todo::parse_date;
use todo_digest::{
    logging, Config, Delivery, GeminiConfig, GeminiGenerator, MemoryStore, NewTodo, Priority,
    SlackNotifier, Storage, Summarizer, SummaryRequest, SummaryService, Todo, TodoFilter,
    TodoPatch, TodoStore,
};

#[derive(Parser)]
#[command(name = "todo-digest")]
#[command(author, version, about = "Todo service with LLM digests delivered to Slack", long_about = None)]
struct Cli {
    /// Path to the config file (default: todo-digest.toml in cwd or ~/.config/todo-digest)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to listen on (overrides config and PORT)
        #[arg(long)]
        listen: Option<SocketAddr>,
        /// Keep todos in memory instead of the sled database
        #[arg(long)]
        memory: bool,
    },
    /// Add a todo
    Add {
        title: String,
        #[arg(long, short)]
        description: Option<String>,
        /// low, medium or high
        #[arg(long, short)]
        priority: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },
    /// List todos by priority, then due date
    List,
    /// Change fields of a todo
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, short)]
        description: Option<String>,
        /// pending or completed
        #[arg(long, short)]
        status: Option<String>,
        #[arg(long, short)]
        priority: Option<String>,
        #[arg(long)]
        due: Option<String>,
    },
    /// Delete a todo
    Remove { id: String },
    /// Summarise todos due in a date range
    Summarise {
        /// Inclusive lower bound on the due date
        #[arg(long)]
        start: Option<String>,
        /// Inclusive upper bound on the due date
        #[arg(long)]
        end: Option<String>,
        /// Also post the summary to the Slack webhook
        #[arg(long)]
        notify: bool,
    },
    /// Print shell completions
    Completions { shell: Shell },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging()?;

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Serve { listen, memory } => {
            let store: Arc<dyn TodoStore> = if memory {
                Arc::new(MemoryStore::default())
            } else {
                Arc::new(open_storage(&config)?)
            };
            let summaries = Arc::new(build_summary_service(&config, store.clone())?);
            let listen = listen.unwrap_or(config.server.listen);
            server::run_server(AppState { store, summaries }, listen).await?;
        }
        Commands::Add {
            title,
            description,
            priority,
            due,
        } => {
            let storage = open_storage(&config)?;
            let new = NewTodo::parse(
                &title,
                description.as_deref(),
                None,
                priority.as_deref(),
                due.as_deref(),
            )?;
            let todo = storage.create(new)?;
            println!("Added {}", todo.id.dimmed());
            print_todo(&todo);
        }
        Commands::List => {
            let storage = open_storage(&config)?;
            let todos = storage.find(&TodoFilter::default())?;
            if todos.is_empty() {
                println!("No todos yet.");
            } else {
                println!("Todos ({}):\n", todos.len());
                for todo in &todos {
                    print_todo(todo);
                }
            }
        }
        Commands::Update {
            id,
            title,
            description,
            status,
            priority,
            due,
        } => {
            let storage = open_storage(&config)?;
            let patch = TodoPatch::parse(
                title.as_deref(),
                description.as_deref(),
                status.as_deref(),
                priority.as_deref(),
                due.as_deref(),
            )?;
            match storage.update(&id, patch)? {
                Some(todo) => print_todo(&todo),
                None => anyhow::bail!("Todo not found: {}", id),
            }
        }
        Commands::Remove { id } => {
            let storage = open_storage(&config)?;
            if !storage.delete(&id)? {
                anyhow::bail!("Todo not found: {}", id);
            }
            println!("Deleted {}", id);
        }
        Commands::Summarise { start, end, notify } => {
            let request = SummaryRequest {
                start_date: start.as_deref().map(parse_date).transpose()?,
                end_date: end.as_deref().map(parse_date).transpose()?,
            };
            let store: Arc<dyn TodoStore> = Arc::new(open_storage(&config)?);
            let service = build_summary_service(&config, store)?;
            let delivery = if notify {
                Delivery::Slack
            } else {
                Delivery::None
            };

            let result = service.summarize(request, delivery).await?;
            if let Some(count) = result.todo_count {
                println!("📋 Summary of {} todos\n", count);
            }
            println!("{}", result.summary);
            match (result.slack_sent, result.slack_error) {
                (Some(true), _) => println!("\n{}", "Sent to Slack.".green()),
                (Some(false), Some(err)) => {
                    eprintln!("\n{} {}", "Slack delivery failed:".red(), err)
                }
                _ => {}
            }
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "todo-digest",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

fn open_storage(config: &Config) -> anyhow::Result<Storage> {
    Storage::open(&config.storage.path).with_context(|| {
        format!(
            "failed to open todo store at {}",
            config.storage.path.display()
        )
    })
}

fn build_summary_service(
    config: &Config,
    store: Arc<dyn TodoStore>,
) -> anyhow::Result<SummaryService> {
    let generator = GeminiGenerator::new(GeminiConfig::from_config(config)?)?;
    let notifier = SlackNotifier::new(config.notifier.webhook_url.clone())?;
    if !notifier.is_configured() {
        tracing::warn!("SLACK_WEBHOOK_URL not set; summaries will not be delivered");
    }
    Ok(SummaryService::new(
        store,
        Summarizer::new(Arc::new(generator)),
        Arc::new(notifier),
    ))
}

fn print_todo(todo: &Todo) {
    let glyph = if todo.status.is_completed() {
        "✅"
    } else {
        "⏳"
    };
    let tag = format!("[{}]", todo.priority.as_str().to_uppercase());
    let tag = match todo.priority {
        Priority::High => tag.red().bold(),
        Priority::Medium => tag.yellow(),
        Priority::Low => tag.green(),
        Priority::Unknown(_) => tag.normal(),
    };
    let due = todo
        .due_date
        .map(|d| format!(" (due {})", d.format("%Y-%m-%d")))
        .unwrap_or_default();

    println!("{} {} {}{}", glyph, tag, todo.title.bold(), due);
    if !todo.description.is_empty() {
        println!("   {}", todo.description);
    }
    println!("   {}\n", todo.id.dimmed());
}

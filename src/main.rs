//! Cost Katana CLI entry point

use clap::{Parser, Subcommand};
use katana_core::{SETTINGS_FILE, Settings};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "katana")]
#[command(about = "Track and optimize AI usage costs with Cost Katana", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file
    #[arg(short, long, global = true, default_value = SETTINGS_FILE)]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Update the settings file
    Configure {
        #[arg(long)]
        backend_url: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        user_id: Option<String>,
        /// Track AI-looking edits automatically
        #[arg(long)]
        auto_track: Option<bool>,
        #[arg(long)]
        show_notifications: Option<bool>,
        /// Status refresh interval in seconds
        #[arg(long)]
        poll_interval: Option<u64>,
        /// Model label for automatically tracked edits
        #[arg(long)]
        model: Option<String>,
    },
    /// Request a magic login link and open it
    Login {
        email: String,
        /// Print the link without opening a browser
        #[arg(long)]
        no_open: bool,
    },
    /// Check that the backend is reachable
    Validate,
    /// Record one AI interaction
    Track {
        #[arg(long)]
        prompt: String,
        #[arg(long)]
        response: String,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        request_type: Option<String>,
        #[arg(long)]
        language: Option<String>,
        /// Files that were part of the context (repeatable)
        #[arg(long = "file")]
        files: Vec<String>,
        /// Interaction time in milliseconds
        #[arg(long)]
        execution_time: Option<u64>,
    },
    /// Ask the backend for a cheaper version of a prompt
    Optimize {
        prompt: String,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        context: Option<String>,
    },
    /// Show usage analytics
    Analytics {
        /// e.g. today, 7d, 30d
        #[arg(long)]
        range: Option<String>,
    },
    /// Show account status
    Status,
    /// Show the latest pricing updates
    Pricing,
    /// Compare pricing across models
    ComparePricing {
        #[arg(required = true)]
        models: Vec<String>,
        #[arg(long)]
        task_type: Option<String>,
        #[arg(long)]
        tokens: Option<u64>,
    },
    /// Run a prompt against several models
    CompareModels {
        prompt: String,
        /// Model to compare (repeatable)
        #[arg(long = "model", required = true)]
        models: Vec<String>,
    },
    /// Forecast future spend
    Forecast {
        #[arg(long)]
        timeframe: Option<String>,
    },
    /// Ask the cost agent a question
    Ask {
        query: String,
        #[arg(long)]
        context: Option<String>,
    },
    /// Get personalized cost tips
    Tips {
        #[arg(long)]
        context: Option<String>,
    },
    /// List prompt templates
    Templates {
        #[arg(long)]
        category: Option<String>,
    },
    /// Find cost-saving opportunities
    Opportunities {
        #[arg(long)]
        timeframe: Option<String>,
    },
    /// List projects
    Projects,
    /// Create a project
    CreateProject {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Monthly budget in USD
        #[arg(long)]
        budget: Option<f64>,
    },
    /// Score the quality of a response
    Score {
        #[arg(long)]
        prompt: String,
        #[arg(long)]
        response: String,
        #[arg(long)]
        model: Option<String>,
    },
    /// Analyze a source file for cost issues
    AnalyzeCode {
        file: PathBuf,
        /// Overrides the language guessed from the extension
        #[arg(long)]
        language: Option<String>,
    },
    /// Get suggestions for the current editing context
    Suggestions {
        #[arg(long)]
        file: Option<String>,
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        snippet: Option<String>,
    },
    /// Register a workspace with the backend
    WorkspaceSetup {
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        framework: Option<String>,
    },
    /// Trigger a monitoring run
    Monitor,
    /// Track editor events from stdin (one JSON object per line)
    Watch {
        /// Don't poll usage status
        #[arg(long)]
        no_poll: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("katana={}", log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Cost Katana v{}", env!("CARGO_PKG_VERSION"));

    // Configure writes the file; everything else reads it
    let command = match cli.command {
        Commands::Configure {
            backend_url,
            api_key,
            user_id,
            auto_track,
            show_notifications,
            poll_interval,
            model,
        } => {
            let update = commands::SettingsUpdate {
                backend_url,
                api_key,
                user_id,
                auto_track,
                show_notifications,
                poll_interval,
                model,
            };
            return commands::configure(&cli.config, update);
        }
        command => command,
    };

    let settings = Settings::load_with_env(&cli.config)?;
    tracing::debug!("Backend: {}", settings.backend_url);
    let client = commands::connect(&settings)?;

    match command {
        Commands::Configure { .. } => Ok(()),
        Commands::Login { email, no_open } => commands::login(&client, email, !no_open).await,
        Commands::Validate => commands::validate(&client).await,
        Commands::Track {
            prompt,
            response,
            model,
            request_type,
            language,
            files,
            execution_time,
        } => {
            let model = model.unwrap_or_else(|| settings.default_model.clone());
            let mut request = katana_client::TrackUsageRequest::new(prompt, response, model);
            request.request_type = request_type;
            request.language = language;
            request.context_files = files;
            request.execution_time = execution_time;
            commands::track(&client, request).await
        }
        Commands::Optimize {
            prompt,
            model,
            context,
        } => commands::optimize(&client, prompt, model, context).await,
        Commands::Analytics { range } => commands::analytics(&client, range).await,
        Commands::Status => commands::status(&client).await,
        Commands::Pricing => commands::pricing(&client).await,
        Commands::ComparePricing {
            models,
            task_type,
            tokens,
        } => commands::compare_pricing(&client, models, task_type, tokens).await,
        Commands::CompareModels { prompt, models } => {
            commands::compare_models(&client, prompt, models).await
        }
        Commands::Forecast { timeframe } => commands::forecast(&client, timeframe).await,
        Commands::Ask { query, context } => commands::ask(&client, query, context).await,
        Commands::Tips { context } => commands::tips(&client, context).await,
        Commands::Templates { category } => commands::templates(&client, category).await,
        Commands::Opportunities { timeframe } => commands::opportunities(&client, timeframe).await,
        Commands::Projects => commands::projects(&client).await,
        Commands::CreateProject {
            name,
            description,
            budget,
        } => commands::create_project(&client, name, description, budget).await,
        Commands::Score {
            prompt,
            response,
            model,
        } => commands::score(&client, prompt, response, model).await,
        Commands::AnalyzeCode { file, language } => {
            commands::analyze_code(&client, file, language).await
        }
        Commands::Suggestions {
            file,
            language,
            snippet,
        } => commands::suggestions(&client, file, language, snippet).await,
        Commands::WorkspaceSetup {
            path,
            language,
            framework,
        } => commands::workspace_setup(&client, path, language, framework).await,
        Commands::Monitor => commands::monitor(&client).await,
        Commands::Watch { no_poll } => commands::watch(client, &settings, !no_poll).await,
    }
}

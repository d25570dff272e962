use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use console_core::{
    load_settings, load_settings_from,
    nodes::NodeSeed,
    BroadcastPullOrchestrator, ConsoleApi, FilePreferenceStore, HttpConsoleApi,
    LogQueryController, LogQueryForm, ModelCatalog, NodeDetailFetcher, NodeEditor, PullSubmitter,
    ThemeController,
};
use shared::domain::{LogSource, NodeId};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser, Debug)]
#[command(about = "Command-line front end for the proxy management console")]
struct Cli {
    /// Settings file; defaults to ./console.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the configured service root.
    #[arg(long)]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SourceArg {
    Django,
    Proxy,
}

impl From<SourceArg> for LogSource {
    fn from(value: SourceArg) -> Self {
        match value {
            SourceArg::Django => LogSource::Django,
            SourceArg::Proxy => LogSource::Proxy,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ThemeAction {
    Show,
    Toggle,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Browse one page of application or proxy logs.
    Logs {
        #[arg(long, short)]
        query: Option<String>,
        #[arg(long)]
        level: Option<String>,
        #[arg(long, value_enum)]
        source: Option<SourceArg>,
        #[arg(long)]
        limit: Option<String>,
        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
    /// Show details for a single node.
    Node { id: i64 },
    /// Overview of every registered node.
    Nodes,
    /// Models known to the proxy.
    Models,
    /// Pull a model onto one node.
    Pull {
        #[arg(long)]
        node: i64,
        model: String,
    },
    /// Pull a model onto every node.
    PullAll { model: String },
    /// Add a node, or replace it when --id is given.
    SaveNode {
        #[arg(long)]
        id: Option<i64>,
        #[arg(long)]
        name: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        port: String,
        #[arg(long)]
        inactive: bool,
    },
    Theme {
        #[arg(value_enum, default_value_t = ThemeAction::Show)]
        action: ThemeAction,
        /// Whether the desktop currently prefers a dark appearance.
        #[arg(long)]
        system_dark: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => load_settings_from(path)?,
        None => load_settings()?,
    };
    if let Some(base_url) = &cli.base_url {
        settings.base_url = console_core::settings::normalize_base_url(base_url)?;
    }
    info!(base_url = %settings.base_url, "console starting");
    let api: Arc<dyn ConsoleApi> = Arc::new(HttpConsoleApi::from_settings(&settings));

    match cli.command {
        Command::Logs {
            query,
            level,
            source,
            limit,
            offset,
        } => {
            let form = LogQueryForm {
                query: query.unwrap_or_default(),
                level: level.unwrap_or_default(),
                source: source.map(LogSource::from).unwrap_or(settings.default_source),
                limit_input: limit.unwrap_or_else(|| settings.page_size.to_string()),
            };
            let controller = LogQueryController::new(api, form);
            controller.load(offset).await;
            print!("{}", render::log_table(&controller.view()));
        }
        Command::Node { id } => {
            let fetcher = NodeDetailFetcher::new(api);
            print!("{}", render::node_details(&fetcher.open_details(NodeId(id)).await));
        }
        Command::Nodes => {
            let fetcher = NodeDetailFetcher::new(api);
            print!("{}", render::nodes_preview(&fetcher.preview().await));
        }
        Command::Models => {
            let catalog = ModelCatalog::new(api);
            print!("{}", render::models(&catalog.refresh().await));
        }
        Command::Pull { node, model } => {
            let submitter = PullSubmitter::new(api, settings.pull_auto_close_delay());
            submitter.open_node(NodeId(node)).await;
            submitter.set_model_input(model);
            let outcome = submitter.submit().await;
            print!("{}", render::pull_dialog(&submitter.view()));
            if !outcome.is_some_and(|outcome| outcome.is_success()) {
                bail!("pull did not succeed");
            }
        }
        Command::PullAll { model } => {
            let orchestrator = BroadcastPullOrchestrator::new(api);
            orchestrator.set_model_input(model);
            orchestrator.submit().await;
            print!("{}", render::broadcast(&orchestrator.view()));
        }
        Command::SaveNode {
            id,
            name,
            address,
            port,
            inactive,
        } => {
            let editor = NodeEditor::new(api);
            match id {
                Some(id) => editor.open_edit(NodeSeed {
                    id: NodeId(id),
                    name,
                    address,
                    port: None,
                }),
                None => {
                    editor.open_add();
                    editor.set_name(name);
                    editor.set_address(address);
                }
            }
            editor.set_port(port);
            editor.set_active(!inactive);
            let nodes = editor.save().await?;
            print!(
                "{}",
                render::nodes_preview(&console_core::nodes::render_nodes_preview(&nodes))
            );
        }
        Command::Theme {
            action,
            system_dark,
        } => {
            let store = FilePreferenceStore::new(&settings.preferences_path);
            let controller = ThemeController::init(store, system_dark);
            if let ThemeAction::Toggle = action {
                controller.toggle();
            }
            print!(
                "{}",
                render::theme(controller.current(), &controller.toggle_view())
            );
        }
    }

    Ok(())
}

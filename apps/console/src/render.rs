//! Plain-text rendering of the controller views.

use std::fmt::Write as _;

use console_core::{
    logs::LogTableView,
    models::ModelCatalogView,
    nodes::{ModelListView, NodeDetailsView, NodesPreviewView},
    pull::{BroadcastView, NodeInfoView, PullDialogView},
    theme::{Theme, ThemeToggleView},
    view::StatusBanner,
};

fn banner(out: &mut String, banner: &StatusBanner) {
    let _ = writeln!(out, "{}", banner.text);
    for line in &banner.details {
        let mark = if line.succeeded { "+" } else { "-" };
        let _ = writeln!(out, "  {mark} {}", line.text());
    }
}

pub fn log_table(view: &LogTableView) -> String {
    let mut out = String::new();
    if let Some(error) = &view.error {
        let _ = writeln!(out, "{error}");
    }
    for row in &view.rows {
        let _ = writeln!(
            out,
            "{:>6}  {}  {:<8}  {}  {}",
            row.number, row.timestamp, row.level, row.logger, row.message
        );
    }
    let _ = writeln!(out, "Showing {} of {}", view.range, view.count);
    out
}

pub fn node_details(view: &NodeDetailsView) -> String {
    let mut out = String::new();
    match view {
        NodeDetailsView::Unavailable(message) => {
            let _ = writeln!(out, "{message}");
        }
        NodeDetailsView::Loaded(panel) => {
            for row in &panel.rows {
                let _ = writeln!(out, "{:<16} {}", format!("{}:", row.label), row.value);
            }
            let _ = writeln!(out, "{}:", panel.models_heading);
            match &panel.models {
                ModelListView::Placeholder(text) => {
                    let _ = writeln!(out, "  {text}");
                }
                ModelListView::Names(names) => {
                    for name in names {
                        let _ = writeln!(out, "  - {name}");
                    }
                }
            }
        }
    }
    out
}

pub fn nodes_preview(view: &NodesPreviewView) -> String {
    let mut out = String::new();
    match view {
        NodesPreviewView::Empty(message) => {
            let _ = writeln!(out, "{message}");
        }
        NodesPreviewView::Cards(cards) => {
            for card in cards {
                let _ = writeln!(
                    out,
                    "{} [{}] Models: {} ({})",
                    card.name, card.status, card.model_count, card.models_summary
                );
            }
        }
    }
    out
}

pub fn models(view: &ModelCatalogView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Models ({})", view.count_label());
    match view {
        ModelCatalogView::Loading => out.push_str("Loading...\n"),
        ModelCatalogView::Empty(message) => {
            let _ = writeln!(out, "{message}");
        }
        ModelCatalogView::Listed(names) => {
            for name in names {
                let _ = writeln!(out, "  {name}");
            }
        }
    }
    out
}

pub fn pull_dialog(view: &PullDialogView) -> String {
    let mut out = String::new();
    if !view.title.is_empty() {
        let _ = writeln!(out, "{}", view.title);
    }
    match &view.node_info {
        NodeInfoView::Loading => {}
        NodeInfoView::Unavailable(message) => {
            let _ = writeln!(out, "{message}");
        }
        NodeInfoView::Loaded {
            heading,
            models,
            placeholder,
        } => {
            let _ = writeln!(out, "{heading}");
            if let Some(placeholder) = placeholder {
                let _ = writeln!(out, "  {placeholder}");
            }
            for model in models {
                let _ = writeln!(out, "  - {model}");
            }
        }
    }
    if let Some(status) = &view.status {
        banner(&mut out, status);
    }
    out
}

pub fn broadcast(view: &BroadcastView) -> String {
    let mut out = String::new();
    if let Some(status) = &view.status {
        banner(&mut out, status);
    }
    out
}

pub fn theme(theme: Theme, toggle: &ThemeToggleView) -> String {
    format!("{} {} ({})\n", toggle.icon, theme.as_str(), toggle.title)
}

//! Controllers behind the proxy management console: log browsing, node
//! inspection and editing, model pulls and the theme preference.
//!
//! Every controller talks to the service through [`ConsoleApi`] and exposes
//! its state as plain render descriptions; nothing here produces markup.

pub mod api;
pub mod error;
pub mod gate;
pub mod logs;
pub mod models;
pub mod nodes;
pub mod pull;
pub mod settings;
pub mod theme;
pub mod view;

pub use api::{ConsoleApi, HttpConsoleApi};
pub use error::{ClientError, ErrorKind};
pub use gate::{RequestGate, RequestToken};
pub use logs::{LoadOutcome, LogQueryController, LogQueryForm, LogTableView};
pub use models::{ModelCatalog, ModelCatalogView};
pub use nodes::{NodeDetailFetcher, NodeDetailsView, NodeEditor, NodesPreviewView};
pub use pull::{BroadcastOutcome, BroadcastPullOrchestrator, PullOutcome, PullSubmitter};
pub use settings::{load_settings, load_settings_from, ConsoleSettings};
pub use theme::{FilePreferenceStore, PreferenceStore, Theme, ThemeController};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

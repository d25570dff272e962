//! Paginated log viewer controller.
//!
//! Two independent guards keep the table consistent. The `loading` flag stops
//! a second fetch from being started while one is outstanding; the
//! [`RequestGate`] drops any response that is no longer the newest issued one,
//! which covers triggers that slipped past the flag. State is only touched in
//! short synchronous sections and never held across the network await.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shared::{
    domain::{LogLevel, LogSource},
    protocol::{LogEntry, LogPage, LogQuery},
};
use tracing::{debug, warn};

use crate::{
    api::ConsoleApi,
    error::ClientError,
    gate::{RequestGate, RequestToken},
    view::BadgeTone,
};

pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Positive integer limit from free-form input. Only the leading integer is
/// read, so "25abc" gives 25 and "1.5" gives 1; a missing, zero or negative
/// number yields 100.
pub fn parse_limit(raw: &str) -> u32 {
    let raw = raw.trim();
    let sign_len = usize::from(raw.starts_with(['+', '-']));
    let digits_len = raw[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits_len == 0 || raw.starts_with('-') {
        return DEFAULT_PAGE_LIMIT;
    }
    let digits = &raw[sign_len..sign_len + digits_len];
    match digits.parse::<u64>() {
        Ok(0) => DEFAULT_PAGE_LIMIT,
        Ok(value) => u32::try_from(value).unwrap_or(u32::MAX),
        // Only overflow is left at this point.
        Err(_) => u32::MAX,
    }
}

/// `(start, end)` of the displayed window, both zero for an empty result.
pub fn display_range(offset: u64, limit: u32, total: u64) -> (u64, u64) {
    if total == 0 {
        return (0, 0);
    }
    (offset + 1, (offset + u64::from(limit)).min(total))
}

pub fn level_badge(level: &LogLevel) -> BadgeTone {
    match level {
        LogLevel::Critical | LogLevel::Error => BadgeTone::Danger,
        LogLevel::Warning => BadgeTone::Warning,
        LogLevel::Info => BadgeTone::Info,
        LogLevel::Debug => BadgeTone::Success,
        LogLevel::Other(_) => BadgeTone::Secondary,
    }
}

/// User-editable filter inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQueryForm {
    pub query: String,
    /// Empty means every level.
    pub level: String,
    pub source: LogSource,
    pub limit_input: String,
}

impl Default for LogQueryForm {
    fn default() -> Self {
        Self {
            query: String::new(),
            level: String::new(),
            source: LogSource::Django,
            limit_input: DEFAULT_PAGE_LIMIT.to_string(),
        }
    }
}

impl LogQueryForm {
    fn to_query(&self, limit: u32, offset: u64) -> LogQuery {
        let query = self.query.trim();
        let level = self.level.trim();
        LogQuery {
            query: (!query.is_empty()).then(|| query.to_string()),
            level: (!level.is_empty()).then(|| level.to_string()),
            source: self.source,
            limit,
            offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogQueryState {
    pub form: LogQueryForm,
    /// Offset of the page on screen, as resolved by the service.
    pub offset: u64,
    pub limit: u32,
    pub loading: bool,
    pub items: Vec<LogEntry>,
    pub total_count: u64,
    pub error: Option<String>,
}

impl LogQueryState {
    fn new(form: LogQueryForm) -> Self {
        let limit = parse_limit(&form.limit_input);
        Self {
            form,
            offset: 0,
            limit,
            loading: false,
            items: Vec::new(),
            total_count: 0,
            error: None,
        }
    }
}

/// A fetch that has been admitted and must be handed back to
/// [`LogQueryController::finish_load`].
#[derive(Debug)]
pub struct LoadTicket {
    token: RequestToken,
    requested_offset: u64,
    query: LogQuery,
}

impl LoadTicket {
    pub fn query(&self) -> &LogQuery {
        &self.query
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A fetch was already outstanding; nothing was sent.
    Skipped,
    Committed { offset: u64, count: u64 },
    /// A newer request was issued meanwhile; the response was dropped.
    Discarded,
    Failed(String),
}

pub struct LogQueryController {
    api: Arc<dyn ConsoleApi>,
    gate: RequestGate,
    state: Mutex<LogQueryState>,
}

impl LogQueryController {
    pub fn new(api: Arc<dyn ConsoleApi>, form: LogQueryForm) -> Self {
        Self {
            api,
            gate: RequestGate::new(),
            state: Mutex::new(LogQueryState::new(form)),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, LogQueryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> LogQueryState {
        self.lock_state().clone()
    }

    pub fn view(&self) -> LogTableView {
        render_log_table(&self.lock_state())
    }

    pub fn request_epoch(&self) -> u64 {
        self.gate.epoch()
    }

    pub fn set_query_text(&self, text: impl Into<String>) {
        self.lock_state().form.query = text.into();
    }

    pub fn set_level(&self, level: impl Into<String>) {
        self.lock_state().form.level = level.into();
    }

    pub fn set_limit_input(&self, raw: impl Into<String>) {
        self.lock_state().form.limit_input = raw.into();
    }

    /// Initial page on controller start.
    pub async fn start(&self) -> LoadOutcome {
        self.load(0).await
    }

    pub async fn search(&self) -> LoadOutcome {
        self.load(0).await
    }

    /// Enter in the query box searches; other keys are ignored.
    pub async fn query_key_pressed(&self, key: &str) -> LoadOutcome {
        if key == "Enter" {
            self.search().await
        } else {
            LoadOutcome::Skipped
        }
    }

    /// The source selector is locked while loading, so the change is ignored.
    pub async fn change_source(&self, source: LogSource) -> LoadOutcome {
        {
            let mut state = self.lock_state();
            if state.loading {
                return LoadOutcome::Skipped;
            }
            state.form.source = source;
        }
        self.load(0).await
    }

    pub async fn previous_page(&self) -> LoadOutcome {
        let offset = {
            let state = self.lock_state();
            state.offset.saturating_sub(u64::from(state.limit))
        };
        self.load(offset).await
    }

    pub async fn next_page(&self) -> LoadOutcome {
        let offset = {
            let state = self.lock_state();
            state.offset + u64::from(state.limit)
        };
        self.load(offset).await
    }

    pub async fn load(&self, offset: u64) -> LoadOutcome {
        let Some(ticket) = self.begin_load(offset) else {
            debug!(offset, "log fetch already in flight; trigger ignored");
            return LoadOutcome::Skipped;
        };

        let mut in_flight = InFlight {
            controller: self,
            token: ticket.token,
            armed: true,
        };
        let result = self.api.query_logs(&ticket.query).await;
        in_flight.armed = false;
        self.finish_load(ticket, result)
    }

    /// Admits a fetch: takes a gate token, marks the controller loading and
    /// builds the request. `None` when a fetch is already outstanding.
    pub fn begin_load(&self, offset: u64) -> Option<LoadTicket> {
        let mut state = self.lock_state();
        if state.loading {
            return None;
        }

        state.limit = parse_limit(&state.form.limit_input);
        let token = self.gate.begin_request();
        state.loading = true;
        let query = state.form.to_query(state.limit, offset);
        debug!(epoch = token.epoch(), offset, limit = state.limit, "log fetch issued");

        Some(LoadTicket {
            token,
            requested_offset: offset,
            query,
        })
    }

    /// Reconciles a response. Stale tickets leave every field untouched,
    /// including `loading`, which belongs to the current fetch.
    pub fn finish_load(
        &self,
        ticket: LoadTicket,
        result: Result<LogPage, ClientError>,
    ) -> LoadOutcome {
        let mut state = self.lock_state();
        if !self.gate.is_current(ticket.token) {
            debug!(
                epoch = ticket.token.epoch(),
                current = self.gate.epoch(),
                "discarding stale log page"
            );
            return LoadOutcome::Discarded;
        }

        let outcome = match result {
            Ok(page) => {
                state.offset = page.offset.unwrap_or(ticket.requested_offset);
                state.total_count = page.count;
                state.items = page.results;
                state.error = None;
                LoadOutcome::Committed {
                    offset: state.offset,
                    count: state.total_count,
                }
            }
            Err(err) => {
                let message = describe_load_error(&err);
                warn!(error = %err, "log fetch failed");
                state.error = Some(message.clone());
                LoadOutcome::Failed(message)
            }
        };
        state.loading = false;
        outcome
    }

    fn release(&self, token: RequestToken) {
        let mut state = self.lock_state();
        if self.gate.is_current(token) {
            state.loading = false;
        }
    }
}

/// Clears `loading` if the fetch future is dropped before it settles.
struct InFlight<'a> {
    controller: &'a LogQueryController,
    token: RequestToken,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!(epoch = self.token.epoch(), "log fetch abandoned");
            self.controller.release(self.token);
        }
    }
}

fn describe_load_error(err: &ClientError) -> String {
    match err {
        ClientError::Status { status, body } => format!("Error: {status} {body}").trim().to_string(),
        ClientError::Protocol(_) => "Error: Invalid JSON response".to_string(),
        other => format!("Error: {other}"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRowView {
    pub number: u64,
    pub timestamp: String,
    pub level: String,
    pub badge: BadgeTone,
    pub logger: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTableView {
    pub rows: Vec<LogRowView>,
    pub range: String,
    pub count: u64,
    pub prev_disabled: bool,
    pub next_disabled: bool,
    pub search_disabled: bool,
    pub source_disabled: bool,
    pub query_input_disabled: bool,
    pub error: Option<String>,
}

pub fn render_log_table(state: &LogQueryState) -> LogTableView {
    let rows = state
        .items
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let label = entry.level.label();
            LogRowView {
                number: state.offset + i as u64 + 1,
                timestamp: entry.timestamp.clone(),
                level: if label.is_empty() { "N/A".to_string() } else { label },
                badge: level_badge(&entry.level),
                logger: entry.logger.clone(),
                message: entry.message.clone(),
            }
        })
        .collect();

    let (start, end) = display_range(state.offset, state.limit, state.total_count);
    LogTableView {
        rows,
        range: format!("{start}-{end}"),
        count: state.total_count,
        prev_disabled: state.loading || state.offset == 0,
        next_disabled: state.loading
            || state.offset + u64::from(state.limit) >= state.total_count,
        search_disabled: state.loading,
        source_disabled: state.loading,
        query_input_disabled: false,
        error: state.error.clone(),
    }
}

#[cfg(test)]
#[path = "tests/logs_tests.rs"]
mod tests;

use super::*;
use crate::test_support::{page, settle_until, FakeApi};

fn controller(api: &Arc<FakeApi>) -> Arc<LogQueryController> {
    Arc::new(LogQueryController::new(api.clone(), LogQueryForm::default()))
}

/// Lets a second trigger through as if both sources fired before either set
/// the loading flag.
fn force_idle(controller: &LogQueryController) {
    controller.lock_state().loading = false;
}

#[test]
fn invalid_limits_fall_back_to_default() {
    for raw in ["0", "-5", "abc", "", "  ", "-", "+", "00", "-0", ".5", "x25"] {
        assert_eq!(parse_limit(raw), 100, "input {raw:?}");
    }
    assert_eq!(parse_limit("25"), 25);
    assert_eq!(parse_limit(" 250 "), 250);
}

#[test]
fn limit_uses_the_leading_integer() {
    assert_eq!(parse_limit("1.5"), 1);
    assert_eq!(parse_limit("25abc"), 25);
    assert_eq!(parse_limit("50 rows"), 50);
    assert_eq!(parse_limit("+40"), 40);
    assert_eq!(parse_limit("99999999999999999999999"), u32::MAX);
}

#[test]
fn limit_with_trailing_text_reaches_the_request() {
    let api = FakeApi::new();
    let controller = controller(&api);
    controller.set_limit_input("25abc");

    let ticket = controller.begin_load(0).expect("admitted");
    assert_eq!(ticket.query().limit, 25);
    assert_eq!(controller.snapshot().limit, 25);
}

#[test]
fn last_page_range_and_controls() {
    let mut state = LogQueryState::new(LogQueryForm::default());
    state.total_count = 237;
    state.offset = 200;

    let view = render_log_table(&state);
    assert_eq!(view.range, "201-237");
    assert!(view.next_disabled);
    assert!(!view.prev_disabled);
}

#[test]
fn empty_result_disables_both_directions() {
    let state = LogQueryState::new(LogQueryForm::default());
    let view = render_log_table(&state);
    assert_eq!(view.range, "0-0");
    assert_eq!(view.count, 0);
    assert!(view.prev_disabled);
    assert!(view.next_disabled);
}

#[test]
fn loading_locks_controls_but_not_query_input() {
    let mut state = LogQueryState::new(LogQueryForm::default());
    state.total_count = 500;
    state.offset = 100;
    state.loading = true;

    let view = render_log_table(&state);
    assert!(view.prev_disabled);
    assert!(view.next_disabled);
    assert!(view.search_disabled);
    assert!(view.source_disabled);
    assert!(!view.query_input_disabled);
}

#[test]
fn rows_are_numbered_from_the_committed_offset() {
    let mut state = LogQueryState::new(LogQueryForm::default());
    state.offset = 100;
    state.total_count = 102;
    state.items = page(&["a", "b"], 102, 100).results;
    state.items[1].level = LogLevel::Other(String::new());

    let view = render_log_table(&state);
    assert_eq!(view.rows[0].number, 101);
    assert_eq!(view.rows[0].badge, BadgeTone::Info);
    assert_eq!(view.rows[1].number, 102);
    assert_eq!(view.rows[1].level, "N/A");
    assert_eq!(view.rows[1].badge, BadgeTone::Secondary);
}

#[test]
fn level_badges_follow_severity() {
    assert_eq!(level_badge(&LogLevel::Critical), BadgeTone::Danger);
    assert_eq!(level_badge(&LogLevel::Error), BadgeTone::Danger);
    assert_eq!(level_badge(&LogLevel::Warning), BadgeTone::Warning);
    assert_eq!(level_badge(&LogLevel::Debug), BadgeTone::Success);
    assert_eq!(
        level_badge(&LogLevel::Other("TRACE".into())),
        BadgeTone::Secondary
    );
}

#[test]
fn builds_request_from_form_fields() {
    let api = FakeApi::new();
    let controller = controller(&api);
    controller.set_query_text("  timeout ");
    controller.set_level("ERROR");
    controller.set_limit_input("abc");

    let ticket = controller.begin_load(40).expect("admitted");
    assert_eq!(
        ticket.query(),
        &LogQuery {
            query: Some("timeout".into()),
            level: Some("ERROR".into()),
            source: LogSource::Django,
            limit: 100,
            offset: 40,
        }
    );
}

#[test]
fn newer_response_wins_when_it_arrives_first() {
    let api = FakeApi::new();
    let controller = controller(&api);

    let first = controller.begin_load(0).expect("first");
    force_idle(&controller);
    let second = controller.begin_load(100).expect("second");

    assert_eq!(
        controller.finish_load(second, Ok(page(&["second"], 300, 100))),
        LoadOutcome::Committed {
            offset: 100,
            count: 300
        }
    );
    assert_eq!(
        controller.finish_load(first, Ok(page(&["first"], 300, 0))),
        LoadOutcome::Discarded
    );

    let state = controller.snapshot();
    assert_eq!(state.offset, 100);
    assert_eq!(state.items[0].message, "second");
    assert!(!state.loading);
}

#[test]
fn stale_response_never_clears_loading() {
    let api = FakeApi::new();
    let controller = controller(&api);

    let first = controller.begin_load(0).expect("first");
    force_idle(&controller);
    let second = controller.begin_load(100).expect("second");

    assert_eq!(
        controller.finish_load(first, Ok(page(&["first"], 300, 0))),
        LoadOutcome::Discarded
    );
    let state = controller.snapshot();
    assert!(state.loading, "stale response must leave the current fetch in charge");
    assert!(state.items.is_empty());
    assert!(controller.view().search_disabled);

    controller.finish_load(second, Ok(page(&["second"], 300, 100)));
    let state = controller.snapshot();
    assert!(!state.loading);
    assert_eq!(state.items[0].message, "second");
}

#[test]
fn stale_failure_is_silent() {
    let api = FakeApi::new();
    let controller = controller(&api);

    let first = controller.begin_load(0).expect("first");
    force_idle(&controller);
    let _second = controller.begin_load(0).expect("second");

    let outcome = controller.finish_load(first, Err(ClientError::Transport("reset".into())));
    assert_eq!(outcome, LoadOutcome::Discarded);
    assert_eq!(controller.snapshot().error, None);
}

#[test]
fn only_last_of_many_racing_requests_is_committed() {
    let api = FakeApi::new();
    let controller = controller(&api);

    let mut tickets = Vec::new();
    for offset in [0, 100, 200, 300] {
        force_idle(&controller);
        tickets.push(controller.begin_load(offset).expect("admitted"));
    }
    assert_eq!(controller.request_epoch(), 4);

    // Arrival order: 3rd, last, 1st, 2nd.
    let mut tickets: Vec<Option<LoadTicket>> = tickets.into_iter().map(Some).collect();
    for index in [2usize, 3, 0, 1] {
        let ticket = tickets[index].take().expect("ticket");
        let offset = ticket.query().offset;
        let label = format!("page-{offset}");
        controller.finish_load(ticket, Ok(page(&[label.as_str()], 1000, offset)));
    }

    let state = controller.snapshot();
    assert_eq!(state.offset, 300);
    assert_eq!(state.items[0].message, "page-300");
}

#[tokio::test]
async fn second_trigger_while_loading_sends_nothing() {
    let api = FakeApi::new();
    let controller = controller(&api);
    let reply = api.logs.deferred();

    let first = tokio::spawn({
        let controller = controller.clone();
        async move { controller.start().await }
    });
    settle_until(|| api.logs.call_count() == 1).await;

    assert_eq!(controller.search().await, LoadOutcome::Skipped);
    assert_eq!(controller.next_page().await, LoadOutcome::Skipped);
    assert_eq!(
        controller.change_source(LogSource::Proxy).await,
        LoadOutcome::Skipped
    );
    assert_eq!(api.logs.call_count(), 1);

    reply.send(Ok(page(&["a"], 1, 0))).expect("deliver");
    assert_eq!(
        first.await.expect("join"),
        LoadOutcome::Committed { offset: 0, count: 1 }
    );
    assert!(!controller.snapshot().loading);
}

#[tokio::test]
async fn adopts_service_resolved_offset_for_paging() {
    let api = FakeApi::new();
    let controller = controller(&api);
    controller.set_limit_input("50");

    api.logs.reply(Ok(page(&["x"], 120, 0)));
    controller.start().await;

    // The service clamps an out-of-range offset back to 100.
    api.logs.reply(Ok(page(&["y"], 120, 100)));
    controller.load(500).await;
    assert_eq!(controller.snapshot().offset, 100);

    api.logs.reply(Ok(page(&["z"], 120, 50)));
    controller.previous_page().await;

    let calls = api.logs.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[2].offset, 50);
    assert_eq!(calls[2].limit, 50);
    assert_eq!(controller.view().range, "51-100");
}

#[tokio::test]
async fn previous_page_is_floored_at_zero() {
    let api = FakeApi::new();
    let controller = controller(&api);

    api.logs.reply(Ok(page(&["x"], 500, 30)));
    controller.load(30).await;
    api.logs.reply(Ok(page(&["y"], 500, 0)));
    controller.previous_page().await;

    assert_eq!(api.logs.calls()[1].offset, 0);
}

#[tokio::test]
async fn source_change_resets_to_first_page() {
    let api = FakeApi::new();
    let controller = controller(&api);

    api.logs.reply(Ok(page(&["x"], 500, 200)));
    controller.load(200).await;
    api.logs.reply(Ok(page(&["p"], 3, 0)));
    controller.change_source(LogSource::Proxy).await;

    let last = api.logs.calls().pop().expect("call");
    assert_eq!(last.offset, 0);
    assert_eq!(last.source, LogSource::Proxy);
}

#[tokio::test]
async fn enter_in_query_box_searches() {
    let api = FakeApi::new();
    let controller = controller(&api);

    assert_eq!(controller.query_key_pressed("a").await, LoadOutcome::Skipped);
    assert_eq!(api.logs.call_count(), 0);

    api.logs.reply(Ok(page(&[], 0, 0)));
    controller.query_key_pressed("Enter").await;
    assert_eq!(api.logs.call_count(), 1);
}

#[tokio::test]
async fn failure_keeps_previous_page_and_reenables_controls() {
    let api = FakeApi::new();
    let controller = controller(&api);

    api.logs.reply(Ok(page(&["kept"], 250, 100)));
    controller.load(100).await;

    api.logs.reply(Err(ClientError::Status {
        status: 500,
        body: r#"{"detail":"LOG_JSON_PATH not configured"}"#.into(),
    }));
    let outcome = controller.next_page().await;
    assert!(matches!(outcome, LoadOutcome::Failed(ref m) if m.starts_with("Error: 500")));

    let state = controller.snapshot();
    assert_eq!(state.offset, 100);
    assert_eq!(state.items[0].message, "kept");
    assert!(!state.loading);
    let view = controller.view();
    assert!(!view.search_disabled);
    assert!(view.error.is_some());

    api.logs.reply(Err(ClientError::Protocol("expected value".into())));
    assert_eq!(
        controller.search().await,
        LoadOutcome::Failed("Error: Invalid JSON response".into())
    );
    assert!(!controller.snapshot().loading);
}

#[tokio::test]
async fn successful_load_clears_previous_error() {
    let api = FakeApi::new();
    let controller = controller(&api);

    api.logs.reply(Err(ClientError::Transport("connection refused".into())));
    controller.start().await;
    assert!(controller.snapshot().error.is_some());

    api.logs.reply(Ok(page(&["ok"], 1, 0)));
    controller.search().await;
    assert_eq!(controller.snapshot().error, None);
}

#[tokio::test]
async fn dropped_fetch_releases_loading() {
    let api = FakeApi::new();
    let controller = controller(&api);
    let _reply = api.logs.deferred();

    let handle = tokio::spawn({
        let controller = controller.clone();
        async move { controller.start().await }
    });
    settle_until(|| api.logs.call_count() == 1).await;
    assert!(controller.snapshot().loading);

    handle.abort();
    let _ = handle.await;
    assert!(!controller.snapshot().loading);
}

#[tokio::test]
async fn controllers_do_not_share_state() {
    let api = FakeApi::new();
    let left = controller(&api);
    let right = controller(&api);
    let _pending = api.logs.deferred();

    let handle = tokio::spawn({
        let left = left.clone();
        async move { left.start().await }
    });
    settle_until(|| api.logs.call_count() == 1).await;

    assert!(left.snapshot().loading);
    assert!(!right.snapshot().loading);
    assert_eq!(right.request_epoch(), 0);
    handle.abort();
}

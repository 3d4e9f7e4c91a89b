use super::*;

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn orchestrator() -> QueryOrchestrator {
    QueryOrchestrator::new(10, DEFAULT_DEBOUNCE)
}

/// Replays keystrokes at the given offsets and polls every 10ms until
/// `until`, collecting every reload with the offset it fired at.
fn replay(
    orch: &mut QueryOrchestrator,
    keystrokes: &[(u64, &str)],
    until: u64,
) -> Vec<(u64, LoadRequest)> {
    let t0 = Instant::now();
    let mut fired = Vec::new();
    let mut offset = 0;
    while offset <= until {
        let now = t0 + ms(offset);
        for (at, text) in keystrokes {
            if *at == offset {
                orch.set_search(*text, now);
            }
        }
        if let Some(request) = orch.poll_debounce(now) {
            fired.push((offset, request));
        }
        offset += 10;
    }
    fired
}

#[test]
fn burst_of_keystrokes_yields_one_reload_with_last_text() {
    let mut orch = orchestrator();

    let fired = replay(&mut orch, &[(0, "a"), (100, "al"), (200, "alg")], 2_000);

    assert_eq!(fired.len(), 1);
    let (at, request) = &fired[0];
    assert_eq!(*at, 700);
    assert_eq!(request.query.search, "alg");
    assert_eq!(request.query.page, 1);
}

#[test]
fn unchanged_text_inside_window_does_not_restart_timer() {
    let mut orch = orchestrator();

    let fired = replay(
        &mut orch,
        &[(0, "a"), (100, "al"), (200, "alg"), (600, "alg")],
        2_000,
    );

    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].0, 700);
    assert_eq!(fired[0].1.query.search, "alg");
}

#[test]
fn new_text_inside_window_supersedes_pending_timer() {
    let mut orch = orchestrator();

    let fired = replay(
        &mut orch,
        &[(0, "a"), (100, "al"), (200, "alg"), (600, "alge")],
        2_000,
    );

    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].0, 1_100);
    assert_eq!(fired[0].1.query.search, "alge");
}

#[test]
fn superseded_token_never_fires() {
    let mut orch = orchestrator();
    let now = Instant::now();

    let first = orch.set_search("a", now).expect("timer");
    let second = orch.set_search("ab", now + ms(50)).expect("timer");

    assert!(orch.fire_debounce(first.token).is_none());
    let request = orch.fire_debounce(second.token).expect("reload");
    assert_eq!(request.query.search, "ab");
    assert!(orch.fire_debounce(second.token).is_none());
}

#[test]
fn search_from_later_page_resets_to_first_page_once() {
    let mut orch = orchestrator();
    orch.set_page(3).expect("page reload");
    assert_eq!(orch.state().page, 3);

    let fired = replay(&mut orch, &[(0, "bio")], 1_000);

    assert_eq!(fired.len(), 1);
    let request = &fired[0].1;
    assert_eq!(request.query.page, 1);
    assert_eq!(request.query.search, "bio");
    assert_eq!(orch.state().page, 1);
}

#[test]
fn both_debounce_paths_converge_on_the_same_query() {
    let mut from_first = orchestrator();
    let mut from_third = orchestrator();
    from_third.set_page(3);

    let a = replay(&mut from_first, &[(0, "geo")], 1_000);
    let b = replay(&mut from_third, &[(0, "geo")], 1_000);

    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 1);
    assert_eq!(a[0].1.query, b[0].1.query);
}

#[test]
fn status_filter_reloads_immediately_on_first_page() {
    let mut orch = orchestrator();
    orch.set_page(4);

    let request = orch
        .set_status_filter(Some("disabled".to_string()))
        .expect("reload");

    assert_eq!(request.query.page, 1);
    assert_eq!(request.query.status_filter.as_deref(), Some("disabled"));
}

#[test]
fn unchanged_or_blank_filter_is_not_a_change() {
    let mut orch = orchestrator();

    assert!(orch.set_status_filter(Some("  ".to_string())).is_none());
    assert!(orch.set_status_filter(Some("active".to_string())).is_some());
    assert!(orch.set_status_filter(Some(" active ".to_string())).is_none());
    assert!(orch.set_status_filter(None).is_some());
}

#[test]
fn tab_change_reloads_immediately_on_first_page() {
    let mut orch = orchestrator();
    orch.set_page(2);

    let request = orch.set_tab(Tab::Past).expect("reload");
    assert_eq!(request.query.tab, Tab::Past);
    assert_eq!(request.query.page, 1);

    assert!(orch.set_tab(Tab::Past).is_none());
}

#[test]
fn filter_change_cancels_pending_search_timer() {
    let mut orch = orchestrator();
    let now = Instant::now();
    let timer = orch.set_search("chem", now).expect("timer");

    let request = orch.set_tab(Tab::All).expect("reload");
    assert_eq!(request.query.search, "chem");
    assert!(orch.pending_timer().is_none());
    assert!(orch.fire_debounce(timer.token).is_none());
    assert!(orch.poll_debounce(now + ms(1_000)).is_none());
}

#[test]
fn page_change_keeps_search_and_filter() {
    let mut orch = orchestrator();
    orch.set_status_filter(Some("active".to_string()));
    let timer = orch.set_search("ann", Instant::now()).expect("timer");
    orch.fire_debounce(timer.token).expect("reload");

    let request = orch.set_page(2).expect("reload");
    assert_eq!(request.query.page, 2);
    assert_eq!(request.query.search, "ann");
    assert_eq!(request.query.status_filter.as_deref(), Some("active"));
}

#[test]
fn sequence_numbers_increase_monotonically() {
    let mut orch = orchestrator();
    let first = orch.reload();
    let second = orch.set_page(2).expect("reload");
    let third = orch.set_tab(Tab::All).expect("reload");

    assert!(first.seq < second.seq && second.seq < third.seq);
    assert_eq!(orch.last_issued_seq(), third.seq);
}

#[test]
fn stale_response_is_rejected() {
    let mut orch = orchestrator();
    let older = orch.reload();
    let newer = orch.set_page(2).expect("reload");

    let info = PageInfo {
        current_page: 1,
        total_pages: 5,
    };
    let err = orch.accept_response(older.seq, info).expect_err("stale");
    assert_eq!(
        err,
        StaleResponse {
            seq: older.seq,
            latest: newer.seq
        }
    );
    assert_eq!(orch.state().page, 2);
    assert_eq!(orch.last_applied_seq(), 0);

    orch.accept_response(
        newer.seq,
        PageInfo {
            current_page: 2,
            total_pages: 5,
        },
    )
    .expect("fresh");
    assert_eq!(orch.last_applied_seq(), newer.seq);
}

#[test]
fn page_is_clamped_after_response() {
    let mut orch = orchestrator();
    let request = orch.set_page(6).expect("reload");

    orch.accept_response(
        request.seq,
        PageInfo {
            current_page: 6,
            total_pages: 3,
        },
    )
    .expect("fresh");
    assert_eq!(orch.state().page, 3);

    let request = orch.reload();
    orch.accept_response(
        request.seq,
        PageInfo {
            current_page: 0,
            total_pages: 0,
        },
    )
    .expect("fresh");
    assert_eq!(orch.state().page, 1);
}

#[test]
fn set_page_clamps_to_known_page_count() {
    let mut orch = orchestrator();
    let request = orch.reload();
    orch.accept_response(
        request.seq,
        PageInfo {
            current_page: 1,
            total_pages: 4,
        },
    )
    .expect("fresh");

    let request = orch.set_page(99).expect("reload");
    assert_eq!(request.query.page, 4);
    assert!(orch.set_page(0).expect("reload").query.page == 1);
}

#[test]
fn list_query_drops_blank_search() {
    let mut state = QueryState::new(25);
    state.search = "   ".to_string();
    assert_eq!(state.to_list_query().search, None);

    state.search = " ada ".to_string();
    assert_eq!(state.to_list_query().search.as_deref(), Some("ada"));
    assert_eq!(state.to_list_query().limit, 25);
}

#[test]
fn tabs_partition_phases() {
    for phase in Phase::ALL {
        assert!(Tab::All.admits(phase));
        assert_ne!(Tab::Upcoming.admits(phase), Tab::Past.admits(phase));
    }
}

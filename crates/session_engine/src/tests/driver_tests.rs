use super::*;

use std::sync::Mutex as StdMutex;

use tokio::time::{sleep, Duration};

use crate::query::DEFAULT_DEBOUNCE;

type Recorded = Arc<StdMutex<Vec<(Duration, LoadRequest)>>>;

fn recording_driver(t0: Instant) -> (QueryDriver, Recorded) {
    let driver = QueryDriver::new(QueryOrchestrator::new(10, DEFAULT_DEBOUNCE));
    let recorded: Recorded = Arc::new(StdMutex::new(Vec::new()));
    let sink = Arc::clone(&recorded);
    driver.on_load(move |request| {
        sink.lock()
            .expect("recorder")
            .push((Instant::now() - t0, request));
    });
    (driver, recorded)
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[tokio::test(start_paused = true)]
async fn keystroke_burst_fires_once_after_quiet_period() {
    let t0 = Instant::now();
    let (driver, recorded) = recording_driver(t0);

    driver.set_search("p");
    sleep(ms(100)).await;
    driver.set_search("ph");
    sleep(ms(100)).await;
    driver.set_search("phy");
    sleep(ms(400)).await;
    // Same text again at 600ms: not a change, the 200ms timer survives.
    driver.set_search("phy");
    sleep(ms(1_000)).await;

    let recorded = recorded.lock().expect("recorder");
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].0, ms(700));
    assert_eq!(recorded[0].1.query.search, "phy");
    assert_eq!(recorded[0].1.query.page, 1);
}

#[tokio::test(start_paused = true)]
async fn late_keystroke_restarts_the_window() {
    let t0 = Instant::now();
    let (driver, recorded) = recording_driver(t0);

    driver.set_search("p");
    sleep(ms(100)).await;
    driver.set_search("ph");
    sleep(ms(100)).await;
    driver.set_search("phy");
    sleep(ms(400)).await;
    driver.set_search("phys");
    sleep(ms(1_000)).await;

    let recorded = recorded.lock().expect("recorder");
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].0, ms(1_100));
    assert_eq!(recorded[0].1.query.search, "phys");
}

#[tokio::test(start_paused = true)]
async fn search_on_third_page_issues_single_first_page_reload() {
    let t0 = Instant::now();
    let (driver, recorded) = recording_driver(t0);

    driver.set_page(3).expect("page reload");
    recorded.lock().expect("recorder").clear();

    driver.set_search("history");
    sleep(ms(2_000)).await;

    let recorded = recorded.lock().expect("recorder");
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].1.query.page, 1);
    assert_eq!(recorded[0].1.query.search, "history");
    assert_eq!(driver.state().page, 1);
}

#[tokio::test(start_paused = true)]
async fn tab_change_during_debounce_cancels_timer() {
    let t0 = Instant::now();
    let (driver, recorded) = recording_driver(t0);

    driver.set_search("art");
    sleep(ms(200)).await;
    let request = driver.set_tab(Tab::Past).expect("tab reload");
    assert_eq!(request.query.search, "art");
    assert!(!driver.has_pending_search());

    sleep(ms(2_000)).await;

    let recorded = recorded.lock().expect("recorder");
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].0, ms(200));
    assert_eq!(recorded[0].1.query.tab, Tab::Past);
}

#[tokio::test(start_paused = true)]
async fn status_filter_reloads_immediately() {
    let t0 = Instant::now();
    let (driver, recorded) = recording_driver(t0);

    driver.set_status_filter(Some("active".to_string()));

    let recorded = recorded.lock().expect("recorder");
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].0, Duration::ZERO);
    assert_eq!(recorded[0].1.query.status_filter.as_deref(), Some("active"));
}

#[tokio::test(start_paused = true)]
async fn dropping_driver_silences_pending_timer() {
    let t0 = Instant::now();
    let (driver, recorded) = recording_driver(t0);

    driver.set_search("bio");
    drop(driver);
    sleep(ms(2_000)).await;

    assert!(recorded.lock().expect("recorder").is_empty());
}

#[tokio::test]
async fn stale_responses_are_reported() {
    let driver = QueryDriver::new(QueryOrchestrator::default());
    let first = driver.reload();
    let second = driver.reload();

    let info = PageInfo {
        current_page: 1,
        total_pages: 2,
    };
    assert!(driver.accept_response(first.seq, info).is_err());
    assert!(driver.is_latest(second.seq));
    driver.accept_response(second.seq, info).expect("fresh");
    assert_eq!(driver.total_pages(), Some(2));
}

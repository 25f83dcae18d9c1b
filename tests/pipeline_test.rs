//! Page loop, retry and export behaviour driven through a scripted portal


use fake_portal::{Call, FakePortal};
use tempfile::TempDir;
use tm_class_scraper::export::{output_file_name, read_first_sheet};
use tm_class_scraper::pipeline::{bootstrap, scrape_all, scrape_category};
use tm_class_scraper::{JurisdictionPolicy, ScrapeConfig, ScrapeError, StopReason, Timings};

fn config(dir: &TempDir, classes: std::ops::RangeInclusive<u8>) -> ScrapeConfig {
    ScrapeConfig {
        classes,
        output_dir: dir.path().to_path_buf(),
        timings: Timings::immediate(),
        ..ScrapeConfig::default()
    }
}

#[tokio::test]
async fn test_page_cap_stops_at_ten_pages() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 1..=1);
    let portal = FakePortal::new(15, 25);

    let batch = scrape_category(&portal, 1, &cfg).await;

    assert_eq!(batch.stop, StopReason::PageCap);
    assert_eq!(batch.pages_read, 10);
    assert_eq!(batch.records.len(), 250);
    assert_eq!(portal.count(&Call::WaitForPage(10)), 1);
    assert_eq!(portal.count(&Call::WaitForPage(11)), 0);
    // no pagination attempt once the cap is hit
    assert_eq!(portal.count(&Call::GoToNextPage), 9);
}

#[tokio::test]
async fn test_custom_page_cap() {
    let dir = TempDir::new().unwrap();
    let cfg = ScrapeConfig {
        max_pages: 3,
        ..config(&dir, 1..=1)
    };
    let portal = FakePortal::new(15, 2);

    let batch = scrape_category(&portal, 1, &cfg).await;

    assert_eq!(batch.stop, StopReason::PageCap);
    assert_eq!(batch.pages_read, 3);
    assert_eq!(batch.records.len(), 6);
}

#[tokio::test]
async fn test_zero_page_cap_reads_nothing() {
    let dir = TempDir::new().unwrap();
    let cfg = ScrapeConfig {
        max_pages: 0,
        ..config(&dir, 1..=1)
    };
    let portal = FakePortal::new(5, 2);

    let batch = scrape_category(&portal, 1, &cfg).await;

    assert_eq!(batch.stop, StopReason::PageCap);
    assert_eq!(batch.pages_read, 0);
    assert!(!portal.calls().iter().any(|c| matches!(c, Call::ReadPage(_))));
}

#[tokio::test]
async fn test_stops_when_next_is_disabled() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 1..=1);
    let portal = FakePortal::new(3, 4);

    let batch = scrape_category(&portal, 1, &cfg).await;

    assert_eq!(batch.stop, StopReason::NoNextPage);
    assert_eq!(batch.pages_read, 3);
    assert_eq!(batch.records.len(), 12);
    assert_eq!(batch.records[0].term, "c1-p1-r0");
    assert_eq!(batch.records[11].term, "c1-p3-r3");
}

#[tokio::test]
async fn test_next_click_failure_keeps_collected_rows() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 1..=1);
    let portal = FakePortal::new(5, 4).next_click_fails();

    let batch = scrape_category(&portal, 1, &cfg).await;

    assert_eq!(batch.stop, StopReason::NextFailed);
    assert_eq!(batch.pages_read, 1);
    assert_eq!(batch.records.len(), 4);
}

#[tokio::test]
async fn test_single_timeout_triggers_exactly_one_retry() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 1..=1);
    let portal = FakePortal::new(3, 5).fail_wait(2, 1);

    let batch = scrape_category(&portal, 1, &cfg).await;

    assert_eq!(portal.count(&Call::WaitForPage(2)), 2);
    assert_eq!(portal.count(&Call::ReadPage(2)), 1);
    assert_eq!(batch.stop, StopReason::NoNextPage);
    assert_eq!(batch.pages_read, 3);
    assert_eq!(batch.records.len(), 15);
}

#[tokio::test]
async fn test_second_timeout_abandons_remaining_pages() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 1..=1);
    let portal = FakePortal::new(6, 5).fail_wait(2, 2);

    let batch = scrape_category(&portal, 1, &cfg).await;

    assert_eq!(batch.stop, StopReason::ExtractionFailed);
    assert_eq!(portal.count(&Call::WaitForPage(2)), 2);
    assert_eq!(portal.count(&Call::WaitForPage(3)), 0);
    assert_eq!(batch.pages_read, 1);
    assert_eq!(batch.records.len(), 5, "page 1 rows are kept");
}

#[tokio::test]
async fn test_read_failure_retries_full_wait_and_read() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 1..=1);
    let portal = FakePortal::new(1, 3).fail_read(1, 1);

    let batch = scrape_category(&portal, 1, &cfg).await;

    let page_calls: Vec<Call> = portal
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::WaitForPage(_) | Call::ReadPage(_)))
        .collect();
    assert_eq!(
        page_calls,
        vec![
            Call::WaitForPage(1),
            Call::ReadPage(1),
            Call::WaitForPage(1),
            Call::ReadPage(1),
        ]
    );
    // the failed attempt contributes nothing, so no duplicates
    assert_eq!(batch.records.len(), 3);
}

#[tokio::test]
async fn test_never_reads_page_without_matching_indicator() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 1..=1);
    let portal = FakePortal::new(5, 2).stuck_after(1);

    let batch = scrape_category(&portal, 1, &cfg).await;

    assert_eq!(batch.stop, StopReason::ExtractionFailed);
    assert_eq!(portal.count(&Call::ReadPage(1)), 1);
    assert_eq!(portal.count(&Call::WaitForPage(2)), 2);
    assert_eq!(batch.records.len(), 2);
}

#[tokio::test]
async fn test_stale_rows_are_dropped_not_retried() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 1..=1);
    let portal = FakePortal::new(2, 5).stale_rows(1);

    let batch = scrape_category(&portal, 1, &cfg).await;

    assert_eq!(batch.records.len(), 8);
    assert_eq!(batch.pages_read, 2);
    assert_eq!(portal.count(&Call::WaitForPage(1)), 1);
    assert_eq!(portal.count(&Call::ReadPage(1)), 1);
    assert!(batch.records.iter().all(|r| !r.term.ends_with("-r4")));
}

#[tokio::test]
async fn test_page_of_only_stale_rows_is_still_read_once() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 1..=1);
    let portal = FakePortal::new(1, 3).stale_rows(3);

    let batch = scrape_category(&portal, 1, &cfg).await;

    assert_eq!(batch.stop, StopReason::NoNextPage);
    assert_eq!(batch.pages_read, 1);
    assert!(batch.records.is_empty());
    assert_eq!(portal.count(&Call::WaitForPage(1)), 1);
}

#[tokio::test]
async fn test_missing_controls_skip_only_that_class() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 1..=3);
    let portal = FakePortal::new(2, 3).missing_controls_for(2);

    let outcomes = scrape_all(&portal, &cfg).await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[1].stop, StopReason::ControlsUnavailable);
    assert_eq!(outcomes[1].rows, 0);
    assert!(outcomes[1].file.is_none());
    assert!(!dir.path().join(output_file_name(2)).exists());

    for class in [1u8, 3] {
        let path = dir.path().join(output_file_name(class));
        assert!(path.exists(), "class {} file missing", class);
    }
    assert_eq!(outcomes[0].rows, 6);
    assert_eq!(outcomes[2].rows, 6);
}

#[tokio::test]
async fn test_broken_submit_skips_class_without_reading() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 4..=4);
    let portal = FakePortal::new(2, 3).broken_submit_for(4);

    let outcomes = scrape_all(&portal, &cfg).await;

    assert_eq!(outcomes[0].stop, StopReason::ControlsUnavailable);
    assert!(!portal.calls().iter().any(|c| matches!(c, Call::WaitForPage(_))));
    assert!(!dir.path().join(output_file_name(4)).exists());
}

#[tokio::test]
async fn test_empty_results_write_no_file() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 5..=5);
    let portal = FakePortal::new(1, 0);

    let outcomes = scrape_all(&portal, &cfg).await;

    assert_eq!(outcomes[0].stop, StopReason::NoNextPage);
    assert_eq!(outcomes[0].rows, 0);
    assert!(outcomes[0].file.is_none());
    assert!(!dir.path().join(output_file_name(5)).exists());
}

#[tokio::test]
async fn test_exported_file_has_fixed_columns() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 3..=3);
    let portal = FakePortal::new(1, 2);

    let outcomes = scrape_all(&portal, &cfg).await;
    let path = outcomes[0].file.clone().expect("file written");

    let (_, range) = read_first_sheet(&path).unwrap();
    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect();

    assert_eq!(
        rows[0],
        vec!["Class", "Term", "Harmonised", "CGPDTM", "Harm", "Nice", "IDli", "Grou", "MGS"]
    );
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1][1], "c3-p1-r0");
    assert_eq!(rows[1][2], "✓");
    assert_eq!(rows[1][3], "Pending");
}

#[tokio::test]
async fn test_bootstrap_tolerates_missing_modal_and_filter() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 1..=1);
    let portal = FakePortal::new(1, 1)
        .without_disclaimer()
        .without_jurisdiction();

    bootstrap(&portal, &cfg).await.expect("warn-and-continue");

    assert_eq!(
        portal.calls(),
        vec![Call::DismissDisclaimer, Call::SelectJurisdiction]
    );
}

#[tokio::test]
async fn test_bootstrap_fail_fast_on_missing_filter() {
    let dir = TempDir::new().unwrap();
    let cfg = ScrapeConfig {
        jurisdiction: JurisdictionPolicy::FailFast,
        ..config(&dir, 1..=1)
    };
    let portal = FakePortal::new(1, 1).without_jurisdiction();

    let err = bootstrap(&portal, &cfg).await.unwrap_err();
    assert!(matches!(err, ScrapeError::JurisdictionRequired(_)));
}

#[tokio::test]
async fn test_bootstrap_fail_fast_passes_when_filter_applies() {
    let dir = TempDir::new().unwrap();
    let cfg = ScrapeConfig {
        jurisdiction: JurisdictionPolicy::FailFast,
        ..config(&dir, 1..=1)
    };
    let portal = FakePortal::new(1, 1);

    assert!(bootstrap(&portal, &cfg).await.is_ok());
}

#[cfg(test)]
mod tests {
    use crate::collector::{
        BrowserError, BrowserSession, CollectRequest, StopReason, collect_with_session,
        extract_company_name_from_url, generate_filename, is_within_recency_window,
    };
    use crate::config::Config;
    use crate::types::ReviewCollection;
    use async_trait::async_trait;
    use chrono::{DateTime, Local, NaiveDate, TimeZone};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    const LISTING: &str = "https://www.kununu.com/de/acme-gmbh/kommentare";
    const PAGE_2: &str = "https://www.kununu.com/de/acme-gmbh/kommentare/2";

    #[derive(Default)]
    struct SessionLog {
        navigations: Vec<String>,
        closed: bool,
    }

    /// Serves canned pages; unknown URLs fail like an unreachable host
    struct FakeSession {
        pages: HashMap<String, String>,
        current: Option<String>,
        log: Arc<Mutex<SessionLog>>,
    }

    impl FakeSession {
        fn new(pages: Vec<(&str, String)>) -> (Self, Arc<Mutex<SessionLog>>) {
            let log = Arc::new(Mutex::new(SessionLog::default()));
            let session = Self {
                pages: pages
                    .into_iter()
                    .map(|(url, html)| (url.to_string(), html))
                    .collect(),
                current: None,
                log: Arc::clone(&log),
            };
            (session, log)
        }
    }

    #[async_trait]
    impl BrowserSession for FakeSession {
        async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
            self.log.lock().unwrap().navigations.push(url.to_string());
            match self.pages.get(url) {
                Some(html) => {
                    self.current = Some(html.clone());
                    Ok(())
                }
                None => Err(BrowserError::Status {
                    url: url.to_string(),
                    status: 503,
                }),
            }
        }

        async fn page_source(&mut self) -> Result<String, BrowserError> {
            self.current.clone().ok_or(BrowserError::NoPage)
        }

        async fn close(&mut self) -> Result<(), BrowserError> {
            self.log.lock().unwrap().closed = true;
            Ok(())
        }
    }

    fn review_block(title: Option<&str>, datetime: &str) -> String {
        let title = title
            .map(|t| format!(r#"<h3 class="index__title__xakS9 h3-semibold">{}</h3>"#, t))
            .unwrap_or_default();
        format!(
            r#"<article class="index__reviewBlock__I8pdb">
                <span class="index__score__BktQY">3,5</span>
                {title}
                <time datetime="{datetime}"></time>
                <div class="index__factor__Mo6xW">
                    <h4 class="index__title__Rq0Po">Arbeitsatmosphäre</h4>
                    <p class="index__plainText__JgbHE">Text zu {datetime}</p>
                </div>
            </article>"#
        )
    }

    fn page(blocks: &[String], next: Option<&str>) -> String {
        let next = next
            .map(|href| format!(r#"<a class="index__button__2PFpW" href="{}">Mehr Bewertungen lesen</a>"#, href))
            .unwrap_or_default();
        format!("<html><body>{}{}</body></html>", blocks.concat(), next)
    }

    fn recent(title: &str) -> String {
        review_block(Some(title), "2025-05-02T09:00:00+02:00")
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn test_config(temp_dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.data_dir = temp_dir.path().join("data");
        config.collector.page_delay_ms = 0;
        config
    }

    fn request(max_reviews: usize) -> CollectRequest {
        CollectRequest {
            url: LISTING.to_string(),
            max_reviews,
            save_path: None,
        }
    }

    fn titles(collection: &ReviewCollection) -> Vec<String> {
        collection
            .reviews
            .iter()
            .map(|r| r.title.clone().unwrap_or_default())
            .collect()
    }

    fn ids(collection: &ReviewCollection) -> Vec<String> {
        collection.reviews.iter().map(|r| r.review_id.clone()).collect()
    }

    #[test]
    fn test_extract_company_name_from_url() {
        assert_eq!(
            extract_company_name_from_url("https://x.com/de/acme-gmbh/kommentare"),
            "acme-gmbh"
        );
        assert_eq!(
            extract_company_name_from_url("https://x.com/at/acme-gmbh/kommentare"),
            "unknown_company"
        );
        assert_eq!(extract_company_name_from_url("https://x.com/de/acme"), "unknown_company");
    }

    #[test]
    fn test_generate_filename() {
        assert_eq!(
            generate_filename("acme-gmbh", &now()),
            "scraped_reviews_acme-gmbh_20250615_120000.json"
        );
    }

    #[test]
    fn test_recency_window() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();

        assert!(is_within_recency_window(Some(2025), Some(1), today, 730));
        assert!(is_within_recency_window(Some(2023), Some(7), today, 730));
        assert!(!is_within_recency_window(Some(2023), Some(6), today, 730));
        assert!(!is_within_recency_window(Some(2020), None, today, 730));
        // unparseable dates never end the collection
        assert!(is_within_recency_window(None, None, today, 730));
        assert!(is_within_recency_window(Some(2020), Some(13), today, 730));
    }

    #[tokio::test]
    async fn test_collects_all_pages_when_under_limit() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let (session, log) = FakeSession::new(vec![
            (LISTING, page(&[recent("a"), recent("b")], Some("/de/acme-gmbh/kommentare/2"))),
            (PAGE_2, page(&[recent("c")], None)),
        ]);

        let report = collect_with_session(session, &config, request(100), now())
            .await
            .unwrap();

        assert_eq!(titles(&report.collection), vec!["a", "b", "c"]);
        assert_eq!(ids(&report.collection), vec!["acme-gmbh_1", "acme-gmbh_2", "acme-gmbh_3"]);
        assert_eq!(report.stop_reason, StopReason::Exhausted);
        assert_eq!(report.pages_visited, 2);
        assert_eq!(report.company, "acme-gmbh");
        assert!(report.collection.reviews.iter().all(|r| r.source_url == LISTING));

        let log = log.lock().unwrap();
        assert_eq!(log.navigations, vec![LISTING.to_string(), PAGE_2.to_string()]);
        assert!(log.closed);
    }

    #[tokio::test]
    async fn test_stops_at_max_reviews_in_page_order() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let blocks: Vec<String> = (1..=10).map(|i| recent(&format!("r{}", i))).collect();
        let (session, log) = FakeSession::new(vec![
            (LISTING, page(&blocks, Some("/de/acme-gmbh/kommentare/2"))),
            (PAGE_2, page(&[recent("never")], None)),
        ]);

        let report = collect_with_session(session, &config, request(5), now())
            .await
            .unwrap();

        assert_eq!(titles(&report.collection), vec!["r1", "r2", "r3", "r4", "r5"]);
        assert_eq!(report.stop_reason, StopReason::MaxReviews);
        assert_eq!(log.lock().unwrap().navigations.len(), 1);
    }

    #[tokio::test]
    async fn test_max_reached_at_page_end_does_not_paginate() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let (session, log) = FakeSession::new(vec![
            (LISTING, page(&[recent("a"), recent("b")], Some("/de/acme-gmbh/kommentare/2"))),
            (PAGE_2, page(&[recent("c")], None)),
        ]);

        let report = collect_with_session(session, &config, request(2), now())
            .await
            .unwrap();

        assert_eq!(report.collection.len(), 2);
        assert_eq!(report.stop_reason, StopReason::MaxReviews);
        assert_eq!(log.lock().unwrap().navigations, vec![LISTING.to_string()]);
    }

    #[tokio::test]
    async fn test_old_review_halts_collection() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let (session, log) = FakeSession::new(vec![
            (
                LISTING,
                page(
                    &[
                        recent("a"),
                        recent("b"),
                        review_block(Some("alt"), "2021-02-01T00:00:00Z"),
                        recent("after-old"),
                    ],
                    Some("/de/acme-gmbh/kommentare/2"),
                ),
            ),
            (PAGE_2, page(&[recent("c")], None)),
        ]);

        let report = collect_with_session(session, &config, request(100), now())
            .await
            .unwrap();

        assert_eq!(titles(&report.collection), vec!["a", "b"]);
        assert_eq!(report.stop_reason, StopReason::TooOld);
        assert_eq!(log.lock().unwrap().navigations.len(), 1);
    }

    #[tokio::test]
    async fn test_untitled_blocks_do_not_consume_ids() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let (session, _log) = FakeSession::new(vec![(
            LISTING,
            page(
                &[
                    recent("a"),
                    review_block(None, "2025-05-01T00:00:00Z"),
                    review_block(None, "2019-01-01T00:00:00Z"),
                    recent("b"),
                ],
                None,
            ),
        )]);

        let report = collect_with_session(session, &config, request(100), now())
            .await
            .unwrap();

        assert_eq!(titles(&report.collection), vec!["a", "b"]);
        assert_eq!(ids(&report.collection), vec!["acme-gmbh_1", "acme-gmbh_2"]);
    }

    #[tokio::test]
    async fn test_unparseable_dates_are_accepted() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let (session, _log) = FakeSession::new(vec![(
            LISTING,
            page(&[review_block(Some("ohne Datum"), "unbekannt"), recent("b")], None),
        )]);

        let report = collect_with_session(session, &config, request(100), now())
            .await
            .unwrap();

        assert_eq!(report.collection.len(), 2);
        assert_eq!(report.collection.reviews[0].year, None);
        assert_eq!(report.collection.reviews[0].month, None);
    }

    #[tokio::test]
    async fn test_failed_next_page_keeps_collected_reviews() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let (session, log) = FakeSession::new(vec![(
            LISTING,
            page(&[recent("a")], Some("/de/acme-gmbh/kommentare/2")),
        )]);

        let report = collect_with_session(session, &config, request(100), now())
            .await
            .unwrap();

        assert_eq!(titles(&report.collection), vec!["a"]);
        assert_eq!(report.stop_reason, StopReason::NavigationFailed);
        assert!(report.path.exists());
        assert!(log.lock().unwrap().closed);
    }

    #[tokio::test]
    async fn test_unreachable_first_page_is_fatal_and_closes_session() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let (session, log) = FakeSession::new(vec![]);

        let result = collect_with_session(session, &config, request(100), now()).await;

        assert!(result.is_err());
        assert!(log.lock().unwrap().closed);
        assert!(!config.data_dir.exists());
    }

    #[tokio::test]
    async fn test_persists_to_generated_path() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let (session, _log) = FakeSession::new(vec![(LISTING, page(&[recent("a")], None))]);

        let report = collect_with_session(session, &config, request(100), now())
            .await
            .unwrap();

        assert_eq!(
            report.path,
            config
                .data_dir
                .join("scraped_reviews_acme-gmbh_20250615_120000.json")
        );
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report.path).unwrap()).unwrap();
        let object = raw.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert_eq!(object[LISTING][0]["title"], "a");
        assert_eq!(object[LISTING][0]["overall_score"], 3.5);

        let reloaded = ReviewCollection::load(&report.path).await.unwrap();
        assert_eq!(reloaded, report.collection);
    }

    #[tokio::test]
    async fn test_explicit_save_path() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let target = temp_dir.path().join("custom/out.json");
        let (session, _log) = FakeSession::new(vec![(LISTING, page(&[recent("a")], None))]);

        let report = collect_with_session(
            session,
            &config,
            CollectRequest {
                url: LISTING.to_string(),
                max_reviews: 10,
                save_path: Some(target.clone()),
            },
            now(),
        )
        .await
        .unwrap();

        assert_eq!(report.path, target);
        assert!(target.exists());
    }
}

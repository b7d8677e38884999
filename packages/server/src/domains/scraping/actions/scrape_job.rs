//! Scrape job runner
//!
//! Drives one accepted scrape request to a terminal state:
//! `Running -> {Completed, Failed, QuotaExhausted}`. The job's [`StatusHandle`]
//! is the only writer of its status record; pollers see every step.
//!
//! Single mode fetches one page. Sitemap mode fetches the sitemap, then every
//! `<loc>` in order, pausing `page_delay` between fetches. Each page fetch costs
//! one unit of quota; URLs already stored are skipped before fetching and cost
//! nothing.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::domains::scraping::dedup::SaveOutcome;
use crate::domains::scraping::extractor::extract_page;
use crate::domains::scraping::models::{
    fits_url_column, JobState, NewScrapedEntry, ScrapeJobStatus, ScrapeMode, URL_MAX_CHARS,
};
use crate::domains::scraping::registry::StatusHandle;
use crate::domains::scraping::sitemap::parse_sitemap_locations;
use crate::kernel::ServerDeps;

pub const PLAN_LIMIT_MESSAGE: &str =
    "Your current plan doesn’t support fetching data from this URL — consider upgrading your plan.";

pub const EMPTY_SITEMAP_MESSAGE: &str = "No URLs found in the sitemap.";

/// An accepted scrape request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeJob {
    pub owner_id: String,
    pub target_url: String,
    pub mode: ScrapeMode,
    /// Page fetches this job may issue
    pub fetch_quota: u32,
}

impl ScrapeJob {
    /// Initial status record for this job
    pub fn initial_status(&self) -> ScrapeJobStatus {
        ScrapeJobStatus::starting(&self.owner_id, &self.target_url, self.mode, self.fetch_quota)
    }
}

/// What happened to one URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageOutcome {
    Saved,
    /// Stored before we fetched it
    AlreadyStored,
    /// Stored between our fetch and our write
    Duplicate,
    FetchFailed,
    /// Too long to store, so never fetched
    UrlTooLong,
    QuotaExhausted,
}

impl PageOutcome {
    fn fetched(self) -> bool {
        matches!(
            self,
            PageOutcome::Saved | PageOutcome::Duplicate | PageOutcome::FetchFailed
        )
    }
}

/// Run a job to completion. Returns the terminal status.
pub async fn run_scrape_job(job: ScrapeJob, status: StatusHandle, deps: ServerDeps) -> ScrapeJobStatus {
    info!(
        owner_id = %job.owner_id,
        url = %job.target_url,
        mode = %job.mode,
        fetch_quota = job.fetch_quota,
        "Scrape job started"
    );

    let final_status = match job.mode {
        ScrapeMode::Single => scrape_single_page(&job, &status, &deps).await,
        ScrapeMode::Sitemap => scrape_sitemap(&job, &status, &deps).await,
    };

    info!(
        owner_id = %job.owner_id,
        state = %final_status.state,
        pages_done = final_status.pages_done,
        pages_remaining = final_status.pages_remaining,
        total_characters = final_status.total_characters,
        error = ?final_status.last_error,
        "Scrape job finished"
    );

    final_status
}

async fn scrape_single_page(job: &ScrapeJob, status: &StatusHandle, deps: &ServerDeps) -> ScrapeJobStatus {
    if job.fetch_quota == 0 {
        warn!(owner_id = %job.owner_id, "No fetch quota left, refusing single-page scrape");
        return status.update(|s| s.fail(JobState::QuotaExhausted, PLAN_LIMIT_MESSAGE));
    }

    status.update(|s| {
        s.pages_remaining = 1;
        s.current_url = Some(job.target_url.clone());
    });

    let outcome = process_url(&job.target_url, job, status, deps).await;

    status.update(|s| {
        s.pages_done = 1;
        s.pages_remaining = 0;
        match outcome {
            Ok(PageOutcome::FetchFailed | PageOutcome::UrlTooLong) => s.finish(JobState::Failed),
            Ok(_) => s.finish(JobState::Completed),
            Err(e) => s.fail(
                JobState::Failed,
                format!("Error processing {}: {}", job.target_url, e),
            ),
        }
    })
}

async fn scrape_sitemap(job: &ScrapeJob, status: &StatusHandle, deps: &ServerDeps) -> ScrapeJobStatus {
    let sitemap = match deps.fetcher.fetch(&job.target_url).await {
        Ok(page) => page,
        Err(e) => {
            warn!(url = %job.target_url, error = %e, "Sitemap fetch failed");
            return status.update(|s| {
                s.fail(JobState::Failed, format!("Error during sitemap scraping: {}", e))
            });
        }
    };

    let urls = parse_sitemap_locations(&sitemap.body);
    if urls.is_empty() {
        warn!(url = %job.target_url, "Sitemap has no <loc> entries");
        return status.update(|s| s.fail(JobState::Failed, EMPTY_SITEMAP_MESSAGE));
    }

    info!(url = %job.target_url, url_count = urls.len(), "Sitemap parsed");
    status.update(|s| s.pages_remaining = urls.len() as u32);

    for (index, url) in urls.iter().enumerate() {
        status.update(|s| s.current_url = Some(url.clone()));

        let outcome = match process_url(url, job, status, deps).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(url = %url, error = %e, "Aborting sitemap scrape");
                return status.update(|s| {
                    s.fail(JobState::Failed, format!("Error processing {}: {}", url, e))
                });
            }
        };

        if outcome == PageOutcome::QuotaExhausted {
            info!(
                owner_id = %job.owner_id,
                remaining_urls = urls.len() - index,
                "Fetch quota exhausted"
            );
            return status.update(|s| s.fail(JobState::QuotaExhausted, PLAN_LIMIT_MESSAGE));
        }

        status.update(|s| {
            s.pages_done += 1;
            s.pages_remaining = s.pages_remaining.saturating_sub(1);
        });

        let more_to_go = index + 1 < urls.len();
        if outcome.fetched() && more_to_go && !deps.scrape_settings.page_delay.is_zero() {
            tokio::time::sleep(deps.scrape_settings.page_delay).await;
        }
    }

    status.update(|s| {
        s.last_error = None;
        s.finish(JobState::Completed);
    })
}

/// Check, fetch, extract and save one URL.
///
/// Soft failures (fetch errors, duplicates) are written to `last_error` and
/// reported as outcomes. `Err` means the store is unusable.
async fn process_url(
    url: &str,
    job: &ScrapeJob,
    status: &StatusHandle,
    deps: &ServerDeps,
) -> Result<PageOutcome> {
    let dedup = deps.dedup();

    if !fits_url_column(url) {
        warn!(url_chars = url.chars().count(), "URL too long to store, skipping");
        status.update(|s| s.last_error = Some(too_long_message(url)));
        return Ok(PageOutcome::UrlTooLong);
    }

    if dedup.exists(url).await? {
        debug!(url = %url, "URL already stored, skipping fetch");
        status.update(|s| s.last_error = Some(format!("Skipped scrape for existing URL: {}", url)));
        return Ok(PageOutcome::AlreadyStored);
    }

    let mut has_quota = false;
    status.update(|s| {
        if s.fetch_quota_remaining > 0 {
            s.fetch_quota_remaining -= 1;
            has_quota = true;
        }
    });
    if !has_quota {
        return Ok(PageOutcome::QuotaExhausted);
    }

    let fetched = match deps.fetcher.fetch(url).await {
        Ok(page) => page,
        Err(e) => {
            warn!(url = %url, error = %e, "Page fetch failed");
            status.update(|s| s.last_error = Some(format!("Error processing {}: {}", url, e)));
            return Ok(PageOutcome::FetchFailed);
        }
    };

    let page = extract_page(&fetched.body, &fetched.url);
    let characters = page.char_count() as u64;
    status.update(|s| s.total_characters += characters);

    let entry = NewScrapedEntry::from_page(&page, &job.owner_id, job.mode);
    if !fits_url_column(&entry.url) {
        warn!(url = %url, "Redirect target too long to store");
        status.update(|s| s.last_error = Some(too_long_message(&entry.url)));
        return Ok(PageOutcome::FetchFailed);
    }

    match dedup.save(&entry).await? {
        SaveOutcome::Saved => {
            info!(url = %entry.url, characters, "Page scraped");
            Ok(PageOutcome::Saved)
        }
        SaveOutcome::Duplicate => {
            status.update(|s| s.last_error = Some(format!("Skipped duplicate URL: {}", url)));
            Ok(PageOutcome::Duplicate)
        }
    }
}

fn too_long_message(url: &str) -> String {
    let head: String = url.chars().take(100).collect();
    format!("Skipped URL longer than {} characters: {}...", URL_MAX_CHARS, head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::kernel::test_dependencies::{InMemoryScrapedEntryStore, MockPageFetcher};
    use crate::kernel::TestDependencies;

    const SITEMAP: &str = "https://blog.dev/sitemap.xml";

    fn job(mode: ScrapeMode, url: &str, quota: u32) -> ScrapeJob {
        ScrapeJob {
            owner_id: "42".to_string(),
            target_url: url.to_string(),
            mode,
            fetch_quota: quota,
        }
    }

    async fn run(test_deps: &TestDependencies, job: ScrapeJob) -> ScrapeJobStatus {
        let deps = test_deps.clone().into_server_deps();
        let handle = deps.scrape_jobs.try_register(job.initial_status()).unwrap();
        let final_status = run_scrape_job(job, handle, deps.clone()).await;
        assert_eq!(deps.scrape_jobs.get("42"), Some(final_status.clone()));
        final_status
    }

    #[tokio::test]
    async fn test_single_page_saves_entry() {
        let test_deps = TestDependencies::new().mock_fetcher(
            MockPageFetcher::new().with_html("https://blog.dev/post/", "Post", "Hello world"),
        );

        let status = run(&test_deps, job(ScrapeMode::Single, "https://blog.dev/post/", 3)).await;

        assert_eq!(status.state, JobState::Completed);
        assert!(!status.is_running());
        assert_eq!(status.pages_done, 1);
        assert_eq!(status.pages_remaining, 0);
        assert_eq!(status.fetch_quota_remaining, 2);
        assert!(status.total_characters > 0);
        assert!(status.finished_at.is_some());
        assert_eq!(test_deps.store.urls(), vec!["https://blog.dev/post".to_string()]);
    }

    #[tokio::test]
    async fn test_single_page_zero_quota_never_fetches() {
        let test_deps = TestDependencies::new().mock_fetcher(
            MockPageFetcher::new().with_html("https://blog.dev/post", "Post", "Hello"),
        );

        let status = run(&test_deps, job(ScrapeMode::Single, "https://blog.dev/post", 0)).await;

        assert_eq!(status.state, JobState::QuotaExhausted);
        assert!(!status.is_running());
        assert_eq!(status.last_error.as_deref(), Some(PLAN_LIMIT_MESSAGE));
        assert_eq!(test_deps.fetcher.call_count(), 0);
        assert!(test_deps.store.insert_calls().is_empty());
        assert!(test_deps.store.is_empty());
    }

    #[tokio::test]
    async fn test_single_page_fetch_failure_fails_job() {
        let test_deps = TestDependencies::new().mock_fetcher(
            MockPageFetcher::new().with_failure("https://blog.dev/down", "connection refused"),
        );

        let status = run(&test_deps, job(ScrapeMode::Single, "https://blog.dev/down", 1)).await;

        assert_eq!(status.state, JobState::Failed);
        assert_eq!(status.pages_remaining, 0);
        assert_eq!(
            status.last_error.as_deref(),
            Some("Error processing https://blog.dev/down: connection refused")
        );
        assert!(test_deps.store.is_empty());
    }

    #[tokio::test]
    async fn test_single_page_already_stored_skips_fetch() {
        let test_deps = TestDependencies::new()
            .mock_store(InMemoryScrapedEntryStore::new().with_entry("https://blog.dev/post", "old"))
            .mock_fetcher(MockPageFetcher::new().with_html("https://blog.dev/post", "Post", "new"));

        let status = run(&test_deps, job(ScrapeMode::Single, "https://blog.dev/post/", 1)).await;

        assert_eq!(status.state, JobState::Completed);
        assert_eq!(
            status.last_error.as_deref(),
            Some("Skipped scrape for existing URL: https://blog.dev/post/")
        );
        assert_eq!(status.fetch_quota_remaining, 1);
        assert_eq!(test_deps.fetcher.call_count(), 0);
        assert_eq!(test_deps.store.len(), 1);
    }

    #[tokio::test]
    async fn test_single_page_store_down_fails_job() {
        let test_deps = TestDependencies::new()
            .mock_store(InMemoryScrapedEntryStore::new().failing())
            .mock_fetcher(MockPageFetcher::new().with_html("https://blog.dev/a", "A", "a"));

        let status = run(&test_deps, job(ScrapeMode::Single, "https://blog.dev/a", 1)).await;

        assert_eq!(status.state, JobState::Failed);
        assert!(status
            .last_error
            .unwrap()
            .starts_with("Error processing https://blog.dev/a:"));
    }

    #[tokio::test]
    async fn test_sitemap_scrapes_every_url_in_order() {
        let test_deps = TestDependencies::new().mock_fetcher(
            MockPageFetcher::new()
                .with_sitemap(SITEMAP, &["https://blog.dev/a", "https://blog.dev/b", "https://blog.dev/c"])
                .with_html("https://blog.dev/a", "A", "alpha")
                .with_html("https://blog.dev/b", "B", "beta")
                .with_html("https://blog.dev/c", "C", "gamma"),
        );

        let status = run(&test_deps, job(ScrapeMode::Sitemap, SITEMAP, 10)).await;

        assert_eq!(status.state, JobState::Completed);
        assert_eq!(status.pages_done, 3);
        assert_eq!(status.pages_remaining, 0);
        assert_eq!(status.fetch_quota_remaining, 7);
        assert_eq!(status.last_error, None);
        assert_eq!(status.current_url.as_deref(), Some("https://blog.dev/c"));
        assert_eq!(
            test_deps.fetcher.calls(),
            vec![SITEMAP, "https://blog.dev/a", "https://blog.dev/b", "https://blog.dev/c"]
        );
        assert_eq!(test_deps.store.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_sitemap_fails() {
        let test_deps = TestDependencies::new()
            .mock_fetcher(MockPageFetcher::new().with_sitemap(SITEMAP, &[]));

        let status = run(&test_deps, job(ScrapeMode::Sitemap, SITEMAP, 10)).await;

        assert_eq!(status.state, JobState::Failed);
        assert!(!status.is_running());
        assert_eq!(status.last_error.as_deref(), Some(EMPTY_SITEMAP_MESSAGE));
        assert_eq!(test_deps.fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_sitemap_fails() {
        let test_deps = TestDependencies::new()
            .mock_fetcher(MockPageFetcher::new().with_failure(SITEMAP, "timed out"));

        let status = run(&test_deps, job(ScrapeMode::Sitemap, SITEMAP, 10)).await;

        assert_eq!(status.state, JobState::Failed);
        assert_eq!(
            status.last_error.as_deref(),
            Some("Error during sitemap scraping: timed out")
        );
    }

    #[tokio::test]
    async fn test_sitemap_page_failure_does_not_abort() {
        let test_deps = TestDependencies::new().mock_fetcher(
            MockPageFetcher::new()
                .with_sitemap(SITEMAP, &["https://blog.dev/a", "https://blog.dev/broken", "https://blog.dev/c"])
                .with_html("https://blog.dev/a", "A", "alpha")
                .with_failure("https://blog.dev/broken", "HTTP 500")
                .with_html("https://blog.dev/c", "C", "gamma"),
        );

        let status = run(&test_deps, job(ScrapeMode::Sitemap, SITEMAP, 10)).await;

        assert_eq!(status.state, JobState::Completed);
        assert_eq!(status.pages_done, 3);
        assert!(test_deps.fetcher.was_fetched("https://blog.dev/c"));
        assert_eq!(
            test_deps.store.urls(),
            vec!["https://blog.dev/a".to_string(), "https://blog.dev/c".to_string()]
        );
    }

    #[tokio::test]
    async fn test_sitemap_duplicate_locs_saved_once() {
        let test_deps = TestDependencies::new().mock_fetcher(
            MockPageFetcher::new()
                .with_sitemap(SITEMAP, &["https://blog.dev/a", "https://blog.dev/a/"])
                .with_html("https://blog.dev/a", "A", "alpha"),
        );

        let status = run(&test_deps, job(ScrapeMode::Sitemap, SITEMAP, 10)).await;

        assert_eq!(status.state, JobState::Completed);
        assert_eq!(status.pages_done, 2);
        // Second loc is caught by the early check, so it is not fetched or charged
        assert_eq!(test_deps.fetcher.calls(), vec![SITEMAP, "https://blog.dev/a"]);
        assert_eq!(status.fetch_quota_remaining, 9);
        assert_eq!(test_deps.store.count_for_url("https://blog.dev/a"), 1);
    }

    #[tokio::test]
    async fn test_sitemap_stops_when_quota_runs_out() {
        let test_deps = TestDependencies::new().mock_fetcher(
            MockPageFetcher::new()
                .with_sitemap(SITEMAP, &["https://blog.dev/a", "https://blog.dev/b", "https://blog.dev/c"])
                .with_html("https://blog.dev/a", "A", "alpha")
                .with_html("https://blog.dev/b", "B", "beta")
                .with_html("https://blog.dev/c", "C", "gamma"),
        );

        let status = run(&test_deps, job(ScrapeMode::Sitemap, SITEMAP, 2)).await;

        assert_eq!(status.state, JobState::QuotaExhausted);
        assert_eq!(status.last_error.as_deref(), Some(PLAN_LIMIT_MESSAGE));
        assert_eq!(status.pages_done, 2);
        assert_eq!(status.pages_remaining, 1);
        assert_eq!(status.fetch_quota_remaining, 0);
        assert!(!test_deps.fetcher.was_fetched("https://blog.dev/c"));
        assert_eq!(test_deps.store.len(), 2);
    }

    #[tokio::test]
    async fn test_sitemap_quota_matching_url_count_completes() {
        let test_deps = TestDependencies::new().mock_fetcher(
            MockPageFetcher::new()
                .with_sitemap(SITEMAP, &["https://blog.dev/a", "https://blog.dev/b"])
                .with_html("https://blog.dev/a", "A", "alpha")
                .with_html("https://blog.dev/b", "B", "beta"),
        );

        let status = run(&test_deps, job(ScrapeMode::Sitemap, SITEMAP, 2)).await;

        assert_eq!(status.state, JobState::Completed);
        assert_eq!(status.fetch_quota_remaining, 0);
    }

    #[tokio::test]
    async fn test_sitemap_store_failure_aborts_loop() {
        let test_deps = TestDependencies::new()
            .mock_store(InMemoryScrapedEntryStore::new().failing())
            .mock_fetcher(
                MockPageFetcher::new()
                    .with_sitemap(SITEMAP, &["https://blog.dev/a", "https://blog.dev/b"])
                    .with_html("https://blog.dev/a", "A", "alpha")
                    .with_html("https://blog.dev/b", "B", "beta"),
            );

        let status = run(&test_deps, job(ScrapeMode::Sitemap, SITEMAP, 10)).await;

        assert_eq!(status.state, JobState::Failed);
        assert!(!status.is_running());
        assert_eq!(status.pages_done, 0);
        assert_eq!(status.pages_remaining, 2);
        assert!(!test_deps.fetcher.was_fetched("https://blog.dev/b"));
    }

    #[tokio::test]
    async fn test_sitemap_lost_race_reports_duplicate() {
        let test_deps = TestDependencies::new()
            .mock_store(InMemoryScrapedEntryStore::new().with_hidden_existing("https://blog.dev/a"))
            .mock_fetcher(
                MockPageFetcher::new()
                    .with_sitemap(SITEMAP, &["https://blog.dev/a"])
                    .with_html("https://blog.dev/a", "A", "alpha"),
            );

        let status = run(&test_deps, job(ScrapeMode::Sitemap, SITEMAP, 10)).await;

        // Completed sitemaps clear the informational message
        assert_eq!(status.state, JobState::Completed);
        assert_eq!(status.pages_done, 1);
        assert_eq!(status.last_error, None);
        assert!(test_deps.store.is_empty());
        assert_eq!(test_deps.store.insert_calls(), vec!["https://blog.dev/a".to_string()]);
    }

    fn three_page_sitemap() -> MockPageFetcher {
        MockPageFetcher::new()
            .with_sitemap(SITEMAP, &["https://blog.dev/a", "https://blog.dev/b", "https://blog.dev/c"])
            .with_html("https://blog.dev/a", "A", "alpha")
            .with_html("https://blog.dev/b", "B", "beta")
            .with_html("https://blog.dev/c", "C", "gamma")
    }

    #[tokio::test(start_paused = true)]
    async fn test_sitemap_pauses_between_fetches_only() {
        let delay = Duration::from_millis(200);
        let test_deps = TestDependencies::new()
            .mock_fetcher(three_page_sitemap())
            .page_delay(delay);

        let started = tokio::time::Instant::now();
        let status = run(&test_deps, job(ScrapeMode::Sitemap, SITEMAP, 10)).await;
        let elapsed = started.elapsed();

        assert_eq!(status.state, JobState::Completed);
        // Two pauses: after a and after b, none after the last page
        assert!(elapsed >= delay * 2, "elapsed {:?}", elapsed);
        assert!(elapsed < delay * 3, "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sitemap_skips_do_not_pause() {
        let delay = Duration::from_millis(200);
        let test_deps = TestDependencies::new()
            .mock_store(InMemoryScrapedEntryStore::new().with_entry("https://blog.dev/b", "beta"))
            .mock_fetcher(three_page_sitemap())
            .page_delay(delay);

        let started = tokio::time::Instant::now();
        let status = run(&test_deps, job(ScrapeMode::Sitemap, SITEMAP, 10)).await;
        let elapsed = started.elapsed();

        assert_eq!(status.state, JobState::Completed);
        assert!(!test_deps.fetcher.was_fetched("https://blog.dev/b"));
        // Only the pause after a; b was skipped and c is last
        assert!(elapsed >= delay, "elapsed {:?}", elapsed);
        assert!(elapsed < delay * 2, "elapsed {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_sitemap_overlong_url_skipped_without_fetch() {
        let long_url = format!("https://blog.dev/{}", "x".repeat(URL_MAX_CHARS));
        let test_deps = TestDependencies::new().mock_fetcher(
            MockPageFetcher::new()
                .with_sitemap(SITEMAP, &[long_url.as_str(), "https://blog.dev/a"])
                .with_html(&long_url, "Long", "long")
                .with_html("https://blog.dev/a", "A", "alpha"),
        );

        let status = run(&test_deps, job(ScrapeMode::Sitemap, SITEMAP, 10)).await;

        assert_eq!(status.state, JobState::Completed);
        assert_eq!(status.pages_done, 2);
        assert_eq!(status.fetch_quota_remaining, 9);
        assert!(!test_deps.fetcher.was_fetched(&long_url));
        assert_eq!(test_deps.store.urls(), vec!["https://blog.dev/a".to_string()]);
    }

    #[tokio::test]
    async fn test_single_page_overlong_url_fails_without_fetch() {
        let long_url = format!("https://blog.dev/{}", "x".repeat(URL_MAX_CHARS));
        let test_deps = TestDependencies::new()
            .mock_fetcher(MockPageFetcher::new().with_html(&long_url, "Long", "long"));

        let status = run(&test_deps, job(ScrapeMode::Single, &long_url, 1)).await;

        assert_eq!(status.state, JobState::Failed);
        assert!(status
            .last_error
            .unwrap()
            .starts_with("Skipped URL longer than 2000 characters: https://blog.dev/xxx"));
        assert_eq!(test_deps.fetcher.call_count(), 0);
        assert!(test_deps.store.insert_calls().is_empty());
    }
}

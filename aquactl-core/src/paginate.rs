//! Generic pagination draining.
//!
//! Every listing endpoint in the platform is paginated, with slightly
//! different conventions: some report a total count, some a "next page"
//! marker, some neither. [`drain_pages`] unifies the ad hoc per-endpoint
//! loops behind one contract; each endpoint only supplies a page-fetch
//! function via [`PageSource`].

use async_trait::async_trait;
use thiserror::Error;
use tracing::trace;

/// A paginated read failed.
///
/// Carries the page number for context; the fetch is never retried
/// internally. Retry policy, if any, belongs to the caller.
#[derive(Debug, Error)]
#[error("fetching page {page} failed: {message}")]
pub struct FetchError {
    pub page: u32,
    pub message: String,
}

impl FetchError {
    pub fn new(page: u32, message: impl Into<String>) -> Self {
        Self {
            page,
            message: message.into(),
        }
    }
}

/// One page of results.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,

    /// Total record count as reported by the endpoint, when it reports
    /// one. Only ever used as a stop signal, never as a reason to keep
    /// fetching, so an inconsistent total cannot cause an infinite loop.
    pub total: Option<u64>,

    /// Explicit "more pages" signal for endpoints that report one
    /// (`Some(false)` terminates the drain).
    pub has_more: Option<bool>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            total: None,
            has_more: None,
        }
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    pub fn with_has_more(mut self, has_more: bool) -> Self {
        self.has_more = Some(has_more);
        self
    }
}

/// A paginated list endpoint.
///
/// Pages are numbered from 1, matching the platform API.
#[async_trait]
pub trait PageSource {
    type Item;

    async fn fetch_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Self::Item>, FetchError>;
}

/// Drain a paginated endpoint into a complete in-memory sequence.
///
/// Item order matches page-retrieval order. `progress` is invoked once per
/// fetched page with the cumulative item count; firing it is the only
/// externally observable side effect of the drain.
///
/// Termination: an empty page, a page shorter than `page_size`, an
/// explicit `has_more == false`, or the reported total being reached —
/// whichever the underlying endpoint contract produces first.
pub async fn drain_pages<S>(
    source: &S,
    page_size: u32,
    mut progress: impl FnMut(usize) + Send,
) -> Result<Vec<S::Item>, FetchError>
where
    S: PageSource + Sync + ?Sized,
{
    let mut all = Vec::new();
    let mut page: u32 = 1;

    loop {
        trace!(page, page_size, "fetching page");
        let fetched = source.fetch_page(page, page_size).await?;
        let count = fetched.items.len();

        all.extend(fetched.items);
        progress(all.len());

        if count == 0 || (count as u32) < page_size {
            break;
        }
        if fetched.has_more == Some(false) {
            break;
        }
        if let Some(total) = fetched.total {
            if all.len() as u64 >= total {
                break;
            }
        }

        page += 1;
    }

    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// A source producing pages of fixed sizes, recording fetch calls.
    struct FixedPages {
        sizes: Vec<usize>,
        total: Option<u64>,
        fetches: Mutex<Vec<u32>>,
    }

    impl FixedPages {
        fn new(sizes: &[usize]) -> Self {
            Self {
                sizes: sizes.to_vec(),
                total: None,
                fetches: Mutex::new(Vec::new()),
            }
        }

        fn with_total(mut self, total: u64) -> Self {
            self.total = Some(total);
            self
        }

        fn fetch_count(&self) -> usize {
            self.fetches.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PageSource for FixedPages {
        type Item = u64;

        async fn fetch_page(
            &self,
            page: u32,
            _page_size: u32,
        ) -> Result<Page<u64>, FetchError> {
            self.fetches.lock().unwrap().push(page);

            let size = self
                .sizes
                .get((page - 1) as usize)
                .copied()
                .unwrap_or(0);
            let start = self.sizes[..(page - 1) as usize]
                .iter()
                .sum::<usize>() as u64;
            let items = (start..start + size as u64).collect();

            let mut result = Page::new(items);
            if let Some(total) = self.total {
                result = result.with_total(total);
            }
            Ok(result)
        }
    }

    #[tokio::test]
    async fn drains_all_pages_and_terminates_on_short_page() {
        let source = FixedPages::new(&[100, 100, 37]);
        let mut progress_calls = Vec::new();

        let items = drain_pages(&source, 100, |n| progress_calls.push(n))
            .await
            .unwrap();

        assert_eq!(items.len(), 237);
        assert_eq!(source.fetch_count(), 3);
        assert_eq!(progress_calls, vec![100, 200, 237]);
        // Order matches page-retrieval order.
        assert_eq!(items[0], 0);
        assert_eq!(items[236], 236);
    }

    #[tokio::test]
    async fn terminates_on_empty_first_page() {
        let source = FixedPages::new(&[]);
        let items = drain_pages(&source, 100, |_| {}).await.unwrap();
        assert!(items.is_empty());
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn stops_when_total_reached_despite_full_pages() {
        // Endpoint keeps producing full pages but reports a total of 200:
        // the drain must stop at the total instead of looping forever.
        let source = FixedPages::new(&[100, 100, 100, 100]).with_total(200);
        let items = drain_pages(&source, 100, |_| {}).await.unwrap();
        assert_eq!(items.len(), 200);
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn inconsistent_total_is_not_a_continue_signal() {
        // Total claims 1000 but the backend runs out after 150 items; the
        // short page terminates the drain.
        let source = FixedPages::new(&[100, 50]).with_total(1000);
        let items = drain_pages(&source, 100, |_| {}).await.unwrap();
        assert_eq!(items.len(), 150);
        assert_eq!(source.fetch_count(), 2);
    }

    struct MarkerPages;

    #[async_trait]
    impl PageSource for MarkerPages {
        type Item = u32;

        async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Page<u32>, FetchError> {
            // Always-full pages, but the marker says page 2 is the last.
            let items = vec![0; page_size as usize];
            Ok(Page::new(items).with_has_more(page < 2))
        }
    }

    #[tokio::test]
    async fn explicit_no_next_page_marker_terminates() {
        let items = drain_pages(&MarkerPages, 50, |_| {}).await.unwrap();
        assert_eq!(items.len(), 100);
    }

    struct FailingSource;

    #[async_trait]
    impl PageSource for FailingSource {
        type Item = u32;

        async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Page<u32>, FetchError> {
            if page < 3 {
                Ok(Page::new(vec![0; page_size as usize]))
            } else {
                Err(FetchError::new(page, "HTTP 500: internal error"))
            }
        }
    }

    #[tokio::test]
    async fn fetch_failure_carries_page_number() {
        let err = drain_pages(&FailingSource, 10, |_| {}).await.unwrap_err();
        assert_eq!(err.page, 3);
        assert!(err.to_string().contains("page 3"));
    }
}

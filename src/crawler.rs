use crate::network::fetch_page;
use crate::options::Cli;
use crate::storage::Disc;
use crate::utils;
use console::style;
use futures::future::join_all;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::num::NonZeroU32;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use url::Url;

/// One crawled page: its final status, timing, and the same-host links
/// discovered in its body (in document order, duplicates kept).
#[derive(Debug)]
pub struct PageResult {
    pub url: Url,
    pub status: StatusCode,
    pub response_time: Duration,
    pub size: usize,
    pub links: Vec<Url>,
}

/// Everything the crawl produced, in the order the pages were fetched.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub pages: Vec<PageResult>,
    pub stored_documents: usize,
    pub stored_bytes: usize,
    pub fetch_failures: usize,
    pub storage_failures: usize,
    pub total_time: Duration,
}

impl CrawlOutcome {
    /// Determines the process exit code for this run.
    ///
    /// - `0` — every page was fetched and stored.
    /// - `1` — one or more pages returned 4xx/5xx (including synthetic
    ///   transport statuses) or failed to reach the disk.
    pub fn exit_code(&self) -> ExitCode {
        if self.fetch_failures > 0 || self.storage_failures > 0 {
            ExitCode::from(1)
        } else {
            ExitCode::SUCCESS
        }
    }
}

/// Crawls the site breadth-first from the root URL.
///
/// Fetches run concurrently behind a semaphore (and the optional rate
/// limiter); the frontier bookkeeping happens on the coordinating task
/// between depth levels, so the visited set needs no locking. Every fetched
/// document is stored through [`Disc`] as it arrives; storage failures are
/// reported and counted but do not stop the crawl.
pub async fn crawl(client: Arc<Client>, disc: Arc<Disc>, options: &Cli) -> CrawlOutcome {
    let started = Instant::now();
    let semaphore = Arc::new(Semaphore::new(options.concurrency_limit as usize));
    let limiter: Option<Arc<DefaultDirectRateLimiter>> = options.rate_limit.map(|per_minute| {
        let quota = Quota::per_minute(NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN));
        Arc::new(RateLimiter::direct(quota))
    });

    let progress = indicatif::ProgressBar::new_spinner();
    progress.set_style(
        indicatif::ProgressStyle::default_spinner()
            .template("📥 [{elapsed_precise}] Crawled {pos} pages {msg}")
            .unwrap(),
    );
    progress.enable_steady_tick(Duration::from_millis(100));

    let root = options.root_url.clone();
    let mut visited: HashSet<Url> = HashSet::new();
    visited.insert(root.clone());
    let mut frontier = vec![root];

    let mut pages = Vec::new();
    let mut stored_documents = 0;
    let mut stored_bytes = 0;
    let mut fetch_failures = 0;
    let mut storage_failures = 0;

    let mut depth = 0;
    while !frontier.is_empty() && depth <= options.max_depth {
        let fetches: Vec<_> = frontier
            .drain(..)
            .map(|url| {
                let client = Arc::clone(&client);
                let disc = Arc::clone(&disc);
                let semaphore = Arc::clone(&semaphore);
                let limiter = limiter.clone();
                let progress = progress.clone();
                let append_timestamp = options.append_timestamp;

                tokio::spawn(async move {
                    let _permit = semaphore.acquire().await.expect("Semaphore closed");
                    if let Some(limiter) = &limiter {
                        limiter.until_ready().await;
                    }
                    progress.set_message(format!(
                        "- {}",
                        utils::truncate_message(url.as_str(), 60)
                    ));

                    let fetch_url = if append_timestamp {
                        with_cache_bust(&url)
                    } else {
                        url.clone()
                    };
                    let fetched = fetch_page(&fetch_url, &client).await?;

                    let links = if fetched.is_html {
                        extract_links(&fetched.body, &url)
                    } else {
                        Vec::new()
                    };

                    let stored = match disc.store(&url, &fetched.body).await {
                        Ok(_) => Some(fetched.body.len()),
                        Err(e) => {
                            progress
                                .suspend(|| eprintln!("{} {}", style("[ERROR]").red(), e));
                            None
                        }
                    };
                    progress.inc(1);

                    Ok::<_, reqwest::Error>((
                        PageResult {
                            url,
                            status: fetched.status,
                            response_time: fetched.response_time,
                            size: fetched.size,
                            links,
                        },
                        stored,
                    ))
                })
            })
            .collect();

        let mut next_frontier = Vec::new();
        for joined in join_all(fetches).await {
            match joined {
                Ok(Ok((page, stored))) => {
                    match stored {
                        Some(bytes) => {
                            stored_documents += 1;
                            stored_bytes += bytes;
                        }
                        None => storage_failures += 1,
                    }
                    if page.status.is_client_error() || page.status.is_server_error() {
                        fetch_failures += 1;
                    }
                    for link in &page.links {
                        if visited.len() >= options.max_pages {
                            break;
                        }
                        if visited.insert(link.clone()) {
                            next_frontier.push(link.clone());
                        }
                    }
                    pages.push(page);
                }
                Ok(Err(e)) => {
                    fetch_failures += 1;
                    progress.suspend(|| eprintln!("{} {}", style("[ERROR]").red(), e));
                }
                Err(e) => {
                    fetch_failures += 1;
                    progress.suspend(|| {
                        eprintln!("{} Fetch task failed: {}", style("[ERROR]").red(), e)
                    });
                }
            }
        }

        frontier = next_frontier;
        depth += 1;
    }
    progress.finish_and_clear();

    CrawlOutcome {
        pages,
        stored_documents,
        stored_bytes,
        fetch_failures,
        storage_failures,
        total_time: started.elapsed(),
    }
}

/// Extracts the same-host links from an HTML body, resolved against the
/// page URL. Skips fragments, `javascript:`, `mailto:` and `tel:` targets;
/// fragments are stripped from what remains. Document order and duplicates
/// are preserved, matching what the link graph expects.
fn extract_links(html: &str, page_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").unwrap();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
        {
            continue;
        }
        let Ok(mut resolved) = page_url.join(href) else {
            continue;
        };
        resolved.set_fragment(None);
        if resolved.host_str() == page_url.host_str()
            && matches!(resolved.scheme(), "http" | "https")
        {
            links.push(resolved);
        }
    }

    links
}

fn with_cache_bust(url: &Url) -> Url {
    let mut busted = url.clone();
    busted
        .query_pairs_mut()
        .append_pair("ts", &utils::generate_random_number(10).to_string());
    busted
}

//! Fetch scheduler: download every slide image under bounded concurrency.
//!
//! Slides are grouped into consecutive chunks of `chunk_width`. Each chunk
//! asks the [`ProxySource`] for exactly one proxy and every request of the
//! chunk goes through it. Two execution modes exist (see
//! [`Scheduling`]):
//!
//! * **Rolling**: a fixed-width pool; a chunk's proxy is acquired when its
//!   first slide is pulled, and a slide starts as soon as a slot frees up.
//! * **ChunkBarrier**: one tokio task per slide of the chunk, joined before
//!   the next chunk starts.
//!
//! Results land in a [`SlideStore`]. Its lock is taken only for the insert,
//! never across network I/O. The first failing slide aborts the rest of the
//! request.

use crate::config::{DeckConfig, Scheduling};
use crate::error::DeckError;
use crate::pipeline::normalize::{normalize_image, NormalizedImage};
use crate::pipeline::template::{FetchJob, SlideUrlTemplate};
use crate::progress::ProgressCallback;
use crate::proxy::ProxySource;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Insert-only, index-keyed collection of normalised slides.
#[derive(Debug, Default)]
pub struct SlideStore {
    slides: Mutex<HashMap<u32, NormalizedImage>>,
}

impl SlideStore {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            slides: Mutex::new(HashMap::with_capacity(n)),
        }
    }

    /// Store slide `index`. Each index may be inserted once.
    pub fn insert(&self, index: u32, image: NormalizedImage) -> Result<(), DeckError> {
        let mut slides = self
            .slides
            .lock()
            .map_err(|_| DeckError::Internal("slide store lock poisoned".into()))?;
        if slides.contains_key(&index) {
            return Err(DeckError::Internal(format!("slide {index} stored twice")));
        }
        slides.insert(index, image);
        Ok(())
    }

    pub fn into_map(self) -> Result<HashMap<u32, NormalizedImage>, DeckError> {
        self.slides
            .into_inner()
            .map_err(|_| DeckError::Internal("slide store lock poisoned".into()))
    }
}

/// Split jobs into consecutive chunks of at most `width` jobs.
pub fn plan_chunks(jobs: Vec<FetchJob>, width: usize) -> Vec<Vec<FetchJob>> {
    let width = width.max(1);
    let mut chunks = Vec::with_capacity(jobs.len().div_ceil(width));
    let mut jobs = jobs.into_iter().peekable();
    while jobs.peek().is_some() {
        chunks.push(jobs.by_ref().take(width).collect());
    }
    chunks
}

/// What [`FetchScheduler::fetch_all`] hands back.
#[derive(Debug)]
pub struct FetchReport {
    pub images: HashMap<u32, NormalizedImage>,
    pub chunks: usize,
    pub elapsed_ms: u64,
}

/// An HTTP client bound to one chunk's proxy.
#[derive(Debug, Clone)]
pub struct SlideFetcher {
    client: reqwest::Client,
    proxy: Option<String>,
    timeout_secs: u64,
    max_bytes: u64,
    jpeg_quality: u8,
}

impl SlideFetcher {
    pub fn new(proxy: Option<String>, config: &DeckConfig) -> Result<Self, DeckError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.slide_timeout_secs))
            .user_agent(config.user_agent.as_str());

        builder = match proxy.as_deref() {
            Some(url) => builder.proxy(reqwest::Proxy::all(url).map_err(|e| {
                DeckError::ProxyUnavailable {
                    reason: format!("invalid proxy '{url}': {e}"),
                }
            })?),
            None => builder.no_proxy(),
        };

        let client = builder
            .build()
            .map_err(|e| DeckError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            proxy,
            timeout_secs: config.slide_timeout_secs,
            max_bytes: config.max_slide_bytes,
            jpeg_quality: config.jpeg_quality,
        })
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    /// Download and normalise one slide.
    pub async fn fetch(&self, job: &FetchJob) -> Result<NormalizedImage, DeckError> {
        let blob = self.download(job).await?;

        match self.proxy() {
            Some(p) => info!("Downloaded {} using proxy {}", job.url, p),
            None => info!("Downloaded {}", job.url),
        }

        let (index, quality) = (job.index, self.jpeg_quality);
        tokio::task::spawn_blocking(move || normalize_image(index, &blob, quality))
            .await
            .map_err(|e| DeckError::Internal(format!("Normalise task panicked: {e}")))?
    }

    /// Stream the response body into memory, enforcing the size cap.
    async fn download(&self, job: &FetchJob) -> Result<Vec<u8>, DeckError> {
        let response = self
            .client
            .get(&job.url)
            .send()
            .await
            .map_err(|e| self.network_error(job, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeckError::SlideFetchFailed {
                slide: job.index,
                url: job.url.clone(),
                reason: format!("HTTP {status}"),
            });
        }

        let too_large = || DeckError::SlideTooLarge {
            slide: job.index,
            max_bytes: self.max_bytes,
        };
        if response.content_length().is_some_and(|len| len > self.max_bytes) {
            return Err(too_large());
        }

        let capacity = response.content_length().unwrap_or(0).min(self.max_bytes) as usize;
        let mut body = Vec::with_capacity(capacity);
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|e| self.network_error(job, e))?;
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        debug!("Slide {}: {} bytes", job.index, body.len());
        Ok(body)
    }

    fn network_error(&self, job: &FetchJob, e: reqwest::Error) -> DeckError {
        if e.is_timeout() {
            DeckError::SlideTimeout {
                slide: job.index,
                secs: self.timeout_secs,
            }
        } else {
            DeckError::SlideFetchFailed {
                slide: job.index,
                url: job.url.clone(),
                reason: e.to_string(),
            }
        }
    }
}

/// Fetch one job, store the result and report progress.
async fn run_job(
    fetcher: SlideFetcher,
    job: FetchJob,
    store: Arc<SlideStore>,
    total: u32,
    progress: Option<ProgressCallback>,
) -> Result<(), DeckError> {
    match fetcher.fetch(&job).await {
        Ok(image) => {
            let bytes = image.bytes.len();
            store.insert(job.index, image)?;
            if let Some(cb) = progress {
                cb.on_slide_complete(job.index, total, bytes);
            }
            Ok(())
        }
        Err(e) => {
            if e.is_retryable() {
                warn!("Slide {} failed: {}", job.index, e);
            } else {
                error!("Slide {} failed: {}", job.index, e);
            }
            if let Some(cb) = progress {
                cb.on_slide_error(job.index, total, &e.to_string());
            }
            Err(e)
        }
    }
}

/// Await finished jobs until at most `keep` remain in flight.
async fn settle<F>(in_flight: &mut FuturesUnordered<F>, keep: usize) -> Result<(), DeckError>
where
    F: Future<Output = Result<(), DeckError>>,
{
    while in_flight.len() > keep {
        match in_flight.next().await {
            Some(done) => done?,
            None => break,
        }
    }
    Ok(())
}

/// Expands a template into jobs and runs them chunk by chunk.
pub struct FetchScheduler {
    proxies: Arc<dyn ProxySource>,
    config: DeckConfig,
}

impl FetchScheduler {
    pub fn new(proxies: Arc<dyn ProxySource>, config: &DeckConfig) -> Self {
        Self {
            proxies,
            config: config.clone(),
        }
    }

    /// Download slides `1..=slide_count`.
    ///
    /// On success the returned map holds every index exactly once.
    pub async fn fetch_all(
        &self,
        template: &SlideUrlTemplate,
        slide_count: u32,
    ) -> Result<FetchReport, DeckError> {
        let started = Instant::now();
        let width = self.config.chunk_width;
        let chunks = plan_chunks(template.jobs(slide_count), width);
        let chunk_count = chunks.len();
        let store = Arc::new(SlideStore::with_capacity(slide_count as usize));

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_download_start(slide_count);
        }
        debug!(
            "Fetching {} slides in {} chunks ({:?})",
            slide_count, chunk_count, self.config.scheduling
        );

        match self.config.scheduling {
            Scheduling::Rolling => {
                self.run_rolling(chunks, Arc::clone(&store), slide_count).await?
            }
            Scheduling::ChunkBarrier => {
                self.run_barrier(chunks, Arc::clone(&store), slide_count).await?
            }
        }

        let images = Arc::try_unwrap(store)
            .map_err(|_| DeckError::Internal("slide store still shared".into()))?
            .into_map()?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            "Finished download using {} parallel connections in {} seconds",
            width,
            elapsed_ms / 1000
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_download_complete(slide_count, elapsed_ms);
        }

        Ok(FetchReport {
            images,
            chunks: chunk_count,
            elapsed_ms,
        })
    }

    /// Download a single job through a freshly acquired proxy.
    pub async fn fetch_one(&self, job: &FetchJob) -> Result<NormalizedImage, DeckError> {
        let fetcher = self.open_chunk(1, 1).await?;
        fetcher.fetch(job).await
    }

    /// Acquire the chunk's proxy and build its client.
    async fn open_chunk(&self, chunk: usize, slides: usize) -> Result<SlideFetcher, DeckError> {
        let proxy = self.proxies.next_proxy().await?;
        debug!("Chunk {} ({} slides) via {:?}", chunk, slides, proxy);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_chunk_start(chunk, slides, proxy.as_deref());
        }
        SlideFetcher::new(proxy, &self.config)
    }

    async fn run_rolling(
        &self,
        chunks: Vec<Vec<FetchJob>>,
        store: Arc<SlideStore>,
        total: u32,
    ) -> Result<(), DeckError> {
        let width = self.config.chunk_width.max(1);
        let mut in_flight = FuturesUnordered::new();

        for (n, chunk) in chunks.into_iter().enumerate() {
            // The chunk's proxy is acquired once its first slide has a slot.
            settle(&mut in_flight, width - 1).await?;
            let fetcher = self.open_chunk(n + 1, chunk.len()).await?;

            for job in chunk {
                settle(&mut in_flight, width - 1).await?;
                in_flight.push(run_job(
                    fetcher.clone(),
                    job,
                    Arc::clone(&store),
                    total,
                    self.config.progress_callback.clone(),
                ));
            }
        }

        // Dropping the set on the first error cancels the in-flight slides.
        settle(&mut in_flight, 0).await
    }

    async fn run_barrier(
        &self,
        chunks: Vec<Vec<FetchJob>>,
        store: Arc<SlideStore>,
        total: u32,
    ) -> Result<(), DeckError> {
        for (n, chunk) in chunks.into_iter().enumerate() {
            let fetcher = self.open_chunk(n + 1, chunk.len()).await?;

            let mut tasks = JoinSet::new();
            for job in chunk {
                tasks.spawn(run_job(
                    fetcher.clone(),
                    job,
                    Arc::clone(&store),
                    total,
                    self.config.progress_callback.clone(),
                ));
            }

            // Dropping the set on the first error aborts the chunk's other tasks.
            while let Some(joined) = tasks.join_next().await {
                joined.map_err(|e| DeckError::Internal(format!("Slide task failed: {e}")))??;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jobs(n: u32) -> Vec<FetchJob> {
        (1..=n)
            .map(|index| FetchJob {
                index,
                url: format!("https://cdn.example.com/deck-{index}-1200.jpg"),
            })
            .collect()
    }

    fn image() -> NormalizedImage {
        NormalizedImage {
            bytes: vec![0xFF, 0xD8],
            pixel_width: 2,
            pixel_height: 1,
        }
    }

    #[test]
    fn ten_slides_width_four() {
        let chunks = plan_chunks(jobs(10), 4);
        let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 4, 2]);

        let flat: Vec<u32> = chunks.iter().flatten().map(|j| j.index).collect();
        assert_eq!(flat, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn exact_multiple_has_no_tail() {
        let sizes: Vec<usize> = plan_chunks(jobs(8), 4).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 4]);
    }

    #[test]
    fn no_jobs_no_chunks() {
        assert!(plan_chunks(Vec::new(), 4).is_empty());
    }

    #[test]
    fn store_rejects_duplicate_index() {
        let store = SlideStore::default();
        store.insert(1, image()).unwrap();
        assert!(store.insert(1, image()).is_err());
        assert_eq!(store.into_map().unwrap().len(), 1);
    }

    #[test]
    fn store_hands_back_every_slide() {
        let store = SlideStore::with_capacity(3);
        for i in [3, 1, 2] {
            store.insert(i, image()).unwrap();
        }
        let map = store.into_map().unwrap();
        let mut keys: Vec<u32> = map.keys().copied().collect();
        keys.sort_unstable();
        assert_eq!(keys, vec![1, 2, 3]);
    }

    #[test]
    fn direct_fetcher_has_no_proxy() {
        let fetcher = SlideFetcher::new(None, &DeckConfig::default()).unwrap();
        assert_eq!(fetcher.proxy(), None);
    }
}

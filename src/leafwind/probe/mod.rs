//! # Image Dimension Probes
//!
//! Leaflet image blocks must carry an aspect ratio. When the caller's blob
//! metadata does not include dimensions, the converter asks a
//! [`DimensionProbe`] to measure the image instead.
//!
//! Probing is the one slow step of a conversion (it may read files or talk to
//! the network), so [`resolve_all`] hands the lookups of a document to at
//! most [`MAX_WORKERS`] threads pulling from a shared queue, and waits at most
//! `timeout` overall. Results are keyed by CID and only consulted afterwards,
//! while blocks are assembled in document order, so lookup completion order
//! never shows up in the output.
//!
//! ## Implementations
//!
//! - [`fs::LocalBlobProbe`]: measures blobs downloaded into a directory
//! - [`memory::InMemoryProbe`]: canned answers with optional delay, for tests
//! - [`NoProbe`]: never knows anything; every image falls back to defaults

use crate::model::AspectRatio;
use log::{debug, warn};
use std::collections::{HashMap, VecDeque};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

pub mod fs;
pub mod memory;

/// Threads used for one document's lookups, however many images it has.
pub const MAX_WORKERS: usize = 8;

/// An image that needs measuring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub cid: String,
    pub url: String,
}

/// What a probe learned about an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub aspect_ratio: AspectRatio,
    pub mime_type: Option<String>,
    pub size: Option<u64>,
}

pub trait DimensionProbe: Send + Sync {
    /// Measure one image. `None` means "unknown"; probes never fail loudly.
    fn probe(&self, request: &ImageRequest) -> Option<ImageInfo>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbe;

impl DimensionProbe for NoProbe {
    fn probe(&self, _request: &ImageRequest) -> Option<ImageInfo> {
        None
    }
}

/// Probe every request concurrently, giving up on whatever has not answered
/// once `timeout` has elapsed.
pub fn resolve_all(
    probe: Arc<dyn DimensionProbe>,
    requests: Vec<ImageRequest>,
    timeout: Duration,
) -> HashMap<String, ImageInfo> {
    let mut resolved = HashMap::new();
    if requests.is_empty() {
        return resolved;
    }

    let deadline = Instant::now() + timeout;
    let mut pending = requests.len();
    let workers = pending.min(MAX_WORKERS);
    let queue = Arc::new(Mutex::new(VecDeque::from(requests)));
    let (tx, rx) = mpsc::channel();

    for n in 0..workers {
        let tx = tx.clone();
        let probe = Arc::clone(&probe);
        let queue = Arc::clone(&queue);
        let spawned = thread::Builder::new()
            .name(format!("image-lookup-{}", n))
            .spawn(move || {
                while Instant::now() < deadline {
                    let Some(request) = next_request(&queue) else {
                        break;
                    };
                    let info = probe.probe(&request);
                    // Receiver is gone once the deadline has passed.
                    if tx.send((request.cid, info)).is_err() {
                        break;
                    }
                }
            });
        if let Err(e) = spawned {
            warn!("could not start image lookup worker: {}", e);
        }
    }
    drop(tx);

    while pending > 0 {
        let wait = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(wait) {
            Ok((cid, Some(info))) => {
                debug!("probed {}: {}x{}", cid, info.aspect_ratio.width, info.aspect_ratio.height);
                resolved.insert(cid, info);
                pending -= 1;
            }
            Ok((cid, None)) => {
                debug!("no dimensions for {}", cid);
                pending -= 1;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(
                    "image lookup timed out after {:?}; {} image(s) use default dimensions",
                    timeout, pending
                );
                break;
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                debug!("lookup workers stopped with {} image(s) unanswered", pending);
                break;
            }
        }
    }

    resolved
}

fn next_request(queue: &Mutex<VecDeque<ImageRequest>>) -> Option<ImageRequest> {
    // Lookups run outside the lock, so a poisoned queue is still consistent.
    queue
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .pop_front()
}

#[cfg(test)]
mod tests {
    use super::memory::InMemoryProbe;
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every request after a pause, recording how many ran at once.
    #[derive(Default)]
    struct CountingLookup {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl DimensionProbe for CountingLookup {
        fn probe(&self, _request: &ImageRequest) -> Option<ImageInfo> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(30));
            self.running.fetch_sub(1, Ordering::SeqCst);
            Some(info(4, 3))
        }
    }

    fn request(cid: &str) -> ImageRequest {
        ImageRequest {
            cid: cid.to_string(),
            url: format!("https://cdn.example/{}", cid),
        }
    }

    fn info(width: u32, height: u32) -> ImageInfo {
        ImageInfo {
            aspect_ratio: AspectRatio { width, height },
            mime_type: None,
            size: None,
        }
    }

    #[test]
    fn no_requests_no_threads() {
        let out = resolve_all(Arc::new(NoProbe), vec![], Duration::from_secs(1));
        assert!(out.is_empty());
    }

    #[test]
    fn no_probe_resolves_nothing() {
        let out = resolve_all(
            Arc::new(NoProbe),
            vec![request("bafkreia"), request("bafkreib")],
            Duration::from_secs(1),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn collects_all_answers() {
        let probe = InMemoryProbe::new()
            .with("bafkreia", info(800, 600))
            .with("bafkreib", info(10, 20));
        let out = resolve_all(
            Arc::new(probe),
            vec![request("bafkreia"), request("bafkreib"), request("bafkreic")],
            Duration::from_secs(5),
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out["bafkreia"], info(800, 600));
        assert_eq!(out["bafkreib"], info(10, 20));
    }

    #[test]
    fn slow_lookups_are_abandoned() {
        let probe = InMemoryProbe::new()
            .with("bafkreia", info(800, 600))
            .with_delay(Duration::from_secs(5));
        let started = Instant::now();
        let out = resolve_all(
            Arc::new(probe),
            vec![request("bafkreia")],
            Duration::from_millis(50),
        );
        assert!(out.is_empty());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn lookups_run_concurrently() {
        let mut probe = InMemoryProbe::new().with_delay(Duration::from_millis(200));
        let mut requests = Vec::new();
        for i in 0..8 {
            let cid = format!("bafkrei{}", i);
            probe = probe.with(&cid, info(i + 1, 1));
            requests.push(request(&cid));
        }
        let started = Instant::now();
        let out = resolve_all(Arc::new(probe), requests, Duration::from_secs(10));
        assert_eq!(out.len(), 8);
        assert!(started.elapsed() < Duration::from_millis(1_500));
    }

    #[test]
    fn more_images_than_workers_all_resolve() {
        let mut probe = InMemoryProbe::new().with_delay(Duration::from_millis(20));
        let mut requests = Vec::new();
        for i in 0..(MAX_WORKERS as u32 * 3) {
            let cid = format!("bafkrei{}", i);
            probe = probe.with(&cid, info(i + 1, 1));
            requests.push(request(&cid));
        }
        let out = resolve_all(Arc::new(probe), requests, Duration::from_secs(10));
        assert_eq!(out.len(), MAX_WORKERS * 3);
        assert_eq!(out["bafkrei17"], info(18, 1));
    }

    #[test]
    fn concurrent_lookups_are_capped() {
        let lookup = Arc::new(CountingLookup::default());
        let requests = (0..40).map(|i| request(&format!("bafkrei{}", i))).collect();
        let out = resolve_all(lookup.clone(), requests, Duration::from_secs(10));

        assert_eq!(out.len(), 40);
        let peak = lookup.peak.load(Ordering::SeqCst);
        assert!(peak <= MAX_WORKERS, "{} lookups ran at once", peak);
        assert!(peak > 1, "lookups ran one at a time");
    }
}

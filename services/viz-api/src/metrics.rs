//! Application metrics collection and reporting.
//!
//! Everything is recorded twice: into local atomics for the JSON
//! diagnostics endpoints, and through the `metrics` facade for Prometheus.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use render_cache::{CacheStats, CacheStatus};
use serde::Serialize;
use tokio::sync::RwLock;

/// Metrics collector for the visualization API.
#[derive(Debug)]
pub struct MetricsCollector {
    pub render_requests: AtomicU64,
    pub render_errors: AtomicU64,
    pub export_requests: AtomicU64,
    pub draw_failures: AtomicU64,
    pub dataset_loads: AtomicU64,
    pub dataset_load_failures: AtomicU64,
    pub playback_frames: AtomicU64,

    /// Timing stats (stored as microseconds)
    render_times: RwLock<TimingStats>,
    draw_times: RwLock<TimingStats>,
    load_times: RwLock<TimingStats>,

    start_time: Instant,
}

#[derive(Debug, Default)]
struct TimingStats {
    count: u64,
    total_us: u64,
    min_us: u64,
    max_us: u64,
    last_us: u64,
}

impl TimingStats {
    fn record(&mut self, duration_us: u64) {
        self.count += 1;
        self.total_us += duration_us;
        self.last_us = duration_us;
        if self.min_us == 0 || duration_us < self.min_us {
            self.min_us = duration_us;
        }
        if duration_us > self.max_us {
            self.max_us = duration_us;
        }
    }

    fn avg_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.total_us as f64 / self.count as f64) / 1000.0
        }
    }

    fn summary(&self) -> TimingSummary {
        TimingSummary {
            count: self.count,
            avg_ms: self.avg_ms(),
            min_ms: self.min_us as f64 / 1000.0,
            max_ms: self.max_us as f64 / 1000.0,
            last_ms: self.last_us as f64 / 1000.0,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            render_requests: AtomicU64::new(0),
            render_errors: AtomicU64::new(0),
            export_requests: AtomicU64::new(0),
            draw_failures: AtomicU64::new(0),
            dataset_loads: AtomicU64::new(0),
            dataset_load_failures: AtomicU64::new(0),
            playback_frames: AtomicU64::new(0),
            render_times: RwLock::new(TimingStats::default()),
            draw_times: RwLock::new(TimingStats::default()),
            load_times: RwLock::new(TimingStats::default()),
            start_time: Instant::now(),
        }
    }

    /// Record a finished render request, labelled by how the cache served it.
    pub async fn record_render(&self, duration_us: u64, status: CacheStatus, export: bool) {
        self.render_requests.fetch_add(1, Ordering::Relaxed);
        if export {
            self.export_requests.fetch_add(1, Ordering::Relaxed);
        }
        let outcome = match status {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Coalesced => "coalesced",
        };
        counter!("render_requests_total", "outcome" => outcome).increment(1);
        histogram!("render_duration_seconds").record(duration_us as f64 / 1_000_000.0);

        self.render_times.write().await.record(duration_us);
    }

    /// Record a render request that failed before or during drawing.
    pub fn record_render_error(&self) {
        self.render_requests.fetch_add(1, Ordering::Relaxed);
        self.render_errors.fetch_add(1, Ordering::Relaxed);
        counter!("render_requests_total", "outcome" => "error").increment(1);
    }

    /// Record one call into the drawing backend.
    pub async fn record_draw(&self, duration_us: u64, success: bool) {
        if !success {
            self.draw_failures.fetch_add(1, Ordering::Relaxed);
            counter!("draw_failures_total").increment(1);
        }
        histogram!("draw_duration_seconds").record(duration_us as f64 / 1_000_000.0);
        self.draw_times.write().await.record(duration_us);
    }

    pub async fn record_dataset_load(&self, duration_us: u64, success: bool) {
        if success {
            self.dataset_loads.fetch_add(1, Ordering::Relaxed);
            counter!("dataset_loads_total", "outcome" => "ok").increment(1);
            self.load_times.write().await.record(duration_us);
        } else {
            self.dataset_load_failures.fetch_add(1, Ordering::Relaxed);
            counter!("dataset_loads_total", "outcome" => "error").increment(1);
        }
    }

    pub fn record_playback_frame(&self) {
        self.playback_frames.fetch_add(1, Ordering::Relaxed);
        counter!("playback_frames_total").increment(1);
    }

    /// Publish a render cache's counters as gauges.
    pub fn record_cache_stats(&self, cache: &'static str, stats: &CacheStats, capacity: usize) {
        gauge!("render_cache_hits_total", "cache" => cache).set(stats.hits() as f64);
        gauge!("render_cache_misses_total", "cache" => cache).set(stats.misses() as f64);
        gauge!("render_cache_coalesced_total", "cache" => cache).set(stats.coalesced() as f64);
        gauge!("render_cache_evictions_total", "cache" => cache).set(stats.evictions() as f64);
        gauge!("render_cache_invalidated_total", "cache" => cache).set(stats.invalidated() as f64);
        gauge!("render_cache_failures_total", "cache" => cache).set(stats.failures() as f64);
        gauge!("render_cache_entries", "cache" => cache).set(stats.entry_count() as f64);
        gauge!("render_cache_capacity", "cache" => cache).set(capacity as f64);
        gauge!("render_cache_hit_rate_percent", "cache" => cache).set(stats.hit_rate());
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get current metrics snapshot
    pub async fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.uptime_secs(),
            render_requests: self.render_requests.load(Ordering::Relaxed),
            render_errors: self.render_errors.load(Ordering::Relaxed),
            export_requests: self.export_requests.load(Ordering::Relaxed),
            draw_failures: self.draw_failures.load(Ordering::Relaxed),
            dataset_loads: self.dataset_loads.load(Ordering::Relaxed),
            dataset_load_failures: self.dataset_load_failures.load(Ordering::Relaxed),
            playback_frames: self.playback_frames.load(Ordering::Relaxed),
            render: self.render_times.read().await.summary(),
            draw: self.draw_times.read().await.summary(),
            load: self.load_times.read().await.summary(),
        }
    }
}

/// Timing summary for one pipeline stage.
#[derive(Debug, Clone, Serialize)]
pub struct TimingSummary {
    pub count: u64,
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub last_ms: f64,
}

/// Serializable view of the collector.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub render_requests: u64,
    pub render_errors: u64,
    pub export_requests: u64,
    pub draw_failures: u64,
    pub dataset_loads: u64,
    pub dataset_load_failures: u64,
    pub playback_frames: u64,
    pub render: TimingSummary,
    pub draw: TimingSummary,
    pub load: TimingSummary,
}

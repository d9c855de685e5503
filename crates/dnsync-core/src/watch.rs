// # IP change watcher
//
// Polls the IP source on a fixed delay and calls back once per change.
//
// ## Behavior
//
// - The current IP is fetched as soon as the task starts; with
//   `notify_initial` the callback runs for it right away
// - The first poll happens one full interval after start
// - Each poll compares the fetched IPv4 with the last-seen one; on a
//   difference the last-seen value is updated, then the callback awaited
// - A failed fetch is logged and the last-seen value kept. If the very
//   first fetch fails, the first successful poll counts as a change
// - Polls never overlap: a callback that outlasts the interval delays the
//   next poll instead of queueing a burst of ticks
//
// Each watcher owns its interval. Stopping (or dropping) the handle ends the
// task and releases the timer.

use crate::task::BackgroundTask;
use crate::traits::IpSource;
use std::future::Future;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, info, warn};

/// Delay between two polls of the IP source
pub const IP_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Watcher settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Delay between polls
    pub period: Duration,
    /// Run the callback for the IP found at start
    pub notify_initial: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            period: IP_POLL_INTERVAL,
            notify_initial: false,
        }
    }
}

/// Handle to a running IP watcher
#[derive(Debug)]
pub struct IpWatcher {
    task: BackgroundTask,
}

impl IpWatcher {
    /// Start watching with the default options
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn spawn<F, Fut>(ip_source: Arc<dyn IpSource>, on_change: F) -> Self
    where
        F: Fn(Ipv4Addr) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::spawn_with(ip_source, WatchOptions::default(), on_change)
    }

    /// Start watching
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn spawn_with<F, Fut>(ip_source: Arc<dyn IpSource>, options: WatchOptions, on_change: F) -> Self
    where
        F: Fn(Ipv4Addr) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let period = options.period;

        let task = BackgroundTask::spawn("IP watcher", move |mut shutdown| async move {
            let start = Instant::now();

            let mut last_seen = match ip_source.current_v4().await {
                Ok(ip) => {
                    info!("Watching for IP changes every {:?} (current: {})", period, ip);
                    Some(ip)
                }
                Err(e) => {
                    warn!("Initial IP lookup failed: {}", e);
                    None
                }
            };

            if options.notify_initial
                && let Some(ip) = last_seen
            {
                on_change(ip).await;
            }

            let mut ticks = interval_at(start + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks = IntervalStream::new(ticks);

            loop {
                tokio::select! {
                    _ = &mut shutdown => break,
                    Some(_) = ticks.next() => {
                        match ip_source.current_v4().await {
                            Ok(ip) if Some(ip) != last_seen => {
                                match last_seen {
                                    Some(previous) => info!("IP changed: {} -> {}", previous, ip),
                                    None => info!("IP discovered: {}", ip),
                                }
                                last_seen = Some(ip);
                                on_change(ip).await;
                            }
                            Ok(ip) => debug!("IP unchanged: {}", ip),
                            Err(e) => warn!("IP poll failed: {}", e),
                        }
                    }
                }
            }
        });

        Self { task }
    }

    /// Stop polling and release the timer
    ///
    /// A callback that is already running is allowed to finish.
    pub async fn stop(self) {
        self.task.stop().await;
    }

    /// Stop polling without waiting for an in-flight callback
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Whether the watcher is still running
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

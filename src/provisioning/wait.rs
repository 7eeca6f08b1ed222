// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Bounded waits: event-driven watch folding and fixed-interval polling.

use crate::error::{RepositoryError, Result};
use futures::StreamExt;
use kube::{Api, Resource};
use kube_runtime::watcher::Config as WatcherConfig;
use kube_runtime::{watcher, WatchStreamExt};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::future::Future;
use std::pin::pin;
use std::time::Duration;
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tracing::{debug, warn};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Result of a bounded wait
#[derive(Debug)]
pub enum Outcome<T> {
    Ready(T),
    /// The deadline fired, carrying the time actually spent waiting
    TimedOut(Duration),
}

/// Watch the object `name` until a snapshot satisfies `is_ready` or `deadline` elapses.
///
/// Snapshots the watch fails to decode, and transient watch errors, are skipped.
/// Only a failed initial list is fatal. The watch is dropped as soon as this returns.
pub async fn watch_until<K, F>(
    api: Api<K>,
    name: &str,
    deadline: Duration,
    is_ready: F,
) -> Result<Outcome<K>>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + 'static,
    F: Fn(&K) -> bool,
{
    let started = Instant::now();
    let config = WatcherConfig::default().fields(&format!("metadata.name={}", name));

    let fold = async {
        let mut events = pin!(watcher(api, config).default_backoff());

        while let Some(event) = events.next().await {
            match event {
                Ok(watcher::Event::Apply(obj)) | Ok(watcher::Event::InitApply(obj)) => {
                    if is_ready(&obj) {
                        return Ok(Some(obj));
                    }
                    debug!("{} observed but not ready yet", name);
                }
                Ok(_) => {}
                Err(watcher::Error::InitialListFailed(e)) => {
                    return Err(RepositoryError::transport(
                        format!("failed to set up watch on {}", name),
                        e,
                    ));
                }
                Err(e) => warn!("Skipping watch event for {}: {}", name, e),
            }
        }

        Ok(None)
    };

    match timeout(deadline, fold).await {
        Ok(Ok(Some(obj))) => Ok(Outcome::Ready(obj)),
        Ok(Ok(None)) => Ok(Outcome::TimedOut(started.elapsed())),
        Ok(Err(e)) => Err(e),
        Err(_) => Ok(Outcome::TimedOut(started.elapsed())),
    }
}

/// Run `probe` every `every` until it reports true or `deadline` elapses.
/// The first probe runs immediately; probe errors abort the wait.
/// A zero `every` is raised to one millisecond.
pub async fn poll_until<F, Fut>(every: Duration, deadline: Duration, mut probe: F) -> Result<Outcome<()>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let started = Instant::now();

    let polling = async {
        let mut ticker = interval(every.max(MIN_POLL_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if probe().await? {
                return Ok(());
            }
        }
    };

    match timeout(deadline, polling).await {
        Ok(Ok(())) => Ok(Outcome::Ready(())),
        Ok(Err(e)) => Err(e),
        Err(_) => Ok(Outcome::TimedOut(started.elapsed())),
    }
}

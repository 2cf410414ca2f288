//! Slows the poller down while the host is busy.

use std::{sync::Arc, time::Duration};

use rollcall_engine::Poller;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::settings::PollSettings;

/// First field of `/proc/loadavg`.
pub fn parse_loadavg(contents: &str) -> Option<f64> {
  contents.split_whitespace().next()?.parse().ok()
}

/// One-minute load average divided by the number of CPUs. `None` where the
/// platform does not expose it.
pub async fn system_load() -> Option<f64> {
  let contents = tokio::fs::read_to_string("/proc/loadavg").await.ok()?;
  let load = parse_loadavg(&contents)?;
  let cpus = std::thread::available_parallelism().map_or(1, |n| n.get());
  Some(load / cpus as f64)
}

/// The poll interval to use at `load`.
pub fn choose_interval(load: f64, settings: &PollSettings) -> Duration {
  if load > settings.load_threshold {
    settings.busy_interval()
  } else {
    settings.interval()
  }
}

/// Re-check the load every `load_check_secs` and retune `poller`.
pub fn spawn_monitor(poller: Arc<Poller>, settings: PollSettings) -> JoinHandle<()> {
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(settings.load_check());
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
      ticker.tick().await;
      let Some(load) = system_load().await else {
        debug!("system load unavailable, keeping poll interval");
        continue;
      };
      let interval = choose_interval(load, &settings);
      if interval != poller.interval() {
        info!(load, ?interval, "adjusting poll interval for system load");
        poller.update_interval(interval);
      }
    }
  })
}

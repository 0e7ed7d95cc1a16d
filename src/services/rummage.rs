use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use rand::seq::IndexedRandom;
use tokio::{runtime::Handle, sync::watch, task::JoinHandle};
use tracing::debug;

/// Icon shuffle shown while the local participant waits after voting.
///
/// Runs as a spawned task for as long as "vote cast, round unchanged" holds.
/// Cancelling bumps a generation counter under the watch lock, so a task that
/// is mid-tick when aborted can no longer publish an icon.
pub struct Rummage {
    interval: Duration,
    icons: Arc<[String]>,
    generation: Arc<AtomicU64>,
    current: Arc<watch::Sender<Option<String>>>,
    task: Option<JoinHandle<()>>,
}

impl Rummage {
    /// Create an idle effect cycling through `icons` every `interval`.
    pub fn new(interval: Duration, icons: Vec<String>) -> Self {
        let (current, _rx) = watch::channel(None);
        Self {
            interval,
            icons: icons.into(),
            generation: Arc::new(AtomicU64::new(0)),
            current: Arc::new(current),
            task: None,
        }
    }

    /// Whether a shuffle task is running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Icon currently shown, `None` while idle.
    pub fn current(&self) -> Option<String> {
        self.current.borrow().clone()
    }

    /// Follow icon changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.current.subscribe()
    }

    /// Start shuffling, replacing any running task.
    ///
    /// Without a Tokio runtime on the current thread the effect stays idle.
    pub fn start(&mut self) {
        self.cancel();

        if self.icons.is_empty() {
            return;
        }

        let Ok(runtime) = Handle::try_current() else {
            debug!("no runtime available; rummage effect disabled");
            return;
        };

        let generation = self.generation.load(Ordering::SeqCst);
        let live_generation = self.generation.clone();
        let icons = self.icons.clone();
        let current = self.current.clone();
        let period = self.interval;

        self.task = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let icon = icons.choose(&mut rand::rng()).cloned();
                let published = current.send_if_modified(|shown| {
                    if live_generation.load(Ordering::SeqCst) != generation {
                        return false;
                    }
                    *shown = icon;
                    true
                });
                if !published && live_generation.load(Ordering::SeqCst) != generation {
                    break;
                }
            }
        }));
        debug!(interval_ms = self.interval.as_millis() as u64, "rummage effect started");
    }

    /// Stop shuffling and clear the shown icon.
    pub fn cancel(&mut self) {
        self.current.send_if_modified(|_| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            false
        });

        if let Some(task) = self.task.take() {
            task.abort();
            debug!("rummage effect cancelled");
        }

        self.current.send_if_modified(|shown| shown.take().is_some());
    }
}

impl Drop for Rummage {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rummage() -> Rummage {
        Rummage::new(
            Duration::from_millis(10),
            vec!["science".into(), "public".into(), "pets".into()],
        )
    }

    #[test]
    fn start_without_runtime_stays_idle() {
        let mut effect = rummage();
        effect.start();
        assert!(!effect.is_running());
        assert_eq!(effect.current(), None);
    }

    #[tokio::test]
    async fn start_publishes_icons_until_cancelled() {
        let mut effect = rummage();
        let mut icons = effect.subscribe();

        effect.start();
        icons.changed().await.unwrap();
        assert!(effect.current().is_some());
        assert!(effect.is_running());

        effect.cancel();
        assert!(!effect.is_running());
        assert_eq!(effect.current(), None);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(effect.current(), None);
    }

    #[tokio::test]
    async fn empty_icon_pool_never_starts() {
        let mut effect = Rummage::new(Duration::from_millis(10), Vec::new());
        effect.start();
        assert!(!effect.is_running());
    }
}

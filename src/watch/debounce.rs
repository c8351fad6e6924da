//! Trailing-edge debounce over a stream of change signals.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// "The target may have changed." Carries no payload; sources only say
/// that something happened, never what.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChangeSignal;

/// What to do after the settled callback ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Settle {
    /// Back to idle; wait for the next signal.
    Done,
    /// Wait out another full window, then call again.
    Rearm,
}

/// Collapse bursts of signals into one `on_settled` call per quiet window.
///
/// The first signal calls `on_pending` and arms the timer; every further
/// signal before it fires re-arms it. Signals that arrive while
/// `on_settled` is running stay queued and start the next cycle.
/// Returns when `shutdown` fires or every sender is gone.
pub(crate) async fn run_debounced<P, S, Fut>(
    signals: &mut mpsc::Receiver<ChangeSignal>,
    window: Duration,
    shutdown: &CancellationToken,
    mut on_pending: P,
    mut on_settled: S,
) where
    P: FnMut(),
    S: FnMut() -> Fut,
    Fut: Future<Output = Settle>,
{
    'idle: loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            signal = signals.recv() => {
                if signal.is_none() {
                    break;
                }
            }
        }

        on_pending();
        let mut deadline = Instant::now() + window;

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break 'idle,
                signal = signals.recv() => match signal {
                    Some(ChangeSignal) => {
                        trace!("change signal re-armed debounce timer");
                        deadline = Instant::now() + window;
                    }
                    None => break 'idle,
                },
                () = tokio::time::sleep_until(deadline) => {
                    match on_settled().await {
                        Settle::Done => continue 'idle,
                        Settle::Rearm => {
                            on_pending();
                            deadline = Instant::now() + window;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct Recorder {
        pending: Arc<AtomicUsize>,
        fired: Arc<Mutex<Vec<Instant>>>,
    }

    /// Spawn the debounce loop; `outcomes` are returned by successive
    /// settled calls, then `Settle::Done` forever.
    fn spawn_loop(
        window: Duration,
        outcomes: Vec<Settle>,
    ) -> (mpsc::Sender<ChangeSignal>, CancellationToken, Recorder, tokio::task::JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel(64);
        let shutdown = CancellationToken::new();
        let recorder = Recorder {
            pending: Arc::new(AtomicUsize::new(0)),
            fired: Arc::new(Mutex::new(Vec::new())),
        };
        let pending = recorder.pending.clone();
        let fired = recorder.fired.clone();
        let token = shutdown.clone();
        let outcomes = Arc::new(Mutex::new(outcomes.into_iter()));

        let task = tokio::spawn(async move {
            run_debounced(
                &mut rx,
                window,
                &token,
                || {
                    pending.fetch_add(1, Ordering::SeqCst);
                },
                || {
                    fired.lock().unwrap().push(Instant::now());
                    let next = outcomes.lock().unwrap().next().unwrap_or(Settle::Done);
                    async move { next }
                },
            )
            .await;
        });

        (tx, shutdown, recorder, task)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_into_one_call_after_last_signal() {
        let window = Duration::from_secs(1);
        let (tx, shutdown, rec, task) = spawn_loop(window, vec![]);

        // Five modifications within 0.3s.
        let mut last_sent = Instant::now();
        for i in 0..5 {
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(60)).await;
            }
            tx.send(ChangeSignal).await.unwrap();
            last_sent = Instant::now();
        }

        tokio::time::sleep(Duration::from_secs(3)).await;

        let fired = rec.fired.lock().unwrap().clone();
        assert_eq!(fired.len(), 1, "burst must collapse to a single reload");
        let delay = fired[0] - last_sent;
        assert!(delay >= window, "fired {:?} after last event", delay);
        assert!(delay < window + Duration::from_millis(50), "fired {:?} after last event", delay);
        assert_eq!(rec.pending.load(Ordering::SeqCst), 1);

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_fire_separately() {
        let window = Duration::from_millis(200);
        let (tx, shutdown, rec, task) = spawn_loop(window, vec![]);

        tx.send(ChangeSignal).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        tx.send(ChangeSignal).await.unwrap();
        tx.send(ChangeSignal).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(rec.fired.lock().unwrap().len(), 2);
        assert_eq!(rec.pending.load(Ordering::SeqCst), 2);

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_waits_another_window() {
        let window = Duration::from_millis(100);
        let (tx, shutdown, rec, task) = spawn_loop(window, vec![Settle::Rearm]);

        tx.send(ChangeSignal).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let fired = rec.fired.lock().unwrap().clone();
        assert_eq!(fired.len(), 2);
        assert_eq!(fired[1] - fired[0], window);

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_while_pending_does_not_fire() {
        let window = Duration::from_secs(1);
        let (tx, shutdown, rec, task) = spawn_loop(window, vec![]);

        tx.send(ChangeSignal).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.cancel();
        task.await.unwrap();

        assert!(rec.fired.lock().unwrap().is_empty());
        assert_eq!(rec.pending.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_ends_when_senders_drop() {
        let (tx, _shutdown, rec, task) = spawn_loop(Duration::from_millis(100), vec![]);
        drop(tx);
        task.await.unwrap();
        assert!(rec.fired.lock().unwrap().is_empty());
    }
}

/// Semaphore-bounded concurrency limiter
///
/// External providers tolerate only a handful of simultaneous requests from a
/// single process. Wrapping each fan-out task in [`Limiter::run`] caps the
/// number in flight without the caller managing permits by hand.
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Clone)]
pub struct Limiter {
    permits: Arc<Semaphore>,
}

impl Limiter {
    /// Create a limiter allowing at most `max_concurrent` tasks at once.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// Run the future once a permit is available; the permit is held for the
    /// future's whole lifetime.
    pub async fn run<F>(&self, future: F) -> F::Output
    where
        F: std::future::Future,
    {
        // The semaphore is never closed, so acquire can only fail on misuse.
        let _permit = self
            .permits
            .acquire()
            .await
            .expect("limiter semaphore closed");
        future.await
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn caps_concurrent_tasks() {
        let limiter = Limiter::new(3);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let limiter = limiter.clone();
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                tokio::spawn(async move {
                    limiter
                        .run(async {
                            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                            in_flight.fetch_sub(1, Ordering::SeqCst);
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn reports_available_permits() {
        let limiter = Limiter::new(2);
        assert_eq!(limiter.available(), 2);
        limiter.run(async {}).await;
        assert_eq!(limiter.available(), 2);
    }
}

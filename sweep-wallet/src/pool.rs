use std::sync::{Arc, Mutex, mpsc};
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-width worker pool; one queued job runs one secret end-to-end.
///
/// Dropping the pool only closes the intake: workers finish whatever is
/// queued and exit on their own, streaming results through whatever
/// channel each job carries. Use [`WorkerPool::join`] to block until the
/// queue is drained.
pub struct WorkerPool {
    workers: Vec<thread::JoinHandle<()>>,
    sender: Option<mpsc::Sender<Job>>,
}

impl WorkerPool {
    pub fn new(width: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..width)
            .map(|_| {
                let receiver = Arc::clone(&receiver);
                thread::spawn(move || {
                    loop {
                        let job = receiver.lock().expect("worker queue poisoned").recv();
                        match job {
                            Ok(job) => job(),
                            Err(_) => break,
                        }
                    }
                })
            })
            .collect();

        Self {
            workers,
            sender: Some(sender),
        }
    }

    /// Queue a job; runs as soon as a worker frees up.
    pub fn spawn<F: FnOnce() + Send + 'static>(&self, job: F) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(Box::new(job));
        }
    }

    /// Close the intake and wait for every queued job to finish.
    pub fn join(mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // closing the channel ends each worker's recv loop; no join here
        // so results keep streaming while the pool unwinds
        self.sender.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn results_stream_as_jobs_finish() {
        let (results_tx, results_rx) = mpsc::channel::<u32>();
        let pool = WorkerPool::new(4);

        for i in 0..4u32 {
            let tx = results_tx.clone();
            pool.spawn(move || {
                thread::sleep(Duration::from_millis(u64::from(i + 1) * 50));
                let _ = tx.send(i);
            });
        }
        drop(results_tx);
        drop(pool);

        let start = Instant::now();
        let arrivals: Vec<Duration> = results_rx.iter().map(|_| start.elapsed()).collect();
        assert_eq!(arrivals.len(), 4);

        // the fastest job must not wait for the slowest
        assert!(arrivals.iter().min().unwrap().as_millis() < 150);
        assert!(arrivals.iter().max().unwrap().as_millis() >= 150);
    }

    #[test]
    fn join_drains_the_queue() {
        let (tx, rx) = mpsc::channel::<u32>();
        let pool = WorkerPool::new(2);
        for i in 0..8u32 {
            let tx = tx.clone();
            pool.spawn(move || {
                let _ = tx.send(i);
            });
        }
        pool.join();
        drop(tx);
        let mut done: Vec<u32> = rx.iter().collect();
        done.sort_unstable();
        assert_eq!(done, (0..8).collect::<Vec<u32>>());
    }

    #[test]
    fn width_bounds_concurrency() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let live = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let pool = WorkerPool::new(3);
        for _ in 0..12 {
            let live = Arc::clone(&live);
            let peak = Arc::clone(&peak);
            pool.spawn(move || {
                let now = live.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                live.fetch_sub(1, Ordering::SeqCst);
            });
        }
        pool.join();
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }
}

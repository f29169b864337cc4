//! Runs producer and consumer threads against a single [BlockingQueue](../struct.BlockingQueue.html)
//!
//! Producers push `(producer, sequence)` pairs. Consumers pop until the queue is closed and
//! drained, checking that each producer's items reach them in the order they were pushed.

use std::fmt;
use std::panic;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use crate::blocking_queue::{BlockingQueue, QueueResult};
use crate::config::Config;
use crate::util::duration_string;
use crate::wait_for::WaitPeriod;

type Item = (usize, usize);

/// The results of a [run](fn.run.html)
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    /// Items pushed by all producers
    pub pushed: usize,
    /// Items popped by all consumers
    pub popped: usize,
    /// Times a consumer came back empty handed from a queue that was still open
    pub empty_polls: usize,
    /// Times a consumer saw a producer's items out of order
    pub out_of_order: usize,
    /// How long the run took
    pub elapsed: Duration,
}

impl Report {
    /// Checks that every pushed item was popped exactly once and in order
    pub fn is_consistent(&self) -> bool {
        self.pushed == self.popped && self.out_of_order == 0
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f,
               "pushed {}, popped {}, empty polls {}, out of order {} in {}",
               self.pushed,
               self.popped,
               self.empty_polls,
               self.out_of_order,
               duration_string(&self.elapsed))
    }
}

#[derive(Debug, Default)]
struct ConsumerStats {
    popped: usize,
    empty_polls: usize,
    out_of_order: usize,
}

fn produce(id: usize, queue: &BlockingQueue<Item>, items: usize) -> QueueResult<usize> {
    for seq in 0..items {
        queue.push((id, seq))?;
    }
    trace!("producer {} pushed {} items", id, items);
    Ok(items)
}

fn consume(id: usize,
           queue: &BlockingQueue<Item>,
           period: &WaitPeriod,
           producers: usize)
           -> ConsumerStats {
    let mut last_seen: Vec<Option<usize>> = vec![None; producers];
    let mut stats = ConsumerStats::default();
    loop {
        match queue.pop_for(period) {
            Some((producer, seq)) => {
                stats.popped += 1;
                if let Some(last) = last_seen[producer] {
                    if seq <= last {
                        stats.out_of_order += 1;
                    }
                }
                last_seen[producer] = Some(seq);
            }
            // nothing can be pushed after close, so an empty closed queue stays empty
            None if queue.is_closed() && queue.is_empty() => break,
            None => {
                stats.empty_polls += 1;
                if *period == WaitPeriod::None {
                    thread::yield_now();
                }
            }
        }
    }
    trace!("consumer {} finished: {:?}", id, stats);
    stats
}

fn join<T>(handle: JoinHandle<T>) -> T {
    handle.join().unwrap_or_else(|err| panic::resume_unwind(err))
}

/// Runs the workload described by `config`, returning once every producer has finished and every
/// consumer has drained the queue
///
/// # Errors
/// `QueueError::Alloc` if space for `config.capacity` items cannot be allocated up front, otherwise
/// the first error returned by a producer's push. Consumers are still stopped and joined.
pub fn run(config: &Config) -> QueueResult<Report> {
    if config.pop_wait == WaitPeriod::None {
        warn!("consumers are configured not to wait, they will spin while the queue is empty");
    }
    let queue: Arc<BlockingQueue<Item>> =
        Arc::new(BlockingQueue::try_with_capacity(config.capacity)?);
    let start = Instant::now();
    debug!("starting {} producers and {} consumers",
           config.producers,
           config.consumers);

    let consumers: Vec<JoinHandle<ConsumerStats>> = (0..config.consumers)
        .map(|id| {
            let queue = queue.clone();
            let period = config.pop_wait.clone();
            let producers = config.producers;
            thread::spawn(move || consume(id, &queue, &period, producers))
        })
        .collect();
    let producers: Vec<JoinHandle<QueueResult<usize>>> = (0..config.producers)
        .map(|id| {
            let queue = queue.clone();
            let items = config.items_per_producer;
            thread::spawn(move || produce(id, &queue, items))
        })
        .collect();

    let mut report = Report::default();
    let mut result = Ok(());
    for producer in producers {
        match join(producer) {
            Ok(pushed) => report.pushed += pushed,
            Err(err) => {
                error!("producer failed: {}", err);
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
    }
    queue.close();

    for consumer in consumers {
        let stats = join(consumer);
        report.popped += stats.popped;
        report.empty_polls += stats.empty_polls;
        report.out_of_order += stats.out_of_order;
    }
    report.elapsed = start.elapsed();
    debug!("workload finished: {}", report);
    result.map(|_| report)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::blocking_queue::QueueError;

    fn small_config(pop_wait: WaitPeriod) -> Config {
        Config {
            producers: 3,
            consumers: 3,
            items_per_producer: 500,
            capacity: 16,
            pop_wait: pop_wait,
        }
    }

    #[test]
    fn test_run_waiting() {
        let report = run(&small_config(WaitPeriod::Wait)).unwrap();
        assert_eq!(report.pushed, 1500);
        assert_eq!(report.empty_polls, 0);
        assert!(report.is_consistent(), "{}", report);
    }

    #[test]
    fn test_run_timed() {
        let report = run(&small_config(WaitPeriod::AtMost(Duration::from_millis(1)))).unwrap();
        assert_eq!(report.pushed, 1500);
        assert!(report.is_consistent(), "{}", report);
    }

    #[test]
    fn test_run_polling() {
        let report = run(&small_config(WaitPeriod::None)).unwrap();
        assert_eq!(report.pushed, 1500);
        assert!(report.is_consistent(), "{}", report);
    }

    #[test]
    fn test_run_without_items() {
        let mut config = small_config(WaitPeriod::Wait);
        config.items_per_producer = 0;
        let report = run(&config).unwrap();
        assert_eq!(report.pushed, 0);
        assert_eq!(report.popped, 0);
        assert!(report.is_consistent());
    }

    #[test]
    fn test_run_with_unallocatable_capacity() {
        let config = Config::from_reader(r#"{ "capacity": 18446744073709551615 }"#.as_bytes())
            .unwrap();
        match run(&config) {
            Err(QueueError::Alloc(_)) => {}
            other => panic!("expected alloc error, got {:?}", other),
        }
    }

    #[test]
    fn test_report_consistency() {
        let mut report = Report {
            pushed: 10,
            popped: 10,
            ..Report::default()
        };
        assert!(report.is_consistent());
        report.out_of_order = 1;
        assert!(!report.is_consistent());
        report.out_of_order = 0;
        report.popped = 9;
        assert!(!report.is_consistent());
    }
}

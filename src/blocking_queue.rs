//! Contains [BlockingQueue](struct.BlockingQueue.html), an unbounded FIFO queue that consumers
//! can block on
//!
//! Every operation goes through a single `Mutex`. Consumers that find the queue empty park on a
//! `Condvar` which is signaled whenever an item is pushed, the queue is cleared or closed.
//!
//! When several consumers are parked, which one receives a pushed item is up to the platform's
//! `Condvar` implementation. Items themselves are always delivered in the order they were pushed.

use std::collections::{TryReserveError, VecDeque};
use std::fmt;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use crate::util::{duration_string, LockCondvarGuard, Notify};
use crate::wait_for::{WaitPeriod, lock_mutex, wait_condvar_while};

quick_error! {
    /// An error that can be returned from [BlockingQueue](struct.BlockingQueue.html) methods
    #[derive(Debug)]
    pub enum QueueError {
        /// The queue was closed with [close](struct.BlockingQueue.html#method.close). Returned by
        /// pushes, and by pops once every remaining item has been taken.
        Closed {
            description("queue is closed")
            display("queue is closed")
        }
        /// Growing the queue to hold another item failed
        Alloc(err: TryReserveError) {
            from()
            description("failed to allocate space for queue item")
            display("failed to allocate space for queue item: {}", err)
            cause(err)
        }
    }
}

/// A result that can be returned from [BlockingQueue](struct.BlockingQueue.html) methods
pub type QueueResult<T> = Result<T, QueueError>;

struct QueueData<T> {
    items: VecDeque<T>,
    closed: bool,
    // bumped on every push, clear and close so a timed waiter can tell a real signal from a
    // spurious wakeup
    signals: u64,
}

impl<T> QueueData<T> {
    fn with_capacity(cap: usize) -> Self {
        QueueData {
            items: VecDeque::with_capacity(cap),
            closed: false,
            signals: 0,
        }
    }

    fn signal(&mut self) {
        self.signals = self.signals.wrapping_add(1);
    }
}

/// A thread-safe FIFO queue with blocking, timed and non-blocking pops
///
/// Pushing never blocks; the queue grows as needed. `BlockingQueue` is deliberately not `Clone`,
/// share it by reference or behind an `Arc` (see [new_arc](#method.new_arc)).
///
/// # Examples
/// ```
/// use blockq::BlockingQueue;
/// use std::thread;
///
/// let queue = BlockingQueue::new_arc();
/// let consumer = {
///     let queue = queue.clone();
///     thread::spawn(move || queue.pop().unwrap())
/// };
/// queue.push("hello").unwrap();
/// assert_eq!(consumer.join().unwrap(), "hello");
/// ```
pub struct BlockingQueue<T> {
    data: Mutex<QueueData<T>>,
    not_empty: Condvar,
}

impl<T> BlockingQueue<T> {
    /// Creates a new empty `BlockingQueue`
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a new empty `BlockingQueue` with space for at least `cap` items before it has to
    /// reallocate
    pub fn with_capacity(cap: usize) -> Self {
        BlockingQueue {
            data: Mutex::new(QueueData::with_capacity(cap)),
            not_empty: Condvar::new(),
        }
    }

    /// Same as [with_capacity](#method.with_capacity), but reports a failure to allocate space for
    /// `cap` items instead of panicking
    pub fn try_with_capacity(cap: usize) -> QueueResult<Self> {
        let mut data = QueueData::with_capacity(0);
        data.items.try_reserve(cap)?;
        Ok(BlockingQueue {
            data: Mutex::new(data),
            not_empty: Condvar::new(),
        })
    }

    /// Creates a new empty `BlockingQueue` inside an `Arc`, ready to be shared between threads
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Gets the number of items currently in the queue. Other threads may change it as soon as
    /// this returns.
    pub fn len(&self) -> usize {
        lock_mutex(&self.data).items.len()
    }

    /// Checks if the queue currently holds no items
    pub fn is_empty(&self) -> bool {
        lock_mutex(&self.data).items.is_empty()
    }

    /// Checks if [close](#method.close) has been called
    pub fn is_closed(&self) -> bool {
        lock_mutex(&self.data).closed
    }

    /// Pushes `item` onto the back of the queue and wakes one waiting consumer
    ///
    /// # Errors
    /// `QueueError::Closed` if the queue has been closed, `QueueError::Alloc` if the queue could
    /// not grow. `item` is dropped in both cases.
    pub fn push(&self, item: T) -> QueueResult<()> {
        let mut data = lock_mutex(&self.data);
        if data.closed {
            return Err(QueueError::Closed);
        }
        data.items.try_reserve(1)?;
        data.items.push_back(item);
        data.signal();
        // only a successful push wakes a consumer
        self.not_empty.notify_one();
        Ok(())
    }

    /// Removes the item at the front of the queue, waiting for as long as it takes for one to be
    /// pushed
    ///
    /// # Errors
    /// `QueueError::Closed` once the queue is closed and every item pushed before that has been
    /// taken.
    pub fn pop(&self) -> QueueResult<T> {
        let (mut data, _) = wait_condvar_while(&self.not_empty,
                                               lock_mutex(&self.data),
                                               &WaitPeriod::Wait,
                                               |data| data.items.is_empty() && !data.closed);
        data.items.pop_front().ok_or(QueueError::Closed)
    }

    /// Same as [pop](#method.pop), but moves the item into `slot` instead of returning it
    pub fn pop_into(&self, slot: &mut T) -> QueueResult<()> {
        *slot = self.pop()?;
        Ok(())
    }

    /// Removes the item at the front of the queue if there is one, without waiting
    pub fn try_pop(&self) -> Option<T> {
        lock_mutex(&self.data).items.pop_front()
    }

    /// Tries to remove the item at the front of the queue, waiting at most `timeout` for one to be
    /// pushed. Moves the item into `slot` and returns true on success.
    ///
    /// See [pop_timeout](#method.pop_timeout) for exactly when this gives up.
    pub fn timed_pop(&self, slot: &mut T, timeout: Duration) -> bool {
        match self.pop_timeout(timeout) {
            Some(item) => {
                *slot = item;
                true
            }
            None => false,
        }
    }

    /// Tries to remove the item at the front of the queue, waiting at most `timeout` for one to be
    /// pushed
    ///
    /// If the queue is not empty the front item is returned right away. Otherwise this waits for
    /// the next push, [clear](#method.clear) or [close](#method.close), and then checks the queue
    /// exactly once: if another consumer took the pushed item first, or the wakeup came from a
    /// clear, `None` is returned without waiting out the rest of `timeout`. A zero `timeout` never
    /// waits.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let mut data = lock_mutex(&self.data);
        if let Some(item) = data.items.pop_front() {
            return Some(item);
        }
        if data.closed {
            return None;
        }
        let seen = data.signals;
        let period = WaitPeriod::from(timeout);
        let (mut data, timed_out) =
            wait_condvar_while(&self.not_empty, data, &period, |data| data.signals == seen);
        if timed_out {
            trace!("pop timed out after {}", duration_string(&timeout));
            return None;
        }
        let item = data.items.pop_front();
        if item.is_none() {
            trace!("woken within {} but the queue was empty again",
                   duration_string(&timeout));
        }
        item
    }

    /// Pops an item, waiting as specified by `period`
    ///
    /// `WaitPeriod::Wait` behaves like [pop](#method.pop) (returning `None` only when the queue
    /// is closed and drained), `WaitPeriod::AtMost` like [pop_timeout](#method.pop_timeout) and
    /// `WaitPeriod::None` like [try_pop](#method.try_pop).
    pub fn pop_for(&self, period: &WaitPeriod) -> Option<T> {
        match *period {
            WaitPeriod::Wait => self.pop().ok(),
            WaitPeriod::AtMost(timeout) => self.pop_timeout(timeout),
            WaitPeriod::None => self.try_pop(),
        }
    }

    /// Discards every item in the queue
    ///
    /// Wakes waiting consumers so that timed pops give up right away instead of waiting out their
    /// timeout. Consumers in [pop](#method.pop) go back to waiting.
    pub fn clear(&self) {
        let mut data = self.data.lock_condvar(&self.not_empty, Notify::All);
        let discarded = data.items.len();
        data.items.clear();
        data.signal();
        debug!("cleared queue, discarded {} items", discarded);
    }

    /// Closes the queue, waking every waiting consumer
    ///
    /// Further pushes fail with `QueueError::Closed`. Items already in the queue can still be
    /// popped; after that pops return `QueueError::Closed` (or `None`/`false`) without waiting.
    /// Closing an already closed queue does nothing.
    pub fn close(&self) {
        let mut data = self.data.lock_condvar(&self.not_empty, Notify::All);
        if !data.closed {
            data.closed = true;
            data.signal();
            debug!("closed queue with {} items pending", data.items.len());
        }
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let data = lock_mutex(&self.data);
        write!(f,
               "BlockingQueue {{ len: {}, closed: {} }}",
               data.items.len(),
               data.closed)
    }
}

#![warn(missing_docs)]

//! A thread-safe blocking FIFO queue
//!
//! [BlockingQueue](struct.BlockingQueue.html) is an unbounded queue that any number of threads can
//! push to and pop from. Pops can wait indefinitely, wait for at most some timeout, or not wait at
//! all. The [workload](workload/index.html) module drives a queue with producer and consumer
//! threads and backs the `blockq` binary.

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate quick_error;

extern crate chrono;
extern crate serde;
extern crate serde_json;

pub mod blocking_queue;
pub mod wait_for;
pub mod util;
pub mod config;
pub mod workload;

pub use blocking_queue::{BlockingQueue, QueueError, QueueResult};
pub use wait_for::WaitPeriod;
pub use config::{Config, ConfigError, ConfigResult};

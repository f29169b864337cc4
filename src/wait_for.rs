//! Contains methods for waiting for periods of time for events to happen

use std::cmp::{PartialOrd, Ordering};
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use serde::de::{self, Deserialize, Deserializer, Unexpected, Visitor};
use serde::ser::{Serialize, Serializer};
use crate::util::{duration_string, parse_duration};

/// Represents a time to wait for when waiting for an event to occur.
#[derive(Clone, PartialEq, Eq)]
pub enum WaitPeriod {
    /// Just wait for the next occurence of the event
    Wait,
    /// Wait at most for the specified duration (wait for a timeout)
    AtMost(Duration),
    /// Don't wait at all and return immediately
    None,
}

impl WaitPeriod {
    /// Converts a signed number of milliseconds into a `WaitPeriod`. Zero or negative values mean
    /// "don't wait".
    pub fn from_millis(millis: i64) -> Self {
        if millis <= 0 {
            WaitPeriod::None
        } else {
            WaitPeriod::AtMost(Duration::from_millis(millis as u64))
        }
    }
}

impl From<Duration> for WaitPeriod {
    fn from(dur: Duration) -> Self {
        if dur == Duration::from_secs(0) {
            WaitPeriod::None
        } else {
            WaitPeriod::AtMost(dur)
        }
    }
}

impl PartialOrd for WaitPeriod {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WaitPeriod {
    fn cmp(&self, other: &Self) -> Ordering {
        use self::WaitPeriod::*;
        match (self, other) {
            (&Wait, &Wait) | (&None, &None) => Ordering::Equal,
            (&Wait, _) | (_, &None) => Ordering::Greater,
            (_, &Wait) | (&None, _) => Ordering::Less,
            (&AtMost(ref dur1), &AtMost(ref dur2)) => dur1.cmp(dur2),
        }
    }
}

impl fmt::Debug for WaitPeriod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::WaitPeriod::*;
        match *self {
            Wait => "Wait".fmt(f),
            AtMost(ref dur) => write!(f, "AtMost({})", duration_string(dur)),
            None => "None".fmt(f),
        }
    }
}

impl Serialize for WaitPeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use self::WaitPeriod::*;
        match *self {
            Wait => serializer.serialize_str("wait"),
            AtMost(ref dur) => serializer.serialize_str(&duration_string(dur)),
            None => serializer.serialize_str("none"),
        }
    }
}

struct WaitPeriodVisitor;

impl<'de> Visitor<'de> for WaitPeriodVisitor {
    type Value = WaitPeriod;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("\"wait\", \"none\", a duration string or a number of milliseconds")
    }

    fn visit_i64<E: de::Error>(self, millis: i64) -> Result<WaitPeriod, E> {
        Ok(WaitPeriod::from_millis(millis))
    }

    fn visit_u64<E: de::Error>(self, millis: u64) -> Result<WaitPeriod, E> {
        Ok(WaitPeriod::from(Duration::from_millis(millis)))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<WaitPeriod, E> {
        match s {
            "wait" => Ok(WaitPeriod::Wait),
            "none" => Ok(WaitPeriod::None),
            _ => {
                parse_duration(s)
                    .map(WaitPeriod::from)
                    .ok_or_else(|| E::invalid_value(Unexpected::Str(s), &self))
            }
        }
    }
}

impl<'de> Deserialize<'de> for WaitPeriod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(WaitPeriodVisitor)
    }
}

/// Locks `mutex`, ignoring poisoning.
///
/// Only use this for data which every critical section leaves consistent even if the thread
/// holding the lock panics.
pub fn lock_mutex<T>(mutex: &Mutex<T>) -> MutexGuard<T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Waits on `condvar` while `condition` returns true, for at most `period`.
///
/// The condition is re-checked after every wakeup, so spurious wakeups never end the wait early.
/// Returns the re-acquired guard and whether the wait gave up with `condition` still true. With
/// `WaitPeriod::None` the condition is checked once without releasing the lock.
pub fn wait_condvar_while<'a, T, F>(condvar: &Condvar,
                                    guard: MutexGuard<'a, T>,
                                    period: &WaitPeriod,
                                    mut condition: F)
                                    -> (MutexGuard<'a, T>, bool)
    where F: FnMut(&mut T) -> bool
{
    use self::WaitPeriod::*;
    match *period {
        Wait => {
            let guard = condvar.wait_while(guard, condition)
                .unwrap_or_else(PoisonError::into_inner);
            (guard, false)
        }
        AtMost(dur) => {
            let (guard, result) = condvar.wait_timeout_while(guard, dur, condition)
                .unwrap_or_else(PoisonError::into_inner);
            (guard, result.timed_out())
        }
        None => {
            let mut guard = guard;
            let gave_up = condition(&mut *guard);
            (guard, gave_up)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_wait_period_ordering() {
        let mut periods = vec![WaitPeriod::Wait,
                               WaitPeriod::AtMost(Duration::from_secs(2)),
                               WaitPeriod::None,
                               WaitPeriod::AtMost(Duration::from_millis(5))];
        periods.sort();
        assert_eq!(periods,
                   vec![WaitPeriod::None,
                        WaitPeriod::AtMost(Duration::from_millis(5)),
                        WaitPeriod::AtMost(Duration::from_secs(2)),
                        WaitPeriod::Wait]);
        assert_eq!(::std::cmp::min(WaitPeriod::Wait, WaitPeriod::AtMost(Duration::from_secs(1))),
                   WaitPeriod::AtMost(Duration::from_secs(1)));
    }

    #[test]
    fn test_wait_period_conversions() {
        assert_eq!(WaitPeriod::from_millis(-10), WaitPeriod::None);
        assert_eq!(WaitPeriod::from_millis(0), WaitPeriod::None);
        assert_eq!(WaitPeriod::from_millis(15),
                   WaitPeriod::AtMost(Duration::from_millis(15)));
        assert_eq!(WaitPeriod::from(Duration::from_secs(0)), WaitPeriod::None);
        assert_eq!(format!("{:?}", WaitPeriod::AtMost(Duration::from_millis(1500))),
                   "AtMost(1s500ms)");
    }

    #[test]
    fn test_wait_period_serde() {
        let parse = |json: &str| ::serde_json::from_str::<WaitPeriod>(json);
        assert_eq!(parse("\"wait\"").unwrap(), WaitPeriod::Wait);
        assert_eq!(parse("\"none\"").unwrap(), WaitPeriod::None);
        assert_eq!(parse("\"2m30s\"").unwrap(),
                   WaitPeriod::AtMost(Duration::from_secs(150)));
        assert_eq!(parse("250").unwrap(), WaitPeriod::AtMost(Duration::from_millis(250)));
        assert_eq!(parse("-1").unwrap(), WaitPeriod::None);
        assert_eq!(parse("0").unwrap(), WaitPeriod::None);
        assert!(parse("\"soon\"").is_err());

        let period = WaitPeriod::AtMost(Duration::from_millis(1500));
        let json = ::serde_json::to_string(&period).unwrap();
        assert_eq!(json, "\"1s500ms\"");
        assert_eq!(parse(json.as_str()).unwrap(), period);
    }

    #[test]
    fn test_wait_condvar_while_none_does_not_block() {
        let mutex = Mutex::new(0);
        let condvar = Condvar::new();
        let (guard, gave_up) =
            wait_condvar_while(&condvar, lock_mutex(&mutex), &WaitPeriod::None, |n| *n == 0);
        assert!(gave_up);
        drop(guard);
        let (_guard, gave_up) =
            wait_condvar_while(&condvar, lock_mutex(&mutex), &WaitPeriod::None, |n| *n != 0);
        assert!(!gave_up);
    }

    #[test]
    fn test_wait_condvar_while_times_out() {
        let mutex = Mutex::new(0);
        let condvar = Condvar::new();
        let start = Instant::now();
        let period = WaitPeriod::AtMost(Duration::from_millis(30));
        let (guard, gave_up) = wait_condvar_while(&condvar, lock_mutex(&mutex), &period, |n| *n == 0);
        assert!(gave_up);
        assert_eq!(*guard, 0);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_wait_condvar_while_signaled() {
        let pair = Arc::new((Mutex::new(0), Condvar::new()));
        let waiter = {
            let pair = pair.clone();
            thread::spawn(move || {
                let (ref mutex, ref condvar) = *pair;
                let (guard, gave_up) =
                    wait_condvar_while(condvar, lock_mutex(mutex), &WaitPeriod::Wait, |n| *n == 0);
                let value = *guard;
                (value, gave_up)
            })
        };
        thread::sleep(Duration::from_millis(10));
        {
            let (ref mutex, ref condvar) = *pair;
            *lock_mutex(mutex) = 7;
            condvar.notify_all();
        }
        assert_eq!(waiter.join().unwrap(), (7, false));
    }

    #[test]
    fn test_lock_mutex_recovers_from_poison() {
        let mutex = Arc::new(Mutex::new(1));
        {
            let mutex = mutex.clone();
            let _ = thread::spawn(move || {
                let _guard = mutex.lock().unwrap();
                panic!("poisoning the mutex");
            }).join();
        }
        assert!(mutex.is_poisoned());
        assert_eq!(*lock_mutex(&mutex), 1);
    }
}

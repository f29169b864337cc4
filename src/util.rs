//! Contains various utilites that are used in the rest of the crate

use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;
use crate::wait_for::lock_mutex;

/// Gets a human-readable string representation of a `chrono::Duration`
pub fn chrono_duration_string(dur: &::chrono::Duration) -> String {
    if dur.is_zero() {
        return "0".into();
    }

    let (dur, neg): (::chrono::Duration, bool) = {
        if dur < &::chrono::Duration::zero() {
            (-(*dur), true)
        } else {
            (*dur, false)
        }
    };

    let weeks = dur.num_weeks();
    let days = dur.num_days() % 7;
    let hours = dur.num_hours() % 24;
    let minutes = dur.num_minutes() % 60;
    let secs = dur.num_seconds() % 60;
    let millis = dur.num_milliseconds() % 1000;
    let micros = dur.num_microseconds();
    let nanos = dur.num_nanoseconds();

    let mut s = String::new();
    if neg {
        s.push_str("-")
    }
    if weeks > 0 {
        s.push_str(&(weeks.to_string() + "w"))
    }
    if days > 0 {
        s.push_str(&(days.to_string() + "d"))
    }
    if hours > 0 {
        s.push_str(&(hours.to_string() + "h"))
    }
    if minutes > 0 {
        s.push_str(&(minutes.to_string() + "m"))
    }
    if secs > 0 {
        s.push_str(&(secs.to_string() + "s"))
    }
    if millis > 0 {
        s.push_str(&(millis.to_string() + "ms"))
    }
    if let Some(micros) = micros {
        let micros = micros % 1000;
        if micros > 0 {
            s.push_str(&(micros.to_string() + "us"))
        }
    }
    if let Some(nanos) = nanos {
        let nanos = nanos % 1000;
        if nanos > 0 {
            s.push_str(&(nanos.to_string() + "ns"))
        }
    }
    s
}

/// Gets a string representation of a `std::time::Duration`
///
/// Durations too large for `chrono` fall back to their `Debug` representation.
pub fn duration_string(duration: &Duration) -> String {
    match ::chrono::Duration::from_std(*duration) {
        Ok(dur) => chrono_duration_string(&dur),
        Err(_) => format!("{:?}", duration),
    }
}

/// Parses a duration in the format produced by [duration_string](fn.duration_string.html), ie.
/// `"1m30s"` or `"250ms"`. A bare `"0"` is a zero duration.
///
/// Returns `None` if the string is empty, negative or contains an unknown unit.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s == "0" {
        return Some(Duration::from_secs(0));
    }
    let mut total = Duration::from_secs(0);
    let mut rest = s;
    if rest.is_empty() {
        return None;
    }
    while !rest.is_empty() {
        let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits_end == 0 {
            return None;
        }
        let amount: u64 = rest[..digits_end].parse().ok()?;
        rest = &rest[digits_end..];
        let unit_end = rest.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(rest.len());
        let part = match &rest[..unit_end] {
            "w" => Duration::from_secs(amount.checked_mul(7 * 24 * 60 * 60)?),
            "d" => Duration::from_secs(amount.checked_mul(24 * 60 * 60)?),
            "h" => Duration::from_secs(amount.checked_mul(60 * 60)?),
            "m" => Duration::from_secs(amount.checked_mul(60)?),
            "s" => Duration::from_secs(amount),
            "ms" => Duration::from_millis(amount),
            "us" => Duration::from_micros(amount),
            "ns" => Duration::from_nanos(amount),
            _ => return None,
        };
        total = total.checked_add(part)?;
        rest = &rest[unit_end..];
    }
    Some(total)
}

/// Which waiters a [CondvarGuard](struct.CondvarGuard.html) wakes when it is dropped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notify {
    /// Wake a single waiter (`Condvar::notify_one`)
    One,
    /// Wake every waiter (`Condvar::notify_all`)
    All,
}

/// A guard returned by
/// [LockCondvarGuard.lock_condvar](trait.LockCondvarGuard.html#tymethod.lock_condvar).
/// It `Deref`s and `DerefMut`s to the underlying `MutexGuard`. It notifies on the `Condvar` when
/// it is `Drop`ed.
pub struct CondvarGuard<'a, T>
    where T: 'a
{
    mutex_guard: MutexGuard<'a, T>,
    condvar: &'a Condvar,
    notify: Notify,
}

impl<'mutex, T> Deref for CondvarGuard<'mutex, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.mutex_guard.deref()
    }
}

impl<'mutex, T> DerefMut for CondvarGuard<'mutex, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.mutex_guard.deref_mut()
    }
}

impl<'a, T> Drop for CondvarGuard<'a, T> {
    fn drop(&mut self) {
        match self.notify {
            Notify::One => self.condvar.notify_one(),
            Notify::All => self.condvar.notify_all(),
        }
        // self.mutex_guard is dropped right after this, which unlocks the mutex
    }
}

/// For objects that can be locked with a `Condvar`
pub trait LockCondvarGuard<T> {
    /// Locks `self`, notifying the `Condvar` according to `notify` when the returned
    /// `CondvarGuard` is dropped and unlocks `self`
    fn lock_condvar<'a>(&'a self, condvar: &'a Condvar, notify: Notify) -> CondvarGuard<'a, T>;
}

impl<T> LockCondvarGuard<T> for Mutex<T> {
    fn lock_condvar<'a>(&'a self, condvar: &'a Condvar, notify: Notify) -> CondvarGuard<'a, T> {
        CondvarGuard {
            mutex_guard: lock_mutex(self),
            condvar: condvar,
            notify: notify,
        }
    }
}

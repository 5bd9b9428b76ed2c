// The MIT License (MIT)

// Copyright (c) 2026 The pledge Developers

// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:

// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Delayed jobs

use std::cmp::{Ord, Ordering, PartialOrd};
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use slab::Slab;

use crate::error::log_panic;
use crate::executor::Job;

/// Runs a job after at least the requested delay has elapsed.
pub trait Timer: Send + Sync + 'static {
    fn schedule(&self, delay: Duration, job: Job);
}

#[derive(Eq, PartialEq)]
struct SleepingJob {
    deadline: Instant,
    seq: u64,
    token: usize,
}

// Reversed so the max-heap yields the earliest deadline first, and jobs with
// equal deadlines in the order they were scheduled.
impl PartialOrd<SleepingJob> for SleepingJob {
    fn partial_cmp(&self, other: &SleepingJob) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SleepingJob {
    fn cmp(&self, other: &SleepingJob) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct Wheel {
    sleeping: BinaryHeap<SleepingJob>,
    jobs: Slab<Job>,
    next_seq: u64,
    running: bool,
    shutdown: bool,
}

impl Wheel {
    /// Pop every job whose deadline has passed.
    fn take_due(&mut self, now: Instant) -> Vec<Job> {
        let mut due = Vec::new();

        while let Some(sleeping) = self.sleeping.peek() {
            if sleeping.deadline > now {
                break;
            }

            let token = sleeping.token;
            self.sleeping.pop();
            due.push(self.jobs.remove(token));
        }

        due
    }
}

struct Shared {
    wheel: Mutex<Wheel>,
    cond: Condvar,
}

/// A `Timer` backed by one background thread sleeping until the earliest deadline.
///
/// The thread is spawned on the first `schedule` call. Jobs run on that
/// thread, so they should be short; sealing a guarantee is the intended use.
pub struct TimerThread {
    name: String,
    shared: Arc<Shared>,
}

impl TimerThread {
    pub fn new<N: Into<String>>(name: N) -> TimerThread {
        TimerThread {
            name: name.into(),
            shared: Arc::new(Shared {
                wheel: Mutex::new(Wheel {
                    sleeping: BinaryHeap::new(),
                    jobs: Slab::new(),
                    next_seq: 0,
                    running: false,
                    shutdown: false,
                }),
                cond: Condvar::new(),
            }),
        }
    }

    /// Number of jobs that have not fired yet.
    pub fn pending(&self) -> usize {
        self.shared.wheel.lock().jobs.len()
    }

    fn spawn(&self, wheel: &mut MutexGuard<Wheel>) {
        let shared = self.shared.clone();
        let name = self.name.clone();

        match thread::Builder::new().name(self.name.clone()).spawn(move || run(&name, &shared)) {
            Ok(_) => wheel.running = true,
            Err(err) => error!("failed to start timer {}: {}", self.name, err),
        }
    }
}

fn run(name: &str, shared: &Shared) {
    debug!("timer {} started", name);

    let mut wheel = shared.wheel.lock();

    loop {
        let due = wheel.take_due(Instant::now());

        if !due.is_empty() {
            MutexGuard::unlocked(&mut wheel, || {
                for job in due {
                    log_panic("timer job", job);
                }
            });
            continue;
        }

        match wheel.sleeping.peek().map(|s| s.deadline) {
            Some(deadline) => {
                shared.cond.wait_until(&mut wheel, deadline);
            }
            None if wheel.shutdown => break,
            None => shared.cond.wait(&mut wheel),
        }
    }

    wheel.running = false;
    debug!("timer {} stopped", name);
}

impl Timer for TimerThread {
    fn schedule(&self, delay: Duration, job: Job) {
        let mut wheel = self.shared.wheel.lock();

        let deadline = Instant::now() + delay;
        let token = wheel.jobs.insert(job);
        let seq = wheel.next_seq;
        wheel.next_seq += 1;
        wheel.sleeping.push(SleepingJob { deadline, seq, token });

        trace!("timer {} scheduled job {} in {:?}", self.name, token, delay);

        if !wheel.running {
            self.spawn(&mut wheel);

            if !wheel.running {
                // no thread to run it; fire now rather than never
                let due = wheel.take_due(deadline);
                drop(wheel);
                for job in due {
                    log_panic("timer job", job);
                }
                return;
            }
        }

        self.shared.cond.notify_one();
    }
}

impl Drop for TimerThread {
    fn drop(&mut self) {
        let mut wheel = self.shared.wheel.lock();
        wheel.shutdown = true;
        self.shared.cond.notify_one();
    }
}

impl fmt::Debug for TimerThread {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TimerThread({:?})", self.name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::sync::mpsc;

    #[test]
    fn test_timer_fires_in_deadline_order() {
        let timer = TimerThread::new("pledge-test-timer");
        let (tx, rx) = mpsc::channel();

        for &(delay, tag) in &[(60u64, "c"), (20, "a"), (40, "b"), (40, "b2")] {
            let tx = tx.clone();
            timer.schedule(Duration::from_millis(delay), Box::new(move || tx.send(tag).unwrap()));
        }

        let fired: Vec<_> = (0..4)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        assert_eq!(fired, vec!["a", "b", "b2", "c"]);
        assert_eq!(timer.pending(), 0);
    }

    #[test]
    fn test_timer_respects_delay() {
        let timer = TimerThread::new("pledge-test-timer-delay");
        let (tx, rx) = mpsc::channel();
        let start = Instant::now();

        timer.schedule(Duration::from_millis(30), Box::new(move || tx.send(Instant::now()).unwrap()));

        let fired_at = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(fired_at.duration_since(start) >= Duration::from_millis(30));
    }

    #[test]
    fn test_zero_delay_fires() {
        let timer = TimerThread::new("pledge-test-timer-zero");
        let (tx, rx) = mpsc::channel();
        timer.schedule(Duration::from_millis(0), Box::new(move || tx.send(()).unwrap()));
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn test_timer_survives_panicking_job() {
        let timer = TimerThread::new("pledge-test-timer-panic");
        let (tx, rx) = mpsc::channel();

        timer.schedule(Duration::from_millis(0), Box::new(|| panic!("timer job failed")));
        {
            let tx = tx.clone();
            timer.schedule(Duration::from_millis(1), Box::new(move || tx.send("second").unwrap()));
        }
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "second");

        timer.schedule(Duration::from_millis(5), Box::new(move || tx.send("later").unwrap()));
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "later");
        assert_eq!(timer.pending(), 0);
    }
}

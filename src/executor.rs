// Copyright 2026 The pledge Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Where continuations run
//!
//! The combinators never own threads. Every piece of user work is handed to
//! an `ExecutorRef`, which either runs it inline on the calling thread or
//! enqueues it on an `Executor` supplied by the caller.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::config::{self, Config};
use crate::error::{catch_panic, log_panic, Result};
use crate::guarantee::Guarantee;
use crate::promise::Promise;

/// A unit of work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Accepts a unit of work and runs it exactly once, eventually.
pub trait Executor: Send + Sync + 'static {
    fn execute(&self, job: Job);
}

impl<F> Executor for F
where
    F: Fn(Job) + Send + Sync + 'static,
{
    fn execute(&self, job: Job) {
        self(job)
    }
}

/// Handle to the place a continuation is dispatched to.
#[derive(Clone)]
pub enum ExecutorRef {
    /// Run on the calling thread, right away.
    Inline,
    /// Submit to an executor.
    Queue(Arc<dyn Executor>),
}

impl ExecutorRef {
    pub fn new<E: Executor>(executor: E) -> ExecutorRef {
        ExecutorRef::Queue(Arc::new(executor))
    }

    pub fn is_inline(&self) -> bool {
        matches!(*self, ExecutorRef::Inline)
    }

    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match *self {
            ExecutorRef::Inline => f(),
            ExecutorRef::Queue(ref executor) => executor.execute(Box::new(f)),
        }
    }

    /// Run a fallible body on this executor and return a promise of its result.
    pub fn promise<T, F>(&self, body: F) -> Promise<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        self.promise_in(&config::current(), body)
    }

    pub fn promise_in<T, F>(&self, config: &Arc<Config>, body: F) -> Promise<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (promise, resolver) = Promise::pending_in(config);
        self.execute(move || resolver.resolve(catch_panic(body).into()));
        promise
    }

    /// Run an infallible body on this executor and return a guarantee of its value.
    pub fn guarantee<T, F>(&self, body: F) -> Guarantee<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (guarantee, sealer) = Guarantee::pending_in(&config::current());
        self.execute(move || {
            log_panic("executor guarantee body", move || {
                sealer.seal(body());
            });
        });
        guarantee
    }
}

impl Default for ExecutorRef {
    fn default() -> ExecutorRef {
        ExecutorRef::Inline
    }
}

impl fmt::Debug for ExecutorRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ExecutorRef::Inline => write!(f, "ExecutorRef::Inline"),
            ExecutorRef::Queue(_) => write!(f, "ExecutorRef::Queue(..)"),
        }
    }
}

/// Runs jobs one after another, in submission order, on a single named thread.
///
/// The worker is started lazily on the first job and exits once every
/// `SerialExecutor` handle is dropped and the queue has drained.
pub struct SerialExecutor {
    name: String,
    sender: Mutex<Option<Sender<Job>>>,
}

impl SerialExecutor {
    pub fn new<N: Into<String>>(name: N) -> SerialExecutor {
        SerialExecutor {
            name: name.into(),
            sender: Mutex::new(None),
        }
    }

    fn start(&self) -> io::Result<Sender<Job>> {
        let (tx, rx) = mpsc::channel::<Job>();
        let name = self.name.clone();

        thread::Builder::new().name(self.name.clone()).spawn(move || {
            debug!("executor {} started", name);
            for job in rx {
                log_panic("executor job", job);
            }
            debug!("executor {} stopped", name);
        })?;

        Ok(tx)
    }
}

impl Executor for SerialExecutor {
    fn execute(&self, job: Job) {
        let mut sender = self.sender.lock();

        if sender.is_none() {
            match self.start() {
                Ok(tx) => *sender = Some(tx),
                Err(err) => {
                    error!("failed to start executor {}: {}, running job inline", self.name, err);
                    drop(sender);
                    return job();
                }
            }
        }

        let sent = match *sender {
            Some(ref tx) => tx.send(job),
            None => return,
        };

        if let Err(mpsc::SendError(job)) = sent {
            // the worker thread is gone
            warn!("executor {} worker is gone, restarting", self.name);
            *sender = None;
            drop(sender);
            self.execute(job);
        }
    }
}

impl fmt::Debug for SerialExecutor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SerialExecutor({:?})", self.name)
    }
}

/// Runs every job on a freshly spawned, named thread.
pub struct SpawnExecutor {
    prefix: String,
    counter: AtomicUsize,
}

impl SpawnExecutor {
    pub fn new<N: Into<String>>(prefix: N) -> SpawnExecutor {
        SpawnExecutor {
            prefix: prefix.into(),
            counter: AtomicUsize::new(0),
        }
    }
}

impl Executor for SpawnExecutor {
    fn execute(&self, job: Job) {
        let id = self.counter.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}-{}", self.prefix, id);

        // `spawn` consumes the job even when it fails, so hand it over through a slot.
        let slot = Arc::new(Mutex::new(Some(job)));
        let theirs = slot.clone();

        let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
            if let Some(job) = theirs.lock().take() {
                log_panic("executor job", job);
            }
        });

        if let Err(err) = spawned {
            error!("failed to spawn {}: {}, running job inline", name, err);
            if let Some(job) = slot.lock().take() {
                job();
            }
        }
    }
}

impl fmt::Debug for SpawnExecutor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SpawnExecutor({:?})", self.prefix)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::sync::mpsc;
    use std::time::Duration;

    use crate::thenable::Thenable;

    #[test]
    fn test_inline_runs_immediately() {
        let ran = Arc::new(AtomicUsize::new(0));
        {
            let ran = ran.clone();
            ExecutorRef::Inline.execute(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_serial_executor_keeps_order() {
        let executor = ExecutorRef::new(SerialExecutor::new("pledge-test-serial"));
        let (tx, rx) = mpsc::channel();

        for i in 0..100 {
            let tx = tx.clone();
            executor.execute(move || {
                tx.send((i, thread::current().name().map(str::to_owned))).unwrap();
            });
        }

        let received: Vec<_> = (0..100)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();

        assert_eq!(
            received.iter().map(|&(i, _)| i).collect::<Vec<_>>(),
            (0..100).collect::<Vec<_>>()
        );
        assert!(received
            .iter()
            .all(|(_, name)| name.as_deref() == Some("pledge-test-serial")));
    }

    #[test]
    fn test_spawn_executor_names_threads() {
        let executor = ExecutorRef::new(SpawnExecutor::new("pledge-test-spawn"));
        let (tx, rx) = mpsc::channel();

        executor.execute(move || {
            tx.send(thread::current().name().map(str::to_owned)).unwrap();
        });

        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        assert!(name.starts_with("pledge-test-spawn-"));
    }

    #[test]
    fn test_serial_executor_survives_panicking_jobs() {
        let executor = ExecutorRef::new(SerialExecutor::new("pledge-test-serial-panic"));
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let (tx, rx) = mpsc::channel();

        executor.execute(move || {
            let _ = gate_rx.recv_timeout(Duration::from_secs(5));
        });
        let never = executor.guarantee(|| -> i32 { panic!("guarantee body failed") });
        executor.execute(|| panic!("job failed"));
        {
            let tx = tx.clone();
            executor.execute(move || tx.send(42).unwrap());
        }
        gate_tx.send(()).unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
        assert!(never.is_pending());

        executor.execute(move || tx.send(43).unwrap());
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 43);
    }

    #[test]
    fn test_closure_executor() {
        let executor = ExecutorRef::new(|job: Job| job());
        let (tx, rx) = mpsc::channel();
        executor.execute(move || tx.send(5).unwrap());
        assert_eq!(rx.try_recv().unwrap(), 5);
    }
}

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pledge::{Config, Error, ExecutorRef, Outcome, Promise, PromiseError, SerialExecutor, SpawnExecutor, Thenable};

#[test]
fn test_then_chain() {
    let _ = env_logger::try_init();

    let result = Promise::value(2)
        .then(|v| Ok(Promise::value(v * 2)))
        .then(|v| Ok(Promise::value(v / 2)))
        .wait()
        .unwrap();

    assert_eq!(result, 2);
}

#[test]
fn test_settle_twice_keeps_first() {
    let _ = env_logger::try_init();

    let (promise, resolver) = Promise::pending();
    resolver.fulfill("first");
    resolver.fulfill("second");
    resolver.reject(Error::msg("third"));

    assert_eq!(promise.wait().unwrap(), "first");
}

#[test]
fn test_observers_fire_exactly_once() {
    let _ = env_logger::try_init();

    let (promise, resolver) = Promise::<usize>::pending();
    let fired = Arc::new(AtomicUsize::new(0));

    for _ in 0..10 {
        let fired = fired.clone();
        promise.pipe(move |_| {
            fired.fetch_add(1, Ordering::SeqCst);
        });
    }

    let settlers: Vec<_> = (0..4)
        .map(|i| {
            let resolver = resolver.clone();
            thread::spawn(move || resolver.fulfill(i))
        })
        .collect();

    for _ in 0..10 {
        let fired = fired.clone();
        promise.pipe(move |_| {
            fired.fetch_add(1, Ordering::SeqCst);
        });
    }

    for settler in settlers {
        settler.join().unwrap();
    }

    promise.wait().unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 20);
}

#[test]
fn test_bridge_callback_api() {
    let _ = env_logger::try_init();

    fn legacy_lookup<F>(key: &'static str, callback: F)
    where
        F: FnOnce(Option<usize>, Option<Error>) + Send + 'static,
    {
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            match key {
                "missing" => callback(None, Some(Error::msg("no such key"))),
                "broken" => callback(None, None),
                _ => callback(Some(key.len()), None),
            }
        });
    }

    let found: Promise<usize> = Promise::new(|resolver| {
        legacy_lookup("answer", move |value, error| resolver.resolve_callback(value, error));
        Ok(())
    });
    assert_eq!(found.wait().unwrap(), 6);

    let missing: Promise<usize> = Promise::new(|resolver| {
        legacy_lookup("missing", move |value, error| resolver.resolve_callback(value, error));
        Ok(())
    });
    assert_eq!(missing.wait().unwrap_err().to_string(), "no such key");

    let broken: Promise<usize> = Promise::new(|resolver| {
        legacy_lookup("broken", move |value, error| resolver.resolve_callback(value, error));
        Ok(())
    });
    assert_eq!(
        broken.wait().unwrap_err().downcast_ref::<PromiseError>(),
        Some(&PromiseError::InvalidCallingConvention)
    );
}

#[test]
fn test_transforms_run_on_configured_executor() {
    let _ = env_logger::try_init();

    let config = Config::default()
        .with_map(ExecutorRef::new(SerialExecutor::new("pledge-it-map")))
        .into_shared();

    let name = Promise::value_in(&config, ())
        .map(|()| Ok(thread::current().name().map(str::to_owned)))
        .wait()
        .unwrap();
    assert_eq!(name.as_deref(), Some("pledge-it-map"));

    let elsewhere = Promise::value_in(&config, ())
        .map_on(ExecutorRef::new(SpawnExecutor::new("pledge-it-spawn")), |()| {
            Ok(thread::current().name().map(str::to_owned))
        })
        .wait()
        .unwrap();
    assert!(elsewhere.unwrap().starts_with("pledge-it-spawn-"));
}

#[test]
fn test_executor_promise() {
    let _ = env_logger::try_init();

    let executor = ExecutorRef::new(SpawnExecutor::new("pledge-it-work"));
    let work = executor.promise(|| Ok(21 * 2));
    let failed = executor.promise(|| -> pledge::Result<i32> { Err(Error::msg("failed")) });

    assert_eq!(work.wait().unwrap(), 42);
    assert!(failed.wait().is_err());
    assert_eq!(executor.guarantee(|| "done").wait(), "done");
}

#[test]
fn test_tap_and_as_void() {
    let _ = env_logger::try_init();

    let seen = Arc::new(AtomicUsize::new(0));
    let promise = {
        let seen = seen.clone();
        Promise::value(5).tap(move |outcome| {
            if let Outcome::Fulfilled(v) = outcome {
                seen.store(v, Ordering::SeqCst);
            }
        })
    };

    promise.as_void().wait().unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 5);
}

#[test]
fn test_cauterize() {
    let _ = env_logger::try_init();

    Promise::<()>::rejected(Error::msg("ignored on purpose")).cauterize();
}

#[test]
fn test_panicking_observer_keeps_chain_alive() {
    let _ = env_logger::try_init();

    let config = Config::inline().into_shared();
    let (promise, resolver) = Promise::<i32>::pending_in(&config);
    let fired = Arc::new(AtomicUsize::new(0));

    promise.pipe(|_| panic!("observer failed"));
    {
        let fired = fired.clone();
        promise.pipe(move |_| {
            fired.fetch_add(1, Ordering::SeqCst);
        });
    }

    let settled = panic::catch_unwind(AssertUnwindSafe(|| resolver.fulfill(1)));
    assert!(settled.is_err());
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    {
        let fired = fired.clone();
        promise.pipe(move |_| {
            fired.fetch_add(1, Ordering::SeqCst);
        });
    }
    assert_eq!(fired.load(Ordering::SeqCst), 2);

    let mapped = promise.map(|v| Ok(v + 1));
    assert_eq!(mapped.value(), Some(2));
}

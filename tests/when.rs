use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;

use pledge::{
    after, when_fulfilled, when_fulfilled2, when_fulfilled_concurrently, when_resolved, Error, Outcome, Promise,
    Thenable,
};

#[test]
fn test_when_fulfilled_empty() {
    let _ = env_logger::try_init();

    let joined = when_fulfilled(Vec::<Promise<i32>>::new());
    assert!(joined.is_fulfilled());
    assert_eq!(joined.wait().unwrap(), Vec::<i32>::new());
}

#[test]
fn test_when_fulfilled_random_delays_keep_order() {
    let _ = env_logger::try_init();

    let mut rng = rand::thread_rng();
    let promises: Vec<_> = (0..20)
        .map(|i| {
            let delay = Duration::from_millis(rng.gen_range(0..20));
            after(delay).then_map(move |()| Ok(i))
        })
        .collect();

    assert_eq!(when_fulfilled(promises).wait().unwrap(), (0..20).collect::<Vec<_>>());
}

#[test]
fn test_when_fulfilled_rejects_with_first_by_time() {
    let _ = env_logger::try_init();

    let slow = after(Duration::from_millis(30)).then_map(|()| -> pledge::Result<i32> { Err(Error::msg("slow")) });
    let fast = after(Duration::from_millis(1)).then_map(|()| -> pledge::Result<i32> { Err(Error::msg("fast")) });

    let error = when_fulfilled(vec![slow, fast]).wait().unwrap_err();
    assert_eq!(error.to_string(), "fast");
}

#[test]
fn test_when_resolved_reports_every_outcome() {
    let _ = env_logger::try_init();

    let outcomes = when_resolved(vec![Promise::value(1), Promise::rejected(Error::msg("E"))]).wait();

    assert_eq!(outcomes.len(), 2);
    assert!(matches!(outcomes[0], Outcome::Fulfilled(1)));
    assert_eq!(outcomes[1].error().unwrap().to_string(), "E");
}

#[test]
fn test_when_fulfilled2_mixed() {
    let _ = env_logger::try_init();

    let both = when_fulfilled2(Promise::value("name"), after(Duration::from_millis(2)).map(|()| 7u8));
    assert_eq!(both.wait().unwrap(), ("name", 7));
}

#[test]
fn test_bounded_join_limits_in_flight() {
    let _ = env_logger::try_init();

    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let source = {
        let in_flight = in_flight.clone();
        let peak = peak.clone();

        (0..10).map(move |i| {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);

            let in_flight = in_flight.clone();
            after(Duration::from_millis(10)).then_map(move |()| {
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(i)
            })
        })
    };

    let values = when_fulfilled_concurrently(source, 3).wait().unwrap();

    assert_eq!(values, (0..10).collect::<Vec<_>>());
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(peak.load(Ordering::SeqCst) >= 1);
}

#[test]
fn test_bounded_join_stops_pulling_after_rejection() {
    let _ = env_logger::try_init();

    let pulled = Arc::new(Mutex::new(Vec::new()));

    let source = {
        let pulled = pulled.clone();
        (0..3).map(move |i| {
            pulled.lock().push(i);
            if i == 1 {
                Promise::rejected(Error::msg("second"))
            } else {
                Promise::value(i)
            }
        })
    };

    let error = when_fulfilled_concurrently(source, 1).wait().unwrap_err();

    assert_eq!(error.to_string(), "second");
    assert_eq!(*pulled.lock(), vec![0, 1]);
}

#[test]
fn test_when_fulfilled_ignores_late_loser() {
    let _ = env_logger::try_init();

    let (slow, slow_resolver) = Promise::<i32>::pending();
    let (failing, failing_resolver) = Promise::<i32>::pending();
    let scaled = slow.map(|v| Ok(v * 10));

    let joined = when_fulfilled(vec![slow, failing]);
    failing_resolver.reject(Error::msg("failed"));
    assert_eq!(joined.wait().unwrap_err().to_string(), "failed");

    slow_resolver.fulfill(4);
    assert_eq!(scaled.wait().unwrap(), 40);
    assert_eq!(joined.wait().unwrap_err().to_string(), "failed");
}

#[test]
fn test_bounded_join_ignores_late_loser() {
    let _ = env_logger::try_init();

    let (slow, slow_resolver) = Promise::<i32>::pending();
    let (failing, failing_resolver) = Promise::<i32>::pending();
    let scaled = slow.map(|v| Ok(v * 10));

    let joined = when_fulfilled_concurrently(vec![slow, failing], 2);
    failing_resolver.reject(Error::msg("failed"));
    assert_eq!(joined.wait().unwrap_err().to_string(), "failed");

    slow_resolver.fulfill(4);
    assert_eq!(scaled.wait().unwrap(), 40);
    assert_eq!(joined.wait().unwrap_err().to_string(), "failed");
}

#[test]
fn test_bounded_join_empty_source() {
    let _ = env_logger::try_init();

    let values = when_fulfilled_concurrently(std::iter::empty::<Promise<i32>>(), 5).wait().unwrap();
    assert!(values.is_empty());
}

#[test]
fn test_then_map_values_joins() {
    let _ = env_logger::try_init();

    let lengths = Promise::value(vec!["a", "bb", "ccc"])
        .then_map_values(|s| Ok(after(Duration::from_millis(1)).map(move |()| s.len())))
        .wait()
        .unwrap();

    assert_eq!(lengths, vec![1, 2, 3]);
}

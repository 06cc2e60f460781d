//! Pool lifecycle: disposal ordering, round-robin fan-out, and genuine
//! parallelism of the work-stealing topology.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use magpie::{
    ActorCell, Dispatcher, DispatcherConfig, PooledDispatcher, SchedulerConfig, SchedulerError,
    SchedulerGroup, TaskScheduler, ThreadFactory, Topology,
};

#[test]
fn dispose_on_an_idle_pool_returns_promptly() {
    let scheduler = TaskScheduler::new(SchedulerConfig::single_worker(ThreadFactory::new(
        "idle-pool",
    )))
    .unwrap();
    scheduler.dispose(Some(Duration::from_secs(5))).unwrap();
    assert!(scheduler.is_disposed());

    // Already disposed: submission is rejected, repeat disposal is a no-op.
    assert!(matches!(
        scheduler.submit(Box::new(|| {})),
        Err(SchedulerError::Disposed)
    ));
    scheduler.dispose(None).unwrap();
}

#[test]
fn dispose_waits_for_tasks_queued_before_it() {
    let scheduler = TaskScheduler::new(SchedulerConfig::single_worker(ThreadFactory::new(
        "draining-pool",
    )))
    .unwrap();
    let completed = Arc::new(AtomicUsize::new(0));

    for _ in 0..20 {
        let completed = Arc::clone(&completed);
        scheduler
            .submit(Box::new(move || {
                thread::sleep(Duration::from_millis(2));
                completed.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
    }

    scheduler.dispose(None).unwrap();
    assert_eq!(completed.load(Ordering::SeqCst), 20);
}

#[test]
fn round_robin_group_spreads_tasks_evenly_by_thread() {
    const MEMBERS: usize = 3;
    const TASKS: usize = 12;

    let group = SchedulerGroup::multi(MEMBERS, "rr-pool").unwrap();
    assert_eq!(group.len(), MEMBERS);

    let ran_on: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let handles: Vec<_> = (0..TASKS)
        .map(|_| {
            let ran_on = Arc::clone(&ran_on);
            group
                .start_on_next_scheduler(Box::new(move || {
                    if let Some(name) = thread::current().name() {
                        ran_on.lock().unwrap().push(name.to_string());
                    }
                }))
                .unwrap()
        })
        .collect();
    for handle in handles {
        assert!(handle.wait());
    }

    // Each member is a single-worker scheduler with a distinct name prefix,
    // so the worker thread name identifies the member.
    let ran_on = ran_on.lock().unwrap();
    assert_eq!(ran_on.len(), TASKS);
    for member in 0..MEMBERS {
        let prefix = format!("rr-pool-{member}-");
        let share = ran_on.iter().filter(|name| name.starts_with(&prefix)).count();
        assert_eq!(share, TASKS / MEMBERS, "uneven share for {prefix}");
    }

    group.dispose(Some(Duration::from_secs(5))).unwrap();
}

#[test]
fn work_stealing_pool_runs_tasks_concurrently() {
    let config = SchedulerConfig::new(2, Topology::WorkStealing, ThreadFactory::new("ws-pool"))
        .unwrap();
    let scheduler = TaskScheduler::new(config).unwrap();

    // Both tasks rendezvous at a two-party barrier. That only completes if
    // two workers run them at the same time.
    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            scheduler
                .submit(Box::new(move || {
                    barrier.wait();
                }))
                .unwrap()
        })
        .collect();
    for handle in handles {
        assert!(handle.wait_timeout(Duration::from_secs(5)));
    }

    scheduler.dispose(None).unwrap();
}

#[test]
fn pooled_dispatcher_drains_then_rejects_after_dispose() {
    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invocations);
    let dispatcher = Arc::new(
        PooledDispatcher::new("lifecycle", DispatcherConfig::default()).unwrap(),
    );
    let cell = ActorCell::new("lifecycle-actor", dispatcher.clone(), move |_| {
        thread::sleep(Duration::from_millis(1));
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let actor = cell.actor_ref();

    for _ in 0..10 {
        actor.tell(Box::new(()));
    }

    // Disposal completes the drain turns already queued before returning.
    dispatcher.dispose(None).unwrap();
    let settled = invocations.load(Ordering::SeqCst);

    // Nothing runs after the pool is gone; late sends fall on the floor.
    actor.tell(Box::new(()));
    thread::sleep(Duration::from_millis(20));
    assert_eq!(invocations.load(Ordering::SeqCst), settled);
    assert!(dispatcher.is_disposed());
}

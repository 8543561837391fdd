//! Integration tests for the runtime facade.
//!
//! These cover the primitives the upload and sync pipelines lean on:
//! detached spawns, timers, join-all settling and watch channels.

use core_async::{join_all, runtime, sync, task, time};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[core_async::test]
async fn test_task_spawn() {
    let handle = task::spawn(async { 42 });
    let result = handle.await.unwrap();
    assert_eq!(result, 42);
}

#[core_async::test]
async fn test_sleep() {
    let start = time::Instant::now();
    time::sleep(time::Duration::from_millis(50)).await;
    let elapsed = start.elapsed();
    assert!(elapsed >= time::Duration::from_millis(50));
}

#[core_async::test]
async fn test_timeout_failure() {
    let result = time::timeout(time::Duration::from_millis(10), async {
        time::sleep(time::Duration::from_millis(100)).await;
        42
    })
    .await;

    assert!(result.is_err());
}

#[core_async::test]
async fn test_join_all_settles_every_future() {
    // One branch "fails" and the others still run to completion.
    let finished = Arc::new(AtomicUsize::new(0));

    let futures = (0..4).map(|i| {
        let finished = Arc::clone(&finished);
        async move {
            time::sleep(time::Duration::from_millis(5 * i)).await;
            finished.fetch_add(1, Ordering::SeqCst);
            if i == 2 {
                Err(format!("job {i} failed"))
            } else {
                Ok(i)
            }
        }
    });

    let results = join_all(futures).await;

    assert_eq!(finished.load(Ordering::SeqCst), 4);
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 3);
    assert_eq!(results[2], Err("job 2 failed".to_string()));
}

#[core_async::test]
async fn test_detached_task_outlives_caller_scope() {
    let counter = Arc::new(AtomicUsize::new(0));

    {
        let counter = Arc::clone(&counter);
        task::spawn(async move {
            time::sleep(time::Duration::from_millis(10)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        });
    }

    time::sleep(time::Duration::from_millis(50)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[core_async::test]
async fn test_watch_channel() {
    let (tx, mut rx) = sync::watch::channel(false);

    task::spawn(async move {
        time::sleep(time::Duration::from_millis(5)).await;
        tx.send(true).ok();
    });

    rx.wait_for(|ready| *ready).await.unwrap();
    assert!(*rx.borrow());
}

#[core_async::test]
async fn test_mutex() {
    let mutex = Arc::new(sync::Mutex::new(0));
    let mut handles = vec![];

    for _ in 0..10 {
        let mutex = Arc::clone(&mutex);
        handles.push(task::spawn(async move {
            let mut guard = mutex.lock().await;
            *guard += 1;
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(*mutex.lock().await, 10);
}

#[core_async::test]
async fn test_runs_inside_runtime() {
    assert!(runtime::in_runtime());
}

#[test]
fn test_block_on_outside_runtime() {
    assert!(!runtime::in_runtime());
    let value = runtime::block_on(async { 7 });
    assert_eq!(value, 7);
}

#[test]
fn test_time_utilities() {
    let millis = time::now_millis();
    let secs = time::now_secs();
    assert!(millis > 0);
    assert!(secs > 0);
    assert!(millis / 1000 >= secs.saturating_sub(1));
}

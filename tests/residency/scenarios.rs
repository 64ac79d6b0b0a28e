//! Multi-threaded Scenarios
//!
//! Loader, readers and an evictor racing on one lock.

use crate::common::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

/// Only one of many racing loaders gets to do the work
#[test]
fn racing_loaders_start_one_load() {
    let lock = shared_lock(LifecycleState::OnlyMeta);
    let num_threads = 8;
    let barrier = Arc::new(Barrier::new(num_threads));
    let loads = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let lock = Arc::clone(&lock);
            let barrier = Arc::clone(&barrier);
            let loads = Arc::clone(&loads);
            thread::spawn(move || {
                barrier.wait();
                match lock.start_load_data() {
                    Ok(Some(guard)) => {
                        loads.fetch_add(1, Ordering::SeqCst);
                        guard.commit();
                    }
                    Ok(None) => {}
                    Err(err) => assert!(err.is_retryable()),
                }
                lock.wait_until_loaded_or_released()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), LifecycleState::DataLoaded);
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

/// Readers gated on loaded data never see a transition while inside
#[test]
fn gated_readers_see_stable_state() {
    let lock = shared_lock(LifecycleState::OnlyMeta);
    let rounds = 50;
    let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let lock = Arc::clone(&lock);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut reads = 0usize;
                while !stop.load(Ordering::SeqCst) {
                    if let Some(_pin) = lock.pin() {
                        if let Some(read) = lock.rlock_if(is_data_loaded) {
                            assert_eq!(lock.state(), LifecycleState::DataLoaded);
                            assert_eq!(read.state(), LifecycleState::DataLoaded);
                            reads += 1;
                        }
                    }
                    thread::yield_now();
                }
                reads
            })
        })
        .collect();

    for _ in 0..rounds {
        load(&lock);
        assert!(release_data(&lock));
    }
    load(&lock);
    stop.store(true, Ordering::SeqCst);

    for handle in readers {
        handle.join().unwrap();
    }
    assert!(release_all(&lock));
    assert_eq!(lock.pin_count(), 0);
}

/// A load in flight holds off release-all, which then retires the loaded data
#[test]
fn release_all_after_inflight_load() {
    let lock = shared_lock(LifecycleState::OnlyMeta);
    let guard = lock.start_load_data().unwrap().unwrap();

    let rx = spawn_op(&lock, release_all);
    assert_blocked(&rx);

    guard.done(None);
    assert_eq!(lock.wait_until_loaded_or_released(), LifecycleState::Released);
    assert!(expect_unblocked(&rx));
    assert_eq!(lock.state(), LifecycleState::Released);
}

/// Pins taken while release-all waits extend the wait
#[test]
fn late_pins_extend_release_all() {
    let lock = shared_lock(LifecycleState::DataLoaded);
    assert!(lock.pin_if_not_released());

    let rx = spawn_op(&lock, release_all);
    assert_blocked(&rx);
    assert!(lock.pin_if_not_released());
    assert_eq!(lock.pin_count(), 2);

    lock.unpin();
    assert_eq!(lock.pin_count(), 1);
    assert_blocked(&rx);

    lock.unpin();
    assert!(expect_unblocked(&rx));
    assert_eq!(lock.state(), LifecycleState::Released);
}

/// Load/evict churn from several threads keeps the register consistent
#[test]
fn churn_keeps_states_consistent() {
    let lock = shared_lock(LifecycleState::OnlyMeta);
    let num_threads = 6;
    let iterations = 200;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|i| {
            let lock = Arc::clone(&lock);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for n in 0..iterations {
                    if i % 2 == 0 {
                        if let Ok(Some(guard)) = lock.start_load_data() {
                            if n % 5 == 0 {
                                guard.rollback();
                            } else {
                                guard.commit();
                            }
                        }
                    } else if let Some(guard) = lock.start_release_data() {
                        guard.commit();
                    }
                    let state = lock.state();
                    assert_ne!(state, LifecycleState::Released);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let settled = lock.state();
    assert!(settled.is_stable(), "left in {}", settled);
    assert!(release_all(&lock));
    assert_eq!(lock.state(), LifecycleState::Released);
}

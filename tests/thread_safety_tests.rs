//! Thread safety validation tests for the profiler
//!
//! These tests verify that recordings and queries stay consistent under
//! concurrent access

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use pipeline_profiler::{PercentileMode, Profiler};

#[test]
fn test_concurrent_record_loses_no_updates() {
    let profiler = Profiler::shared();
    let num_threads = 8;
    let records_per_thread = 2000u64;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let profiler = Arc::clone(&profiler);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..records_per_thread {
                    // Overlapping values so threads contend on the same buckets.
                    profiler.record(Duration::from_nanos(i % 50 + thread_id as u64));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(profiler.count(), num_threads as u64 * records_per_thread);
}

#[test]
fn test_concurrent_scoped_measurements() {
    let profiler = Profiler::shared();
    let num_threads = 10;
    let measurements_per_thread = 500;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let profiler = Arc::clone(&profiler);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..measurements_per_thread {
                    let _measurement = profiler.track();
                    std::hint::black_box(0u64);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(profiler.count(), (num_threads * measurements_per_thread) as u64);
}

#[test]
fn test_queries_during_recording() {
    let profiler = Profiler::shared();
    profiler.record(Duration::from_nanos(1));

    let writers: Vec<_> = (0..4)
        .map(|_| {
            let profiler = Arc::clone(&profiler);
            thread::spawn(move || {
                for i in 1..=5000u64 {
                    profiler.record(Duration::from_nanos(i));
                }
            })
        })
        .collect();

    let reader = {
        let profiler = Arc::clone(&profiler);
        thread::spawn(move || {
            let mut last_count = 0;
            for _ in 0..200 {
                let snapshot = profiler.snapshot();
                let count = snapshot.count();
                assert!(count >= last_count);
                last_count = count;

                let p50 = snapshot.percentile(0.5, PercentileMode::ByCalls).unwrap();
                let p99 = snapshot.percentile(0.99, PercentileMode::ByCalls).unwrap();
                assert!(p50 <= p99);
            }
        })
    };

    for writer in writers {
        writer.join().unwrap();
    }
    reader.join().unwrap();

    assert_eq!(profiler.count(), 4 * 5000 + 1);
}

#[test]
fn test_measurements_across_threads_release_profiler() {
    let profiler = Profiler::shared();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let measurement = profiler.track();
            thread::spawn(move || drop(measurement))
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(profiler.count(), 8);
    assert_eq!(Arc::strong_count(&profiler), 1);
}

#[test]
fn test_reparent_across_threads() {
    let source = Profiler::shared();
    let target = Profiler::shared();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let source = Arc::clone(&source);
            let target = Arc::clone(&target);
            thread::spawn(move || {
                for _ in 0..100 {
                    let mut measurement = source.track();
                    measurement.reparent(Arc::clone(&target));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(source.count(), 0);
    assert_eq!(target.count(), 400);
}

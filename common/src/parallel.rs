//! Bounded parallel processing.
//!
//! Work is split into windows of at most `max_in_flight` items. Each window is
//! mapped in parallel on the current rayon pool, then its results are handed to
//! a sequential consumer before the next window starts, so no more than
//! `max_in_flight` mapped values are alive at once (e.g. decoded images).

use rayon::prelude::*;

/// Maps `map` over `items` in parallel windows and feeds each result, with the
/// index of its item, to `consume` on the calling thread in input order.
///
/// # Panics
///
/// Panics if `max_in_flight` is 0.
pub fn par_map_consume<T, R, M, C>(items: &[T], max_in_flight: usize, map: M, mut consume: C)
where
    T: Sync,
    R: Send,
    M: Fn(&T) -> R + Sync,
    C: FnMut(usize, R),
{
    assert!(max_in_flight > 0, "max_in_flight must be > 0");

    for (window_idx, window) in items.chunks(max_in_flight).enumerate() {
        let mapped: Vec<R> = window.par_iter().map(&map).collect();
        let base = window_idx * max_in_flight;
        for (i, r) in mapped.into_iter().enumerate() {
            consume(base + i, r);
        }
    }
}

/// Default worker count: the available parallelism of the machine, at least 1.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

//! Benchmark utilities.

use rand::Rng;

/// Generate random payload bytes of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate a random walk of `count` prices starting at 100.
pub fn random_prices(count: usize) -> Vec<f64> {
    let mut rng = rand::thread_rng();
    let mut price = 100.0f64;
    (0..count)
        .map(|_| {
            price += rng.gen_range(-0.5..0.5);
            price
        })
        .collect()
}

/// Generate a counter that advances by a small random step per value.
pub fn slow_counter(count: usize) -> Vec<u64> {
    let mut rng = rand::thread_rng();
    let mut value = 1_700_000_000_000u64;
    (0..count)
        .map(|_| {
            value += rng.gen_range(0..8);
            value
        })
        .collect()
}

/// Generate flags that hold each value for a random run of up to `max_run`.
pub fn sticky_flags(count: usize, max_run: usize) -> Vec<bool> {
    let mut rng = rand::thread_rng();
    let mut out = Vec::with_capacity(count);
    let mut flag = false;
    while out.len() < count {
        let run = rng.gen_range(1..=max_run).min(count - out.len());
        out.extend(std::iter::repeat(flag).take(run));
        flag = !flag;
    }
    out
}

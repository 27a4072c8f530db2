//! Buffered source of cryptographically secure random bytes.
//!
//! Pulling from the OS entropy source on every request is slow when callers ask
//! for many small values (salts, IVs, password characters). `CryptoRandom`
//! keeps a sliding cache that is refilled at eight times the request size, and
//! wipes bytes as they are handed out so no value can be observed twice.

use std::sync::Mutex;

use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

const REFILL_FACTOR: usize = 8;
const MIN_CACHE_LEN: usize = 1024;

type FillFn = Box<dyn FnMut(&mut [u8]) + Send>;

pub struct CryptoRandom {
    inner: Mutex<SlidingCache>,
}

struct SlidingCache {
    fill_source: FillFn,
    cache: Vec<u8>,
    pos: usize,
}

impl CryptoRandom {
    /// Buffered randomness backed by the operating system RNG.
    pub fn new() -> Self {
        Self::with_source(Box::new(|buf| OsRng.fill_bytes(buf)))
    }

    /// Buffered randomness backed by a caller-supplied source. Intended for
    /// deterministic tests; production callers should use [`CryptoRandom::new`].
    pub fn with_source(fill_source: FillFn) -> Self {
        Self {
            inner: Mutex::new(SlidingCache {
                fill_source,
                cache: Vec::new(),
                pos: 0,
            }),
        }
    }

    pub fn fill(&self, buf: &mut [u8]) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.fill(buf);
    }

    pub fn next_bytes(&self, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        self.fill(&mut out);
        out
    }

    /// Uniform value in `[0, bound)` via rejection sampling. `bound` must be
    /// non-zero.
    pub fn next_u32_below(&self, bound: u32) -> u32 {
        debug_assert!(bound > 0);
        // Largest multiple of `bound` that fits in u32; values at or above it
        // would bias the modulo.
        let limit = u32::MAX - u32::MAX % bound;
        loop {
            let mut raw = [0u8; 4];
            self.fill(&mut raw);
            let value = u32::from_le_bytes(raw);
            if value < limit {
                return value % bound;
            }
        }
    }
}

impl Default for CryptoRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CryptoRandom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoRandom").finish_non_exhaustive()
    }
}

impl SlidingCache {
    fn fill(&mut self, buf: &mut [u8]) {
        if self.cache.len() - self.pos < buf.len() {
            self.refill(buf.len());
        }
        let end = self.pos + buf.len();
        buf.copy_from_slice(&self.cache[self.pos..end]);
        self.cache[self.pos..end].fill(0);
        self.pos = end;
    }

    fn refill(&mut self, request: usize) {
        let grow = request.saturating_mul(REFILL_FACTOR).max(MIN_CACHE_LEN);
        let keep = self.cache.len() - self.pos;
        let mut fresh = vec![0u8; keep + grow];
        fresh[..keep].copy_from_slice(&self.cache[self.pos..]);
        (self.fill_source)(&mut fresh[keep..]);
        self.cache.zeroize();
        self.cache = fresh;
        self.pos = 0;
    }
}

impl Drop for SlidingCache {
    fn drop(&mut self) {
        self.cache.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_source() -> (CryptoRandom, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_source = Arc::clone(&calls);
        let rng = CryptoRandom::with_source(Box::new(move |buf| {
            calls_in_source.fetch_add(1, Ordering::Relaxed);
            for (i, byte) in buf.iter_mut().enumerate() {
                *byte = (i % 251) as u8;
            }
        }));
        (rng, calls)
    }

    #[test]
    fn small_requests_share_one_refill() {
        let (rng, calls) = counting_source();
        for _ in 0..32 {
            rng.next_bytes(16);
        }
        // 32 * 16 = 512 bytes, served from a single MIN_CACHE_LEN refill.
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn large_request_triggers_proportional_refill() {
        let (rng, calls) = counting_source();
        let out = rng.next_bytes(4096);
        assert_eq!(out.len(), 4096);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
        // The cache was refilled at 8x the request, so this is still served.
        rng.next_bytes(4096 * 7 - 16);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn consumed_bytes_are_not_replayed() {
        let (rng, _) = counting_source();
        let a = rng.next_bytes(8);
        let b = rng.next_bytes(8);
        // The deterministic source is position-based, so a replay would make
        // these equal.
        assert_ne!(a, b);
    }

    #[test]
    fn next_u32_below_stays_in_range() {
        let rng = CryptoRandom::new();
        for bound in [1u32, 2, 7, 61, 1000] {
            for _ in 0..100 {
                assert!(rng.next_u32_below(bound) < bound);
            }
        }
    }
}

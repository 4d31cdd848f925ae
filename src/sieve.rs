//! # Sieve — Prime Generation via Bit-Packed Eratosthenes
//!
//! Classic Sieve of Eratosthenes over a [`BitField`], with the square-root
//! elimination optimization: striking multiples of a prime p begins at p²,
//! since every smaller multiple has a factor below p and was already struck
//! by an earlier prime. Complexity: O(n log log n) time, O(n/8) bytes.
//!
//! The run is a straight-line state machine:
//!
//! 1. **Init** — allocate the field, mark 0 and 1 composite.
//! 2. **Eliminating** — alternate [`next_prime`] (bounded by ⌊√n⌋ + 1, the
//!    scan boundary) with [`eliminate_multiples`] (bounded by n) until the
//!    scanner is exhausted. Primes above √n need no elimination pass: their
//!    squares lie outside the field.
//! 3. **Enumerating** — one [`next_prime`] sweep over the full range, via
//!    the [`Primes`] iterator.
//! 4. **Done** — the field is released when the driver drops.
//!
//! Everything works in logical indices; the byte/bit decomposition stays
//! inside `BitField`. All index arithmetic fits u64: a prime eligible for
//! elimination satisfies p ≤ √n, so p² ≤ n.

use crate::bitfield::BitField;
use anyhow::Result;
use std::io::{self, Write};
use tracing::debug;

/// Default bound exponent when none (or an invalid one) is given.
pub const DEFAULT_POWER: u32 = 20;

/// Smallest accepted bound exponent. Below 2^3 the range holds no odd
/// composites and the scan boundary degenerates.
pub const MIN_POWER: u32 = 3;

/// Result of a forward scan for the next unmarked (prime) position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    /// The logical index of the next clear bit.
    Found(u64),
    /// No clear bit remains before the limit.
    Exhausted,
}

/// Scan forward from strictly after `after`, returning the first index below
/// `limit` (exclusive) whose bit is still clear.
pub fn next_prime(field: &BitField, after: u64, limit: u64) -> Scan {
    let mut index = after + 1;
    while index < limit {
        if !field.get(index) {
            return Scan::Found(index);
        }
        index += 1;
    }
    Scan::Exhausted
}

/// Mark every multiple of `prime` in [p², end) as composite.
///
/// Starts at p² rather than 2p: any multiple k·p with k < p also divides by
/// some prime ≤ k, and was struck when that prime was processed.
pub fn eliminate_multiples(field: &mut BitField, prime: u64, end: u64) {
    debug_assert!(prime >= 2, "eliminating multiples of {}", prime);
    let mut multiple = prime * prime;
    while multiple < end {
        field.set_composite(multiple);
        multiple += prime;
    }
}

/// Integer square root — safe for all u64 values.
///
/// Newton-corrected from an f64 seed; the correction loops run at most twice,
/// absorbing the precision ceiling of f64 above 2^52.
pub fn isqrt(n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    let mut x = (n as f64).sqrt() as u64;
    while x > 0 && x.checked_mul(x).map_or(true, |sq| sq > n) {
        x -= 1;
    }
    while (x + 1).checked_mul(x + 1).map_or(false, |sq| sq <= n) {
        x += 1;
    }
    x
}

/// Driver for one sieve run. Exclusively owns the bit field from allocation
/// to enumeration; dropping the driver releases the buffer on every exit path.
pub struct Sieve {
    field: BitField,
    scan_limit: u64,
}

impl Sieve {
    /// Allocate a field of 2^power bits with 0 and 1 pre-marked composite.
    ///
    /// Fails when the buffer cannot be reserved; the request is not retried
    /// (an identical reservation would fail identically).
    pub fn new(power: u32) -> Result<Self> {
        anyhow::ensure!(power >= MIN_POWER, "power must be at least {}", MIN_POWER);
        anyhow::ensure!(
            power < u64::BITS,
            "bound 2^{} exceeds the addressable range",
            power
        );
        let bound = 1u64 << power;
        let mut field = BitField::new(bound)?;
        field.set_composite(0);
        field.set_composite(1);
        // Elimination only needs primes p with p² < bound
        let scan_limit = isqrt(bound) + 1;
        Ok(Sieve { field, scan_limit })
    }

    /// Exclusive upper limit of the sieved range.
    #[inline]
    pub fn bound(&self) -> u64 {
        self.field.len()
    }

    /// The elimination phase: find each prime up to the scan boundary in turn
    /// and strike its multiples across the whole field.
    ///
    /// Loop invariant: `current` holds the most recently confirmed prime, or
    /// the seed position 1 before the first is found. Scanning precedes
    /// elimination so the seed itself is never used as an eliminator.
    pub fn run(&mut self) {
        // The end boundary is fixed for the whole run
        let end = self.field.len();
        let mut current = 1u64;
        while let Scan::Found(prime) = next_prime(&self.field, current, self.scan_limit) {
            debug!(prime, "eliminating multiples");
            eliminate_multiples(&mut self.field, prime, end);
            current = prime;
        }
    }

    /// Iterate the surviving primes in strictly increasing order.
    ///
    /// Meaningful after [`run`](Self::run); on an unsieved field it yields
    /// every unmarked index.
    pub fn primes(&self) -> Primes<'_> {
        Primes {
            field: &self.field,
            cursor: 1,
        }
    }

    /// Write the primes to `out`, one decimal per line, no header or trailer.
    pub fn write_primes<W: Write>(&self, mut out: W) -> io::Result<()> {
        for prime in self.primes() {
            writeln!(out, "{}", prime)?;
        }
        Ok(())
    }
}

/// The enumeration pass: repeated [`next_prime`] calls bounded by the end
/// of the field, packaged as an iterator.
pub struct Primes<'a> {
    field: &'a BitField,
    cursor: u64,
}

impl Iterator for Primes<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        match next_prime(self.field, self.cursor, self.field.len()) {
            Scan::Found(index) => {
                self.cursor = index;
                Some(index)
            }
            Scan::Exhausted => None,
        }
    }
}

/// Sieve 2^power and collect the primes into a vector.
pub fn sieve_primes(power: u32) -> Result<Vec<u64>> {
    let mut sieve = Sieve::new(power)?;
    sieve.run();
    Ok(sieve.primes().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Trial-division oracle for cross-checking small sieves.
    fn is_prime_naive(n: u64) -> bool {
        if n < 2 {
            return false;
        }
        let mut d = 2;
        while d * d <= n {
            if n % d == 0 {
                return false;
            }
            d += 1;
        }
        true
    }

    #[test]
    fn isqrt_exact_squares() {
        for x in 0u64..200 {
            assert_eq!(isqrt(x * x), x);
        }
        assert_eq!(isqrt(u64::MAX), (1u64 << 32) - 1);
    }

    #[test]
    fn isqrt_between_squares() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(2), 1);
        assert_eq!(isqrt(3), 1);
        assert_eq!(isqrt(8), 2);
        assert_eq!(isqrt(9), 3);
        assert_eq!(isqrt(15), 3);
        assert_eq!(isqrt(16), 4);
        assert_eq!(isqrt(24), 4);
        assert_eq!(isqrt(25), 5);
    }

    #[test]
    fn scan_finds_first_clear_bit() {
        let mut field = BitField::new(16).unwrap();
        field.set_composite(0);
        field.set_composite(1);
        field.set_composite(2);
        field.set_composite(3);
        assert_eq!(next_prime(&field, 1, 16), Scan::Found(4));
        // starts strictly after `after`
        assert_eq!(next_prime(&field, 4, 16), Scan::Found(5));
    }

    #[test]
    fn scan_respects_exclusive_limit() {
        let field = BitField::new(16).unwrap();
        assert_eq!(next_prime(&field, 4, 5), Scan::Exhausted);
        assert_eq!(next_prime(&field, 4, 6), Scan::Found(5));
    }

    #[test]
    fn scan_exhausted_on_fully_marked_field() {
        let mut field = BitField::new(16).unwrap();
        for i in 0..16 {
            field.set_composite(i);
        }
        assert_eq!(next_prime(&field, 0, 16), Scan::Exhausted);
    }

    #[test]
    fn eliminate_starts_at_prime_square() {
        let mut field = BitField::new(32).unwrap();
        eliminate_multiples(&mut field, 5, 32);
        // 5 and 2·5, 3·5, 4·5 untouched — they are struck by 2 and 3
        assert!(!field.get(5));
        assert!(!field.get(10));
        assert!(!field.get(15));
        assert!(!field.get(20));
        assert!(field.get(25));
        assert!(field.get(30));
    }

    #[test]
    fn eliminate_smallest_prime() {
        let mut field = BitField::new(32).unwrap();
        eliminate_multiples(&mut field, 2, 32);
        for i in 0..32u64 {
            let expected = i >= 4 && i % 2 == 0;
            assert_eq!(field.get(i), expected, "bit {} wrong after eliminating 2", i);
        }
    }

    #[test]
    fn eliminate_square_past_end_marks_nothing() {
        let mut field = BitField::new(32).unwrap();
        eliminate_multiples(&mut field, 7, 32); // 49 >= 32
        for i in 0..32 {
            assert!(!field.get(i));
        }
    }

    #[test]
    fn sieve_power_3() {
        assert_eq!(sieve_primes(3).unwrap(), vec![2, 3, 5, 7]);
    }

    #[test]
    fn sieve_power_4() {
        assert_eq!(sieve_primes(4).unwrap(), vec![2, 3, 5, 7, 11, 13]);
    }

    #[test]
    fn sieve_power_5_matches_oracle() {
        let mut sieve = Sieve::new(5).unwrap();
        sieve.run();
        // every index in [0, 32) agrees with trial division, marked and unmarked alike
        let primes: Vec<u64> = sieve.primes().collect();
        let expected: Vec<u64> = (0..32).filter(|&n| is_prime_naive(n)).collect();
        assert_eq!(primes, expected);
    }

    /// pi(2^10) = 172, pi(2^16) = 6542 (OEIS A007053: primes below 2^n).
    #[test]
    fn sieve_known_prime_counts() {
        assert_eq!(sieve_primes(10).unwrap().len(), 172);
        assert_eq!(sieve_primes(16).unwrap().len(), 6542);
    }

    #[test]
    fn primes_strictly_increasing() {
        let primes = sieve_primes(12).unwrap();
        assert!(primes.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn scan_limit_is_sqrt_plus_one() {
        let sieve = Sieve::new(5).unwrap();
        assert_eq!(sieve.scan_limit, 6); // ⌊√32⌋ + 1
        let sieve = Sieve::new(8).unwrap();
        assert_eq!(sieve.scan_limit, 17); // ⌊√256⌋ + 1
    }

    /// Stopping elimination at the scan boundary loses nothing: a run that
    /// keeps eliminating with every prime up to n produces an identical field,
    /// because composites above √n always have a factor at or below it.
    #[test]
    fn scan_boundary_suffices() {
        let mut bounded = Sieve::new(5).unwrap();
        bounded.run();

        let mut exhaustive = Sieve::new(5).unwrap();
        let n = exhaustive.bound();
        let mut current = 1;
        while let Scan::Found(p) = next_prime(&exhaustive.field, current, n) {
            eliminate_multiples(&mut exhaustive.field, p, n);
            current = p;
        }

        for i in 0..n {
            assert_eq!(
                bounded.field.get(i),
                exhaustive.field.get(i),
                "fields diverge at index {}",
                i
            );
        }
    }

    #[test]
    fn write_primes_one_per_line() {
        let mut sieve = Sieve::new(3).unwrap();
        sieve.run();
        let mut buf = Vec::new();
        sieve.write_primes(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "2\n3\n5\n7\n");
    }

    #[test]
    fn rejects_unaddressable_power() {
        assert!(Sieve::new(64).is_err());
        assert!(Sieve::new(200).is_err());
    }

    #[test]
    fn rejects_power_below_minimum() {
        assert!(Sieve::new(0).is_err());
        assert!(Sieve::new(2).is_err());
        assert!(Sieve::new(3).is_ok());
    }
}

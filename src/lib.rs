//! # eratos — Bit-Packed Sieve of Eratosthenes
//!
//! Computes every prime below 2^power and writes them to `./primes.txt`,
//! one decimal per line. The field is one bit per candidate ([`bitfield`]);
//! the sieve alternates a forward scan for the next unmarked position with
//! composite elimination starting at the prime's square ([`sieve`]).

pub mod bitfield;
pub mod sieve;

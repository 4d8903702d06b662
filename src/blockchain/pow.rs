use std::convert::Infallible;
use std::time::{Duration, Instant};

use super::crypto::sha256_hex;

/// Number of leading zero hex digits a proof hash must carry
pub const DIFFICULTY: usize = 4;

/// How many candidates are tried between checks of the deadline
const DEADLINE_POLL_INTERVAL: u64 = 1024;

/// Point in time after which a proof-of-work search gives up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    /// Deadline `timeout` from now, or `None` if that instant cannot be
    /// represented
    pub fn after(timeout: Duration) -> Option<Self> {
        Instant::now().checked_add(timeout).map(Deadline)
    }

    pub fn has_passed(&self) -> bool {
        Instant::now() >= self.0
    }
}

/// Checks whether `proof` solves the puzzle for `last_proof`
///
/// The puzzle is solved when `sha256("{last_proof}{proof}")` starts with
/// [`DIFFICULTY`] zero hex digits.
pub fn valid_proof(last_proof: u64, proof: u64) -> bool {
    let guess = format!("{last_proof}{proof}");
    sha256_hex(guess)
        .bytes()
        .take(DIFFICULTY)
        .all(|digit| digit == b'0')
}

// Tries candidates from 0 upwards, asking `poll` every
// DEADLINE_POLL_INTERVAL candidates whether to carry on
fn search<E>(last_proof: u64, mut poll: impl FnMut() -> Result<(), E>) -> Result<u64, E> {
    let mut proof = 0;
    loop {
        if proof % DEADLINE_POLL_INTERVAL == 0 {
            poll()?;
        }
        if valid_proof(last_proof, proof) {
            return Ok(proof);
        }
        proof += 1;
    }
}

/// Finds the smallest proof that solves the puzzle for `last_proof`
///
/// Candidates are tried from 0 upwards with no upper bound. No proof exists
/// that a solution is always reached, but at this difficulty one turns up
/// after roughly 65k attempts on average. Use [`proof_of_work_until`] when
/// the search must be bounded.
pub fn proof_of_work(last_proof: u64) -> u64 {
    search(last_proof, || Ok::<(), Infallible>(())).unwrap_or_else(|never| match never {})
}

/// Same search as [`proof_of_work`], abandoned once `deadline` has passed
///
/// Returns `None` if the deadline passed before a proof was found.
pub fn proof_of_work_until(last_proof: u64, deadline: Deadline) -> Option<u64> {
    search(last_proof, || if deadline.has_passed() { Err(()) } else { Ok(()) }).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_proof_matches_hash_prefix() {
        let proof = proof_of_work(100);
        let digest = sha256_hex(format!("100{proof}"));

        assert!(digest.starts_with("0000"));
        assert!(valid_proof(100, proof));
    }

    #[test]
    fn test_proof_of_work_for_genesis_proof() {
        assert_eq!(proof_of_work(100), 35_293);
        assert_eq!(proof_of_work(35_293), 35_089);
    }

    #[test]
    fn test_proof_of_work_returns_smallest_solution() {
        let proof = proof_of_work(100);

        assert!((0..proof).all(|candidate| !valid_proof(100, candidate)));
    }

    #[test]
    fn test_proof_depends_on_last_proof() {
        let proof = proof_of_work(100);
        let next = proof_of_work(proof);

        assert!(valid_proof(proof, next));
    }

    #[test]
    fn test_search_until_agrees_with_unbounded_search() {
        let deadline = Deadline::after(Duration::from_secs(3600)).unwrap();

        assert!(!deadline.has_passed());
        assert_eq!(proof_of_work_until(100, deadline), Some(proof_of_work(100)));
    }

    #[test]
    fn test_passed_deadline_abandons_search() {
        let deadline = Deadline::after(Duration::ZERO).unwrap();

        assert!(deadline.has_passed());
        assert_eq!(proof_of_work_until(100, deadline), None);
    }

    #[test]
    fn test_unrepresentable_deadline_is_none() {
        assert_eq!(Deadline::after(Duration::MAX), None);
    }
}

//! Security session gate
//!
//! Restriction changes are gated by a recovery passphrase. A successful
//! verification opens a 10-minute wall-clock session during which further
//! changes do not re-prompt. Only the SHA-256 digest of the passphrase is
//! ever persisted.

use appfence_store::RestrictionStore;
use appfence_util::{AttemptLimiter, FenceError, Result};
use chrono::{DateTime, Duration as ChronoDuration, Local};
use rand::rngs::OsRng;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Session time-to-live after a successful verification
pub const SESSION_TTL_MINUTES: i64 = 10;

/// Generated passphrase length
pub const PASSPHRASE_LENGTH: usize = 16;

/// Unambiguous uppercase alphabet for generated passphrases
const CHAR_POOL: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

const MAX_ATTEMPTS: usize = 5;
const ATTEMPT_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Outcome of an authorization check.
///
/// A wrong passphrase is a normal, retryable outcome, never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Granted,
    /// A passphrase is configured but none was supplied
    PassphraseRequired,
    WrongPassphrase,
    /// Too many failures in the window
    Throttled { retry_after: Duration },
}

/// The passphrase gate and its singleton session
pub struct SecurityGate {
    store: Arc<dyn RestrictionStore>,
    session_until: Option<DateTime<Local>>,
    limiter: AttemptLimiter,
}

impl SecurityGate {
    pub fn new(store: Arc<dyn RestrictionStore>) -> Self {
        Self {
            store,
            session_until: None,
            limiter: AttemptLimiter::new(MAX_ATTEMPTS, ATTEMPT_WINDOW),
        }
    }

    /// Generate a fresh recovery passphrase from a CSPRNG
    pub fn generate_passphrase() -> String {
        let mut rng = OsRng;
        (0..PASSPHRASE_LENGTH)
            .map(|_| CHAR_POOL[rng.gen_range(0..CHAR_POOL.len())] as char)
            .collect()
    }

    /// Hex-encoded SHA-256 digest
    pub fn hash_phrase(phrase: &str) -> String {
        let digest = Sha256::digest(phrase.as_bytes());
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn has_recovery_passphrase(&self) -> Result<bool> {
        Ok(self.recovery_hash()?.is_some())
    }

    /// Persist the digest of a new recovery passphrase
    pub fn set_recovery_passphrase(&self, plaintext: &str) -> Result<()> {
        self.store
            .set_recovery_hash(&Self::hash_phrase(plaintext))
            .map_err(|e| FenceError::store(e.to_string()))?;
        info!("Recovery passphrase updated");
        Ok(())
    }

    /// Whether an authenticated session is active at `now`
    pub fn is_active(&self, now: DateTime<Local>) -> bool {
        self.session_until.is_some_and(|until| now < until)
    }

    pub fn end_session(&mut self) {
        if self.session_until.take().is_some() {
            info!("Security session ended");
        }
    }

    /// Verify a candidate passphrase.
    ///
    /// Short-circuits to `Granted` while a session is active. A cold success
    /// opens a new session; a failure opens none and counts toward the
    /// attempt limit.
    pub fn verify(
        &mut self,
        candidate: &str,
        now: DateTime<Local>,
        mono_now: Instant,
    ) -> Result<AuthOutcome> {
        if self.is_active(now) {
            return Ok(AuthOutcome::Granted);
        }

        if !self.limiter.is_allowed(mono_now) {
            let retry_after = self
                .limiter
                .retry_after(mono_now)
                .unwrap_or(ATTEMPT_WINDOW);
            warn!("Passphrase verification throttled");
            return Ok(AuthOutcome::Throttled { retry_after });
        }

        let Some(stored) = self.recovery_hash()? else {
            // Nothing configured, nothing to verify
            return Ok(AuthOutcome::Granted);
        };

        if Self::hash_phrase(candidate) == stored {
            self.session_until = Some(now + ChronoDuration::minutes(SESSION_TTL_MINUTES));
            self.limiter.reset();
            info!(ttl_minutes = SESSION_TTL_MINUTES, "Security session opened");
            Ok(AuthOutcome::Granted)
        } else {
            self.limiter.record_failure(mono_now);
            Ok(AuthOutcome::WrongPassphrase)
        }
    }

    /// The gate every restriction mutation routes through: allow when no
    /// passphrase is configured or a session is active, otherwise verify
    /// the supplied candidate.
    pub fn authorize(
        &mut self,
        candidate: Option<&str>,
        now: DateTime<Local>,
        mono_now: Instant,
    ) -> Result<AuthOutcome> {
        if self.recovery_hash()?.is_none() {
            return Ok(AuthOutcome::Granted);
        }
        if self.is_active(now) {
            return Ok(AuthOutcome::Granted);
        }
        match candidate {
            Some(candidate) => self.verify(candidate, now, mono_now),
            None => Ok(AuthOutcome::PassphraseRequired),
        }
    }

    fn recovery_hash(&self) -> Result<Option<String>> {
        self.store
            .recovery_hash()
            .map_err(|e| FenceError::store(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appfence_store::SqliteStore;
    use chrono::TimeZone;

    fn gate_with_passphrase(plaintext: &str) -> SecurityGate {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let gate = SecurityGate::new(store);
        gate.set_recovery_passphrase(plaintext).unwrap();
        gate
    }

    fn at(h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 8, 25, h, m, 0).unwrap()
    }

    #[test]
    fn generated_passphrases_are_uppercase_and_distinct() {
        let a = SecurityGate::generate_passphrase();
        let b = SecurityGate::generate_passphrase();

        assert_eq!(a.len(), PASSPHRASE_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_uppercase()));
        assert_ne!(a, b);
    }

    #[test]
    fn hash_is_hex_sha256() {
        let hash = SecurityGate::hash_phrase("ABC");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "b5d4045c3f466fa91fe2cc6abe79232a1a57cdf104f7a26e716e0a1e2789df78"
        );
    }

    #[test]
    fn correct_passphrase_opens_session_for_ttl() {
        let mut gate = gate_with_passphrase("SECRET");
        let mono = Instant::now();

        assert_eq!(
            gate.verify("SECRET", at(12, 0), mono).unwrap(),
            AuthOutcome::Granted
        );
        assert!(gate.is_active(at(12, 9)));
        assert!(!gate.is_active(at(12, 10)));
    }

    #[test]
    fn active_session_short_circuits_even_with_wrong_candidate() {
        let mut gate = gate_with_passphrase("SECRET");
        let mono = Instant::now();

        gate.verify("SECRET", at(12, 0), mono).unwrap();
        assert_eq!(
            gate.verify("WRONG", at(12, 5), mono).unwrap(),
            AuthOutcome::Granted
        );

        // After the TTL the wrong candidate is checked again
        assert_eq!(
            gate.verify("WRONG", at(12, 11), mono).unwrap(),
            AuthOutcome::WrongPassphrase
        );
    }

    #[test]
    fn wrong_passphrase_starts_no_session() {
        let mut gate = gate_with_passphrase("SECRET");
        let mono = Instant::now();

        assert_eq!(
            gate.verify("WRONG", at(12, 0), mono).unwrap(),
            AuthOutcome::WrongPassphrase
        );
        assert!(!gate.is_active(at(12, 0)));
    }

    #[test]
    fn end_session_closes_immediately() {
        let mut gate = gate_with_passphrase("SECRET");
        gate.verify("SECRET", at(12, 0), Instant::now()).unwrap();
        assert!(gate.is_active(at(12, 1)));

        gate.end_session();
        assert!(!gate.is_active(at(12, 1)));
    }

    #[test]
    fn repeated_failures_are_throttled() {
        let mut gate = gate_with_passphrase("SECRET");
        let mono = Instant::now();

        for _ in 0..MAX_ATTEMPTS {
            assert_eq!(
                gate.verify("WRONG", at(12, 0), mono).unwrap(),
                AuthOutcome::WrongPassphrase
            );
        }

        // Even the correct passphrase is refused until the window lapses
        assert!(matches!(
            gate.verify("SECRET", at(12, 0), mono).unwrap(),
            AuthOutcome::Throttled { .. }
        ));

        let later = mono + ATTEMPT_WINDOW + Duration::from_secs(1);
        assert_eq!(
            gate.verify("SECRET", at(12, 6), later).unwrap(),
            AuthOutcome::Granted
        );
    }

    #[test]
    fn authorize_allows_when_nothing_configured() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let mut gate = SecurityGate::new(store);

        assert_eq!(
            gate.authorize(None, at(12, 0), Instant::now()).unwrap(),
            AuthOutcome::Granted
        );
    }

    #[test]
    fn authorize_requires_candidate_when_cold() {
        let mut gate = gate_with_passphrase("SECRET");
        let mono = Instant::now();

        assert_eq!(
            gate.authorize(None, at(12, 0), mono).unwrap(),
            AuthOutcome::PassphraseRequired
        );
        assert_eq!(
            gate.authorize(Some("SECRET"), at(12, 0), mono).unwrap(),
            AuthOutcome::Granted
        );
        // Session now covers candidate-less calls
        assert_eq!(
            gate.authorize(None, at(12, 5), mono).unwrap(),
            AuthOutcome::Granted
        );
    }
}

//! Seeded RNG streams shared by the bout engine and the allocation pass.
//!
//! Every stream is a ChaCha8 generator keyed through a domain-separated
//! HMAC-SHA256 derivation, so the same user seed yields the same draws on
//! every platform. Child streams are forked from a parent key and a fork
//! counter; forking never consumes draws from the parent.
use hmac::{Hmac, Mac};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::Sha256;
use thiserror::Error;

/// Errors raised when constructing a seeded stream.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RngError {
    #[error("no seed supplied; engine streams never fall back to entropy")]
    MissingSeed,
}

/// Deterministic, countable RNG stream.
#[derive(Debug, Clone)]
pub struct RngStream {
    key: u64,
    rng: ChaCha8Rng,
    draws: u64,
    forks: u32,
}

impl RngStream {
    /// Construct a root stream from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self::keyed(derive_stream_seed(seed, b"root"))
    }

    /// Construct a root stream, failing fast when no seed is available.
    ///
    /// # Errors
    ///
    /// Returns [`RngError::MissingSeed`] when `seed` is `None`.
    pub fn try_from_seed(seed: Option<u64>) -> Result<Self, RngError> {
        seed.map(Self::from_user_seed).ok_or(RngError::MissingSeed)
    }

    fn keyed(key: u64) -> Self {
        Self {
            key,
            rng: ChaCha8Rng::seed_from_u64(key),
            draws: 0,
            forks: 0,
        }
    }

    /// Uniform float in `[0, 1)` built from the top 53 bits of one draw.
    #[allow(clippy::cast_precision_loss)]
    pub fn next_f64(&mut self) -> f64 {
        const SCALE: f64 = 1.0 / (1_u64 << 53) as f64;
        (self.next_u64() >> 11) as f64 * SCALE
    }

    /// Derive an independent child stream for a sub-computation.
    ///
    /// Two forks with the same domain tag still differ because the parent's
    /// fork counter is mixed into the derivation.
    #[must_use]
    pub fn fork(&mut self, domain: &str) -> Self {
        let mut tag = Vec::with_capacity(domain.len() + 5);
        tag.extend_from_slice(domain.as_bytes());
        tag.push(b'#');
        tag.extend_from_slice(&self.forks.to_le_bytes());
        self.forks = self.forks.saturating_add(1);
        Self::keyed(derive_stream_seed(self.key, &tag))
    }

    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }

    /// Number of child streams forked so far.
    #[must_use]
    pub const fn forks(&self) -> u32 {
        self.forks
    }
}

impl RngCore for RngStream {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

/// Root streams segregated by simulation domain.
#[derive(Debug, Clone)]
pub struct RngBundle {
    bout: RngStream,
    allocation: RngStream,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            bout: RngStream::keyed(derive_stream_seed(seed, b"bout")),
            allocation: RngStream::keyed(derive_stream_seed(seed, b"allocation")),
        }
    }

    /// Access the bout RNG stream; fork it once per bout.
    pub fn bout(&mut self) -> &mut RngStream {
        &mut self.bout
    }

    /// Access the allocation RNG stream; fork it once per cycle.
    pub fn allocation(&mut self) -> &mut RngStream {
        &mut self.allocation
    }
}

fn derive_stream_seed(key: u64, domain_tag: &[u8]) -> u64 {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&key.to_le_bytes()).expect("64-bit seed is valid key");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let seed_bytes: [u8; 8] = digest[..8].try_into().expect("digest slice length");
    u64::from_le_bytes(seed_bytes)
}

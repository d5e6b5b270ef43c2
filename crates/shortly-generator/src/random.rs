use crate::IdGenerator;
use rand::distributions::Alphanumeric;
use rand::Rng;
use shortly_core::short_id::SHORT_ID_LENGTH;
use shortly_core::ShortId;

/// Generates 8-character ids drawn uniformly from `[A-Za-z0-9]`.
///
/// Stateless; every call samples a fresh id from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomGenerator;

impl RandomGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl IdGenerator for RandomGenerator {
    fn generate(&self) -> ShortId {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SHORT_ID_LENGTH)
            .map(char::from)
            .collect();
        ShortId::new_unchecked(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generates_fixed_length_alphanumeric_ids() {
        let generator = RandomGenerator::new();

        for _ in 0..100 {
            let id = generator.generate();
            assert_eq!(id.as_str().len(), SHORT_ID_LENGTH);
            assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
            // Generated ids satisfy the validated constructor too.
            assert!(ShortId::new(id.as_str()).is_ok());
        }
    }

    #[test]
    fn generated_ids_are_spread_out() {
        let generator = RandomGenerator::new();

        let ids: HashSet<String> = (0..1000)
            .map(|_| generator.generate().as_str().to_owned())
            .collect();

        // 62^8 id space: 1000 draws colliding would indicate a broken RNG.
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn generator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RandomGenerator>();
    }
}

//! Initial password generation.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::PasswordPolicy;

const LOWERCASE: &[u8] = b"abcdefghijkmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const DIGITS: &[u8] = b"23456789";

/// Generate a password satisfying `policy`.
///
/// Draws the minimum count from each class, then shuffles the result so
/// class boundaries are not predictable.
#[must_use]
pub fn generate_password(policy: &PasswordPolicy) -> String {
    generate_password_with(policy, &mut rand::thread_rng())
}

/// Generate a password with a caller-supplied RNG.
pub fn generate_password_with<R: Rng + ?Sized>(policy: &PasswordPolicy, rng: &mut R) -> String {
    let symbols: Vec<char> = policy.symbol_set.chars().collect();

    let mut chars: Vec<char> = Vec::with_capacity(policy.length());
    chars.extend(draw(LOWERCASE, policy.lowercase, rng));
    chars.extend(draw(UPPERCASE, policy.uppercase, rng));
    chars.extend(draw(DIGITS, policy.digits, rng));
    if !symbols.is_empty() {
        chars.extend((0..policy.symbols).filter_map(|_| symbols.choose(rng).copied()));
    }

    chars.shuffle(rng);
    chars.into_iter().collect()
}

fn draw<'a, R: Rng + ?Sized>(
    alphabet: &'a [u8],
    count: usize,
    rng: &'a mut R,
) -> impl Iterator<Item = char> + 'a {
    (0..count).filter_map(move |_| alphabet.choose(rng).map(|b| char::from(*b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn count(password: &str, predicate: impl Fn(char) -> bool) -> usize {
        password.chars().filter(|c| predicate(*c)).count()
    }

    #[test]
    fn test_composition() {
        let policy = PasswordPolicy::default();
        for _ in 0..50 {
            let password = generate_password(&policy);
            assert_eq!(password.chars().count(), policy.length());
            assert_eq!(count(&password, |c| c.is_ascii_lowercase()), policy.lowercase);
            assert_eq!(count(&password, |c| c.is_ascii_uppercase()), policy.uppercase);
            assert_eq!(count(&password, |c| c.is_ascii_digit()), policy.digits);
            assert_eq!(
                count(&password, |c| policy.symbol_set.contains(c)),
                policy.symbols
            );
        }
    }

    #[test]
    fn test_shuffled() {
        let policy = PasswordPolicy::default();
        let mut rng = StdRng::seed_from_u64(7);
        let passwords: Vec<String> = (0..20)
            .map(|_| generate_password_with(&policy, &mut rng))
            .collect();
        // Without shuffling every password would start with the lowercase class.
        assert!(passwords
            .iter()
            .any(|p| !p.chars().next().is_some_and(|c| c.is_ascii_lowercase())));
    }

    #[test]
    fn test_zero_class_counts() {
        let policy = PasswordPolicy {
            lowercase: 0,
            uppercase: 0,
            digits: 8,
            symbols: 0,
            symbol_set: String::new(),
        };
        let password = generate_password(&policy);
        assert_eq!(password.len(), 8);
        assert!(password.chars().all(|c| c.is_ascii_digit()));
    }
}

//! Master-password strength rules and Argon2 hashing.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use regex::Regex;

/// Strength rules, checked in order; the first unmet rule wins. The returned
/// message is shown to the user verbatim.
///
/// Applied on setup and password change only; login compares against the
/// stored hash and never re-validates strength.
///
/// # Errors
/// Returns the reason string for the first unmet rule.
pub fn validate_strength(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters long");
    }
    if !contains_class(password, "[A-Z]") {
        return Err("Password must contain at least one uppercase letter");
    }
    if !contains_class(password, "[a-z]") {
        return Err("Password must contain at least one lowercase letter");
    }
    if !contains_class(password, r"\d") {
        return Err("Password must contain at least one number");
    }
    if !contains_class(password, "[!@#$%^&*(),.?\":{}|<>]") {
        return Err("Password must contain at least one special character");
    }
    Ok(())
}

fn contains_class(password: &str, pattern: &str) -> bool {
    Regex::new(pattern).is_ok_and(|re| re.is_match(password))
}

/// Hash with a fresh random salt; the PHC string carries its own parameters.
///
/// # Errors
/// Returns an error if hashing fails.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {err}"))?;
    Ok(hash.to_string())
}

/// Verify a candidate against a stored PHC string.
///
/// Unparseable stored hashes verify false instead of erroring; the caller
/// treats that the same as a wrong password.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_passwords_fail_on_length_regardless_of_content() {
        let reason = "Password must be at least 8 characters long";
        assert_eq!(validate_strength(""), Err(reason));
        assert_eq!(validate_strength("aB1!"), Err(reason));
        // Seven characters satisfying every other rule still fail on length.
        assert_eq!(validate_strength("aB1!aB1"), Err(reason));
    }

    #[test]
    fn missing_uppercase_is_reported_first_after_length() {
        assert_eq!(
            validate_strength("passw0rd!"),
            Err("Password must contain at least one uppercase letter")
        );
    }

    #[test]
    fn missing_lowercase() {
        assert_eq!(
            validate_strength("PASSW0RD!"),
            Err("Password must contain at least one lowercase letter")
        );
    }

    #[test]
    fn missing_digit() {
        assert_eq!(
            validate_strength("Password!"),
            Err("Password must contain at least one number")
        );
    }

    #[test]
    fn missing_special_character() {
        assert_eq!(
            validate_strength("Passw0rd"),
            Err("Password must contain at least one special character")
        );
    }

    #[test]
    fn strong_passwords_pass() {
        assert_eq!(validate_strength("Passw0rd!"), Ok(()));
        assert_eq!(validate_strength("Tr0ub4dor&3"), Ok(()));
        assert_eq!(validate_strength("A1b2C3d4?"), Ok(()));
    }

    #[test]
    fn every_listed_special_character_counts() {
        for special in "!@#$%^&*(),.?\":{}|<>".chars() {
            let password = format!("Passw0rd{special}");
            assert_eq!(validate_strength(&password), Ok(()), "char: {special}");
        }
    }

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("Passw0rd!").expect("hash");
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("Passw0rd!", &hash));
        assert!(!verify_password("Passw0rd", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("Passw0rd!").expect("hash");
        let second = hash_password("Passw0rd!").expect("hash");
        assert_ne!(first, second);
    }

    #[test]
    fn garbage_stored_hash_verifies_false() {
        assert!(!verify_password("Passw0rd!", "not-a-phc-string"));
        assert!(!verify_password("Passw0rd!", ""));
    }
}

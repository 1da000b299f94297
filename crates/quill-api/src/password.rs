//! Password strength checks and Argon2id hashing.

use std::collections::{HashMap, HashSet};

use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

pub const DEFAULT_MIN_LENGTH: usize = 8;

/// Similarity ratio at or above which a password counts as derived from the
/// username.
const MAX_SIMILARITY: f64 = 0.7;

const COMMON_PASSWORDS: &str = include_str!("common-passwords.txt");

#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    min_length: usize,
    common: HashSet<String>,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_LENGTH)
    }
}

impl PasswordPolicy {
    pub fn new(min_length: usize) -> Self {
        let common = COMMON_PASSWORDS
            .lines()
            .map(|line| line.trim().to_lowercase())
            .filter(|line| !line.is_empty())
            .collect();

        Self { min_length, common }
    }

    /// Runs every check and returns all complaints, not just the first.
    pub fn check(&self, password: &str, username: &str) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();

        if too_similar(password, username) {
            problems.push("The password is too similar to the username.".to_string());
        }
        if password.chars().count() < self.min_length {
            problems.push(format!(
                "This password is too short. It must contain at least {} characters.",
                self.min_length
            ));
        }
        if self.common.contains(&password.trim().to_lowercase()) {
            problems.push("This password is too common.".to_string());
        }
        if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
            problems.push("This password is entirely numeric.".to_string());
        }

        if problems.is_empty() { Ok(()) } else { Err(problems) }
    }
}

/// Compares the password against the whole username and each of its
/// word-separated parts.
fn too_similar(password: &str, username: &str) -> bool {
    let password = password.to_lowercase();
    let username = username.to_lowercase();
    if username.is_empty() {
        return false;
    }

    std::iter::once(username.as_str())
        .chain(
            username
                .split(|c: char| !(c.is_alphanumeric() || c == '_'))
                .filter(|part| !part.is_empty()),
        )
        .any(|value| {
            !exceeds_length_ratio(&password, value) && quick_ratio(&password, value) >= MAX_SIMILARITY
        })
}

/// A very long password cannot be "too similar" to a very short value.
fn exceeds_length_ratio(password: &str, value: &str) -> bool {
    let pwd_len = password.chars().count() as f64;
    let value_len = value.chars().count() as f64;
    pwd_len >= 10.0 * value_len && value_len < MAX_SIMILARITY / 2.0 * pwd_len
}

/// Upper bound on sequence similarity: twice the shared character count
/// (as multisets) over the combined length.
fn quick_ratio(a: &str, b: &str) -> f64 {
    let mut available: HashMap<char, usize> = HashMap::new();
    for c in b.chars() {
        *available.entry(c).or_default() += 1;
    }

    let mut matches = 0usize;
    for c in a.chars() {
        if let Some(count) = available.get_mut(&c) {
            if *count > 0 {
                *count -= 1;
                matches += 1;
            }
        }
    }

    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        1.0
    } else {
        2.0 * matches as f64 / total as f64
    }
}

/// Salted Argon2id PHC string.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hashing failed: {}", e))?;

    Ok(hash.to_string())
}

pub fn verify_password(password: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| anyhow!("corrupt password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

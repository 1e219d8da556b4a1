use anyhow::anyhow;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Minimum accepted length for a plaintext password.
pub const MIN_PASSWORD_LEN: usize = 5;

/// Well-formed argon2id hash with default cost parameters that no password matches.
/// Checked against when the account does not exist so both failures cost the same.
const UNUSABLE_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$XIWzTzaig+CPoWpgwv3cdA$+ycPr4BPM+je97aeWFDZVjYtzA54hpHPL1m0eT5fuyg";

#[cfg(test)]
thread_local! {
    pub(crate) static VERIFY_CALLS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow!("hash password: {e}")
        })?
        .to_string();
    Ok(hash)
}

/// `Ok(false)` for a wrong password, `Err` only when the stored hash is unreadable.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    #[cfg(test)]
    VERIFY_CALLS.with(|c| c.set(c.get() + 1));

    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow!("parse password hash: {e}")
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Runs a full verification against [`UNUSABLE_HASH`]; always `false`.
pub fn verify_unknown_account(plain: &str) -> anyhow::Result<bool> {
    verify_password(plain, UNUSABLE_HASH).map(|_| false)
}

pub fn check_password_strength(plain: &str) -> Result<(), String> {
    if plain.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    Ok(())
}

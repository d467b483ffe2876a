//! Form validation policy shared by every account-mutation flow.
//!
//! One canonical rule set for registration, password change and password
//! reset.  The historical client had per-screen copies of these checks
//! that drifted apart; everything now goes through this module.
//!
//! Pure functions, no errors — callers translate `false` into their own
//! user-facing message.

/// Characters accepted as the "special character" of a password.
const PASSWORD_SYMBOLS: &str = "!@#$%^&*()-_=+{}:;'\",.?/`~";

/// Minimum password length.
const MIN_PASSWORD_LEN: usize = 8;

/// Minimal syntactic email check: the address must contain an `@`.
/// The backend performs the authoritative validation.
pub fn validate_email(email: &str) -> bool {
    email.contains('@')
}

/// Password policy: at least [`MIN_PASSWORD_LEN`] characters, at least one
/// ASCII uppercase letter, and at least one symbol from
/// [`PASSWORD_SYMBOLS`].
pub fn validate_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| PASSWORD_SYMBOLS.contains(c))
}

use anyhow::anyhow;
use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::NaiveDateTime;
use fancy_regex::Regex;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, sqlx::FromRow, Serialize, Deserialize, actix_jwt_auth_middleware::FromRequest,
)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    // Never serialized: keeps the hash out of JWT claims and API listings.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_superuser: bool,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl User {
    pub fn new(
        email: &str,
        full_name: &str,
        password: &str,
        is_superuser: bool,
    ) -> anyhow::Result<Self> {
        if !validate_email(email)? {
            return Err(anyhow!("Invalid email address."));
        }

        if full_name.trim().is_empty() {
            return Err(anyhow!("Full name must not be empty."));
        }

        if !validate_password(password)? {
            return Err(anyhow!(
                "Password must be at least 8 characters long and include at least one lowercase letter, one uppercase letter, and one number."
            ));
        }

        // Hash the password
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("Failed to hash password: {e}"))?
            .to_string();

        Ok(User {
            id: 0, //set by DB
            email: email.to_string(),
            full_name: full_name.trim().to_string(),
            password_hash,
            is_superuser,
            created_at: None, //set by DB
            updated_at: None, //set by DB
        })
    }

    pub fn verify_password(&self, password: &str) -> anyhow::Result<()> {
        let hash = PasswordHash::new(&self.password_hash)
            .map_err(|e| anyhow!("Failed to parse stored password hash: {}", e))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .map_err(|e| anyhow!("Password not match: {}", e))
    }
}

fn validate_email(email: &str) -> anyhow::Result<bool> {
    static RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());
    match &*RE {
        Some(re) => re
            .is_match(email)
            .map_err(|e| anyhow!("Regex error for email: {e}")),
        None => Err(anyhow!(
            "Email regex failed to compile. Rejecting all emails."
        )),
    }
}

fn validate_password(password: &str) -> anyhow::Result<bool> {
    static RE: Lazy<Option<Regex>> =
        Lazy::new(|| Regex::new(r"^(?=.*[a-z])(?=.*[A-Z])(?=.*\d).{8,}$").ok());
    match &*RE {
        Some(re) => re
            .is_match(password)
            .map_err(|e| anyhow!("Regex error for password: {e}")),
        None => Err(anyhow!(
            "Password regex failed to compile. Rejecting all passwords."
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_hashes_and_verifies_password() {
        let user = User::new("ada@example.com", "Ada Lovelace", "Sup3rSecret", false).unwrap();
        assert_ne!(user.password_hash, "Sup3rSecret");
        assert!(user.verify_password("Sup3rSecret").is_ok());
        assert!(user.verify_password("wrong-password").is_err());
    }

    #[test]
    fn rejects_bad_email_and_weak_password() {
        assert!(User::new("not-an-email", "Ada", "Sup3rSecret", false).is_err());
        assert!(User::new("ada@example.com", "Ada", "short", false).is_err());
        assert!(User::new("ada@example.com", "Ada", "alllowercase1", false).is_err());
        assert!(User::new("ada@example.com", "  ", "Sup3rSecret", false).is_err());
    }
}

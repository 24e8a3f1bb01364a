//! Password hashing and the local user directory backing `/api/auth/login`.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "gompet";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: u64,
    pub username: String,
    pub password_hash: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDirectory {
    #[serde(default)]
    pub users: Vec<UserRecord>,
}

pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2.hash_password(password.as_bytes(), &salt).map_err(|e| anyhow!(e.to_string()))?.to_string();
    Ok(phc)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else { false }
}

impl UserDirectory {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading user directory {}", path.display()))?;
        let dir: UserDirectory = serde_json::from_str(&text)
            .with_context(|| format!("parsing user directory {}", path.display()))?;
        Ok(dir)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() { std::fs::create_dir_all(parent).ok(); }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).with_context(|| format!("writing user directory {}", path.display()))?;
        Ok(())
    }

    /// Load the directory, seeding it with a default admin when the file does not exist yet.
    pub fn ensure_default_admin(path: &Path) -> Result<Self> {
        if path.exists() { return Self::load(path); }
        let dir = UserDirectory {
            users: vec![UserRecord {
                user_id: 1,
                username: DEFAULT_ADMIN_USERNAME.to_string(),
                password_hash: hash_password(DEFAULT_ADMIN_PASSWORD)?,
                roles: vec!["admin".into()],
            }],
        };
        dir.save(path)?;
        info!(target: "startup", "seeded user directory at {} with default admin", path.display());
        Ok(dir)
    }

    pub fn add_user(&mut self, username: &str, password: &str) -> Result<u64> {
        if self.find(username).is_some() {
            return Err(anyhow!("user already exists: {username}"));
        }
        let user_id = self.users.iter().map(|u| u.user_id).max().unwrap_or(0) + 1;
        self.users.push(UserRecord {
            user_id,
            username: username.to_string(),
            password_hash: hash_password(password)?,
            roles: vec!["user".into()],
        });
        Ok(user_id)
    }

    pub fn find(&self, username: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.username.eq_ignore_ascii_case(username))
    }

    /// Returns the matching record when the password verifies.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<&UserRecord> {
        let user = self.find(username)?;
        verify_password(&user.password_hash, password).then_some(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_only_the_right_password() {
        let phc = hash_password("burek").unwrap();
        assert!(verify_password(&phc, "burek"));
        assert!(!verify_password(&phc, "azor"));
        assert!(!verify_password("not-a-phc-string", "burek"));
    }

    #[test]
    fn default_admin_is_seeded_once() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("users.json");
        let first = UserDirectory::ensure_default_admin(&path).unwrap();
        assert!(first.authenticate(DEFAULT_ADMIN_USERNAME, DEFAULT_ADMIN_PASSWORD).is_some());
        let again = UserDirectory::ensure_default_admin(&path).unwrap();
        assert_eq!(again.users, first.users);
    }

    #[test]
    fn add_user_assigns_next_id_and_rejects_duplicates() {
        let mut dir = UserDirectory::default();
        assert_eq!(dir.add_user("ola", "secret").unwrap(), 1);
        assert_eq!(dir.add_user("kasia", "secret").unwrap(), 2);
        assert!(dir.add_user("OLA", "x").is_err());
        assert_eq!(dir.authenticate("Ola", "secret").map(|u| u.user_id), Some(1));
        assert!(dir.authenticate("ola", "wrong").is_none());
    }
}

//! User registry and login session.
//!
//! There is no credential check beyond form validation: passwords are
//! validated at signup and then dropped, and login only requires a
//! registered e-mail.

use crate::store::{read_json, remove_if_exists, write_json_atomic};
use crate::{Error, Result, User, UserRole};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

const MIN_PASSWORD_LEN: usize = 6;

/// Whether a string looks like an e-mail address
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Signup form contents
#[derive(Clone, Debug)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: UserRole,
}

impl SignupRequest {
    /// Validate the form, stopping at the first problem
    pub fn validate(&self) -> Result<()> {
        if [&self.name, &self.email, &self.password, &self.confirm_password]
            .iter()
            .any(|field| field.is_empty())
        {
            return Err(Error::Validation("Please fill in all fields".into()));
        }
        if !is_valid_email(&self.email) {
            return Err(Error::Validation(
                "Please enter a valid email address".into(),
            ));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::Validation(format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LEN
            )));
        }
        if self.password != self.confirm_password {
            return Err(Error::Validation("Passwords do not match".into()));
        }
        Ok(())
    }
}

/// All registered users, stored as one JSON document
pub struct UserRegistry {
    path: PathBuf,
    users: Vec<User>,
}

impl UserRegistry {
    /// Registry file location inside a data directory
    pub fn default_path(data_dir: &Path) -> PathBuf {
        data_dir.join("users.json")
    }

    /// Load the registry, empty if the file doesn't exist
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let users: Vec<User> = read_json(&path)?.unwrap_or_default();
        tracing::debug!("Loaded {} users from {:?}", users.len(), path);
        Ok(Self { path, users })
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn find_by_email(&self, email: &str) -> Option<&User> {
        self.users.iter().find(|u| u.email == email)
    }

    pub fn find_by_id(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    /// Register a new user and persist the registry
    pub fn register(&mut self, request: SignupRequest, now: DateTime<Utc>) -> Result<User> {
        request.validate()?;

        if self.find_by_email(&request.email).is_some() {
            return Err(Error::Auth("User with this email already exists".into()));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: request.name,
            email: request.email,
            role: request.role,
            created_at: now,
        };

        self.users.push(user.clone());
        write_json_atomic(&self.path, &self.users)?;

        tracing::info!("Registered {} user {}", user.role, user.id);
        Ok(user)
    }

    /// Look up a user by e-mail
    pub fn login(&self, email: &str) -> Result<User> {
        if email.is_empty() {
            return Err(Error::Validation("Please fill in all fields".into()));
        }
        if !is_valid_email(email) {
            return Err(Error::Validation(
                "Please enter a valid email address".into(),
            ));
        }

        let user = self
            .find_by_email(email)
            .cloned()
            .ok_or_else(|| Error::Auth("Invalid email or password".into()))?;

        tracing::info!("User {} logged in", user.id);
        Ok(user)
    }
}

/// The logged-in user, persisted between invocations
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub user: User,
    pub logged_in_at: DateTime<Utc>,
}

impl Session {
    /// Session file location inside a data directory
    pub fn default_path(data_dir: &Path) -> PathBuf {
        data_dir.join("session.json")
    }

    pub fn new(user: User, now: DateTime<Utc>) -> Self {
        Self {
            user,
            logged_in_at: now,
        }
    }

    /// Load the current session
    ///
    /// A missing or unreadable session file means nobody is logged in.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        match read_json(path) {
            Ok(session) => Ok(session),
            Err(Error::Json(e)) => {
                tracing::warn!("Discarding corrupted session {:?}: {}", path, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)
    }

    /// Log out; returns whether a session existed
    pub fn clear(path: &Path) -> Result<bool> {
        remove_if_exists(path)
    }

    /// The logged-in user, if they may use patient features
    pub fn require_patient(&self) -> Result<&User> {
        match self.user.role {
            UserRole::Patient => Ok(&self.user),
            UserRole::Caretaker => Err(Error::Unsupported(
                "caretaker features are not available".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(email: &str) -> SignupRequest {
        SignupRequest {
            name: "Sam".into(),
            email: email.into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
            role: UserRole::Patient,
        }
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("sam@example.com"));
        assert!(!is_valid_email("sam@example"));
        assert!(!is_valid_email("sam example@x.com"));
        assert!(!is_valid_email("@example.com"));
    }

    #[test]
    fn test_signup_validation() {
        let mut req = signup("sam@example.com");
        assert!(req.validate().is_ok());

        req.password = "abc".into();
        req.confirm_password = "abc".into();
        assert!(matches!(req.validate(), Err(Error::Validation(m)) if m.contains("at least 6")));

        req.password = "abcdef".into();
        req.confirm_password = "abcdeg".into();
        assert!(matches!(req.validate(), Err(Error::Validation(m)) if m == "Passwords do not match"));

        req.name = String::new();
        assert!(matches!(req.validate(), Err(Error::Validation(m)) if m == "Please fill in all fields"));
    }

    #[test]
    fn test_register_and_login_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = UserRegistry::default_path(temp_dir.path());

        let mut registry = UserRegistry::load(&path).unwrap();
        let user = registry.register(signup("sam@example.com"), Utc::now()).unwrap();

        let reloaded = UserRegistry::load(&path).unwrap();
        assert_eq!(reloaded.users().len(), 1);
        assert_eq!(reloaded.login("sam@example.com").unwrap(), user);
        assert_eq!(reloaded.find_by_id(user.id), Some(&user));
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut registry =
            UserRegistry::load(UserRegistry::default_path(temp_dir.path())).unwrap();

        registry.register(signup("sam@example.com"), Utc::now()).unwrap();
        let result = registry.register(signup("sam@example.com"), Utc::now());

        assert!(matches!(result, Err(Error::Auth(_))));
        assert_eq!(registry.users().len(), 1);
    }

    #[test]
    fn test_login_unknown_email() {
        let temp_dir = tempfile::tempdir().unwrap();
        let registry = UserRegistry::load(UserRegistry::default_path(temp_dir.path())).unwrap();

        assert!(matches!(
            registry.login("nobody@example.com"),
            Err(Error::Auth(m)) if m == "Invalid email or password"
        ));
        assert!(matches!(registry.login("not-an-email"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_session_lifecycle() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = Session::default_path(temp_dir.path());
        assert_eq!(Session::load(&path).unwrap(), None);

        let mut registry = UserRegistry::load(UserRegistry::default_path(temp_dir.path())).unwrap();
        let user = registry.register(signup("sam@example.com"), Utc::now()).unwrap();
        let session = Session::new(user, Utc::now());
        session.save(&path).unwrap();

        assert_eq!(Session::load(&path).unwrap(), Some(session));
        assert!(Session::clear(&path).unwrap());
        assert!(!Session::clear(&path).unwrap());
        assert_eq!(Session::load(&path).unwrap(), None);
    }

    #[test]
    fn test_corrupted_session_means_logged_out() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = Session::default_path(temp_dir.path());
        std::fs::write(&path, "{ invalid json }").unwrap();

        assert_eq!(Session::load(&path).unwrap(), None);
    }

    #[test]
    fn test_caretaker_cannot_use_patient_features() {
        let mut req = signup("carer@example.com");
        req.role = UserRole::Caretaker;
        let user = User {
            id: Uuid::new_v4(),
            name: req.name,
            email: req.email,
            role: req.role,
            created_at: Utc::now(),
        };

        let session = Session::new(user, Utc::now());
        assert!(matches!(session.require_patient(), Err(Error::Unsupported(_))));
    }
}

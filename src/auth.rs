use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use anyhow::{Result, anyhow};

/// A signed-in user, as far as the chat screen cares: a display identity.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
}

/// File-backed session store.
///
/// Stands in for an external identity provider; the rest of the app only
/// consumes "who is signed in" and "clear the session", so the provider
/// behind this seam can change without touching the chat code.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn open() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(Self {
            path: config_dir.join("pokechat").join("session.json"),
        })
    }

    #[cfg(test)]
    fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn current_user(&self) -> Option<Identity> {
        let content = fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn sign_in(&self, email: &str) -> Result<Identity> {
        let identity = Identity {
            email: email.to_string(),
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&identity)?)?;

        Ok(identity)
    }

    pub fn sign_out(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

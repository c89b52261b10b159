use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User entity - represents a user in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new user with generated ID and timestamps.
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            date_joined: Utc::now(),
            last_login: None,
        }
    }
}

/// Profile entity - one per user, created alongside it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub bio: String,
    pub profile_picture: Option<String>,
}

impl Profile {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            bio: String::new(),
            profile_picture: None,
        }
    }

    /// Swap in a new picture reference, returning the one it replaces.
    pub fn replace_picture(&mut self, picture: Option<String>) -> Option<String> {
        if self.profile_picture == picture {
            return None;
        }
        std::mem::replace(&mut self.profile_picture, picture)
    }
}

/// Public author information embedded in post and comment payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: Uuid,
    pub username: String,
    pub bio: String,
    pub profile_picture: Option<String>,
}

impl Author {
    pub fn from_parts(user: &User, profile: Option<&Profile>) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            bio: profile.map(|p| p.bio.clone()).unwrap_or_default(),
            profile_picture: profile.and_then(|p| p.profile_picture.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_picture_returns_previous() {
        let mut profile = Profile::new(Uuid::new_v4());
        assert_eq!(profile.replace_picture(Some("a.png".into())), None);
        assert_eq!(
            profile.replace_picture(Some("b.png".into())),
            Some("a.png".to_string())
        );
        assert_eq!(profile.replace_picture(Some("b.png".into())), None);
        assert_eq!(profile.replace_picture(None), Some("b.png".to_string()));
    }
}

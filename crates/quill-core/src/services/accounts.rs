//! Registration, login and profile management.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Post, Profile, User, Viewer, VisibilityFilter, VisibilityPolicy};
use crate::error::{DomainError, RepoError, ValidationErrors};
use crate::ports::{
    AuthError, BaseRepository, FileStorage, PasswordService, PostQuery, TokenService,
};

use super::Repositories;
use super::read_cache::ReadCache;
use super::read_models::{UserDetail, UserSummary};
use super::validation::{
    PROFILE_PICS_DIR, check_email, check_media_ref, check_password, check_username,
};

#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// A bearer token handed back on register and login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: i64,
}

/// Profile edit. `profile_picture: Some(None)` removes the picture.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub bio: Option<String>,
    pub profile_picture: Option<Option<String>>,
}

pub struct AccountService {
    repos: Repositories,
    passwords: Arc<dyn PasswordService>,
    tokens: Arc<dyn TokenService>,
    storage: Arc<dyn FileStorage>,
    cache: Arc<ReadCache>,
}

impl AccountService {
    pub fn new(
        repos: Repositories,
        passwords: Arc<dyn PasswordService>,
        tokens: Arc<dyn TokenService>,
        storage: Arc<dyn FileStorage>,
        cache: Arc<ReadCache>,
    ) -> Self {
        Self {
            repos,
            passwords,
            tokens,
            storage,
            cache,
        }
    }

    pub async fn register(&self, form: Registration) -> Result<(UserDetail, IssuedToken), DomainError> {
        let username = form.username.trim().to_string();
        let email = form.email.trim().to_lowercase();

        let mut errors = ValidationErrors::new();
        check_username(&username, &mut errors);
        check_email(&email, &mut errors);
        check_password(&form.password, &form.password_confirm, &mut errors);

        if errors.get("username").is_none()
            && self.repos.users.find_by_username(&username).await?.is_some()
        {
            errors.add("username", "A user with that username already exists.");
        }
        if errors.get("email").is_none() && self.repos.users.find_by_email(&email).await?.is_some() {
            errors.add("email", "A user with that email already exists.");
        }
        errors.into_result()?;

        let hash = self.passwords.hash(&form.password).map_err(internal)?;
        let user = match self.repos.users.insert(User::new(username, email, hash)).await {
            Ok(user) => user,
            Err(RepoError::Constraint(_)) => {
                return Err(DomainError::Validation(ValidationErrors::single(
                    "username",
                    "A user with that username or email already exists.",
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let profile = match self.repos.profiles.insert(Profile::new(user.id)).await {
            Ok(profile) => profile,
            Err(e) => {
                // Never leave a user without a profile.
                if let Err(cleanup) = self.repos.users.delete(user.id).await {
                    tracing::error!(user_id = %user.id, error = %cleanup, "Failed to roll back user");
                }
                return Err(e.into());
            }
        };
        tracing::info!(user_id = %user.id, username = %user.username, "User registered");

        let token = self.issue(&user)?;
        Ok((user_detail(&user, Some(&profile), 0), token))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, DomainError> {
        let Some(mut user) = self.repos.users.find_by_username(username.trim()).await? else {
            tracing::debug!(username = %username, "Login for unknown user");
            return Err(DomainError::Unauthorized);
        };

        if !self
            .passwords
            .verify(password, &user.password_hash)
            .map_err(internal)?
        {
            tracing::debug!(user_id = %user.id, "Login with wrong password");
            return Err(DomainError::Unauthorized);
        }

        user.last_login = Some(Utc::now());
        let user = self.repos.users.update(user).await?;
        tracing::info!(user_id = %user.id, "User logged in");

        self.issue(&user)
    }

    pub async fn list_users(&self) -> Result<Vec<UserSummary>, DomainError> {
        let users = self.repos.users.list().await?;
        let ids: Vec<_> = users.iter().map(|u| u.id).collect();
        let profiles: HashMap<_, _> = self
            .repos
            .profiles
            .find_by_user_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.user_id, p))
            .collect();

        Ok(users
            .iter()
            .map(|u| {
                let profile = profiles.get(&u.id);
                UserSummary {
                    username: u.username.clone(),
                    bio: profile.map(|p| p.bio.clone()).unwrap_or_default(),
                    profile_picture: profile.and_then(|p| p.profile_picture.clone()),
                }
            })
            .collect())
    }

    /// A user's page, counting only their publicly visible posts.
    pub async fn get_user(&self, username: &str) -> Result<UserDetail, DomainError> {
        let user = self
            .repos
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::not_found("user", username))?;
        self.detail_for(&user).await
    }

    pub async fn me(&self, viewer: Viewer) -> Result<UserDetail, DomainError> {
        let user = self.current_user(viewer).await?;
        self.detail_for(&user).await
    }

    pub async fn update_profile(
        &self,
        viewer: Viewer,
        update: ProfileUpdate,
    ) -> Result<UserDetail, DomainError> {
        let user = self.current_user(viewer).await?;
        if let Some(Some(picture)) = &update.profile_picture {
            let mut errors = ValidationErrors::new();
            check_media_ref("profile_picture", picture, PROFILE_PICS_DIR, user.id, &mut errors);
            errors.into_result()?;
        }

        let (mut profile, existed) = match self.repos.profiles.find_by_id(user.id).await? {
            Some(profile) => (profile, true),
            None => (Profile::new(user.id), false),
        };

        if let Some(bio) = update.bio {
            profile.bio = bio;
        }
        let replaced = update
            .profile_picture
            .and_then(|picture| profile.replace_picture(picture));

        let profile = if existed {
            self.repos.profiles.update(profile).await?
        } else {
            self.repos.profiles.insert(profile).await?
        };
        tracing::debug!(user_id = %user.id, "Profile updated");

        if let Some(old) = replaced {
            self.release_file(&old).await;
        }

        let posts_count = self.public_posts(&user).await?;
        Ok(user_detail(&user, Some(&profile), posts_count))
    }

    /// Remove a user's profile and its picture.
    pub async fn delete_profile(&self, user_id: Uuid) -> Result<(), DomainError> {
        let Some(profile) = self.repos.profiles.find_by_id(user_id).await? else {
            return Ok(());
        };

        self.repos.profiles.delete(user_id).await?;
        if let Some(picture) = &profile.profile_picture {
            self.release_file(picture).await;
        }
        Ok(())
    }

    /// Delete the viewer's account along with everything they authored.
    ///
    /// Their comments and likes go too, so every cached snapshot may be stale
    /// afterwards and the whole read cache is dropped.
    pub async fn delete_account(&self, viewer: Viewer) -> Result<(), DomainError> {
        let user = self.current_user(viewer).await?;
        let posts = self.authored_posts(user.id).await?;

        self.delete_profile(user.id).await?;
        self.repos.counters.delete_user(user.id).await?;
        tracing::info!(
            user_id = %user.id,
            username = %user.username,
            posts = posts.len(),
            "Account deleted"
        );

        self.cache.invalidate_all().await;
        for image in posts.iter().filter_map(|p| p.featured_image.as_deref()) {
            self.release_file(image).await;
        }
        Ok(())
    }

    /// Every post by `user_id`, drafts included.
    async fn authored_posts(&self, user_id: Uuid) -> Result<Vec<Post>, DomainError> {
        let visibility = VisibilityPolicy::filter(Viewer::User(user_id), Utc::now());
        let mut query = PostQuery::new(visibility);
        query.author_id = Some(user_id);
        let (posts, _) = self.repos.posts.list(&query).await?;
        Ok(posts)
    }

    async fn current_user(&self, viewer: Viewer) -> Result<User, DomainError> {
        let user_id = viewer.user_id().ok_or(DomainError::Unauthorized)?;
        // A token can outlive its account.
        self.repos
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(DomainError::Unauthorized)
    }

    async fn detail_for(&self, user: &User) -> Result<UserDetail, DomainError> {
        let profile = self.repos.profiles.find_by_id(user.id).await?;
        let posts_count = self.public_posts(user).await?;
        Ok(user_detail(user, profile.as_ref(), posts_count))
    }

    async fn public_posts(&self, user: &User) -> Result<u64, DomainError> {
        Ok(self
            .repos
            .posts
            .count_visible_by_author(user.id, VisibilityFilter::public(Utc::now()))
            .await?)
    }

    fn issue(&self, user: &User) -> Result<IssuedToken, DomainError> {
        let access_token = self
            .tokens
            .generate_token(user.id, &user.username)
            .map_err(internal)?;
        Ok(IssuedToken {
            access_token,
            expires_in: self.tokens.expiration_seconds(),
        })
    }

    async fn release_file(&self, path: &str) {
        if let Err(e) = self.storage.delete(path).await {
            tracing::warn!(path = %path, error = %e, "Failed to release stored file");
        }
    }
}

fn user_detail(user: &User, profile: Option<&Profile>, posts_count: u64) -> UserDetail {
    UserDetail {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        bio: profile.map(|p| p.bio.clone()).unwrap_or_default(),
        profile_picture: profile.and_then(|p| p.profile_picture.clone()),
        date_joined: user.date_joined,
        last_login: user.last_login,
        posts_count,
    }
}

fn internal(e: AuthError) -> DomainError {
    tracing::error!(error = %e, "Credential processing failed");
    DomainError::Internal(e.to_string())
}

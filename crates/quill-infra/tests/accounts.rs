mod common;

use quill_core::DomainError;
use quill_core::domain::{Comment, PostDraft, PostStatus, Viewer};
use quill_core::ports::{BaseRepository, CommentRepository};
use quill_core::services::{ListParams, ProfileUpdate, Registration};

use common::{Harness, featured_image, profile_picture, user_id};

fn registration(username: &str, email: &str) -> Registration {
    Registration {
        username: username.into(),
        email: email.into(),
        password: "correct horse".into(),
        password_confirm: "correct horse".into(),
    }
}

#[tokio::test]
async fn test_register_creates_user_with_profile_and_token() {
    let h = Harness::new();

    let (user, token) = h
        .accounts
        .register(registration("alice", "Alice@Example.com"))
        .await
        .unwrap();

    assert_eq!(user.username, "alice");
    assert_eq!(user.email, "alice@example.com");
    assert_eq!(user.posts_count, 0);
    assert!(!token.access_token.is_empty());
    assert_eq!(token.expires_in, 3600);
    assert!(h.repos.profiles.find_by_id(user.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_register_reports_field_errors() {
    let h = Harness::new();
    h.accounts
        .register(registration("alice", "alice@example.com"))
        .await
        .unwrap();

    let duplicate = h
        .accounts
        .register(registration("alice", "alice@example.com"))
        .await;
    match duplicate {
        Err(DomainError::Validation(errors)) => {
            assert!(errors.get("username").is_some());
            assert!(errors.get("email").is_some());
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    let mismatched = h
        .accounts
        .register(Registration {
            password_confirm: "something else".into(),
            ..registration("bob", "bob@example.com")
        })
        .await;
    match mismatched {
        Err(DomainError::Validation(errors)) => assert!(errors.get("password").is_some()),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_login_checks_password_and_records_last_login() {
    let h = Harness::new();
    let (user, _) = h
        .accounts
        .register(registration("alice", "alice@example.com"))
        .await
        .unwrap();
    assert!(user.last_login.is_none());

    assert!(matches!(
        h.accounts.login("alice", "wrong password").await,
        Err(DomainError::Unauthorized)
    ));
    assert!(matches!(
        h.accounts.login("nobody", "correct horse").await,
        Err(DomainError::Unauthorized)
    ));

    let token = h.accounts.login("alice", "correct horse").await.unwrap();
    assert!(!token.access_token.is_empty());

    let me = h.accounts.me(Viewer::User(user.id)).await.unwrap();
    assert!(me.last_login.is_some());
}

#[tokio::test]
async fn test_user_page_counts_public_posts_only() {
    let h = Harness::new();
    let alice = h.user("alice").await;
    h.publish(alice, "One", "Public post number one.").await;
    h.publish(alice, "Two", "Public post number two.").await;
    h.draft(alice, "Three").await;

    let page = h.accounts.get_user("alice").await.unwrap();
    assert_eq!(page.posts_count, 2);

    assert!(matches!(
        h.accounts.get_user("nobody").await,
        Err(DomainError::NotFound { .. })
    ));

    let users = h.accounts.list_users().await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, "alice");
}

#[tokio::test]
async fn test_replacing_profile_picture_releases_old_file() {
    let h = Harness::new();
    let alice = h.user("alice").await;
    let old = profile_picture(alice, "old.png");
    let new = profile_picture(alice, "new.png");
    h.files.put(&old).await.unwrap();
    h.files.put(&new).await.unwrap();

    h.accounts
        .update_profile(
            alice,
            ProfileUpdate {
                bio: Some("Writes about gardens".into()),
                profile_picture: Some(Some(old.clone())),
            },
        )
        .await
        .unwrap();
    assert!(h.files.contains(&old).await);

    let updated = h
        .accounts
        .update_profile(
            alice,
            ProfileUpdate {
                profile_picture: Some(Some(new.clone())),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.bio, "Writes about gardens");
    assert_eq!(updated.profile_picture.as_deref(), Some(new.as_str()));
    assert!(!h.files.contains(&old).await);
    assert!(h.files.contains(&new).await);
}

#[tokio::test]
async fn test_profile_picture_must_be_in_own_directory() {
    let h = Harness::new();
    let alice = h.user("alice").await;
    let mallory = h.user("mallory").await;
    let alices = profile_picture(alice, "alice.png");
    h.files.put(&alices).await.unwrap();
    h.accounts
        .update_profile(
            alice,
            ProfileUpdate {
                profile_picture: Some(Some(alices.clone())),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let result = h
        .accounts
        .update_profile(
            mallory,
            ProfileUpdate {
                profile_picture: Some(Some(alices.clone())),
                ..Default::default()
            },
        )
        .await;
    match result {
        Err(DomainError::Validation(errors)) => {
            assert!(errors.get("profile_picture").is_some())
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    // Clearing mallory's own (empty) picture leaves alice's file alone.
    h.accounts
        .update_profile(
            mallory,
            ProfileUpdate {
                profile_picture: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(h.files.contains(&alices).await);
}

#[tokio::test]
async fn test_deleting_profile_releases_picture() {
    let h = Harness::new();
    let alice = h.user("alice").await;
    let picture = profile_picture(alice, "me.png");
    h.files.put(&picture).await.unwrap();
    h.accounts
        .update_profile(
            alice,
            ProfileUpdate {
                profile_picture: Some(Some(picture.clone())),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    h.accounts.delete_profile(user_id(alice)).await.unwrap();

    assert!(!h.files.contains(&picture).await);
    assert!(
        h.repos
            .profiles
            .find_by_id(user_id(alice))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_deleting_account_removes_authored_content() {
    let h = Harness::new();
    let alice = h.user("alice").await;
    let bob = h.user("bob").await;
    let alices = h.publish(alice, "Alice writes", "Body by alice.").await;
    let bobs = h.publish(bob, "Bob writes", "Body by bob.").await;
    h.repos
        .comments
        .insert(Comment::new(bobs.id, user_id(alice), "Nice one".into()))
        .await
        .unwrap();
    h.content.toggle_like(&bobs.slug, alice).await.unwrap();

    h.accounts.delete_account(alice).await.unwrap();

    assert!(matches!(
        h.content.get(&alices.slug, Viewer::Anonymous).await,
        Err(DomainError::NotFound { .. })
    ));
    let bobs = h.content.get(&bobs.slug, Viewer::Anonymous).await.unwrap();
    assert_eq!(bobs.likes, 0);
    assert!(h.repos.comments.list_approved(bobs.id).await.unwrap().is_empty());
    assert!(matches!(
        h.accounts.me(alice).await,
        Err(DomainError::Unauthorized)
    ));
}

#[tokio::test]
async fn test_deleting_account_refreshes_cached_reads() {
    let h = Harness::new();
    let alice = h.user("alice").await;
    let bob = h.user("bob").await;
    h.publish(alice, "Alice writes", "Body by alice.").await;
    let bobs = h.publish(bob, "Bob writes", "Body by bob.").await;
    h.content
        .add_comment(&bobs.slug, alice, "Lovely post".into())
        .await
        .unwrap();

    // Warm the list and detail caches.
    let before = h
        .content
        .list_visible(Viewer::Anonymous, ListParams::default())
        .await
        .unwrap();
    assert_eq!(before.count, 2);
    let detail = h
        .content
        .read_detail(&bobs.slug, Viewer::Anonymous)
        .await
        .unwrap();
    assert_eq!(detail.comments.len(), 1);

    h.accounts.delete_account(alice).await.unwrap();

    let after = h
        .content
        .list_visible(Viewer::Anonymous, ListParams::default())
        .await
        .unwrap();
    let slugs: Vec<&str> = after.results.iter().map(|p| p.slug.as_str()).collect();
    assert_eq!(after.count, 1);
    assert_eq!(slugs, vec![bobs.slug.as_str()]);

    let detail = h
        .content
        .read_detail(&bobs.slug, Viewer::Anonymous)
        .await
        .unwrap();
    assert!(detail.comments.is_empty());
}

#[tokio::test]
async fn test_deleting_account_releases_uploaded_files() {
    let h = Harness::new();
    let alice = h.user("alice").await;
    let cover = featured_image(alice, "cover.png");
    let avatar = profile_picture(alice, "me.png");
    h.files.put(&cover).await.unwrap();
    h.files.put(&avatar).await.unwrap();

    h.content
        .create(
            alice,
            PostDraft {
                title: "Illustrated".into(),
                content: "A post with a picture.".into(),
                status: PostStatus::Draft,
                featured_image: Some(cover.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    h.accounts
        .update_profile(
            alice,
            ProfileUpdate {
                profile_picture: Some(Some(avatar.clone())),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    h.accounts.delete_account(alice).await.unwrap();

    assert!(!h.files.contains(&cover).await);
    assert!(!h.files.contains(&avatar).await);
}

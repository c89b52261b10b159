use std::collections::BTreeMap;

use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
use uuid::Uuid;

use quill_core::domain::{PostStatus, User};
use quill_core::error::RepoError;
use quill_core::ports::{BaseRepository, CounterStore, PostRepository, UserRepository};

use crate::database::entity::{post, user};
use crate::database::postgres_repo::{PostgresPostRepository, PostgresUserRepository};

fn post_model(id: Uuid, views_count: i64, likes: i64) -> post::Model {
    let now = chrono::Utc::now();
    post::Model {
        id,
        author_id: Uuid::new_v4(),
        title: "Test Post".to_owned(),
        slug: "test-post".to_owned(),
        content: "Content".to_owned(),
        status: post::Status::Published,
        pub_date: Some(now.into()),
        views_count,
        likes,
        reading_time: 1,
        featured_image: None,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
    BTreeMap::from([("num_items", Value::from(n))])
}

#[tokio::test]
async fn test_find_post_by_slug() {
    let post_id = Uuid::new_v4();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![post_model(post_id, 7, 2)]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let post = PostRepository::find_by_slug(&repo, "test-post")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(post.id, post_id);
    assert_eq!(post.title, "Test Post");
    assert_eq!(post.status, PostStatus::Published);
    assert_eq!(post.views_count, 7);
    assert_eq!(post.likes, 2);
}

#[tokio::test]
async fn test_increment_views_returns_new_count() {
    let post_id = Uuid::new_v4();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![post_model(post_id, 11, 0)]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    assert_eq!(repo.increment_views(post_id).await.unwrap(), 11);
}

#[tokio::test]
async fn test_increment_views_on_missing_post() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<post::Model>::new()])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let result = repo.increment_views(Uuid::new_v4()).await;
    assert!(matches!(result, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn test_toggle_like_inserts_when_absent() {
    let post_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![post_model(post_id, 0, 0)]])
        .append_query_results([vec![count_row(1)]])
        .append_exec_results([
            // delete existing like: none
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            },
            // insert like
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            },
            // write back likes
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            },
        ])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let state = repo.toggle_like(post_id, user_id).await.unwrap();
    assert!(state.liked);
    assert_eq!(state.likes_count, 1);
}

#[tokio::test]
async fn test_slug_exists() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![count_row(1)], vec![count_row(0)]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    assert!(repo.slug_exists("test-post").await.unwrap());
    assert!(!repo.slug_exists("other").await.unwrap());
}

#[tokio::test]
async fn test_insert_user() {
    let user = User::new("alice".into(), "alice@example.com".into(), "hash".into());

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![user::Model {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            date_joined: user.date_joined.into(),
            last_login: None,
        }]])
        .into_connection();

    let repo = PostgresUserRepository::new(db);

    let saved: User = repo.insert(user.clone()).await.unwrap();
    assert_eq!(saved.id, user.id);
    assert_eq!(saved.username, "alice");
    assert!(saved.last_login.is_none());
}

#[tokio::test]
async fn test_delete_user_recounts_liked_posts() {
    let user = User::new("alice".into(), "alice@example.com".into(), "hash".into());
    let liked_post = Uuid::new_v4();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![user::Model {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            date_joined: user.date_joined.into(),
            last_login: None,
        }]])
        .append_query_results([vec![BTreeMap::from([("post_id", Value::from(liked_post))])]])
        .append_query_results([vec![post_model(liked_post, 0, 1)]])
        .append_query_results([vec![count_row(0)]])
        .append_exec_results([
            // delete user
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            },
            // write back likes
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            },
        ])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    repo.delete_user(user.id).await.unwrap();

    let log = format!("{:?}", repo.db.into_transaction_log()).replace('\\', "");
    assert!(log.contains(r#"DELETE FROM "users""#));
    assert!(log.contains(r#"UPDATE "posts" SET "likes""#));
}

#[tokio::test]
async fn test_delete_missing_user() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<user::Model>::new()])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let result = repo.delete_user(Uuid::new_v4()).await;
    assert!(matches!(result, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn test_find_by_multibyte_email() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<user::Model>::new()])
        .into_connection();

    let repo = PostgresUserRepository::new(db);

    let found = repo.find_by_email("élise@example.com").await.unwrap();
    assert!(found.is_none());
}

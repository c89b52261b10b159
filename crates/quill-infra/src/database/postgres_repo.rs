//! PostgreSQL repository implementations.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, Func, NullOrdering, Order};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, Set, TransactionTrait,
};
use uuid::Uuid;

use quill_core::domain::{Comment, LikeState, Post, Profile, User, VisibilityFilter};
use quill_core::error::RepoError;
use quill_core::ports::{
    CommentRepository, CounterStore, PostOrderField, PostOrdering, PostQuery, PostRepository,
    ProfileRepository, UserRepository,
};

use super::entity::comment::{self, Entity as CommentEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::post_like::{self, Entity as PostLikeEntity};
use super::entity::profile::{self, Entity as ProfileEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, map_db_err};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL profile repository.
pub type PostgresProfileRepository = PostgresBaseRepository<ProfileEntity>;

/// PostgreSQL comment repository.
pub type PostgresCommentRepository = PostgresBaseRepository<CommentEntity>;

/// PostgreSQL post repository. Also the counter store, since counters live
/// on the post row.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

fn like_pattern(term: &str) -> String {
    let escaped = term
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// `élise@example.com` -> `é***@example.com`. Keeps addresses out of logs.
fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let mut chars = local.chars();
            match (chars.next(), chars.next()) {
                (Some(first), Some(_)) => format!("{first}***@{domain}"),
                _ => format!("***@{domain}"),
            }
        }
        None => "***".to_string(),
    }
}

/// `(status = published AND pub_date <= now) OR author_id = viewer`
fn visibility_condition(filter: &VisibilityFilter) -> Condition {
    let public = Condition::all()
        .add(post::Column::Status.eq(post::Status::Published))
        .add(post::Column::PubDate.lte(filter.now));

    let condition = Condition::any().add(public);
    match filter.viewer {
        Some(viewer) => condition.add(post::Column::AuthorId.eq(viewer)),
        None => condition,
    }
}

fn filtered(query: &PostQuery) -> Select<PostEntity> {
    let mut select = PostEntity::find().filter(visibility_condition(&query.visibility));

    if let Some(status) = query.status {
        select = select.filter(post::Column::Status.eq(post::Status::from(status)));
    }
    if let Some(author_id) = query.author_id {
        select = select.filter(post::Column::AuthorId.eq(author_id));
    }
    if let Some(search) = &query.search {
        let pattern = like_pattern(&search.term);
        let mut condition = Condition::any()
            .add(Expr::expr(Func::lower(Expr::col(post::Column::Title))).like(pattern.as_str()))
            .add(Expr::expr(Func::lower(Expr::col(post::Column::Content))).like(pattern.as_str()));
        if !search.author_ids.is_empty() {
            condition = condition.add(post::Column::AuthorId.is_in(search.author_ids.clone()));
        }
        select = select.filter(condition);
    }

    select
}

fn ordered(select: Select<PostEntity>, ordering: PostOrdering) -> Select<PostEntity> {
    let column = match ordering.field {
        PostOrderField::PubDate => post::Column::PubDate,
        PostOrderField::ViewsCount => post::Column::ViewsCount,
        PostOrderField::Likes => post::Column::Likes,
        PostOrderField::ReadingTime => post::Column::ReadingTime,
    };
    let (order, nulls) = if ordering.descending {
        (Order::Desc, NullOrdering::Last)
    } else {
        (Order::Asc, NullOrdering::First)
    };

    select
        .order_by_with_nulls(column, order, nulls)
        .order_by_desc(post::Column::CreatedAt)
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");

        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let result = UserEntity::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn search_ids(&self, term: &str) -> Result<Vec<Uuid>, RepoError> {
        UserEntity::find()
            .select_only()
            .column(user::Column::Id)
            .filter(Expr::expr(Func::lower(Expr::col(user::Column::Username))).like(like_pattern(term).as_str()))
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await
            .map_err(map_db_err)
    }

    async fn list(&self) -> Result<Vec<User>, RepoError> {
        let result = UserEntity::find()
            .order_by_asc(user::Column::Username)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    async fn find_by_user_ids(&self, user_ids: &[Uuid]) -> Result<Vec<Profile>, RepoError> {
        let result = ProfileEntity::find()
            .filter(profile::Column::UserId.is_in(user_ids.to_vec()))
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn list_approved(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let result = CommentEntity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .filter(comment::Column::Approved.eq(true))
            .order_by_desc(comment::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn count_approved(&self, post_ids: &[Uuid]) -> Result<Vec<(Uuid, u64)>, RepoError> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<(Uuid, i64)> = CommentEntity::find()
            .select_only()
            .column(comment::Column::PostId)
            .column_as(Expr::col(comment::Column::Id).count(), "count")
            .filter(comment::Column::PostId.is_in(post_ids.to_vec()))
            .filter(comment::Column::Approved.eq(true))
            .group_by(comment::Column::PostId)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(rows
            .into_iter()
            .map(|(post_id, count)| (post_id, count.max(0) as u64))
            .collect())
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let result = PostEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError> {
        let result = PostEntity::find()
            .filter(post::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, RepoError> {
        let count = PostEntity::find()
            .filter(post::Column::Slug.eq(slug))
            .count(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(count > 0)
    }

    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        let model = post::ActiveModel::from(post)
            .insert(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(model.into())
    }

    async fn update(&self, post: &Post) -> Result<Post, RepoError> {
        let model = post::editable_fields(post)
            .update(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(model.into())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        PostLikeEntity::delete_many()
            .filter(post_like::Column::PostId.eq(id))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;
        CommentEntity::delete_many()
            .filter(comment::Column::PostId.eq(id))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;
        let result = PostEntity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        txn.commit().await.map_err(map_db_err)
    }

    async fn list(&self, query: &PostQuery) -> Result<(Vec<Post>, u64), RepoError> {
        let select = filtered(query);
        let total = select.clone().count(&self.db).await.map_err(map_db_err)?;

        // LIMIT is bound as a signed integer.
        let limit = (query.limit <= i64::MAX as u64).then_some(query.limit);
        let models = ordered(select, query.ordering)
            .offset(query.offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok((models.into_iter().map(Into::into).collect(), total))
    }

    async fn count_visible_by_author(
        &self,
        author_id: Uuid,
        visibility: VisibilityFilter,
    ) -> Result<u64, RepoError> {
        PostEntity::find()
            .filter(visibility_condition(&visibility))
            .filter(post::Column::AuthorId.eq(author_id))
            .count(&self.db)
            .await
            .map_err(map_db_err)
    }

    async fn all_contents(&self) -> Result<Vec<String>, RepoError> {
        PostEntity::find()
            .select_only()
            .column(post::Column::Content)
            .into_tuple::<String>()
            .all(&self.db)
            .await
            .map_err(map_db_err)
    }

    async fn image_in_use(&self, path: &str) -> Result<bool, RepoError> {
        let count = PostEntity::find()
            .filter(post::Column::FeaturedImage.eq(path))
            .count(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(count > 0)
    }
}

#[async_trait]
impl CounterStore for PostgresPostRepository {
    async fn increment_views(&self, post_id: Uuid) -> Result<u64, RepoError> {
        // Single UPDATE ... SET views_count = views_count + 1 RETURNING *
        let updated = PostEntity::update_many()
            .col_expr(
                post::Column::ViewsCount,
                Expr::col(post::Column::ViewsCount).add(1i64),
            )
            .filter(post::Column::Id.eq(post_id))
            .exec_with_returning(&self.db)
            .await
            .map_err(map_db_err)?;

        updated
            .first()
            .map(|model| model.views_count.max(0) as u64)
            .ok_or(RepoError::NotFound)
    }

    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeState, RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        // Row lock on the post serializes toggles against it.
        let locked = PostEntity::find_by_id(post_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(map_db_err)?;
        if locked.is_none() {
            return Err(RepoError::NotFound);
        }

        let removed = PostLikeEntity::delete_many()
            .filter(post_like::Column::PostId.eq(post_id))
            .filter(post_like::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .map_err(map_db_err)?
            .rows_affected;

        let liked = removed == 0;
        if liked {
            let like = post_like::ActiveModel {
                post_id: Set(post_id),
                user_id: Set(user_id),
                created_at: Set(Utc::now().into()),
            };
            PostLikeEntity::insert(like)
                .exec_without_returning(&txn)
                .await
                .map_err(map_db_err)?;
        }

        let likes_count = PostLikeEntity::find()
            .filter(post_like::Column::PostId.eq(post_id))
            .count(&txn)
            .await
            .map_err(map_db_err)?;

        PostEntity::update_many()
            .col_expr(post::Column::Likes, Expr::value(likes_count as i64))
            .filter(post::Column::Id.eq(post_id))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)?;

        Ok(LikeState { liked, likes_count })
    }

    async fn has_liked(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, RepoError> {
        let like = PostLikeEntity::find_by_id((post_id, user_id))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(like.is_some())
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        // Holding the user row keeps new likes by this user out until commit.
        let locked = UserEntity::find_by_id(user_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(map_db_err)?;
        if locked.is_none() {
            return Err(RepoError::NotFound);
        }

        let liked: Vec<Uuid> = PostLikeEntity::find()
            .select_only()
            .column(post_like::Column::PostId)
            .filter(post_like::Column::UserId.eq(user_id))
            .order_by_asc(post_like::Column::PostId)
            .into_tuple()
            .all(&txn)
            .await
            .map_err(map_db_err)?;

        if !liked.is_empty() {
            // Same row lock toggle_like takes, in id order.
            PostEntity::find()
                .filter(post::Column::Id.is_in(liked.clone()))
                .order_by_asc(post::Column::Id)
                .lock_exclusive()
                .all(&txn)
                .await
                .map_err(map_db_err)?;
        }

        // Profile, posts, comments and likes go with the user by cascade.
        UserEntity::delete_by_id(user_id)
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        for post_id in &liked {
            let likes_count = PostLikeEntity::find()
                .filter(post_like::Column::PostId.eq(*post_id))
                .count(&txn)
                .await
                .map_err(map_db_err)?;

            PostEntity::update_many()
                .col_expr(post::Column::Likes, Expr::value(likes_count as i64))
                .filter(post::Column::Id.eq(*post_id))
                .exec(&txn)
                .await
                .map_err(map_db_err)?;
        }

        txn.commit().await.map_err(map_db_err)?;
        tracing::debug!(user_id = %user_id, recounted = liked.len(), "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::mask_email;

    #[test]
    fn test_mask_email_handles_multibyte_local_part() {
        assert_eq!(mask_email("élise@example.com"), "é***@example.com");
        assert_eq!(mask_email("ab@example.com"), "a***@example.com");
        assert_eq!(mask_email("é@example.com"), "***@example.com");
        assert_eq!(mask_email("no-at-sign"), "***");
    }
}

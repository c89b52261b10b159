//! Input validation for write payloads.

use uuid::Uuid;

use crate::domain::{PostDraft, PostPatch};
use crate::error::{DomainError, ValidationErrors};

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 200;
pub const CONTENT_MIN_CHARS: usize = 10;
pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 150;
pub const PASSWORD_MIN_CHARS: usize = 8;

/// Media directories. Each user's files live under `<dir>/<user_id>/`.
pub const FEATURED_IMAGES_DIR: &str = "featured_images";
pub const PROFILE_PICS_DIR: &str = "profile_pics";

/// Storage prefix of the files `owner` may reference from `dir`.
pub fn media_prefix(dir: &str, owner: Uuid) -> String {
    format!("{dir}/{owner}/")
}

/// A stored file reference must name a file inside its owner's directory.
pub fn check_media_ref(
    field: &'static str,
    path: &str,
    dir: &str,
    owner: Uuid,
    errors: &mut ValidationErrors,
) {
    let prefix = media_prefix(dir, owner);
    let valid = path.strip_prefix(prefix.as_str()).is_some_and(|name| {
        !name.contains('\\')
            && name
                .split('/')
                .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
    });
    if !valid {
        errors.add(field, format!("Must reference a file under {prefix}"));
    }
}

/// Trim and check a title, recording problems under `title`.
fn clean_title(title: &str, errors: &mut ValidationErrors) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        errors.add("title", "Title cannot be empty");
    } else if trimmed.chars().count() < TITLE_MIN_CHARS {
        errors.add("title", "Title must be at least 3 characters");
    } else if trimmed.chars().count() > TITLE_MAX_CHARS {
        errors.add("title", "Title must be at most 200 characters");
    }
    trimmed.to_string()
}

fn check_content(content: &str, errors: &mut ValidationErrors) {
    if content.trim().chars().count() < CONTENT_MIN_CHARS {
        errors.add("content", "Content must be at least 10 characters");
    }
}

pub fn validate_draft(mut draft: PostDraft, author_id: Uuid) -> Result<PostDraft, DomainError> {
    let mut errors = ValidationErrors::new();
    draft.title = clean_title(&draft.title, &mut errors);
    check_content(&draft.content, &mut errors);
    if let Some(image) = &draft.featured_image {
        check_media_ref("featured_image", image, FEATURED_IMAGES_DIR, author_id, &mut errors);
    }
    errors.into_result()?;
    Ok(draft)
}

pub fn validate_patch(mut patch: PostPatch, author_id: Uuid) -> Result<PostPatch, DomainError> {
    let mut errors = ValidationErrors::new();
    if let Some(title) = patch.title.take() {
        patch.title = Some(clean_title(&title, &mut errors));
    }
    if let Some(content) = &patch.content {
        check_content(content, &mut errors);
    }
    if let Some(Some(image)) = &patch.featured_image {
        check_media_ref("featured_image", image, FEATURED_IMAGES_DIR, author_id, &mut errors);
    }
    errors.into_result()?;
    Ok(patch)
}

pub fn validate_comment(content: &str) -> Result<(), DomainError> {
    if content.trim().is_empty() {
        return Err(DomainError::Validation(ValidationErrors::single(
            "content",
            "Comment cannot be empty",
        )));
    }
    Ok(())
}

/// Letters, digits and `@.+-_`, 3 to 150 characters.
pub fn check_username(username: &str, errors: &mut ValidationErrors) {
    let valid_chars = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    if username.is_empty() {
        errors.add("username", "This field may not be blank.");
    } else if username.chars().count() < USERNAME_MIN_CHARS {
        errors.add("username", "Username must be at least 3 characters");
    } else if username.chars().count() > USERNAME_MAX_CHARS || !valid_chars {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
}

pub fn check_email(email: &str, errors: &mut ValidationErrors) {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        errors.add("email", "Enter a valid email address.");
    }
}

pub fn check_password(password: &str, confirm: &str, errors: &mut ValidationErrors) {
    if password.chars().count() < PASSWORD_MIN_CHARS {
        errors.add("password", "Password must be at least 8 characters");
    }
    if password != confirm {
        errors.add("password", "Passwords do not match.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PostStatus;

    fn draft(title: &str, content: &str) -> PostDraft {
        PostDraft {
            title: title.into(),
            content: content.into(),
            status: PostStatus::Published,
            ..Default::default()
        }
    }

    fn field_errors(result: Result<PostDraft, DomainError>) -> ValidationErrors {
        match result {
            Err(DomainError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_draft_title_is_trimmed() {
        let cleaned =
            validate_draft(draft("  Hello world  ", "long enough content"), Uuid::new_v4()).unwrap();
        assert_eq!(cleaned.title, "Hello world");
    }

    #[test]
    fn test_draft_rejects_short_fields() {
        let errors = field_errors(validate_draft(draft(" ab ", "short"), Uuid::new_v4()));
        assert_eq!(
            errors.get("title"),
            Some(&["Title must be at least 3 characters".to_string()][..])
        );
        assert!(errors.get("content").is_some());

        let errors = field_errors(validate_draft(draft("   ", "long enough content"), Uuid::new_v4()));
        assert_eq!(
            errors.get("title"),
            Some(&["Title cannot be empty".to_string()][..])
        );
    }

    #[test]
    fn test_patch_only_checks_present_fields() {
        let author = Uuid::new_v4();
        assert!(validate_patch(PostPatch::default(), author).is_ok());
        assert!(
            validate_patch(
                PostPatch {
                    content: Some("tiny".into()),
                    ..Default::default()
                },
                author
            )
            .is_err()
        );
    }

    #[test]
    fn test_featured_image_must_be_the_authors_own() {
        let author = Uuid::new_v4();
        let mut own = draft("Hello world", "long enough content");
        own.featured_image = Some(format!("featured_images/{author}/cover.png"));
        assert!(validate_draft(own, author).is_ok());

        let other = Uuid::new_v4();
        for path in [
            format!("featured_images/{other}/cover.png"),
            format!("profile_pics/{author}/me.png"),
            format!("featured_images/{author}/../{other}/cover.png"),
            format!("featured_images/{author}/"),
            "featured_images/cover.png".to_string(),
        ] {
            let mut foreign = draft("Hello world", "long enough content");
            foreign.featured_image = Some(path.clone());
            let errors = field_errors(validate_draft(foreign, author));
            assert!(errors.get("featured_image").is_some(), "accepted {path}");
        }

        // Clearing needs no check.
        let cleared = PostPatch {
            featured_image: Some(None),
            ..Default::default()
        };
        assert!(validate_patch(cleared, author).is_ok());
    }

    #[test]
    fn test_media_ref_checks() {
        let owner = Uuid::new_v4();
        let mut errors = ValidationErrors::new();
        check_media_ref(
            "profile_picture",
            &format!("profile_pics/{owner}/a/b.png"),
            PROFILE_PICS_DIR,
            owner,
            &mut errors,
        );
        assert!(errors.is_empty());

        check_media_ref(
            "profile_picture",
            &format!("profile_pics/{owner}//b.png"),
            PROFILE_PICS_DIR,
            owner,
            &mut errors,
        );
        assert!(errors.get("profile_picture").is_some());
    }

    #[test]
    fn test_blank_comment_rejected() {
        assert!(validate_comment("  \n ").is_err());
        assert!(validate_comment("Nice post").is_ok());
    }

    #[test]
    fn test_registration_checks() {
        let mut errors = ValidationErrors::new();
        check_username("bob smith", &mut errors);
        check_email("not-an-email", &mut errors);
        check_password("secret", "secret2", &mut errors);

        assert!(errors.get("username").is_some());
        assert!(errors.get("email").is_some());
        assert_eq!(errors.get("password").map(|m| m.len()), Some(2));

        let mut ok = ValidationErrors::new();
        check_username("bob.smith+1", &mut ok);
        check_email("bob@example.com", &mut ok);
        check_password("longenough", "longenough", &mut ok);
        assert!(ok.is_empty());
    }
}

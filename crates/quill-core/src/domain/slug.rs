//! Slug derivation for post URLs.
//!
//! Slugs are derived from titles with the `slug` crate (lowercase ASCII,
//! non-alphanumeric runs collapsed into a single hyphen). Collisions are
//! resolved by the caller walking [`candidates`] until one is free.

use slug::slugify;

/// Upper bound on the stored slug length.
pub const MAX_SLUG_LEN: usize = 200;

/// Used when a title has nothing slug-worthy in it.
pub const FALLBACK_SLUG: &str = "post";

/// How many suffixed candidates are tried before giving up.
pub const MAX_SUFFIX_ATTEMPTS: usize = 1000;

/// Derive the base slug for a title.
pub fn derive_slug(title: &str) -> String {
    let slug = slugify(title);
    if slug.is_empty() {
        return FALLBACK_SLUG.to_string();
    }

    // leave room for a numeric suffix
    let limit = MAX_SLUG_LEN - 8;
    if slug.len() > limit {
        slug[..limit].trim_end_matches('-').to_string()
    } else {
        slug
    }
}

/// `base`, `base-1`, `base-2`, ... bounded by [`MAX_SUFFIX_ATTEMPTS`].
pub fn candidates(base: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(base.to_string())
        .chain((1..=MAX_SUFFIX_ATTEMPTS).map(move |n| format!("{base}-{n}")))
}

/// Content helpers: HTML sanitizing and generated identifiers
///
/// User-supplied HTML is cleaned with an allow-list sanitizer before it is
/// persisted, so stored blog and comment bodies never carry scripts or
/// event-handler attributes.

use lazy_static::lazy_static;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use regex::Regex;

const RANDOM_SUFFIX_LENGTH: usize = 8;
const USERNAME_PREFIX: &str = "user-";

lazy_static! {
    static ref NON_SLUG_CHARS: Regex = Regex::new(r"[^a-z0-9\s-]").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref REPEATED_DASHES: Regex = Regex::new(r"-+").unwrap();
}

/// Strip disallowed tags and attributes from user HTML
pub fn sanitize_html(input: &str) -> String {
    ammonia::clean(input)
}

fn random_suffix() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_SUFFIX_LENGTH)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// `user-` followed by random lowercase alphanumerics
pub fn generate_username() -> String {
    format!("{}{}", USERNAME_PREFIX, random_suffix())
}

/// URL-friendly slug from a title, made unique with a random suffix
pub fn generate_slug(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    let cleaned = NON_SLUG_CHARS.replace_all(&lowered, "");
    let dashed = WHITESPACE.replace_all(cleaned.trim(), "-");
    let collapsed = REPEATED_DASHES.replace_all(&dashed, "-");
    let base = collapsed.trim_matches('-');

    if base.is_empty() {
        random_suffix()
    } else {
        format!("{}-{}", base, random_suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_tags_are_removed() {
        let dirty = "<p>Hello</p><script>alert('x')</script>";
        let clean = sanitize_html(dirty);

        assert!(clean.contains("<p>Hello</p>"));
        assert!(!clean.contains("script"));
    }

    #[test]
    fn test_event_handlers_are_removed() {
        let clean = sanitize_html(r#"<img src="a.png" onerror="steal()">"#);
        assert!(!clean.contains("onerror"));
    }

    #[test]
    fn test_plain_text_is_untouched() {
        assert_eq!(sanitize_html("Great article!"), "Great article!");
    }

    #[test]
    fn test_slug_from_title() {
        let slug = generate_slug("  My First Blog -- Post!! ");
        assert!(slug.starts_with("my-first-blog-post-"));
        assert_eq!(slug.len(), "my-first-blog-post-".len() + RANDOM_SUFFIX_LENGTH);
    }

    #[test]
    fn test_slug_of_symbols_only_is_still_usable() {
        let slug = generate_slug("!!!");
        assert_eq!(slug.len(), RANDOM_SUFFIX_LENGTH);
    }

    #[test]
    fn test_slugs_are_unique() {
        assert_ne!(generate_slug("same"), generate_slug("same"));
    }

    #[test]
    fn test_generated_username_shape() {
        let username = generate_username();
        assert!(username.starts_with("user-"));
        assert!(username.len() <= crate::validators::MAX_USERNAME_LENGTH);
    }
}

use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based sanitization for instructor-authored text content:
/// safe tags (like <b>, <p>) survive, dangerous tags (like <script>,
/// <iframe>) and event-handler attributes are stripped before the body
/// is stored.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

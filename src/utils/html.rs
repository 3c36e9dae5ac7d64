// src/utils/html.rs

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based: safe formatting tags (<b>, <p>, lists) survive, while
/// <script>, <iframe> and event-handler attributes are stripped. Applied to
/// exam descriptions and question text before they are stored, since the
/// portal renders both as rich text.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

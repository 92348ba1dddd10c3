/// Normalises a user-supplied hashtag for use in a listing path
///
/// Surrounding whitespace and leading `#` characters are removed. Returns
/// None when nothing is left.
pub fn normalize_hashtag(raw: &str) -> Option<String> {
    let tag = raw.trim().trim_start_matches('#').trim();
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_string())
    }
}

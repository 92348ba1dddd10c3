use url::Url;

/// Resolves an `href` attribute against the page it was found on
///
/// Returns None for empty, fragment-only and non-HTTP links.
pub fn resolve_link(href: &str, base: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let resolved = base.join(href).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}

/// Extracts the numeric video id from a record URL
///
/// The id is the run of digits ending the URL path once a trailing slash is
/// removed. Query string and fragment are ignored. Returns an empty string
/// when the path does not end in digits.
///
/// # Examples
///
/// ```
/// use hashtag_harvester::url::extract_video_id;
///
/// assert_eq!(
///     extract_video_id("https://urlebird.com/video/funny-cat-7301234567890123456/"),
///     "7301234567890123456"
/// );
/// assert_eq!(extract_video_id("https://urlebird.com/user/someone/"), "");
/// ```
pub fn extract_video_id(url_str: &str) -> String {
    let path = match Url::parse(url_str) {
        Ok(url) => url.path().to_string(),
        Err(_) => url_str
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let trimmed = path.trim_end_matches('/');
    let digits = trimmed
        .bytes()
        .rev()
        .take_while(|b| b.is_ascii_digit())
        .count();

    trimmed[trimmed.len() - digits..].to_string()
}

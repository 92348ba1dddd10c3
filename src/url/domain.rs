use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host, it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use hashtag_harvester::url::extract_domain;
///
/// let url = Url::parse("https://URLEBIRD.com/hash/cats/").unwrap();
/// assert_eq!(extract_domain(&url), Some("urlebird.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Extracts the domain from a URL string, used as the rate-limiter key
///
/// Unparsable input yields an empty key so that such requests still share
/// one throttle bucket instead of bypassing it.
pub fn domain_key(url_str: &str) -> String {
    Url::parse(url_str)
        .ok()
        .and_then(|url| extract_domain(&url))
        .unwrap_or_default()
}

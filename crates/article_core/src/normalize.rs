use url::Url;

const REDIRECT_HOST: &str = "www.google.com";
const REDIRECT_PATH: &str = "/url";
const TARGET_PARAM: &str = "url";

/// Returns the canonical form of `raw`.
///
/// Search-engine redirect wrappers (`https://www.google.com/url?...&url=<target>`)
/// are unwrapped to their destination. Anything else, including input that does
/// not parse as a URL, is returned unchanged.
pub fn normalize_url(raw: &str) -> String {
    let Ok(parsed) = Url::parse(raw) else {
        return raw.to_string();
    };
    // `port()` is `None` for the scheme's default port, so `:443` on https still matches.
    if parsed.host_str() != Some(REDIRECT_HOST)
        || parsed.port().is_some()
        || parsed.path() != REDIRECT_PATH
    {
        return raw.to_string();
    }
    parsed
        .query_pairs()
        .find(|(key, _)| key == TARGET_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|target| !target.is_empty())
        .unwrap_or_else(|| raw.to_string())
}

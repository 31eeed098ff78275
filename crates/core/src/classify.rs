// Content-type classification: decides whether a fetched body should be converted

/// Media type without parameters, e.g. `text/html` for `text/html; charset=utf-8`
pub fn media_type_essence(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
}

/// Whether a declared content type is one the converter supports.
///
/// An absent or unrecognized type is never an error, it just means the body is
/// passed through untouched.
pub fn should_convert<S: AsRef<str>>(content_type: Option<&str>, supported: &[S]) -> bool {
    let Some(content_type) = content_type else {
        return false;
    };

    let essence = media_type_essence(content_type);
    if essence.is_empty() {
        return false;
    }

    supported
        .iter()
        .any(|mime| mime.as_ref().trim().eq_ignore_ascii_case(essence))
}

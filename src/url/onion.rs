/// Length of a v3 onion service name (base32 of key, checksum and version)
const V3_LABEL_LEN: usize = 56;

/// Length of a deprecated v2 onion service name
const V2_LABEL_LEN: usize = 16;

/// Returns the service label of an onion hostname
///
/// For `www.abc….onion` this is `abc…`: the label directly left of the
/// `.onion` suffix. Returns None for hosts outside `.onion`.
///
/// # Examples
///
/// ```
/// use onion_sieve::url::onion_service_label;
///
/// assert_eq!(onion_service_label("shop.example.onion"), Some("example"));
/// assert_eq!(onion_service_label("example.com"), None);
/// ```
pub fn onion_service_label(host: &str) -> Option<&str> {
    let stripped = host.strip_suffix(".onion")?;
    let label = stripped.rsplit('.').next()?;
    if label.is_empty() {
        None
    } else {
        Some(label)
    }
}

/// Returns true if the host is a well-formed v3 onion service name
pub fn is_v3_onion(host: &str) -> bool {
    onion_service_label(host)
        .map(|label| label.len() == V3_LABEL_LEN && is_base32(label))
        .unwrap_or(false)
}

/// Returns true if the host is a deprecated v2 onion service name
pub fn is_v2_onion(host: &str) -> bool {
    onion_service_label(host)
        .map(|label| label.len() == V2_LABEL_LEN && is_base32(label))
        .unwrap_or(false)
}

fn is_base32(label: &str) -> bool {
    label
        .bytes()
        .all(|b| b.is_ascii_lowercase() || (b'2'..=b'7').contains(&b))
}

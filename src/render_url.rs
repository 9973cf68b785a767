use std::collections::BTreeSet;
use url::{form_urlencoded::byte_serialize, Url};

/// Picks the hostname to embed in the canonical url.
///
/// A forwarded host is only trusted when it is nonempty and an exact member
/// of the allow list; anything else falls back to the host the server
/// observed directly. This requires explicit opt-in allow-listing rather than
/// trusting arbitrary forwarded values, closing off host-header-injection
/// style spoofing.
pub(crate) fn resolve_host<'a>(
    declared: Option<&'a str>,
    forwarded: Option<&'a str>,
    allowed: &BTreeSet<String>,
) -> Option<&'a str> {
    match forwarded {
        Some(forwarded) if !forwarded.is_empty() && allowed.contains(forwarded) => Some(forwarded),
        _ => declared,
    }
}

/// Builds the render service request url.
///
/// The canonical url of the inbound request
/// (`{scheme}://{host}{path_and_query}`) is percent-encoded as a single
/// component and appended to the (trailing-slash-normalized) proxy url. When
/// `inject_shady_dom` is set, the literal `?wc-inject-shadydom=true` marker
/// rendertron understands is glued on after encoding.
pub(crate) fn build(
    proxy_url: &Url,
    scheme: &str,
    host: &str,
    path_and_query: &str,
    inject_shady_dom: bool,
) -> String {
    let canonical = format!("{scheme}://{host}{path_and_query}");
    let mut render_url = format!(
        "{proxy_url}{encoded}",
        encoded = byte_serialize(canonical.as_bytes()).collect::<String>()
    );

    if inject_shady_dom {
        render_url.push_str("?wc-inject-shadydom=true");
    }

    render_url
}

//! Debug endpoint discovery.

use url::Url;

use crate::config::DebugConfig;
use crate::error::{ReloadError, Result};
use crate::session::SessionContext;

/// The address of the pilet API for this session.
///
/// The session's `dbg:pilet-api` value wins over the configured fallback.
/// Absolute `http(s)` addresses are used verbatim; anything else is a path
/// on the configured origin.
pub fn resolve_pilet_api(session: &SessionContext, config: &DebugConfig) -> std::result::Result<Url, url::ParseError> {
    let api = session
        .pilet_api()
        .unwrap_or_else(|| config.pilet_api_fallback.clone());

    if api.starts_with("http:") || api.starts_with("https:") {
        return Url::parse(&api);
    }

    let origin = config.origin.trim_end_matches('/');
    let separator = if api.starts_with('/') { "" } else { "/" };
    Url::parse(&format!("{origin}{separator}{api}"))
}

/// The live-reload socket address for a pilet API address: same host and
/// path, with `http` swapped for `ws`.
pub fn socket_url(target: &Url) -> Result<Url> {
    let scheme = match target.scheme() {
        "http" => "ws",
        "https" => "wss",
        "ws" | "wss" => return Ok(target.clone()),
        other => {
            return Err(ReloadError::UnsupportedScheme {
                scheme: other.to_string(),
            })
        }
    };

    let mut socket = target.clone();
    socket
        .set_scheme(scheme)
        .map_err(|()| ReloadError::UnsupportedScheme {
            scheme: target.scheme().to_string(),
        })?;
    Ok(socket)
}

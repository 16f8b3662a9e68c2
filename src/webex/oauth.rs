use crate::config::WebexConfig;
use url::Url;

/// Builds the Webex authorize URL the login step redirects to.
///
/// `state` is echoed back on the callback and checked against the session.
pub fn authorize_url(config: &WebexConfig, state: Option<&str>) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&format!(
        "{}/authorize",
        config.base_url.trim_end_matches('/')
    ))?;
    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("response_mode", "query")
        .append_pair("scope", &config.scope);
    if let Some(state) = state {
        url.query_pairs_mut().append_pair("state", state);
    }
    Ok(url)
}

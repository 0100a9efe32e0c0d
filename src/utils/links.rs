use url::Url;

use crate::error::{Error, Result};

/// `{base}/{page}?k=v&…` with the query values percent-encoded.
pub fn page_link(base: &str, page: &str, params: &[(&str, &str)]) -> Result<String> {
    let mut url = Url::parse(&format!("{}/{}", base.trim_end_matches('/'), page))
        .map_err(|e| Error::Config(format!("Invalid PUBLIC_BASE_URL: {}", e)))?;
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params.iter().copied());
    }
    Ok(url.into())
}

//! In-memory GET for documents and stylesheets.

use super::{easy_handle, FetchError, FetchOptions};
use crate::control::RunControl;

/// Refuse to buffer documents larger than this.
const MAX_TEXT_BYTES: usize = 16 * 1024 * 1024;

/// A fetched text resource.
#[derive(Debug, Clone)]
pub struct FetchedText {
    /// URL after redirects.
    pub final_url: String,
    pub status: u32,
    pub content_type: Option<String>,
    pub body: String,
}

/// GETs `url` into memory and decodes the body as (lossy) UTF-8. Blocking.
///
/// Non-2xx responses are returned as `FetchError::Http`.
pub fn fetch_text(url: &str, opts: &FetchOptions, control: &RunControl) -> Result<FetchedText, FetchError> {
    if control.is_cancelled() {
        return Err(FetchError::Cancelled);
    }
    let mut easy = easy_handle(url, opts)?;
    easy.accept_encoding("")?;
    let mut body = Vec::new();

    let performed = {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            if body.len() + data.len() > MAX_TEXT_BYTES {
                return Ok(0);
            }
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.progress_function(|_, _, _, _| !control.is_cancelled())?;
        transfer.perform()
    };
    if let Err(e) = performed {
        if control.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        return Err(FetchError::Curl(e));
    }

    let status = easy.response_code()?;
    if !(200..300).contains(&status) {
        return Err(FetchError::Http(status));
    }
    let final_url = easy
        .effective_url()?
        .map(str::to_string)
        .unwrap_or_else(|| url.to_string());
    let content_type = easy.content_type()?.map(str::to_string);

    Ok(FetchedText {
        final_url,
        status,
        content_type,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

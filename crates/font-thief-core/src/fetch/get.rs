//! Streaming GET into a file.

use std::path::Path;

use super::{easy_handle, FetchError, FetchOptions};
use crate::control::RunControl;
use crate::storage::PartFile;

/// Downloads `url` into `dest`, streaming the body through `dest.part`.
///
/// The part file is renamed onto `dest` only when the transfer completed,
/// the status was 2xx and, if the server sent a Content-Length, every byte
/// arrived. Any other outcome removes the part file. Blocking: run it on a
/// blocking thread. Returns the number of bytes written.
pub fn fetch_to_file(
    url: &str,
    dest: &Path,
    opts: &FetchOptions,
    control: &RunControl,
) -> Result<u64, FetchError> {
    if control.is_cancelled() {
        return Err(FetchError::Cancelled);
    }
    let mut easy = easy_handle(url, opts)?;
    let mut part = PartFile::create(dest).map_err(FetchError::Storage)?;
    let mut write_error: Option<std::io::Error> = None;

    let performed = {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| match part.write_all(data) {
            Ok(()) => Ok(data.len()),
            Err(e) => {
                write_error = Some(e);
                Ok(0) // abort transfer
            }
        })?;
        transfer.progress_function(|_, _, _, _| !control.is_cancelled())?;
        transfer.perform()
    };

    if let Err(e) = performed {
        if control.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        if e.is_write_error() {
            if let Some(io_err) = write_error {
                return Err(FetchError::Storage(io_err));
            }
        }
        return Err(FetchError::Curl(e));
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(FetchError::Http(code));
    }

    let received = part.written();
    let announced = easy.content_length_download()?;
    if announced >= 0.0 {
        let expected = announced as u64;
        if received != expected {
            return Err(FetchError::PartialTransfer { expected, received });
        }
    }

    part.finalize().map_err(FetchError::Storage)?;
    Ok(received)
}

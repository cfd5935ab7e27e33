//! Helpers for the trigger side of a job: reference-id generation and the
//! upload naming convention.

use rand::Rng;

use crate::utils::error::{PipelineError, Result};

/// Reference ids look like `REF483920`: the `REF` prefix plus six random
/// digits.
pub fn generate_reference_id() -> String {
    let mut rng = rand::thread_rng();
    let digits: String = (0..6)
        .map(|_| {
            let digit: u8 = rng.gen_range(0..10);
            char::from(b'0' + digit)
        })
        .collect();
    format!("REF{digits}")
}

/// Uploaded objects carry their owner in the final path segment as
/// `{email}_{filename}`. Keys that do not follow the convention cannot be
/// attributed to an owner and are rejected.
pub fn parse_object_key(key: &str) -> Result<(String, String)> {
    let segment = key.rsplit('/').next().unwrap_or(key);
    let (email, file_name) = segment.split_once('_').ok_or_else(|| {
        PipelineError::malformed(format!(
            "object key '{key}' does not follow the email_filename convention"
        ))
    })?;

    if email.is_empty() || file_name.is_empty() {
        return Err(PipelineError::malformed(format!(
            "object key '{key}' has an empty email or file name"
        )));
    }

    Ok((email.to_string(), file_name.to_string()))
}

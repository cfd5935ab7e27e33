use crate::utils::error::{PipelineError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_non_empty(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PipelineError::InvalidConfigValue {
            field: field_name.to_string(),
            reason: "value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_location(field_name: &str, location: &str) -> Result<()> {
    validate_non_empty(field_name, location)?;

    if location.contains('\0') {
        return Err(PipelineError::InvalidConfigValue {
            field: field_name.to_string(),
            reason: "location contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_reference_id(field_name: &str, value: &str) -> Result<()> {
    validate_non_empty(field_name, value)?;

    // Reference ids end up in storage keys and file names.
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(PipelineError::InvalidConfigValue {
            field: field_name.to_string(),
            reason: "reference ids may only contain letters, digits, hyphens, and underscores"
                .to_string(),
        });
    }

    Ok(())
}

pub fn validate_email(field_name: &str, value: &str) -> Result<()> {
    validate_non_empty(field_name, value)?;

    let valid = match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
        None => false,
    };
    if !valid {
        return Err(PipelineError::InvalidConfigValue {
            field: field_name.to_string(),
            reason: format!("'{value}' is not a plausible email address"),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_non_empty() {
        assert!(validate_non_empty("output_path", "./output").is_ok());
        assert!(validate_non_empty("output_path", "").is_err());
        assert!(validate_non_empty("output_path", "   ").is_err());
    }

    #[test]
    fn test_validate_reference_id() {
        assert!(validate_reference_id("reference_id", "REF123456").is_ok());
        assert!(validate_reference_id("reference_id", "job_42-a").is_ok());
        assert!(validate_reference_id("reference_id", "bad/id").is_err());
        assert!(validate_reference_id("reference_id", "").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("email", "ada@example.com").is_ok());
        assert!(validate_email("email", "no-at-sign").is_err());
        assert!(validate_email("email", "@example.com").is_err());
        assert!(validate_email("email", "ada@").is_err());
    }
}

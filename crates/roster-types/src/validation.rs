use std::fmt;

/// Input checks shared by the org and user stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Required,
    TooLong { max: usize },
    InvalidFlags(u64),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Required => write!(f, "value is required"),
            ValidationError::TooLong { max } => write!(f, "value exceeds {max} characters"),
            ValidationError::InvalidFlags(bits) => write!(f, "invalid flag set {bits:#x}"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Reject empty (when `required`) or over-long text. Length is counted in characters.
pub fn check_text(value: &str, max: usize, required: bool) -> Result<(), ValidationError> {
    if required && value.trim().is_empty() {
        return Err(ValidationError::Required);
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { max });
    }
    Ok(())
}

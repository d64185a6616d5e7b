use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaylogError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid date '{input}': expected YYYY-MM-DD")]
    InvalidDate { input: String },
}

impl PlaylogError {
    /// Short error code string printed alongside terminal messages.
    pub fn code(&self) -> &'static str {
        match self {
            PlaylogError::Config(_) => "CONFIG_ERROR",
            PlaylogError::InvalidDate { .. } => "INVALID_DATE",
        }
    }
}

pub type Result<T> = std::result::Result<T, PlaylogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_has_a_code() {
        assert_eq!(PlaylogError::Config("x".into()).code(), "CONFIG_ERROR");
        let err = PlaylogError::InvalidDate {
            input: "14/03/2024".into(),
        };
        assert_eq!(err.code(), "INVALID_DATE");
        assert!(err.to_string().contains("14/03/2024"));
    }
}

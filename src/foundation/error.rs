/// Convenience result type used across Placard.
pub type PlacardResult<T> = Result<T, PlacardError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Invalid field geometry is deliberately NOT part of this taxonomy: malformed
/// geometry is silently corrected by [`crate::model::field::normalize`] so the
/// renderer stays total.
#[derive(thiserror::Error, Debug)]
pub enum PlacardError {
    /// Invalid user-provided data (empty submission values, bad dimensions).
    #[error("validation error: {0}")]
    Validation(String),

    /// Font registration or shaping failure.
    #[error("font error: {0}")]
    Font(String),

    /// Failure while compositing the final bitmap.
    #[error("render error: {0}")]
    Render(String),

    /// Record-store or object-storage failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PlacardError {
    /// Build a [`PlacardError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`PlacardError::Font`] value.
    pub fn font(msg: impl Into<String>) -> Self {
        Self::Font(msg.into())
    }

    /// Build a [`PlacardError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`PlacardError::Storage`] value.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Build a [`PlacardError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_category_prefix() {
        assert_eq!(
            PlacardError::validation("bad").to_string(),
            "validation error: bad"
        );
        assert_eq!(
            PlacardError::render("boom").to_string(),
            "render error: boom"
        );
    }

    #[test]
    fn anyhow_errors_pass_through() {
        let e: PlacardError = anyhow::anyhow!("io said no").into();
        assert_eq!(e.to_string(), "io said no");
    }
}

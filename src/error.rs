use serde::Serialize;

/// App-wide error type. Every fallible function returns `Result<T, AppError>`.
/// Serializes cleanly so batch reports carry structured error messages.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("Image decode error: {0}")]
    Decode(String),

    #[error("Image encode error: {0}")]
    Encode(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Capability unavailable: {0}")]
    Capability(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable kind, used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Network(_) => "network",
            AppError::Http { .. } => "http",
            AppError::Decode(_) => "decode",
            AppError::Encode(_) => "encode",
            AppError::Generation(_) => "generation",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation",
            AppError::Io(_) => "io",
            AppError::Serde(_) => "serde",
            AppError::Capability(_) => "capability",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<image::ImageError> for AppError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::Encoding(_) => AppError::Encode(e.to_string()),
            _ => AppError::Decode(e.to_string()),
        }
    }
}

/// Serialized as `{ error: "...", kind: "..." }` for report consumers.
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("AppError", 2)?;
        s.serialize_field("error", &self.to_string())?;
        s.serialize_field("kind", self.kind())?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_error_and_kind() {
        let err = AppError::Http {
            status: 503,
            url: "https://example.test/x".into(),
        };
        let v = serde_json::to_value(&err).unwrap();
        assert_eq!(v["kind"], "http");
        assert_eq!(v["error"], "HTTP 503 from https://example.test/x");
    }

    #[test]
    fn test_validation_kind() {
        assert_eq!(AppError::Validation("x".into()).kind(), "validation");
    }
}

use std::io;

/// All error types for the lightmap tooling.
#[derive(thiserror::Error, Debug)]
pub enum GiTweaksError {
    #[error("Scene error: {0}")]
    Scene(String),
    #[error("Lighting data error: {0}")]
    Lighting(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GiTweaksError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_strings() {
        let e = GiTweaksError::Scene("missing mesh".into());
        assert_eq!(e.to_string(), "Scene error: missing mesh");

        let e = GiTweaksError::Lighting("no lightmaps".into());
        assert_eq!(e.to_string(), "Lighting data error: no lightmaps");

        let e = GiTweaksError::Persistence("disk full".into());
        assert_eq!(e.to_string(), "Persistence error: disk full");
    }

    #[test]
    fn from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file missing");
        let e: GiTweaksError = io_err.into();
        assert!(matches!(e, GiTweaksError::Io(_)));
        assert!(e.to_string().contains("file missing"));
    }

    #[test]
    fn from_json_error() {
        let json_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let e: GiTweaksError = json_err.into();
        assert!(matches!(e, GiTweaksError::Json(_)));
    }
}

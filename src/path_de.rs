use serde::de::DeserializeOwned;
use thiserror::Error;

/// A deserialization failure annotated with the JSON path where it happened.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("at JSON path {path} → {message}")]
pub struct PathError {
    pub path: String,
    pub message: String,
}

impl From<serde_path_to_error::Error<serde_json::Error>> for PathError {
    fn from(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
        Self {
            path: err.path().to_string(),
            message: err.into_inner().to_string(),
        }
    }
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, PathError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    Ok(serde_path_to_error::deserialize::<_, T>(de)?)
}

/// Same as [`from_str_with_path`], starting from an already-parsed value.
pub fn from_value_with_path<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, PathError> {
    Ok(serde_path_to_error::deserialize::<_, T>(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::manifest::Manifest;

    #[test]
    fn error_names_the_offending_path() {
        let src = r#"{ "packages": [ { "path": "p", "name": "p", "types": [ { "name": "T", "spec": { "bogus": 1 } } ] } ] }"#;
        let err = from_str_with_path::<Manifest>(src).unwrap_err();
        assert!(err.path.starts_with("packages[0].types[0]"), "{}", err.path);
    }
}

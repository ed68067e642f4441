use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Error;

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, String> {
    let de = &mut serde_json::Deserializer::from_str(src);
    match serde_path_to_error::deserialize::<_, T>(de) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(format!("at JSON path {path} → {}", err.into_inner()))
        }
    }
}

/// Same as [`from_str_with_path`], for an already parsed document.
pub fn from_value_with_path<T: DeserializeOwned>(value: Value) -> Result<T, String> {
    match serde_path_to_error::deserialize::<_, T>(value) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(format!("at JSON path {path} → {}", err.into_inner()))
        }
    }
}

/// Parse `src`, optionally narrow it to the node at `pointer`, then decode.
///
/// `origin` only labels errors (usually the file path).
pub fn load_document<T: DeserializeOwned>(
    src: &str,
    pointer: Option<&str>,
    origin: &str,
) -> Result<T, Error> {
    let Some(pointer) = pointer else {
        return from_str_with_path(src).map_err(|message| Error::Metadata {
            origin: origin.to_string(),
            message,
        });
    };
    let mut root: Value = serde_json::from_str(src).map_err(|e| Error::Metadata {
        origin: origin.to_string(),
        message: e.to_string(),
    })?;
    let node = root.pointer_mut(pointer).map(Value::take).ok_or_else(|| Error::MissingPointer {
        origin: origin.to_string(),
        pointer: pointer.to_string(),
    })?;
    from_value_with_path(node).map_err(|message| Error::Metadata {
        origin: origin.to_string(),
        message,
    })
}

/// Read `path` and decode it with [`load_document`].
pub fn load_file<T: DeserializeOwned>(path: &Path, pointer: Option<&str>) -> Result<T, Error> {
    let src = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load_document(&src, pointer, &path.to_string_lossy())
}

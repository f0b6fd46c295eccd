// Module: FileLoader
// Resolves external resource names into JSON documents stored as
// <base>/<name>.json.

use std::fs;
use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

use super::LoadExternalResource;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("an error occurred when trying to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("the json file '{path}' is not valid: {source}")]
    InvalidJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub fn file_loader(base: PathBuf) -> LoadExternalResource {
    Box::new(move |name: &str| {
        let path = base.join(format!("{}.json", name));
        let display = path.display().to_string();
        let bytes = fs::read(&path).map_err(|source| ResourceError::Read {
            path: display.clone(),
            source,
        })?;
        serde_json::from_slice::<Value>(&bytes).map_err(|source| ResourceError::InvalidJson {
            path: display,
            source,
        })
    })
}

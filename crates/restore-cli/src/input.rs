//! Reading JSON inputs from files or stdin.

use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{self, Read};
use thiserror::Error;

/// Errors raised while loading command input.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("failed to read {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("input {name} exceeds maximum {max} bytes")]
    TooLarge { name: String, max: u64 },
    #[error("invalid JSON in {name}: {source}")]
    Json {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads raw text from `path`, or stdin when no path is given.
pub fn read_text(path: Option<&str>, max_size: Option<u64>) -> Result<String, InputError> {
    let name = path.unwrap_or("stdin").to_string();
    let io_err = |source| InputError::Io {
        name: name.clone(),
        source,
    };

    let reader: Box<dyn Read> = match path {
        Some(path) => {
            let file = File::open(path).map_err(io_err)?;
            if let Some(max) = max_size {
                let len = file.metadata().map_err(io_err)?.len();
                if len > max {
                    return Err(InputError::TooLarge { name: name.clone(), max });
                }
            }
            Box::new(file)
        }
        None => Box::new(io::stdin()),
    };

    // Read one byte past the cap so oversized stdin is detected.
    let limit = max_size.map_or(u64::MAX, |max| max.saturating_add(1));
    let mut buffer = String::new();
    reader
        .take(limit)
        .read_to_string(&mut buffer)
        .map_err(io_err)?;
    if let Some(max) = max_size {
        if buffer.len() as u64 > max {
            return Err(InputError::TooLarge { name: name.clone(), max });
        }
    }
    tracing::debug!(input = %name, bytes = buffer.len(), "read input");
    Ok(buffer)
}

/// Reads and deserializes JSON input.
pub fn read_json<T: DeserializeOwned>(
    path: Option<&str>,
    max_size: Option<u64>,
) -> Result<T, InputError> {
    let text = read_text(path, max_size)?;
    serde_json::from_str(&text).map_err(|source| InputError::Json {
        name: path.unwrap_or("stdin").to_string(),
        source,
    })
}

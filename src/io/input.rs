//! Query vector parsing for the `search` command.
//!
//! Accepts either a JSON array (`[0.6, 0.8]`) or a comma/whitespace
//! separated list (`0.6,0.8`).

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum InputError {
    #[error("Query vector is empty")]
    Empty,

    #[error("Query component {position} ('{raw}') is not a number")]
    NotANumber { position: usize, raw: String },

    #[error("Query vector is not a valid JSON array: {0}")]
    Json(String),
}

/// Parses a query vector from its command-line form.
pub fn parse_vector(raw: &str) -> Result<Vec<f32>, InputError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        let values: Vec<f32> =
            serde_json::from_str(trimmed).map_err(|e| InputError::Json(e.to_string()))?;
        if values.is_empty() {
            return Err(InputError::Empty);
        }
        return Ok(values);
    }

    let values = trimmed
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .enumerate()
        .map(|(position, part)| {
            part.parse::<f32>().map_err(|_| InputError::NotANumber {
                position,
                raw: part.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if values.is_empty() {
        return Err(InputError::Empty);
    }
    Ok(values)
}

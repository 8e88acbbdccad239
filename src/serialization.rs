//! Persistence for trained model bundles.
//!
//! Bundles round-trip through `postcard`: contexts are token tuples, which a
//! JSON map could not key, so the on-disk format is compact binary.

use std::fs;
use std::path::Path;

use crate::error::{NgramError, Result};
use crate::model::NgramModel;

/// Serialises a bundle of trained models to `path`.
pub fn save_models<P: AsRef<Path>>(models: &[NgramModel], path: P) -> Result<()> {
    let path = path.as_ref();
    let bytes = postcard::to_stdvec(&models)
        .map_err(|err| NgramError::Serialization(err.to_string()))?;
    fs::write(path, bytes).map_err(|err| NgramError::io(err, Some(path.to_path_buf())))
}

/// Loads a bundle of trained models from `path`.
pub fn load_models<P: AsRef<Path>>(path: P) -> Result<Vec<NgramModel>> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|err| NgramError::io(err, Some(path.to_path_buf())))?;
    postcard::from_bytes(&bytes).map_err(|err| NgramError::Serialization(err.to_string()))
}

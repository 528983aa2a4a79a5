//! Parameter-file ingestion.
//!
//! A `.params` file is a flat key/value listing (`kdelay` plus `p1..p48`,
//! INI syntax without sections). Loading fails fast: a missing file or a
//! missing key is an error, never a warning followed by undefined values.

use std::collections::HashMap;
use std::path::Path;

use config::{Config, File, FileFormat};

use crate::error::ConfigError;
use crate::model::RawParameters;

/// Load the raw kinetic constants from a `.params` key/value file.
pub fn load_raw_parameters(path: impl AsRef<Path>) -> Result<RawParameters, ConfigError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(ConfigError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let parsed = Config::builder()
        .add_source(File::from(path.to_path_buf()).format(FileFormat::Ini))
        .build()?;
    let map: HashMap<String, f64> = parsed.try_deserialize()?;

    RawParameters::from_map(&map)
}

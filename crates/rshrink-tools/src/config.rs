//! Fichier `rshrink.toml` : valeurs par défaut du merge.
//!
//! ```toml
//! filter = "R$*"
//! class_name = "R$styleable"
//! class_version = 50
//! parallel_threshold = 24
//! ```
//!
//! Les options de la ligne de commande priment sur le fichier.

use std::{env, fs};

use camino::{Utf8Path, Utf8PathBuf};
use rshrink_core::{Error, Result};
use serde::Deserialize;

/// Nom du fichier recherché.
pub const CONFIG_FILE: &str = "rshrink.toml";

/// Contenu de `rshrink.toml`; toutes les clés sont optionnelles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Glob des noms simples scannés.
    pub filter: Option<String>,
    /// Nom interne de la classe produite.
    pub class_name: Option<String>,
    /// Version majeure du fichier class produit.
    pub class_version: Option<u16>,
    /// Seuil de passage en parallèle.
    pub parallel_threshold: Option<usize>,
}

impl Config {
    /// Parse un document TOML.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(format!("invalid {CONFIG_FILE}: {e}")))
    }

    /// Lit et parse `path`.
    pub fn read(path: &Utf8Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::Config(format!("cannot read {path}: {e}")))?;
        Self::from_toml(&text).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{path}: {msg}")),
            other => other,
        })
    }
}

/// Premier `rshrink.toml` en remontant depuis `start`.
pub fn find_config(start: &Utf8Path) -> Option<Utf8PathBuf> {
    start.ancestors().map(|dir| dir.join(CONFIG_FILE)).find(|cand| cand.is_file())
}

/// Charge la config explicite, sinon la recherche depuis `start`, sinon `Default`.
pub fn load_config_from(explicit: Option<&Utf8Path>, start: &Utf8Path) -> Result<(Config, Option<Utf8PathBuf>)> {
    if let Some(p) = explicit {
        return Ok((Config::read(p)?, Some(p.to_path_buf())));
    }
    match find_config(start) {
        Some(found) => Ok((Config::read(&found)?, Some(found))),
        None => Ok((Config::default(), None)),
    }
}

/// [`load_config_from`] depuis le dossier courant.
pub fn load_config(explicit: Option<&Utf8Path>) -> Result<(Config, Option<Utf8PathBuf>)> {
    let cwd = env::current_dir()?;
    let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|p| Error::Config(format!("non UTF-8 working directory {}", p.display())))?;
    load_config_from(explicit, &cwd)
}

//! Collecte des fichiers `R$*.class` sous les racines d'entrée.

use anyhow::{anyhow, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use walkdir::WalkDir;

use crate::{filter::TypeFilter, to_utf8};

/// Fichiers à scanner, racine par racine.
///
/// Une racine fichier est gardée telle quelle; une racine dossier est
/// parcourue récursivement et ses fichiers acceptés par `filter` sont triés.
pub fn collect_inputs<P: AsRef<Utf8Path>>(roots: &[P], filter: &TypeFilter) -> Result<Vec<Utf8PathBuf>> {
    let mut out = Vec::new();
    for root in roots {
        let root = root.as_ref();
        if root.is_file() {
            out.push(root.to_path_buf());
            continue;
        }
        if !root.is_dir() {
            return Err(anyhow!("entrée introuvable: {root}"));
        }
        let mut found = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = entry.with_context(|| format!("parcours de {root}"))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let keep = entry.file_name().to_str().is_some_and(|name| filter.matches_class_file(name));
            if keep {
                found.push(to_utf8(entry.into_path())?);
            }
        }
        found.sort();
        tracing::debug!(root = %root, files = found.len(), "collected");
        out.extend(found);
    }
    Ok(out)
}

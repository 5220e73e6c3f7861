//! Lecture des classes `R$*` existantes vers une [`SymbolTable`].
//!
//! Chaque entrée produit sa propre table partielle; les tables sont ensuite
//! fusionnées dans l'ordre des entrées, que le scan ait tourné en séquentiel
//! ou sur le pool `rayon`. Les deux chemins rendent donc la même table et la
//! même première erreur.

use std::thread;

use rayon::prelude::*;
use rshrink_classfile::ClassFile;
use rshrink_core::{bytecode::Interpreter, simple_name, Result, SymbolTable};
use tracing::{debug, info};

use crate::filter::TypeFilter;

/// Réglages du scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Nombre d'entrées à partir duquel le scan passe en parallèle.
    pub parallel_threshold: usize,
}

impl Default for ScanOptions {
    fn default() -> Self { Self { parallel_threshold: default_parallel_threshold() } }
}

/// `3 × available_parallelism`.
pub fn default_parallel_threshold() -> usize {
    3 * thread::available_parallelism().map_or(1, usize::from)
}

/// Décode une classe : constantes `int` déclarées puis tableaux du `<clinit>`.
///
/// Une classe dont le nom simple ne passe pas `filter` rend une table vide.
pub fn scan_class(bytes: &[u8], filter: &TypeFilter) -> Result<SymbolTable> {
    let class = ClassFile::from_bytes(bytes)?;
    let simple = simple_name(&class.this_class);
    let mut table = SymbolTable::new();
    if !filter.matches(simple) {
        debug!(class = %class.this_class, filter = filter.glob(), "skipped");
        return Ok(table);
    }

    for field in &class.fields {
        if let Some(v) = field.int_constant {
            table.insert_symbol(&format!("{simple}.{}", field.name), v)?;
        }
    }

    let mut arrays = 0;
    if let Some(clinit) = class.clinit() {
        let insns = class.decode_code(clinit)?;
        arrays = Interpreter::new(&mut table).run(&insns)?;
    }

    debug!(
        class = %class.this_class,
        symbols = table.symbol_count(),
        arrays,
        "scanned"
    );
    Ok(table)
}

/// Scan de toutes les entrées et fusion vérifiée.
pub fn scan<B>(inputs: &[B], filter: &TypeFilter, opts: &ScanOptions) -> Result<SymbolTable>
where
    B: AsRef<[u8]> + Sync,
{
    let parallel = inputs.len() >= opts.parallel_threshold;
    let partials: Vec<Result<SymbolTable>> = if parallel {
        inputs.par_iter().map(|bytes| scan_class(bytes.as_ref(), filter)).collect()
    } else {
        inputs.iter().map(|bytes| scan_class(bytes.as_ref(), filter)).collect()
    };

    let mut table = SymbolTable::new();
    for partial in partials {
        table.merge(partial?)?;
    }

    info!(
        inputs = inputs.len(),
        parallel,
        symbols = table.symbol_count(),
        arrays = table.array_count(),
        "merged"
    );
    Ok(table)
}

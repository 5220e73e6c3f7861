//! rshrink-tools — pipeline de fusion des classes `R$*`.
//!
//! Objectif : collecter les classes de ressources de chaque module, fusionner
//! leurs constantes avec détection de conflits, puis écrire une seule classe
//! `R$styleable` dont le `<clinit>` reconstruit chaque tableau.
//!
//! ## Modules & zones clés
//! - `filter`  : `TypeFilter` (glob sur le nom simple)
//! - `collect` : `collect_inputs` (walkdir, ordre trié)
//! - `scan`    : `scan_class`, `scan` (séquentiel ou rayon)
//! - `emit`    : `build_artifact`, `emit`
//! - `config`  : `Config`, `load_config` (`rshrink.toml`, recherche ascendante)
//! - I/O       : `read_bytes`, `to_utf8`
//! - Time      : `Timer`, `human_millis`
//! - Pipeline  : `MergeOptions`, `run_merge`, `dump_class`
//!
//! Les erreurs de bibliothèque restent des `rshrink_core::Error`; ce crate
//! les enrobe en `anyhow::Result` avec contexte.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]
#![cfg_attr(not(debug_assertions), warn(missing_docs))]

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use rshrink_classfile::ClassFile;
use rshrink_core::bytecode::disassemble_full;
use serde::Serialize;

pub mod collect;
pub mod config;
pub mod emit;
pub mod filter;
pub mod scan;

pub use collect::collect_inputs;
pub use config::{load_config, Config};
pub use emit::{build_artifact, emit, EmitOptions};
pub use filter::TypeFilter;
pub use scan::{scan, scan_class, ScanOptions};

/// Version lisible du crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Petite bannière de version pour les logs.
pub fn version_banner(tool: &str) -> String {
    format!("{tool} (rshrink-tools {VERSION})")
}

/* ------------------------------------------------------------------------- */
/* Prelude                                                                   */
/* ------------------------------------------------------------------------- */

/// Prelude pour le binaire.
pub mod prelude {
    pub use anyhow::{anyhow, Context, Result};
    pub use camino::{Utf8Path, Utf8PathBuf};
    pub use crate::{
        version_banner, human_millis, read_bytes, to_utf8,
        Config, load_config, TypeFilter, ScanOptions, EmitOptions,
        MergeOptions, MergeReport, run_merge, dump_class, dump_table,
    };
}

/* ------------------------------------------------------------------------- */
/* I/O utils                                                                 */
/* ------------------------------------------------------------------------- */

/// Lis un fichier binaire.
pub fn read_bytes(path: &Utf8Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("lecture {path}"))
}

/// Convertit un `PathBuf` en `Utf8PathBuf` (erreur si non UTF-8).
pub fn to_utf8(p: PathBuf) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(p).map_err(|p| anyhow!("chemin non UTF-8: {}", p.display()))
}

/* ------------------------------------------------------------------------- */
/* Time / chrono                                                             */
/* ------------------------------------------------------------------------- */

/// Chrono de scope simple.
pub struct Timer {
    start: Instant,
}
impl Timer {
    /// Démarre un chrono.
    pub fn start() -> Self { Self { start: Instant::now() } }
    /// Durée écoulée.
    pub fn elapsed(&self) -> Duration { self.start.elapsed() }
    /// Format humain court.
    pub fn pretty(&self) -> String { human_millis(self.elapsed()) }
}

/// Format "humain" d'une durée.
pub fn human_millis(d: Duration) -> String {
    let ms = d.as_millis();
    if ms < 1_000 { return format!("{ms} ms"); }
    let s = ms as f64 / 1000.0;
    if s < 60.0 { return format!("{s:.3} s"); }
    let m = (s / 60.0).floor();
    let rest = s - m * 60.0;
    format!("{m:.0} min {rest:.1} s")
}

/* ------------------------------------------------------------------------- */
/* Pipeline                                                                  */
/* ------------------------------------------------------------------------- */

/// Paramètres complets d'un merge.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Fichiers ou dossiers d'entrée.
    pub inputs: Vec<Utf8PathBuf>,
    /// Dossier de sortie.
    pub out_dir: Utf8PathBuf,
    /// Glob des noms simples scannés.
    pub filter: String,
    /// Seuil de parallélisme.
    pub scan: ScanOptions,
    /// Classe produite.
    pub emit: EmitOptions,
}

impl MergeOptions {
    /// Options par défaut, surchargées par `cfg`.
    pub fn new(inputs: Vec<Utf8PathBuf>, out_dir: Utf8PathBuf, cfg: &Config) -> Self {
        let mut emit = EmitOptions::default();
        if let Some(name) = &cfg.class_name {
            emit.class_name.clone_from(name);
        }
        if let Some(v) = cfg.class_version {
            emit.class_version = v;
        }
        let mut scan = ScanOptions::default();
        if let Some(t) = cfg.parallel_threshold {
            scan.parallel_threshold = t;
        }
        Self {
            inputs,
            out_dir,
            filter: cfg.filter.clone().unwrap_or_else(|| rshrink_core::DEFAULT_TYPE_GLOB.to_owned()),
            scan,
            emit,
        }
    }
}

/// Résumé d'un merge (sérialisable pour `--summary`).
#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    /// Fichiers scannés, dans l'ordre de fusion.
    pub inputs: Vec<String>,
    /// Nombre de scalaires fusionnés.
    pub symbols: usize,
    /// Nombre de tableaux fusionnés.
    pub arrays: usize,
    /// Artefact écrit.
    pub output: String,
    /// Taille de l'artefact.
    pub bytes: usize,
    /// CRC32 de l'artefact.
    pub crc32: u32,
    /// Durée totale (ms).
    pub elapsed_ms: u128,
}

/// Collecte, scan, fusion et émission. Rien n'est écrit si une étape échoue.
pub fn run_merge(opts: &MergeOptions) -> Result<MergeReport> {
    let timer = Timer::start();
    let filter = TypeFilter::new(&opts.filter)?;
    let paths = collect_inputs(&opts.inputs, &filter)?;

    let blobs = paths.iter().map(|p| read_bytes(p)).collect::<Result<Vec<_>>>()?;
    let table = scan(&blobs, &filter, &opts.scan).context("échec du scan des classes de ressources")?;
    let table = table.freeze();

    let bytes = build_artifact(&table, &opts.emit).context("échec de génération de la classe")?;
    let output = emit::write_artifact(&opts.out_dir, &opts.emit.class_name, &bytes)
        .with_context(|| format!("écriture dans {}", opts.out_dir))?;

    tracing::info!(output = %output, elapsed = %timer.pretty(), "done");
    Ok(MergeReport {
        inputs: paths.iter().map(ToString::to_string).collect(),
        symbols: table.symbol_count(),
        arrays: table.array_count(),
        output: output.to_string(),
        bytes: bytes.len(),
        crc32: crc32fast::hash(&bytes),
        elapsed_ms: timer.elapsed().as_millis(),
    })
}

/// Listing texte d'une classe : constantes `int` puis `<clinit>` désassemblé.
pub fn dump_class(path: &Utf8Path) -> Result<String> {
    let class = ClassFile::read_file(path).with_context(|| format!("décodage {path}"))?;

    let mut out = String::new();
    let _ = writeln!(out, "class {} (major {})", class.this_class, class.major_version);
    for field in &class.fields {
        match field.int_constant {
            Some(v) => {
                let _ = writeln!(out, "  field {}:{} = 0x{v:x}", field.name, field.descriptor);
            }
            None => {
                let _ = writeln!(out, "  field {}:{}", field.name, field.descriptor);
            }
        }
    }
    let _ = writeln!(out);
    match class.clinit() {
        Some(clinit) => {
            let insns = class.decode_code(clinit).with_context(|| format!("décodage du <clinit> de {path}"))?;
            out.push_str(&disassemble_full(&insns, &class.this_class));
        }
        None => out.push_str("(no <clinit>)\n"),
    }
    Ok(out)
}

/// Table décodée d'une classe, en JSON (`{"symbols": {..}, "arrays": {..}}`).
///
/// Le filtre de type n'est pas appliqué : toute classe est lue.
pub fn dump_table(path: &Utf8Path) -> Result<String> {
    let bytes = read_bytes(path)?;
    let table = scan_class(&bytes, &TypeFilter::new("*")?).with_context(|| format!("décodage {path}"))?;
    Ok(serde_json::to_string_pretty(&table.freeze())?)
}

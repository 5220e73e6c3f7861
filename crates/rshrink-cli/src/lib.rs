//! rshrink-cli — bibliothèque interne du binaire `rshrink`
//!
//! But : garder `main.rs` limité au parsing d'arguments. Ici :
//! - les tâches haut niveau (`MergeTask`, `DumpTask`) et leur exécution
//! - l'initialisation des traces (`tracing-subscriber`, `EnvFilter`)
//! - la résolution config fichier → options (les flags priment)

#![deny(unused_must_use)]
#![forbid(unsafe_code)]

use std::io::{self, Write};

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use rshrink_tools::{config::Config, dump_class, dump_table, load_config, run_merge, MergeOptions, MergeReport};

// ───────────────────────────── Types publics ─────────────────────────────

/// Commande haut niveau (le parsing CLI reste dans main.rs).
#[derive(Clone, Debug)]
pub enum Command {
    /// Scan + fusion + émission.
    Merge(MergeTask),
    /// Désassemblage du `<clinit>` d'une classe.
    Dump(DumpTask),
}

/// Paramètres de `rshrink merge`.
#[derive(Clone, Debug, Default)]
pub struct MergeTask {
    /// Fichiers ou dossiers scannés.
    pub inputs: Vec<Utf8PathBuf>,
    /// Dossier de sortie.
    pub out_dir: Utf8PathBuf,
    /// Glob des noms simples (`--filter`).
    pub filter: Option<String>,
    /// Classe produite (`--class`).
    pub class_name: Option<String>,
    /// Seuil de parallélisme (`--threshold`).
    pub threshold: Option<usize>,
    /// Config explicite (`--config`).
    pub config: Option<Utf8PathBuf>,
    /// Affiche le rapport JSON sur stdout.
    pub summary: bool,
}

/// Paramètres de `rshrink dump`.
#[derive(Clone, Debug, Default)]
pub struct DumpTask {
    /// Fichier `.class`.
    pub input: Utf8PathBuf,
    /// Table décodée en JSON au lieu du listing.
    pub table: bool,
}

// ───────────────────────────── Initialisation ─────────────────────────────

/// Niveau de trace pour `-v`/`-q`.
pub fn level_for(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installe le subscriber global; `RUST_LOG` prime sur la verbosité.
pub fn init_tracing(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for(verbose, quiet)));
    let _ = fmt().with_env_filter(filter).with_writer(io::stderr).with_target(false).try_init();
}

// ───────────────────────────── Exécution ─────────────────────────────

/// Exécute une commande.
pub fn execute(cmd: Command) -> Result<()> {
    tracing::debug!("{}", rshrink_tools::version_banner("rshrink"));
    match cmd {
        Command::Merge(t) => {
            let report = merge_entry(&t)?;
            if t.summary {
                let json = serde_json::to_string_pretty(&report)?;
                writeln!(io::stdout().lock(), "{json}")?;
            }
            Ok(())
        }
        Command::Dump(t) => {
            let text = if t.table { dump_table(&t.input)? + "\n" } else { dump_class(&t.input)? };
            io::stdout().lock().write_all(text.as_bytes())?;
            Ok(())
        }
    }
}

/// Options effectives : défauts, puis `rshrink.toml`, puis flags.
pub fn resolve_merge_options(task: &MergeTask, cfg: &Config) -> MergeOptions {
    let mut opts = MergeOptions::new(task.inputs.clone(), task.out_dir.clone(), cfg);
    if let Some(f) = &task.filter {
        opts.filter.clone_from(f);
    }
    if let Some(c) = &task.class_name {
        opts.emit.class_name.clone_from(c);
    }
    if let Some(t) = task.threshold {
        opts.scan.parallel_threshold = t;
    }
    opts
}

fn merge_entry(task: &MergeTask) -> Result<MergeReport> {
    let (cfg, found) = load_config(task.config.as_deref()).context("chargement de rshrink.toml")?;
    if let Some(path) = &found {
        tracing::debug!(config = %path, "config loaded");
    }
    let opts = resolve_merge_options(task, &cfg);
    let report = run_merge(&opts)?;
    tracing::info!(
        inputs = report.inputs.len(),
        arrays = report.arrays,
        symbols = report.symbols,
        output = %report.output,
        "merge complete"
    );
    Ok(report)
}

// ───────────────────────────── Tests ─────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_for(0, false), "warn");
        assert_eq!(level_for(2, false), "debug");
        assert_eq!(level_for(5, false), "trace");
        assert_eq!(level_for(3, true), "error");
    }

    #[test]
    fn flags_override_config() {
        let cfg = Config {
            filter: Some("R$attr".into()),
            class_name: Some("cfg/R$styleable".into()),
            class_version: Some(52),
            parallel_threshold: Some(10),
        };
        let task = MergeTask {
            inputs: vec!["in".into()],
            out_dir: "out".into(),
            class_name: Some("flag/R$styleable".into()),
            threshold: Some(1),
            ..MergeTask::default()
        };
        let opts = resolve_merge_options(&task, &cfg);
        assert_eq!(opts.filter, "R$attr");
        assert_eq!(opts.emit.class_name, "flag/R$styleable");
        assert_eq!(opts.emit.class_version, 52);
        assert_eq!(opts.scan.parallel_threshold, 1);
    }

    #[test]
    fn merge_then_dump() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        std::fs::create_dir_all(root.join("in")).unwrap();
        std::fs::write(root.join("rshrink.toml"), "class_version = 50\n").unwrap();

        let task = MergeTask {
            inputs: vec![root.join("in")],
            out_dir: root.join("out"),
            config: Some(root.join("rshrink.toml")),
            ..MergeTask::default()
        };
        let report = merge_entry(&task).unwrap();
        assert_eq!(report.arrays, 0);

        let text = dump_class(&root.join("out/R$styleable.class")).unwrap();
        assert!(text.starts_with("class R$styleable (major 50)\n"));
        assert!(text.contains("0000: return"));
    }
}

//! `rshrink` — fusion des classes de ressources Android
//!
//! Ici on fait uniquement : parsing d'arguments, initialisation des traces,
//! et délégation à `rshrink_cli` (lib).

#![forbid(unsafe_code)]

use std::process::ExitCode;

use anyhow::Result;
use camino::Utf8PathBuf;
use clap::{ArgAction, Parser, Subcommand};

use rshrink_cli as cli;

// ──────────────────────────── CLI (clap) ────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "rshrink", version, about = "Fusionne les R$styleable de plusieurs modules en une seule classe", long_about = None)]
struct Opt {
    /// Augmente la verbosité (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux (erreurs uniquement)
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue, global = true)]
    quiet: bool,

    /// Sous-commandes
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scanner les classes R$*, fusionner, écrire R$styleable
    Merge {
        /// Fichiers .class ou dossiers à parcourir
        #[arg(required = true)]
        inputs: Vec<Utf8PathBuf>,
        /// Dossier de sortie
        #[arg(short, long)]
        out: Utf8PathBuf,
        /// Glob appliqué au nom simple des classes (défaut : R$*)
        #[arg(long)]
        filter: Option<String>,
        /// Nom interne de la classe produite (défaut : R$styleable)
        #[arg(long = "class")]
        class_name: Option<String>,
        /// Nombre d'entrées à partir duquel le scan est parallèle
        #[arg(long)]
        threshold: Option<usize>,
        /// Fichier de config (sinon rshrink.toml par recherche ascendante)
        #[arg(long)]
        config: Option<Utf8PathBuf>,
        /// Affiche un rapport JSON sur stdout
        #[arg(long)]
        summary: bool,
    },

    /// Désassembler le <clinit> d'une classe
    Dump {
        /// Fichier .class
        input: Utf8PathBuf,
        /// Table décodée (JSON) au lieu du listing
        #[arg(long)]
        table: bool,
    },
}

// ──────────────────────────── main ────────────────────────────

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn real_main() -> Result<()> {
    let opt = Opt::parse();
    cli::init_tracing(opt.verbose, opt.quiet);

    let command = match opt.cmd {
        Command::Merge { inputs, out, filter, class_name, threshold, config, summary } => {
            cli::Command::Merge(cli::MergeTask {
                inputs,
                out_dir: out,
                filter,
                class_name,
                threshold,
                config,
                summary,
            })
        }
        Command::Dump { input, table } => cli::Command::Dump(cli::DumpTask { input, table }),
    };

    cli::execute(command)
}

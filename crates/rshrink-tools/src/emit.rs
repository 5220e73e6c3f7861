//! Émission de la classe fusionnée (`R$styleable` par défaut).

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::process;

use camino::{Utf8Path, Utf8PathBuf};
use rshrink_classfile::{AccessFlags, ClassWriter, CLINIT, CLINIT_DESCRIPTOR, JAVA_LANG_OBJECT};
use rshrink_core::{
    bytecode::{FieldRef, INT_ARRAY_DESCRIPTOR},
    encode_int, simple_name, Error, FrozenTable, Insn, Result, DEFAULT_CLASS_VERSION, DEFAULT_STYLEABLE_CLASS,
};
use tracing::{debug, info};

/// Réglages de l'artefact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    /// Nom interne de la classe produite.
    pub class_name: String,
    /// Version majeure du fichier class.
    pub class_version: u16,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self { class_name: DEFAULT_STYLEABLE_CLASS.to_owned(), class_version: DEFAULT_CLASS_VERSION }
    }
}

/// Flags de la classe produite.
pub fn class_access() -> AccessFlags { AccessFlags::PUBLIC | AccessFlags::SYNTHETIC | AccessFlags::SUPER }

/// Flags des champs produits.
pub fn field_access() -> AccessFlags { AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::FINAL }

/// Instructions du `<clinit>` reconstruisant chaque tableau de `table`.
pub fn clinit_insns(table: &FrozenTable, owner: &str) -> Vec<Insn> {
    let mut out = Vec::new();
    for (name, values) in table.arrays() {
        out.push(encode_int(len_operand(values.len())));
        out.push(Insn::NewIntArray);
        for (ix, v) in values.iter().enumerate() {
            out.push(Insn::Dup);
            out.push(encode_int(len_operand(ix)));
            out.push(encode_int(*v));
            out.push(Insn::ArrayStore);
        }
        out.push(Insn::StoreField(FieldRef::int_array(owner, name)));
    }
    out.push(Insn::Return);
    out
}

fn len_operand(n: usize) -> i32 { i32::try_from(n).unwrap_or(i32::MAX) }

/// Sérialise `table` en fichier class.
///
/// Champs `[I` d'abord (ordre de la table), puis les scalaires du type
/// produit en `int` avec `ConstantValue`. Les scalaires des autres types
/// (`R$attr.*`, `R$id.*`, ...) restent dans la table mais ne sont pas émis.
pub fn build_artifact(table: &FrozenTable, opts: &EmitOptions) -> Result<Vec<u8>> {
    let owner = opts.class_name.as_str();
    let prefix = format!("{}.", simple_name(owner));

    let mut cw = ClassWriter::new(owner, JAVA_LANG_OBJECT, class_access(), opts.class_version)?;
    for (name, _) in table.arrays() {
        cw.field(field_access(), name, INT_ARRAY_DESCRIPTOR, None)?;
    }
    let mut skipped = 0usize;
    for (name, v) in table.symbols() {
        match name.strip_prefix(&prefix) {
            Some(field) => {
                cw.field(field_access(), field, "I", Some(v))?;
            }
            None => {
                debug!(symbol = %name, owner, "not owned by the output class, skipped");
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        debug!(skipped, owner, "foreign scalars left out");
    }
    cw.method(AccessFlags::STATIC, CLINIT, CLINIT_DESCRIPTOR, &clinit_insns(table, owner), 0)?;
    cw.to_bytes()
}

/// Chemin `<dir>/<class>.class` de l'artefact.
pub fn artifact_path(dir: &Utf8Path, class_name: &str) -> Utf8PathBuf { dir.join(format!("{class_name}.class")) }

/// Écrit `bytes` sous `<dir>/<class>.class` via un fichier temporaire renommé.
pub fn write_artifact(dir: &Utf8Path, class_name: &str, bytes: &[u8]) -> Result<Utf8PathBuf> {
    let path = artifact_path(dir, class_name);
    let parent = path.parent().unwrap_or(dir);
    fs::create_dir_all(parent).map_err(|e| Error::Config(format!("cannot create output directory {parent}: {e}")))?;

    let (tmp, mut file) = create_unique_tmp(&path)?;
    let written = file.write_all(bytes).and_then(|()| file.flush());
    drop(file);
    if let Err(e) = written.and_then(|()| fs::rename(&tmp, &path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(path)
}

/// Temporaire `<file>.tmp<pid>.<n>` créé en exclusif : deux écritures
/// concurrentes dans le même dossier n'ouvrent jamais le même fichier.
fn create_unique_tmp(path: &Utf8Path) -> Result<(Utf8PathBuf, fs::File)> {
    let pid = process::id();
    let mut i = 0u32;
    loop {
        let candidate = Utf8PathBuf::from(format!("{path}.tmp{pid}.{i}"));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(f) => return Ok((candidate, f)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => i = i.wrapping_add(1),
            Err(e) => return Err(e.into()),
        }
    }
}

/// Construit et écrit l'artefact; rend son chemin.
pub fn emit(table: &FrozenTable, dir: &Utf8Path, opts: &EmitOptions) -> Result<Utf8PathBuf> {
    let bytes = build_artifact(table, opts)?;
    let path = write_artifact(dir, &opts.class_name, &bytes)?;
    info!(
        path = %path,
        arrays = table.array_count(),
        symbols = table.symbol_count(),
        bytes = bytes.len(),
        "emitted"
    );
    Ok(path)
}

//! rshrink-core — primitives partagées
//!
//! Fournit :
//! - `SymbolTable` / `FrozenTable` : constantes scalaires et tableaux nommés, avec
//!   détection de conflits à l'insertion
//! - `bytecode` : modèle d'instructions (`Insn`), politique d'encodage des entiers,
//!   interpréteur de `<clinit>`, désassembleur textuel
//! - IO mémoire (big-endian, format class) : `ByteWriter`, `ByteReader`
//! - Erreurs `Error` + alias `Result<T>`
//!
//! Features :
//! - `serde` (par défaut) : `Serialize` sur la table (dump JSON côté outils)

#![deny(missing_docs)]

/* ─────────────────────────── Imports ─────────────────────────── */

use std::{borrow::Cow, fmt, io};

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

/* ─────────────────────────── Modules publics ─────────────────────────── */

/// Primitives de bytecode (instructions, opcodes, encodage, interpréteur, désassembleur).
pub mod bytecode;

/// Table de symboles fusionnée.
pub mod symbols;

pub use bytecode::{encode_int, FieldRef, Insn};
pub use symbols::{FrozenTable, SymbolTable};

/* ─────────────────────────── Constantes ─────────────────────────── */

/// Magic d'un fichier class : `0xCAFEBABE`.
pub const CLASS_MAGIC: u32 = 0xCAFE_BABE;

/// Version majeure émise par défaut (Java 6, `V1_6`).
pub const DEFAULT_CLASS_VERSION: u16 = 50;

/// Nom interne de la classe émise par défaut.
pub const DEFAULT_STYLEABLE_CLASS: &str = "R$styleable";

/// Glob par défaut des types ressources à scanner.
pub const DEFAULT_TYPE_GLOB: &str = "R$*";

/// Nom simple d'un nom interne (`com/example/R$attr` → `R$attr`).
pub fn simple_name(internal: &str) -> &str {
    internal.rsplit('/').next().unwrap_or(internal)
}

/* ─────────────────────────── Résultat commun ─────────────────────────── */

/// Alias résultat commun au workspace.
pub type Result<T> = core::result::Result<T, Error>;

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Valeur d'une constante nommée, telle que rapportée dans un conflit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstValue {
    /// Constante scalaire.
    Scalar(i32),
    /// Tableau d'entiers.
    Array(Vec<i32>),
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Scalar(v) => write!(f, "0x{v:x}"),
            ConstValue::Array(values) => write!(f, "{values:?}"),
        }
    }
}

/// Erreurs communes (toutes fatales pour un run).
#[derive(Debug, Error)]
pub enum Error {
    /// Séquence d'instructions structurellement invalide.
    #[error("malformed instruction stream: {0}")]
    MalformedStream(Cow<'static, str>),

    /// Deux sources ne s'accordent pas sur une même constante.
    #[error("value of {name} mismatched: expected {expected} but was {actual}")]
    Conflict {
        /// Nom qualifié de la constante.
        name: String,
        /// Valeur déjà présente dans la table.
        expected: ConstValue,
        /// Valeur rencontrée en second.
        actual: ConstValue,
    },

    /// Échec de lecture/écriture.
    #[error("io: {0}")]
    Io(#[from] io::Error),

    /// Configuration inutilisable (dossier de sortie, glob, fichier de config).
    #[error("config: {0}")]
    Config(String),

    /// Conteneur class invalide (magic, index de pool, attributs).
    #[error("invalid class file: {0}")]
    Format(Cow<'static, str>),

    /// Fin de buffer inattendue.
    #[error("unexpected EOF: need {needed} bytes at {at}")]
    UnexpectedEof {
        /// Nombre d'octets demandés.
        needed: usize,
        /// Offset où l'erreur s'est produite.
        at: usize,
    },
}

impl Error {
    /// Construit une erreur « flux malformé ».
    pub fn malformed(msg: impl Into<Cow<'static, str>>) -> Self { Error::MalformedStream(msg.into()) }
    /// Construit une erreur « format class invalide ».
    pub fn format(msg: impl Into<Cow<'static, str>>) -> Self { Error::Format(msg.into()) }
}

/* ─────────────────────────── Byte Writer (BE) ─────────────────────────── */

/// Buffer d'écriture big-endian (croît automatiquement).
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Crée un writer vide.
    pub fn new() -> Self { Self { buf: Vec::new() } }
    /// Nombre d'octets écrits.
    pub fn len(&self) -> usize { self.buf.len() }
    /// Vrai si rien n'a été écrit.
    pub fn is_empty(&self) -> bool { self.buf.is_empty() }
    /// Accès en lecture au contenu.
    pub fn as_slice(&self) -> &[u8] { &self.buf }
    /// Récupère le buffer (consomme).
    pub fn into_vec(self) -> Vec<u8> { self.buf }
    /// Ajoute des octets bruts.
    pub fn write_bytes(&mut self, bytes: &[u8]) { self.buf.extend_from_slice(bytes); }
    /// Écrit un u8.
    pub fn write_u8(&mut self, v: u8) { self.buf.push(v); }
    /// Écrit un u16 big-endian.
    pub fn write_u16(&mut self, v: u16) { self.buf.extend_from_slice(&v.to_be_bytes()); }
    /// Écrit un u32 big-endian.
    pub fn write_u32(&mut self, v: u32) { self.buf.extend_from_slice(&v.to_be_bytes()); }
    /// Écrit un i32 big-endian.
    pub fn write_i32(&mut self, v: i32) { self.buf.extend_from_slice(&v.to_be_bytes()); }
    /// Écrit un u64 big-endian.
    pub fn write_u64(&mut self, v: u64) { self.buf.extend_from_slice(&v.to_be_bytes()); }
}

/* ─────────────────────────── Byte Reader (BE) ─────────────────────────── */

/// Lecteur séquentiel sur un slice d'octets (helpers big-endian).
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    off: usize,
}

impl<'a> ByteReader<'a> {
    /// Construit un lecteur.
    pub fn new(data: &'a [u8]) -> Self { Self { data, off: 0 } }
    /// Offset courant.
    pub fn offset(&self) -> usize { self.off }
    /// Taille restante.
    pub fn remaining(&self) -> usize { self.data.len().saturating_sub(self.off) }

    /// Lit `n` octets (ou erreur si EOF).
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::UnexpectedEof { needed: n, at: self.off });
        }
        let start = self.off;
        self.off += n;
        Ok(&self.data[start..self.off])
    }

    /// Saute `n` octets.
    pub fn skip(&mut self, n: usize) -> Result<()> { self.read_bytes(n).map(|_| ()) }

    /// Lit un u8.
    pub fn read_u8(&mut self) -> Result<u8> { Ok(self.read_bytes(1)?[0]) }

    /// Lit un i8.
    pub fn read_i8(&mut self) -> Result<i8> { Ok(i8::from_be_bytes([self.read_u8()?])) }

    /// Lit un u16 BE.
    pub fn read_u16(&mut self) -> Result<u16> { Ok(BigEndian::read_u16(self.read_bytes(2)?)) }

    /// Lit un i16 BE.
    pub fn read_i16(&mut self) -> Result<i16> { Ok(BigEndian::read_i16(self.read_bytes(2)?)) }

    /// Lit un u32 BE.
    pub fn read_u32(&mut self) -> Result<u32> { Ok(BigEndian::read_u32(self.read_bytes(4)?)) }

    /// Lit un i32 BE.
    pub fn read_i32(&mut self) -> Result<i32> { Ok(BigEndian::read_i32(self.read_bytes(4)?)) }

    /// Lit un u64 BE.
    pub fn read_u64(&mut self) -> Result<u64> { Ok(BigEndian::read_u64(self.read_bytes(8)?)) }
}

/* ─────────────────────────── Prélude (reexports utiles) ─────────────────────────── */

/// Prélude pratique pour importer les types/funcs clés du crate.
pub mod prelude {
    /// Réexports utiles pour une importation rapide.
    pub use super::{
        bytecode::{disassemble, encode_int, FieldRef, Insn, Interpreter},
        simple_name, ByteReader, ByteWriter, ConstValue, Error, FrozenTable, Result, SymbolTable,
        CLASS_MAGIC, DEFAULT_CLASS_VERSION, DEFAULT_STYLEABLE_CLASS, DEFAULT_TYPE_GLOB,
    };
}

/* ─────────────────────────── Tests ─────────────────────────── */
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_reader_be() -> Result<()> {
        let mut w = ByteWriter::new();
        w.write_u16(0xBEEF);
        w.write_u32(CLASS_MAGIC);
        w.write_i32(-42);
        w.write_u8(0x80);
        assert_eq!(&w.as_slice()[..2], &[0xBE, 0xEF]);

        let mut r = ByteReader::new(w.as_slice());
        assert_eq!(r.read_u16()?, 0xBEEF);
        assert_eq!(r.read_u32()?, CLASS_MAGIC);
        assert_eq!(r.read_i32()?, -42);
        assert_eq!(r.read_i8()?, -128);
        assert_eq!(r.remaining(), 0);
        Ok(())
    }

    #[test]
    fn reader_reports_eof_offset() {
        let mut r = ByteReader::new(&[1, 2, 3]);
        r.skip(2).unwrap();
        match r.read_u16() {
            Err(Error::UnexpectedEof { needed, at }) => assert_eq!((needed, at), (2, 2)),
            other => panic!("expected EOF, got {other:?}"),
        }
    }

    #[test]
    fn simple_names() {
        assert_eq!(simple_name("com/example/R$attr"), "R$attr");
        assert_eq!(simple_name("R$styleable"), "R$styleable");
    }

    #[test]
    fn conflict_message_names_both_values() {
        let e = Error::Conflict {
            name: "R$string.app".into(),
            expected: ConstValue::Scalar(0x7f01_0001),
            actual: ConstValue::Scalar(0x7f01_0002),
        };
        assert_eq!(
            e.to_string(),
            "value of R$string.app mismatched: expected 0x7f010001 but was 0x7f010002"
        );
    }
}

//! rshrink-classfile — lecture et écriture de fichiers class JVM
//!
//! Format :
//! ```text
//! magic u4 (0xCAFEBABE) + minor u2 + major u2
//! constant_pool_count u2 + entries
//! access u2, this u2, super u2, interfaces (count u2 + u2*)
//! fields  (count u2 + field_info*)
//! methods (count u2 + method_info*)
//! attributes (count u2 + attribute_info*)
//! ```
//!
//! Seuls les attributs utiles au merge sont interprétés :
//! - `ConstantValue` sur les champs (valeurs `int`)
//! - `Code` sur les méthodes (octets + max_stack/max_locals)
//!
//! API :
//! - [`ClassFile::from_bytes`] / [`ClassFile::read_file`]
//! - [`ClassWriter`] pour produire une classe de champs statiques et un `<clinit>`
//! - [`code::decode`] / [`code::encode`] pour les instructions

#![deny(missing_docs)]

use std::{fs, path::Path};

use bitflags::bitflags;
use rshrink_core::{bytecode::max_stack, ByteReader, ByteWriter, Error, Insn, Result, CLASS_MAGIC};

/// Instruction codec.
pub mod code;
/// Constant pool.
pub mod pool;

pub use pool::{Constant, ConstantPool, PoolBuilder};

/// Nom du static initializer.
pub const CLINIT: &str = "<clinit>";
/// Descripteur de `<clinit>`.
pub const CLINIT_DESCRIPTOR: &str = "()V";
/// Superclasse par défaut.
pub const JAVA_LANG_OBJECT: &str = "java/lang/Object";

const ATTR_CODE: &str = "Code";
const ATTR_CONSTANT_VALUE: &str = "ConstantValue";

bitflags! {
    /// Access flags of classes, fields and methods (shared bit space).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u16 {
        /// `ACC_PUBLIC`
        const PUBLIC    = 0x0001;
        /// `ACC_PRIVATE`
        const PRIVATE   = 0x0002;
        /// `ACC_PROTECTED`
        const PROTECTED = 0x0004;
        /// `ACC_STATIC`
        const STATIC    = 0x0008;
        /// `ACC_FINAL`
        const FINAL     = 0x0010;
        /// `ACC_SUPER` (classes) / `ACC_SYNCHRONIZED` (methods)
        const SUPER     = 0x0020;
        /// `ACC_VOLATILE` / `ACC_BRIDGE`
        const VOLATILE  = 0x0040;
        /// `ACC_TRANSIENT` / `ACC_VARARGS`
        const TRANSIENT = 0x0080;
        /// `ACC_NATIVE`
        const NATIVE    = 0x0100;
        /// `ACC_INTERFACE`
        const INTERFACE = 0x0200;
        /// `ACC_ABSTRACT`
        const ABSTRACT  = 0x0400;
        /// `ACC_STRICT`
        const STRICT    = 0x0800;
        /// `ACC_SYNTHETIC`
        const SYNTHETIC = 0x1000;
        /// `ACC_ANNOTATION`
        const ANNOTATION = 0x2000;
        /// `ACC_ENUM`
        const ENUM      = 0x4000;
        /// `ACC_MODULE` / `ACC_MANDATED`
        const MODULE    = 0x8000;
    }
}

/// Champ déclaré.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Flags d'accès.
    pub access: AccessFlags,
    /// Nom.
    pub name: String,
    /// Descripteur (`I`, `[I`, ...).
    pub descriptor: String,
    /// Valeur de l'attribut `ConstantValue` si c'est un entier.
    pub int_constant: Option<i32>,
}

/// Corps d'une méthode (attribut `Code`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    /// Profondeur maximale de pile.
    pub max_stack: u16,
    /// Nombre de variables locales.
    pub max_locals: u16,
    /// Octets bruts.
    pub bytes: Vec<u8>,
}

/// Méthode déclarée.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    /// Flags d'accès.
    pub access: AccessFlags,
    /// Nom.
    pub name: String,
    /// Descripteur.
    pub descriptor: String,
    /// Absent pour les méthodes abstraites/natives.
    pub code: Option<Code>,
}

/// Classe décodée.
#[derive(Debug, Clone)]
pub struct ClassFile {
    /// Version mineure.
    pub minor_version: u16,
    /// Version majeure.
    pub major_version: u16,
    /// Pool de constantes.
    pub pool: ConstantPool,
    /// Flags d'accès de la classe.
    pub access: AccessFlags,
    /// Nom interne (`com/example/R$styleable`).
    pub this_class: String,
    /// Superclasse, absente pour `java/lang/Object`.
    pub super_class: Option<String>,
    /// Interfaces implémentées.
    pub interfaces: Vec<String>,
    /// Champs.
    pub fields: Vec<Field>,
    /// Méthodes.
    pub methods: Vec<Method>,
}

impl ClassFile {
    /// Décode une classe.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(data);
        let magic = r.read_u32()?;
        if magic != CLASS_MAGIC {
            return Err(Error::format(format!("bad class magic 0x{magic:08x}")));
        }
        let minor_version = r.read_u16()?;
        let major_version = r.read_u16()?;
        let pool = ConstantPool::read(&mut r)?;

        let access = AccessFlags::from_bits_retain(r.read_u16()?);
        let this_class = pool.class_name(r.read_u16()?)?.to_owned();
        let super_class = match r.read_u16()? {
            0 => None,
            ix => Some(pool.class_name(ix)?.to_owned()),
        };

        let n = r.read_u16()?;
        let mut interfaces = Vec::with_capacity(usize::from(n));
        for _ in 0..n {
            interfaces.push(pool.class_name(r.read_u16()?)?.to_owned());
        }

        let n = r.read_u16()?;
        let mut fields = Vec::with_capacity(usize::from(n));
        for _ in 0..n {
            fields.push(read_field(&mut r, &pool)?);
        }

        let n = r.read_u16()?;
        let mut methods = Vec::with_capacity(usize::from(n));
        for _ in 0..n {
            methods.push(read_method(&mut r, &pool)?);
        }

        // attributs de classe : ignorés
        skip_attributes(&mut r)?;

        #[cfg(feature = "tracing")]
        tracing::trace!(class = %this_class, fields = fields.len(), methods = methods.len(), "class decoded");

        Ok(Self { minor_version, major_version, pool, access, this_class, super_class, interfaces, fields, methods })
    }

    /// Lit et décode un fichier `.class`.
    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Méthode par nom et descripteur.
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name && m.descriptor == descriptor)
    }

    /// Le static initializer, s'il existe.
    pub fn clinit(&self) -> Option<&Method> { self.method(CLINIT, CLINIT_DESCRIPTOR) }

    /// Instructions d'une méthode (vide si elle n'a pas de corps).
    pub fn decode_code(&self, method: &Method) -> Result<Vec<Insn>> {
        match &method.code {
            Some(code) => code::decode(&code.bytes, &self.pool),
            None => Ok(Vec::new()),
        }
    }

    /// Champ par nom.
    pub fn field(&self, name: &str) -> Option<&Field> { self.fields.iter().find(|f| f.name == name) }
}

fn read_field(r: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<Field> {
    let access = AccessFlags::from_bits_retain(r.read_u16()?);
    let name = pool.utf8(r.read_u16()?)?.to_owned();
    let descriptor = pool.utf8(r.read_u16()?)?.to_owned();
    let mut int_constant = None;
    let n = r.read_u16()?;
    for _ in 0..n {
        let attr = pool.utf8(r.read_u16()?)?;
        let len = r.read_u32()? as usize;
        let body = r.read_bytes(len)?;
        if attr == ATTR_CONSTANT_VALUE {
            let ix = ByteReader::new(body).read_u16()?;
            int_constant = pool.integer(ix)?;
        }
    }
    Ok(Field { access, name, descriptor, int_constant })
}

fn read_method(r: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<Method> {
    let access = AccessFlags::from_bits_retain(r.read_u16()?);
    let name = pool.utf8(r.read_u16()?)?.to_owned();
    let descriptor = pool.utf8(r.read_u16()?)?.to_owned();
    let mut code = None;
    let n = r.read_u16()?;
    for _ in 0..n {
        let attr = pool.utf8(r.read_u16()?)?;
        let len = r.read_u32()? as usize;
        let body = r.read_bytes(len)?;
        if attr == ATTR_CODE {
            code = Some(read_code(body)?);
        }
    }
    Ok(Method { access, name, descriptor, code })
}

fn read_code(body: &[u8]) -> Result<Code> {
    let mut r = ByteReader::new(body);
    let max_stack = r.read_u16()?;
    let max_locals = r.read_u16()?;
    let len = r.read_u32()? as usize;
    let bytes = r.read_bytes(len)?.to_vec();
    // exception table + attributs imbriqués : non utilisés
    let handlers = r.read_u16()?;
    r.skip(usize::from(handlers) * 8)?;
    skip_attributes(&mut r)?;
    Ok(Code { max_stack, max_locals, bytes })
}

fn skip_attributes(r: &mut ByteReader<'_>) -> Result<()> {
    let n = r.read_u16()?;
    for _ in 0..n {
        r.skip(2)?;
        let len = r.read_u32()? as usize;
        r.skip(len)?;
    }
    Ok(())
}

/* ─────────────────────────── Écriture ─────────────────────────── */

#[derive(Debug, Clone)]
struct PendingField {
    access: AccessFlags,
    name: u16,
    descriptor: u16,
    constant: Option<u16>,
}

#[derive(Debug, Clone)]
struct PendingMethod {
    access: AccessFlags,
    name: u16,
    descriptor: u16,
    max_stack: u16,
    max_locals: u16,
    code: Vec<u8>,
}

/// Builder d'une classe sans interface ni attribut de classe.
///
/// Les entrées du pool sont créées dans l'ordre des appels, ce qui rend la
/// sortie identique pour des appels identiques.
#[derive(Debug, Clone)]
pub struct ClassWriter {
    pool: PoolBuilder,
    major_version: u16,
    access: AccessFlags,
    this_class: u16,
    super_class: u16,
    fields: Vec<PendingField>,
    methods: Vec<PendingMethod>,
    code_attr: Option<u16>,
    const_attr: Option<u16>,
}

impl ClassWriter {
    /// Nouvelle classe `name` (nom interne) héritant de `super_name`.
    pub fn new(name: &str, super_name: &str, access: AccessFlags, major_version: u16) -> Result<Self> {
        let mut pool = PoolBuilder::new();
        let this_class = pool.class(name)?;
        let super_class = pool.class(super_name)?;
        Ok(Self {
            pool,
            major_version,
            access,
            this_class,
            super_class,
            fields: Vec::new(),
            methods: Vec::new(),
            code_attr: None,
            const_attr: None,
        })
    }

    /// Ajoute un champ, avec un `ConstantValue` entier optionnel.
    pub fn field(&mut self, access: AccessFlags, name: &str, descriptor: &str, constant: Option<i32>) -> Result<&mut Self> {
        let name = self.pool.utf8(name)?;
        let descriptor = self.pool.utf8(descriptor)?;
        let constant = match constant {
            Some(v) => {
                self.const_attr = Some(self.pool.utf8(ATTR_CONSTANT_VALUE)?);
                Some(self.pool.integer(v)?)
            }
            None => None,
        };
        self.fields.push(PendingField { access, name, descriptor, constant });
        Ok(self)
    }

    /// Ajoute une méthode dont le corps est `insns`; `max_stack` est calculé.
    pub fn method(
        &mut self,
        access: AccessFlags,
        name: &str,
        descriptor: &str,
        insns: &[Insn],
        max_locals: u16,
    ) -> Result<&mut Self> {
        let max_stack = max_stack(insns)?;
        let code = code::encode(insns, &mut self.pool)?;
        self.raw_method(access, name, descriptor, code, max_stack, max_locals)
    }

    /// Ajoute une méthode à partir d'octets déjà encodés.
    ///
    /// Les index du pool référencés par `code` doivent venir de [`Self::pool_mut`].
    pub fn raw_method(
        &mut self,
        access: AccessFlags,
        name: &str,
        descriptor: &str,
        code: Vec<u8>,
        max_stack: u16,
        max_locals: u16,
    ) -> Result<&mut Self> {
        let name = self.pool.utf8(name)?;
        let descriptor = self.pool.utf8(descriptor)?;
        self.code_attr = Some(self.pool.utf8(ATTR_CODE)?);
        if code.len() > usize::from(u16::MAX) {
            return Err(Error::malformed(format!("method body of {} bytes exceeds 65535", code.len())));
        }
        self.methods.push(PendingMethod { access, name, descriptor, max_stack, max_locals, code });
        Ok(self)
    }

    /// Pool en construction.
    pub fn pool_mut(&mut self) -> &mut PoolBuilder { &mut self.pool }

    /// Sérialise la classe.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut w = ByteWriter::new();
        w.write_u32(CLASS_MAGIC);
        w.write_u16(0);
        w.write_u16(self.major_version);
        self.pool.write(&mut w)?;

        w.write_u16(self.access.bits());
        w.write_u16(self.this_class);
        w.write_u16(self.super_class);
        w.write_u16(0); // interfaces

        w.write_u16(self.fields.len() as u16);
        for f in &self.fields {
            w.write_u16(f.access.bits());
            w.write_u16(f.name);
            w.write_u16(f.descriptor);
            match (f.constant, self.const_attr) {
                (Some(ix), Some(attr)) => {
                    w.write_u16(1);
                    w.write_u16(attr);
                    w.write_u32(2);
                    w.write_u16(ix);
                }
                _ => w.write_u16(0),
            }
        }

        w.write_u16(self.methods.len() as u16);
        let code_attr = self.code_attr.unwrap_or_default();
        for m in &self.methods {
            w.write_u16(m.access.bits());
            w.write_u16(m.name);
            w.write_u16(m.descriptor);
            w.write_u16(1);
            w.write_u16(code_attr);
            // max_stack + max_locals + code_length + code + handlers + attributes
            w.write_u32(2 + 2 + 4 + m.code.len() as u32 + 2 + 2);
            w.write_u16(m.max_stack);
            w.write_u16(m.max_locals);
            w.write_u32(m.code.len() as u32);
            w.write_bytes(&m.code);
            w.write_u16(0);
            w.write_u16(0);
        }

        w.write_u16(0); // attributs de classe
        Ok(w.into_vec())
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */

//! Sélection des classes de ressources par nom simple (`R$*` par défaut).

use ignore::overrides::{Override, OverrideBuilder};
use rshrink_core::{Error, Result, DEFAULT_TYPE_GLOB};

/// Glob appliqué au nom simple d'une classe (`R$styleable`, sans paquet).
#[derive(Debug, Clone)]
pub struct TypeFilter {
    glob: String,
    matcher: Override,
}

impl TypeFilter {
    /// Compile `glob`; une syntaxe invalide est une erreur de configuration.
    pub fn new(glob: &str) -> Result<Self> {
        let mut builder = OverrideBuilder::new("/");
        builder
            .add(glob)
            .map_err(|e| Error::Config(format!("invalid type filter `{glob}`: {e}")))?;
        let matcher = builder
            .build()
            .map_err(|e| Error::Config(format!("invalid type filter `{glob}`: {e}")))?;
        Ok(Self { glob: glob.to_owned(), matcher })
    }

    /// Filtre `R$*`.
    pub fn resource_classes() -> Result<Self> { Self::new(DEFAULT_TYPE_GLOB) }

    /// Glob source.
    pub fn glob(&self) -> &str { &self.glob }

    /// Vrai si le nom simple correspond.
    pub fn matches(&self, simple_name: &str) -> bool {
        self.matcher.matched(simple_name, false).is_whitelist()
    }

    /// Vrai si `file_name` est `<nom simple>.class` avec un nom accepté.
    pub fn matches_class_file(&self, file_name: &str) -> bool {
        file_name.strip_suffix(".class").is_some_and(|stem| self.matches(stem))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_glob_selects_inner_resource_classes() {
        let f = TypeFilter::resource_classes().unwrap();
        assert!(f.matches("R$styleable"));
        assert!(f.matches("R$attr"));
        assert!(!f.matches("R"));
        assert!(!f.matches("BuildConfig"));
        assert!(f.matches_class_file("R$string.class"));
        assert!(!f.matches_class_file("R$string.java"));
    }

    #[test]
    fn custom_glob() {
        let f = TypeFilter::new("R$styleable").unwrap();
        assert!(f.matches("R$styleable"));
        assert!(!f.matches("R$attr"));
        assert_eq!(f.glob(), "R$styleable");
    }

    #[test]
    fn invalid_glob_is_a_config_error() {
        assert!(matches!(TypeFilter::new("R$[a-"), Err(Error::Config(_))));
    }
}

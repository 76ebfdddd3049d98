//! # Language Registry
//!
//! Maps `DW_AT_language` codes to the factory that understands them.
//!
//! The process-wide registry covers C, C++ and Rust and is built once on
//! first use. Embedders that need other languages build their own:
//!
//! ```rust
//! use gimli::constants;
//! use wadi_core::languages::{CFactory, LanguageRegistry};
//!
//! let registry = LanguageRegistry::builder()
//!     .register(constants::DW_LANG_C11, CFactory)
//!     .build();
//! assert!(registry.get(constants::DW_LANG_C11).is_some());
//! assert!(registry.get(constants::DW_LANG_Rust).is_none());
//! ```

pub mod c;
pub mod cpp;
pub mod rust;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use gimli::{constants, DwLang};
use once_cell::sync::Lazy;

pub use self::c::CFactory;
pub use self::cpp::CppFactory;
pub use self::rust::RustFactory;
use crate::objects::DebugObjectFactory;

static GLOBAL: Lazy<Arc<LanguageRegistry>> = Lazy::new(|| Arc::new(LanguageRegistry::builder().with_defaults().build()));

/// Immutable language → factory table.
#[derive(Clone, Default)]
pub struct LanguageRegistry
{
    factories: HashMap<DwLang, Arc<dyn DebugObjectFactory>>,
}

impl LanguageRegistry
{
    /// Shared registry with the built-in languages.
    #[must_use]
    pub fn global() -> Arc<Self>
    {
        Arc::clone(&GLOBAL)
    }

    #[must_use]
    pub fn builder() -> LanguageRegistryBuilder
    {
        LanguageRegistryBuilder::default()
    }

    #[must_use]
    pub fn get(&self, language: DwLang) -> Option<Arc<dyn DebugObjectFactory>>
    {
        self.factories.get(&language).cloned()
    }

    /// Registered language codes, ascending.
    #[must_use]
    pub fn languages(&self) -> Vec<DwLang>
    {
        let mut languages: Vec<_> = self.factories.keys().copied().collect();
        languages.sort();
        languages
    }
}

impl fmt::Debug for LanguageRegistry
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("LanguageRegistry")
            .field("languages", &self.languages())
            .finish()
    }
}

/// Collects factories before freezing them into a [`LanguageRegistry`].
#[derive(Default)]
pub struct LanguageRegistryBuilder
{
    factories: HashMap<DwLang, Arc<dyn DebugObjectFactory>>,
}

impl LanguageRegistryBuilder
{
    /// Register the built-in C, C++ and Rust factories.
    #[must_use]
    pub fn with_defaults(self) -> Self
    {
        let c: Arc<dyn DebugObjectFactory> = Arc::new(CFactory);
        let cpp: Arc<dyn DebugObjectFactory> = Arc::new(CppFactory);
        let rust: Arc<dyn DebugObjectFactory> = Arc::new(RustFactory);

        let mut builder = self;
        for language in [
            constants::DW_LANG_C89,
            constants::DW_LANG_C,
            constants::DW_LANG_C99,
            constants::DW_LANG_C11,
        ] {
            builder = builder.register_shared(language, Arc::clone(&c));
        }
        for language in [
            constants::DW_LANG_C_plus_plus,
            constants::DW_LANG_C_plus_plus_03,
            constants::DW_LANG_C_plus_plus_11,
            constants::DW_LANG_C_plus_plus_14,
        ] {
            builder = builder.register_shared(language, Arc::clone(&cpp));
        }
        builder.register_shared(constants::DW_LANG_Rust, rust)
    }

    /// Map `language` to `factory`, replacing any earlier registration.
    #[must_use]
    pub fn register<F>(self, language: DwLang, factory: F) -> Self
    where
        F: DebugObjectFactory + 'static,
    {
        self.register_shared(language, Arc::new(factory))
    }

    #[must_use]
    pub fn register_shared(mut self, language: DwLang, factory: Arc<dyn DebugObjectFactory>) -> Self
    {
        self.factories.insert(language, factory);
        self
    }

    #[must_use]
    pub fn build(self) -> LanguageRegistry
    {
        LanguageRegistry {
            factories: self.factories,
        }
    }
}

impl fmt::Debug for LanguageRegistryBuilder
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("LanguageRegistryBuilder")
            .field("languages", &self.factories.len())
            .finish()
    }
}

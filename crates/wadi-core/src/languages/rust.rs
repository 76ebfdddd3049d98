//! Rust.

use rustc_demangle::try_demangle;

use crate::objects::DebugObjectFactory;

/// Factory for Rust units.
///
/// Linkage names in either the legacy or the v0 scheme are demangled with
/// `rustc-demangle`; the trailing hash is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustFactory;

impl DebugObjectFactory for RustFactory
{
    fn language_name(&self) -> &'static str
    {
        "Rust"
    }

    fn demangle(&self, linkage_name: &str) -> Option<String>
    {
        try_demangle(linkage_name).ok().map(|demangled| format!("{demangled:#}"))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_demangles_legacy_symbols_without_hash()
    {
        let demangled = RustFactory.demangle("_ZN4core3fmt5write17h0123456789abcdefE");
        assert_eq!(demangled.as_deref(), Some("core::fmt::write"));
    }

    #[test]
    fn test_plain_names_do_not_demangle()
    {
        assert_eq!(RustFactory.demangle("main"), None);
    }
}

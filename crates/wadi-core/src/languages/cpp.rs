//! C++.

use crate::objects::DebugObjectFactory;

/// Factory for the C++ family.
///
/// Names are qualified with `::` from enclosing namespaces and classes.
/// Itanium linkage names are kept as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct CppFactory;

impl DebugObjectFactory for CppFactory
{
    fn language_name(&self) -> &'static str
    {
        "C++"
    }
}

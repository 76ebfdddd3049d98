//! C.

use crate::objects::DebugObjectFactory;

/// Factory for the C family. C has no namespaces, so names are never qualified.
#[derive(Debug, Clone, Copy, Default)]
pub struct CFactory;

impl DebugObjectFactory for CFactory
{
    fn language_name(&self) -> &'static str
    {
        "C"
    }

    fn namespace_separator(&self) -> &'static str
    {
        ""
    }
}

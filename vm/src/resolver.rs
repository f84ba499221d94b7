use std::collections::HashMap;

use crate::pool::HostFunction;

/// Maps import names to host functions. Consulted once per import while
/// loading.
pub trait CallResolver {
    fn resolve(&self, name: &str) -> Option<HostFunction>;
}

/// Resolves nothing; every import stays unresolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResolver;

impl CallResolver for NullResolver {
    fn resolve(&self, _name: &str) -> Option<HostFunction> {
        None
    }
}

impl CallResolver for HashMap<String, HostFunction> {
    fn resolve(&self, name: &str) -> Option<HostFunction> {
        self.get(name).cloned()
    }
}

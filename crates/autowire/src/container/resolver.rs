use crate::container::descriptor::Type;
use crate::errors::CoreError;

/// Types whose constructors are currently running, in call order.
///
/// Shared by nested resolutions on the same thread, including lazies and
/// factories forced from inside a constructor, so a type already on the
/// path is a cycle.
#[derive(Debug, Clone, Default)]
pub struct ResolutionPath {
    types: Vec<Type>,
}

impl ResolutionPath {
    /// Create a new resolution path
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type to the path, failing if it is already being constructed
    pub fn push(&mut self, ty: Type) -> Result<(), CoreError> {
        if self.contains(&ty) {
            let mut chain = vec![ty.name().to_string()];
            chain.extend(self.chain());
            return Err(CoreError::circular_dependency(ty.name(), chain));
        }
        self.types.push(ty);
        Ok(())
    }

    /// Remove the most recent occurrence of a type
    pub fn pop(&mut self, ty: &Type) -> Option<Type> {
        let position = self.types.iter().rposition(|entry| entry == ty)?;
        Some(self.types.remove(position))
    }

    pub fn contains(&self, ty: &Type) -> bool {
        self.types.contains(ty)
    }

    /// Type names, most recent first.
    pub fn chain(&self) -> Vec<String> {
        self.types.iter().rev().map(|ty| ty.name().to_string()).collect()
    }

    /// Get the path as a string for log messages
    pub fn path_string(&self) -> String {
        self.types
            .iter()
            .map(Type::name)
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    pub fn depth(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn clear(&mut self) {
        self.types.clear();
    }
}

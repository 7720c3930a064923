/// Create/update/delete batch computed for one resource kind in one pass.
///
/// All three lists may be empty, which makes the pass a no-op for that kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch<T> {
    pub to_create: Vec<T>,
    pub to_update: Vec<T>,
    pub to_delete: Vec<T>,
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Self { to_create: Vec::new(), to_update: Vec::new(), to_delete: Vec::new() }
    }
}

impl<T> Patch<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(objects: Vec<T>) -> Self {
        Self { to_create: objects, ..Self::default() }
    }

    pub fn update(objects: Vec<T>) -> Self {
        Self { to_update: objects, ..Self::default() }
    }

    pub fn delete(objects: Vec<T>) -> Self {
        Self { to_delete: objects, ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }

    /// Append the other patch's lists to this one.
    pub fn merge(mut self, other: Patch<T>) -> Self {
        self.to_create.extend(other.to_create);
        self.to_update.extend(other.to_update);
        self.to_delete.extend(other.to_delete);
        self
    }
}

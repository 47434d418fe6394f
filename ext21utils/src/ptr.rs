//!
//! # Shared-Pointer Types
//!

// Std-lib
use std::hash::{Hash, Hasher};
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, RwLock};

// Crates.io
use by_address::ByAddress;

///
/// # Ptr
///
/// Thread-safe, reference-counted shared pointer.
/// The primary means of sharing cell-definitions between a library,
/// the instances which place them, and the extraction passes which read them.
///
/// Access to the underlying data runs through [RwLock]'s `read()` and `write()`,
/// after which attribute access is forwarded through [Deref]:
///
/// ```text
/// let def = ptr.read()?;
/// let name = &def.name;
/// def.some_method();
/// ```
///
/// Passing the borrowed data onward often requires a ref-and-deref:
///
/// ```text
/// extract_cell(&*ptr.read()?);
/// ```
///
/// Comparison and hashing operate *by address* via [ByAddress],
/// never by content. Two separately-created pointers to equal data are unequal,
/// and clones of the same pointer are equal.
/// This is what makes [Ptr]s usable as visited-set members while walking
/// a cell hierarchy in which many nodes are shared.
///
#[derive(Debug, Default)]
pub struct Ptr<T: ?Sized>(ByAddress<Arc<RwLock<T>>>);

impl<T> Ptr<T> {
    /// Pointer Constructor
    pub fn new(i: T) -> Self {
        Self(ByAddress(Arc::new(RwLock::new(i))))
    }
}
impl<T> From<T> for Ptr<T> {
    fn from(t: T) -> Self {
        Self::new(t)
    }
}
impl<T> Deref for Ptr<T> {
    type Target = ByAddress<Arc<RwLock<T>>>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl<T> DerefMut for Ptr<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
// The [Deref] implementation interferes with `derive`-ing these few traits,
// so they are implemented by hand, forwarding to [ByAddress].
impl<T> Clone for Ptr<T> {
    fn clone(&self) -> Self {
        Self(ByAddress::clone(&self.0))
    }
}
impl<T> PartialEq for Ptr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq(&other.0)
    }
}
impl<T> Eq for Ptr<T> {}
impl<T> Hash for Ptr<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

///
/// # Pointer List
///
/// Newtype wrapper over a `Vec<Ptr<T>>`, with an insertion interface
/// that hands back a referable [Ptr] for each added element.
/// All other methods pass through to the underlying [Vec]
/// via [Deref] and [DerefMut].
///
#[derive(Debug, Clone)]
pub struct PtrList<T: ?Sized>(Vec<Ptr<T>>);

impl<T> PtrList<T> {
    /// Create a new and empty [PtrList]. Also available via [Default].
    pub fn new() -> Self {
        Self(Vec::new())
    }
    /// Create a [PtrList] from owned `T`s.
    pub fn from_owned(vals: Vec<T>) -> Self {
        let ptrs = vals.into_iter().map(|v| Ptr::new(v)).collect();
        Self(ptrs)
    }
    /// Add a `T`-convertible element.
    /// Returns a cloned [Ptr] to it, which can be used to access it thereafter.
    pub fn add(&mut self, t: impl Into<T>) -> Ptr<T> {
        let t = Ptr::new(t.into());
        self.0.push(t.clone());
        t
    }
}
impl<T> Default for PtrList<T> {
    fn default() -> Self {
        Self::new()
    }
}
// All other dereferences, mostly method calls, are forwarded to the underlying [Vec]
impl<T> Deref for PtrList<T> {
    type Target = Vec<Ptr<T>>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl<T> DerefMut for PtrList<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
/// Create from a vector of `Ptr<T>` elements.
impl<T> From<Vec<Ptr<T>>> for PtrList<T> {
    fn from(v: Vec<Ptr<T>>) -> Self {
        Self(v)
    }
}
/// Create from a vector of owned `T` elements.
impl<T> From<Vec<T>> for PtrList<T> {
    fn from(v: Vec<T>) -> Self {
        Self::from_owned(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ptr_by_address() {
        // Same content, different allocations: unequal
        let p1 = Ptr::new(11);
        let p2 = Ptr::new(11);
        assert_ne!(p1, p2);

        // Clones of the same allocation: equal
        let p3 = p1.clone();
        assert_eq!(p3, p1);
        assert_ne!(p3, p2);
    }
    #[test]
    fn test_ptr_list() {
        let mut list = PtrList::<&'static str>::new();

        let p = list.add("top");
        assert_eq!(list.len(), 1);
        assert_eq!(*p.read().unwrap(), "top");

        list.push(Ptr::new("sub"));
        assert_eq!(list.len(), 2);
        assert_eq!(*list[1].read().unwrap(), "sub");
    }
}

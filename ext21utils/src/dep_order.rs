//!
//! # Dependency-Ordering Trait and Helpers
//!
//! Cell libraries are graph-shaped: definitions instantiate other definitions,
//! and passes which write one output file per definition must visit children
//! before the parents that place them.
//! Definitions are commonly stored unordered;
//! the [DepOrder] trait produces a dependency-ordered visitation
//! (and detects instantiation cycles, which are invalid in any layout).
//!
//! [DepOrder] requires a single user-defined method `process`, handling one `Item` -
//! commonly a pointer to a graph node such as a cell definition.
//! `process` iterates over `item`'s direct dependencies
//! (for a cell definition, the definitions its instances place)
//! and passes each to `orderer.push`.
//! The `push` method, implemented on helper-type [DepOrderer],
//! recursively traverses dependencies, calling `process` on each,
//! and returns the implementation-defined `Error` upon detecting a cycle.
//!
//! Typical usage:
//!
//! ```text
//! struct DefOrder;
//! impl DepOrder for DefOrder {
//!     type Item = Ptr<CellDef>;
//!     type Error = ExtError;
//!
//!     fn process(item: &Self::Item, orderer: &mut DepOrderer<Self>) -> Result<(), Self::Error> {
//!         for child in item.read()?.uses.iter() {
//!             orderer.push(&child.cell)?;
//!         }
//!         Ok(())
//!     }
//!     fn fail() -> Result<(), Self::Error> {
//!         Err(ExtError::msg("Cyclic cell hierarchy"))
//!     }
//! }
//! ```
//!
//! The default-implemented [DepOrder::order] then returns a child-first vector:
//!
//! ```text
//! for def in DefOrder::order(&[root])? { /* extract `def` */ }
//! ```
//!

// Std-lib
use std::collections::HashSet;
use std::marker::PhantomData;

///
/// # Dependency-Ordering Trait
///
pub trait DepOrder: Sized {
    // Associated types
    /// Item Type. Typically pointers or keys to the nodes in the dependency graph.
    type Item: Clone + Eq + std::hash::Hash;
    /// Error Type
    type Error;

    // Default Methods
    /// Dependency-order all entries in slice `items`
    fn order(items: &[Self::Item]) -> Result<Vec<Self::Item>, Self::Error> {
        DepOrderer::<Self>::order(items)
    }

    // Required Methods
    /// Process a single `item`, pushing each of its direct dependencies
    fn process(item: &Self::Item, orderer: &mut DepOrderer<Self>) -> Result<(), Self::Error>;
    /// Failure-handler. Return our `Error` type.
    fn fail() -> Result<(), Self::Error>;
}

/// # Dependency Order Helper
/// Should not be used directly.
/// Public solely for use in the call-signature of [DepOrder::process].
pub struct DepOrderer<P: DepOrder> {
    /// Ordered, completed items
    stack: Vec<P::Item>,
    /// Hash-set of completed items, for quick membership tests
    seen: HashSet<P::Item>,
    /// Hash-set of pending items, for cycle detection
    pending: HashSet<P::Item>,
    // Item-processor phantom reference
    p: PhantomData<P>,
}
impl<P: DepOrder> DepOrderer<P> {
    /// Dependency-order all entries in slice `items`
    pub fn order(items: &[P::Item]) -> Result<Vec<P::Item>, P::Error> {
        let len = items.len();
        let mut this = Self {
            stack: Vec::with_capacity(len),
            seen: HashSet::with_capacity(len),
            pending: HashSet::new(),
            p: PhantomData,
        };
        for item in items.iter() {
            this.push(item)?;
        }
        Ok(this.stack)
    }
    /// Push `item`'s dependencies, and then itself, onto the stack
    pub fn push(&mut self, item: &P::Item) -> Result<(), P::Error> {
        // Depth-first search, dependencies before dependents
        if !self.seen.contains(item) {
            // A pending `item`, i.e. an open recursive stack-frame, indicates a cycle.
            if self.pending.contains(item) {
                return P::fail();
            }
            self.pending.insert(item.clone());
            // Process the Item, dependencies first
            P::process(item, self)?;
            // Check that `item` hasn't (somehow) been removed from the pending-set
            if !self.pending.remove(item) {
                return P::fail();
            }
            // And insert the Item itself
            self.seen.insert(item.clone());
            self.stack.push(item.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tiny diamond-shaped graph: ids map to lists of dependency-ids
    struct DiamondOrder;
    impl DepOrder for DiamondOrder {
        type Item = usize;
        type Error = ();

        fn process(item: &usize, orderer: &mut DepOrderer<Self>) -> Result<(), ()> {
            // 0 depends on 1 and 2, which each depend on 3
            let deps: &[usize] = match item {
                0 => &[1, 2],
                1 | 2 => &[3],
                _ => &[],
            };
            for d in deps {
                orderer.push(d)?;
            }
            Ok(())
        }
        fn fail() -> Result<(), ()> {
            Err(())
        }
    }

    #[test]
    fn test_diamond() {
        let order = DiamondOrder::order(&[0]).unwrap();
        assert_eq!(order[0], 3);
        assert_eq!(order[3], 0);
        assert_eq!(order.len(), 4);
    }
}

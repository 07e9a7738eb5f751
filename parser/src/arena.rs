//! Node storage for one parse.
//!
//! Every AST node lives in a per-kind pool of a single [`Arena`] and is referred to by a
//! typed [`Id`]. Nothing is freed individually: the arena is dropped together with the
//! [`Program`](crate::ast::Program) that owns it.

use std::{
    fmt::Debug,
    hash::Hash,
    marker::PhantomData,
    mem,
    ops::Index,
};

use thiserror::Error;

use crate::ast::{
    BinaryExpression, Expression, FunctionDeclaration, IfPredicate, Scope, Statement, Term,
};

/// Matches the fixed region the compiler has always reserved for its nodes.
pub const DEFAULT_CAPACITY_BYTES: usize = 4 * 1024 * 1024;

#[derive(Error, Debug, Eq, PartialEq)]
pub enum ArenaError {
    #[error("The node arena is exhausted ({used} of {capacity} bytes in use, {requested} more requested)")]
    Exhausted {
        used: usize,
        capacity: usize,
        requested: usize,
    },
}

pub struct Id<T> {
    raw: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    fn new(raw: u32) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    pub fn index(self) -> usize {
        self.raw as usize
    }
}

// Derives would put bounds on T.
impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> Debug for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = std::any::type_name::<T>();
        let short = name.rsplit("::").next().unwrap_or(name);
        write!(f, "Id<{}>({})", short, self.raw)
    }
}

/// A node kind that has its own pool inside the [`Arena`].
pub trait Node: Sized {
    fn pool(arena: &Arena) -> &Vec<Self>;
    fn pool_mut(arena: &mut Arena) -> &mut Vec<Self>;
}

macro_rules! arena_node {
    ($($ty:ty => $field:ident),* $(,)?) => {
        /// Owns every node produced by one parse.
        #[derive(Debug)]
        pub struct Arena {
            used_bytes: usize,
            capacity_bytes: usize,
            $($field: Vec<$ty>,)*
        }

        impl Arena {
            pub fn with_capacity_bytes(capacity_bytes: usize) -> Self {
                Self {
                    used_bytes: 0,
                    capacity_bytes,
                    $($field: Vec::new(),)*
                }
            }

            /// Number of nodes allocated so far, over all kinds.
            pub fn len(&self) -> usize {
                0 $(+ self.$field.len())*
            }
        }

        $(
            impl Node for $ty {
                fn pool(arena: &Arena) -> &Vec<Self> {
                    &arena.$field
                }

                fn pool_mut(arena: &mut Arena) -> &mut Vec<Self> {
                    &mut arena.$field
                }
            }
        )*
    };
}

arena_node! {
    Term => terms,
    BinaryExpression => binary_expressions,
    Expression => expressions,
    Statement => statements,
    Scope => scopes,
    IfPredicate => predicates,
    FunctionDeclaration => functions,
}

impl Default for Arena {
    fn default() -> Self {
        Self::with_capacity_bytes(DEFAULT_CAPACITY_BYTES)
    }
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc<T: Node>(&mut self, node: T) -> Result<Id<T>, ArenaError> {
        let requested = mem::size_of::<T>();
        if self.used_bytes + requested > self.capacity_bytes {
            return Err(ArenaError::Exhausted {
                used: self.used_bytes,
                capacity: self.capacity_bytes,
                requested,
            });
        }

        let pool = T::pool_mut(self);
        let id = Id::new(pool.len() as u32);
        pool.push(node);
        self.used_bytes += requested;

        Ok(id)
    }

    pub fn get<T: Node>(&self, id: Id<T>) -> &T {
        &T::pool(self)[id.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }
}

impl<T: Node> Index<Id<T>> for Arena {
    type Output = T;

    fn index(&self, id: Id<T>) -> &Self::Output {
        self.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_index() {
        let mut arena = Arena::new();

        let first = arena.alloc(Term::IntLiteral(1)).unwrap();
        let second = arena.alloc(Term::Identifier("a".to_owned())).unwrap();
        let expr = arena.alloc(Expression::Term(second)).unwrap();

        assert_ne!(first, second);
        assert_eq!(arena[first], Term::IntLiteral(1));
        assert_eq!(arena[second], Term::Identifier("a".to_owned()));
        assert_eq!(arena[expr], Expression::Term(second));
        assert_eq!(arena.len(), 3);
        assert_eq!(
            arena.used_bytes(),
            2 * mem::size_of::<Term>() + mem::size_of::<Expression>()
        );
    }

    #[test]
    fn test_pools_are_separate() {
        let mut arena = Arena::new();

        let term = arena.alloc(Term::IntLiteral(7)).unwrap();
        let scope = arena.alloc(Scope(vec![])).unwrap();

        // Both are the first node of their own kind.
        assert_eq!(term.index(), 0);
        assert_eq!(scope.index(), 0);
    }

    #[test]
    fn test_exhaustion() {
        let mut arena = Arena::with_capacity_bytes(mem::size_of::<Term>());

        arena.alloc(Term::IntLiteral(1)).unwrap();

        assert_eq!(
            arena.alloc(Term::IntLiteral(2)),
            Err(ArenaError::Exhausted {
                used: mem::size_of::<Term>(),
                capacity: mem::size_of::<Term>(),
                requested: mem::size_of::<Term>(),
            })
        );
    }
}

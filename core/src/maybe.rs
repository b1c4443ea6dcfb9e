//! `Optional[T]`: an explicit present-or-absent carrier (§3.1, C1).
//!
//! A sum type, not a sentinel `None`/empty-vec, so "present but empty bytes" stays distinct
//! from "absent" (§9, "Polymorphism over a capability set").

/// An explicitly present-or-absent value. `Absent` is never conflated with `Some(empty)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Maybe<T> {
    Some(T),
    Absent,
}

impl<T> Maybe<T> {
    pub fn is_some(&self) -> bool {
        matches!(self, Maybe::Some(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Maybe::Absent)
    }

    pub fn as_ref(&self) -> Maybe<&T> {
        match self {
            Maybe::Some(v) => Maybe::Some(v),
            Maybe::Absent => Maybe::Absent,
        }
    }

    pub fn as_deref(&self) -> Option<&<T as core::ops::Deref>::Target>
    where
        T: core::ops::Deref,
    {
        match self {
            Maybe::Some(v) => Some(v),
            Maybe::Absent => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Maybe::Some(v) => Some(v),
            Maybe::Absent => None,
        }
    }
}

impl<T> From<Option<T>> for Maybe<T> {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => Maybe::Some(v),
            None => Maybe::Absent,
        }
    }
}

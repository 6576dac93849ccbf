//! Reference (spec.md §3, §4.4, §4.9): a path string resolved once, after
//! load, against the document's `assetData` root.
//!
//! Design note: the original C++ binds a raw pointer into the tree. Per
//! spec.md §9 ("Cyclic graphs… store Reference's resolved pointer as a
//! non-owning handle or as an index into a flat property table"), this
//! implementation keeps the "handle" as the path itself: resolution
//! (spec.md §4.9) doesn't cache a pointer, it just records whether the path
//! was found at resolution time. Readers re-walk the path through
//! [`crate::element::Element::get_from_path`] on demand — cheap, since
//! paths are shallow, and it sidesteps aliasing a `Property` tree that Rust
//! ownership would otherwise make awkward to borrow from two places at
//! once.

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reference {
    path: String,
    resolved: bool,
}

impl Reference {
    pub fn new(path: impl Into<String>) -> Self {
        Reference {
            path: path.into(),
            resolved: false,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Mark this reference resolved or unresolved. Called by the
    /// resolution pass (spec.md §4.9); `resolved` reflects whether
    /// `get_from_path(path)` found a target, not whether the path is
    /// syntactically valid.
    pub fn set_resolved(&mut self, resolved: bool) {
        self.resolved = resolved;
    }
}

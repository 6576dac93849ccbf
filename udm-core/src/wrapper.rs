//! Property wrappers (spec.md §4.5, C5): non-owning, path-addressable
//! handles that can lazily materialize a path that doesn't exist yet.
//!
//! Same non-pointer design as [`crate::reference::Reference`]: rather than
//! a `(Property*, array_index)` pair bound once and cached, a wrapper here
//! is just the breadcrumb of keys/indices accumulated by `[...]`
//! composition. Every operation re-walks that breadcrumb against a caller
//! supplied root `&Element`/`&mut Element` on demand, which sidesteps
//! holding a long-lived mutable borrow into the tree across multiple
//! wrapper compositions.

use udm_types::Type;

use crate::element::Element;
use crate::error::Result;
use crate::path::{format_path, PathSegment};
use crate::property::Property;
use crate::value::Value;

/// A single, non-chained handle: a property plus (for array elements) the
/// index it was reached through. Used by iteration, which already has a
/// concrete `&Property` in hand and doesn't need to re-walk a path.
#[derive(Debug, Clone, Copy)]
pub struct PropertyWrapper<'a> {
    property: Option<&'a Property>,
    array_index: Option<u32>,
}

impl<'a> PropertyWrapper<'a> {
    pub fn new(property: Option<&'a Property>) -> Self {
        PropertyWrapper {
            property,
            array_index: None,
        }
    }

    pub fn with_index(property: Option<&'a Property>, array_index: u32) -> Self {
        PropertyWrapper {
            property,
            array_index: Some(array_index),
        }
    }

    pub fn array_index(&self) -> Option<u32> {
        self.array_index
    }

    pub fn get(&self) -> Option<&'a Property> {
        self.property
    }

    pub fn is_materialized(&self) -> bool {
        self.property.is_some()
    }
}

/// A breadcrumb trail of `[key]`/`[idx]` compositions, rooted at some
/// Element the caller supplies to each operation (spec.md §4.5).
#[derive(Debug, Clone, Default)]
pub struct LinkedPropertyWrapper {
    segments: Vec<PathSegment>,
}

impl LinkedPropertyWrapper {
    /// An empty wrapper pointing at the root Element itself.
    pub fn root() -> Self {
        LinkedPropertyWrapper {
            segments: Vec::new(),
        }
    }

    /// `[key: string]`: descend by name. `key` may itself contain `/` —
    /// escape it as `\/` first if it should stay one segment.
    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment {
            key: key.to_string(),
            indices: Vec::new(),
        });
        LinkedPropertyWrapper { segments }
    }

    /// `[idx: integer]`: index into the Array reached by the most recent
    /// key. Chaining repeatedly indexes nested arrays-of-arrays.
    pub fn index(&self, idx: u32) -> Self {
        let mut segments = self.segments.clone();
        match segments.last_mut() {
            Some(last) => last.indices.push(idx),
            None => segments.push(PathSegment {
                key: String::new(),
                indices: vec![idx],
            }),
        }
        LinkedPropertyWrapper { segments }
    }

    /// `get_path()`: reconstruct the canonical, escaped path from the
    /// breadcrumb chain (spec.md §4.5).
    pub fn get_path(&self) -> String {
        format_path(&self.segments)
    }

    /// Non-materializing lookup (spec.md §4.5: "Lookup… must not
    /// materialize").
    pub fn get<'a>(&self, root: &'a Element) -> Option<&'a Property> {
        if self.segments.is_empty() {
            return None;
        }
        root.get_from_path(&self.get_path())
    }

    pub fn exists(&self, root: &Element) -> bool {
        self.get(root).is_some()
    }

    pub fn to_value(&self, root: &Element, target: Type) -> Option<Value> {
        self.get(root)?.to_value(target)
    }

    /// Assignment (spec.md §4.5): materializes every un-materialized
    /// ancestor as an Element in document order, then creates and assigns
    /// the leaf.
    pub fn assign(&self, root: &mut Element, value: Value) -> Result<()> {
        let kind = value.kind();
        let property = root.add(&self.get_path(), kind)?;
        property.assign(value)
    }

    /// `begin_el()/end_el()`: iterate this wrapper's target Element's
    /// children as `(key, child-wrapper)` pairs, in the Element's own
    /// iteration order.
    pub fn iter_children<'a>(&self, root: &'a Element) -> Vec<(&'a str, PropertyWrapper<'a>)> {
        let Some(property) = self.get(root) else {
            return Vec::new();
        };
        let Ok(element) = property.as_element() else {
            return Vec::new();
        };
        element
            .iter()
            .map(|(key, child)| (key, PropertyWrapper::new(Some(child))))
            .collect()
    }

    /// `begin()/end()`: iterate this wrapper's target Array's elements.
    pub fn iter_array<'a>(&self, root: &'a Element) -> Vec<PropertyWrapper<'a>> {
        let Some(property) = self.get(root) else {
            return Vec::new();
        };
        let Ok(array) = property.as_array() else {
            return Vec::new();
        };
        match array.non_trivial_values() {
            Some(values) => values
                .iter()
                .enumerate()
                .map(|(idx, p)| PropertyWrapper::with_index(Some(p), idx as u32))
                .collect(),
            None => (0..array.len())
                .map(|idx| PropertyWrapper::with_index(None, idx as u32))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_does_not_materialize() {
        let root = Element::new();
        let wrapper = LinkedPropertyWrapper::root().key("a").key("b");
        assert!(!wrapper.exists(&root));
        assert_eq!(root.len(), 0);
    }

    #[test]
    fn assignment_materializes_ancestors() {
        let mut root = Element::new();
        let wrapper = LinkedPropertyWrapper::root().key("a").key("b").key("c");
        wrapper.assign(&mut root, Value::I32(5)).unwrap();
        assert_eq!(root.get_from_path("a/b/c").unwrap().as_i32().unwrap(), 5);
    }

    #[test]
    fn get_path_reconstructs_breadcrumb() {
        let wrapper = LinkedPropertyWrapper::root().key("items").index(2).key("name");
        assert_eq!(wrapper.get_path(), "items[2]/name");
    }

    #[test]
    fn iter_children_yields_all_in_order() {
        let mut root = Element::new();
        root.add("a", Type::I32).unwrap();
        root.add("b", Type::I32).unwrap();
        let wrapper = LinkedPropertyWrapper::root().key("__missing__");
        assert!(wrapper.iter_children(&root).is_empty());

        let top = LinkedPropertyWrapper::root();
        // The root wrapper has no segments, so it resolves to nothing by
        // design (callers iterate the Element they already hold directly);
        // nested wrappers iterate their materialized target instead.
        assert!(top.iter_children(&root).is_empty());

        let mut nested_root = Element::new();
        nested_root.add("child", Type::Element).unwrap();
        {
            let target = nested_root.get_mut("child").unwrap().as_element_mut().unwrap();
            target.add("a", Type::I32).unwrap();
            target.add("b", Type::I32).unwrap();
        }
        let nested_wrapper = LinkedPropertyWrapper::root().key("child");
        let children = nested_wrapper.iter_children(&nested_root);
        assert_eq!(children.len(), 2);
    }
}

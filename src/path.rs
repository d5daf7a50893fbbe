//! Value paths used for error attribution.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Serialize, Serializer};

use crate::operation::OpTag;

/// One step of a [`ValuePath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Schema-level attribute name (or record key), before any rename.
    Attribute(String),
    /// Position in a list.
    Index(usize),
    /// Operation branch entered by the update extension.
    Operation(OpTag),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // JSON Pointer escaping (~ -> ~0, / -> ~1)
            Segment::Attribute(name) => write!(f, "{}", name.replace('~', "~0").replace('/', "~1")),
            Segment::Index(i) => write!(f, "{}", i),
            Segment::Operation(tag) => write!(f, "{}", tag),
        }
    }
}

impl From<&str> for Segment {
    fn from(name: &str) -> Self {
        Segment::Attribute(name.to_string())
    }
}

impl From<String> for Segment {
    fn from(name: String) -> Self {
        Segment::Attribute(name)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Segment::Index(index)
    }
}

impl From<OpTag> for Segment {
    fn from(tag: OpTag) -> Self {
        Segment::Operation(tag)
    }
}

/// Location of a value inside a parsed item.
///
/// Paths are persistent: [`ValuePath::extend`] returns a new path and leaves
/// the receiver untouched, so siblings can all extend the same base.
///
/// Segment order matters for display only: two paths holding the same
/// segments compare equal (and hash alike) whatever their order.
#[derive(Debug, Clone, Default)]
pub struct ValuePath {
    segments: Vec<Segment>,
}

impl ValuePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn extend(&self, segment: impl Into<Segment>) -> ValuePath {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment.into());
        ValuePath { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl PartialEq for ValuePath {
    fn eq(&self, other: &Self) -> bool {
        let count = |segments: &[Segment], wanted: &Segment| {
            segments.iter().filter(|s| *s == wanted).count()
        };
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .all(|s| count(&self.segments, s) == count(&other.segments, s))
    }
}

impl Eq for ValuePath {}

impl Hash for ValuePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Order-independent combination of the segment hashes.
        let combined = self.segments.iter().fold(0u64, |acc, segment| {
            let mut hasher = DefaultHasher::new();
            segment.hash(&mut hasher);
            acc.wrapping_add(hasher.finish())
        });
        self.segments.len().hash(state);
        combined.hash(state);
    }
}

impl<S: Into<Segment>> FromIterator<S> for ValuePath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        ValuePath {
            segments: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl Serialize for ValuePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_leaves_base_untouched() {
        let base = ValuePath::root().extend("items");
        let first = base.extend(0usize);
        let second = base.extend(1usize);

        assert_eq!(base.to_string(), "/items");
        assert_eq!(first.to_string(), "/items/0");
        assert_eq!(second.to_string(), "/items/1");
    }

    #[test]
    fn display_root_and_operations() {
        assert_eq!(ValuePath::root().to_string(), "/");
        let path = ValuePath::root().extend("tags").extend(OpTag::Delete);
        assert_eq!(path.to_string(), "/tags/DELETE");
        assert_eq!(
            path.segments(),
            &[Segment::from("tags"), Segment::Operation(OpTag::Delete)]
        );
    }

    #[test]
    fn display_escapes_pointer_characters() {
        let path = ValuePath::root().extend("a/b").extend("c~d");
        assert_eq!(path.to_string(), "/a~1b/c~0d");
    }

    #[test]
    fn collect_from_segments() {
        let path: ValuePath = ["user", "email"].into_iter().collect();
        assert_eq!(path, ValuePath::root().extend("user").extend("email"));
    }

    #[test]
    fn equality_ignores_segment_order() {
        let ab: ValuePath = ["a", "b"].into_iter().collect();
        let ba: ValuePath = ["b", "a"].into_iter().collect();

        assert_eq!(ab.to_string(), "/a/b");
        assert_eq!(ba.to_string(), "/b/a");
        assert_eq!(ab, ba);

        let mut seen = std::collections::HashSet::new();
        seen.insert(ab);
        assert!(seen.contains(&ba));
    }

    #[test]
    fn equality_counts_repeated_segments() {
        let aab: ValuePath = ["a", "a", "b"].into_iter().collect();
        let abb: ValuePath = ["a", "b", "b"].into_iter().collect();
        assert_ne!(aab, abb);
        assert_ne!(ValuePath::root().extend("a"), ValuePath::root().extend(0usize));
    }
}

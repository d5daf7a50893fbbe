//! Update operations: tagged wrappers around update-mode operands.
//!
//! Operations are only ever built explicitly, through the variant
//! constructors, and only ever recognised through the predicates below.
//! A map that happens to have an `ADD` key is a map, not an operation.

use crate::value::AttrValue;

/// Tag of an update operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpTag {
    Add,
    Delete,
    Remove,
    Set,
    Get,
}

impl OpTag {
    /// Path segment and display form of the tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            OpTag::Add => "ADD",
            OpTag::Delete => "DELETE",
            OpTag::Remove => "REMOVE",
            OpTag::Set => "SET",
            OpTag::Get => "GET",
        }
    }

    /// Key used by the JSON operation notation.
    pub fn json_key(&self) -> &'static str {
        match self {
            OpTag::Add => "$ADD",
            OpTag::Delete => "$DELETE",
            OpTag::Remove => "$REMOVE",
            OpTag::Set => "$SET",
            OpTag::Get => "$GET",
        }
    }

    pub fn from_json_key(key: &str) -> Option<Self> {
        match key {
            "$ADD" => Some(OpTag::Add),
            "$DELETE" => Some(OpTag::Delete),
            "$REMOVE" => Some(OpTag::Remove),
            "$SET" => Some(OpTag::Set),
            "$GET" => Some(OpTag::Get),
            _ => None,
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            OpTag::Add => "ADD operation",
            OpTag::Delete => "DELETE operation",
            OpTag::Remove => "REMOVE operation",
            OpTag::Set => "SET operation",
            OpTag::Get => "GET operation",
        }
    }
}

impl std::fmt::Display for OpTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to another attribute of the same item, with an optional
/// fallback used when the referenced attribute does not exist.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub attribute: String,
    pub fallback: Option<Box<AttrValue>>,
}

impl Reference {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: AttrValue) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }
}

/// An update operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Add members to a set, or increment a number.
    Add(AttrValue),
    /// Delete members from a set.
    Delete(AttrValue),
    /// Remove the attribute.
    Remove,
    /// Replace the whole value instead of merging into it.
    Set(AttrValue),
    /// Read the value of another attribute.
    Get(Reference),
}

impl Operation {
    pub fn tag(&self) -> OpTag {
        match self {
            Operation::Add(_) => OpTag::Add,
            Operation::Delete(_) => OpTag::Delete,
            Operation::Remove => OpTag::Remove,
            Operation::Set(_) => OpTag::Set,
            Operation::Get(_) => OpTag::Get,
        }
    }

    /// Payload of value-carrying operations.
    pub fn payload(&self) -> Option<&AttrValue> {
        match self {
            Operation::Add(v) | Operation::Delete(v) | Operation::Set(v) => Some(v),
            Operation::Remove | Operation::Get(_) => None,
        }
    }
}

/// True iff `value` is an `ADD` operation.
pub fn is_addition(value: &AttrValue) -> bool {
    matches!(value.as_operation(), Some(Operation::Add(_)))
}

/// True iff `value` is a `DELETE` operation.
pub fn is_deletion(value: &AttrValue) -> bool {
    matches!(value.as_operation(), Some(Operation::Delete(_)))
}

/// True iff `value` is a `REMOVE` operation.
pub fn is_removal(value: &AttrValue) -> bool {
    matches!(value.as_operation(), Some(Operation::Remove))
}

/// True iff `value` is a `SET` operation.
pub fn is_setting(value: &AttrValue) -> bool {
    matches!(value.as_operation(), Some(Operation::Set(_)))
}

/// True iff `value` is a `GET` reference.
pub fn is_reference(value: &AttrValue) -> bool {
    matches!(value.as_operation(), Some(Operation::Get(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates_match_only_their_tag() {
        let add = AttrValue::from(Operation::Add(AttrValue::from(1)));
        let delete = AttrValue::from(Operation::Delete(AttrValue::list(["a"])));
        let remove = AttrValue::from(Operation::Remove);
        let set = AttrValue::from(Operation::Set(AttrValue::list([1])));
        let get = AttrValue::from(Operation::Get(Reference::new("count")));

        assert!(is_addition(&add) && !is_deletion(&add) && !is_removal(&add));
        assert!(is_deletion(&delete) && !is_addition(&delete));
        assert!(is_removal(&remove) && !is_setting(&remove));
        assert!(is_setting(&set) && !is_reference(&set));
        assert!(is_reference(&get) && !is_addition(&get));
    }

    #[test]
    fn predicates_do_not_sniff_structure() {
        let lookalike = AttrValue::map([("ADD", AttrValue::from(1))]);
        assert!(!is_addition(&lookalike));
        assert!(!is_addition(&AttrValue::Null));
        assert!(!is_removal(&AttrValue::from("REMOVE")));
    }

    #[test]
    fn tag_json_keys_round_trip() {
        for tag in [OpTag::Add, OpTag::Delete, OpTag::Remove, OpTag::Set, OpTag::Get] {
            assert_eq!(OpTag::from_json_key(tag.json_key()), Some(tag));
        }
        assert_eq!(OpTag::from_json_key("ADD"), None);
    }
}

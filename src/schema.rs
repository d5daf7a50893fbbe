//! Immutable attribute schemas.
//!
//! A schema is a kind (with its children) plus a property record. Kinds are
//! shared behind an `Arc`, so cloning a schema is cheap, and every builder
//! method returns a new schema with one property changed. Nothing is ever
//! mutated in place, which makes a schema safe to share across any number
//! of parse calls and threads.
//!
//! # Example
//!
//! ```
//! use item_schema::{AttributeSchema, AttrValue, Required};
//!
//! let tags = AttributeSchema::set(AttributeSchema::string()).unwrap();
//! let item = AttributeSchema::item([
//!     ("pk", AttributeSchema::string().key()),
//!     ("tags", tags.required(Required::Never)),
//!     ("qty", AttributeSchema::number().put_default(AttrValue::from(0))),
//! ])
//! .unwrap();
//!
//! assert!(item.attributes().unwrap().contains_key("qty"));
//! ```

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::ConstructionError;
use crate::types::{Mode, Required, ScalarKind};
use crate::value::{AttrMap, AttrValue};

/// Named child schemas of a map or item, in declaration order.
pub type Attributes = IndexMap<String, AttributeSchema>;

/// Produces default values on demand.
pub type Producer = Arc<dyn Fn() -> AttrValue + Send + Sync>;

/// Derives a value from already-filled siblings.
pub type Link = Arc<dyn Fn(&LinkContext<'_>) -> Option<AttrValue> + Send + Sync>;

/// Checks a filled value.
pub type Validator = Arc<dyn Fn(&AttrValue) -> Check + Send + Sync>;

/// Default of an attribute: a literal value or a zero-argument producer.
#[derive(Clone)]
pub enum DefaultValue {
    Value(AttrValue),
    Producer(Producer),
}

impl DefaultValue {
    pub fn producer<F>(f: F) -> Self
    where
        F: Fn() -> AttrValue + Send + Sync + 'static,
    {
        DefaultValue::Producer(Arc::new(f))
    }

    pub fn resolve(&self) -> AttrValue {
        match self {
            DefaultValue::Value(value) => value.clone(),
            DefaultValue::Producer(produce) => produce(),
        }
    }
}

impl From<AttrValue> for DefaultValue {
    fn from(value: AttrValue) -> Self {
        DefaultValue::Value(value)
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
            DefaultValue::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// Values visible to a link.
///
/// A context holds the already-filled siblings of the linked attribute and,
/// through its parent chain, the already-filled members of every enclosing
/// map up to the item.
#[derive(Debug, Clone, Copy)]
pub struct LinkContext<'a> {
    siblings: &'a AttrMap,
    parent: Option<&'a LinkContext<'a>>,
}

impl<'a> LinkContext<'a> {
    pub fn new(siblings: &'a AttrMap) -> Self {
        Self {
            siblings,
            parent: None,
        }
    }

    /// Context one level down, for the children of a map filled under `self`.
    pub fn nested<'b>(&'b self, siblings: &'b AttrMap) -> LinkContext<'b>
    where
        'a: 'b,
    {
        LinkContext {
            siblings,
            parent: Some(self),
        }
    }

    /// Value of a sibling attribute, if it was provided or filled.
    pub fn get(&self, name: &str) -> Option<&'a AttrValue> {
        self.siblings.get(name)
    }

    pub fn siblings(&self) -> &'a AttrMap {
        self.siblings
    }

    /// Context of the enclosing map, if any.
    pub fn parent(&self) -> Option<&'a LinkContext<'a>> {
        self.parent
    }

    /// Members of the enclosing maps, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = &'a AttrMap> + 'a {
        std::iter::successors(self.parent, |context| context.parent).map(|context| context.siblings)
    }

    /// Members of the outermost map (the item, for item schemas).
    pub fn root(&self) -> &'a AttrMap {
        self.ancestors().last().unwrap_or(self.siblings)
    }

    /// Nearest value named `name`, searching siblings then each ancestor.
    pub fn lookup(&self, name: &str) -> Option<&'a AttrValue> {
        self.get(name)
            .or_else(|| self.ancestors().find_map(|members| members.get(name)))
    }
}

/// Outcome of a validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    Valid,
    /// Rejected, with an optional message.
    Invalid(Option<String>),
}

impl From<bool> for Check {
    fn from(valid: bool) -> Self {
        if valid {
            Check::Valid
        } else {
            Check::Invalid(None)
        }
    }
}

impl From<String> for Check {
    fn from(message: String) -> Self {
        Check::Invalid(Some(message))
    }
}

impl From<&str> for Check {
    fn from(message: &str) -> Self {
        Check::Invalid(Some(message.to_string()))
    }
}

impl From<Result<(), String>> for Check {
    fn from(result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Check::Valid,
            Err(message) => Check::Invalid(Some(message)),
        }
    }
}

/// Bidirectional scalar encoding applied by the transform phase and
/// reversed by the formatter.
pub trait Transformer: fmt::Debug + Send + Sync {
    fn encode(&self, value: &AttrValue) -> AttrValue;
    fn decode(&self, value: &AttrValue) -> AttrValue;
}

/// Prepends `prefix` and `delimiter` to string values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefix {
    pub prefix: String,
    pub delimiter: String,
}

impl Prefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            delimiter: "#".to_string(),
        }
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }
}

impl Transformer for Prefix {
    fn encode(&self, value: &AttrValue) -> AttrValue {
        match value {
            AttrValue::String(s) => {
                AttrValue::String(format!("{}{}{}", self.prefix, self.delimiter, s))
            }
            other => other.clone(),
        }
    }

    fn decode(&self, value: &AttrValue) -> AttrValue {
        match value {
            AttrValue::String(s) => {
                let head = format!("{}{}", self.prefix, self.delimiter);
                match s.strip_prefix(&head) {
                    Some(rest) => AttrValue::String(rest.to_string()),
                    None => value.clone(),
                }
            }
            other => other.clone(),
        }
    }
}

/// Appends `delimiter` and `suffix` to string values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suffix {
    pub suffix: String,
    pub delimiter: String,
}

impl Suffix {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            delimiter: "#".to_string(),
        }
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }
}

impl Transformer for Suffix {
    fn encode(&self, value: &AttrValue) -> AttrValue {
        match value {
            AttrValue::String(s) => {
                AttrValue::String(format!("{}{}{}", s, self.delimiter, self.suffix))
            }
            other => other.clone(),
        }
    }

    fn decode(&self, value: &AttrValue) -> AttrValue {
        match value {
            AttrValue::String(s) => {
                let tail = format!("{}{}", self.delimiter, self.suffix);
                match s.strip_suffix(&tail) {
                    Some(rest) => AttrValue::String(rest.to_string()),
                    None => value.clone(),
                }
            }
            other => other.clone(),
        }
    }
}

/// One optional value per write mode.
#[derive(Clone)]
pub struct PerMode<T> {
    pub key: Option<T>,
    pub put: Option<T>,
    pub update: Option<T>,
}

impl<T> Default for PerMode<T> {
    fn default() -> Self {
        Self {
            key: None,
            put: None,
            update: None,
        }
    }
}

impl<T> PerMode<T> {
    pub fn get(&self, mode: Mode) -> Option<&T> {
        match mode {
            Mode::Key => self.key.as_ref(),
            Mode::Put => self.put.as_ref(),
            Mode::Update => self.update.as_ref(),
        }
    }

    fn set(&mut self, mode: Mode, value: T) {
        match mode {
            Mode::Key => self.key = Some(value),
            Mode::Put => self.put = Some(value),
            Mode::Update => self.update = Some(value),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_none() && self.put.is_none() && self.update.is_none()
    }
}

impl<T> fmt::Debug for PerMode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modes: Vec<&str> = [Mode::Key, Mode::Put, Mode::Update]
            .into_iter()
            .filter(|m| self.get(*m).is_some())
            .map(|m| m.as_str())
            .collect();
        write!(f, "{:?}", modes)
    }
}

/// Properties shared by every attribute kind.
#[derive(Clone, Default)]
pub struct AttributeProps {
    pub required: Required,
    pub hidden: bool,
    pub key: bool,
    pub saved_as: Option<String>,
    /// Allowed values; anything else is rejected.
    pub enumerated: Option<Arc<[AttrValue]>>,
    pub defaults: PerMode<DefaultValue>,
    pub links: PerMode<Link>,
    pub validators: PerMode<Validator>,
    pub transformer: Option<Arc<dyn Transformer>>,
}

impl fmt::Debug for AttributeProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeProps")
            .field("required", &self.required)
            .field("hidden", &self.hidden)
            .field("key", &self.key)
            .field("saved_as", &self.saved_as)
            .field("enumerated", &self.enumerated)
            .field("defaults", &self.defaults)
            .field("links", &self.links)
            .field("validators", &self.validators)
            .field("transformer", &self.transformer)
            .finish()
    }
}

/// Attribute kinds and their children.
#[derive(Debug)]
pub enum AttributeKind {
    Scalar(ScalarKind),
    /// Unordered collection of unique scalar members.
    Set(AttributeSchema),
    List(AttributeSchema),
    /// Fixed, named attributes.
    Map(Attributes),
    /// Arbitrary string keys mapping to values of one schema.
    Record {
        keys: AttributeSchema,
        elements: AttributeSchema,
    },
    /// The first member accepting the value wins.
    AnyOf(Vec<AttributeSchema>),
    /// A whole item; only valid at the root.
    Item(Attributes),
}

impl AttributeKind {
    pub fn name(&self) -> &'static str {
        match self {
            AttributeKind::Scalar(kind) => kind.name(),
            AttributeKind::Set(_) => "set",
            AttributeKind::List(_) => "list",
            AttributeKind::Map(_) => "map",
            AttributeKind::Record { .. } => "record",
            AttributeKind::AnyOf(_) => "anyOf",
            AttributeKind::Item(_) => "item",
        }
    }
}

/// Immutable schema of one attribute (or of a whole item).
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    kind: Arc<AttributeKind>,
    props: AttributeProps,
}

impl AttributeSchema {
    fn from_kind(kind: AttributeKind) -> Self {
        Self {
            kind: Arc::new(kind),
            props: AttributeProps::default(),
        }
    }

    pub fn scalar(kind: ScalarKind) -> Self {
        Self::from_kind(AttributeKind::Scalar(kind))
    }

    pub fn any() -> Self {
        Self::scalar(ScalarKind::Any)
    }

    pub fn null() -> Self {
        Self::scalar(ScalarKind::Null)
    }

    pub fn boolean() -> Self {
        Self::scalar(ScalarKind::Boolean)
    }

    pub fn number() -> Self {
        Self::scalar(ScalarKind::Number)
    }

    pub fn string() -> Self {
        Self::scalar(ScalarKind::String)
    }

    /// Set of scalar members.
    ///
    /// # Errors
    ///
    /// Returns `ConstructionError` if `elements` is not a scalar, or is
    /// optional, hidden, renamed or defaulted.
    pub fn set(elements: AttributeSchema) -> Result<Self, ConstructionError> {
        check_element("set", &elements)?;
        if !matches!(*elements.kind, AttributeKind::Scalar(_)) {
            return Err(ConstructionError::NonScalarSetElement {
                kind: elements.kind.name(),
            });
        }
        Ok(Self::from_kind(AttributeKind::Set(elements)))
    }

    /// List of elements.
    ///
    /// # Errors
    ///
    /// Returns `ConstructionError` if `elements` is optional, hidden,
    /// renamed, defaulted or an item.
    pub fn list(elements: AttributeSchema) -> Result<Self, ConstructionError> {
        check_element("list", &elements)?;
        Ok(Self::from_kind(AttributeKind::List(elements)))
    }

    /// Map of named attributes.
    ///
    /// # Errors
    ///
    /// Returns `ConstructionError` if one of the attributes is an item.
    pub fn map<K, I>(attributes: I) -> Result<Self, ConstructionError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, AttributeSchema)>,
    {
        let attributes = collect_attributes("map", attributes)?;
        Ok(Self::from_kind(AttributeKind::Map(attributes)))
    }

    /// Record with string keys.
    ///
    /// # Errors
    ///
    /// Returns `ConstructionError` if `keys` is not a string scalar, or if
    /// either schema breaks the element constraints.
    pub fn record(
        keys: AttributeSchema,
        elements: AttributeSchema,
    ) -> Result<Self, ConstructionError> {
        check_element("record", &keys)?;
        check_element("record", &elements)?;
        if !matches!(*keys.kind, AttributeKind::Scalar(ScalarKind::String)) {
            return Err(ConstructionError::NonStringRecordKey {
                kind: keys.kind.name(),
            });
        }
        Ok(Self::from_kind(AttributeKind::Record { keys, elements }))
    }

    /// Tagged union, tried in order.
    ///
    /// # Errors
    ///
    /// Returns `ConstructionError` if `members` is empty or a member breaks
    /// the element constraints.
    pub fn any_of<I>(members: I) -> Result<Self, ConstructionError>
    where
        I: IntoIterator<Item = AttributeSchema>,
    {
        let members: Vec<AttributeSchema> = members.into_iter().collect();
        if members.is_empty() {
            return Err(ConstructionError::EmptyAnyOf);
        }
        for member in &members {
            check_element("anyOf", member)?;
        }
        Ok(Self::from_kind(AttributeKind::AnyOf(members)))
    }

    /// Whole item.
    ///
    /// # Errors
    ///
    /// Returns `ConstructionError` if one of the attributes is an item.
    pub fn item<K, I>(attributes: I) -> Result<Self, ConstructionError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, AttributeSchema)>,
    {
        let attributes = collect_attributes("item", attributes)?;
        Ok(Self::from_kind(AttributeKind::Item(attributes)))
    }

    // --- Accessors ---

    pub fn kind(&self) -> &AttributeKind {
        &self.kind
    }

    pub fn props(&self) -> &AttributeProps {
        &self.props
    }

    /// Children of a map or item.
    pub fn attributes(&self) -> Option<&Attributes> {
        match &*self.kind {
            AttributeKind::Map(attributes) | AttributeKind::Item(attributes) => Some(attributes),
            _ => None,
        }
    }

    /// Element schema of a set, list or record.
    pub fn elements(&self) -> Option<&AttributeSchema> {
        match &*self.kind {
            AttributeKind::Set(elements)
            | AttributeKind::List(elements)
            | AttributeKind::Record { elements, .. } => Some(elements),
            _ => None,
        }
    }

    pub fn is_required(&self, mode: Mode) -> bool {
        self.props.required.is_required(mode)
    }

    pub fn is_hidden(&self) -> bool {
        self.props.hidden
    }

    pub fn is_key(&self) -> bool {
        self.props.key
    }

    /// Name under which this attribute is stored when declared as `name`.
    pub fn stored_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.props.saved_as.as_deref().unwrap_or(name)
    }

    pub fn default_for(&self, mode: Mode) -> Option<&DefaultValue> {
        self.props.defaults.get(mode)
    }

    pub fn link_for(&self, mode: Mode) -> Option<&Link> {
        self.props.links.get(mode)
    }

    pub fn validator_for(&self, mode: Mode) -> Option<&Validator> {
        self.props.validators.get(mode)
    }

    pub fn transformer(&self) -> Option<&dyn Transformer> {
        self.props.transformer.as_deref()
    }

    // --- Builders ---

    pub fn required(mut self, required: Required) -> Self {
        self.props.required = required;
        self
    }

    /// Shorthand for `required(Required::Never)`.
    pub fn optional(self) -> Self {
        self.required(Required::Never)
    }

    pub fn hidden(mut self) -> Self {
        self.props.hidden = true;
        self
    }

    /// Mark as part of the primary key. Key attributes are always required.
    pub fn key(mut self) -> Self {
        self.props.key = true;
        self.props.required = Required::Always;
        self
    }

    pub fn saved_as(mut self, name: impl Into<String>) -> Self {
        self.props.saved_as = Some(name.into());
        self
    }

    pub fn enumerated<I, T>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<AttrValue>,
    {
        self.props.enumerated = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Default of the put mode, or of the key mode for key attributes.
    pub fn default(self, value: impl Into<DefaultValue>) -> Self {
        let mode = self.primary_mode();
        self.default_in(mode, value.into())
    }

    pub fn key_default(self, value: impl Into<DefaultValue>) -> Self {
        self.default_in(Mode::Key, value.into())
    }

    pub fn put_default(self, value: impl Into<DefaultValue>) -> Self {
        self.default_in(Mode::Put, value.into())
    }

    pub fn update_default(self, value: impl Into<DefaultValue>) -> Self {
        self.default_in(Mode::Update, value.into())
    }

    /// Link of the put mode, or of the key mode for key attributes.
    pub fn link<F>(self, link: F) -> Self
    where
        F: Fn(&LinkContext<'_>) -> Option<AttrValue> + Send + Sync + 'static,
    {
        let mode = self.primary_mode();
        self.link_in(mode, Arc::new(link))
    }

    pub fn key_link<F>(self, link: F) -> Self
    where
        F: Fn(&LinkContext<'_>) -> Option<AttrValue> + Send + Sync + 'static,
    {
        self.link_in(Mode::Key, Arc::new(link))
    }

    pub fn put_link<F>(self, link: F) -> Self
    where
        F: Fn(&LinkContext<'_>) -> Option<AttrValue> + Send + Sync + 'static,
    {
        self.link_in(Mode::Put, Arc::new(link))
    }

    pub fn update_link<F>(self, link: F) -> Self
    where
        F: Fn(&LinkContext<'_>) -> Option<AttrValue> + Send + Sync + 'static,
    {
        self.link_in(Mode::Update, Arc::new(link))
    }

    /// Validator of the put mode, or of the key mode for key attributes.
    pub fn validate<F, C>(self, validator: F) -> Self
    where
        F: Fn(&AttrValue) -> C + Send + Sync + 'static,
        C: Into<Check>,
    {
        let mode = self.primary_mode();
        self.validate_in(mode, validator)
    }

    pub fn key_validate<F, C>(self, validator: F) -> Self
    where
        F: Fn(&AttrValue) -> C + Send + Sync + 'static,
        C: Into<Check>,
    {
        self.validate_in(Mode::Key, validator)
    }

    pub fn put_validate<F, C>(self, validator: F) -> Self
    where
        F: Fn(&AttrValue) -> C + Send + Sync + 'static,
        C: Into<Check>,
    {
        self.validate_in(Mode::Put, validator)
    }

    pub fn update_validate<F, C>(self, validator: F) -> Self
    where
        F: Fn(&AttrValue) -> C + Send + Sync + 'static,
        C: Into<Check>,
    {
        self.validate_in(Mode::Update, validator)
    }

    /// Set the encoder/decoder pair applied to scalar values.
    pub fn transform(mut self, transformer: impl Transformer + 'static) -> Self {
        self.props.transformer = Some(Arc::new(transformer));
        self
    }

    pub fn default_in(mut self, mode: Mode, value: DefaultValue) -> Self {
        self.props.defaults.set(mode, value);
        self
    }

    pub fn link_in(mut self, mode: Mode, link: Link) -> Self {
        self.props.links.set(mode, link);
        self
    }

    pub fn validate_in<F, C>(mut self, mode: Mode, validator: F) -> Self
    where
        F: Fn(&AttrValue) -> C + Send + Sync + 'static,
        C: Into<Check>,
    {
        let check: Validator =
            Arc::new(move |value: &AttrValue| -> Check { validator(value).into() });
        self.props.validators.set(mode, check);
        self
    }

    fn primary_mode(&self) -> Mode {
        if self.props.key {
            Mode::Key
        } else {
            Mode::Put
        }
    }
}

/// Element, key and member schemas must be required, displayed, unrenamed
/// and undefaulted.
fn check_element(
    container: &'static str,
    element: &AttributeSchema,
) -> Result<(), ConstructionError> {
    let props = element.props();
    if props.required == Required::Never {
        return Err(ConstructionError::OptionalElement { container });
    }
    if props.hidden {
        return Err(ConstructionError::HiddenElement { container });
    }
    if let Some(saved_as) = &props.saved_as {
        return Err(ConstructionError::RenamedElement {
            container,
            saved_as: saved_as.clone(),
        });
    }
    if !props.defaults.is_empty() || !props.links.is_empty() {
        return Err(ConstructionError::DefaultedElement { container });
    }
    if matches!(element.kind(), AttributeKind::Item(_)) {
        return Err(ConstructionError::NestedItem { container });
    }
    Ok(())
}

fn collect_attributes<K, I>(
    container: &'static str,
    attributes: I,
) -> Result<Attributes, ConstructionError>
where
    K: Into<String>,
    I: IntoIterator<Item = (K, AttributeSchema)>,
{
    let mut collected = Attributes::new();
    for (name, schema) in attributes {
        if matches!(schema.kind(), AttributeKind::Item(_)) {
            return Err(ConstructionError::NestedItem { container });
        }
        collected.insert(name.into(), schema);
    }
    Ok(collected)
}

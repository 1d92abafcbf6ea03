//! Core types for spark-fiber.
//!
//! These types define the foundation that everything builds on.
//! Element descriptions flow in through `render()`, props snapshots flow
//! through the fiber tree, and host/component handles flow out to the
//! external collaborators.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

// =============================================================================
// Handles
// =============================================================================

/// Opaque handle to a node owned by the host renderer.
///
/// Containers passed to `render()` are host nodes too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostNodeId(pub u32);

/// Opaque handle to a component definition registered with the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u32);

/// Opaque handle to a live component instance owned by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u32);

impl fmt::Display for HostNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host#{}", self.0)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance#{}", self.0)
    }
}

// =============================================================================
// Value - Dynamic property value
// =============================================================================

/// A dynamic property or state value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent / null value.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    /// Check if value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64. Floats convert only when integral and in range.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 => {
                Some(*f as i64)
            }
            _ => None,
        }
    }

    /// Try to get as string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// Prop Maps and State
// =============================================================================

/// Ordered attribute map of an element.
pub type PropMap = BTreeMap<String, Value>;

/// Component state. Same shape as attributes.
pub type State = PropMap;

/// Shallow-merge `patch` into `state`.
///
/// Keys present in the patch override, every other existing key is kept.
/// Nested values are replaced wholesale, never merged.
pub fn merge_state(state: &mut State, patch: &State) {
    for (key, value) in patch {
        state.insert(key.clone(), value.clone());
    }
}

/// Build a [`PropMap`] from key/value pairs.
///
/// ```ignore
/// let attrs = prop_map([("text", "hello".into()), ("count", 3.into())]);
/// ```
pub fn prop_map<K, I>(pairs: I) -> PropMap
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

// =============================================================================
// Props - Immutable, shared snapshot
// =============================================================================

#[derive(Debug, Default)]
struct PropsData {
    attrs: PropMap,
    children: Children,
}

/// Immutable props snapshot for one element.
///
/// Cloning shares the snapshot. [`Props::ptr_eq`] compares identity, which is
/// what the component bail-out checks; two separately built snapshots with
/// equal contents are *not* identical.
#[derive(Clone, Default)]
pub struct Props(Rc<PropsData>);

impl Props {
    /// Create props from attributes and children.
    pub fn new(attrs: PropMap, children: impl Into<Children>) -> Self {
        Self(Rc::new(PropsData {
            attrs,
            children: children.into(),
        }))
    }

    /// Props carrying only attributes.
    pub fn from_attrs(attrs: PropMap) -> Self {
        Self::new(attrs, Children::None)
    }

    /// Props carrying only children.
    pub fn with_children(children: impl Into<Children>) -> Self {
        Self::new(PropMap::new(), children)
    }

    pub fn attrs(&self) -> &PropMap {
        &self.0.attrs
    }

    pub fn children(&self) -> &Children {
        &self.0.children
    }

    /// Look up one attribute.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.attrs.get(key)
    }

    /// Reference identity. Same snapshot, not merely equal contents.
    pub fn ptr_eq(&self, other: &Props) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("attrs", &self.0.attrs)
            .field("children", &self.0.children)
            .finish()
    }
}

// =============================================================================
// Elements
// =============================================================================

/// What an element (and the fiber built from it) describes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// A host node with the given tag, e.g. `"div"`.
    Host(Rc<str>),
    /// A component definition known to the component runtime.
    Component(ComponentId),
}

impl ElementType {
    pub fn host(tag: &str) -> Self {
        ElementType::Host(Rc::from(tag))
    }

    pub fn is_host(&self) -> bool {
        matches!(self, ElementType::Host(_))
    }

    /// The host tag, if this is a host type.
    pub fn host_tag(&self) -> Option<&str> {
        match self {
            ElementType::Host(tag) => Some(tag),
            ElementType::Component(_) => None,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Host(tag) => write!(f, "<{tag}>"),
            ElementType::Component(id) => write!(f, "{id}"),
        }
    }
}

/// One node of a declarative element description.
#[derive(Debug, Clone)]
pub struct Element {
    pub ty: ElementType,
    pub props: Props,
}

impl Element {
    pub fn new(ty: ElementType, props: Props) -> Self {
        Self { ty, props }
    }

    /// Host element with attributes and children.
    ///
    /// ```ignore
    /// let tree = Element::host("div", PropMap::new(), vec![
    ///     Element::host("span", prop_map([("text", "a".into())]), Children::None),
    /// ]);
    /// ```
    pub fn host(tag: &str, attrs: PropMap, children: impl Into<Children>) -> Self {
        Self::new(ElementType::host(tag), Props::new(attrs, children))
    }

    /// Component element with attributes (and optional children the
    /// component may read from its props).
    pub fn component(component: ComponentId, attrs: PropMap, children: impl Into<Children>) -> Self {
        Self::new(ElementType::Component(component), Props::new(attrs, children))
    }
}

// =============================================================================
// Children - Normalizable child description
// =============================================================================

/// A child description: absent, a single element, or a sequence.
#[derive(Debug, Clone, Default)]
pub enum Children {
    #[default]
    None,
    One(Element),
    Many(Vec<Element>),
}

impl Children {
    /// Normalize to a flat ordered sequence.
    ///
    /// Absent becomes empty, a single element becomes a one-element sequence.
    pub fn into_vec(self) -> Vec<Element> {
        match self {
            Children::None => Vec::new(),
            Children::One(element) => vec![element],
            Children::Many(elements) => elements,
        }
    }

    /// Borrowing version of [`Children::into_vec`].
    pub fn as_slice(&self) -> &[Element] {
        match self {
            Children::None => &[],
            Children::One(element) => std::slice::from_ref(element),
            Children::Many(elements) => elements,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

impl From<Element> for Children {
    fn from(element: Element) -> Self {
        Children::One(element)
    }
}

impl From<Vec<Element>> for Children {
    fn from(elements: Vec<Element>) -> Self {
        Children::Many(elements)
    }
}

impl From<Option<Element>> for Children {
    fn from(element: Option<Element>) -> Self {
        match element {
            Some(element) => Children::One(element),
            None => Children::None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_state_is_shallow() {
        let mut state = prop_map([
            ("count", Value::from(1)),
            ("label", Value::from("clicks")),
            ("items", Value::from(vec![1, 2])),
        ]);
        let patch = prop_map([("count", Value::from(2)), ("items", Value::from(vec![3]))]);

        merge_state(&mut state, &patch);

        assert_eq!(state.get("count"), Some(&Value::Int(2)));
        assert_eq!(state.get("label"), Some(&Value::from("clicks")));
        // Nested values are replaced, not merged
        assert_eq!(state.get("items"), Some(&Value::List(vec![Value::Int(3)])));
    }

    #[test]
    fn test_as_int_rejects_lossy_floats() {
        assert_eq!(Value::Int(7).as_int(), Some(7));
        assert_eq!(Value::Float(3.0).as_int(), Some(3));
        assert_eq!(Value::Float(2.5).as_int(), None);
        assert_eq!(Value::Float(1e30).as_int(), None);
        assert_eq!(Value::Float(f64::NAN).as_int(), None);
    }

    #[test]
    fn test_props_identity() {
        let a = Props::from_attrs(prop_map([("x", Value::from(1))]));
        let b = a.clone();
        let c = Props::from_attrs(prop_map([("x", Value::from(1))]));

        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
        assert_eq!(a.attrs(), c.attrs());
    }

    #[test]
    fn test_children_normalization() {
        assert!(Children::None.into_vec().is_empty());

        let one = Element::host("span", PropMap::new(), Children::None);
        assert_eq!(Children::from(one).into_vec().len(), 1);

        let many = Children::from(vec![
            Element::host("a", PropMap::new(), Children::None),
            Element::host("b", PropMap::new(), Children::None),
        ]);
        let tags: Vec<_> = many.as_slice().iter().filter_map(|e| e.ty.host_tag()).collect();
        assert_eq!(tags, vec!["a", "b"]);
    }

    #[test]
    fn test_element_type_equality() {
        assert_eq!(ElementType::host("div"), ElementType::host("div"));
        assert_ne!(ElementType::host("div"), ElementType::host("span"));
        assert_ne!(
            ElementType::Component(ComponentId(0)),
            ElementType::Component(ComponentId(1))
        );
    }
}

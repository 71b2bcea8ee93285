//! Mapped values and conversion into caller-requested types
//!
//! A [`MappedValue`] is what a wire value becomes after class resolution:
//! entities of registered classes turn into [`EntityRef`] handles, unmapped
//! nodes and relationships into generic models, scalar lists into typed
//! arrays. [`FromMapped`] converts a mapped value into a concrete Rust type,
//! widening where it is lossless and failing with a type mismatch otherwise.

use crate::error::{OgmError, Result};
use crate::graph::{EntityRef, MappedPath, NodeModel, RelationshipModel};
use crate::value::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// A single scalar element of a mixed array
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Boolean element
    Boolean(bool),
    /// Integer element
    Integer(i64),
    /// Floating point element
    Float(f64),
    /// String element
    String(String),
}

impl Scalar {
    fn into_mapped(self) -> MappedValue {
        match self {
            Scalar::Boolean(b) => MappedValue::Boolean(b),
            Scalar::Integer(i) => MappedValue::Integer(i),
            Scalar::Float(f) => MappedValue::Float(f),
            Scalar::String(s) => MappedValue::String(s),
        }
    }
}

/// Homogeneous array of scalars, or a mixed one when the elements disagree
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarArray {
    /// Empty array
    Empty,
    /// All booleans
    Booleans(Vec<bool>),
    /// All integers
    Integers(Vec<i64>),
    /// Numbers with at least one float; integers are widened
    Floats(Vec<f64>),
    /// All strings
    Strings(Vec<String>),
    /// Heterogeneous elements, kept as-is
    Mixed(Vec<Scalar>),
}

impl ScalarArray {
    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            ScalarArray::Empty => 0,
            ScalarArray::Booleans(v) => v.len(),
            ScalarArray::Integers(v) => v.len(),
            ScalarArray::Floats(v) => v.len(),
            ScalarArray::Strings(v) => v.len(),
            ScalarArray::Mixed(v) => v.len(),
        }
    }

    /// Whether the array has no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarArray::Empty => "[]",
            ScalarArray::Booleans(_) => "[bool]",
            ScalarArray::Integers(_) => "[i64]",
            ScalarArray::Floats(_) => "[f64]",
            ScalarArray::Strings(_) => "[String]",
            ScalarArray::Mixed(_) => "[Scalar]",
        }
    }

    /// Elements as mapped values
    pub fn into_values(self) -> Vec<MappedValue> {
        match self {
            ScalarArray::Empty => Vec::new(),
            ScalarArray::Booleans(v) => v.into_iter().map(MappedValue::Boolean).collect(),
            ScalarArray::Integers(v) => v.into_iter().map(MappedValue::Integer).collect(),
            ScalarArray::Floats(v) => v.into_iter().map(MappedValue::Float).collect(),
            ScalarArray::Strings(v) => v.into_iter().map(MappedValue::String).collect(),
            ScalarArray::Mixed(v) => v.into_iter().map(Scalar::into_mapped).collect(),
        }
    }

    /// String elements, when the array holds only strings (or nothing)
    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            ScalarArray::Strings(v) => Some(v),
            ScalarArray::Empty => Some(&[]),
            _ => None,
        }
    }

    /// Integer elements, when the array holds only integers (or nothing)
    pub fn as_integers(&self) -> Option<&[i64]> {
        match self {
            ScalarArray::Integers(v) => Some(v),
            ScalarArray::Empty => Some(&[]),
            _ => None,
        }
    }
}

/// Build an array from wire scalars. Returns `None` if any element is not a
/// non-null scalar.
pub fn scalar_array(items: &[Value]) -> Option<ScalarArray> {
    let mut scalars = Vec::with_capacity(items.len());
    for item in items {
        scalars.push(match item {
            Value::Boolean(b) => Scalar::Boolean(*b),
            Value::Integer(i) => Scalar::Integer(*i),
            Value::Float(f) => Scalar::Float(*f),
            Value::String(s) => Scalar::String(s.clone()),
            _ => return None,
        });
    }
    Some(narrow(scalars))
}

fn narrow(scalars: Vec<Scalar>) -> ScalarArray {
    if scalars.is_empty() {
        return ScalarArray::Empty;
    }
    if scalars.iter().all(|s| matches!(s, Scalar::Boolean(_))) {
        return ScalarArray::Booleans(
            scalars
                .into_iter()
                .filter_map(|s| match s {
                    Scalar::Boolean(b) => Some(b),
                    _ => None,
                })
                .collect(),
        );
    }
    if scalars.iter().all(|s| matches!(s, Scalar::Integer(_))) {
        return ScalarArray::Integers(
            scalars
                .into_iter()
                .filter_map(|s| match s {
                    Scalar::Integer(i) => Some(i),
                    _ => None,
                })
                .collect(),
        );
    }
    if scalars
        .iter()
        .all(|s| matches!(s, Scalar::Integer(_) | Scalar::Float(_)))
    {
        return ScalarArray::Floats(
            scalars
                .into_iter()
                .filter_map(|s| match s {
                    Scalar::Integer(i) => Some(i as f64),
                    Scalar::Float(f) => Some(f),
                    _ => None,
                })
                .collect(),
        );
    }
    if scalars.iter().all(|s| matches!(s, Scalar::String(_))) {
        return ScalarArray::Strings(
            scalars
                .into_iter()
                .filter_map(|s| match s {
                    Scalar::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        );
    }
    ScalarArray::Mixed(scalars)
}

/// Convert an entity property value. Properties never hold graph entities, so
/// anything that is not a scalar or a scalar array is mapped structurally.
pub fn property_value(value: &Value) -> MappedValue {
    match value {
        Value::Null => MappedValue::Null,
        Value::Boolean(b) => MappedValue::Boolean(*b),
        Value::Integer(i) => MappedValue::Integer(*i),
        Value::Float(f) => MappedValue::Float(*f),
        Value::String(s) => MappedValue::String(s.clone()),
        Value::List(items) => match scalar_array(items) {
            Some(array) => MappedValue::Array(array),
            None => MappedValue::List(items.iter().map(property_value).collect()),
        },
        Value::Map(map) => MappedValue::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), property_value(v)))
                .collect(),
        ),
        Value::Node(node) => MappedValue::Node(NodeModel::from_wire(node)),
        Value::Relationship(rel) => MappedValue::Relationship(RelationshipModel::from_wire(rel)),
        Value::Path(path) => MappedValue::Path(MappedPath {
            nodes: path
                .nodes
                .iter()
                .map(|n| MappedValue::Node(NodeModel::from_wire(n)))
                .collect(),
            relationships: path
                .relationships
                .iter()
                .map(|r| MappedValue::Relationship(RelationshipModel::from_wire(r)))
                .collect(),
        }),
    }
}

/// A value after class resolution
#[derive(Debug, Clone, PartialEq)]
pub enum MappedValue {
    /// Null or absent
    Null,
    /// Boolean
    Boolean(bool),
    /// Integer, full width
    Integer(i64),
    /// Floating point
    Float(f64),
    /// String
    String(String),
    /// List made only of scalars
    Array(ScalarArray),
    /// List holding at least one non-scalar
    List(Vec<MappedValue>),
    /// Map projection
    Map(BTreeMap<String, MappedValue>),
    /// Instance of a registered class
    Entity(EntityRef),
    /// Node with no registered class
    Node(NodeModel),
    /// Relationship with no registered relationship entity class
    Relationship(RelationshipModel),
    /// Path
    Path(MappedPath),
}

impl MappedValue {
    /// Whether the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, MappedValue::Null)
    }

    /// Runtime type name, as reported in type mismatch errors
    pub fn type_name(&self) -> Cow<'static, str> {
        match self {
            MappedValue::Null => Cow::Borrowed("null"),
            MappedValue::Boolean(_) => Cow::Borrowed("bool"),
            MappedValue::Integer(_) => Cow::Borrowed("i64"),
            MappedValue::Float(_) => Cow::Borrowed("f64"),
            MappedValue::String(_) => Cow::Borrowed("String"),
            MappedValue::Array(a) => Cow::Borrowed(a.type_name()),
            MappedValue::List(_) => Cow::Borrowed("List"),
            MappedValue::Map(_) => Cow::Borrowed("Map"),
            MappedValue::Entity(e) => Cow::Owned(e.class_name()),
            MappedValue::Node(_) => Cow::Borrowed("NodeModel"),
            MappedValue::Relationship(_) => Cow::Borrowed("RelationshipModel"),
            MappedValue::Path(_) => Cow::Borrowed("Path"),
        }
    }

    /// Integer value
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MappedValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value, widening integers
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MappedValue::Integer(i) => Some(*i as f64),
            MappedValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Boolean value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MappedValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MappedValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Entity handle
    pub fn as_entity(&self) -> Option<&EntityRef> {
        match self {
            MappedValue::Entity(e) => Some(e),
            _ => None,
        }
    }

    /// Scalar array
    pub fn as_array(&self) -> Option<&ScalarArray> {
        match self {
            MappedValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Non-scalar list
    pub fn as_list(&self) -> Option<&[MappedValue]> {
        match self {
            MappedValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Map
    pub fn as_map(&self) -> Option<&BTreeMap<String, MappedValue>> {
        match self {
            MappedValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Generic node model
    pub fn as_node_model(&self) -> Option<&NodeModel> {
        match self {
            MappedValue::Node(n) => Some(n),
            _ => None,
        }
    }

    /// Generic relationship model
    pub fn as_relationship_model(&self) -> Option<&RelationshipModel> {
        match self {
            MappedValue::Relationship(r) => Some(r),
            _ => None,
        }
    }

    /// Path
    pub fn as_path(&self) -> Option<&MappedPath> {
        match self {
            MappedValue::Path(p) => Some(p),
            _ => None,
        }
    }

    /// Convert into a caller-requested type
    pub fn into_type<T: FromMapped>(self) -> Result<T> {
        T::from_mapped(self)
    }
}

impl From<bool> for MappedValue {
    fn from(value: bool) -> Self {
        MappedValue::Boolean(value)
    }
}

impl From<i64> for MappedValue {
    fn from(value: i64) -> Self {
        MappedValue::Integer(value)
    }
}

impl From<f64> for MappedValue {
    fn from(value: f64) -> Self {
        MappedValue::Float(value)
    }
}

impl From<&str> for MappedValue {
    fn from(value: &str) -> Self {
        MappedValue::String(value.to_string())
    }
}

impl From<String> for MappedValue {
    fn from(value: String) -> Self {
        MappedValue::String(value)
    }
}

/// How a requested type is projected out of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Converted from the single column of each row
    Scalar,
    /// Instances of the named class, collected from anywhere at the root of a
    /// row and de-duplicated
    Entity(&'static str),
}

/// Conversion from a mapped value into a concrete type
pub trait FromMapped: Sized {
    /// Name used in type mismatch errors
    fn type_name() -> Cow<'static, str>;

    /// Projection strategy
    fn target() -> Target {
        Target::Scalar
    }

    /// Convert, failing with a type mismatch when incompatible
    fn from_mapped(value: MappedValue) -> Result<Self>;
}

fn mismatch<T: FromMapped>(value: &MappedValue) -> OgmError {
    OgmError::type_mismatch(value.type_name(), T::type_name())
}

impl FromMapped for MappedValue {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("MappedValue")
    }

    fn from_mapped(value: MappedValue) -> Result<Self> {
        Ok(value)
    }
}

impl FromMapped for i64 {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("i64")
    }

    fn from_mapped(value: MappedValue) -> Result<Self> {
        value.as_i64().ok_or_else(|| mismatch::<Self>(&value))
    }
}

impl FromMapped for i32 {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("i32")
    }

    fn from_mapped(value: MappedValue) -> Result<Self> {
        value
            .as_i64()
            .and_then(|i| i32::try_from(i).ok())
            .ok_or_else(|| mismatch::<Self>(&value))
    }
}

impl FromMapped for u64 {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("u64")
    }

    fn from_mapped(value: MappedValue) -> Result<Self> {
        value
            .as_i64()
            .and_then(|i| u64::try_from(i).ok())
            .ok_or_else(|| mismatch::<Self>(&value))
    }
}

impl FromMapped for f64 {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("f64")
    }

    fn from_mapped(value: MappedValue) -> Result<Self> {
        value.as_f64().ok_or_else(|| mismatch::<Self>(&value))
    }
}

impl FromMapped for bool {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("bool")
    }

    fn from_mapped(value: MappedValue) -> Result<Self> {
        value.as_bool().ok_or_else(|| mismatch::<Self>(&value))
    }
}

impl FromMapped for String {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("String")
    }

    fn from_mapped(value: MappedValue) -> Result<Self> {
        match value {
            MappedValue::String(s) => Ok(s),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

/// Any numeric value, integer or float
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Integer
    Integer(i64),
    /// Float
    Float(f64),
}

impl Number {
    /// Value as an integer, truncating floats
    pub fn as_i64(self) -> i64 {
        match self {
            Number::Integer(i) => i,
            Number::Float(f) => f as i64,
        }
    }

    /// Value as a float
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Integer(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

impl FromMapped for Number {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("Number")
    }

    fn from_mapped(value: MappedValue) -> Result<Self> {
        match value {
            MappedValue::Integer(i) => Ok(Number::Integer(i)),
            MappedValue::Float(f) => Ok(Number::Float(f)),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromMapped for ScalarArray {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("ScalarArray")
    }

    fn from_mapped(value: MappedValue) -> Result<Self> {
        match value {
            MappedValue::Array(a) => Ok(a),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromMapped for EntityRef {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("EntityRef")
    }

    fn from_mapped(value: MappedValue) -> Result<Self> {
        match value {
            MappedValue::Entity(e) => Ok(e),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromMapped for NodeModel {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("NodeModel")
    }

    fn from_mapped(value: MappedValue) -> Result<Self> {
        match value {
            MappedValue::Node(n) => Ok(n),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromMapped for RelationshipModel {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("RelationshipModel")
    }

    fn from_mapped(value: MappedValue) -> Result<Self> {
        match value {
            MappedValue::Relationship(r) => Ok(r),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromMapped for MappedPath {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("Path")
    }

    fn from_mapped(value: MappedValue) -> Result<Self> {
        match value {
            MappedValue::Path(p) => Ok(p),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromMapped for BTreeMap<String, MappedValue> {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("Map")
    }

    fn from_mapped(value: MappedValue) -> Result<Self> {
        match value {
            MappedValue::Map(m) => Ok(m),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl<T: FromMapped> FromMapped for Option<T> {
    fn type_name() -> Cow<'static, str> {
        Cow::Owned(format!("Option<{}>", T::type_name()))
    }

    fn from_mapped(value: MappedValue) -> Result<Self> {
        match value {
            MappedValue::Null => Ok(None),
            other => T::from_mapped(other).map(Some),
        }
    }
}

impl<T: FromMapped> FromMapped for Vec<T> {
    fn type_name() -> Cow<'static, str> {
        Cow::Owned(format!("Vec<{}>", T::type_name()))
    }

    fn from_mapped(value: MappedValue) -> Result<Self> {
        let items = match value {
            MappedValue::Array(a) => a.into_values(),
            MappedValue::List(items) => items,
            other => return Err(mismatch::<Self>(&other)),
        };
        items.into_iter().map(T::from_mapped).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_homogeneous_arrays() {
        let strings = scalar_array(&[Value::from("a"), Value::from("b")]).unwrap();
        assert_eq!(
            strings,
            ScalarArray::Strings(vec!["a".to_string(), "b".to_string()])
        );
        let ints = scalar_array(&[Value::Integer(1), Value::Integer(2)]).unwrap();
        assert_eq!(ints.as_integers(), Some(&[1i64, 2][..]));
        assert_eq!(scalar_array(&[]).unwrap(), ScalarArray::Empty);
    }

    #[test]
    fn test_integers_widen_in_float_arrays() {
        let nums = scalar_array(&[Value::Integer(1), Value::Float(2.5)]).unwrap();
        assert_eq!(nums, ScalarArray::Floats(vec![1.0, 2.5]));
    }

    #[test]
    fn test_mixed_array_keeps_each_element() {
        let mixed =
            scalar_array(&[Value::Integer(1), Value::from("two"), Value::Boolean(true)]).unwrap();
        assert_eq!(
            mixed,
            ScalarArray::Mixed(vec![
                Scalar::Integer(1),
                Scalar::String("two".to_string()),
                Scalar::Boolean(true)
            ])
        );
        assert_eq!(mixed.len(), 3);
    }

    #[test]
    fn test_null_element_is_not_an_array() {
        assert!(scalar_array(&[Value::Integer(1), Value::Null]).is_none());
    }

    #[test]
    fn test_integer_coercion_is_full_width() {
        let v = MappedValue::Integer(2_147_483_648);
        assert_eq!(i64::from_mapped(v.clone()).unwrap(), 2_147_483_648);
        let err = i32::from_mapped(v).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot map i64 to i32. This can be caused by missing registration of i32."
        );
    }

    #[test]
    fn test_number_accepts_both_kinds() {
        assert_eq!(
            Number::from_mapped(MappedValue::Integer(3)).unwrap(),
            Number::Integer(3)
        );
        assert_eq!(
            Number::from_mapped(MappedValue::Float(1.5)).unwrap().as_f64(),
            1.5
        );
        assert!(Number::from_mapped(MappedValue::from("x")).is_err());
    }

    #[test]
    fn test_f64_widens_integers() {
        assert_eq!(f64::from_mapped(MappedValue::Integer(4)).unwrap(), 4.0);
    }

    #[test]
    fn test_option_and_vec() {
        assert_eq!(Option::<i64>::from_mapped(MappedValue::Null).unwrap(), None);
        let v = Vec::<String>::from_mapped(MappedValue::Array(ScalarArray::Strings(vec![
            "x".to_string(),
        ])))
        .unwrap();
        assert_eq!(v, vec!["x".to_string()]);
        let empty = Vec::<String>::from_mapped(MappedValue::Array(ScalarArray::Empty)).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_string_rejects_integer() {
        let err = String::from_mapped(MappedValue::Integer(1)).unwrap_err();
        assert!(matches!(err, OgmError::TypeMismatch { .. }));
    }

    #[test]
    fn test_property_value_maps_nested_lists() {
        let v = property_value(&Value::List(vec![
            Value::List(vec![Value::Integer(1)]),
            Value::Null,
        ]));
        let MappedValue::List(items) = v else {
            panic!("expected list")
        };
        assert_eq!(items[0], MappedValue::Array(ScalarArray::Integers(vec![1])));
        assert!(items[1].is_null());
    }
}

use std::{cell::RefCell, cmp::Ordering, collections::HashMap, fmt, rc::Rc};

use thiserror::Error;

use crate::{
    ast::{BinaryOp, FuncDef, TypeName, UnaryOp},
    scope::Scope,
    system::Builtin,
};

pub type ListRef = Rc<RefCell<Vec<Value>>>;
pub type InstanceRef = Rc<RefCell<Instance>>;

/// Failures of a single operator application. The evaluator attaches spans
/// and the call chain.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpError {
    #[error("Illegal operation")]
    Illegal,
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Element at this index could not be {0} list because index is out of bounds")]
    ListBounds(&'static str),
    #[error("Character at this index could not be retrieved from string because index is out of bounds")]
    StringBounds,
    #[error("Index must be an integer")]
    NonIntegerIndex,
    #[error("Cannot index into {0}")]
    NotIndexable(&'static str),
    #[error("String is too large")]
    StringTooLarge,
}

/// Upper bound, in bytes, on strings built by repetition.
pub const MAX_STRING_LEN: usize = 1 << 28;

#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(n) => n,
        }
    }

    /// The integer this number holds exactly, if any.
    pub fn as_integer(self) -> Option<i64> {
        match self {
            Number::Int(n) => Some(n),
            Number::Float(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => Some(n as i64),
            Number::Float(_) => None,
        }
    }

    pub fn is_zero(self) -> bool {
        self.as_f64() == 0.0
    }

    fn int_or_float(
        self,
        other: Number,
        int: fn(i64, i64) -> Option<i64>,
        float: fn(f64, f64) -> f64,
    ) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => match int(a, b) {
                Some(n) => Number::Int(n),
                None => Number::Float(float(a as f64, b as f64)),
            },
            (a, b) => Number::Float(float(a.as_f64(), b.as_f64())),
        }
    }

    pub fn add(self, other: Number) -> Number {
        self.int_or_float(other, i64::checked_add, |a, b| a + b)
    }

    pub fn sub(self, other: Number) -> Number {
        self.int_or_float(other, i64::checked_sub, |a, b| a - b)
    }

    pub fn mul(self, other: Number) -> Number {
        self.int_or_float(other, i64::checked_mul, |a, b| a * b)
    }

    pub fn div(self, other: Number) -> Result<Number, OpError> {
        if other.is_zero() {
            return Err(OpError::DivisionByZero);
        }
        Ok(Number::Float(self.as_f64() / other.as_f64()))
    }

    pub fn pow(self, other: Number) -> Number {
        self.int_or_float(
            other,
            |a, b| u32::try_from(b).ok().and_then(|b| a.checked_pow(b)),
            f64::powf,
        )
    }

    pub fn neg(self) -> Number {
        match self {
            Number::Int(n) => n
                .checked_neg()
                .map_or(Number::Float(-(n as f64)), Number::Int),
            Number::Float(n) => Number::Float(-n),
        }
    }

    pub fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.compare(*other) == Some(Ordering::Equal)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{n}"),
            Number::Float(n) if n.is_finite() && *n == n.trunc() => write!(f, "{n:.1}"),
            Number::Float(n) => write!(f, "{n}"),
        }
    }
}

/// A user function or method: its definition and the scope it closes over.
pub struct Function {
    pub def: Rc<FuncDef>,
    pub closure: Scope,
}

impl Function {
    pub fn name(&self) -> &str {
        self.def.name.as_deref().unwrap_or("<anonymous>")
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name())
            .field("params", &self.def.params.len())
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub methods: HashMap<String, Rc<Function>>,
    pub parent: Option<Rc<Class>>,
}

impl Class {
    /// Walks the parent chain starting at this class.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        match self.methods.get(name) {
            Some(method) => Some(Rc::clone(method)),
            None => self.parent.as_ref()?.find_method(name),
        }
    }

    pub fn descends_from(&self, name: &str) -> bool {
        self.name == name || self.parent.as_ref().is_some_and(|parent| parent.descends_from(name))
    }
}

#[derive(Debug)]
pub struct Instance {
    pub class: Rc<Class>,
    pub attributes: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> InstanceRef {
        Rc::new(RefCell::new(Instance {
            class,
            attributes: HashMap::new(),
        }))
    }

    /// Own attributes first, then a method of the class chain bound to
    /// `this`.
    pub fn attribute(this: &InstanceRef, name: &str) -> Option<Value> {
        let instance = this.borrow();
        if let Some(value) = instance.attributes.get(name) {
            return Some(value.clone());
        }
        let method = instance.class.find_method(name)?;
        Some(Value::BoundMethod(Rc::new(BoundMethod {
            receiver: Rc::clone(this),
            method,
        })))
    }
}

#[derive(Debug)]
pub struct BoundMethod {
    pub receiver: InstanceRef,
    pub method: Rc<Function>,
}

/// A runtime value. Lists and instances are shared handles so that mutation
/// through one binding is seen through every other; everything else is
/// copied on clone.
#[derive(Clone)]
pub enum Value {
    Number(Number),
    String(String),
    List(ListRef),
    Function(Rc<Function>),
    Method(Rc<Function>),
    Builtin(Builtin),
    BoundMethod(Rc<BoundMethod>),
    Class(Rc<Class>),
    Instance(InstanceRef),
}

impl Value {
    pub fn int(n: i64) -> Value {
        Value::Number(Number::Int(n))
    }

    pub fn float(n: f64) -> Value {
        Value::Number(Number::Float(n))
    }

    pub fn string(s: impl Into<String>) -> Value {
        Value::String(s.into())
    }

    pub fn list(elements: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(elements)))
    }

    pub fn null() -> Value {
        Value::int(0)
    }

    pub fn boolean(b: bool) -> Value {
        Value::int(i64::from(b))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Number(n) if n.is_zero())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(Number::Int(_)) => "int",
            Value::Number(Number::Float(_)) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Function(_) | Value::Method(_) | Value::Builtin(_) | Value::BoundMethod(_) => {
                "function"
            }
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
        }
    }

    /// Whether this value may be bound to a name annotated with `ty`.
    pub fn conforms_to(&self, ty: TypeName) -> bool {
        match ty {
            TypeName::Int => matches!(self, Value::Number(Number::Int(_))),
            TypeName::Float => matches!(self, Value::Number(_)),
            TypeName::String => matches!(self, Value::String(_)),
            TypeName::List => matches!(self, Value::List(_)),
            TypeName::Function => matches!(
                self,
                Value::Function(_) | Value::Method(_) | Value::Builtin(_) | Value::BoundMethod(_)
            ),
        }
    }

    pub fn is_true(&self) -> bool {
        match self {
            Value::Number(n) => !n.is_zero(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn binary(&self, op: BinaryOp, right: &Value) -> Result<Value, OpError> {
        use Value::{List, Number as Num, String as Str};

        Ok(match (op, self, right) {
            (BinaryOp::And, l, r) => Value::boolean(l.is_true() && r.is_true()),
            (BinaryOp::Or, l, r) => Value::boolean(l.is_true() || r.is_true()),

            (BinaryOp::Add, Num(a), Num(b)) => Num(a.add(*b)),
            (BinaryOp::Sub, Num(a), Num(b)) => Num(a.sub(*b)),
            (BinaryOp::Mul, Num(a), Num(b)) => Num(a.mul(*b)),
            (BinaryOp::Div, Num(a), Num(b)) => Num(a.div(*b)?),
            (BinaryOp::Pow, Num(a), Num(b)) => Num(a.pow(*b)),

            (BinaryOp::Add, Str(a), Str(b)) => Value::String(format!("{a}{b}")),
            (BinaryOp::Mul, Str(s), Num(count)) => {
                let count = count.as_integer().ok_or(OpError::Illegal)?;
                let count = usize::try_from(count).unwrap_or(0);
                match s.len().checked_mul(count) {
                    Some(length) if length <= MAX_STRING_LEN => Value::String(s.repeat(count)),
                    _ => return Err(OpError::StringTooLarge),
                }
            }

            (BinaryOp::Add, List(list), value) => append(list, value.clone()),
            (BinaryOp::Sub, List(list), Num(index)) => remove_at(list, *index)?,
            (BinaryOp::Mul, List(a), List(b)) => concat(a, b),
            (BinaryOp::Div, List(list), Num(index)) => index_at(list, *index)?,

            (BinaryOp::Eq | BinaryOp::Ne, Num(a), Num(b)) => {
                Value::boolean((a == b) == (op == BinaryOp::Eq))
            }
            (BinaryOp::Eq | BinaryOp::Ne, Str(a), Str(b)) => {
                Value::boolean((a == b) == (op == BinaryOp::Eq))
            }
            (BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge, Num(a), Num(b)) => {
                let ordering = a.compare(*b);
                Value::boolean(match op {
                    BinaryOp::Lt => ordering == Some(Ordering::Less),
                    BinaryOp::Gt => ordering == Some(Ordering::Greater),
                    BinaryOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                    _ => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
                })
            }

            _ => return Err(OpError::Illegal),
        })
    }

    pub fn unary(&self, op: UnaryOp) -> Result<Value, OpError> {
        match (op, self) {
            (UnaryOp::Not, value) => Ok(Value::boolean(!value.is_true())),
            (UnaryOp::Minus, Value::Number(n)) => Ok(Value::Number(n.neg())),
            (UnaryOp::Plus, Value::Number(n)) => Ok(Value::Number(*n)),
            _ => Err(OpError::Illegal),
        }
    }

    /// `target[index]`: list elements, or single characters of a string.
    pub fn index(&self, index: &Value) -> Result<Value, OpError> {
        match (self, index) {
            (Value::List(list), Value::Number(n)) => index_at(list, *n),
            (Value::String(s), Value::Number(n)) => {
                let length = s.chars().count();
                let position = resolve_index(length, *n)?.ok_or(OpError::StringBounds)?;
                s.chars()
                    .nth(position)
                    .map(|c| Value::String(c.to_string()))
                    .ok_or(OpError::StringBounds)
            }
            (Value::List(_) | Value::String(_), _) => Err(OpError::NonIntegerIndex),
            (other, _) => Err(OpError::NotIndexable(other.type_name())),
        }
    }

    /// The source-like rendering: strings quoted, lists bracketed.
    pub fn repr(&self) -> String {
        match self {
            Value::String(s) => format!("\"{s}\""),
            Value::List(list) => {
                let elements: Vec<String> = list.borrow().iter().map(Value::repr).collect();
                format!("[{}]", elements.join(", "))
            }
            other => other.to_string(),
        }
    }
}

/// Maps a possibly negative index onto `0..length`.
pub(crate) fn resolve_index(length: usize, index: Number) -> Result<Option<usize>, OpError> {
    let index = index.as_integer().ok_or(OpError::NonIntegerIndex)?;
    let length = i64::try_from(length).map_err(|_| OpError::Illegal)?;
    let index = if index < 0 { index + length } else { index };
    Ok((0..length).contains(&index).then_some(index as usize))
}

/// A new list holding the elements of `list` followed by `value`.
pub fn append(list: &ListRef, value: Value) -> Value {
    let mut elements = list.borrow().clone();
    elements.push(value);
    Value::list(elements)
}

/// A new list without the element at `index`.
pub fn remove_at(list: &ListRef, index: Number) -> Result<Value, OpError> {
    let mut elements = list.borrow().clone();
    let position = resolve_index(elements.len(), index)?.ok_or(OpError::ListBounds("removed from"))?;
    elements.remove(position);
    Ok(Value::list(elements))
}

pub fn concat(left: &ListRef, right: &ListRef) -> Value {
    let mut elements = left.borrow().clone();
    elements.extend(right.borrow().iter().cloned());
    Value::list(elements)
}

pub fn index_at(list: &ListRef, index: Number) -> Result<Value, OpError> {
    let elements = list.borrow();
    let position =
        resolve_index(elements.len(), index)?.ok_or(OpError::ListBounds("retrieved from"))?;
    Ok(elements[position].clone())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s}"),
            Value::List(list) => {
                for (i, element) in list.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{element}")?;
                }
                Ok(())
            }
            Value::Function(function) => write!(f, "<function {}>", function.name()),
            Value::Method(method) => write!(f, "<method {}>", method.name()),
            Value::Builtin(builtin) => write!(f, "<built-in function {}>", builtin.name()),
            Value::BoundMethod(bound) => write!(
                f,
                "<bound method {} of <{} instance>>",
                bound.method.name(),
                bound.receiver.borrow().class.name
            ),
            Value::Class(class) => write!(f, "<class {}>", class.name),
            Value::Instance(instance) => write!(f, "<{} instance>", instance.borrow().class.name),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(Number::Int(n)) => write!(f, "Int({n})"),
            Value::Number(Number::Float(n)) => write!(f, "Float({n:?})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::List(list) => f.debug_list().entries(list.borrow().iter()).finish(),
            other => write!(f, "{other}"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Function(a), Value::Function(b)) | (Value::Method(a), Value::Method(b)) => {
                Rc::ptr_eq(a, b)
            }
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::BoundMethod(a), Value::BoundMethod(b)) => {
                Rc::ptr_eq(&a.receiver, &b.receiver) && Rc::ptr_eq(&a.method, &b.method)
            }
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn ints(values: &[i64]) -> Value {
        Value::list(values.iter().copied().map(Value::int).collect())
    }

    #[test]
    fn integer_arithmetic_stays_integral_until_it_cannot() {
        assert_eq!(Value::int(2).binary(BinaryOp::Add, &Value::int(3)), Ok(Value::int(5)));
        assert!(matches!(
            Value::int(i64::MAX).binary(BinaryOp::Add, &Value::int(1)),
            Ok(Value::Number(Number::Float(_)))
        ));
        assert!(matches!(
            Value::int(2).binary(BinaryOp::Pow, &Value::int(-1)),
            Ok(Value::Number(Number::Float(f))) if f == 0.5
        ));
    }

    #[test]
    fn division_always_yields_a_float() {
        let quotient = Value::int(6).binary(BinaryOp::Div, &Value::int(3)).unwrap();
        assert!(matches!(quotient, Value::Number(Number::Float(f)) if f == 2.0));
        assert_eq!(quotient.to_string(), "2.0");
    }

    #[test]
    fn division_by_zero_is_its_own_error() {
        assert_eq!(
            Value::int(5).binary(BinaryOp::Div, &Value::float(0.0)),
            Err(OpError::DivisionByZero)
        );
    }

    #[test]
    fn comparisons_and_logic_yield_one_or_zero() {
        assert_eq!(Value::int(1).binary(BinaryOp::Lt, &Value::float(1.5)), Ok(Value::int(1)));
        assert_eq!(Value::int(2).binary(BinaryOp::Ge, &Value::int(3)), Ok(Value::int(0)));
        assert_eq!(Value::int(2).binary(BinaryOp::Eq, &Value::float(2.0)), Ok(Value::int(1)));
        assert_eq!(Value::int(1).binary(BinaryOp::And, &Value::int(0)), Ok(Value::int(0)));
        assert_eq!(Value::int(0).binary(BinaryOp::Or, &Value::int(7)), Ok(Value::int(1)));
        assert_eq!(Value::int(0).unary(UnaryOp::Not), Ok(Value::int(1)));
    }

    #[test]
    fn strings_concatenate_repeat_and_compare() {
        let ab = Value::string("ab");
        assert_eq!(ab.binary(BinaryOp::Add, &Value::string("c")), Ok(Value::string("abc")));
        assert_eq!(ab.binary(BinaryOp::Mul, &Value::int(3)), Ok(Value::string("ababab")));
        assert_eq!(ab.binary(BinaryOp::Eq, &Value::string("ab")), Ok(Value::int(1)));
        assert_eq!(ab.binary(BinaryOp::Sub, &Value::int(1)), Err(OpError::Illegal));
    }

    #[test]
    fn huge_repetitions_are_refused() {
        let ab = Value::string("ab");
        assert_eq!(ab.binary(BinaryOp::Mul, &Value::int(-2)), Ok(Value::string("")));
        assert_eq!(
            ab.binary(BinaryOp::Mul, &Value::int(i64::MAX)),
            Err(OpError::StringTooLarge)
        );
        assert_eq!(
            ab.binary(BinaryOp::Mul, &Value::int((MAX_STRING_LEN / 2 + 1) as i64)),
            Err(OpError::StringTooLarge)
        );
    }

    #[test]
    fn list_operators_build_new_lists() {
        let list = ints(&[1, 2, 3]);
        assert_eq!(list.binary(BinaryOp::Add, &Value::int(4)), Ok(ints(&[1, 2, 3, 4])));
        assert_eq!(list.binary(BinaryOp::Sub, &Value::int(0)), Ok(ints(&[2, 3])));
        assert_eq!(list.binary(BinaryOp::Mul, &ints(&[9])), Ok(ints(&[1, 2, 3, 9])));
        assert_eq!(list.binary(BinaryOp::Div, &Value::int(-1)), Ok(Value::int(3)));
        assert_eq!(list, ints(&[1, 2, 3]));
    }

    #[test]
    fn list_bounds_errors_name_the_operation() {
        let list = ints(&[1]);
        let removed = list.binary(BinaryOp::Sub, &Value::int(3)).unwrap_err();
        assert_eq!(
            removed.to_string(),
            "Element at this index could not be removed from list because index is out of bounds"
        );
        let retrieved = list.binary(BinaryOp::Div, &Value::int(1)).unwrap_err();
        assert_eq!(retrieved, OpError::ListBounds("retrieved from"));
    }

    #[test]
    fn string_indexing() {
        let abc = Value::string("abc");
        assert_eq!(abc.index(&Value::int(1)), Ok(Value::string("b")));
        assert_eq!(abc.index(&Value::int(-1)), Ok(Value::string("c")));
        assert_eq!(abc.index(&Value::int(5)), Err(OpError::StringBounds));
        assert_eq!(abc.index(&Value::float(0.5)), Err(OpError::NonIntegerIndex));
        assert_eq!(Value::int(3).index(&Value::int(0)), Err(OpError::NotIndexable("int")));
    }

    #[test]
    fn lists_are_shared_between_clones() {
        let list = ints(&[1]);
        let alias = list.clone();
        if let Value::List(elements) = &alias {
            elements.borrow_mut().push(Value::int(2));
        }
        assert_eq!(list, ints(&[1, 2]));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::int(0).is_true());
        assert!(Value::float(0.1).is_true());
        assert!(!Value::string("").is_true());
        assert!(ints(&[]).is_true());
    }

    #[test]
    fn display_and_repr() {
        let mixed = Value::list(vec![Value::int(1), Value::string("a"), Value::float(2.5)]);
        assert_eq!(mixed.to_string(), "1, a, 2.5");
        assert_eq!(mixed.repr(), "[1, \"a\", 2.5]");
        assert_eq!(Value::float(3.0).to_string(), "3.0");
        assert_eq!(Value::Builtin(Builtin::Print).to_string(), "<built-in function print>");
    }

    #[test]
    fn type_annotations() {
        assert!(Value::int(1).conforms_to(TypeName::Int));
        assert!(!Value::float(1.0).conforms_to(TypeName::Int));
        assert!(Value::int(1).conforms_to(TypeName::Float));
        assert!(Value::Builtin(Builtin::Len).conforms_to(TypeName::Function));
        assert!(!Value::string("x").conforms_to(TypeName::List));
    }
}

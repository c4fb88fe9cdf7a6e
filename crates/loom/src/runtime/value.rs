//! Runtime value representation (§3). Closures and shared containers use
//! plain `Rc`/`RefCell`: host garbage collection is out of scope (§1), so
//! true reference cycles are allowed to leak, same as ordinary `Rc`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::bytecode::code::CodeObject;
use crate::runtime::cell::Cell;
use crate::runtime::class::{ClassValue, InstanceValue};
use crate::runtime::function::{FunctionValue, MethodValue, NativeFunction};

/// Constant-pool value: the serializable subset of `Value` stored in a
/// code object's `consts` table. Nested code objects appear here (e.g. as
/// the operand of `LOAD_CONST` preceding `MAKE_FUNCTION`).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Const {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Tuple(Vec<Const>),
    Code(Box<CodeObject>),
}

impl From<Const> for Value {
    fn from(c: Const) -> Self {
        match c {
            Const::None => Value::None,
            Const::Bool(b) => Value::Bool(b),
            Const::Int(i) => Value::Int(i),
            Const::Float(f) => Value::Float(f),
            Const::Str(s) => Value::Str(Rc::from(s.as_str())),
            Const::Bytes(b) => Value::Bytes(Rc::from(b.into_boxed_slice())),
            Const::Tuple(items) => {
                Value::Tuple(Rc::from(items.into_iter().map(Value::from).collect::<Vec<_>>()))
            }
            Const::Code(code) => Value::Code(Rc::new(*code)),
        }
    }
}

/// Hashable projection of a `Value`, used as a dict key. Only the value
/// kinds the accepted subset can use as keys need representation here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DictKey {
    None,
    Bool(bool),
    Int(i64),
    FloatBits(u64),
    Str(Rc<str>),
    Tuple(Vec<DictKey>),
}

impl DictKey {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::None => Some(Self::None),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Int(i) => Some(Self::Int(*i)),
            Value::Float(f) => Some(Self::FloatBits(f.to_bits())),
            Value::Str(s) => Some(Self::Str(s.clone())),
            Value::Tuple(items) => items
                .iter()
                .map(Self::from_value)
                .collect::<Option<Vec<_>>>()
                .map(Self::Tuple),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Bytes(Rc<[u8]>),
    List(Rc<RefCell<Vec<Value>>>),
    Tuple(Rc<[Value]>),
    Dict(Rc<RefCell<IndexMap<DictKey, (Value, Value)>>>),
    Range(i64, i64, i64),
    /// Materialized snapshot iterator produced by `GET_ITER` over a list,
    /// tuple, string, or dict (§4.5 `for` loop lowering). `Range` iterates
    /// without materializing since its bounds are already cheap state.
    Iter(Rc<RefCell<SeqIter>>),
    Function(Rc<FunctionValue>),
    BoundMethod(Rc<MethodValue>),
    Native(Rc<NativeFunction>),
    Class(Rc<ClassValue>),
    Instance(Rc<InstanceValue>),
    Code(Rc<CodeObject>),
    Cell(Cell),
}

#[derive(Debug)]
pub struct SeqIter {
    pub items: Vec<Value>,
    pub pos: usize,
}

impl Value {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Dict(_) => "dict",
            Self::Range(..) => "range",
            Self::Iter(_) => "iterator",
            Self::Function(_) => "function",
            Self::BoundMethod(_) => "method",
            Self::Native(_) => "builtin_function_or_method",
            Self::Class(_) => "type",
            Self::Instance(_) => "instance",
            Self::Code(_) => "code",
            Self::Cell(_) => "cell",
        }
    }

    /// Like [`Value::type_name`] but resolves to the actual class name for
    /// instances, which `AttributeError` messages need (§7 call errors).
    #[must_use]
    pub fn runtime_type_name(&self) -> String {
        match self {
            Self::Class(c) => c.name.clone(),
            Self::Instance(i) => i.class.name.clone(),
            other => other.type_name().to_owned(),
        }
    }

    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::Bytes(b) => !b.is_empty(),
            Self::List(l) => !l.borrow().is_empty(),
            Self::Tuple(t) => !t.is_empty(),
            Self::Dict(d) => !d.borrow().is_empty(),
            Self::Range(start, stop, step) => {
                if *step > 0 {
                    start < stop
                } else {
                    start > stop
                }
            }
            _ => true,
        }
    }

    #[must_use]
    pub fn py_repr(&self) -> String {
        match self {
            Self::None => "None".to_owned(),
            Self::Bool(true) => "True".to_owned(),
            Self::Bool(false) => "False".to_owned(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => format_float(*f),
            Self::Str(s) => format!("'{s}'"),
            Self::Bytes(b) => format!("b'{}'", String::from_utf8_lossy(b)),
            Self::List(l) => {
                let items: Vec<String> = l.borrow().iter().map(Value::py_repr).collect();
                format!("[{}]", items.join(", "))
            }
            Self::Tuple(t) => {
                let items: Vec<String> = t.iter().map(Value::py_repr).collect();
                if items.len() == 1 {
                    format!("({},)", items[0])
                } else {
                    format!("({})", items.join(", "))
                }
            }
            Self::Dict(d) => {
                let items: Vec<String> = d
                    .borrow()
                    .values()
                    .map(|(k, v)| format!("{}: {}", k.py_repr(), v.py_repr()))
                    .collect();
                format!("{{{}}}", items.join(", "))
            }
            Self::Range(start, stop, _) => format!("range({start}, {stop})"),
            Self::Iter(_) => "<iterator>".to_owned(),
            Self::Function(f) => format!("<function {} at 0x0>", f.name),
            Self::BoundMethod(m) => format!("<bound method {}>", m.function.name),
            Self::Native(n) => format!("<built-in function {}>", n.name),
            Self::Class(c) => format!("<class '{}'>", c.name),
            Self::Instance(i) => format!("<{} object>", i.class.name),
            Self::Code(c) => format!("<code object {}>", c.name),
            Self::Cell(_) => "<cell>".to_owned(),
        }
    }

    #[must_use]
    pub fn py_str(&self) -> String {
        match self {
            Self::Str(s) => s.to_string(),
            other => other.py_repr(),
        }
    }
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.is_finite() {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.py_str())
    }
}

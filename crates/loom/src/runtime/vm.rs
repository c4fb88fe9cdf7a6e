//! The stack VM frame (§4.5, §5): fetch-decode-execute over a code
//! object's bytecode, name resolution through fast/deref/name access,
//! control flow, the call protocol, and the class-construction protocol.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::CmpOp;
use crate::bytecode::code::{CodeObject, CO_SELF_CONTAINED};
use crate::bytecode::opcode::Opcode;
use crate::error::RuntimeError;
use crate::runtime::arith::{binary_op, unary_op};
use crate::runtime::cell::Cell;
use crate::runtime::class::{calculate_metaclass, class_prologue, ClassValue, InstanceValue};
use crate::runtime::compare::compare;
use crate::runtime::function::{bind_arguments, FunctionValue, MethodValue, NativeFunction};
use crate::runtime::value::{DictKey, SeqIter, Value};

pub type Globals = Rc<RefCell<IndexMap<String, Value>>>;

const MAX_FRAME_DEPTH: usize = 800;

/// Top-level VM context: the fixed builtin namespace and a recursion-depth
/// guard (§5's resource-discipline note; a plain counter, not a language
/// feature).
pub struct Vm {
    pub builtins: Rc<IndexMap<String, Value>>,
    depth: RefCell<usize>,
}

impl Vm {
    #[must_use]
    pub fn new(builtins: IndexMap<String, Value>) -> Self {
        Self {
            builtins: Rc::new(builtins),
            depth: RefCell::new(0),
        }
    }

    pub fn run_module(&self, code: Rc<CodeObject>) -> Result<Value, RuntimeError> {
        let globals: Globals = Rc::new(RefCell::new(IndexMap::new()));
        let nlocals = code.nlocals as usize;
        self.run_code(code, globals, vec![], vec![Value::None; nlocals])
            .map(|(value, _)| value)
    }

    /// Executes `code` as a fresh frame, returning both its `return` value
    /// and the final contents of its name-locals dict (the latter is what
    /// the class-construction protocol needs from a class body frame).
    fn run_code(
        &self,
        code: Rc<CodeObject>,
        globals: Globals,
        closure: Vec<Cell>,
        fast_locals: Vec<Value>,
    ) -> Result<(Value, IndexMap<String, Value>), RuntimeError> {
        {
            let mut depth = self.depth.borrow_mut();
            *depth += 1;
            if *depth > MAX_FRAME_DEPTH {
                *depth -= 1;
                return Err(RuntimeError::new("RecursionError", "maximum recursion depth exceeded"));
            }
        }

        let result = Frame::new(self, code, globals, closure, fast_locals).run();

        *self.depth.borrow_mut() -= 1;
        result
    }

    fn call_function_value(
        &self,
        func: &Rc<FunctionValue>,
        args: &[Value],
        kwargs: &[(String, Value)],
    ) -> Result<Value, RuntimeError> {
        let fast_locals = bind_arguments(&func.name, &func.code, &func.defaults, args, kwargs)?;
        self.run_code(func.code.clone(), func.globals.clone(), func.closure.clone(), fast_locals)
            .map(|(value, _)| value)
    }

    pub fn call_value(
        &self,
        callee: Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        match callee {
            Value::Function(func) => self.call_function_value(&func, &args, &kwargs),
            Value::BoundMethod(method) => {
                let mut full_args = Vec::with_capacity(args.len() + 1);
                full_args.push(method.receiver.clone());
                full_args.extend(args);
                self.call_function_value(&method.function, &full_args, &kwargs)
            }
            Value::Native(native) => (native.func)(&args),
            Value::Class(class) => self.instantiate(&class, &args, &kwargs),
            other => Err(RuntimeError::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    fn instantiate(
        &self,
        class: &Rc<ClassValue>,
        args: &[Value],
        kwargs: &[(String, Value)],
    ) -> Result<Value, RuntimeError> {
        let instance = Rc::new(InstanceValue {
            class: class.clone(),
            attrs: RefCell::new(IndexMap::new()),
        });
        if let Some(Value::Function(init)) = class.lookup_method("__init__") {
            let mut full_args = Vec::with_capacity(args.len() + 1);
            full_args.push(Value::Instance(instance.clone()));
            full_args.extend(args.iter().cloned());
            self.call_function_value(&init, &full_args, kwargs)?;
        }
        Ok(Value::Instance(instance))
    }

    /// `LOAD_BUILD_CLASS` protocol (§4.5): run the class body as a frame,
    /// resolve the metaclass, and build the class value from the body's
    /// final name-locals dict.
    pub fn build_class(
        &self,
        body_func: Rc<FunctionValue>,
        name: String,
        bases: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let base_classes: Vec<Rc<ClassValue>> = bases
            .iter()
            .map(|b| match b {
                Value::Class(c) => Ok(c.clone()),
                other => Err(RuntimeError::type_error(format!(
                    "bases must be classes, got '{}'",
                    other.type_name()
                ))),
            })
            .collect::<Result<_, _>>()?;
        calculate_metaclass(&base_classes)?;

        let nlocals = body_func.code.nlocals as usize;
        let (_, mut namespace) = self.run_code(
            body_func.code.clone(),
            body_func.globals.clone(),
            body_func.closure.clone(),
            vec![Value::None; nlocals],
        )?;
        for (k, v) in class_prologue(&name, body_func.doc.as_deref()) {
            namespace.entry(k).or_insert(v);
        }

        Ok(Value::Class(Rc::new(ClassValue {
            name,
            bases: base_classes,
            namespace: RefCell::new(namespace),
        })))
    }
}

struct Frame<'vm> {
    vm: &'vm Vm,
    code: Rc<CodeObject>,
    globals: Globals,
    name_locals: IndexMap<String, Value>,
    fast: Vec<Value>,
    fast_bound: Vec<bool>,
    cells: Vec<Cell>,
    stack: Vec<Value>,
    pc: usize,
}

impl<'vm> Frame<'vm> {
    fn new(
        vm: &'vm Vm,
        code: Rc<CodeObject>,
        globals: Globals,
        closure: Vec<Cell>,
        fast_locals: Vec<Value>,
    ) -> Self {
        let ncells = code.cellvars.len();
        let mut cells: Vec<Cell> = (0..ncells).map(|_| Cell::new(Value::None)).collect();
        cells.extend(closure);

        let nparams = code.argcount as usize
            + usize::from(code.flags & crate::bytecode::code::CO_VARARGS != 0)
            + usize::from(code.flags & crate::bytecode::code::CO_VARKEYWORDS != 0);
        let mut fast_bound = vec![false; fast_locals.len()];
        for bound in fast_bound.iter_mut().take(nparams.min(fast_locals.len())) {
            *bound = true;
        }

        Self {
            vm,
            name_locals: IndexMap::new(),
            fast: fast_locals,
            fast_bound,
            cells,
            code,
            globals,
            stack: Vec::new(),
            pc: 0,
        }
    }

    fn fetch(&mut self) -> Option<(Opcode, Option<i64>)> {
        let byte = *self.code.bytecode.get(self.pc)?;
        let op = Opcode::from_u8(byte).expect("unknown opcode byte");
        self.pc += 1;
        if op.has_argument() {
            let lo = self.code.bytecode[self.pc];
            let hi = self.code.bytecode[self.pc + 1];
            self.pc += 2;
            Some((op, Some(i64::from(u16::from_le_bytes([lo, hi])))))
        } else {
            Some((op, None))
        }
    }

    fn run(mut self) -> Result<(Value, IndexMap<String, Value>), RuntimeError> {
        loop {
            let Some((op, arg)) = self.fetch() else {
                return Ok((Value::None, self.name_locals));
            };
            if let Some(result) = self.dispatch(op, arg)? {
                return Ok((result, self.name_locals));
            }
        }
    }

    fn dispatch(&mut self, op: Opcode, arg: Option<i64>) -> Result<Option<Value>, RuntimeError> {
        match op {
            Opcode::PopTop => {
                self.pop();
            }
            Opcode::DupTop => {
                let top = self.peek().clone();
                self.stack.push(top);
            }
            Opcode::RotTwo => {
                let len = self.stack.len();
                self.stack.swap(len - 1, len - 2);
            }
            Opcode::LoadConst => {
                let konst = self.code.consts[arg.unwrap() as usize].clone();
                self.stack.push(Value::from(konst));
            }
            Opcode::LoadFast => {
                let slot = arg.unwrap() as usize;
                if !self.fast_bound[slot] {
                    return Err(RuntimeError::unbound_local(&self.code.varnames[slot]));
                }
                self.stack.push(self.fast[slot].clone());
            }
            Opcode::StoreFast => {
                let value = self.pop();
                let slot = arg.unwrap() as usize;
                self.fast[slot] = value;
                self.fast_bound[slot] = true;
            }
            Opcode::LoadDeref => {
                let value = self.cells[arg.unwrap() as usize].get();
                self.stack.push(value);
            }
            Opcode::StoreDeref => {
                let value = self.pop();
                self.cells[arg.unwrap() as usize].set(value);
            }
            Opcode::LoadClosure => {
                self.stack.push(Value::Cell(self.cells[arg.unwrap() as usize].clone()));
            }
            Opcode::LoadName => {
                let name = self.code.names[arg.unwrap() as usize].clone();
                let value = self
                    .name_locals
                    .get(&name)
                    .cloned()
                    .or_else(|| self.globals.borrow().get(&name).cloned())
                    .or_else(|| self.vm.builtins.get(&name).cloned())
                    .ok_or_else(|| RuntimeError::name_error(&name))?;
                self.stack.push(value);
            }
            Opcode::StoreName => {
                let value = self.pop();
                let name = self.code.names[arg.unwrap() as usize].clone();
                self.name_locals.insert(name.clone(), value.clone());
                if self.code.flags & CO_SELF_CONTAINED == 0 {
                    self.globals.borrow_mut().insert(name, value);
                }
            }
            Opcode::LoadAttr => {
                let obj = self.pop();
                let name = self.code.names[arg.unwrap() as usize].clone();
                self.stack.push(self.load_attr(&obj, &name)?);
            }
            Opcode::StoreAttr => {
                let obj = self.pop();
                let value = self.pop();
                let name = self.code.names[arg.unwrap() as usize].clone();
                self.store_attr(&obj, &name, value)?;
            }
            Opcode::BinarySubscr => {
                let index = self.pop();
                let container = self.pop();
                self.stack.push(self.subscr(&container, &index)?);
            }
            Opcode::StoreSubscr => {
                let key = self.pop();
                let container = self.pop();
                let value = self.pop();
                self.store_subscr(&container, &key, value)?;
            }
            Opcode::BinaryAdd
            | Opcode::BinarySubtract
            | Opcode::BinaryMultiply
            | Opcode::BinaryTrueDivide
            | Opcode::BinaryFloorDivide
            | Opcode::BinaryModulo
            | Opcode::BinaryPower
            | Opcode::BinaryLshift
            | Opcode::BinaryRshift
            | Opcode::BinaryOr
            | Opcode::BinaryXor
            | Opcode::BinaryAnd => {
                let r = self.pop();
                let l = self.pop();
                self.stack.push(binary_op(op, &l, &r)?);
            }
            Opcode::UnaryNot | Opcode::UnaryNegative | Opcode::UnaryPositive | Opcode::UnaryInvert => {
                let v = self.pop();
                self.stack.push(unary_op(op, &v)?);
            }
            Opcode::CompareOp => {
                let r = self.pop();
                let l = self.pop();
                let cmp = cmp_from_index(arg.unwrap());
                self.stack.push(compare(cmp, &l, &r)?);
            }
            Opcode::GetIter => {
                let value = self.pop();
                self.stack.push(make_iterator(value)?);
            }
            Opcode::ForIter => {
                let target = arg.unwrap() as usize;
                let exhausted = self.advance_iterator()?;
                if exhausted {
                    self.pop();
                    self.pc = target;
                }
            }
            Opcode::JumpForward | Opcode::JumpAbsolute => {
                self.pc = arg.unwrap() as usize;
            }
            Opcode::PopJumpIfFalse => {
                let v = self.pop();
                if !v.truthy() {
                    self.pc = arg.unwrap() as usize;
                }
            }
            Opcode::PopJumpIfTrue => {
                let v = self.pop();
                if v.truthy() {
                    self.pc = arg.unwrap() as usize;
                }
            }
            Opcode::JumpIfFalseOrPop => {
                if !self.peek().truthy() {
                    self.pc = arg.unwrap() as usize;
                } else {
                    self.pop();
                }
            }
            Opcode::JumpIfTrueOrPop => {
                if self.peek().truthy() {
                    self.pc = arg.unwrap() as usize;
                } else {
                    self.pop();
                }
            }
            Opcode::SetupLoop | Opcode::PopBlock | Opcode::LoadLocals | Opcode::BreakLoop => {
                // Decoded for byte-length fidelity with the assembler; this
                // subset has no exception table, so block bookkeeping is a
                // no-op at run time.
            }
            Opcode::BuildTuple => {
                let n = arg.unwrap() as usize;
                let items = self.pop_n(n);
                self.stack.push(Value::Tuple(Rc::from(items)));
            }
            Opcode::BuildList => {
                let n = arg.unwrap() as usize;
                let items = self.pop_n(n);
                self.stack.push(Value::List(Rc::new(RefCell::new(items))));
            }
            Opcode::BuildMap => {
                self.stack.push(Value::Dict(Rc::new(RefCell::new(IndexMap::new()))));
            }
            Opcode::StoreMap => {
                let key = self.pop();
                let value = self.pop();
                let map = self.pop();
                if let Value::Dict(d) = &map {
                    if let Some(dict_key) = DictKey::from_value(&key) {
                        d.borrow_mut().insert(dict_key, (key, value));
                    }
                }
                self.stack.push(map);
            }
            Opcode::UnpackSequence => {
                let n = arg.unwrap() as usize;
                let seq = self.pop();
                let items = sequence_items(&seq)?;
                if items.len() != n {
                    return Err(RuntimeError::type_error(format!(
                        "expected {n} values to unpack, got {}",
                        items.len()
                    )));
                }
                for item in items.into_iter().rev() {
                    self.stack.push(item);
                }
            }
            Opcode::MakeFunction => {
                let name = self.pop_str()?;
                let code = self.pop_code()?;
                self.stack.push(self.make_function(code, name, vec![]));
            }
            Opcode::MakeClosure => {
                let name = self.pop_str()?;
                let code = self.pop_code()?;
                let closure_tuple = self.pop();
                let cells = match closure_tuple {
                    Value::Tuple(items) => items
                        .iter()
                        .map(|v| match v {
                            Value::Cell(c) => c.clone(),
                            _ => unreachable!("MAKE_CLOSURE tuple must hold cells"),
                        })
                        .collect(),
                    _ => unreachable!("MAKE_CLOSURE expects a tuple of cells"),
                };
                self.stack.push(self.make_function(code, name, cells));
            }
            Opcode::LoadBuildClass => {
                self.stack.push(Value::Native(Rc::new(NativeFunction {
                    name: "__build_class__",
                    func: |_| {
                        Err(RuntimeError::new(
                            "RuntimeError",
                            "__build_class__ must be invoked through CALL_FUNCTION",
                        ))
                    },
                })));
            }
            Opcode::CallFunction => {
                let packed = arg.unwrap();
                let (args, kwargs) = self.pop_call_args(packed, false, false);
                let callee = self.pop();
                let result = self.call(callee, args, kwargs)?;
                self.stack.push(result);
            }
            Opcode::CallFunctionVar => {
                let packed = arg.unwrap();
                let (args, kwargs) = self.pop_call_args(packed, true, false);
                let callee = self.pop();
                let result = self.call(callee, args, kwargs)?;
                self.stack.push(result);
            }
            Opcode::CallFunctionKw => {
                let packed = arg.unwrap();
                let (args, kwargs) = self.pop_call_args(packed, false, true);
                let callee = self.pop();
                let result = self.call(callee, args, kwargs)?;
                self.stack.push(result);
            }
            Opcode::CallFunctionVarKw => {
                let packed = arg.unwrap();
                let (args, kwargs) = self.pop_call_args(packed, true, true);
                let callee = self.pop();
                let result = self.call(callee, args, kwargs)?;
                self.stack.push(result);
            }
            Opcode::ImportName => {
                let _fromlist = self.pop();
                let _level = self.pop();
                return Err(RuntimeError::new(
                    "ImportError",
                    "import machinery is a host collaborator and is not available in this runtime",
                ));
            }
            Opcode::ImportFrom => {
                return Err(RuntimeError::new(
                    "ImportError",
                    "import machinery is a host collaborator and is not available in this runtime",
                ));
            }
            Opcode::RaiseVarargs => {
                let exc = self.pop();
                return Err(exception_from_value(&exc));
            }
            Opcode::ReturnValue => {
                return Ok(Some(self.pop()));
            }
        }
        Ok(None)
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().expect("operand stack underflow")
    }

    fn peek(&self) -> &Value {
        self.stack.last().expect("operand stack underflow")
    }

    fn pop_n(&mut self, n: usize) -> Vec<Value> {
        let start = self.stack.len() - n;
        self.stack.split_off(start)
    }

    fn pop_str(&mut self) -> Result<String, RuntimeError> {
        match self.pop() {
            Value::Str(s) => Ok(s.to_string()),
            other => Err(RuntimeError::type_error(format!(
                "expected a string, got '{}'",
                other.type_name()
            ))),
        }
    }

    fn pop_code(&mut self) -> Result<Rc<CodeObject>, RuntimeError> {
        match self.pop() {
            Value::Code(c) => Ok(c),
            other => Err(RuntimeError::type_error(format!(
                "expected a code object, got '{}'",
                other.type_name()
            ))),
        }
    }

    fn make_function(&self, code: Rc<CodeObject>, name: String, closure: Vec<Cell>) -> Value {
        Value::Function(Rc::new(FunctionValue {
            name,
            code,
            defaults: vec![],
            globals: self.globals.clone(),
            closure,
            doc: None,
        }))
    }

    /// Unpacks a `CALL_FUNCTION*` family operand: `**kwargs` dict (if
    /// `has_kw_dict`), `*args` tuple (if `has_var`), explicit keyword
    /// pairs, then positional arguments, in stack-pop order (§4.5).
    fn pop_call_args(
        &mut self,
        packed: i64,
        has_var: bool,
        has_kw_dict: bool,
    ) -> (Vec<Value>, Vec<(String, Value)>) {
        let nkw = (packed >> 8) as usize;
        let npos = (packed & 0xFF) as usize;

        let extra_kwargs: Vec<(String, Value)> = if has_kw_dict {
            match self.pop() {
                Value::Dict(d) => d
                    .borrow()
                    .values()
                    .filter_map(|(k, v)| match k {
                        Value::Str(s) => Some((s.to_string(), v.clone())),
                        _ => None,
                    })
                    .collect(),
                _ => vec![],
            }
        } else {
            vec![]
        };
        let extra_args: Vec<Value> = if has_var {
            match self.pop() {
                Value::Tuple(items) => items.to_vec(),
                Value::List(items) => items.borrow().clone(),
                _ => vec![],
            }
        } else {
            vec![]
        };

        let mut kwargs = Vec::with_capacity(nkw);
        for _ in 0..nkw {
            let value = self.pop();
            let name = self.pop_str().unwrap_or_default();
            kwargs.push((name, value));
        }
        kwargs.reverse();
        kwargs.extend(extra_kwargs);

        let mut args = self.pop_n(npos);
        args.extend(extra_args);
        (args, kwargs)
    }

    fn load_attr(&self, obj: &Value, name: &str) -> Result<Value, RuntimeError> {
        match obj {
            Value::Instance(inst) => {
                if let Some(v) = inst.attrs.borrow().get(name) {
                    return Ok(v.clone());
                }
                match inst.class.lookup_method(name) {
                    Some(Value::Function(f)) => Ok(Value::BoundMethod(Rc::new(MethodValue {
                        receiver: obj.clone(),
                        function: f,
                    }))),
                    Some(other) => Ok(other),
                    None => Err(RuntimeError::attribute_error(&inst.class.name, name)),
                }
            }
            Value::Class(class) => class
                .lookup_method(name)
                .ok_or_else(|| RuntimeError::attribute_error(&class.name, name)),
            other => Err(RuntimeError::attribute_error(other.runtime_type_name().as_str(), name)),
        }
    }

    fn store_attr(&self, obj: &Value, name: &str, value: Value) -> Result<(), RuntimeError> {
        match obj {
            Value::Instance(inst) => {
                inst.attrs.borrow_mut().insert(name.to_owned(), value);
                Ok(())
            }
            Value::Class(class) => {
                class.namespace.borrow_mut().insert(name.to_owned(), value);
                Ok(())
            }
            other => Err(RuntimeError::attribute_error(other.runtime_type_name().as_str(), name)),
        }
    }

    fn subscr(&self, container: &Value, index: &Value) -> Result<Value, RuntimeError> {
        match container {
            Value::List(l) => {
                let l = l.borrow();
                let idx = normalize_index(index, l.len())?;
                l.get(idx).cloned().ok_or_else(|| RuntimeError::new("IndexError", "list index out of range"))
            }
            Value::Tuple(t) => {
                let idx = normalize_index(index, t.len())?;
                t.get(idx).cloned().ok_or_else(|| RuntimeError::new("IndexError", "tuple index out of range"))
            }
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let idx = normalize_index(index, chars.len())?;
                chars
                    .get(idx)
                    .map(|c| Value::Str(Rc::from(c.to_string().as_str())))
                    .ok_or_else(|| RuntimeError::new("IndexError", "string index out of range"))
            }
            Value::Dict(d) => {
                let key = DictKey::from_value(index)
                    .ok_or_else(|| RuntimeError::type_error("unhashable type"))?;
                d.borrow()
                    .get(&key)
                    .map(|(_, v)| v.clone())
                    .ok_or_else(|| RuntimeError::new("KeyError", index.py_repr()))
            }
            other => Err(RuntimeError::type_error(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            ))),
        }
    }

    fn store_subscr(&self, container: &Value, index: &Value, value: Value) -> Result<(), RuntimeError> {
        match container {
            Value::List(l) => {
                let mut l = l.borrow_mut();
                let idx = normalize_index(index, l.len())?;
                if idx >= l.len() {
                    return Err(RuntimeError::new("IndexError", "list assignment index out of range"));
                }
                l[idx] = value;
                Ok(())
            }
            Value::Dict(d) => {
                let key = DictKey::from_value(index)
                    .ok_or_else(|| RuntimeError::type_error("unhashable type"))?;
                d.borrow_mut().insert(key, (index.clone(), value));
                Ok(())
            }
            other => Err(RuntimeError::type_error(format!(
                "'{}' object does not support item assignment",
                other.type_name()
            ))),
        }
    }

    /// Advances the iterator on top of the stack, pushing the next item.
    /// Returns `true` (without pushing) when exhausted, matching
    /// `FOR_ITER`'s pop-and-jump contract.
    fn advance_iterator(&mut self) -> Result<bool, RuntimeError> {
        match self.stack.last() {
            Some(Value::Range(start, stop, step)) => {
                let (start, stop, step) = (*start, *stop, *step);
                let done = if step > 0 { start >= stop } else { start <= stop };
                if done {
                    return Ok(true);
                }
                if let Some(Value::Range(ref mut s, _, _)) = self.stack.last_mut() {
                    *s += step;
                }
                self.stack.push(Value::Int(start));
                Ok(false)
            }
            Some(Value::Iter(state)) => {
                let next = {
                    let mut state = state.borrow_mut();
                    if state.pos >= state.items.len() {
                        None
                    } else {
                        let item = state.items[state.pos].clone();
                        state.pos += 1;
                        Some(item)
                    }
                };
                match next {
                    Some(item) => {
                        self.stack.push(item);
                        Ok(false)
                    }
                    None => Ok(true),
                }
            }
            _ => Err(RuntimeError::type_error("object is not an iterator")),
        }
    }

    fn call(
        &self,
        callee: Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        if let Value::Native(native) = &callee {
            if native.name == "__build_class__" {
                let mut iter = args.into_iter();
                let func = iter.next().expect("__build_class__ requires a function");
                let name = iter.next().expect("__build_class__ requires a name");
                let bases: Vec<Value> = iter.collect();
                let Value::Function(body) = func else {
                    return Err(RuntimeError::type_error("__build_class__ expects a function body"));
                };
                let Value::Str(name) = name else {
                    return Err(RuntimeError::type_error("__build_class__ expects a name"));
                };
                return self.vm.build_class(body, name.to_string(), bases);
            }
        }
        self.vm.call_value(callee, args, kwargs)
    }
}

fn cmp_from_index(idx: i64) -> CmpOp {
    match idx {
        0 => CmpOp::Lt,
        1 => CmpOp::Le,
        2 => CmpOp::Eq,
        3 => CmpOp::Ne,
        4 => CmpOp::Gt,
        5 => CmpOp::Ge,
        6 => CmpOp::In,
        7 => CmpOp::NotIn,
        8 => CmpOp::Is,
        _ => CmpOp::IsNot,
    }
}

fn make_iterator(value: Value) -> Result<Value, RuntimeError> {
    let items = match value {
        range @ Value::Range(..) => return Ok(range),
        Value::List(l) => l.borrow().clone(),
        Value::Tuple(t) => t.to_vec(),
        Value::Str(s) => s.chars().map(|c| Value::Str(Rc::from(c.to_string().as_str()))).collect(),
        Value::Dict(d) => d.borrow().values().map(|(k, _)| k.clone()).collect(),
        other => {
            return Err(RuntimeError::type_error(format!(
                "'{}' object is not iterable",
                other.type_name()
            )))
        }
    };
    Ok(Value::Iter(Rc::new(RefCell::new(SeqIter { items, pos: 0 }))))
}

fn sequence_items(value: &Value) -> Result<Vec<Value>, RuntimeError> {
    match value {
        Value::Tuple(t) => Ok(t.to_vec()),
        Value::List(l) => Ok(l.borrow().clone()),
        other => Err(RuntimeError::type_error(format!(
            "cannot unpack non-sequence '{}'",
            other.type_name()
        ))),
    }
}

fn normalize_index(index: &Value, len: usize) -> Result<usize, RuntimeError> {
    match index {
        Value::Int(i) => {
            let idx = if *i < 0 { *i + len as i64 } else { *i };
            usize::try_from(idx).map_err(|_| RuntimeError::new("IndexError", "index out of range"))
        }
        other => Err(RuntimeError::type_error(format!(
            "indices must be integers, not '{}'",
            other.type_name()
        ))),
    }
}

fn exception_from_value(value: &Value) -> RuntimeError {
    match value {
        Value::Class(c) => RuntimeError::new(leak_str(c.name.clone()), String::new()),
        Value::Instance(i) => {
            let message = i
                .attrs
                .borrow()
                .get("args")
                .map(Value::py_str)
                .unwrap_or_default();
            RuntimeError::new(leak_str(i.class.name.clone()), message)
        }
        Value::Str(s) => RuntimeError::new("Exception", s.to_string()),
        other => RuntimeError::new("Exception", other.py_str()),
    }
}

/// Exception class names are user-defined and not known statically, but
/// `RuntimeError::exc_type` is `&'static str` to keep the common built-in
/// error paths allocation-free; a raised user exception pays one leak per
/// distinct class name, bounded by the program's own class count.
fn leak_str(s: String) -> &'static str {
    Box::leak(s.into_boxed_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::code::pack_lnotab;
    use crate::runtime::value::Const;

    fn code(
        argcount: u16,
        nlocals: u16,
        bytecode: Vec<u8>,
        consts: Vec<Const>,
        names: Vec<&str>,
        varnames: Vec<&str>,
    ) -> Rc<CodeObject> {
        let (first, lnotab) = pack_lnotab(&[(0, 1)]);
        Rc::new(CodeObject {
            argcount,
            kwonlyargcount: 0,
            nlocals,
            stacksize: 4,
            flags: 0,
            bytecode,
            consts,
            names: names.into_iter().map(String::from).collect(),
            varnames: varnames.into_iter().map(String::from).collect(),
            filename: "<test>".into(),
            name: "<module>".into(),
            firstlineno: first,
            lnotab,
            freevars: vec![],
            cellvars: vec![],
        })
    }

    #[test]
    fn runs_constant_addition_and_returns() {
        // LOAD_CONST 0; LOAD_CONST 1; BINARY_ADD; RETURN_VALUE
        let bytecode = vec![
            95, 0, 0, // LOAD_CONST 0
            95, 1, 0, // LOAD_CONST 1
            10, // BINARY_ADD
            30, // RETURN_VALUE
        ];
        let c = code(0, 0, bytecode, vec![Const::Int(2), Const::Int(3)], vec![], vec![]);
        let vm = Vm::new(IndexMap::new());
        let result = vm.run_module(c).unwrap();
        assert!(matches!(result, Value::Int(5)));
    }

    #[test]
    fn load_fast_before_store_raises_unbound_local() {
        // LOAD_FAST 0; RETURN_VALUE, with one non-parameter local.
        let bytecode = vec![97, 0, 0, 30];
        let c = code(0, 1, bytecode, vec![], vec![], vec!["x"]);
        let vm = Vm::new(IndexMap::new());
        let err = vm.run_module(c).unwrap_err();
        assert_eq!(err.exc_type, "UnboundLocalError");
    }

    #[test]
    fn name_error_on_unknown_global() {
        // LOAD_NAME 0; RETURN_VALUE
        let bytecode = vec![96, 0, 0, 30];
        let c = code(0, 0, bytecode, vec![], vec!["missing"], vec![]);
        let vm = Vm::new(IndexMap::new());
        let err = vm.run_module(c).unwrap_err();
        assert_eq!(err.exc_type, "NameError");
    }
}

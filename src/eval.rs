use std::{
    collections::HashMap,
    io::{self, BufRead, BufReader, Write},
    path::Path,
    rc::Rc,
    sync::Arc,
};

use crate::{
    ast::{FuncDef, Node, NodeKind},
    error::Error,
    parse::Parser,
    scope::{Context, Scope, SymbolTable},
    span::{Position, Span},
    system::{self, Builtin, Call},
    value::{Class, Function, Instance, Number, OpError, Value},
};

/// Why evaluation of a node stopped early.
#[derive(Debug)]
pub enum Signal {
    Return(Value),
    Break(Span),
    Continue(Span),
    Error(Error),
}

impl From<Error> for Signal {
    fn from(error: Error) -> Self {
        Signal::Error(error)
    }
}

type Eval = Result<Value, Signal>;

/// Extensions that mark a language source file. Such files must define a
/// `main` function, which runs after the top level.
pub const SOURCE_EXTENSIONS: [&str; 2] = ["jc", "jcode"];

pub fn is_source_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| SOURCE_EXTENSIONS.contains(&extension))
}

pub struct Interpreter {
    globals: Scope,
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_io(Box::new(BufReader::new(io::stdin())), Box::new(io::stdout()))
    }

    pub fn with_io(input: Box<dyn BufRead>, output: Box<dyn Write>) -> Self {
        let globals = SymbolTable::root();
        system::install(&globals);
        Interpreter {
            globals,
            input,
            output,
        }
    }

    pub fn globals(&self) -> &Scope {
        &self.globals
    }

    pub(crate) fn input(&mut self) -> &mut dyn BufRead {
        self.input.as_mut()
    }

    pub(crate) fn output(&mut self) -> &mut dyn Write {
        self.output.as_mut()
    }

    /// Lexes, parses and evaluates `source_text` in the global scope.
    ///
    /// For source files the result is whatever `main` returns; otherwise it
    /// is the list of top-level statement values.
    #[tracing::instrument(level = "debug", skip(self, source_text))]
    pub fn run(&mut self, source_name: &str, source_text: &str) -> Result<Value, Error> {
        let program = Parser::new(source_name, source_text)?.parse()?;
        // Includes share the globals, so only a `main` bound by this run counts.
        let inherited_main = self.globals.borrow().get("main");
        let context = Rc::new(Context::new(
            "<program>",
            None,
            None,
            Rc::clone(&self.globals),
        ));

        let value = match self.eval(&program, &context) {
            Ok(value) => value,
            Err(Signal::Return(value)) => return Ok(value),
            Err(Signal::Break(span)) => {
                return Err(Error::runtime(span, "'break' outside of a loop", &context));
            }
            Err(Signal::Continue(span)) => {
                return Err(Error::runtime(span, "'continue' outside of a loop", &context));
            }
            Err(Signal::Error(error)) => return Err(error),
        };
        if !is_source_file(source_name) {
            return Ok(value);
        }

        let origin = Position::start(Arc::clone(program.span.source()));
        let origin = Span::new(origin.clone(), origin);
        let main = context
            .lookup("main")
            .filter(|main| inherited_main.as_ref() != Some(main));
        let Some(main) = main else {
            return Err(Error::runtime(
                origin,
                "No 'main' function found. Every JCode program must have a 'main' function.",
                &context,
            ));
        };
        tracing::debug!(source_name, "calling main");
        self.call(&main, Vec::new(), &origin, &context)
    }

    pub fn eval(&mut self, node: &Node, context: &Rc<Context>) -> Eval {
        match &node.kind {
            NodeKind::Int(n) => Ok(Value::int(*n)),
            NodeKind::Float(n) => Ok(Value::float(*n)),
            NodeKind::String(s) => Ok(Value::string(s.as_str())),
            NodeKind::List(elements) | NodeKind::Block(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval(element, context)?);
                }
                Ok(Value::list(values))
            }
            NodeKind::VarAccess(name) => match context.lookup(name) {
                Some(value) => Ok(value),
                None => Err(Error::runtime(
                    node.span.clone(),
                    format!("'{name}' is not defined"),
                    context,
                )
                .into()),
            },
            NodeKind::VarAssign {
                name,
                ty,
                constant,
                value,
            } => {
                let value = self.eval(value, context)?;
                if let Some(ty) = ty {
                    if !value.conforms_to(*ty) {
                        return Err(Error::runtime(
                            node.span.clone(),
                            format!(
                                "Type mismatch: expected '{}', got '{}'",
                                ty.as_str(),
                                value.type_name()
                            ),
                            context,
                        )
                        .into());
                    }
                }
                context
                    .define(name, value.clone(), *constant)
                    .map_err(|_| Error::constant_reassignment(node.span.clone(), name, context))?;
                Ok(value)
            }
            NodeKind::Reassign { name, value } => {
                let value = self.eval(value, context)?;
                context
                    .assign(name, value.clone())
                    .map_err(|_| Error::constant_reassignment(node.span.clone(), name, context))?;
                Ok(value)
            }
            NodeKind::BinaryOp { op, left, right } => {
                let lhs = self.eval(left, context)?;
                let rhs = self.eval(right, context)?;
                lhs.binary(*op, &rhs).map_err(|error| {
                    let details = match error {
                        OpError::Illegal => format!(
                            "Illegal operation: '{}' {} '{}'",
                            lhs.type_name(),
                            op.symbol(),
                            rhs.type_name()
                        ),
                        other => other.to_string(),
                    };
                    let span = match error {
                        OpError::Illegal => left.span.to(&right.span),
                        _ => right.span.clone(),
                    };
                    Error::runtime(span, details, context).into()
                })
            }
            NodeKind::UnaryOp { op, operand } => {
                let value = self.eval(operand, context)?;
                value.unary(*op).map_err(|_| {
                    Error::runtime(
                        node.span.clone(),
                        format!("Illegal operation: {} '{}'", op.symbol(), value.type_name()),
                        context,
                    )
                    .into()
                })
            }
            NodeKind::If {
                branches,
                else_branch,
            } => {
                for branch in branches {
                    if self.eval(&branch.condition, context)?.is_true() {
                        let value = self.eval(&branch.body, context)?;
                        return Ok(if branch.emits_null { Value::null() } else { value });
                    }
                }
                match else_branch {
                    Some(branch) => {
                        let value = self.eval(&branch.body, context)?;
                        Ok(if branch.emits_null { Value::null() } else { value })
                    }
                    None => Ok(Value::null()),
                }
            }
            NodeKind::For {
                var,
                start,
                end,
                step,
                body,
                emits_null,
            } => {
                let from = self.bound(start, context)?;
                let to = self.bound(end, context)?;
                let step_by = match step {
                    Some(step) => {
                        let step_by = self.bound(step, context)?;
                        if step_by.is_zero() {
                            return Err(Error::runtime(
                                step.span.clone(),
                                "Loop step cannot be zero",
                                context,
                            )
                            .into());
                        }
                        step_by
                    }
                    None => Number::Int(1),
                };
                let ascending = step_by.as_f64() > 0.0;

                let mut results = Vec::new();
                let mut i = from;
                loop {
                    let keep_going = match i.compare(to) {
                        Some(ordering) if ascending => ordering.is_lt(),
                        Some(ordering) => ordering.is_gt(),
                        None => false,
                    };
                    if !keep_going {
                        break;
                    }
                    context
                        .define(var, Value::Number(i), false)
                        .map_err(|_| Error::constant_reassignment(node.span.clone(), var, context))?;
                    i = i.add(step_by);

                    match self.eval(body, context) {
                        Ok(value) if !emits_null => results.push(value),
                        Ok(_) | Err(Signal::Continue(_)) => {}
                        Err(Signal::Break(_)) => break,
                        Err(other) => return Err(other),
                    }
                }
                Ok(if *emits_null { Value::null() } else { Value::list(results) })
            }
            NodeKind::While {
                condition,
                body,
                emits_null,
            } => {
                let mut results = Vec::new();
                while self.eval(condition, context)?.is_true() {
                    match self.eval(body, context) {
                        Ok(value) if !emits_null => results.push(value),
                        Ok(_) | Err(Signal::Continue(_)) => {}
                        Err(Signal::Break(_)) => break,
                        Err(other) => return Err(other),
                    }
                }
                Ok(if *emits_null { Value::null() } else { Value::list(results) })
            }
            NodeKind::FuncDef(def) => {
                let function = Value::Function(Rc::new(Function {
                    def: Rc::clone(def),
                    closure: Rc::clone(&context.symbols),
                }));
                if let Some(name) = &def.name {
                    context
                        .define(name, function.clone(), false)
                        .map_err(|_| Error::constant_reassignment(node.span.clone(), name, context))?;
                }
                Ok(function)
            }
            NodeKind::Call { callee, args } => {
                let callee = self.eval(callee, context)?;
                let args = self.eval_all(args, context)?;
                Ok(self.call(&callee, args, &node.span, context)?)
            }
            NodeKind::Index { target, index } => {
                let value = self.eval(target, context)?;
                let position = self.eval(index, context)?;
                value.index(&position).map_err(|error| {
                    let span = match error {
                        OpError::NotIndexable(_) => target.span.clone(),
                        _ => index.span.clone(),
                    };
                    Error::runtime(span, error.to_string(), context).into()
                })
            }
            NodeKind::Return(value) => {
                let value = match value {
                    Some(value) => self.eval(value, context)?,
                    None => Value::null(),
                };
                Err(Signal::Return(value))
            }
            NodeKind::Continue => Err(Signal::Continue(node.span.clone())),
            NodeKind::Break => Err(Signal::Break(node.span.clone())),
            NodeKind::ClassDef(def) => {
                let parent = match &def.parent {
                    Some(parent) => Some(self.class_named(parent, &node.span, context)?),
                    None => None,
                };
                let methods: HashMap<String, Rc<Function>> = def
                    .methods
                    .iter()
                    .filter_map(|method| {
                        let name = method.name.clone()?;
                        Some((name, self.closure(method, context)))
                    })
                    .collect();
                let class = Value::Class(Rc::new(Class {
                    name: def.name.clone(),
                    methods,
                    parent,
                }));
                context
                    .define(&def.name, class.clone(), false)
                    .map_err(|_| Error::constant_reassignment(node.span.clone(), &def.name, context))?;
                Ok(class)
            }
            NodeKind::New { class, args } => {
                let class = self.class_named(class, &node.span, context)?;
                let args = self.eval_all(args, context)?;
                Ok(self.instantiate(&class, args, &node.span, context)?)
            }
            NodeKind::AttrAccess { object, name } => {
                let object = self.eval(object, context)?;
                Ok(self.attribute(&object, name, &node.span, context)?)
            }
            NodeKind::AttrAssign {
                object,
                name,
                value,
            } => {
                let target = self.eval(object, context)?;
                let value = self.eval(value, context)?;
                let Value::Instance(instance) = &target else {
                    return Err(Error::runtime(
                        object.span.clone(),
                        format!("Cannot set attribute '{name}' on {}", target.type_name()),
                        context,
                    )
                    .into());
                };
                instance
                    .borrow_mut()
                    .attributes
                    .insert(name.clone(), value.clone());
                Ok(value)
            }
            NodeKind::MethodCall { object, name, args } => {
                let object = self.eval(object, context)?;
                let method = self.attribute(&object, name, &node.span, context)?;
                let args = self.eval_all(args, context)?;
                Ok(self.call(&method, args, &node.span, context)?)
            }
        }
    }

    fn eval_all(&mut self, nodes: &[Node], context: &Rc<Context>) -> Result<Vec<Value>, Signal> {
        let mut values = Vec::with_capacity(nodes.len());
        for node in nodes {
            values.push(self.eval(node, context)?);
        }
        Ok(values)
    }

    fn bound(&mut self, node: &Node, context: &Rc<Context>) -> Result<Number, Signal> {
        match self.eval(node, context)? {
            Value::Number(n) => Ok(n),
            other => Err(Error::runtime(
                node.span.clone(),
                format!("Loop bounds must be numbers, got '{}'", other.type_name()),
                context,
            )
            .into()),
        }
    }

    fn closure(&self, def: &Rc<FuncDef>, context: &Context) -> Rc<Function> {
        Rc::new(Function {
            def: Rc::clone(def),
            closure: Rc::clone(&context.symbols),
        })
    }

    fn class_named(&self, name: &str, span: &Span, context: &Rc<Context>) -> Result<Rc<Class>, Error> {
        match context.lookup(name) {
            Some(Value::Class(class)) => Ok(class),
            Some(other) => Err(Error::runtime(
                span.clone(),
                format!("'{name}' is a {}, not a class", other.type_name()),
                context,
            )),
            None => Err(Error::runtime(
                span.clone(),
                format!("'{name}' is not defined"),
                context,
            )),
        }
    }

    fn attribute(
        &self,
        object: &Value,
        name: &str,
        span: &Span,
        context: &Rc<Context>,
    ) -> Result<Value, Error> {
        if let Value::Class(class) = object {
            return class.find_method(name).map(Value::Method).ok_or_else(|| {
                Error::runtime(
                    span.clone(),
                    format!("Class '{}' has no method '{name}'", class.name),
                    context,
                )
            });
        }
        let Value::Instance(instance) = object else {
            return Err(Error::runtime(
                span.clone(),
                format!("Cannot access attribute '{name}' of {}", object.type_name()),
                context,
            ));
        };
        Instance::attribute(instance, name).ok_or_else(|| {
            Error::runtime(
                span.clone(),
                format!(
                    "'{}' object has no attribute '{name}'",
                    instance.borrow().class.name
                ),
                context,
            )
        })
    }

    /// Invokes any callable value. `span` is the call site inside `caller`.
    pub fn call(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        span: &Span,
        caller: &Rc<Context>,
    ) -> Result<Value, Error> {
        match callee {
            Value::Function(function) => self.call_function(function, false, args, span, caller),
            Value::Method(method) => self.call_function(method, true, args, span, caller),
            Value::BoundMethod(bound) => {
                let mut all = Vec::with_capacity(args.len() + 1);
                all.push(Value::Instance(Rc::clone(&bound.receiver)));
                all.extend(args);
                self.call_function(&bound.method, true, all, span, caller)
            }
            Value::Builtin(builtin) => self.call_builtin(*builtin, args, span, caller),
            Value::Class(class) => self.instantiate(class, args, span, caller),
            other => Err(Error::runtime(
                span.clone(),
                format!("Cannot call a value of type '{}'", other.type_name()),
                caller,
            )),
        }
    }

    fn call_function(
        &mut self,
        function: &Function,
        is_method: bool,
        args: Vec<Value>,
        span: &Span,
        caller: &Rc<Context>,
    ) -> Result<Value, Error> {
        let name = function.name();
        let _call = tracing::trace_span!("call", callee = name, arity = args.len()).entered();

        let shown = if is_method {
            format!("<method {name}>")
        } else {
            format!("<function {name}>")
        };
        let expected = function.def.params.len() + usize::from(is_method);
        check_arity(&shown, expected, args.len(), span, caller)?;

        let context = Rc::new(Context::new(
            name,
            Some(Rc::clone(caller)),
            Some(span.start.clone()),
            SymbolTable::child(&function.closure),
        ));

        let mut args = args.into_iter();
        if is_method {
            if let Some(receiver) = args.next() {
                context
                    .define("self", receiver, false)
                    .map_err(|_| Error::constant_reassignment(span.clone(), "self", &context))?;
            }
        }
        for (param, value) in function.def.params.iter().zip(args) {
            if !value.conforms_to(param.ty) {
                return Err(Error::runtime(
                    span.clone(),
                    format!(
                        "Type mismatch: expected '{}', got '{}' for parameter '{}' of {shown}",
                        param.ty.as_str(),
                        value.type_name(),
                        param.name
                    ),
                    caller,
                ));
            }
            context
                .define(&param.name, value, false)
                .map_err(|_| Error::constant_reassignment(span.clone(), &param.name, &context))?;
        }

        match self.eval(&function.def.body, &context) {
            Ok(value) if function.def.auto_return => Ok(value),
            Ok(_) => Ok(Value::null()),
            Err(Signal::Return(value)) => Ok(value),
            Err(Signal::Break(span)) => {
                Err(Error::runtime(span, "'break' outside of a loop", &context))
            }
            Err(Signal::Continue(span)) => {
                Err(Error::runtime(span, "'continue' outside of a loop", &context))
            }
            Err(Signal::Error(error)) => Err(error),
        }
    }

    fn call_builtin(
        &mut self,
        builtin: Builtin,
        args: Vec<Value>,
        span: &Span,
        caller: &Rc<Context>,
    ) -> Result<Value, Error> {
        let shown = format!("<built-in function {}>", builtin.name());
        check_arity(&shown, builtin.params().len(), args.len(), span, caller)?;

        let context = Rc::new(Context::new(
            builtin.name(),
            Some(Rc::clone(caller)),
            Some(span.start.clone()),
            SymbolTable::child(&self.globals),
        ));
        system::call(
            self,
            builtin,
            &Call {
                args: &args,
                context: &context,
                span,
            },
        )
    }

    /// Creates an instance and runs `__init__` on it, if the class chain has
    /// one. The constructor's result is discarded.
    fn instantiate(
        &mut self,
        class: &Rc<Class>,
        args: Vec<Value>,
        span: &Span,
        caller: &Rc<Context>,
    ) -> Result<Value, Error> {
        let instance = Instance::new(Rc::clone(class));
        match class.find_method("__init__") {
            Some(init) => {
                let mut all = Vec::with_capacity(args.len() + 1);
                all.push(Value::Instance(Rc::clone(&instance)));
                all.extend(args);
                self.call_function(&init, true, all, span, caller)?;
            }
            None => check_arity(&format!("<class {}>", class.name), 0, args.len(), span, caller)?,
        }
        Ok(Value::Instance(instance))
    }
}

fn check_arity(
    callee: &str,
    expected: usize,
    given: usize,
    span: &Span,
    caller: &Context,
) -> Result<(), Error> {
    let details = if given > expected {
        format!("{} too many arguments passed into {callee}", given - expected)
    } else if given < expected {
        format!("{} too few arguments passed into {callee}", expected - given)
    } else {
        return Ok(());
    };
    Err(Error::runtime(span.clone(), details, caller))
}

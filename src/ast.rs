use std::{fmt, rc::Rc};

use crate::span::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Node { kind, span }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "not",
        }
    }
}

/// The annotations accepted on declarations and parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeName {
    Int,
    Float,
    String,
    List,
    Function,
}

impl TypeName {
    pub fn lookup(word: &str) -> Option<TypeName> {
        match word {
            "int" => Some(TypeName::Int),
            "float" => Some(TypeName::Float),
            "string" => Some(TypeName::String),
            "list" => Some(TypeName::List),
            "function" => Some(TypeName::Function),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TypeName::Int => "int",
            TypeName::Float => "float",
            TypeName::String => "string",
            TypeName::List => "list",
            TypeName::Function => "function",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeName,
    pub span: Span,
}

/// A function or method literal. Shared between the tree and every function
/// value created from it.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDef {
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub body: Node,
    pub auto_return: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: String,
    pub parent: Option<String>,
    /// Method definitions; each gets an implicit leading `self` parameter.
    pub methods: Vec<Rc<FuncDef>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub condition: Node,
    pub body: Node,
    pub emits_null: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElseBranch {
    pub body: Node,
    pub emits_null: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Node>),
    /// A statement sequence; evaluates to the list of its statement values.
    Block(Vec<Node>),
    VarAccess(String),
    VarAssign {
        name: String,
        ty: Option<TypeName>,
        constant: bool,
        value: Box<Node>,
    },
    /// `name : value` without `var`: rebinds the nearest existing binding.
    Reassign {
        name: String,
        value: Box<Node>,
    },
    BinaryOp {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Node>,
    },
    If {
        branches: Vec<Branch>,
        else_branch: Option<Box<ElseBranch>>,
    },
    For {
        var: String,
        start: Box<Node>,
        end: Box<Node>,
        step: Option<Box<Node>>,
        body: Box<Node>,
        emits_null: bool,
    },
    While {
        condition: Box<Node>,
        body: Box<Node>,
        emits_null: bool,
    },
    FuncDef(Rc<FuncDef>),
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
    },
    Index {
        target: Box<Node>,
        index: Box<Node>,
    },
    Return(Option<Box<Node>>),
    Continue,
    Break,
    ClassDef(Rc<ClassDef>),
    New {
        class: String,
        args: Vec<Node>,
    },
    AttrAccess {
        object: Box<Node>,
        name: String,
    },
    AttrAssign {
        object: Box<Node>,
        name: String,
        value: Box<Node>,
    },
    MethodCall {
        object: Box<Node>,
        name: String,
        args: Vec<Node>,
    },
}

fn write_all(f: &mut fmt::Formatter<'_>, nodes: &[Node]) -> fmt::Result {
    for node in nodes {
        write!(f, " {node}")?;
    }
    Ok(())
}

fn write_func(f: &mut fmt::Formatter<'_>, head: &str, def: &FuncDef) -> fmt::Result {
    write!(f, "({head} {}", def.name.as_deref().unwrap_or("<anonymous>"))?;
    write!(f, " (")?;
    for (i, param) in def.params.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{} {}", param.ty.as_str(), param.name)?;
    }
    write!(f, ")")?;
    if def.auto_return {
        write!(f, " =>")?;
    }
    write!(f, " {})", def.body)
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Int(n) => write!(f, "{n}"),
            NodeKind::Float(n) => write!(f, "{n:?}"),
            NodeKind::String(s) => write!(f, "{s:?}"),
            NodeKind::List(elements) => {
                write!(f, "(list")?;
                write_all(f, elements)?;
                write!(f, ")")
            }
            NodeKind::Block(statements) => {
                write!(f, "(block")?;
                write_all(f, statements)?;
                write!(f, ")")
            }
            NodeKind::VarAccess(name) => write!(f, "{name}"),
            NodeKind::VarAssign {
                name,
                ty,
                constant,
                value,
            } => {
                let head = if *constant { "const" } else { "var" };
                match ty {
                    Some(ty) => write!(f, "({head} {} {name} {value})", ty.as_str()),
                    None => write!(f, "({head} {name} {value})"),
                }
            }
            NodeKind::Reassign { name, value } => write!(f, "(set {name} {value})"),
            NodeKind::BinaryOp { op, left, right } => {
                write!(f, "({} {left} {right})", op.symbol())
            }
            NodeKind::UnaryOp { op, operand } => write!(f, "({} {operand})", op.symbol()),
            NodeKind::If {
                branches,
                else_branch,
            } => {
                write!(f, "(if")?;
                for branch in branches {
                    write!(f, " ({} {})", branch.condition, branch.body)?;
                }
                if let Some(else_branch) = else_branch {
                    write!(f, " (else {})", else_branch.body)?;
                }
                write!(f, ")")
            }
            NodeKind::For {
                var,
                start,
                end,
                step,
                body,
                ..
            } => {
                write!(f, "(for {var} {start} {end}")?;
                if let Some(step) = step {
                    write!(f, " {step}")?;
                }
                write!(f, " {body})")
            }
            NodeKind::While {
                condition, body, ..
            } => write!(f, "(while {condition} {body})"),
            NodeKind::FuncDef(def) => write_func(f, "func", def),
            NodeKind::Call { callee, args } => {
                write!(f, "(call {callee}")?;
                write_all(f, args)?;
                write!(f, ")")
            }
            NodeKind::Index { target, index } => write!(f, "(index {target} {index})"),
            NodeKind::Return(Some(value)) => write!(f, "(return {value})"),
            NodeKind::Return(None) => write!(f, "(return)"),
            NodeKind::Continue => write!(f, "(continue)"),
            NodeKind::Break => write!(f, "(break)"),
            NodeKind::ClassDef(def) => {
                write!(f, "(class {}", def.name)?;
                if let Some(parent) = &def.parent {
                    write!(f, " extends {parent}")?;
                }
                for method in &def.methods {
                    write!(f, " ")?;
                    write_func(f, "method", method)?;
                }
                write!(f, ")")
            }
            NodeKind::New { class, args } => {
                write!(f, "(new {class}")?;
                write_all(f, args)?;
                write!(f, ")")
            }
            NodeKind::AttrAccess { object, name } => write!(f, "(. {object} {name})"),
            NodeKind::AttrAssign {
                object,
                name,
                value,
            } => write!(f, "(.= {object} {name} {value})"),
            NodeKind::MethodCall { object, name, args } => {
                write!(f, "(.call {object} {name}")?;
                write_all(f, args)?;
                write!(f, ")")
            }
        }
    }
}

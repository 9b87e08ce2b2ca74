use std::{f64::consts::PI, fs, io::Write, rc::Rc};

use crate::{
    error::Error,
    eval::Interpreter,
    scope::{Context, Scope},
    span::Span,
    value::{self, Instance, Value},
};

/// Every native function the root scope knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    PrintRet,
    Input,
    InputInt,
    Clear,
    IsNum,
    IsStr,
    IsList,
    IsFun,
    Append,
    Pop,
    Extend,
    Len,
    Run,
    IsInstance,
    HasAttr,
    GetAttr,
    SetAttr,
    Str,
}

/// Global names bound to builtins. `cls` is an alias of `clear`.
const REGISTRY: [(&str, Builtin); 20] = [
    ("print", Builtin::Print),
    ("print_ret", Builtin::PrintRet),
    ("input", Builtin::Input),
    ("input_int", Builtin::InputInt),
    ("clear", Builtin::Clear),
    ("cls", Builtin::Clear),
    ("is_num", Builtin::IsNum),
    ("is_str", Builtin::IsStr),
    ("is_list", Builtin::IsList),
    ("is_fun", Builtin::IsFun),
    ("append", Builtin::Append),
    ("pop", Builtin::Pop),
    ("extend", Builtin::Extend),
    ("len", Builtin::Len),
    ("run", Builtin::Run),
    ("isinstance", Builtin::IsInstance),
    ("hasattr", Builtin::HasAttr),
    ("getattr", Builtin::GetAttr),
    ("setattr", Builtin::SetAttr),
    ("str", Builtin::Str),
];

type Native = fn(&mut Interpreter, &Call) -> Result<Value, Error>;

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::PrintRet => "print_ret",
            Builtin::Input => "input",
            Builtin::InputInt => "input_int",
            Builtin::Clear => "clear",
            Builtin::IsNum => "is_num",
            Builtin::IsStr => "is_str",
            Builtin::IsList => "is_list",
            Builtin::IsFun => "is_fun",
            Builtin::Append => "append",
            Builtin::Pop => "pop",
            Builtin::Extend => "extend",
            Builtin::Len => "len",
            Builtin::Run => "run",
            Builtin::IsInstance => "isinstance",
            Builtin::HasAttr => "hasattr",
            Builtin::GetAttr => "getattr",
            Builtin::SetAttr => "setattr",
            Builtin::Str => "str",
        }
    }

    /// Declared parameter names. Arity is checked against these before the
    /// native code runs.
    pub fn params(self) -> &'static [&'static str] {
        match self {
            Builtin::Input | Builtin::InputInt | Builtin::Clear => &[],
            Builtin::Print
            | Builtin::PrintRet
            | Builtin::IsNum
            | Builtin::IsStr
            | Builtin::IsList
            | Builtin::IsFun
            | Builtin::Str => &["value"],
            Builtin::Append => &["list", "value"],
            Builtin::Pop => &["list", "index"],
            Builtin::Extend => &["listA", "listB"],
            Builtin::Len => &["list"],
            Builtin::Run => &["path"],
            Builtin::IsInstance => &["obj", "class_or_name"],
            Builtin::HasAttr => &["obj", "attr_name"],
            Builtin::GetAttr => &["obj", "attr_name", "default"],
            Builtin::SetAttr => &["obj", "attr_name", "value"],
        }
    }

    fn native(self) -> Native {
        match self {
            Builtin::Print => print,
            Builtin::PrintRet => print_ret,
            Builtin::Input => input,
            Builtin::InputInt => input_int,
            Builtin::Clear => clear,
            Builtin::IsNum => is_num,
            Builtin::IsStr => is_str,
            Builtin::IsList => is_list,
            Builtin::IsFun => is_fun,
            Builtin::Append => append,
            Builtin::Pop => pop,
            Builtin::Extend => extend,
            Builtin::Len => len,
            Builtin::Run => run,
            Builtin::IsInstance => is_instance,
            Builtin::HasAttr => has_attr,
            Builtin::GetAttr => get_attr,
            Builtin::SetAttr => set_attr,
            Builtin::Str => to_string,
        }
    }
}

/// Arguments of one builtin invocation, already checked for arity.
pub struct Call<'a> {
    pub args: &'a [Value],
    pub context: &'a Rc<Context>,
    pub span: &'a Span,
}

impl Call<'_> {
    fn arg(&self, index: usize) -> &Value {
        &self.args[index]
    }

    fn error(&self, details: impl Into<String>) -> Error {
        Error::runtime(self.span.clone(), details, self.context)
    }

    fn attr_name(&self) -> Result<&str, Error> {
        match self.arg(1) {
            Value::String(name) => Ok(name.as_str()),
            _ => Err(self.error("Attribute name must be a string")),
        }
    }
}

/// Binds the constants and every builtin into `scope`.
pub fn install(scope: &Scope) {
    let mut symbols = scope.borrow_mut();
    let constants = [
        ("null", Value::null()),
        ("false", Value::boolean(false)),
        ("true", Value::boolean(true)),
        ("math_pi", Value::float(PI)),
    ];
    let builtins = REGISTRY.map(|(name, builtin)| (name, Value::Builtin(builtin), false));
    let constants = constants.map(|(name, value)| (name, value, true));
    for (name, value, is_constant) in constants.into_iter().chain(builtins) {
        debug_assert!(symbols.get(name).is_none(), "`{name}` is installed twice");
        let bound = symbols.set(name, value, is_constant);
        debug_assert!(bound.is_ok(), "`{name}` collides with a constant");
    }
}

pub fn call(interp: &mut Interpreter, builtin: Builtin, call: &Call) -> Result<Value, Error> {
    (builtin.native())(interp, call)
}

fn write_line(interp: &mut Interpreter, call: &Call, text: &str) -> Result<(), Error> {
    let output = interp.output();
    writeln!(output, "{text}")
        .and_then(|()| output.flush())
        .map_err(|e| call.error(format!("Could not write output: {e}")))
}

fn read_line(interp: &mut Interpreter, call: &Call) -> Result<Option<String>, Error> {
    let mut line = String::new();
    let read = interp
        .input()
        .read_line(&mut line)
        .map_err(|e| call.error(format!("Could not read input: {e}")))?;
    if read == 0 {
        return Ok(None);
    }
    let trimmed = line.trim_end_matches(['\n', '\r']).len();
    line.truncate(trimmed);
    Ok(Some(line))
}

fn print(interp: &mut Interpreter, call: &Call) -> Result<Value, Error> {
    write_line(interp, call, &call.arg(0).to_string())?;
    Ok(Value::null())
}

fn print_ret(_: &mut Interpreter, call: &Call) -> Result<Value, Error> {
    Ok(Value::string(call.arg(0).to_string()))
}

fn input(interp: &mut Interpreter, call: &Call) -> Result<Value, Error> {
    let line = read_line(interp, call)?.unwrap_or_default();
    Ok(Value::string(line))
}

fn input_int(interp: &mut Interpreter, call: &Call) -> Result<Value, Error> {
    loop {
        let Some(text) = read_line(interp, call)? else {
            return Err(call.error("Input ended before an integer was entered"));
        };
        match text.trim().parse::<i64>() {
            Ok(n) => return Ok(Value::int(n)),
            Err(_) => write_line(interp, call, &format!("'{text}' must be an integer. Try again!"))?,
        }
    }
}

fn clear(interp: &mut Interpreter, call: &Call) -> Result<Value, Error> {
    let output = interp.output();
    write!(output, "\x1b[2J\x1b[H")
        .and_then(|()| output.flush())
        .map_err(|e| call.error(format!("Could not write output: {e}")))?;
    Ok(Value::null())
}

fn is_num(_: &mut Interpreter, call: &Call) -> Result<Value, Error> {
    Ok(Value::boolean(matches!(call.arg(0), Value::Number(_))))
}

fn is_str(_: &mut Interpreter, call: &Call) -> Result<Value, Error> {
    Ok(Value::boolean(matches!(call.arg(0), Value::String(_))))
}

fn is_list(_: &mut Interpreter, call: &Call) -> Result<Value, Error> {
    Ok(Value::boolean(matches!(call.arg(0), Value::List(_))))
}

fn is_fun(_: &mut Interpreter, call: &Call) -> Result<Value, Error> {
    let is_fun = matches!(
        call.arg(0),
        Value::Function(_) | Value::Method(_) | Value::Builtin(_) | Value::BoundMethod(_)
    );
    Ok(Value::boolean(is_fun))
}

fn append(_: &mut Interpreter, call: &Call) -> Result<Value, Error> {
    let Value::List(list) = call.arg(0) else {
        return Err(call.error("First argument must be list"));
    };
    list.borrow_mut().push(call.arg(1).clone());
    Ok(Value::null())
}

fn pop(_: &mut Interpreter, call: &Call) -> Result<Value, Error> {
    let Value::List(list) = call.arg(0) else {
        return Err(call.error("First argument must be list"));
    };
    let Value::Number(index) = call.arg(1) else {
        return Err(call.error("Second argument must be number"));
    };
    let mut elements = list.borrow_mut();
    let position = value::resolve_index(elements.len(), *index)
        .map_err(|e| call.error(e.to_string()))?
        .ok_or_else(|| {
            call.error(
                "Element at this index could not be removed from list because index is out of bounds",
            )
        })?;
    Ok(elements.remove(position))
}

fn extend(_: &mut Interpreter, call: &Call) -> Result<Value, Error> {
    let Value::List(target) = call.arg(0) else {
        return Err(call.error("First argument must be list"));
    };
    let Value::List(source) = call.arg(1) else {
        return Err(call.error("Second argument must be list"));
    };
    let extra = source.borrow().clone();
    target.borrow_mut().extend(extra);
    Ok(Value::null())
}

fn len(_: &mut Interpreter, call: &Call) -> Result<Value, Error> {
    let length = match call.arg(0) {
        Value::List(list) => list.borrow().len(),
        Value::String(s) => s.chars().count(),
        _ => return Err(call.error("Argument must be list or string")),
    };
    i64::try_from(length)
        .map(Value::int)
        .map_err(|_| call.error("Length does not fit in an integer"))
}

/// Loads another source file and evaluates it in the shared global scope.
fn run(interp: &mut Interpreter, call: &Call) -> Result<Value, Error> {
    let Value::String(path) = call.arg(0) else {
        return Err(call.error("Argument must be string"));
    };
    tracing::debug!(path = %path, "loading script");
    let text = fs::read_to_string(path)
        .map_err(|e| call.error(format!("Failed to load script \"{path}\"\n{e}")))?;
    interp.run(path, &text).map_err(|e| {
        call.error(format!(
            "Failed to finish executing script \"{path}\"\n{}",
            e.render()
        ))
    })?;
    Ok(Value::null())
}

fn is_instance(_: &mut Interpreter, call: &Call) -> Result<Value, Error> {
    let Value::Instance(instance) = call.arg(0) else {
        return Ok(Value::boolean(false));
    };
    let instance = instance.borrow();
    let result = match call.arg(1) {
        Value::Class(target) => instance.class.descends_from(&target.name),
        Value::String(name) => instance.class.descends_from(name),
        _ => false,
    };
    Ok(Value::boolean(result))
}

fn has_attr(_: &mut Interpreter, call: &Call) -> Result<Value, Error> {
    let name = call.attr_name()?;
    let found = match call.arg(0) {
        Value::Instance(instance) => Instance::attribute(instance, name).is_some(),
        _ => false,
    };
    Ok(Value::boolean(found))
}

fn get_attr(_: &mut Interpreter, call: &Call) -> Result<Value, Error> {
    let name = call.attr_name()?;
    let Value::Instance(instance) = call.arg(0) else {
        return Err(call.error("Cannot get attribute of non-object"));
    };
    Ok(Instance::attribute(instance, name).unwrap_or_else(|| call.arg(2).clone()))
}

fn set_attr(_: &mut Interpreter, call: &Call) -> Result<Value, Error> {
    let name = call.attr_name()?;
    let Value::Instance(instance) = call.arg(0) else {
        return Err(call.error(format!(
            "Cannot set attribute of non-object (got {})",
            call.arg(0).type_name()
        )));
    };
    instance
        .borrow_mut()
        .attributes
        .insert(name.to_string(), call.arg(2).clone());
    Ok(Value::null())
}

fn to_string(_: &mut Interpreter, call: &Call) -> Result<Value, Error> {
    Ok(Value::string(call.arg(0).to_string()))
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        io::{self, Cursor},
    };

    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Clone, Default)]
    struct Sink(Rc<RefCell<Vec<u8>>>);

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Sink {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    fn interpreter(input: &str) -> (Interpreter, Sink) {
        let sink = Sink::default();
        let interpreter = Interpreter::with_io(
            Box::new(Cursor::new(input.to_string().into_bytes())),
            Box::new(sink.clone()),
        );
        (interpreter, sink)
    }

    fn last(interpreter: &mut Interpreter, source: &str) -> Value {
        let Value::List(values) = interpreter.run("<test>", source).unwrap() else {
            panic!("top level should produce a list");
        };
        let last = values.borrow().last().cloned();
        last.unwrap()
    }

    fn eval(source: &str) -> Value {
        let (mut interpreter, _) = interpreter("");
        last(&mut interpreter, source)
    }

    fn details(source: &str) -> String {
        let (mut interpreter, _) = interpreter("");
        interpreter.run("<test>", source).unwrap_err().details
    }

    #[test]
    fn registry_names_match_builtins() {
        for (name, builtin) in REGISTRY {
            if name != "cls" {
                assert_eq!(builtin.name(), name);
            }
        }
        assert_eq!(eval("cls"), Value::Builtin(Builtin::Clear));
    }

    #[test]
    fn installed_names_are_unique() {
        let mut names: Vec<&str> = REGISTRY.iter().map(|(name, _)| *name).collect();
        names.extend(["null", "false", "true", "math_pi"]);
        let count = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), count);
    }

    #[test]
    fn constants_are_protected() {
        assert_eq!(eval("true"), Value::int(1));
        assert_eq!(eval("null"), Value::int(0));
        assert_eq!(eval("math_pi"), Value::float(PI));
        assert_eq!(details("var true : 2"), "Cannot reassign constant 'true'");
    }

    #[test]
    fn print_writes_display_text() {
        let (mut interpreter, sink) = interpreter("");
        let result = last(&mut interpreter, "print([1, \"a\", 2.5])");
        assert_eq!(result, Value::null());
        assert_eq!(sink.text(), "1, a, 2.5\n");
        assert_eq!(
            last(&mut interpreter, "print_ret(3.0)"),
            Value::string("3.0")
        );
    }

    #[test]
    fn input_reads_lines_until_exhausted() {
        let (mut interpreter, _) = interpreter("hello\r\n");
        assert_eq!(last(&mut interpreter, "input()"), Value::string("hello"));
        assert_eq!(last(&mut interpreter, "input()"), Value::string(""));
    }

    #[test]
    fn input_int_reprompts_on_bad_input() {
        let (mut interpreter, sink) = interpreter("abc\n42\n");
        assert_eq!(last(&mut interpreter, "input_int()"), Value::int(42));
        assert_eq!(sink.text(), "'abc' must be an integer. Try again!\n");

        let error = interpreter.run("<test>", "input_int()").unwrap_err();
        assert_eq!(error.details, "Input ended before an integer was entered");
    }

    #[test]
    fn clear_emits_escape_sequence() {
        let (mut interpreter, sink) = interpreter("");
        last(&mut interpreter, "clear()");
        assert_eq!(sink.text(), "\x1b[2J\x1b[H");
    }

    #[test]
    fn type_predicates() {
        assert_eq!(
            eval("[is_num(1), is_str(\"s\"), is_list([]), is_fun(print), is_num(\"1\")]"),
            Value::list(vec![
                Value::int(1),
                Value::int(1),
                Value::int(1),
                Value::int(1),
                Value::int(0),
            ])
        );
    }

    #[test]
    fn list_builtins_mutate_in_place() {
        let source = "\
var a : [1, 2]
append(a, 3)
extend(a, a)
var p : pop(a, -1)
[len(a), p, a[0]]";
        assert_eq!(
            eval(source),
            Value::list(vec![Value::int(5), Value::int(3), Value::int(1)])
        );
        assert_eq!(eval("len(\"abc\")"), Value::int(3));
    }

    #[test]
    fn list_builtin_errors() {
        assert_eq!(details("append(1, 2)"), "First argument must be list");
        assert_eq!(details("pop([1], \"x\")"), "Second argument must be number");
        assert_eq!(
            details("pop([1], 4)"),
            "Element at this index could not be removed from list because index is out of bounds"
        );
        assert_eq!(details("extend([], 1)"), "Second argument must be list");
        assert_eq!(details("len(1)"), "Argument must be list or string");
    }

    #[test]
    fn builtin_errors_carry_a_builtin_frame() {
        let (mut interpreter, _) = interpreter("");
        let error = interpreter.run("<test>", "append(1, 2)").unwrap_err();
        assert_eq!(error.traceback.len(), 2);
        assert_eq!(error.traceback[1].label, "append");
    }

    fn script(dir: &tempfile::TempDir, name: &str, text: &str) -> String {
        let path = dir.path().join(name);
        fs::write(&path, text).unwrap();
        path.display().to_string().replace('\\', "/")
    }

    #[test]
    fn run_includes_definitions_into_the_globals() {
        let dir = tempfile::tempdir().unwrap();
        let lib = script(&dir, "lib.txt", "func helper() => 41");
        let (mut interpreter, _) = interpreter("");
        let source = format!("run(\"{lib}\")\nhelper() + 1");
        assert_eq!(last(&mut interpreter, &source), Value::int(42));
    }

    #[test]
    fn included_source_files_run_their_own_main() {
        let dir = tempfile::tempdir().unwrap();
        let lib = script(&dir, "lib.jc", "func main() => print(\"lib main\")");
        let (mut interpreter, sink) = interpreter("");
        let source = format!("func main() {{\n  run(\"{lib}\")\n  return 1\n}}");
        assert_eq!(interpreter.run("outer.jc", &source).unwrap(), Value::int(1));
        assert_eq!(sink.text(), "lib main\n");
    }

    #[test]
    fn included_source_file_without_main_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let lib = script(&dir, "lib.jc", "func helper() => 1");
        let (mut interpreter, _) = interpreter("");
        let source = format!("func main() {{\n  run(\"{lib}\")\n  return 1\n}}");
        let error = interpreter.run("outer.jc", &source).unwrap_err();
        assert!(
            error
                .details
                .starts_with(&format!("Failed to finish executing script \"{lib}\"\n")),
            "{}",
            error.details
        );
        assert!(error.details.contains("No 'main' function found."), "{}", error.details);
    }

    #[test]
    fn run_reports_missing_files() {
        let message = details("run(\"/definitely/not/here.jc\")");
        assert!(message.starts_with("Failed to load script \"/definitely/not/here.jc\"\n"));
    }

    #[test]
    fn attribute_builtins() {
        let source = "\
class Shape {
}
class Square extends Shape {
}
var s : new Square()
setattr(s, \"side\", 4)
[hasattr(s, \"side\"), getattr(s, \"side\", 0), getattr(s, \"area\", -1), isinstance(s, Shape), isinstance(s, \"Square\"), isinstance(1, Shape)]";
        assert_eq!(
            eval(source),
            Value::list(vec![
                Value::int(1),
                Value::int(4),
                Value::int(-1),
                Value::int(1),
                Value::int(1),
                Value::int(0),
            ])
        );
        assert_eq!(details("hasattr(1, 2)"), "Attribute name must be a string");
        assert_eq!(details("getattr(1, \"x\", 0)"), "Cannot get attribute of non-object");
        assert_eq!(
            details("setattr(1, \"x\", 0)"),
            "Cannot set attribute of non-object (got int)"
        );
    }

    #[test]
    fn str_uses_display_text() {
        assert_eq!(eval("str(2) + str(1.5)"), Value::string("21.5"));
    }
}

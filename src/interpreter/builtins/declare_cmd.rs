//! declare/typeset/local - Declare variables and give them attributes
//!
//! Usage:
//!   declare              - List all variables
//!   declare -p [NAME]    - Print declarations
//!   declare NAME=value   - Declare variable with value
//!   declare -a NAME      - Declare indexed array
//!   declare -A NAME      - Declare associative array
//!   declare -i NAME      - Assignments are evaluated arithmetically
//!   declare -l/-u NAME   - Lower/upper-case values on assignment
//!   declare -n NAME=ref  - Name reference
//!   declare -r NAME      - Declare readonly variable
//!   declare -x NAME      - Export variable
//!   declare -g NAME      - Declare global variable (inside functions)
//!   declare -f/-F [NAME] - Print function definitions / names
//!
//! `+` instead of `-` removes an attribute. Inside a function, declare
//! creates locals unless -g is given; `local` always does. `export` and
//! `readonly` share this machinery (see export_cmd).

use super::declare_print::{declaration_line, function_definition, print_all};
use super::{fail, write_stdout};
use crate::ast::types::{AssignmentNode, DeclareArg, DeclareNode, WordNode};
use crate::interpreter::environment::{Value, Variable};
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::runner::{ExecResult, Runner};
use crate::parser::lexer::is_valid_name;

/// One operand after expansion.
#[derive(Debug)]
pub(crate) enum Operand<'a> {
    /// `NAME`, `NAME=value`, `NAME+=value` or `NAME[i]=value` as text
    Text(String),
    /// An assignment parsed with the command, array literals included
    Assignment(&'a AssignmentNode),
}

#[derive(Debug, Default, Clone, Copy)]
struct Attrs {
    indexed: bool,
    assoc: bool,
    integer: bool,
    lower: bool,
    upper: bool,
    nameref: bool,
    readonly: bool,
    export: bool,
}

impl Attrs {
    fn matches(&self, var: &Variable) -> bool {
        (!self.indexed || matches!(var.value, Some(Value::Indexed(_))))
            && (!self.assoc || matches!(var.value, Some(Value::Assoc(_))))
            && (!self.integer || var.integer)
            && (!self.lower || var.lowercase)
            && (!self.upper || var.uppercase)
            && (!self.nameref || var.nameref)
            && (!self.readonly || var.readonly)
            && (!self.export || var.exported)
    }
}

#[derive(Debug, Default)]
struct Flags {
    on: Attrs,
    off: Attrs,
    print: bool,
    functions: bool,
    function_names: bool,
    global: bool,
}

/// Letters each variant accepts.
fn allowed_flags(variant: &str) -> &'static str {
    match variant {
        "export" => "fnp",
        "readonly" => "aAfp",
        _ => "aAfFgilnprux",
    }
}

fn parse_flag_word(variant: &str, word: &str, flags: &mut Flags) -> Result<(), String> {
    let enable = word.starts_with('-');
    for c in word[1..].chars() {
        if !allowed_flags(variant).contains(c) {
            return Err(format!("{}{}: invalid option", &word[..1], c));
        }
        let target = if enable { &mut flags.on } else { &mut flags.off };
        match c {
            'a' => target.indexed = true,
            'A' => target.assoc = true,
            'i' => target.integer = true,
            'l' => target.lower = true,
            'u' => target.upper = true,
            // `export -n` removes the export attribute.
            'n' if variant == "export" => flags.off.export = true,
            'n' => target.nameref = true,
            'r' => target.readonly = true,
            'x' => target.export = true,
            'p' => flags.print = true,
            'f' => flags.functions = true,
            'F' => flags.function_names = true,
            'g' => flags.global = true,
            _ => {}
        }
    }
    Ok(())
}

/// Split `NAME[i]+=value` into its parts.
fn split_text_operand(text: &str) -> (&str, Option<&str>, bool, Option<&str>) {
    let (lhs, value) = match text.find('=') {
        Some(eq) => (&text[..eq], Some(&text[eq + 1..])),
        None => (text, None),
    };
    let (lhs, append) = match lhs.strip_suffix('+') {
        Some(stripped) if value.is_some() => (stripped, true),
        _ => (lhs, false),
    };
    match lhs.find('[') {
        Some(open) if lhs.ends_with(']') => (&lhs[..open], Some(&lhs[open + 1..lhs.len() - 1]), append, value),
        _ => (lhs, None, append, value),
    }
}

fn apply_type_attributes(runner: &mut Runner, name: &str, flags: &Flags) {
    let var = runner.env.attributes_mut(name);
    if flags.on.indexed && !matches!(var.value, Some(Value::Indexed(_))) {
        let mut map = std::collections::BTreeMap::new();
        if let Some(Value::Scalar(s)) = var.value.take() {
            map.insert(0, s);
        }
        var.value = Some(Value::Indexed(map));
    }
    if flags.on.assoc && !matches!(var.value, Some(Value::Assoc(_))) {
        var.value = Some(Value::Assoc(indexmap::IndexMap::new()));
    }
    if flags.on.integer {
        var.integer = true;
    }
    if flags.off.integer {
        var.integer = false;
    }
    if flags.on.lower {
        var.lowercase = true;
        var.uppercase = false;
    }
    if flags.on.upper {
        var.uppercase = true;
        var.lowercase = false;
    }
    if flags.off.lower {
        var.lowercase = false;
    }
    if flags.off.upper {
        var.uppercase = false;
    }
    if flags.off.nameref {
        var.nameref = false;
    }
}

fn apply_final_attributes(runner: &mut Runner, name: &str, flags: &Flags) {
    let var = runner.env.attributes_mut(name);
    if flags.on.export {
        var.exported = true;
    }
    if flags.off.export {
        var.exported = false;
    }
    if flags.on.readonly {
        var.readonly = true;
    }
}

/// Assign the value part of a textual operand.
fn assign_text(runner: &mut Runner, name: &str, index: Option<&str>, append: bool, value: &str) -> ExecResult<()> {
    if index.is_none() && value.starts_with('(') && value.ends_with(')') {
        let source = format!("{}{}={}", name, if append { "+" } else { "" }, value);
        if let Ok(script) = crate::parser::parse(&source) {
            if let Some(assignment) = script.statements.first().and_then(|s| s.assignments.first()) {
                return runner.apply_assignment(assignment, false);
            }
        }
    }
    let node = AssignmentNode {
        name: name.to_string(),
        index: index.map(WordNode::literal),
        value: Some(WordNode::literal(value)),
        array: None,
        append,
    };
    runner.apply_assignment(&node, false)
}

fn declare_operand(runner: &mut Runner, variant: &str, flags: &Flags, local: bool, operand: &Operand<'_>) -> ExecResult<()> {
    let (name, index, append, value) = match operand {
        Operand::Text(text) => split_text_operand(text),
        Operand::Assignment(node) => (node.name.as_str(), None, node.append, None),
    };
    if !is_valid_name(name) {
        let shown = match operand {
            Operand::Text(text) => text.clone(),
            Operand::Assignment(node) => node.name.clone(),
        };
        return Err(InterpreterError::Runtime(format!("{}: `{}': not a valid identifier", variant, shown)));
    }
    let name = name.to_string();

    if local {
        runner
            .env
            .declare_local(&name)
            .map_err(|e| InterpreterError::Runtime(format!("{}: {}", variant, e)))?;
    }
    apply_type_attributes(runner, &name, flags);

    if flags.on.nameref {
        let target = match operand {
            Operand::Text(_) => value.map(str::to_string),
            Operand::Assignment(node) => match &node.value {
                Some(word) => Some(runner.expand_word_string(word)?),
                None => None,
            },
        };
        let var = runner.env.attributes_mut(&name);
        if var.readonly {
            return Err(InterpreterError::Runtime(format!("{}: readonly variable", name)));
        }
        var.nameref = true;
        if let Some(target) = target {
            var.value = Some(Value::Scalar(target));
        }
    } else {
        match operand {
            Operand::Assignment(node) => runner.apply_assignment(node, false)?,
            Operand::Text(_) => {
                if let Some(value) = value {
                    assign_text(runner, &name, index, append, value)?;
                }
            }
        }
    }
    apply_final_attributes(runner, &name, flags);
    Ok(())
}

fn print_functions(runner: &mut Runner, variant: &str, flags: &Flags, names: &[String]) -> ExecResult {
    let mut names: Vec<String> = names.to_vec();
    if names.is_empty() {
        names = runner.functions.keys().cloned().collect();
        names.sort();
    }
    let mut out = String::new();
    let mut status = 0;
    for name in &names {
        if !runner.functions.contains_key(name) {
            status = 1;
            continue;
        }
        if flags.function_names {
            out.push_str(&format!("declare -f {}\n", name));
        } else if let Some(definition) = function_definition(runner, name) {
            out.push_str(&definition);
        }
    }
    match write_stdout(runner, variant, &out)? {
        0 => Ok(status),
        failed => Ok(failed),
    }
}

fn print_variables(runner: &mut Runner, variant: &str, flags: &Flags, names: &[String]) -> ExecResult {
    let mut filter = flags.on;
    match variant {
        "export" => filter.export = true,
        "readonly" => filter.readonly = true,
        _ => {}
    }
    if names.is_empty() {
        let out = print_all(runner, |var| filter.matches(var));
        return write_stdout(runner, variant, &out);
    }
    let mut out = String::new();
    let mut status = 0;
    for name in names {
        match runner.env.get(name) {
            Some(var) => {
                out.push_str(&declaration_line(runner, name, var));
                out.push('\n');
            }
            None => {
                runner.report(format!("{}: {}: not found", variant, name));
                status = 1;
            }
        }
    }
    match write_stdout(runner, variant, &out)? {
        0 => Ok(status),
        failed => Ok(failed),
    }
}

/// Shared body of declare, typeset, local, export and readonly.
pub(crate) fn run_declare(runner: &mut Runner, variant: &str, operands: Vec<Operand<'_>>) -> ExecResult {
    let mut flags = Flags::default();
    match variant {
        "export" => flags.on.export = true,
        "readonly" => flags.on.readonly = true,
        _ => {}
    }

    let mut rest = Vec::new();
    let mut options_done = false;
    for operand in operands {
        match &operand {
            Operand::Text(text) if !options_done && text == "--" => options_done = true,
            Operand::Text(text)
                if !options_done && text.len() > 1 && (text.starts_with('-') || text.starts_with('+')) =>
            {
                if let Err(message) = parse_flag_word(variant, text, &mut flags) {
                    return fail(runner, variant, message, 2);
                }
            }
            _ => {
                options_done = true;
                rest.push(operand);
            }
        }
    }

    let in_function = runner.env.in_function();
    if variant == "local" && !in_function {
        return fail(runner, variant, "can only be used in a function", 1);
    }

    if flags.functions || flags.function_names {
        if matches!(variant, "export" | "readonly") {
            // Function attributes are accepted and have no effect.
            return Ok(0);
        }
        let names: Vec<String> = rest
            .iter()
            .map(|o| match o {
                Operand::Text(t) => t.clone(),
                Operand::Assignment(a) => a.name.clone(),
            })
            .collect();
        return print_functions(runner, variant, &flags, &names);
    }

    if flags.print || (rest.is_empty() && variant != "local") {
        let names: Vec<String> = rest
            .iter()
            .map(|o| match o {
                Operand::Text(t) => t.clone(),
                Operand::Assignment(a) => a.name.clone(),
            })
            .collect();
        return print_variables(runner, variant, &flags, &names);
    }

    let local = match variant {
        "local" => true,
        "declare" | "typeset" => in_function && !flags.global,
        _ => false,
    };
    let mut status = 0;
    for operand in &rest {
        match declare_operand(runner, variant, &flags, local, operand) {
            Ok(()) => {}
            Err(e) if e.is_recoverable() => {
                runner.report(&e);
                status = 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(status)
}

pub fn handle_declare(runner: &mut Runner, args: &[String]) -> ExecResult {
    run_declare(runner, "declare", args.iter().cloned().map(Operand::Text).collect())
}

pub fn handle_local(runner: &mut Runner, args: &[String]) -> ExecResult {
    run_declare(runner, "local", args.iter().cloned().map(Operand::Text).collect())
}

impl Runner {
    /// `declare`-family commands parsed with their assignments.
    pub(crate) fn execute_declare(&mut self, node: &DeclareNode) -> ExecResult {
        let mut operands = Vec::with_capacity(node.args.len());
        for arg in &node.args {
            match arg {
                DeclareArg::Word(word) => {
                    for field in self.expand_words(std::slice::from_ref(word))? {
                        operands.push(Operand::Text(field));
                    }
                }
                DeclareArg::Assign(assignment) => operands.push(Operand::Assignment(assignment)),
            }
        }
        log::trace!("dispatch {}: builtin", node.variant);
        run_declare(self, &node.variant, operands)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::run;
    use super::*;

    #[test]
    fn test_split_text_operand() {
        assert_eq!(split_text_operand("x"), ("x", None, false, None));
        assert_eq!(split_text_operand("x=1"), ("x", None, false, Some("1")));
        assert_eq!(split_text_operand("x+=1"), ("x", None, true, Some("1")));
        assert_eq!(split_text_operand("a[2]=v"), ("a", Some("2"), false, Some("v")));
        assert_eq!(split_text_operand("x=a=b"), ("x", None, false, Some("a=b")));
    }

    #[test]
    fn test_local_scoping() {
        let script = "x=global; f() { local x=inner; echo $x; g; }; g() { echo $x; }; f; echo $x";
        assert_eq!(run(script).1, "inner\ninner\nglobal\n");
        assert_eq!(run("f() { declare y=1; }; f; echo \"[$y]\"").1, "[]\n");
        assert_eq!(run("f() { declare -g y=1; }; f; echo \"[$y]\"").1, "[1]\n");
        let (_, _, err) = run("local z=1");
        assert!(err.contains("local: can only be used in a function"));
    }

    #[test]
    fn test_local_without_value_hides_outer() {
        assert_eq!(run("x=1; f() { local x; echo \"[$x]\"; }; f; echo $x").1, "[]\n1\n");
    }

    #[test]
    fn test_integer_and_case_attributes() {
        assert_eq!(run("declare -i n=2+3; n+=1; echo $n").1, "6\n");
        assert_eq!(run("declare -u up=abc; declare -l low=ABC; echo $up $low").1, "ABC abc\n");
    }

    #[test]
    fn test_arrays() {
        assert_eq!(run("declare -a a; echo ${#a[@]}").1, "0\n");
        assert_eq!(run("declare -A m; m[x]=1; m[y]=2; echo ${!m[@]}").1, "x y\n");
        assert_eq!(run("declare -a 'b=(p q)'; echo ${b[1]}").1, "q\n");
    }

    #[test]
    fn test_readonly_via_declare() {
        let (_, out, err) = run("declare -r c=1; c=2; echo $c");
        assert_eq!(out, "1\n");
        assert!(err.contains("c: readonly variable"));
    }

    #[test]
    fn test_nameref() {
        assert_eq!(run("target=v; declare -n ref=target; echo $ref; ref=w; echo $target").1, "v\nw\n");
        let script = "set_it() { declare -n out=$1; out=done; }; set_it result; echo $result";
        assert_eq!(run(script).1, "done\n");
    }

    #[test]
    fn test_invalid_identifier_and_option() {
        let (_, out, err) = run("declare 1x=3; echo $?");
        assert_eq!(out, "1\n");
        assert!(err.contains("`1x=3': not a valid identifier"));
        assert_eq!(run("declare -z x; echo $?").1, "2\n");
    }

    #[test]
    fn test_function_listing() {
        assert_eq!(run("f() { :; }; g() { :; }; declare -F").1, "declare -f f\ndeclare -f g\n");
        assert_eq!(run("declare -f missing; echo $?").1, "1\n");
    }

    #[test]
    fn test_builtin_form_matches_keyword_form() {
        assert_eq!(run("builtin declare x=1; echo $x").1, "1\n");
    }
}

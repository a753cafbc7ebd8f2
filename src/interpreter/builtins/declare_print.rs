//! Variable listings for `declare -p`, `export -p`, `readonly -p` and `set`.

use crate::ast::printer::{print_statement, quote_single};
use crate::interpreter::environment::{Value, Variable};
use crate::interpreter::runner::Runner;

/// Double-quote a value the way `declare -p` prints it.
pub fn double_quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Array body `([0]="a" [1]="b")`.
fn array_body(value: &Value) -> String {
    let items: Vec<String> = match value {
        Value::Indexed(map) => map.iter().map(|(i, v)| format!("[{}]={}", i, double_quote(v))).collect(),
        Value::Assoc(map) => map.iter().map(|(k, v)| format!("[{}]={}", k, double_quote(v))).collect(),
        Value::Scalar(s) => vec![format!("[0]={}", double_quote(s))],
    };
    format!("({})", items.join(" "))
}

/// `declare -FLAGS name="value"` line for one variable.
pub fn declaration_line(runner: &Runner, name: &str, var: &Variable) -> String {
    let mut flags = runner.attribute_flags(name);
    if flags.is_empty() {
        flags.push('-');
    }
    match &var.value {
        None => format!("declare -{} {}", flags, name),
        Some(Value::Scalar(s)) => format!("declare -{} {}={}", flags, name, double_quote(s)),
        Some(value) => format!("declare -{} {}={}", flags, name, array_body(value)),
    }
}

/// `name=value` line as printed by `set` with no arguments.
pub fn set_line(name: &str, value: &Value) -> String {
    match value {
        Value::Scalar(s) => {
            let safe = !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || "-_./:,+@%=".contains(c));
            if safe {
                format!("{}={}", name, s)
            } else {
                format!("{}={}", name, quote_single(s))
            }
        }
        other => format!("{}={}", name, array_body(other)),
    }
}

/// Print declarations of every visible variable that passes `filter`.
pub fn print_all<F>(runner: &Runner, filter: F) -> String
where
    F: Fn(&Variable) -> bool,
{
    let mut out = String::new();
    for name in runner.variable_names() {
        if let Some(var) = runner.env.get(&name) {
            if filter(var) {
                out.push_str(&declaration_line(runner, &name, var));
                out.push('\n');
            }
        }
    }
    out
}

/// Source text of a function definition.
pub fn function_definition(runner: &Runner, name: &str) -> Option<String> {
    let body = runner.functions.get(name)?;
    Some(format!("{} () \n{}\n", name, print_statement(body)))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::run;
    use super::*;

    #[test]
    fn test_double_quote() {
        assert_eq!(double_quote("a \"b\" $c"), "\"a \\\"b\\\" \\$c\"");
    }

    #[test]
    fn test_set_line() {
        assert_eq!(set_line("x", &Value::Scalar("plain".into())), "x=plain");
        assert_eq!(set_line("x", &Value::Scalar("a b".into())), "x='a b'");
        assert_eq!(set_line("x", &Value::Scalar(String::new())), "x=''");
    }

    #[test]
    fn test_declare_p_output() {
        assert_eq!(run("x='a b'; declare -p x").1, "declare -- x=\"a b\"\n");
        assert_eq!(run("declare -a a=(1 2); declare -p a").1, "declare -a a=([0]=\"1\" [1]=\"2\")\n");
        assert_eq!(run("declare -A m=([k]=v); declare -p m").1, "declare -A m=([k]=\"v\")\n");
        assert_eq!(run("export E=1; declare -p E").1, "declare -x E=\"1\"\n");
        assert_eq!(run("declare -ri n=5; declare -p n").1, "declare -ir n=\"5\"\n");
    }
}

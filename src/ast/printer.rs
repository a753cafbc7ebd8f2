//! AST Printer
//!
//! Renders AST nodes back into shell source. The output re-parses to an
//! equivalent tree; whitespace and quoting style are normalized.

use crate::ast::types::*;

/// Where a word is being written; decides which characters need escaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Unquoted,
    DoubleQuoted,
    /// Inside `${...}` operator words
    Braced,
    Heredoc,
}

pub fn print_script(script: &ScriptNode) -> String {
    let mut printer = Printer::default();
    printer.list(&script.statements);
    printer.finish()
}

/// Render a single statement (used for `type` output and tracing).
pub fn print_statement(statement: &StatementNode) -> String {
    let mut printer = Printer::default();
    printer.statement(statement);
    printer.finish()
}

pub fn print_word(word: &WordNode) -> String {
    word_text(word, Context::Unquoted)
}

pub fn print_arith(expr: &ArithExpr) -> String {
    match expr {
        ArithExpr::Number(n) => n.to_string(),
        ArithExpr::Variable(name) => name.clone(),
        ArithExpr::Element { name, index } => format!("{}[{}]", name, print_arith(index)),
        ArithExpr::Expansion(word) => print_word(word),
        ArithExpr::Binary { operator: ArithBinaryOperator::Comma, left, right } => {
            format!("{}, {}", print_arith(left), print_arith(right))
        }
        ArithExpr::Binary { operator, left, right } => {
            format!("{} {} {}", print_arith(left), operator.as_str(), print_arith(right))
        }
        ArithExpr::Unary { operator, operand } => {
            let inner = print_arith(operand);
            let op = operator.as_str();
            if (op == "-" || op == "+") && inner.starts_with(op) {
                format!("{} {}", op, inner)
            } else {
                format!("{}{}", op, inner)
            }
        }
        ArithExpr::Update { increment, prefix, target } => {
            let op = if *increment { "++" } else { "--" };
            if *prefix {
                format!("{}{}", op, print_lvalue(target))
            } else {
                format!("{}{}", print_lvalue(target), op)
            }
        }
        ArithExpr::Assign { operator, target, value } => {
            format!("{} {} {}", print_lvalue(target), operator.as_str(), print_arith(value))
        }
        ArithExpr::Ternary { condition, consequent, alternate } => format!(
            "{} ? {} : {}",
            print_arith(condition),
            print_arith(consequent),
            print_arith(alternate)
        ),
        ArithExpr::Group(inner) => format!("({})", print_arith(inner)),
    }
}

fn print_lvalue(target: &ArithLValue) -> String {
    match &target.index {
        Some(index) => format!("{}[{}]", target.name, print_arith(index)),
        None => target.name.clone(),
    }
}

pub fn print_test(expr: &TestExpr) -> String {
    match expr {
        TestExpr::Word(w) => word_text(w, Context::Unquoted),
        TestExpr::Unary { operator, operand } => format!("{} {}", operator.as_str(), print_word(operand)),
        TestExpr::Binary { operator, left, right } => {
            format!("{} {} {}", print_word(left), operator.as_str(), print_word(right))
        }
        TestExpr::Not(inner) => format!("! {}", print_test(inner)),
        TestExpr::And(l, r) => format!("{} && {}", print_test(l), print_test(r)),
        TestExpr::Or(l, r) => format!("{} || {}", print_test(l), print_test(r)),
        TestExpr::Group(inner) => format!("( {} )", print_test(inner)),
    }
}

fn escape_into(out: &mut String, text: &str, context: Context) {
    for c in text.chars() {
        let escape = match context {
            Context::Unquoted => matches!(
                c,
                ' ' | '\t' | '\n' | ';' | '&' | '|' | '<' | '>' | '(' | ')' | '"' | '\'' | '\\' | '`' | '$'
            ),
            Context::Braced => matches!(c, '}' | '/' | '"' | '\'' | '\\' | '`' | '$' | ' '),
            Context::DoubleQuoted => matches!(c, '"' | '\\' | '$' | '`'),
            Context::Heredoc => matches!(c, '\\' | '$' | '`'),
        };
        if escape {
            if c == '\n' {
                out.push_str("$'\\n'");
                continue;
            }
            out.push('\\');
        }
        out.push(c);
    }
}

/// Quote text so it reads back as exactly itself.
pub fn quote_single(text: &str) -> String {
    if text.chars().any(|c| c.is_control() && c != '\n' && c != '\t') || text.contains('\'') {
        let mut out = String::from("$'");
        for c in text.chars() {
            match c {
                '\'' => out.push_str("\\'"),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                '\r' => out.push_str("\\r"),
                '\x1b' => out.push_str("\\E"),
                c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
                c => out.push(c),
            }
        }
        out.push('\'');
        out
    } else {
        format!("'{}'", text)
    }
}

fn word_text(word: &WordNode, context: Context) -> String {
    let mut out = String::new();
    for part in &word.parts {
        part_into(&mut out, part, context);
    }
    out
}

fn part_into(out: &mut String, part: &WordPart, context: Context) {
    match part {
        WordPart::Literal(s) => escape_into(out, s, context),
        WordPart::SingleQuoted(s) => out.push_str(&quote_single(s)),
        WordPart::DoubleQuoted(parts) => {
            out.push('"');
            for p in parts {
                part_into(out, p, Context::DoubleQuoted);
            }
            out.push('"');
        }
        WordPart::Escaped(s) => {
            out.push('\\');
            out.push_str(s);
        }
        WordPart::Parameter(p) => out.push_str(&print_parameter(p)),
        WordPart::CommandSubstitution(c) => {
            let body = print_script(&c.body);
            out.push_str("$(");
            out.push_str(body.trim_end_matches('\n'));
            if body.contains("<<") {
                out.push('\n');
            }
            out.push(')');
        }
        WordPart::Arithmetic(expr) => {
            out.push_str("$((");
            out.push_str(&print_arith(expr));
            out.push_str("))");
        }
        WordPart::ProcessSubstitution(p) => {
            out.push(if p.direction == ProcessDirection::Input { '<' } else { '>' });
            out.push('(');
            out.push_str(print_script(&p.body).trim_end_matches('\n'));
            out.push(')');
        }
        WordPart::ExtGlob(s) => out.push_str(s),
        WordPart::BraceExpansion(b) => {
            out.push('{');
            let items: Vec<String> = b
                .items
                .iter()
                .map(|item| match item {
                    BraceItem::Word(w) => word_text(w, context),
                    BraceItem::NumberRange { start, end, step, width } => {
                        let fmt = |n: i64| format!("{:0width$}", n, width = *width);
                        match step {
                            Some(s) => format!("{}..{}..{}", fmt(*start), fmt(*end), s),
                            None => format!("{}..{}", fmt(*start), fmt(*end)),
                        }
                    }
                    BraceItem::CharRange { start, end, step } => match step {
                        Some(s) => format!("{}..{}..{}", start, end, s),
                        None => format!("{}..{}", start, end),
                    },
                })
                .collect();
            out.push_str(&items.join(","));
            out.push('}');
        }
        WordPart::Tilde(user) => {
            out.push('~');
            if let Some(u) = user {
                out.push_str(u);
            }
        }
    }
}

fn print_subscript(index: &Option<Subscript>) -> String {
    match index {
        None => String::new(),
        Some(Subscript::All) => "[@]".to_string(),
        Some(Subscript::Star) => "[*]".to_string(),
        Some(Subscript::Expr(w)) => format!("[{}]", word_text(w, Context::Braced)),
    }
}

pub fn print_parameter(p: &ParameterExpansion) -> String {
    if p.short {
        return format!("${}", p.name);
    }
    let mut out = String::from("${");
    if p.length {
        out.push('#');
    }
    if p.indirect {
        out.push('!');
    }
    out.push_str(&p.name);
    out.push_str(&print_subscript(&p.index));
    let braced = |w: &WordNode| word_text(w, Context::Braced);
    let colon = |check_empty: bool| if check_empty { ":" } else { "" };
    if let Some(op) = &p.operation {
        match op {
            ParameterOperation::Default { word, check_empty } => {
                out.push_str(&format!("{}-{}", colon(*check_empty), braced(word)))
            }
            ParameterOperation::Assign { word, check_empty } => {
                out.push_str(&format!("{}={}", colon(*check_empty), braced(word)))
            }
            ParameterOperation::Error { word, check_empty } => out.push_str(&format!(
                "{}?{}",
                colon(*check_empty),
                word.as_ref().map(braced).unwrap_or_default()
            )),
            ParameterOperation::Alternative { word, check_empty } => {
                out.push_str(&format!("{}+{}", colon(*check_empty), braced(word)))
            }
            ParameterOperation::Substring { offset, length } => {
                let offset = print_arith(offset);
                // A leading minus would read as the `:-` operator
                let sep = if offset.starts_with('-') { " " } else { "" };
                out.push_str(&format!(":{}{}", sep, offset));
                if let Some(l) = length {
                    out.push_str(&format!(":{}", print_arith(l)));
                }
            }
            ParameterOperation::RemovePattern { pattern, suffix, longest } => {
                let op = match (suffix, longest) {
                    (false, false) => "#",
                    (false, true) => "##",
                    (true, false) => "%",
                    (true, true) => "%%",
                };
                out.push_str(op);
                out.push_str(&braced(pattern));
            }
            ParameterOperation::Replace { pattern, replacement, all, anchor } => {
                out.push('/');
                if *all {
                    out.push('/');
                }
                match anchor {
                    Some(PatternAnchor::Start) => out.push('#'),
                    Some(PatternAnchor::End) => out.push('%'),
                    None => {}
                }
                out.push_str(&braced(pattern));
                if let Some(r) = replacement {
                    out.push('/');
                    out.push_str(&braced(r));
                }
            }
            ParameterOperation::CaseConvert { upper, all, pattern } => {
                let op = match (upper, all) {
                    (true, true) => "^^",
                    (true, false) => "^",
                    (false, true) => ",,",
                    (false, false) => ",",
                };
                out.push_str(op);
                if let Some(p) = pattern {
                    out.push_str(&braced(p));
                }
            }
            ParameterOperation::Transform(c) => {
                out.push('@');
                out.push(*c);
            }
            ParameterOperation::NamePrefix { star } => out.push(if *star { '*' } else { '@' }),
            ParameterOperation::Invalid(text) => out.push_str(text),
        }
    }
    out.push('}');
    out
}

#[derive(Default)]
struct Printer {
    out: String,
    indent: usize,
    /// Here-document bodies waiting for the end of the current line
    heredocs: Vec<String>,
}

impl Printer {
    fn finish(mut self) -> String {
        if !self.heredocs.is_empty() {
            self.newline();
        }
        self.out
    }

    fn write(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for body in std::mem::take(&mut self.heredocs) {
            self.out.push_str(&body);
        }
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    fn list(&mut self, statements: &[StatementNode]) {
        for statement in statements {
            self.write_indent();
            self.statement(statement);
            if statement.background {
                self.write(" &");
            }
            self.newline();
        }
    }

    fn block(&mut self, statements: &[StatementNode]) {
        self.indent += 1;
        self.list(statements);
        self.indent -= 1;
    }

    fn inline_list(&mut self, statements: &[StatementNode]) {
        for (i, statement) in statements.iter().enumerate() {
            self.statement(statement);
            if statement.background {
                self.write(" &");
            }
            if i + 1 < statements.len() {
                self.write(if statement.background { " " } else { "; " });
            }
        }
    }

    fn statement(&mut self, statement: &StatementNode) {
        let mut pieces: Vec<String> = Vec::new();
        if statement.negated {
            pieces.push("!".to_string());
        }
        for assignment in &statement.assignments {
            pieces.push(print_assignment(assignment));
        }
        if !pieces.is_empty() {
            self.write(&pieces.join(" "));
            if statement.command.is_some() || !statement.redirections.is_empty() {
                self.write(" ");
            }
        }
        if let Some(command) = &statement.command {
            self.command(command);
        }
        for (i, redirection) in statement.redirections.iter().enumerate() {
            if i > 0 || statement.command.is_some() || !statement.assignments.is_empty() {
                self.write(" ");
            }
            self.redirection(redirection);
        }
    }

    fn redirection(&mut self, r: &RedirectionNode) {
        if let Some(fd) = r.fd {
            self.write(&fd.to_string());
        }
        self.write(r.operator.as_str());
        match &r.heredoc {
            Some(heredoc) => {
                let delimiter = r.target.as_literal().unwrap_or_else(|| "EOF".to_string());
                if heredoc.quoted {
                    self.write(&format!("'{}'", delimiter));
                } else {
                    self.write(&delimiter);
                }
                let mut body = if heredoc.quoted {
                    heredoc.body.as_literal().unwrap_or_default()
                } else {
                    word_text(&heredoc.body, Context::Heredoc)
                };
                if !body.is_empty() && !body.ends_with('\n') {
                    body.push('\n');
                }
                body.push_str(&delimiter);
                body.push('\n');
                self.heredocs.push(body);
            }
            None => {
                if !matches!(r.operator, RedirectionOperator::GreatAnd | RedirectionOperator::LessAnd) {
                    self.write(" ");
                }
                self.write(&print_word(&r.target));
            }
        }
    }

    fn command(&mut self, command: &CommandNode) {
        match command {
            CommandNode::Call(call) => {
                let words: Vec<String> = call.args.iter().map(print_word).collect();
                self.write(&words.join(" "));
            }
            CommandNode::Binary(b) => {
                self.statement(&b.left);
                self.write(&format!(" {} ", b.operator.as_str()));
                self.statement(&b.right);
            }
            CommandNode::Block(b) => {
                self.write("{");
                self.newline();
                self.block(&b.body);
                self.write_indent();
                self.write("}");
            }
            CommandNode::Subshell(s) => {
                self.write("(");
                self.newline();
                self.block(&s.body);
                self.write_indent();
                self.write(")");
            }
            CommandNode::If(node) => {
                for (i, clause) in node.clauses.iter().enumerate() {
                    if i > 0 {
                        self.write_indent();
                    }
                    self.write(if i == 0 { "if " } else { "elif " });
                    self.inline_list(&clause.condition);
                    self.write("; then");
                    self.newline();
                    self.block(&clause.body);
                }
                if let Some(else_body) = &node.else_body {
                    self.write_indent();
                    self.write("else");
                    self.newline();
                    self.block(else_body);
                }
                self.write_indent();
                self.write("fi");
            }
            CommandNode::While(node) => {
                self.write(if node.until { "until " } else { "while " });
                self.inline_list(&node.condition);
                self.write("; do");
                self.newline();
                self.block(&node.body);
                self.write_indent();
                self.write("done");
            }
            CommandNode::For(node) => {
                match &node.kind {
                    ForKind::WordList { variable, words } => {
                        self.write(&format!("for {}", variable));
                        if let Some(words) = words {
                            self.write(" in");
                            for w in words {
                                self.write(" ");
                                self.write(&print_word(w));
                            }
                        }
                    }
                    ForKind::CStyle { init, condition, update } => {
                        let p = |e: &Option<ArithExpr>| e.as_ref().map(print_arith).unwrap_or_default();
                        self.write(&format!("for (({}; {}; {}))", p(init), p(condition), p(update)));
                    }
                }
                self.write("; do");
                self.newline();
                self.block(&node.body);
                self.write_indent();
                self.write("done");
            }
            CommandNode::Case(node) => {
                self.write(&format!("case {} in", print_word(&node.word)));
                self.newline();
                self.indent += 1;
                for item in &node.items {
                    self.write_indent();
                    let patterns: Vec<String> = item.patterns.iter().map(print_word).collect();
                    self.write(&format!("{})", patterns.join(" | ")));
                    self.newline();
                    self.block(&item.body);
                    self.write_indent();
                    self.write(item.terminator.as_str());
                    self.newline();
                }
                self.indent -= 1;
                self.write_indent();
                self.write("esac");
            }
            CommandNode::FunctionDecl(f) => {
                self.write(&format!("{}() ", f.name));
                self.statement(&f.body);
            }
            CommandNode::Arithmetic(a) => self.write(&format!("(({}))", print_arith(&a.expression))),
            CommandNode::Test(t) => self.write(&format!("[[ {} ]]", print_test(&t.expression))),
            CommandNode::Declare(d) => {
                self.write(&d.variant);
                for arg in &d.args {
                    self.write(" ");
                    match arg {
                        DeclareArg::Word(w) => self.write(&print_word(w)),
                        DeclareArg::Assign(a) => self.write(&print_assignment(a)),
                    }
                }
            }
            CommandNode::Let(l) => {
                self.write("let");
                for arg in &l.args {
                    self.write(" ");
                    self.write(&print_word(arg));
                }
            }
            CommandNode::Coproc(c) => {
                self.write("coproc ");
                if let Some(name) = &c.name {
                    self.write(name);
                    self.write(" ");
                }
                self.statement(&c.body);
            }
        }
    }
}

fn print_assignment(a: &AssignmentNode) -> String {
    let mut out = a.name.clone();
    if let Some(index) = &a.index {
        out.push('[');
        out.push_str(&word_text(index, Context::Braced));
        out.push(']');
    }
    out.push_str(if a.append { "+=" } else { "=" });
    if let Some(array) = &a.array {
        let elements: Vec<String> = array
            .iter()
            .map(|e| match &e.index {
                Some(i) => format!("[{}]={}", word_text(i, Context::Braced), print_word(&e.value)),
                None => print_word(&e.value),
            })
            .collect();
        out.push('(');
        out.push_str(&elements.join(" "));
        out.push(')');
    } else if let Some(value) = &a.value {
        out.push_str(&print_word(value));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    /// Printing is stable: print(parse(print(parse(s)))) == print(parse(s)).
    fn assert_round_trip(source: &str) {
        let first = print_script(&parse(source).unwrap());
        let reparsed = parse(&first).unwrap_or_else(|e| panic!("reparse of {:?} failed: {}", first, e));
        assert_eq!(print_script(&reparsed), first, "source: {:?}", source);
        assert_eq!(reparsed, parse(&first).unwrap());
    }

    #[test]
    fn test_print_simple() {
        assert_eq!(print_script(&parse("echo   hello    world").unwrap()), "echo hello world\n");
        assert_eq!(print_script(&parse("a=1 b=2").unwrap()), "a=1 b=2\n");
    }

    #[test]
    fn test_print_quotes() {
        assert_eq!(print_script(&parse("echo 'a b' \"c $d\" e\\ f").unwrap()), "echo 'a b' \"c $d\" e\\ f\n");
    }

    #[test]
    fn test_print_compound() {
        let out = print_script(&parse("if a; then b; else c; fi").unwrap());
        assert_eq!(out, "if a; then\n  b\nelse\n  c\nfi\n");
    }

    #[test]
    fn test_print_arith() {
        assert_eq!(print_script(&parse("echo $(( (1+2)*3 ))").unwrap()), "echo $(((1 + 2) * 3))\n");
        assert_eq!(print_script(&parse("((i++))").unwrap()), "((i++))\n");
    }

    #[test]
    fn test_print_heredoc() {
        let out = print_script(&parse("cat <<EOF | sort\nb $x\na\nEOF\necho done").unwrap());
        assert_eq!(out, "cat <<EOF | sort\nb $x\na\nEOF\necho done\n");
    }

    #[test]
    fn test_round_trips() {
        for source in [
            "echo ${X:-bar} ${F%%.*} ${s//a/b} ${#arr[@]} ${!ref} ${x:1:2} ${x: -1}",
            "for f in *.txt; do echo \"$f\"; done",
            "for ((i = 0; i < 3; i++)); do echo $i; done",
            "case $x in a|b) echo ab;; *) echo other;& esac",
            "f() { local a=(1 2 [5]=x); echo ${a[@]}; }",
            "while read -r line; do echo \"$line\"; done < input > output 2>&1",
            "[[ -f $x && ( $y == a* || ! -z $z ) ]] && echo ok",
            "a | b |& c && ! d || e &",
            "x=$(echo $(echo nested)) y=`date`",
            "echo {a,b}{1..3} ~/x $'tab\\there'",
            "cat <<-'END'\n\tliteral $x\n\tEND\n",
            "until false; do break; done; { echo g; } > out",
        ] {
            assert_round_trip(source);
        }
    }
}

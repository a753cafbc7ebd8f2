//! Abstract Syntax Tree (AST) Types
//!
//! This module defines the complete AST produced by the parser. Nodes are
//! immutable once built; function bodies are shared read-only through `Arc`
//! so every call site sees the same tree.

use std::sync::Arc;

// =============================================================================
// BASE TYPES
// =============================================================================

/// Position information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self { offset, line, column }
    }
}

// =============================================================================
// SCRIPT & STATEMENTS
// =============================================================================

/// Root node: a complete script
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScriptNode {
    pub statements: Vec<StatementNode>,
}

/// How a statement was terminated in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Terminator {
    #[default]
    None,
    Semicolon,
    Newline,
    Amp,
}

/// A command plus everything that decorates it: prefix assignments,
/// redirections, `!` negation and `&` backgrounding.
///
/// A statement with assignments and no command mutates the enclosing scope
/// and never spawns a process.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatementNode {
    pub command: Option<CommandNode>,
    pub assignments: Vec<AssignmentNode>,
    pub redirections: Vec<RedirectionNode>,
    pub negated: bool,
    pub background: bool,
    pub terminator: Terminator,
    pub position: Position,
}

impl StatementNode {
    pub fn new(command: CommandNode, position: Position) -> Self {
        Self {
            command: Some(command),
            position,
            ..Default::default()
        }
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Union of all command types
#[derive(Debug, Clone, PartialEq)]
pub enum CommandNode {
    Call(CallNode),
    Binary(BinaryNode),
    Block(BlockNode),
    Subshell(SubshellNode),
    If(IfNode),
    While(WhileNode),
    For(ForNode),
    Case(CaseNode),
    FunctionDecl(FunctionDeclNode),
    Arithmetic(ArithmeticCommandNode),
    Test(TestClauseNode),
    Declare(DeclareNode),
    Let(LetNode),
    Coproc(CoprocNode),
}

/// Simple command: program and arguments. `args[0]` is the program.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallNode {
    pub args: Vec<WordNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    And,     // &&
    Or,      // ||
    Pipe,    // |
    PipeAll, // |&
}

impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "&&",
            Self::Or => "||",
            Self::Pipe => "|",
            Self::PipeAll => "|&",
        }
    }
}

/// `left op right`. `&&`/`||` chains nest to the left; pipelines too.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryNode {
    pub operator: BinaryOperator,
    pub left: Box<StatementNode>,
    pub right: Box<StatementNode>,
}

/// Command group: { ...; }
#[derive(Debug, Clone, PartialEq)]
pub struct BlockNode {
    pub body: Vec<StatementNode>,
}

/// Subshell: ( ... )
#[derive(Debug, Clone, PartialEq)]
pub struct SubshellNode {
    pub body: Vec<StatementNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfNode {
    pub clauses: Vec<IfClause>,
    pub else_body: Option<Vec<StatementNode>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfClause {
    pub condition: Vec<StatementNode>,
    pub body: Vec<StatementNode>,
}

/// while/until loop
#[derive(Debug, Clone, PartialEq)]
pub struct WhileNode {
    pub condition: Vec<StatementNode>,
    pub body: Vec<StatementNode>,
    pub until: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForNode {
    pub kind: ForKind,
    pub body: Vec<StatementNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForKind {
    /// for NAME [in WORDS]; words of None iterate over "$@"
    WordList {
        variable: String,
        words: Option<Vec<WordNode>>,
    },
    /// for ((init; cond; update))
    CStyle {
        init: Option<ArithExpr>,
        condition: Option<ArithExpr>,
        update: Option<ArithExpr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseNode {
    pub word: WordNode,
    pub items: Vec<CaseItemNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseItemNode {
    pub patterns: Vec<WordNode>,
    pub body: Vec<StatementNode>,
    pub terminator: CaseTerminator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseTerminator {
    Break,            // ;;
    FallThrough,      // ;&
    ContinueMatching, // ;;&
}

impl CaseTerminator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Break => ";;",
            Self::FallThrough => ";&",
            Self::ContinueMatching => ";;&",
        }
    }
}

/// Function declaration. The body is shared by every call site.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclNode {
    pub name: String,
    pub body: Arc<StatementNode>,
}

/// Arithmetic command: (( expr ))
#[derive(Debug, Clone, PartialEq)]
pub struct ArithmeticCommandNode {
    pub expression: ArithExpr,
}

/// Test clause: [[ expr ]]
#[derive(Debug, Clone, PartialEq)]
pub struct TestClauseNode {
    pub expression: TestExpr,
}

/// declare / local / export / readonly / typeset / nameref
#[derive(Debug, Clone, PartialEq)]
pub struct DeclareNode {
    pub variant: String,
    pub args: Vec<DeclareArg>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclareArg {
    Word(WordNode),
    Assign(AssignmentNode),
}

/// let EXPR...
#[derive(Debug, Clone, PartialEq)]
pub struct LetNode {
    pub args: Vec<WordNode>,
}

/// coproc [NAME] command
#[derive(Debug, Clone, PartialEq)]
pub struct CoprocNode {
    pub name: Option<String>,
    pub body: Box<StatementNode>,
}

// =============================================================================
// ASSIGNMENTS
// =============================================================================

/// Variable assignment: VAR=value, VAR+=value, VAR[i]=value, VAR=(a b c)
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentNode {
    pub name: String,
    pub index: Option<WordNode>,
    pub value: Option<WordNode>,
    pub array: Option<Vec<ArrayElement>>,
    pub append: bool,
}

/// One element of an array literal, optionally with an explicit `[key]=`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayElement {
    pub index: Option<WordNode>,
    pub value: WordNode,
}

// =============================================================================
// REDIRECTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RedirectionNode {
    /// Explicit file descriptor (default depends on operator)
    pub fd: Option<u32>,
    pub operator: RedirectionOperator,
    pub target: WordNode,
    /// Captured body for << and <<-
    pub heredoc: Option<HereDocNode>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectionOperator {
    Less,      // <
    Great,     // >
    DGreat,    // >>
    Clobber,   // >|
    LessGreat, // <>
    GreatAnd,  // >&
    LessAnd,   // <&
    AndGreat,  // &>
    AndDGreat, // &>>
    DLess,     // <<
    DLessDash, // <<-
    TLess,     // <<<
}

impl RedirectionOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Less => "<",
            Self::Great => ">",
            Self::DGreat => ">>",
            Self::Clobber => ">|",
            Self::LessGreat => "<>",
            Self::GreatAnd => ">&",
            Self::LessAnd => "<&",
            Self::AndGreat => "&>",
            Self::AndDGreat => "&>>",
            Self::DLess => "<<",
            Self::DLessDash => "<<-",
            Self::TLess => "<<<",
        }
    }

    /// File descriptor the operator applies to when none is given.
    pub fn default_fd(&self) -> u32 {
        match self {
            Self::Less | Self::LessGreat | Self::LessAnd | Self::DLess | Self::DLessDash | Self::TLess => 0,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HereDocNode {
    pub body: WordNode,
    pub strip_tabs: bool,
    /// Quoted delimiter means no expansion
    pub quoted: bool,
}

// =============================================================================
// WORDS
// =============================================================================

/// A sequence of parts forming one shell word. Never empty when produced by
/// the parser.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WordNode {
    pub parts: Vec<WordPart>,
}

impl WordNode {
    pub fn new(parts: Vec<WordPart>) -> Self {
        Self { parts }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self { parts: vec![WordPart::Literal(value.into())] }
    }

    /// The literal text of the word when it contains nothing to expand.
    pub fn as_literal(&self) -> Option<String> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                WordPart::Literal(s) => out.push_str(s),
                _ => return None,
            }
        }
        Some(out)
    }

    /// True if any part is quoted (affects heredoc delimiters and `"$@"`).
    pub fn has_quotes(&self) -> bool {
        self.parts.iter().any(|p| {
            matches!(p, WordPart::SingleQuoted(_) | WordPart::DoubleQuoted(_) | WordPart::Escaped(_))
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WordPart {
    Literal(String),
    SingleQuoted(String),
    DoubleQuoted(Vec<WordPart>),
    /// Backslash-escaped character(s), always quoted
    Escaped(String),
    Parameter(ParameterExpansion),
    CommandSubstitution(CommandSubstitutionPart),
    Arithmetic(ArithExpr),
    ProcessSubstitution(ProcessSubstitutionPart),
    /// @(..) *(..) +(..) ?(..) !(..) kept as pattern text
    ExtGlob(String),
    BraceExpansion(BraceExpansionPart),
    /// ~ or ~user
    Tilde(Option<String>),
}

// =============================================================================
// PARAMETER EXPANSION
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterExpansion {
    pub name: String,
    pub index: Option<Subscript>,
    /// $name rather than ${name}
    pub short: bool,
    /// ${#name}
    pub length: bool,
    /// ${!name}
    pub indirect: bool,
    pub operation: Option<ParameterOperation>,
}

impl ParameterExpansion {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
            short: true,
            length: false,
            indirect: false,
            operation: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Subscript {
    /// [@]
    All,
    /// [*]
    Star,
    Expr(WordNode),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterOperation {
    /// ${x:-w} / ${x-w}
    Default { word: WordNode, check_empty: bool },
    /// ${x:=w} / ${x=w}
    Assign { word: WordNode, check_empty: bool },
    /// ${x:?w} / ${x?w}
    Error { word: Option<WordNode>, check_empty: bool },
    /// ${x:+w} / ${x+w}
    Alternative { word: WordNode, check_empty: bool },
    /// ${x:offset:length}
    Substring { offset: ArithExpr, length: Option<ArithExpr> },
    /// ${x#p} ${x##p} ${x%p} ${x%%p}
    RemovePattern { pattern: WordNode, suffix: bool, longest: bool },
    /// ${x/p/r} ${x//p/r} ${x/#p/r} ${x/%p/r}
    Replace {
        pattern: WordNode,
        replacement: Option<WordNode>,
        all: bool,
        anchor: Option<PatternAnchor>,
    },
    /// ${x^} ${x^^} ${x,} ${x,,}
    CaseConvert { upper: bool, all: bool, pattern: Option<WordNode> },
    /// ${x@Q} and friends
    Transform(char),
    /// ${!prefix*} / ${!prefix@}
    NamePrefix { star: bool },
    /// Parsed but rejected when evaluated
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternAnchor {
    Start,
    End,
}

// =============================================================================
// SUBSTITUTIONS
// =============================================================================

/// Command substitution: $(cmd) or `cmd`
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSubstitutionPart {
    pub body: ScriptNode,
    pub backquote: bool,
}

/// Process substitution: <(cmd) or >(cmd)
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSubstitutionPart {
    pub body: ScriptNode,
    pub direction: ProcessDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessDirection {
    Input,  // <(...)
    Output, // >(...)
}

// =============================================================================
// BRACE EXPANSION
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct BraceExpansionPart {
    pub items: Vec<BraceItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BraceItem {
    Word(WordNode),
    NumberRange { start: i64, end: i64, step: Option<i64>, width: usize },
    CharRange { start: char, end: char, step: Option<i64> },
}

// =============================================================================
// ARITHMETIC
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ArithExpr {
    Number(i64),
    Variable(String),
    Element { name: String, index: Box<ArithExpr> },
    /// $x, ${x...}, $(cmd) inside arithmetic; the result is re-evaluated
    Expansion(WordNode),
    Binary { operator: ArithBinaryOperator, left: Box<ArithExpr>, right: Box<ArithExpr> },
    Unary { operator: ArithUnaryOperator, operand: Box<ArithExpr> },
    Update { increment: bool, prefix: bool, target: ArithLValue },
    Assign { operator: ArithAssignOperator, target: ArithLValue, value: Box<ArithExpr> },
    Ternary { condition: Box<ArithExpr>, consequent: Box<ArithExpr>, alternate: Box<ArithExpr> },
    Group(Box<ArithExpr>),
}

/// Assignable arithmetic operand: `x` or `x[i]`
#[derive(Debug, Clone, PartialEq)]
pub struct ArithLValue {
    pub name: String,
    pub index: Option<Box<ArithExpr>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithBinaryOperator {
    Add, Sub, Mul, Div, Mod, Pow,
    LShift, RShift,
    Lt, Le, Gt, Ge, Eq, Ne,
    BitAnd, BitOr, BitXor,
    LogAnd, LogOr,
    Comma,
}

impl ArithBinaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::LShift => "<<",
            Self::RShift => ">>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::LogAnd => "&&",
            Self::LogOr => "||",
            Self::Comma => ",",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithUnaryOperator {
    Neg, Pos, Not, BitNot,
}

impl ArithUnaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Pos => "+",
            Self::Not => "!",
            Self::BitNot => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithAssignOperator {
    Assign, Add, Sub, Mul, Div, Mod, LShift, RShift, And, Or, Xor,
}

impl ArithAssignOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assign => "=",
            Self::Add => "+=",
            Self::Sub => "-=",
            Self::Mul => "*=",
            Self::Div => "/=",
            Self::Mod => "%=",
            Self::LShift => "<<=",
            Self::RShift => ">>=",
            Self::And => "&=",
            Self::Or => "|=",
            Self::Xor => "^=",
        }
    }

    /// The binary operator a compound assignment applies.
    pub fn binary(&self) -> Option<ArithBinaryOperator> {
        Some(match self {
            Self::Assign => return None,
            Self::Add => ArithBinaryOperator::Add,
            Self::Sub => ArithBinaryOperator::Sub,
            Self::Mul => ArithBinaryOperator::Mul,
            Self::Div => ArithBinaryOperator::Div,
            Self::Mod => ArithBinaryOperator::Mod,
            Self::LShift => ArithBinaryOperator::LShift,
            Self::RShift => ArithBinaryOperator::RShift,
            Self::And => ArithBinaryOperator::BitAnd,
            Self::Or => ArithBinaryOperator::BitOr,
            Self::Xor => ArithBinaryOperator::BitXor,
        })
    }
}

// =============================================================================
// TEST EXPRESSIONS (for [[ ]])
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum TestExpr {
    Word(WordNode),
    Unary { operator: UnaryTestOperator, operand: WordNode },
    Binary { operator: BinaryTestOperator, left: WordNode, right: WordNode },
    Not(Box<TestExpr>),
    And(Box<TestExpr>, Box<TestExpr>),
    Or(Box<TestExpr>, Box<TestExpr>),
    Group(Box<TestExpr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryTestOperator {
    Exists,       // -e -a
    RegularFile,  // -f
    Directory,    // -d
    Readable,     // -r
    Writable,     // -w
    Executable,   // -x
    NonEmptyFile, // -s
    Symlink,      // -L -h
    BlockDevice,  // -b
    CharDevice,   // -c
    NamedPipe,    // -p
    Socket,       // -S
    Terminal,     // -t
    SetGid,       // -g
    SetUid,       // -u
    Sticky,       // -k
    OwnedByUser,  // -O
    OwnedByGroup, // -G
    EmptyString,  // -z
    NonEmptyString, // -n
    VarSet,       // -v
    OptionSet,    // -o
}

impl UnaryTestOperator {
    pub fn from_str(op: &str) -> Option<Self> {
        Some(match op {
            "-e" | "-a" => Self::Exists,
            "-f" => Self::RegularFile,
            "-d" => Self::Directory,
            "-r" => Self::Readable,
            "-w" => Self::Writable,
            "-x" => Self::Executable,
            "-s" => Self::NonEmptyFile,
            "-L" | "-h" => Self::Symlink,
            "-b" => Self::BlockDevice,
            "-c" => Self::CharDevice,
            "-p" => Self::NamedPipe,
            "-S" => Self::Socket,
            "-t" => Self::Terminal,
            "-g" => Self::SetGid,
            "-u" => Self::SetUid,
            "-k" => Self::Sticky,
            "-O" => Self::OwnedByUser,
            "-G" => Self::OwnedByGroup,
            "-z" => Self::EmptyString,
            "-n" => Self::NonEmptyString,
            "-v" => Self::VarSet,
            "-o" => Self::OptionSet,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exists => "-e",
            Self::RegularFile => "-f",
            Self::Directory => "-d",
            Self::Readable => "-r",
            Self::Writable => "-w",
            Self::Executable => "-x",
            Self::NonEmptyFile => "-s",
            Self::Symlink => "-L",
            Self::BlockDevice => "-b",
            Self::CharDevice => "-c",
            Self::NamedPipe => "-p",
            Self::Socket => "-S",
            Self::Terminal => "-t",
            Self::SetGid => "-g",
            Self::SetUid => "-u",
            Self::Sticky => "-k",
            Self::OwnedByUser => "-O",
            Self::OwnedByGroup => "-G",
            Self::EmptyString => "-z",
            Self::NonEmptyString => "-n",
            Self::VarSet => "-v",
            Self::OptionSet => "-o",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryTestOperator {
    StrEq,     // = ==
    StrNe,     // !=
    Match,     // =~
    StrLt,     // <
    StrGt,     // >
    NumEq,     // -eq
    NumNe,     // -ne
    NumLt,     // -lt
    NumLe,     // -le
    NumGt,     // -gt
    NumGe,     // -ge
    NewerThan, // -nt
    OlderThan, // -ot
    SameFile,  // -ef
}

impl BinaryTestOperator {
    pub fn from_str(op: &str) -> Option<Self> {
        Some(match op {
            "=" | "==" => Self::StrEq,
            "!=" => Self::StrNe,
            "=~" => Self::Match,
            "<" => Self::StrLt,
            ">" => Self::StrGt,
            "-eq" => Self::NumEq,
            "-ne" => Self::NumNe,
            "-lt" => Self::NumLt,
            "-le" => Self::NumLe,
            "-gt" => Self::NumGt,
            "-ge" => Self::NumGe,
            "-nt" => Self::NewerThan,
            "-ot" => Self::OlderThan,
            "-ef" => Self::SameFile,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StrEq => "==",
            Self::StrNe => "!=",
            Self::Match => "=~",
            Self::StrLt => "<",
            Self::StrGt => ">",
            Self::NumEq => "-eq",
            Self::NumNe => "-ne",
            Self::NumLt => "-lt",
            Self::NumLe => "-le",
            Self::NumGt => "-gt",
            Self::NumGe => "-ge",
            Self::NewerThan => "-nt",
            Self::OlderThan => "-ot",
            Self::SameFile => "-ef",
        }
    }
}

//! Ordered statement classification
//!
//! Every non-empty line is matched against [`RULES`] from top to bottom and the
//! first rule whose predicate accepts it handles the line. Lines no rule accepts
//! fall through to [`StatementKind::Unrecognized`] and are ignored.
//!
//! The order is significant:
//! - class definitions are recognized before anything else so member lines are
//!   never mistaken for local declarations
//! - scope braces are tracked even outside the entry function, but only have
//!   memory effects inside it
//! - `new` initializers are claimed before the smart-pointer rule, which in turn
//!   comes before generic assignments and declarations

use super::engine::Interpreter;
use super::errors::ScriptError;
use super::lexer::{first_token, new_expression, parse_declaration, split_assignment, tokenize};
use super::types::mentions_smart_pointer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    ClassHeader,
    ClassBody,
    EntryFunction,
    Return,
    ScopeReenter,
    ScopeClose,
    ScopeOpen,
    OutsideFunction,
    Delete,
    DeclareWithNew,
    SmartPointer,
    Assignment,
    Declaration,
    Unrecognized,
}

type Predicate = fn(&Interpreter, &str) -> bool;
type Handler = fn(&mut Interpreter, &str) -> Result<(), ScriptError>;

/// A (predicate, handler) pair
pub struct Rule {
    pub kind: StatementKind,
    pub matches: Predicate,
    pub apply: Handler,
}

pub static RULES: &[Rule] = &[
    Rule {
        kind: StatementKind::ClassHeader,
        matches: is_class_header,
        apply: Interpreter::begin_class,
    },
    Rule {
        kind: StatementKind::ClassBody,
        matches: in_class_body,
        apply: Interpreter::class_body,
    },
    Rule {
        kind: StatementKind::EntryFunction,
        matches: is_entry_function,
        apply: Interpreter::enter_function,
    },
    Rule {
        kind: StatementKind::Return,
        matches: is_return,
        apply: Interpreter::ignore,
    },
    Rule {
        kind: StatementKind::ScopeReenter,
        matches: is_scope_reenter,
        apply: Interpreter::reenter_scope,
    },
    Rule {
        kind: StatementKind::ScopeClose,
        matches: is_scope_close,
        apply: Interpreter::close_scope,
    },
    Rule {
        kind: StatementKind::ScopeOpen,
        matches: is_scope_open,
        apply: Interpreter::open_scope,
    },
    Rule {
        kind: StatementKind::OutsideFunction,
        matches: is_outside_function,
        apply: Interpreter::ignore,
    },
    Rule {
        kind: StatementKind::Delete,
        matches: is_delete,
        apply: Interpreter::delete,
    },
    Rule {
        kind: StatementKind::DeclareWithNew,
        matches: is_declare_with_new,
        apply: Interpreter::assignment,
    },
    Rule {
        kind: StatementKind::SmartPointer,
        matches: is_smart_pointer,
        apply: Interpreter::smart_pointer,
    },
    Rule {
        kind: StatementKind::Assignment,
        matches: is_assignment,
        apply: Interpreter::assignment,
    },
    Rule {
        kind: StatementKind::Declaration,
        matches: is_declaration,
        apply: Interpreter::declaration,
    },
];

static UNRECOGNIZED: Rule = Rule {
    kind: StatementKind::Unrecognized,
    matches: always,
    apply: Interpreter::ignore,
};

/// The first rule accepting `line` in the interpreter's current state
pub fn classify(interpreter: &Interpreter, line: &str) -> &'static Rule {
    RULES
        .iter()
        .find(|rule| (rule.matches)(interpreter, line))
        .unwrap_or(&UNRECOGNIZED)
}

fn is_class_header(interpreter: &Interpreter, line: &str) -> bool {
    !interpreter.in_class()
        && matches!(first_token(line), Some("class" | "struct"))
        && (line.contains('{') || !line.contains(';'))
}

fn in_class_body(interpreter: &Interpreter, _line: &str) -> bool {
    interpreter.in_class()
}

fn is_entry_function(interpreter: &Interpreter, line: &str) -> bool {
    if interpreter.in_function() {
        return false;
    }
    let tokens = tokenize(line);
    if tokens.len() < 2 || !matches!(tokens[0], "int" | "void") {
        return false;
    }
    tokens[1].starts_with("main(")
        || (tokens[1] == "main" && tokens.get(2).is_some_and(|t| t.starts_with('(')))
}

fn is_return(_interpreter: &Interpreter, line: &str) -> bool {
    first_token(line) == Some("return")
}

fn is_scope_reenter(_interpreter: &Interpreter, line: &str) -> bool {
    line.len() > 1 && line.starts_with('}') && line.ends_with('{')
}

fn is_scope_close(_interpreter: &Interpreter, line: &str) -> bool {
    line.starts_with('}')
}

fn is_scope_open(_interpreter: &Interpreter, line: &str) -> bool {
    line.ends_with('{')
}

fn is_outside_function(interpreter: &Interpreter, _line: &str) -> bool {
    !interpreter.in_function()
}

fn is_delete(_interpreter: &Interpreter, line: &str) -> bool {
    first_token(line).is_some_and(|token| token == "delete" || token.starts_with("delete["))
}

fn is_declare_with_new(_interpreter: &Interpreter, line: &str) -> bool {
    !mentions_smart_pointer(line)
        && split_assignment(line)
            .is_some_and(|a| !a.compound && new_expression(a.rhs).is_some())
}

fn is_smart_pointer(_interpreter: &Interpreter, line: &str) -> bool {
    mentions_smart_pointer(line)
}

fn is_assignment(_interpreter: &Interpreter, line: &str) -> bool {
    split_assignment(line).is_some()
}

fn is_declaration(_interpreter: &Interpreter, line: &str) -> bool {
    parse_declaration(line).is_some()
}

fn always(_interpreter: &Interpreter, _line: &str) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(interpreter: &Interpreter, line: &str) -> StatementKind {
        classify(interpreter, line).kind
    }

    fn inside_main() -> Interpreter {
        let mut interpreter = Interpreter::new();
        interpreter.execute_line("int main() {").unwrap();
        interpreter
    }

    #[test]
    fn test_outside_function_lines_are_ignored() {
        let interpreter = Interpreter::new();
        assert_eq!(kind(&interpreter, "int x;"), StatementKind::OutsideFunction);
        assert_eq!(kind(&interpreter, "int main() {"), StatementKind::EntryFunction);
        assert_eq!(kind(&interpreter, "class Point {"), StatementKind::ClassHeader);
        assert_eq!(kind(&interpreter, "void helper() {"), StatementKind::ScopeOpen);
    }

    #[test]
    fn test_statement_priorities_inside_main() {
        let interpreter = inside_main();
        let cases = [
            ("return 0;", StatementKind::Return),
            ("} else {", StatementKind::ScopeReenter),
            ("}", StatementKind::ScopeClose),
            ("if (ptr != nullptr) {", StatementKind::ScopeOpen),
            ("delete ptr;", StatementKind::Delete),
            ("delete[] arr;", StatementKind::Delete),
            ("int* ptr = new int;", StatementKind::DeclareWithNew),
            ("ptr = new int;", StatementKind::DeclareWithNew),
            ("std::unique_ptr<int> p = std::make_unique<int>();", StatementKind::SmartPointer),
            ("std::shared_ptr<int> p(new int);", StatementKind::SmartPointer),
            ("int* ptr2 = ptr1;", StatementKind::Assignment),
            ("x += 1;", StatementKind::Assignment),
            ("int x;", StatementKind::Declaration),
            ("Point p1;", StatementKind::Declaration),
            ("std::cout << x << std::endl;", StatementKind::Unrecognized),
            ("if (a == b) x++;", StatementKind::Unrecognized),
        ];
        for (line, expected) in cases {
            assert_eq!(kind(&interpreter, line), expected, "{}", line);
        }
    }

    #[test]
    fn test_class_body_claims_every_line() {
        let mut interpreter = Interpreter::new();
        interpreter.execute_line("class Point {").unwrap();
        assert_eq!(kind(&interpreter, "int x;"), StatementKind::ClassBody);
        assert_eq!(kind(&interpreter, "};"), StatementKind::ClassBody);
        assert_eq!(kind(&interpreter, "int main() {"), StatementKind::ClassBody);
    }

    #[test]
    fn test_struct_declaration_is_not_a_header() {
        let interpreter = inside_main();
        assert_ne!(kind(&interpreter, "struct Point p;"), StatementKind::ClassHeader);
        assert_eq!(kind(&interpreter, "class Widget;"), StatementKind::Unrecognized);
    }
}

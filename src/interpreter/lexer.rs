//! Line-level text handling for scripts
//!
//! Scripts are processed one line at a time. Nothing here builds a grammar: this
//! module only strips comments, cuts lines into whitespace-delimited tokens and
//! recognizes the handful of shapes the classification rules need (declarators,
//! assignments, `std::move(...)`).
//!
//! Statement terminators and braces are token boundaries and never appear inside a
//! token. There is no quoting or escaping.

/// Iterate over `(line_number, raw_text)` with 1-based line numbers
pub fn split_lines(script: &str) -> impl Iterator<Item = (usize, &str)> {
    script.lines().enumerate().map(|(idx, line)| (idx + 1, line))
}

/// Remove `//` comments and the first `/* ... */` span of a line
///
/// Block comments spanning several lines are not supported.
pub fn strip_comments(line: &str) -> String {
    let mut result = match line.find("//") {
        Some(pos) => line[..pos].to_string(),
        None => line.to_string(),
    };

    if let Some(start) = result.find("/*") {
        if let Some(len) = result[start + 2..].find("*/") {
            let end = start + 2 + len + 2;
            result = format!("{}{}", &result[..start], &result[end..]);
        }
    }

    result
}

/// Split a line into tokens on whitespace, `;`, `{` and `}`
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split(|c: char| c.is_whitespace() || matches!(c, ';' | '{' | '}'))
        .filter(|token| !token.is_empty())
        .collect()
}

/// First token of a line, if any
pub fn first_token(line: &str) -> Option<&str> {
    tokenize(line).into_iter().next()
}

pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Longest identifier prefix of `text` (may be empty)
pub fn identifier_prefix(text: &str) -> &str {
    let end = text
        .char_indices()
        .find(|&(idx, c)| {
            !(c.is_ascii_alphanumeric() || c == '_') || (idx == 0 && c.is_ascii_digit())
        })
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    &text[..end]
}

/// Variable an lvalue expression writes through: `*p`, `p->x`, `p.x`, `arr[1]` all
/// resolve to the name before the access
pub fn lvalue_base(text: &str) -> &str {
    let text = text.trim().trim_start_matches(|c: char| matches!(c, '*' | '(' | ' '));
    identifier_prefix(text)
}

/// Whether an lvalue writes through the variable rather than rebinding it
pub fn is_indirect_lvalue(text: &str) -> bool {
    let text = text.trim();
    text.starts_with('*') || text.contains("->") || text.contains('.') || text.contains('[')
}

/// Result of splitting a line at its assignment operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment<'a> {
    pub lhs: &'a str,
    pub rhs: &'a str,
    /// `+=`, `-=` and friends
    pub compound: bool,
}

/// Split a line at its first assignment operator
///
/// `==`, `!=`, `<=` and `>=` are comparisons, not assignments. The right-hand side
/// loses its statement terminator.
pub fn split_assignment(line: &str) -> Option<Assignment<'_>> {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'=' {
            i += 1;
            continue;
        }
        if bytes.get(i + 1) == Some(&b'=') {
            i += 2;
            continue;
        }
        let prev = if i > 0 { Some(bytes[i - 1]) } else { None };
        match prev {
            Some(b'=' | b'!' | b'<' | b'>') => {
                i += 1;
                continue;
            }
            Some(b'+' | b'-' | b'*' | b'/' | b'%' | b'&' | b'|' | b'^') => {
                return Some(Assignment {
                    lhs: line[..i - 1].trim(),
                    rhs: trim_statement(&line[i + 1..]),
                    compound: true,
                });
            }
            _ => {
                return Some(Assignment {
                    lhs: line[..i].trim(),
                    rhs: trim_statement(&line[i + 1..]),
                    compound: false,
                });
            }
        }
    }
    None
}

/// Trim whitespace and trailing statement terminators
pub fn trim_statement(text: &str) -> &str {
    text.trim().trim_end_matches(';').trim_end()
}

/// Unwrap `std::move(x)` / `move(x)` to `x`
pub fn unwrap_move(text: &str) -> Option<&str> {
    let text = text.trim();
    let inner = text
        .strip_prefix("std::move(")
        .or_else(|| text.strip_prefix("move("))?;
    inner.strip_suffix(')').map(str::trim)
}

/// Type text of a `new` expression: `new Point(1, 2)` yields `Point(1, 2)`
pub fn new_expression(text: &str) -> Option<&str> {
    let rest = text.trim().strip_prefix("new")?;
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

/// Net brace depth change of a line (`{` minus `}`)
pub fn brace_balance(line: &str) -> isize {
    line.chars().fold(0, |depth, c| match c {
        '{' => depth + 1,
        '}' => depth - 1,
        _ => depth,
    })
}

/// Skip leading qualifiers such as `const`, `static` or `struct`
pub fn strip_qualifiers(text: &str) -> &str {
    let mut rest = text.trim_start();
    loop {
        let word = identifier_prefix(rest);
        if !word.is_empty()
            && super::types::IGNORED_QUALIFIERS.contains(&word)
            && rest[word.len()..].starts_with(char::is_whitespace)
        {
            rest = rest[word.len()..].trim_start();
        } else {
            return rest;
        }
    }
}

/// One declared name inside a declaration statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declarator {
    pub type_name: String,
    pub name: String,
    pub pointer: bool,
    pub array_len: Option<usize>,
    /// Text after `=` for this declarator, if any
    pub init: Option<String>,
}

/// Parse a declaration such as `int* a`, `const Point *p`, `int a = 1, *b` or `int v[4]`
///
/// Each declarator may carry its own `= init`. Direct-init arguments in parentheses
/// (`Point p(1, 2)`) are accepted and ignored. Multi-word primitives
/// (`unsigned int`, `long long`) form one type name. Returns `None` unless every
/// declarator names a valid identifier.
pub fn parse_declaration(text: &str) -> Option<Vec<Declarator>> {
    let mut rest = strip_qualifiers(trim_statement(text));

    let first = identifier_prefix(rest);
    if first.is_empty() {
        return None;
    }
    let mut type_name = first.to_string();
    rest = &rest[first.len()..];

    // `unsigned int`, `long long`, `signed char`
    if super::types::is_basic_type(first) {
        loop {
            let trimmed = rest.trim_start();
            let word = identifier_prefix(trimmed);
            if !word.is_empty()
                && super::types::is_basic_type(word)
                && !trimmed[word.len()..].trim_start().starts_with(|c: char| matches!(c, '=' | ',' | ';' | '(' | '['))
                && !trimmed[word.len()..].trim().is_empty()
            {
                type_name.push(' ');
                type_name.push_str(word);
                rest = &trimmed[word.len()..];
            } else {
                break;
            }
        }
    }

    let mut declarators = Vec::new();
    for piece in split_top_level(rest, ',') {
        let (piece, init) = match split_assignment(piece) {
            Some(assignment) if assignment.compound => return None,
            Some(assignment) => (assignment.lhs, Some(assignment.rhs.to_string())),
            None => (piece.trim(), None),
        };
        let stars = piece.chars().take_while(|c| *c == '*' || c.is_whitespace()).count();
        let pointer = piece[..stars].contains('*');
        let after = piece[stars..].trim_start_matches('&').trim_start();
        let name = identifier_prefix(after);
        if !is_identifier(name) {
            return None;
        }

        let tail = after[name.len()..].trim();
        let array_len = if let Some(dims) = tail.strip_prefix('[') {
            let len = dims.split(']').next().unwrap_or("").trim();
            Some(len.parse::<usize>().ok()?)
        } else if tail.is_empty() || tail.starts_with('(') {
            None
        } else {
            return None;
        };

        declarators.push(Declarator {
            type_name: type_name.clone(),
            name: name.to_string(),
            pointer,
            array_len,
            init,
        });
    }

    if declarators.is_empty() {
        None
    } else {
        Some(declarators)
    }
}

/// Split on `sep` where it is not nested inside parentheses, brackets or angles
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (idx, c) in text.char_indices() {
        match c {
            '(' | '[' | '<' => depth += 1,
            ')' | ']' | '>' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(&text[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_line_comment() {
        assert_eq!(strip_comments("int x; // note"), "int x; ");
        assert_eq!(strip_comments("// whole line"), "");
    }

    #[test]
    fn test_strip_block_comment_once() {
        assert_eq!(strip_comments("int /* a */ x; /* b */"), "int  x; /* b */");
        assert_eq!(strip_comments("int x; /* open"), "int x; /* open");
    }

    #[test]
    fn test_tokenize_breaks_on_terminators_and_braces() {
        assert_eq!(tokenize("int main() {"), vec!["int", "main()"]);
        assert_eq!(tokenize("delete ptr;"), vec!["delete", "ptr"]);
        assert_eq!(tokenize("};"), Vec::<&str>::new());
        assert_eq!(tokenize("  Point\tp1;"), vec!["Point", "p1"]);
    }

    #[test]
    fn test_split_assignment() {
        let a = split_assignment("int* p = new int;").unwrap();
        assert_eq!((a.lhs, a.rhs, a.compound), ("int* p", "new int", false));

        let b = split_assignment("x += 2;").unwrap();
        assert_eq!((b.lhs, b.rhs, b.compound), ("x", "2", true));

        assert!(split_assignment("if (a == b)").is_none());
        assert!(split_assignment("while (a != b && c <= d)").is_none());
    }

    #[test]
    fn test_unwrap_move() {
        assert_eq!(unwrap_move("std::move(p1)"), Some("p1"));
        assert_eq!(unwrap_move("move( p1 )"), Some("p1"));
        assert_eq!(unwrap_move("p1"), None);
    }

    #[test]
    fn test_new_expression() {
        assert_eq!(new_expression("new int"), Some("int"));
        assert_eq!(new_expression(" new Point(1, 2)"), Some("Point(1, 2)"));
        assert_eq!(new_expression("newValue"), None);
        assert_eq!(brace_balance("void f() { if (x) {"), 2);
        assert_eq!(brace_balance("} else {"), 0);
    }

    #[test]
    fn test_lvalue_base() {
        assert_eq!(lvalue_base("*ptr"), "ptr");
        assert_eq!(lvalue_base("p->health"), "p");
        assert_eq!(lvalue_base("p1.x"), "p1");
        assert!(is_indirect_lvalue("*ptr"));
        assert!(!is_indirect_lvalue("ptr"));
    }

    #[test]
    fn test_parse_pointer_declarations() {
        for text in ["int* p;", "int *p;", "int * p;", "const int* p"] {
            let decls = parse_declaration(text).unwrap();
            assert_eq!(decls.len(), 1, "{}", text);
            assert_eq!(decls[0].type_name, "int");
            assert_eq!(decls[0].name, "p");
            assert!(decls[0].pointer, "{}", text);
        }
    }

    #[test]
    fn test_parse_declaration_lists_and_arrays() {
        let decls = parse_declaration("int a, *b, c[4];").unwrap();
        let shape: Vec<(&str, bool, Option<usize>)> = decls
            .iter()
            .map(|d| (d.name.as_str(), d.pointer, d.array_len))
            .collect();
        assert_eq!(
            shape,
            vec![("a", false, None), ("b", true, None), ("c", false, Some(4))]
        );
    }

    #[test]
    fn test_parse_direct_init_and_rejects() {
        let decls = parse_declaration("Point p(1, 2);").unwrap();
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].name, "p");

        assert!(parse_declaration("return 0;").is_none());
        assert!(parse_declaration("x;").is_none());
        assert!(parse_declaration("foo(bar);").is_none());
        assert!(parse_declaration("x = 5;").is_none());
        assert!(parse_declaration("p->next = q;").is_none());
        assert!(parse_declaration("std::cout << x;").is_none());
    }

    #[test]
    fn test_parse_initializers_per_declarator() {
        let decls = parse_declaration("int* p = new int, q = 3;").unwrap();
        assert_eq!(decls[0].name, "p");
        assert!(decls[0].pointer);
        assert_eq!(decls[0].init.as_deref(), Some("new int"));
        assert_eq!(decls[1].name, "q");
        assert!(!decls[1].pointer);
        assert_eq!(decls[1].init.as_deref(), Some("3"));
    }

    #[test]
    fn test_parse_multi_word_primitive() {
        let decls = parse_declaration("unsigned long long total = 0;").unwrap();
        assert_eq!(decls[0].type_name, "unsigned long long");
        assert_eq!(decls[0].name, "total");

        let decls = parse_declaration("long x;").unwrap();
        assert_eq!(decls[0].type_name, "long");
        assert_eq!(decls[0].name, "x");
    }
}

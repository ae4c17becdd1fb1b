// Type recognition for the script subset

use crate::memory::Discipline;

/// Keywords accepted as primitive type names
const PRIMITIVE_TYPES: &[(&str, usize)] = &[
    ("bool", 1),
    ("char", 1),
    ("short", 2),
    ("int", 4),
    ("float", 4),
    ("unsigned", 4),
    ("signed", 4),
    ("long", 8),
    ("double", 8),
    ("size_t", 8),
    ("void", 0),
];

/// Qualifiers and elaborated-type keywords skipped in front of a declaration
pub const IGNORED_QUALIFIERS: &[&str] = &["const", "static", "struct", "class", "volatile"];

/// Size of a primitive type, `None` if `name` is not a primitive
///
/// For multi-word names the last word decides: `unsigned char` is 1 byte and
/// `long long` is 8.
pub fn primitive_size(name: &str) -> Option<usize> {
    let mut size = None;
    for word in name.split_whitespace() {
        let word = word.strip_prefix("std::").unwrap_or(word);
        size = Some(
            PRIMITIVE_TYPES
                .iter()
                .find(|(type_name, _)| *type_name == word)
                .map(|(_, size)| *size)?,
        );
    }
    size
}

pub fn is_basic_type(name: &str) -> bool {
    primitive_size(name).is_some()
}

/// Ownership discipline named by a smart-pointer type tag or factory
///
/// Anything that is neither a unique nor a shared tag is a raw pointer.
pub fn discipline_of(text: &str) -> Discipline {
    if text.contains("unique_ptr") || text.contains("make_unique") {
        Discipline::Unique
    } else if text.contains("shared_ptr") || text.contains("make_shared") {
        Discipline::Shared
    } else {
        Discipline::Raw
    }
}

/// Whether `text` mentions any smart-pointer type tag or factory
pub fn mentions_smart_pointer(text: &str) -> bool {
    ["unique_ptr", "shared_ptr", "make_unique", "make_shared"]
        .iter()
        .any(|tag| text.contains(tag))
}

/// Whether `text` is a smart-pointer factory call such as `make_shared<T>(...)`
pub fn is_factory_call(text: &str) -> bool {
    let text = text.trim_start();
    let text = text.strip_prefix("std::").unwrap_or(text);
    text.starts_with("make_unique") || text.starts_with("make_shared")
}

/// The text between the first `<` and its matching `>`
pub fn template_argument(text: &str) -> Option<&str> {
    split_template(text).map(|(argument, _)| argument)
}

/// Split `tag<argument> rest` into `(argument, rest)`
pub fn split_template(text: &str) -> Option<(&str, &str)> {
    let open = text.find('<')?;
    let mut depth = 0usize;
    for (offset, c) in text[open..].char_indices() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth == 0 {
                    let close = open + offset;
                    return Some((text[open + 1..close].trim(), &text[close + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}

/// Whether a declaration starts with a smart-pointer type (`std::unique_ptr<...>`)
pub fn starts_with_smart_type(text: &str) -> bool {
    let text = text.trim_start();
    let text = text.strip_prefix("std::").unwrap_or(text);
    text.starts_with("unique_ptr") || text.starts_with("shared_ptr")
}

/// `nullptr`, `NULL` or a literal zero
pub fn is_null_literal(text: &str) -> bool {
    matches!(text.trim(), "nullptr" | "NULL" | "0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_sizes() {
        assert_eq!(primitive_size("int"), Some(4));
        assert_eq!(primitive_size("double"), Some(8));
        assert_eq!(primitive_size("char"), Some(1));
        assert_eq!(primitive_size("std::size_t"), Some(8));
        assert_eq!(primitive_size("Point"), None);
        assert_eq!(primitive_size("unsigned char"), Some(1));
        assert_eq!(primitive_size("long long"), Some(8));
        assert_eq!(primitive_size(""), None);
    }

    #[test]
    fn test_discipline_from_tag() {
        assert_eq!(discipline_of("std::unique_ptr<int>"), Discipline::Unique);
        assert_eq!(discipline_of("make_shared<Point>()"), Discipline::Shared);
        assert_eq!(discipline_of("int*"), Discipline::Raw);
    }

    #[test]
    fn test_template_argument() {
        assert_eq!(template_argument("unique_ptr<int>"), Some("int"));
        assert_eq!(
            template_argument("shared_ptr<Box<int>> p"),
            Some("Box<int>")
        );
        assert_eq!(template_argument("int x"), None);
        assert_eq!(
            split_template("std::unique_ptr<Point> p(new Point)"),
            Some(("Point", " p(new Point)"))
        );
    }

    #[test]
    fn test_smart_type_prefix() {
        assert!(starts_with_smart_type("std::shared_ptr<int> p"));
        assert!(starts_with_smart_type("unique_ptr<int> p"));
        assert!(!starts_with_smart_type("auto p"));
        assert!(!starts_with_smart_type("p"));
    }

    #[test]
    fn test_factory_detection() {
        assert!(is_factory_call("std::make_unique<int>()"));
        assert!(is_factory_call(" make_shared<Point>(1, 2)"));
        assert!(!is_factory_call("other"));
    }
}

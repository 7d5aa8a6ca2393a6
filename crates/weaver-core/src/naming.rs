//! Shared naming utilities for generated identifiers.
//!
//! These only transform names that already came from declarations; they never
//! invent type names.

/// Keywords that need an `@` prefix when used as identifiers in generated code.
const RESERVED: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while",
];

/// Lowercase the first character.
///
/// # Examples
/// ```
/// use weaver_core::naming::to_camel_case;
/// assert_eq!(to_camel_case("Logger"), "logger");
/// assert_eq!(to_camel_case("HttpClient"), "httpClient");
/// ```
pub fn to_camel_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
    }
}

/// Uppercase the first character, leaving the rest untouched.
///
/// # Examples
/// ```
/// use weaver_core::naming::to_pascal_case;
/// assert_eq!(to_pascal_case("core"), "Core");
/// assert_eq!(to_pascal_case("DataAccess"), "DataAccess");
/// ```
pub fn to_pascal_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

/// Escape an identifier that collides with a keyword.
pub fn escape_identifier(name: &str) -> String {
    if RESERVED.contains(&name) {
        format!("@{}", name)
    } else {
        name.to_string()
    }
}

/// Constructor parameter name for an injected member.
///
/// Leading underscores and an `m_` prefix are dropped, the rest is camel-cased.
///
/// # Examples
/// ```
/// use weaver_core::naming::parameter_name;
/// assert_eq!(parameter_name("_logger"), "logger");
/// assert_eq!(parameter_name("m_Clock"), "clock");
/// assert_eq!(parameter_name("Repository"), "repository");
/// assert_eq!(parameter_name("_event"), "@event");
/// ```
pub fn parameter_name(member_name: &str) -> String {
    let trimmed = member_name.strip_prefix("m_").unwrap_or(member_name);
    let trimmed = trimmed.trim_start_matches('_');
    let base = if trimmed.is_empty() { member_name } else { trimmed };
    escape_identifier(&to_camel_case(base))
}

/// Turn an arbitrary hint string into a PascalCase identifier fragment.
///
/// Non-alphanumeric characters split words; an empty result stays empty.
///
/// # Examples
/// ```
/// use weaver_core::naming::identifier_fragment;
/// assert_eq!(identifier_fragment("Core"), "Core");
/// assert_eq!(identifier_fragment("data access"), "DataAccess");
/// assert_eq!(identifier_fragment("v2-api"), "V2Api");
/// ```
pub fn identifier_fragment(hint: &str) -> String {
    hint.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|word| !word.is_empty())
        .map(to_pascal_case)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_name_edge_cases() {
        assert_eq!(parameter_name("_"), "_");
        assert_eq!(parameter_name("__cache"), "cache");
        assert_eq!(parameter_name("_class"), "@class");
        assert_eq!(parameter_name("service"), "service");
    }

    #[test]
    fn test_identifier_fragment() {
        assert_eq!(identifier_fragment(""), "");
        assert_eq!(identifier_fragment("  "), "");
        assert_eq!(identifier_fragment("core"), "Core");
        assert_eq!(identifier_fragment("Core.Data"), "CoreData");
    }

    #[test]
    fn test_escape_identifier() {
        assert_eq!(escape_identifier("string"), "@string");
        assert_eq!(escape_identifier("name"), "name");
    }

    proptest::proptest! {
        #[test]
        fn prop_identifier_fragment_is_stable(hint in "[a-zA-Z0-9 ._-]{0,24}") {
            let fragment = identifier_fragment(&hint);
            proptest::prop_assert!(fragment.chars().all(|c| c.is_alphanumeric() || c == '_'));
            proptest::prop_assert_eq!(identifier_fragment(&fragment), fragment.clone());
        }
    }
}

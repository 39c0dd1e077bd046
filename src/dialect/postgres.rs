use super::DialectEngine;
use regex::Regex;

/// Qualified form (`<TYPE> <schema>.<name>`) first, then the bare form
/// (`<TYPE> <name>;`). Type keywords and names must share a line.
const OBJECT_HEADER: &str = r"(?i)\bcreate\s+(?:or[ \t]+replace[ \t]+)?(?:(?P<qualified_type>[a-z]+(?:[ \t]+[a-z]+)*?)[ \t]+(?:if[ \t]+not[ \t]+exists[ \t]+)?(?P<qualified_name>\w+\.\w+)|(?P<bare_type>[a-z]+(?:[ \t]+[a-z]+)*?)[ \t]+(?:if[ \t]+not[ \t]+exists[ \t]+)?(?P<bare_name>\w+)[ \t]*;)";

pub struct PostgresEngine {
    object_header: Regex,
}

impl PostgresEngine {
    pub fn new() -> Self {
        Self {
            object_header: Regex::new(OBJECT_HEADER).unwrap(),
        }
    }
}

impl Default for PostgresEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DialectEngine for PostgresEngine {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn object_header(&self) -> &Regex {
        &self.object_header
    }
}

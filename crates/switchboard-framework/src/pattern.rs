//! Listener pattern compilation.
//!
//! Listeners are registered with a [`Pattern`]: either a prebuilt [`Regex`] or
//! a source string with optional modifiers. `hear` listeners use the pattern
//! as given. `respond` listeners only fire when the message is addressed to
//! the robot, so their pattern is wrapped in a name prefix:
//!
//! ```text
//! ^\s*[@]*<name>[:,]?\s*(?:<pattern>)
//! ```
//!
//! # Modifiers
//!
//! | Flag | Effect |
//! |------|--------|
//! | `i`  | case-insensitive |
//! | `m`  | `^`/`$` match at line boundaries |
//! | `s`  | `.` matches `\n` |
//! | `x`  | ignore whitespace, allow `#` comments |
//! | `U`  | swap greedy and lazy quantifiers |
//!
//! A respond pattern without explicit modifiers is compiled case-insensitive,
//! so users can address the robot in any casing. `Some("")` counts as
//! explicit and yields a case-sensitive pattern.

use std::fmt;

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::error::{PatternError, PatternResult};

/// Modifiers applied to respond patterns that do not supply their own.
const DEFAULT_RESPOND_FLAGS: &str = "i";

/// A listener pattern before compilation.
#[derive(Clone)]
pub enum Pattern {
    /// A prebuilt regular expression.
    ///
    /// For `respond`, only its source is reused; it is recompiled with the
    /// default modifiers.
    Regex(Regex),
    /// A regex source with optional modifiers.
    Source {
        source: String,
        flags: Option<String>,
    },
}

impl Pattern {
    /// Creates a pattern from a source string, without explicit modifiers.
    pub fn new(source: impl Into<String>) -> Self {
        Self::Source {
            source: source.into(),
            flags: None,
        }
    }

    /// Creates a pattern from a source string with explicit modifiers.
    pub fn with_flags(source: impl Into<String>, flags: impl Into<String>) -> Self {
        Self::Source {
            source: source.into(),
            flags: Some(flags.into()),
        }
    }

    /// Returns the regex source.
    pub fn source(&self) -> &str {
        match self {
            Self::Regex(re) => re.as_str(),
            Self::Source { source, .. } => source,
        }
    }

    /// Returns the explicit modifiers, if any.
    pub fn flags(&self) -> Option<&str> {
        match self {
            Self::Regex(_) => None,
            Self::Source { flags, .. } => flags.as_deref(),
        }
    }

    /// Returns `true` if the source begins with a `^` anchor, ignoring any
    /// leading inline flag groups such as `(?i)`.
    pub fn is_anchored(&self) -> bool {
        strip_inline_flags(self.source()).starts_with('^')
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("source", &self.source())
            .field("flags", &self.flags())
            .finish()
    }
}

impl From<&str> for Pattern {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<String> for Pattern {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

impl From<Regex> for Pattern {
    fn from(re: Regex) -> Self {
        Self::Regex(re)
    }
}

impl From<&Regex> for Pattern {
    fn from(re: &Regex) -> Self {
        Self::Regex(re.clone())
    }
}

/// Strips leading `(?flags)` groups, e.g. `(?i)(?-s)^foo` becomes `^foo`.
fn strip_inline_flags(mut source: &str) -> &str {
    while let Some(rest) = source.strip_prefix("(?") {
        let Some(end) = rest.find(')') else {
            break;
        };
        let flags = &rest[..end];
        if flags.is_empty() || !flags.chars().all(|c| c.is_ascii_alphabetic() || c == '-') {
            break;
        }
        source = &rest[end + 1..];
    }
    source
}

/// Escapes a literal for use in a pattern compiled with `flags`.
///
/// Under `x` whitespace is insignificant, so it is written as hex escapes.
fn escape_literal(literal: &str, flags: &str) -> String {
    let escaped = regex::escape(literal);
    if !flags.contains('x') {
        return escaped;
    }

    let mut out = String::with_capacity(escaped.len());
    for c in escaped.chars() {
        if c.is_whitespace() {
            out.push_str(&format!(r"\x{{{:X}}}", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}

/// Builds a regex from a source and a modifier string.
fn build(source: &str, flags: &str) -> PatternResult<Regex> {
    let mut builder = RegexBuilder::new(source);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            'U' => builder.swap_greed(true),
            other => return Err(PatternError::InvalidFlag(other)),
        };
    }
    Ok(builder.build()?)
}

/// Compiles a `hear` pattern.
///
/// Regex patterns are used as-is; source patterns get exactly the modifiers
/// they were given.
pub fn compile_hear(pattern: &Pattern) -> PatternResult<Regex> {
    match pattern {
        Pattern::Regex(re) => Ok(re.clone()),
        Pattern::Source { source, flags } => build(source, flags.as_deref().unwrap_or("")),
    }
}

/// Compiles a `respond` pattern against the robot's name and optional alias.
///
/// Emits a warning for anchored patterns: the name prefix always precedes
/// the anchor, so such a listener can never match.
pub fn compile_respond(
    pattern: &Pattern,
    name: &str,
    alias: Option<&str>,
) -> PatternResult<Regex> {
    let source = pattern.source();

    if pattern.is_anchored() {
        warn!(
            pattern = source,
            "Anchors don't work well with respond, perhaps you want to use 'hear'"
        );
    }

    let flags = pattern.flags().unwrap_or(DEFAULT_RESPOND_FLAGS);
    let name = escape_literal(name, flags);
    let prefix = match alias {
        Some(alias) => format!(r"(?:{}[:,]?|{name}[:,]?)", escape_literal(alias, flags)),
        None => format!("{name}[:,]?"),
    };
    let full = format!(r"^\s*[@]*{prefix}\s*(?:{source})");

    build(&full, flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_respond_matches_addressed_messages() {
        let re = compile_respond(&Pattern::new("foo"), "botname", None).unwrap();

        assert!(re.is_match("@botname: foo"));
        assert!(re.is_match("botname, foo"));
        assert!(re.is_match("BOTNAME foo"));
        assert!(re.is_match("  @@botname foo bar"));
        assert!(!re.is_match("randomfoo"));
        assert!(!re.is_match("foo"));
    }

    #[test]
    fn test_respond_anchored_pattern_never_matches() {
        let re = compile_respond(&Pattern::new("^foo"), "botname", None).unwrap();

        for input in ["botname foo", "botname: foo", "foo", "^foo", "botname ^foo"] {
            assert!(!re.is_match(input), "matched {input:?}");
        }
    }

    #[test]
    fn test_respond_explicit_flags_override_default() {
        let strict = compile_respond(&Pattern::with_flags("foo", ""), "botname", None).unwrap();
        assert!(strict.is_match("botname foo"));
        assert!(!strict.is_match("BOTNAME foo"));

        let multi = compile_respond(&Pattern::with_flags("a.b", "s"), "bot", None).unwrap();
        assert!(multi.is_match("bot a\nb"));
        assert!(!multi.is_match("BOT a\nb"));
    }

    #[test]
    fn test_respond_escapes_name_and_honours_alias() {
        let re = compile_respond(&Pattern::new("ping"), "bot.v2", Some("!")).unwrap();

        assert!(re.is_match("bot.v2 ping"));
        assert!(re.is_match("!ping"));
        assert!(re.is_match("! ping"));
        assert!(!re.is_match("botXv2 ping"));
    }

    #[test]
    fn test_respond_reuses_regex_source_case_insensitively() {
        let pattern = Pattern::from(Regex::new(r"deploy (\w+)").unwrap());
        let re = compile_respond(&pattern, "bot", None).unwrap();
        let caps = re.captures("Bot: DEPLOY api").unwrap();
        assert_eq!(&caps[1], "api");
    }

    #[test]
    fn test_hear_uses_pattern_as_given() {
        let re = compile_hear(&Pattern::new("ping")).unwrap();
        assert!(re.is_match("a ping here"));
        assert!(!re.is_match("PING"));

        let re = compile_hear(&Pattern::with_flags("ping", "i")).unwrap();
        assert!(re.is_match("PING"));

        let prebuilt = Regex::new("(?i)ping").unwrap();
        assert!(compile_hear(&Pattern::from(&prebuilt)).unwrap().is_match("PING"));
    }

    #[test]
    fn test_invalid_flag_and_source_are_errors() {
        assert!(matches!(
            compile_hear(&Pattern::with_flags("x", "q")),
            Err(PatternError::InvalidFlag('q'))
        ));
        assert!(matches!(
            compile_hear(&Pattern::new("(unclosed")),
            Err(PatternError::Regex(_))
        ));
    }

    #[test]
    fn test_is_anchored() {
        assert!(Pattern::new("^foo").is_anchored());
        assert!(!Pattern::new("foo^").is_anchored());
        assert!(Pattern::from(Regex::new("(?i)^foo").unwrap()).is_anchored());
        assert!(Pattern::new("(?i)(?-s)^foo").is_anchored());
        assert!(!Pattern::new("(?i)foo").is_anchored());
        assert!(!Pattern::new("(?:^)foo").is_anchored());
    }

    #[test]
    fn test_respond_with_x_flag_keeps_spaces_in_name() {
        let pattern = Pattern::with_flags("deploy \\s+ (\\w+)", "ix");
        let re = compile_respond(&pattern, "my bot", Some("hey you")).unwrap();

        assert_eq!(&re.captures("My Bot: deploy api").unwrap()[1], "api");
        assert_eq!(&re.captures("hey you deploy web").unwrap()[1], "web");
        assert!(!re.is_match("mybot deploy api"));
    }

    #[test]
    fn test_respond_anchored_pattern_logs_warning() {
        let (logs, _guard) = crate::testing::capture_logs();

        compile_respond(&Pattern::new("^foo"), "botname", None).unwrap();
        compile_respond(&Pattern::from(Regex::new("(?i)^bar").unwrap()), "botname", None)
            .unwrap();
        compile_respond(&Pattern::new("baz"), "botname", None).unwrap();

        let output = logs.contents();
        let warnings: Vec<&str> = output
            .lines()
            .filter(|line| line.contains("Anchors don't work well with respond"))
            .collect();
        assert_eq!(warnings.len(), 2, "{output}");
        assert!(warnings.iter().all(|line| line.contains("WARN")));
        assert!(warnings[0].contains("^foo"));
        assert!(warnings[1].contains("(?i)^bar"));
    }
}

//! Command Templates
//!
//! Parses `{placeholder}` command templates and turns them into concrete
//! commands. Two renderings are provided:
//!
//! - [`CommandTemplate::render`]: plain literal substitution, used for
//!   display and for the recorded command line.
//! - [`CommandTemplate::plan`]: a [`CommandPlan`] that the executor spawns.
//!   Templates without shell syntax become an argument vector, so parameter
//!   values are never interpreted by a shell. Templates that rely on shell
//!   syntax fall back to `sh -c` with every substituted value escaped for
//!   the quoting context its placeholder sits in.

use std::collections::BTreeMap;
use std::fmt;

/// Caller-supplied placeholder values
pub type ToolParameters = BTreeMap<String, String>;

/// Characters in template text that need a shell to interpret
const SHELL_SYNTAX: [char; 14] = [
    ';', '|', '&', '$', '`', '(', ')', '<', '>', '\'', '"', '\\', '*', '\n',
];

/// Shell quoting state at a point in the template text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    Unquoted,
    Single,
    Double,
}

impl Quote {
    /// State after `sh` reads `text` starting in this state
    fn after(self, text: &str) -> Quote {
        let mut state = self;
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            state = match (state, c) {
                (Quote::Single, '\'') => Quote::Unquoted,
                (Quote::Single, _) => Quote::Single,
                (_, '\\') => {
                    chars.next();
                    state
                }
                (Quote::Unquoted, '\'') => Quote::Single,
                (Quote::Unquoted, '"') => Quote::Double,
                (Quote::Double, '"') => Quote::Unquoted,
                (other, _) => other,
            };
        }
        state
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder { name: String, quote: Quote },
}

/// A parsed command template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    source: String,
    segments: Vec<Segment>,
}

/// How a command will be spawned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandPlan {
    /// Program and arguments, spawned directly
    Argv(Vec<String>),

    /// Shell script for `sh -c`, with quoted parameter values
    Shell(String),
}

impl CommandPlan {
    /// Human-readable command line
    pub fn display(&self) -> String {
        match self {
            CommandPlan::Argv(args) => args
                .iter()
                .map(|a| shell_quote(a))
                .collect::<Vec<_>>()
                .join(" "),
            CommandPlan::Shell(script) => script.clone(),
        }
    }

    /// Whether the plan runs through a shell
    pub fn uses_shell(&self) -> bool {
        matches!(self, CommandPlan::Shell(_))
    }
}

/// A command rendered for the record together with its spawn plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCommand {
    /// Literal substitution, as [`CommandTemplate::render`] produces it
    pub command: String,

    /// What the executor spawns
    pub plan: CommandPlan,
}

impl fmt::Display for CommandPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl CommandTemplate {
    /// Parse a template
    ///
    /// A placeholder is `{name}` where `name` matches `[A-Za-z_][A-Za-z0-9_]*`.
    /// Any other brace sequence is kept as literal text.
    pub fn parse(template: &str) -> Self {
        Self {
            source: template.to_string(),
            segments: parse_segments(template),
        }
    }

    /// Original template text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Distinct placeholder names in order of first use
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Placeholder { name, .. } = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Placeholders that `params` does not provide
    pub fn unresolved(&self, params: &ToolParameters) -> Vec<&str> {
        self.placeholders()
            .into_iter()
            .filter(|name| !params.contains_key(*name))
            .collect()
    }

    /// Whether the literal parts of the template use shell syntax
    pub fn requires_shell(&self) -> bool {
        self.segments.iter().any(|segment| match segment {
            Segment::Literal(text) => text.contains(&SHELL_SYNTAX[..]),
            Segment::Placeholder { .. } => false,
        })
    }

    /// Substitute `params` into the template in one pass
    ///
    /// Placeholders without a value stay in the output as literal `{name}`
    /// text. Substituted values are not scanned again.
    pub fn render(&self, params: &ToolParameters) -> String {
        render_segments(&self.segments, params, |v, _| v.to_string())
    }

    /// Build the spawn plan for `params`
    ///
    /// In a shell plan each value is escaped for where its placeholder sits:
    /// inside the template's single quotes, inside its double quotes, or bare.
    /// Either way the shell reads the value back as literal text.
    pub fn plan(&self, params: &ToolParameters) -> CommandPlan {
        if self.requires_shell() {
            return CommandPlan::Shell(render_segments(&self.segments, params, shell_escape));
        }

        let argv = self
            .source
            .split_whitespace()
            .map(|word| render_segments(&parse_segments(word), params, |v, _| v.to_string()))
            .collect();
        CommandPlan::Argv(argv)
    }

    /// Render the recorded command and the spawn plan in one go
    pub fn prepare(&self, params: &ToolParameters) -> PreparedCommand {
        PreparedCommand {
            command: self.render(params),
            plan: self.plan(params),
        }
    }
}

fn render_segments<F>(segments: &[Segment], params: &ToolParameters, encode: F) -> String
where
    F: Fn(&str, Quote) -> String,
{
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Placeholder { name, quote } => match params.get(name) {
                Some(value) => out.push_str(&encode(value, *quote)),
                None => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
            },
        }
    }
    out
}

fn parse_segments(template: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut quote = Quote::Unquoted;
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        literal.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match after.find('}') {
            Some(close) if is_placeholder_name(&after[..close]) => {
                quote = quote.after(&literal);
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder {
                    name: after[..close].to_string(),
                    quote,
                });
                rest = &after[close + 1..];
            }
            _ => {
                literal.push('{');
                rest = after;
            }
        }
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

fn is_placeholder_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Escape a value for the quoting context of its placeholder
fn shell_escape(value: &str, quote: Quote) -> String {
    match quote {
        Quote::Unquoted => shell_quote(value),
        Quote::Single => value.replace('\'', r"'\''"),
        Quote::Double => {
            let mut out = String::with_capacity(value.len());
            for c in value.chars() {
                if matches!(c, '$' | '`' | '"' | '\\') {
                    out.push('\\');
                }
                out.push(c);
            }
            out
        }
    }
}

/// Quote a value for POSIX `sh`
///
/// Values made only of `[A-Za-z0-9_@%+=:,./-]` are returned unchanged.
pub fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn params(pairs: &[(&str, &str)]) -> ToolParameters {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_all_supplied() {
        let template = CommandTemplate::parse("curl -X {method} {url}");
        let rendered = template.render(&params(&[
            ("method", "GET"),
            ("url", "http://example.test"),
        ]));
        assert_eq!(rendered, "curl -X GET http://example.test");
    }

    #[test]
    fn test_render_leaves_missing_placeholder() {
        let template = CommandTemplate::parse("curl -X {method} {url}");
        let rendered = template.render(&params(&[("url", "http://example.test")]));
        assert_eq!(rendered, "curl -X {method} http://example.test");
    }

    #[test]
    fn test_render_does_not_reexpand_values() {
        let template = CommandTemplate::parse("echo {a} {b}");
        let rendered = template.render(&params(&[("a", "{b}"), ("b", "x")]));
        assert_eq!(rendered, "echo {b} x");
    }

    #[test]
    fn test_render_repeated_placeholder() {
        let template = CommandTemplate::parse("{t}:{t}");
        assert_eq!(template.render(&params(&[("t", "x")])), "x:x");
    }

    #[test]
    fn test_non_placeholder_braces_are_literal() {
        let template = CommandTemplate::parse("jq '{.key}' {input} { } {1x}");
        assert_eq!(template.placeholders(), vec!["input"]);
        assert_eq!(
            template.render(&params(&[("input", "f.json")])),
            "jq '{.key}' f.json { } {1x}"
        );
    }

    #[test]
    fn test_unclosed_brace() {
        let template = CommandTemplate::parse("echo {oops");
        assert!(template.placeholders().is_empty());
        assert_eq!(template.render(&ToolParameters::new()), "echo {oops");
    }

    #[test]
    fn test_placeholders_and_unresolved() {
        let template = CommandTemplate::parse("masscan {target} -p{ports} --rate={rate} {target}");
        assert_eq!(template.placeholders(), vec!["target", "ports", "rate"]);
        assert_eq!(
            template.unresolved(&params(&[("target", "10.0.0.1")])),
            vec!["ports", "rate"]
        );
    }

    #[test]
    fn test_requires_shell() {
        assert!(!CommandTemplate::parse("nmap -sV {target}").requires_shell());
        assert!(CommandTemplate::parse("msfconsole -q -x '{command}'").requires_shell());
        assert!(CommandTemplate::parse("powershell -c Connect-AzAccount; Get-AzVM").requires_shell());
        assert!(CommandTemplate::parse("cat {file} | grep x").requires_shell());
    }

    #[test]
    fn test_plan_argv_keeps_values_whole() {
        let template = CommandTemplate::parse("echo {message}");
        let plan = template.plan(&params(&[("message", "hello; rm -rf /")]));
        assert_eq!(
            plan,
            CommandPlan::Argv(vec!["echo".to_string(), "hello; rm -rf /".to_string()])
        );
        assert!(!plan.uses_shell());
    }

    #[test]
    fn test_plan_argv_placeholder_inside_word() {
        let template = CommandTemplate::parse("masscan {target} -p{ports}");
        let plan = template.plan(&params(&[("target", "10.0.0.0/24"), ("ports", "80,443")]));
        assert_eq!(
            plan,
            CommandPlan::Argv(vec![
                "masscan".to_string(),
                "10.0.0.0/24".to_string(),
                "-p80,443".to_string(),
            ])
        );
    }

    #[test]
    fn test_plan_shell_value_inside_single_quotes() {
        let template = CommandTemplate::parse("msfconsole -q -x '{command}'");
        let plan = template.plan(&params(&[("command", "use x; run")]));
        assert_eq!(
            plan,
            CommandPlan::Shell("msfconsole -q -x 'use x; run'".to_string())
        );
        assert!(plan.uses_shell());

        let plan = template.plan(&params(&[("command", "it's; id")]));
        assert_eq!(
            plan,
            CommandPlan::Shell(r"msfconsole -q -x 'it'\''s; id'".to_string())
        );
    }

    #[test]
    fn test_plan_shell_value_inside_double_quotes() {
        let template = CommandTemplate::parse(r#"grep "{pattern}" {file} | head"#);
        let plan = template.plan(&params(&[("pattern", r#"$(id) `x` "q" \n"#), ("file", "a b")]));
        assert_eq!(
            plan,
            CommandPlan::Shell(r#"grep "\$(id) \`x\` \"q\" \\n" 'a b' | head"#.to_string())
        );
    }

    #[test]
    fn test_quote_context_tracking() {
        let template = CommandTemplate::parse(r#"sh -c 'a "{x}' "b '{y}" \'{z} {w}"#);
        let quotes: Vec<_> = template
            .segments
            .iter()
            .filter_map(|s| match s {
                Segment::Placeholder { name, quote } => Some((name.as_str(), *quote)),
                Segment::Literal(_) => None,
            })
            .collect();
        assert_eq!(
            quotes,
            vec![
                ("x", Quote::Single),
                ("y", Quote::Double),
                ("z", Quote::Unquoted),
                ("w", Quote::Unquoted),
            ]
        );
    }

    #[test]
    fn test_prepare_records_literal_command() {
        let template = CommandTemplate::parse("curl -X {method} {url}");
        let prepared = template.prepare(&params(&[("url", "http://a b")]));
        assert_eq!(prepared.command, "curl -X {method} http://a b");
        assert_eq!(
            prepared.plan,
            CommandPlan::Argv(vec![
                "curl".to_string(),
                "-X".to_string(),
                "{method}".to_string(),
                "http://a b".to_string(),
            ])
        );
    }

    #[test]
    fn test_plan_display_matches_render_for_plain_values() {
        let template = CommandTemplate::parse("curl -X {method} {url}");
        let p = params(&[("method", "GET"), ("url", "http://example.test")]);
        assert_eq!(template.plan(&p).display(), template.render(&p));
    }

    #[test]
    fn test_plan_display_quotes_unsafe_args() {
        let plan = CommandPlan::Argv(vec!["echo".to_string(), "a b".to_string()]);
        assert_eq!(plan.display(), "echo 'a b'");
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("abc-1.2/x"), "abc-1.2/x");
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("$(id)"), "'$(id)'");
    }

    proptest! {
        #[test]
        fn prop_render_is_deterministic(
            values in prop::collection::btree_map("[a-z]{1,6}", "[ -~]{0,12}", 0..5)
        ) {
            let template = CommandTemplate::parse("tool {a} --flag={b} {c}{a} {zz}");
            let first = template.render(&values);
            let second = template.render(&values);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_argv_plan_preserves_value(value in "[ -~]{0,24}") {
            let template = CommandTemplate::parse("echo {v}");
            let plan = template.plan(&params(&[("v", value.as_str())]));
            prop_assert_eq!(plan, CommandPlan::Argv(vec!["echo".to_string(), value.clone()]));
        }
    }

    #[cfg(unix)]
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_shell_plan_passes_value_as_one_argument(
            value in "[ -~]{0,24}",
            template in prop::sample::select(vec![
                "printf '[%s]' '{v}'",
                r#"printf '[%s]' "{v}""#,
                "printf '[%s]' {v}",
                "printf '[%s]' x{v}y | cat",
            ]),
        ) {
            let CommandPlan::Shell(script) = CommandTemplate::parse(template)
                .plan(&params(&[("v", value.as_str())]))
            else {
                panic!("expected a shell plan");
            };
            let output = std::process::Command::new("sh").arg("-c").arg(&script).output().unwrap();
            let expected = if template.contains("x{v}y") {
                format!("[x{}y]", value)
            } else {
                format!("[{}]", value)
            };
            prop_assert_eq!(String::from_utf8_lossy(&output.stdout), expected);
        }
    }
}

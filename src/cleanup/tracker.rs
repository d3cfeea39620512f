//! Resource block tracking
//!
//! Walks a generated configuration file line by line and routes every line
//! inside a top-level `resource "<type>" "<name>" {` block through the
//! [`LineClassifier`] for that type. Block boundaries are found by counting
//! braces, skipping braces that appear in strings, comments and heredocs.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use super::classifier::{LineAction, LineClassifier};
use super::rules::CompiledRules;

lazy_static! {
    static ref RESOURCE_BLOCK_OPEN: Regex =
        Regex::new(r#"^\s*resource\s+"([\w-]+)"\s+"[^"]+"\s*\{"#)
            .expect("Invalid resource block pattern regex");
}

/// Result of scanning one line for structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineScan {
    /// Net `{` minus `}` outside strings, comments and heredocs
    pub delta: i64,
    /// Line opens, belongs to or closes a heredoc and must not be rewritten
    pub verbatim: bool,
}

/// Minimal HCL lexer that only cares about braces
#[derive(Debug, Default)]
pub struct BraceScanner {
    heredoc: Option<String>,
    block_comment: bool,
}

impl BraceScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scan(&mut self, line: &str) -> LineScan {
        if self.heredoc.is_some() {
            if self.heredoc.as_deref() == Some(line.trim()) {
                self.heredoc = None;
            }

            return LineScan {
                delta: 0,
                verbatim: true,
            };
        }

        let chars: Vec<char> = line.chars().collect();
        let mut delta = 0;
        let mut in_string = false;
        let mut escaped = false;
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            let next = chars.get(i + 1).copied();

            if self.block_comment {
                if c == '*' && next == Some('/') {
                    self.block_comment = false;
                    i += 1;
                }
                i += 1;
                continue;
            }

            if in_string {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    in_string = false;
                }
                i += 1;
                continue;
            }

            match c {
                '"' => in_string = true,
                '#' => break,
                '/' if next == Some('/') => break,
                '/' if next == Some('*') => {
                    self.block_comment = true;
                    i += 1;
                }
                '{' => delta += 1,
                '}' => delta -= 1,
                '<' if next == Some('<') => {
                    if let Some(marker) = heredoc_marker(&chars[i + 2..]) {
                        self.heredoc = Some(marker);
                        return LineScan {
                            delta,
                            verbatim: true,
                        };
                    }
                    i += 1;
                }
                _ => {}
            }

            i += 1;
        }

        LineScan {
            delta,
            verbatim: false,
        }
    }
}

/// Parse the identifier following `<<` or `<<-`
fn heredoc_marker(rest: &[char]) -> Option<String> {
    let rest = match rest.first() {
        Some('-') => &rest[1..],
        _ => rest,
    };

    match rest.first() {
        Some(c) if c.is_ascii_alphabetic() || *c == '_' => {}
        _ => return None,
    }

    let marker: String = rest
        .iter()
        .take_while(|c| c.is_ascii_alphanumeric() || **c == '_')
        .collect();

    Some(marker)
}

/// Counters collected by the block pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockPassStats {
    pub removed: usize,
    pub substituted: usize,
    pub kept_by_override: usize,
    pub resource_blocks: Vec<String>,
    pub warnings: Vec<String>,
}

enum TrackerState {
    Outside,
    Inside { resource_type: String, depth: i64 },
    /// Brace counting lost sync; everything after is passed through
    Desynchronized,
}

/// Rewrites resource blocks according to per-type rules
pub struct BlockTracker<'a> {
    rules: &'a CompiledRules,
}

impl<'a> BlockTracker<'a> {
    pub fn new(rules: &'a CompiledRules) -> Self {
        Self { rules }
    }

    pub fn process(&self, content: &str) -> (String, BlockPassStats) {
        let mut output = String::with_capacity(content.len());
        let mut stats = BlockPassStats::default();
        let mut scanner = BraceScanner::new();
        let mut state = TrackerState::Outside;

        for (number, raw) in content.split_inclusive('\n').enumerate() {
            let (text, ending) = split_line_ending(raw);
            let scan = scanner.scan(text);

            state = match state {
                TrackerState::Outside => {
                    if let Some(caps) = RESOURCE_BLOCK_OPEN.captures(text)
                        && !scan.verbatim
                    {
                        let resource_type = caps[1].to_string();
                        debug!(line = number + 1, %resource_type, "Entering resource block");
                        stats.resource_blocks.push(resource_type.clone());
                        output.push_str(raw);

                        if scan.delta > 0 {
                            TrackerState::Inside {
                                resource_type,
                                depth: scan.delta,
                            }
                        } else {
                            TrackerState::Outside
                        }
                    } else {
                        output.push_str(raw);
                        TrackerState::Outside
                    }
                }
                TrackerState::Inside {
                    resource_type,
                    depth,
                } => {
                    let depth = depth + scan.delta;

                    if depth < 0 {
                        let message = format!(
                            "Unbalanced braces at line {} in resource block '{}', remaining lines left untouched",
                            number + 1,
                            resource_type
                        );
                        warn!("{}", message);
                        stats.warnings.push(message);
                        output.push_str(raw);
                        TrackerState::Desynchronized
                    } else {
                        if scan.delta != 0 || scan.verbatim {
                            output.push_str(raw);
                        } else {
                            self.apply(&resource_type, text, ending, number, &mut output, &mut stats);
                        }

                        if depth == 0 {
                            debug!(line = number + 1, %resource_type, "Leaving resource block");
                            TrackerState::Outside
                        } else {
                            TrackerState::Inside {
                                resource_type,
                                depth,
                            }
                        }
                    }
                }
                TrackerState::Desynchronized => {
                    output.push_str(raw);
                    TrackerState::Desynchronized
                }
            };
        }

        if let TrackerState::Inside { resource_type, .. } = state {
            let message = format!(
                "Resource block '{}' is not closed before end of file",
                resource_type
            );
            warn!("{}", message);
            stats.warnings.push(message);
        }

        (output, stats)
    }

    fn apply(
        &self,
        resource_type: &str,
        text: &str,
        ending: &str,
        number: usize,
        output: &mut String,
        stats: &mut BlockPassStats,
    ) {
        let classifier = LineClassifier::new(self.rules.for_type(resource_type));

        match classifier.classify(text) {
            LineAction::Keep => {
                output.push_str(text);
                output.push_str(ending);
            }
            LineAction::KeepOverride => {
                stats.kept_by_override += 1;
                output.push_str(text);
                output.push_str(ending);
            }
            LineAction::Delete => {
                debug!(line = number + 1, %resource_type, text = text.trim(), "Deleting line");
                stats.removed += 1;
            }
            LineAction::Replace { line, warning } => {
                debug!(line = number + 1, %resource_type, "Substituting line");
                stats.substituted += 1;

                if let Some(warning) = warning {
                    let message = format!("{}: {}", resource_type, warning);
                    warn!("{}", message);
                    stats.warnings.push(message);
                }

                output.push_str(&line);
                output.push_str(ending);
            }
        }
    }
}

/// Split a raw line into its text and its terminator (`\n`, `\r\n` or nothing)
fn split_line_ending(raw: &str) -> (&str, &str) {
    if let Some(text) = raw.strip_suffix("\r\n") {
        (text, "\r\n")
    } else if let Some(text) = raw.strip_suffix('\n') {
        (text, "\n")
    } else {
        (raw, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::rules::RuleTable;

    fn rules(yaml: &str) -> CompiledRules {
        RuleTable::from_yaml(yaml).unwrap().compile().unwrap()
    }

    fn type_x_rules() -> CompiledRules {
        rules(
            r#"
resources:
  type_x:
    - action: delete
      pattern: "= 0"
"#,
        )
    }

    #[test]
    fn test_scan_counts_braces() {
        let mut scanner = BraceScanner::new();

        assert_eq!(scanner.scan("resource \"a\" \"b\" {").delta, 1);
        assert_eq!(scanner.scan("  tags = {}").delta, 0);
        assert_eq!(scanner.scan("}").delta, -1);
    }

    #[test]
    fn test_scan_ignores_braces_in_strings_and_comments() {
        let mut scanner = BraceScanner::new();

        assert_eq!(scanner.scan(r#"  name = "{weird}\"{" # }"#).delta, 0);
        assert_eq!(scanner.scan("  x = 1 // {").delta, 0);
        assert_eq!(scanner.scan("  /* { */ y {").delta, 1);
    }

    #[test]
    fn test_scan_block_comment_across_lines() {
        let mut scanner = BraceScanner::new();

        assert_eq!(scanner.scan("/* start {").delta, 0);
        assert_eq!(scanner.scan("still { comment */ }").delta, -1);
    }

    #[test]
    fn test_scan_heredoc_is_verbatim() {
        let mut scanner = BraceScanner::new();

        let open = scanner.scan("  custom_data = <<-EOT");
        assert!(open.verbatim);
        let body = scanner.scan("  } = 0 {");
        assert_eq!(body, LineScan { delta: 0, verbatim: true });
        assert!(scanner.scan("  EOT").verbatim);
        assert!(!scanner.scan("  x = 1").verbatim);
    }

    #[test]
    fn test_scenario_delete_inside_block() {
        let rules = type_x_rules();
        let input = "resource \"type_x\" \"a\" {\n  foo = 0\n  bar = \"baz\"\n}\n";

        let (output, stats) = BlockTracker::new(&rules).process(input);

        assert_eq!(output, "resource \"type_x\" \"a\" {\n  bar = \"baz\"\n}\n");
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.resource_blocks, vec!["type_x".to_string()]);
    }

    #[test]
    fn test_lines_outside_blocks_untouched() {
        let rules = type_x_rules();
        let input = "import {\n  id = 0\n}\nresource \"type_x\" \"a\" {\n  foo = 0\n}\nlocals {\n  z = 0\n}\n";

        let (output, _) = BlockTracker::new(&rules).process(input);

        assert_eq!(
            output,
            "import {\n  id = 0\n}\nresource \"type_x\" \"a\" {\n}\nlocals {\n  z = 0\n}\n"
        );
    }

    #[test]
    fn test_nested_blocks_stay_inside_resource() {
        let rules = type_x_rules();
        let input = concat!(
            "resource \"type_x\" \"a\" {\n",
            "  nested {\n",
            "    inner = 0\n",
            "  }\n",
            "  after = 0\n",
            "}\n",
            "after_block = 0\n",
        );

        let (output, stats) = BlockTracker::new(&rules).process(input);

        assert_eq!(
            output,
            "resource \"type_x\" \"a\" {\n  nested {\n  }\n}\nafter_block = 0\n"
        );
        assert_eq!(stats.removed, 2);
    }

    #[test]
    fn test_structural_lines_are_never_deleted() {
        let rules = rules(
            r#"
resources:
  type_x:
    - action: delete
      pattern: "os_profile"
"#,
        );
        let input = "resource \"type_x\" \"a\" {\n  os_profile {\n    os_profile_name = 1\n  }\n}\n";

        let (output, _) = BlockTracker::new(&rules).process(input);

        assert_eq!(
            output,
            "resource \"type_x\" \"a\" {\n  os_profile {\n  }\n}\n"
        );
    }

    #[test]
    fn test_unknown_type_deletes_nothing() {
        let rules = type_x_rules();
        let input = "resource \"type_unknown\" \"a\" {\n  foo = 0\n}\n";

        let (output, stats) = BlockTracker::new(&rules).process(input);

        assert_eq!(output, input);
        assert_eq!(stats.removed, 0);
    }

    #[test]
    fn test_one_line_block_closes_immediately() {
        let rules = type_x_rules();
        let input = "resource \"type_x\" \"a\" {}\nfoo = 0\n";

        let (output, _) = BlockTracker::new(&rules).process(input);

        assert_eq!(output, input);
    }

    #[test]
    fn test_open_line_is_kept_verbatim() {
        let rules = type_x_rules();
        let input = "resource \"type_x\" \"a\" { foo = 0\n  bar = 0\n}\n";

        let (output, stats) = BlockTracker::new(&rules).process(input);

        assert_eq!(output, "resource \"type_x\" \"a\" { foo = 0\n}\n");
        assert_eq!(stats.removed, 1);
    }

    #[test]
    fn test_stray_brace_outside_block_is_ignored() {
        let rules = type_x_rules();
        let input = "resource \"type_x\" \"a\" {\n}\n}\nresource \"type_x\" \"b\" {\n  foo = 0\n}\n";

        let (output, stats) = BlockTracker::new(&rules).process(input);

        assert_eq!(output, "resource \"type_x\" \"a\" {\n}\n}\nresource \"type_x\" \"b\" {\n}\n");
        assert!(stats.warnings.is_empty());
    }

    #[test]
    fn test_negative_depth_inside_block_desynchronizes() {
        let rules = type_x_rules();
        let input = "resource \"type_x\" \"a\" {\n  foo = 0\n}}\nresource \"type_x\" \"b\" {\n  foo = 0\n}\n";

        let (output, stats) = BlockTracker::new(&rules).process(input);

        assert_eq!(
            output,
            "resource \"type_x\" \"a\" {\n}}\nresource \"type_x\" \"b\" {\n  foo = 0\n}\n"
        );
        assert_eq!(stats.warnings.len(), 1);
    }

    #[test]
    fn test_unclosed_block_is_reported() {
        let rules = type_x_rules();
        let (_, stats) = BlockTracker::new(&rules).process("resource \"type_x\" \"a\" {\n  foo = 0\n");

        assert_eq!(stats.removed, 1);
        assert_eq!(stats.warnings.len(), 1);
    }

    #[test]
    fn test_crlf_line_endings_preserved() {
        let rules = type_x_rules();
        let input = "resource \"type_x\" \"a\" {\r\n  foo = 0\r\n  bar = 1\r\n}\r\n";

        let (output, _) = BlockTracker::new(&rules).process(input);

        assert_eq!(output, "resource \"type_x\" \"a\" {\r\n  bar = 1\r\n}\r\n");
    }

    #[test]
    fn test_heredoc_body_not_classified() {
        let rules = type_x_rules();
        let input = "resource \"type_x\" \"a\" {\n  data = <<EOT\nfoo = 0\n}\nEOT\n  foo = 0\n}\n";

        let (output, _) = BlockTracker::new(&rules).process(input);

        assert_eq!(
            output,
            "resource \"type_x\" \"a\" {\n  data = <<EOT\nfoo = 0\n}\nEOT\n}\n"
        );
    }

    #[test]
    fn test_substitution_warning_recorded() {
        let rules = rules(
            r#"
resources:
  type_x:
    - action: substitute
      pattern: { regex: '^\s*password\s*=' }
      replacement: '  password = "placeholder"'
      warning: "set the real password"
"#,
        );
        let input = "resource \"type_x\" \"a\" {\n  password = null # sensitive\n}\n";

        let (output, stats) = BlockTracker::new(&rules).process(input);

        assert_eq!(output, "resource \"type_x\" \"a\" {\n  password = \"placeholder\"\n}\n");
        assert_eq!(stats.substituted, 1);
        assert_eq!(stats.warnings, vec!["type_x: set the real password".to_string()]);
    }
}

//! Description and tag templating
//!
//! Descriptions are rendered strictly: a `{name}` outside the supported set is
//! a configuration error. Tags are rendered leniently: only an entry that is
//! exactly `{difficulty}` is substituted, anything else passes through as-is.

use super::Difficulty;
use crate::error::MetadataError;

pub const DIFFICULTY_PLACEHOLDER: &str = "difficulty";
pub const KILLED_AT_PLACEHOLDER: &str = "killed_at";
pub const KILLED_ON_PLACEHOLDER: &str = "killed_on";

/// Placeholders a description template may reference
pub const SUPPORTED_PLACEHOLDERS: &[&str] = &[
    DIFFICULTY_PLACEHOLDER,
    KILLED_AT_PLACEHOLDER,
    KILLED_ON_PLACEHOLDER,
];

/// Rendered in place of a captured date or time the filename did not carry
pub const UNKNOWN_VALUE: &str = "unknown";

const DIFFICULTY_TAG: &str = "{difficulty}";

/// Values available to a description template
#[derive(Debug, Clone, Copy)]
pub struct DescriptionFields<'a> {
    pub difficulty: Difficulty,
    pub killed_at: Option<&'a str>,
    pub killed_on: Option<&'a str>,
}

impl DescriptionFields<'_> {
    fn lookup(&self, placeholder: &str) -> Option<String> {
        match placeholder {
            DIFFICULTY_PLACEHOLDER => Some(self.difficulty.to_string()),
            KILLED_AT_PLACEHOLDER => Some(self.killed_at.unwrap_or(UNKNOWN_VALUE).to_string()),
            KILLED_ON_PLACEHOLDER => Some(self.killed_on.unwrap_or(UNKNOWN_VALUE).to_string()),
            _ => None,
        }
    }
}

/// Render a description template, failing on any unsupported placeholder
///
/// `{{` and `}}` are literal braces. A placeholder may carry a string format
/// spec, `{difficulty:>10}`, limited to `[[fill]align][width][.precision]`.
pub fn render_description(
    template: &str,
    fields: &DescriptionFields<'_>,
) -> Result<String, MetadataError> {
    let mut output = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                output.push('{');
            }
            '{' => {
                let mut field = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    field.push(inner);
                }
                if !closed {
                    return Err(MetadataError::malformed_template(
                        template,
                        "unclosed '{'",
                    ));
                }
                let (name, spec) = match field.split_once(':') {
                    Some((name, spec)) => (name, Some(spec)),
                    None => (field.as_str(), None),
                };
                let value = fields
                    .lookup(name)
                    .ok_or_else(|| MetadataError::unsupported_placeholder(name))?;
                match spec {
                    Some(spec) => {
                        let formatted = apply_format_spec(&value, spec).ok_or_else(|| {
                            MetadataError::malformed_template(
                                template,
                                &format!("invalid format spec '{spec}' for {{{name}}}"),
                            )
                        })?;
                        output.push_str(&formatted);
                    }
                    None => output.push_str(&value),
                }
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                output.push('}');
            }
            '}' => {
                return Err(MetadataError::malformed_template(
                    template,
                    "single '}' encountered",
                ));
            }
            other => output.push(other),
        }
    }

    Ok(output)
}

/// Pad and truncate `value` per `[[fill]align][width][.precision]`
///
/// Strings align left unless told otherwise. `None` for anything else.
fn apply_format_spec(value: &str, spec: &str) -> Option<String> {
    let is_align = |c: char| matches!(c, '<' | '>' | '^');
    let mut spec_chars = spec.chars();
    let (fill, align, rest) = match (spec_chars.next(), spec_chars.next()) {
        (Some(fill), Some(align)) if is_align(align) => {
            (fill, align, &spec[fill.len_utf8() + 1..])
        }
        (Some(align), _) if is_align(align) => (' ', align, &spec[1..]),
        _ => (' ', '<', spec),
    };

    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    let (width, precision) = match rest.split_once('.') {
        Some((width, precision)) if digits(precision) => (width, precision.parse().ok()),
        Some(_) => return None,
        None => (rest, None),
    };
    let width: usize = match width {
        "" => 0,
        w if digits(w) => w.parse().ok()?,
        _ => return None,
    };

    let value: String = match precision {
        Some(precision) => value.chars().take(precision).collect(),
        None => value.to_string(),
    };
    let pad = width.saturating_sub(value.chars().count());
    let (left, right) = match align {
        '>' => (pad, 0),
        '^' => (pad / 2, pad - pad / 2),
        _ => (0, pad),
    };

    let mut out = String::with_capacity(value.len() + pad * fill.len_utf8());
    out.extend(std::iter::repeat_n(fill, left));
    out.push_str(&value);
    out.extend(std::iter::repeat_n(fill, right));
    Some(out)
}

/// Check a description template against the supported placeholder set
pub fn validate_description(template: &str) -> Result<(), MetadataError> {
    let sample = DescriptionFields {
        difficulty: Difficulty::Normal,
        killed_at: None,
        killed_on: None,
    };
    render_description(template, &sample).map(|_| ())
}

/// Build the tag list, replacing `{difficulty}` entries at their own index
pub fn render_tags(template: &[String], difficulty: Difficulty) -> Vec<String> {
    template
        .iter()
        .map(|tag| {
            if tag == DIFFICULTY_TAG {
                difficulty.to_string()
            } else {
                tag.clone()
            }
        })
        .collect()
}

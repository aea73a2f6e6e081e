//! Operand template expansion.
//!
//! Templates read like the operand column of a listing:
//! `{rd}, {rn}, #{imm}` or `{rt}, [{rn}, #{imm}]!`. Placeholders expand to
//! named capture groups; `( ... )?` marks an optional group. Matching is
//! anchored and case-insensitive.

use regex::Regex;

use crate::Fault;

const REGISTER: &str = r"r1[0-5]|r[0-9]|sp|lr|pc|ip|fp|sl|sb";
const IMMEDIATE: &str = r"[+-]?(?:0x[0-9a-f]+|[0-9]+)";

fn placeholder(name: &str) -> Result<String, Fault> {
    let group = match name {
        "rd" | "rn" | "rm" | "rt" | "rt2" | "ra" | "rs" | "rdlo" | "rdhi" => {
            format!("(?P<{name}>{REGISTER})")
        }
        "imm" | "imm2" | "lsb" | "width" | "sat" => format!("(?P<{name}>{IMMEDIATE})"),
        "reglist" => r"\{\s*(?P<reglist>[^}]*?)\s*\}".to_owned(),
        "target" => r"(?P<target>(?:0x)?[0-9a-f]+)(?:\s+<[^>]*>)?".to_owned(),
        "shift" => r"(?P<shift>(?:lsl|lsr|asr|ror)\s+#[0-9]+|rrx)".to_owned(),
        "cond" => "(?P<cond>[a-z]{2})".to_owned(),
        "psr" => "(?P<psr>[a-z_]+)".to_owned(),
        other => return Err(Fault::invalid(format!("unknown template placeholder `{other}`"))),
    };
    Ok(group)
}

/// Expands a template into anchored regex source.
///
/// # Errors
///
/// Returns [`Fault::InvalidInstructionForm`] for unknown or unterminated
/// placeholders.
pub fn expand(template: &str) -> Result<String, Fault> {
    let mut source = String::from("(?i)^");
    let mut chars = template.trim().chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '{' => {
                let name: String = chars.by_ref().take_while(|c| *c != '}').collect();
                if name.is_empty() {
                    return Err(Fault::invalid(format!("empty placeholder in `{template}`")));
                }
                source.push_str(&placeholder(&name)?);
            }
            ',' => {
                source.push_str(r"\s*,\s*");
                while chars.next_if_eq(&' ').is_some() {}
            }
            ' ' => source.push_str(r"\s+"),
            '[' => source.push_str(r"\[\s*"),
            ']' => source.push_str(r"\s*\]"),
            '(' => source.push_str("(?:"),
            ')' | '?' => source.push(ch),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push('$');
    Ok(source)
}

/// Compiles a template.
///
/// # Errors
///
/// Returns [`Fault::InvalidInstructionForm`] when the template is malformed.
pub fn compile(template: &str) -> Result<Regex, Fault> {
    let source = expand(template)?;
    Regex::new(&source)
        .map_err(|error| Fault::invalid(format!("operand template `{template}`: {error}")))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::compile;

    #[rstest]
    #[case("{rd}, {rn}, #{imm}", "r1, r0, #10", true)]
    #[case("{rd}, {rn}, #{imm}", "R1,R0,#0x1f", true)]
    #[case("{rd}, {rn}, #{imm}", "r1, r0, r2", false)]
    #[case("{rd}, {rn}, {rm}(, {shift})?", "r1, r0, r2", true)]
    #[case("{rd}, {rn}, {rm}(, {shift})?", "r1, r0, r2, lsl #3", true)]
    #[case("{rt}, [{rn}, #{imm}]!", "r3, [sp, #-8]!", true)]
    #[case("{rt}, [{rn}(, #{imm})?]", "r3, [r4]", true)]
    #[case("{reglist}", "{r4, r5, lr}", true)]
    #[case("{target}", "8010 <loop+0x4>", true)]
    #[case("{rd}, {rn}", "r1, r16", false)]
    fn templates_match_listing_operands(
        #[case] template: &str,
        #[case] text: &str,
        #[case] expected: bool,
    ) {
        let pattern = compile(template).expect("template compiles");
        assert_eq!(pattern.is_match(text), expected, "{template} vs {text}");
    }

    #[test]
    fn captures_are_named_after_placeholders() {
        let pattern = compile("{rd}, {rn}, #{imm}").expect("template compiles");
        let captures = pattern.captures("r1, r0, #10").expect("matches");
        assert_eq!(&captures["rd"], "r1");
        assert_eq!(&captures["rn"], "r0");
        assert_eq!(&captures["imm"], "10");
    }

    #[test]
    fn unknown_placeholders_are_rejected() {
        assert!(compile("{bogus}").is_err());
        assert!(compile("{}").is_err());
    }
}

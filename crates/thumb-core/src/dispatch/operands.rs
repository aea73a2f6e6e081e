use regex::Captures;

use crate::alu::ShiftKind;
use crate::{Condition, Fault, Register, RegisterList};

/// Operand text matched against one entry's pattern, as seen by a decoder.
#[derive(Debug)]
pub struct Operands<'t> {
    mnemonic: &'t str,
    address: u32,
    captures: Captures<'t>,
}

impl<'t> Operands<'t> {
    pub(crate) const fn new(mnemonic: &'t str, address: u32, captures: Captures<'t>) -> Self {
        Self {
            mnemonic,
            address,
            captures,
        }
    }

    /// Mnemonic as written (upper case, width qualifier removed), before any
    /// repair. `IT` decoders read their mask from it.
    #[must_use]
    pub const fn mnemonic(&self) -> &'t str {
        self.mnemonic
    }

    /// Address the instruction was resolved at.
    #[must_use]
    pub const fn address(&self) -> u32 {
        self.address
    }

    /// Raw text of a capture, if the group took part in the match.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&'t str> {
        self.captures.name(name).map(|m| m.as_str())
    }

    /// `true` when the named group took part in the match.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.captures.name(name).is_some()
    }

    fn required(&self, name: &str) -> Result<&'t str, Fault> {
        self.text(name)
            .ok_or_else(|| Fault::invalid(format!("missing operand `{name}`")))
    }

    /// Parses a register capture.
    ///
    /// # Errors
    ///
    /// Returns a decode fault when the capture is absent or not a register.
    pub fn register(&self, name: &str) -> Result<Register, Fault> {
        self.required(name)?.parse()
    }

    /// Parses an optional register capture.
    ///
    /// # Errors
    ///
    /// Returns a decode fault when the capture is present but malformed.
    pub fn opt_register(&self, name: &str) -> Result<Option<Register>, Fault> {
        self.text(name).map(str::parse).transpose()
    }

    /// Parses a decimal or `0x` immediate, with optional sign.
    ///
    /// # Errors
    ///
    /// Returns a decode fault when the capture is absent or out of range.
    pub fn immediate(&self, name: &str) -> Result<i64, Fault> {
        parse_immediate(self.required(name)?)
    }

    /// Parses an optional immediate; absent means `default`.
    ///
    /// # Errors
    ///
    /// Returns a decode fault when the capture is present but malformed.
    pub fn immediate_or(&self, name: &str, default: i64) -> Result<i64, Fault> {
        self.text(name).map_or(Ok(default), parse_immediate)
    }

    /// Immediate reduced to its 32-bit two's-complement pattern.
    ///
    /// # Errors
    ///
    /// Returns a decode fault when the value does not fit in 32 bits either
    /// signed or unsigned.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn word_immediate(&self, name: &str) -> Result<u32, Fault> {
        let value = self.immediate(name)?;
        if value < i64::from(i32::MIN) || value > i64::from(u32::MAX) {
            return Err(Fault::invalid(format!("immediate {value} exceeds 32 bits")));
        }
        Ok(value as u32)
    }

    /// Immediate that must lie within `range`.
    ///
    /// # Errors
    ///
    /// Returns a decode fault naming `what` when out of range.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn bounded(
        &self,
        name: &str,
        range: std::ops::RangeInclusive<i64>,
        what: &str,
    ) -> Result<u32, Fault> {
        let value = self.immediate(name)?;
        if !range.contains(&value) {
            return Err(Fault::invalid(format!(
                "{what} {value} outside {}..={}",
                range.start(),
                range.end()
            )));
        }
        Ok(value as u32)
    }

    /// Parses the optional `{shift}` capture into a kind and amount.
    ///
    /// # Errors
    ///
    /// Returns a decode fault when the amount is not encodable for the kind.
    pub fn shift(&self) -> Result<Option<(ShiftKind, u32)>, Fault> {
        let Some(text) = self.text("shift") else {
            return Ok(None);
        };
        let mut parts = text.split_whitespace();
        let kind: ShiftKind = parts.next().unwrap_or_default().parse()?;
        let amount = match parts.next() {
            Some(amount) => {
                let amount = parse_immediate(amount.trim_start_matches('#'))?;
                u32::try_from(amount)
                    .map_err(|_| Fault::invalid(format!("negative shift amount in `{text}`")))?
            }
            None => 1,
        };
        if !kind.accepts_immediate(amount) {
            return Err(Fault::invalid(format!("shift amount out of range in `{text}`")));
        }
        Ok(Some((kind, amount)))
    }

    /// Parses the `{reglist}` capture.
    ///
    /// # Errors
    ///
    /// Returns a decode fault for unknown registers or descending ranges.
    pub fn register_list(&self) -> Result<RegisterList, Fault> {
        self.required("reglist")?.parse()
    }

    /// Parses the `{target}` capture as an absolute hexadecimal address.
    ///
    /// # Errors
    ///
    /// Returns a decode fault when the address is not valid hexadecimal.
    pub fn target(&self) -> Result<u32, Fault> {
        let text = self.required("target")?;
        let digits = text.trim_start_matches("0x").trim_start_matches("0X");
        u32::from_str_radix(digits, 16)
            .map_err(|_| Fault::invalid(format!("invalid branch target `{text}`")))
    }

    /// Parses the `{cond}` capture.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnrecognizedCondition`] for unknown text.
    pub fn condition(&self) -> Result<Condition, Fault> {
        self.required("cond")?.parse()
    }
}

fn parse_immediate(text: &str) -> Result<i64, Fault> {
    let trimmed = text.trim();
    let (negative, body) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let magnitude = match body
        .strip_prefix("0x")
        .or_else(|| body.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => body.parse::<i64>(),
    }
    .map_err(|_| Fault::invalid(format!("invalid immediate `{text}`")))?;
    Ok(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{parse_immediate, Operands};
    use crate::alu::ShiftKind;
    use crate::dispatch::pattern::compile;
    use crate::Register;

    #[rstest]
    #[case("10", 10)]
    #[case("-8", -8)]
    #[case("0x1F", 31)]
    #[case("-0x10", -16)]
    #[case("+4", 4)]
    fn immediates_parse(#[case] text: &str, #[case] expected: i64) {
        assert_eq!(parse_immediate(text), Ok(expected));
    }

    #[test]
    fn operand_accessors_read_named_groups() {
        let pattern = compile("{rd}, {rn}, {rm}(, {shift})?").expect("template");
        let captures = pattern.captures("r1, sp, ip, asr #4").expect("matches");
        let operands = Operands::new("ADD", 0x8000, captures);
        assert_eq!(operands.register("rd"), Ok(Register::R1));
        assert_eq!(operands.register("rn"), Ok(Register::Sp));
        assert_eq!(operands.register("rm"), Ok(Register::R12));
        assert_eq!(operands.shift(), Ok(Some((ShiftKind::Asr, 4))));
        assert_eq!(operands.opt_register("rt"), Ok(None));
    }

    #[test]
    fn out_of_range_shift_is_a_decode_fault() {
        let pattern = compile("{rd}, {rm}(, {shift})?").expect("template");
        let captures = pattern.captures("r1, r2, lsl #32").expect("matches");
        assert!(Operands::new("MOV", 0, captures).shift().is_err());
    }

    #[test]
    fn targets_are_hexadecimal() {
        let pattern = compile("{target}").expect("template");
        let captures = pattern.captures("801a <loop>").expect("matches");
        assert_eq!(Operands::new("B", 0x8000, captures).target(), Ok(0x801A));
    }
}

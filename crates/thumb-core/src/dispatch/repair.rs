//! Mnemonic normalization and the single-retry repair rules.

use crate::{Condition, CONDITION_SUFFIXES};

/// Hints with no architectural effect in this model.
pub const HINT_MNEMONICS: [&str; 13] = [
    "NOP", "YIELD", "WFE", "WFI", "SEV", "DMB", "DSB", "ISB", "PLD", "PLI", "CPSIE", "CPSID",
    "CLREX",
];

/// Upper-cases a mnemonic and removes a `.N`/`.W` width qualifier.
#[must_use]
pub fn normalize(mnemonic: &str) -> String {
    let upper = mnemonic.trim().to_ascii_uppercase();
    match upper.strip_suffix(".N").or_else(|| upper.strip_suffix(".W")) {
        Some(stem) => stem.to_owned(),
        None => upper,
    }
}

/// Outcome of the repair rules for a mnemonic the registry does not know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repaired {
    /// Name to retry the lookup with.
    pub mnemonic: String,
    /// Condition taken from a stripped suffix.
    pub condition: Option<Condition>,
}

/// `true` for `IT` followed by up to three `T`/`E` letters.
#[must_use]
pub fn is_it_variant(mnemonic: &str) -> bool {
    mnemonic
        .strip_prefix("IT")
        .is_some_and(|mask| mask.len() <= 3 && mask.bytes().all(|b| b == b'T' || b == b'E'))
}

/// Applies the repair rules to a normalized mnemonic.
///
/// Conditional-block variants collapse to `IT`; otherwise a trailing
/// condition suffix is split off, then an `IA` suffix is dropped. Returns
/// `None` when no rule applies.
#[must_use]
pub fn repair(mnemonic: &str) -> Option<Repaired> {
    if is_it_variant(mnemonic) {
        return (mnemonic != "IT").then(|| Repaired {
            mnemonic: "IT".to_owned(),
            condition: None,
        });
    }

    let mut stem = mnemonic;
    let mut condition = None;
    for suffix in CONDITION_SUFFIXES {
        if let Some(rest) = stem.strip_suffix(suffix) {
            if !rest.is_empty() {
                condition = suffix.parse().ok();
                stem = rest;
                break;
            }
        }
    }

    let collapsed = ["LDMIA", "STMIA"]
        .iter()
        .find(|name| stem == **name)
        .map_or(stem, |name| &name[..3]);

    (collapsed != mnemonic).then(|| Repaired {
        mnemonic: collapsed.to_owned(),
        condition,
    })
}

/// `true` when the mnemonic is an allow-listed hint.
#[must_use]
pub fn is_hint(mnemonic: &str) -> bool {
    HINT_MNEMONICS.contains(&mnemonic)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{is_hint, is_it_variant, normalize, repair, Repaired};
    use crate::Condition;

    #[rstest]
    #[case("adds", "ADDS")]
    #[case("bne.n", "BNE")]
    #[case("LDR.W", "LDR")]
    #[case("  mov ", "MOV")]
    fn normalization(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize(raw), expected);
    }

    #[rstest]
    #[case("BNE", "B", Some(Condition::Ne))]
    #[case("ADDEQ", "ADD", Some(Condition::Eq))]
    #[case("ADDSGT", "ADDS", Some(Condition::Gt))]
    #[case("BLS", "B", Some(Condition::Ls))]
    #[case("LDMIA", "LDM", None)]
    #[case("STMIA", "STM", None)]
    #[case("LDMIAEQ", "LDM", Some(Condition::Eq))]
    #[case("ITTE", "IT", None)]
    fn repair_rules(
        #[case] mnemonic: &str,
        #[case] expected: &str,
        #[case] condition: Option<Condition>,
    ) {
        assert_eq!(
            repair(mnemonic),
            Some(Repaired {
                mnemonic: expected.to_owned(),
                condition,
            })
        );
    }

    #[rstest]
    #[case("IT")]
    #[case("FOO")]
    #[case("EQ")]
    fn nothing_to_repair(#[case] mnemonic: &str) {
        assert_eq!(repair(mnemonic), None);
    }

    #[test]
    fn it_variants_and_hints() {
        assert!(is_it_variant("ITET"));
        assert!(!is_it_variant("ITETTE"));
        assert!(!is_it_variant("ITX"));
        assert!(is_hint("DMB"));
        assert!(!is_hint("ADD"));
    }
}

#![no_main]

use libfuzzer_sys::fuzz_target;
use thumb_core::{Engine, EngineConfig, Register, SparseMemory, Word};

const MNEMONICS: &[&str] = &[
    "adds", "add.w", "subs", "movs", "mov", "lsls", "asrs", "rors", "cmp", "mul", "sdiv",
    "ssat", "usat16", "qadd8", "uhsub16", "sel", "bfi", "ubfx", "rev16", "sxtah", "ldr",
    "ldrsb", "strh", "ldrd", "stmdb", "pop", "push", "b", "bl", "bx", "cbz", "tbb", "it",
    "itete", "bkpt", "mrs", "msr", "nop",
];

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let Ok(operands) = std::str::from_utf8(rest) else {
        return;
    };
    let mnemonic = MNEMONICS[usize::from(selector) % MNEMONICS.len()];

    let Ok(mut engine) = Engine::new(&EngineConfig::default()) else {
        return;
    };
    let mut memory = SparseMemory::new();
    memory.map_zeroed(0x2000_0000, 0x100);
    for (index, register) in [Register::R0, Register::R1, Register::R2, Register::R3]
        .into_iter()
        .enumerate()
    {
        engine.write(register, Word::new(0x2000_0000 + 0x10 * index as u32));
    }

    let _ = engine.step(mnemonic, operands, 4, &mut memory);
    let _ = engine.step("nop", "", 2, &mut memory);
});

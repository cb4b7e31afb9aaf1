use proptest::prelude::*;

use super::*;
use crate::rom::ROM_BASE;

/// Build a ROM image from halfwords and walk it from the base.
macro_rules! disassemble {
    { $($half:expr),* $(,)? } => {
        {
            let mut image: Vec<u8> = Vec::new();
            $(
                image.extend_from_slice(&u16::to_le_bytes($half));
            )*
            let symbols = SymbolTable::default();
            Disassembler::new(Rom::new(&image), &symbols)
                .disassemble(ROM_BASE)
                .expect("walk succeeds")
        }
    }
}

fn texts(disassembly: Disassembly) -> Vec<String> {
    disassembly.into_iter().map(|item| item.to_string()).collect()
}

#[test]
fn a_straight_line_function_decodes_in_order() {
    let items: Vec<Item> = disassemble! {
        0x2001, // mov r0, #1
        0x4770, // bx lr
    }
    .into_iter()
    .collect();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].address(), ROM_BASE);
    assert_eq!(items[0].to_string(), "mov\tr0, #1");
    assert_eq!(items[1].address(), ROM_BASE + 2);
    assert_eq!(items[1].to_string(), "bx\tlr");
}

#[test]
fn the_entry_gets_a_sub_label() {
    let items: Vec<Item> = disassemble! { 0x4770 }.into_iter().collect();
    assert_eq!(items[0].label(), Some("sub_8000000"));
}

#[test]
fn literal_pools_are_materialised_after_the_code() {
    // ldr r0, [pc, #0]; bx lr; .word 0xDEADBEEF
    let items: Vec<Item> = disassemble! { 0x4800, 0x4770, 0xBEEF, 0xDEAD }
        .into_iter()
        .collect();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].to_string(), "ldr\tr0, =0xdeadbeef");
    assert_eq!(items[1].to_string(), "bx\tlr");
    // The pool word is contiguous with the code: no alignment filler
    assert_eq!(items[2].address(), ROM_BASE + 4);
    assert_eq!(items[2].kind(), ItemKind::Data);
    assert_eq!(items[2].to_string(), ".word 0xDEADBEEF");
    assert_eq!(items[2].label(), Some("off_8000004"));
}

#[test]
fn holes_between_items_become_alignment() {
    // The load sits on a misaligned pc, so its pool word lands a
    // halfword past the end of the code
    let items: Vec<Item> = disassemble! {
        0x2001, // mov r0, #1
        0x4901, // ldr r1, [pc, #4] -> word at +8
        0x4770, // bx lr
        0xFFFF, // skipped pool padding
        0xBEEF, 0xDEAD,
    }
    .into_iter()
    .collect();
    assert_eq!(items.len(), 5);
    assert_eq!(items[3].kind(), ItemKind::Align);
    assert_eq!(items[3].address(), ROM_BASE + 6);
    assert_eq!(items[3].size(), 2);
    assert_eq!(items[3].to_string(), ".align 2");
    assert_eq!(items[4].kind(), ItemKind::Data);
    assert_eq!(items[4].address(), ROM_BASE + 8);
    assert_eq!(items[4].to_string(), ".word 0xDEADBEEF");
}

#[test]
fn a_symmetric_push_pop_ends_the_path() {
    // push {r4, lr}; mov r4, #1; pop {r4, pc}; (garbage that must not decode)
    let disassembly = disassemble! { 0xB510, 0x2401, 0xBD10, 0xFFFF };
    let items = texts(disassembly);
    assert_eq!(
        items,
        vec!["push\t{r4, lr}", "mov\tr4, #1", "pop\t{r4, pc}"]
    );
}

#[test]
fn a_pop_without_lr_provenance_continues_the_path() {
    // push {r4}; pop {r4, pc}: pc receives r4's neighbour slot, which
    // is untracked, so the walk keeps decoding into bx lr
    let disassembly = disassemble! { 0xB410, 0xBD10, 0x4770 };
    let items = texts(disassembly);
    assert_eq!(items, vec!["push\t{r4}", "pop\t{r4, pc}", "bx\tlr"]);
}

#[test]
fn conditional_branches_follow_both_edges() {
    // cmp r0, #0; beq over the then-arm; both arms return
    let disassembly = disassemble! {
        0x2800, // cmp r0, #0
        0xD001, // beq loc_8000008
        0x2001, // mov r0, #1
        0x4770, // bx lr
        0x2002, // mov r0, #2
        0x4770, // bx lr
    };
    let labels = disassembly.labels().clone();
    assert_eq!(labels.get(&(ROM_BASE + 8)), Some(&"loc_8000008".to_string()));
    let items: Vec<Item> = disassembly.into_iter().collect();
    assert_eq!(items.len(), 6);
    // Both the fall-through and the target were decoded
    assert_eq!(items[2].to_string(), "mov\tr0, #1");
    assert_eq!(items[4].to_string(), "mov\tr0, #2");
    // The label joined its owning item
    assert_eq!(items[4].label(), Some("loc_8000008"));
    assert_eq!(items[2].label(), None);
}

#[test]
fn unconditional_branches_do_not_fall_through() {
    // b +2; (skipped halfword); target: bx lr
    let disassembly = disassemble! {
        0xE001, // b loc_8000006
        0xFFFF, // never decoded
        0xFFFF, // never decoded
        0x4770, // bx lr
    };
    let items: Vec<Item> = disassembly.into_iter().collect();
    // The skipped halfwords surface as alignment, not instructions
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].to_string(), "b\tloc_8000006");
    assert_eq!(items[1].kind(), ItemKind::Align);
    assert_eq!(items[1].size(), 4);
    assert_eq!(items[2].to_string(), "bx\tlr");
    assert_eq!(items[2].label(), Some("loc_8000006"));
}

#[test]
fn backward_branches_terminate_through_the_visited_set() {
    // loop: sub r0, #1; bne loop; bx lr
    let disassembly = disassemble! {
        0x3801, // sub r0, #1
        0xD1FD, // bne loc_8000000
        0x4770, // bx lr
    };
    let items: Vec<Item> = disassembly.into_iter().collect();
    assert_eq!(items.len(), 3);
    // The entry keeps its sub_ label even though it is a jump target
    assert_eq!(items[0].label(), Some("sub_8000000"));
    assert_eq!(items[1].to_string(), "bne\tloc_8000000");
}

#[test]
fn calls_do_not_end_the_path() {
    // bl somewhere-ahead; bx lr
    let disassembly = disassemble! {
        0xF000, 0xF802, // bl 0x08000008
        0x4770,         // bx lr
        0xFFFF,         // padding, never decoded
        0x4770,         // call target: bx lr
    };
    let items: Vec<Item> = disassembly.into_iter().collect();
    // The call target is *not* walked; only the linear path continues
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].to_string(), "bl\t0x08000008");
    assert_eq!(items[1].to_string(), "bx\tlr");
}

#[test]
fn running_off_the_image_is_an_error() {
    let image = u16::to_le_bytes(0x2001); // mov r0, #1, then nothing
    let symbols = SymbolTable::default();
    let result = Disassembler::new(Rom::new(&image), &symbols).disassemble(ROM_BASE);
    assert_eq!(
        result.err(),
        Some(DisasmError::UnexpectedEndOfStream {
            address: ROM_BASE + 2
        })
    );
}

#[test]
fn odd_entry_addresses_are_rejected() {
    let image = [0u8; 4];
    let symbols = SymbolTable::default();
    let result = Disassembler::new(Rom::new(&image), &symbols).disassemble(ROM_BASE + 1);
    assert!(matches!(
        result,
        Err(DisasmError::UnsupportedConstruct { .. })
    ));
}

#[test]
fn entries_outside_the_rom_are_rejected() {
    let image = [0u8; 4];
    let symbols = SymbolTable::default();
    let result = Disassembler::new(Rom::new(&image), &symbols).disassemble(0x0200_0000);
    assert_eq!(
        result.err(),
        Some(DisasmError::AddressOutOfRom {
            address: 0x0200_0000
        })
    );
}

proptest! {
    /// Any successful walk yields items strictly ordered by address
    /// with no holes, and labels exactly where the label map says.
    #[test]
    fn output_is_contiguous_and_labelled_consistently(
        body in proptest::collection::vec(
            // A pool of effect-free halfwords: mov/add/cmp immediates
            prop_oneof![
                (0u16..8).prop_map(|r| 0x2000 | (r << 8) | 1),
                (0u16..8).prop_map(|r| 0x3000 | (r << 8) | 4),
                (0u16..8).prop_map(|r| 0x2800 | (r << 8)),
            ],
            0..24,
        )
    ) {
        let mut image: Vec<u8> = Vec::new();
        for half in &body {
            image.extend_from_slice(&u16::to_le_bytes(*half));
        }
        image.extend_from_slice(&u16::to_le_bytes(0x4770)); // bx lr
        let symbols = SymbolTable::default();
        let disassembly = Disassembler::new(Rom::new(&image), &symbols)
            .disassemble(ROM_BASE)
            .expect("straight-line code walks");
        let labels = disassembly.labels().clone();
        let items: Vec<Item> = disassembly.into_iter().collect();
        prop_assert_eq!(items.len(), body.len() + 1);
        let mut predicted = ROM_BASE;
        for item in &items {
            prop_assert_eq!(item.address(), predicted);
            predicted = item.address() + item.size();
            let expected = labels.get(&item.address()).map(String::as_str);
            prop_assert_eq!(item.label(), expected);
        }
    }
}

mod common;

use tacmips::backend::{
    mips::{
        lower_function,
        regs::{self, ALLOCATABLE_REGS},
        Frame,
        LowerError,
        MipsLowering,
    },
    reg_alloc::RegisterAllocMap,
};

use common::{alloc_map, asm, instr};
use tacmips::tac::{Exp, Instr, Prim};

/// `x`, `y`, `z` in `$s0`..`$s2`, `p` and `q` in spill slots 0 and 1.
fn full_map() -> RegisterAllocMap {
    alloc_map(
        16,
        &[("x", 0), ("y", 1), ("z", 2), ("p", 16), ("q", 17)],
    )
}

fn lower(map: &RegisterAllocMap, src: &str) -> String {
    let lowering = MipsLowering::new("main", map, Frame::new(map.spill_slots(), false));
    asm(&lowering.lower_instr(&instr(src)).unwrap())
}

fn lower_err(map: &RegisterAllocMap, src: &str) -> LowerError {
    let lowering = MipsLowering::new("main", map, Frame::new(map.spill_slots(), false));
    lowering.lower_instr(&instr(src)).unwrap_err()
}

#[test]
fn test_lower_copies() {
    let map = full_map();

    assert_eq!(lower(&map, "x = 5"), "li $s0, 5");
    assert_eq!(lower(&map, "x = -5"), "li $s0, -5");
    assert_eq!(lower(&map, "x = y"), "move $s0, $s1");
    assert_eq!(lower(&map, "x = x"), "");
}

#[test]
fn test_lower_register_operands() {
    let map = full_map();

    assert_eq!(lower(&map, "x = y + z"), "add $s0, $s1, $s2");
    assert_eq!(lower(&map, "x = y - z"), "sub $s0, $s1, $s2");
    assert_eq!(lower(&map, "x = y * z"), "mul $s0, $s1, $s2");
    assert_eq!(lower(&map, "x = y == z"), "seq $s0, $s1, $s2");
    assert_eq!(lower(&map, "x = y != z"), "sne $s0, $s1, $s2");
    assert_eq!(lower(&map, "x = y < z"), "slt $s0, $s1, $s2");
    assert_eq!(lower(&map, "x = y > z"), "sgt $s0, $s1, $s2");
    assert_eq!(lower(&map, "x = y <= z"), "sle $s0, $s1, $s2");
    assert_eq!(lower(&map, "x = y >= z"), "sge $s0, $s1, $s2");
    assert_eq!(lower(&map, "x = x + x"), "add $s0, $s0, $s0");
}

#[test]
fn test_lower_immediates() {
    let map = full_map();

    assert_eq!(lower(&map, "x = y + 7"), "addi $s0, $s1, 7");
    assert_eq!(lower(&map, "x = y + -32768"), "addi $s0, $s1, -32768");
    assert_eq!(lower(&map, "x = y < 7"), "slti $s0, $s1, 7");
    // commutative with an immediate form: the constant moves right
    assert_eq!(lower(&map, "x = 7 + y"), "addi $s0, $s1, 7");
}

#[test]
fn test_lower_materialized_constants() {
    let map = full_map();

    assert_eq!(lower(&map, "x = y - 7"), "li $t8, 7; sub $s0, $s1, $t8");
    assert_eq!(lower(&map, "x = 7 - y"), "li $t8, 7; sub $s0, $t8, $s1");
    assert_eq!(lower(&map, "x = 7 < y"), "li $t8, 7; slt $s0, $t8, $s1");
    assert_eq!(lower(&map, "x = y * 3"), "li $t8, 3; mul $s0, $s1, $t8");
    assert_eq!(lower(&map, "x = 3 == y"), "li $t8, 3; seq $s0, $t8, $s1");
    assert_eq!(
        lower(&map, "x = y + 100000"),
        "li $t8, 100000; add $s0, $s1, $t8"
    );
}

#[test]
fn test_lower_constant_operands() {
    let map = full_map();

    assert_eq!(lower(&map, "x = 2 + 3"), "li $s0, 2; addi $s0, $s0, 3");
    assert_eq!(lower(&map, "x = 2 < 3"), "li $s0, 2; slti $s0, $s0, 3");
    assert_eq!(
        lower(&map, "x = 2 * 3"),
        "li $s0, 2; li $t8, 3; mul $s0, $s0, $t8"
    );
    assert_eq!(
        lower(&map, "p = 2 + 3"),
        "li $t8, 2; addi $t8, $t8, 3; sw $t8, 0($sp)"
    );
}

#[test]
fn test_lower_spilled_operands() {
    let map = full_map();

    assert_eq!(lower(&map, "x = p + y"), "lw $t8, 0($sp); add $s0, $t8, $s1");
    assert_eq!(lower(&map, "x = y - q"), "lw $t8, 4($sp); sub $s0, $s1, $t8");
    assert_eq!(lower(&map, "x = p + 1"), "lw $t8, 0($sp); addi $s0, $t8, 1");
    assert_eq!(lower(&map, "x = p * p"), "lw $t8, 0($sp); mul $s0, $t8, $t8");
    assert_eq!(
        lower(&map, "x = 9 - q"),
        "li $t8, 9; lw $t9, 4($sp); sub $s0, $t8, $t9"
    );
}

#[test]
fn test_lower_spilled_destination() {
    let map = full_map();

    assert_eq!(lower(&map, "p = x + y"), "add $t8, $s0, $s1; sw $t8, 0($sp)");
    assert_eq!(lower(&map, "p = x + 1"), "addi $t8, $s0, 1; sw $t8, 0($sp)");
    assert_eq!(
        lower(&map, "p = q + p"),
        "lw $t8, 4($sp); lw $t9, 0($sp); add $t8, $t8, $t9; sw $t8, 0($sp)"
    );
    assert_eq!(
        lower(&map, "q = q - 1"),
        "lw $t8, 4($sp); li $t9, 1; sub $t8, $t8, $t9; sw $t8, 4($sp)"
    );
}

#[test]
fn test_lower_spilled_copies() {
    let map = full_map();

    assert_eq!(lower(&map, "p = x"), "sw $s0, 0($sp)");
    assert_eq!(lower(&map, "x = p"), "lw $s0, 0($sp)");
    assert_eq!(lower(&map, "p = q"), "lw $t8, 4($sp); sw $t8, 0($sp)");
    assert_eq!(lower(&map, "p = p"), "");
    assert_eq!(lower(&map, "p = 9"), "li $t8, 9; sw $t8, 0($sp)");
}

#[test]
fn test_lower_control_flow() {
    let map = full_map();

    assert_eq!(lower(&map, "L1:"), "main.L1:");
    assert_eq!(lower(&map, "goto L1"), "j main.L1");
    assert_eq!(lower(&map, "if x goto L1"), "bnez $s0, main.L1");
    assert_eq!(lower(&map, "if p goto L1"), "lw $t8, 0($sp); bnez $t8, main.L1");
    assert_eq!(lower(&map, "if 1 goto L1"), "j main.L1");
    assert_eq!(lower(&map, "if 0 goto L1"), "");

    // a block label never collides with the unit label
    assert_eq!(lower(&map, "main:"), "main.main:");
    let lowering = MipsLowering::new("f", &map, Frame::new(map.spill_slots(), false));
    assert_eq!(
        asm(&lowering.lower_instr(&instr("goto main")).unwrap()),
        "j f.main"
    );
}

#[test]
fn test_lower_calls() {
    let map = full_map();

    assert_eq!(lower(&map, "x = input_int()"), "jal input_int; move $s0, $v0");
    assert_eq!(lower(&map, "print(x)"), "move $a0, $s0; jal print");
    assert_eq!(lower(&map, "print(5)"), "li $a0, 5; jal print");
    assert_eq!(
        lower(&map, "p = f(p, 1, y, z)"),
        "lw $a0, 0($sp); li $a1, 1; move $a2, $s1; move $a3, $s2; jal f; sw $v0, 0($sp)"
    );
}

#[test]
fn test_lower_errors() {
    let map = full_map();

    assert!(matches!(
        lower_err(&map, "f(1, 2, 3, 4, 5)"),
        LowerError::TooManyArguments { count: 5, .. }
    ));
    assert!(matches!(
        lower_err(&map, "x = print(1)"),
        LowerError::VoidResult(callee) if callee.name() == "print"
    ));
    assert!(matches!(
        lower_err(&map, "w = 1"),
        LowerError::Unallocated(v) if v.name() == "w"
    ));
    assert!(matches!(
        lower_err(&map, "x = w + 1"),
        LowerError::Unallocated(v) if v.name() == "w"
    ));

    let lowering = MipsLowering::new("main", &map, Frame::new(map.spill_slots(), false));
    let wide = Instr::assign("x", Exp::Prim(Prim::Const(9999999999)));
    assert!(matches!(
        lowering.lower_instr(&wide),
        Err(LowerError::ConstantOutOfRange(9999999999))
    ));
}

#[test]
fn test_lower_scratch_from_unused_budget() {
    // with a budget of 4, `$s4` is free to use as scratch
    let map = alloc_map(4, &[("x", 0), ("y", 1), ("p", 4)]);

    assert_eq!(lower(&map, "x = y - 7"), "li $s4, 7; sub $s0, $s1, $s4");
    assert_eq!(lower(&map, "p = x * y"), "mul $s4, $s0, $s1; sw $s4, 0($sp)");
    assert_eq!(regs::scratch_candidates(16), vec![regs::t8(), regs::t9()]);
    assert_eq!(regs::scratch_candidates(14).len(), 4);
}

#[test]
fn test_lower_scratch_avoids_allocated() {
    let map = alloc_map(2, &[("x", 0), ("y", 1), ("p", 2), ("q", 3)]);
    let allocated = &ALLOCATABLE_REGS[..2];
    let lowering = MipsLowering::new("main", &map, Frame::new(map.spill_slots(), false));

    for src in [
        "x = y - 3",
        "x = 3 - y",
        "y = x * x",
        "p = x + y",
        "p = q * p",
        "q = 4 * 5",
        "x = p < q",
        "if q goto L",
        "p = q",
    ] {
        let tac = instr(src);
        let dst = match &tac {
            tacmips::tac::Instr::Assign(dst, _) => map.location(dst),
            tacmips::tac::Instr::Call(..)
            | tacmips::tac::Instr::GotoIf(..)
            | tacmips::tac::Instr::Goto(_)
            | tacmips::tac::Instr::Label(_) => None,
        };
        let dst_reg = match dst {
            Some(tacmips::backend::reg_alloc::Location::Register(r)) => Some(ALLOCATABLE_REGS[r]),
            Some(tacmips::backend::reg_alloc::Location::Spill(_)) | None => None,
        };

        let insts = lowering.lower_instr(&tac).unwrap();
        for inst in &insts {
            for def in inst.defs() {
                if Some(def) != dst_reg {
                    assert!(
                        !allocated.contains(&def),
                        "`{}` clobbers {} in `{}`",
                        src,
                        def,
                        asm(&insts)
                    );
                }
            }
        }
        // at most two scratch registers per instruction
        let mut scratches: Vec<_> = insts
            .iter()
            .flat_map(|i| i.defs())
            .filter(|r| Some(*r) != dst_reg)
            .collect();
        scratches.sort();
        scratches.dedup();
        assert!(scratches.len() <= 2, "`{}` uses {:?}", src, scratches);

        // a scratch register is written before it is read
        let mut written = Vec::new();
        for inst in &insts {
            for used in inst.uses() {
                if scratches.contains(&used) {
                    assert!(
                        written.contains(&used),
                        "`{}` reads {} before writing it in `{}`",
                        src,
                        used,
                        asm(&insts)
                    );
                }
            }
            written.extend(inst.defs());
        }
    }
}

#[test]
fn test_lower_function_frames() {
    let cfg = common::cfg("x = 1");
    let map = alloc_map(16, &[("x", 8)]);
    let function = lower_function("main", &cfg, &map).unwrap();

    // `$t0` is not preserved for the caller, no frame needed
    assert!(function.frame().is_empty());
    assert_eq!(asm(&function.instrs().unwrap()), "li $t0, 1; jr $ra");
    assert_eq!(
        function.to_string(),
        "\t.text\n\t.globl main\nmain:\n\tli $t0, 1\n\tjr $ra\n"
    );

    let map = alloc_map(16, &[("x", 0)]);
    let function = lower_function("main", &cfg, &map).unwrap();

    assert_eq!(function.frame().callee_saved(), &[regs::s0()]);
    assert_eq!(
        function.to_string(),
        "\t.text\n\t.globl main\nmain:\n\
         \taddi $sp, $sp, -4\n\tsw $s0, 0($sp)\n\
         \tli $s0, 1\n\
         \tlw $s0, 0($sp)\n\taddi $sp, $sp, 4\n\tjr $ra\n"
    );

    let cfg = common::cfg("x = input_int()\nprint(x)");
    let function = lower_function("main", &cfg, &map).unwrap();

    assert_eq!(function.frame().size(), 8);
    assert_eq!(
        asm(&function.instrs().unwrap()),
        "addi $sp, $sp, -8; sw $ra, 4($sp); sw $s0, 0($sp); \
         jal input_int; move $s0, $v0; move $a0, $s0; jal print; \
         lw $s0, 0($sp); lw $ra, 4($sp); addi $sp, $sp, 8; jr $ra"
    );
}

#[test]
fn test_lower_function_saves_scratch() {
    // a budget of one leaves `$s1` as scratch, which the unit must preserve
    let cfg = common::cfg("x = input_int()\np = x + 1\nprint(p)");
    let map = alloc_map(1, &[("x", 0), ("p", 1)]);
    let function = lower_function("main", &cfg, &map).unwrap();

    assert_eq!(function.frame().callee_saved(), &[regs::s0(), regs::s1()]);
    assert_eq!(function.frame().size(), 16);
    assert_eq!(
        asm(&function.prologue().unwrap()),
        "addi $sp, $sp, -16; sw $ra, 12($sp); sw $s0, 4($sp); sw $s1, 8($sp)"
    );
    assert_eq!(
        asm(function.body()),
        "jal input_int; move $s0, $v0; \
         addi $s1, $s0, 1; sw $s1, 0($sp); \
         lw $a0, 0($sp); jal print"
    );
    assert_eq!(
        asm(&function.epilogue().unwrap()),
        "lw $s0, 4($sp); lw $s1, 8($sp); lw $ra, 12($sp); addi $sp, $sp, 16; jr $ra"
    );
}

#[test]
fn test_lower_function_saves_around_calls() {
    // `x` lives in caller-saved `$t0` across both prints
    let cfg = common::cfg("x = input_int()\nprint(1)\nprint(x)");
    let map = alloc_map(16, &[("x", 8)]);
    let function = lower_function("main", &cfg, &map).unwrap();

    assert_eq!(function.frame().call_saved(), &[regs::t0()]);
    assert!(function.frame().callee_saved().is_empty());
    assert_eq!(
        asm(&function.instrs().unwrap()),
        "addi $sp, $sp, -8; sw $ra, 4($sp); \
         jal input_int; move $t0, $v0; \
         sw $t0, 0($sp); li $a0, 1; jal print; lw $t0, 0($sp); \
         sw $t0, 0($sp); move $a0, $t0; jal print; lw $t0, 0($sp); \
         lw $ra, 4($sp); addi $sp, $sp, 8; jr $ra"
    );

    // save slots sit above the spill slots
    let cfg = common::cfg("p = input_int()\ny = f(p)\nprint(y)");
    let map = alloc_map(16, &[("p", 16), ("y", 9)]);
    let function = lower_function("main", &cfg, &map).unwrap();

    assert_eq!(function.frame().call_saved(), &[regs::t1()]);
    assert_eq!(
        asm(function.body()),
        "sw $t1, 4($sp); jal input_int; lw $t1, 4($sp); sw $v0, 0($sp); \
         lw $a0, 0($sp); jal f; move $t1, $v0; \
         sw $t1, 4($sp); move $a0, $t1; jal print; lw $t1, 4($sp)"
    );
}

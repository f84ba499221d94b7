use std::collections::HashMap;

use pip2::inst::{assemble, Inst};
use pip2::op::Opcode::*;
use pip2::reg::Reg;
use proptest::prelude::*;
use vmgp::memory::{align_up, DATA_ALIGNMENT};
use vmgp::pool::segment;
use vmgp::*;

/// Sums 10..1, stores the result through a data symbol, calls a routine
/// through a function pointer kept in data, then asks the host to stop.
fn program() -> Image {
    let code = assemble(&[
        Inst::ri16(LDQ, Reg::G0, 0),
        Inst::ri16(LDQ, Reg::G1, 10),
        // loop: offset 8
        Inst::rrr(ADD, Reg::G0, Reg::G0, Reg::G1),
        Inst::rri8(ADDQ, Reg::G1, Reg::G1, -1),
        Inst::branch_imm(BNEI, Reg::G1, 0, -2),
        Inst::new(LDI, Reg::G2.into(), 0, 0).with_imm(2),
        Inst::rri8(STW, Reg::G0, Reg::G2, 0),
        Inst::rri8(LDW, Reg::G3, Reg::G2, 4),
        Inst::r(CALLR, Reg::G3),
        Inst::l(CALLL, 1),
        // routine: offset 48
        Inst::rri8(ADDQ, Reg::G4, Reg::G0, 1),
        Inst::r(JPR, Reg::RA),
    ]);
    let mut data = vec![0; 4];
    data.extend_from_slice(&48u32.to_le_bytes());

    let mut image = Image::new(code, data, 0).with_stack_size(0x100);
    let name = image.add_string("vTerminateVMGP");
    image.push_pool_item(PoolItem::new(PoolItemKind::ImportSymbol, 0, 0, name));
    image.push_pool_item(PoolItem::new(PoolItemKind::LocalSymbol, segment::DATA as u8, 0, 0));
    image.push_pool_item(PoolItem::new(
        PoolItemKind::SectionRelativeReloc,
        segment::DATA as u8,
        4,
        segment::CODE,
    ));
    image
}

fn config() -> VmConfig {
    VmConfig {
        base_address: 0x1000,
        memory_size: 0x4000,
        stack_size: None,
    }
}

fn resolver() -> HashMap<String, HostFunction> {
    let mut calls = HashMap::new();
    calls.insert(
        "vTerminateVMGP".to_string(),
        host_fn(|cpu| {
            cpu.terminate();
            Ok(())
        }),
    );
    calls
}

#[test]
fn program_runs_to_termination() {
    let image = program();
    let mut system = VmSystem::new(&image, &resolver(), &config()).unwrap();
    let data = system.layout().data;

    let cpu = system.interpreter_mut();
    let executed = cpu.run(1000).unwrap();
    assert!(cpu.is_terminated());
    assert_eq!(executed, 39);
    assert_eq!(cpu.get(Reg::G0), 55);
    assert_eq!(cpu.get(Reg::G4), 56);
    assert_eq!(cpu.memory().read_u32(data).unwrap(), 55);
    assert_eq!(cpu.regs().pc(), 0x1000 + 48);
}

#[test]
fn function_pointer_in_data_is_reported() {
    let image = program();
    let system = VmSystem::new(&image, &resolver(), &config()).unwrap();
    let pointers: Vec<u32> = system.interpreter().pool().code_pointers_in_data().collect();
    assert_eq!(pointers, vec![0x1000 + 48]);
}

#[test]
fn missing_host_function_fails_at_call() {
    let image = program();
    let mut system = VmSystem::new(&image, &NullResolver, &config()).unwrap();
    let err = system.interpreter_mut().run(1000).unwrap_err();
    assert!(matches!(err, Error::UnresolvedImport(1, ref name) if name == "vTerminateVMGP"));
}

#[test]
fn manifest_describes_the_same_program() {
    let image = program();
    let code: Vec<String> = {
        let mut buf = vec![0; image.header().code_size as usize];
        image.copy_code(&mut buf);
        buf.iter().map(|b| b.to_string()).collect()
    };
    let manifest = format!(
        "code: [{}]\n\
         data: [0, 0, 0, 0, 48, 0, 0, 0]\n\
         stack_size: 256\n\
         pool:\n\
         - {{ kind: ImportSymbol, name: vTerminateVMGP }}\n\
         - {{ kind: LocalSymbol, target: 2 }}\n\
         - {{ kind: SectionRelativeReloc, target: 2, offset: 4, meta: 1 }}\n",
        code.join(", ")
    );
    let from_manifest = Image::from_manifest_str(&manifest, std::path::Path::new(".")).unwrap();
    assert_eq!(from_manifest.header(), image.header());
    assert_eq!(from_manifest.pool_items(), image.pool_items());

    let mut system = VmSystem::new(&from_manifest, &resolver(), &config()).unwrap();
    system.interpreter_mut().run(1000).unwrap();
    assert_eq!(system.interpreter().get(Reg::G0), 55);
}

#[test]
fn demo_manifest_runs() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../demos/sum.vmgp.yaml");
    let image = Image::from_manifest(&path).unwrap();
    let mut system = VmSystem::new(&image, &resolver(), &VmConfig::default()).unwrap();
    let cpu = system.interpreter_mut();
    cpu.run(1000).unwrap();
    assert!(cpu.is_terminated());
    assert_eq!(cpu.get(Reg::G0), 55);
    assert_eq!(cpu.get(Reg::SP), 0x0001_0000 + 28 + 0x1000);
}

proptest! {
    #[test]
    fn layout_is_aligned_and_increasing(
        code in 1u32..0x10000,
        data in 0u32..0x10000,
        bss in 0u32..0x10000,
        base in (0u32..0x1000).prop_map(|b| b * DATA_ALIGNMENT),
    ) {
        let image = Image::new(vec![0; code as usize], vec![0; data as usize], bss);
        let loader = Loader::new(&image);
        let layout = loader.layout(base).unwrap();
        let needed = loader.estimate_needed_program_size().unwrap();
        let aligned = |size| align_up(size, DATA_ALIGNMENT).unwrap();

        prop_assert_eq!(needed, aligned(code) + aligned(data) + aligned(bss));
        prop_assert!(layout.code < layout.data);
        prop_assert!(layout.data <= layout.bss);
        prop_assert_eq!(layout.end(), Some(layout.code + needed));
        for addr in [layout.code, layout.data, layout.bss] {
            prop_assert_eq!(addr % DATA_ALIGNMENT, 0);
        }
    }
}

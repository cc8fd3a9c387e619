//! Shader validation - parse and validate the FDM kernels with naga
//!
//! Runs without a GPU, so shader breakage shows up even on CI machines
//! that never get an adapter.

use std::fs;
use std::path::Path;

const ENTRY_POINTS: [&str; 7] = [
    "damp_pressure",
    "advance_momentum",
    "relax_corrections",
    "relax_limit",
    "relax_apply",
    "apply_velocity",
    "paint_mask",
];

fn shader_source() -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("src/shaders/fdm.wgsl");
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {:?}: {}", path, e))
}

fn parse(source: &str) -> naga::Module {
    match naga::front::wgsl::parse_str(source) {
        Ok(module) => module,
        Err(e) => panic!("Failed to parse fdm.wgsl:\n{}", e.emit_to_string(source)),
    }
}

#[test]
fn test_fdm_shader_validates() {
    let source = shader_source();
    let module = parse(&source);

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    if let Err(e) = validator.validate(&module) {
        panic!("Failed to validate fdm.wgsl:\n{:?}", e);
    }
}

#[test]
fn test_every_kernel_is_an_8x8_compute_entry() {
    let module = parse(&shader_source());
    for name in ENTRY_POINTS {
        let entry = module
            .entry_points
            .iter()
            .find(|ep| ep.name == name)
            .unwrap_or_else(|| panic!("missing entry point {}", name));
        assert_eq!(entry.stage, naga::ShaderStage::Compute, "{}", name);
        assert_eq!(entry.workgroup_size, [8, 8, 1], "{}", name);
    }
    assert_eq!(module.entry_points.len(), ENTRY_POINTS.len());
}

#[test]
fn test_params_block_is_64_bytes() {
    let module = parse(&shader_source());
    let (_, params) = module
        .types
        .iter()
        .find(|(_, ty)| ty.name.as_deref() == Some("Params"))
        .expect("Params struct");
    match &params.inner {
        naga::TypeInner::Struct { members, span } => {
            assert_eq!(*span, 64);
            let color = &members[3];
            assert_eq!(color.name.as_deref(), Some("color"));
            assert_eq!(color.offset, 12);
            let velocity = members.last().expect("members");
            assert_eq!(velocity.name.as_deref(), Some("velocity"));
            assert_eq!(velocity.offset, 56);
        }
        other => panic!("Params is not a struct: {:?}", other),
    }
}

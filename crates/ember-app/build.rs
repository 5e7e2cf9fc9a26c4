// SPDX-License-Identifier: CEPL-1.0
//! Compiles the WGSL triangle shaders to SPIR-V in `OUT_DIR`.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::{env, fs};

use naga::back::spv;
use naga::valid::{Capabilities, ValidationFlags, Validator};

const SHADERS: [(&str, naga::ShaderStage); 2] = [
    ("triangle.vert", naga::ShaderStage::Vertex),
    ("triangle.frag", naga::ShaderStage::Fragment),
];

fn compile(src_path: &Path, stage: naga::ShaderStage) -> Result<Vec<u32>, Box<dyn Error>> {
    let source = fs::read_to_string(src_path)?;
    let module = naga::front::wgsl::parse_str(&source)
        .map_err(|e| format!("{}: {}", src_path.display(), e.emit_to_string(&source)))?;

    let info = Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|e| format!("{}: validation failed: {e:?}", src_path.display()))?;

    // No coordinate-space adjustment: the pipeline expects Vulkan's y-down clip space.
    let options = spv::Options {
        lang_version: (1, 0),
        flags: spv::WriterFlags::empty(),
        capabilities: None,
        bounds_check_policies: naga::proc::BoundsCheckPolicies::default(),
        binding_map: Default::default(),
        debug_info: None,
        zero_initialize_workgroup_memory: spv::ZeroInitializeWorkgroupMemoryMode::None,
    };
    let pipeline = spv::PipelineOptions {
        shader_stage: stage,
        entry_point: "main".to_string(),
    };

    Ok(spv::write_vec(&module, &info, &options, Some(&pipeline))?)
}

fn main() -> Result<(), Box<dyn Error>> {
    let out = PathBuf::from(env::var("OUT_DIR")?);
    let src_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?).join("shaders");

    for (name, stage) in SHADERS {
        let src = src_dir.join(format!("{name}.wgsl"));
        println!("cargo:rerun-if-changed={}", src.display());

        let words = compile(&src, stage)?;
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        fs::write(out.join(format!("{name}.spv")), bytes)?;
    }

    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}

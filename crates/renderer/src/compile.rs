//! Shader text adaptation and module creation.
//!
//! Ray-tracing programs are usually written for WebGL (GLSL ES 1.00:
//! `attribute`, `varying`, loose `uniform float`, `gl_FragColor`). The `wgpu`
//! GLSL frontend wants Vulkan-flavoured GLSL 450, so both stages are rewritten
//! line by line before compilation:
//!
//! 1. `#version` and `precision` statements are dropped.
//! 2. Attributes and varyings get explicit `layout(location = N)`; varyings
//!    are matched between stages by name.
//! 3. Loose `uniform float` declarations move into one std140 block shared by
//!    both stages, mirrored on the CPU by [`crate::gpu`]'s parameter block.
//! 4. The user's `main` is renamed so a wrapper `main` can widen 2-float
//!    attributes GL-style and restore GL's lower-left `gl_FragCoord` origin.
//!
//! Dropped lines are replaced with blank lines so compiler diagnostics keep
//! pointing at the user's line numbers.

use std::borrow::Cow;

use wgpu::naga::ShaderStage;

use crate::error::HarnessError;
use crate::sources::ShaderSources;
use crate::types::{AttributeBinding, ProgramInterface};

/// Both stages rewritten for the GLSL 450 frontend plus their reflection.
#[derive(Debug, Clone)]
pub(crate) struct PreparedProgram {
    pub vertex: String,
    pub fragment: String,
    pub interface: ProgramInterface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Storage {
    Attribute,
    Varying,
    In,
    Out,
    Uniform,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Declaration<'a> {
    storage: Storage,
    ty: &'a str,
    name: &'a str,
    location: Option<u32>,
}

enum Line<'a> {
    Keep(&'a str),
    Drop,
    Declare(Declaration<'a>),
}

const PARAMS_BLOCK_INSTANCE: &str = "harness_params";
const VIEWPORT_MEMBER: &str = "harness_viewport";

pub(crate) fn prepare_program(sources: &ShaderSources) -> Result<PreparedProgram, HarnessError> {
    let vertex_lines = scan(&sources.vertex);
    let fragment_lines = scan(&sources.fragment);

    let mut uniforms: Vec<String> = Vec::new();
    for line in vertex_lines.iter().chain(fragment_lines.iter()) {
        if let Line::Declare(decl) = line {
            if decl.storage == Storage::Uniform
                && decl.ty == "float"
                && !uniforms.iter().any(|name| name == decl.name)
            {
                uniforms.push(decl.name.to_string());
            }
        }
    }
    let block = params_block(&uniforms);

    let (vertex, attributes, varyings) = emit_vertex(&vertex_lines, &block);
    let fragment = emit_fragment(&fragment_lines, &block, &varyings);

    if attributes.is_empty() {
        tracing::debug!("vertex stage declares no attributes");
    }

    Ok(PreparedProgram {
        vertex,
        fragment,
        interface: ProgramInterface {
            attributes,
            uniforms,
        },
    })
}

/// Compiles one rewritten stage, turning frontend/validation failures into
/// [`HarnessError::ShaderCompile`] instead of a device panic.
pub(crate) fn compile_stage(
    device: &wgpu::Device,
    stage: ShaderStage,
    source: &str,
) -> Result<wgpu::ShaderModule, HarnessError> {
    let label = stage_label(stage);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source.to_string()),
            stage,
            defines: &[],
        },
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(HarnessError::ShaderCompile {
            stage: label,
            message: err.to_string(),
        });
    }
    Ok(module)
}

fn stage_label(stage: ShaderStage) -> &'static str {
    match stage {
        ShaderStage::Vertex => "vertex",
        ShaderStage::Fragment => "fragment",
        _ => "compute",
    }
}

fn scan(source: &str) -> Vec<Line<'_>> {
    source
        .lines()
        .map(|line| {
            let trimmed = strip_comment(line).trim();
            if trimmed.starts_with("#version") || is_precision_statement(trimmed) {
                Line::Drop
            } else if let Some(decl) = parse_declaration(trimmed) {
                Line::Declare(decl)
            } else {
                Line::Keep(line)
            }
        })
        .collect()
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(index) => &line[..index],
        None => line,
    }
}

fn is_precision_statement(trimmed: &str) -> bool {
    trimmed.starts_with("precision ") && trimmed.ends_with(';')
}

fn is_precision_qualifier(token: &str) -> bool {
    matches!(token, "lowp" | "mediump" | "highp")
}

fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(chars.next(), Some(first) if first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parses single-variable interface declarations such as
/// `attribute vec4 vPosition;` or `layout(location = 1) in vec2 uv;`.
fn parse_declaration(trimmed: &str) -> Option<Declaration<'_>> {
    let body = trimmed.strip_suffix(';')?.trim();
    let (location, body) = match body.strip_prefix("layout") {
        Some(rest) => {
            let rest = rest.trim_start().strip_prefix('(')?;
            let close = rest.find(')')?;
            (parse_location(&rest[..close]), rest[close + 1..].trim())
        }
        None => (None, body),
    };

    let mut tokens = body.split_whitespace();
    let storage = match tokens.next()? {
        "attribute" => Storage::Attribute,
        "varying" => Storage::Varying,
        "in" => Storage::In,
        "out" => Storage::Out,
        "uniform" => Storage::Uniform,
        _ => return None,
    };
    let mut ty = tokens.next()?;
    if is_precision_qualifier(ty) {
        ty = tokens.next()?;
    }
    let name = tokens.next()?;
    if tokens.next().is_some() || !is_identifier(ty) || !is_identifier(name) {
        return None;
    }
    Some(Declaration {
        storage,
        ty,
        name,
        location,
    })
}

fn parse_location(qualifiers: &str) -> Option<u32> {
    qualifiers.split(',').find_map(|qualifier| {
        let (key, value) = qualifier.split_once('=')?;
        (key.trim() == "location")
            .then(|| value.trim().parse().ok())
            .flatten()
    })
}

fn type_components(ty: &str) -> u32 {
    match ty {
        "float" | "int" | "uint" | "bool" => 1,
        _ => ty
            .chars()
            .last()
            .and_then(|c| c.to_digit(10))
            .unwrap_or(1),
    }
}

/// GL fills missing attribute components with `(0, 0, 1)`.
fn widen_from_vec2(ty: &str, expr: &str) -> Option<String> {
    match ty {
        "float" => Some(format!("{expr}.x")),
        "vec3" => Some(format!("vec3({expr}, 0.0)")),
        "vec4" => Some(format!("vec4({expr}, 0.0, 1.0)")),
        _ => None,
    }
}

struct Locations {
    used: Vec<u32>,
}

impl Locations {
    fn new() -> Self {
        Self { used: Vec::new() }
    }

    fn reserve_explicit<'a>(&mut self, decls: impl Iterator<Item = &'a Declaration<'a>>) {
        self.used.extend(decls.filter_map(|decl| decl.location));
    }

    fn assign(&mut self, explicit: Option<u32>) -> u32 {
        if let Some(location) = explicit {
            return location;
        }
        let mut candidate = 0;
        while self.used.contains(&candidate) {
            candidate += 1;
        }
        self.used.push(candidate);
        candidate
    }
}

fn params_block(uniforms: &[String]) -> String {
    let mut block = String::from("layout(std140, set = 0, binding = 0) uniform HarnessParams {\n");
    block.push_str(&format!("    vec2 {VIEWPORT_MEMBER};\n"));
    for name in uniforms {
        block.push_str(&format!("    float harness_{name};\n"));
    }
    block.push_str(&format!("}} {PARAMS_BLOCK_INSTANCE};\n"));
    for name in uniforms {
        block.push_str(&format!(
            "#define {name} {PARAMS_BLOCK_INSTANCE}.harness_{name}\n"
        ));
    }
    block
}

fn declarations<'a>(
    lines: &'a [Line<'a>],
    wanted: &'a [Storage],
) -> impl Iterator<Item = &'a Declaration<'a>> {
    lines.iter().filter_map(move |line| match line {
        Line::Declare(decl) if wanted.contains(&decl.storage) => Some(decl),
        _ => None,
    })
}

fn emit_vertex(
    lines: &[Line<'_>],
    block: &str,
) -> (String, Vec<AttributeBinding>, Vec<(String, u32)>) {
    let mut attribute_slots = Locations::new();
    attribute_slots.reserve_explicit(declarations(lines, &[Storage::Attribute, Storage::In]));
    let mut varying_slots = Locations::new();
    varying_slots.reserve_explicit(declarations(lines, &[Storage::Varying, Storage::Out]));

    let mut attributes = Vec::new();
    let mut varyings = Vec::new();
    let mut shims = Vec::new();
    let mut body = String::new();

    for line in lines {
        match line {
            Line::Keep(text) => body.push_str(text),
            Line::Drop => {}
            Line::Declare(decl) => match decl.storage {
                Storage::Attribute | Storage::In => {
                    let location = attribute_slots.assign(decl.location);
                    let input = format!("harness_in_{}", decl.name);
                    match widen_from_vec2(decl.ty, &input) {
                        Some(widened) => {
                            body.push_str(&format!(
                                "layout(location = {location}) in vec2 {input}; {} {};",
                                decl.ty, decl.name
                            ));
                            shims.push(format!("    {} = {widened};\n", decl.name));
                            attributes.push(AttributeBinding {
                                name: decl.name.to_string(),
                                location,
                                components: 2,
                            });
                        }
                        None => {
                            body.push_str(&format!(
                                "layout(location = {location}) in {} {};",
                                decl.ty, decl.name
                            ));
                            attributes.push(AttributeBinding {
                                name: decl.name.to_string(),
                                location,
                                components: type_components(decl.ty),
                            });
                        }
                    }
                }
                Storage::Varying | Storage::Out => {
                    let location = varying_slots.assign(decl.location);
                    body.push_str(&format!(
                        "layout(location = {location}) out {} {};",
                        decl.ty, decl.name
                    ));
                    varyings.push((decl.name.to_string(), location));
                }
                Storage::Uniform => {
                    if decl.ty != "float" {
                        body.push_str(&format!("uniform {} {};", decl.ty, decl.name));
                    }
                }
            },
        }
        body.push('\n');
    }

    let mut source = String::from("#version 450\n");
    source.push_str(block);
    source.push_str("#define main harness_user_main\n#line 1\n");
    source.push_str(&body);
    source.push_str("#undef main\nvoid main() {\n");
    for shim in &shims {
        source.push_str(shim);
    }
    source.push_str("    harness_user_main();\n}\n");
    (source, attributes, varyings)
}

fn emit_fragment(lines: &[Line<'_>], block: &str, varyings: &[(String, u32)]) -> String {
    let mut input_slots = Locations::new();
    input_slots.used.extend(varyings.iter().map(|(_, location)| *location));
    input_slots.reserve_explicit(declarations(lines, &[Storage::Varying, Storage::In]));
    let mut output_slots = Locations::new();
    output_slots.reserve_explicit(declarations(lines, &[Storage::Out]));
    let declares_output = declarations(lines, &[Storage::Out]).next().is_some();

    let mut body = String::new();
    for line in lines {
        match line {
            Line::Keep(text) => body.push_str(text),
            Line::Drop => {}
            Line::Declare(decl) => match decl.storage {
                Storage::Varying | Storage::In => {
                    let matched = varyings
                        .iter()
                        .find(|(name, _)| name == decl.name)
                        .map(|(_, location)| *location);
                    let location = decl
                        .location
                        .or(matched)
                        .unwrap_or_else(|| input_slots.assign(None));
                    body.push_str(&format!(
                        "layout(location = {location}) in {} {};",
                        decl.ty, decl.name
                    ));
                }
                Storage::Out | Storage::Attribute => {
                    let location = output_slots.assign(decl.location);
                    body.push_str(&format!(
                        "layout(location = {location}) out {} {};",
                        decl.ty, decl.name
                    ));
                }
                Storage::Uniform => {
                    if decl.ty != "float" {
                        body.push_str(&format!("uniform {} {};", decl.ty, decl.name));
                    }
                }
            },
        }
        body.push('\n');
    }

    let mut source = String::from("#version 450\n");
    source.push_str(block);
    if !declares_output {
        source.push_str("layout(location = 0) out vec4 harness_frag_color;\n");
        source.push_str("#define gl_FragColor harness_frag_color\n");
    }
    source.push_str("vec4 harness_frag_coord;\n#define gl_FragCoord harness_frag_coord\n");
    source.push_str("#define main harness_user_main\n#line 1\n");
    source.push_str(&body);
    source.push_str(FRAGMENT_FOOTER);
    source
}

/// Wrapper `main`: reads the real builtin, flips it to GL's bottom-left origin
/// and hands control to the user's entry point.
const FRAGMENT_FOOTER: &str = r"#undef main
void main() {
    #undef gl_FragCoord
    harness_frag_coord = vec4(
        gl_FragCoord.x,
        harness_params.harness_viewport.y - gl_FragCoord.y,
        gl_FragCoord.z,
        gl_FragCoord.w
    );
    #define gl_FragCoord harness_frag_coord
    harness_user_main();
}
";

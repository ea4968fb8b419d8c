/// WGSL program for the plane: rotate each vertex, flat light-blue fill.
pub const PLANE_SHADER: &str = r#"
struct Uniforms {
    rotation: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return uniforms.rotation * vec4<f32>(position, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(0.3, 0.6, 1.0, 1.0);
}
"#;

/// WGSL shader for instanced sandbox objects (spheres and boxes).
///
/// Lighting is a hemisphere ambient (sky above, ground bounce below,
/// blended by the world normal) plus one directional key light, so tumbling
/// bodies stay readable from every side without a second light pass.
pub const OBJECT_SHADER: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct InstanceInput {
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
    @location(6) color: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_normal: vec3<f32>,
    @location(1) color: vec4<f32>,
};

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(
        instance.model_0,
        instance.model_1,
        instance.model_2,
        instance.model_3,
    );
    let world_pos = model * vec4<f32>(vertex.position, 1.0);

    var out: VertexOutput;
    out.clip_position = uniforms.view_proj * world_pos;
    out.world_normal = normalize((model * vec4<f32>(vertex.normal, 0.0)).xyz);
    out.color = instance.color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let key_dir = normalize(vec3<f32>(0.5, 1.0, 0.5));
    let sky = vec3<f32>(0.55, 0.60, 0.70);
    let bounce = vec3<f32>(0.24, 0.21, 0.19);
    let hemi = mix(bounce, sky, in.world_normal.y * 0.5 + 0.5);
    let diffuse = max(dot(in.world_normal, key_dir), 0.0);
    let lit = in.color.rgb * (hemi * 0.5 + vec3<f32>(diffuse * 0.65));
    return vec4<f32>(lit, in.color.a);
}
"#;

/// WGSL shader for the floor: the solid ground plane and the grid lines on
/// top of it share one vertex format (position + color). The fragment stage
/// fades both toward the clear color near the plane edge, so the ground
/// dissolves into the background instead of ending in a hard rectangle.
pub const FLOOR_SHADER: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct FloorVertex {
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
};

struct FloorOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) world_xz: vec2<f32>,
};

@vertex
fn vs_floor(vertex: FloorVertex) -> FloorOutput {
    var out: FloorOutput;
    out.clip_position = uniforms.view_proj * vec4<f32>(vertex.position, 1.0);
    out.color = vertex.color;
    out.world_xz = vertex.position.xz;
    return out;
}

@fragment
fn fs_floor(in: FloorOutput) -> @location(0) vec4<f32> {
    let background = vec3<f32>(0.08, 0.09, 0.12);
    let fade = smoothstep(3.5, 5.0, length(in.world_xz));
    return vec4<f32>(mix(in.color.rgb, background, fade), in.color.a);
}
"#;

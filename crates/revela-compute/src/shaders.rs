//! WGSL shader sources for the GPU compute pipelines.

#![cfg_attr(not(feature = "wgpu"), allow(dead_code))]

/// Bilateral filter over interleaved RGB storage buffers.
///
/// One invocation per pixel in 8×8 workgroups. The weighted average
/// matches the CPU kernel: Gaussian spatial term times a Gaussian range
/// term over Rec.709 luminance difference, neighbors border-clamped.
pub const BILATERAL: &str = r#"
struct BilateralParams {
    width: u32,
    height: u32,
    radius: i32,
    _pad: u32,
    inv_2ss: f32,   // 1 / (2 * spatial_sigma^2)
    inv_2rs: f32,   // 1 / (2 * range_sigma^2)
    _pad2: vec2<f32>,
}

@group(0) @binding(0) var<storage, read> src: array<f32>;
@group(0) @binding(1) var<storage, read_write> dst: array<f32>;
@group(0) @binding(2) var<uniform> params: BilateralParams;

fn luma(rgb: vec3<f32>) -> f32 {
    return 0.2126 * rgb.x + 0.7152 * rgb.y + 0.0722 * rgb.z;
}

fn load_pixel(x: i32, y: i32) -> vec3<f32> {
    let cx = clamp(x, 0, i32(params.width) - 1);
    let cy = clamp(y, 0, i32(params.height) - 1);
    let base = u32(cy) * params.width * 3u + u32(cx) * 3u;
    return vec3<f32>(src[base], src[base + 1u], src[base + 2u]);
}

@compute @workgroup_size(8, 8)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let x = id.x;
    let y = id.y;
    if x >= params.width || y >= params.height { return; }

    let center = load_pixel(i32(x), i32(y));
    let center_luma = luma(center);

    var sum = vec3<f32>(0.0, 0.0, 0.0);
    var weight_sum = 0.0;

    for (var dy = -params.radius; dy <= params.radius; dy = dy + 1) {
        for (var dx = -params.radius; dx <= params.radius; dx = dx + 1) {
            let neighbor = load_pixel(i32(x) + dx, i32(y) + dy);
            let d2 = f32(dx * dx + dy * dy);
            let dl = luma(neighbor) - center_luma;
            let w = exp(-d2 * params.inv_2ss) * exp(-dl * dl * params.inv_2rs);
            sum = sum + neighbor * w;
            weight_sum = weight_sum + w;
        }
    }

    let out = sum / weight_sum;
    let base = y * params.width * 3u + x * 3u;
    dst[base] = out.x;
    dst[base + 1u] = out.y;
    dst[base + 2u] = out.z;
}
"#;

/// Linear interpolation between `a` and `b` at factor `t`.
pub(crate) fn lerp_f32(a: f32, b: f32, t: f64) -> f32 {
    (f64::from(a) + (f64::from(b) - f64::from(a)) * t) as f32
}

/// Uniform Catmull-Rom spline through `p1..p2` using `p0` and `p3` as tangents.
pub(crate) fn catmull_rom(p0: f32, p1: f32, p2: f32, p3: f32, t: f64) -> f32 {
    let (p0, p1, p2, p3) = (
        f64::from(p0),
        f64::from(p1),
        f64::from(p2),
        f64::from(p3),
    );
    let t2 = t * t;
    let t3 = t2 * t;
    let v = 0.5
        * ((2.0 * p1)
            + (-p0 + p2) * t
            + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
            + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3);
    v as f32
}

/// Clamp a signed index into `[0, len - 1]`. `len` must be non-zero.
pub(crate) fn clamp_index(i: i64, len: usize) -> usize {
    let max = len.saturating_sub(1) as i64;
    i.clamp(0, max) as usize
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;

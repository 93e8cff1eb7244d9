use glam::Vec3;

use crate::terrain::mesh::{GenerationParams, TerrainMesh, Vertex};

#[inline]
pub fn height_at(x: f32, z: f32, frequency: f32, amplitude: f32) -> f32 {
    amplitude * (x * frequency).sin() * (z * frequency).cos()
}

/// Face normal of `a, b, c` from its own edges. Zero-area triangles get +Y.
#[inline]
pub fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a).try_normalize().unwrap_or(Vec3::Y)
}

/// Two triangles per grid quad, row by row: `[p00, p01, p10]` then
/// `[p10, p01, p11]` (`pij` = column `i`, row `j`), each with its face normal.
/// Narrow grids and non-finite parameters give an empty mesh.
#[tracing::instrument(level = "debug")]
pub fn generate(params: &GenerationParams) -> TerrainMesh {
    if params.width < 2 || params.height < 2 {
        tracing::debug!("grid too small for any quad, emitting empty mesh");
        return TerrainMesh::empty();
    }
    if !params.is_finite() {
        tracing::warn!(?params, "non-finite terrain parameters, emitting empty mesh");
        return TerrainMesh::empty();
    }

    let width = params.width as usize;
    let depth = params.height as usize;
    let points = sample_grid(params);

    let mut mesh = TerrainMesh::with_capacity(params.expected_vertex_count());
    for j in 0..depth - 1 {
        for i in 0..width - 1 {
            let p00 = points[j * width + i];
            let p10 = points[j * width + i + 1];
            let p01 = points[(j + 1) * width + i];
            let p11 = points[(j + 1) * width + i + 1];

            mesh.push_triangle(triangle(p00, p01, p10));
            mesh.push_triangle(triangle(p10, p01, p11));
        }
    }

    mesh
}

fn sample_grid(params: &GenerationParams) -> Vec<Vec3> {
    let width = params.width as usize;
    let depth = params.height as usize;
    let half_w = (width - 1) as f32 * 0.5;
    let half_d = (depth - 1) as f32 * 0.5;

    let mut points = Vec::with_capacity(width * depth);
    for j in 0..depth {
        let z = (j as f32 - half_d) * params.scale;
        for i in 0..width {
            let x = (i as f32 - half_w) * params.scale;
            let y = height_at(x, z, params.frequency, params.amplitude);
            points.push(Vec3::new(x, y, z));
        }
    }
    points
}

fn triangle(a: Vec3, b: Vec3, c: Vec3) -> [Vertex; 3] {
    let normal = face_normal(a, b, c);
    [
        Vertex::new(a, normal),
        Vertex::new(b, normal),
        Vertex::new(c, normal),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT_TOLERANCE: f32 = 1e-5;

    fn params(width: u32, height: u32, scale: f32, frequency: f32, amplitude: f32) -> GenerationParams {
        GenerationParams::new(width, height, scale, frequency, amplitude)
    }

    #[test]
    fn identical_parameters_give_identical_bytes() {
        let p = params(37, 23, 0.75, 0.31, 6.5);
        let first = generate(&p);
        let second = generate(&p);
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn vertex_count_matches_quad_count() {
        for (w, h) in [(2, 2), (4, 4), (5, 3), (17, 9), (64, 2)] {
            let mesh = generate(&params(w, h, 1.0, 0.2, 3.0));
            let expected = (w as usize - 1) * (h as usize - 1) * 2 * 3;
            assert_eq!(mesh.vertex_count(), expected, "grid {w}x{h}");
            assert_eq!(mesh.vertex_count() % 3, 0);
        }
    }

    #[test]
    fn narrow_grids_are_empty() {
        assert!(generate(&params(1, 10, 1.0, 0.1, 2.0)).is_empty());
        assert!(generate(&params(10, 1, 1.0, 0.1, 2.0)).is_empty());
        assert!(generate(&params(0, 0, 1.0, 0.1, 2.0)).is_empty());
    }

    #[test]
    fn zero_amplitude_is_flat_with_up_normals() {
        let mesh = generate(&params(12, 9, 1.5, 0.4, 0.0));
        assert!(!mesh.is_empty());
        let (lo, hi) = mesh.height_range().unwrap();
        assert_eq!(lo, hi);
        for v in mesh.vertices() {
            assert!(v.normal().is_finite());
            assert!((v.normal() - Vec3::Y).length() < UNIT_TOLERANCE);
        }
    }

    #[test]
    fn zero_frequency_is_flat() {
        let mesh = generate(&params(6, 6, 1.0, 0.0, 10.0));
        let (lo, hi) = mesh.height_range().unwrap();
        assert_eq!(lo, hi);
    }

    #[test]
    fn zero_scale_collapses_without_nan() {
        let mesh = generate(&params(5, 5, 0.0, 0.3, 2.0));
        assert_eq!(mesh.vertex_count(), 4 * 4 * 6);
        for v in mesh.vertices() {
            assert!(v.position().is_finite());
            assert!(v.normal().is_finite());
            assert!((v.normal().length() - 1.0).abs() < UNIT_TOLERANCE);
        }
    }

    #[test]
    fn non_finite_parameters_are_empty() {
        assert!(generate(&params(8, 8, f32::NAN, 0.1, 1.0)).is_empty());
        assert!(generate(&params(8, 8, 1.0, f32::INFINITY, 1.0)).is_empty());
        assert!(generate(&params(8, 8, 1.0, 0.1, f32::NEG_INFINITY)).is_empty());
    }

    #[test]
    fn normals_are_unit_length_and_follow_winding() {
        let mesh = generate(&params(20, 14, 0.5, 0.9, 3.0));
        for tri in mesh.triangles() {
            let (a, b, c) = (tri[0].position(), tri[1].position(), tri[2].position());
            let winding = (b - a).cross(c - a).normalize();
            for v in tri {
                let n = v.normal();
                assert!((n.length() - 1.0).abs() < UNIT_TOLERANCE);
                assert!(n.dot(winding) > 1.0 - UNIT_TOLERANCE);
            }
        }
    }

    #[test]
    fn tiny_scale_keeps_sloped_normals() {
        let mesh = generate(&params(4, 4, 0.0005, 1.0, 1.0));
        assert_eq!(mesh.vertex_count(), 54);
        for tri in mesh.triangles() {
            let (a, b, c) = (tri[0].position(), tri[1].position(), tri[2].position());
            let winding = (b - a).cross(c - a).normalize();
            let n = tri[0].normal();
            assert!(n.dot(winding) > 1.0 - UNIT_TOLERANCE, "normal {n} vs winding {winding}");
            assert!(n.y < 0.99, "sloped face collapsed to up: {n}");
        }
    }

    #[test]
    fn face_normal_falls_back_only_without_area() {
        assert_eq!(face_normal(Vec3::ZERO, Vec3::ZERO, Vec3::X), Vec3::Y);
        let n = face_normal(Vec3::ZERO, Vec3::new(0.0, 1e-4, 1e-4), Vec3::new(1e-4, 1e-4, 0.0));
        assert!((n.length() - 1.0).abs() < UNIT_TOLERANCE);
        assert!(n.y < 0.99);
    }

    #[test]
    fn winding_is_consistent_across_all_triangles() {
        let mesh = generate(&params(30, 30, 1.0, 0.25, 8.0));
        for tri in mesh.triangles() {
            let (a, b, c) = (tri[0].position(), tri[1].position(), tri[2].position());
            assert!((b - a).cross(c - a).y > 0.0);
            assert!(tri[0].normal().y > 0.0);
        }
    }

    #[test]
    fn quads_are_emitted_row_major() {
        let p = params(4, 3, 2.0, 0.0, 0.0);
        let mesh = generate(&p);
        let first_of_quad: Vec<Vec3> = mesh
            .vertices()
            .chunks_exact(6)
            .map(|quad| quad[0].position())
            .collect();

        assert_eq!(first_of_quad.len(), 3 * 2);
        // X advances within a row, Z advances between rows.
        assert!(first_of_quad[0].x < first_of_quad[1].x);
        assert_eq!(first_of_quad[0].z, first_of_quad[2].z);
        assert!(first_of_quad[2].z < first_of_quad[3].z);
        assert_eq!(first_of_quad[0].x, first_of_quad[3].x);
    }

    #[test]
    fn grid_is_centred_on_origin() {
        let mesh = generate(&params(5, 5, 2.0, 0.0, 0.0));
        let xs = mesh.vertices().iter().map(|v| v.position[0]);
        let (min_x, max_x) = xs.fold((f32::MAX, f32::MIN), |(lo, hi), x| (lo.min(x), hi.max(x)));
        assert_eq!(min_x, -4.0);
        assert_eq!(max_x, 4.0);
    }

    #[test]
    fn heights_follow_the_height_function() {
        let p = params(9, 9, 1.0, 0.5, 3.0);
        let mesh = generate(&p);
        for v in mesh.vertices() {
            let expected = height_at(v.position[0], v.position[2], p.frequency, p.amplitude);
            assert_eq!(v.position[1], expected);
        }
    }

    #[test]
    fn several_hundred_per_side_is_fine() {
        let mesh = generate(&params(300, 300, 0.5, 0.05, 12.0));
        assert_eq!(mesh.vertex_count(), 299 * 299 * 6);
    }
}

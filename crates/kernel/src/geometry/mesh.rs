use serde::{Deserialize, Serialize};

use super::bbox::BoundingBox;
use super::point::Point3d;
use super::surfaces::Surface;
use super::transform::Transform;
use super::vector::Vec3;

/// A triangle mesh attached to a face as a render, analysis or preview cache.
///
/// Faces hold meshes as `Arc<Mesh>`; editing goes through `Arc::make_mut`
/// so other holders keep the previous triangles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// Vertex positions [x, y, z, x, y, z, ...]
    pub positions: Vec<f32>,
    /// Vertex normals [nx, ny, nz, ...]
    pub normals: Vec<f32>,
    /// Triangle indices [i0, i1, i2, ...]
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn add_vertex(&mut self, pos: Point3d, normal: Vec3) -> u32 {
        let idx = self.vertex_count() as u32;
        self.positions.extend([pos.x as f32, pos.y as f32, pos.z as f32]);
        self.normals.extend([normal.x as f32, normal.y as f32, normal.z as f32]);
        idx
    }

    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.extend([i0, i1, i2]);
    }

    pub fn position(&self, i: usize) -> Point3d {
        Point3d::new(
            self.positions[3 * i] as f64,
            self.positions[3 * i + 1] as f64,
            self.positions[3 * i + 2] as f64,
        )
    }

    fn normal(&self, i: usize) -> Vec3 {
        Vec3::new(
            self.normals[3 * i] as f64,
            self.normals[3 * i + 1] as f64,
            self.normals[3 * i + 2] as f64,
        )
    }

    /// Regular `nu x nv` grid over the surface's full domain.
    pub fn from_surface_grid(surface: &Surface, nu: usize, nv: usize) -> Self {
        let (nu, nv) = (nu.max(1), nv.max(1));
        let (du, dv) = (surface.domain(0), surface.domain(1));
        let mut mesh = Self::new();
        for i in 0..=nu {
            for j in 0..=nv {
                let u = du.param_at(i as f64 / nu as f64);
                let v = dv.param_at(j as f64 / nv as f64);
                let n = surface.normal_at(u, v).unwrap_or(Vec3::Z);
                mesh.add_vertex(surface.point_at(u, v), n);
            }
        }
        let row = (nv + 1) as u32;
        for i in 0..nu as u32 {
            for j in 0..nv as u32 {
                let a = i * row + j;
                let b = a + row;
                mesh.add_triangle(a, b, b + 1);
                mesh.add_triangle(a, b + 1, a + 1);
            }
        }
        mesh
    }

    pub fn transform(&mut self, xform: &Transform) {
        for i in 0..self.vertex_count() {
            let p = xform.transform_point(&self.position(i));
            self.positions[3 * i..3 * i + 3].copy_from_slice(&[p.x as f32, p.y as f32, p.z as f32]);
        }
        for i in 0..self.normals.len() / 3 {
            if let Some(n) = xform.transform_normal(&self.normal(i)) {
                self.normals[3 * i..3 * i + 3].copy_from_slice(&[n.x as f32, n.y as f32, n.z as f32]);
            }
        }
    }

    /// Reverse winding and normals.
    pub fn flip(&mut self) {
        for tri in self.indices.chunks_exact_mut(3) {
            tri.swap(1, 2);
        }
        for n in &mut self.normals {
            *n = -*n;
        }
    }

    /// Box of the vertex positions.
    pub fn tight_bounding_box(&self) -> BoundingBox {
        let mut bb = BoundingBox::empty();
        for i in 0..self.vertex_count() {
            bb.expand_to_include(&self.position(i));
        }
        bb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Mesh {
        let mut m = Mesh::new();
        let a = m.add_vertex(Point3d::new(0.0, 0.0, 0.0), Vec3::Z);
        let b = m.add_vertex(Point3d::new(1.0, 0.0, 0.0), Vec3::Z);
        let c = m.add_vertex(Point3d::new(0.0, 1.0, 0.0), Vec3::Z);
        m.add_triangle(a, b, c);
        m
    }

    #[test]
    fn test_flip_reverses_winding() {
        let mut m = triangle();
        m.flip();
        assert_eq!(m.indices, vec![0, 2, 1]);
        assert_eq!(m.normals[2], -1.0);
    }

    #[test]
    fn test_transform_moves_box() {
        let mut m = triangle();
        m.transform(&Transform::translation(0.0, 0.0, 2.0));
        let bb = m.tight_bounding_box();
        assert!((bb.min.z - 2.0).abs() < 1e-6);
        assert!((bb.max.x - 1.0).abs() < 1e-6);
    }
}

use std::f64::consts::{FRAC_PI_2, TAU};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::bbox::BoundingBox;
use super::curves::Curve;
use super::interval::Interval;
use super::nurbs::NurbsSurface;
use super::point::Point3d;
use super::transform::{Similarity, Transform};
use super::vector::Vec3;

/// Isoparametric classification of a parameter-space curve.
///
/// `X` runs along constant u, `Y` along constant v; the side variants lie on
/// the corresponding boundary of the surface domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IsoType {
    #[default]
    NotIso,
    X,
    Y,
    West,
    South,
    East,
    North,
}

impl IsoType {
    /// Side index (S=0, E=1, N=2, W=3) for boundary iso types.
    pub fn side(self) -> Option<usize> {
        match self {
            IsoType::South => Some(0),
            IsoType::East => Some(1),
            IsoType::North => Some(2),
            IsoType::West => Some(3),
            _ => None,
        }
    }

    pub fn from_side(side: usize) -> IsoType {
        match side {
            0 => IsoType::South,
            1 => IsoType::East,
            2 => IsoType::North,
            _ => IsoType::West,
        }
    }

    pub fn is_boundary(self) -> bool {
        self.side().is_some()
    }
}

/// Orthonormal frame; `normal == x_axis x y_axis`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub origin: Point3d,
    pub x_axis: Vec3,
    pub y_axis: Vec3,
    pub normal: Vec3,
}

impl Plane {
    pub fn xy() -> Self {
        Self {
            origin: Point3d::ORIGIN,
            x_axis: Vec3::X,
            y_axis: Vec3::Y,
            normal: Vec3::Z,
        }
    }

    /// Frame from an origin and two directions; `y` is orthogonalized.
    pub fn from_axes(origin: Point3d, x: Vec3, y: Vec3) -> Option<Self> {
        let x_axis = x.normalized()?;
        let y_axis = (y - x_axis * y.dot(&x_axis)).normalized()?;
        Some(Self {
            origin,
            x_axis,
            y_axis,
            normal: x_axis.cross(&y_axis),
        })
    }

    pub fn from_normal(origin: Point3d, normal: Vec3) -> Option<Self> {
        let n = normal.normalized()?;
        let x = n.perpendicular()?;
        Self::from_axes(origin, x, n.cross(&x))
    }

    pub fn point_at(&self, x: f64, y: f64) -> Point3d {
        self.origin + self.x_axis * x + self.y_axis * y
    }

    /// Image of the frame; orthonormal only when `xform` is a similarity.
    fn transformed(&self, xform: &Transform) -> Option<(Self, f64)> {
        let x = xform.transform_vector(&self.x_axis);
        let y = xform.transform_vector(&self.y_axis);
        let scale = x.length();
        let frame = Self::from_axes(xform.transform_point(&self.origin), x, y)?;
        Some((frame, scale))
    }
}

/// A bounded plane; parameters map linearly onto `extents` along the axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneSurface {
    pub plane: Plane,
    pub extents: [Interval; 2],
    pub domain: [Interval; 2],
}

impl PlaneSurface {
    pub fn new(plane: Plane, x_extent: Interval, y_extent: Interval) -> Self {
        Self {
            plane,
            extents: [x_extent, y_extent],
            domain: [x_extent, y_extent],
        }
    }

    fn local(&self, u: f64, v: f64) -> (f64, f64) {
        (
            self.domain[0].map_to(u, &self.extents[0]),
            self.domain[1].map_to(v, &self.extents[1]),
        )
    }

    /// Exact degree (1, 1) NURBS form with the same parameterization.
    pub fn nurbs_form(&self) -> Option<NurbsSurface> {
        let [du, dv] = self.domain;
        let corner = |u: f64, v: f64| {
            let (x, y) = self.local(u, v);
            self.plane.point_at(x, y)
        };
        NurbsSurface::new(
            1,
            1,
            vec![
                corner(du.t0, dv.t0),
                corner(du.t0, dv.t1),
                corner(du.t1, dv.t0),
                corner(du.t1, dv.t1),
            ],
            vec![],
            vec![du.t0, du.t0, du.t1, du.t1],
            vec![dv.t0, dv.t0, dv.t1, dv.t1],
            2,
            2,
        )
    }
}

/// Cylinder about `plane.normal`; natural parameters are (angle, height).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CylinderSurface {
    pub plane: Plane,
    pub radius: f64,
    pub angle: Interval,
    pub height: Interval,
    pub domain: [Interval; 2],
    /// When set, u is the height and v the angle.
    pub transposed: bool,
}

/// Sphere about `plane.origin`; natural parameters are (longitude, latitude).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphereSurface {
    pub plane: Plane,
    pub radius: f64,
    pub longitude: Interval,
    pub latitude: Interval,
    pub domain: [Interval; 2],
    pub transposed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Surface {
    Plane(PlaneSurface),
    Cylinder(CylinderSurface),
    Sphere(SphereSurface),
    Nurbs(NurbsSurface),
}

impl Surface {
    pub fn plane(plane: Plane, x_extent: Interval, y_extent: Interval) -> Self {
        Surface::Plane(PlaneSurface::new(plane, x_extent, y_extent))
    }

    /// Full cylinder of the given height range; u is the angle in `[0, 2pi]`.
    pub fn cylinder(plane: Plane, radius: f64, height: Interval) -> Self {
        let angle = Interval::new(0.0, TAU);
        Surface::Cylinder(CylinderSurface {
            plane,
            radius,
            angle,
            height,
            domain: [angle, height],
            transposed: false,
        })
    }

    /// Full sphere; u is longitude in `[0, 2pi]`, v latitude in `[-pi/2, pi/2]`.
    pub fn sphere(plane: Plane, radius: f64) -> Self {
        let longitude = Interval::new(0.0, TAU);
        let latitude = Interval::new(-FRAC_PI_2, FRAC_PI_2);
        Surface::Sphere(SphereSurface {
            plane,
            radius,
            longitude,
            latitude,
            domain: [longitude, latitude],
            transposed: false,
        })
    }

    pub fn dimension(&self) -> usize {
        3
    }

    pub fn domain(&self, dir: usize) -> Interval {
        let dir = dir.min(1);
        match self {
            Surface::Plane(p) => p.domain[dir],
            Surface::Cylinder(c) => c.domain[dir],
            Surface::Sphere(s) => s.domain[dir],
            Surface::Nurbs(n) => n.domain(dir),
        }
    }

    /// Natural (analytic) parameters of a domain point.
    fn natural(domain: &[Interval; 2], a: &Interval, b: &Interval, transposed: bool, u: f64, v: f64) -> (f64, f64) {
        let (u, v) = if transposed { (v, u) } else { (u, v) };
        let (du, dv) = if transposed {
            (domain[1], domain[0])
        } else {
            (domain[0], domain[1])
        };
        (du.map_to(u, a), dv.map_to(v, b))
    }

    pub fn point_at(&self, u: f64, v: f64) -> Point3d {
        match self {
            Surface::Plane(p) => {
                let (x, y) = p.local(u, v);
                p.plane.point_at(x, y)
            }
            Surface::Cylinder(c) => {
                let (a, h) = Self::natural(&c.domain, &c.angle, &c.height, c.transposed, u, v);
                let pl = &c.plane;
                pl.origin + pl.x_axis * (c.radius * a.cos()) + pl.y_axis * (c.radius * a.sin()) + pl.normal * h
            }
            Surface::Sphere(s) => {
                let (lon, lat) = Self::natural(&s.domain, &s.longitude, &s.latitude, s.transposed, u, v);
                let pl = &s.plane;
                let r = s.radius * lat.cos();
                pl.origin + pl.x_axis * (r * lon.cos()) + pl.y_axis * (r * lon.sin()) + pl.normal * (s.radius * lat.sin())
            }
            Surface::Nurbs(n) => n.evaluate(u, v),
        }
    }

    /// First partial derivatives `(Su, Sv)`.
    pub fn derivatives(&self, u: f64, v: f64) -> (Vec3, Vec3) {
        match self {
            Surface::Plane(p) => {
                let su = p.extents[0].length() / p.domain[0].length();
                let sv = p.extents[1].length() / p.domain[1].length();
                (p.plane.x_axis * su, p.plane.y_axis * sv)
            }
            Surface::Cylinder(c) => {
                let (a, _) = Self::natural(&c.domain, &c.angle, &c.height, c.transposed, u, v);
                let pl = &c.plane;
                let (da_dom, dh_dom) = if c.transposed { (c.domain[1], c.domain[0]) } else { (c.domain[0], c.domain[1]) };
                let d_angle = (pl.x_axis * (-c.radius * a.sin()) + pl.y_axis * (c.radius * a.cos()))
                    * (c.angle.length() / da_dom.length());
                let d_height = pl.normal * (c.height.length() / dh_dom.length());
                if c.transposed { (d_height, d_angle) } else { (d_angle, d_height) }
            }
            Surface::Sphere(s) => {
                let (lon, lat) = Self::natural(&s.domain, &s.longitude, &s.latitude, s.transposed, u, v);
                let pl = &s.plane;
                let (dlon_dom, dlat_dom) = if s.transposed { (s.domain[1], s.domain[0]) } else { (s.domain[0], s.domain[1]) };
                let r = s.radius;
                let d_lon = (pl.x_axis * (-r * lat.cos() * lon.sin()) + pl.y_axis * (r * lat.cos() * lon.cos()))
                    * (s.longitude.length() / dlon_dom.length());
                let d_lat = (pl.x_axis * (-r * lat.sin() * lon.cos()) + pl.y_axis * (-r * lat.sin() * lon.sin())
                    + pl.normal * (r * lat.cos()))
                    * (s.latitude.length() / dlat_dom.length());
                if s.transposed { (d_lat, d_lon) } else { (d_lon, d_lat) }
            }
            Surface::Nurbs(n) => n.derivatives(u, v),
        }
    }

    /// Unit normal `Su x Sv`; `None` at poles and other degenerate points.
    pub fn normal_at(&self, u: f64, v: f64) -> Option<Vec3> {
        let (su, sv) = self.derivatives(u, v);
        su.cross(&sv).normalized()
    }

    pub fn is_closed(&self, dir: usize) -> bool {
        match self {
            Surface::Plane(_) => false,
            Surface::Cylinder(c) => {
                let angle_dir = usize::from(c.transposed);
                dir == angle_dir && c.angle.length().abs() >= TAU * (1.0 - crate::SQRT_EPSILON)
            }
            Surface::Sphere(s) => {
                let lon_dir = usize::from(s.transposed);
                dir == lon_dir && s.longitude.length().abs() >= TAU * (1.0 - crate::SQRT_EPSILON)
            }
            Surface::Nurbs(_) => {
                // Opposite sides must coincide pointwise without collapsing.
                let (a_side, b_side) = if dir == 0 { (3, 1) } else { (0, 2) };
                let a = self.side_samples(a_side, 8);
                let b = self.side_samples(b_side, 8);
                let scale = self.bounding_box().max_abs_coordinate().max(1.0);
                let tol = crate::ZERO_TOLERANCE * scale;
                a.iter().zip(&b).all(|(p, q)| p.distance_to(q) <= tol) && !self.is_singular(a_side)
            }
        }
    }

    fn side_samples(&self, side: usize, count: usize) -> Vec<Point3d> {
        let (du, dv) = (self.domain(0), self.domain(1));
        (0..=count)
            .map(|i| {
                let s = i as f64 / count as f64;
                match side {
                    0 => self.point_at(du.param_at(s), dv.t0),
                    1 => self.point_at(du.t1, dv.param_at(s)),
                    2 => self.point_at(du.param_at(s), dv.t1),
                    _ => self.point_at(du.t0, dv.param_at(s)),
                }
            })
            .collect()
    }

    /// True when side `side` (S=0, E=1, N=2, W=3) collapses to a point.
    pub fn is_singular(&self, side: usize) -> bool {
        let pts = self.side_samples(side, 8);
        let bb = BoundingBox::from_points(&pts);
        let scale = bb.max_abs_coordinate().max(1.0);
        bb.diagonal() <= crate::ZERO_TOLERANCE * scale
    }

    /// Classify a 2D curve, restricted to `sub_domain`, against this surface.
    pub fn is_isoparametric(&self, curve: &Curve, sub_domain: Interval) -> IsoType {
        let pts: Vec<Point3d> = (0..=8)
            .map(|i| curve.point_at(sub_domain.param_at(i as f64 / 8.0)))
            .collect();
        let bb = BoundingBox::from_points(&pts);
        if !bb.is_valid() {
            return IsoType::NotIso;
        }
        let (du, dv) = (self.domain(0), self.domain(1));
        let tol = |d: &Interval| crate::ZERO_TOLERANCE * d.magnitude().max(1.0);
        let width = bb.max.x - bb.min.x;
        let height = bb.max.y - bb.min.y;
        if width <= tol(&du) && height > tol(&dv) {
            let x = 0.5 * (bb.min.x + bb.max.x);
            if (x - du.t0).abs() <= tol(&du) {
                return IsoType::West;
            }
            if (x - du.t1).abs() <= tol(&du) {
                return IsoType::East;
            }
            return IsoType::X;
        }
        if height <= tol(&dv) && width > tol(&du) {
            let y = 0.5 * (bb.min.y + bb.max.y);
            if (y - dv.t0).abs() <= tol(&dv) {
                return IsoType::South;
            }
            if (y - dv.t1).abs() <= tol(&dv) {
                return IsoType::North;
            }
            return IsoType::Y;
        }
        IsoType::NotIso
    }

    /// Isoparametric 3D curve: `dir == 0` runs along u at `v == c`, `dir == 1`
    /// along v at `u == c`. The curve's domain is the surface domain in `dir`.
    /// `None` where the iso line collapses to a point.
    pub fn iso_curve(&self, dir: usize, c: f64) -> Option<Curve> {
        let run = self.domain(dir);
        let mut curve = match self {
            Surface::Plane(_) => {
                let (a, b) = if dir == 0 {
                    (self.point_at(run.t0, c), self.point_at(run.t1, c))
                } else {
                    (self.point_at(c, run.t0), self.point_at(c, run.t1))
                };
                Curve::line(a, b)
            }
            Surface::Cylinder(cyl) => {
                let angle_dir = usize::from(cyl.transposed);
                let pl = &cyl.plane;
                if dir == angle_dir {
                    let (_, h) = if cyl.transposed {
                        Self::natural(&cyl.domain, &cyl.angle, &cyl.height, true, c, run.t0)
                    } else {
                        Self::natural(&cyl.domain, &cyl.angle, &cyl.height, false, run.t0, c)
                    };
                    Curve::arc(pl.origin + pl.normal * h, pl.x_axis, pl.y_axis, cyl.radius, cyl.angle)
                } else {
                    let (a, b) = if dir == 0 {
                        (self.point_at(run.t0, c), self.point_at(run.t1, c))
                    } else {
                        (self.point_at(c, run.t0), self.point_at(c, run.t1))
                    };
                    Curve::line(a, b)
                }
            }
            Surface::Sphere(sph) => {
                let lon_dir = usize::from(sph.transposed);
                let pl = &sph.plane;
                let (u, v) = if dir == 0 { (run.t0, c) } else { (c, run.t0) };
                let (lon, lat) = Self::natural(&sph.domain, &sph.longitude, &sph.latitude, sph.transposed, u, v);
                if dir == lon_dir {
                    let r = sph.radius * lat.cos();
                    if r.abs() <= crate::ZERO_TOLERANCE * sph.radius.max(1.0) {
                        return None;
                    }
                    Curve::arc(pl.origin + pl.normal * (sph.radius * lat.sin()), pl.x_axis, pl.y_axis, r, sph.longitude)
                } else {
                    let x = pl.x_axis * lon.cos() + pl.y_axis * lon.sin();
                    Curve::arc(pl.origin, x, pl.normal, sph.radius, sph.latitude)
                }
            }
            Surface::Nurbs(n) => Curve::nurbs(n.iso_curve(dir, c)?, 3),
        };
        if !curve.set_domain(run) {
            return None;
        }
        let bb = curve.bounding_box();
        if bb.diagonal() <= crate::ZERO_TOLERANCE * bb.max_abs_coordinate().max(1.0) {
            return None;
        }
        Some(curve)
    }

    pub fn set_domain(&mut self, dir: usize, domain: Interval) -> bool {
        if !domain.is_increasing() {
            return false;
        }
        let dir = dir.min(1);
        match self {
            Surface::Plane(p) => p.domain[dir] = domain,
            Surface::Cylinder(c) => c.domain[dir] = domain,
            Surface::Sphere(s) => s.domain[dir] = domain,
            Surface::Nurbs(n) => return n.set_domain(dir, domain),
        }
        true
    }

    /// Reverse parameter direction `dir`; that domain becomes `[-t1, -t0]`.
    pub fn reverse(&mut self, dir: usize) -> bool {
        let dir = dir.min(1);
        match self {
            Surface::Plane(p) => {
                if dir == 0 {
                    p.plane.x_axis = -p.plane.x_axis;
                } else {
                    p.plane.y_axis = -p.plane.y_axis;
                }
                p.plane.normal = -p.plane.normal;
                p.extents[dir] = p.extents[dir].reversed();
                p.domain[dir] = p.domain[dir].reversed();
            }
            Surface::Cylinder(c) => {
                let natural_dir = if c.transposed { 1 - dir } else { dir };
                if natural_dir == 0 {
                    c.plane.y_axis = -c.plane.y_axis;
                    c.angle = c.angle.reversed();
                } else {
                    c.plane.normal = -c.plane.normal;
                    c.height = c.height.reversed();
                }
                c.domain[dir] = c.domain[dir].reversed();
            }
            Surface::Sphere(s) => {
                let natural_dir = if s.transposed { 1 - dir } else { dir };
                if natural_dir == 0 {
                    s.plane.y_axis = -s.plane.y_axis;
                    s.longitude = s.longitude.reversed();
                } else {
                    s.plane.normal = -s.plane.normal;
                    s.latitude = s.latitude.reversed();
                }
                s.domain[dir] = s.domain[dir].reversed();
            }
            Surface::Nurbs(n) => n.reverse(dir),
        }
        true
    }

    /// Swap u and v; flips the natural normal.
    pub fn transpose(&mut self) -> bool {
        match self {
            Surface::Plane(p) => {
                std::mem::swap(&mut p.plane.x_axis, &mut p.plane.y_axis);
                p.plane.normal = -p.plane.normal;
                p.extents.swap(0, 1);
                p.domain.swap(0, 1);
            }
            Surface::Cylinder(c) => {
                c.transposed = !c.transposed;
                c.domain.swap(0, 1);
            }
            Surface::Sphere(s) => {
                s.transposed = !s.transposed;
                s.domain.swap(0, 1);
            }
            Surface::Nurbs(n) => n.transpose(),
        }
        true
    }

    /// Restrict direction `dir` to a sub-interval of its domain.
    pub fn trim(&mut self, dir: usize, interval: Interval) -> bool {
        let dir = dir.min(1);
        let d = self.domain(dir);
        if !interval.is_increasing() || !d.includes_interval(&interval, 0.0) {
            return false;
        }
        match self {
            Surface::Plane(p) => {
                p.extents[dir] = Interval::new(
                    d.map_to(interval.t0, &p.extents[dir]),
                    d.map_to(interval.t1, &p.extents[dir]),
                );
                p.domain[dir] = interval;
            }
            Surface::Cylinder(c) => {
                let natural_dir = if c.transposed { 1 - dir } else { dir };
                let nat = if natural_dir == 0 { &mut c.angle } else { &mut c.height };
                *nat = Interval::new(d.map_to(interval.t0, nat), d.map_to(interval.t1, nat));
                c.domain[dir] = interval;
            }
            Surface::Sphere(s) => {
                let natural_dir = if s.transposed { 1 - dir } else { dir };
                let nat = if natural_dir == 0 { &mut s.longitude } else { &mut s.latitude };
                *nat = Interval::new(d.map_to(interval.t0, nat), d.map_to(interval.t1, nat));
                s.domain[dir] = interval;
            }
            Surface::Nurbs(n) => return n.trim(dir, interval),
        }
        true
    }

    /// Apply `xform`. Exact for NURBS and for similarities; otherwise the
    /// analytic surface is approximated and `false` is returned.
    pub fn transform(&mut self, xform: &Transform) -> bool {
        if let Surface::Nurbs(n) = self {
            n.transform(xform);
            return true;
        }
        let exact = xform.similarity(crate::SQRT_EPSILON) != Similarity::None;
        let ok = match self {
            Surface::Plane(p) => match p.plane.transformed(xform) {
                Some((frame, _)) => {
                    // Extents follow the images of the two axes.
                    let sx = xform.transform_vector(&p.plane.x_axis).length();
                    let sy = xform.transform_vector(&p.plane.y_axis).length();
                    p.plane = frame;
                    p.extents = [
                        Interval::new(p.extents[0].t0 * sx, p.extents[0].t1 * sx),
                        Interval::new(p.extents[1].t0 * sy, p.extents[1].t1 * sy),
                    ];
                    true
                }
                None => false,
            },
            Surface::Cylinder(c) => match c.plane.transformed(xform) {
                Some((frame, scale)) => {
                    c.plane = frame;
                    c.radius *= scale;
                    c.height = Interval::new(c.height.t0 * scale, c.height.t1 * scale);
                    true
                }
                None => false,
            },
            Surface::Sphere(s) => match s.plane.transformed(xform) {
                Some((frame, scale)) => {
                    s.plane = frame;
                    s.radius *= scale;
                    true
                }
                None => false,
            },
            Surface::Nurbs(_) => true,
        };
        if ok && !exact {
            warn!(kind = self.type_name(), "surface approximated under non-similarity transform");
        }
        ok && exact
    }

    /// Exact NURBS representation where one is available.
    pub fn nurbs_form(&self) -> Option<NurbsSurface> {
        match self {
            Surface::Plane(p) => p.nurbs_form(),
            Surface::Nurbs(n) => Some(n.clone()),
            _ => None,
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        match self {
            Surface::Plane(p) => {
                let [du, dv] = p.domain;
                BoundingBox::from_points(&[
                    self.point_at(du.t0, dv.t0),
                    self.point_at(du.t1, dv.t0),
                    self.point_at(du.t0, dv.t1),
                    self.point_at(du.t1, dv.t1),
                ])
            }
            Surface::Cylinder(c) => {
                let pl = &c.plane;
                let r = c.radius.abs();
                let mut pts = Vec::with_capacity(8);
                for h in [c.height.t0, c.height.t1] {
                    for (sx, sy) in [(-1.0, -1.0), (-1.0, 1.0), (1.0, -1.0), (1.0, 1.0)] {
                        pts.push(pl.origin + pl.normal * h + pl.x_axis * (sx * r) + pl.y_axis * (sy * r));
                    }
                }
                BoundingBox::from_points(&pts)
            }
            Surface::Sphere(s) => BoundingBox::point(s.plane.origin).expanded(s.radius.abs()),
            Surface::Nurbs(n) => n.bounding_box(),
        }
    }

    pub fn is_valid(&self) -> bool {
        let domains_ok = self.domain(0).is_increasing() && self.domain(1).is_increasing();
        domains_ok
            && match self {
                Surface::Plane(p) => p.extents.iter().all(|e| e.t0 != e.t1),
                Surface::Cylinder(c) => c.radius > 0.0,
                Surface::Sphere(s) => s.radius > 0.0,
                Surface::Nurbs(n) => n.control_points.iter().all(Point3d::is_finite),
            }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Surface::Plane(_) => "plane",
            Surface::Cylinder(_) => "cylinder",
            Surface::Sphere(_) => "sphere",
            Surface::Nurbs(_) => "nurbs",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_plane() -> Surface {
        Surface::plane(Plane::xy(), Interval::new(0.0, 1.0), Interval::new(0.0, 1.0))
    }

    #[test]
    fn test_plane_nurbs_form_agrees() {
        let p = unit_plane();
        let n = Surface::Nurbs(p.nurbs_form().unwrap());
        for (u, v) in [(0.0, 0.0), (0.3, 0.9), (1.0, 1.0)] {
            assert!(p.point_at(u, v).distance_to(&n.point_at(u, v)) < 1e-12);
        }
    }

    #[test]
    fn test_plane_shear_is_not_exact() {
        let mut p = unit_plane();
        assert!(!p.transform(&Transform::shear_xy(0.5)));
        let mut q = unit_plane();
        assert!(q.transform(&Transform::rotation_z(0.4)));
    }

    #[test]
    fn test_sphere_poles_singular() {
        let s = Surface::sphere(Plane::xy(), 2.0);
        assert!(s.is_singular(0));
        assert!(s.is_singular(2));
        assert!(!s.is_singular(1));
        assert!(s.is_closed(0));
        assert!(!s.is_closed(1));
        assert!(s.iso_curve(0, -FRAC_PI_2).is_none());
    }

    #[test]
    fn test_cylinder_closed_and_normal() {
        let c = Surface::cylinder(Plane::xy(), 1.0, Interval::new(0.0, 2.0));
        assert!(c.is_closed(0));
        assert!(!c.is_closed(1));
        let n = c.normal_at(0.0, 1.0).unwrap();
        assert_relative_eq!(n.x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_reverse_and_transpose_keep_points() {
        for mut s in [
            unit_plane(),
            Surface::cylinder(Plane::xy(), 1.0, Interval::new(0.0, 2.0)),
            Surface::sphere(Plane::xy(), 1.0),
        ] {
            let orig = s.clone();
            let (u, v) = (orig.domain(0).param_at(0.3), orig.domain(1).param_at(0.6));
            assert!(s.reverse(0));
            assert!(s.point_at(-u, v).distance_to(&orig.point_at(u, v)) < 1e-12);
            let mut t = orig.clone();
            assert!(t.transpose());
            assert!(t.point_at(v, u).distance_to(&orig.point_at(u, v)) < 1e-12);
        }
    }

    #[test]
    fn test_iso_classification() {
        let p = unit_plane();
        let west = Curve::line_2d(Point3d::new(0.0, 1.0, 0.0).xy(), Point3d::ORIGIN.xy());
        assert_eq!(p.is_isoparametric(&west, west.domain()), IsoType::West);
        let south = Curve::line_2d(Point3d::ORIGIN.xy(), Point3d::new(1.0, 0.0, 0.0).xy());
        assert_eq!(p.is_isoparametric(&south, south.domain()), IsoType::South);
        let mid = Curve::line_2d(Point3d::new(0.5, 0.0, 0.0).xy(), Point3d::new(0.5, 1.0, 0.0).xy());
        assert_eq!(p.is_isoparametric(&mid, mid.domain()), IsoType::X);
        let diag = Curve::line_2d(Point3d::ORIGIN.xy(), Point3d::new(1.0, 1.0, 0.0).xy());
        assert_eq!(p.is_isoparametric(&diag, diag.domain()), IsoType::NotIso);
    }

    #[test]
    fn test_iso_curve_domain() {
        let c = Surface::cylinder(Plane::xy(), 1.0, Interval::new(0.0, 2.0));
        let seam = c.iso_curve(1, 0.0).unwrap();
        assert_eq!(seam.domain(), Interval::new(0.0, 2.0));
        assert!(seam.end_point().distance_to(&Point3d::new(1.0, 0.0, 2.0)) < 1e-12);
        let ring = c.iso_curve(0, 2.0).unwrap();
        assert!(ring.is_closed());
    }
}

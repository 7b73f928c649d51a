use std::f64::consts::{FRAC_PI_2, TAU};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::bbox::BoundingBox;
use super::interval::Interval;
use super::nurbs::NurbsCurve;
use super::point::{Point2d, Point3d};
use super::transform::{Similarity, Transform};
use super::vector::Vec3;

/// A bounded line segment parameterized over `domain`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineCurve {
    pub from: Point3d,
    pub to: Point3d,
    pub domain: Interval,
}

/// A circular arc in the plane spanned by an orthonormal `x_axis`/`y_axis`.
///
/// `angle` is the swept angle interval in radians; `domain` maps linearly
/// onto it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcCurve {
    pub center: Point3d,
    pub x_axis: Vec3,
    pub y_axis: Vec3,
    pub radius: f64,
    pub angle: Interval,
    pub domain: Interval,
}

impl ArcCurve {
    fn angle_at(&self, t: f64) -> f64 {
        self.domain.map_to(t, &self.angle)
    }

    fn point_at_angle(&self, theta: f64) -> Point3d {
        self.center + self.x_axis * (self.radius * theta.cos()) + self.y_axis * (self.radius * theta.sin())
    }

    fn tangent_at_angle(&self, theta: f64) -> Vec3 {
        self.x_axis * (-self.radius * theta.sin()) + self.y_axis * (self.radius * theta.cos())
    }

    pub fn is_circle(&self) -> bool {
        self.angle.length().abs() >= TAU * (1.0 - f64::EPSILON.sqrt())
    }

    /// Exact rational quadratic form, reparameterized onto the arc's domain.
    pub fn to_nurbs(&self) -> Option<NurbsCurve> {
        let sweep = self.angle.length();
        let segments = ((sweep.abs() / FRAC_PI_2).ceil() as usize).max(1);
        let d_theta = sweep / segments as f64;
        let w1 = (0.5 * d_theta).cos();
        if w1.abs() <= f64::EPSILON {
            return None;
        }

        let mut points = Vec::with_capacity(2 * segments + 1);
        let mut weights = Vec::with_capacity(2 * segments + 1);
        points.push(self.point_at_angle(self.angle.t0));
        weights.push(1.0);
        for i in 1..=segments {
            let theta = self.angle.t0 + d_theta * i as f64;
            let mid = theta - 0.5 * d_theta;
            let r = self.radius / w1;
            points.push(self.center + self.x_axis * (r * mid.cos()) + self.y_axis * (r * mid.sin()));
            weights.push(w1);
            points.push(self.point_at_angle(theta));
            weights.push(1.0);
        }

        let mut knots = vec![self.domain.t0; 3];
        for i in 1..segments {
            let k = self.domain.param_at(i as f64 / segments as f64);
            knots.push(k);
            knots.push(k);
        }
        knots.extend([self.domain.t1; 3]);
        NurbsCurve::new(2, points, weights, knots)
    }
}

/// Concatenation of curves; segment `i` covers `[breaks[i], breaks[i + 1]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolyCurve {
    pub segments: Vec<Curve>,
    pub breaks: Vec<f64>,
}

impl PolyCurve {
    fn segment_index(&self, t: f64) -> usize {
        let last = self.segments.len().saturating_sub(1);
        (0..last).find(|&i| t <= self.breaks[i + 1]).unwrap_or(last)
    }

    fn segment_span(&self, i: usize) -> Interval {
        Interval::new(self.breaks[i], self.breaks[i + 1])
    }

    fn local_param(&self, i: usize, t: f64) -> f64 {
        self.segment_span(i).map_to(t, &self.segments[i].domain())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CurveKind {
    Line(LineCurve),
    Arc(ArcCurve),
    Nurbs(NurbsCurve),
    Poly(PolyCurve),
}

/// A 2D (parameter space, `z == 0`) or 3D curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub dim: usize,
    pub kind: CurveKind,
}

impl Curve {
    pub fn line(from: Point3d, to: Point3d) -> Self {
        Self {
            dim: 3,
            kind: CurveKind::Line(LineCurve {
                from,
                to,
                domain: Interval::new(0.0, from.distance_to(&to).max(1.0)),
            }),
        }
    }

    /// Parameter-space segment; the domain is `[0, 1]`.
    pub fn line_2d(from: Point2d, to: Point2d) -> Self {
        Self {
            dim: 2,
            kind: CurveKind::Line(LineCurve {
                from: from.to_3d(),
                to: to.to_3d(),
                domain: Interval::UNIT,
            }),
        }
    }

    /// Arc on the circle `center + r(cos t X + sin t Y)`, with domain equal
    /// to the angle interval.
    pub fn arc(center: Point3d, x_axis: Vec3, y_axis: Vec3, radius: f64, angle: Interval) -> Self {
        Self {
            dim: 3,
            kind: CurveKind::Arc(ArcCurve {
                center,
                x_axis,
                y_axis,
                radius,
                angle,
                domain: angle,
            }),
        }
    }

    /// Full circle about `normal`.
    pub fn circle(center: Point3d, normal: Vec3, radius: f64) -> Option<Self> {
        let n = normal.normalized()?;
        let x_axis = n.perpendicular()?;
        let y_axis = n.cross(&x_axis);
        Some(Self::arc(center, x_axis, y_axis, radius, Interval::new(0.0, TAU)))
    }

    pub fn nurbs(curve: NurbsCurve, dim: usize) -> Self {
        Self {
            dim,
            kind: CurveKind::Nurbs(curve),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// Coerce to `dim`; 2D curves get their z coordinates zeroed.
    pub fn change_dimension(&mut self, dim: usize) -> bool {
        if dim != 2 && dim != 3 {
            return false;
        }
        if dim == 2 {
            match &mut self.kind {
                CurveKind::Line(l) => {
                    l.from.z = 0.0;
                    l.to.z = 0.0;
                }
                CurveKind::Arc(a) => {
                    a.center.z = 0.0;
                    a.x_axis.z = 0.0;
                    a.y_axis.z = 0.0;
                }
                CurveKind::Nurbs(n) => n.zero_z(),
                CurveKind::Poly(p) => {
                    for s in &mut p.segments {
                        s.change_dimension(2);
                    }
                }
            }
        } else if let CurveKind::Poly(p) = &mut self.kind {
            for s in &mut p.segments {
                s.change_dimension(3);
            }
        }
        self.dim = dim;
        true
    }

    pub fn domain(&self) -> Interval {
        match &self.kind {
            CurveKind::Line(l) => l.domain,
            CurveKind::Arc(a) => a.domain,
            CurveKind::Nurbs(n) => n.domain(),
            CurveKind::Poly(p) => Interval::new(
                p.breaks.first().copied().unwrap_or(0.0),
                p.breaks.last().copied().unwrap_or(0.0),
            ),
        }
    }

    /// Reparameterize without changing shape.
    pub fn set_domain(&mut self, domain: Interval) -> bool {
        if !domain.is_increasing() {
            return false;
        }
        match &mut self.kind {
            CurveKind::Line(l) => l.domain = domain,
            CurveKind::Arc(a) => a.domain = domain,
            CurveKind::Nurbs(n) => return n.set_domain(domain),
            CurveKind::Poly(p) => {
                let from = Interval::new(
                    p.breaks.first().copied().unwrap_or(0.0),
                    p.breaks.last().copied().unwrap_or(0.0),
                );
                for b in &mut p.breaks {
                    *b = from.map_to(*b, &domain);
                }
            }
        }
        true
    }

    pub fn point_at(&self, t: f64) -> Point3d {
        match &self.kind {
            CurveKind::Line(l) => l.from.lerp(&l.to, l.domain.normalized_param(t)),
            CurveKind::Arc(a) => a.point_at_angle(a.angle_at(t)),
            CurveKind::Nurbs(n) => n.evaluate(t),
            CurveKind::Poly(p) => {
                if p.segments.is_empty() {
                    return Point3d::ORIGIN;
                }
                let i = p.segment_index(t);
                p.segments[i].point_at(p.local_param(i, t))
            }
        }
    }

    /// First derivative with respect to the curve parameter.
    pub fn derivative(&self, t: f64) -> Vec3 {
        match &self.kind {
            CurveKind::Line(l) => {
                let len = l.domain.length();
                if len == 0.0 { Vec3::ZERO } else { (l.to - l.from) / len }
            }
            CurveKind::Arc(a) => {
                let len = a.domain.length();
                if len == 0.0 {
                    return Vec3::ZERO;
                }
                a.tangent_at_angle(a.angle_at(t)) * (a.angle.length() / len)
            }
            CurveKind::Nurbs(n) => n.derivative(t),
            CurveKind::Poly(p) => {
                if p.segments.is_empty() {
                    return Vec3::ZERO;
                }
                let i = p.segment_index(t);
                let span = p.segment_span(i).length();
                let seg = &p.segments[i];
                if span == 0.0 {
                    return Vec3::ZERO;
                }
                seg.derivative(p.local_param(i, t)) * (seg.domain().length() / span)
            }
        }
    }

    /// Unit tangent, or `None` where the derivative vanishes.
    pub fn tangent_at(&self, t: f64) -> Option<Vec3> {
        self.derivative(t).normalized()
    }

    pub fn start_point(&self) -> Point3d {
        self.point_at(self.domain().t0)
    }

    pub fn end_point(&self) -> Point3d {
        self.point_at(self.domain().t1)
    }

    /// Closed when the ends coincide on a non-degenerate curve.
    pub fn is_closed(&self) -> bool {
        match &self.kind {
            CurveKind::Line(_) => false,
            CurveKind::Arc(a) => a.is_circle(),
            CurveKind::Nurbs(n) => {
                n.num_control_points() > 2 && {
                    let (s, e) = (n.start_point(), n.end_point());
                    let scale = s.max_abs_coordinate().max(1.0);
                    s.distance_to(&e) <= crate::ZERO_TOLERANCE * scale
                        && n.control_points.iter().any(|p| p.distance_to(&s) > crate::ZERO_TOLERANCE * scale)
                }
            }
            CurveKind::Poly(p) => {
                if p.segments.len() == 1 {
                    return p.segments[0].is_closed();
                }
                let (s, e) = (self.start_point(), self.end_point());
                p.segments.len() > 1 && s.distance_to(&e) <= crate::ZERO_TOLERANCE * s.max_abs_coordinate().max(1.0)
            }
        }
    }

    /// Reverse direction; the domain becomes `[-t1, -t0]`.
    pub fn reverse(&mut self) -> bool {
        match &mut self.kind {
            CurveKind::Line(l) => {
                std::mem::swap(&mut l.from, &mut l.to);
                l.domain = l.domain.reversed();
            }
            CurveKind::Arc(a) => {
                a.y_axis = -a.y_axis;
                a.angle = a.angle.reversed();
                a.domain = a.domain.reversed();
            }
            CurveKind::Nurbs(n) => n.reverse(),
            CurveKind::Poly(p) => {
                for s in &mut p.segments {
                    s.reverse();
                }
                p.segments.reverse();
                p.breaks.reverse();
                for b in &mut p.breaks {
                    *b = -*b;
                }
            }
        }
        true
    }

    /// Restrict the curve to a sub-interval of its domain.
    pub fn trim(&mut self, interval: Interval) -> bool {
        let d = self.domain();
        let tol = crate::SQRT_EPSILON * d.magnitude().max(1.0);
        if !interval.is_increasing() || !d.includes_interval(&interval, tol) {
            return false;
        }
        let interval = Interval::new(interval.t0.max(d.t0), interval.t1.min(d.t1));
        match &mut self.kind {
            CurveKind::Line(l) => {
                let (a, b) = (
                    l.from.lerp(&l.to, l.domain.normalized_param(interval.t0)),
                    l.from.lerp(&l.to, l.domain.normalized_param(interval.t1)),
                );
                l.from = a;
                l.to = b;
                l.domain = interval;
                true
            }
            CurveKind::Arc(a) => {
                a.angle = Interval::new(a.angle_at(interval.t0), a.angle_at(interval.t1));
                a.domain = interval;
                true
            }
            CurveKind::Nurbs(n) => n.trim(interval),
            CurveKind::Poly(p) => {
                let mut segments = Vec::new();
                let mut breaks = vec![interval.t0];
                for i in 0..p.segments.len() {
                    let span = p.segment_span(i);
                    let lo = span.t0.max(interval.t0);
                    let hi = span.t1.min(interval.t1);
                    if hi <= lo {
                        continue;
                    }
                    let mut seg = p.segments[i].clone();
                    let local = Interval::new(p.local_param(i, lo), p.local_param(i, hi));
                    if local != seg.domain() && !seg.trim(local) {
                        return false;
                    }
                    segments.push(seg);
                    breaks.push(hi);
                }
                if segments.is_empty() {
                    return false;
                }
                p.segments = segments;
                p.breaks = breaks;
                true
            }
        }
    }

    /// Apply `xform`. Arcs under a non-similarity become rational NURBS;
    /// returns false only when no exact image could be built.
    pub fn transform(&mut self, xform: &Transform) -> bool {
        match &mut self.kind {
            CurveKind::Line(l) => {
                l.from = xform.transform_point(&l.from);
                l.to = xform.transform_point(&l.to);
                true
            }
            CurveKind::Arc(a) => {
                let similar = xform.similarity(crate::SQRT_EPSILON);
                if similar != Similarity::None {
                    let x = xform.transform_vector(&a.x_axis);
                    let y = xform.transform_vector(&a.y_axis);
                    match (x.normalized(), y.normalized()) {
                        (Some(xn), Some(yn)) => {
                            a.center = xform.transform_point(&a.center);
                            a.radius *= x.length();
                            a.x_axis = xn;
                            a.y_axis = yn;
                            return true;
                        }
                        _ => return false,
                    }
                }
                match a.to_nurbs() {
                    Some(mut n) => {
                        n.transform(xform);
                        self.kind = CurveKind::Nurbs(n);
                        true
                    }
                    None => {
                        warn!(radius = a.radius, "arc could not be converted for transform");
                        false
                    }
                }
            }
            CurveKind::Nurbs(n) => {
                n.transform(xform);
                true
            }
            CurveKind::Poly(p) => p.segments.iter_mut().fold(true, |ok, s| s.transform(xform) && ok),
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        match &self.kind {
            CurveKind::Line(l) => BoundingBox::from_points(&[l.from, l.to]),
            CurveKind::Arc(a) => match a.to_nurbs() {
                Some(n) => n.bounding_box(),
                None => BoundingBox::from_points(&[self.start_point(), self.end_point()]),
            },
            CurveKind::Nurbs(n) => n.bounding_box(),
            CurveKind::Poly(p) => p
                .segments
                .iter()
                .fold(BoundingBox::empty(), |acc, s| acc.union(&s.bounding_box())),
        }
    }

    /// Move the start point; fails for arcs whose start would change.
    pub fn set_start_point(&mut self, point: Point3d) -> bool {
        if self.start_point() == point {
            return true;
        }
        match &mut self.kind {
            CurveKind::Line(l) => {
                l.from = point;
                true
            }
            CurveKind::Arc(_) => false,
            CurveKind::Nurbs(n) => n.set_start_point(point),
            CurveKind::Poly(p) => p.segments.first_mut().is_some_and(|s| s.set_start_point(point)),
        }
    }

    /// Move the end point; fails for arcs whose end would change.
    pub fn set_end_point(&mut self, point: Point3d) -> bool {
        if self.end_point() == point {
            return true;
        }
        match &mut self.kind {
            CurveKind::Line(l) => {
                l.to = point;
                true
            }
            CurveKind::Arc(_) => false,
            CurveKind::Nurbs(n) => n.set_end_point(point),
            CurveKind::Poly(p) => p.segments.last_mut().is_some_and(|s| s.set_end_point(point)),
        }
    }

    /// Join `next` onto the end of `self`. The ends must meet within
    /// `tolerance`; the result is a poly curve continuing `self`'s domain.
    pub fn concatenate(&self, next: &Curve, tolerance: f64) -> Option<Curve> {
        if self.dim != next.dim || self.end_point().distance_to(&next.start_point()) > tolerance {
            return None;
        }
        let mut segments = Vec::new();
        let mut breaks = Vec::new();
        for c in [self, next] {
            let d = c.domain();
            let offset = breaks.last().copied().unwrap_or(d.t0) - d.t0;
            let (segs, bks) = match &c.kind {
                CurveKind::Poly(p) => (p.segments.clone(), p.breaks.clone()),
                _ => (vec![c.clone()], vec![d.t0, d.t1]),
            };
            if breaks.is_empty() {
                breaks.push(bks[0] + offset);
            }
            segments.extend(segs);
            breaks.extend(bks[1..].iter().map(|b| b + offset));
        }
        Some(Curve {
            dim: self.dim,
            kind: CurveKind::Poly(PolyCurve { segments, breaks }),
        })
    }

    /// Rough cost of the representation; lines are the simplest.
    pub fn complexity(&self) -> usize {
        match &self.kind {
            CurveKind::Line(_) => 1,
            CurveKind::Arc(_) => 2,
            CurveKind::Nurbs(n) => n.num_control_points() * (1 + usize::from(n.is_rational())),
            CurveKind::Poly(p) => p.segments.iter().map(Curve::complexity).sum(),
        }
    }

    /// `count + 1` evenly spaced samples across the domain.
    pub fn sample(&self, count: usize) -> Vec<Point3d> {
        let d = self.domain();
        let count = count.max(1);
        (0..=count)
            .map(|i| self.point_at(d.param_at(i as f64 / count as f64)))
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        if !self.domain().is_increasing() {
            return false;
        }
        match &self.kind {
            CurveKind::Line(l) => l.from.is_finite() && l.to.is_finite(),
            CurveKind::Arc(a) => a.radius > 0.0 && a.radius.is_finite() && a.angle.length() != 0.0,
            CurveKind::Nurbs(n) => n.control_points.iter().all(Point3d::is_finite),
            CurveKind::Poly(p) => {
                p.breaks.len() == p.segments.len() + 1
                    && p.breaks.windows(2).all(|w| w[0] < w[1])
                    && p.segments.iter().all(|s| s.dim == self.dim && s.is_valid())
            }
        }
    }

    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            CurveKind::Line(_) => "line",
            CurveKind::Arc(_) => "arc",
            CurveKind::Nurbs(_) => "nurbs",
            CurveKind::Poly(_) => "poly",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn quarter_arc() -> Curve {
        Curve::arc(Point3d::ORIGIN, Vec3::X, Vec3::Y, 2.0, Interval::new(0.0, FRAC_PI_2))
    }

    #[test]
    fn test_line_domain_and_trim() {
        let mut c = Curve::line(Point3d::ORIGIN, Point3d::new(4.0, 0.0, 0.0));
        assert_eq!(c.domain(), Interval::new(0.0, 4.0));
        assert!(c.trim(Interval::new(1.0, 3.0)));
        assert!((c.start_point().x - 1.0).abs() < 1e-12);
        assert!((c.point_at(2.0).x - 2.0).abs() < 1e-12);
        assert!(!c.is_closed());
    }

    #[test]
    fn test_arc_reverse_keeps_points() {
        let c = quarter_arc();
        let mut r = c.clone();
        assert!(r.reverse());
        assert_eq!(r.domain(), Interval::new(-FRAC_PI_2, 0.0));
        for t in [0.0, 0.3, 1.0] {
            assert!(r.point_at(-t).distance_to(&c.point_at(t)) < 1e-12);
        }
        let d0 = c.derivative(0.3);
        let d1 = r.derivative(-0.3);
        assert!((d0 + d1).length() < 1e-12);
    }

    #[test]
    fn test_arc_nurbs_form_matches_ends() {
        let c = Curve::arc(Point3d::ORIGIN, Vec3::X, Vec3::Y, 1.0, Interval::new(0.0, 1.5 * PI));
        let CurveKind::Arc(a) = &c.kind else { unreachable!() };
        let n = a.to_nurbs().unwrap();
        assert!(n.start_point().distance_to(&c.start_point()) < 1e-12);
        assert!(n.end_point().distance_to(&c.end_point()) < 1e-12);
        assert_eq!(n.domain(), c.domain());
    }

    #[test]
    fn test_arc_under_shear_becomes_nurbs() {
        let mut c = quarter_arc();
        let t = Transform::shear_xy(0.5);
        let expected_end = t.transform_point(&c.end_point());
        assert!(c.transform(&t));
        assert_eq!(c.type_name(), "nurbs");
        assert!(c.end_point().distance_to(&expected_end) < 1e-12);
    }

    #[test]
    fn test_circle_is_closed() {
        let c = Curve::circle(Point3d::ORIGIN, Vec3::Z, 1.0).unwrap();
        assert!(c.is_closed());
        assert!(!quarter_arc().is_closed());
    }

    #[test]
    fn test_concatenate_lines() {
        let a = Curve::line(Point3d::ORIGIN, Point3d::new(1.0, 0.0, 0.0));
        let b = Curve::line(Point3d::new(1.0, 0.0, 0.0), Point3d::new(1.0, 2.0, 0.0));
        let j = a.concatenate(&b, 1e-12).unwrap();
        assert_eq!(j.domain(), Interval::new(0.0, 3.0));
        assert!(j.point_at(2.0).distance_to(&Point3d::new(1.0, 1.0, 0.0)) < 1e-12);
        assert_eq!(j.complexity(), 2);
        let mut r = j.clone();
        r.reverse();
        assert!(r.start_point().distance_to(&j.end_point()) < 1e-12);
        assert!(a.concatenate(&a, 1e-12).is_none());
    }

    #[test]
    fn test_poly_trim() {
        let a = Curve::line(Point3d::ORIGIN, Point3d::new(1.0, 0.0, 0.0));
        let b = Curve::line(Point3d::new(1.0, 0.0, 0.0), Point3d::new(1.0, 2.0, 0.0));
        let mut j = a.concatenate(&b, 1e-12).unwrap();
        assert!(j.trim(Interval::new(0.5, 2.0)));
        assert!(j.start_point().distance_to(&Point3d::new(0.5, 0.0, 0.0)) < 1e-12);
        assert!(j.end_point().distance_to(&Point3d::new(1.0, 1.0, 0.0)) < 1e-12);
    }

    #[test]
    fn test_change_dimension_zeroes_z() {
        let mut c = Curve::line(Point3d::new(0.0, 0.0, 5.0), Point3d::new(1.0, 1.0, 5.0));
        assert!(c.change_dimension(2));
        assert_eq!(c.dimension(), 2);
        assert_eq!(c.start_point().z, 0.0);
    }
}

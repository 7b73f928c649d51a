use serde::{Deserialize, Serialize};

use super::bbox::BoundingBox;
use super::interval::Interval;
use super::point::Point3d;
use super::transform::Transform;
use super::vector::Vec3;

/// Homogeneous control point `(x*w, y*w, z*w, w)`.
type Hpt = [f64; 4];

fn to_h(p: &Point3d, w: f64) -> Hpt {
    [p.x * w, p.y * w, p.z * w, w]
}

fn from_h(h: &Hpt) -> (Point3d, f64) {
    let w = h[3];
    if w == 0.0 {
        (Point3d::new(h[0], h[1], h[2]), 0.0)
    } else {
        (Point3d::new(h[0] / w, h[1] / w, h[2] / w), w)
    }
}

fn lerp_h(a: &Hpt, b: &Hpt, alpha: f64) -> Hpt {
    [
        (1.0 - alpha) * a[0] + alpha * b[0],
        (1.0 - alpha) * a[1] + alpha * b[1],
        (1.0 - alpha) * a[2] + alpha * b[2],
        (1.0 - alpha) * a[3] + alpha * b[3],
    ]
}

/// Knot span index for `t`, clamped to the valid spans of the control net.
fn find_span(knots: &[f64], degree: usize, num_cps: usize, t: f64) -> usize {
    let n = num_cps - 1;
    let p = degree;
    if t >= knots[n + 1] {
        return n;
    }
    if t <= knots[p] {
        return p;
    }
    let mut low = p;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;
    while t < knots[mid] || t >= knots[mid + 1] {
        if t < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

/// Non-vanishing basis functions `N[span-p..=span]` at `t`.
fn basis_functions(knots: &[f64], span: usize, t: f64, degree: usize) -> Vec<f64> {
    let p = degree;
    let mut n_vals = vec![0.0; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];

    n_vals[0] = 1.0;
    for j in 1..=p {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            let temp = if denom == 0.0 { 0.0 } else { n_vals[r] / denom };
            n_vals[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        n_vals[j] = saved;
    }
    n_vals
}

/// First derivatives of the non-vanishing basis functions at `t`.
fn basis_derivatives(knots: &[f64], span: usize, t: f64, degree: usize) -> Vec<f64> {
    let p = degree;
    let mut ders = vec![0.0; p + 1];
    if p == 0 {
        return ders;
    }
    let lower = basis_functions(knots, span, t, p - 1);
    let pf = p as f64;
    for (k, d) in ders.iter_mut().enumerate() {
        let i = span - p + k;
        let mut value = 0.0;
        if k >= 1 {
            let denom = knots[i + p] - knots[i];
            if denom != 0.0 {
                value += pf * lower[k - 1] / denom;
            }
        }
        if k < p {
            let denom = knots[i + p + 1] - knots[i + 1];
            if denom != 0.0 {
                value -= pf * lower[k] / denom;
            }
        }
        *d = value;
    }
    ders
}

fn multiplicity(knots: &[f64], t: f64) -> usize {
    knots.iter().filter(|&&k| k == t).count()
}

/// Boehm single knot insertion on a homogeneous control polygon.
fn insert_knot(degree: usize, knots: &mut Vec<f64>, cps: &mut Vec<Hpt>, t: f64) {
    let p = degree;
    let n = cps.len() - 1;
    let k = knots
        .iter()
        .rposition(|&u| u <= t)
        .unwrap_or(p)
        .clamp(p, n);
    let mut new_cps = Vec::with_capacity(cps.len() + 1);
    for i in 0..=n + 1 {
        if i + p <= k {
            new_cps.push(cps[i]);
        } else if i <= k {
            let denom = knots[i + p] - knots[i];
            let alpha = if denom == 0.0 { 0.0 } else { (t - knots[i]) / denom };
            new_cps.push(lerp_h(&cps[i - 1], &cps[i], alpha));
        } else {
            new_cps.push(cps[i - 1]);
        }
    }
    knots.insert(k + 1, t);
    *cps = new_cps;
}

/// Restrict a homogeneous B-spline to `[a, b]`, returning clamped knots.
fn extract(degree: usize, knots: &[f64], cps: &[Hpt], a: f64, b: f64) -> Option<(Vec<f64>, Vec<Hpt>)> {
    let p = degree;
    if !(a < b) || cps.len() <= p {
        return None;
    }
    let mut knots = knots.to_vec();
    let mut cps = cps.to_vec();
    for t in [a, b] {
        let mut guard = 0;
        while multiplicity(&knots, t) < p && guard <= p {
            insert_knot(p, &mut knots, &mut cps, t);
            guard += 1;
        }
    }
    let j = knots.iter().rposition(|&u| u == a)?;
    let m = knots.iter().position(|&u| u == b)?;
    if j < p || m <= j || m > cps.len() {
        return None;
    }
    let sub_cps = cps[j - p..m].to_vec();
    let mut sub_knots = Vec::with_capacity(sub_cps.len() + p + 1);
    sub_knots.push(a);
    sub_knots.extend_from_slice(&knots[j - p + 1..m + p]);
    sub_knots.push(b);
    for k in &mut sub_knots {
        *k = k.clamp(a, b);
    }
    if sub_knots.len() != sub_cps.len() + p + 1 {
        return None;
    }
    Some((sub_knots, sub_cps))
}

fn remap_knots(knots: &mut [f64], from: &Interval, to: &Interval) {
    for k in knots.iter_mut() {
        *k = from.map_to(*k, to);
    }
}

fn reverse_knots(knots: &mut [f64]) {
    knots.reverse();
    for k in knots.iter_mut() {
        *k = -*k;
    }
}

/// Clamped uniform knot vector for `num_cps` control points over `domain`.
pub fn clamped_uniform_knots(degree: usize, num_cps: usize, domain: Interval) -> Vec<f64> {
    let interior = num_cps.saturating_sub(degree + 1);
    let mut knots = Vec::with_capacity(num_cps + degree + 1);
    knots.extend(std::iter::repeat_n(domain.t0, degree + 1));
    for i in 1..=interior {
        knots.push(domain.param_at(i as f64 / (interior + 1) as f64));
    }
    knots.extend(std::iter::repeat_n(domain.t1, degree + 1));
    knots
}

/// A NURBS (Non-Uniform Rational B-Spline) curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NurbsCurve {
    pub degree: usize,
    pub control_points: Vec<Point3d>,
    /// Weights for rational curves. If empty, treated as all 1.0 (non-rational).
    pub weights: Vec<f64>,
    /// Knot vector (must have len = control_points.len() + degree + 1).
    pub knots: Vec<f64>,
}

impl NurbsCurve {
    /// Build a curve, rejecting inconsistent array lengths.
    pub fn new(degree: usize, control_points: Vec<Point3d>, weights: Vec<f64>, knots: Vec<f64>) -> Option<Self> {
        if control_points.len() <= degree
            || knots.len() != control_points.len() + degree + 1
            || !(weights.is_empty() || weights.len() == control_points.len())
            || knots.windows(2).any(|w| w[0] > w[1])
        {
            return None;
        }
        Some(Self {
            degree,
            control_points,
            weights,
            knots,
        })
    }

    /// Create a non-rational B-spline curve.
    pub fn bspline(degree: usize, control_points: Vec<Point3d>, knots: Vec<f64>) -> Option<Self> {
        Self::new(degree, control_points, vec![], knots)
    }

    /// Degree-1 curve through `points` with a clamped uniform parameterization.
    pub fn polyline(points: Vec<Point3d>, domain: Interval) -> Option<Self> {
        let knots = clamped_uniform_knots(1, points.len(), domain);
        Self::bspline(1, points, knots)
    }

    pub fn is_rational(&self) -> bool {
        !self.weights.is_empty()
    }

    pub fn weight(&self, i: usize) -> f64 {
        if self.is_rational() { self.weights[i] } else { 1.0 }
    }

    pub fn num_control_points(&self) -> usize {
        self.control_points.len()
    }

    pub fn domain(&self) -> Interval {
        Interval::new(self.knots[self.degree], self.knots[self.knots.len() - self.degree - 1])
    }

    fn homogeneous(&self) -> Vec<Hpt> {
        self.control_points
            .iter()
            .enumerate()
            .map(|(i, p)| to_h(p, self.weight(i)))
            .collect()
    }

    fn set_homogeneous(&mut self, cps: &[Hpt], rational: bool) {
        let (points, weights): (Vec<Point3d>, Vec<f64>) = cps.iter().map(from_h).unzip();
        self.control_points = points;
        self.weights = if rational { weights } else { vec![] };
    }

    /// Evaluate the curve at parameter t.
    pub fn evaluate(&self, t: f64) -> Point3d {
        self.evaluate_with_derivative(t).0
    }

    /// First derivative at parameter t.
    pub fn derivative(&self, t: f64) -> Vec3 {
        self.evaluate_with_derivative(t).1
    }

    /// Point and first derivative, using the quotient rule for rational curves.
    pub fn evaluate_with_derivative(&self, t: f64) -> (Point3d, Vec3) {
        let p = self.degree;
        let span = find_span(&self.knots, p, self.num_control_points(), t);
        let basis = basis_functions(&self.knots, span, t, p);
        let ders = basis_derivatives(&self.knots, span, t, p);

        let mut a = [0.0; 4];
        let mut da = [0.0; 4];
        for i in 0..=p {
            let idx = span - p + i;
            let h = to_h(&self.control_points[idx], self.weight(idx));
            for c in 0..4 {
                a[c] += basis[i] * h[c];
                da[c] += ders[i] * h[c];
            }
        }
        let w = if a[3] == 0.0 { 1.0 } else { a[3] };
        let point = Point3d::new(a[0] / w, a[1] / w, a[2] / w);
        let d = Vec3::new(
            (da[0] - da[3] * point.x) / w,
            (da[1] - da[3] * point.y) / w,
            (da[2] - da[3] * point.z) / w,
        );
        (point, d)
    }

    pub fn start_point(&self) -> Point3d {
        self.evaluate(self.domain().t0)
    }

    pub fn end_point(&self) -> Point3d {
        self.evaluate(self.domain().t1)
    }

    pub fn is_clamped_start(&self) -> bool {
        multiplicity(&self.knots[..=self.degree], self.knots[self.degree]) == self.degree + 1
    }

    pub fn is_clamped_end(&self) -> bool {
        let n = self.knots.len();
        multiplicity(&self.knots[n - self.degree - 1..], self.knots[n - self.degree - 1]) == self.degree + 1
    }

    /// Reparameterize so the domain becomes `domain`.
    pub fn set_domain(&mut self, domain: Interval) -> bool {
        if !domain.is_increasing() {
            return false;
        }
        let from = self.domain();
        remap_knots(&mut self.knots, &from, &domain);
        true
    }

    /// Reverse direction; the domain becomes `[-t1, -t0]`.
    pub fn reverse(&mut self) {
        self.control_points.reverse();
        self.weights.reverse();
        reverse_knots(&mut self.knots);
    }

    /// Restrict to a sub-interval of the current domain.
    pub fn trim(&mut self, interval: Interval) -> bool {
        let d = self.domain();
        if !interval.is_increasing() || !d.includes_interval(&interval, 0.0) {
            return false;
        }
        if interval == d && self.is_clamped_start() && self.is_clamped_end() {
            return true;
        }
        match extract(self.degree, &self.knots, &self.homogeneous(), interval.t0, interval.t1) {
            Some((knots, cps)) => {
                let rational = self.is_rational();
                self.knots = knots;
                self.set_homogeneous(&cps, rational);
                true
            }
            None => false,
        }
    }

    /// Apply the map in homogeneous coordinates; exact for any projective map.
    pub fn transform(&mut self, xform: &Transform) {
        let affine = xform.is_affine();
        let cps: Vec<Hpt> = self
            .homogeneous()
            .iter()
            .map(|h| {
                let (p, w) = xform.transform_homogeneous(&Point3d::new(h[0], h[1], h[2]), h[3]);
                [p.x, p.y, p.z, w]
            })
            .collect();
        let rational = self.is_rational() || !affine;
        self.set_homogeneous(&cps, rational);
    }

    /// Box of the control hull; contains the curve.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.control_points)
    }

    /// Move the first control point; requires a clamped start.
    pub fn set_start_point(&mut self, p: Point3d) -> bool {
        if !self.is_clamped_start() {
            return false;
        }
        match self.control_points.first_mut() {
            Some(cp) => {
                *cp = p;
                true
            }
            None => false,
        }
    }

    /// Move the last control point; requires a clamped end.
    pub fn set_end_point(&mut self, p: Point3d) -> bool {
        if !self.is_clamped_end() {
            return false;
        }
        match self.control_points.last_mut() {
            Some(cp) => {
                *cp = p;
                true
            }
            None => false,
        }
    }

    pub fn zero_z(&mut self) {
        for p in &mut self.control_points {
            p.z = 0.0;
        }
    }

    /// Compute an approximate arc length by sampling.
    pub fn approximate_length(&self, num_samples: usize) -> f64 {
        let d = self.domain();
        let mut length = 0.0;
        let mut prev = self.evaluate(d.t0);
        for i in 1..=num_samples {
            let curr = self.evaluate(d.param_at(i as f64 / num_samples as f64));
            length += prev.distance_to(&curr);
            prev = curr;
        }
        length
    }
}

/// A NURBS surface (tensor-product).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NurbsSurface {
    pub degree_u: usize,
    pub degree_v: usize,
    /// Control points grid: [u_index * num_v + v_index]
    pub control_points: Vec<Point3d>,
    pub weights: Vec<f64>,
    pub knots_u: Vec<f64>,
    pub knots_v: Vec<f64>,
    pub num_u: usize,
    pub num_v: usize,
}

impl NurbsSurface {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        degree_u: usize,
        degree_v: usize,
        control_points: Vec<Point3d>,
        weights: Vec<f64>,
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        num_u: usize,
        num_v: usize,
    ) -> Option<Self> {
        if control_points.len() != num_u * num_v
            || num_u <= degree_u
            || num_v <= degree_v
            || knots_u.len() != num_u + degree_u + 1
            || knots_v.len() != num_v + degree_v + 1
            || !(weights.is_empty() || weights.len() == control_points.len())
        {
            return None;
        }
        Some(Self {
            degree_u,
            degree_v,
            control_points,
            weights,
            knots_u,
            knots_v,
            num_u,
            num_v,
        })
    }

    pub fn is_rational(&self) -> bool {
        !self.weights.is_empty()
    }

    fn weight(&self, u_idx: usize, v_idx: usize) -> f64 {
        if self.is_rational() {
            self.weights[u_idx * self.num_v + v_idx]
        } else {
            1.0
        }
    }

    pub fn degree(&self, dir: usize) -> usize {
        if dir == 0 { self.degree_u } else { self.degree_v }
    }

    pub fn domain(&self, dir: usize) -> Interval {
        let (knots, p) = if dir == 0 {
            (&self.knots_u, self.degree_u)
        } else {
            (&self.knots_v, self.degree_v)
        };
        Interval::new(knots[p], knots[knots.len() - p - 1])
    }

    /// The homogeneous control polygon of one row (`dir == 0`: fixed v index,
    /// varying u) or column.
    fn strip(&self, dir: usize, fixed: usize) -> Vec<Hpt> {
        if dir == 0 {
            (0..self.num_u)
                .map(|i| to_h(&self.control_points[i * self.num_v + fixed], self.weight(i, fixed)))
                .collect()
        } else {
            (0..self.num_v)
                .map(|j| to_h(&self.control_points[fixed * self.num_v + j], self.weight(fixed, j)))
                .collect()
        }
    }

    /// Isoparametric curve. `dir == 0` gives the curve along u at `v == c`,
    /// `dir == 1` the curve along v at `u == c`.
    pub fn iso_curve(&self, dir: usize, c: f64) -> Option<NurbsCurve> {
        let (fixed_knots, fixed_deg, fixed_count, run_count) = if dir == 0 {
            (&self.knots_v, self.degree_v, self.num_v, self.num_u)
        } else {
            (&self.knots_u, self.degree_u, self.num_u, self.num_v)
        };
        let span = find_span(fixed_knots, fixed_deg, fixed_count, c);
        let basis = basis_functions(fixed_knots, span, c, fixed_deg);
        let mut cps = vec![[0.0; 4]; run_count];
        for (r, cp) in cps.iter_mut().enumerate() {
            for (k, b) in basis.iter().enumerate() {
                let f = span - fixed_deg + k;
                let (ui, vi) = if dir == 0 { (r, f) } else { (f, r) };
                let h = to_h(&self.control_points[ui * self.num_v + vi], self.weight(ui, vi));
                for a in 0..4 {
                    cp[a] += b * h[a];
                }
            }
        }
        let (points, weights): (Vec<Point3d>, Vec<f64>) = cps.iter().map(from_h).unzip();
        let (knots, degree) = if dir == 0 {
            (self.knots_u.clone(), self.degree_u)
        } else {
            (self.knots_v.clone(), self.degree_v)
        };
        let weights = if self.is_rational() { weights } else { vec![] };
        NurbsCurve::new(degree, points, weights, knots)
    }

    /// Evaluate the surface at (u, v).
    pub fn evaluate(&self, u: f64, v: f64) -> Point3d {
        let span_u = find_span(&self.knots_u, self.degree_u, self.num_u, u);
        let span_v = find_span(&self.knots_v, self.degree_v, self.num_v, v);
        let basis_u = basis_functions(&self.knots_u, span_u, u, self.degree_u);
        let basis_v = basis_functions(&self.knots_v, span_v, v, self.degree_v);

        let mut acc = [0.0; 4];
        for (i, bu) in basis_u.iter().enumerate() {
            let u_idx = span_u - self.degree_u + i;
            for (j, bv) in basis_v.iter().enumerate() {
                let v_idx = span_v - self.degree_v + j;
                let h = to_h(&self.control_points[u_idx * self.num_v + v_idx], self.weight(u_idx, v_idx));
                for c in 0..4 {
                    acc[c] += bu * bv * h[c];
                }
            }
        }
        from_h(&acc).0
    }

    /// Partial derivatives `(Su, Sv)` at (u, v).
    pub fn derivatives(&self, u: f64, v: f64) -> (Vec3, Vec3) {
        let su = self.iso_curve(0, v).map(|c| c.derivative(u)).unwrap_or(Vec3::ZERO);
        let sv = self.iso_curve(1, u).map(|c| c.derivative(v)).unwrap_or(Vec3::ZERO);
        (su, sv)
    }

    pub fn set_domain(&mut self, dir: usize, domain: Interval) -> bool {
        if !domain.is_increasing() {
            return false;
        }
        let from = self.domain(dir);
        let knots = if dir == 0 { &mut self.knots_u } else { &mut self.knots_v };
        remap_knots(knots, &from, &domain);
        true
    }

    /// Reverse one parameter direction; that domain becomes `[-t1, -t0]`.
    pub fn reverse(&mut self, dir: usize) {
        let (nu, nv) = (self.num_u, self.num_v);
        let flip = |i: usize, j: usize| if dir == 0 { (nu - 1 - i) * nv + j } else { i * nv + (nv - 1 - j) };
        let cps = self.control_points.clone();
        let ws = self.weights.clone();
        for i in 0..nu {
            for j in 0..nv {
                self.control_points[i * nv + j] = cps[flip(i, j)];
                if !ws.is_empty() {
                    self.weights[i * nv + j] = ws[flip(i, j)];
                }
            }
        }
        reverse_knots(if dir == 0 { &mut self.knots_u } else { &mut self.knots_v });
    }

    /// Swap the u and v directions.
    pub fn transpose(&mut self) {
        let (nu, nv) = (self.num_u, self.num_v);
        let mut cps = Vec::with_capacity(self.control_points.len());
        let mut ws = Vec::with_capacity(self.weights.len());
        for j in 0..nv {
            for i in 0..nu {
                cps.push(self.control_points[i * nv + j]);
                if self.is_rational() {
                    ws.push(self.weights[i * nv + j]);
                }
            }
        }
        self.control_points = cps;
        self.weights = ws;
        std::mem::swap(&mut self.num_u, &mut self.num_v);
        std::mem::swap(&mut self.degree_u, &mut self.degree_v);
        std::mem::swap(&mut self.knots_u, &mut self.knots_v);
    }

    /// Restrict one direction to a sub-interval of its domain.
    pub fn trim(&mut self, dir: usize, interval: Interval) -> bool {
        let d = self.domain(dir);
        if !interval.is_increasing() || !d.includes_interval(&interval, 0.0) {
            return false;
        }
        let (degree, knots, strips) = if dir == 0 {
            (self.degree_u, &self.knots_u, self.num_v)
        } else {
            (self.degree_v, &self.knots_v, self.num_u)
        };
        let mut new_knots = Vec::new();
        let mut rows = Vec::with_capacity(strips);
        for s in 0..strips {
            let Some((k, cps)) = extract(degree, knots, &self.strip(dir, s), interval.t0, interval.t1) else {
                return false;
            };
            new_knots = k;
            rows.push(cps);
        }
        let run = rows.first().map(|r| r.len()).unwrap_or(0);
        let (nu, nv) = if dir == 0 { (run, strips) } else { (strips, run) };
        let mut cps = vec![[0.0; 4]; nu * nv];
        for (s, row) in rows.iter().enumerate() {
            for (r, h) in row.iter().enumerate() {
                let (i, j) = if dir == 0 { (r, s) } else { (s, r) };
                cps[i * nv + j] = *h;
            }
        }
        let rational = self.is_rational();
        let (points, weights): (Vec<Point3d>, Vec<f64>) = cps.iter().map(from_h).unzip();
        self.control_points = points;
        self.weights = if rational { weights } else { vec![] };
        self.num_u = nu;
        self.num_v = nv;
        if dir == 0 {
            self.knots_u = new_knots;
        } else {
            self.knots_v = new_knots;
        }
        true
    }

    pub fn transform(&mut self, xform: &Transform) {
        let affine = xform.is_affine();
        let mut ws = Vec::with_capacity(self.control_points.len());
        for idx in 0..self.control_points.len() {
            let w = if self.is_rational() { self.weights[idx] } else { 1.0 };
            let h = to_h(&self.control_points[idx], w);
            let (p, nw) = xform.transform_homogeneous(&Point3d::new(h[0], h[1], h[2]), h[3]);
            let (point, weight) = from_h(&[p.x, p.y, p.z, nw]);
            self.control_points[idx] = point;
            ws.push(weight);
        }
        if self.is_rational() || !affine {
            self.weights = ws;
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.control_points)
    }

    pub fn complexity(&self) -> usize {
        self.control_points.len() * (1 + usize::from(self.is_rational()))
    }
}

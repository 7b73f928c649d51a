//! Exclusive geometry ownership.
//!
//! Edges and trims view their curves through a [`CurveProxy`] and faces may
//! share surfaces. Standardizing a record gives it a private copy of its
//! geometry whose domain is exactly the record's domain and whose direction
//! is the record's direction, so the geometry can be edited in place
//! without touching any sibling.

use tracing::{debug, instrument};

use super::proxy_piece;
use crate::error::{BrepError, Result};
use crate::geometry::Curve;
use crate::topology::brep::Brep;
use crate::topology::index::*;
use crate::topology::records::*;

/// The curve a proxy sees, reparameterized to the proxy's own domain.
fn exclusive_copy(curve: &Curve, proxy: &CurveProxy) -> Option<Curve> {
    let mut piece = proxy_piece(curve, proxy, false)?;
    if piece.domain() != proxy.domain && !piece.set_domain(proxy.domain) {
        return None;
    }
    Some(piece)
}

impl Brep {
    /// Make edge `e` the only user of an untrimmed, forward copy of its curve.
    #[instrument(skip(self))]
    pub fn standardize_edge_curve(&mut self, e: EdgeIndex) -> Result<()> {
        let edge = self.live_edge(e)?;
        let missing = BrepError::MissingGeometry { kind: EdgeIndex::KIND, index: e.0 };
        let c = edge.curve.ok_or(missing.clone())?;
        let curve = self.curve3(c).ok_or(missing)?;
        let shared = self.edge_curve_use_count(c) > 1;
        if !shared && edge.proxy.is_identity(&curve.domain()) {
            return Ok(());
        }
        let proxy = edge.proxy;
        let copy = exclusive_copy(curve, &proxy)
            .ok_or_else(|| BrepError::Geometry(format!("edge {e} curve could not be copied over its domain")))?;
        let target = if shared {
            self.add_curve3d(copy)
        } else {
            self.curves3[c.0] = Some(copy);
            c
        };
        let edge = &mut self.edges[e.0];
        edge.curve = Some(target);
        edge.proxy = CurveProxy::new(proxy.domain);
        debug!(edge = %e, shared, curve = %target, "edge curve standardized");
        Ok(())
    }

    /// Make trim `t` the only user of an untrimmed, forward copy of its curve.
    #[instrument(skip(self))]
    pub fn standardize_trim_curve(&mut self, t: TrimIndex) -> Result<()> {
        let trim = self.live_trim(t)?;
        // Point-on-surface trims have nothing to copy.
        let Some(c) = trim.curve else { return Ok(()) };
        let curve = self
            .curve2(c)
            .ok_or(BrepError::MissingGeometry { kind: TrimIndex::KIND, index: t.0 })?;
        let shared = self.trim_curve_use_count(c) > 1;
        if !shared && trim.proxy.is_identity(&curve.domain()) {
            return Ok(());
        }
        let proxy = trim.proxy;
        let copy = exclusive_copy(curve, &proxy)
            .ok_or_else(|| BrepError::Geometry(format!("trim {t} curve could not be copied over its domain")))?;
        let target = if shared {
            self.add_curve2d(copy)
        } else {
            self.curves2[c.0] = Some(copy);
            c
        };
        let trim = &mut self.trims[t.0];
        trim.curve = Some(target);
        trim.proxy = CurveProxy::new(proxy.domain);
        debug!(trim = %t, shared, curve = %target, "trim curve standardized");
        Ok(())
    }

    /// Give face `f` its own copy of a surface other faces also use.
    #[instrument(skip(self))]
    pub fn standardize_face_surface(&mut self, f: FaceIndex) -> Result<()> {
        let face = self.live_face(f)?;
        let missing = BrepError::MissingGeometry { kind: FaceIndex::KIND, index: f.0 };
        let s = face.surface.ok_or(missing.clone())?;
        let surface = self.surface(s).ok_or(missing)?;
        if self.surface_use_count(s) <= 1 {
            return Ok(());
        }
        let copy = surface.clone();
        let target = self.add_surface(copy);
        self.faces[f.0].surface = Some(target);
        debug!(face = %f, surface = %target, "face surface standardized");
        Ok(())
    }

    /// Standardize every live edge, trim and face.
    #[instrument(skip(self))]
    pub fn standardize(&mut self) -> Result<()> {
        for e in self.edge_indices().collect::<Vec<_>>() {
            self.standardize_edge_curve(e)?;
        }
        for t in self.trim_indices().collect::<Vec<_>>() {
            self.standardize_trim_curve(t)?;
        }
        for f in self.face_indices().collect::<Vec<_>>() {
            self.standardize_face_surface(f)?;
        }
        debug!(
            curves2 = self.curves2.len(),
            curves3 = self.curves3.len(),
            surfaces = self.surfaces.len(),
            "brep standardized"
        );
        Ok(())
    }
}

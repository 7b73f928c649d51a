//! Consistency-preserving edits on a [`Brep`](crate::Brep).
//!
//! Every operation here leaves the graph satisfying the same incidence
//! rules the validator checks. Operations returning `Err` on a failed
//! precondition have not touched the structure.

pub mod append;
pub mod combine;
pub mod compact;
pub mod contiguous;
pub mod delete;
pub mod standardize;
pub mod transform;

use crate::geometry::Curve;
use crate::topology::records::CurveProxy;

/// The part of `curve` a proxy covers, oriented the way the proxy runs
/// (flipped once more when `flip`).
pub(crate) fn proxy_piece(curve: &Curve, proxy: &CurveProxy, flip: bool) -> Option<Curve> {
    let mut piece = curve.clone();
    if proxy.curve_domain != curve.domain() && !piece.trim(proxy.curve_domain) {
        return None;
    }
    if proxy.reversed != flip && !piece.reverse() {
        return None;
    }
    Some(piece)
}

// SPDX-License-Identifier: LGPL-3.0-or-later

//! Mid/Side matrix encoding and decoding.
//!
//! - Mid  = (L + R) * 0.5
//! - Side = (L - R) * 0.5
//! - Left  = M + S
//! - Right = M - S

/// Convert a Left/Right pair to Mid/Side in place (`a` becomes mid,
/// `b` becomes side).
pub fn lr_to_ms_inplace(a: &mut [f32], b: &mut [f32]) {
    for (l, r) in a.iter_mut().zip(b.iter_mut()) {
        let (x, y) = (*l, *r);
        *l = (x + y) * 0.5;
        *r = (x - y) * 0.5;
    }
}

/// Extract Mid channel from Left/Right.
pub fn lr_to_mid(mid: &mut [f32], left: &[f32], right: &[f32]) {
    for ((m, l), r) in mid.iter_mut().zip(left.iter()).zip(right.iter()) {
        *m = (*l + *r) * 0.5;
    }
}

/// Extract Side channel from Left/Right.
pub fn lr_to_side(side: &mut [f32], left: &[f32], right: &[f32]) {
    for ((s, l), r) in side.iter_mut().zip(left.iter()).zip(right.iter()) {
        *s = (*l - *r) * 0.5;
    }
}

/// Convert a Mid/Side pair to Left/Right in place (`a` becomes left,
/// `b` becomes right).
pub fn ms_to_lr_inplace(a: &mut [f32], b: &mut [f32]) {
    for (m, s) in a.iter_mut().zip(b.iter_mut()) {
        let (x, y) = (*m, *s);
        *m = x + y;
        *s = x - y;
    }
}

/// Recover Left channel from Mid/Side.
pub fn ms_to_left(left: &mut [f32], mid: &[f32], side: &[f32]) {
    for ((l, m), s) in left.iter_mut().zip(mid.iter()).zip(side.iter()) {
        *l = *m + *s;
    }
}

/// Recover Right channel from Mid/Side.
pub fn ms_to_right(right: &mut [f32], mid: &[f32], side: &[f32]) {
    for ((r, m), s) in right.iter_mut().zip(mid.iter()).zip(side.iter()) {
        *r = *m - *s;
    }
}

//! 3D transforms
//!
//! [`Transform3D`] uses the row-vector convention: a point `p` maps to `p * M`, so the
//! translation lives in the bottom row. Interpolating two transforms decomposes both into
//! scale, skew, rotation, translation, and perspective, blends each component (rotation by
//! spherical interpolation), and recomposes the result.

use crate::value::AnimatableProperty;

// ─────────────────────────────────────────────────────────────────────────────
// Matrix
// ─────────────────────────────────────────────────────────────────────────────

/// A 4x4 homogeneous transform, stored row-major.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform3D {
    pub m: [[f64; 4]; 4],
}

impl Transform3D {
    pub const IDENTITY: Transform3D = Transform3D {
        m: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub fn translation(tx: f64, ty: f64, tz: f64) -> Self {
        let mut transform = Self::IDENTITY;
        transform.m[3][0] = tx;
        transform.m[3][1] = ty;
        transform.m[3][2] = tz;
        transform
    }

    pub fn scale(sx: f64, sy: f64, sz: f64) -> Self {
        let mut transform = Self::IDENTITY;
        transform.m[0][0] = sx;
        transform.m[1][1] = sy;
        transform.m[2][2] = sz;
        transform
    }

    /// Rotation by `angle` radians around the axis `(x, y, z)`.
    ///
    /// Returns the identity when the axis has zero length.
    pub fn rotation(angle: f64, x: f64, y: f64, z: f64) -> Self {
        let length = (x * x + y * y + z * z).sqrt();
        if length == 0.0 {
            return Self::IDENTITY;
        }
        let (x, y, z) = (x / length, y / length, z / length);
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;

        Self {
            m: [
                [c + t * x * x, t * x * y + s * z, t * x * z - s * y, 0.0],
                [t * x * y - s * z, c + t * y * y, t * y * z + s * x, 0.0],
                [t * x * z + s * y, t * y * z - s * x, c + t * z * z, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Perspective projection with the eye at `distance` along +z.
    pub fn perspective(distance: f64) -> Self {
        let mut transform = Self::IDENTITY;
        if distance != 0.0 {
            transform.m[2][3] = -1.0 / distance;
        }
        transform
    }

    /// `self` followed by `other`.
    pub fn concat(&self, other: &Transform3D) -> Self {
        let mut m = [[0.0; 4]; 4];
        for (row, out) in m.iter_mut().enumerate() {
            for (col, cell) in out.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.m[row][k] * other.m[k][col]).sum();
            }
        }
        Self { m }
    }

    pub fn transposed(&self) -> Self {
        let mut m = [[0.0; 4]; 4];
        for (row, out) in m.iter_mut().enumerate() {
            for (col, cell) in out.iter_mut().enumerate() {
                *cell = self.m[col][row];
            }
        }
        Self { m }
    }

    pub fn determinant(&self) -> f64 {
        let m = &self.m;
        (0..4)
            .map(|col| {
                let sign = if col % 2 == 0 { 1.0 } else { -1.0 };
                sign * m[0][col] * minor3(m, 0, col)
            })
            .sum()
    }

    /// Inverse via the adjugate, or `None` for a singular matrix.
    pub fn inverse(&self) -> Option<Self> {
        let determinant = self.determinant();
        if determinant == 0.0 {
            return None;
        }
        let mut m = [[0.0; 4]; 4];
        for (row, out) in m.iter_mut().enumerate() {
            for (col, cell) in out.iter_mut().enumerate() {
                let sign = if (row + col) % 2 == 0 { 1.0 } else { -1.0 };
                // Adjugate is the transposed cofactor matrix.
                *cell = sign * minor3(&self.m, col, row) / determinant;
            }
        }
        Some(Self { m })
    }

    pub fn approx_eq(&self, other: &Transform3D, tolerance: f64) -> bool {
        self.m
            .iter()
            .flatten()
            .zip(other.m.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }

    /// Split into interpolatable components.
    ///
    /// Returns `None` when `m44` is zero or the matrix without its perspective column is
    /// singular, which includes every transform with a zero scale on some axis.
    pub fn decompose(&self) -> Option<DecomposedTransform> {
        let m44 = self.m[3][3];
        if m44 == 0.0 {
            return None;
        }

        let mut matrix = *self;
        for cell in matrix.m.iter_mut().flatten() {
            *cell /= m44;
        }

        let mut perspective_matrix = matrix;
        perspective_matrix.m[0][3] = 0.0;
        perspective_matrix.m[1][3] = 0.0;
        perspective_matrix.m[2][3] = 0.0;
        perspective_matrix.m[3][3] = 1.0;

        if perspective_matrix.determinant() == 0.0 {
            return None;
        }

        let mut decomposed = DecomposedTransform::default();

        if matrix.m[0][3] != 0.0 || matrix.m[1][3] != 0.0 || matrix.m[2][3] != 0.0 {
            let rhs = [matrix.m[0][3], matrix.m[1][3], matrix.m[2][3], matrix.m[3][3]];
            let inverse = perspective_matrix.inverse()?;
            let solve = |row: usize| (0..4).map(|k| inverse.m[row][k] * rhs[k]).sum::<f64>();
            decomposed.perspective = [solve(0), solve(1), solve(2), solve(3)];
            matrix = perspective_matrix;
        }

        decomposed.translate = [matrix.m[3][0], matrix.m[3][1], matrix.m[3][2]];

        let mut row1 = Vec3::from_row(&matrix.m[0]);
        let mut row2 = Vec3::from_row(&matrix.m[1]);
        let mut row3 = Vec3::from_row(&matrix.m[2]);

        // Gram-Schmidt the rows into scale, the XY/XZ/YZ shears, and an orthonormal basis.
        let mut scale = [0.0; 3];
        scale[0] = row1.length();
        row1 = row1.scaled(1.0 / scale[0]);

        let mut skew_xy = row1.dot(&row2);
        row2 = row2.sub(&row1.scaled(skew_xy));
        scale[1] = row2.length();
        row2 = row2.scaled(1.0 / scale[1]);
        skew_xy /= scale[1];

        let mut skew_xz = row1.dot(&row3);
        row3 = row3.sub(&row1.scaled(skew_xz));
        let mut skew_yz = row2.dot(&row3);
        row3 = row3.sub(&row2.scaled(skew_yz));
        scale[2] = row3.length();
        row3 = row3.scaled(1.0 / scale[2]);
        skew_xz /= scale[2];
        skew_yz /= scale[2];

        if row1.dot(&row2.cross(&row3)) < 0.0 {
            for s in scale.iter_mut() {
                *s = -*s;
            }
            row1 = row1.scaled(-1.0);
            row2 = row2.scaled(-1.0);
            row3 = row3.scaled(-1.0);
        }

        decomposed.scale = scale;
        decomposed.skew = [skew_xy, skew_xz, skew_yz];
        decomposed.rotation = Quaternion::from_basis(&row1, &row2, &row3);
        Some(decomposed)
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Determinant of the 3x3 matrix left after removing `skip_row` and `skip_col`.
fn minor3(m: &[[f64; 4]; 4], skip_row: usize, skip_col: usize) -> f64 {
    let mut sub = [[0.0; 3]; 3];
    let rows = (0..4).filter(|&r| r != skip_row);
    for (i, r) in rows.enumerate() {
        let cols = (0..4).filter(|&c| c != skip_col);
        for (j, c) in cols.enumerate() {
            sub[i][j] = m[r][c];
        }
    }
    sub[0][0] * (sub[1][1] * sub[2][2] - sub[1][2] * sub[2][1])
        - sub[0][1] * (sub[1][0] * sub[2][2] - sub[1][2] * sub[2][0])
        + sub[0][2] * (sub[1][0] * sub[2][1] - sub[1][1] * sub[2][0])
}

#[derive(Clone, Copy, Debug)]
struct Vec3 {
    x: f64,
    y: f64,
    z: f64,
}

impl Vec3 {
    fn from_row(row: &[f64; 4]) -> Self {
        Self {
            x: row[0],
            y: row[1],
            z: row[2],
        }
    }

    fn dot(&self, other: &Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    fn cross(&self, other: &Vec3) -> Vec3 {
        Vec3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    fn scaled(&self, factor: f64) -> Vec3 {
        Vec3 {
            x: self.x * factor,
            y: self.y * factor,
            z: self.z * factor,
        }
    }

    fn sub(&self, other: &Vec3) -> Vec3 {
        Vec3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rotation
// ─────────────────────────────────────────────────────────────────────────────

/// Unit quaternion `x·i + y·j + z·k + w`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub fn dot(&self, other: &Quaternion) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    pub fn normalized(&self) -> Quaternion {
        let length = self.dot(self).sqrt();
        if length == 0.0 {
            return Quaternion::IDENTITY;
        }
        Quaternion {
            x: self.x / length,
            y: self.y / length,
            z: self.z / length,
            w: self.w / length,
        }
    }

    /// Spherical interpolation along the shortest arc.
    pub fn slerp(&self, other: &Quaternion, progress: f64) -> Quaternion {
        let mut end = *other;
        let mut cos_theta = self.dot(other);
        if cos_theta < 0.0 {
            end = Quaternion {
                x: -end.x,
                y: -end.y,
                z: -end.z,
                w: -end.w,
            };
            cos_theta = -cos_theta;
        }

        let (from_weight, to_weight) = if cos_theta > 0.9995 {
            // Nearly parallel; fall back to a normalized lerp.
            (1.0 - progress, progress)
        } else {
            let theta = cos_theta.acos();
            let sin_theta = theta.sin();
            (
                ((1.0 - progress) * theta).sin() / sin_theta,
                (progress * theta).sin() / sin_theta,
            )
        };

        Quaternion {
            x: self.x * from_weight + end.x * to_weight,
            y: self.y * from_weight + end.y * to_weight,
            z: self.z * from_weight + end.z * to_weight,
            w: self.w * from_weight + end.w * to_weight,
        }
        .normalized()
    }

    /// Extract the quaternion from an orthonormal, right-handed basis.
    fn from_basis(row1: &Vec3, row2: &Vec3, row3: &Vec3) -> Quaternion {
        let trace = row1.x + row2.y + row3.z + 1.0;
        if trace > 1e-4 {
            let s = 0.5 / trace.sqrt();
            Quaternion {
                x: (row3.y - row2.z) * s,
                y: (row1.z - row3.x) * s,
                z: (row2.x - row1.y) * s,
                w: 0.25 / s,
            }
        } else if row1.x > row2.y && row1.x > row3.z {
            let s = (1.0 + row1.x - row2.y - row3.z).sqrt() * 2.0;
            Quaternion {
                x: 0.25 * s,
                y: (row1.y + row2.x) / s,
                z: (row1.z + row3.x) / s,
                w: (row3.y - row2.z) / s,
            }
        } else if row2.y > row3.z {
            let s = (1.0 + row2.y - row1.x - row3.z).sqrt() * 2.0;
            Quaternion {
                x: (row1.y + row2.x) / s,
                y: 0.25 * s,
                z: (row2.z + row3.y) / s,
                w: (row1.z - row3.x) / s,
            }
        } else {
            let s = (1.0 + row3.z - row1.x - row2.y).sqrt() * 2.0;
            Quaternion {
                x: (row1.z + row3.x) / s,
                y: (row2.z + row3.y) / s,
                z: 0.25 * s,
                w: (row2.x - row1.y) / s,
            }
        }
    }

    /// The rotation block whose rows form the basis this quaternion was extracted from.
    fn to_matrix(self) -> Transform3D {
        let Quaternion { x, y, z, w } = self;
        Transform3D {
            m: [
                [
                    1.0 - 2.0 * (y * y + z * z),
                    2.0 * (x * y - z * w),
                    2.0 * (x * z + y * w),
                    0.0,
                ],
                [
                    2.0 * (x * y + z * w),
                    1.0 - 2.0 * (x * x + z * z),
                    2.0 * (y * z - x * w),
                    0.0,
                ],
                [
                    2.0 * (x * z - y * w),
                    2.0 * (y * z + x * w),
                    1.0 - 2.0 * (x * x + y * y),
                    0.0,
                ],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decomposition
// ─────────────────────────────────────────────────────────────────────────────

/// Interpolatable components of a [`Transform3D`].
///
/// Recomposition multiplies, in order: scale, skew, rotation, translation, perspective.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecomposedTransform {
    /// x, y, z
    pub scale: [f64; 3],
    /// xy, xz, yz
    pub skew: [f64; 3],
    pub rotation: Quaternion,
    /// x, y, z
    pub translate: [f64; 3],
    /// x, y, z, w
    pub perspective: [f64; 4],
}

impl Default for DecomposedTransform {
    fn default() -> Self {
        Self {
            scale: [1.0; 3],
            skew: [0.0; 3],
            rotation: Quaternion::IDENTITY,
            translate: [0.0; 3],
            perspective: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl DecomposedTransform {
    pub fn recompose(&self) -> Transform3D {
        let scale = Transform3D::scale(self.scale[0], self.scale[1], self.scale[2]);

        let mut skew = Transform3D::IDENTITY;
        skew.m[1][0] = self.skew[0];
        skew.m[2][0] = self.skew[1];
        skew.m[2][1] = self.skew[2];

        let translate =
            Transform3D::translation(self.translate[0], self.translate[1], self.translate[2]);

        let mut perspective = Transform3D::IDENTITY;
        perspective.m[0][3] = self.perspective[0];
        perspective.m[1][3] = self.perspective[1];
        perspective.m[2][3] = self.perspective[2];
        perspective.m[3][3] = self.perspective[3];

        scale
            .concat(&skew)
            .concat(&self.rotation.to_matrix())
            .concat(&translate)
            .concat(&perspective)
    }

    /// Component-wise blend; rotation is slerped.
    pub fn interpolate(&self, other: &DecomposedTransform, progress: f64) -> DecomposedTransform {
        fn lerp_all<const N: usize>(a: &[f64; N], b: &[f64; N], t: f64) -> [f64; N] {
            let mut out = *a;
            for (value, target) in out.iter_mut().zip(b) {
                *value = f64::interpolate(value, target, t);
            }
            out
        }

        DecomposedTransform {
            scale: lerp_all(&self.scale, &other.scale, progress),
            skew: lerp_all(&self.skew, &other.skew, progress),
            rotation: self.rotation.slerp(&other.rotation, progress),
            translate: lerp_all(&self.translate, &other.translate, progress),
            perspective: lerp_all(&self.perspective, &other.perspective, progress),
        }
    }

    fn collapsed(mut self) -> Self {
        self.scale = [0.0; 3];
        self
    }
}

impl AnimatableProperty for Transform3D {
    fn interpolate(from: &Self, to: &Self, progress: f64) -> Self {
        match (from.decompose(), to.decompose()) {
            (Some(start), Some(end)) => start.interpolate(&end, progress).recompose(),
            // A failed decomposition means some axis has zero scale. Which one is unknown,
            // so collapse all three and borrow the remaining fields from the other end.
            (Some(start), None) => start.interpolate(&start.collapsed(), progress).recompose(),
            (None, Some(end)) => end.collapsed().interpolate(&end, progress).recompose(),
            (None, None) => {
                if progress > 0.5 {
                    *to
                } else {
                    *from
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn test_rotation_matches_row_vector_convention() {
        let rotation = Transform3D::rotation(FRAC_PI_2, 0.0, 0.0, 1.0);
        assert!((rotation.m[0][1] - 1.0).abs() < TOLERANCE);
        assert!((rotation.m[1][0] + 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_inverse_round_trip() {
        let transform = Transform3D::scale(2.0, 4.0, 1.0)
            .concat(&Transform3D::rotation(0.3, 1.0, 1.0, 0.0))
            .concat(&Transform3D::translation(5.0, -3.0, 2.0));
        let inverse = transform.inverse().unwrap();
        assert!(transform
            .concat(&inverse)
            .approx_eq(&Transform3D::IDENTITY, TOLERANCE));
    }

    #[test]
    fn test_decompose_simple_components() {
        let transform =
            Transform3D::scale(2.0, 3.0, 1.0).concat(&Transform3D::translation(10.0, 20.0, 0.0));
        let decomposed = transform.decompose().unwrap();
        assert!((decomposed.scale[0] - 2.0).abs() < TOLERANCE);
        assert!((decomposed.scale[1] - 3.0).abs() < TOLERANCE);
        assert_eq!(decomposed.translate, [10.0, 20.0, 0.0]);
        assert_eq!(decomposed.rotation, Quaternion::IDENTITY);
    }

    #[test]
    fn test_decompose_recompose_round_trip() {
        let transforms = [
            Transform3D::IDENTITY,
            Transform3D::scale(2.0, 3.0, 0.5)
                .concat(&Transform3D::rotation(0.7, 0.0, 0.0, 1.0))
                .concat(&Transform3D::translation(10.0, 20.0, 30.0)),
            Transform3D::rotation(2.5, 1.0, 2.0, 3.0).concat(&Transform3D::scale(1.5, 0.25, 2.0)),
            Transform3D::scale(-1.0, 1.0, 1.0)
                .concat(&Transform3D::rotation(FRAC_PI_2, 0.0, 1.0, 0.0)),
            Transform3D::rotation(0.4, 1.0, 0.0, 0.0).concat(&Transform3D::perspective(500.0)),
        ];
        for transform in transforms {
            let recomposed = transform.decompose().unwrap().recompose();
            assert!(
                recomposed.approx_eq(&transform, 1e-6),
                "{transform:?} recomposed as {recomposed:?}"
            );
        }
    }

    #[test]
    fn test_decompose_rejects_degenerate_matrices() {
        assert!(Transform3D::scale(0.0, 1.0, 1.0).decompose().is_none());
        let mut projective = Transform3D::IDENTITY;
        projective.m[3][3] = 0.0;
        assert!(projective.decompose().is_none());
    }

    #[test]
    fn test_interpolation_slerps_rotation() {
        let from = Transform3D::IDENTITY;
        let to = Transform3D::rotation(FRAC_PI_2, 0.0, 0.0, 1.0);
        let mid = Transform3D::interpolate(&from, &to, 0.5);
        assert!(mid.approx_eq(&Transform3D::rotation(FRAC_PI_4, 0.0, 0.0, 1.0), 1e-6));
        assert!(Transform3D::interpolate(&from, &to, 1.0).approx_eq(&to, 1e-6));
    }

    #[test]
    fn test_interpolation_towards_zero_scale() {
        let from = Transform3D::translation(10.0, 0.0, 0.0);
        let to = Transform3D::scale(0.0, 0.0, 0.0);
        let mid = Transform3D::interpolate(&from, &to, 0.5);
        let expected =
            Transform3D::scale(0.5, 0.5, 0.5).concat(&Transform3D::translation(10.0, 0.0, 0.0));
        assert!(mid.approx_eq(&expected, 1e-9));

        let reversed = Transform3D::interpolate(&to, &from, 0.5);
        assert!(reversed.approx_eq(&expected, 1e-9));
    }

    #[test]
    fn test_interpolation_hard_cut_when_both_degenerate() {
        let from = Transform3D::scale(0.0, 1.0, 1.0);
        let to = Transform3D::scale(1.0, 0.0, 1.0);
        assert_eq!(Transform3D::interpolate(&from, &to, 0.5), from);
        assert_eq!(Transform3D::interpolate(&from, &to, 0.6), to);
    }
}

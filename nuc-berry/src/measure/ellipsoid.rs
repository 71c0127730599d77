use crate::object::Nucleus3d;
use crate::Calibration;
use std::f64::consts::PI;

/// 3x3 实对称矩阵.
pub(crate) type Sym3 = [[f64; 3]; 3];

/// 体素物理坐标 `(x, y, z)` 的协方差矩阵 (除以体素个数).
pub(crate) fn covariance(nucleus: &Nucleus3d, cal: &Calibration) -> Sym3 {
    let (pw, pd) = (cal.pixel_width(), cal.pixel_depth());
    let n = nucleus.voxel_count() as f64;
    let phys = |(z, h, w): (usize, usize, usize)| [w as f64 * pw, h as f64 * pw, z as f64 * pd];

    let mut mean = [0.0f64; 3];
    for p in nucleus.voxels().map(phys) {
        for i in 0..3 {
            mean[i] += p[i];
        }
    }
    mean.iter_mut().for_each(|m| *m /= n);

    let mut cov = [[0.0f64; 3]; 3];
    for p in nucleus.voxels().map(phys) {
        let d = [p[0] - mean[0], p[1] - mean[1], p[2] - mean[2]];
        for i in 0..3 {
            for j in i..3 {
                cov[i][j] += d[i] * d[j];
            }
        }
    }
    for i in 0..3 {
        for j in i..3 {
            cov[i][j] /= n;
            cov[j][i] = cov[i][j];
        }
    }
    cov
}

/// 实对称矩阵的三个特征值, 降序排列.
///
/// 使用三角函数形式的解析解 (O. K. Smith, 1961), 不依赖线性代数后端.
pub(crate) fn sym_eigenvalues(a: &Sym3) -> [f64; 3] {
    let p1 = a[0][1].powi(2) + a[0][2].powi(2) + a[1][2].powi(2);
    let mut eig = if p1 == 0.0 {
        [a[0][0], a[1][1], a[2][2]]
    } else {
        let q = (a[0][0] + a[1][1] + a[2][2]) / 3.0;
        let p2 = (a[0][0] - q).powi(2) + (a[1][1] - q).powi(2) + (a[2][2] - q).powi(2) + 2.0 * p1;
        let p = (p2 / 6.0).sqrt();
        let mut b = *a;
        for (i, row) in b.iter_mut().enumerate() {
            row[i] -= q;
            row.iter_mut().for_each(|v| *v /= p);
        }
        let det = b[0][0] * (b[1][1] * b[2][2] - b[1][2] * b[2][1])
            - b[0][1] * (b[1][0] * b[2][2] - b[1][2] * b[2][0])
            + b[0][2] * (b[1][0] * b[2][1] - b[1][1] * b[2][0]);
        let phi = (det / 2.0).clamp(-1.0, 1.0).acos() / 3.0;
        let e1 = q + 2.0 * p * phi.cos();
        let e3 = q + 2.0 * p * (phi + 2.0 * PI / 3.0).cos();
        [e1, 3.0 * q - e1 - e3, e3]
    };
    eig.sort_by(|x, y| y.total_cmp(x));
    eig
}

/// 与细胞核具有相同二阶矩的椭球半轴长, 降序排列.
///
/// 均匀实心椭球沿半轴 `r` 方向的方差为 `r² / 5`.
pub(crate) fn ellipsoid_radii(nucleus: &Nucleus3d, cal: &Calibration) -> [f64; 3] {
    sym_eigenvalues(&covariance(nucleus, cal)).map(|l| (5.0 * l.max(0.0)).sqrt())
}

/// `a / b`. 分母为 0 时返回 `NaN`.
#[inline]
pub(crate) fn ratio(a: f64, b: f64) -> f64 {
    if b > 0.0 {
        a / b
    } else {
        f64::NAN
    }
}

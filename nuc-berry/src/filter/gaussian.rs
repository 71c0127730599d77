use super::GaussianFilter;
use ndarray::{Array3, ArrayView3, ArrayViewMut1, ArrayViewMut2, Axis};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
    }
}

/// CPU 上的可分离三维高斯模糊. 边界按最近边缘像素延拓.
///
/// 核半径为 `ceil(3 * sigma)`. `sigma <= 0` 的方向不做模糊.
#[derive(Copy, Clone, Debug, Default)]
pub struct CpuGaussian;

impl GaussianFilter for CpuGaussian {
    fn blur(&self, volume: ArrayView3<f32>, sigma_xy: f64, sigma_z: f64) -> Array3<f32> {
        let mut out = volume.to_owned();
        let k_xy = kernel(sigma_xy);
        let k_z = kernel(sigma_z);
        blur_axis(&mut out, 2, &k_xy);
        blur_axis(&mut out, 1, &k_xy);
        blur_axis(&mut out, 0, &k_z);
        out
    }
}

/// 归一化的一维高斯核.
fn kernel(sigma: f64) -> Vec<f32> {
    if !(sigma > 0.0 && sigma.is_finite()) {
        return vec![1.0];
    }
    let radius = (3.0 * sigma).ceil() as isize;
    let two_s2 = 2.0 * sigma * sigma;
    let raw: Vec<f64> = (-radius..=radius)
        .map(|d| (-((d * d) as f64) / two_s2).exp())
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|v| (v / sum) as f32).collect()
}

/// 对 `src` 做一维卷积, 结果写入 `dst`. 越界位置取最近边缘值.
fn convolve_lane(src: &[f32], mut dst: ArrayViewMut1<f32>, kernel: &[f32]) {
    let r = (kernel.len() / 2) as isize;
    let last = src.len() as isize - 1;
    for (i, out) in dst.iter_mut().enumerate() {
        let mut acc = 0.0f32;
        for (k, &wt) in kernel.iter().enumerate() {
            let j = (i as isize + k as isize - r).clamp(0, last) as usize;
            acc += wt * src[j];
        }
        *out = acc;
    }
}

/// 沿 `axis` 方向就地卷积.
///
/// 外层按另一条轴切分成二维子视图, 打开 `rayon` feature 时并行处理各子视图.
fn blur_axis(data: &mut Array3<f32>, axis: usize, kernel: &[f32]) {
    if kernel.len() <= 1 || data.len_of(Axis(axis)) <= 1 {
        return;
    }
    let outer = if axis == 0 { 1 } else { 0 };
    // 去掉外层轴之后, 目标轴在子视图中的位置.
    let inner = if axis > outer { axis - 1 } else { axis };

    let op = |mut sub: ArrayViewMut2<f32>| {
        let mut buf = Vec::with_capacity(sub.len_of(Axis(inner)));
        for lane in sub.lanes_mut(Axis(inner)) {
            buf.clear();
            buf.extend(lane.iter().copied());
            convolve_lane(&buf, lane, kernel);
        }
    };

    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            data.axis_iter_mut(Axis(outer)).into_par_iter().for_each(op);
        } else {
            data.axis_iter_mut(Axis(outer)).for_each(op);
        }
    }
}

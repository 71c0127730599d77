use crate::object::Nucleus3d;
use crate::Calibration;
use ndarray::Array3;

/// 随机取向曲面在三条坐标轴方向上的平均投影系数.
///
/// 体素面计数得到的面积约为真实曲面面积的 1.5 倍.
const FACE_COUNT_BIAS: f64 = 1.5;

/// 暴露的体素面计数: `(垂直于 Z 的面数, 垂直于 X 或 Y 的面数)`.
///
/// 一个体素面暴露, 当且仅当其另一侧的体素不属于该细胞核.
pub(crate) fn exposed_faces(nucleus: &Nucleus3d) -> (usize, usize) {
    let b = nucleus.bbox();
    // 四周各留一圈背景, 邻居索引因此不会越界.
    let mut grid = Array3::from_elem(
        (b.zmax - b.zmin + 3, b.hmax - b.hmin + 3, b.wmax - b.wmin + 3),
        false,
    );
    for (z, h, w) in nucleus.voxels() {
        grid[(z - b.zmin + 1, h - b.hmin + 1, w - b.wmin + 1)] = true;
    }

    let (mut z_faces, mut side_faces) = (0usize, 0usize);
    for (z, h, w) in nucleus.voxels() {
        let (z, h, w) = (z - b.zmin + 1, h - b.hmin + 1, w - b.wmin + 1);
        z_faces += usize::from(!grid[(z - 1, h, w)]) + usize::from(!grid[(z + 1, h, w)]);
        side_faces += usize::from(!grid[(z, h - 1, w)])
            + usize::from(!grid[(z, h + 1, w)])
            + usize::from(!grid[(z, h, w - 1)])
            + usize::from(!grid[(z, h, w + 1)]);
    }
    (z_faces, side_faces)
}

/// 校正后的物理表面积.
pub(crate) fn surface_area(nucleus: &Nucleus3d, cal: &Calibration) -> f64 {
    let (z_faces, side_faces) = exposed_faces(nucleus);
    let raw = z_faces as f64 * cal.pixel_area() + side_faces as f64 * cal.side_face_area();
    raw / FACE_COUNT_BIAS
}

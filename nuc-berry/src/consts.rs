//! 通用常量.

/// 单通道颜色.
pub mod gray {
    /// 二值掩膜中, 背景的像素值.
    pub const MASK_BACKGROUND: u8 = 0;

    /// 二值掩膜中, 前景的像素值.
    pub const MASK_FOREGROUND: u8 = 255;

    /// 单通道黑色.
    pub const BLACK: u8 = 0b_0000_0000;

    /// 单通道白色.
    pub const WHITE: u8 = 0b_1111_1111;

    /// 像素是否是前景?
    #[inline]
    pub const fn is_foreground(p: u8) -> bool {
        p != MASK_BACKGROUND
    }

    /// 像素是否是背景?
    #[inline]
    pub const fn is_background(p: u8) -> bool {
        matches!(p, MASK_BACKGROUND)
    }
}

/// 标签体中代表背景的标签值.
pub const LABEL_BACKGROUND: u32 = 0;

/// 细胞核最小体积缺省值, 单位为立方微米.
pub const DEFAULT_MIN_NUCLEUS_VOLUME: f64 = 1000.0;

/// 细胞核最大体积缺省值, 单位为立方微米.
pub const DEFAULT_MAX_NUCLEUS_VOLUME: f64 = 15000.0;

/// 分割模型标识缺省值.
pub const DEFAULT_SEGMENT_MODEL: &str = "cyto2";

/// 分割服务的细胞直径提示缺省值, 单位为像素.
pub const DEFAULT_SEGMENT_DIAMETER: u32 = 100;

/// 相邻切片二维检测结果合并为三维物体时的最小重叠比例.
pub const DEFAULT_STITCH_THRESHOLD: f64 = 0.5;

/// 分割前 XY 方向的缩放倍率.
pub const DEFAULT_RESIZE_FACTOR: f64 = 0.5;

/// 细胞质提取时高斯模糊的 XY 方向 sigma, 单位为像素.
pub const DEFAULT_GAUSSIAN_SIGMA_XY: f64 = 4.0;

/// 细胞质提取时高斯模糊的 Z 方向 sigma, 单位为切片.
pub const DEFAULT_GAUSSIAN_SIGMA_Z: f64 = 4.0;

/// 细胞质二值掩膜中值滤波的 XY 半径, 单位为像素.
pub const DEFAULT_MEDIAN_RADIUS: f64 = 8.0;

/// 标定信息缺失 Z 方向分辨率时采用的缺省值, 单位为微米.
pub const DEFAULT_PIXEL_DEPTH: f64 = 1.0;

/// 物理长度单位.
pub const UNIT_MICRONS: &str = "microns";

/// 通道选择中代表 "不使用该通道" 的名字.
pub const CHANNEL_NONE: &str = "None";

/// 自动阈值直方图的分箱数.
pub const HISTOGRAM_BINS: usize = 256;

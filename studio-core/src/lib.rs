pub mod geometry {
    use glam::DVec3;
    use serde::{Deserialize, Serialize};

    /// 三维点，内部以 `glam::DVec3` 表示。世界坐标统一使用该类型。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point3(pub DVec3);

    impl Point3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn origin() -> Self {
            Self(DVec3::ZERO)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn translate(self, offset: Vector3) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn vector_to(self, other: Point3) -> Vector3 {
            Vector3(other.0 - self.0)
        }

        #[inline]
        pub fn distance(self, other: Point3) -> f64 {
            self.0.distance(other.0)
        }

        /// 线性插值，`t` 不做裁剪。
        #[inline]
        pub fn lerp(self, other: Point3, t: f64) -> Self {
            Self(self.0.lerp(other.0, t))
        }

        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }
    }

    impl From<DVec3> for Point3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    /// 三维向量。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector3(pub DVec3);

    impl Vector3 {
        pub const UP: Vector3 = Vector3(DVec3::Y);

        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn normalize(self) -> Option<Self> {
            let len = self.0.length();
            if len <= f64::EPSILON || !len.is_finite() {
                None
            } else {
                Some(Self(self.0 / len))
            }
        }

        #[inline]
        pub fn scale(self, factor: f64) -> Self {
            Self(self.0 * factor)
        }

        #[inline]
        pub fn dot(self, other: Vector3) -> f64 {
            self.0.dot(other.0)
        }

        #[inline]
        pub fn cross(self, other: Vector3) -> Vector3 {
            Self(self.0.cross(other.0))
        }
    }

    impl From<DVec3> for Vector3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    /// 射线：起点 + 单位方向。由相机指针投射得到。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Ray3 {
        origin: Point3,
        direction: Vector3,
    }

    impl Ray3 {
        /// 方向向量退化（零长度或非有限）时返回 `None`。
        pub fn new(origin: Point3, direction: Vector3) -> Option<Self> {
            let direction = direction.normalize()?;
            origin.is_finite().then_some(Self { origin, direction })
        }

        /// 构造一条从 `origin` 指向 `target` 的射线。
        pub fn through(origin: Point3, target: Point3) -> Option<Self> {
            Self::new(origin, origin.vector_to(target))
        }

        #[inline]
        pub fn origin(&self) -> Point3 {
            self.origin
        }

        #[inline]
        pub fn direction(&self) -> Vector3 {
            self.direction
        }

        #[inline]
        pub fn at(&self, t: f64) -> Point3 {
            self.origin.translate(self.direction.scale(t))
        }
    }
}

pub mod coords {
    use serde::{Deserialize, Serialize};

    /// 世界坐标（引擎单位）。与归一化坐标之间只能经由映射函数换算。
    pub type WorldCoord = crate::geometry::Point3;

    /// 墙面归一化坐标：以墙中心为原点，`x`/`y` 为墙宽/墙高的比例，合法范围 `[-0.5, 0.5]`。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct NormalizedCoord {
        pub x: f64,
        pub y: f64,
    }

    impl NormalizedCoord {
        pub const HALF: f64 = 0.5;

        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self { x, y }
        }

        #[inline]
        pub fn center() -> Self {
            Self { x: 0.0, y: 0.0 }
        }

        /// 两个分量各自裁剪到 `[-0.5, 0.5]`，允许贴边摆放。
        #[inline]
        pub fn clamped(self) -> Self {
            Self {
                x: self.x.clamp(-Self::HALF, Self::HALF),
                y: self.y.clamp(-Self::HALF, Self::HALF),
            }
        }

        #[inline]
        pub fn is_within_wall(self) -> bool {
            self.x.abs() <= Self::HALF && self.y.abs() <= Self::HALF
        }

        #[inline]
        pub fn is_finite(self) -> bool {
            self.x.is_finite() && self.y.is_finite()
        }
    }

    /// 以墙宽/墙高为基准的尺寸比例，取值 `(0, 1]`。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct FractionSize {
        pub width: f64,
        pub height: f64,
    }

    impl FractionSize {
        #[inline]
        pub fn new(width: f64, height: f64) -> Self {
            Self { width, height }
        }

        /// 解释已保存的尺寸。旧数据以 0–100 的百分比存储，按数值大于 1 识别并换算。
        /// 任一分量非正或非有限时返回 `None`。
        pub fn from_stored(width: f64, height: f64) -> Option<Self> {
            let width = Self::normalize_stored(width)?;
            let height = Self::normalize_stored(height)?;
            Some(Self { width, height })
        }

        fn normalize_stored(value: f64) -> Option<f64> {
            if !value.is_finite() || value <= 0.0 {
                return None;
            }
            let fraction = if value > 1.0 { value / 100.0 } else { value };
            Some(fraction.min(1.0))
        }

        /// 上限裁剪到墙面尺寸。
        #[inline]
        pub fn capped(self) -> Self {
            Self {
                width: self.width.min(1.0),
                height: self.height.min(1.0),
            }
        }
    }
}

pub mod room {
    use std::f64::consts::PI;

    use glam::DVec3;
    use serde::{Deserialize, Serialize};

    use crate::geometry::{Point3, Vector3};

    /// 英尺到引擎单位（米）的换算系数。
    pub const SCALE: f64 = 0.3048;
    pub const INCHES_PER_FOOT: f64 = 12.0;
    /// 墙体跨度下限（英尺），非正或非有限的输入会被替换为该值。
    pub const MIN_SPAN_FEET: f64 = 1.0;

    /// 墙体标称尺寸，单位英尺。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct WallSpan {
        pub width: f64,
        pub height: f64,
    }

    impl WallSpan {
        #[inline]
        pub fn new(width: f64, height: f64) -> Self {
            Self { width, height }
        }

        /// 将退化尺寸替换为下限，保证后续换算不会产生零尺寸或 NaN。
        pub fn sanitized(self, min_feet: f64) -> Self {
            let min_feet = if min_feet.is_finite() && min_feet > 0.0 {
                min_feet
            } else {
                MIN_SPAN_FEET
            };
            let fix = |value: f64| {
                if value.is_finite() {
                    value.max(min_feet)
                } else {
                    min_feet
                }
            };
            Self {
                width: fix(self.width),
                height: fix(self.height),
            }
        }

        #[inline]
        pub fn scaled_width(self) -> f64 {
            self.width * SCALE
        }

        #[inline]
        pub fn scaled_height(self) -> f64 {
            self.height * SCALE
        }

        #[inline]
        pub fn aspect(self) -> f64 {
            self.width / self.height
        }
    }

    /// 房间拓扑，决定墙体之间的排布算法。未识别的名称回退到 `Arc`。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Topology {
        Zigzag,
        Square,
        Linear,
        LShape,
        Arc,
    }

    impl Topology {
        pub fn from_name(name: &str) -> Self {
            match name.trim().to_ascii_lowercase().as_str() {
                "zigzag" => Topology::Zigzag,
                "square" => Topology::Square,
                "linear" => Topology::Linear,
                "lshape" | "l-shape" | "l_shape" => Topology::LShape,
                _ => Topology::Arc,
            }
        }

        pub fn name(self) -> &'static str {
            match self {
                Topology::Zigzag => "zigzag",
                Topology::Square => "square",
                Topology::Linear => "linear",
                Topology::LShape => "lshape",
                Topology::Arc => "arc",
            }
        }
    }

    /// 房间描述：有序墙体列表 + 拓扑。由外部配置步骤创建，引擎只读。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct RoomConfig {
        pub walls: Vec<WallSpan>,
        pub topology: Topology,
    }

    impl RoomConfig {
        pub const DEFAULT_WALL_WIDTH: f64 = 12.0;
        pub const DEFAULT_WALL_HEIGHT: f64 = 10.0;

        pub fn new(walls: Vec<WallSpan>, topology: Topology) -> Self {
            Self { walls, topology }
        }

        /// 缺省房间：4 面 12×10 英尺的 zigzag 墙。
        pub fn default_zigzag() -> Self {
            Self {
                walls: vec![
                    WallSpan::new(Self::DEFAULT_WALL_WIDTH, Self::DEFAULT_WALL_HEIGHT);
                    4
                ],
                topology: Topology::Zigzag,
            }
        }

        #[inline]
        pub fn wall_count(&self) -> usize {
            self.walls.len()
        }

        #[inline]
        pub fn wall(&self, index: usize) -> Option<WallSpan> {
            self.walls.get(index).copied()
        }
    }

    impl Default for RoomConfig {
        fn default() -> Self {
            Self::default_zigzag()
        }
    }

    /// 墙体在世界空间中的位姿，由布局求解器派生，不持久化。
    ///
    /// 墙面局部坐标系：`right()` 沿墙宽方向（正面观察者的右手方向），
    /// `Vector3::UP` 沿墙高方向，`forward()` 为正面法线。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct WallTransform {
        pub center_x: f64,
        pub center_z: f64,
        pub rotation_y: f64,
        pub scaled_width: f64,
        pub scaled_height: f64,
    }

    impl WallTransform {
        pub fn new(center_x: f64, center_z: f64, rotation_y: f64, span: WallSpan) -> Self {
            Self {
                center_x,
                center_z,
                rotation_y,
                scaled_width: span.scaled_width(),
                scaled_height: span.scaled_height(),
            }
        }

        /// 墙中心，墙体竖直方向以 `y = 0` 为中心。
        #[inline]
        pub fn center(&self) -> Point3 {
            Point3::new(self.center_x, 0.0, self.center_z)
        }

        /// 正面法线：绕 Y 轴旋转后的 `-Z`。
        #[inline]
        pub fn forward(&self) -> Vector3 {
            let (sin, cos) = self.rotation_y.sin_cos();
            Vector3(DVec3::new(-sin, 0.0, -cos))
        }

        /// 墙宽方向：绕 Y 轴旋转后的 `-X`。
        #[inline]
        pub fn right(&self) -> Vector3 {
            let (sin, cos) = self.rotation_y.sin_cos();
            Vector3(DVec3::new(-cos, 0.0, sin))
        }

        /// 还原为英尺单位的墙体跨度。
        #[inline]
        pub fn span(&self) -> WallSpan {
            WallSpan::new(self.scaled_width / SCALE, self.scaled_height / SCALE)
        }

        #[inline]
        pub fn translated(&self, dx: f64, dz: f64) -> Self {
            Self {
                center_x: self.center_x + dx,
                center_z: self.center_z + dz,
                ..*self
            }
        }

        /// 旋转角归一化到 `(-π, π]`，仅用于展示。
        pub fn rotation_degrees(&self) -> f64 {
            let mut angle = self.rotation_y % (2.0 * PI);
            if angle > PI {
                angle -= 2.0 * PI;
            } else if angle <= -PI {
                angle += 2.0 * PI;
            }
            angle.to_degrees()
        }
    }
}

pub mod board {
    use std::collections::HashMap;

    use serde::{Deserialize, Serialize};

    use crate::coords::{FractionSize, NormalizedCoord};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct BoardId(u64);

    impl BoardId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于序列化或日志输出。
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    /// 展板挂在双面墙的哪一面。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Side {
        #[default]
        Front,
        Back,
    }

    impl Side {
        /// 沿墙面法线的偏移方向。
        #[inline]
        pub fn sign(self) -> f64 {
            match self {
                Side::Front => 1.0,
                Side::Back => -1.0,
            }
        }

        /// 只有 `back` 识别为背面，其余一律按正面处理。
        pub fn from_name(name: &str) -> Self {
            if name.trim().eq_ignore_ascii_case("back") {
                Side::Back
            } else {
                Side::Front
            }
        }

        pub fn name(self) -> &'static str {
            match self {
                Side::Front => "front",
                Side::Back => "back",
            }
        }
    }

    /// 展板在墙上的摆放记录。`width`/`height` 保留原始存储值，
    /// 可能是旧版百分比，读取时须经 `saved_size()` 换算。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct BoardPlacement {
        pub wall_index: usize,
        pub position: NormalizedCoord,
        pub width: Option<f64>,
        pub height: Option<f64>,
        pub side: Side,
    }

    impl BoardPlacement {
        pub fn new(wall_index: usize, position: NormalizedCoord, side: Side) -> Self {
            Self {
                wall_index,
                position,
                width: None,
                height: None,
                side,
            }
        }

        pub fn with_size(mut self, size: FractionSize) -> Self {
            self.width = Some(size.width);
            self.height = Some(size.height);
            self
        }

        /// 宽高均存在且有效时返回换算后的比例尺寸。
        pub fn saved_size(&self) -> Option<FractionSize> {
            FractionSize::from_stored(self.width?, self.height?)
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Board {
        pub id: BoardId,
        pub physical_width_inches: Option<f64>,
        pub physical_height_inches: Option<f64>,
        pub aspect_ratio: Option<f64>,
        pub placement: Option<BoardPlacement>,
    }

    impl Board {
        pub fn new(id: BoardId) -> Self {
            Self {
                id,
                physical_width_inches: None,
                physical_height_inches: None,
                aspect_ratio: None,
                placement: None,
            }
        }

        pub fn with_physical_size(mut self, width_inches: f64, height_inches: f64) -> Self {
            self.physical_width_inches = Some(width_inches);
            self.physical_height_inches = Some(height_inches);
            self
        }

        pub fn with_aspect_ratio(mut self, aspect_ratio: f64) -> Self {
            self.aspect_ratio = Some(aspect_ratio);
            self
        }

        pub fn with_placement(mut self, placement: BoardPlacement) -> Self {
            self.placement = Some(placement);
            self
        }

        #[inline]
        pub fn is_placed(&self) -> bool {
            self.placement.is_some()
        }

        /// 物理尺寸（英寸），两者都为正的有限值时才视为已知。
        pub fn physical_size(&self) -> Option<(f64, f64)> {
            let width = self.physical_width_inches?;
            let height = self.physical_height_inches?;
            let valid = |v: f64| v.is_finite() && v > 0.0;
            (valid(width) && valid(height)).then_some((width, height))
        }

        pub fn valid_aspect_ratio(&self) -> Option<f64> {
            self.aspect_ratio.filter(|ratio| ratio.is_finite() && *ratio > 0.0)
        }
    }

    /// 展板集合，保持插入顺序；同 ID 再次插入时覆盖原记录。
    #[derive(Debug, Default, Clone)]
    pub struct BoardBook {
        boards: Vec<Board>,
        index: HashMap<BoardId, usize>,
    }

    impl BoardBook {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn from_boards(boards: impl IntoIterator<Item = Board>) -> Self {
            let mut book = Self::new();
            for board in boards {
                book.insert(board);
            }
            book
        }

        pub fn insert(&mut self, board: Board) {
            if let Some(&slot) = self.index.get(&board.id) {
                self.boards[slot] = board;
            } else {
                self.index.insert(board.id, self.boards.len());
                self.boards.push(board);
            }
        }

        #[inline]
        pub fn get(&self, id: BoardId) -> Option<&Board> {
            self.index.get(&id).map(|&slot| &self.boards[slot])
        }

        #[inline]
        pub fn get_mut(&mut self, id: BoardId) -> Option<&mut Board> {
            let slot = *self.index.get(&id)?;
            self.boards.get_mut(slot)
        }

        #[inline]
        pub fn contains(&self, id: BoardId) -> bool {
            self.index.contains_key(&id)
        }

        pub fn iter(&self) -> impl Iterator<Item = &Board> {
            self.boards.iter()
        }

        pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Board> {
            self.boards.iter_mut()
        }

        pub fn placed(&self) -> impl Iterator<Item = (&Board, &BoardPlacement)> {
            self.boards
                .iter()
                .filter_map(|board| board.placement.as_ref().map(|p| (board, p)))
        }

        #[inline]
        pub fn len(&self) -> usize {
            self.boards.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.boards.is_empty()
        }
    }
}

pub mod camera {
    use glam::DVec3;
    use serde::{Deserialize, Serialize};

    use crate::geometry::{Point3, Ray3, Vector3};

    /// 相机位姿，`fov` 为垂直视场角（度）。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct CameraPose {
        pub position: Point3,
        pub look_target: Point3,
        pub fov: f64,
    }

    impl CameraPose {
        pub fn new(position: Point3, look_target: Point3, fov: f64) -> Self {
            Self {
                position,
                look_target,
                fov,
            }
        }

        /// 视线方向，位置与目标重合时退化为 `-Z`。
        pub fn view_direction(&self) -> Vector3 {
            self.position
                .vector_to(self.look_target)
                .normalize()
                .unwrap_or(Vector3(DVec3::NEG_Z))
        }

        /// 由归一化设备坐标（`[-1, 1]`，`y` 向上）生成指针射线。
        pub fn ray_through_ndc(&self, ndc_x: f64, ndc_y: f64, aspect: f64) -> Option<Ray3> {
            let forward = self.view_direction();
            let right = forward
                .cross(Vector3::UP)
                .normalize()
                .unwrap_or(Vector3(DVec3::X));
            let up = right.cross(forward);
            let half_height = (self.fov.to_radians() * 0.5).tan();
            let half_width = half_height * aspect;
            let direction = Vector3(
                forward.0 + right.0 * (ndc_x * half_width) + up.0 * (ndc_y * half_height),
            );
            Ray3::new(self.position, direction)
        }
    }
}

pub mod contract {
    use serde::{Deserialize, Serialize};

    use crate::board::{BoardId, BoardPlacement, Side};

    /// 外部权限判定。引擎只读取布尔结果，不实现授权逻辑。
    pub trait EditAuthority {
        fn can_edit(&self, board: BoardId) -> bool;
    }

    impl<F> EditAuthority for F
    where
        F: Fn(BoardId) -> bool,
    {
        fn can_edit(&self, board: BoardId) -> bool {
            self(board)
        }
    }

    /// 允许编辑所有展板，供演示与测试使用。
    #[derive(Debug, Clone, Copy, Default)]
    pub struct AllowAll;

    impl EditAuthority for AllowAll {
        fn can_edit(&self, _board: BoardId) -> bool {
            true
        }
    }

    /// 落位提交负载，对应外部更新接口。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PlacementCommit {
        pub board_id: u64,
        pub wall_index: usize,
        pub x: f64,
        pub y: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub width: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub height: Option<f64>,
        pub side: Side,
    }

    impl PlacementCommit {
        pub fn from_placement(board: BoardId, placement: &BoardPlacement) -> Self {
            Self {
                board_id: board.get(),
                wall_index: placement.wall_index,
                x: placement.position.x,
                y: placement.position.y,
                width: placement.width,
                height: placement.height,
                side: placement.side,
            }
        }

        #[inline]
        pub fn board(&self) -> BoardId {
            BoardId::new(self.board_id)
        }
    }

    /// 发往持久化协作方的变更。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "kind", rename_all = "lowercase")]
    pub enum PlacementUpdate {
        Placed(PlacementCommit),
        Cleared {
            #[serde(rename = "boardId")]
            board_id: u64,
        },
    }

    impl PlacementUpdate {
        pub fn board(&self) -> BoardId {
            match self {
                PlacementUpdate::Placed(commit) => commit.board(),
                PlacementUpdate::Cleared { board_id } => BoardId::new(*board_id),
            }
        }
    }

    /// 持久化协作方。调用即返回，返回值只表示请求是否被受理；
    /// 成败处理归协作方自己，引擎不重试、不等待。
    pub trait PlacementSink {
        fn submit(&mut self, update: &PlacementUpdate) -> bool;
    }

    /// 记录所有更新，便于测试断言。
    impl PlacementSink for Vec<PlacementUpdate> {
        fn submit(&mut self, update: &PlacementUpdate) -> bool {
            self.push(*update);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use super::board::{Board, BoardBook, BoardId, BoardPlacement, Side};
    use super::camera::CameraPose;
    use super::coords::{FractionSize, NormalizedCoord};
    use super::geometry::{Point3, Ray3, Vector3};
    use super::room::{MIN_SPAN_FEET, RoomConfig, SCALE, Topology, WallSpan, WallTransform};

    #[test]
    fn clamp_is_idempotent() {
        let samples = [
            NormalizedCoord::new(0.7, -0.9),
            NormalizedCoord::new(-0.2, 0.1),
            NormalizedCoord::new(0.5, -0.5),
            NormalizedCoord::new(12.0, 0.0),
        ];
        for sample in samples {
            let once = sample.clamped();
            assert_eq!(once, once.clamped());
            assert!(once.is_within_wall());
        }
        assert_eq!(
            NormalizedCoord::new(0.7, -0.9).clamped(),
            NormalizedCoord::new(0.5, -0.5)
        );
    }

    #[test]
    fn stored_sizes_detect_legacy_percentages() {
        let fraction = FractionSize::from_stored(0.25, 0.4).expect("fraction");
        assert!((fraction.width - 0.25).abs() < 1e-12);
        assert!((fraction.height - 0.4).abs() < 1e-12);

        let legacy = FractionSize::from_stored(25.0, 40.0).expect("percent");
        assert!((legacy.width - 0.25).abs() < 1e-12);
        assert!((legacy.height - 0.4).abs() < 1e-12);

        let oversized = FractionSize::from_stored(150.0, 0.5).expect("oversized");
        assert!((oversized.width - 1.0).abs() < 1e-12);

        assert!(FractionSize::from_stored(0.0, 0.5).is_none());
        assert!(FractionSize::from_stored(f64::NAN, 0.5).is_none());
    }

    #[test]
    fn wall_span_sanitizes_degenerate_values() {
        let span = WallSpan::new(-3.0, f64::NAN).sanitized(MIN_SPAN_FEET);
        assert_eq!(span, WallSpan::new(MIN_SPAN_FEET, MIN_SPAN_FEET));
        let ok = WallSpan::new(8.0, 10.0).sanitized(MIN_SPAN_FEET);
        assert_eq!(ok, WallSpan::new(8.0, 10.0));
    }

    #[test]
    fn topology_names_fall_back_to_arc() {
        assert_eq!(Topology::from_name("Square"), Topology::Square);
        assert_eq!(Topology::from_name(" zigzag "), Topology::Zigzag);
        assert_eq!(Topology::from_name("l-shape"), Topology::LShape);
        assert_eq!(Topology::from_name("linear"), Topology::Linear);
        assert_eq!(Topology::from_name("spiral"), Topology::Arc);
        assert_eq!(Topology::LShape.name(), "lshape");
    }

    #[test]
    fn wall_axes_are_orthonormal() {
        for rotation in [0.0, FRAC_PI_2, PI, -FRAC_PI_2, 0.3] {
            let wall = WallTransform::new(1.0, 2.0, rotation, WallSpan::new(8.0, 10.0));
            let forward = wall.forward();
            let right = wall.right();
            assert!((forward.length() - 1.0).abs() < 1e-12);
            assert!((right.length() - 1.0).abs() < 1e-12);
            assert!(forward.dot(right).abs() < 1e-12);
            assert!(forward.dot(Vector3::UP).abs() < 1e-12);
        }
        let front = WallTransform::new(0.0, 4.0, 0.0, WallSpan::new(8.0, 10.0));
        assert!((front.forward().as_vec3().z + 1.0).abs() < 1e-12);
        assert!((front.scaled_width - 8.0 * SCALE).abs() < 1e-12);
        let span = front.span();
        assert!((span.width - 8.0).abs() < 1e-9);
        assert!((span.height - 10.0).abs() < 1e-9);
    }

    #[test]
    fn board_book_replaces_same_id_and_lists_placed() {
        let mut book = BoardBook::new();
        book.insert(Board::new(BoardId::new(1)));
        book.insert(Board::new(BoardId::new(2)).with_placement(BoardPlacement::new(
            0,
            NormalizedCoord::center(),
            Side::Front,
        )));
        book.insert(Board::new(BoardId::new(1)).with_aspect_ratio(1.5));

        assert_eq!(book.len(), 2);
        assert_eq!(book.get(BoardId::new(1)).and_then(|b| b.aspect_ratio), Some(1.5));
        let placed: Vec<u64> = book.placed().map(|(board, _)| board.id.get()).collect();
        assert_eq!(placed, vec![2]);
    }

    #[test]
    fn physical_size_requires_both_positive() {
        let board = Board::new(BoardId::new(7)).with_physical_size(17.0, 22.0);
        assert_eq!(board.physical_size(), Some((17.0, 22.0)));
        let broken = Board::new(BoardId::new(8)).with_physical_size(17.0, 0.0);
        assert!(broken.physical_size().is_none());
    }

    #[test]
    fn center_ray_points_at_look_target() {
        let pose = CameraPose::new(Point3::new(0.0, 1.0, 5.0), Point3::new(0.0, 1.0, 0.0), 60.0);
        let ray = pose.ray_through_ndc(0.0, 0.0, 16.0 / 9.0).expect("ray");
        assert!((ray.direction().as_vec3().z + 1.0).abs() < 1e-12);

        let upper = pose.ray_through_ndc(0.0, 1.0, 1.0).expect("ray");
        assert!(upper.direction().as_vec3().y > 0.0);
        let right = pose.ray_through_ndc(1.0, 0.0, 1.0).expect("ray");
        assert!(right.direction().as_vec3().x > 0.0);
    }

    #[test]
    fn degenerate_rays_are_rejected() {
        assert!(Ray3::new(Point3::origin(), Vector3::new(0.0, 0.0, 0.0)).is_none());
        assert!(Ray3::through(Point3::origin(), Point3::origin()).is_none());
        assert!(Ray3::new(Point3::new(f64::NAN, 0.0, 0.0), Vector3::UP).is_none());
    }

    #[test]
    fn default_room_is_four_wall_zigzag() {
        let room = RoomConfig::default();
        assert_eq!(room.wall_count(), 4);
        assert_eq!(room.topology, Topology::Zigzag);
    }
}

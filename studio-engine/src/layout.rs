use std::f64::consts::{FRAC_PI_2, PI};

use glam::DVec2;
use studio_core::room::{MIN_SPAN_FEET, RoomConfig, Topology, WallSpan, WallTransform};
use tracing::{debug, trace};

/// 布局参数（引擎单位）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    /// 墙体厚度，zigzag 拐角处相邻墙各重叠一半厚度。
    pub wall_thickness: f64,
    /// linear 拓扑中相邻墙之间的间距。
    pub linear_spacing: f64,
    /// 墙体跨度下限（英尺）。
    pub min_span_feet: f64,
    /// 回退弧形布局的总张角（度）。
    pub arc_degrees: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            wall_thickness: 0.1,
            linear_spacing: 0.5,
            min_span_feet: MIN_SPAN_FEET,
            arc_degrees: 180.0,
        }
    }
}

/// 单一拓扑的布局算法。`walls` 已完成尺寸下限处理，且至少有两面墙。
pub trait TopologyLayout: Send + Sync {
    fn topology(&self) -> Topology;
    fn compute_transforms(&self, walls: &[WallSpan], params: &LayoutParams) -> Vec<WallTransform>;
}

/// 拓扑到布局算法的唯一分派点。
pub fn strategy_for(topology: Topology) -> &'static dyn TopologyLayout {
    match topology {
        Topology::Linear => &LinearLayout,
        Topology::Square => &SquareLayout,
        Topology::Zigzag => &ZigzagLayout,
        Topology::LShape => &LShapeLayout,
        Topology::Arc => &ArcLayout,
    }
}

/// 按拓扑计算每面墙的世界位姿。纯函数，相同输入得到逐位相同的输出。
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutSolver {
    params: LayoutParams,
}

impl LayoutSolver {
    pub fn new(params: LayoutParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &LayoutParams {
        &self.params
    }

    /// 为每面墙计算一个位姿，顺序与输入一致。单面墙在任何拓扑下都退化为原点处的一面墙。
    pub fn solve(&self, room: &RoomConfig) -> Vec<WallTransform> {
        let walls: Vec<WallSpan> = room
            .walls
            .iter()
            .map(|span| {
                let fixed = span.sanitized(self.params.min_span_feet);
                if fixed != *span {
                    debug!(?span, ?fixed, "墙体尺寸无效，已替换为下限");
                }
                fixed
            })
            .collect();

        let transforms = match walls.as_slice() {
            [] => Vec::new(),
            [single] => vec![WallTransform::new(0.0, 0.0, 0.0, *single)],
            _ => strategy_for(room.topology).compute_transforms(&walls, &self.params),
        };
        trace!(
            topology = room.topology.name(),
            walls = transforms.len(),
            "布局求解完成"
        );
        transforms
    }
}

/// 沿 X 轴并排，相邻墙之间固定间距，整体居中。
pub struct LinearLayout;

impl TopologyLayout for LinearLayout {
    fn topology(&self) -> Topology {
        Topology::Linear
    }

    fn compute_transforms(&self, walls: &[WallSpan], params: &LayoutParams) -> Vec<WallTransform> {
        let total: f64 = walls.iter().map(|span| span.scaled_width()).sum::<f64>()
            + params.linear_spacing * (walls.len() - 1) as f64;
        let mut cursor = -total / 2.0;
        walls
            .iter()
            .map(|span| {
                let width = span.scaled_width();
                let center = cursor + width / 2.0;
                cursor += width + params.linear_spacing;
                WallTransform::new(center, 0.0, 0.0, *span)
            })
            .collect()
    }
}

/// 四面墙围成闭合矩形：前、右、后、左。离原点的距离均取第一面墙宽度的一半。
/// 超过四面时按序号循环复用四个槽位。
pub struct SquareLayout;

impl SquareLayout {
    const SLOTS: [(f64, f64, f64); 4] = [
        (0.0, 1.0, 0.0),
        (1.0, 0.0, FRAC_PI_2),
        (0.0, -1.0, PI),
        (-1.0, 0.0, -FRAC_PI_2),
    ];
}

impl TopologyLayout for SquareLayout {
    fn topology(&self) -> Topology {
        Topology::Square
    }

    fn compute_transforms(&self, walls: &[WallSpan], _params: &LayoutParams) -> Vec<WallTransform> {
        let half = walls[0].scaled_width() / 2.0;
        walls
            .iter()
            .enumerate()
            .map(|(index, span)| {
                let (x, z, rotation) = Self::SLOTS[index % Self::SLOTS.len()];
                WallTransform::new(x * half, z * half, rotation, *span)
            })
            .collect()
    }
}

/// 墙体交替沿 X 轴（朝 +X）与 Z 轴（朝 -Z）延伸，拐角处重叠半个墙厚。
/// 完成后整体平移，使墙中心的均值落在原点。
pub struct ZigzagLayout;

impl ZigzagLayout {
    /// 单次累积：从拐点 `start` 出发放置所有墙，中心点统一加上 `shift`。
    /// 测量与输出共用该函数。
    fn pass(walls: &[WallSpan], params: &LayoutParams, shift: DVec2) -> Vec<WallTransform> {
        let overlap = params.wall_thickness / 2.0;
        let mut corner = DVec2::ZERO;
        walls
            .iter()
            .enumerate()
            .map(|(index, span)| {
                let (direction, rotation) = if index % 2 == 0 {
                    (DVec2::new(1.0, 0.0), 0.0)
                } else {
                    (DVec2::new(0.0, -1.0), FRAC_PI_2)
                };
                let width = span.scaled_width();
                let center = corner + direction * (width / 2.0 - overlap) + shift;
                corner += direction * (width - 2.0 * overlap);
                WallTransform::new(center.x, center.y, rotation, *span)
            })
            .collect()
    }
}

impl TopologyLayout for ZigzagLayout {
    fn topology(&self) -> Topology {
        Topology::Zigzag
    }

    fn compute_transforms(&self, walls: &[WallSpan], params: &LayoutParams) -> Vec<WallTransform> {
        let measured = Self::pass(walls, params, DVec2::ZERO);
        let sum = measured
            .iter()
            .fold(DVec2::ZERO, |acc, wall| acc + DVec2::new(wall.center_x, wall.center_z));
        let mean = sum / measured.len() as f64;
        Self::pass(walls, params, -mean)
    }
}

/// 第一面墙水平放在原点，第二面在其 +X 端垂直连接并朝 -Z 延伸，其余墙沿同一方向顺延。
pub struct LShapeLayout;

impl TopologyLayout for LShapeLayout {
    fn topology(&self) -> Topology {
        Topology::LShape
    }

    fn compute_transforms(&self, walls: &[WallSpan], _params: &LayoutParams) -> Vec<WallTransform> {
        let first = walls[0];
        let end_x = first.scaled_width() / 2.0;
        let mut transforms = Vec::with_capacity(walls.len());
        transforms.push(WallTransform::new(0.0, 0.0, 0.0, first));

        let mut cursor = 0.0;
        for span in &walls[1..] {
            let width = span.scaled_width();
            transforms.push(WallTransform::new(
                end_x,
                cursor - width / 2.0,
                FRAC_PI_2,
                *span,
            ));
            cursor -= width;
        }
        transforms
    }
}

/// 回退布局：按墙宽总和确定半径，沿弧线均匀分布，所有墙朝向圆心。
pub struct ArcLayout;

impl TopologyLayout for ArcLayout {
    fn topology(&self) -> Topology {
        Topology::Arc
    }

    fn compute_transforms(&self, walls: &[WallSpan], params: &LayoutParams) -> Vec<WallTransform> {
        let count = walls.len() as f64;
        let sweep = params.arc_degrees.clamp(1.0, 359.0).to_radians();
        let total_width: f64 = walls.iter().map(|span| span.scaled_width()).sum();
        let radius = total_width / sweep;
        walls
            .iter()
            .enumerate()
            .map(|(index, span)| {
                let angle = -sweep / 2.0 + sweep * (index as f64 + 0.5) / count;
                let (sin, cos) = angle.sin_cos();
                WallTransform::new(radius * sin, radius * cos, angle, *span)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use studio_core::room::SCALE;

    use super::*;

    fn room(topology: Topology, spans: &[(f64, f64)]) -> RoomConfig {
        RoomConfig::new(
            spans.iter().map(|&(w, h)| WallSpan::new(w, h)).collect(),
            topology,
        )
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn solve_is_deterministic() {
        let solver = LayoutSolver::default();
        for topology in [
            Topology::Zigzag,
            Topology::Square,
            Topology::Linear,
            Topology::LShape,
            Topology::Arc,
        ] {
            let config = room(topology, &[(8.0, 10.0), (12.0, 9.0), (6.5, 10.0), (10.0, 10.0)]);
            let first = solver.solve(&config);
            let second = solver.solve(&config);
            assert_eq!(first.len(), 4);
            for (a, b) in first.iter().zip(&second) {
                assert_eq!(a.center_x.to_bits(), b.center_x.to_bits());
                assert_eq!(a.center_z.to_bits(), b.center_z.to_bits());
                assert_eq!(a.rotation_y.to_bits(), b.rotation_y.to_bits());
                assert_eq!(a.scaled_width.to_bits(), b.scaled_width.to_bits());
                assert_eq!(a.scaled_height.to_bits(), b.scaled_height.to_bits());
            }
        }
    }

    #[test]
    fn square_room_matches_reference_positions() {
        let config = room(Topology::Square, &[(8.0, 10.0); 4]);
        let walls = LayoutSolver::default().solve(&config);
        let expected = [
            (0.0, 4.0 * SCALE, 0.0),
            (4.0 * SCALE, 0.0, FRAC_PI_2),
            (0.0, -4.0 * SCALE, PI),
            (-4.0 * SCALE, 0.0, -FRAC_PI_2),
        ];
        for (wall, (x, z, rotation)) in walls.iter().zip(expected) {
            assert!(approx(wall.center_x, x));
            assert!(approx(wall.center_z, z));
            assert!(approx(wall.rotation_y, rotation));
            assert!(approx(wall.scaled_width, 8.0 * SCALE));
            assert!(approx(wall.scaled_height, 10.0 * SCALE));
        }
    }

    #[test]
    fn square_room_forms_closed_loop() {
        let width = 8.0;
        let walls = LayoutSolver::default().solve(&room(Topology::Square, &[(width, 10.0); 4]));
        for index in 0..4 {
            let current = &walls[index];
            let next = &walls[(index + 1) % 4];
            // 相邻墙互相垂直
            assert!(current.forward().dot(next.forward()).abs() < 1e-9);
            // 相对墙中心距离等于墙宽
            let opposite = &walls[(index + 2) % 4];
            assert!(approx(
                current.center().distance(opposite.center()),
                width * SCALE
            ));
            // 法线朝向房间内部
            let inward = current.center().vector_to(studio_core::geometry::Point3::origin());
            assert!(current.forward().dot(inward) > 0.0);
        }
    }

    #[test]
    fn zigzag_centroid_is_origin() {
        let solver = LayoutSolver::default();
        for count in 2..=7 {
            let spans: Vec<(f64, f64)> = (0..count)
                .map(|i| (6.0 + i as f64 * 1.5, 10.0))
                .collect();
            let walls = solver.solve(&room(Topology::Zigzag, &spans));
            let (sx, sz) = walls
                .iter()
                .fold((0.0, 0.0), |(x, z), w| (x + w.center_x, z + w.center_z));
            assert!((sx / count as f64).abs() < 1e-9, "count {count}");
            assert!((sz / count as f64).abs() < 1e-9, "count {count}");
        }
    }

    #[test]
    fn zigzag_walls_alternate_axes_and_meet_flush() {
        let params = LayoutParams::default();
        let walls = LayoutSolver::new(params).solve(&room(Topology::Zigzag, &[(10.0, 10.0); 3]));
        assert!(approx(walls[0].rotation_y, 0.0));
        assert!(approx(walls[1].rotation_y, FRAC_PI_2));
        assert!(approx(walls[2].rotation_y, 0.0));

        // 第一面墙的 +X 端与第二面墙中线之间只差半个墙厚
        let first_end = walls[0].center_x + walls[0].scaled_width / 2.0;
        assert!(approx(first_end - walls[1].center_x, params.wall_thickness / 2.0));
        // 第二面墙的远端同理
        let second_end = walls[1].center_z - walls[1].scaled_width / 2.0;
        assert!(approx(walls[2].center_z - second_end, params.wall_thickness / 2.0));
    }

    #[test]
    fn linear_walls_share_rotation_and_spacing() {
        let params = LayoutParams::default();
        let walls = LayoutSolver::new(params).solve(&room(Topology::Linear, &[(8.0, 10.0), (4.0, 10.0)]));
        assert!(walls.iter().all(|w| w.rotation_y == 0.0 && w.center_z == 0.0));
        let gap = (walls[1].center_x - walls[1].scaled_width / 2.0)
            - (walls[0].center_x + walls[0].scaled_width / 2.0);
        assert!(approx(gap, params.linear_spacing));
        let left = walls[0].center_x - walls[0].scaled_width / 2.0;
        let right = walls[1].center_x + walls[1].scaled_width / 2.0;
        assert!(approx(left + right, 0.0));
    }

    #[test]
    fn lshape_second_wall_attaches_at_first_end() {
        let walls = LayoutSolver::default()
            .solve(&room(Topology::LShape, &[(10.0, 10.0), (6.0, 10.0), (4.0, 10.0)]));
        assert!(approx(walls[0].center_x, 0.0) && approx(walls[0].center_z, 0.0));
        let end_x = 5.0 * SCALE;
        assert!(approx(walls[1].center_x, end_x));
        assert!(approx(walls[1].center_z, -3.0 * SCALE));
        assert!(approx(walls[1].rotation_y, FRAC_PI_2));
        assert!(approx(walls[2].center_x, end_x));
        assert!(approx(walls[2].center_z, -8.0 * SCALE));
    }

    #[test]
    fn single_wall_sits_at_origin_in_every_topology() {
        for topology in [
            Topology::Zigzag,
            Topology::Square,
            Topology::Linear,
            Topology::LShape,
            Topology::Arc,
        ] {
            let walls = LayoutSolver::default().solve(&room(topology, &[(9.0, 8.0)]));
            assert_eq!(walls.len(), 1);
            assert_eq!(walls[0].center_x, 0.0);
            assert_eq!(walls[0].center_z, 0.0);
            assert_eq!(walls[0].rotation_y, 0.0);
        }
    }

    #[test]
    fn degenerate_spans_are_clamped_to_minimum() {
        let walls = LayoutSolver::default()
            .solve(&room(Topology::Linear, &[(0.0, -1.0), (f64::NAN, 10.0)]));
        for wall in &walls {
            assert!(wall.scaled_width >= MIN_SPAN_FEET * SCALE - 1e-12);
            assert!(wall.scaled_height >= MIN_SPAN_FEET * SCALE - 1e-12);
            assert!(wall.center_x.is_finite() && wall.center_z.is_finite());
        }
    }

    #[test]
    fn arc_fallback_faces_the_center() {
        let walls = LayoutSolver::default()
            .solve(&room(Topology::from_name("spiral"), &[(8.0, 10.0); 5]));
        assert_eq!(walls.len(), 5);
        for wall in &walls {
            let inward = wall.center().vector_to(studio_core::geometry::Point3::origin());
            let cos = wall.forward().dot(inward) / inward.length();
            assert!((cos - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn incomplete_square_degrades_gracefully() {
        let walls = LayoutSolver::default().solve(&room(Topology::Square, &[(8.0, 10.0); 6]));
        assert_eq!(walls.len(), 6);
        assert!(approx(walls[4].rotation_y, 0.0));
        assert!(approx(walls[5].rotation_y, FRAC_PI_2));
    }
}

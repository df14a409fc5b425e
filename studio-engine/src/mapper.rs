use studio_core::board::Side;
use studio_core::coords::{NormalizedCoord, WorldCoord};
use studio_core::geometry::Ray3;
use studio_core::room::WallTransform;

/// 平行判定阈值：射线方向与墙面法线的点积绝对值低于该值时视为无交点。
const PARALLEL_EPSILON: f64 = 1e-9;

/// 映射参数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapperParams {
    /// 展板离墙面的深度偏移（引擎单位），正面取正、背面取负。
    pub board_depth: f64,
}

impl MapperParams {
    pub const DEFAULT_BOARD_DEPTH: f64 = 0.06;

    #[inline]
    fn depth(&self, side: Side) -> f64 {
        side.sign() * self.board_depth
    }
}

impl Default for MapperParams {
    fn default() -> Self {
        Self {
            board_depth: Self::DEFAULT_BOARD_DEPTH,
        }
    }
}

/// 射线与墙面的交点。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallHit {
    /// 未裁剪的归一化坐标。
    pub local: NormalizedCoord,
    /// 沿射线的距离。
    pub distance: f64,
}

/// 墙面归一化坐标 → 世界坐标。
///
/// 渲染与拖拽预览都经由这里换算，两条路径的输出逐位一致。
pub fn wall_local_to_world(
    transform: &WallTransform,
    coord: NormalizedCoord,
    side: Side,
    params: &MapperParams,
) -> WorldCoord {
    let offset = transform.right().0 * (coord.x * transform.scaled_width)
        + glam::DVec3::Y * (coord.y * transform.scaled_height)
        + transform.forward().0 * params.depth(side);
    WorldCoord::from(transform.center().0 + offset)
}

/// 射线与墙面（含该面的深度偏移）求交，返回未裁剪的归一化坐标与距离。
///
/// 射线与墙面平行、交点位于射线起点之后或墙体尺寸退化时返回 `None`，
/// 调用方应跳过这一帧的更新。
pub fn intersect_wall(
    ray: &Ray3,
    transform: &WallTransform,
    side: Side,
    params: &MapperParams,
) -> Option<WallHit> {
    if transform.scaled_width <= f64::EPSILON || transform.scaled_height <= f64::EPSILON {
        return None;
    }
    let normal = transform.forward();
    let plane_point = transform.center().translate(normal.scale(params.depth(side)));

    let denom = ray.direction().dot(normal);
    if denom.abs() < PARALLEL_EPSILON {
        return None;
    }
    let distance = ray.origin().vector_to(plane_point).dot(normal) / denom;
    if !distance.is_finite() || distance < 0.0 {
        return None;
    }

    let relative = transform.center().vector_to(ray.at(distance));
    let local = NormalizedCoord::new(
        relative.dot(transform.right()) / transform.scaled_width,
        relative.0.y / transform.scaled_height,
    );
    local.is_finite().then_some(WallHit { local, distance })
}

/// 指针射线 → 墙面归一化坐标（未裁剪）。
pub fn screen_ray_to_wall_local(
    ray: &Ray3,
    transform: &WallTransform,
    side: Side,
    params: &MapperParams,
) -> Option<NormalizedCoord> {
    intersect_wall(ray, transform, side, params).map(|hit| hit.local)
}

/// 裁剪到墙面范围 `[-0.5, 0.5]`。
#[inline]
pub fn clamp_to_wall(coord: NormalizedCoord) -> NormalizedCoord {
    coord.clamped()
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use studio_core::geometry::{Point3, Vector3};
    use studio_core::room::WallSpan;

    use super::*;

    fn walls() -> Vec<WallTransform> {
        vec![
            WallTransform::new(0.0, 0.0, 0.0, WallSpan::new(8.0, 10.0)),
            WallTransform::new(1.2, 2.4, FRAC_PI_2, WallSpan::new(12.0, 9.0)),
            WallTransform::new(-3.0, 1.0, PI, WallSpan::new(6.0, 8.0)),
            WallTransform::new(2.0, -5.0, -0.7, WallSpan::new(20.0, 12.0)),
        ]
    }

    fn ray_through(point: Point3, transform: &WallTransform, side: Side) -> Ray3 {
        // 从墙面所在一侧斜向观察
        let normal = transform.forward().scale(side.sign());
        let origin = point
            .translate(normal.scale(3.0))
            .translate(transform.right().scale(0.8))
            .translate(Vector3::UP.scale(0.4));
        Ray3::through(origin, point).expect("ray")
    }

    #[test]
    fn round_trip_recovers_coordinates_on_both_sides() {
        let params = MapperParams::default();
        let samples = [
            (0.0, 0.0),
            (-0.5, 0.5),
            (0.5, -0.5),
            (0.25, 0.1),
            (-0.37, -0.42),
        ];
        for transform in walls() {
            for side in [Side::Front, Side::Back] {
                for (x, y) in samples {
                    let coord = NormalizedCoord::new(x, y);
                    let world = wall_local_to_world(&transform, coord, side, &params);
                    let ray = ray_through(world, &transform, side);
                    let back = screen_ray_to_wall_local(&ray, &transform, side, &params)
                        .expect("intersection");
                    assert!((back.x - x).abs() < 1e-9, "x {x} -> {}", back.x);
                    assert!((back.y - y).abs() < 1e-9, "y {y} -> {}", back.y);
                }
            }
        }
    }

    #[test]
    fn side_offsets_along_forward_normal() {
        let params = MapperParams::default();
        let transform = WallTransform::new(0.0, 4.0, 0.0, WallSpan::new(8.0, 10.0));
        let front = wall_local_to_world(&transform, NormalizedCoord::center(), Side::Front, &params);
        let back = wall_local_to_world(&transform, NormalizedCoord::center(), Side::Back, &params);
        assert!((front.z() - (4.0 - params.board_depth)).abs() < 1e-12);
        assert!((back.z() - (4.0 + params.board_depth)).abs() < 1e-12);
        assert!(front.x().abs() < 1e-12 && front.y().abs() < 1e-12);
    }

    #[test]
    fn wall_edges_stay_within_half_extent() {
        let params = MapperParams { board_depth: 0.0 };
        for transform in walls() {
            let corner = wall_local_to_world(
                &transform,
                NormalizedCoord::new(0.5, 0.5),
                Side::Front,
                &params,
            );
            let relative = transform.center().vector_to(corner);
            assert!((relative.dot(transform.right()) - transform.scaled_width / 2.0).abs() < 1e-9);
            assert!((relative.0.y - transform.scaled_height / 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn parallel_and_backward_rays_are_ignored() {
        let params = MapperParams::default();
        let transform = WallTransform::new(0.0, 0.0, 0.0, WallSpan::new(8.0, 10.0));

        let parallel = Ray3::new(Point3::new(0.0, 0.0, -2.0), Vector3::new(1.0, 0.0, 0.0))
            .expect("ray");
        assert!(screen_ray_to_wall_local(&parallel, &transform, Side::Front, &params).is_none());

        let away = Ray3::new(Point3::new(0.0, 0.0, -2.0), Vector3::new(0.0, 0.0, -1.0))
            .expect("ray");
        assert!(screen_ray_to_wall_local(&away, &transform, Side::Front, &params).is_none());
    }

    #[test]
    fn clamp_to_wall_is_idempotent() {
        for (x, y) in [(0.9, -3.0), (0.1, 0.2), (-0.5, 0.5), (f64::MAX, f64::MIN)] {
            let once = clamp_to_wall(NormalizedCoord::new(x, y));
            assert_eq!(clamp_to_wall(once), once);
        }
    }
}

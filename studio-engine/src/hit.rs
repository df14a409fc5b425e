use studio_core::board::{BoardBook, BoardId, Side};
use studio_core::coords::NormalizedCoord;
use studio_core::geometry::Ray3;
use studio_core::room::WallTransform;

use crate::mapper::{self, MapperParams};
use crate::sizing::{self, SizingRules};

/// 拾取结果。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardHit {
    pub board: BoardId,
    pub wall_index: usize,
    pub side: Side,
    /// 命中点的墙面归一化坐标。
    pub local: NormalizedCoord,
    /// 沿射线的距离。
    pub distance: f64,
}

/// 返回指针射线命中的最近展板。
///
/// 只有朝向观察者的那一面参与拾取；墙序号越界的展板直接忽略。
pub fn pick_board(
    ray: &Ray3,
    transforms: &[WallTransform],
    boards: &BoardBook,
    rules: &SizingRules,
    params: &MapperParams,
) -> Option<BoardHit> {
    let mut best: Option<BoardHit> = None;
    for (board, placement) in boards.placed() {
        let Some(transform) = transforms.get(placement.wall_index) else {
            continue;
        };
        // 射线须迎着该面的法线方向
        if ray.direction().dot(transform.forward()) * placement.side.sign() >= 0.0 {
            continue;
        }
        let Some(hit) = mapper::intersect_wall(ray, transform, placement.side, params) else {
            continue;
        };
        let size = sizing::resolve(board, transform.span(), rules);
        let inside = (hit.local.x - placement.position.x).abs() <= size.width / 2.0
            && (hit.local.y - placement.position.y).abs() <= size.height / 2.0;
        if !inside {
            continue;
        }
        if best.is_none_or(|current| hit.distance < current.distance) {
            best = Some(BoardHit {
                board: board.id,
                wall_index: placement.wall_index,
                side: placement.side,
                local: hit.local,
                distance: hit.distance,
            });
        }
    }
    best
}

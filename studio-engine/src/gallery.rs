use studio_core::room::{RoomConfig, WallTransform};
use tracing::debug;

use crate::layout::LayoutSolver;

/// 已平移到画廊坐标的房间。
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedRoom {
    /// 在输入列表中的序号。
    pub room_index: usize,
    /// 房间原点在画廊中的 X 偏移。
    pub offset_x: f64,
    pub walls: Vec<WallTransform>,
}

/// 墙体在 X 方向上的投影范围。
fn x_extent(walls: &[WallTransform]) -> Option<(f64, f64)> {
    walls.iter().fold(None, |acc, wall| {
        let half = wall.right().0.x.abs() * wall.scaled_width / 2.0;
        let (lo, hi) = (wall.center_x - half, wall.center_x + half);
        Some(match acc {
            None => (lo, hi),
            Some((min, max)) => (min.min(lo), max.max(hi)),
        })
    })
}

/// 依次求解并排列房间，相邻房间的投影范围之间留 `spacing` 的间隔。没有墙的房间被跳过。
pub fn arrange(rooms: &[RoomConfig], solver: &LayoutSolver, spacing: f64) -> Vec<PlacedRoom> {
    let spacing = if spacing.is_finite() { spacing.max(0.0) } else { 0.0 };
    let mut cursor = 0.0;
    let mut placed = Vec::with_capacity(rooms.len());

    for (room_index, room) in rooms.iter().enumerate() {
        let walls = solver.solve(room);
        let Some((min_x, max_x)) = x_extent(&walls) else {
            debug!(room_index, "房间没有墙体，跳过");
            continue;
        };
        let offset_x = cursor - min_x;
        cursor += (max_x - min_x) + spacing;
        placed.push(PlacedRoom {
            room_index,
            offset_x,
            walls: walls.iter().map(|wall| wall.translated(offset_x, 0.0)).collect(),
        });
    }
    placed
}

use studio_core::board::{BoardBook, BoardId, BoardPlacement, Side};
use studio_core::contract::{EditAuthority, PlacementCommit, PlacementSink, PlacementUpdate};
use studio_core::coords::NormalizedCoord;
use studio_core::geometry::Ray3;
use studio_core::room::WallTransform;
use tracing::{debug, info, warn};

use crate::errors::EngineError;
use crate::mapper::{self, MapperParams};
use crate::sizing::{self, SizingRules};

/// 拖拽来源。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragSource {
    /// 从侧栏拖入，提交时重新计算尺寸。
    Palette,
    /// 从墙上拿起，保留原摆放以便沿用尺寸。
    Wall { previous: BoardPlacement },
}

/// 进行中的拖拽。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub board: BoardId,
    pub source: DragSource,
    pub wall_index: usize,
    pub side: Side,
    /// 最近一次有效采样的预览坐标（已裁剪）。
    pub preview: Option<NormalizedCoord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PlacementState {
    #[default]
    Idle,
    Dragging(DragSession),
}

/// 拖拽目标墙面。
#[derive(Debug, Clone, Copy)]
pub struct WallTarget<'a> {
    pub index: usize,
    pub transform: &'a WallTransform,
}

/// 释放指针后的结果。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DropOutcome {
    Committed(PlacementCommit),
    Cancelled,
}

/// 展板拖拽与选中。拖拽期间只更新预览，释放时才写入记录并通知持久化端。
#[derive(Debug, Clone, Default)]
pub struct PlacementController {
    state: PlacementState,
    selected: Option<BoardId>,
    params: MapperParams,
}

impl PlacementController {
    pub fn new(params: MapperParams) -> Self {
        Self {
            state: PlacementState::Idle,
            selected: None,
            params,
        }
    }

    #[inline]
    pub fn state(&self) -> &PlacementState {
        &self.state
    }

    #[inline]
    pub fn params(&self) -> &MapperParams {
        &self.params
    }

    #[inline]
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, PlacementState::Dragging(_))
    }

    pub fn session(&self) -> Option<&DragSession> {
        match &self.state {
            PlacementState::Dragging(session) => Some(session),
            PlacementState::Idle => None,
        }
    }

    // --- 选中 ---

    #[inline]
    pub fn selected(&self) -> Option<BoardId> {
        self.selected
    }

    /// 单选，后一次覆盖前一次。
    pub fn select(&mut self, board: BoardId) {
        self.selected = Some(board);
    }

    /// 取消选中，返回之前是否有选中项。
    pub fn clear_selection(&mut self) -> bool {
        self.selected.take().is_some()
    }

    // --- 拖拽 ---

    /// 从墙上拿起展板。展板必须已摆放且可编辑；成功后同时选中该展板。
    pub fn begin_wall_drag(
        &mut self,
        board: BoardId,
        boards: &BoardBook,
        authority: &dyn EditAuthority,
    ) -> Result<(), EngineError> {
        let record = boards
            .get(board)
            .ok_or(EngineError::BoardNotFound(board.get()))?;
        let previous = record
            .placement
            .ok_or(EngineError::BoardNotFound(board.get()))?;
        Self::check_editable(board, authority)?;

        self.replace_session(DragSession {
            board,
            source: DragSource::Wall { previous },
            wall_index: previous.wall_index,
            side: previous.side,
            preview: Some(previous.position),
        });
        self.selected = Some(board);
        Ok(())
    }

    /// 从侧栏开始拖入展板。
    pub fn begin_palette_drag(
        &mut self,
        board: BoardId,
        boards: &BoardBook,
        target_wall: usize,
        side: Side,
        authority: &dyn EditAuthority,
    ) -> Result<(), EngineError> {
        if !boards.contains(board) {
            return Err(EngineError::BoardNotFound(board.get()));
        }
        Self::check_editable(board, authority)?;

        self.replace_session(DragSession {
            board,
            source: DragSource::Palette,
            wall_index: target_wall,
            side,
            preview: None,
        });
        Ok(())
    }

    /// 指针移动：总是从原始射线重新计算，不累积增量。射线未命中墙面时保留上一帧预览。
    pub fn pointer_move(&mut self, ray: &Ray3, target: WallTarget<'_>) -> Option<NormalizedCoord> {
        let PlacementState::Dragging(session) = &mut self.state else {
            return None;
        };
        session.wall_index = target.index;
        match mapper::screen_ray_to_wall_local(ray, target.transform, session.side, &self.params) {
            Some(raw) => {
                let clamped = mapper::clamp_to_wall(raw);
                session.preview = Some(clamped);
                Some(clamped)
            }
            None => {
                debug!(board = session.board.get(), "射线未命中墙面，跳过本帧预览");
                session.preview
            }
        }
    }

    /// 释放指针。射线落在墙面范围内则提交，否则取消。
    /// 状态立即回到 `Idle`，不等待持久化结果。
    pub fn pointer_up(
        &mut self,
        ray: Option<&Ray3>,
        target: WallTarget<'_>,
        boards: &mut BoardBook,
        rules: &SizingRules,
        sink: &mut dyn PlacementSink,
    ) -> DropOutcome {
        let PlacementState::Dragging(session) = std::mem::take(&mut self.state) else {
            return DropOutcome::Cancelled;
        };

        let raw = ray.and_then(|ray| {
            mapper::screen_ray_to_wall_local(ray, target.transform, session.side, &self.params)
        });
        let Some(raw) = raw.filter(|coord| coord.is_within_wall()) else {
            debug!(board = session.board.get(), "在墙面之外释放，取消拖拽");
            return DropOutcome::Cancelled;
        };
        let position = mapper::clamp_to_wall(raw);

        let Some(board) = boards.get_mut(session.board) else {
            warn!(board = session.board.get(), "拖拽中的展板已不存在，取消提交");
            return DropOutcome::Cancelled;
        };

        let mut placement = BoardPlacement::new(target.index, position, session.side);
        match session.source {
            DragSource::Palette => {
                let size = sizing::resolve_for_drop(board, target.transform.span(), rules);
                placement = placement.with_size(size);
            }
            DragSource::Wall { previous } => {
                placement.width = previous.width;
                placement.height = previous.height;
            }
        }
        board.placement = Some(placement);

        let commit = PlacementCommit::from_placement(session.board, &placement);
        let accepted = sink.submit(&PlacementUpdate::Placed(commit));
        info!(
            board = commit.board_id,
            wall_index = commit.wall_index,
            x = commit.x,
            y = commit.y,
            accepted,
            "展板落位已提交"
        );
        DropOutcome::Committed(commit)
    }

    /// 显式取消：丢弃预览，不修改任何记录。
    pub fn cancel(&mut self) -> DropOutcome {
        if let PlacementState::Dragging(session) = std::mem::take(&mut self.state) {
            debug!(board = session.board.get(), "拖拽已取消");
        }
        DropOutcome::Cancelled
    }

    // --- 删除 ---

    /// 删除选中展板的摆放记录并取消选中。需要选中项且通过权限检查。
    pub fn delete_selected(
        &mut self,
        boards: &mut BoardBook,
        authority: &dyn EditAuthority,
        sink: &mut dyn PlacementSink,
    ) -> Result<BoardId, EngineError> {
        let board = self.selected.ok_or(EngineError::NoSelection)?;
        Self::check_editable(board, authority)?;
        let record = boards
            .get_mut(board)
            .ok_or(EngineError::BoardNotFound(board.get()))?;

        record.placement = None;
        self.selected = None;
        if self.session().is_some_and(|session| session.board == board) {
            self.state = PlacementState::Idle;
        }
        let accepted = sink.submit(&PlacementUpdate::Cleared {
            board_id: board.get(),
        });
        info!(board = board.get(), accepted, "展板已从墙面移除");
        Ok(board)
    }

    fn check_editable(board: BoardId, authority: &dyn EditAuthority) -> Result<(), EngineError> {
        if authority.can_edit(board) {
            Ok(())
        } else {
            debug!(board = board.get(), "无编辑权限，拒绝操作");
            Err(EngineError::EditDenied { board: board.get() })
        }
    }

    fn replace_session(&mut self, session: DragSession) {
        if let PlacementState::Dragging(previous) = self.state {
            debug!(board = previous.board.get(), "新的拖拽覆盖了未完成的拖拽");
        }
        self.state = PlacementState::Dragging(session);
    }
}

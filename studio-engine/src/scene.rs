use studio_core::board::{Board, BoardBook, BoardId, Side};
use studio_core::camera::CameraPose;
use studio_core::contract::{EditAuthority, PlacementSink};
use studio_core::coords::{FractionSize, NormalizedCoord, WorldCoord};
use studio_core::geometry::Ray3;
use studio_core::room::{RoomConfig, WallTransform};
use tracing::{debug, info, warn};

use crate::camera::{CameraProfile, CameraTransitionController};
use crate::errors::EngineError;
use crate::hit;
use crate::layout::{LayoutParams, LayoutSolver};
use crate::mapper::{self, MapperParams};
use crate::placement::{DropOutcome, PlacementController, WallTarget};
use crate::roam::{FreeRoamController, RoamInput};
use crate::sizing::{self, SizingRules};

/// 场景各组件的可调参数。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SceneTuning {
    pub layout: LayoutParams,
    pub mapper: MapperParams,
    pub sizing: SizingRules,
    pub camera: CameraProfile,
    pub roam: FreeRoamController,
}

/// 渲染一块已摆放展板所需的数据。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderItem {
    pub board: BoardId,
    pub wall_index: usize,
    pub side: Side,
    pub position: WorldCoord,
    pub size: FractionSize,
    pub rotation_y: f64,
}

#[derive(Debug)]
pub struct Scene {
    room: RoomConfig,
    transforms: Vec<WallTransform>,
    boards: BoardBook,
    solver: LayoutSolver,
    sizing: SizingRules,
    placement: PlacementController,
    camera: CameraTransitionController,
    roam: FreeRoamController,
}

impl Scene {
    pub fn new(tuning: SceneTuning) -> Self {
        let solver = LayoutSolver::new(tuning.layout);
        let room = RoomConfig::default_zigzag();
        let transforms = solver.solve(&room);
        Self {
            room,
            transforms,
            boards: BoardBook::new(),
            solver,
            sizing: tuning.sizing,
            placement: PlacementController::new(tuning.mapper),
            camera: CameraTransitionController::new(tuning.camera),
            roam: tuning.roam,
        }
    }

    /// 替换房间并重新求解全部墙体位姿。墙序号越界的展板改为未摆放。
    pub fn load_room(&mut self, room: RoomConfig) {
        let room = if room.walls.is_empty() {
            warn!("房间没有墙体，使用缺省的四面 zigzag 房间");
            RoomConfig::default_zigzag()
        } else {
            room
        };
        self.room = room;
        self.transforms = self.solver.solve(&self.room);
        self.placement.cancel();

        let wall_count = self.transforms.len();
        for board in self.boards.iter_mut() {
            if board
                .placement
                .is_some_and(|placement| placement.wall_index >= wall_count)
            {
                debug!(board = board.id.get(), "墙面已不存在，展板改为未摆放");
                board.placement = None;
            }
        }
        if self
            .camera
            .focus()
            .is_some_and(|focus| focus.index >= wall_count)
        {
            self.camera.exit_wall();
        }
        info!(
            walls = wall_count,
            topology = self.room.topology.name(),
            "房间布局已更新"
        );
    }

    /// 替换展板集合。墙序号越界或坐标无效的展板视为未摆放，其余坐标裁剪到墙面范围内。
    pub fn load_boards(&mut self, boards: impl IntoIterator<Item = Board>) {
        let wall_count = self.transforms.len();
        let mut book = BoardBook::new();
        for mut board in boards {
            if let Some(placement) = board.placement.as_mut() {
                if placement.wall_index >= wall_count || !placement.position.is_finite() {
                    debug!(
                        board = board.id.get(),
                        wall_index = placement.wall_index,
                        "展板摆放无效，视为未摆放"
                    );
                    board.placement = None;
                } else {
                    placement.position = mapper::clamp_to_wall(placement.position);
                }
            }
            book.insert(board);
        }
        self.boards = book;
        self.placement.cancel();
        if self
            .placement
            .selected()
            .is_some_and(|selected| !self.boards.contains(selected))
        {
            self.placement.clear_selection();
        }
        debug!(boards = self.boards.len(), "展板集合已加载");
    }

    #[inline]
    pub fn room(&self) -> &RoomConfig {
        &self.room
    }

    #[inline]
    pub fn transforms(&self) -> &[WallTransform] {
        &self.transforms
    }

    #[inline]
    pub fn solver(&self) -> &LayoutSolver {
        &self.solver
    }

    #[inline]
    pub fn boards(&self) -> &BoardBook {
        &self.boards
    }

    #[inline]
    pub fn placement(&self) -> &PlacementController {
        &self.placement
    }

    #[inline]
    pub fn camera(&self) -> &CameraTransitionController {
        &self.camera
    }

    #[inline]
    pub fn sizing(&self) -> &SizingRules {
        &self.sizing
    }

    pub fn wall_transform(&self, index: usize) -> Result<&WallTransform, EngineError> {
        self.transforms
            .get(index)
            .ok_or(EngineError::WallOutOfRange {
                index,
                wall_count: self.transforms.len(),
            })
    }

    // --- 渲染 ---

    /// 展板当前在墙上的比例尺寸。
    pub fn resolved_size(&self, board: BoardId) -> Option<FractionSize> {
        let record = self.boards.get(board)?;
        let placement = record.placement?;
        let transform = self.transforms.get(placement.wall_index)?;
        Some(sizing::resolve(record, transform.span(), &self.sizing))
    }

    /// 已摆放展板的世界坐标。
    pub fn render_position(&self, board: BoardId) -> Option<WorldCoord> {
        let placement = self.boards.get(board)?.placement?;
        let transform = self.transforms.get(placement.wall_index)?;
        Some(mapper::wall_local_to_world(
            transform,
            placement.position,
            placement.side,
            self.placement.params(),
        ))
    }

    /// 拖拽预览的世界坐标，与 [`Scene::render_position`] 使用同一换算。
    pub fn preview_position(&self) -> Option<WorldCoord> {
        let session = self.placement.session()?;
        let preview = session.preview?;
        let transform = self.transforms.get(session.wall_index)?;
        Some(mapper::wall_local_to_world(
            transform,
            preview,
            session.side,
            self.placement.params(),
        ))
    }

    pub fn render_list(&self) -> Vec<RenderItem> {
        self.boards
            .placed()
            .filter_map(|(board, placement)| {
                let transform = self.transforms.get(placement.wall_index)?;
                Some(RenderItem {
                    board: board.id,
                    wall_index: placement.wall_index,
                    side: placement.side,
                    position: mapper::wall_local_to_world(
                        transform,
                        placement.position,
                        placement.side,
                        self.placement.params(),
                    ),
                    size: sizing::resolve(board, transform.span(), &self.sizing),
                    rotation_y: transform.rotation_y,
                })
            })
            .collect()
    }

    // --- 相机 ---

    /// 进入指定墙面的编辑视角。进行中的拖拽会被取消。
    pub fn enter_wall(&mut self, index: usize, side: Side) -> Result<(), EngineError> {
        let wall_count = self.transforms.len();
        let transform = self
            .transforms
            .get(index)
            .ok_or(EngineError::WallOutOfRange { index, wall_count })?;
        self.placement.cancel();
        self.camera.enter_wall(index, transform, side);
        Ok(())
    }

    pub fn exit_wall(&mut self) -> bool {
        self.placement.cancel();
        self.camera.exit_wall()
    }

    pub fn tick(&mut self, dt: f64) {
        self.camera.tick(dt);
    }

    /// 自由漫游。非自由状态下丢弃输入，返回 `false`。
    pub fn roam(&mut self, input: RoamInput, dt: f64) -> bool {
        if !self.camera.controls_enabled() || input.is_idle() {
            return false;
        }
        let pose = self.roam.apply(self.camera.pose(), input, dt);
        self.camera.set_free_pose(pose)
    }

    #[inline]
    pub fn camera_pose(&self) -> CameraPose {
        self.camera.pose()
    }

    /// 从当前相机位姿生成指针射线。
    pub fn camera_ray(&self, ndc_x: f64, ndc_y: f64, aspect: f64) -> Option<Ray3> {
        self.camera.pose().ray_through_ndc(ndc_x, ndc_y, aspect)
    }

    // --- 指针与选中 ---

    /// 指针按下：命中展板即选中；若相机正在编辑该展板所在墙面，同时开始拖拽。
    pub fn pointer_down(
        &mut self,
        ray: &Ray3,
        authority: &dyn EditAuthority,
    ) -> Result<Option<BoardId>, EngineError> {
        let Some(hit) = hit::pick_board(
            ray,
            &self.transforms,
            &self.boards,
            &self.sizing,
            self.placement.params(),
        ) else {
            return Ok(None);
        };
        self.placement.select(hit.board);

        let editing = self
            .camera
            .editing_wall()
            .is_some_and(|focus| focus.index == hit.wall_index && focus.side == hit.side);
        if editing {
            self.placement
                .begin_wall_drag(hit.board, &self.boards, authority)?;
        }
        Ok(Some(hit.board))
    }

    /// 从侧栏把展板拖向当前编辑的墙面。
    pub fn begin_palette_drag(
        &mut self,
        board: BoardId,
        authority: &dyn EditAuthority,
    ) -> Result<(), EngineError> {
        let focus = self.camera.editing_wall().ok_or(EngineError::NoActiveWall)?;
        self.placement
            .begin_palette_drag(board, &self.boards, focus.index, focus.side, authority)
    }

    pub fn pointer_move(&mut self, ray: &Ray3) -> Option<NormalizedCoord> {
        let index = self.placement.session()?.wall_index;
        let transform = self.transforms.get(index)?;
        self.placement
            .pointer_move(ray, WallTarget { index, transform })
    }

    /// 指针释放。`ray` 为 `None` 表示指针离开了画布。
    pub fn pointer_up(&mut self, ray: Option<&Ray3>, sink: &mut dyn PlacementSink) -> DropOutcome {
        let Some(index) = self.placement.session().map(|session| session.wall_index) else {
            return DropOutcome::Cancelled;
        };
        let Some(transform) = self.transforms.get(index) else {
            return self.placement.cancel();
        };
        self.placement.pointer_up(
            ray,
            WallTarget { index, transform },
            &mut self.boards,
            &self.sizing,
            sink,
        )
    }

    pub fn cancel_drag(&mut self) -> DropOutcome {
        self.placement.cancel()
    }

    pub fn select(&mut self, board: BoardId) -> Result<(), EngineError> {
        if !self.boards.contains(board) {
            return Err(EngineError::BoardNotFound(board.get()));
        }
        self.placement.select(board);
        Ok(())
    }

    #[inline]
    pub fn selected(&self) -> Option<BoardId> {
        self.placement.selected()
    }

    pub fn clear_selection(&mut self) -> bool {
        self.placement.clear_selection()
    }

    pub fn delete_selection(
        &mut self,
        authority: &dyn EditAuthority,
        sink: &mut dyn PlacementSink,
    ) -> Result<BoardId, EngineError> {
        self.placement
            .delete_selected(&mut self.boards, authority, sink)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(SceneTuning::default())
    }
}

#[cfg(test)]
mod tests {
    use studio_core::board::BoardPlacement;
    use studio_core::contract::{AllowAll, PlacementUpdate};
    use studio_core::room::{Topology, WallSpan};

    use super::*;
    use crate::camera::CameraState;

    fn square_room() -> RoomConfig {
        RoomConfig::new(vec![WallSpan::new(10.0, 10.0); 4], Topology::Square)
    }

    fn boards() -> Vec<Board> {
        vec![
            Board::new(BoardId::new(1))
                .with_physical_size(24.0, 24.0)
                .with_placement(BoardPlacement::new(
                    1,
                    NormalizedCoord::new(0.2, -0.1),
                    Side::Front,
                )),
            Board::new(BoardId::new(2))
                .with_aspect_ratio(1.0)
                .with_placement(BoardPlacement::new(
                    7,
                    NormalizedCoord::center(),
                    Side::Front,
                )),
            Board::new(BoardId::new(3)).with_placement(BoardPlacement::new(
                0,
                NormalizedCoord::new(f64::NAN, 0.0),
                Side::Back,
            )),
            Board::new(BoardId::new(4)).with_placement(BoardPlacement::new(
                2,
                NormalizedCoord::new(3.0, -0.9),
                Side::Front,
            )),
            Board::new(BoardId::new(5)).with_aspect_ratio(1.5),
        ]
    }

    fn scene() -> Scene {
        let mut scene = Scene::default();
        scene.load_room(square_room());
        scene.load_boards(boards());
        scene
    }

    fn settle(scene: &mut Scene) {
        for _ in 0..120 {
            scene.tick(1.0 / 60.0);
        }
    }

    #[test]
    fn empty_room_falls_back_to_default() {
        let mut scene = Scene::default();
        scene.load_room(RoomConfig::new(Vec::new(), Topology::Square));
        assert_eq!(scene.room().topology, Topology::Zigzag);
        assert_eq!(scene.transforms().len(), 4);
    }

    #[test]
    fn invalid_placements_load_as_unplaced() {
        let scene = scene();
        let placed = |id| scene.boards().get(BoardId::new(id)).is_some_and(|b| b.is_placed());
        assert!(placed(1));
        assert!(!placed(2));
        assert!(!placed(3));
        assert!(placed(4));
        assert!(!placed(5));

        let clamped = scene
            .boards()
            .get(BoardId::new(4))
            .and_then(|b| b.placement)
            .expect("placed");
        assert_eq!(clamped.position, NormalizedCoord::new(0.5, -0.5));
        assert_eq!(scene.render_list().len(), 2);
    }

    #[test]
    fn shrinking_room_demotes_boards() {
        let mut scene = scene();
        scene.load_room(RoomConfig::new(
            vec![WallSpan::new(10.0, 10.0); 2],
            Topology::Linear,
        ));
        assert!(scene.boards().get(BoardId::new(1)).is_some_and(|b| b.is_placed()));
        assert!(!scene.boards().get(BoardId::new(4)).is_some_and(|b| b.is_placed()));
        assert!(scene.render_position(BoardId::new(4)).is_none());
    }

    #[test]
    fn wall_index_is_checked() {
        let mut scene = scene();
        let err = scene.wall_transform(9).unwrap_err();
        assert_eq!(
            err,
            EngineError::WallOutOfRange {
                index: 9,
                wall_count: 4
            }
        );
        assert!(scene.enter_wall(4, Side::Front).is_err());
        assert_eq!(scene.camera().state(), CameraState::Free);
    }

    #[test]
    fn palette_drag_requires_editing_wall() {
        let mut scene = scene();
        let err = scene
            .begin_palette_drag(BoardId::new(5), &AllowAll)
            .unwrap_err();
        assert_eq!(err, EngineError::NoActiveWall);
    }

    #[test]
    fn palette_drop_at_view_center_lands_on_wall_center() {
        let mut scene = scene();
        let mut sink: Vec<PlacementUpdate> = Vec::new();
        scene.enter_wall(0, Side::Front).expect("enter");
        settle(&mut scene);
        assert!(matches!(scene.camera().state(), CameraState::Editing { .. }));

        scene
            .begin_palette_drag(BoardId::new(5), &AllowAll)
            .expect("drag");
        let ray = scene.camera_ray(0.0, 0.0, 16.0 / 9.0).expect("ray");
        let preview = scene.pointer_move(&ray).expect("preview");
        assert!(preview.x.abs() < 1e-6 && preview.y.abs() < 1e-6);

        let preview_world = scene.preview_position().expect("preview position");
        let outcome = scene.pointer_up(Some(&ray), &mut sink);
        assert!(matches!(outcome, DropOutcome::Committed(_)));
        assert_eq!(sink.len(), 1);

        // 预览与提交后的渲染使用同一换算，结果逐位一致
        let rendered = scene.render_position(BoardId::new(5)).expect("rendered");
        assert_eq!(rendered, preview_world);
        let size = scene.resolved_size(BoardId::new(5)).expect("size");
        assert!((size.height - 0.30).abs() < 1e-12);
    }

    #[test]
    fn pointer_down_drags_only_on_edited_wall() {
        let mut scene = scene();
        let target = scene.render_position(BoardId::new(1)).expect("placed");
        let eye = scene
            .wall_transform(1)
            .map(|wall| wall.center().translate(wall.forward().scale(2.0)))
            .expect("wall");
        let ray = Ray3::through(eye, target).expect("ray");

        let picked = scene.pointer_down(&ray, &AllowAll).expect("pick");
        assert_eq!(picked, Some(BoardId::new(1)));
        assert_eq!(scene.selected(), Some(BoardId::new(1)));
        assert!(!scene.placement().is_dragging());

        scene.enter_wall(1, Side::Front).expect("enter");
        settle(&mut scene);
        scene.pointer_down(&ray, &AllowAll).expect("pick");
        assert!(scene.placement().is_dragging());

        assert_eq!(scene.cancel_drag(), DropOutcome::Cancelled);
        let deny = |_: BoardId| false;
        let err = scene.pointer_down(&ray, &deny).unwrap_err();
        assert_eq!(err, EngineError::EditDenied { board: 1 });
        assert!(!scene.placement().is_dragging());
    }

    #[test]
    fn back_mounted_board_is_only_reachable_from_back() {
        let mut scene = Scene::default();
        scene.load_room(square_room());
        scene.load_boards([Board::new(BoardId::new(9))
            .with_physical_size(24.0, 24.0)
            .with_placement(BoardPlacement::new(
                0,
                NormalizedCoord::center(),
                Side::Back,
            ))]);

        scene.enter_wall(0, Side::Front).expect("enter");
        settle(&mut scene);
        let ray = scene.camera_ray(0.0, 0.0, 16.0 / 9.0).expect("ray");
        assert_eq!(scene.pointer_down(&ray, &AllowAll).expect("pick"), None);
        assert_eq!(scene.selected(), None);
        assert!(!scene.placement().is_dragging());
        let mut sink: Vec<PlacementUpdate> = Vec::new();
        assert_eq!(
            scene.delete_selection(&AllowAll, &mut sink),
            Err(EngineError::NoSelection)
        );
        assert!(scene.boards().get(BoardId::new(9)).is_some_and(|b| b.is_placed()));

        scene.enter_wall(0, Side::Back).expect("enter");
        settle(&mut scene);
        let ray = scene.camera_ray(0.0, 0.0, 16.0 / 9.0).expect("ray");
        assert_eq!(
            scene.pointer_down(&ray, &AllowAll).expect("pick"),
            Some(BoardId::new(9))
        );
        let session = scene.placement().session().expect("drag");
        assert_eq!(session.side, Side::Back);
    }

    #[test]
    fn leaving_wall_cancels_drag_without_mutation() {
        let mut scene = scene();
        let before = scene.boards().get(BoardId::new(1)).cloned();
        scene.enter_wall(1, Side::Front).expect("enter");
        settle(&mut scene);

        let target = scene.render_position(BoardId::new(1)).expect("placed");
        let ray = Ray3::through(scene.camera_pose().position, target).expect("ray");
        scene.pointer_down(&ray, &AllowAll).expect("pick");
        let moved = scene.camera_ray(0.3, 0.2, 1.5).expect("ray");
        scene.pointer_move(&moved);
        assert!(scene.exit_wall());
        assert!(!scene.placement().is_dragging());
        assert_eq!(scene.boards().get(BoardId::new(1)).cloned(), before);
    }

    #[test]
    fn roaming_only_in_free_state() {
        let mut scene = scene();
        let input = RoamInput {
            forward: 1.0,
            ..RoamInput::default()
        };
        let start = scene.camera_pose();
        assert!(scene.roam(input, 0.5));
        assert!(scene.camera_pose().position.distance(start.position) > 0.1);

        scene.enter_wall(0, Side::Front).expect("enter");
        let during = scene.camera_pose();
        assert!(!scene.roam(input, 0.5));
        assert_eq!(scene.camera_pose(), during);
    }

    #[test]
    fn delete_selection_clears_placement() {
        let mut scene = scene();
        let mut sink: Vec<PlacementUpdate> = Vec::new();
        assert_eq!(
            scene.delete_selection(&AllowAll, &mut sink).unwrap_err(),
            EngineError::NoSelection
        );
        scene.select(BoardId::new(4)).expect("select");
        let removed = scene.delete_selection(&AllowAll, &mut sink).expect("delete");
        assert_eq!(removed, BoardId::new(4));
        assert!(scene.selected().is_none());
        assert!(scene.render_position(BoardId::new(4)).is_none());
        assert!(scene.select(BoardId::new(42)).is_err());
    }
}

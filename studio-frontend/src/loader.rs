use std::env;
use std::path::{Path, PathBuf};

use glam::DVec3;
use studio_config::AppConfig;
use studio_core::board::{Board, BoardId, BoardPlacement, Side};
use studio_core::camera::CameraPose;
use studio_core::coords::NormalizedCoord;
use studio_core::geometry::Point3;
use studio_core::room::RoomConfig;
use studio_engine::camera::CameraProfile;
use studio_engine::gallery::{self, PlacedRoom};
use studio_engine::layout::LayoutParams;
use studio_engine::mapper::MapperParams;
use studio_engine::roam::FreeRoamController;
use studio_engine::scene::{Scene, SceneTuning};
use studio_engine::sizing::SizingRules;
use studio_io::{GallerySnapshot, JsonSnapshotFacade, SnapshotLoader};
use tracing::{info, warn};

/// 指定展厅快照路径的环境变量。
pub const GALLERY_ENV: &str = "STUDIO_GALLERY_JSON";

/// 快照来源，便于前端呈现加载信息。
#[derive(Debug, Clone)]
pub enum SnapshotSource {
    Json(PathBuf),
    Demo,
}

/// 统一封装加载后的场景与元信息。
#[derive(Debug)]
pub struct LoadedScene {
    pub scene: Scene,
    pub source: SnapshotSource,
    /// 画廊排布，首个房间即编辑中的房间。
    pub gallery: Vec<PlacedRoom>,
}

/// 把配置各段换算为引擎参数。
pub fn tuning_from_config(config: &AppConfig) -> SceneTuning {
    let layout = &config.layout;
    let sizing = &config.sizing;
    let camera = &config.camera;
    SceneTuning {
        layout: LayoutParams {
            wall_thickness: layout.wall_thickness,
            linear_spacing: layout.linear_spacing,
            min_span_feet: layout.min_span_feet,
            arc_degrees: layout.arc_degrees,
        },
        mapper: MapperParams {
            board_depth: config.placement.board_depth,
        },
        sizing: SizingRules {
            base_height: sizing.base_height,
            drop_base_height: sizing.drop_base_height,
            max_width: sizing.max_width,
            max_height: sizing.max_height,
            min_fraction: sizing.min_fraction,
            default_width_inches: sizing.default_width_inches,
            default_height_inches: sizing.default_height_inches,
        },
        camera: CameraProfile {
            edit_fov: camera.edit_fov,
            framing_fov: camera.framing_fov,
            framing_margin: camera.framing_margin,
            enter_rate: camera.enter_rate,
            exit_rate: camera.exit_rate,
            fov_smoothing: camera.fov_smoothing,
            default_pose: CameraPose::new(
                Point3(DVec3::from_array(camera.default_position)),
                Point3(DVec3::from_array(camera.default_look_target)),
                camera.free_fov,
            ),
        },
        roam: FreeRoamController::default(),
    }
}

/// 内置演示快照：缺省 zigzag 房间，两块已摆放的展板和两块待摆放的展板。
pub fn demo_snapshot() -> GallerySnapshot {
    let boards = vec![
        Board::new(BoardId::new(1))
            .with_physical_size(24.0, 36.0)
            .with_placement(BoardPlacement::new(
                0,
                NormalizedCoord::new(-0.25, 0.1),
                Side::Front,
            )),
        Board::new(BoardId::new(2))
            .with_aspect_ratio(1.5)
            .with_placement({
                // 旧版数据以百分比保存尺寸
                let mut placement =
                    BoardPlacement::new(1, NormalizedCoord::new(0.2, 0.0), Side::Back);
                placement.width = Some(30.0);
                placement.height = Some(25.0);
                placement
            }),
        Board::new(BoardId::new(3)).with_aspect_ratio(0.8),
        Board::new(BoardId::new(4)),
    ];
    GallerySnapshot {
        room: RoomConfig::default_zigzag(),
        other_rooms: Vec::new(),
        boards,
    }
}

/// 按优先级加载快照：显式路径 → 环境变量 `STUDIO_GALLERY_JSON` → 配置 `data.gallery_path`。
/// 都不可用或加载失败时回退到内置示例。
pub fn load_scene(config: &AppConfig, explicit: Option<&Path>) -> LoadedScene {
    let mut scene = Scene::new(tuning_from_config(config));

    let candidate = explicit
        .map(Path::to_path_buf)
        .or_else(|| env::var_os(GALLERY_ENV).map(PathBuf::from))
        .or_else(|| config.data.gallery_path.clone());

    let (snapshot, source) = match candidate {
        Some(path) => match JsonSnapshotFacade::new().load(&path) {
            Ok(snapshot) => {
                info!(path = %path.display(), boards = snapshot.boards.len(), "从 JSON 加载展厅快照成功");
                (snapshot, SnapshotSource::Json(path))
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "加载展厅快照失败，回退到内置示例");
                (demo_snapshot(), SnapshotSource::Demo)
            }
        },
        None => (demo_snapshot(), SnapshotSource::Demo),
    };

    let gallery = gallery::arrange(
        &snapshot.gallery_rooms(),
        scene.solver(),
        config.layout.gallery_spacing,
    );
    if gallery.len() > 1 {
        info!(rooms = gallery.len(), "画廊包含多个房间");
    }

    scene.load_room(snapshot.room);
    scene.load_boards(snapshot.boards);
    LoadedScene {
        scene,
        source,
        gallery,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_engine_defaults() {
        let tuning = tuning_from_config(&AppConfig::default());
        assert_eq!(tuning, SceneTuning::default());
    }

    #[test]
    fn camera_section_maps_to_default_pose() {
        let mut config = AppConfig::default();
        config.camera.default_position = [1.0, 2.0, 3.0];
        config.camera.free_fov = 70.0;
        let tuning = tuning_from_config(&config);
        assert_eq!(tuning.camera.default_pose.position, Point3::new(1.0, 2.0, 3.0));
        assert!((tuning.camera.default_pose.fov - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_snapshot_falls_back_to_demo() {
        let config = AppConfig::default();
        let loaded = load_scene(&config, Some(Path::new("/nonexistent/gallery.json")));
        assert!(matches!(loaded.source, SnapshotSource::Demo));
        assert_eq!(loaded.scene.boards().len(), 4);
        assert_eq!(loaded.scene.render_list().len(), 2);
        assert_eq!(loaded.gallery.len(), 1);
        assert_eq!(loaded.gallery[0].walls.len(), loaded.scene.transforms().len());
    }

    #[test]
    fn snapshot_rooms_are_arranged_side_by_side() {
        let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("../data/gallery.json");
        let config = AppConfig::default();
        let loaded = load_scene(&config, Some(&fixture));
        assert!(matches!(loaded.source, SnapshotSource::Json(_)));
        assert_eq!(loaded.gallery.len(), 2);
        assert_eq!(loaded.gallery[1].room_index, 1);
        let max_first = loaded.gallery[0]
            .walls
            .iter()
            .map(|wall| wall.center_x)
            .fold(f64::MIN, f64::max);
        assert!(loaded.gallery[1].walls.iter().all(|wall| wall.center_x > max_first));
        // 编辑中的房间不受画廊平移影响
        assert_eq!(loaded.scene.transforms().len(), 3);
    }
}

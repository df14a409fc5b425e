use std::path::Path;

use crate::errors::FrontendError;
use crate::loader::{SnapshotSource, load_scene};
use studio_config::AppConfig;
use studio_core::board::BoardId;
use studio_core::camera::CameraPose;
use studio_core::contract::{AllowAll, PlacementCommit, PlacementSink};
use studio_core::geometry::Ray3;
use studio_engine::camera::CameraState;
use studio_engine::command::{CommandBus, CommandContext, CommandRequest};
use studio_engine::gallery::PlacedRoom;
use studio_engine::placement::DropOutcome;
use studio_engine::scene::{RenderItem, Scene};
use studio_io::{PlacementJournal, read_journal};
use tracing::{debug, info, warn};

const FRAME_DT: f64 = 1.0 / 60.0;
const MAX_SETTLE_FRAMES: usize = 600;
const VIEW_ASPECT: f64 = 16.0 / 9.0;

/// 演示会话的结果，供打印与测试使用。
#[derive(Debug)]
pub struct SessionReport {
    pub source: SnapshotSource,
    pub topology: &'static str,
    pub walls: Vec<WallLine>,
    pub gallery: Vec<PlacedRoom>,
    pub command_log: Vec<String>,
    pub commits: Vec<PlacementCommit>,
    pub render_list: Vec<RenderItem>,
    pub final_pose: CameraPose,
    pub final_state: CameraState,
    pub journal: String,
}

#[derive(Debug, Clone, Copy)]
pub struct WallLine {
    pub index: usize,
    pub center_x: f64,
    pub center_z: f64,
    pub rotation_degrees: f64,
    pub width_feet: f64,
    pub height_feet: f64,
}

/// 脚本化的编辑会话：进入第 0 面墙，把一块未摆放的展板从侧栏拖上墙，
/// 再把它在墙上挪动一次，最后退出到自由视角。
pub fn run_demo(config: &AppConfig, gallery: Option<&Path>) -> Result<SessionReport, FrontendError> {
    let loaded = load_scene(config, gallery);
    let mut scene = loaded.scene;
    let mut journal = PlacementJournal::new(Vec::new());
    let bus = CommandBus::new();
    let mut command_log = Vec::new();
    let mut commits = Vec::new();

    let walls = scene
        .transforms()
        .iter()
        .enumerate()
        .map(|(index, wall)| {
            let span = wall.span();
            WallLine {
                index,
                center_x: wall.center_x,
                center_z: wall.center_z,
                rotation_degrees: wall.rotation_degrees(),
                width_feet: span.width,
                height_feet: span.height,
            }
        })
        .collect();

    run_command(&bus, &mut scene, &mut journal, "enter_wall 0", &mut command_log);
    settle(&mut scene);

    if let Some(board) = first_unplaced(&scene) {
        scene.begin_palette_drag(board, &AllowAll)?;
        if let Some(commit) = sweep_and_drop(&mut scene, &mut journal, (-0.15, 0.1), (0.05, -0.05))
        {
            commits.push(commit);
        }
    } else {
        debug!("没有待摆放的展板，跳过侧栏拖拽");
    }

    let on_wall = scene
        .render_list()
        .into_iter()
        .find(|item| item.wall_index == 0);
    if let Some(item) = on_wall {
        let pose = scene.camera_pose();
        if let Some(ray) = Ray3::through(pose.position, item.position) {
            if scene.pointer_down(&ray, &AllowAll)?.is_some() && scene.placement().is_dragging() {
                if let Some(commit) = sweep_and_drop(&mut scene, &mut journal, (0.0, 0.0), (0.2, 0.15))
                {
                    commits.push(commit);
                }
            }
        }
    }

    run_command(&bus, &mut scene, &mut journal, "clear_selection", &mut command_log);
    run_command(&bus, &mut scene, &mut journal, "exit_wall", &mut command_log);
    settle(&mut scene);

    let journal_text = String::from_utf8_lossy(&journal.into_inner()).into_owned();
    if let Some(path) = &config.data.journal_path {
        persist_journal(path, &journal_text)?;
    }

    info!(commits = commits.len(), "CLI 演示会话结束");
    Ok(SessionReport {
        source: loaded.source,
        topology: scene.room().topology.name(),
        walls,
        gallery: loaded.gallery,
        command_log,
        commits,
        render_list: scene.render_list(),
        final_pose: scene.camera_pose(),
        final_state: scene.camera().state(),
        journal: journal_text,
    })
}

fn run_command(
    bus: &CommandBus,
    scene: &mut Scene,
    sink: &mut dyn PlacementSink,
    line: &str,
    log: &mut Vec<String>,
) {
    let Some(request) = CommandRequest::parse(line) else {
        return;
    };
    let mut context = CommandContext {
        scene,
        authority: &AllowAll,
        sink,
    };
    let response = bus.dispatch(&request, &mut context);
    let message = response.message.unwrap_or_default();
    if response.success {
        log.push(format!("{line} -> {message}"));
    } else {
        warn!("CLI 命令执行失败: {message}");
        log.push(format!("{line} -> 失败: {message}"));
    }
}

/// 推进相机直到过渡结束。
fn settle(scene: &mut Scene) {
    for _ in 0..MAX_SETTLE_FRAMES {
        if !scene.camera().state().is_transitioning() {
            break;
        }
        scene.tick(FRAME_DT);
    }
}

fn first_unplaced(scene: &Scene) -> Option<BoardId> {
    scene
        .boards()
        .iter()
        .find(|board| !board.is_placed())
        .map(|board| board.id)
}

/// 指针从 `from` 线性移动到 `to`（NDC），在终点释放。
fn sweep_and_drop(
    scene: &mut Scene,
    sink: &mut dyn PlacementSink,
    from: (f64, f64),
    to: (f64, f64),
) -> Option<PlacementCommit> {
    const STEPS: usize = 8;
    for step in 0..=STEPS {
        let t = step as f64 / STEPS as f64;
        let ndc_x = from.0 + (to.0 - from.0) * t;
        let ndc_y = from.1 + (to.1 - from.1) * t;
        if let Some(ray) = scene.camera_ray(ndc_x, ndc_y, VIEW_ASPECT) {
            scene.pointer_move(&ray);
        }
    }
    let release = scene.camera_ray(to.0, to.1, VIEW_ASPECT);
    match scene.pointer_up(release.as_ref(), sink) {
        DropOutcome::Committed(commit) => Some(commit),
        DropOutcome::Cancelled => None,
    }
}

fn persist_journal(path: &Path, text: &str) -> Result<(), FrontendError> {
    let mut file_journal = PlacementJournal::append_to(path)?;
    for update in read_journal(text) {
        file_journal.append(&update)?;
    }
    info!(path = %path.display(), entries = file_journal.written(), "落位日志已写入");
    Ok(())
}

pub fn print_report(report: &SessionReport) {
    println!("展厅编辑 CLI 演示");
    match &report.source {
        SnapshotSource::Json(path) => println!("已从 JSON 加载展厅快照：{}", path.display()),
        SnapshotSource::Demo => println!("使用内置示例展厅"),
    }

    println!("房间拓扑：{}，共 {} 面墙", report.topology, report.walls.len());
    for wall in &report.walls {
        println!(
            "  - 墙 #{}: 中心=({:.3}, {:.3}), 朝向={:.1}°, 尺寸={:.1}×{:.1} ft",
            wall.index,
            wall.center_x,
            wall.center_z,
            wall.rotation_degrees,
            wall.width_feet,
            wall.height_feet
        );
    }

    if report.gallery.len() > 1 {
        println!("画廊共 {} 个房间：", report.gallery.len());
        for room in &report.gallery {
            println!(
                "  - 房间 #{}: X 偏移={:.3}, {} 面墙",
                room.room_index,
                room.offset_x,
                room.walls.len()
            );
        }
    }

    println!("执行的命令：");
    for line in &report.command_log {
        println!("  - {line}");
    }

    if report.commits.is_empty() {
        println!("本次会话没有提交任何落位。");
    } else {
        println!("提交的落位：");
        for commit in &report.commits {
            println!(
                "  - 展板 {} -> 墙 #{} ({}), x={:.3}, y={:.3}",
                commit.board_id,
                commit.wall_index,
                commit.side.name(),
                commit.x,
                commit.y
            );
        }
    }

    println!("当前墙上的展板：");
    for item in &report.render_list {
        println!(
            "  - 展板 {}: 墙 #{} ({}), 世界坐标=({:.3}, {:.3}, {:.3}), 尺寸={:.3}×{:.3}",
            item.board.get(),
            item.wall_index,
            item.side.name(),
            item.position.x(),
            item.position.y(),
            item.position.z(),
            item.size.width,
            item.size.height
        );
    }

    let pose = report.final_pose;
    println!(
        "相机：位置=({:.2}, {:.2}, {:.2}), 目标=({:.2}, {:.2}, {:.2}), FOV={:.1}°, 自由视角={}",
        pose.position.x(),
        pose.position.y(),
        pose.position.z(),
        pose.look_target.x(),
        pose.look_target.y(),
        pose.look_target.z(),
        pose.fov,
        if matches!(report.final_state, CameraState::Free) { "是" } else { "否" }
    );

    if !report.journal.is_empty() {
        println!("落位日志：");
        for line in report.journal.lines() {
            println!("  {line}");
        }
    }
}

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use studio_core::{
    board::{Board, BoardId, BoardPlacement, Side},
    contract::{PlacementCommit, PlacementSink, PlacementUpdate},
    coords::NormalizedCoord,
    room::{RoomConfig, Topology, WallSpan},
};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid json in {path:?}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to append journal entry: {0}")]
    Journal(#[source] std::io::Error),
}

// --- 房间配置 ---

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RoomPayload {
    #[serde(default)]
    walls: Vec<WallPayload>,
    #[serde(default = "RoomPayload::default_topology")]
    topology: String,
}

impl RoomPayload {
    fn default_topology() -> String {
        Topology::Zigzag.name().to_string()
    }

    fn into_room(self) -> RoomConfig {
        if self.walls.is_empty() {
            warn!("房间配置没有墙体，使用缺省房间");
            return RoomConfig::default_zigzag();
        }
        let topology = Topology::from_name(&self.topology);
        if topology.name() != self.topology.trim().to_ascii_lowercase() {
            debug!(topology = %self.topology, fallback = topology.name(), "拓扑名称未识别或为别名");
        }
        RoomConfig::new(
            self.walls
                .into_iter()
                .map(|wall| WallSpan::new(wall.width, wall.height))
                .collect(),
            topology,
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct WallPayload {
    #[serde(default = "WallPayload::default_width")]
    width: f64,
    #[serde(default = "WallPayload::default_height")]
    height: f64,
}

impl WallPayload {
    fn default_width() -> f64 {
        RoomConfig::DEFAULT_WALL_WIDTH
    }

    fn default_height() -> f64 {
        RoomConfig::DEFAULT_WALL_HEIGHT
    }
}

/// 解析房间配置 `{ walls: [{width, height}], topology }`。
/// JSON 无效或墙体列表为空时返回缺省的四面 zigzag 房间。
pub fn parse_room_config(text: &str) -> RoomConfig {
    match serde_json::from_str::<RoomPayload>(text) {
        Ok(payload) => payload.into_room(),
        Err(err) => {
            warn!(error = %err, "房间配置解析失败，使用缺省房间");
            RoomConfig::default_zigzag()
        }
    }
}

/// 房间配置缺失时同样回退到缺省房间。
pub fn room_config_or_default(text: Option<&str>) -> RoomConfig {
    match text {
        Some(text) => parse_room_config(text),
        None => {
            debug!("未提供房间配置，使用缺省房间");
            RoomConfig::default_zigzag()
        }
    }
}

fn encode_room(room: &RoomConfig) -> RoomPayload {
    RoomPayload {
        walls: room
            .walls
            .iter()
            .map(|wall| WallPayload {
                width: wall.width,
                height: wall.height,
            })
            .collect(),
        topology: room.topology.name().to_string(),
    }
}

// --- 展板列表 ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct BoardPayload {
    id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    physical_width_inches: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    physical_height_inches: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    placement: Option<PlacementCommitShape>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlacementCommitShape {
    wall_index: usize,
    x: f64,
    y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<f64>,
    side: Side,
}

impl From<&Board> for BoardPayload {
    fn from(board: &Board) -> Self {
        Self {
            id: board.id.get(),
            physical_width_inches: board.physical_width_inches,
            physical_height_inches: board.physical_height_inches,
            aspect_ratio: board.aspect_ratio,
            placement: board.placement.map(|placement| PlacementCommitShape {
                wall_index: placement.wall_index,
                x: placement.position.x,
                y: placement.position.y,
                width: placement.width,
                height: placement.height,
                side: placement.side,
            }),
        }
    }
}

/// 解析展板列表。接受顶层数组或 `{ "boards": [...] }`。
///
/// 缺少有效 `id` 的条目被跳过；`wallIndex` 为负、非整数或不小于 `wall_count`，
/// 以及 `x`/`y` 缺失时，展板按未摆放处理。
pub fn parse_board_list(text: &str, wall_count: usize) -> Vec<Board> {
    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "展板列表解析失败");
            return Vec::new();
        }
    };
    boards_from_value(&value, wall_count)
}

fn boards_from_value(value: &Value, wall_count: usize) -> Vec<Board> {
    let entries = match value {
        Value::Array(entries) => entries.as_slice(),
        Value::Object(object) => match object.get("boards") {
            Some(Value::Array(entries)) => entries.as_slice(),
            _ => &[],
        },
        _ => &[],
    };

    entries
        .iter()
        .enumerate()
        .filter_map(|(position, entry)| {
            let board = parse_board(entry, wall_count);
            if board.is_none() {
                debug!(position, "跳过无效的展板条目");
            }
            board
        })
        .collect()
}

fn parse_board(value: &Value, wall_count: usize) -> Option<Board> {
    let object = value.as_object()?;
    let id = object.get("id").and_then(Value::as_u64)?;
    let mut board = Board::new(BoardId::new(id));
    board.physical_width_inches = number(object, "physicalWidthInches");
    board.physical_height_inches = number(object, "physicalHeightInches");
    board.aspect_ratio = number(object, "aspectRatio");
    board.placement = object
        .get("placement")
        .and_then(Value::as_object)
        .and_then(|placement| parse_placement(placement, id, wall_count));
    Some(board)
}

fn parse_placement(
    object: &Map<String, Value>,
    board: u64,
    wall_count: usize,
) -> Option<BoardPlacement> {
    let Some(wall_index) = whole_index(object.get("wallIndex")).filter(|&i| i < wall_count)
    else {
        debug!(board, wall_count, "wallIndex 无效，展板视为未摆放");
        return None;
    };
    let (Some(x), Some(y)) = (number(object, "x"), number(object, "y")) else {
        debug!(board, "摆放坐标缺失，展板视为未摆放");
        return None;
    };
    let side = object
        .get("side")
        .and_then(Value::as_str)
        .map(Side::from_name)
        .unwrap_or_default();

    let mut placement =
        BoardPlacement::new(wall_index, NormalizedCoord::new(x, y).clamped(), side);
    placement.width = number(object, "width");
    placement.height = number(object, "height");
    Some(placement)
}

fn number(object: &Map<String, Value>, key: &str) -> Option<f64> {
    object
        .get(key)
        .and_then(Value::as_f64)
        .filter(|value| value.is_finite())
}

fn whole_index(value: Option<&Value>) -> Option<usize> {
    let value = value?;
    if let Some(index) = value.as_u64() {
        return usize::try_from(index).ok();
    }
    let float = value.as_f64()?;
    (float >= 0.0 && float.fract() == 0.0 && float <= usize::MAX as f64).then_some(float as usize)
}

// --- 展厅快照 ---

/// 房间与展板的完整快照。`room` 是编辑中的房间，`other_rooms` 只参与画廊排布。
#[derive(Debug, Clone, PartialEq)]
pub struct GallerySnapshot {
    pub room: RoomConfig,
    pub other_rooms: Vec<RoomConfig>,
    pub boards: Vec<Board>,
}

impl GallerySnapshot {
    /// 画廊中的全部房间，编辑中的房间排在最前。
    pub fn gallery_rooms(&self) -> Vec<RoomConfig> {
        std::iter::once(&self.room)
            .chain(&self.other_rooms)
            .cloned()
            .collect()
    }
}

impl Default for GallerySnapshot {
    fn default() -> Self {
        Self {
            room: RoomConfig::default_zigzag(),
            other_rooms: Vec::new(),
            boards: Vec::new(),
        }
    }
}

/// 其余房间：无效或没有墙体的条目被跳过，不回退到缺省房间。
fn other_rooms_from_value(value: &Value) -> Vec<RoomConfig> {
    let Some(items) = value.as_array() else {
        warn!("otherRooms 不是数组，忽略");
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match RoomPayload::deserialize(item) {
            Ok(payload) if !payload.walls.is_empty() => Some(payload.into_room()),
            Ok(_) => {
                debug!(index, "画廊房间没有墙体，跳过");
                None
            }
            Err(err) => {
                warn!(index, error = %err, "画廊房间配置无效，跳过");
                None
            }
        })
        .collect()
}

/// 解析快照 `{ "room": {...}, "otherRooms": [...], "boards": [...] }`。
/// 房间缺失或无效时使用缺省房间；`otherRooms` 可省略。
pub fn parse_snapshot(text: &str) -> Result<GallerySnapshot, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    let room = match value.get("room") {
        Some(room) => match RoomPayload::deserialize(room) {
            Ok(payload) => payload.into_room(),
            Err(err) => {
                warn!(error = %err, "快照中的房间配置无效，使用缺省房间");
                RoomConfig::default_zigzag()
            }
        },
        None => room_config_or_default(None),
    };
    let boards = value
        .get("boards")
        .map(|boards| boards_from_value(boards, room.wall_count()))
        .unwrap_or_default();
    let other_rooms = value
        .get("otherRooms")
        .map(other_rooms_from_value)
        .unwrap_or_default();
    Ok(GallerySnapshot {
        room,
        other_rooms,
        boards,
    })
}

pub fn encode_snapshot(snapshot: &GallerySnapshot) -> Result<String, IoError> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct SnapshotPayload {
        room: RoomPayload,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        other_rooms: Vec<RoomPayload>,
        boards: Vec<BoardPayload>,
    }

    let payload = SnapshotPayload {
        room: encode_room(&snapshot.room),
        other_rooms: snapshot.other_rooms.iter().map(encode_room).collect(),
        boards: snapshot.boards.iter().map(BoardPayload::from).collect(),
    };
    Ok(serde_json::to_string_pretty(&payload)?)
}

pub trait SnapshotLoader {
    fn load(&self, path: &Path) -> Result<GallerySnapshot, IoError>;
}

pub trait SnapshotSaver {
    fn save(&self, snapshot: &GallerySnapshot, path: &Path) -> Result<(), IoError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSnapshotFacade;

impl JsonSnapshotFacade {
    pub fn new() -> Self {
        Self
    }
}

impl SnapshotLoader for JsonSnapshotFacade {
    fn load(&self, path: &Path) -> Result<GallerySnapshot, IoError> {
        let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        parse_snapshot(&data).map_err(|source| IoError::InvalidJson {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl SnapshotSaver for JsonSnapshotFacade {
    fn save(&self, snapshot: &GallerySnapshot, path: &Path) -> Result<(), IoError> {
        let text = encode_snapshot(snapshot)?;
        fs::write(path, text).map_err(|source| IoError::WriteError {
            path: path.to_path_buf(),
            source,
        })
    }
}

// --- 落位提交 ---

/// 落位提交编码为 `{ boardId, wallIndex, x, y, width, height, side }`。
pub fn encode_commit(commit: &PlacementCommit) -> Result<String, IoError> {
    Ok(serde_json::to_string(commit)?)
}

pub fn encode_update(update: &PlacementUpdate) -> Result<String, IoError> {
    Ok(serde_json::to_string(update)?)
}

/// 逐行读取日志，无法解析的行被跳过。
pub fn read_journal(text: &str) -> Vec<PlacementUpdate> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(number, line)| match serde_json::from_str(line) {
            Ok(update) => Some(update),
            Err(err) => {
                warn!(line = number + 1, error = %err, "跳过无法解析的日志行");
                None
            }
        })
        .collect()
}

/// 按顺序把日志中的变更应用到展板列表，返回实际生效的条数。未知展板被忽略。
pub fn apply_journal(boards: &mut [Board], updates: &[PlacementUpdate]) -> usize {
    let mut applied = 0;
    for update in updates {
        let Some(board) = boards.iter_mut().find(|board| board.id == update.board()) else {
            debug!(board = update.board().get(), "日志引用了未知展板");
            continue;
        };
        board.placement = match update {
            PlacementUpdate::Placed(commit) => Some(BoardPlacement {
                wall_index: commit.wall_index,
                position: NormalizedCoord::new(commit.x, commit.y).clamped(),
                width: commit.width,
                height: commit.height,
                side: commit.side,
            }),
            PlacementUpdate::Cleared { .. } => None,
        };
        applied += 1;
    }
    applied
}

/// JSON lines 形式的落位日志，每次提交追加一行。
#[derive(Debug)]
pub struct PlacementJournal<W: Write> {
    writer: W,
    written: usize,
    failed: usize,
}

impl PlacementJournal<File> {
    /// 以追加方式打开（必要时创建）日志文件。
    pub fn append_to(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| IoError::WriteError {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(file))
    }
}

impl<W: Write> PlacementJournal<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            written: 0,
            failed: 0,
        }
    }

    pub fn append(&mut self, update: &PlacementUpdate) -> Result<(), IoError> {
        let line = encode_update(update)?;
        writeln!(self.writer, "{line}").map_err(IoError::Journal)?;
        self.writer.flush().map_err(IoError::Journal)?;
        self.written += 1;
        Ok(())
    }

    #[inline]
    pub fn written(&self) -> usize {
        self.written
    }

    #[inline]
    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> PlacementSink for PlacementJournal<W> {
    fn submit(&mut self, update: &PlacementUpdate) -> bool {
        match self.append(update) {
            Ok(()) => true,
            Err(err) => {
                self.failed += 1;
                warn!(board = update.board().get(), error = %err, "写入落位日志失败");
                false
            }
        }
    }
}

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 配置文件路径的环境变量。
pub const CONFIG_ENV: &str = "STUDIO_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub sizing: SizingConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub placement: PlacementConfig,
    #[serde(default)]
    pub data: DataConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 自动发现配置文件：优先读取环境变量 `STUDIO_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 房间布局参数，长度单位为引擎单位（米），跨度下限为英尺。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub wall_thickness: f64,
    pub linear_spacing: f64,
    pub min_span_feet: f64,
    pub arc_degrees: f64,
    /// 画廊中相邻房间之间的间隔。
    pub gallery_spacing: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            wall_thickness: 0.1,
            linear_spacing: 0.5,
            min_span_feet: 1.0,
            arc_degrees: 180.0,
            gallery_spacing: 1.0,
        }
    }
}

/// 展板尺寸规则。修改这些常量会改变已存储展板的显示尺寸。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    pub base_height: f64,
    pub drop_base_height: f64,
    pub max_width: f64,
    pub max_height: f64,
    pub min_fraction: f64,
    pub default_width_inches: f64,
    pub default_height_inches: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            base_height: 0.35,
            drop_base_height: 0.30,
            max_width: 0.50,
            max_height: 0.60,
            min_fraction: 0.15,
            default_width_inches: 8.5,
            default_height_inches: 11.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub free_fov: f64,
    pub edit_fov: f64,
    pub framing_fov: f64,
    pub framing_margin: f64,
    pub enter_rate: f64,
    pub exit_rate: f64,
    pub fov_smoothing: f64,
    pub default_position: [f64; 3],
    pub default_look_target: [f64; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            free_fov: 60.0,
            edit_fov: 75.0,
            framing_fov: 50.0,
            framing_margin: 1.15,
            enter_rate: 1.25,
            exit_rate: 6.25,
            fov_smoothing: 6.0,
            default_position: [0.0, 1.6, 6.0],
            default_look_target: [0.0, 1.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// 展板离墙面的深度偏移。
    pub board_depth: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self { board_depth: 0.06 }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataConfig {
    /// 展厅快照（房间 + 展板）JSON 文件。
    #[serde(default)]
    pub gallery_path: Option<PathBuf>,
    /// 落位日志（JSON lines）追加写入的文件。
    #[serde(default)]
    pub journal_path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

use std::collections::HashMap;

use studio_core::board::Side;
use studio_core::contract::{EditAuthority, PlacementSink};

use crate::errors::EngineError;
use crate::scene::Scene;

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    /// 按空白切分一行文本，第一个词为命令名。
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let name = parts.next()?.to_string();
        Some(Self {
            name,
            args: parts.map(str::to_string).collect(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub success: bool,
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

impl From<EngineError> for CommandResponse {
    fn from(error: EngineError) -> Self {
        Self::err(error.to_string())
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse;
}

pub struct CommandContext<'a> {
    pub scene: &'a mut Scene,
    pub authority: &'a dyn EditAuthority,
    pub sink: &'a mut dyn PlacementSink,
}

pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(EnterWallCommand);
        bus.register(ExitWallCommand);
        bus.register(ClearSelectionCommand);
        bus.register(DeleteSelectionCommand);
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if let Some(handler) = self.handlers.get(request.name.as_str()) {
            handler.execute(request, context)
        } else {
            CommandResponse::err(format!("未知命令: {}", request.name))
        }
    }

    pub fn available_commands(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

/// `enter_wall <index> [front|back]`
struct EnterWallCommand;

impl CommandHandler for EnterWallCommand {
    fn name(&self) -> &'static str {
        "enter_wall"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let Some(index) = request.args.first().and_then(|arg| arg.parse::<usize>().ok()) else {
            return CommandResponse::err("用法: enter_wall <墙序号> [front|back]");
        };
        let side = request
            .args
            .get(1)
            .map(|arg| Side::from_name(arg))
            .unwrap_or_default();
        match context.scene.enter_wall(index, side) {
            Ok(()) => CommandResponse::ok(format!("正在进入第 {index} 面墙（{}）", side.name())),
            Err(error) => error.into(),
        }
    }
}

struct ExitWallCommand;

impl CommandHandler for ExitWallCommand {
    fn name(&self) -> &'static str {
        "exit_wall"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if context.scene.exit_wall() {
            CommandResponse::ok("正在返回自由视角")
        } else {
            CommandResponse::ok("已处于自由视角")
        }
    }
}

struct ClearSelectionCommand;

impl CommandHandler for ClearSelectionCommand {
    fn name(&self) -> &'static str {
        "clear_selection"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        context.scene.clear_selection();
        CommandResponse::ok("选中已清空")
    }
}

struct DeleteSelectionCommand;

impl CommandHandler for DeleteSelectionCommand {
    fn name(&self) -> &'static str {
        "delete_selection"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        match context
            .scene
            .delete_selection(context.authority, &mut *context.sink)
        {
            Ok(board) => CommandResponse::ok(format!("展板 {} 已从墙面移除", board.get())),
            Err(error) => error.into(),
        }
    }
}

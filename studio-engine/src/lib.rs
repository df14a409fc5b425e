pub mod camera;
pub mod command;
pub mod gallery;
pub mod hit;
pub mod layout;
pub mod mapper;
pub mod placement;
pub mod roam;
pub mod scene;
pub mod sizing;

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Error, PartialEq, Eq)]
    pub enum EngineError {
        #[error("board {board} is not editable by the current user")]
        EditDenied { board: u64 },
        #[error("board with id {0} not found")]
        BoardNotFound(u64),
        #[error("wall index {index} out of range (room has {wall_count} walls)")]
        WallOutOfRange { index: usize, wall_count: usize },
        #[error("no board is selected")]
        NoSelection,
        #[error("no wall is being edited")]
        NoActiveWall,
    }
}

//! CLI command implementations.
//!
//! | Module   | Commands handled  |
//! |----------|-------------------|
//! | `stages` | `Stages`          |
//! | `board`  | `Board`, `Move`   |
//! | `config` | `Config`          |

pub mod board;
pub mod config;
pub mod stages;

pub use board::{MoveArgs, cmd_board, cmd_move};
pub use config::cmd_config;
pub use stages::cmd_stages;

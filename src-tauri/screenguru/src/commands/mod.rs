// Commands 模块
pub mod album;
pub mod changelog;
pub mod misc;
pub mod settings;
pub mod upload;

pub use album::*;
pub use changelog::*;
pub use misc::*;
pub use settings::*;
pub use upload::*;

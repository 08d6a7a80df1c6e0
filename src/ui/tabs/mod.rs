//! Tab rendering modules

mod commands;
mod files;
mod info;
mod status;

pub use commands::render_commands_tab;
pub use files::render_files_tab;
pub use info::render_info_tab;
pub use status::render_status_tab;

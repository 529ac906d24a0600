// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

pub use handlers::{
    MAP_STEP_DIR, generate_run_id, load_policy, log_level, parse_target_url, resolve_scan_dir,
    run_directory,
};

//! Boson admin operator console: settings loading and terminal rendering.
//!
//! The binary wires these to [`boson_admin_client`] view controllers.

mod events;
pub mod render;
mod settings;

pub use events::ConsoleEvent;

pub use settings::{
    ApiSettings, RuntimeSettings, SessionSettings, load_runtime_settings,
    load_runtime_settings_from_paths, runtime_settings_paths, set_config_home_override,
};

//! Application orchestration module

pub mod initialization;
pub mod execution;

pub use initialization::{
    load_configuration,
    configure_logging,
    resolve_settings,
    build_assistant,
    load_plugins,
};
pub use execution::{
    run_assistant,
    run_session,
    handle_init,
    handle_list_plugins,
    handle_list_strategies,
};

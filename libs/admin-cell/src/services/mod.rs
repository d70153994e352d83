pub mod panel;

pub use panel::AdminPanelService;

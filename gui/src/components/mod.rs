// GUI components module
pub mod chart;
pub mod results;
pub mod sidebar;
pub mod toolbar;

pub use results::ResultsPanel;
pub use sidebar::Sidebar;
pub use toolbar::Toolbar;

pub mod loader;
pub mod schema;

pub use loader::{ConfigError, ConfigLoader};
pub use schema::{
    ApiRules, AppConfig, BrowserConfig, DomRules, HistoryConfig, ScheduleConfig, SelectorRules,
};

pub mod schema;

pub use schema::{
    BrowserConfig, Config, FillConfig, NotifyConfig, StoreConfig, TargetUrl, Viewport,
    WatchConfig,
};

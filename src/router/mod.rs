mod app;

pub use app::app_router;

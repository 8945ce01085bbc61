pub mod app_state;
pub mod service_factory;

pub use app_state::AppState;
pub use service_factory::SlotkeeperServiceFactory;

pub mod change_detector;
pub mod error;
pub mod models;
pub mod task_event_mapper;
pub mod update_predicate;
pub mod week;
